/*
 *
 *  *
 *  *      Copyright (c) 2018-2025, SnackCloud All rights reserved.
 *  *
 *  *   Redistribution and use in source and binary forms, with or without
 *  *   modification, are permitted provided that the following conditions are met:
 *  *
 *  *   Redistributions of source code must retain the above copyright notice,
 *  *   this list of conditions and the following disclaimer.
 *  *   Redistributions in binary form must reproduce the above copyright
 *  *   notice, this list of conditions and the following disclaimer in the
 *  *   documentation and/or other materials provided with the distribution.
 *  *   Neither the name of the www.snackcloud.cn developer nor the names of its
 *  *   contributors may be used to endorse or promote products derived from
 *  *   this software without specific prior written permission.
 *  *   Author: SnackCloud
 *  *
 *
 */

pub use crate::comm::{Rows, Value};
pub use crate::config::{DataSourceConfig, PoolTuning, Preset, Properties};
pub use crate::context::PersistenceContext;
pub use crate::database::{global, Database, UnitOfWork};
pub use crate::driver::blocking::DbExecutor;
pub use crate::errors::{DatabaseError, ErrorKind, Result};
pub use crate::manager::ProvisionOutcome;
pub use crate::pool::blocking::{DBPoolFactory, PooledConnection};
pub use crate::pool::{DataSource, DataSourceFactory, PoolStatus};
pub use crate::registry::{ConnectionRef, UnitOfWorkId};
