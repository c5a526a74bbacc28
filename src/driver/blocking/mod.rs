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
use cfg_if::cfg_if;

use crate::comm::Rows;
use crate::errors::Result;

cfg_if! {
    if #[cfg(feature = "mysql-sync")] {
        pub mod mysql;
    }
}

cfg_if! {
    if #[cfg(feature = "sqlite-sync")] {
        pub mod sqlite;
    }
}

/// Single-shot statement execution on a checked-out connection.
pub trait DbExecutor {
    /// Run a statement. Returns `true` when it produced a result set.
    fn execute(&mut self, sql: &str) -> Result<bool>;

    /// Run a query and collect every row.
    fn query(&mut self, sql: &str) -> Result<Rows>;
}
