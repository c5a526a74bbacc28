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

//! This is a lightweight datasource manager: it builds a connection pool from
//! application properties, rebuilds it when those properties change, and hands
//! every unit of work one connection for as long as the unit lasts.
//!
//! Put the desired version of the crate into the `dependencies` section of your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! poolkeeper = "0.1.0"
//! ```
//!
//! ## Feature.
//!
//! * ```sqlite-sync``` - to use sqlite (default)
//! * ```mysql-sync``` - to use mysql
//!
//! ## Properties.
//!
//! * ```db``` - ```mem``` for an embedded in-memory database, ```fs``` for an embedded file database.
//! * ```db.driver```, ```db.url```, ```db.user```, ```db.pass``` - explicit datasource, overriding the presets.
//! * ```db.pool.minSize```, ```db.pool.maxSize```, ```db.pool.timeout```,
//!   ```db.pool.acquireRetryAttempts```, ```db.pool.acquireRetryDelay```,
//!   ```db.pool.breakAfterAcquireFailure``` - pool tuning.
//!
//! ## Example
//!
//! ```rust,no_run
//! use poolkeeper::prelude::*;
//!
//! let db = Database::new(Properties::new().set("db", "mem"));
//! assert!(db.init().is_ready());
//!
//! let unit = db.unit_of_work();
//! unit.execute("CREATE TABLE IF NOT EXISTS t_user (id INTEGER, name TEXT)").unwrap();
//! unit.execute("INSERT INTO t_user VALUES (1, 'Jack')").unwrap();
//! let rows = unit.execute_query("SELECT id, name FROM t_user").unwrap();
//! assert_eq!(rows.len(), 1);
//! // The connection goes back to the pool here.
//! drop(unit);
//!
//! // Changing the datasource properties replaces the pool on the next init.
//! db.configure(|p| p.insert("db.url", "sqlite:mem:other"));
//! db.init();
//! ```
//!
mod comm;
mod config;
mod context;
mod database;
mod driver;
mod errors;
mod manager;
mod pool;
mod registry;
pub mod prelude;

#[doc(inline)]
pub use comm::{Rows, Value};
#[doc(inline)]
pub use config::{redact_url, DataSourceConfig, PoolTuning, Preset, Properties};
#[doc(inline)]
pub use context::{AlternateSource, PersistenceContext};
#[doc(inline)]
pub use database::{global, Database, UnitOfWork};
#[doc(inline)]
pub use driver::blocking::DbExecutor;
#[doc(inline)]
pub use driver::DriverType;
#[cfg(feature = "sqlite-sync")]
pub use driver::blocking::sqlite::{init_sqlite_pool, SqliteConnection, SqliteConnectionManager, SqlitePool};
#[cfg(feature = "mysql-sync")]
pub use driver::blocking::mysql::{init_mysql_pool, MysqlConnection, MysqlConnectionManager, MysqlPool};
#[doc(inline)]
pub use errors::{DatabaseError, ErrorKind, Result};
#[doc(inline)]
pub use manager::{Checkout, PoolManager, ProvisionOutcome, Provisioned};
#[doc(inline)]
pub use pool::blocking::{AcquireFailureHandler, DBPool, DBPoolFactory, DBPoolWrapper, PooledConnection};
#[doc(inline)]
pub use pool::{ConnectionOf, DataSource, DataSourceFactory, PoolStatus};
#[doc(inline)]
pub use registry::{ConnectionRef, ScopedConnectionRegistry, UnitOfWorkId};

pub use config::{
    EMBEDDED_DRIVER, EMBEDDED_MEMORY_URL, EMBEDDED_PASSWORD, EMBEDDED_USER,
    KEY_ACQUIRE_RETRY_ATTEMPTS, KEY_ACQUIRE_RETRY_DELAY, KEY_BREAK_AFTER_ACQUIRE_FAILURE,
    KEY_CHECKOUT_TIMEOUT, KEY_DB, KEY_DRIVER, KEY_MAX_POOL_SIZE, KEY_MIN_POOL_SIZE, KEY_PASS,
    KEY_URL, KEY_USER,
};
