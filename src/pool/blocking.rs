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

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cfg_if::cfg_if;

use crate::comm::Rows;
use crate::config::{DataSourceConfig, PoolTuning};
use crate::driver::blocking::DbExecutor;
use crate::driver::DriverType;
use crate::errors::{DatabaseError, ErrorKind, Result};
use crate::pool::{DataSource, DataSourceFactory, PoolStatus};

cfg_if! {if #[cfg(feature = "mysql-sync")]{
    use crate::driver::blocking::mysql::{self as mmysql, MysqlPool, MysqlConnection};
}}

cfg_if! {if #[cfg(feature = "sqlite-sync")]{
    use crate::driver::blocking::sqlite::{self as sqlite, SqlitePool, SqliteConnection};
}}

#[derive(Clone, Debug)]
pub enum DBPool {
    #[cfg(feature = "mysql-sync")]
    MysqlPool(MysqlPool),
    #[cfg(feature = "sqlite-sync")]
    SqlitePool(SqlitePool),
}

pub enum PooledConnection {
    #[cfg(feature = "mysql-sync")]
    PooledMysql(MysqlConnection),
    #[cfg(feature = "sqlite-sync")]
    PooledSqlite(SqliteConnection),
}

impl fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            #[cfg(feature = "mysql-sync")]
            PooledConnection::PooledMysql(_) => f.write_str("PooledConnection::PooledMysql"),
            #[cfg(feature = "sqlite-sync")]
            PooledConnection::PooledSqlite(_) => f.write_str("PooledConnection::PooledSqlite"),
        }
    }
}

impl DbExecutor for PooledConnection {
    fn execute(&mut self, sql: &str) -> Result<bool> {
        match *self {
            #[cfg(feature = "mysql-sync")]
            PooledConnection::PooledMysql(ref mut conn) => DbExecutor::execute(conn, sql),
            #[cfg(feature = "sqlite-sync")]
            PooledConnection::PooledSqlite(ref mut conn) => DbExecutor::execute(conn, sql),
        }
    }

    fn query(&mut self, sql: &str) -> Result<Rows> {
        match *self {
            #[cfg(feature = "mysql-sync")]
            PooledConnection::PooledMysql(ref mut conn) => DbExecutor::query(conn, sql),
            #[cfg(feature = "sqlite-sync")]
            PooledConnection::PooledSqlite(ref mut conn) => DbExecutor::query(conn, sql),
        }
    }
}

impl DBPool {
    /// get a usable database connection, waiting at most `timeout`
    fn acquire(&self, timeout: Duration) -> Result<PooledConnection> {
        match *self {
            #[cfg(feature = "mysql-sync")]
            DBPool::MysqlPool(ref pool_mysql) => {
                let pooled_conn = pool_mysql.get_timeout(timeout)?;
                Ok(PooledConnection::PooledMysql(pooled_conn))
            }
            #[cfg(feature = "sqlite-sync")]
            DBPool::SqlitePool(ref pool_sqlite) => {
                let pooled_conn = pool_sqlite.get_timeout(timeout)?;
                Ok(PooledConnection::PooledSqlite(pooled_conn))
            }
        }
    }

    fn status(&self) -> PoolStatus {
        match *self {
            #[cfg(feature = "mysql-sync")]
            DBPool::MysqlPool(ref pool) => {
                let state = pool.state();
                PoolStatus { size: state.connections as usize, available: state.idle_connections as usize }
            }
            #[cfg(feature = "sqlite-sync")]
            DBPool::SqlitePool(ref pool) => {
                let state = pool.state();
                PoolStatus { size: state.connections as usize, available: state.idle_connections as usize }
            }
        }
    }
}

/// r2d2 error hook. r2d2 calls it for failed connects during background
/// fill and for idle connections that fail validation at checkout; it
/// recovers from both on its own, so the hook only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcquireFailureHandler;

impl<E: std::error::Error> r2d2::HandleError<E> for AcquireFailureHandler {
    fn handle_error(&self, error: E) {
        tracing::warn!("Failed to establish a pooled connection: {}", error);
    }
}

/// Check a connection out with up to `acquire_retry_attempts` attempts, all
/// inside one `checkout_timeout` deadline.
///
/// When every attempt fails while the pool holds no physical connection at
/// all, and `break_after_acquire_failure` is set, `broken` is raised and
/// later calls fail straight away. An exhausted pool (connections exist but
/// none is free) never breaks the source.
pub(crate) fn checkout_with_retry<T, A, H>(
    tuning: &PoolTuning,
    broken: &AtomicBool,
    mut attempt: A,
    has_connections: H,
) -> Result<T>
where
    A: FnMut(Duration) -> Result<T>,
    H: Fn() -> bool,
{
    if broken.load(Ordering::Acquire) {
        return Err(DatabaseError::new(
            ErrorKind::Acquire,
            "datasource is broken after an acquisition failure",
        ));
    }
    let attempts = tuning.acquire_retry_attempts.max(1);
    let deadline = Instant::now() + tuning.checkout_timeout;
    let mut last_error = None;
    for n in 0..attempts {
        if n > 0 && !tuning.acquire_retry_delay.is_zero() {
            std::thread::sleep(tuning.acquire_retry_delay.min(deadline.saturating_duration_since(Instant::now())));
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match attempt(remaining) {
            Ok(conn) => return Ok(conn),
            Err(e) => {
                tracing::debug!("Acquire attempt {}/{} failed: {}", n + 1, attempts, e);
                last_error = Some(e);
            }
        }
    }
    if tuning.break_after_acquire_failure && !has_connections() {
        tracing::warn!("No connection could be established, datasource marked broken");
        broken.store(true, Ordering::Release);
    }
    Err(last_error.unwrap_or_else(|| DatabaseError::new(ErrorKind::Acquire, "timed out waiting for connection")))
}

/// The r2d2 backed [`DataSource`].
#[derive(Clone, Debug)]
pub struct DBPoolWrapper {
    inner: DBPool,
    cfg: DataSourceConfig,
    broken: Arc<AtomicBool>,
}

impl DBPoolWrapper {
    pub fn new(cfg: DataSourceConfig) -> Result<Self> {
        cfg.tuning().validate()?;
        let driver_type: DriverType = cfg.driver().parse()?;
        let broken = Arc::new(AtomicBool::new(false));
        #[allow(unused_variables)]
        let on_failure = AcquireFailureHandler;
        match driver_type {
            #[cfg(feature = "mysql-sync")]
            DriverType::MySQL => {
                let pool_mysql = mmysql::init_mysql_pool(&cfg, on_failure)?;
                Ok(DBPoolWrapper { inner: DBPool::MysqlPool(pool_mysql), cfg, broken })
            }
            #[cfg(feature = "sqlite-sync")]
            DriverType::Sqlite => {
                let pool_sqlite = sqlite::init_sqlite_pool(&cfg, on_failure)?;
                Ok(DBPoolWrapper { inner: DBPool::SqlitePool(pool_sqlite), cfg, broken })
            }
            #[allow(unreachable_patterns)]
            other => Err(DatabaseError::new(
                ErrorKind::UnsupportedDriver,
                format!("Driver `{}` is not enabled in this build", other.name()),
            )),
        }
    }

    pub fn is_broken(&self) -> bool {
        self.broken.load(Ordering::Acquire)
    }

    pub fn pool(&self) -> &DBPool {
        &self.inner
    }
}

impl DataSource for DBPoolWrapper {
    type Connection = PooledConnection;

    fn get_connection(&self) -> Result<PooledConnection> {
        checkout_with_retry(
            self.cfg.tuning(),
            &self.broken,
            |remaining| self.inner.acquire(remaining),
            || self.inner.status().size > 0,
        )
    }

    fn release(&self, conn: PooledConnection) -> Result<()> {
        match conn {
            #[cfg(feature = "mysql-sync")]
            PooledConnection::PooledMysql(conn) => {
                drop(conn);
                Ok(())
            }
            // The connection goes back to its r2d2 pool when it drops, whether
            // or not the rollback worked.
            #[cfg(feature = "sqlite-sync")]
            PooledConnection::PooledSqlite(conn) => sqlite::reset_session(&conn)
                .map_err(|e| e.into_kind(ErrorKind::Release)),
        }
    }

    fn config(&self) -> &DataSourceConfig {
        &self.cfg
    }

    fn status(&self) -> PoolStatus {
        self.inner.status()
    }

    fn is_usable(&self) -> bool {
        !self.is_broken()
    }
}

/// Builds [`DBPoolWrapper`]s; the factory used outside of tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct DBPoolFactory;

impl DataSourceFactory for DBPoolFactory {
    type Source = DBPoolWrapper;

    fn create(&self, cfg: &DataSourceConfig) -> Result<DBPoolWrapper> {
        DBPoolWrapper::new(cfg.clone())
    }
}
