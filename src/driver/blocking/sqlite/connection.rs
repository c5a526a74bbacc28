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
use std::path::{Path, PathBuf};

use r2d2::Pool;
use rusqlite::{Connection, Error, OpenFlags};

use crate::config::{redact_url, DataSourceConfig};
use crate::errors::{DatabaseError, ErrorKind};
use crate::pool::blocking::AcquireFailureHandler;

pub type SqlitePool = Pool<SqliteConnectionManager>;
pub type SqliteConnection = r2d2::PooledConnection<SqliteConnectionManager>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Source {
    File(PathBuf),
    /// Private database per connection.
    Memory,
    /// Named in-memory database shared by every connection of the pool.
    SharedMemory(String),
}

impl Source {
    /// `sqlite::memory:`, `sqlite:mem:<name>`, `sqlite:<path>` or
    /// `sqlite://<path>`.
    pub(crate) fn parse(url: &str) -> Result<Self, DatabaseError> {
        let rest = url.trim().strip_prefix("sqlite:").ok_or_else(|| {
            DatabaseError::new(
                ErrorKind::Config,
                format!("Not a SQLite url: {}", redact_url(url)),
            )
        })?;
        if rest == ":memory:" {
            return Ok(Source::Memory);
        }
        if let Some(name) = rest.strip_prefix("mem:") {
            if name.is_empty() {
                return Err(DatabaseError::new(ErrorKind::Config, "Missing in-memory database name"));
            }
            return Ok(Source::SharedMemory(name.to_string()));
        }
        let path = rest.strip_prefix("//").unwrap_or(rest);
        if path.is_empty() {
            return Err(DatabaseError::new(ErrorKind::Config, "Missing SQLite database path"));
        }
        Ok(Source::File(PathBuf::from(path)))
    }
}

pub struct SqliteConnectionManager {
    source: Source,
    flags: OpenFlags,
}

impl fmt::Debug for SqliteConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut builder = f.debug_struct("SqliteConnectionManager");
        let _ = builder.field("source", &self.source);
        let _ = builder.field("flags", &self.flags);
        builder.finish()
    }
}

impl SqliteConnectionManager {

    pub fn new(cfg: &DataSourceConfig) -> Result<Self, DatabaseError> {
        let manager = match Source::parse(cfg.url())? {
            Source::Memory => Self::memory(),
            Source::SharedMemory(name) => Self::shared_memory(name),
            Source::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        DatabaseError::with_cause(
                            ErrorKind::Provision,
                            format!("Cannot create database directory {}", parent.display()),
                            e,
                        )
                    })?;
                }
                Self::file(path)
            }
        };
        Ok(manager)
    }

    /// Creates a new `SqliteConnectionManager` from file.
    ///
    /// See `rusqlite::Connection::open`
    pub fn file<P: AsRef<Path>>(path: P) -> Self {
        Self {
            source: Source::File(path.as_ref().to_path_buf()),
            flags: OpenFlags::default(),
        }
    }

    /// Creates a new `SqliteConnectionManager` from memory.
    pub fn memory() -> Self {
        Self {
            source: Source::Memory,
            flags: OpenFlags::default(),
        }
    }

    /// Creates a manager whose connections all see the same named in-memory
    /// database. The database lives as long as one connection stays open.
    pub fn shared_memory<S: Into<String>>(name: S) -> Self {
        Self {
            source: Source::SharedMemory(name.into()),
            flags: OpenFlags::default() | OpenFlags::SQLITE_OPEN_URI,
        }
    }
}

impl r2d2::ManageConnection for SqliteConnectionManager {
    type Connection = Connection;
    type Error = rusqlite::Error;

    fn connect(&self) -> std::result::Result<Connection, Error> {
        match self.source {
            Source::File(ref path) => Connection::open_with_flags(path, self.flags),
            Source::Memory => Connection::open_in_memory_with_flags(self.flags),
            Source::SharedMemory(ref name) => {
                let uri = format!("file:{}?mode=memory&cache=shared", name);
                Connection::open_with_flags(uri, self.flags)
            }
        }
    }

    fn is_valid(&self, conn: &mut Connection) -> std::result::Result<(), Error> {
        conn.execute_batch("")
    }

    fn has_broken(&self, conn: &mut Connection) -> bool {
        self.is_valid(conn).is_err()
    }
}

///
/// Create a connection pool
/// cfg Configuration information
///
pub fn init_sqlite_pool(cfg: &DataSourceConfig, on_failure: AcquireFailureHandler) -> Result<SqlitePool, DatabaseError> {
    let manager = SqliteConnectionManager::new(cfg)?;
    let tuning = cfg.tuning();

    let pool = r2d2::Pool::builder()
        .connection_timeout(tuning.checkout_timeout)
        .min_idle(Some(tuning.min_pool_size))
        .max_size(tuning.max_pool_size)
        .error_handler(Box::new(on_failure))
        .build(manager)
        .map_err(|e| {
            DatabaseError::with_cause(ErrorKind::Provision, format!("Failed to create SQLite connection pool: {}", e), e)
        })?;

    // Testing connections
    let conn = pool.get().map_err(|e| {
        DatabaseError::with_cause(ErrorKind::Provision, format!("Failed to get connection from pool: {}", e), e)
    })?;

    conn.execute_batch("SELECT 1").map_err(|e| {
        DatabaseError::with_cause(ErrorKind::Provision, format!("SQLite connection test failed: {}", e), e)
    })?;

    tracing::info!("SQLite connection pool initialized on {}", redact_url(cfg.url()));
    Ok(pool)
}
