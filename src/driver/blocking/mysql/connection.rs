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
use mysql::{Conn, Error, Opts, OptsBuilder};
use mysql::prelude::Queryable;

use crate::config::{redact_url, DataSourceConfig};
use crate::errors::{DatabaseError, ErrorKind};
use crate::pool::blocking::AcquireFailureHandler;

pub type MysqlPool = r2d2::Pool<MysqlConnectionManager>;
pub type MysqlConnection = r2d2::PooledConnection<MysqlConnectionManager>;

#[derive(Clone, Debug)]
pub struct MysqlConnectionManager {
    params: Opts,
}

impl MysqlConnectionManager {
    /// The url carries host, port and schema; user and password always come
    /// from their own keys.
    pub fn new(cfg: &DataSourceConfig) -> Result<Self, DatabaseError> {
        let opts = Opts::from_url(cfg.url()).map_err(|e| {
            DatabaseError::with_cause(
                ErrorKind::Config,
                format!("Invalid MySQL URL {}: {}", redact_url(cfg.url()), e),
                e,
            )
        })?;
        let builder = OptsBuilder::from_opts(opts)
            .user(Some(cfg.user()))
            .pass(Some(cfg.password()));
        Ok(Self {
            params: Opts::from(builder),
        })
    }
}

impl r2d2::ManageConnection for MysqlConnectionManager {
    type Connection = Conn;
    type Error = Error;

    fn connect(&self) -> std::result::Result<Conn, Error> {
        Conn::new(self.params.clone())
    }

    fn is_valid(&self, conn: &mut Conn) -> std::result::Result<(), Error> {
        match conn.ping() {
            Ok(_) => Ok(()),
            Err(_) => {
                conn.query_drop("SELECT 1").map_err(|e| {
                    tracing::warn!("Connection validation failed: {}", e);
                    e
                })
            }
        }
    }

    fn has_broken(&self, conn: &mut Conn) -> bool {
        conn.ping().is_err()
    }
}

///
/// Create a connection pool
///
/// cfg Configuration information
///
pub fn init_mysql_pool(cfg: &DataSourceConfig, on_failure: AcquireFailureHandler) -> Result<MysqlPool, DatabaseError> {
    let manager = MysqlConnectionManager::new(cfg)?;
    let tuning = cfg.tuning();

    let pool = r2d2::Pool::builder()
        .connection_timeout(tuning.checkout_timeout)
        .min_idle(Some(tuning.min_pool_size))
        .max_size(tuning.max_pool_size)
        .error_handler(Box::new(on_failure))
        .build(manager)
        .map_err(|e| {
            DatabaseError::with_cause(ErrorKind::Provision, format!("Failed to create MySQL connection pool: {}", e), e)
        })?;

    // Testing connections
    let mut conn = pool.get().map_err(|e| {
        DatabaseError::with_cause(ErrorKind::Provision, format!("Failed to get connection from pool: {}", e), e)
    })?;

    conn.query_drop("SELECT 1").map_err(|e| {
        DatabaseError::with_cause(ErrorKind::Provision, format!("MySQL connection test failed: {}", e), e)
    })?;

    tracing::info!("MySQL connection pool initialized on {}", redact_url(cfg.url()));
    Ok(pool)
}
