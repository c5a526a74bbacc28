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

//!
//! Database
//!
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;

use crate::comm::Rows;
use crate::config::Properties;
use crate::context::{AlternateSource, PersistenceContext};
use crate::driver::blocking::DbExecutor;
use crate::errors::Result;
use crate::manager::{PoolManager, ProvisionOutcome};
use crate::pool::blocking::DBPoolFactory;
use crate::pool::{ConnectionOf, DataSourceFactory, PoolStatus};
use crate::registry::{ConnectionRef, ScopedConnectionRegistry, UnitOfWorkId};

static GLOBAL: Lazy<Database> = Lazy::new(|| Database::new(Properties::new()));

/// The process wide database, configured through [`Database::configure`] and
/// provisioned by [`Database::init`].
pub fn global() -> &'static Database {
    &GLOBAL
}

/// Entry point: application properties, the pool they describe and the
/// connections bound to units of work.
pub struct Database<F: DataSourceFactory = DBPoolFactory> {
    properties: RwLock<Properties>,
    manager: Arc<PoolManager<F>>,
    registry: ScopedConnectionRegistry<F>,
    alternate: AlternateSource<ConnectionOf<F>>,
}

impl<F: DataSourceFactory> fmt::Debug for Database<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("manager", &self.manager)
            .field("registry", &self.registry)
            .field("alternate", &self.alternate)
            .finish()
    }
}

impl Database<DBPoolFactory> {
    pub fn new(properties: Properties) -> Self {
        Self::with_factory(DBPoolFactory, properties)
    }
}

impl<F: DataSourceFactory> Database<F> {
    pub fn with_factory(factory: F, properties: Properties) -> Self {
        let manager = Arc::new(PoolManager::new(factory));
        Database {
            properties: RwLock::new(properties),
            registry: ScopedConnectionRegistry::new(manager.clone()),
            manager,
            alternate: AlternateSource::default(),
        }
    }

    /// Let a persistence layer supply connections while it is enabled.
    pub fn with_persistence_context(mut self, context: Arc<dyn PersistenceContext<ConnectionOf<F>>>) -> Self {
        self.alternate = AlternateSource::new(context);
        self
    }

    /// Edit the application properties. Takes effect on the next [`init`](Self::init).
    pub fn configure<R, FN>(&self, f: FN) -> R
    where
        FN: FnOnce(&mut Properties) -> R,
    {
        let mut properties = self.properties.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut properties)
    }

    pub fn properties(&self) -> Properties {
        self.properties.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Build the datasource, or replace it if the properties changed since
    /// the last call.
    pub fn init(&self) -> ProvisionOutcome {
        let properties = self.properties();
        self.manager.ensure_provisioned(&properties)
    }

    /// The connection for `unit`. An enabled persistence context wins;
    /// otherwise the same pooled connection is returned until the unit is closed.
    pub fn get_connection(&self, unit: UnitOfWorkId) -> Result<ConnectionRef<ConnectionOf<F>>> {
        if let Some(conn) = self.alternate.active_connection(unit)? {
            return Ok(conn);
        }
        self.registry.get_or_acquire(unit)
    }

    /// Release the connection bound to `unit`, if any.
    pub fn close(&self, unit: UnitOfWorkId) -> Result<()> {
        self.registry.release(unit)
    }

    /// Run a statement; `true` when it produced a result set.
    pub fn execute(&self, unit: UnitOfWorkId, sql: &str) -> Result<bool>
    where
        ConnectionOf<F>: DbExecutor,
    {
        tracing::debug!("[{}] execute: {}", unit, sql);
        self.get_connection(unit)?.with(|conn| conn.execute(sql))
    }

    pub fn execute_query(&self, unit: UnitOfWorkId, sql: &str) -> Result<Rows>
    where
        ConnectionOf<F>: DbExecutor,
    {
        tracing::debug!("[{}] query: {}", unit, sql);
        self.get_connection(unit)?.with(|conn| conn.query(sql))
    }

    /// A fresh unit of work whose connection is released when it drops.
    pub fn unit_of_work(&self) -> UnitOfWork<'_, F> {
        self.unit_of_work_for(UnitOfWorkId::new())
    }

    pub fn unit_of_work_for(&self, id: UnitOfWorkId) -> UnitOfWork<'_, F> {
        UnitOfWork {
            db: self,
            id,
            finished: false,
        }
    }

    /// Run `f` in its own unit of work and release the connection on every
    /// exit path. An error from `f` takes precedence over a release error.
    pub fn scoped<R, FN>(&self, f: FN) -> Result<R>
    where
        FN: FnOnce(&UnitOfWork<'_, F>) -> Result<R>,
    {
        let unit = self.unit_of_work();
        let result = f(&unit);
        let closed = unit.finish();
        let value = result?;
        closed?;
        Ok(value)
    }

    pub fn status(&self) -> Option<PoolStatus> {
        self.manager.status()
    }

    pub fn manager(&self) -> &PoolManager<F> {
        &self.manager
    }

    pub fn registry(&self) -> &ScopedConnectionRegistry<F> {
        &self.registry
    }

    /// Stop handing out new connections. Units still open keep theirs until
    /// they close.
    pub fn shutdown(&self) -> bool {
        self.manager.shutdown()
    }
}

/// Guard for one unit of work; releases its connection on drop.
pub struct UnitOfWork<'a, F: DataSourceFactory = DBPoolFactory> {
    db: &'a Database<F>,
    id: UnitOfWorkId,
    finished: bool,
}

impl<'a, F: DataSourceFactory> UnitOfWork<'a, F> {
    pub fn id(&self) -> UnitOfWorkId {
        self.id
    }

    pub fn connection(&self) -> Result<ConnectionRef<ConnectionOf<F>>> {
        self.db.get_connection(self.id)
    }

    pub fn execute(&self, sql: &str) -> Result<bool>
    where
        ConnectionOf<F>: DbExecutor,
    {
        self.db.execute(self.id, sql)
    }

    pub fn execute_query(&self, sql: &str) -> Result<Rows>
    where
        ConnectionOf<F>: DbExecutor,
    {
        self.db.execute_query(self.id, sql)
    }

    /// Release now and report the outcome.
    pub fn finish(mut self) -> Result<()> {
        self.finished = true;
        self.db.close(self.id)
    }
}

impl<'a, F: DataSourceFactory> fmt::Debug for UnitOfWork<'a, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitOfWork").field("id", &self.id).finish()
    }
}

impl<'a, F: DataSourceFactory> Drop for UnitOfWork<'a, F> {
    /// Will release the connection.
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.db.close(self.id) {
                tracing::warn!("Failed to release connection for {}: {}", self.id, e);
            }
        }
    }
}
