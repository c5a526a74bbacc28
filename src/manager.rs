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
//! Pool lifecycle: provisioning, drift detection and teardown.
//!
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Local};

use crate::config::{redact_url, DataSourceConfig, Properties};
use crate::errors::{DatabaseError, ErrorKind, Result};
use crate::pool::{DataSource, DataSourceFactory, PoolStatus};

/// A source together with the configuration it was built from. Published as
/// one value so readers never see one without the other.
pub struct Provisioned<S> {
    source: Arc<S>,
    config: DataSourceConfig,
    provisioned_at: DateTime<Local>,
}

impl<S> Provisioned<S> {
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    pub fn config(&self) -> &DataSourceConfig {
        &self.config
    }

    pub fn provisioned_at(&self) -> DateTime<Local> {
        self.provisioned_at
    }
}

/// What a provisioning check did.
#[derive(Debug)]
pub enum ProvisionOutcome {
    /// A required key is missing; nothing was touched.
    NotConfigured,
    /// The current source already matches the configuration.
    Unchanged,
    /// First source built.
    Created,
    /// The configuration drifted, or the source broke, and it was replaced.
    Reconfigured,
    /// Building the source failed; the manager is now unprovisioned.
    Failed(DatabaseError),
}

impl ProvisionOutcome {
    /// Whether a usable source is in place after the check.
    pub fn is_ready(&self) -> bool {
        matches!(self, ProvisionOutcome::Unchanged | ProvisionOutcome::Created | ProvisionOutcome::Reconfigured)
    }
}

/// A connection on loan, paired with the source it must go back to.
pub struct Checkout<S: DataSource> {
    conn: S::Connection,
    origin: Arc<S>,
}

impl<S: DataSource> Checkout<S> {
    pub(crate) fn from_parts(conn: S::Connection, origin: Arc<S>) -> Self {
        Checkout { conn, origin }
    }

    pub fn connection(&self) -> &S::Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut S::Connection {
        &mut self.conn
    }

    pub fn origin(&self) -> &Arc<S> {
        &self.origin
    }

    pub fn into_parts(self) -> (S::Connection, Arc<S>) {
        (self.conn, self.origin)
    }
}

/// Owns at most one live [`DataSource`] and replaces it when the
/// configuration drifts.
pub struct PoolManager<F: DataSourceFactory> {
    factory: F,
    current: RwLock<Option<Arc<Provisioned<F::Source>>>>,
    /// Serializes provisioning checks so one drift builds one source.
    provisioning: Mutex<()>,
}

impl<F: DataSourceFactory> fmt::Debug for PoolManager<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolManager")
            .field("config", &self.current_config())
            .finish()
    }
}

impl<F: DataSourceFactory> PoolManager<F> {
    pub fn new(factory: F) -> Self {
        PoolManager {
            factory,
            current: RwLock::new(None),
            provisioning: Mutex::new(()),
        }
    }

    /// Derive the datasource settings from `props` and build or replace the
    /// source if needed.
    pub fn ensure_provisioned(&self, props: &Properties) -> ProvisionOutcome {
        match DataSourceConfig::from_properties(props) {
            Some(candidate) => self.provision(candidate),
            None => ProvisionOutcome::NotConfigured,
        }
    }

    /// Provision from an already built snapshot.
    pub fn provision(&self, candidate: DataSourceConfig) -> ProvisionOutcome {
        let _guard = self.provisioning.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = self.snapshot();
        if let Some(ref current) = previous {
            if current.config == candidate {
                if current.source.is_usable() {
                    return ProvisionOutcome::Unchanged;
                }
                tracing::info!("The datasource is broken, rebuilding it ({})", redact_url(candidate.url()));
            }
        }
        match self.factory.create(&candidate) {
            Ok(source) => {
                let url = redact_url(candidate.url());
                self.publish(Some(Arc::new(Provisioned {
                    source: Arc::new(source),
                    config: candidate,
                    provisioned_at: Local::now(),
                })));
                if previous.is_some() {
                    tracing::info!("The database configuration changed, datasource replaced ({})", url);
                    ProvisionOutcome::Reconfigured
                } else {
                    tracing::info!("The database is ready ({})", url);
                    ProvisionOutcome::Created
                }
            }
            Err(e) => {
                tracing::debug!("Cannot provision datasource {}: {}", redact_url(candidate.url()), e);
                self.publish(None);
                ProvisionOutcome::Failed(e)
            }
        }
    }

    /// Check out a connection from the current source.
    pub fn acquire(&self) -> Result<Checkout<F::Source>> {
        let current = self.snapshot().ok_or_else(DatabaseError::not_configured)?;
        let conn = current.source.get_connection().map_err(|e| {
            DatabaseError::with_cause(
                ErrorKind::Acquire,
                format!("Cannot obtain a new connection ({})", e.message()),
                e,
            )
        })?;
        Ok(Checkout::from_parts(conn, current.source.clone()))
    }

    /// Return a connection to the pool it came from, which may no longer be
    /// the current one.
    pub fn release(&self, checkout: Checkout<F::Source>) -> Result<()> {
        let (conn, origin) = checkout.into_parts();
        origin.release(conn).map_err(|e| {
            DatabaseError::with_cause(
                ErrorKind::Release,
                format!("It's possible that the connection was not properly closed ({})", e.message()),
                e,
            )
        })
    }

    /// Drop the reference to the current source. Connections still out on
    /// loan stay usable and go back to their pool on release.
    pub fn shutdown(&self) -> bool {
        let _guard = self.provisioning.lock().unwrap_or_else(PoisonError::into_inner);
        let was_provisioned = self.publish(None).is_some();
        if was_provisioned {
            tracing::info!("Datasource shut down");
        }
        was_provisioned
    }

    pub fn snapshot(&self) -> Option<Arc<Provisioned<F::Source>>> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn is_provisioned(&self) -> bool {
        self.snapshot().is_some()
    }

    pub fn current_config(&self) -> Option<DataSourceConfig> {
        self.snapshot().map(|p| p.config.clone())
    }

    pub fn status(&self) -> Option<PoolStatus> {
        self.snapshot().map(|p| p.source.status())
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    fn publish(&self, next: Option<Arc<Provisioned<F::Source>>>) -> Option<Arc<Provisioned<F::Source>>> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *current, next)
    }
}
