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

pub mod blocking;

use serde::Serialize;

use crate::config::DataSourceConfig;
use crate::errors::Result;

/// Connection pool state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    pub size: usize,
    pub available: usize,
}

/// A pooled source of connections. The pooling itself (queueing, eviction,
/// health checks) is the implementor's business.
pub trait DataSource: Send + Sync + 'static {
    type Connection: Send + 'static;

    /// Check a connection out, waiting at most the configured checkout
    /// timeout.
    fn get_connection(&self) -> Result<Self::Connection>;

    /// Hand a connection back. Must tolerate being called for a connection
    /// whose pool has since been replaced.
    fn release(&self, conn: Self::Connection) -> Result<()>;

    /// The settings this source was built with.
    fn config(&self) -> &DataSourceConfig;

    fn status(&self) -> PoolStatus;

    /// `false` once the source can no longer hand out connections and has to
    /// be rebuilt, even though its settings are unchanged.
    fn is_usable(&self) -> bool {
        true
    }
}

/// Builds sources from a configuration snapshot. Swapped out in tests.
pub trait DataSourceFactory: Send + Sync + 'static {
    type Source: DataSource;

    fn create(&self, cfg: &DataSourceConfig) -> Result<Self::Source>;
}

/// Connection type handed out by the sources a factory builds.
pub type ConnectionOf<F> = <<F as DataSourceFactory>::Source as DataSource>::Connection;
