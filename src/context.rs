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
//! Hook for a higher-level persistence layer that owns its own connection.
//!
use std::fmt;
use std::sync::Arc;

use crate::errors::{DatabaseError, ErrorKind, Result};
use crate::registry::{ConnectionRef, UnitOfWorkId};

/// A persistence layer (an entity manager, a session) that may already hold
/// a connection for the unit of work. When it is enabled its connection wins
/// over the pool.
pub trait PersistenceContext<C>: Send + Sync {
    fn is_enabled(&self, unit: UnitOfWorkId) -> bool;

    /// The connection the context works with for `unit`.
    fn current_connection(&self, unit: UnitOfWorkId) -> Result<ConnectionRef<C>>;
}

/// The optional context consulted before the registry.
pub struct AlternateSource<C> {
    context: Option<Arc<dyn PersistenceContext<C>>>,
}

impl<C> Default for AlternateSource<C> {
    fn default() -> Self {
        AlternateSource { context: None }
    }
}

impl<C> Clone for AlternateSource<C> {
    fn clone(&self) -> Self {
        AlternateSource { context: self.context.clone() }
    }
}

impl<C> fmt::Debug for AlternateSource<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlternateSource")
            .field("installed", &self.is_installed())
            .finish()
    }
}

impl<C> AlternateSource<C> {
    pub fn new(context: Arc<dyn PersistenceContext<C>>) -> Self {
        AlternateSource { context: Some(context) }
    }

    pub fn is_installed(&self) -> bool {
        self.context.is_some()
    }

    /// `Some` when an enabled context supplies the connection for `unit`.
    pub fn active_connection(&self, unit: UnitOfWorkId) -> Result<Option<ConnectionRef<C>>> {
        match self.context {
            Some(ref context) if context.is_enabled(unit) => context
                .current_connection(unit)
                .map(Some)
                .map_err(|e| {
                    DatabaseError::with_cause(
                        ErrorKind::Acquire,
                        format!("Cannot obtain the persistence context connection ({})", e.message()),
                        e,
                    )
                }),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Session {
        enabled: AtomicBool,
        conn: ConnectionRef<&'static str>,
    }

    impl PersistenceContext<&'static str> for Session {
        fn is_enabled(&self, _unit: UnitOfWorkId) -> bool {
            self.enabled.load(Ordering::SeqCst)
        }

        fn current_connection(&self, _unit: UnitOfWorkId) -> Result<ConnectionRef<&'static str>> {
            Ok(self.conn.clone())
        }
    }

    #[test]
    fn only_enabled_context_supplies_connection() {
        let session = Arc::new(Session {
            enabled: AtomicBool::new(false),
            conn: ConnectionRef::new("session"),
        });
        let alternate = AlternateSource::new(session.clone());
        let unit = UnitOfWorkId::new();
        assert!(alternate.active_connection(unit).unwrap().is_none());

        session.enabled.store(true, Ordering::SeqCst);
        let conn = alternate.active_connection(unit).unwrap().unwrap();
        assert!(conn.ptr_eq(&session.conn));
    }

    #[test]
    fn absent_context_never_supplies() {
        let alternate: AlternateSource<()> = AlternateSource::default();
        assert!(!alternate.is_installed());
        assert!(alternate.active_connection(UnitOfWorkId::new()).unwrap().is_none());
    }
}
