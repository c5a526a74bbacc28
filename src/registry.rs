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
//! One connection per unit of work.
//!
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{DatabaseError, Result};
use crate::manager::{Checkout, PoolManager};
use crate::pool::{ConnectionOf, DataSource, DataSourceFactory};

/// Identifies one unit of work (a request, a job). Every call made with the
/// same id sees the same connection until the unit is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitOfWorkId(Uuid);

thread_local! {
    static THREAD_UNIT: UnitOfWorkId = UnitOfWorkId::new();
}

impl UnitOfWorkId {
    pub fn new() -> Self {
        UnitOfWorkId(Uuid::new_v4())
    }

    /// The id bound to the calling thread, for thread-per-request callers.
    pub fn current() -> Self {
        THREAD_UNIT.with(|id| *id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UnitOfWorkId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for UnitOfWorkId {
    fn from(id: Uuid) -> Self {
        UnitOfWorkId(id)
    }
}

impl fmt::Display for UnitOfWorkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_THREAD_TOKEN: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_TOKEN: u64 = NEXT_THREAD_TOKEN.fetch_add(1, Ordering::Relaxed);
}

fn thread_token() -> u64 {
    THREAD_TOKEN.with(|token| *token)
}

struct ScopedConnection<C> {
    id: u64,
    conn: Mutex<Option<C>>,
    /// Token of the thread inside [`ConnectionRef::with`], 0 when idle.
    holder: AtomicU64,
}

/// Clears the holder mark, also when the closure panics.
struct HolderMark<'a>(&'a AtomicU64);

impl Drop for HolderMark<'_> {
    fn drop(&mut self) {
        self.0.store(0, Ordering::Release);
    }
}

/// Shared handle to the connection bound to a unit of work. Clones point at
/// the same physical connection; once the unit is closed every clone reports
/// [`ErrorKind::Released`](crate::errors::ErrorKind::Released).
pub struct ConnectionRef<C> {
    inner: Arc<ScopedConnection<C>>,
}

impl<C> Clone for ConnectionRef<C> {
    fn clone(&self) -> Self {
        ConnectionRef { inner: self.inner.clone() }
    }
}

impl<C> fmt::Debug for ConnectionRef<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRef")
            .field("id", &self.inner.id)
            .field("released", &self.is_released())
            .finish()
    }
}

impl<C> ConnectionRef<C> {
    /// Wrap a connection owned elsewhere, e.g. by a persistence context.
    pub fn new(conn: C) -> Self {
        ConnectionRef {
            inner: Arc::new(ScopedConnection {
                id: NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed),
                conn: Mutex::new(Some(conn)),
                holder: AtomicU64::new(0),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Whether both handles refer to the same connection.
    pub fn ptr_eq(&self, other: &ConnectionRef<C>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn is_released(&self) -> bool {
        !self.held_here() && self.slot().is_none()
    }

    /// Run `f` against the connection.
    ///
    /// Other threads using the same connection wait for `f` to return. Reaching
    /// the connection again from inside `f` (another `with`, a statement on the
    /// same unit, closing the unit) fails with
    /// [`ErrorKind::InUse`](crate::errors::ErrorKind::InUse).
    pub fn with<R, FN>(&self, f: FN) -> Result<R>
    where
        FN: FnOnce(&mut C) -> Result<R>,
    {
        if self.held_here() {
            return Err(DatabaseError::in_use());
        }
        let mut slot = self.slot();
        self.inner.holder.store(thread_token(), Ordering::Release);
        let _mark = HolderMark(&self.inner.holder);
        match slot.as_mut() {
            Some(conn) => f(conn),
            None => Err(DatabaseError::released()),
        }
    }

    /// Detach the connection. `Ok(None)` once it is gone already.
    pub(crate) fn take(&self) -> Result<Option<C>> {
        if self.held_here() {
            return Err(DatabaseError::in_use());
        }
        Ok(self.slot().take())
    }

    fn held_here(&self) -> bool {
        self.inner.holder.load(Ordering::Acquire) == thread_token()
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<C>> {
        self.inner.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct Bound<S: DataSource> {
    handle: ConnectionRef<S::Connection>,
    origin: Arc<S>,
}

impl<S: DataSource> Bound<S> {
    fn into_checkout(self) -> Result<Option<Checkout<S>>> {
        let conn = self.handle.take()?;
        Ok(conn.map(|conn| Checkout::from_parts(conn, self.origin)))
    }
}

/// Binds pooled connections to units of work.
pub struct ScopedConnectionRegistry<F: DataSourceFactory> {
    manager: Arc<PoolManager<F>>,
    bound: DashMap<UnitOfWorkId, Bound<F::Source>>,
}

impl<F: DataSourceFactory> fmt::Debug for ScopedConnectionRegistry<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedConnectionRegistry")
            .field("bound", &self.bound.len())
            .finish()
    }
}

impl<F: DataSourceFactory> ScopedConnectionRegistry<F> {
    pub fn new(manager: Arc<PoolManager<F>>) -> Self {
        ScopedConnectionRegistry {
            manager,
            bound: DashMap::new(),
        }
    }

    /// The connection bound to `unit`, checking one out on first use.
    pub fn get_or_acquire(&self, unit: UnitOfWorkId) -> Result<ConnectionRef<ConnectionOf<F>>> {
        if let Some(existing) = self.bound.get(&unit) {
            return Ok(existing.handle.clone());
        }
        // Never hold a shard lock across a pool checkout.
        let (conn, origin) = self.manager.acquire()?.into_parts();
        let fresh = Bound {
            handle: ConnectionRef::new(conn),
            origin,
        };
        match self.bound.entry(unit) {
            Entry::Occupied(existing) => {
                let handle = existing.get().handle.clone();
                drop(existing);
                if let Ok(Some(checkout)) = fresh.into_checkout() {
                    if let Err(e) = self.manager.release(checkout) {
                        tracing::warn!("Failed to return a surplus connection for {}: {}", unit, e);
                    }
                }
                Ok(handle)
            }
            Entry::Vacant(slot) => {
                let handle = fresh.handle.clone();
                slot.insert(fresh);
                tracing::trace!("Bound connection {} to {}", handle.id(), unit);
                Ok(handle)
            }
        }
    }

    /// Give the unit's connection back to the pool it came from. A unit with
    /// nothing bound is a no-op. Closing a unit from inside
    /// [`ConnectionRef::with`] on its own connection fails with
    /// [`ErrorKind::InUse`](crate::errors::ErrorKind::InUse) and leaves the
    /// binding in place.
    pub fn release(&self, unit: UnitOfWorkId) -> Result<()> {
        let bound = match self.bound.remove(&unit) {
            Some((_, bound)) => bound,
            None => return Ok(()),
        };
        let conn = match bound.handle.take() {
            Ok(conn) => conn,
            Err(e) => {
                self.bound.insert(unit, bound);
                return Err(e);
            }
        };
        match conn {
            Some(conn) => {
                tracing::trace!("Releasing connection for {}", unit);
                self.manager.release(Checkout::from_parts(conn, bound.origin))
            }
            None => Ok(()),
        }
    }

    pub fn contains(&self, unit: UnitOfWorkId) -> bool {
        self.bound.contains_key(&unit)
    }

    /// Number of units currently holding a connection.
    pub fn len(&self) -> usize {
        self.bound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }
}
