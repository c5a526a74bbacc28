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
//! Common Errors.
//!
use std::fmt;

pub type Result<T> = std::result::Result<T, DatabaseError>;

/// What went wrong, for callers that want to branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No datasource has been provisioned.
    NotConfigured,
    /// The pooled source could not be constructed.
    Provision,
    /// A connection could not be checked out.
    Acquire,
    /// A connection could not be handed back to its pool.
    Release,
    /// The handle was used after its connection went back to the pool.
    Released,
    /// The connection was reached again from inside a call already using it.
    InUse,
    /// A statement failed.
    Execute,
    UnsupportedDriver,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotConfigured => "NotConfigured",
            ErrorKind::Provision => "Provision",
            ErrorKind::Acquire => "Acquire",
            ErrorKind::Release => "Release",
            ErrorKind::Released => "Released",
            ErrorKind::InUse => "InUse",
            ErrorKind::Execute => "Execute",
            ErrorKind::UnsupportedDriver => "UnsupportedDriver",
            ErrorKind::Config => "Config",
        };
        f.write_str(name)
    }
}

/// The single error surfaced by the datasource layer: a readable message plus
/// the original cause when there is one.
#[derive(Debug)]
pub struct DatabaseError {
    kind: ErrorKind,
    message: String,
    cause: Option<anyhow::Error>,
}

impl DatabaseError {
    pub fn new<M: Into<String>>(kind: ErrorKind, message: M) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause<M, E>(kind: ErrorKind, message: M, cause: E) -> Self
    where
        M: Into<String>,
        E: Into<anyhow::Error>,
    {
        Self {
            kind,
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    pub fn not_configured() -> Self {
        Self::new(ErrorKind::NotConfigured, "no datasource configured")
    }

    pub fn released() -> Self {
        Self::new(ErrorKind::Released, "connection has already been released to the pool")
    }

    pub fn in_use() -> Self {
        Self::new(ErrorKind::InUse, "connection is already in use by this thread")
    }

    /// Wrap a driver failure that happened while running a statement. The
    /// message is the driver's own.
    pub fn execute<E>(cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::with_cause(ErrorKind::Execute, cause.to_string(), cause)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&anyhow::Error> {
        self.cause.as_ref()
    }

    /// Re-tag an error, keeping message and cause.
    pub(crate) fn into_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::error::Error for DatabaseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<r2d2::Error> for DatabaseError {
    fn from(err: r2d2::Error) -> Self {
        DatabaseError::with_cause(ErrorKind::Acquire, err.to_string(), err)
    }
}

#[cfg(feature = "sqlite-sync")]
impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        DatabaseError::execute(err)
    }
}

#[cfg(feature = "mysql-sync")]
impl From<mysql::Error> for DatabaseError {
    fn from(err: mysql::Error) -> Self {
        DatabaseError::execute(err)
    }
}
