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
use std::str::FromStr;
use std::time::Duration;

use indexmap::IndexMap;
use url::Url;

use crate::errors::{DatabaseError, ErrorKind, Result};

pub const KEY_DB: &str = "db";
pub const KEY_DRIVER: &str = "db.driver";
pub const KEY_URL: &str = "db.url";
pub const KEY_USER: &str = "db.user";
pub const KEY_PASS: &str = "db.pass";

pub const KEY_MIN_POOL_SIZE: &str = "db.pool.minSize";
pub const KEY_MAX_POOL_SIZE: &str = "db.pool.maxSize";
pub const KEY_CHECKOUT_TIMEOUT: &str = "db.pool.timeout";
pub const KEY_ACQUIRE_RETRY_ATTEMPTS: &str = "db.pool.acquireRetryAttempts";
pub const KEY_ACQUIRE_RETRY_DELAY: &str = "db.pool.acquireRetryDelay";
pub const KEY_BREAK_AFTER_ACQUIRE_FAILURE: &str = "db.pool.breakAfterAcquireFailure";

pub const EMBEDDED_DRIVER: &str = "sqlite";
pub const EMBEDDED_MEMORY_URL: &str = "sqlite:mem:embedded";
pub const EMBEDDED_USER: &str = "sa";
pub const EMBEDDED_PASSWORD: &str = "";

/// The process-wide configuration map the datasource is derived from.
///
/// Keys keep their insertion order so a dump of the configuration reads the
/// way it was written.
#[derive(Clone, Debug, Default)]
pub struct Properties {
    values: IndexMap<String, String>,
    application_path: Option<PathBuf>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) -> Option<String> {
        self.values.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.shift_remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Parse a typed value. Missing keys and unparsable values both yield
    /// `None`; the latter is logged.
    pub fn get_parsed<T: FromStr>(&self, key: &str) -> Option<T> {
        let raw = self.get(key)?;
        match raw.trim().parse::<T>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring malformed value `{}` for `{}`", raw, key);
                None
            }
        }
    }

    pub fn set_application_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.application_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Root directory the file-backed embedded database lives under. Falls
    /// back to the working directory; relative paths are resolved against it.
    pub fn application_path(&self) -> PathBuf {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        match self.application_path {
            Some(ref path) if path.is_absolute() => path.clone(),
            Some(ref path) => cwd.join(path),
            None => cwd,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut props = Properties::new();
        for (k, v) in iter {
            props.insert(k, v);
        }
        props
    }
}

/// Shorthand values for the `db` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// In-memory embedded database.
    Memory,
    /// Embedded database stored under the application path.
    File,
}

impl Preset {
    pub fn from_properties(props: &Properties) -> Option<Self> {
        match props.get(KEY_DB).map(str::trim) {
            Some("mem") => Some(Preset::Memory),
            Some("fs") => Some(Preset::File),
            _ => None,
        }
    }

    fn url(&self, props: &Properties) -> String {
        match self {
            Preset::Memory => EMBEDDED_MEMORY_URL.to_string(),
            Preset::File => {
                let path = props.application_path().join("db").join("db");
                format!("sqlite:{}", path.display())
            }
        }
    }
}

/// Pool sizing and acquisition behavior. Applied when a source is built;
/// never part of drift detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolTuning {
    pub min_pool_size: u32,
    pub max_pool_size: u32,
    pub checkout_timeout: Duration,
    pub acquire_retry_attempts: u32,
    pub acquire_retry_delay: Duration,
    pub break_after_acquire_failure: bool,
}

impl Default for PoolTuning {
    fn default() -> Self {
        PoolTuning {
            min_pool_size: 10,
            max_pool_size: 30,
            checkout_timeout: Duration::from_millis(1000),
            acquire_retry_attempts: 1,
            acquire_retry_delay: Duration::from_millis(0),
            break_after_acquire_failure: true,
        }
    }
}

impl PoolTuning {
    /// Reject settings the pool builder would refuse to work with.
    pub fn validate(&self) -> Result<()> {
        if self.max_pool_size == 0 {
            return Err(DatabaseError::new(ErrorKind::Config, "max pool size must be greater than zero"));
        }
        if self.min_pool_size > self.max_pool_size {
            return Err(DatabaseError::new(
                ErrorKind::Config,
                format!("min pool size {} exceeds max pool size {}", self.min_pool_size, self.max_pool_size),
            ));
        }
        if self.checkout_timeout.is_zero() {
            return Err(DatabaseError::new(ErrorKind::Config, "checkout timeout must be greater than zero"));
        }
        Ok(())
    }

    pub fn from_properties(props: &Properties) -> Self {
        let defaults = PoolTuning::default();
        PoolTuning {
            min_pool_size: props.get_parsed(KEY_MIN_POOL_SIZE).unwrap_or(defaults.min_pool_size),
            max_pool_size: props.get_parsed(KEY_MAX_POOL_SIZE).unwrap_or(defaults.max_pool_size),
            checkout_timeout: props
                .get_parsed::<u64>(KEY_CHECKOUT_TIMEOUT)
                .map(Duration::from_millis)
                .unwrap_or(defaults.checkout_timeout),
            acquire_retry_attempts: props
                .get_parsed(KEY_ACQUIRE_RETRY_ATTEMPTS)
                .unwrap_or(defaults.acquire_retry_attempts),
            acquire_retry_delay: props
                .get_parsed::<u64>(KEY_ACQUIRE_RETRY_DELAY)
                .map(Duration::from_millis)
                .unwrap_or(defaults.acquire_retry_delay),
            break_after_acquire_failure: props
                .get_parsed(KEY_BREAK_AFTER_ACQUIRE_FAILURE)
                .unwrap_or(defaults.break_after_acquire_failure),
        }
    }

    pub fn set_min_pool_size(mut self, min_pool_size: u32) -> Self {
        self.min_pool_size = min_pool_size;
        self
    }

    pub fn set_max_pool_size(mut self, max_pool_size: u32) -> Self {
        self.max_pool_size = max_pool_size;
        self
    }

    pub fn set_checkout_timeout(mut self, checkout_timeout: Duration) -> Self {
        self.checkout_timeout = checkout_timeout;
        self
    }

    pub fn set_acquire_retry_attempts(mut self, attempts: u32) -> Self {
        self.acquire_retry_attempts = attempts;
        self
    }

    pub fn set_acquire_retry_delay(mut self, delay: Duration) -> Self {
        self.acquire_retry_delay = delay;
        self
    }

    pub fn set_break_after_acquire_failure(mut self, brk: bool) -> Self {
        self.break_after_acquire_failure = brk;
        self
    }
}

/// Snapshot of the datasource settings taken from [`Properties`].
///
/// Equality only looks at driver, url, user and password: a change that only
/// touches [`PoolTuning`] does not count as drift.
#[derive(Clone)]
pub struct DataSourceConfig {
    driver: String,
    url: String,
    user: String,
    password: String,
    tuning: PoolTuning,
}

impl DataSourceConfig {
    pub fn new<D, U, N, P>(driver: D, url: U, user: N, password: P) -> Self
    where
        D: Into<String>,
        U: Into<String>,
        N: Into<String>,
        P: Into<String>,
    {
        DataSourceConfig {
            driver: driver.into(),
            url: url.into(),
            user: user.into(),
            password: password.into(),
            tuning: PoolTuning::default(),
        }
    }

    /// Build the candidate snapshot. Presets fill in whatever the explicit
    /// keys leave out; `None` means the datasource is not configured.
    pub fn from_properties(props: &Properties) -> Option<Self> {
        let preset = Preset::from_properties(props);
        let preset_url = preset.map(|p| p.url(props));
        let pick = |key: &str, fallback: Option<&str>| -> Option<String> {
            props
                .get(key)
                .or_else(|| preset.and(fallback))
                .map(ToString::to_string)
        };
        let driver = pick(KEY_DRIVER, Some(EMBEDDED_DRIVER))?;
        let url = pick(KEY_URL, preset_url.as_deref())?;
        let user = pick(KEY_USER, Some(EMBEDDED_USER))?;
        let password = pick(KEY_PASS, Some(EMBEDDED_PASSWORD))?;
        Some(DataSourceConfig {
            driver,
            url,
            user,
            password,
            tuning: PoolTuning::from_properties(props),
        })
    }

    pub fn with_tuning(mut self, tuning: PoolTuning) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn driver(&self) -> &str {
        &self.driver
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn tuning(&self) -> &PoolTuning {
        &self.tuning
    }
}

impl PartialEq for DataSourceConfig {
    fn eq(&self, other: &Self) -> bool {
        self.driver == other.driver
            && self.url == other.url
            && self.user == other.user
            && self.password == other.password
    }
}

impl Eq for DataSourceConfig {}

impl fmt::Debug for DataSourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSourceConfig")
            .field("driver", &self.driver)
            .field("url", &redact_url(&self.url))
            .field("user", &self.user)
            .field("password", &"******")
            .field("tuning", &self.tuning)
            .finish()
    }
}

/// Blank out the password part of a url so it can be logged.
pub fn redact_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) if url.password().is_some() => {
            if url.set_password(Some("******")).is_ok() {
                url.to_string()
            } else {
                raw.to_string()
            }
        }
        _ => raw.to_string(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn explicit() -> Properties {
        Properties::new()
            .set(KEY_DRIVER, "mysql")
            .set(KEY_URL, "mysql://localhost:3306/app")
            .set(KEY_USER, "root")
            .set(KEY_PASS, "secret")
    }

    #[test]
    fn missing_key_means_not_configured() {
        let mut props = explicit();
        props.remove(KEY_PASS);
        assert!(DataSourceConfig::from_properties(&props).is_none());
        assert!(DataSourceConfig::from_properties(&Properties::new()).is_none());
    }

    #[test]
    fn empty_password_is_still_configured() {
        let props = explicit().set(KEY_PASS, "");
        let cfg = DataSourceConfig::from_properties(&props).unwrap();
        assert_eq!(cfg.password(), "");
    }

    #[test]
    fn memory_preset_fills_every_key() {
        let props = Properties::new().set(KEY_DB, "mem");
        let cfg = DataSourceConfig::from_properties(&props).unwrap();
        assert_eq!(cfg, DataSourceConfig::new(EMBEDDED_DRIVER, EMBEDDED_MEMORY_URL, EMBEDDED_USER, EMBEDDED_PASSWORD));
        assert_eq!(cfg.user(), "sa");
        assert_eq!(cfg.password(), "");
    }

    #[test]
    fn relative_application_path_becomes_absolute() {
        let props = Properties::new().set(KEY_DB, "fs").set_application_path("app/data");
        assert!(props.application_path().is_absolute());
        assert!(props.application_path().ends_with("app/data"));

        let cfg = DataSourceConfig::from_properties(&props).unwrap();
        let file = cfg.url().trim_start_matches("sqlite:");
        assert!(std::path::Path::new(file).is_absolute());
        assert!(std::path::Path::new(file).ends_with("app/data/db/db"));
    }

    #[test]
    fn explicit_keys_override_preset() {
        let props = Properties::new().set(KEY_DB, "mem").set(KEY_USER, "admin");
        let cfg = DataSourceConfig::from_properties(&props).unwrap();
        assert_eq!(cfg.user(), "admin");
        assert_eq!(cfg.url(), EMBEDDED_MEMORY_URL);
    }

    #[test]
    fn file_preset_lives_under_application_path() {
        let props = Properties::new().set(KEY_DB, "fs").set_application_path("/srv/app");
        let cfg = DataSourceConfig::from_properties(&props).unwrap();
        let expected = format!("sqlite:{}", Path::new("/srv/app").join("db").join("db").display());
        assert_eq!(cfg.url(), expected);
        assert_eq!(cfg.driver(), EMBEDDED_DRIVER);
    }

    #[test]
    fn unknown_preset_is_ignored() {
        let props = Properties::new().set(KEY_DB, "cloud");
        assert!(Preset::from_properties(&props).is_none());
        assert!(DataSourceConfig::from_properties(&props).is_none());
    }

    #[test]
    fn equality_ignores_tuning() {
        let a = DataSourceConfig::from_properties(&explicit()).unwrap();
        let b = DataSourceConfig::from_properties(&explicit().set(KEY_MAX_POOL_SIZE, "5")).unwrap();
        assert_eq!(b.tuning().max_pool_size, 5);
        assert_eq!(a, b);

        let c = DataSourceConfig::from_properties(&explicit().set(KEY_PASS, "other")).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn tuning_defaults_and_malformed_values() {
        let tuning = PoolTuning::from_properties(&Properties::new());
        assert_eq!(tuning, PoolTuning::default());
        assert_eq!(tuning.checkout_timeout, Duration::from_millis(1000));

        let props = Properties::new()
            .set(KEY_MIN_POOL_SIZE, "two")
            .set(KEY_CHECKOUT_TIMEOUT, "250")
            .set(KEY_BREAK_AFTER_ACQUIRE_FAILURE, "false");
        let tuning = PoolTuning::from_properties(&props);
        assert_eq!(tuning.min_pool_size, 10);
        assert_eq!(tuning.checkout_timeout, Duration::from_millis(250));
        assert!(!tuning.break_after_acquire_failure);
    }

    #[test]
    fn invalid_tuning_is_rejected() {
        assert!(PoolTuning::default().validate().is_ok());
        let err = PoolTuning::default().set_min_pool_size(40).validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(PoolTuning::default().set_max_pool_size(0).set_min_pool_size(0).validate().is_err());
        assert!(PoolTuning::default().set_checkout_timeout(Duration::ZERO).validate().is_err());
    }

    #[test]
    fn debug_and_redaction_hide_password() {
        let cfg = DataSourceConfig::from_properties(&explicit()).unwrap();
        let printed = format!("{:?}", cfg);
        assert!(!printed.contains("secret"));

        assert_eq!(redact_url("mysql://root:hunter2@db:3306/app"), "mysql://root:******@db:3306/app");
        assert_eq!(redact_url("sqlite:mem:embedded"), "sqlite:mem:embedded");
    }

    #[test]
    fn properties_keep_insertion_order() {
        let props: Properties = vec![("b", "1"), ("a", "2")].into_iter().collect();
        let keys: Vec<&str> = props.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(props.len(), 2);
    }
}
