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
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use poolkeeper::prelude::*;

/// Shared counters, so a test can watch what the sources built by a factory did.
#[derive(Debug, Default)]
pub struct Counters {
    pub created: AtomicUsize,
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
    pub fail_create: AtomicBool,
    pub fail_acquire: AtomicBool,
    pub fail_release: AtomicBool,
    /// Every source built so far reports itself unusable while set.
    pub unusable: AtomicBool,
}

impl Counters {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct MockConnection {
    /// Which source (by creation order) handed this out.
    pub generation: usize,
    pub serial: usize,
    pub statements: Vec<String>,
}

impl DbExecutor for MockConnection {
    fn execute(&mut self, sql: &str) -> Result<bool> {
        if sql.starts_with("FAIL") {
            return Err(DatabaseError::execute(std::io::Error::new(
                std::io::ErrorKind::Other,
                "syntax error near FAIL",
            )));
        }
        self.statements.push(sql.to_string());
        Ok(sql.trim_start().to_ascii_uppercase().starts_with("SELECT"))
    }

    fn query(&mut self, sql: &str) -> Result<Rows> {
        self.execute(sql)?;
        let mut rows = Rows::new(vec!["generation".to_string(), "serial".to_string()]);
        rows.push(vec![Value::Bigint(self.generation as i64), Value::Bigint(self.serial as i64)]);
        Ok(rows)
    }
}

#[derive(Debug)]
pub struct MockSource {
    cfg: DataSourceConfig,
    generation: usize,
    next_serial: AtomicUsize,
    outstanding: AtomicUsize,
    counters: Arc<Counters>,
}

impl MockSource {
    pub fn generation(&self) -> usize {
        self.generation
    }
}

impl DataSource for MockSource {
    type Connection = MockConnection;

    fn get_connection(&self) -> Result<MockConnection> {
        if self.counters.fail_acquire.load(Ordering::SeqCst) {
            return Err(DatabaseError::new(ErrorKind::Acquire, "pool exhausted"));
        }
        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        Ok(MockConnection {
            generation: self.generation,
            serial: self.next_serial.fetch_add(1, Ordering::SeqCst),
            statements: Vec::new(),
        })
    }

    fn release(&self, conn: MockConnection) -> Result<()> {
        assert_eq!(conn.generation, self.generation, "connection returned to a foreign pool");
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
        if self.counters.fail_release.load(Ordering::SeqCst) {
            return Err(DatabaseError::new(ErrorKind::Release, "socket closed"));
        }
        self.counters.released.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn config(&self) -> &DataSourceConfig {
        &self.cfg
    }

    fn status(&self) -> PoolStatus {
        let outstanding = self.outstanding.load(Ordering::SeqCst);
        let size = self.cfg.tuning().max_pool_size as usize;
        PoolStatus { size, available: size.saturating_sub(outstanding) }
    }

    fn is_usable(&self) -> bool {
        !self.counters.unusable.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockFactory {
    pub counters: Arc<Counters>,
}

impl DataSourceFactory for MockFactory {
    type Source = MockSource;

    fn create(&self, cfg: &DataSourceConfig) -> Result<MockSource> {
        if self.counters.fail_create.load(Ordering::SeqCst) {
            return Err(DatabaseError::new(ErrorKind::Provision, "connection refused"));
        }
        let generation = self.counters.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(MockSource {
            cfg: cfg.clone(),
            generation,
            next_serial: AtomicUsize::new(0),
            outstanding: AtomicUsize::new(0),
            counters: self.counters.clone(),
        })
    }
}

pub fn mysql_properties() -> Properties {
    Properties::new()
        .set("db.driver", "mysql")
        .set("db.url", "mysql://localhost:3306/app")
        .set("db.user", "root")
        .set("db.pass", "secret")
}

pub fn mock_database(props: Properties) -> (Database<MockFactory>, Arc<Counters>) {
    let factory = MockFactory::default();
    let counters = factory.counters.clone();
    (Database::with_factory(factory, props), counters)
}
