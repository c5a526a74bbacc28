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
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use poolkeeper::prelude::*;
use poolkeeper::KEY_PASS;

mod common;
use common::*;

fn ready_database() -> (Database<MockFactory>, Arc<Counters>) {
    let (db, counters) = mock_database(mysql_properties());
    assert!(db.init().is_ready());
    (db, counters)
}

#[test]
fn same_unit_same_handle() {
    let (db, counters) = ready_database();
    let unit = UnitOfWorkId::new();
    let first = db.get_connection(unit).unwrap();
    let second = db.get_connection(unit).unwrap();
    assert!(first.ptr_eq(&second));
    assert_eq!(counters.acquired(), 1);

    let other = db.get_connection(UnitOfWorkId::new()).unwrap();
    assert!(!first.ptr_eq(&other));
    assert_eq!(counters.acquired(), 2);
    assert_eq!(db.registry().len(), 2);
}

#[test]
fn release_removes_entry_even_when_pool_refuses() {
    let (db, counters) = ready_database();
    let unit = UnitOfWorkId::new();
    let first = db.get_connection(unit).unwrap();

    counters.fail_release.store(true, Ordering::SeqCst);
    let err = db.close(unit).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Release);
    assert!(!db.registry().contains(unit));
    assert!(first.is_released());
    assert_eq!(first.with(|c| Ok(c.serial)).unwrap_err().kind(), ErrorKind::Released);

    counters.fail_release.store(false, Ordering::SeqCst);
    let next = db.get_connection(unit).unwrap();
    assert!(!next.ptr_eq(&first));
    assert_eq!(counters.acquired(), 2);
}

#[test]
fn reentrant_use_of_a_unit_fails_instead_of_blocking() {
    let (db, counters) = ready_database();
    let unit = db.unit_of_work();
    let conn = unit.connection().unwrap();

    let err = conn.with(|_| unit.execute("SELECT 1")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InUse);
    let err = conn.with(|_| db.close(unit.id())).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InUse);
    assert!(db.registry().contains(unit.id()));
    assert_eq!(counters.released(), 0);

    assert!(unit.execute("SELECT 1").unwrap());
    unit.finish().unwrap();
    assert!(conn.is_released());
    assert_eq!(counters.released(), 1);
}

#[test]
fn closing_an_idle_unit_is_a_noop() {
    let (db, counters) = ready_database();
    db.close(UnitOfWorkId::new()).unwrap();
    assert_eq!(counters.released(), 0);
}

#[test]
fn unit_of_work_releases_on_drop() {
    let (db, counters) = ready_database();
    let id = {
        let unit = db.unit_of_work();
        unit.execute("SELECT 1").unwrap();
        unit.execute("SELECT 2").unwrap();
        let statements = unit.connection().unwrap().with(|c| Ok(c.statements.len())).unwrap();
        assert_eq!(statements, 2);
        unit.id()
    };
    assert!(!db.registry().contains(id));
    assert_eq!(counters.acquired(), 1);
    assert_eq!(counters.released(), 1);
}

#[test]
fn finish_reports_release_failure() {
    let (db, counters) = ready_database();
    let unit = db.unit_of_work();
    unit.connection().unwrap();
    counters.fail_release.store(true, Ordering::SeqCst);
    assert_eq!(unit.finish().unwrap_err().kind(), ErrorKind::Release);
    assert!(db.registry().is_empty());
}

#[test]
fn scoped_releases_after_error() {
    let (db, counters) = ready_database();
    let err = db
        .scoped(|unit| {
            unit.execute("SELECT 1")?;
            unit.execute("FAIL here")
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Execute);
    assert_eq!(err.message(), "syntax error near FAIL");
    assert!(err.cause().is_some());
    assert_eq!(counters.released(), 1);
}

#[test]
fn execute_reports_result_sets() {
    let (db, _) = ready_database();
    let unit = db.unit_of_work();
    assert!(unit.execute("select now()").unwrap());
    assert!(!unit.execute("UPDATE t SET a = 1").unwrap());
    let rows = unit.execute_query("SELECT generation").unwrap();
    assert_eq!(rows.get(0, "generation").and_then(Value::as_i64), Some(1));
}

#[test]
fn unit_opened_before_reconfiguration_keeps_its_connection() {
    let (db, counters) = ready_database();
    let unit = db.unit_of_work();
    let before = unit.connection().unwrap();

    db.configure(|p| p.insert(KEY_PASS, "rotated"));
    assert!(matches!(db.init(), ProvisionOutcome::Reconfigured));

    let after = unit.connection().unwrap();
    assert!(before.ptr_eq(&after));
    assert_eq!(after.with(|c| Ok(c.generation)).unwrap(), 1);
    unit.finish().unwrap();

    let fresh = db.unit_of_work();
    assert_eq!(fresh.connection().unwrap().with(|c| Ok(c.generation)).unwrap(), 2);
    fresh.finish().unwrap();
    assert_eq!(counters.released(), 2);
}

#[test]
fn not_configured_database_refuses_connections() {
    let (db, _) = mock_database(Properties::new());
    assert!(matches!(db.init(), ProvisionOutcome::NotConfigured));
    let err = db.get_connection(UnitOfWorkId::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotConfigured);
}

#[test]
fn units_on_different_threads_get_different_connections() {
    let (db, counters) = ready_database();
    let db = Arc::new(db);
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let db = db.clone();
            std::thread::spawn(move || {
                let unit = UnitOfWorkId::current();
                let a = db.get_connection(unit).unwrap();
                let b = db.get_connection(unit).unwrap();
                assert!(a.ptr_eq(&b));
                let serial = a.with(|c| Ok(c.serial)).unwrap();
                db.close(unit).unwrap();
                serial
            })
        })
        .collect();
    let mut serials: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    serials.sort_unstable();
    serials.dedup();
    assert_eq!(serials.len(), 4);
    assert_eq!(counters.released(), 4);
}

struct Session {
    enabled: AtomicBool,
    conn: ConnectionRef<MockConnection>,
}

impl PersistenceContext<MockConnection> for Session {
    fn is_enabled(&self, _unit: UnitOfWorkId) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn current_connection(&self, _unit: UnitOfWorkId) -> Result<ConnectionRef<MockConnection>> {
        Ok(self.conn.clone())
    }
}

#[test]
fn enabled_persistence_context_bypasses_registry() {
    let session = Arc::new(Session {
        enabled: AtomicBool::new(true),
        conn: ConnectionRef::new(MockConnection { generation: 0, serial: 99, statements: Vec::new() }),
    });
    let (db, counters) = ready_database();
    let db = db.with_persistence_context(session.clone());

    let unit = UnitOfWorkId::new();
    let conn = db.get_connection(unit).unwrap();
    assert!(conn.ptr_eq(&session.conn));
    assert!(!db.registry().contains(unit));
    assert_eq!(counters.acquired(), 0);
    db.close(unit).unwrap();
    assert!(!session.conn.is_released());

    session.enabled.store(false, Ordering::SeqCst);
    let pooled = db.get_connection(unit).unwrap();
    assert!(!pooled.ptr_eq(&session.conn));
    assert!(db.registry().contains(unit));
}
