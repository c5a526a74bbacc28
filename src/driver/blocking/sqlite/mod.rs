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
//! SQLite modules.
//!

mod connection;

pub use connection::*;

use rusqlite::types::Value as SqliteValue;

use crate::comm::{Rows, Value};
use crate::driver::blocking::DbExecutor;
use crate::errors::{DatabaseError, Result};

impl DbExecutor for SqliteConnection {
    fn execute(&mut self, sql: &str) -> Result<bool> {
        let mut stmt = self.prepare(sql)?;
        if stmt.column_count() > 0 {
            // Step once so the statement actually runs.
            let mut rows = stmt.query([])?;
            rows.next()?;
            Ok(true)
        } else {
            stmt.execute([])?;
            Ok(false)
        }
    }

    fn query(&mut self, sql: &str) -> Result<Rows> {
        let mut stmt = self.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(ToString::to_string).collect();
        let column_count = columns.len();
        let mut records = Rows::new(columns);
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let mut record = Vec::with_capacity(column_count);
            for i in 0..column_count {
                let raw: SqliteValue = row.get(i)?;
                record.push(to_value(raw));
            }
            records.push(record);
        }
        Ok(records)
    }
}

fn to_value(raw: SqliteValue) -> Value {
    match raw {
        SqliteValue::Null => Value::Nil,
        SqliteValue::Integer(v) => Value::Bigint(v),
        SqliteValue::Real(v) => Value::Double(v),
        SqliteValue::Text(v) => Value::Text(v),
        SqliteValue::Blob(v) => Value::Blob(v),
    }
}

/// Roll back a transaction the caller left open so the next borrower starts
/// from a clean session.
pub(crate) fn reset_session(conn: &SqliteConnection) -> Result<()> {
    if !conn.is_autocommit() {
        tracing::warn!("Connection returned with an open transaction, rolling back");
        conn.execute_batch("ROLLBACK").map_err(|e| {
            DatabaseError::execute(e)
        })?;
    }
    Ok(())
}
