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
//! MySQL modules.
//!

mod connection;

pub use connection::*;

use mysql::prelude::Queryable;
use mysql::Value as MysqlValue;

use crate::comm::{Rows, Value};
use crate::driver::blocking::DbExecutor;
use crate::errors::Result;

impl DbExecutor for MysqlConnection {
    fn execute(&mut self, sql: &str) -> Result<bool> {
        let result = self.query_iter(sql)?;
        let has_rows = !result.columns().as_ref().is_empty();
        // Dropping the result drains whatever the server still sends.
        drop(result);
        Ok(has_rows)
    }

    fn query(&mut self, sql: &str) -> Result<Rows> {
        let mut result = self.query_iter(sql)?;
        let columns: Vec<String> = result
            .columns()
            .as_ref()
            .iter()
            .map(|c| c.name_str().to_string())
            .collect();
        let mut records = Rows::new(columns);
        for row in result.by_ref() {
            let row = row?;
            records.push(mysql::Row::unwrap(row).into_iter().map(to_value).collect());
        }
        Ok(records)
    }
}

fn to_value(raw: MysqlValue) -> Value {
    match raw {
        MysqlValue::NULL => Value::Nil,
        MysqlValue::Int(v) => Value::Bigint(v),
        MysqlValue::UInt(v) => match i64::try_from(v) {
            Ok(v) => Value::Bigint(v),
            Err(_) => Value::Text(v.to_string()),
        },
        MysqlValue::Float(v) => Value::Double(v as f64),
        MysqlValue::Double(v) => Value::Double(v),
        MysqlValue::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(text) => Value::Text(text),
            Err(e) => Value::Blob(e.into_bytes()),
        },
        other => Value::Text(other.as_sql(true).trim_matches('\'').to_string()),
    }
}
