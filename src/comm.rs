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
use serde::Serialize;

/// A single cell of a result set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Nil,
    Bigint(i64),
    Double(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Bigint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v.as_str()),
            _ => None,
        }
    }
}

/// Result of [`execute_query`](crate::Database::execute_query): column names
/// plus the fully materialized rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Rows {
    pub columns: Vec<String>,
    pub data: Vec<Vec<Value>>,
}

impl Rows {
    pub fn new(columns: Vec<String>) -> Self {
        Rows {
            columns,
            data: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<Value>) {
        self.data.push(row)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at `row` in the named column.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;
        self.data.get(row).and_then(|r| r.get(index))
    }

    /// Rows as a list of `{column: value}` objects.
    pub fn to_json(&self) -> serde_json::Value {
        let records = self
            .data
            .iter()
            .map(|row| {
                let object = self
                    .columns
                    .iter()
                    .zip(row.iter())
                    .map(|(c, v)| (c.clone(), serde_json::to_value(v).unwrap_or(serde_json::Value::Null)))
                    .collect::<serde_json::Map<_, _>>();
                serde_json::Value::Object(object)
            })
            .collect::<Vec<_>>();
        serde_json::Value::Array(records)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lookup_by_column() {
        let mut rows = Rows::new(vec!["id".to_string(), "name".to_string()]);
        rows.push(vec![Value::Bigint(1), Value::Text("Jack".to_string())]);
        assert_eq!(rows.get(0, "name").and_then(Value::as_str), Some("Jack"));
        assert_eq!(rows.get(0, "missing"), None);
        assert_eq!(rows.get(1, "id"), None);
    }

    #[test]
    fn json_view() {
        let mut rows = Rows::new(vec!["id".to_string(), "note".to_string()]);
        rows.push(vec![Value::Bigint(7), Value::Nil]);
        assert_eq!(rows.to_json(), serde_json::json!([{ "id": 7, "note": null }]));
    }
}
