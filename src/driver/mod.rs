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
use std::str::FromStr;

use crate::errors::{DatabaseError, ErrorKind};

pub mod blocking;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverType {
    MySQL,
    Sqlite,
}

impl DriverType {
    pub fn name(&self) -> &'static str {
        match self {
            DriverType::MySQL => "mysql",
            DriverType::Sqlite => "sqlite",
        }
    }
}

impl FromStr for DriverType {
    type Err = DatabaseError;

    /// Accepts the short names as well as the JDBC driver class names people
    /// tend to carry over from older configuration files.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "sqlite" | "sqlite3" | "org.sqlite.JDBC" => Ok(DriverType::Sqlite),
            "mysql" | "com.mysql.jdbc.Driver" | "com.mysql.cj.jdbc.Driver" => Ok(DriverType::MySQL),
            other => Err(DatabaseError::new(
                ErrorKind::UnsupportedDriver,
                format!("Unknown database driver `{}`", other),
            )),
        }
    }
}
