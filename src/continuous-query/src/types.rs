// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The continuous query data model.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A named query whose results are kept as a view in the engine.
///
/// `(project, table_name)` identifies a continuous query. Uniqueness is
/// enforced by the metadata store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuousQuery {
    pub project: String,
    pub table_name: String,
    /// Display name. Opaque to this crate, like `partition_keys`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// The query as written by the user, before any rewriting.
    pub query: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub partition_keys: Vec<String>,
    /// Opaque to this crate; stored and returned as given.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
    /// Output schema, if it has been discovered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Vec<SchemaField>>,
}

impl ContinuousQuery {
    pub fn new(
        project: impl Into<String>,
        table_name: impl Into<String>,
        query: impl Into<String>,
    ) -> ContinuousQuery {
        ContinuousQuery {
            project: project.into(),
            table_name: table_name.into(),
            name: String::new(),
            query: query.into(),
            partition_keys: Vec::new(),
            options: BTreeMap::new(),
            schema: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_partition_keys<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.partition_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

/// One column of a query's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl SchemaField {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> SchemaField {
        SchemaField {
            name: name.into(),
            field_type,
        }
    }
}

/// The semantic type of a column.
///
/// Written as `STRING`, `LONG`, ..., with compound types spelled
/// `ARRAY_<T>` and `MAP_<T>` (for maps, `T` is the value type).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Integer,
    Long,
    Double,
    Decimal,
    Boolean,
    Date,
    Time,
    Timestamp,
    Binary,
    Array(Box<FieldType>),
    Map(Box<FieldType>),
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::String => f.write_str("STRING"),
            FieldType::Integer => f.write_str("INTEGER"),
            FieldType::Long => f.write_str("LONG"),
            FieldType::Double => f.write_str("DOUBLE"),
            FieldType::Decimal => f.write_str("DECIMAL"),
            FieldType::Boolean => f.write_str("BOOLEAN"),
            FieldType::Date => f.write_str("DATE"),
            FieldType::Time => f.write_str("TIME"),
            FieldType::Timestamp => f.write_str("TIMESTAMP"),
            FieldType::Binary => f.write_str("BINARY"),
            FieldType::Array(element) => write!(f, "ARRAY_{element}"),
            FieldType::Map(value) => write!(f, "MAP_{value}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown field type: {0}")]
pub struct UnknownFieldType(String);

impl FromStr for FieldType {
    type Err = UnknownFieldType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(element) = s.strip_prefix("ARRAY_") {
            return Ok(FieldType::Array(Box::new(element.parse()?)));
        }
        if let Some(value) = s.strip_prefix("MAP_") {
            return Ok(FieldType::Map(Box::new(value.parse()?)));
        }
        match s {
            "STRING" => Ok(FieldType::String),
            "INTEGER" => Ok(FieldType::Integer),
            "LONG" => Ok(FieldType::Long),
            "DOUBLE" => Ok(FieldType::Double),
            "DECIMAL" => Ok(FieldType::Decimal),
            "BOOLEAN" => Ok(FieldType::Boolean),
            "DATE" => Ok(FieldType::Date),
            "TIME" => Ok(FieldType::Time),
            "TIMESTAMP" => Ok(FieldType::Timestamp),
            "BINARY" => Ok(FieldType::Binary),
            _ => Err(UnknownFieldType(s.to_owned())),
        }
    }
}

impl Serialize for FieldType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
