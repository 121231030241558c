// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use cq_continuous_query::FieldType;
use tokio_postgres::types::{Kind, Type};

/// Maps a Postgres type onto the field type reported to users.
///
/// Domains resolve to their base type. Types without a counterpart are
/// reported as strings, which is how their values come back over the simple
/// query protocol anyway.
pub fn field_type(ty: &Type) -> FieldType {
    match ty.kind() {
        Kind::Array(element) => return FieldType::Array(Box::new(field_type(element))),
        Kind::Domain(base) => return field_type(base),
        _ => {}
    }
    match ty.name() {
        "bool" => FieldType::Boolean,
        "int2" | "int4" => FieldType::Integer,
        "int8" | "oid" | "uint4" | "uint8" => FieldType::Long,
        "float4" | "float8" => FieldType::Double,
        "numeric" => FieldType::Decimal,
        "date" => FieldType::Date,
        "time" | "timetz" => FieldType::Time,
        "timestamp" | "timestamptz" => FieldType::Timestamp,
        "bytea" => FieldType::Binary,
        // Materialize's `map[text => T]`. The value type is not exposed.
        "map" => FieldType::Map(Box::new(FieldType::String)),
        _ => FieldType::String,
    }
}
