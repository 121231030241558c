// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use serde::{Deserialize, Serialize};

/// Catalog names used when laying out continuous queries in the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContinuousQueryConfig {
    /// Catalog holding the materialized views, one schema per project.
    pub streaming_catalog: String,
    /// Catalog holding the raw tables ingested for each project.
    pub source_catalog: String,
    /// Catalog that ad-hoc validation reads historical data from.
    pub cold_storage_catalog: String,
}

impl Default for ContinuousQueryConfig {
    fn default() -> Self {
        ContinuousQueryConfig {
            streaming_catalog: "streaming".into(),
            source_catalog: "_source".into(),
            cold_storage_catalog: "cold_storage".into(),
        }
    }
}
