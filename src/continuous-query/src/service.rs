// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The continuous query service.
//!
//! Operations are split by concern: `lifecycle` creates and drops views,
//! `discovery` probes the output schemas of registered views, and `validate`
//! checks a query against cold storage without registering it.

use std::sync::Arc;

use cq_sql_rewrite::ast::ObjectName;
use cq_sql_rewrite::names::qualified_name;
use tracing::instrument;

use crate::config::ContinuousQueryConfig;
use crate::error::ContinuousQueryError;
use crate::executor::QueryExecutor;
use crate::metastore::QueryMetadataStore;
use crate::metrics::Metrics;
use crate::types::ContinuousQuery;

mod discovery;
mod lifecycle;
mod validate;

/// Keeps continuous query views in the engine and their definitions in the
/// metadata store in step.
///
/// The service holds no state of its own beyond its collaborators, so it is
/// cheap to clone and safe to use from many tasks at once.
#[derive(Debug, Clone)]
pub struct ContinuousQueryService {
    config: ContinuousQueryConfig,
    executor: Arc<dyn QueryExecutor>,
    store: Arc<dyn QueryMetadataStore>,
    metrics: Arc<Metrics>,
}

impl ContinuousQueryService {
    pub fn new(
        config: ContinuousQueryConfig,
        executor: Arc<dyn QueryExecutor>,
        store: Arc<dyn QueryMetadataStore>,
        metrics: Arc<Metrics>,
    ) -> ContinuousQueryService {
        ContinuousQueryService {
            config,
            executor,
            store,
            metrics,
        }
    }

    pub fn config(&self) -> &ContinuousQueryConfig {
        &self.config
    }

    /// Returns every registered continuous query of `project`.
    #[instrument(level = "debug", skip(self))]
    pub async fn list(&self, project: &str) -> Result<Vec<ContinuousQuery>, ContinuousQueryError> {
        self.store
            .get_continuous_queries(project)
            .await
            .map_err(ContinuousQueryError::Metadata)
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn get(
        &self,
        project: &str,
        table_name: &str,
    ) -> Result<Option<ContinuousQuery>, ContinuousQueryError> {
        self.store
            .get_continuous_query(project, table_name)
            .await
            .map_err(ContinuousQueryError::Metadata)
    }

    /// The engine view backing a continuous query.
    fn view_name(&self, project: &str, table_name: &str) -> ObjectName {
        qualified_name(&self.config.streaming_catalog, project, table_name)
    }
}
