// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::BTreeMap;

use futures::future::join_all;
use tracing::{debug, instrument};

use crate::error::ContinuousQueryError;
use crate::executor::QueryExecution;
use crate::service::ContinuousQueryService;
use crate::types::SchemaField;

impl ContinuousQueryService {
    /// Discovers the output schema of every continuous query of `project`.
    ///
    /// Each view is probed with a zero-row query. All probes are submitted
    /// before any is awaited. Views whose probe fails are left out of the
    /// result.
    #[instrument(skip(self))]
    pub async fn get_schemas(
        &self,
        project: &str,
    ) -> Result<BTreeMap<String, Vec<SchemaField>>, ContinuousQueryError> {
        self.metrics
            .get_schemas
            .run_op(|| self.get_schemas_inner(project))
            .await
    }

    async fn get_schemas_inner(
        &self,
        project: &str,
    ) -> Result<BTreeMap<String, Vec<SchemaField>>, ContinuousQueryError> {
        let queries = self
            .store
            .get_continuous_queries(project)
            .await
            .map_err(ContinuousQueryError::Metadata)?;

        let (table_names, probes): (Vec<_>, Vec<_>) = queries
            .into_iter()
            .map(|query| {
                let probe = format!(
                    "SELECT * FROM {} LIMIT 0",
                    self.view_name(project, &query.table_name)
                );
                (query.table_name, self.executor.execute_raw_query(probe))
            })
            .unzip();
        debug!(probes = probes.len(), "submitted schema probes");
        let results = join_all(probes.into_iter().map(QueryExecution::result)).await;

        let mut schemas = BTreeMap::new();
        for (table_name, result) in table_names.into_iter().zip(results) {
            match result {
                Ok(output) => {
                    schemas.insert(table_name, output.metadata);
                }
                Err(err) => {
                    debug!(%table_name, %err, "schema probe failed");
                    self.metrics.probes_dropped.inc();
                }
            }
        }
        Ok(schemas)
    }
}
