// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use cq_sql_rewrite::{RewriteContext, limit_zero, parse_query, qualify_query};
use tracing::{debug, instrument};

use crate::error::ContinuousQueryError;
use crate::service::ContinuousQueryService;
use crate::types::SchemaField;

impl ContinuousQueryService {
    /// Returns the output schema `query` would have, without registering it.
    ///
    /// Two-part references are read from the cold-storage catalog. The query
    /// is run with `LIMIT 0`, so no data is returned.
    #[instrument(skip(self))]
    pub async fn test(
        &self,
        project: &str,
        query: &str,
    ) -> Result<Vec<SchemaField>, ContinuousQueryError> {
        self.metrics
            .test
            .run_op(|| self.test_inner(project, query))
            .await
    }

    async fn test_inner(
        &self,
        project: &str,
        query: &str,
    ) -> Result<Vec<SchemaField>, ContinuousQueryError> {
        let mut ast = parse_query(query)?;
        let cx = RewriteContext::cold_storage(
            project,
            &self.config.source_catalog,
            &self.config.cold_storage_catalog,
            &*self.executor,
        );
        qualify_query(&mut ast, &cx)?;
        limit_zero(&mut ast);

        let probe = ast.to_string();
        debug!(%probe, "validating query");
        let output = self.executor.execute_raw_query(probe).result().await?;
        Ok(output.metadata)
    }
}
