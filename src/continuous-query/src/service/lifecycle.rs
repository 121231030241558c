// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Creating and dropping continuous query views.
//!
//! The engine is always asked first. The metadata store only records what
//! the engine confirmed, so a failed create leaves nothing behind and a
//! failed drop leaves the definition in place.

use cq_sql_rewrite::{RewriteContext, parse_query, rewrite_query};
use tracing::{debug, error, info, instrument, warn};

use crate::error::ContinuousQueryError;
use crate::service::ContinuousQueryService;
use crate::types::ContinuousQuery;

impl ContinuousQueryService {
    /// Materializes `query` as a view and records its definition.
    #[instrument(skip_all, fields(project = %query.project, table_name = %query.table_name))]
    pub async fn create(&self, query: &ContinuousQuery) -> Result<(), ContinuousQueryError> {
        self.metrics.create.run_op(|| self.create_inner(query)).await
    }

    async fn create_inner(&self, query: &ContinuousQuery) -> Result<(), ContinuousQueryError> {
        let ast = parse_query(&query.query)?;
        let cx = RewriteContext::project_local(
            &query.project,
            &self.config.source_catalog,
            &*self.executor,
        );
        let rewritten = rewrite_query(&ast, &cx)?;
        let ddl = format!(
            "CREATE VIEW {} AS {}",
            self.view_name(&query.project, &query.table_name),
            rewritten
        );
        debug!(%ddl, "creating view");

        if let Err(err) = self.executor.execute_raw_query(ddl).result().await {
            warn!(%err, "engine failed to create view");
            return Err(err.into());
        }

        self.store
            .create_continuous_query(query)
            .await
            .map_err(|source| {
                error!(%source, "view was created but its definition was not persisted");
                ContinuousQueryError::Persistence {
                    operation: "create",
                    source,
                }
            })?;
        info!("created continuous query");
        Ok(())
    }

    /// Drops the view backing a continuous query and forgets its definition.
    ///
    /// Returns `false`, leaving the definition in place, if the engine failed
    /// to drop the view.
    #[instrument(skip(self))]
    pub async fn delete(
        &self,
        project: &str,
        table_name: &str,
    ) -> Result<bool, ContinuousQueryError> {
        self.metrics
            .delete
            .run_op(|| self.delete_inner(project, table_name))
            .await
    }

    async fn delete_inner(
        &self,
        project: &str,
        table_name: &str,
    ) -> Result<bool, ContinuousQueryError> {
        let query = self
            .store
            .get_continuous_query(project, table_name)
            .await
            .map_err(ContinuousQueryError::Metadata)?
            .ok_or_else(|| ContinuousQueryError::NotFound {
                project: project.to_owned(),
                table_name: table_name.to_owned(),
            })?;

        let ddl = format!(
            "DROP VIEW {}",
            self.view_name(&query.project, &query.table_name)
        );
        debug!(%ddl, "dropping view");
        if let Err(err) = self.executor.execute_raw_query(ddl).result().await {
            warn!(%err, "engine failed to drop view");
            return Ok(false);
        }

        self.store
            .delete_continuous_query(&query.project, &query.table_name)
            .await
            .map_err(|source| {
                error!(%source, "view was dropped but its definition was not removed");
                ContinuousQueryError::Persistence {
                    operation: "delete",
                    source,
                }
            })?;
        info!("deleted continuous query");
        Ok(true)
    }
}
