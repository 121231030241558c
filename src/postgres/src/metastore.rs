// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Implementation of [QueryMetadataStore] backed by Postgres.

use std::fmt;

use anyhow::Context;
use async_trait::async_trait;
use cq_continuous_query::{ContinuousQuery, MetadataError, QueryMetadataStore};
use deadpool_postgres::{Object, Pool};
use tokio_postgres::Row;
use tokio_postgres::error::SqlState;
use tracing::info;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS continuous_queries (
    project text NOT NULL,
    table_name text NOT NULL,
    name text NOT NULL,
    query text NOT NULL,
    partition_keys text NOT NULL,
    options text NOT NULL,
    schema text,
    PRIMARY KEY (project, table_name)
)
";

/// Stores continuous query definitions in the `continuous_queries` table.
///
/// Partition keys, options and schemas are stored as JSON text.
#[derive(Clone)]
pub struct PostgresMetadataStore {
    pool: Pool,
}

impl fmt::Debug for PostgresMetadataStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresMetadataStore").finish_non_exhaustive()
    }
}

impl PostgresMetadataStore {
    /// Opens the store, creating its table if needed.
    pub async fn open(pool: Pool) -> Result<PostgresMetadataStore, anyhow::Error> {
        let client = pool.get().await.context("connecting to metadata store")?;
        client
            .batch_execute(SCHEMA)
            .await
            .context("creating continuous_queries table")?;
        info!("opened metadata store");
        Ok(PostgresMetadataStore { pool })
    }

    async fn client(&self) -> Result<Object, MetadataError> {
        let client = self
            .pool
            .get()
            .await
            .context("connecting to metadata store")?;
        Ok(client)
    }
}

fn storage(error: tokio_postgres::Error) -> MetadataError {
    MetadataError::Storage(error.into())
}

fn continuous_query(row: &Row) -> Result<ContinuousQuery, MetadataError> {
    let partition_keys: String = row.try_get("partition_keys").map_err(storage)?;
    let options: String = row.try_get("options").map_err(storage)?;
    let schema: Option<String> = row.try_get("schema").map_err(storage)?;
    Ok(ContinuousQuery {
        project: row.try_get("project").map_err(storage)?,
        table_name: row.try_get("table_name").map_err(storage)?,
        name: row.try_get("name").map_err(storage)?,
        query: row.try_get("query").map_err(storage)?,
        partition_keys: serde_json::from_str(&partition_keys).context("decoding partition keys")?,
        options: serde_json::from_str(&options).context("decoding options")?,
        schema: schema
            .map(|schema| serde_json::from_str(&schema))
            .transpose()
            .context("decoding schema")?,
    })
}

#[async_trait]
impl QueryMetadataStore for PostgresMetadataStore {
    async fn create_continuous_query(&self, query: &ContinuousQuery) -> Result<(), MetadataError> {
        let partition_keys =
            serde_json::to_string(&query.partition_keys).context("encoding partition keys")?;
        let options = serde_json::to_string(&query.options).context("encoding options")?;
        let schema = query
            .schema
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .context("encoding schema")?;
        let client = self.client().await?;
        let result = client
            .execute(
                "INSERT INTO continuous_queries
                 (project, table_name, name, query, partition_keys, options, schema)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
                &[
                    &query.project,
                    &query.table_name,
                    &query.name,
                    &query.query,
                    &partition_keys,
                    &options,
                    &schema,
                ],
            )
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(err) if err.code() == Some(&SqlState::UNIQUE_VIOLATION) => Err(
                MetadataError::already_exists(&query.project, &query.table_name),
            ),
            Err(err) => Err(storage(err)),
        }
    }

    async fn delete_continuous_query(
        &self,
        project: &str,
        table_name: &str,
    ) -> Result<(), MetadataError> {
        let client = self.client().await?;
        let deleted = client
            .execute(
                "DELETE FROM continuous_queries WHERE project = $1 AND table_name = $2",
                &[&project, &table_name],
            )
            .await
            .map_err(storage)?;
        if deleted == 0 {
            return Err(MetadataError::not_found(project, table_name));
        }
        Ok(())
    }

    async fn get_continuous_query(
        &self,
        project: &str,
        table_name: &str,
    ) -> Result<Option<ContinuousQuery>, MetadataError> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                "SELECT project, table_name, name, query, partition_keys, options, schema
                 FROM continuous_queries WHERE project = $1 AND table_name = $2",
                &[&project, &table_name],
            )
            .await
            .map_err(storage)?;
        row.as_ref().map(continuous_query).transpose()
    }

    async fn get_continuous_queries(
        &self,
        project: &str,
    ) -> Result<Vec<ContinuousQuery>, MetadataError> {
        let client = self.client().await?;
        let rows = client
            .query(
                "SELECT project, table_name, name, query, partition_keys, options, schema
                 FROM continuous_queries WHERE project = $1 ORDER BY table_name",
                &[&project],
            )
            .await
            .map_err(storage)?;
        rows.iter().map(continuous_query).collect()
    }
}
