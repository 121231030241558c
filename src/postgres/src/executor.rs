// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::fmt;

use cq_continuous_query::{
    QueryError, QueryExecution, QueryExecutor, QueryOutput, QueryResult, Row, SchemaField,
};
use cq_sql_rewrite::ast::ObjectName;
use cq_sql_rewrite::{RewriteError, TableReferenceFormatter};
use deadpool_postgres::Pool;
use tokio_postgres::SimpleQueryMessage;
use tracing::debug;

use crate::format_query_error;
use crate::layout::CatalogLayout;
use crate::types::field_type;

/// Runs statements against a Postgres-wire engine.
///
/// Every statement is described first, which yields its output schema, and
/// then run over the simple query protocol, which yields its rows as text.
#[derive(Clone)]
pub struct PostgresQueryExecutor {
    pool: Pool,
    layout: CatalogLayout,
}

impl fmt::Debug for PostgresQueryExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresQueryExecutor")
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl PostgresQueryExecutor {
    pub fn new(pool: Pool, layout: CatalogLayout) -> PostgresQueryExecutor {
        PostgresQueryExecutor { pool, layout }
    }
}

impl TableReferenceFormatter for PostgresQueryExecutor {
    fn format_table_reference(
        &self,
        project: &str,
        name: &ObjectName,
    ) -> Result<ObjectName, RewriteError> {
        self.layout.format_table_reference(project, name)
    }
}

impl QueryExecutor for PostgresQueryExecutor {
    fn execute_raw_query(&self, query: String) -> QueryExecution {
        let pool = self.pool.clone();
        QueryExecution::spawn(query.clone(), async move { run(&pool, &query).await })
    }
}

async fn run(pool: &Pool, query: &str) -> QueryResult {
    let client = pool
        .get()
        .await
        .map_err(|e| QueryError::new(format!("failed to connect to engine: {e}")))?;

    let statement = client.prepare(query).await.map_err(query_error)?;
    let metadata = statement
        .columns()
        .iter()
        .map(|column| SchemaField::new(column.name(), field_type(column.type_())))
        .collect();

    let rows: Vec<Row> = client
        .simple_query(query)
        .await
        .map_err(query_error)?
        .into_iter()
        .filter_map(|message| match message {
            SimpleQueryMessage::Row(row) => Some(
                (0..row.len())
                    .map(|i| row.get(i).map(str::to_owned))
                    .collect(),
            ),
            _ => None,
        })
        .collect();
    debug!(rows = rows.len(), "query finished");

    Ok(QueryOutput { metadata, rows })
}

fn query_error(error: tokio_postgres::Error) -> QueryError {
    QueryError {
        message: format_query_error(&error),
        sql_state: error.code().map(|code| code.code().to_owned()),
    }
}
