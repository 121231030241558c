// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The interface to the SQL engine that hosts continuous queries.

use std::fmt;
use std::future::Future;

use cq_sql_rewrite::TableReferenceFormatter;
use futures::FutureExt;
use futures::future::{self, BoxFuture};

use crate::types::SchemaField;

/// A row of textual values. `None` is SQL `NULL`.
pub type Row = Vec<Option<String>>;

/// What the engine returns for a successful statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOutput {
    /// The statement's output columns. Empty for DDL.
    pub metadata: Vec<SchemaField>,
    pub rows: Vec<Row>,
}

/// A statement the engine refused or failed to run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct QueryError {
    pub message: String,
    /// The SQLSTATE code, when the engine reports one.
    pub sql_state: Option<String>,
}

impl QueryError {
    pub fn new(message: impl Into<String>) -> QueryError {
        QueryError {
            message: message.into(),
            sql_state: None,
        }
    }
}

pub type QueryResult = Result<QueryOutput, QueryError>;

/// A statement submitted to the engine.
///
/// Submission does not wait for the engine; the outcome is awaited later
/// through [`QueryExecution::result`]. Dropping an execution does not cancel
/// the statement.
pub struct QueryExecution {
    query: String,
    result: BoxFuture<'static, QueryResult>,
}

impl fmt::Debug for QueryExecution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryExecution")
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

impl QueryExecution {
    /// Starts running `fut` on the current tokio runtime right away.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(query: impl Into<String>, fut: F) -> QueryExecution
    where
        F: Future<Output = QueryResult> + Send + 'static,
    {
        let handle = tokio::spawn(fut);
        QueryExecution {
            query: query.into(),
            result: async move {
                match handle.await {
                    Ok(result) => result,
                    Err(err) => Err(QueryError::new(format!("query task failed: {err}"))),
                }
            }
            .boxed(),
        }
    }

    /// An execution whose outcome is already known.
    pub fn ready(query: impl Into<String>, result: QueryResult) -> QueryExecution {
        QueryExecution {
            query: query.into(),
            result: future::ready(result).boxed(),
        }
    }

    /// The statement text as submitted.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Waits for the engine to finish the statement.
    pub async fn result(self) -> QueryResult {
        self.result.await
    }
}

/// A SQL engine able to run raw statements.
///
/// The engine also knows its own catalog layout, and therefore formats the
/// table references the query rewriter does not handle itself.
pub trait QueryExecutor: TableReferenceFormatter {
    /// Submits `query` for execution without waiting for it to finish.
    fn execute_raw_query(&self, query: String) -> QueryExecution;
}
