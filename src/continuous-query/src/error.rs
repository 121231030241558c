// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use cq_sql_rewrite::{ParseError, RewriteError};

use crate::executor::QueryError;
use crate::metastore::MetadataError;

/// Errors returned by [`ContinuousQueryService`](crate::ContinuousQueryService).
#[derive(Debug, thiserror::Error)]
pub enum ContinuousQueryError {
    /// The query text is not a single query.
    #[error("invalid query: {0}")]
    Parse(#[from] ParseError),
    /// A table reference has no physical location.
    #[error(transparent)]
    UnresolvableReference(#[from] RewriteError),
    /// The engine rejected or failed the statement.
    #[error("engine error: {0}")]
    EngineExecution(#[from] QueryError),
    #[error("continuous query {project}.{table_name} does not exist")]
    NotFound { project: String, table_name: String },
    /// The engine applied `operation` but the metadata store could not
    /// record it.
    #[error("{operation} succeeded in the engine but was not recorded: {source}")]
    Persistence {
        operation: &'static str,
        #[source]
        source: MetadataError,
    },
    /// The metadata store failed before the engine was involved.
    #[error(transparent)]
    Metadata(MetadataError),
}
