// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Continuous queries.
//!
//! A continuous query is a named, project-scoped query that is materialized
//! as a view inside a remote SQL engine. The [`ContinuousQueryService`] owns
//! the lifecycle of those views: it rewrites the user's query so that every
//! table reference points at a physical location, creates or drops the view
//! in the engine, and keeps the [`QueryMetadataStore`] in step with what the
//! engine confirmed.
//!
//! The engine and the metadata store are collaborators behind the
//! [`QueryExecutor`] and [`QueryMetadataStore`] traits. An in-memory store is
//! provided here; engine and store implementations that speak the Postgres
//! wire protocol live in `cq-postgres`.

pub mod config;
pub mod error;
pub mod executor;
pub mod metastore;
pub mod metrics;
pub mod service;
pub mod types;

pub use crate::config::ContinuousQueryConfig;
pub use crate::error::ContinuousQueryError;
pub use crate::executor::{QueryError, QueryExecution, QueryExecutor, QueryOutput, QueryResult, Row};
pub use crate::metastore::{MemoryMetadataStore, MetadataError, QueryMetadataStore};
pub use crate::metrics::Metrics;
pub use crate::service::ContinuousQueryService;
pub use crate::types::{ContinuousQuery, FieldType, SchemaField};
