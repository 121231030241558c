// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Continuous query collaborators that speak the Postgres wire protocol.
//!
//! [`PostgresQueryExecutor`] runs statements against any engine reachable
//! over pgwire (Materialize, for one) and [`PostgresMetadataStore`] keeps
//! definitions in a Postgres table. Both share connections through a
//! deadpool [`Pool`](deadpool_postgres::Pool), see [`create_pool`].

use std::str::FromStr;

use anyhow::{Context, anyhow};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::{Config, NoTls};

pub mod executor;
pub mod layout;
pub mod metastore;
pub mod types;

pub use crate::executor::PostgresQueryExecutor;
pub use crate::layout::CatalogLayout;
pub use crate::metastore::PostgresMetadataStore;

/// Builds a connection pool for `url`. No connection is made until one is
/// requested from the pool.
pub fn create_pool(url: &str, max_size: usize) -> Result<Pool, anyhow::Error> {
    let config = Config::from_str(url).context("invalid postgres url")?;
    let manager = Manager::from_config(
        config,
        NoTls,
        ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        },
    );
    Pool::builder(manager)
        .max_size(max_size)
        .build()
        .map_err(|e| anyhow!("failed to build connection pool: {e}"))
}

/// Renders a Postgres error with the details the server attached to it.
pub(crate) fn format_query_error(error: &tokio_postgres::Error) -> String {
    if let Some(db_error) = error.as_db_error() {
        let mut parts = vec![format!("database error: {}", db_error.message())];

        if let Some(detail) = db_error.detail() {
            parts.push(format!("  Detail: {}", detail));
        }

        if let Some(hint) = db_error.hint() {
            parts.push(format!("  Hint: {}", hint));
        }

        parts.push(format!("  Code: {}", db_error.code().code()));
        parts.join("\n")
    } else {
        format!("query error: {}", error)
    }
}
