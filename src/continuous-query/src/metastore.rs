// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Persistence of continuous query definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::types::ContinuousQuery;

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("continuous query {project}.{table_name} already exists")]
    AlreadyExists { project: String, table_name: String },
    #[error("continuous query {project}.{table_name} does not exist")]
    NotFound { project: String, table_name: String },
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl MetadataError {
    pub fn already_exists(project: &str, table_name: &str) -> MetadataError {
        MetadataError::AlreadyExists {
            project: project.to_owned(),
            table_name: table_name.to_owned(),
        }
    }

    pub fn not_found(project: &str, table_name: &str) -> MetadataError {
        MetadataError::NotFound {
            project: project.to_owned(),
            table_name: table_name.to_owned(),
        }
    }
}

/// Durable storage for continuous query definitions.
///
/// Implementations must be safe to share between concurrent operations.
#[async_trait]
pub trait QueryMetadataStore: fmt::Debug + Send + Sync {
    /// Stores `query`. Fails with [`MetadataError::AlreadyExists`] if the
    /// project already has a query of that name.
    async fn create_continuous_query(&self, query: &ContinuousQuery) -> Result<(), MetadataError>;

    /// Removes a stored query. Fails with [`MetadataError::NotFound`] if
    /// there is none.
    async fn delete_continuous_query(
        &self,
        project: &str,
        table_name: &str,
    ) -> Result<(), MetadataError>;

    async fn get_continuous_query(
        &self,
        project: &str,
        table_name: &str,
    ) -> Result<Option<ContinuousQuery>, MetadataError>;

    /// Returns every query of `project`, ordered by table name.
    async fn get_continuous_queries(
        &self,
        project: &str,
    ) -> Result<Vec<ContinuousQuery>, MetadataError>;
}

/// A [`QueryMetadataStore`] that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    queries: Mutex<BTreeMap<(String, String), ContinuousQuery>>,
}

impl MemoryMetadataStore {
    pub fn new() -> MemoryMetadataStore {
        MemoryMetadataStore::default()
    }
}

#[async_trait]
impl QueryMetadataStore for MemoryMetadataStore {
    async fn create_continuous_query(&self, query: &ContinuousQuery) -> Result<(), MetadataError> {
        let mut queries = self.queries.lock().expect("lock poisoned");
        let key = (query.project.clone(), query.table_name.clone());
        if queries.contains_key(&key) {
            return Err(MetadataError::already_exists(
                &query.project,
                &query.table_name,
            ));
        }
        queries.insert(key, query.clone());
        Ok(())
    }

    async fn delete_continuous_query(
        &self,
        project: &str,
        table_name: &str,
    ) -> Result<(), MetadataError> {
        let mut queries = self.queries.lock().expect("lock poisoned");
        match queries.remove(&(project.to_owned(), table_name.to_owned())) {
            Some(_) => Ok(()),
            None => Err(MetadataError::not_found(project, table_name)),
        }
    }

    async fn get_continuous_query(
        &self,
        project: &str,
        table_name: &str,
    ) -> Result<Option<ContinuousQuery>, MetadataError> {
        let queries = self.queries.lock().expect("lock poisoned");
        Ok(queries
            .get(&(project.to_owned(), table_name.to_owned()))
            .cloned())
    }

    async fn get_continuous_queries(
        &self,
        project: &str,
    ) -> Result<Vec<ContinuousQuery>, MetadataError> {
        let queries = self.queries.lock().expect("lock poisoned");
        Ok(queries
            .range((project.to_owned(), String::new())..)
            .take_while(|((p, _), _)| p == project)
            .map(|(_, query)| query.clone())
            .collect())
    }
}
