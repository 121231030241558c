// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Tests against a live Postgres. They are no-ops unless `CQ_POSTGRES_URL` is
//! set to a connection url.

use cq_continuous_query::{
    ContinuousQuery, ContinuousQueryConfig, FieldType, MetadataError, QueryExecutor,
    QueryMetadataStore, SchemaField,
};
use cq_postgres::{CatalogLayout, PostgresMetadataStore, PostgresQueryExecutor, create_pool};
use deadpool_postgres::Pool;

fn test_pool() -> Option<Pool> {
    match std::env::var("CQ_POSTGRES_URL") {
        Ok(url) => Some(create_pool(&url, 2).unwrap()),
        Err(_) => {
            println!("skipping test because CQ_POSTGRES_URL is not set");
            None
        }
    }
}

#[tokio::test]
async fn executor_reports_metadata_and_rows() {
    let Some(pool) = test_pool() else { return };
    let executor = PostgresQueryExecutor::new(
        pool,
        CatalogLayout::new(&ContinuousQueryConfig::default()),
    );

    let output = executor
        .execute_raw_query("SELECT 1::int8 AS n, NULL::text AS s, ARRAY[1, 2] AS a".into())
        .result()
        .await
        .unwrap();
    assert_eq!(
        output.metadata,
        [
            SchemaField::new("n", FieldType::Long),
            SchemaField::new("s", FieldType::String),
            SchemaField::new("a", FieldType::Array(Box::new(FieldType::Integer))),
        ]
    );
    assert_eq!(
        output.rows,
        [vec![Some("1".to_owned()), None, Some("{1,2}".to_owned())]]
    );

    let err = executor
        .execute_raw_query("SELECT * FROM cq_no_such_table".into())
        .result()
        .await
        .unwrap_err();
    assert_eq!(err.sql_state.as_deref(), Some("42P01"));
    assert!(err.message.contains("cq_no_such_table"), "{err}");
}

#[tokio::test]
async fn metadata_store_round_trip() {
    let Some(pool) = test_pool() else { return };
    let store = PostgresMetadataStore::open(pool).await.unwrap();
    let project = format!("cq_test_{}", std::process::id());

    let mut query = ContinuousQuery::new(&project, "sessions", "SELECT user_id FROM events")
        .with_name("Sessions")
        .with_partition_keys(["user_id"])
        .with_option("retention", "7d");
    query.schema = Some(vec![SchemaField::new("user_id", FieldType::Long)]);
    store.create_continuous_query(&query).await.unwrap();
    store
        .create_continuous_query(&ContinuousQuery::new(&project, "clicks", "SELECT 1"))
        .await
        .unwrap();

    assert!(matches!(
        store.create_continuous_query(&query).await,
        Err(MetadataError::AlreadyExists { .. })
    ));
    assert_eq!(
        store.get_continuous_query(&project, "sessions").await.unwrap(),
        Some(query.clone())
    );
    let names: Vec<_> = store
        .get_continuous_queries(&project)
        .await
        .unwrap()
        .into_iter()
        .map(|q| q.table_name)
        .collect();
    assert_eq!(names, ["clicks", "sessions"]);

    for table in ["clicks", "sessions"] {
        store.delete_continuous_query(&project, table).await.unwrap();
    }
    assert!(matches!(
        store.delete_continuous_query(&project, "sessions").await,
        Err(MetadataError::NotFound { .. })
    ));
    assert!(store.get_continuous_queries(&project).await.unwrap().is_empty());
}
