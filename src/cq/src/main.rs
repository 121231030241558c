// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Manages continuous queries in a Postgres-wire SQL engine.

use std::process;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use cq_continuous_query::{
    ContinuousQuery, ContinuousQueryConfig, ContinuousQueryService, Metrics,
};
use cq_postgres::{CatalogLayout, PostgresMetadataStore, PostgresQueryExecutor, create_pool};
use prometheus::Registry;
use serde::Serialize;
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

/// Continuous query manager
#[derive(Parser, Debug)]
#[command(name = "cq", about = "Materialize and inspect continuous queries")]
struct Args {
    /// Connection url of the SQL engine hosting the views.
    #[arg(long, env = "CQ_ENGINE_URL", value_name = "URL")]
    engine_url: String,

    /// Connection url of the Postgres database holding query definitions.
    /// Defaults to the engine url.
    #[arg(long, env = "CQ_METADATA_URL", value_name = "URL")]
    metadata_url: Option<String>,

    /// Catalog holding the views of continuous queries.
    #[arg(long, env = "CQ_STREAMING_CATALOG", default_value = "streaming")]
    streaming_catalog: String,

    /// Catalog holding the raw tables of each project.
    #[arg(long, env = "CQ_SOURCE_CATALOG", default_value = "_source")]
    source_catalog: String,

    /// Catalog that `test` reads historical data from.
    #[arg(long, env = "CQ_COLD_STORAGE_CATALOG", default_value = "cold_storage")]
    cold_storage_catalog: String,

    /// Maximum number of connections per database.
    #[arg(long, value_name = "N", default_value = "8")]
    pool_size: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Materialize a query as a view and record its definition
    ///
    /// Example:
    ///   cq create acme sessions 'SELECT user_id, ts FROM events' -o window=1h
    Create {
        project: String,
        table_name: String,
        /// Query text, or `-` to read it from stdin.
        query: String,
        /// Display name stored with the definition.
        #[arg(long, default_value = "")]
        name: String,
        /// Partition key stored with the definition.
        #[arg(long = "partition-key", value_name = "COLUMN")]
        partition_keys: Vec<String>,
        /// Option stored with the definition.
        #[arg(short, long = "option", value_name = "KEY=VALUE", value_parser = parse_option)]
        options: Vec<(String, String)>,
    },

    /// Drop the view of a continuous query and forget its definition
    Drop { project: String, table_name: String },

    /// Print the output schema of every continuous query of a project
    ///
    /// Queries whose view cannot be probed are left out.
    Schemas { project: String },

    /// Print the output schema of a query without registering it
    ///
    /// Two-part table names are read from the cold-storage catalog.
    Test {
        project: String,
        /// Query text, or `-` to read it from stdin.
        query: String,
    },

    /// List the continuous queries of a project
    List { project: String },

    /// Print the definition of one continuous query
    Show { project: String, table_name: String },
}

fn parse_option(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_owned(), value.to_owned())),
        _ => Err(format!("expected KEY=VALUE, got {s:?}")),
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(err) = run(args).await {
        eprintln!("cq: {:#}", err);
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("CQ_LOG_FILTER").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ContinuousQueryConfig {
        streaming_catalog: args.streaming_catalog,
        source_catalog: args.source_catalog,
        cold_storage_catalog: args.cold_storage_catalog,
    };
    let engine_pool = create_pool(&args.engine_url, args.pool_size).context("engine")?;
    let executor = PostgresQueryExecutor::new(engine_pool, CatalogLayout::new(&config));
    let metadata_url = args.metadata_url.as_deref().unwrap_or(&args.engine_url);
    let metadata_pool = create_pool(metadata_url, args.pool_size).context("metadata store")?;
    let store = PostgresMetadataStore::open(metadata_pool).await?;
    let metrics = Metrics::new(&Registry::new())?;
    let service = ContinuousQueryService::new(
        config,
        Arc::new(executor),
        Arc::new(store),
        Arc::new(metrics),
    );

    match args.command {
        Command::Create {
            project,
            table_name,
            query,
            name,
            partition_keys,
            options,
        } => {
            let mut definition = ContinuousQuery::new(project, table_name, read_query(query).await?)
                .with_name(name)
                .with_partition_keys(partition_keys);
            definition.options.extend(options);
            service.create(&definition).await?;
        }
        Command::Drop {
            project,
            table_name,
        } => {
            if !service.delete(&project, &table_name).await? {
                bail!("engine failed to drop {project}.{table_name}; its definition was kept");
            }
        }
        Command::Schemas { project } => print_json(&service.get_schemas(&project).await?)?,
        Command::Test { project, query } => {
            let query = read_query(query).await?;
            print_json(&service.test(&project, &query).await?)?
        }
        Command::List { project } => print_json(&service.list(&project).await?)?,
        Command::Show {
            project,
            table_name,
        } => match service.get(&project, &table_name).await? {
            Some(definition) => print_json(&definition)?,
            None => bail!("continuous query {project}.{table_name} does not exist"),
        },
    }
    Ok(())
}

async fn read_query(query: String) -> Result<String, anyhow::Error> {
    if query != "-" {
        return Ok(query);
    }
    let mut buf = String::new();
    tokio::io::stdin()
        .read_to_string(&mut buf)
        .await
        .context("reading query from stdin")?;
    Ok(buf)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), anyhow::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
