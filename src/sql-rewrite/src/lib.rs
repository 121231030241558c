// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! SQL handling for continuous queries.
//!
//! A continuous query is written against logical table names: a bare name
//! refers to a raw table ingested for the query's project, `continuous.<name>`
//! refers to another continuous query, and so on. Before the query can be
//! shipped to the engine every table reference has to be rebound to the
//! physical location it denotes. This crate parses the query text, rewrites
//! the table references in place via [`names::resolve`], and prints the
//! result back to SQL.

pub mod names;
pub mod parse;
pub mod rewrite;

pub use sqlparser::ast;

pub use crate::names::{RewriteContext, RewriteError, ResolutionPolicy, TableReferenceFormatter};
pub use crate::parse::{ParseError, parse_query};
pub use crate::rewrite::{limit_zero, qualify_query, rewrite_query};
