// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use sqlparser::ast::{Query, Statement};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::{Parser, ParserError};

/// Errors produced while turning query text into a [`Query`].
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Parser(#[from] ParserError),
    #[error("empty query")]
    Empty,
    #[error("expected exactly one statement, but got {0}")]
    MultipleStatements(usize),
    #[error("expected a query, but got: {0}")]
    NotAQuery(String),
}

/// Parses `sql` as a single query.
///
/// Continuous queries are always `SELECT`-shaped (possibly with CTEs and set
/// operations). DDL, DML and multi-statement input are rejected.
pub fn parse_query(sql: &str) -> Result<Query, ParseError> {
    let mut statements = Parser::parse_sql(&GenericDialect {}, sql)?;
    match statements.len() {
        0 => return Err(ParseError::Empty),
        1 => {}
        n => return Err(ParseError::MultipleStatements(n)),
    }
    match statements.remove(0) {
        Statement::Query(query) => Ok(*query),
        other => Err(ParseError::NotAQuery(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_query() {
        let query = parse_query("select user_id, ts from events").unwrap();
        assert_eq!(query.to_string(), "SELECT user_id, ts FROM events");
    }

    #[test]
    fn rejects_non_queries() {
        assert!(matches!(
            parse_query("drop view streaming.acme.sessions"),
            Err(ParseError::NotAQuery(_))
        ));
        assert!(matches!(
            parse_query("select 1; select 2"),
            Err(ParseError::MultipleStatements(2))
        ));
        assert!(matches!(parse_query(""), Err(ParseError::Empty)));
        assert!(matches!(
            parse_query("select * from"),
            Err(ParseError::Parser(_))
        ));
    }
}
