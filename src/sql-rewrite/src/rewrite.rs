// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Rewriting of every table reference in a query.
//!
//! The traversal itself is the one derived for the AST by `sqlparser`, so it
//! reaches table references wherever they hide: CTE bodies, derived tables,
//! nested joins, both sides of set operations, and subqueries inside any
//! expression. The qualifier only decides, per table factor, whether it is a
//! reference to rewrite.
//!
//! Names bound by `WITH` are not table references and are left alone. For a
//! non-recursive `WITH`, a CTE body sees only the CTEs declared before it, so
//! `WITH events AS (SELECT * FROM events ...)` reads the real `events` table.

use std::collections::BTreeSet;
use std::mem;
use std::ops::ControlFlow;

use sqlparser::ast::{
    Cte, Expr, LimitClause, ObjectName, Query, TableFactor, Value, VisitMut, VisitorMut,
};
use tracing::trace;

use crate::names::{self, RewriteContext, RewriteError};

/// Rewrites every table reference in `query` and prints the result.
///
/// `query` itself is left untouched. The output is a pure function of the
/// query and the context.
pub fn rewrite_query(query: &Query, cx: &RewriteContext<'_>) -> Result<String, RewriteError> {
    let mut query = query.clone();
    qualify_query(&mut query, cx)?;
    Ok(query.to_string())
}

/// Rewrites every table reference in `query` in place.
///
/// On error, `query` is left in an unspecified state and should be
/// discarded. Use [`rewrite_query`] to keep the original.
pub fn qualify_query(query: &mut Query, cx: &RewriteContext<'_>) -> Result<(), RewriteError> {
    let mut qualifier = Qualifier {
        cx,
        cte_scopes: Vec::new(),
        detached_ctes: Vec::new(),
    };
    match query.visit(&mut qualifier) {
        ControlFlow::Continue(()) => Ok(()),
        ControlFlow::Break(err) => Err(err),
    }
}

/// Makes `query` return no rows, replacing any existing row limit.
pub fn limit_zero(query: &mut Query) {
    query.limit_clause = Some(LimitClause::LimitOffset {
        limit: Some(Expr::Value(Value::Number("0".into(), false).with_empty_span())),
        offset: None,
        limit_by: Vec::new(),
    });
    query.fetch = None;
}

struct Qualifier<'a> {
    cx: &'a RewriteContext<'a>,
    /// Names bound by the `WITH` clauses enclosing the current position.
    cte_scopes: Vec<BTreeSet<String>>,
    /// CTE lists taken out of the queries currently being visited. Their
    /// bodies are visited eagerly with the right scope and put back once the
    /// query is done.
    detached_ctes: Vec<Vec<Cte>>,
}

impl Qualifier<'_> {
    fn is_cte(&self, name: &ObjectName) -> bool {
        match names::identifiers(name).as_deref() {
            Some([ident]) => {
                let ident = names::normalize_ident(ident);
                self.cte_scopes.iter().any(|scope| scope.contains(&ident))
            }
            _ => false,
        }
    }

    fn visit_cte_bodies(&mut self, ctes: &mut [Cte], recursive: bool) -> ControlFlow<RewriteError> {
        let bound: Vec<String> = ctes
            .iter()
            .map(|cte| names::normalize_ident(&cte.alias.name))
            .collect();
        for (i, cte) in ctes.iter_mut().enumerate() {
            let visible = if recursive { &bound[..] } else { &bound[..i] };
            self.cte_scopes.push(visible.iter().cloned().collect());
            let flow = cte.query.visit(self);
            self.cte_scopes.pop();
            flow?;
        }
        ControlFlow::Continue(())
    }
}

impl VisitorMut for Qualifier<'_> {
    type Break = RewriteError;

    fn pre_visit_query(&mut self, query: &mut Query) -> ControlFlow<Self::Break> {
        let (mut ctes, recursive) = match &mut query.with {
            Some(with) => (mem::take(&mut with.cte_tables), with.recursive),
            None => (Vec::new(), false),
        };
        let flow = self.visit_cte_bodies(&mut ctes, recursive);
        if flow.is_break() {
            if let Some(with) = &mut query.with {
                with.cte_tables = ctes;
            }
            return flow;
        }
        self.cte_scopes.push(
            ctes.iter()
                .map(|cte| names::normalize_ident(&cte.alias.name))
                .collect(),
        );
        self.detached_ctes.push(ctes);
        ControlFlow::Continue(())
    }

    fn post_visit_query(&mut self, query: &mut Query) -> ControlFlow<Self::Break> {
        self.cte_scopes.pop();
        let ctes = self.detached_ctes.pop().unwrap_or_default();
        if let Some(with) = &mut query.with {
            with.cte_tables = ctes;
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_table_factor(&mut self, table_factor: &mut TableFactor) -> ControlFlow<Self::Break> {
        match table_factor {
            // Table-valued functions share the variant but carry arguments.
            TableFactor::Table { name, args: None, .. } if !self.is_cte(name) => {
                match names::resolve(name, self.cx) {
                    Ok(resolved) => {
                        trace!(%name, %resolved, "qualified table reference");
                        *name = resolved;
                    }
                    Err(err) => return ControlFlow::Break(err),
                }
            }
            _ => {}
        }
        ControlFlow::Continue(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use sqlparser::ast::ObjectName;

    use super::*;
    use crate::names::TableReferenceFormatter;
    use crate::parse::parse_query;

    /// Passes references through unchanged, remembering each one.
    #[derive(Debug, Default)]
    struct RecordingFormatter {
        seen: Mutex<Vec<String>>,
    }

    impl TableReferenceFormatter for RecordingFormatter {
        fn format_table_reference(
            &self,
            _project: &str,
            name: &ObjectName,
        ) -> Result<ObjectName, RewriteError> {
            self.seen.lock().expect("lock poisoned").push(name.to_string());
            Ok(name.clone())
        }
    }

    #[derive(Debug)]
    struct RejectingFormatter;

    impl TableReferenceFormatter for RejectingFormatter {
        fn format_table_reference(
            &self,
            _project: &str,
            name: &ObjectName,
        ) -> Result<ObjectName, RewriteError> {
            Err(RewriteError::unresolvable(name, "rejected"))
        }
    }

    fn rewrite(sql: &str) -> String {
        let formatter = RecordingFormatter::default();
        let cx = RewriteContext::project_local("acme", "_source", &formatter);
        rewrite_query(&parse_query(sql).unwrap(), &cx).unwrap()
    }

    #[test]
    fn qualifies_source_tables() {
        assert_eq!(
            rewrite("select user_id, ts from events"),
            r#"SELECT user_id, ts FROM _source."acme"."events""#
        );
    }

    #[test]
    fn every_reference_is_visited_once() {
        let sql = "
            WITH c AS (SELECT * FROM x.y.a)
            SELECT (SELECT max(v) FROM x.y.b), *
            FROM c
            JOIN x.y.c2 ON true
            JOIN (SELECT * FROM x.y.d) AS dd ON true
            WHERE EXISTS (SELECT 1 FROM x.y.e) AND id IN (SELECT id FROM x.y.f)
            UNION ALL
            SELECT * FROM (x.y.g CROSS JOIN x.y.h)";
        let formatter = RecordingFormatter::default();
        let cx = RewriteContext::project_local("acme", "_source", &formatter);
        rewrite_query(&parse_query(sql).unwrap(), &cx).unwrap();

        let mut seen = formatter.seen.into_inner().unwrap();
        assert_eq!(seen.len(), 8, "{seen:?}");
        seen.sort();
        assert_eq!(
            seen,
            ["x.y.a", "x.y.b", "x.y.c2", "x.y.d", "x.y.e", "x.y.f", "x.y.g", "x.y.h"]
        );
    }

    #[test]
    fn cte_references_are_not_qualified() {
        assert_eq!(
            rewrite("WITH recent AS (SELECT * FROM events WHERE ts > 10) SELECT * FROM recent"),
            r#"WITH recent AS (SELECT * FROM _source."acme"."events" WHERE ts > 10) SELECT * FROM recent"#
        );
        // Unquoted names match regardless of case.
        let rewritten = rewrite("WITH Recent AS (SELECT 1 AS x) SELECT * FROM RECENT");
        assert!(rewritten.ends_with("FROM RECENT"), "{rewritten}");
    }

    #[test]
    fn cte_may_shadow_the_table_it_reads() {
        assert_eq!(
            rewrite("WITH events AS (SELECT * FROM events WHERE ts > 0) SELECT * FROM events"),
            r#"WITH events AS (SELECT * FROM _source."acme"."events" WHERE ts > 0) SELECT * FROM events"#
        );
    }

    #[test]
    fn later_ctes_see_earlier_ones() {
        let rewritten = rewrite(
            "WITH a AS (SELECT * FROM b), b AS (SELECT * FROM a) SELECT * FROM a, b",
        );
        // `a` cannot see `b` yet, so it reads the source table `b`.
        assert!(
            rewritten.starts_with(r#"WITH a AS (SELECT * FROM _source."acme"."b"), b AS (SELECT * FROM a)"#),
            "{rewritten}"
        );
        assert!(rewritten.ends_with("SELECT * FROM a, b"), "{rewritten}");
    }

    #[test]
    fn recursive_ctes_see_themselves() {
        let rewritten = rewrite(
            "WITH RECURSIVE walk AS (SELECT id FROM edges UNION ALL SELECT id FROM walk) SELECT * FROM walk",
        );
        assert!(rewritten.contains(r#"FROM _source."acme"."edges""#), "{rewritten}");
        assert!(rewritten.contains("SELECT id FROM walk)"), "{rewritten}");
        assert!(rewritten.ends_with("SELECT * FROM walk"), "{rewritten}");
    }

    #[test]
    fn cte_scope_ends_with_its_query() {
        let rewritten = rewrite(
            "SELECT * FROM (WITH inner_cte AS (SELECT 1 AS x) SELECT * FROM inner_cte) AS t, inner_cte",
        );
        assert!(rewritten.contains("SELECT * FROM inner_cte) AS t"), "{rewritten}");
        assert!(
            rewritten.ends_with(r#", _source."acme"."inner_cte""#),
            "{rewritten}"
        );
    }

    #[test]
    fn table_functions_are_left_alone() {
        assert_eq!(
            rewrite("SELECT * FROM generate_series(1, 3)"),
            "SELECT * FROM generate_series(1, 3)"
        );
    }

    #[test]
    fn unresolvable_references_abort() {
        let cx = RewriteContext::project_local("acme", "_source", &RejectingFormatter);
        let query = parse_query("SELECT * FROM events, nowhere.events").unwrap();
        assert_eq!(
            rewrite_query(&query, &cx),
            Err(RewriteError::UnresolvableReference {
                name: "nowhere.events".into(),
                reason: "rejected".into(),
            })
        );
    }

    #[test]
    fn rewrite_is_idempotent_and_pure() {
        let formatter = RecordingFormatter::default();
        let cx = RewriteContext::cold_storage("acme", "_source", "coldcat", &formatter);
        let query = parse_query(
            "SELECT a.id FROM archive.events AS a JOIN users ON a.id = users.id WHERE a.id IN (SELECT id FROM x.y.z)",
        )
        .unwrap();
        let before = query.clone();
        let first = rewrite_query(&query, &cx).unwrap();
        let second = rewrite_query(&query, &cx).unwrap();
        assert_eq!(first, second);
        assert_eq!(query, before);
        assert!(first.contains("FROM coldcat.archive.events AS a"), "{first}");
        assert!(first.contains(r#"_source."acme"."users""#), "{first}");
    }

    #[test]
    fn limit_zero_replaces_existing_limits() {
        let mut query = parse_query("SELECT * FROM t ORDER BY id LIMIT 10 OFFSET 5").unwrap();
        limit_zero(&mut query);
        assert_eq!(query.to_string(), "SELECT * FROM t ORDER BY id LIMIT 0");
    }
}
