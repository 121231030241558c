// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Resolution of logical table references to physical ones.
//!
//! The shape of a reference decides where it points:
//!
//! | reference            | project-local policy               | cold-storage policy          |
//! |----------------------|------------------------------------|------------------------------|
//! | `t`                  | `<source>."<project>"."t"`         | `<source>."<project>"."t"`   |
//! | `s.t`                | engine formatter                   | `<cold>.s.t`                 |
//! | `c.s.t` and the rest | engine formatter                   | engine formatter             |
//!
//! The engine formatter is supplied by whoever executes the rewritten SQL,
//! since only the engine knows its own catalog layout.

use std::fmt;

use sqlparser::ast::{Ident, ObjectName, ObjectNamePart};

/// An error produced while rewriting a query.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RewriteError {
    /// A table reference could not be mapped onto a physical location.
    #[error("unable to resolve table reference {name}: {reason}")]
    UnresolvableReference { name: String, reason: String },
}

impl RewriteError {
    pub fn unresolvable(name: &ObjectName, reason: impl Into<String>) -> RewriteError {
        RewriteError::UnresolvableReference {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Maps a project-scoped table reference into the engine's catalog layout.
///
/// Implemented by the engine collaborator. The resolver delegates every
/// reference shape that it does not handle itself.
pub trait TableReferenceFormatter: fmt::Debug + Send + Sync {
    fn format_table_reference(
        &self,
        project: &str,
        name: &ObjectName,
    ) -> Result<ObjectName, RewriteError>;
}

/// Selects how two-part references are qualified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionPolicy<'a> {
    /// Two-part references are handed to the engine formatter. Used when
    /// materializing a continuous query.
    ProjectLocal,
    /// Two-part references are `schema.table` pairs inside `catalog`. Used
    /// when validating a query against historical data.
    ColdStorage { catalog: &'a str },
}

/// Everything [`resolve`] needs to qualify a reference.
#[derive(Debug, Clone, Copy)]
pub struct RewriteContext<'a> {
    pub project: &'a str,
    /// Catalog holding the raw tables ingested for each project.
    pub source_catalog: &'a str,
    pub policy: ResolutionPolicy<'a>,
    pub formatter: &'a dyn TableReferenceFormatter,
}

impl<'a> RewriteContext<'a> {
    pub fn project_local(
        project: &'a str,
        source_catalog: &'a str,
        formatter: &'a dyn TableReferenceFormatter,
    ) -> RewriteContext<'a> {
        RewriteContext {
            project,
            source_catalog,
            policy: ResolutionPolicy::ProjectLocal,
            formatter,
        }
    }

    pub fn cold_storage(
        project: &'a str,
        source_catalog: &'a str,
        cold_storage_catalog: &'a str,
        formatter: &'a dyn TableReferenceFormatter,
    ) -> RewriteContext<'a> {
        RewriteContext {
            project,
            source_catalog,
            policy: ResolutionPolicy::ColdStorage {
                catalog: cold_storage_catalog,
            },
            formatter,
        }
    }
}

/// Resolves `name` to the physical reference it denotes under `cx`.
///
/// Never fails on its own; only the engine formatter can reject a reference.
pub fn resolve(name: &ObjectName, cx: &RewriteContext<'_>) -> Result<ObjectName, RewriteError> {
    let Some(parts) = identifiers(name) else {
        return cx.formatter.format_table_reference(cx.project, name);
    };
    match (parts.as_slice(), cx.policy) {
        ([table], _) => Ok(qualified_name(
            cx.source_catalog,
            cx.project,
            &normalize_ident(table),
        )),
        ([schema, table], ResolutionPolicy::ColdStorage { catalog }) => Ok(object_name([
            Ident::new(catalog),
            (*schema).clone(),
            (*table).clone(),
        ])),
        _ => cx.formatter.format_table_reference(cx.project, name),
    }
}

/// Returns the identifiers making up `name`, or `None` if some part is not a
/// plain identifier.
pub fn identifiers(name: &ObjectName) -> Option<Vec<&Ident>> {
    name.0.iter().map(ObjectNamePart::as_ident).collect()
}

/// Returns the name `ident` denotes: unquoted identifiers are
/// case-insensitive and fold to lowercase, quoted ones are kept exactly.
pub fn normalize_ident(ident: &Ident) -> String {
    match ident.quote_style {
        Some(_) => ident.value.clone(),
        None => ident.value.to_lowercase(),
    }
}

/// Builds `<catalog>."<project>"."<table>"`.
pub fn qualified_name(catalog: &str, project: &str, table: &str) -> ObjectName {
    object_name([
        Ident::new(catalog),
        Ident::with_quote('"', project),
        Ident::with_quote('"', table),
    ])
}

pub fn object_name(parts: impl IntoIterator<Item = Ident>) -> ObjectName {
    ObjectName(parts.into_iter().map(ObjectNamePart::Identifier).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Prefixes everything it sees with `engine`, and refuses `bad.*`.
    #[derive(Debug)]
    struct EngineFormatter;

    impl TableReferenceFormatter for EngineFormatter {
        fn format_table_reference(
            &self,
            project: &str,
            name: &ObjectName,
        ) -> Result<ObjectName, RewriteError> {
            let parts = identifiers(name).expect("plain identifiers");
            if parts[0].value == "bad" {
                return Err(RewriteError::unresolvable(name, "no such schema"));
            }
            let mut qualified = vec![Ident::new("engine"), Ident::new(project)];
            qualified.extend(parts.into_iter().cloned());
            Ok(object_name(qualified))
        }
    }

    fn name(parts: &[&str]) -> ObjectName {
        object_name(parts.iter().map(|part| Ident::new(*part)))
    }

    fn resolve_str(parts: &[&str], cx: &RewriteContext<'_>) -> Result<String, RewriteError> {
        resolve(&name(parts), cx).map(|name| name.to_string())
    }

    #[test]
    fn one_part_references_are_project_sources() {
        let formatter = EngineFormatter;
        for cx in [
            RewriteContext::project_local("acme", "_source", &formatter),
            RewriteContext::cold_storage("acme", "_source", "coldcat", &formatter),
        ] {
            assert_eq!(
                resolve_str(&["events"], &cx).unwrap(),
                r#"_source."acme"."events""#
            );
        }
    }

    #[test]
    fn quoted_one_part_keeps_case() {
        let formatter = EngineFormatter;
        let cx = RewriteContext::project_local("acme", "_source", &formatter);
        let quoted = object_name([Ident::with_quote('"', "Events")]);
        assert_eq!(
            resolve(&quoted, &cx).unwrap().to_string(),
            r#"_source."acme"."Events""#
        );
    }

    #[test]
    fn unquoted_one_part_folds_case() {
        let formatter = EngineFormatter;
        let cx = RewriteContext::project_local("acme", "_source", &formatter);
        assert_eq!(
            resolve_str(&["Events"], &cx).unwrap(),
            resolve_str(&["events"], &cx).unwrap()
        );
        assert_eq!(
            resolve_str(&["EVENTS"], &cx).unwrap(),
            r#"_source."acme"."events""#
        );
    }

    #[test]
    fn two_part_references_depend_on_policy() {
        let formatter = EngineFormatter;
        let local = RewriteContext::project_local("acme", "_source", &formatter);
        let cold = RewriteContext::cold_storage("acme", "_source", "coldcat", &formatter);
        assert_eq!(
            resolve_str(&["archive", "events"], &local).unwrap(),
            "engine.acme.archive.events"
        );
        assert_eq!(
            resolve_str(&["archive", "events"], &cold).unwrap(),
            "coldcat.archive.events"
        );
    }

    #[test]
    fn other_shapes_are_delegated() {
        let formatter = EngineFormatter;
        let cold = RewriteContext::cold_storage("acme", "_source", "coldcat", &formatter);
        assert_eq!(
            resolve_str(&["coldcat", "archive", "events"], &cold).unwrap(),
            "engine.acme.coldcat.archive.events"
        );
        assert_eq!(
            resolve_str(&["bad", "archive", "events"], &cold),
            Err(RewriteError::UnresolvableReference {
                name: "bad.archive.events".into(),
                reason: "no such schema".into(),
            })
        );
    }
}
