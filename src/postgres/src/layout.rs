// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Where continuous queries and their inputs live inside the engine.

use cq_continuous_query::ContinuousQueryConfig;
use cq_sql_rewrite::ast::{Ident, ObjectName};
use cq_sql_rewrite::names::{identifiers, normalize_ident, qualified_name};
use cq_sql_rewrite::{RewriteError, TableReferenceFormatter};

/// Prefix under which a continuous query reads the views of other
/// continuous queries of the same project.
const CONTINUOUS_PREFIX: &str = "continuous";

/// The engine's catalog layout.
///
/// | reference           | physical location                   |
/// |---------------------|-------------------------------------|
/// | `continuous.n`      | `<streaming>."<project>"."n"`       |
/// | `c.s.n`             | `c.s.n`                             |
/// | `n`                 | `<cold storage>."<project>"."n"`    |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogLayout {
    streaming_catalog: String,
    cold_storage_catalog: String,
}

impl CatalogLayout {
    pub fn new(config: &ContinuousQueryConfig) -> CatalogLayout {
        CatalogLayout {
            streaming_catalog: config.streaming_catalog.clone(),
            cold_storage_catalog: config.cold_storage_catalog.clone(),
        }
    }
}

fn is_continuous_prefix(ident: &Ident) -> bool {
    normalize_ident(ident) == CONTINUOUS_PREFIX
}

impl TableReferenceFormatter for CatalogLayout {
    fn format_table_reference(
        &self,
        project: &str,
        name: &ObjectName,
    ) -> Result<ObjectName, RewriteError> {
        let Some(parts) = identifiers(name) else {
            return Err(RewriteError::unresolvable(name, "not a table name"));
        };
        match parts.as_slice() {
            [prefix, table] if is_continuous_prefix(prefix) => Ok(qualified_name(
                &self.streaming_catalog,
                project,
                &normalize_ident(table),
            )),
            [_, _, _] => Ok(name.clone()),
            [table] => Ok(qualified_name(
                &self.cold_storage_catalog,
                project,
                &normalize_ident(table),
            )),
            [schema, _] => Err(RewriteError::unresolvable(
                name,
                format!(
                    "unknown schema {}, expected {}.<name>",
                    schema, CONTINUOUS_PREFIX
                ),
            )),
            _ => Err(RewriteError::unresolvable(name, "too many name parts")),
        }
    }
}

#[cfg(test)]
mod tests {
    use cq_sql_rewrite::names::object_name;

    use super::*;

    fn layout() -> CatalogLayout {
        CatalogLayout::new(&ContinuousQueryConfig {
            cold_storage_catalog: "hive".into(),
            ..Default::default()
        })
    }

    fn format(parts: &[&str]) -> Result<String, RewriteError> {
        let name = object_name(parts.iter().map(|part| Ident::new(*part)));
        layout()
            .format_table_reference("acme", &name)
            .map(|name| name.to_string())
    }

    #[test]
    fn continuous_queries_read_the_streaming_catalog() {
        assert_eq!(
            format(&["continuous", "sessions"]).unwrap(),
            r#"streaming."acme"."sessions""#
        );
        assert_eq!(
            format(&["CONTINUOUS", "sessions"]).unwrap(),
            r#"streaming."acme"."sessions""#
        );
    }

    #[test]
    fn unquoted_names_fold_to_lowercase() {
        assert_eq!(
            format(&["continuous", "Sessions"]).unwrap(),
            r#"streaming."acme"."sessions""#
        );
        assert_eq!(format(&["Clicks"]).unwrap(), r#"hive."acme"."clicks""#);

        let quoted = object_name([Ident::new("continuous"), Ident::with_quote('"', "Sessions")]);
        assert_eq!(
            layout()
                .format_table_reference("acme", &quoted)
                .unwrap()
                .to_string(),
            r#"streaming."acme"."Sessions""#
        );
    }

    #[test]
    fn other_shapes() {
        assert_eq!(format(&["hive", "web", "clicks"]).unwrap(), "hive.web.clicks");
        assert_eq!(format(&["clicks"]).unwrap(), r#"hive."acme"."clicks""#);
        assert_eq!(
            format(&["web", "clicks"]).unwrap_err().to_string(),
            "unable to resolve table reference web.clicks: unknown schema web, expected continuous.<name>"
        );
        assert!(format(&["a", "b", "c", "d"]).is_err());
    }
}
