//! `uiOnParamsChanged` migration: inject `ActivatedRoute` and import it.

use crate::error::{SourceError, SourceResult};
use crate::syntax::{SourceFile, children, named_children};
use ngmigrate_types::ReplacementSpan;
use ngmigrate_types::vocab::{PARAMS_CHANGED_HOOK, ROUTE_PARAM, ROUTE_TYPE, ROUTER_MODULE};
use tracing::{debug, info};
use tree_sitter::Node;

impl SourceFile {
    /// Give every class with a `uiOnParamsChanged` method a private
    /// `activatedRoute: ActivatedRoute` constructor parameter, and make sure
    /// `ActivatedRoute` is imported from `@angular/router` exactly once.
    ///
    /// A class without a constructor gets a minimal one, unless it extends
    /// another class, which is an error.
    pub fn migrate_params_hook(&self) -> SourceResult<SourceFile> {
        let mut spans = Vec::new();
        let mut hooked = 0usize;

        for class in self.class_declarations() {
            let Some(body) = class.child_by_field_name("body") else {
                continue;
            };
            let methods: Vec<Node<'_>> = named_children(body)
                .into_iter()
                .filter(|m| m.kind() == "method_definition")
                .collect();
            if !methods.iter().any(|m| self.method_name(*m) == PARAMS_CHANGED_HOOK) {
                continue;
            }
            hooked += 1;

            let class_name = self.class_name(class);
            match methods.iter().find(|m| self.method_name(**m) == "constructor") {
                Some(ctor) => spans.extend(self.inject_parameter(*ctor)),
                None if self.extends_base(class) => {
                    return Err(SourceError::UnsupportedConstructor {
                        path: self.path().to_owned(),
                        class: class_name,
                    });
                }
                None => {
                    info!(path = %self.path(), class = %class_name, "adding constructor for ActivatedRoute");
                    spans.push(self.synthesize_constructor(body));
                }
            }
        }

        if hooked == 0 {
            return Ok(self.clone());
        }
        spans.extend(self.ensure_route_import());
        self.edited(spans)
    }

    fn method_name(&self, method: Node<'_>) -> &str {
        method
            .child_by_field_name("name")
            .map(|n| self.node_text(n))
            .unwrap_or_default()
    }

    fn extends_base(&self, class: Node<'_>) -> bool {
        children(class)
            .into_iter()
            .filter(|n| n.kind() == "class_heritage")
            .flat_map(children)
            .any(|n| n.kind() == "extends_clause")
    }

    fn inject_parameter(&self, ctor: Node<'_>) -> Option<ReplacementSpan> {
        let params = ctor.child_by_field_name("parameters")?;
        let declared = named_children(params);

        if declared.iter().any(|p| self.parameter_name(*p) == Some(ROUTE_PARAM)) {
            debug!(path = %self.path(), "constructor already takes activatedRoute");
            return None;
        }

        let injected = format!("private {ROUTE_PARAM}: {ROUTE_TYPE}");
        let Some(last) = declared.last() else {
            let open = children(params).into_iter().find(|n| n.kind() == "(")?;
            return Some(ReplacementSpan::insert(open.end_byte(), injected));
        };

        // `a: A,\n)` keeps its trailing comma style.
        let trailing_comma = children(params)
            .into_iter()
            .find(|n| n.kind() == "," && n.start_byte() >= last.end_byte());
        Some(match trailing_comma {
            Some(comma) => ReplacementSpan::insert(comma.end_byte(), format!(" {injected},")),
            None => ReplacementSpan::insert(last.end_byte(), format!(", {injected}")),
        })
    }

    fn parameter_name(&self, param: Node<'_>) -> Option<&str> {
        let pattern = param.child_by_field_name("pattern")?;
        Some(self.node_text(pattern))
    }

    fn synthesize_constructor(&self, body: Node<'_>) -> ReplacementSpan {
        let indent = named_children(body)
            .first()
            .map(|m| m.start_position().column)
            .filter(|col| *col > 0)
            .unwrap_or(2);
        let text = format!(
            "\n{}constructor(private {ROUTE_PARAM}: {ROUTE_TYPE}) {{}}\n",
            " ".repeat(indent)
        );
        ReplacementSpan::insert(body.start_byte() + 1, text)
    }

    /// Spans that make `ActivatedRoute` importable, or none if it already is.
    fn ensure_route_import(&self) -> Option<ReplacementSpan> {
        let router_imports: Vec<(Node<'_>, Node<'_>)> = named_children(self.root())
            .into_iter()
            .filter(|n| n.kind() == "import_statement")
            .filter(|n| {
                n.child_by_field_name("source")
                    .is_some_and(|s| self.node_text(s).trim_matches(['\'', '"']) == ROUTER_MODULE)
            })
            .filter_map(|import| Some((import, router_named_imports(import)?)))
            .collect();

        let specifiers = |named| -> Vec<Node<'_>> {
            named_children(named)
                .into_iter()
                .filter(|n| n.kind() == "import_specifier")
                .collect()
        };

        if router_imports
            .iter()
            .flat_map(|(_, named)| specifiers(*named))
            .any(|s| self.imported_name(s) == ROUTE_TYPE)
        {
            return None;
        }

        // `import type { .. }` cannot carry a DI token.
        let value_import = router_imports
            .iter()
            .find(|(import, _)| !is_type_only(*import));
        if let Some((_, named)) = value_import {
            return Some(match specifiers(*named).last() {
                Some(last) => ReplacementSpan::insert(last.end_byte(), format!(", {ROUTE_TYPE}")),
                None => ReplacementSpan::insert(named.start_byte() + 1, format!(" {ROUTE_TYPE} ")),
            });
        }

        let first_statement = named_children(self.root())
            .first()
            .map(|n| n.start_byte())
            .unwrap_or(0);
        Some(ReplacementSpan::insert(
            first_statement,
            format!("import {{ {ROUTE_TYPE} }} from '{ROUTER_MODULE}';\n"),
        ))
    }

    fn imported_name(&self, specifier: Node<'_>) -> &str {
        specifier
            .child_by_field_name("name")
            .map(|n| self.node_text(n))
            .unwrap_or_default()
    }
}

fn router_named_imports(import: Node<'_>) -> Option<Node<'_>> {
    named_children(import)
        .into_iter()
        .find(|n| n.kind() == "import_clause")
        .and_then(|clause| {
            named_children(clause)
                .into_iter()
                .find(|n| n.kind() == "named_imports")
        })
}

fn is_type_only(import: Node<'_>) -> bool {
    children(import).into_iter().any(|n| n.kind() == "type")
}

#[cfg(test)]
mod tests {
    use crate::{SourceError, SourceFile};
    use pretty_assertions::assert_eq;

    fn migrate(text: &str) -> String {
        SourceFile::parse("a.ts", text)
            .unwrap()
            .migrate_params_hook()
            .unwrap()
            .into_text()
    }

    #[test]
    fn appends_parameter_and_import() {
        let src = "\
import { Component } from '@angular/core';

export class A {
  constructor(private a: Svc) {}
  uiOnParamsChanged(p) {}
}
";
        assert_eq!(
            migrate(src),
            "\
import { ActivatedRoute } from '@angular/router';
import { Component } from '@angular/core';

export class A {
  constructor(private a: Svc, private activatedRoute: ActivatedRoute) {}
  uiOnParamsChanged(p) {}
}
"
        );
    }

    #[test]
    fn extends_existing_router_import() {
        let src = "\
import { Router } from '@angular/router';
class A {
  constructor() {}
  uiOnParamsChanged() {}
}
";
        assert_eq!(
            migrate(src),
            "\
import { Router, ActivatedRoute } from '@angular/router';
class A {
  constructor(private activatedRoute: ActivatedRoute) {}
  uiOnParamsChanged() {}
}
"
        );
    }

    #[test]
    fn trailing_comma_is_preserved() {
        let src = "\
import { ActivatedRoute } from \"@angular/router\";
class A {
  constructor(
    a: A,
  ) {}
  uiOnParamsChanged() {}
}
";
        let out = migrate(src);
        assert!(out.contains("    a: A, private activatedRoute: ActivatedRoute,\n  ) {}"));
        assert_eq!(out.matches("import").count(), 1);
    }

    #[test]
    fn synthesizes_missing_constructor() {
        let src = "class A implements OnInit {\n    uiOnParamsChanged() {}\n}\n";
        assert_eq!(
            migrate(src),
            "import { ActivatedRoute } from '@angular/router';\nclass A implements OnInit {\n    constructor(private activatedRoute: ActivatedRoute) {}\n\n    uiOnParamsChanged() {}\n}\n"
        );
    }

    #[test]
    fn derived_class_without_constructor_fails() {
        let src = "class A extends B {\n  uiOnParamsChanged() {}\n}\n";
        let err = SourceFile::parse("a.ts", src)
            .unwrap()
            .migrate_params_hook()
            .unwrap_err();
        assert!(matches!(err, SourceError::UnsupportedConstructor { ref class, .. } if class == "A"));
    }

    #[test]
    fn classes_without_hook_are_untouched() {
        let src = "import { StateService } from '@uirouter/core';\nclass A { constructor(s: StateService) {} }\n";
        assert_eq!(migrate(src), src);
    }

    #[test]
    fn second_run_is_a_no_op() {
        let src = "class A {\n  constructor(x: X) {}\n  uiOnParamsChanged() {}\n}\n";
        let once = migrate(src);
        assert_eq!(migrate(&once), once);
    }
}
