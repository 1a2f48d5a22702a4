//! `@Component` lookup, template extraction and the template-splice transform.

use crate::error::{SourceError, SourceResult};
use crate::syntax::{SourceFile, children, named_children, span_of};
use camino::{Utf8Path, Utf8PathBuf};
use ngmigrate_types::vocab::COMPONENT_DECORATOR;
use ngmigrate_types::{ReplacementSpan, Span, TemplateLocation};
use tree_sitter::Node;

/// A string or template literal, addressed by its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringLiteral {
    /// Between the delimiters.
    pub span: Span,
    pub delimiter: char,
    /// Source text between the delimiters, escapes intact.
    pub raw: String,
}

impl StringLiteral {
    /// The literal's value with escaped delimiters resolved.
    pub fn value(&self) -> String {
        cook(&self.raw, self.delimiter)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    Inline(StringLiteral),
    External { url: String, path: Utf8PathBuf },
}

impl TemplateSource {
    pub fn location(&self) -> TemplateLocation {
        match self {
            TemplateSource::Inline(_) => TemplateLocation::Inline,
            TemplateSource::External { path, .. } => TemplateLocation::External { path: path.clone() },
        }
    }
}

/// A class decorated with `@Component({...})`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub class_name: String,
    /// `None` when the metadata has neither key or the value is not a literal.
    pub template: Option<TemplateSource>,
}

impl SourceFile {
    /// Every component class in the file, in source order.
    pub fn components(&self) -> Vec<Component> {
        self.class_declarations()
            .into_iter()
            .filter_map(|class| {
                let metadata = self.component_metadata(class)?;
                Some(Component {
                    class_name: self.class_name(class),
                    template: self.template_of(metadata),
                })
            })
            .collect()
    }

    pub fn component(&self, class_name: &str) -> Option<Component> {
        self.components()
            .into_iter()
            .find(|c| c.class_name == class_name)
    }

    /// Replace the inline template of `class_name` with `markup`, keeping the
    /// literal's delimiter. Nothing else in the file changes.
    pub fn splice_template(&self, class_name: &str, markup: &str) -> SourceResult<SourceFile> {
        let Some(TemplateSource::Inline(literal)) =
            self.component(class_name).and_then(|c| c.template)
        else {
            return Err(SourceError::NoInlineTemplate {
                path: self.path().to_owned(),
                class: class_name.to_string(),
            });
        };

        let replacement = uncook(markup, literal.delimiter);
        if replacement == literal.raw {
            return Ok(self.clone());
        }
        self.edited(vec![ReplacementSpan::new(literal.span, replacement)])
    }

    /// The object literal passed to the class's `@Component` decorator.
    ///
    /// Decorators sit on the class, or on the enclosing `export` statement.
    fn component_metadata<'t>(&'t self, class: Node<'t>) -> Option<Node<'t>> {
        let mut decorators: Vec<Node<'t>> = children(class)
            .into_iter()
            .filter(|n| n.kind() == "decorator")
            .collect();
        if let Some(parent) = class.parent().filter(|p| p.kind() == "export_statement") {
            decorators.extend(children(parent).into_iter().filter(|n| n.kind() == "decorator"));
        }

        decorators.into_iter().find_map(|decorator| {
            let call = named_children(decorator)
                .into_iter()
                .find(|n| n.kind() == "call_expression")?;
            let function = call.child_by_field_name("function")?;
            if function.kind() != "identifier" || self.node_text(function) != COMPONENT_DECORATOR {
                return None;
            }
            let arguments = call.child_by_field_name("arguments")?;
            named_children(arguments)
                .into_iter()
                .next()
                .filter(|arg| arg.kind() == "object")
        })
    }

    fn template_of(&self, metadata: Node<'_>) -> Option<TemplateSource> {
        let pair = named_children(metadata).into_iter().find(|pair| {
            pair.kind() == "pair"
                && pair
                    .child_by_field_name("key")
                    .is_some_and(|key| matches!(self.property_name(key), "template" | "templateUrl"))
        })?;

        let key = pair.child_by_field_name("key")?;
        let literal = self.string_literal(pair.child_by_field_name("value")?)?;

        if self.property_name(key) == "template" {
            Some(TemplateSource::Inline(literal))
        } else {
            let url = literal.value();
            let path = resolve_template_url(self.path(), &url);
            Some(TemplateSource::External { url, path })
        }
    }

    fn property_name<'s>(&'s self, key: Node<'_>) -> &'s str {
        let text = self.node_text(key);
        match key.kind() {
            "string" => text.trim_matches(|c| c == '"' || c == '\''),
            _ => text,
        }
    }

    fn string_literal(&self, node: Node<'_>) -> Option<StringLiteral> {
        if !matches!(node.kind(), "string" | "template_string") {
            return None;
        }
        let span = span_of(node);
        if span.len() < 2 {
            return None;
        }
        let inner = Span::new(span.start + 1, span.end - 1);
        let delimiter = self.text()[span.start..].chars().next()?;
        Some(StringLiteral {
            span: inner,
            delimiter,
            raw: inner.slice(self.text())?.to_string(),
        })
    }
}

/// Resolve a `templateUrl` against the component file.
///
/// A leading `/` means workspace-relative; anything else is relative to the
/// component file's directory. The result is normalized lexically.
pub fn resolve_template_url(source_path: &Utf8Path, url: &str) -> Utf8PathBuf {
    let joined = match url.strip_prefix('/') {
        Some(rooted) => Utf8PathBuf::from(rooted),
        None => source_path
            .parent()
            .map(|dir| dir.join(url))
            .unwrap_or_else(|| Utf8PathBuf::from(url)),
    };
    normalize(&joined)
}

fn normalize(path: &Utf8Path) -> Utf8PathBuf {
    use camino::Utf8Component;

    let mut parts: Vec<Utf8Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => match parts.last() {
                Some(Utf8Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Utf8Component::RootDir | Utf8Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }
    parts.iter().map(|c| c.as_str()).collect()
}

fn cook(raw: &str, delimiter: char) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(next) if next == delimiter => out.push(next),
            Some(next) => {
                out.push('\\');
                out.push(next);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn uncook(value: &str, delimiter: char) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            out.push(c);
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else if c == delimiter {
            out.push('\\');
            out.push(c);
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn url_resolution() {
        let src = Utf8Path::new("my-angular-app/my-file.ts");
        assert_eq!(
            resolve_template_url(src, "./my-file.html"),
            Utf8PathBuf::from("my-angular-app/my-file.html")
        );
        assert_eq!(
            resolve_template_url(src, "../shared/x.html"),
            Utf8PathBuf::from("shared/x.html")
        );
        assert_eq!(
            resolve_template_url(src, "views/x.html"),
            Utf8PathBuf::from("my-angular-app/views/x.html")
        );
        assert_eq!(
            resolve_template_url(src, "/libs/ui/x.html"),
            Utf8PathBuf::from("libs/ui/x.html")
        );
    }

    #[test]
    fn escapes_round_trip() {
        let raw = r"it\'s \\ fine";
        assert_eq!(cook(raw, '\''), r"it's \\ fine");
        assert_eq!(uncook(&cook(raw, '\''), '\''), raw);
        assert_eq!(uncook("['a']", '\''), r"[\'a\']");
        assert_eq!(uncook("['a']", '`'), "['a']");
    }

    #[test]
    fn finds_inline_and_external_templates() {
        let text = r#"
import { Component } from '@angular/core';

@Component({ selector: 'a-a', template: `<a uiSref="x">x</a>` })
export class AComponent {}

@Component({
  selector: 'b-b',
  'templateUrl': './b.html',
})
class BComponent {}

@Injectable()
export class NotAComponent {}
"#;
        let file = SourceFile::parse("app/a.ts", text).unwrap();
        let components = file.components();
        assert_eq!(components.len(), 2);

        let Some(TemplateSource::Inline(lit)) = &components[0].template else {
            panic!("expected inline template");
        };
        assert_eq!(components[0].class_name, "AComponent");
        assert_eq!(lit.delimiter, '`');
        assert_eq!(lit.value(), r#"<a uiSref="x">x</a>"#);

        assert_eq!(components[1].class_name, "BComponent");
        assert_eq!(
            components[1].template.as_ref().map(|t| t.location()),
            Some(TemplateLocation::External {
                path: "app/b.html".into()
            })
        );
    }

    #[test]
    fn splice_keeps_delimiter_and_escapes() {
        let text = "@Component({ template: '<a uiSref=\"x\"></a>' })\nclass A {}\n";
        let file = SourceFile::parse("a.ts", text).unwrap();
        let out = file
            .splice_template("A", r#"<a [routerLink]="['x']"></a>"#)
            .unwrap();
        assert_eq!(
            out.text(),
            "@Component({ template: '<a [routerLink]=\"[\\'x\\']\"></a>' })\nclass A {}\n"
        );
        let Some(TemplateSource::Inline(lit)) = out.component("A").and_then(|c| c.template) else {
            panic!("expected inline template");
        };
        assert_eq!(lit.value(), r#"<a [routerLink]="['x']"></a>"#);
    }

    #[test]
    fn splice_requires_inline_template() {
        let file = SourceFile::parse("a.ts", "@Component({ templateUrl: './a.html' })\nclass A {}\n")
            .unwrap();
        let err = file.splice_template("A", "<p></p>").unwrap_err();
        assert!(matches!(err, SourceError::NoInlineTemplate { .. }));
    }

    #[test]
    fn non_literal_template_is_ignored() {
        let file =
            SourceFile::parse("a.ts", "const T = '<p></p>';\n@Component({ template: T })\nclass A {}\n")
                .unwrap();
        assert_eq!(file.components()[0].template, None);
    }
}
