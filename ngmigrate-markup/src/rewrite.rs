//! UI-Router to Angular Router template rewrite.

use crate::parser::{Attribute, Element, MarkupNode, Visit, parse_markup, visit_all};
use ngmigrate_edit::{EditResult, apply_spans};
use ngmigrate_types::ReplacementSpan;
use ngmigrate_types::vocab::{
    LEGACY_OUTLET_TAGS, ROUTER_OUTLET, UI_PARAMS, UI_SREF, UI_SREF_ACTIVE, UI_SREF_ACTIVE_EQ,
    UI_VIEW,
};
use tracing::debug;

const EXACT_OPTIONS: &str = r#"[routerLinkActiveOptions]="{exact: true}""#;

/// Collect one replacement per vocabulary hit, against `markup`'s offsets.
///
/// An outlet attribute replaces its host's tags; any other span inside those
/// tags is dropped so the host rewrite wins.
pub fn collect_spans(markup: &str, nodes: &[MarkupNode]) -> Vec<ReplacementSpan> {
    let mut spans = Vec::new();
    let mut hosts: Vec<ReplacementSpan> = Vec::new();

    visit_all(nodes, &mut |visit| match visit {
        Visit::Element(el) => {
            if LEGACY_OUTLET_TAGS.contains(&el.name.as_str()) {
                spans.push(ReplacementSpan::new(el.name_span, ROUTER_OUTLET));
                if let Some(end_name) = el.end_name_span {
                    spans.push(ReplacementSpan::new(end_name, ROUTER_OUTLET));
                }
            }
        }
        Visit::Attribute { attr, host } if attr.name == UI_VIEW => {
            hosts.extend(outlet_host(attr, host));
        }
        Visit::Attribute { attr, .. } => {
            if let Some(replacement) = translate_attribute(attr) {
                spans.push(ReplacementSpan::new(attr.span, replacement));
            } else if let Some(text) = attr.span.slice(markup) {
                debug!(attribute = %text, "attribute left as is");
            }
        }
    });

    spans.retain(|span| !hosts.iter().any(|host| host.range.contains(&span.range)));
    spans.extend(hosts);
    spans
}

/// Rewrite `markup` given its parsed tree. With an empty tree nothing changes.
pub fn rewrite_markup(markup: &str, nodes: &[MarkupNode]) -> EditResult<String> {
    let spans = collect_spans(markup, nodes);
    if spans.is_empty() {
        return Ok(markup.to_string());
    }
    let outcome = apply_spans(markup, spans)?;
    debug!(
        applied = outcome.applied,
        skipped = outcome.skipped.len(),
        "template rewritten"
    );
    Ok(outcome.text)
}

/// Parse and rewrite in one step.
pub fn migrate_markup(markup: &str) -> EditResult<String> {
    rewrite_markup(markup, &parse_markup(markup))
}

fn translate_attribute(attr: &Attribute) -> Option<String> {
    let value = attr.value.as_str();
    match attr.name.as_str() {
        UI_SREF => Some(format!(r#"[routerLink]="['{}']""#, state_path(value))),
        UI_PARAMS => Some(format!(r#"[queryParams]="{value}""#)),
        UI_SREF_ACTIVE if value == "/" => Some(format!(r#"routerLinkActive="/" {EXACT_OPTIONS}"#)),
        UI_SREF_ACTIVE => Some(format!(r#"routerLinkActive="{value}""#)),
        UI_SREF_ACTIVE_EQ => Some(format!(r#"routerLinkActive="{value}" {EXACT_OPTIONS}"#)),
        _ => None,
    }
}

/// `parent.child` becomes `parent/child`; anything else is kept verbatim.
fn state_path(value: &str) -> String {
    if value.matches('.').count() == 1 {
        value.replacen('.', "/", 1)
    } else {
        value.to_string()
    }
}

fn outlet_host(attr: &Attribute, host: &Element) -> Vec<ReplacementSpan> {
    let open = if attr.value.is_empty() {
        format!("<{ROUTER_OUTLET}>")
    } else {
        format!(r#"<{ROUTER_OUTLET} [name]="{}">"#, attr.value)
    };
    let close = format!("</{ROUTER_OUTLET}>");

    match host.end_tag {
        Some(end_tag) => vec![
            ReplacementSpan::new(host.start_tag, open),
            ReplacementSpan::new(end_tag, close),
        ],
        None if host.self_closing || host.is_void() => {
            vec![ReplacementSpan::new(host.start_tag, open + &close)]
        }
        // Implicitly closed: close where the element ends.
        None => vec![
            ReplacementSpan::new(host.start_tag, open),
            ReplacementSpan::insert(host.span.end, close),
        ],
    }
}
