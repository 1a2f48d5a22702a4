//! The fixed UI-Router vocabulary recognised in templates and sources.

/// `uiSref="state.name"`: link to a state.
pub const UI_SREF: &str = "uiSref";
/// `uiParams="expr"`: parameters for the linked state.
pub const UI_PARAMS: &str = "uiParams";
/// `uiSrefActiveEq="cls"`: active class on exact state match.
pub const UI_SREF_ACTIVE_EQ: &str = "uiSrefActiveEq";
/// `uiSrefActive="cls"`: active class on state or descendant match.
pub const UI_SREF_ACTIVE: &str = "uiSrefActive";
/// `ui-view` attribute (or element): a named or unnamed outlet.
pub const UI_VIEW: &str = "ui-view";

/// Attribute names the markup rewriter acts on.
pub const ROUTER_ATTRIBUTES: &[&str] = &[UI_SREF, UI_PARAMS, UI_SREF_ACTIVE_EQ, UI_SREF_ACTIVE, UI_VIEW];

/// Element names that are renamed to the standard outlet.
pub const LEGACY_OUTLET_TAGS: &[&str] = &["ui-router", UI_VIEW];

/// The standard router outlet element.
pub const ROUTER_OUTLET: &str = "router-outlet";

/// Cheap textual pre-filter: the file talks to UI-Router.
pub const LEGACY_ROUTER_MARKER: &str = "@uirouter";
/// Cheap textual pre-filter: the file declares a component.
pub const COMPONENT_MARKER: &str = "@Component";

/// The decorator whose metadata carries the template.
pub const COMPONENT_DECORATOR: &str = "Component";

/// The UI-Router lifecycle hook that needs a route injected.
pub const PARAMS_CHANGED_HOOK: &str = "uiOnParamsChanged";
/// Module and symbol of the injected route type.
pub const ROUTER_MODULE: &str = "@angular/router";
pub const ROUTE_TYPE: &str = "ActivatedRoute";
pub const ROUTE_PARAM: &str = "activatedRoute";

/// Dependency that must be present for the ui-router migration to run.
pub const UI_ROUTER_PACKAGE: &str = "@uirouter/angular";

/// True when `text` mentions any attribute or tag of the vocabulary.
pub fn mentions_router_vocabulary(text: &str) -> bool {
    ROUTER_ATTRIBUTES.iter().any(|token| text.contains(token))
        || LEGACY_OUTLET_TAGS.iter().any(|tag| text.contains(tag))
}
