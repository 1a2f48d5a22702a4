//! Error types for ngmigrate-source.

use camino::Utf8PathBuf;
use ngmigrate_edit::EditError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to load the TypeScript grammar: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    #[error("{path}: not valid TypeScript")]
    Parse { path: Utf8PathBuf },

    /// A derived class with a `uiOnParamsChanged` hook but no constructor.
    /// Synthesizing one would need the base constructor's signature.
    #[error(
        "{path}: class {class} extends another class and has no constructor; \
         add `private activatedRoute: ActivatedRoute` to a constructor by hand"
    )]
    UnsupportedConstructor { path: Utf8PathBuf, class: String },

    #[error("{path}: component {class} has no inline template")]
    NoInlineTemplate { path: Utf8PathBuf, class: String },

    #[error("{path}: {source}")]
    Edit {
        path: Utf8PathBuf,
        #[source]
        source: EditError,
    },
}

pub type SourceResult<T> = Result<T, SourceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_constructor_names_class_and_fix() {
        let err = SourceError::UnsupportedConstructor {
            path: "app/child.component.ts".into(),
            class: "ChildComponent".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("app/child.component.ts: class ChildComponent"));
        assert!(msg.contains("private activatedRoute: ActivatedRoute"));
    }
}
