//! Diagnostics for `Kumadefile` loading failures.
//!
//! Every error names the manifest it came from. YAML syntax errors also carry
//! the manifest text and a one-character span so `miette` can point at the
//! offending position. Schema errors get a hint chosen from the serde message,
//! since most of them come from a handful of recipe-writing mistakes.

use miette::{Diagnostic, NamedSource, SourceSpan};
use serde_saphyr::Error as YamlError;
use thiserror::Error;

/// Error raised when a manifest cannot be loaded.
///
/// # Examples
/// ```rust
/// use kumade::manifest::ManifestError;
///
/// let err = ManifestError::UnsupportedVersion { found: "2.0.0".into() };
/// assert_eq!(err.to_string(), "unsupported kumade_version 2.0.0; expected 1.x");
/// ```
#[derive(Debug, Error, Diagnostic)]
pub enum ManifestError {
    /// The manifest is not well-formed YAML.
    #[error("{manifest}:{line}:{column}: invalid YAML: {detail}")]
    #[diagnostic(code(kumade::manifest::yaml))]
    Yaml {
        /// Display name of the manifest.
        manifest: String,
        /// 1-based line of the error, or 1 when unknown.
        line: usize,
        /// 1-based column of the error, or 1 when unknown.
        column: usize,
        /// Parser message.
        detail: String,
        /// Manifest text for source snippets.
        #[source_code]
        src: NamedSource<String>,
        /// Position of the error when the parser reported one.
        #[label("here")]
        span: Option<SourceSpan>,
        /// Suggested fix.
        #[help]
        help: Option<String>,
    },

    /// The YAML is valid but does not describe a manifest.
    #[error("{manifest} does not match the Kumadefile schema: {detail}")]
    #[diagnostic(code(kumade::manifest::schema))]
    Schema {
        /// Display name of the manifest.
        manifest: String,
        /// Deserialiser message.
        detail: String,
        /// Suggested fix.
        #[help]
        help: Option<String>,
    },

    /// The manifest declares a format version this build cannot read.
    #[error("unsupported kumade_version {found}; expected 1.x")]
    #[diagnostic(
        code(kumade::manifest::version),
        help("set `kumade_version: \"1.0.0\"` at the top of the manifest")
    )]
    UnsupportedVersion {
        /// Version string found in the manifest.
        found: String,
    },
}

/// Schema hints keyed on a fragment of the serde message.
const SCHEMA_HINTS: &[(&str, &str)] = &[
    (
        "mutually exclusive",
        "give each target exactly one of `command`, `fetch` or `link`",
    ),
    (
        "sha256 requires",
        "put `sha256` on the target whose `fetch` URL it verifies",
    ),
    (
        "target names must not be empty",
        "every target needs a non-empty `name`",
    ),
    (
        "unknown field",
        "manifests accept `kumade_version`, `vars`, `default`, `targets` and `clean`; \
         targets accept `name`, `deps`, `phony`, `description`, `command`, `fetch`, \
         `sha256` and `link`",
    ),
    (
        "invalid type: null",
        "the manifest is empty; start it with `kumade_version: \"1.0.0\"` and a `targets` list",
    ),
    (
        "missing field",
        "every manifest needs `kumade_version` and `targets`, and every target a `name`",
    ),
];

impl ManifestError {
    /// Describe a YAML syntax error in `manifest`, whose text is `src`.
    #[must_use]
    pub fn yaml(manifest: &str, src: &str, err: &YamlError) -> Self {
        let position = err.location().map(|loc| {
            (
                usize::try_from(loc.line()).unwrap_or(usize::MAX),
                usize::try_from(loc.column()).unwrap_or(usize::MAX),
            )
        });
        let (line, column) = position.unwrap_or((1, 1));
        let detail = err.to_string();
        Self::Yaml {
            manifest: manifest.to_owned(),
            line,
            column,
            help: yaml_hint(src, line, &detail).map(str::to_owned),
            span: position.map(|(l, c)| span_at(src, l, c)),
            src: NamedSource::new(manifest, src.to_owned()),
            detail,
        }
    }

    /// Describe a schema mismatch in `manifest`.
    #[must_use]
    pub fn schema(manifest: &str, err: &serde_json::Error) -> Self {
        let detail = err.to_string();
        let help = SCHEMA_HINTS
            .iter()
            .find(|(fragment, _)| detail.contains(fragment))
            .map(|(_, hint)| (*hint).to_owned());
        Self::Schema {
            manifest: manifest.to_owned(),
            detail,
            help,
        }
    }
}

fn yaml_hint(src: &str, line: usize, detail: &str) -> Option<&'static str> {
    let text = src.lines().nth(line.saturating_sub(1)).unwrap_or_default();
    if text
        .chars()
        .take_while(|c| c.is_whitespace())
        .any(|c| c == '\t')
    {
        return Some("indent with spaces; YAML does not allow tabs");
    }
    if detail.contains("mapping values are not allowed") {
        return Some("quote command lines that contain `: `");
    }
    if detail.contains("did not find expected '-'") {
        return Some("start every target with `- name:` at the same indentation");
    }
    None
}

/// Byte offset of a 1-based line and column, clamped to the end of `src`.
fn byte_offset(src: &str, line: usize, column: usize) -> usize {
    let line_start: usize = src
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    let text = src
        .get(line_start..)
        .and_then(|rest| rest.lines().next())
        .unwrap_or_default();
    let within = text
        .char_indices()
        .nth(column.saturating_sub(1))
        .map_or(text.len(), |(idx, _)| idx);
    line_start + within
}

fn span_at(src: &str, line: usize, column: usize) -> SourceSpan {
    let offset = byte_offset(src, line, column);
    let width = src
        .get(offset..)
        .and_then(|rest| rest.chars().next())
        .filter(|c| *c != '\n')
        .map_or(0, char::len_utf8);
    SourceSpan::new(offset.into(), width)
}
