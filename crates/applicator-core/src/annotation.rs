//! Annotation parsing
//!
//! An annotation is the raw string attached to a field, e.g.
//! `"trim,lower"` or `"default=guest"`. It parses into an ordered chain of
//! [`Directive`]s, executed left to right.
//!
//! - `""` is an empty chain: no transforms, but composite fields are still entered.
//! - `"-"` as the first token skips the field entirely, including descent.

/// One `name[=argument]` unit of an annotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Registered transform name
    pub name: String,
    /// Text after the first `=`, empty when absent
    pub argument: String,
}

impl Directive {
    fn parse(token: &str) -> Self {
        let (name, argument) = token.split_once('=').unwrap_or((token, ""));
        Self {
            name: name.to_string(),
            argument: argument.to_string(),
        }
    }
}

/// Parsed annotation of one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    /// Leave the field alone: no transforms, no descent
    Skip,
    /// Transforms to run in order; may be empty
    Chain(Vec<Directive>),
}

impl Annotation {
    /// Skip marker accepted as the first token
    pub const SKIP_MARKER: &'static str = "-";

    /// Parse a raw annotation string
    pub fn parse(raw: &str) -> Self {
        let mut tokens = raw.split(',').peekable();
        match tokens.peek() {
            Some(&"") | None => Self::Chain(Vec::new()),
            Some(&Self::SKIP_MARKER) => Self::Skip,
            Some(_) => Self::Chain(tokens.map(Directive::parse).collect()),
        }
    }

    /// Whether the field is opted out
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip)
    }

    /// Directives to run; empty for [`Annotation::Skip`]
    pub fn directives(&self) -> &[Directive] {
        match self {
            Self::Skip => &[],
            Self::Chain(directives) => directives,
        }
    }
}
