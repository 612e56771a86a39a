//! Scalar and container kinds.
//!
//! The closed set of kinds a schema element can declare. `ScalarKind` is the
//! leaf set; `ValueKind` adds the two containers and is what directive
//! applicability is expressed against.

use std::fmt;

/// The declared kind of a scalar schema element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// Free-form text.
    String,
    /// Whole number.
    Integer,
    /// Floating-point number.
    Float,
    /// True/false.
    Boolean,
    /// Calendar date (ISO-8601 `YYYY-MM-DD`).
    Date,
    /// A URL, stored as text; well-formedness is a directive concern.
    Url,
}

impl ScalarKind {
    /// The element tag used for this kind in RAIL markup.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Url => "url",
        }
    }

    /// Look up a kind from its element tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "string" => Some(Self::String),
            "integer" => Some(Self::Integer),
            "float" => Some(Self::Float),
            "boolean" => Some(Self::Boolean),
            "date" => Some(Self::Date),
            "url" => Some(Self::Url),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Kind of any schema node, scalar or container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// A scalar leaf of the given kind.
    Scalar(ScalarKind),
    /// Homogeneous sequence.
    List,
    /// Named key-value container.
    Object,
}

impl ValueKind {
    /// The element tag used for this kind in RAIL markup.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Scalar(s) => s.tag(),
            Self::List => "list",
            Self::Object => "object",
        }
    }

    /// Whether this is a container kind.
    pub fn is_container(&self) -> bool {
        matches!(self, Self::List | Self::Object)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl From<ScalarKind> for ValueKind {
    fn from(kind: ScalarKind) -> Self {
        Self::Scalar(kind)
    }
}
