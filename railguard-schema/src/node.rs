//! The compiled schema tree.

use std::sync::Arc;

use indexmap::IndexMap;

use railguard_core::{OnFailAction, ScalarKind, Validator, ValueKind};

/// A directive bound to its compiled validator.
///
/// Binding happens once at schema compile time; validation never re-parses
/// directive strings.
#[derive(Clone)]
pub struct Directive {
    /// Directive name as written in the `format` attribute.
    pub name: String,
    /// Raw parameter text after the `:`, kept verbatim for re-serialization.
    /// Empty for a bare directive.
    pub params: String,
    /// Action applied when the check fails.
    pub on_fail: OnFailAction,
    validator: Arc<dyn Validator>,
}

impl Directive {
    /// Create a bound directive.
    pub fn new(
        name: impl Into<String>,
        params: impl Into<String>,
        on_fail: OnFailAction,
        validator: Arc<dyn Validator>,
    ) -> Self {
        Self {
            name: name.into(),
            params: params.into(),
            on_fail,
            validator,
        }
    }

    /// The compiled validator.
    pub fn validator(&self) -> &Arc<dyn Validator> {
        &self.validator
    }

    /// The directive as it appears in a `format` attribute.
    pub fn format_token(&self) -> String {
        if self.params.is_empty() {
            self.name.clone()
        } else {
            format!("{}: {}", self.name, self.params)
        }
    }
}

impl std::fmt::Debug for Directive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Directive")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("on_fail", &self.on_fail)
            .finish()
    }
}

// Structural equality: two directives are the same if they were written the
// same way. The bound validator is derived from exactly those parts.
impl PartialEq for Directive {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.params == other.params && self.on_fail == other.on_fail
    }
}

/// Shape of one schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeBody {
    /// A typed leaf.
    Scalar(ScalarKind),
    /// A homogeneous sequence. `None` means the list declared no element
    /// type: elements are decoded best-effort and not structurally validated.
    List(Option<Box<SchemaNode>>),
    /// Named fields in declaration order. Order matters for re-assembly of
    /// output, not for validation.
    Object(IndexMap<String, SchemaNode>),
}

/// One node of the compiled schema tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    /// Field name. The root output node is named `output`.
    pub name: String,
    /// Optional human description, shown to the model.
    pub description: Option<String>,
    /// Whether the model must produce this field.
    pub required: bool,
    /// Bound directives, in declaration order.
    pub directives: Vec<Directive>,
    /// The node's shape.
    pub body: NodeBody,
}

impl SchemaNode {
    /// Create a scalar node with no directives.
    pub fn scalar(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self {
            name: name.into(),
            description: None,
            required: true,
            directives: Vec::new(),
            body: NodeBody::Scalar(kind),
        }
    }

    /// Create an object node from its fields.
    pub fn object(name: impl Into<String>, fields: IndexMap<String, SchemaNode>) -> Self {
        Self {
            name: name.into(),
            description: None,
            required: true,
            directives: Vec::new(),
            body: NodeBody::Object(fields),
        }
    }

    /// Create a list node.
    pub fn list(name: impl Into<String>, element: Option<SchemaNode>) -> Self {
        Self {
            name: name.into(),
            description: None,
            required: true,
            directives: Vec::new(),
            body: NodeBody::List(element.map(Box::new)),
        }
    }

    /// The node's kind.
    pub fn kind(&self) -> ValueKind {
        match &self.body {
            NodeBody::Scalar(kind) => ValueKind::Scalar(*kind),
            NodeBody::List(_) => ValueKind::List,
            NodeBody::Object(_) => ValueKind::Object,
        }
    }

    /// Object fields, if this is an object.
    pub fn fields(&self) -> Option<&IndexMap<String, SchemaNode>> {
        match &self.body {
            NodeBody::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// Element schema, if this is a list that declared one.
    pub fn element(&self) -> Option<&SchemaNode> {
        match &self.body {
            NodeBody::List(element) => element.as_deref(),
            _ => None,
        }
    }
}
