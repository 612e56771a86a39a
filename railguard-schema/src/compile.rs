//! RAIL markup → schema tree.
//!
//! Compilation is the only place directive strings are parsed: every `format`
//! token is resolved against the validator registry here, and anything
//! unknown or inapplicable to the element's kind is dropped with a warning.
//! The resulting tree carries compiled validators only.

use indexmap::IndexMap;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, warn};

use railguard_core::{OnFailAction, ScalarKind, SchemaError, ValidatorRegistry};

use crate::node::{Directive, NodeBody, SchemaNode};
use crate::prompt::PromptSkeleton;

/// A compiled RAIL document: the output schema plus the prompt skeleton.
#[derive(Debug, Clone)]
pub struct Rail {
    /// Root of the output schema. Always an object node named `output`.
    pub output: SchemaNode,
    /// The `<prompt>` sibling, if the document declared one.
    pub prompt: Option<PromptSkeleton>,
}

/// Compile a RAIL document against a validator registry.
pub fn compile_rail(source: &str, registry: &ValidatorRegistry) -> Result<Rail, SchemaError> {
    let root = parse_document(source)?;
    if root.tag != "rail" {
        return Err(SchemaError::malformed(format!(
            "expected <rail> root, found <{}>",
            root.tag
        )));
    }

    let output_elem = root
        .children
        .iter()
        .find(|c| c.tag == "output")
        .ok_or(SchemaError::MissingOutput)?;

    // Pass-wide default for directives without an explicit on-fail attribute.
    let default_on_fail = match output_elem.attr("on-fail") {
        Some(value) => OnFailAction::parse(value)?,
        None => OnFailAction::default(),
    };

    let fields = build_object_fields(output_elem, default_on_fail, registry)?;
    let mut output = SchemaNode::object("output", fields);
    output.directives =
        build_directives(output_elem, "output", output.kind(), default_on_fail, registry)?;

    let prompt = root
        .children
        .iter()
        .find(|c| c.tag == "prompt")
        .map(|p| PromptSkeleton::new(p.text.trim()));

    debug!(fields = output.fields().map(|f| f.len()).unwrap_or(0), has_prompt = prompt.is_some(), "compiled rail document");

    Ok(Rail { output, prompt })
}

// ---------------------------------------------------------------------------
// Raw XML parsing
// ---------------------------------------------------------------------------

struct RawElement {
    tag: String,
    attrs: Vec<(String, String)>,
    children: Vec<RawElement>,
    text: String,
}

impl RawElement {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

fn parse_document(source: &str) -> Result<RawElement, SchemaError> {
    let mut reader = Reader::from_str(source);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<RawElement> = Vec::new();
    let mut root: Option<RawElement> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                stack.push(raw_element(&e)?);
            }
            Ok(Event::Empty(e)) => {
                let elem = raw_element(&e)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(elem),
                    None => root = Some(elem),
                }
            }
            Ok(Event::End(_)) => {
                let elem = stack
                    .pop()
                    .ok_or_else(|| SchemaError::malformed("unbalanced closing tag"))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(elem),
                    None => root = Some(elem),
                }
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| SchemaError::malformed(e.to_string()))?;
                if let Some(parent) = stack.last_mut() {
                    if !parent.text.is_empty() {
                        parent.text.push('\n');
                    }
                    parent.text.push_str(&text);
                }
            }
            Ok(Event::CData(t)) => {
                if let Some(parent) = stack.last_mut() {
                    parent.text.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Ok(Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_)) => {}
            Ok(Event::Eof) => break,
            Err(e) => return Err(SchemaError::malformed(e.to_string())),
        }
    }

    if !stack.is_empty() {
        return Err(SchemaError::malformed("unclosed element"));
    }
    root.ok_or_else(|| SchemaError::malformed("empty document"))
}

fn raw_element(start: &quick_xml::events::BytesStart<'_>) -> Result<RawElement, SchemaError> {
    let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| SchemaError::malformed(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| SchemaError::malformed(e.to_string()))?
            .into_owned();
        attrs.push((key, value));
    }
    Ok(RawElement {
        tag,
        attrs,
        children: Vec::new(),
        text: String::new(),
    })
}

// ---------------------------------------------------------------------------
// Tree construction
// ---------------------------------------------------------------------------

fn build_object_fields(
    parent: &RawElement,
    default_on_fail: OnFailAction,
    registry: &ValidatorRegistry,
) -> Result<IndexMap<String, SchemaNode>, SchemaError> {
    let mut fields = IndexMap::new();
    for child in &parent.children {
        let name = child
            .attr("name")
            .ok_or_else(|| SchemaError::MissingName {
                tag: child.tag.clone(),
            })?
            .to_string();
        if fields.contains_key(&name) {
            return Err(SchemaError::DuplicateField { name });
        }
        let node = build_node(child, &name, default_on_fail, registry)?;
        fields.insert(name, node);
    }
    Ok(fields)
}

fn build_node(
    elem: &RawElement,
    name: &str,
    default_on_fail: OnFailAction,
    registry: &ValidatorRegistry,
) -> Result<SchemaNode, SchemaError> {
    let body = match elem.tag.as_str() {
        "object" => NodeBody::Object(build_object_fields(elem, default_on_fail, registry)?),
        "list" => {
            if elem.children.len() > 1 {
                return Err(SchemaError::ListArity {
                    name: name.to_string(),
                });
            }
            let element = match elem.children.first() {
                Some(child) => {
                    // A list's element child does not need a name.
                    let child_name = child.attr("name").unwrap_or("item");
                    Some(Box::new(build_node(
                        child,
                        child_name,
                        default_on_fail,
                        registry,
                    )?))
                }
                None => None,
            };
            NodeBody::List(element)
        }
        tag => match ScalarKind::from_tag(tag) {
            Some(kind) => {
                if !elem.children.is_empty() {
                    return Err(SchemaError::ScalarWithChildren {
                        tag: tag.to_string(),
                    });
                }
                NodeBody::Scalar(kind)
            }
            None => {
                return Err(SchemaError::UnknownTag {
                    tag: tag.to_string(),
                })
            }
        },
    };

    let mut node = SchemaNode {
        name: name.to_string(),
        description: elem.attr("description").map(str::to_string),
        required: match elem.attr("required") {
            Some("false") => false,
            _ => true,
        },
        directives: Vec::new(),
        body,
    };
    node.directives = build_directives(elem, name, node.kind(), default_on_fail, registry)?;
    Ok(node)
}

fn build_directives(
    elem: &RawElement,
    field: &str,
    kind: railguard_core::ValueKind,
    default_on_fail: OnFailAction,
    registry: &ValidatorRegistry,
) -> Result<Vec<Directive>, SchemaError> {
    let Some(format) = elem.attr("format") else {
        return Ok(Vec::new());
    };

    let mut directives = Vec::new();
    for (name, params) in parse_format(format) {
        let on_fail = match elem.attr(&format!("on-fail-{name}")) {
            Some(value) => OnFailAction::parse(value)?,
            None => default_on_fail,
        };
        match registry.resolve(&name, kind, &params)? {
            Some(validator) => {
                debug!(directive = %name, field = %field, %on_fail, "bound directive");
                directives.push(Directive::new(name, params, on_fail, validator));
            }
            None => {
                warn!(
                    directive = %name,
                    field = %field,
                    %kind,
                    "dropping directive: not registered for this kind"
                );
            }
        }
    }
    Ok(directives)
}

/// Split a `format` attribute into (name, raw params) tokens.
///
/// Directives are separated by `;`; a directive may carry parameters after a
/// `:`. The parameter text is kept verbatim (outer whitespace trimmed) so
/// free-form parameters such as regexes keep their internal spacing; each
/// factory tokenizes it as it sees fit. A semicolon-free, colon-free value
/// may list several bare directives separated by spaces.
fn parse_format(format: &str) -> Vec<(String, String)> {
    let mut tokens = Vec::new();
    for piece in format.split(';') {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        match piece.split_once(':') {
            Some((name, params)) => {
                tokens.push((name.trim().to_string(), params.trim().to_string()));
            }
            None => {
                for bare in piece.split_whitespace() {
                    tokens.push((bare.to_string(), String::new()));
                }
            }
        }
    }
    tokens
}
