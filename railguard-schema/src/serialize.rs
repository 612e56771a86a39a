//! Schema tree → RAIL markup, and subtree pruning for reask prompts.
//!
//! The serialized form is what the model sees in place of `{output_schema}`.
//! `on-fail-*` attributes are corrective machinery, not output shape, so they
//! are never written back.

use quick_xml::escape::escape;

use railguard_core::FieldPath;

use crate::node::{NodeBody, SchemaNode};

/// Serialize a schema tree to RAIL markup.
///
/// The root node is written as `<output>`; nested nodes use their kind's tag.
pub fn to_rail(root: &SchemaNode) -> String {
    let mut out = String::new();
    write_node(&mut out, root, 0, true);
    out
}

fn write_node(out: &mut String, node: &SchemaNode, depth: usize, is_root: bool) {
    let indent = "    ".repeat(depth);
    let tag = if is_root { "output" } else { node.kind().tag() };

    out.push_str(&indent);
    out.push('<');
    out.push_str(tag);

    if !is_root && !node.name.is_empty() {
        push_attr(out, "name", &node.name);
    }
    if let Some(description) = &node.description {
        push_attr(out, "description", description);
    }
    if !node.directives.is_empty() {
        let format = node
            .directives
            .iter()
            .map(|d| d.format_token())
            .collect::<Vec<_>>()
            .join("; ");
        push_attr(out, "format", &format);
    }
    if !node.required {
        push_attr(out, "required", "false");
    }

    let children: Vec<&SchemaNode> = match &node.body {
        NodeBody::Scalar(_) => Vec::new(),
        NodeBody::List(element) => element.iter().map(|e| e.as_ref()).collect(),
        NodeBody::Object(fields) => fields.values().collect(),
    };

    if children.is_empty() && !is_root {
        out.push_str(" />\n");
        return;
    }

    out.push_str(">\n");
    for child in children {
        write_node(out, child, depth + 1, false);
    }
    out.push_str(&indent);
    out.push_str("</");
    out.push_str(tag);
    out.push_str(">\n");
}

fn push_attr(out: &mut String, key: &str, value: &str) {
    out.push(' ');
    out.push_str(key);
    out.push_str("=\"");
    out.push_str(&escape(value));
    out.push('"');
}

/// Cut a schema tree down to the given field paths and their ancestors.
///
/// Used to build the narrower reask schema: only the failing fields survive.
/// A path that names a container keeps that container's whole subtree. Paths
/// that descend into a list keep the list's element schema intact.
pub fn prune(root: &SchemaNode, paths: &[FieldPath]) -> SchemaNode {
    prune_inner(root, &FieldPath::root(), paths).unwrap_or_else(|| {
        // No path matched anything; an empty output shell is still a valid
        // (if useless) reask schema.
        SchemaNode::object(root.name.clone(), Default::default())
    })
}

fn prune_inner(node: &SchemaNode, prefix: &FieldPath, paths: &[FieldPath]) -> Option<SchemaNode> {
    // Inside a flagged subtree, or flagged directly: keep everything.
    if paths.iter().any(|p| prefix.starts_with(p)) {
        return Some(node.clone());
    }
    // Nothing below here is flagged: drop the node.
    if !paths.iter().any(|p| p.starts_with(prefix)) {
        return None;
    }

    // Some descendant is flagged; narrow the children.
    let body = match &node.body {
        NodeBody::Scalar(kind) => NodeBody::Scalar(*kind),
        NodeBody::List(element) => {
            // A flagged list element keeps the element contract as-is.
            NodeBody::List(element.clone())
        }
        NodeBody::Object(fields) => {
            let kept = fields
                .iter()
                .filter_map(|(name, child)| {
                    prune_inner(child, &prefix.key(name), paths)
                        .map(|pruned| (name.clone(), pruned))
                })
                .collect();
            NodeBody::Object(kept)
        }
    };

    Some(SchemaNode {
        name: node.name.clone(),
        description: node.description.clone(),
        required: node.required,
        directives: node.directives.clone(),
        body,
    })
}
