//! Markup document flattening for the document payload variant.

use roxmltree::{Document, Node};
use serde_json::{Map, Value};

/// Converts a markup document into a nested key/value structure rooted at the
/// document element's name. Attributes and child elements become keys;
/// repeated child names collapse into arrays; text-only elements become
/// strings.
pub(crate) fn document_to_value(text: &str) -> Result<Value, roxmltree::Error> {
    let doc = Document::parse(text)?;
    let root = doc.root_element();
    let mut out = Map::new();
    out.insert(root.tag_name().name().to_string(), element_value(root));
    Ok(Value::Object(out))
}

fn element_value(node: Node<'_, '_>) -> Value {
    let mut children = Map::new();

    for attr in node.attributes() {
        children.insert(attr.name().to_string(), Value::from(attr.value()));
    }

    for child in node.children().filter(|child| child.is_element()) {
        let name = child.tag_name().name().to_string();
        let value = element_value(child);
        match children.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                children.insert(name, value);
            }
        }
    }

    if children.is_empty() {
        return Value::from(node.text().unwrap_or_default().trim());
    }

    // Mixed content keeps its leading text under a reserved key.
    if let Some(text) = node.text() {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            children.insert("text".to_string(), Value::from(trimmed));
        }
    }

    Value::Object(children)
}
