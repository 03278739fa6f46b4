//! Value and label formatting for prompt lines.

use crate::metadata::{MetadataValue, Scalar};
use crate::schema::{option_label, PropertyOption};

/// Fallback label for keys the schema does not know:
/// `hair_color` becomes `Hair color`. Leading and trailing underscores
/// are dropped, so `_private_key` becomes `Private key`.
pub fn humanize_key(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let trimmed = spaced.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Format one scalar, preferring the matching option label.
pub fn format_scalar(scalar: &Scalar, options: &[PropertyOption]) -> Option<String> {
    let raw = scalar.to_string();
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let text = option_label(options, raw).unwrap_or(raw);
    Some(text.to_string())
}

/// Format a property value for display. `None` means the line is omitted.
pub fn format_value(value: &MetadataValue, options: &[PropertyOption]) -> Option<String> {
    match value {
        MetadataValue::Scalar(scalar) => format_scalar(scalar, options),
        MetadataValue::List(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(|item| format_scalar(item, options))
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        MetadataValue::Nested(_) => None,
    }
}
