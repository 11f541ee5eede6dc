//! Text renderings of lookup results, as shown to the decision-maker.

use super::{EntityRecord, PropertyExample, PropertyValue, SearchHit};

/// Values shown per property in [`format_entity_info`].
pub const VALUES_PER_PROPERTY: usize = 3;

/// One `label (id): description` line per hit, followed by its type.
pub fn format_search_results(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "No results found.".into();
    }

    let mut lines = Vec::with_capacity(hits.len() * 2);
    for hit in hits {
        let label = if hit.label.is_empty() { &hit.id } else { &hit.label };
        lines.push(format!("{label} ({}): {}", hit.id, hit.description));
        if !hit.entity_type.is_empty() {
            lines.push(format!("  Type: {}", hit.entity_type));
        }
    }
    lines.join("\n")
}

/// Entity header, types, and the first few values of each property.
pub fn format_entity_info(record: &EntityRecord) -> String {
    let mut lines = vec![format!("Entity: {}", record.entity)];
    if !record.types.is_empty() {
        lines.push(format!("Types: {}", record.types.join(", ")));
    }

    lines.push("\nProperties:".into());
    for (name, values) in &record.properties {
        lines.push(format!("  {name}:"));
        for value in values.iter().take(VALUES_PER_PROPERTY) {
            match value {
                PropertyValue::Uri { value, .. } => lines.push(format!("    -> {value}")),
                PropertyValue::Literal { value, .. } => lines.push(format!("    = {value}")),
            }
        }
    }
    lines.join("\n")
}

/// One `subject -- property --> object` line per example.
pub fn format_property_examples(examples: &[PropertyExample]) -> String {
    if examples.is_empty() {
        return "No examples found".into();
    }
    examples
        .iter()
        .map(|e| format!("{} -- {} --> {}", e.subject, e.property, e.object))
        .collect::<Vec<_>>()
        .join("\n")
}
