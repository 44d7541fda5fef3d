// Field schema per category.
// Classifies every field once, by name, and turns records into display rows.

use serde_json::Value;

use super::types::{Address, Category, Record};

/// How a field is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Structural: address, display name, timestamps.
    Suppressed,
    Scalar,
    /// Holds a single address (or null).
    Reference,
    /// Holds a list of addresses.
    References,
}

const SUPPRESSED: &[&str] = &["url", "name", "title", "created", "edited"];

/// Classify a field of `category` by name. Unknown fields are scalars.
pub fn classify(category: Category, field: &str) -> FieldKind {
    if SUPPRESSED.contains(&field) {
        return FieldKind::Suppressed;
    }
    match (category, field) {
        (Category::People | Category::Species, "homeworld") => FieldKind::Reference,
        (Category::People, "films" | "species" | "vehicles" | "starships")
        | (Category::Planets, "residents" | "films")
        | (Category::Films, "characters" | "planets" | "starships" | "vehicles" | "species")
        | (Category::Species, "people" | "films")
        | (Category::Vehicles | Category::Starships, "pilots" | "films") => FieldKind::References,
        _ => FieldKind::Scalar,
    }
}

/// Display value of one field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Reference(Address),
    References(Vec<Address>),
    /// A reference field the service left empty.
    Unset,
}

/// One row of a record's detail view.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayField {
    pub key: String,
    pub label: String,
    pub value: FieldValue,
}

impl DisplayField {
    /// Addresses a reader can follow from this row.
    pub fn targets(&self) -> &[Address] {
        match &self.value {
            FieldValue::Reference(address) => std::slice::from_ref(address),
            FieldValue::References(addresses) => addresses,
            FieldValue::Text(_) | FieldValue::Unset => &[],
        }
    }
}

/// Every non-structural field of `record`, in the order the service sent them.
pub fn display_fields(record: &Record) -> Vec<DisplayField> {
    record
        .fields()
        .iter()
        .filter_map(|(key, value)| {
            let value = match classify(record.category(), key) {
                FieldKind::Suppressed => return None,
                FieldKind::Scalar => FieldValue::Text(format_scalar(value)),
                FieldKind::Reference => match value.as_str().map(Address::parse) {
                    Some(Ok(address)) => FieldValue::Reference(address),
                    _ => FieldValue::Unset,
                },
                FieldKind::References => FieldValue::References(
                    value
                        .as_array()
                        .map(|items| {
                            items
                                .iter()
                                .filter_map(Value::as_str)
                                .filter_map(|s| Address::parse(s).ok())
                                .collect()
                        })
                        .unwrap_or_default(),
                ),
            };
            Some(DisplayField {
                key: key.clone(),
                label: humanize(key),
                value,
            })
        })
        .collect()
}

/// The two fields shown on a list card.
pub fn summary_fields(record: &Record) -> [(&'static str, String); 2] {
    let keys = match record.category() {
        Category::People => [("Birth Year", "birth_year"), ("Gender", "gender")],
        Category::Planets => [("Climate", "climate"), ("Population", "population")],
        Category::Films => [("Director", "director"), ("Released", "release_date")],
        Category::Species => [("Classification", "classification"), ("Language", "language")],
        Category::Vehicles => [("Model", "model"), ("Class", "vehicle_class")],
        Category::Starships => [("Model", "model"), ("Class", "starship_class")],
    };
    keys.map(|(label, key)| {
        let value = record
            .field(key)
            .map(format_scalar)
            .unwrap_or_else(|| "n/a".to_string());
        (label, value)
    })
}

/// `birth_year` -> `Birth year`, `MGLT` stays `MGLT`.
pub fn humanize(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn format_scalar(value: &Value) -> String {
    match value {
        Value::Null => "n/a".to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(format_scalar).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}
