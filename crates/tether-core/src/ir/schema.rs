//! Schema fragment: nested field/type/optionality declarations.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::constraint::FieldType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Null,
    Array { items: Box<SchemaType> },
    Object { fields: BTreeMap<String, SchemaField> },
}

/// A compiled field. `source_ids` names every constraint that declared it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    #[serde(rename = "field_type")]
    pub ty: SchemaType,
    pub optional: bool,
    pub source_ids: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SchemaFragment {
    pub fields: BTreeMap<String, SchemaField>,
}

impl SchemaType {
    /// Lift a declared payload type, tagging nested fields with `source_id`.
    pub fn from_declared(ty: &FieldType, source_id: &str) -> Self {
        match ty {
            FieldType::String => Self::String,
            FieldType::Number => Self::Number,
            FieldType::Integer => Self::Integer,
            FieldType::Boolean => Self::Boolean,
            FieldType::Null => Self::Null,
            FieldType::Array { items } => Self::Array {
                items: Box::new(Self::from_declared(items, source_id)),
            },
            FieldType::Object { fields } => Self::Object {
                fields: fields
                    .iter()
                    .map(|(name, spec)| {
                        let field = SchemaField {
                            ty: Self::from_declared(&spec.ty, source_id),
                            optional: spec.optional,
                            source_ids: BTreeSet::from([source_id.to_string()]),
                        };
                        (name.clone(), field)
                    })
                    .collect(),
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Null => "null",
            Self::Array { .. } => "array",
            Self::Object { .. } => "object",
        }
    }

    /// Whether a literal emitted verbatim is a valid value of this type.
    pub fn admits_literal(&self, literal: &str) -> bool {
        match self {
            Self::String => true,
            Self::Number => is_json_number(literal),
            Self::Integer => is_json_number(literal) && !literal.contains(['.', 'e', 'E']),
            Self::Boolean => literal == "true" || literal == "false",
            Self::Null => literal == "null",
            Self::Array { .. } => literal.starts_with('[') && literal.ends_with(']'),
            Self::Object { .. } => literal.starts_with('{') && literal.ends_with('}'),
        }
    }

    fn to_json_schema(&self) -> Value {
        match self {
            Self::Array { items } => json!({"type": "array", "items": items.to_json_schema()}),
            Self::Object { fields } => object_schema(fields),
            other => json!({"type": other.name()}),
        }
    }
}

/// JSON number grammar: `-? (0 | [1-9][0-9]*) (\.[0-9]+)? ([eE][+-]?[0-9]+)?`.
fn is_json_number(s: &str) -> bool {
    let b = s.as_bytes();
    let mut i = 0;
    if b.get(i) == Some(&b'-') {
        i += 1;
    }
    match b.get(i) {
        Some(b'0') => i += 1,
        Some(c) if c.is_ascii_digit() => {
            while b.get(i).is_some_and(u8::is_ascii_digit) {
                i += 1;
            }
        }
        _ => return false,
    }
    if b.get(i) == Some(&b'.') {
        i += 1;
        let start = i;
        while b.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        if i == start {
            return false;
        }
    }
    if matches!(b.get(i), Some(b'e') | Some(b'E')) {
        i += 1;
        if matches!(b.get(i), Some(b'+') | Some(b'-')) {
            i += 1;
        }
        let start = i;
        while b.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        if i == start {
            return false;
        }
    }
    i == b.len()
}

fn object_schema(fields: &BTreeMap<String, SchemaField>) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for (name, field) in fields {
        properties.insert(name.clone(), field.ty.to_json_schema());
        if !field.optional {
            required.push(Value::String(name.clone()));
        }
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

impl SchemaFragment {
    /// Look up a field by dotted path (`billing.amount`).
    pub fn lookup(&self, path: &str) -> Option<&SchemaField> {
        let mut segments = path.split('.');
        let mut field = self.fields.get(segments.next()?)?;
        for segment in segments {
            match &field.ty {
                SchemaType::Object { fields } => field = fields.get(segment)?,
                _ => return None,
            }
        }
        Some(field)
    }

    /// Render as a JSON Schema object for structured-output backends.
    pub fn to_json_schema(&self) -> Value {
        object_schema(&self.fields)
    }

    /// Every constraint id contributing to the fragment.
    pub fn source_ids(&self) -> BTreeSet<&str> {
        fn collect<'a>(fields: &'a BTreeMap<String, SchemaField>, out: &mut BTreeSet<&'a str>) {
            for field in fields.values() {
                out.extend(field.source_ids.iter().map(String::as_str));
                let mut ty = &field.ty;
                while let SchemaType::Array { items } = ty {
                    ty = items.as_ref();
                }
                if let SchemaType::Object { fields } = ty {
                    collect(fields, out);
                }
            }
        }
        let mut out = BTreeSet::new();
        collect(&self.fields, &mut out);
        out
    }
}
