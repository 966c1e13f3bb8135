//! Schema compiler: field declarations → nested field tree.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use tether_core::errors::CompileError;
use tether_core::ir::{SchemaField, SchemaFragment, SchemaType};
use tether_core::{Constraint, Enforcement, PatternSpec};

use super::RepresentationCompiler;

#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaCompiler;

impl RepresentationCompiler for SchemaCompiler {
    type Fragment = SchemaFragment;
    const TARGET: Enforcement = Enforcement::Schema;

    fn compile(&self, constraints: &[&Constraint]) -> Result<Option<SchemaFragment>, CompileError> {
        let targeted = Self::targeted(constraints);
        if targeted.is_empty() {
            return Ok(None);
        }

        let mut fields: BTreeMap<String, SchemaField> = BTreeMap::new();
        for c in targeted {
            let PatternSpec::Field {
                field,
                field_type,
                optional,
            } = &c.spec
            else {
                return Err(CompileError::invalid(
                    &c.id,
                    "schema constraint without a field payload",
                ));
            };

            let segments: Vec<&str> = field.split('.').collect();
            if segments.iter().any(|s| s.trim().is_empty()) {
                return Err(CompileError::invalid(
                    &c.id,
                    format!("malformed field path `{field}`"),
                ));
            }

            // Build the declared leaf, then wrap it in one object per parent
            // segment. Implicit parents share the leaf's optionality.
            let ids = BTreeSet::from([c.id.clone()]);
            let mut node = SchemaField {
                ty: SchemaType::from_declared(field_type, &c.id),
                optional: *optional,
                source_ids: ids.clone(),
            };
            for segment in segments[1..].iter().rev() {
                node = SchemaField {
                    ty: SchemaType::Object {
                        fields: BTreeMap::from([(segment.to_string(), node)]),
                    },
                    optional: *optional,
                    source_ids: ids.clone(),
                };
            }
            insert_field(&mut fields, segments[0], node)?;
        }

        Ok(Some(SchemaFragment { fields }))
    }
}

fn insert_field(
    fields: &mut BTreeMap<String, SchemaField>,
    path: &str,
    incoming: SchemaField,
) -> Result<(), CompileError> {
    let name = path.rsplit('.').next().unwrap_or(path);
    match fields.entry(name.to_string()) {
        Entry::Vacant(slot) => {
            slot.insert(incoming);
            Ok(())
        }
        Entry::Occupied(mut slot) => merge_field(path, slot.get_mut(), incoming),
    }
}

fn merge_field(path: &str, into: &mut SchemaField, from: SchemaField) -> Result<(), CompileError> {
    into.optional &= from.optional;
    merge_type(path, &mut into.ty, from.ty, &into.source_ids, &from.source_ids)?;
    into.source_ids.extend(from.source_ids);
    Ok(())
}

fn merge_type(
    path: &str,
    into: &mut SchemaType,
    from: SchemaType,
    into_ids: &BTreeSet<String>,
    from_ids: &BTreeSet<String>,
) -> Result<(), CompileError> {
    match from {
        SchemaType::Object { fields: incoming } => {
            let SchemaType::Object { fields } = into else {
                return Err(mismatch(path, into.name(), "object", into_ids, from_ids));
            };
            for (name, field) in incoming {
                insert_field(fields, &format!("{path}.{name}"), field)?;
            }
            Ok(())
        }
        SchemaType::Array { items: incoming } => {
            let SchemaType::Array { items } = into else {
                return Err(mismatch(path, into.name(), "array", into_ids, from_ids));
            };
            merge_type(&format!("{path}[]"), items, *incoming, into_ids, from_ids)
        }
        // Integer is the narrower numeric type; both declarations hold.
        SchemaType::Integer if *into == SchemaType::Number => {
            *into = SchemaType::Integer;
            Ok(())
        }
        SchemaType::Number if *into == SchemaType::Integer => Ok(()),
        other if *into == other => Ok(()),
        other => Err(mismatch(path, into.name(), other.name(), into_ids, from_ids)),
    }
}

fn mismatch(
    path: &str,
    existing: &str,
    declared: &str,
    into_ids: &BTreeSet<String>,
    from_ids: &BTreeSet<String>,
) -> CompileError {
    let ids: BTreeSet<&String> = into_ids.iter().chain(from_ids).collect();
    CompileError::InconsistentIR {
        constraint_ids: ids.into_iter().cloned().collect(),
        reason: format!("field `{path}` declared as both {existing} and {declared}"),
    }
}
