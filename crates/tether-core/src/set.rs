//! ConstraintSet: deduplicated `id → Constraint` mapping with a canonical
//! fingerprint.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constraint::Constraint;
use crate::errors::CompileError;
use crate::fingerprint::Fingerprint;

/// Domain separator so set fingerprints never collide with other blake3 uses.
const FINGERPRINT_DOMAIN: &[u8] = b"tether.constraint-set.v1";

/// A deduplicated set of constraints keyed by id.
///
/// Members are kept sorted by id, so iteration order (and therefore every
/// downstream computation) is independent of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Constraint>", into = "Vec<Constraint>")]
pub struct ConstraintSet {
    members: BTreeMap<String, Constraint>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from externally produced records.
    ///
    /// Identical duplicates collapse; two different constraints sharing an id
    /// are rejected, since keeping either would depend on record order.
    pub fn from_records(
        records: impl IntoIterator<Item = Constraint>,
    ) -> Result<Self, CompileError> {
        let mut set = Self::new();
        for record in records {
            set.insert(record)?;
        }
        Ok(set)
    }

    /// Parse a JSON record list (the producer input contract).
    pub fn from_json(json: &str) -> Result<Self, CompileError> {
        let records: Vec<Constraint> =
            serde_json::from_str(json).map_err(|e| CompileError::InvalidConstraint {
                constraint_id: "<input>".to_string(),
                reason: format!("malformed constraint record list: {e}"),
            })?;
        Self::from_records(records)
    }

    /// Insert a constraint. Returns `true` if it was new.
    pub fn insert(&mut self, constraint: Constraint) -> Result<bool, CompileError> {
        match self.members.get(&constraint.id) {
            Some(existing) if *existing == constraint => Ok(false),
            Some(_) => Err(CompileError::invalid(
                &constraint.id,
                "duplicate id with a different definition",
            )),
            None => {
                self.members.insert(constraint.id.clone(), constraint);
                Ok(true)
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Constraint> {
        self.members.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.contains_key(id)
    }

    /// Members in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.members.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Hash of the canonical (sorted-by-id) serialization of every member.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = blake3::Hasher::new();
        hasher.update(FINGERPRINT_DOMAIN);
        for constraint in self.members.values() {
            // Serializing plain data structures cannot fail; an empty record
            // would still be length-prefixed and therefore unambiguous.
            let bytes = serde_json::to_vec(constraint).unwrap_or_default();
            hasher.update(&(bytes.len() as u64).to_le_bytes());
            hasher.update(&bytes);
        }
        Fingerprint::from(hasher.finalize())
    }
}

impl TryFrom<Vec<Constraint>> for ConstraintSet {
    type Error = CompileError;

    fn try_from(records: Vec<Constraint>) -> Result<Self, Self::Error> {
        Self::from_records(records)
    }
}

impl From<ConstraintSet> for Vec<Constraint> {
    fn from(set: ConstraintSet) -> Self {
        set.members.into_values().collect()
    }
}

impl<'a> IntoIterator for &'a ConstraintSet {
    type Item = &'a Constraint;
    type IntoIter = std::collections::btree_map::Values<'a, String, Constraint>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{FieldType, Priority};

    fn amount() -> Constraint {
        Constraint::field("amount-type", Priority::High, "amount", FieldType::Number)
    }

    fn pattern() -> Constraint {
        Constraint::regex("amount-format", Priority::High, "amount", r"^[0-9]+$")
    }

    #[test]
    fn fingerprint_ignores_insertion_order() {
        let a = ConstraintSet::from_records(vec![amount(), pattern()]).unwrap();
        let b = ConstraintSet::from_records(vec![pattern(), amount()]).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_changes_with_content() {
        let a = ConstraintSet::from_records(vec![amount()]).unwrap();
        let b = ConstraintSet::from_records(vec![amount().with_confidence(0.5)]).unwrap();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn identical_duplicates_collapse() {
        let mut set = ConstraintSet::new();
        assert!(set.insert(amount()).unwrap());
        assert!(!set.insert(amount()).unwrap());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn conflicting_duplicates_are_rejected() {
        let err = ConstraintSet::from_records(vec![amount(), amount().with_confidence(0.2)])
            .unwrap_err();
        assert!(matches!(err, CompileError::InvalidConstraint { .. }));
    }

    #[test]
    fn parses_json_record_list() {
        let json = r#"[
            {"id": "b", "kind": "syntactic", "priority": "low", "enforcement": "regex",
             "pattern_or_spec": {"type": "regex", "field": "code", "pattern": "^[A-Z]{3}$"}},
            {"id": "a", "kind": "semantic", "priority": "high", "enforcement": "advisory",
             "pattern_or_spec": {"type": "text", "description": "prefer pure functions"}}
        ]"#;
        let set = ConstraintSet::from_json(json).unwrap();
        assert_eq!(set.ids().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn deserializing_rejects_conflicting_duplicates_in_any_order() {
        let a = Constraint::regex("code", Priority::High, "code", "^A$");
        let b = Constraint::regex("code", Priority::High, "code", "^B$");
        for records in [vec![a.clone(), b.clone()], vec![b, a]] {
            let json = serde_json::to_string(&records).unwrap();
            let err = serde_json::from_str::<ConstraintSet>(&json).unwrap_err();
            assert!(err.to_string().contains("duplicate id"), "{err}");
        }
    }

    #[test]
    fn deserializing_collapses_identical_duplicates() {
        let json = serde_json::to_string(&vec![amount(), pattern(), amount()]).unwrap();
        let set: ConstraintSet = serde_json::from_str(&json).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set, ConstraintSet::from_records(vec![pattern(), amount()]).unwrap());
    }

    #[test]
    fn malformed_json_is_invalid_constraint() {
        let err = ConstraintSet::from_json("[{\"id\": 3}]").unwrap_err();
        assert!(matches!(err, CompileError::InvalidConstraint { .. }));
    }
}
