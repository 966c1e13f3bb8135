//! Property tests for constraint sets and fingerprints.

use proptest::prelude::*;

use tether_core::{Constraint, ConstraintSet, FieldType, Fingerprint, Priority};

fn priority() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Low),
        Just(Priority::Medium),
        Just(Priority::High),
        Just(Priority::Critical),
    ]
}

fn records() -> impl Strategy<Value = Vec<Constraint>> {
    prop::collection::btree_map("[a-z]{1,6}", (priority(), "[a-z]{1,4}"), 1..12).prop_map(|m| {
        m.into_iter()
            .map(|(id, (p, field))| Constraint::field(id, p, &field, FieldType::String))
            .collect()
    })
}

proptest! {
    #[test]
    fn fingerprint_ignores_record_order(records in records(), seed in any::<u64>()) {
        let mut shuffled = records.clone();
        let n = shuffled.len();
        shuffled.rotate_left((seed as usize) % n);
        if seed % 2 == 0 {
            shuffled.reverse();
        }
        let a = ConstraintSet::from_records(records).unwrap();
        let b = ConstraintSet::from_records(shuffled).unwrap();
        prop_assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn duplicated_records_collapse(records in records()) {
        let doubled: Vec<Constraint> = records.iter().chain(records.iter()).cloned().collect();
        let once = ConstraintSet::from_records(records).unwrap();
        let twice = ConstraintSet::from_records(doubled).unwrap();
        prop_assert_eq!(once.len(), twice.len());
        prop_assert_eq!(once.fingerprint(), twice.fingerprint());
    }

    #[test]
    fn fingerprint_hex_roundtrips(bytes in any::<[u8; 32]>()) {
        let fp = Fingerprint::from_bytes(bytes);
        prop_assert_eq!(Fingerprint::from_hex(&fp.to_hex()), Some(fp));
    }
}
