use std::collections::HashMap;
use std::sync::Arc;

use fhash::{bucket_hash, bucket_index, FileHashTable, FileObject, InsertOutcome, MAX_BUCKETS};
use proptest::prelude::*;

const NAMES: usize = 4;
const COPIES: usize = 3;

#[derive(Debug, Clone)]
enum Op {
    Insert(usize),
    Remove(usize),
    Lookup(usize),
}

fn op() -> impl Strategy<Value = Op> {
    let obj = 0..NAMES * COPIES;
    prop_oneof![
        obj.clone().prop_map(Op::Insert),
        obj.clone().prop_map(Op::Remove),
        obj.prop_map(Op::Lookup),
    ]
}

proptest! {
    #[test]
    fn hash_is_pure(name in ".{0,64}", buckets in 1usize..=MAX_BUCKETS) {
        let copy = name.clone();
        prop_assert_eq!(bucket_hash(&name), bucket_hash(&copy));
        prop_assert_eq!(bucket_index(&name, buckets), bucket_index(&copy, buckets));
        prop_assert!(bucket_index(&name, buckets) < buckets);
    }

    #[test]
    fn table_matches_model(ops in prop::collection::vec(op(), 1..64), buckets in 1usize..8) {
        let table = FileHashTable::with_buckets(buckets).unwrap();
        let files: Vec<_> = (0..NAMES * COPIES)
            .map(|i| Arc::new(FileObject::opened(format!("name.{}", i % NAMES), i as i32 + 3)))
            .collect();
        // name -> index of the file currently holding it
        let mut model: HashMap<String, usize> = HashMap::new();

        for op in ops {
            match op {
                Op::Insert(i) => {
                    let name = files[i].name().to_string();
                    let outcome = table.insert(&files[i]).unwrap();
                    match model.get(&name) {
                        Some(&j) if j == i => {
                            prop_assert!(matches!(outcome, InsertOutcome::AlreadyHashed));
                        }
                        Some(&j) => {
                            prop_assert!(Arc::ptr_eq(outcome.alias().unwrap(), &files[j]));
                        }
                        None => {
                            prop_assert!(outcome.is_inserted());
                            model.insert(name, i);
                        }
                    }
                }
                Op::Remove(i) => {
                    let name = files[i].name().to_string();
                    let removed = table.remove(&files[i]).unwrap();
                    let expected = model.get(&name) == Some(&i);
                    prop_assert_eq!(removed, expected);
                    if expected {
                        model.remove(&name);
                    }
                }
                Op::Lookup(i) => {
                    let found = table.lookup(files[i].name()).unwrap();
                    match model.get(files[i].name()) {
                        Some(&j) => prop_assert!(Arc::ptr_eq(&found.unwrap(), &files[j])),
                        None => prop_assert!(found.is_none()),
                    }
                }
            }

            for (i, f) in files.iter().enumerate() {
                let member = model.get(f.name()) == Some(&i);
                prop_assert_eq!(f.is_hashed(), member);
            }
            prop_assert_eq!(table.len(), model.len());
        }
    }
}
