use kvtree::serialization::serializer::{StrSerializer, UIntSerializer};
use kvtree::tree::CompareOp;
use kvtree::Tree;
use tempfile::tempdir;

#[test]
fn committed_writes_survive_a_reopen_uncommitted_writes_do_not() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("durability.kv");

    {
        let mut tree = Tree::open(&path, 256, 4, 8, 8, UIntSerializer).unwrap();
        tree.insert(&1, &[1; 8]).unwrap();
        tree.insert(&2, &[2; 8]).unwrap();
        tree.close().unwrap();
    }

    {
        let mut tree = Tree::open(&path, 256, 4, 8, 8, UIntSerializer).unwrap();
        assert_eq!(tree.get_record(&1).unwrap(), Some(vec![1; 8]));
        assert_eq!(tree.get_record(&2).unwrap(), Some(vec![2; 8]));
        assert_eq!(tree.len().unwrap(), 2);
        tree.close().unwrap();
    }
}

#[test]
fn splits_cascade_and_survive_a_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("splits.kv");

    {
        let mut tree = Tree::open(&path, 128, 3, 8, 8, UIntSerializer).unwrap();
        for key in 0..40u64 {
            tree.insert(&key, &key.to_be_bytes()).unwrap();
        }
        tree.close().unwrap();
    }

    let mut tree = Tree::open(&path, 128, 3, 8, 8, UIntSerializer).unwrap();
    assert_eq!(tree.len().unwrap(), 40);
    for key in 0..40u64 {
        assert_eq!(tree.get_record(&key).unwrap(), Some(key.to_be_bytes().to_vec()));
    }

    let items = tree.items().unwrap();
    let keys: Vec<u64> = items.iter().map(|(k, _)| *k).collect();
    assert_eq!(keys, (0..40u64).collect::<Vec<_>>());
}

#[test]
fn duplicate_key_insert_replaces_value_without_growing_len() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dup.kv");
    let mut tree = Tree::open(&path, 256, 4, 8, 8, UIntSerializer).unwrap();

    tree.insert(&5, &[1; 8]).unwrap();
    tree.insert(&5, &[9; 8]).unwrap();

    assert_eq!(tree.len().unwrap(), 1);
    assert_eq!(tree.get_record(&5).unwrap(), Some(vec![9; 8]));
}

#[test]
fn range_queries_return_ascending_matches() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("range.kv");
    let mut tree = Tree::open(&path, 256, 4, 8, 8, UIntSerializer).unwrap();

    for key in 0..10u64 {
        tree.insert(&key, &key.to_be_bytes()).unwrap();
    }

    let above_seven = tree.get_records(CompareOp::Gt, &7).unwrap();
    assert_eq!(
        above_seven,
        vec![8u64.to_be_bytes().to_vec(), 9u64.to_be_bytes().to_vec()]
    );

    let at_most_two = tree.get_records(CompareOp::Le, &2).unwrap();
    assert_eq!(
        at_most_two,
        vec![
            0u64.to_be_bytes().to_vec(),
            1u64.to_be_bytes().to_vec(),
            2u64.to_be_bytes().to_vec(),
        ]
    );
}

#[test]
fn string_keys_order_lexicographically() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("strings.kv");
    let mut tree = Tree::open(&path, 256, 4, 16, 4, StrSerializer).unwrap();

    tree.insert(&"banana".to_string(), b"b001").unwrap();
    tree.insert(&"apple".to_string(), b"a001").unwrap();
    tree.insert(&"cherry".to_string(), b"c001").unwrap();

    let items = tree.items().unwrap();
    let keys: Vec<String> = items.iter().map(|(k, _)| k.clone()).collect();
    assert_eq!(keys, vec!["apple", "banana", "cherry"]);
}
