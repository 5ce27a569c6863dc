use std::cell::Cell;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use orderedset::{Cursor, OrderedSet, Options};

fn seeded<K: Ord, V>(seed: u64) -> OrderedSet<K, V> {
    let options = Options {
        seed: Some(seed),
        ..Options::default()
    };
    OrderedSet::with_options(|a: &K, b: &K| a.cmp(b), options)
}

fn forward<K: Clone, V: Clone>(set: &OrderedSet<K, V>) -> Vec<(K, V)> {
    let mut out = vec![];
    let mut cursor = set.next(Cursor::Begin);
    while let Cursor::At(node) = cursor {
        out.push((node.key().clone(), node.value().clone()));
        cursor = set.next(cursor);
    }
    out
}

fn backward<K: Clone, V: Clone>(set: &OrderedSet<K, V>) -> Vec<(K, V)> {
    let mut out = vec![];
    let mut cursor = set.previous(Cursor::End);
    while let Cursor::At(node) = cursor {
        out.push((node.key().clone(), node.value().clone()));
        cursor = set.previous(cursor);
    }
    out
}

#[test]
fn duplicates_and_removal() {
    let mut set = seeded(1);
    set.insert(5, "a").unwrap();
    set.insert(3, "b").unwrap();
    set.insert(8, "c").unwrap();
    set.insert(3, "d").unwrap();

    assert_eq!(set.len(), 4);
    assert_eq!(forward(&set), vec![(3, "d"), (3, "b"), (5, "a"), (8, "c")]);
    assert_eq!(backward(&set), vec![(8, "c"), (5, "a"), (3, "b"), (3, "d")]);

    assert!(set.remove(&3));
    assert_eq!(set.len(), 3);
    assert_eq!(forward(&set), vec![(3, "b"), (5, "a"), (8, "c")]);
    assert_eq!(set.find(&3), Some(&"b"));
    assert_eq!(set.find(&4), None);
}

#[test]
fn empty_set() {
    let mut set: OrderedSet<i32, ()> = OrderedSet::new();
    assert!(set.is_empty());
    assert_eq!(set.height(), 1);
    assert_eq!(set.first(), Cursor::End);
    assert_eq!(set.last(), Cursor::Begin);
    assert!(set.find_node(&1).is_none());
    assert!(!set.remove(&1));
    assert_eq!(set.iter().count(), 0);
}

#[test]
fn remove_only_entry() {
    let mut set = seeded(2);
    set.insert(1, ()).unwrap();
    assert!(set.remove(&1));
    assert!(set.is_empty());
    assert_eq!(set.first(), Cursor::End);
    assert_eq!(set.last(), Cursor::Begin);
    set.insert(2, ()).unwrap();
    assert_eq!(*set.first().node().unwrap().key(), 2);
    assert_eq!(set.first(), set.last());
}

#[test]
fn first_and_last_follow_the_ends() {
    let mut set = seeded(3);
    set.insert(10, ()).unwrap();
    set.insert(20, ()).unwrap();
    set.insert(5, ()).unwrap();
    assert_eq!(*set.first().node().unwrap().key(), 5);
    assert_eq!(*set.last().node().unwrap().key(), 20);

    assert!(set.remove(&20));
    assert_eq!(*set.last().node().unwrap().key(), 10);
    assert!(set.remove(&5));
    assert_eq!(*set.first().node().unwrap().key(), 10);
}

#[test]
fn node_handles() {
    let mut set = seeded(4);
    for i in 0..5 {
        set.insert(i, i * i).unwrap();
    }
    let node = set.find_node(&2).unwrap();
    assert_eq!(node.key(), &2);
    assert_eq!(node.value(), &4);
    assert_eq!(*node.next().node().unwrap().key(), 3);
    assert_eq!(*node.previous().node().unwrap().key(), 1);
    assert_eq!(set.find_node(&2), Some(node));

    let first = set.first().node().unwrap();
    assert_eq!(first.previous(), Cursor::Begin);
    let last = set.last().node().unwrap();
    assert_eq!(last.next(), Cursor::End);
}

#[test]
fn insert_returns_the_new_node() {
    let mut set = seeded(5);
    set.insert(1, "old").unwrap();
    let node = set.insert(1, "new").unwrap();
    assert_eq!(node.value(), &"new");
    assert_eq!(node.next().node().unwrap().value(), &"old");
    assert_eq!(node.previous(), Cursor::Begin);
}

#[test]
fn shuffled_workload() {
    let mut rng = StdRng::seed_from_u64(6);
    let mut keys: Vec<u32> = (0..5000).collect();
    keys.shuffle(&mut rng);

    let mut set = seeded(6);
    for &k in &keys {
        set.insert(k, k.to_string()).unwrap();
    }
    assert_eq!(set.len(), 5000);
    let sorted: Vec<u32> = set.iter().map(|(k, _)| *k).collect();
    assert_eq!(sorted, (0..5000).collect::<Vec<_>>());
    for &k in &keys {
        assert_eq!(set.find(&k), Some(&k.to_string()));
    }

    keys.shuffle(&mut rng);
    let (gone, kept) = keys.split_at(2500);
    for k in gone {
        assert!(set.remove(k));
    }
    assert_eq!(set.len(), 2500);
    for k in gone {
        assert!(!set.contains_key(k));
    }
    let mut kept = kept.to_vec();
    kept.sort();
    assert_eq!(set.iter().map(|(k, _)| *k).collect::<Vec<_>>(), kept);
    assert_eq!(
        set.iter().rev().map(|(k, _)| *k).collect::<Vec<_>>(),
        kept.iter().rev().cloned().collect::<Vec<_>>()
    );
}

#[test]
fn custom_comparator() {
    let mut set = OrderedSet::with_comp(|a: &String, b: &String| a.len().cmp(&b.len()));
    set.insert("ccc".to_owned(), 3).unwrap();
    set.insert("a".to_owned(), 1).unwrap();
    set.insert("bb".to_owned(), 2).unwrap();
    set.insert("dd".to_owned(), 4).unwrap();

    let keys: Vec<&str> = set.iter().map(|(k, _)| &**k).collect();
    assert_eq!(keys, vec!["a", "dd", "bb", "ccc"]);
    // Any key of the same length is equal under this ordering.
    assert_eq!(set.find(&"zz".to_owned()), Some(&4));
}

#[test]
fn destructors_see_every_entry() {
    let keys = Rc::new(Cell::new(0));
    let values = Rc::new(Cell::new(0));
    {
        let mut set: OrderedSet<u32, u32> = seeded(7);
        let k = keys.clone();
        let v = values.clone();
        set.set_destroy_key(Some(Rc::new(move |key: u32| k.set(k.get() + key))));
        set.set_destroy_value(Some(Rc::new(move |value: u32| v.set(v.get() + value))));
        for i in 1..=100 {
            set.insert(i, 2 * i).unwrap();
        }
        assert!(set.remove(&100));
        assert_eq!(keys.get(), 100);
        assert_eq!(values.get(), 200);
    }
    assert_eq!(keys.get(), 5050);
    assert_eq!(values.get(), 10100);
}

#[test]
fn owned_values_are_dropped_once() {
    let tracker = Rc::new(());
    {
        let mut set = seeded(8);
        for i in 0..1000 {
            set.insert(i, tracker.clone()).unwrap();
        }
        assert_eq!(Rc::strong_count(&tracker), 1001);
        for i in 0..500 {
            assert!(set.remove(&i));
        }
        assert_eq!(Rc::strong_count(&tracker), 501);
    }
    assert_eq!(Rc::strong_count(&tracker), 1);
}

#[test]
fn into_iter_moves_entries_out() {
    let mut set = seeded(9);
    for i in (0..10).rev() {
        set.insert(i, vec![i]).unwrap();
    }
    let entries: Vec<(i32, Vec<i32>)> = set.into_iter().collect();
    assert_eq!(entries.len(), 10);
    assert_eq!(entries[3], (3, vec![3]));
}

#[test]
fn find_mut_and_debug() {
    let mut set = seeded(10);
    set.insert(2, "b".to_owned()).unwrap();
    set.insert(1, "a".to_owned()).unwrap();
    set.find_mut(&2).unwrap().push('!');
    assert_eq!(format!("{:?}", set), "{1: \"a\", 2: \"b!\"}");
}

#[test]
fn level_cap() {
    let options = Options {
        max_level: 3,
        seed: Some(11),
        logger: None,
    };
    let mut set = OrderedSet::with_options(|a: &u32, b: &u32| a.cmp(b), options);
    for i in 0..10_000 {
        set.insert(i, ()).unwrap();
    }
    assert_eq!(set.height(), 3);
    assert_eq!(set.len(), 10_000);
}
