//! The tree checked against a linear scan over the same entries.

use std::collections::HashMap;

use proptest::prelude::*;

use crate::kdtree::KDTree;

// small integer grid so that duplicate keys and split ties are common
fn key() -> impl Strategy<Value = [f64; 2]> {
    (-8i8..8, -8i8..8).prop_map(|(x, y)| [x as f64, y as f64])
}

#[derive(Debug, Clone)]
enum Op {
    Insert([f64; 2], u32),
    Delete([f64; 2]),
}

fn ops() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(
        prop_oneof![
            3 => (key(), any::<u32>()).prop_map(|(k, v)| Op::Insert(k, v)),
            1 => key().prop_map(Op::Delete),
        ],
        0..120,
    )
}

fn to_bits(key: [f64; 2]) -> [u64; 2] {
    [key[0].to_bits(), key[1].to_bits()]
}

/// Apply `ops` to both a tree and a map keyed by coordinate bits.
fn apply(ops: &[Op]) -> (KDTree<f64, u32>, HashMap<[u64; 2], ([f64; 2], u32)>) {
    let mut tree = KDTree::new(2).unwrap();
    let mut model = HashMap::new();
    for op in ops {
        match op {
            Op::Insert(k, v) => {
                tree.insert(k, *v).unwrap();
                model.insert(to_bits(*k), (*k, *v));
            }
            Op::Delete(k) => {
                let expected = model.remove(&to_bits(*k)).is_some();
                assert_eq!(tree.delete(k).is_ok(), expected);
            }
        }
    }
    (tree, model)
}

fn sq_dist(a: [f64; 2], b: [f64; 2]) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)
}

proptest! {
    #[test]
    fn search_matches_model(ops in ops(), query in key()) {
        let (tree, model) = apply(&ops);
        prop_assert_eq!(tree.size(), model.len());
        prop_assert_eq!(
            tree.search(&query).unwrap().copied(),
            model.get(&to_bits(query)).map(|(_, v)| *v)
        );
        for (k, v) in model.values() {
            prop_assert_eq!(tree.search(k).unwrap(), Some(v));
        }
    }

    #[test]
    fn nearest_matches_linear_scan(ops in ops(), target in key(), n in 0usize..10) {
        let (tree, model) = apply(&ops);
        let n = n.min(model.len());

        let found: Vec<f64> = tree
            .nearest_keys(&target, n)
            .unwrap()
            .into_iter()
            .map(|k| sq_dist([k[0], k[1]], target))
            .collect();
        let mut expected: Vec<f64> = model.values().map(|(k, _)| sq_dist(*k, target)).collect();
        expected.sort_by(|a, b| a.partial_cmp(b).unwrap());
        expected.truncate(n);

        // ties may pick different entries, but the distances must agree
        prop_assert_eq!(found, expected);
    }

    #[test]
    fn range_matches_linear_scan(ops in ops(), a in key(), b in key()) {
        let (tree, model) = apply(&ops);
        let low = [a[0].min(b[0]), a[1].min(b[1])];
        let high = [a[0].max(b[0]), a[1].max(b[1])];

        let mut found: Vec<u32> = tree.range(&low, &high).unwrap().into_iter().copied().collect();
        let mut expected: Vec<u32> = model
            .values()
            .filter(|(k, _)| (0..2).all(|d| low[d] <= k[d] && k[d] <= high[d]))
            .map(|(_, v)| *v)
            .collect();
        found.sort_unstable();
        expected.sort_unstable();
        prop_assert_eq!(found, expected);
    }

    #[test]
    fn optimize_keeps_live_entries(ops in ops(), center in key()) {
        let (mut tree, model) = apply(&ops);
        tree.optimize(&center).unwrap();

        prop_assert_eq!(tree.size(), model.len());
        prop_assert_eq!(tree.num_nodes(), model.len());
        let map = tree.to_map().unwrap_or_default();
        prop_assert_eq!(map.len(), model.len());
        for (k, v) in map {
            prop_assert_eq!(model.get(&[k[0].to_bits(), k[1].to_bits()]).map(|(_, v)| v), Some(v));
        }
    }
}
