//! Classify points by majority vote among their nearest labelled neighbors.
//!
//! Run with `cargo run --example knn_classifier`.

use std::collections::HashMap;

use kd_index::kdtree::TypedKDTree;
use kd_index::KDTreeError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, Level};

const CLASSES: [(&str, [f64; 3]); 3] = [
    ("red", [0., 0., 0.]),
    ("green", [5., 5., 0.]),
    ("blue", [0., 5., 5.]),
];
const K: usize = 7;

fn sample(rng: &mut StdRng, center: [f64; 3]) -> [f64; 3] {
    center.map(|c| c + rng.gen_range(-2.5..2.5))
}

type Classifier = TypedKDTree<[f64; 3], &'static str>;

fn classify(tree: &Classifier, point: &[f64; 3]) -> Result<&'static str, KDTreeError> {
    let mut votes: HashMap<&str, usize> = HashMap::new();
    for label in tree.nearest(point, K)? {
        *votes.entry(*label).or_default() += 1;
    }
    Ok(votes
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .map_or("unknown", |(label, _)| label))
}

fn accuracy(
    tree: &Classifier,
    queries: &[([f64; 3], &str)],
) -> Result<f64, KDTreeError> {
    let mut correct = 0;
    for (point, expected) in queries {
        if classify(tree, point)? == *expected {
            correct += 1;
        }
    }
    Ok(correct as f64 / queries.len() as f64)
}

fn main() -> Result<(), KDTreeError> {
    tracing_subscriber::fmt().with_max_level(Level::DEBUG).init();

    let mut rng = StdRng::seed_from_u64(7);
    let mut training = vec![];
    let mut queries = vec![];
    for (label, center) in CLASSES {
        training.extend((0..300).map(|_| (sample(&mut rng, center), label)));
        queries.extend((0..50).map(|_| (sample(&mut rng, center), label)));
    }

    let mut tree = Classifier::new();
    tree.insert_many(training.iter().copied())?;
    info!(size = tree.size(), dimensions = tree.dimensions(), "trained");
    info!(accuracy = accuracy(&tree, &queries)?, "classified queries");

    // forget a third of the training set, then rebuild around the origin
    let forgotten: Vec<[f64; 3]> = training.iter().step_by(3).map(|(p, _)| *p).collect();
    tree.delete_many(&forgotten)?;
    info!(
        size = tree.size(),
        nodes = tree.num_nodes(),
        deleted = tree.last_values().len(),
        "pruned"
    );

    tree.optimize(&[0., 0., 0.])?;
    info!(size = tree.size(), nodes = tree.num_nodes(), "optimized");
    info!(accuracy = accuracy(&tree, &queries)?, "classified queries");

    Ok(())
}
