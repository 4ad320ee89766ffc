#![allow(dead_code)]
use std::collections::HashMap;

use itertools::Itertools;
use junctree::{PairwiseModel, VarId};
use ndarray::{array, Array1, Array2};
use ndarray_rand::rand::{Rng, SeedableRng};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand_xoshiro::Xoshiro256StarStar;

/// Chain 0 - 1 - 2 with binary labels.
pub fn chain3() -> PairwiseModel {
    let mut model = PairwiseModel::new();
    model.add_variable(array![0.4, 0.6]).unwrap();
    model.add_variable(array![0.5, 0.5]).unwrap();
    model.add_variable(array![0.8, 0.2]).unwrap();
    let coupling = array![[0.9, 0.1], [0.1, 0.9]];
    model.add_coupling(0, 1, coupling.clone()).unwrap();
    model.add_coupling(1, 2, coupling).unwrap();
    model
}

/// Random model with `n` variables of 2 or 3 labels, each pair coupled with
/// probability `p_edge`. Table entries are in [0.05, 1).
pub fn gen_model(n: usize, p_edge: f64, seed: u64) -> PairwiseModel {
    let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
    let dist = Uniform::new(0.05, 1.0);
    let mut model = PairwiseModel::new();
    let mut cards = Vec::with_capacity(n);
    for _ in 0..n {
        let card: usize = rng.gen_range(2..=3);
        cards.push(card);
        model
            .add_variable(Array1::random_using(card, dist, &mut rng))
            .unwrap();
    }
    for (a, b) in (0..n).tuple_combinations() {
        if rng.gen_bool(p_edge) {
            let table = Array2::random_using((cards[a], cards[b]), dist, &mut rng);
            model.add_coupling(a, b, table).unwrap();
        }
    }
    model
}

/// Product of every original table of the model at `labeling`.
pub fn weight(model: &PairwiseModel, labeling: &HashMap<VarId, usize>) -> f64 {
    let unary: f64 = model
        .nodes()
        .iter()
        .map(|node| node.original().enter_full_evidence(labeling).unwrap())
        .product();
    let pairwise: f64 = model
        .couplings()
        .iter()
        .map(|c| c.original().enter_full_evidence(labeling).unwrap())
        .product();
    unary * pairwise
}

/// Exact quantities by enumerating every labeling consistent with `evidence`.
pub struct BruteForce {
    pub marginals: Vec<Vec<f64>>,
    pub partition: f64,
}

pub fn labelings(model: &PairwiseModel) -> Vec<HashMap<VarId, usize>> {
    model
        .nodes()
        .iter()
        .map(|node| 0..node.cardinality())
        .multi_cartesian_product()
        .map(|labels| labels.into_iter().enumerate().collect())
        .collect()
}

pub fn brute_force(model: &PairwiseModel, evidence: &HashMap<VarId, usize>) -> BruteForce {
    let mut marginals: Vec<Vec<f64>> = model
        .nodes()
        .iter()
        .map(|node| vec![0.0; node.cardinality()])
        .collect();
    let mut partition = 0.0;
    for labeling in labelings(model) {
        if evidence.iter().any(|(var, label)| labeling[var] != *label) {
            continue;
        }
        let w = weight(model, &labeling);
        partition += w;
        for (var, label) in labeling.iter() {
            marginals[*var][*label] += w;
        }
    }
    for m in marginals.iter_mut() {
        m.iter_mut().for_each(|x| *x /= partition);
    }
    BruteForce {
        marginals,
        partition,
    }
}

pub fn assert_close(got: &[f64], expected: &[f64], tol: f64) {
    assert_eq!(got.len(), expected.len());
    for (g, e) in got.iter().zip(expected.iter()) {
        assert!(
            (g - e).abs() < tol,
            "got {:?}, expected {:?}",
            got,
            expected
        );
    }
}
