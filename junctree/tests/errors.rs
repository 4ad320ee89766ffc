mod common;

use std::collections::HashMap;

use common::chain3;
use junctree::{Config, DivisionPolicy, JtError, JunctionTree, OrderingStrategy, PairwiseModel};
use ndarray::array;

#[test]
fn empty_graph() {
    assert_eq!(
        JunctionTree::build(PairwiseModel::new(), &Config::default()).unwrap_err(),
        JtError::EmptyGraph
    );
}

#[test]
fn invalid_custom_ordering() {
    let config = Config::default().with_ordering(OrderingStrategy::Custom(vec![0, 2]));
    assert!(matches!(
        JunctionTree::build(chain3(), &config),
        Err(JtError::InvalidOrdering(_))
    ));
}

#[test]
fn unknown_variables() {
    let mut jt = JunctionTree::build(chain3(), &Config::default()).unwrap();
    assert_eq!(jt.query_marginal(3).unwrap_err(), JtError::UnknownVariable(3));
    assert_eq!(jt.query_joint(&[0, 9]).unwrap_err(), JtError::UnknownVariable(9));
    assert_eq!(
        jt.add_evidence(&HashMap::from([(4, 0)])).unwrap_err(),
        JtError::UnknownVariable(4)
    );
    assert_eq!(
        jt.add_evidence(&HashMap::from([(0, 2)])).unwrap_err(),
        JtError::LabelOutOfRange {
            var: 0,
            label: 2,
            cardinality: 2
        }
    );
    assert!(jt.evidence().is_empty());
}

#[test]
fn joint_outside_any_clique() {
    let mut jt = JunctionTree::build(chain3(), &Config::default()).unwrap();
    assert_eq!(
        jt.query_joint(&[0, 2]).unwrap_err(),
        JtError::NoContainingClique(vec![0, 2])
    );
    assert_eq!(
        jt.query_joint(&[1, 1]).unwrap_err(),
        JtError::DuplicateVariable(1)
    );
}

#[test]
fn incomplete_labeling() {
    let mut jt = JunctionTree::build(chain3(), &Config::default()).unwrap();
    assert_eq!(
        jt.log_joint(&HashMap::from([(0, 0), (2, 1)])).unwrap_err(),
        JtError::IncompleteEvidence { var: 1 }
    );
}

#[test]
fn conflicting_evidence() {
    let mut jt = JunctionTree::build(chain3(), &Config::default()).unwrap();
    jt.add_evidence(&HashMap::from([(1, 0)])).unwrap();
    assert_eq!(
        jt.add_evidence(&HashMap::from([(1, 1)])).unwrap_err(),
        JtError::ConflictingEvidence {
            var: 1,
            existing: 0,
            label: 1
        }
    );
}

fn zero_chain(unary0: ndarray::Array1<f64>, coupling01: ndarray::Array2<f64>) -> PairwiseModel {
    let mut model = PairwiseModel::new();
    model.add_variable(unary0).unwrap();
    model.add_variable(array![1.0, 1.0]).unwrap();
    model.add_variable(array![1.0, 0.0]).unwrap();
    model.add_coupling(0, 1, coupling01).unwrap();
    model.add_coupling(1, 2, array![[1.0, 0.0], [0.0, 1.0]]).unwrap();
    model
}

#[test]
fn zero_over_zero_is_allowed_even_when_strict() {
    // The collect message on the separator {1} is zero at label 1, so the
    // distribute pass divides 0 by 0 there.
    let model = zero_chain(array![1.0, 1.0], array![[1.0, 0.0], [0.0, 1.0]]);
    let mut jt = JunctionTree::build(model, &Config::strict()).unwrap();
    assert_eq!(jt.query_marginal(0).unwrap().to_vec(), vec![1.0, 0.0]);
    assert_eq!(jt.separators()[0].current().sum(), 1.0);
}

#[test]
fn impossible_evidence() {
    let model = zero_chain(array![1.0, 1.0], array![[1.0, 0.0], [0.0, 1.0]]);
    let mut jt = JunctionTree::build(model, &Config::default()).unwrap();
    jt.add_evidence(&HashMap::from([(0, 1)])).unwrap();
    assert_eq!(jt.query_marginal(0).unwrap().to_vec(), vec![0.0, 1.0]);
    assert_eq!(jt.query_marginal(2).unwrap_err(), JtError::ZeroMass);
}

#[test]
fn division_policies_agree() {
    let model = zero_chain(array![0.0, 1.0], array![[0.0, 0.0], [1.0, 3.0]]);
    for division in [DivisionPolicy::Lenient, DivisionPolicy::Strict] {
        let config = Config::default().with_division(division);
        let mut jt = JunctionTree::build(model.clone(), &config).unwrap();
        let m = jt.query_marginal(1).unwrap();
        assert!((m[0] - 1.0).abs() < 1e-12);
        assert!(m[1].abs() < 1e-12);
        assert_eq!(jt.query_marginal(0).unwrap().to_vec(), vec![0.0, 1.0]);
    }
}

#[test]
fn impossible_labeling_has_log_probability_minus_infinity() {
    let model = zero_chain(array![1.0, 1.0], array![[1.0, 0.0], [0.0, 1.0]]);
    let mut jt = JunctionTree::build(model, &Config::default()).unwrap();
    let labeling = HashMap::from([(0, 1), (1, 1), (2, 1)]);
    assert_eq!(jt.log_joint(&labeling).unwrap(), f64::NEG_INFINITY);
    let possible = HashMap::from([(0, 0), (1, 0), (2, 0)]);
    assert!(jt.log_joint(&possible).unwrap().abs() < 1e-12);
}
