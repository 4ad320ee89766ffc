//! Exact inference over pairwise discrete models.
//!
//! A [`PairwiseModel`] (unit tables on variables, coupling tables on edges) is
//! triangulated along an elimination ordering, its maximal cliques are linked
//! into a maximum-weight spanning tree, and two-pass message passing on that
//! [`JunctionTree`] yields exact marginals, joints and log-probabilities.
pub mod clique;
pub mod graph;
pub mod junction_tree;
pub mod ordering;
pub mod potential;
pub mod spanning;
pub mod triangulation;

pub type VarId = usize;
pub type CliqueId = usize;
pub type SeparatorId = usize;
pub type CouplingId = usize;

pub use graph::PairwiseModel;
pub use junction_tree::{JunctionTree, PropagationState};
pub use ordering::OrderingStrategy;
pub use potential::{DivisionPolicy, PotentialTable, Proba};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, JtError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum JtError {
    #[error("Evidence does not fix variable {var}.")]
    IncompleteEvidence { var: VarId },
    #[error("Division of a nonzero value by zero ({count} entries).")]
    DivisionByZero { count: usize },
    #[error("No clique contains all the variables {0:?}.")]
    NoContainingClique(Vec<VarId>),
    #[error("Variable {var} has {got} labels, expected {expected}.")]
    CardinalityMismatch {
        var: VarId,
        expected: usize,
        got: usize,
    },
    #[error("Unknown variable {0}.")]
    UnknownVariable(VarId),
    #[error("Label {label} out of range for variable {var} with {cardinality} labels.")]
    LabelOutOfRange {
        var: VarId,
        label: usize,
        cardinality: usize,
    },
    #[error("Variable {var} is already observed with label {existing}, cannot set {label}.")]
    ConflictingEvidence {
        var: VarId,
        existing: usize,
        label: usize,
    },
    #[error("Variable {0} appears twice in the same scope.")]
    DuplicateVariable(VarId),
    #[error("Variables {0} and {1} are already coupled.")]
    DuplicateCoupling(VarId, VarId),
    #[error("Variable {0} cannot be coupled with itself.")]
    SelfCoupling(VarId),
    #[error("A variable needs at least one label.")]
    EmptyCardinality,
    #[error("Invalid elimination ordering: {0}.")]
    InvalidOrdering(String),
    #[error("Cannot build a junction tree over an empty graph.")]
    EmptyGraph,
    #[error("Table entries sum to zero, cannot normalize.")]
    ZeroMass,
    #[error("Invalid table shape: {0}.")]
    TableShape(String),
}

impl From<ndarray::ShapeError> for JtError {
    fn from(e: ndarray::ShapeError) -> Self {
        JtError::TableShape(e.to_string())
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Config {
    /// Strategy producing the elimination ordering used for triangulation.
    ordering: OrderingStrategy,
    /// What to do when a message divides a nonzero entry by zero.
    division: DivisionPolicy,
}

impl Config {
    /// Nonzero/zero divisions are errors instead of warnings.
    pub fn strict() -> Self {
        Self {
            ordering: OrderingStrategy::default(),
            division: DivisionPolicy::Strict,
        }
    }
    pub fn with_ordering(mut self, ordering: OrderingStrategy) -> Self {
        self.ordering = ordering;
        self
    }
    pub fn with_division(mut self, division: DivisionPolicy) -> Self {
        self.division = division;
        self
    }
    pub fn ordering(&self) -> &OrderingStrategy {
        &self.ordering
    }
    pub fn division(&self) -> DivisionPolicy {
        self.division
    }
}
