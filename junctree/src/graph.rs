//! Pairwise model: variables with unit tables, couplings with two-variable tables.
//!
//! Nodes and couplings live in arenas addressed by index. The neighbor relation
//! is an index map `neighbor -> coupling`, so copies of the adjacency can be
//! modified freely without touching the model.
use indexmap::{IndexMap, IndexSet};
use ndarray::{Array1, Array2};

use crate::potential::{PotentialTable, Proba};
use crate::{CouplingId, JtError, Result, VarId};

#[derive(Debug, Clone)]
pub struct VariableNode {
    id: VarId,
    cardinality: usize,
    original: PotentialTable,
    current: PotentialTable,
    neighbors: IndexMap<VarId, CouplingId>,
}

impl VariableNode {
    pub fn id(&self) -> VarId {
        self.id
    }
    pub fn cardinality(&self) -> usize {
        self.cardinality
    }
    /// Unit table as given at construction.
    pub fn original(&self) -> &PotentialTable {
        &self.original
    }
    /// Unit table with the evidence entered so far.
    pub fn current(&self) -> &PotentialTable {
        &self.current
    }
    pub fn neighbors(&self) -> impl Iterator<Item = VarId> + '_ {
        self.neighbors.keys().copied()
    }
    pub fn coupling_with(&self, var: VarId) -> Option<CouplingId> {
        self.neighbors.get(&var).copied()
    }
    pub fn couplings(&self) -> impl Iterator<Item = (VarId, CouplingId)> + '_ {
        self.neighbors.iter().map(|(v, c)| (*v, *c))
    }
}

#[derive(Debug, Clone)]
pub struct Coupling {
    vars: [VarId; 2],
    original: PotentialTable,
    current: PotentialTable,
}

impl Coupling {
    pub fn vars(&self) -> [VarId; 2] {
        self.vars
    }
    pub fn other(&self, var: VarId) -> VarId {
        if self.vars[0] == var {
            self.vars[1]
        } else {
            self.vars[0]
        }
    }
    pub fn original(&self) -> &PotentialTable {
        &self.original
    }
    pub fn current(&self) -> &PotentialTable {
        &self.current
    }
}

#[derive(Debug, Clone, Default)]
pub struct PairwiseModel {
    nodes: Vec<VariableNode>,
    couplings: Vec<Coupling>,
}

impl PairwiseModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a variable whose cardinality is the length of its unit table.
    /// Ids are handed out densely from 0.
    pub fn add_variable(&mut self, unary: Array1<Proba>) -> Result<VarId> {
        if unary.is_empty() {
            return Err(JtError::EmptyCardinality);
        }
        let id = self.nodes.len();
        let cardinality = unary.len();
        let table = PotentialTable::unary(id, unary);
        self.nodes.push(VariableNode {
            id,
            cardinality,
            original: table.clone(),
            current: table,
            neighbors: IndexMap::new(),
        });
        Ok(id)
    }

    /// Couples `a` and `b`; rows of `table` index the labels of `a`.
    pub fn add_coupling(&mut self, a: VarId, b: VarId, table: Array2<Proba>) -> Result<CouplingId> {
        if a == b {
            return Err(JtError::SelfCoupling(a));
        }
        let (card_a, card_b) = (self.cardinality(a)?, self.cardinality(b)?);
        if self.nodes[a].neighbors.contains_key(&b) {
            return Err(JtError::DuplicateCoupling(a, b));
        }
        let (rows, cols) = table.dim();
        if rows != card_a {
            return Err(JtError::CardinalityMismatch {
                var: a,
                expected: card_a,
                got: rows,
            });
        }
        if cols != card_b {
            return Err(JtError::CardinalityMismatch {
                var: b,
                expected: card_b,
                got: cols,
            });
        }
        let id = self.couplings.len();
        let table = PotentialTable::pairwise(a, b, table)?;
        self.couplings.push(Coupling {
            vars: [a, b],
            original: table.clone(),
            current: table,
        });
        self.nodes[a].neighbors.insert(b, id);
        self.nodes[b].neighbors.insert(a, id);
        Ok(id)
    }

    pub fn num_variables(&self) -> usize {
        self.nodes.len()
    }
    pub fn num_couplings(&self) -> usize {
        self.couplings.len()
    }
    pub fn check_var(&self, var: VarId) -> Result<()> {
        if var < self.nodes.len() {
            Ok(())
        } else {
            Err(JtError::UnknownVariable(var))
        }
    }
    pub fn node(&self, var: VarId) -> Result<&VariableNode> {
        self.nodes.get(var).ok_or(JtError::UnknownVariable(var))
    }
    pub fn nodes(&self) -> &[VariableNode] {
        &self.nodes
    }
    pub fn coupling(&self, id: CouplingId) -> &Coupling {
        &self.couplings[id]
    }
    pub fn couplings(&self) -> &[Coupling] {
        &self.couplings
    }
    pub fn cardinality(&self, var: VarId) -> Result<usize> {
        self.node(var).map(VariableNode::cardinality)
    }
    pub fn check_label(&self, var: VarId, label: usize) -> Result<()> {
        let cardinality = self.cardinality(var)?;
        if label < cardinality {
            Ok(())
        } else {
            Err(JtError::LabelOutOfRange {
                var,
                label,
                cardinality,
            })
        }
    }

    /// Fresh neighbor sets, one per variable.
    pub fn adjacency(&self) -> Vec<IndexSet<VarId>> {
        self.nodes
            .iter()
            .map(|node| node.neighbors.keys().copied().collect())
            .collect()
    }

    /// Slices the current unit table of `var` and every coupling touching it.
    pub(crate) fn enter_evidence(&mut self, var: VarId, label: usize) -> Result<()> {
        self.check_label(var, label)?;
        let node = &mut self.nodes[var];
        node.current = node.current.enter_evidence(var, label)?;
        for coupling in node.neighbors.values() {
            let coupling = &mut self.couplings[*coupling];
            coupling.current = coupling.current.enter_evidence(var, label)?;
        }
        Ok(())
    }

    pub(crate) fn reset_evidence(&mut self) {
        for node in self.nodes.iter_mut() {
            node.current = node.original.clone();
        }
        for coupling in self.couplings.iter_mut() {
            coupling.current = coupling.original.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn build_and_slice() {
        let mut model = PairwiseModel::new();
        let a = model.add_variable(array![0.4, 0.6]).unwrap();
        let b = model.add_variable(array![0.2, 0.3, 0.5]).unwrap();
        model
            .add_coupling(a, b, array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]])
            .unwrap();
        assert_eq!(model.adjacency()[a].iter().copied().collect::<Vec<_>>(), vec![b]);
        model.enter_evidence(b, 2).unwrap();
        assert_eq!(model.node(b).unwrap().current().sum(), 0.5);
        assert_eq!(model.coupling(0).current().vars(), &[a]);
        assert_eq!(model.coupling(0).current().sum(), 9.0);
        model.reset_evidence();
        assert_eq!(model.coupling(0).current(), model.coupling(0).original());
    }

    #[test]
    fn rejects_bad_couplings() {
        let mut model = PairwiseModel::new();
        let a = model.add_variable(array![1.0, 1.0]).unwrap();
        let b = model.add_variable(array![1.0, 1.0]).unwrap();
        assert_eq!(
            model.add_coupling(a, a, Array2::ones((2, 2))),
            Err(JtError::SelfCoupling(a))
        );
        assert_eq!(
            model.add_coupling(a, 9, Array2::ones((2, 2))),
            Err(JtError::UnknownVariable(9))
        );
        assert!(matches!(
            model.add_coupling(a, b, Array2::ones((2, 3))),
            Err(JtError::CardinalityMismatch { var: 1, .. })
        ));
        model.add_coupling(a, b, Array2::ones((2, 2))).unwrap();
        assert_eq!(
            model.add_coupling(b, a, Array2::ones((2, 2))),
            Err(JtError::DuplicateCoupling(b, a))
        );
        assert_eq!(
            model.add_variable(Array1::zeros(0)),
            Err(JtError::EmptyCardinality)
        );
    }
}
