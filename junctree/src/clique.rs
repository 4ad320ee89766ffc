//! Maximal cliques of a triangulated graph and assignment of model tables to them.
use std::collections::BTreeSet;

use crate::graph::PairwiseModel;
use crate::triangulation::TriangulatedGraph;
use crate::{CliqueId, CouplingId, VarId};

#[derive(Debug, Clone)]
pub struct Extraction {
    /// Scope of each clique, in discovery order.
    pub scopes: Vec<BTreeSet<VarId>>,
    /// Every pair of cliques, in discovery order: spanning-tree candidates.
    pub candidates: Vec<(CliqueId, CliqueId)>,
}

/// Walks `ordering` over the triangulated graph. Each variable together with
/// its not-yet-eliminated neighbors forms a candidate scope, kept unless an
/// earlier clique already contains it.
pub fn extract_cliques(triangulated: &TriangulatedGraph, ordering: &[VarId]) -> Extraction {
    let mut scopes: Vec<BTreeSet<VarId>> = Vec::new();
    let mut candidates = Vec::new();
    let mut removed = vec![false; triangulated.adjacency().len()];
    for var in ordering {
        let scope: BTreeSet<VarId> = triangulated
            .neighbors(*var)
            .iter()
            .copied()
            .filter(|n| !removed[*n])
            .chain(std::iter::once(*var))
            .collect();
        removed[*var] = true;
        if scopes.iter().any(|s| scope.is_subset(s)) {
            continue;
        }
        let new_id = scopes.len();
        candidates.extend((0..new_id).map(|c| (c, new_id)));
        scopes.push(scope);
    }
    Extraction { scopes, candidates }
}

/// Which tables each clique multiplies into its potential.
#[derive(Debug, Clone)]
pub struct Assignment {
    /// Clique representing each variable.
    pub representative: Vec<CliqueId>,
    /// Variables whose unit table each clique holds.
    pub represented: Vec<Vec<VarId>>,
    /// Coupling tables each clique holds.
    pub couplings: Vec<Vec<CouplingId>>,
}

/// Assigns every variable, in id order, to the first clique containing it and
/// all neighbors whose coupling is not yet owned; the variable then owns those
/// couplings. When no clique fits (possible with poor orderings), the variable
/// goes to the first clique containing it and owns only the couplings inside
/// that scope; leftover couplings go to the first clique containing both ends.
pub fn assign(model: &PairwiseModel, scopes: &[BTreeSet<VarId>]) -> Assignment {
    let n_vars = model.num_variables();
    let mut representative = vec![0; n_vars];
    let mut represented = vec![Vec::new(); scopes.len()];
    let mut couplings = vec![Vec::new(); scopes.len()];
    let mut owned = vec![false; model.num_couplings()];
    for node in model.nodes() {
        let var = node.id();
        let pending: Vec<(VarId, CouplingId)> =
            node.couplings().filter(|(_, c)| !owned[*c]).collect();
        let covers = |scope: &BTreeSet<VarId>| {
            scope.contains(&var) && pending.iter().all(|(n, _)| scope.contains(n))
        };
        let clique = match scopes.iter().position(covers) {
            Some(clique) => clique,
            None => {
                tracing::warn!(
                    var,
                    "no clique covers variable and its coupled neighbors, splitting couplings"
                );
                // Each variable is in the clique of its own elimination step.
                scopes
                    .iter()
                    .position(|scope| scope.contains(&var))
                    .unwrap_or_default()
            }
        };
        representative[var] = clique;
        represented[clique].push(var);
        for (n, c) in pending {
            if scopes[clique].contains(&n) {
                owned[c] = true;
                couplings[clique].push(c);
            }
        }
    }
    for (c, coupling) in model.couplings().iter().enumerate() {
        if owned[c] {
            continue;
        }
        let [a, b] = coupling.vars();
        // Both ends are adjacent, hence share the clique of whichever is
        // eliminated first.
        let clique = scopes
            .iter()
            .position(|scope| scope.contains(&a) && scope.contains(&b))
            .unwrap_or_default();
        owned[c] = true;
        couplings[clique].push(c);
    }
    Assignment {
        representative,
        represented,
        couplings,
    }
}
