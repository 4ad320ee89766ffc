//! Triangulation by simulated elimination.
use indexmap::IndexSet;
use itertools::Itertools;

use crate::VarId;

#[derive(Debug, Clone)]
pub struct TriangulatedGraph {
    adjacency: Vec<IndexSet<VarId>>,
    fill_edges: Vec<(VarId, VarId)>,
}

impl TriangulatedGraph {
    pub fn adjacency(&self) -> &[IndexSet<VarId>] {
        &self.adjacency
    }
    pub fn neighbors(&self, var: VarId) -> &IndexSet<VarId> {
        &self.adjacency[var]
    }
    /// Edges added to make the graph chordal, in insertion order.
    pub fn fill_edges(&self) -> &[(VarId, VarId)] {
        &self.fill_edges
    }
}

/// Eliminates the variables in `ordering`, connecting the remaining neighbors
/// of each eliminated variable. The input adjacency is not modified.
///
/// `ordering` must be a permutation of the variable ids.
pub fn triangulate(adjacency: &[IndexSet<VarId>], ordering: &[VarId]) -> TriangulatedGraph {
    let mut res = TriangulatedGraph {
        adjacency: adjacency.to_vec(),
        fill_edges: Vec::new(),
    };
    let mut eliminated = vec![false; adjacency.len()];
    for var in ordering {
        let remaining: Vec<VarId> = res.adjacency[*var]
            .iter()
            .copied()
            .filter(|n| !eliminated[*n])
            .collect();
        eliminated[*var] = true;
        for (a, b) in remaining.iter().tuple_combinations() {
            if res.adjacency[*a].insert(*b) {
                res.adjacency[*b].insert(*a);
                res.fill_edges.push((*a, *b));
            }
        }
    }
    res
}

/// Whether every cycle of length > 3 has a chord.
///
/// Runs a maximum cardinality search, then checks that the reverse visit
/// order is a perfect elimination ordering.
pub fn is_chordal(adjacency: &[IndexSet<VarId>]) -> bool {
    let n = adjacency.len();
    let mut weight = vec![0usize; n];
    let mut position = vec![usize::MAX; n];
    let mut visit_order = Vec::with_capacity(n);
    for step in 0..n {
        let Some(var) = (0..n)
            .filter(|v| position[*v] == usize::MAX)
            .rev()
            .max_by_key(|v| weight[*v])
        else {
            break;
        };
        position[var] = step;
        visit_order.push(var);
        for nb in adjacency[var].iter() {
            if position[*nb] == usize::MAX {
                weight[*nb] += 1;
            }
        }
    }
    for var in visit_order {
        // Neighbors visited earlier must form a clique; it suffices to check
        // that they are all adjacent to the latest one among them.
        let earlier: Vec<VarId> = adjacency[var]
            .iter()
            .copied()
            .filter(|n| position[*n] < position[var])
            .collect();
        if let Some(parent) = earlier.iter().copied().max_by_key(|n| position[*n]) {
            if earlier
                .iter()
                .any(|n| *n != parent && !adjacency[parent].contains(n))
            {
                return false;
            }
        }
    }
    true
}
