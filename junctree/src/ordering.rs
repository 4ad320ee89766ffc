//! Elimination orderings for triangulation.
use indexmap::IndexSet;
use itertools::Itertools;

use crate::{JtError, Result, VarId};

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OrderingStrategy {
    /// Variables in increasing id order.
    #[default]
    Ascending,
    /// Greedily eliminate the variable with the fewest remaining neighbors.
    MinDegree,
    /// Greedily eliminate the variable whose elimination adds the fewest fill edges.
    MinFill,
    /// Caller-provided permutation of all variable ids.
    Custom(Vec<VarId>),
}

impl OrderingStrategy {
    pub fn ordering(&self, adjacency: &[IndexSet<VarId>]) -> Result<Vec<VarId>> {
        let n = adjacency.len();
        match self {
            OrderingStrategy::Ascending => Ok((0..n).collect()),
            OrderingStrategy::MinDegree => Ok(greedy(adjacency, |adj, var| adj[var].len())),
            OrderingStrategy::MinFill => Ok(greedy(adjacency, fill_count)),
            OrderingStrategy::Custom(ordering) => {
                validate(ordering, n)?;
                Ok(ordering.clone())
            }
        }
    }
}

/// Checks that `ordering` is a permutation of `0..n`.
pub fn validate(ordering: &[VarId], n: usize) -> Result<()> {
    if ordering.len() != n {
        return Err(JtError::InvalidOrdering(format!(
            "{} entries for {} variables",
            ordering.len(),
            n
        )));
    }
    let mut seen = vec![false; n];
    for var in ordering {
        match seen.get_mut(*var) {
            None => return Err(JtError::UnknownVariable(*var)),
            Some(true) => {
                return Err(JtError::InvalidOrdering(format!(
                    "variable {} appears twice",
                    var
                )))
            }
            Some(s) => *s = true,
        }
    }
    Ok(())
}

/// Number of missing edges among the remaining neighbors of `var`.
fn fill_count(adjacency: &[IndexSet<VarId>], var: VarId) -> usize {
    adjacency[var]
        .iter()
        .tuple_combinations()
        .filter(|(a, b)| !adjacency[**a].contains(*b))
        .count()
}

/// Simulated elimination picking the cheapest variable at each step, lowest id
/// on ties. `cost` sees the adjacency restricted to not-yet-eliminated variables.
fn greedy(
    adjacency: &[IndexSet<VarId>],
    cost: impl Fn(&[IndexSet<VarId>], VarId) -> usize,
) -> Vec<VarId> {
    let mut adjacency = adjacency.to_vec();
    let mut remaining: Vec<VarId> = (0..adjacency.len()).collect();
    let mut ordering = Vec::with_capacity(adjacency.len());
    loop {
        let Some((pos, var)) = remaining
            .iter()
            .copied()
            .enumerate()
            .min_by_key(|(_, var)| cost(&adjacency, *var))
        else {
            break;
        };
        remaining.remove(pos);
        let neighbors = std::mem::take(&mut adjacency[var]);
        for (a, b) in neighbors.iter().tuple_combinations() {
            adjacency[*a].insert(*b);
            adjacency[*b].insert(*a);
        }
        for n in neighbors.iter() {
            adjacency[*n].shift_remove(&var);
        }
        ordering.push(var);
    }
    ordering
}
