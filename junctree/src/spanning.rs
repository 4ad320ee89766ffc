//! Maximum-weight spanning tree over cliques (Kruskal).
use std::cmp::Reverse;
use std::collections::BTreeSet;

use itertools::Itertools;

use crate::{CliqueId, VarId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEdge {
    pub cliques: (CliqueId, CliqueId),
    /// Variables shared by both cliques, ascending.
    pub separator: Vec<VarId>,
}

/// Disjoint sets over clique ids, with path halving and union by size.
#[derive(Debug, Clone)]
struct Connectivity {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl Connectivity {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }
    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }
    /// Merges the sets of `a` and `b`, false if they were already one set.
    fn union(&mut self, a: usize, b: usize) -> bool {
        let (mut a, mut b) = (self.find(a), self.find(b));
        if a == b {
            return false;
        }
        if self.size[a] < self.size[b] {
            std::mem::swap(&mut a, &mut b);
        }
        self.parent[b] = a;
        self.size[a] += self.size[b];
        true
    }
}

/// Keeps the heaviest candidate edges (weight = separator size) that do not
/// close a cycle. Ties keep the candidates' order. With candidates covering
/// every pair of cliques, the result has `scopes.len() - 1` edges.
pub fn max_spanning_tree(
    scopes: &[BTreeSet<VarId>],
    candidates: &[(CliqueId, CliqueId)],
) -> Vec<TreeEdge> {
    let target = scopes.len().saturating_sub(1);
    let mut connectivity = Connectivity::new(scopes.len());
    let mut tree = Vec::with_capacity(target);
    let weighted = candidates
        .iter()
        .map(|(a, b)| {
            let separator: Vec<VarId> = scopes[*a].intersection(&scopes[*b]).copied().collect();
            (*a, *b, separator)
        })
        .sorted_by_key(|(_, _, separator)| Reverse(separator.len()));
    for (a, b, separator) in weighted {
        if tree.len() == target {
            break;
        }
        if connectivity.union(a, b) {
            tree.push(TreeEdge {
                cliques: (a, b),
                separator,
            });
        }
    }
    tree
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(vars: &[VarId]) -> BTreeSet<VarId> {
        vars.iter().copied().collect()
    }

    #[test]
    fn prefers_heavy_separators() {
        let scopes = vec![scope(&[0, 1, 2]), scope(&[3, 4]), scope(&[1, 2, 3]), scope(&[2, 5])];
        let candidates: Vec<_> = (0..4).tuple_combinations().collect();
        let tree = max_spanning_tree(&scopes, &candidates);
        assert_eq!(
            tree,
            vec![
                TreeEdge { cliques: (0, 2), separator: vec![1, 2] },
                TreeEdge { cliques: (0, 3), separator: vec![2] },
                TreeEdge { cliques: (1, 2), separator: vec![3] },
            ]
        );
    }

    #[test]
    fn disconnected_components_get_empty_separators() {
        let scopes = vec![scope(&[0, 1]), scope(&[2, 3]), scope(&[1, 4])];
        let tree = max_spanning_tree(&scopes, &[(0, 1), (0, 2), (1, 2)]);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0], TreeEdge { cliques: (0, 2), separator: vec![1] });
        assert_eq!(tree[1], TreeEdge { cliques: (0, 1), separator: vec![] });
    }

    #[test]
    fn single_clique() {
        assert!(max_spanning_tree(&[scope(&[0])], &[]).is_empty());
    }
}
