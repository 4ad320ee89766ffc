//! Junction tree: cliques linked by separators, Hugin-style message passing and queries.
use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use ndarray::{Array1, Ix1};

use crate::clique::{self, Assignment};
use crate::graph::PairwiseModel;
use crate::potential::{PotentialTable, Proba};
use crate::{spanning, triangulation};
use crate::{CliqueId, Config, CouplingId, JtError, Result, SeparatorId, VarId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagationState {
    /// Evidence changed (or the tree is new) since the last propagation.
    Dirty,
    /// Every clique holds the joint over its scope; queries can be answered.
    Propagated,
}

#[derive(Debug, Clone)]
pub struct Clique {
    id: CliqueId,
    /// Ascending variable ids.
    scope: Vec<VarId>,
    represented: Vec<VarId>,
    couplings: Vec<CouplingId>,
    potential: PotentialTable,
    observed: BTreeSet<VarId>,
    separators: Vec<SeparatorId>,
}

impl Clique {
    pub fn id(&self) -> CliqueId {
        self.id
    }
    pub fn scope(&self) -> &[VarId] {
        &self.scope
    }
    /// Variables whose unit table this clique holds.
    pub fn represented(&self) -> &[VarId] {
        &self.represented
    }
    pub fn couplings(&self) -> &[CouplingId] {
        &self.couplings
    }
    /// Current belief; its scope excludes observed variables.
    pub fn potential(&self) -> &PotentialTable {
        &self.potential
    }
    pub fn observed(&self) -> impl Iterator<Item = VarId> + '_ {
        self.observed.iter().copied()
    }
    pub fn separators(&self) -> &[SeparatorId] {
        &self.separators
    }
    pub fn contains(&self, var: VarId) -> bool {
        self.scope.binary_search(&var).is_ok()
    }
}

#[derive(Debug, Clone)]
pub struct Separator {
    id: SeparatorId,
    cliques: (CliqueId, CliqueId),
    vars: Vec<VarId>,
    /// Marginal the last message was computed against.
    current: PotentialTable,
    /// Most recent marginal over the separator.
    updated: PotentialTable,
}

impl Separator {
    pub fn id(&self) -> SeparatorId {
        self.id
    }
    pub fn cliques(&self) -> (CliqueId, CliqueId) {
        self.cliques
    }
    pub fn vars(&self) -> &[VarId] {
        &self.vars
    }
    pub fn current(&self) -> &PotentialTable {
        &self.current
    }
    pub fn updated(&self) -> &PotentialTable {
        &self.updated
    }
    pub fn other(&self, clique: CliqueId) -> CliqueId {
        if self.cliques.0 == clique {
            self.cliques.1
        } else {
            self.cliques.0
        }
    }
}

#[derive(Debug, Clone)]
pub struct JunctionTree {
    model: PairwiseModel,
    config: Config,
    ordering: Vec<VarId>,
    fill_edges: Vec<(VarId, VarId)>,
    cliques: Vec<Clique>,
    separators: Vec<Separator>,
    representative: Vec<CliqueId>,
    root: CliqueId,
    /// Pre-order from the root: each clique with the separator to its parent.
    schedule: Vec<(CliqueId, Option<SeparatorId>)>,
    evidence: IndexMap<VarId, usize>,
    state: PropagationState,
}

impl JunctionTree {
    pub fn build(model: PairwiseModel, config: &Config) -> Result<Self> {
        if model.num_variables() == 0 {
            return Err(JtError::EmptyGraph);
        }
        let adjacency = model.adjacency();
        let ordering = config.ordering().ordering(&adjacency)?;
        let triangulated = triangulation::triangulate(&adjacency, &ordering);
        debug_assert!(triangulation::is_chordal(triangulated.adjacency()));
        let extraction = clique::extract_cliques(&triangulated, &ordering);
        let Assignment {
            representative,
            represented,
            couplings,
        } = clique::assign(&model, &extraction.scopes);
        let tree_edges = spanning::max_spanning_tree(&extraction.scopes, &extraction.candidates);

        let mut cliques: Vec<Clique> = extraction
            .scopes
            .into_iter()
            .zip(represented)
            .zip(couplings)
            .enumerate()
            .map(|(id, ((scope, represented), couplings))| Clique {
                id,
                scope: scope.into_iter().collect(),
                represented,
                couplings,
                potential: PotentialTable::identity(),
                observed: BTreeSet::new(),
                separators: Vec::new(),
            })
            .collect();
        let separators: Vec<Separator> = tree_edges
            .into_iter()
            .enumerate()
            .map(|(id, edge)| {
                cliques[edge.cliques.0].separators.push(id);
                cliques[edge.cliques.1].separators.push(id);
                Separator {
                    id,
                    cliques: edge.cliques,
                    vars: edge.separator,
                    current: PotentialTable::identity(),
                    updated: PotentialTable::identity(),
                }
            })
            .collect();
        let root = 0;
        let schedule = propagation_order(&cliques, &separators, root);
        tracing::debug!(
            variables = model.num_variables(),
            cliques = cliques.len(),
            max_clique = cliques.iter().map(|c| c.scope.len()).max().unwrap_or(0),
            fill_edges = triangulated.fill_edges().len(),
            "built junction tree"
        );
        Ok(Self {
            fill_edges: triangulated.fill_edges().to_vec(),
            model,
            config: config.clone(),
            ordering,
            cliques,
            separators,
            representative,
            root,
            schedule,
            evidence: IndexMap::new(),
            state: PropagationState::Dirty,
        })
    }

    pub fn model(&self) -> &PairwiseModel {
        &self.model
    }
    pub fn config(&self) -> &Config {
        &self.config
    }
    pub fn cliques(&self) -> &[Clique] {
        &self.cliques
    }
    pub fn separators(&self) -> &[Separator] {
        &self.separators
    }
    pub fn root(&self) -> CliqueId {
        self.root
    }
    pub fn state(&self) -> PropagationState {
        self.state
    }
    pub fn elimination_ordering(&self) -> &[VarId] {
        &self.ordering
    }
    pub fn fill_edges(&self) -> &[(VarId, VarId)] {
        &self.fill_edges
    }
    pub fn evidence(&self) -> &IndexMap<VarId, usize> {
        &self.evidence
    }
    pub fn max_clique_size(&self) -> usize {
        self.cliques.iter().map(|c| c.scope.len()).max().unwrap_or(0)
    }
    /// Clique holding the unit table of `var`.
    pub fn representative(&self, var: VarId) -> Result<CliqueId> {
        self.model.check_var(var)?;
        Ok(self.representative[var])
    }

    /// Fixes variables to observed labels. The whole mapping is validated
    /// before any table is sliced.
    pub fn add_evidence(&mut self, evidence: &HashMap<VarId, usize>) -> Result<()> {
        let mut fresh = Vec::with_capacity(evidence.len());
        for (var, label) in evidence {
            self.model.check_label(*var, *label)?;
            match self.evidence.get(var) {
                Some(existing) if existing != label => {
                    return Err(JtError::ConflictingEvidence {
                        var: *var,
                        existing: *existing,
                        label: *label,
                    });
                }
                Some(_) => {}
                None => fresh.push((*var, *label)),
            }
        }
        fresh.sort_unstable();
        for (var, label) in fresh {
            self.model.enter_evidence(var, label)?;
            self.cliques[self.representative[var]].observed.insert(var);
            self.evidence.insert(var, label);
            tracing::debug!(var, label, "entered evidence");
            self.state = PropagationState::Dirty;
        }
        Ok(())
    }

    pub fn reset_evidence(&mut self) {
        self.model.reset_evidence();
        for clique in self.cliques.iter_mut() {
            clique.observed.clear();
        }
        self.evidence.clear();
        self.state = PropagationState::Dirty;
        tracing::debug!("reset evidence");
    }

    /// Resets clique and separator tables from the model's current tables.
    fn initialize(&mut self) -> Result<()> {
        for clique in self.cliques.iter_mut() {
            let mut vars = Vec::with_capacity(clique.scope.len());
            let mut cards = Vec::with_capacity(clique.scope.len());
            for var in clique.scope.iter() {
                if !self.evidence.contains_key(var) {
                    vars.push(*var);
                    cards.push(self.model.cardinality(*var)?);
                }
            }
            let mut potential = PotentialTable::ones(vars, &cards)?;
            for var in clique.represented.iter() {
                potential = potential.multiply(self.model.node(*var)?.current())?;
            }
            for coupling in clique.couplings.iter() {
                potential = potential.multiply(self.model.coupling(*coupling).current())?;
            }
            clique.potential = potential;
        }
        for separator in self.separators.iter_mut() {
            separator.current = PotentialTable::identity();
            separator.updated = PotentialTable::identity();
        }
        Ok(())
    }

    /// Stores the marginal of `from` over `sep` as the separator's new
    /// `updated` table, the previous one becoming `current`.
    fn update_separator(&mut self, sep: SeparatorId, from: CliqueId) {
        let message = self.cliques[from]
            .potential
            .marginalize(&self.separators[sep].vars);
        let separator = &mut self.separators[sep];
        separator.current = std::mem::replace(&mut separator.updated, message);
    }

    fn collect_evidence(&mut self) -> Result<()> {
        for i in (0..self.schedule.len()).rev() {
            let (child, Some(sep)) = self.schedule[i] else {
                continue;
            };
            let parent = self.separators[sep].other(child);
            self.update_separator(sep, child);
            tracing::trace!(from = child, to = parent, "collect message");
            let parent = &mut self.cliques[parent];
            parent.potential = parent.potential.multiply(&self.separators[sep].updated)?;
        }
        Ok(())
    }

    fn distribute_evidence(&mut self) -> Result<()> {
        for i in 0..self.schedule.len() {
            let (child, Some(sep)) = self.schedule[i] else {
                continue;
            };
            let parent = self.separators[sep].other(child);
            self.update_separator(sep, parent);
            let separator = &self.separators[sep];
            let message = separator
                .updated
                .divide(&separator.current, self.config.division())?;
            tracing::trace!(from = parent, to = child, "distribute message");
            let child = &mut self.cliques[child];
            child.potential = child.potential.multiply(&message)?;
        }
        Ok(())
    }

    /// Re-initializes every table and runs the collect and distribute passes.
    pub fn propagate(&mut self) -> Result<()> {
        self.state = PropagationState::Dirty;
        self.initialize()?;
        self.collect_evidence()?;
        self.distribute_evidence()?;
        self.state = PropagationState::Propagated;
        tracing::debug!(
            cliques = self.cliques.len(),
            observed = self.evidence.len(),
            "propagated"
        );
        Ok(())
    }

    fn ensure_propagated(&mut self) -> Result<()> {
        match self.state {
            PropagationState::Dirty => self.propagate(),
            PropagationState::Propagated => Ok(()),
        }
    }

    /// Normalized distribution over the labels of `var`.
    pub fn query_marginal(&mut self, var: VarId) -> Result<Array1<Proba>> {
        let cardinality = self.model.cardinality(var)?;
        if let Some(label) = self.evidence.get(&var) {
            let mut res = Array1::zeros(cardinality);
            res[*label] = 1.0;
            return Ok(res);
        }
        self.ensure_propagated()?;
        let clique = &self.cliques[self.representative[var]];
        let marginal = clique.potential.marginalize(&[var]).normalize()?;
        Ok(marginal.into_values().into_dimensionality::<Ix1>()?)
    }

    pub fn query_all_marginals(&mut self) -> Result<Vec<Array1<Proba>>> {
        (0..self.model.num_variables())
            .map(|var| self.query_marginal(var))
            .collect()
    }

    /// Normalized joint over `vars`, with axes in the order of `vars`. The
    /// variables must share a clique.
    pub fn query_joint(&mut self, vars: &[VarId]) -> Result<PotentialTable> {
        for (i, var) in vars.iter().enumerate() {
            self.model.check_var(*var)?;
            if vars[..i].contains(var) {
                return Err(JtError::DuplicateVariable(*var));
            }
        }
        let clique = self
            .cliques
            .iter()
            .position(|c| vars.iter().all(|v| c.contains(*v)))
            .ok_or_else(|| JtError::NoContainingClique(vars.to_vec()))?;
        self.ensure_propagated()?;
        let mut joint = self.cliques[clique].potential.marginalize(vars).normalize()?;
        for var in vars {
            if let Some(label) = self.evidence.get(var) {
                let indicator =
                    PotentialTable::indicator(*var, self.model.cardinality(*var)?, *label)?;
                joint = joint.multiply(&indicator)?;
            }
        }
        joint.reordered(vars)
    }

    /// Log-probability of a full labeling given the current evidence, as the
    /// sum of clique log-marginals minus the sum of separator log-marginals.
    /// A labeling that contradicts the evidence has probability zero.
    pub fn log_joint(&mut self, labeling: &HashMap<VarId, usize>) -> Result<f64> {
        for var in 0..self.model.num_variables() {
            let label = *labeling
                .get(&var)
                .ok_or(JtError::IncompleteEvidence { var })?;
            self.model.check_label(var, label)?;
        }
        if self
            .evidence
            .iter()
            .any(|(var, label)| labeling[var] != *label)
        {
            return Ok(f64::NEG_INFINITY);
        }
        self.ensure_propagated()?;
        let mut res = 0.0;
        for clique in self.cliques.iter() {
            let p = clique.potential.normalize()?.enter_full_evidence(labeling)?;
            if p == 0.0 {
                return Ok(f64::NEG_INFINITY);
            }
            res += p.ln();
        }
        for separator in self.separators.iter() {
            res -= separator
                .updated
                .normalize()?
                .enter_full_evidence(labeling)?
                .ln();
        }
        Ok(res)
    }

    /// Log of the normalization constant of the model with the evidence
    /// entered: the sum over unobserved variables of the product of all tables.
    pub fn log_partition(&mut self) -> Result<f64> {
        self.ensure_propagated()?;
        Ok(self.cliques[self.root].potential.sum().ln())
    }
}

/// Depth-first pre-order from `root`, each clique paired with the separator
/// leading back to its parent.
fn propagation_order(
    cliques: &[Clique],
    separators: &[Separator],
    root: CliqueId,
) -> Vec<(CliqueId, Option<SeparatorId>)> {
    let mut order = Vec::with_capacity(cliques.len());
    let mut visit_stack = vec![(root, None)];
    while let Some((clique, parent_sep)) = visit_stack.pop() {
        order.push((clique, parent_sep));
        for sep in cliques[clique].separators.iter().rev() {
            if Some(*sep) != parent_sep {
                visit_stack.push((separators[*sep].other(clique), Some(*sep)));
            }
        }
    }
    order
}
