//! Potential tables: non-negative functions over an ordered scope of discrete variables.
//!
//! Values live in a dense [`ndarray::ArrayD`], axis `i` indexing the labels of
//! `vars[i]`. All operations return new tables. The order of variables in a
//! result is an implementation detail: read it back with [`PotentialTable::vars`]
//! or fix it with [`PotentialTable::reordered`].
use std::collections::HashMap;

use ndarray::{Array1, Array2, ArrayD, ArrayViewD, Axis, IxDyn, Zip};

use crate::{JtError, Result, VarId};

pub type Proba = f64;

/// Handling of `x / 0` with `x != 0` in [`PotentialTable::divide`].
///
/// `0 / 0` is always `0`: a zero-probability configuration stays impossible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DivisionPolicy {
    /// Keep the dividend and log a warning.
    #[default]
    Lenient,
    /// Fail with [`JtError::DivisionByZero`].
    Strict,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PotentialTable {
    vars: Vec<VarId>,
    values: ArrayD<Proba>,
}

impl PotentialTable {
    /// Table with an empty scope and value 1, neutral for multiply and divide.
    pub fn identity() -> Self {
        Self {
            vars: Vec::new(),
            values: ArrayD::ones(IxDyn(&[])),
        }
    }
    pub fn new(vars: Vec<VarId>, values: ArrayD<Proba>) -> Result<Self> {
        if values.ndim() != vars.len() {
            return Err(JtError::TableShape(format!(
                "{} variables for a {}-dimensional table",
                vars.len(),
                values.ndim()
            )));
        }
        for (i, var) in vars.iter().enumerate() {
            if vars[..i].contains(var) {
                return Err(JtError::DuplicateVariable(*var));
            }
        }
        Ok(Self { vars, values })
    }
    pub fn unary(var: VarId, values: Array1<Proba>) -> Self {
        Self {
            vars: vec![var],
            values: values.into_dyn(),
        }
    }
    /// Rows index the labels of `a`, columns those of `b`.
    pub fn pairwise(a: VarId, b: VarId, values: Array2<Proba>) -> Result<Self> {
        Self::new(vec![a, b], values.into_dyn())
    }
    /// All-ones table over `vars`, `cards[i]` labels for `vars[i]`.
    pub fn ones(vars: Vec<VarId>, cards: &[usize]) -> Result<Self> {
        if vars.len() != cards.len() {
            return Err(JtError::TableShape(format!(
                "{} variables for {} cardinalities",
                vars.len(),
                cards.len()
            )));
        }
        Self::new(vars, ArrayD::ones(IxDyn(cards)))
    }
    /// One-hot table fixing `var` to `label`.
    pub fn indicator(var: VarId, cardinality: usize, label: usize) -> Result<Self> {
        if label >= cardinality {
            return Err(JtError::LabelOutOfRange {
                var,
                label,
                cardinality,
            });
        }
        let mut values = Array1::zeros(cardinality);
        values[label] = 1.0;
        Ok(Self::unary(var, values))
    }

    pub fn vars(&self) -> &[VarId] {
        &self.vars
    }
    pub fn values(&self) -> ArrayViewD<'_, Proba> {
        self.values.view()
    }
    pub fn into_values(self) -> ArrayD<Proba> {
        self.values
    }
    pub fn is_scalar(&self) -> bool {
        self.vars.is_empty()
    }
    pub fn contains(&self, var: VarId) -> bool {
        self.vars.contains(&var)
    }
    pub fn axis_of(&self, var: VarId) -> Option<usize> {
        self.vars.iter().position(|v| *v == var)
    }
    pub fn cardinality(&self, var: VarId) -> Option<usize> {
        self.axis_of(var).map(|ax| self.values.len_of(Axis(ax)))
    }
    pub fn sum(&self) -> Proba {
        self.values.sum()
    }

    /// Union of both scopes, `self`'s variables first, with matching extents.
    fn joint_scope(&self, other: &Self) -> Result<(Vec<VarId>, Vec<usize>)> {
        let mut vars = self.vars.clone();
        let mut shape = self.values.shape().to_vec();
        for (var, card) in other.vars.iter().zip(other.values.shape()) {
            match self.axis_of(*var) {
                Some(ax) if shape[ax] != *card => {
                    return Err(JtError::CardinalityMismatch {
                        var: *var,
                        expected: shape[ax],
                        got: *card,
                    });
                }
                Some(_) => {}
                None => {
                    vars.push(*var);
                    shape.push(*card);
                }
            }
        }
        Ok((vars, shape))
    }

    /// View of the values with axes laid out along `vars` (a superset of the
    /// scope), missing variables getting a length-1 axis.
    fn aligned(&self, vars: &[VarId]) -> ArrayViewD<'_, Proba> {
        let mut axes: Vec<usize> = (0..self.vars.len()).collect();
        axes.sort_by_key(|ax| vars.iter().position(|v| *v == self.vars[*ax]));
        let mut view = self.values.view().permuted_axes(axes);
        for (i, var) in vars.iter().enumerate() {
            if !self.contains(*var) {
                view.insert_axis_inplace(Axis(i));
            }
        }
        view
    }

    /// Elementwise combination over the union scope. A variable missing from
    /// one operand is treated as constant along its axis.
    fn combine(&self, other: &Self, mut f: impl FnMut(Proba, Proba) -> Proba) -> Result<Self> {
        let (vars, shape) = self.joint_scope(other)?;
        let lhs = self.aligned(&vars);
        let rhs = other.aligned(&vars);
        let broadcast_err = || JtError::TableShape(format!("cannot broadcast to {:?}", shape));
        let lhs = lhs.broadcast(IxDyn(&shape)).ok_or_else(broadcast_err)?;
        let rhs = rhs.broadcast(IxDyn(&shape)).ok_or_else(broadcast_err)?;
        let values = Zip::from(&lhs)
            .and(&rhs)
            .map_collect(|a, b| f(*a, *b));
        Ok(Self { vars, values })
    }

    pub fn multiply(&self, other: &Self) -> Result<Self> {
        self.combine(other, |a, b| a * b)
    }

    pub fn divide(&self, other: &Self, policy: DivisionPolicy) -> Result<Self> {
        let mut undefined = 0usize;
        let res = self.combine(other, |num, den| {
            if den != 0.0 {
                num / den
            } else if num == 0.0 {
                0.0
            } else {
                undefined += 1;
                num
            }
        })?;
        if undefined != 0 {
            match policy {
                DivisionPolicy::Strict => {
                    return Err(JtError::DivisionByZero { count: undefined });
                }
                DivisionPolicy::Lenient => {
                    tracing::warn!(
                        count = undefined,
                        scope = ?res.vars,
                        "nonzero entries divided by zero, keeping dividend"
                    );
                }
            }
        }
        Ok(res)
    }

    /// Sums out every variable not in `keep`. Variables of `keep` that are not
    /// in the scope are ignored.
    pub fn marginalize(&self, keep: &[VarId]) -> Self {
        let mut vars = self.vars.clone();
        let mut values = self.values.clone();
        // Highest axis first so that lower axis indices stay valid.
        for ax in (0..self.vars.len()).rev() {
            if !keep.contains(&self.vars[ax]) {
                values = values.sum_axis(Axis(ax));
                vars.remove(ax);
            }
        }
        Self { vars, values }
    }

    /// Slices the table at `label` along `var`, dropping `var` from the scope.
    /// Tables without `var` are returned unchanged.
    pub fn enter_evidence(&self, var: VarId, label: usize) -> Result<Self> {
        let Some(ax) = self.axis_of(var) else {
            return Ok(self.clone());
        };
        let cardinality = self.values.len_of(Axis(ax));
        if label >= cardinality {
            return Err(JtError::LabelOutOfRange {
                var,
                label,
                cardinality,
            });
        }
        let mut vars = self.vars.clone();
        vars.remove(ax);
        Ok(Self {
            vars,
            values: self.values.index_axis(Axis(ax), label).to_owned(),
        })
    }

    /// Value of the table at the labeling restricted to its scope. Extra
    /// entries in `labeling` are ignored.
    pub fn enter_full_evidence(&self, labeling: &HashMap<VarId, usize>) -> Result<Proba> {
        let mut index = Vec::with_capacity(self.vars.len());
        for (var, cardinality) in self.vars.iter().zip(self.values.shape()) {
            let label = *labeling
                .get(var)
                .ok_or(JtError::IncompleteEvidence { var: *var })?;
            if label >= *cardinality {
                return Err(JtError::LabelOutOfRange {
                    var: *var,
                    label,
                    cardinality: *cardinality,
                });
            }
            index.push(label);
        }
        Ok(self.values[index.as_slice()])
    }

    pub fn normalize(&self) -> Result<Self> {
        let total = self.sum();
        if total == 0.0 || !total.is_finite() {
            return Err(JtError::ZeroMass);
        }
        Ok(Self {
            vars: self.vars.clone(),
            values: &self.values / total,
        })
    }

    /// Same table with its axes permuted to follow `order`, which must be a
    /// permutation of the scope.
    pub fn reordered(&self, order: &[VarId]) -> Result<Self> {
        if order.len() != self.vars.len() {
            return Err(JtError::TableShape(format!(
                "cannot reorder scope {:?} as {:?}",
                self.vars, order
            )));
        }
        let axes = order
            .iter()
            .map(|var| self.axis_of(*var).ok_or(JtError::UnknownVariable(*var)))
            .collect::<Result<Vec<_>>>()?;
        let values = self.values.view().permuted_axes(axes);
        Ok(Self {
            vars: order.to_vec(),
            values: values.as_standard_layout().into_owned(),
        })
    }
}
