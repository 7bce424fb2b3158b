//! Sparse linear expressions and constraints.

use std::collections::BTreeMap;

use serde::Serialize;

/// Index of a variable within its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VarId(pub usize);

impl VarId {
    /// Position in the model's variable list.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// `Σ coef · var + constant`, kept sparse and ordered by variable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    terms: BTreeMap<VarId, f64>,
    constant: f64,
}

impl LinearExpr {
    /// The zero expression.
    pub fn zero() -> Self {
        Self::default()
    }

    /// A constant expression.
    pub fn constant(value: f64) -> Self {
        Self {
            terms: BTreeMap::new(),
            constant: value,
        }
    }

    /// A single term `coef · var`.
    pub fn term(var: VarId, coef: f64) -> Self {
        Self::zero().with_term(var, coef)
    }

    /// Sum of variables with unit coefficients.
    pub fn sum(vars: impl IntoIterator<Item = VarId>) -> Self {
        let mut e = Self::zero();
        for v in vars {
            e.add_term(v, 1.0);
        }
        e
    }

    /// Adds `coef · var` in place; zero coefficients are dropped.
    pub fn add_term(&mut self, var: VarId, coef: f64) {
        let c = self.terms.entry(var).or_insert(0.0);
        *c += coef;
        if c.abs() <= 1e-12 {
            self.terms.remove(&var);
        }
    }

    /// Adds `coef · var`.
    pub fn with_term(mut self, var: VarId, coef: f64) -> Self {
        self.add_term(var, coef);
        self
    }

    /// Adds a constant.
    pub fn with_constant(mut self, value: f64) -> Self {
        self.constant += value;
        self
    }

    /// `self + k · other`.
    pub fn plus_scaled(mut self, other: &LinearExpr, k: f64) -> Self {
        self.constant += k * other.constant;
        for (&v, &c) in &other.terms {
            self.add_term(v, k * c);
        }
        self
    }

    /// `self + other`.
    pub fn plus(self, other: &LinearExpr) -> Self {
        self.plus_scaled(other, 1.0)
    }

    /// `self − other`.
    pub fn minus(self, other: &LinearExpr) -> Self {
        self.plus_scaled(other, -1.0)
    }

    /// `k · self`.
    pub fn scaled(&self, k: f64) -> Self {
        Self::zero().plus_scaled(self, k)
    }

    /// Non-zero terms in variable order.
    pub fn terms(&self) -> impl Iterator<Item = (VarId, f64)> + '_ {
        self.terms.iter().map(|(&v, &c)| (v, c))
    }

    /// Number of non-zero terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Whether the expression has no variable terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Constant part.
    pub fn constant_value(&self) -> f64 {
        self.constant
    }

    /// Value at a point (`values[var.index()]`).
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(v, c)| c * values[v.index()])
            .sum::<f64>()
            + self.constant
    }
}

/// Constraint sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Sense {
    /// `≤`
    Le,
    /// `≥`
    Ge,
    /// `=`
    Eq,
}

impl Sense {
    /// LP-format operator.
    pub fn symbol(&self) -> &'static str {
        match self {
            Sense::Le => "<=",
            Sense::Ge => ">=",
            Sense::Eq => "=",
        }
    }
}

/// Which part of the formulation a constraint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintFamily {
    /// Each surgery assigned exactly once.
    Assignment,
    /// Conflict clique on a resource-day.
    Clique,
    /// Room-day buffered load within hours plus overtime.
    RoomLoad,
    /// Surgery finishes within the room-day's hours plus overtime.
    RoomCompletion,
    /// Doctor-day buffered load within capacity plus overtime.
    DoctorLoad,
    /// Idle time definition.
    IdleLink,
    /// Aggregate per-day capacity cut.
    AggregateDay,
    /// Log-product reliability cut.
    Reliability,
    /// Pairwise disjunctive sequencing.
    Sequencing,
    /// Linearization of a product of variables.
    Linking,
}

/// A named linear constraint `Σ coef · var (sense) rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    /// Unique name.
    pub name: String,
    /// Family.
    pub family: ConstraintFamily,
    /// Left-hand side, without constant.
    pub expr: LinearExpr,
    /// Sense.
    pub sense: Sense,
    /// Right-hand side.
    pub rhs: f64,
}

impl LinearConstraint {
    /// Builds `lhs (sense) rhs`, moving the constant of `lhs` to the right.
    pub fn new(
        name: impl Into<String>,
        family: ConstraintFamily,
        lhs: LinearExpr,
        sense: Sense,
        rhs: f64,
    ) -> Self {
        let rhs = rhs - lhs.constant;
        let expr = LinearExpr {
            terms: lhs.terms,
            constant: 0.0,
        };
        Self {
            name: name.into(),
            family,
            expr,
            sense,
            rhs,
        }
    }

    /// `lhs ≤ rhs` with expressions on both sides.
    pub fn le(
        name: impl Into<String>,
        family: ConstraintFamily,
        lhs: LinearExpr,
        rhs: &LinearExpr,
    ) -> Self {
        Self::new(name, family, lhs.minus(rhs), Sense::Le, 0.0)
    }

    /// `lhs ≥ rhs` with expressions on both sides.
    pub fn ge(
        name: impl Into<String>,
        family: ConstraintFamily,
        lhs: LinearExpr,
        rhs: &LinearExpr,
    ) -> Self {
        Self::new(name, family, lhs.minus(rhs), Sense::Ge, 0.0)
    }

    /// Amount by which a point violates the constraint (0 if satisfied).
    pub fn violation(&self, values: &[f64]) -> f64 {
        let lhs = self.expr.evaluate(values);
        match self.sense {
            Sense::Le => (lhs - self.rhs).max(0.0),
            Sense::Ge => (self.rhs - lhs).max(0.0),
            Sense::Eq => (lhs - self.rhs).abs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expr_arithmetic() {
        let x = VarId(0);
        let y = VarId(1);
        let a = LinearExpr::term(x, 2.0).with_constant(1.0);
        let b = LinearExpr::term(x, 2.0).with_term(y, 3.0);
        let c = a.minus(&b);
        assert_eq!(c.len(), 1);
        assert_eq!(c.terms().collect::<Vec<_>>(), vec![(y, -3.0)]);
        assert_eq!(c.constant_value(), 1.0);
        assert!((c.evaluate(&[5.0, 2.0]) - -5.0).abs() < 1e-12);
    }

    #[test]
    fn test_constraint_moves_constant() {
        let x = VarId(0);
        let c = LinearConstraint::new(
            "c",
            ConstraintFamily::RoomLoad,
            LinearExpr::term(x, 1.0).with_constant(10.0),
            Sense::Le,
            30.0,
        );
        assert_eq!(c.rhs, 20.0);
        assert_eq!(c.violation(&[25.0]), 5.0);
        assert_eq!(c.violation(&[15.0]), 0.0);
    }

    #[test]
    fn test_two_sided_builders() {
        let x = VarId(0);
        let y = VarId(1);
        let c = LinearConstraint::ge(
            "c",
            ConstraintFamily::Sequencing,
            LinearExpr::term(y, 1.0),
            &LinearExpr::term(x, 1.0).with_constant(5.0),
        );
        // y - x >= 5
        assert_eq!(c.rhs, 5.0);
        assert_eq!(c.violation(&[0.0, 4.0]), 1.0);
        assert_eq!(c.violation(&[0.0, 5.0]), 0.0);
    }
}
