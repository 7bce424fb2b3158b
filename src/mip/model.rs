//! Variables, model builder, and the compiled model.

use serde::Serialize;

use super::linear::{ConstraintFamily, LinearConstraint, LinearExpr, VarId};
use crate::config::FormulationVariant;
use crate::eligibility::Choice;

/// Variable domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VarKind {
    /// 0/1.
    Binary,
    /// Real within bounds.
    Continuous,
}

/// A decision variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// Unique name (LP-format safe).
    pub name: String,
    /// Domain.
    pub kind: VarKind,
    /// Lower bound.
    pub lower: f64,
    /// Upper bound; `None` = unbounded.
    pub upper: Option<f64>,
}

impl Variable {
    /// Whether the variable is binary.
    pub fn is_binary(&self) -> bool {
        self.kind == VarKind::Binary
    }
}

/// Where the original decision variables live, for decoding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelLayout {
    /// Choices, indexed like `assignment`.
    pub choices: Vec<Choice>,
    /// `w` variable per choice.
    pub assignment: Vec<VarId>,
    /// `s` variable per surgery.
    pub start: Vec<VarId>,
    /// Room overtime per room-day group.
    pub room_overtime: Vec<VarId>,
    /// Doctor overtime per doctor-day group.
    pub doctor_overtime: Vec<VarId>,
    /// Idle time per room-day group.
    pub idle: Vec<VarId>,
}

/// Incrementally assembles a model.
#[derive(Debug, Default)]
pub struct ModelBuilder {
    variables: Vec<Variable>,
    constraints: Vec<LinearConstraint>,
    objective: LinearExpr,
}

impl ModelBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a binary variable.
    pub fn add_binary(&mut self, name: impl Into<String>) -> VarId {
        self.push(Variable {
            name: name.into(),
            kind: VarKind::Binary,
            lower: 0.0,
            upper: Some(1.0),
        })
    }

    /// Adds a continuous variable.
    pub fn add_continuous(&mut self, name: impl Into<String>, lower: f64, upper: Option<f64>) -> VarId {
        self.push(Variable {
            name: name.into(),
            kind: VarKind::Continuous,
            lower,
            upper,
        })
    }

    fn push(&mut self, var: Variable) -> VarId {
        let id = VarId(self.variables.len());
        self.variables.push(var);
        id
    }

    /// Adds a constraint.
    pub fn add_constraint(&mut self, constraint: LinearConstraint) {
        self.constraints.push(constraint);
    }

    /// Adds `coef · var` to the objective.
    pub fn add_objective_term(&mut self, var: VarId, coef: f64) {
        self.objective.add_term(var, coef);
    }

    /// Number of variables so far.
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// Number of constraints so far.
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Freezes the model.
    pub fn finish(self, variant: FormulationVariant, layout: ModelLayout) -> CompiledModel {
        CompiledModel {
            variables: self.variables,
            constraints: self.constraints,
            objective: self.objective,
            variant,
            layout,
        }
    }
}

/// A solver-agnostic MIP: minimize `objective` subject to `constraints`.
///
/// Produced once by the compiler and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledModel {
    variables: Vec<Variable>,
    constraints: Vec<LinearConstraint>,
    objective: LinearExpr,
    variant: FormulationVariant,
    layout: ModelLayout,
}

impl CompiledModel {
    /// All variables.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Variable by id.
    pub fn variable(&self, id: VarId) -> &Variable {
        &self.variables[id.index()]
    }

    /// All constraints.
    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    /// Minimization objective.
    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    /// Formulation variant.
    pub fn variant(&self) -> FormulationVariant {
        self.variant
    }

    /// Decoding layout.
    pub fn layout(&self) -> &ModelLayout {
        &self.layout
    }

    /// Number of variables.
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// Number of binary variables.
    pub fn num_binaries(&self) -> usize {
        self.variables.iter().filter(|v| v.is_binary()).count()
    }

    /// Number of constraints.
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Number of constraints of one family.
    pub fn count_family(&self, family: ConstraintFamily) -> usize {
        self.constraints.iter().filter(|c| c.family == family).count()
    }

    /// Objective value at a point.
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective.evaluate(values)
    }

    /// Constraints violated by more than `tol` at a point.
    pub fn violations(&self, values: &[f64], tol: f64) -> Vec<&LinearConstraint> {
        self.constraints
            .iter()
            .filter(|c| c.violation(values) > tol)
            .collect()
    }

    /// Whether a point satisfies bounds, integrality, and every constraint.
    pub fn is_feasible_point(&self, values: &[f64], tol: f64) -> bool {
        if values.len() != self.variables.len() {
            return false;
        }
        let in_domain = self.variables.iter().zip(values).all(|(v, &x)| {
            x >= v.lower - tol
                && v.upper.map_or(true, |u| x <= u + tol)
                && (!v.is_binary() || (x - x.round()).abs() <= tol)
        });
        in_domain && self.violations(values, tol).is_empty()
    }
}
