//! Pairwise sequencing formulations.
//!
//! Two surgeries that may share a room-day or doctor-day must not overlap
//! when both are placed there. Every strategy receives the same
//! [`PairTerms`] and emits variables and constraints expressing
//!
//! ```text
//! x_j = x_i = 1  ⇒  s_i ≥ s_j + δ_j  ∨  s_j ≥ s_i + δ_i
//! ```
//!
//! where `x` is the surgery's assignment indicator on the resource-day and
//! `δ` its buffered duration there (both linear in the choice variables).
//! The strategies describe the same feasible set on the original variables
//! and differ only in relaxation strength and size.
//!
//! # Reference
//! - McCormick (1976), "Computability of global solutions to factorable
//!   nonconvex programs", Mathematical Programming 10(1)
//! - Frangioni & Gentile (2006), "Perspective cuts for a class of convex 0–1
//!   mixed integer programs", Mathematical Programming 106(2)

use std::fmt::Debug;

use crate::config::FormulationVariant;
use crate::eligibility::ResourceKind;
use crate::mip::{ConstraintFamily, LinearConstraint, LinearExpr, ModelBuilder, Sense, VarId};

/// Linear terms describing one sequencing pair on one resource-day.
#[derive(Debug, Clone)]
pub struct PairTerms {
    /// Resource type.
    pub kind: ResourceKind,
    /// Name suffix unique to this pair.
    pub tag: String,
    /// Start variable of the earlier-indexed surgery `j`.
    pub start_first: VarId,
    /// Start variable of the later-indexed surgery `i`.
    pub start_second: VarId,
    /// `x_j`: assignment indicator of `j` on the resource-day.
    pub assigned_first: LinearExpr,
    /// `x_i`.
    pub assigned_second: LinearExpr,
    /// `δ_j`: buffered duration of `j` on the resource-day (0 if absent).
    pub duration_first: LinearExpr,
    /// `δ_i`.
    pub duration_second: LinearExpr,
    /// `D_j`: largest buffered duration of `j` on the resource-day.
    pub max_duration_first: f64,
    /// `D_i`.
    pub max_duration_second: f64,
    /// Start-time upper bound S.
    pub horizon: f64,
    /// Global Big-M: S plus the largest buffered duration anywhere.
    pub big_m: f64,
}

impl PairTerms {
    /// `s_i − s_j`.
    fn start_gap(&self) -> LinearExpr {
        LinearExpr::term(self.start_second, 1.0).with_term(self.start_first, -1.0)
    }
}

/// A way of writing the disjunctive sequencing constraints.
pub trait SequencingStrategy: Send + Sync + Debug {
    /// Short name.
    fn name(&self) -> &'static str;

    /// Variant this strategy implements.
    fn variant(&self) -> FormulationVariant;

    /// Adds the variables and constraints for one pair.
    fn emit_pair(&self, model: &mut ModelBuilder, pair: &PairTerms);
}

/// Strategy for a formulation variant.
pub fn strategy_for(variant: FormulationVariant) -> Box<dyn SequencingStrategy> {
    match variant {
        FormulationVariant::Base => Box::new(BaseSequencing),
        FormulationVariant::Strengthened => Box::new(StrengthenedSequencing),
        FormulationVariant::Perspective => Box::new(PerspectiveSequencing),
    }
}

/// Binary `b = x_j ∧ x_i` via its three McCormick bounds.
///
/// For binary inputs the bounds admit exactly one value of `b`.
pub fn link_and(
    model: &mut ModelBuilder,
    tag: &str,
    first: &LinearExpr,
    second: &LinearExpr,
) -> VarId {
    let b = model.add_binary(format!("b_{tag}"));
    let both = LinearExpr::term(b, 1.0);
    model.add_constraint(LinearConstraint::le(
        format!("and1_{tag}"),
        ConstraintFamily::Linking,
        both.clone(),
        first,
    ));
    model.add_constraint(LinearConstraint::le(
        format!("and2_{tag}"),
        ConstraintFamily::Linking,
        both.clone(),
        second,
    ));
    model.add_constraint(LinearConstraint::ge(
        format!("and3_{tag}"),
        ConstraintFamily::Linking,
        both,
        &first.clone().plus(second).with_constant(-1.0),
    ));
    b
}

/// Independent order binary with a double Big-M deactivation.
///
/// ```text
/// s_i ≥ s_j + δ_j − M(2 − x_j − x_i) − M(1 − u)
/// s_j ≥ s_i + δ_i − M(2 − x_j − x_i) − M·u
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct BaseSequencing;

impl SequencingStrategy for BaseSequencing {
    fn name(&self) -> &'static str {
        "base"
    }

    fn variant(&self) -> FormulationVariant {
        FormulationVariant::Base
    }

    fn emit_pair(&self, model: &mut ModelBuilder, pair: &PairTerms) {
        let m = pair.big_m;
        let u = model.add_binary(format!("u_{}", pair.tag));
        let both_active = pair
            .assigned_first
            .scaled(m)
            .plus_scaled(&pair.assigned_second, m);

        // s_i − s_j − δ_j ≥ −3M + M x_j + M x_i + M u
        model.add_constraint(LinearConstraint::ge(
            format!("seq1_{}", pair.tag),
            ConstraintFamily::Sequencing,
            pair.start_gap().minus(&pair.duration_first),
            &both_active.clone().with_term(u, m).with_constant(-3.0 * m),
        ));
        // s_j − s_i − δ_i ≥ −2M + M x_j + M x_i − M u
        model.add_constraint(LinearConstraint::ge(
            format!("seq2_{}", pair.tag),
            ConstraintFamily::Sequencing,
            pair.start_gap().scaled(-1.0).minus(&pair.duration_second),
            &both_active.with_term(u, -m).with_constant(-2.0 * m),
        ));
    }
}

/// AND-linked activity with pair-specific Big-M values.
///
/// ```text
/// s_i ≥ s_j + δ_j − M_ji(2 − b − u)      M_ji = S + D_j
/// s_j ≥ s_i + δ_i − M_ij(1 − b + u)      M_ij = S + D_i
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct StrengthenedSequencing;

impl SequencingStrategy for StrengthenedSequencing {
    fn name(&self) -> &'static str {
        "strengthened"
    }

    fn variant(&self) -> FormulationVariant {
        FormulationVariant::Strengthened
    }

    fn emit_pair(&self, model: &mut ModelBuilder, pair: &PairTerms) {
        let b = link_and(model, &pair.tag, &pair.assigned_first, &pair.assigned_second);
        let u = model.add_binary(format!("u_{}", pair.tag));
        let m_ji = pair.horizon + pair.max_duration_first;
        let m_ij = pair.horizon + pair.max_duration_second;

        // s_i − s_j − δ_j ≥ −2M_ji + M_ji b + M_ji u
        model.add_constraint(LinearConstraint::ge(
            format!("seq1_{}", pair.tag),
            ConstraintFamily::Sequencing,
            pair.start_gap().minus(&pair.duration_first),
            &LinearExpr::term(b, m_ji)
                .with_term(u, m_ji)
                .with_constant(-2.0 * m_ji),
        ));
        // s_j − s_i − δ_i ≥ −M_ij + M_ij b − M_ij u
        model.add_constraint(LinearConstraint::ge(
            format!("seq2_{}", pair.tag),
            ConstraintFamily::Sequencing,
            pair.start_gap().scaled(-1.0).minus(&pair.duration_second),
            &LinearExpr::term(b, m_ij)
                .with_term(u, -m_ij)
                .with_constant(-m_ij),
        ));
    }
}

/// McCormick envelope of order indicator times start-time difference.
///
/// Two order binaries split the AND indicator (`v_ji + v_ij = b`); the
/// products `g_ji = v_ji (s_i − s_j)` and `g_ij = v_ij (s_j − s_i)` are
/// linearized over `[−S, S]` and must cover the predecessor's duration.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerspectiveSequencing;

impl PerspectiveSequencing {
    /// `g = v · gap` over `gap ∈ [−S, S]`, then `g ≥ δ − D(1 − v)`.
    fn emit_product(
        model: &mut ModelBuilder,
        name: &str,
        pair: &PairTerms,
        gap: &LinearExpr,
        duration: &LinearExpr,
        max_duration: f64,
    ) -> (VarId, VarId) {
        let s = pair.horizon;
        let v = model.add_binary(format!("v{name}_{}", pair.tag));
        let g = model.add_continuous(format!("g{name}_{}", pair.tag), -s, Some(s));
        let g_expr = LinearExpr::term(g, 1.0);

        let bounds = [
            // g ≥ −S v
            (Sense::Ge, LinearExpr::term(v, -s)),
            // g ≤ S v
            (Sense::Le, LinearExpr::term(v, s)),
            // g ≥ gap − S(1 − v)
            (Sense::Ge, gap.clone().with_term(v, s).with_constant(-s)),
            // g ≤ gap + S(1 − v)
            (Sense::Le, gap.clone().with_term(v, -s).with_constant(s)),
        ];
        for (n, (sense, rhs)) in bounds.into_iter().enumerate() {
            model.add_constraint(LinearConstraint::new(
                format!("mc{name}{}_{}", n + 1, pair.tag),
                ConstraintFamily::Linking,
                g_expr.clone().minus(&rhs),
                sense,
                0.0,
            ));
        }

        // g − δ − D v ≥ −D
        model.add_constraint(LinearConstraint::ge(
            format!("seq{name}_{}", pair.tag),
            ConstraintFamily::Sequencing,
            g_expr,
            &duration
                .clone()
                .with_term(v, max_duration)
                .with_constant(-max_duration),
        ));
        (v, g)
    }
}

impl SequencingStrategy for PerspectiveSequencing {
    fn name(&self) -> &'static str {
        "perspective"
    }

    fn variant(&self) -> FormulationVariant {
        FormulationVariant::Perspective
    }

    fn emit_pair(&self, model: &mut ModelBuilder, pair: &PairTerms) {
        let b = link_and(model, &pair.tag, &pair.assigned_first, &pair.assigned_second);
        let gap = pair.start_gap();
        let (v1, _) = Self::emit_product(
            model,
            "1",
            pair,
            &gap,
            &pair.duration_first,
            pair.max_duration_first,
        );
        let (v2, _) = Self::emit_product(
            model,
            "2",
            pair,
            &gap.scaled(-1.0),
            &pair.duration_second,
            pair.max_duration_second,
        );
        model.add_constraint(LinearConstraint::new(
            format!("split_{}", pair.tag),
            ConstraintFamily::Linking,
            LinearExpr::term(v1, 1.0)
                .with_term(v2, 1.0)
                .with_term(b, -1.0),
            Sense::Eq,
            0.0,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_linearization_admits_only_product() {
        let mut mb = ModelBuilder::new();
        let xj = mb.add_binary("xj");
        let xi = mb.add_binary("xi");
        let b = link_and(
            &mut mb,
            "t",
            &LinearExpr::term(xj, 1.0),
            &LinearExpr::term(xi, 1.0),
        );
        let model = mb.finish(FormulationVariant::Strengthened, Default::default());
        assert_eq!(b.index(), 2);
        assert_eq!(model.count_family(ConstraintFamily::Linking), 3);

        for (vj, vi) in [(0.0, 0.0), (0.0, 1.0), (1.0, 0.0), (1.0, 1.0)] {
            let product = vj * vi;
            for vb in [0.0, 1.0] {
                let feasible = model.is_feasible_point(&[vj, vi, vb], 1e-9);
                assert_eq!(feasible, vb == product, "x=({vj},{vi}) b={vb}");
            }
        }
    }

    #[test]
    fn test_strategy_names() {
        for variant in FormulationVariant::ALL {
            let s = strategy_for(variant);
            assert_eq!(s.variant(), variant);
            assert_eq!(s.name(), variant.name());
        }
    }
}
