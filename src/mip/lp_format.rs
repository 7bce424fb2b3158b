//! CPLEX LP-format export.
//!
//! Lets any external MIP solver (CBC, HiGHS, Gurobi, SCIP) read the compiled
//! model without linking a backend.

use super::linear::LinearExpr;
use super::model::{CompiledModel, VarKind};

impl CompiledModel {
    /// Renders the model in LP format.
    pub fn to_lp_format(&self) -> String {
        let name = |e: &LinearExpr| fmt_lin(e, |v| self.variable(v).name.as_str());

        let mut out = String::new();
        out.push_str(&format!("\\ variant: {}\n", self.variant().name()));
        out.push_str("Minimize\n obj: ");
        out.push_str(&name(self.objective()));
        out.push('\n');

        out.push_str("Subject To\n");
        for c in self.constraints() {
            out.push_str(&format!(
                " {}: {} {} {}\n",
                c.name,
                name(&c.expr),
                c.sense.symbol(),
                fmt_num(c.rhs)
            ));
        }

        out.push_str("Bounds\n");
        for v in self.variables().iter().filter(|v| v.kind == VarKind::Continuous) {
            match v.upper {
                Some(u) => out.push_str(&format!(
                    " {} <= {} <= {}\n",
                    fmt_num(v.lower),
                    v.name,
                    fmt_num(u)
                )),
                None if v.lower == f64::NEG_INFINITY => {
                    out.push_str(&format!(" {} free\n", v.name))
                }
                None => out.push_str(&format!(" {} >= {}\n", v.name, fmt_num(v.lower))),
            }
        }

        out.push_str("Binary\n");
        for v in self.variables().iter().filter(|v| v.is_binary()) {
            out.push_str(&format!(" {}\n", v.name));
        }
        out.push_str("End\n");
        out
    }
}

fn fmt_num(v: f64) -> String {
    if (v - v.round()).abs() < 1e-9 {
        format!("{}", v.round() as i64)
    } else {
        format!("{:.6}", v)
    }
}

fn fmt_lin<'a>(e: &LinearExpr, name: impl Fn(super::VarId) -> &'a str) -> String {
    let mut parts: Vec<String> = e
        .terms()
        .map(|(v, c)| {
            if (c - 1.0).abs() < 1e-12 {
                format!("+ {}", name(v))
            } else if (c + 1.0).abs() < 1e-12 {
                format!("- {}", name(v))
            } else if c < 0.0 {
                format!("- {} {}", fmt_num(-c), name(v))
            } else {
                format!("+ {} {}", fmt_num(c), name(v))
            }
        })
        .collect();
    if parts.is_empty() {
        parts.push("0".to_string());
    }
    let k = e.constant_value();
    if k > 1e-12 {
        parts.push(format!("+ {}", fmt_num(k)));
    } else if k < -1e-12 {
        parts.push(format!("- {}", fmt_num(-k)));
    }
    parts.join(" ")
}
