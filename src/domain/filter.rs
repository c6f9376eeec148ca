//! Boolean expression nodes evaluated at a [`Snapshot`].
//!
//! # Evaluation Semantics
//!
//! - Comparisons read both methods at the snapshot's index
//! - `eq`/`ne` compare with an absolute tolerance of `1e-9`
//! - `cross_above`/`cross_below` also read yesterday (`index + 1`)
//! - `and` short-circuits on the first `false`, `or` on the first `true`
//! - A method read outside its defined range is a [`RangeError`], never `false`

use std::fmt;

use crate::domain::error::RangeError;
use crate::domain::method::{Method, Scalar};
use crate::domain::provider::Snapshot;

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    pub const ALL: [CompareOp; 6] = [
        CompareOp::Eq,
        CompareOp::Ne,
        CompareOp::Gt,
        CompareOp::Ge,
        CompareOp::Lt,
        CompareOp::Le,
    ];

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "eq" => Some(CompareOp::Eq),
            "ne" => Some(CompareOp::Ne),
            "gt" => Some(CompareOp::Gt),
            "ge" => Some(CompareOp::Ge),
            "lt" => Some(CompareOp::Lt),
            "le" => Some(CompareOp::Le),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Gt => "gt",
            CompareOp::Ge => "ge",
            CompareOp::Lt => "lt",
            CompareOp::Le => "le",
        }
    }

    pub fn apply(self, lhs: f64, rhs: f64) -> bool {
        match self {
            CompareOp::Eq => (lhs - rhs).abs() < EPSILON,
            CompareOp::Ne => (lhs - rhs).abs() >= EPSILON,
            CompareOp::Gt => lhs > rhs,
            CompareOp::Ge => lhs >= rhs,
            CompareOp::Lt => lhs < rhs,
            CompareOp::Le => lhs <= rhs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Filter {
    Const(bool),
    Compare {
        op: CompareOp,
        lhs: Method,
        rhs: Method,
    },
    CrossAbove {
        lhs: Method,
        rhs: Method,
    },
    CrossBelow {
        lhs: Method,
        rhs: Method,
    },
    Between {
        operand: Method,
        lower: Scalar,
        upper: Scalar,
    },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn compare(op: CompareOp, lhs: Method, rhs: Method) -> Self {
        Filter::Compare { op, lhs, rhs }
    }

    pub fn evaluate(&self, snapshot: &Snapshot<'_>) -> Result<bool, RangeError> {
        match self {
            Filter::Const(value) => Ok(*value),
            Filter::Compare { op, lhs, rhs } => {
                Ok(op.apply(snapshot.value(lhs)?, snapshot.value(rhs)?))
            }
            Filter::CrossAbove { lhs, rhs } => {
                let yesterday = snapshot.previous()?;
                let now = snapshot.value(lhs)? > snapshot.value(rhs)?;
                let before = yesterday.value(lhs)? <= yesterday.value(rhs)?;
                Ok(now && before)
            }
            Filter::CrossBelow { lhs, rhs } => {
                let yesterday = snapshot.previous()?;
                let now = snapshot.value(lhs)? < snapshot.value(rhs)?;
                let before = yesterday.value(lhs)? >= yesterday.value(rhs)?;
                Ok(now && before)
            }
            Filter::Between {
                operand,
                lower,
                upper,
            } => {
                let value = snapshot.value(operand)?;
                Ok(value >= lower.get() && value <= upper.get())
            }
            Filter::And(filters) => {
                for f in filters {
                    if !f.evaluate(snapshot)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Filter::Or(filters) => {
                for f in filters {
                    if f.evaluate(snapshot)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Filter::Not(filter) => Ok(!filter.evaluate(snapshot)?),
        }
    }

    /// Every method operand in this tree, in visit order, duplicates included.
    pub fn methods(&self) -> Vec<&Method> {
        let mut out = Vec::new();
        self.collect_methods(&mut out);
        out
    }

    fn collect_methods<'f>(&'f self, out: &mut Vec<&'f Method>) {
        match self {
            Filter::Const(_) => {}
            Filter::Compare { lhs, rhs, .. }
            | Filter::CrossAbove { lhs, rhs }
            | Filter::CrossBelow { lhs, rhs } => {
                out.push(lhs);
                out.push(rhs);
            }
            Filter::Between { operand, .. } => out.push(operand),
            Filter::And(filters) | Filter::Or(filters) => {
                for f in filters {
                    f.collect_methods(out);
                }
            }
            Filter::Not(filter) => filter.collect_methods(out),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, name: &str, filters: &[Filter]) -> fmt::Result {
            write!(f, "{}(", name)?;
            for (i, filter) in filters.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", filter)?;
            }
            write!(f, ")")
        }

        match self {
            Filter::Const(value) => write!(f, "{}", value),
            Filter::Compare { op, lhs, rhs } => write!(f, "{}({}, {})", op.tag(), lhs, rhs),
            Filter::CrossAbove { lhs, rhs } => write!(f, "cross_above({}, {})", lhs, rhs),
            Filter::CrossBelow { lhs, rhs } => write!(f, "cross_below({}, {})", lhs, rhs),
            Filter::Between {
                operand,
                lower,
                upper,
            } => write!(f, "between({}, {}, {})", operand, lower, upper),
            Filter::And(filters) => join(f, "and", filters),
            Filter::Or(filters) => join(f, "or", filters),
            Filter::Not(filter) => write!(f, "not({})", filter),
        }
    }
}
