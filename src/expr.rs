//! Condition and forbidden-clause expression algebra.
//!
//! Conditions are small read-only trees built from comparison leaves
//! ([`eq`], [`ne`], [`lt`], [`gt`]), a membership leaf ([`contains`]), and
//! n-ary boolean combinators ([`both`], [`either`]). Leaves reference
//! dimensions by their dotted name, never by live pointer, so expressions
//! survive serialization and deserialization unchanged.
//!
//! The dimension argument of each constructor is `impl AsRef<str>`, so both
//! a [`Dim`](crate::Dim) handle and a plain name work:
//!
//! ```
//! use searchspace::{Space, eq, either};
//!
//! let space = Space::new();
//! let optim = space.categorical("optimizer", ["sgd", "adam"]).unwrap();
//! let lr = space.loguniform("optimizer.lr", 1.0, 2.0).unwrap();
//! lr.enable_if(either([eq(&optim, "sgd"), eq(&optim, "adam")])).unwrap();
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// A boolean expression over dimension values.
///
/// Expressions are pure data. They are attached to a dimension with
/// [`Dim::enable_if`](crate::Dim::enable_if) and evaluated by the backend at
/// sampling time against a fully-drawn sample; the abstract layer never
/// evaluates them during space construction.
///
/// Serialization is tagged by `op`, e.g.
/// `{"op": "eq", "dim": "optimizer", "value": "sgd"}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Expr {
    /// True when the referenced dimension equals the literal.
    Eq {
        /// The dotted name of the referenced dimension.
        dim: String,
        /// The literal to compare against.
        value: Value,
    },
    /// True when the referenced dimension is present and differs from the literal.
    Ne {
        /// The dotted name of the referenced dimension.
        dim: String,
        /// The literal to compare against.
        value: Value,
    },
    /// True when the referenced dimension is strictly below the literal.
    Lt {
        /// The dotted name of the referenced dimension.
        dim: String,
        /// The literal to compare against.
        value: Value,
    },
    /// True when the referenced dimension is strictly above the literal.
    Gt {
        /// The dotted name of the referenced dimension.
        dim: String,
        /// The literal to compare against.
        value: Value,
    },
    /// True when the referenced dimension's value is one of the literals.
    In {
        /// The dotted name of the referenced dimension.
        dim: String,
        /// The member literals.
        values: Vec<Value>,
    },
    /// True when every child expression is true (n-ary AND).
    Both {
        /// The child expressions.
        of: Vec<Expr>,
    },
    /// True when at least one child expression is true (n-ary OR).
    Either {
        /// The child expressions.
        of: Vec<Expr>,
    },
}

impl Expr {
    /// Evaluates this expression against a drawn sample.
    ///
    /// A comparison whose referenced dimension is absent from the sample
    /// (inactive in this draw) evaluates to `false` — including [`Expr::Ne`],
    /// so conditions never activate a dimension off the back of a missing
    /// value.
    #[must_use]
    pub(crate) fn evaluate(&self, sample: &IndexMap<String, Value>) -> bool {
        match self {
            Expr::Eq { dim, value } => sample.get(dim).is_some_and(|v| v.coerced_eq(value)),
            Expr::Ne { dim, value } => sample.get(dim).is_some_and(|v| !v.coerced_eq(value)),
            Expr::Lt { dim, value } => sample
                .get(dim)
                .and_then(|v| v.compare(value))
                .is_some_and(core::cmp::Ordering::is_lt),
            Expr::Gt { dim, value } => sample
                .get(dim)
                .and_then(|v| v.compare(value))
                .is_some_and(core::cmp::Ordering::is_gt),
            Expr::In { dim, values } => sample
                .get(dim)
                .is_some_and(|v| values.iter().any(|m| v.coerced_eq(m))),
            Expr::Both { of } => of.iter().all(|e| e.evaluate(sample)),
            Expr::Either { of } => of.iter().any(|e| e.evaluate(sample)),
        }
    }

    /// Collects the names of every dimension this expression references.
    pub(crate) fn collect_referenced<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Eq { dim, .. }
            | Expr::Ne { dim, .. }
            | Expr::Lt { dim, .. }
            | Expr::Gt { dim, .. }
            | Expr::In { dim, .. } => out.push(dim),
            Expr::Both { of } | Expr::Either { of } => {
                for e in of {
                    e.collect_referenced(out);
                }
            }
        }
    }
}

/// Builds an equality condition: `dim == value`.
pub fn eq(dim: impl AsRef<str>, value: impl Into<Value>) -> Expr {
    Expr::Eq {
        dim: dim.as_ref().to_owned(),
        value: value.into(),
    }
}

/// Builds an inequality condition: `dim != value`.
pub fn ne(dim: impl AsRef<str>, value: impl Into<Value>) -> Expr {
    Expr::Ne {
        dim: dim.as_ref().to_owned(),
        value: value.into(),
    }
}

/// Builds a strict less-than condition: `dim < value`.
pub fn lt(dim: impl AsRef<str>, value: impl Into<Value>) -> Expr {
    Expr::Lt {
        dim: dim.as_ref().to_owned(),
        value: value.into(),
    }
}

/// Builds a strict greater-than condition: `dim > value`.
pub fn gt(dim: impl AsRef<str>, value: impl Into<Value>) -> Expr {
    Expr::Gt {
        dim: dim.as_ref().to_owned(),
        value: value.into(),
    }
}

/// Builds a membership condition: `dim ∈ values`.
pub fn contains<I, V>(dim: impl AsRef<str>, values: I) -> Expr
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    Expr::In {
        dim: dim.as_ref().to_owned(),
        values: values.into_iter().map(Into::into).collect(),
    }
}

/// Combines expressions with a logical AND.
pub fn both(exprs: impl IntoIterator<Item = Expr>) -> Expr {
    Expr::Both {
        of: exprs.into_iter().collect(),
    }
}

/// Combines expressions with a logical OR.
pub fn either(exprs: impl IntoIterator<Item = Expr>) -> Expr {
    Expr::Either {
        of: exprs.into_iter().collect(),
    }
}

/// A value predicate that makes a draw invalid.
///
/// Clauses attach to a dimension via [`Dim::forbid_equal`](crate::Dim::forbid_equal)
/// and [`Dim::forbid_in`](crate::Dim::forbid_in). They are disjunctive: a
/// draw is rejected (and retried) if ANY attached clause matches.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Forbidden {
    /// Rejects draws equal to the literal.
    Equal {
        /// The forbidden literal.
        value: Value,
    },
    /// Rejects draws equal to any of the literals.
    In {
        /// The forbidden literals.
        values: Vec<Value>,
    },
}

impl Forbidden {
    /// Returns `true` when the drawn value matches this clause.
    #[must_use]
    pub(crate) fn matches(&self, drawn: &Value) -> bool {
        match self {
            Forbidden::Equal { value } => drawn.coerced_eq(value),
            Forbidden::In { values } => values.iter().any(|v| drawn.coerced_eq(v)),
        }
    }
}
