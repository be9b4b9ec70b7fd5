//! Dimension kinds and the validated dimension record.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::expr::{Expr, Forbidden};
use crate::value::Value;

/// The distribution family of a dimension, with its parameters.
///
/// A log-uniform dimension is represented as [`Kind::Uniform`] with the
/// dimension's `log` flag set, mirroring how the log flag applies
/// orthogonally to normals.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Kind {
    /// Continuous uniform over `[low, high]`.
    Uniform {
        /// Lower bound (inclusive).
        low: f64,
        /// Upper bound (inclusive).
        high: f64,
    },
    /// Normal (Gaussian) with the given location and scale.
    Normal {
        /// The distribution mean.
        loc: f64,
        /// The distribution standard deviation.
        scale: f64,
    },
    /// Unordered choice among weighted labels.
    ///
    /// Weights need not sum to one; they are normalized at sample time.
    Categorical {
        /// The ordered `(label, weight)` pairs.
        choices: Vec<(Value, f64)>,
    },
    /// Totally-ordered choice among values.
    ///
    /// Backends that cannot express the ordering must reject this kind
    /// rather than silently treat it as unordered.
    Ordinal {
        /// The values, in ascending order.
        values: Vec<Value>,
    },
    /// Multi-fidelity budget axis for successive-halving style schedulers.
    Fidelity {
        /// The minimum budget.
        low: i64,
        /// The maximum budget.
        high: i64,
        /// The budget reduction base.
        base: i64,
    },
}

impl Kind {
    /// Short lowercase name of the kind, as used in serialized documents.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Kind::Uniform { .. } => "uniform",
            Kind::Normal { .. } => "normal",
            Kind::Categorical { .. } => "categorical",
            Kind::Ordinal { .. } => "ordinal",
            Kind::Fidelity { .. } => "fidelity",
        }
    }

    /// Whether the `discrete`/`log`/`quantization` flags apply to this kind.
    #[must_use]
    pub(crate) fn supports_flags(&self) -> bool {
        matches!(self, Kind::Uniform { .. } | Kind::Normal { .. })
    }
}

/// One named, typed axis of a search space.
///
/// Dimensions are created through the [`Space`](crate::Space) constructor
/// methods (`uniform`, `loguniform`, `normal`, `categorical`, ...), which
/// validate arguments synchronously and return a live [`Dim`](crate::Dim)
/// handle. The record itself stays inside the owning space; this type shows
/// up directly when implementing a [`backend::Adapter`](crate::backend::Adapter).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    name: String,
    #[serde(flatten)]
    kind: Kind,
    discrete: bool,
    log: bool,
    quantization: Option<f64>,
    condition: Option<Expr>,
    forbidden: Vec<Forbidden>,
}

impl Dimension {
    fn new(name: &str, kind: Kind) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            discrete: false,
            log: false,
            quantization: None,
            condition: None,
            forbidden: Vec::new(),
        }
    }

    /// Builds a continuous uniform dimension over `[low, high]`.
    pub(crate) fn uniform(name: &str, low: f64, high: f64) -> Result<Self> {
        if low >= high {
            return Err(Error::InvalidBounds { low, high });
        }
        Ok(Self::new(name, Kind::Uniform { low, high }))
    }

    /// Builds a log-uniform dimension: uniform bounds with the log flag set.
    pub(crate) fn loguniform(name: &str, low: f64, high: f64) -> Result<Self> {
        let mut dim = Self::uniform(name, low, high)?;
        dim.set_log()?;
        Ok(dim)
    }

    /// Builds a normal dimension with the given location and scale.
    pub(crate) fn normal(name: &str, loc: f64, scale: f64) -> Result<Self> {
        if scale <= 0.0 {
            return Err(Error::InvalidScale(scale));
        }
        Ok(Self::new(name, Kind::Normal { loc, scale }))
    }

    /// Builds a categorical dimension from `(label, weight)` pairs.
    pub(crate) fn categorical(name: &str, choices: Vec<(Value, f64)>) -> Result<Self> {
        if choices.is_empty() {
            return Err(Error::EmptyChoices);
        }
        for (label, weight) in &choices {
            if *weight < 0.0 {
                return Err(Error::NegativeWeight {
                    choice: label.to_string(),
                    weight: *weight,
                });
            }
        }
        if choices.iter().map(|(_, w)| w).sum::<f64>() <= 0.0 {
            return Err(Error::InvalidAttribute {
                name: name.to_owned(),
                reason: "choice weights must not all be zero",
            });
        }
        Ok(Self::new(name, Kind::Categorical { choices }))
    }

    /// Builds an ordinal dimension over totally-ordered values.
    pub(crate) fn ordinal(name: &str, values: Vec<Value>) -> Result<Self> {
        if values.is_empty() {
            return Err(Error::EmptyChoices);
        }
        Ok(Self::new(name, Kind::Ordinal { values }))
    }

    /// Builds a fidelity dimension over the budget range `[low, high]`.
    pub(crate) fn fidelity(name: &str, low: i64, high: i64, base: i64) -> Result<Self> {
        if low < 1 || low > high || base < 1 {
            return Err(Error::InvalidFidelity { low, high, base });
        }
        Ok(Self::new(name, Kind::Fidelity { low, high, base }))
    }

    /// The dimension's name, local to its owning space.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The distribution family and parameters.
    #[must_use]
    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    /// Whether sampled values are rounded to integers.
    #[must_use]
    pub fn discrete(&self) -> bool {
        self.discrete
    }

    /// Whether sampling happens in log space.
    #[must_use]
    pub fn log(&self) -> bool {
        self.log
    }

    /// Step size continuous draws snap to, if any.
    #[must_use]
    pub fn quantization(&self) -> Option<f64> {
        self.quantization
    }

    /// The enable condition attached to this dimension, if any.
    #[must_use]
    pub fn condition(&self) -> Option<&Expr> {
        self.condition.as_ref()
    }

    /// The forbidden clauses attached to this dimension.
    #[must_use]
    pub fn forbidden(&self) -> &[Forbidden] {
        &self.forbidden
    }

    fn check_flags_apply(&self, reason: &'static str) -> Result<()> {
        if self.kind.supports_flags() {
            Ok(())
        } else {
            Err(Error::InvalidAttribute {
                name: self.name.clone(),
                reason,
            })
        }
    }

    pub(crate) fn set_discrete(&mut self) -> Result<()> {
        self.check_flags_apply("discrete only applies to uniform and normal dimensions")?;
        self.discrete = true;
        Ok(())
    }

    pub(crate) fn set_log(&mut self) -> Result<()> {
        self.check_flags_apply("log only applies to uniform and normal dimensions")?;
        if let Kind::Uniform { low, .. } = self.kind
            && low <= 0.0
        {
            return Err(Error::InvalidLogBounds);
        }
        self.log = true;
        Ok(())
    }

    pub(crate) fn set_quantization(&mut self, q: f64) -> Result<()> {
        self.check_flags_apply("quantization only applies to uniform and normal dimensions")?;
        if q <= 0.0 {
            return Err(Error::InvalidQuantization(q));
        }
        self.quantization = Some(q);
        Ok(())
    }

    pub(crate) fn set_condition(&mut self, expr: Expr) {
        self.condition = Some(expr);
    }

    pub(crate) fn push_forbidden(&mut self, clause: Forbidden) {
        self.forbidden.push(clause);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_rejects_inverted_bounds() {
        assert!(matches!(
            Dimension::uniform("a", 2.0, 1.0),
            Err(Error::InvalidBounds { .. })
        ));
        assert!(matches!(
            Dimension::uniform("a", 1.0, 1.0),
            Err(Error::InvalidBounds { .. })
        ));
    }

    #[test]
    fn loguniform_requires_positive_low() {
        assert!(matches!(
            Dimension::loguniform("a", 0.0, 1.0),
            Err(Error::InvalidLogBounds)
        ));
        assert!(Dimension::loguniform("a", 1.0, 2.0).unwrap().log());
    }

    #[test]
    fn normal_requires_positive_scale() {
        assert!(matches!(
            Dimension::normal("a", 0.0, 0.0),
            Err(Error::InvalidScale(_))
        ));
        assert!(Dimension::normal("a", 0.0, 1.0).is_ok());
    }

    #[test]
    fn categorical_validation() {
        assert!(matches!(
            Dimension::categorical("c", vec![]),
            Err(Error::EmptyChoices)
        ));
        assert!(matches!(
            Dimension::categorical("c", vec![(Value::Str("a".into()), -0.5)]),
            Err(Error::NegativeWeight { .. })
        ));
        assert!(matches!(
            Dimension::categorical("c", vec![(Value::Str("a".into()), 0.0)]),
            Err(Error::InvalidAttribute { .. })
        ));
    }

    #[test]
    fn fidelity_validation() {
        assert!(matches!(
            Dimension::fidelity("f", 0, 300, 4),
            Err(Error::InvalidFidelity { .. })
        ));
        assert!(matches!(
            Dimension::fidelity("f", 10, 5, 4),
            Err(Error::InvalidFidelity { .. })
        ));
        assert!(Dimension::fidelity("f", 1, 300, 4).is_ok());
    }

    #[test]
    fn flags_rejected_on_categorical() {
        let mut dim =
            Dimension::categorical("c", vec![(Value::Str("a".into()), 1.0)]).unwrap();
        assert!(matches!(
            dim.set_quantization(0.1),
            Err(Error::InvalidAttribute { .. })
        ));
        assert!(matches!(
            dim.set_discrete(),
            Err(Error::InvalidAttribute { .. })
        ));
    }

    #[test]
    fn quantization_must_be_positive() {
        let mut dim = Dimension::uniform("a", 0.0, 1.0).unwrap();
        assert!(matches!(
            dim.set_quantization(0.0),
            Err(Error::InvalidQuantization(_))
        ));
        dim.set_quantization(0.25).unwrap();
        assert_eq!(dim.quantization(), Some(0.25));
    }
}
