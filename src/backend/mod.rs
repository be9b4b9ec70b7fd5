//! Backend adapters and the backend registry.
//!
//! A backend materializes an abstract [`Space`](crate::Space) into a concrete
//! sampler. Each backend implements the [`Adapter`] contract once; the
//! registry maps a runtime identifier to an adapter factory, so adding a
//! backend means adding one adapter and one [`register`] call — no change to
//! `Space`.
//!
//! # Bundled backends
//!
//! | Identifier | Engine | Capability gaps | Inactive dimensions |
//! |------------|--------|-----------------|---------------------|
//! | `"random"` | Pseudo-random (`fastrand`) | none | omitted from the draw |
//! | `"sobol"`  | Scrambled Sobol sequence (`sobol_burley`) | log-normal, ordinal | remain present in the draw |
//!
//! The two backends deliberately disagree on what happens to a dimension
//! whose condition evaluates false: `"random"` drops it from the draw, while
//! `"sobol"` keeps it (its lattice point is consumed either way). Callers
//! rely on such differences to detect which branch of a conditional space
//! was taken, so the discrepancy is documented per backend rather than
//! papered over.

pub mod random;
pub mod sobol;

use std::collections::HashMap;
use std::sync::OnceLock;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::dimension::{Dimension, Kind};
use crate::error::{Error, Result};
use crate::expr::{Expr, Forbidden};
use crate::value::Value;

/// Backend used by [`Space::sample`](crate::Space::sample) when none was
/// declared or instantiated explicitly.
pub const DEFAULT_BACKEND: &str = "random";

/// Bounded retry budget for rejection sampling against forbidden clauses.
///
/// A draw that keeps matching forbidden clauses for this many attempts fails
/// with [`Error::SamplingExhausted`] instead of looping forever.
pub const MAX_REJECTION_RETRIES: u32 = 100;

/// The per-backend adapter contract consumed by [`Space`](crate::Space).
///
/// Registration is two-phase: [`Space::instantiate`](crate::Space::instantiate)
/// registers every dimension before any condition or forbidden clause, since
/// conditions may reference dimensions registered later in the walk.
///
/// Implementations must be `Send + Sync`; a space (and therefore its cached
/// binding) may be moved across threads even though concurrent mutation is
/// not supported.
pub trait Adapter: Send + Sync {
    /// The registry identifier of this backend, for error messages.
    fn backend_name(&self) -> &'static str;

    /// Translates one dimension into the backend's native primitives.
    ///
    /// Returns the backend-native identifier for the dimension.
    ///
    /// # Errors
    ///
    /// [`Error::NotSupported`] naming this backend and the unsupported
    /// kind/flag combination.
    fn register_dimension(&mut self, name: &str, dim: &Dimension) -> Result<String>;

    /// Registers the enable condition of a previously registered dimension.
    ///
    /// # Errors
    ///
    /// [`Error::NotSupported`] if the backend cannot express the expression
    /// shape.
    fn register_condition(&mut self, name: &str, condition: &Expr) -> Result<()>;

    /// Registers one forbidden clause of a previously registered dimension.
    ///
    /// # Errors
    ///
    /// [`Error::NotSupported`] if the backend cannot express the clause
    /// shape.
    fn register_forbidden(&mut self, name: &str, clause: &Forbidden) -> Result<()>;

    /// Draws `n` samples keyed by backend-native identifiers.
    ///
    /// # Errors
    ///
    /// [`Error::SamplingExhausted`] when rejection sampling against
    /// forbidden clauses spends the whole retry budget.
    fn draw(&self, n: usize) -> Result<Vec<IndexMap<String, Value>>>;

    /// The backend-native identifier for an abstract dotted name.
    fn native_name(&self, abstract_name: &str) -> Option<&str>;

    /// The abstract dotted name for a backend-native identifier.
    fn abstract_name(&self, native_name: &str) -> Option<&str>;
}

/// Constructor for a fresh, empty adapter.
pub type AdapterFactory = fn() -> Box<dyn Adapter>;

fn registry() -> &'static RwLock<HashMap<String, AdapterFactory>> {
    static REGISTRY: OnceLock<RwLock<HashMap<String, AdapterFactory>>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut map: HashMap<String, AdapterFactory> = HashMap::new();
        map.insert("random".to_owned(), || Box::new(random::RandomBackend::new()));
        map.insert("sobol".to_owned(), || Box::new(sobol::SobolBackend::new()));
        RwLock::new(map)
    })
}

/// Registers an adapter factory under the given identifier.
///
/// Replaces any previous registration under the same identifier.
pub fn register(name: &str, factory: AdapterFactory) {
    registry().write().insert(name.to_owned(), factory);
}

/// Creates a fresh adapter for the given identifier.
///
/// # Errors
///
/// [`Error::UnknownBackend`] when nothing is registered under `name`.
pub fn create(name: &str) -> Result<Box<dyn Adapter>> {
    registry()
        .read()
        .get(name)
        .map(|factory| factory())
        .ok_or_else(|| Error::UnknownBackend {
            name: name.to_owned(),
        })
}

/// The identifiers of every registered backend, sorted.
#[must_use]
pub fn available() -> Vec<String> {
    let mut names: Vec<String> = registry().read().keys().cloned().collect();
    names.sort();
    names
}

/// A backend-native distribution primitive.
///
/// Both bundled backends translate [`Kind`] plus flags into this shape; they
/// differ in which translations they accept and in how they turn unit
/// points into values.
pub(crate) enum NativeDist {
    Uniform {
        low: f64,
        high: f64,
        log: bool,
        discrete: bool,
        quantization: Option<f64>,
    },
    Normal {
        loc: f64,
        scale: f64,
        log: bool,
        discrete: bool,
        quantization: Option<f64>,
    },
    Categorical {
        choices: Vec<Value>,
        /// Normalized cumulative weights; the last entry is 1.0.
        cumulative: Vec<f64>,
    },
    Ordinal {
        values: Vec<Value>,
    },
    Fidelity {
        high: i64,
    },
}

impl NativeDist {
    /// Whether mapping a point to this distribution consumes two unit
    /// coordinates (Box–Muller) instead of one.
    pub(crate) fn needs_pair(&self) -> bool {
        matches!(self, NativeDist::Normal { .. })
    }
}

/// Builds normalized cumulative weights from `(label, weight)` pairs.
///
/// Weight validation happened at dimension construction; the sum is positive.
pub(crate) fn cumulative_weights(choices: &[(Value, f64)]) -> (Vec<Value>, Vec<f64>) {
    let total: f64 = choices.iter().map(|(_, w)| w).sum();
    let mut acc = 0.0;
    let mut labels = Vec::with_capacity(choices.len());
    let mut cumulative = Vec::with_capacity(choices.len());
    for (label, weight) in choices {
        acc += weight / total;
        labels.push(label.clone());
        cumulative.push(acc);
    }
    if let Some(last) = cumulative.last_mut() {
        *last = 1.0;
    }
    (labels, cumulative)
}

/// Standard normal deviate from two unit coordinates (Box–Muller).
pub(crate) fn gaussian_from_unit(u1: f64, u2: f64) -> f64 {
    let u1 = u1.max(f64::MIN_POSITIVE);
    (-2.0 * u1.ln()).sqrt() * (2.0 * core::f64::consts::PI * u2).cos()
}

/// Applies quantization, bounds, and discreteness to a raw continuous draw.
///
/// Quantization snaps to the grid anchored at `low` when bounds are present
/// (so every snapped value is congruent to `low` modulo the step), and at 0
/// otherwise. The grid index is capped to stay inside the bounds.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn finalize_numeric(
    raw: f64,
    discrete: bool,
    quantization: Option<f64>,
    bounds: Option<(f64, f64)>,
) -> Value {
    let mut v = raw;
    if let Some(q) = quantization {
        match bounds {
            Some((low, high)) => {
                let mut k = ((v - low) / q).round();
                let k_max = ((high - low) / q + 1e-9).floor();
                if k > k_max {
                    k = k_max;
                }
                if k < 0.0 {
                    k = 0.0;
                }
                v = low + k * q;
            }
            None => v = (v / q).round() * q,
        }
    }
    if let Some((low, high)) = bounds {
        v = v.clamp(low, high);
    }
    if discrete {
        let mut i = v.round() as i64;
        if let Some((low, high)) = bounds {
            let lo = low.ceil() as i64;
            let hi = high.floor() as i64;
            if lo <= hi {
                i = i.clamp(lo, hi);
            }
        }
        Value::Int(i)
    } else {
        Value::Float(v)
    }
}

/// Maps one (or, for normals, two) unit coordinates to a value of the given
/// native distribution.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
pub(crate) fn map_unit(native: &NativeDist, u1: f64, u2: f64) -> Value {
    match native {
        NativeDist::Uniform {
            low,
            high,
            log,
            discrete,
            quantization,
        } => {
            let raw = if *log {
                let log_low = low.ln();
                let log_high = high.ln();
                (log_low + u1 * (log_high - log_low)).exp()
            } else {
                low + u1 * (high - low)
            };
            finalize_numeric(raw, *discrete, *quantization, Some((*low, *high)))
        }
        NativeDist::Normal {
            loc,
            scale,
            log,
            discrete,
            quantization,
        } => {
            let z = gaussian_from_unit(u1, u2);
            let raw = loc + scale * z;
            let raw = if *log { raw.exp() } else { raw };
            finalize_numeric(raw, *discrete, *quantization, None)
        }
        NativeDist::Categorical {
            choices,
            cumulative,
        } => {
            let idx = cumulative
                .iter()
                .position(|&c| u1 < c)
                .unwrap_or(choices.len() - 1);
            choices[idx].clone()
        }
        NativeDist::Ordinal { values } => {
            let idx = ((u1 * values.len() as f64).floor() as usize).min(values.len() - 1);
            values[idx].clone()
        }
        NativeDist::Fidelity { high } => Value::Int(*high),
    }
}

/// Shorthand for the capability error every adapter raises.
pub(crate) fn not_supported(backend: &'static str, feature: impl Into<String>) -> Error {
    Error::NotSupported {
        backend,
        feature: feature.into(),
    }
}

/// Translates the kinds and flags both bundled backends agree on.
///
/// The caller rejects its own capability gaps before delegating here.
pub(crate) fn translate_common(dim: &Dimension) -> NativeDist {
    match dim.kind() {
        Kind::Uniform { low, high } => NativeDist::Uniform {
            low: *low,
            high: *high,
            log: dim.log(),
            discrete: dim.discrete(),
            quantization: dim.quantization(),
        },
        Kind::Normal { loc, scale } => NativeDist::Normal {
            loc: *loc,
            scale: *scale,
            log: dim.log(),
            discrete: dim.discrete(),
            quantization: dim.quantization(),
        },
        Kind::Categorical { choices } => {
            let (choices, cumulative) = cumulative_weights(choices);
            NativeDist::Categorical {
                choices,
                cumulative,
            }
        }
        Kind::Ordinal { values } => NativeDist::Ordinal {
            values: values.clone(),
        },
        Kind::Fidelity { high, .. } => NativeDist::Fidelity { high: *high },
    }
}
