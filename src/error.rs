//! Error taxonomy for search space construction, instantiation, and sampling.
//!
//! Variants fall into four families, each surfaced to the caller without
//! internal recovery:
//!
//! - **Configuration** — malformed dimension arguments or name collisions,
//!   raised synchronously at the call that introduced them
//!   ([`Error::InvalidBounds`] through [`Error::UnknownBackend`]).
//! - **Capability** — the selected backend cannot express a requested
//!   kind, flag, or constraint shape ([`Error::NotSupported`]), raised at
//!   instantiate time.
//! - **Parse** — ungrammatical textual dimension descriptions or malformed
//!   serialized documents ([`Error::Parse`]); a failing entry aborts the
//!   whole conversion.
//! - **Sampling** — rejection sampling against forbidden clauses ran out of
//!   retries ([`Error::SamplingExhausted`]).

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the lower bound is not strictly below the upper bound.
    #[error("invalid bounds: low ({low}) must be less than high ({high})")]
    InvalidBounds {
        /// The lower bound value.
        low: f64,
        /// The upper bound value.
        high: f64,
    },

    /// Returned when log scale is used with non-positive bounds.
    #[error("invalid log bounds: low must be positive for log scale")]
    InvalidLogBounds,

    /// Returned when a normal dimension is declared with a non-positive scale.
    #[error("invalid scale: {0} must be positive")]
    InvalidScale(f64),

    /// Returned when a quantization step is not positive.
    #[error("invalid quantization: {0} must be positive")]
    InvalidQuantization(f64),

    /// Returned when fidelity arguments are out of range.
    #[error(
        "invalid fidelity: low={low}, high={high}, base={base} (need 1 <= low <= high and base >= 1)"
    )]
    InvalidFidelity {
        /// The minimum budget.
        low: i64,
        /// The maximum budget.
        high: i64,
        /// The budget reduction base.
        base: i64,
    },

    /// Returned when categorical or ordinal choices are empty.
    #[error("choices cannot be empty")]
    EmptyChoices,

    /// Returned when a categorical choice carries a negative weight.
    #[error("negative weight {weight} for choice '{choice}'")]
    NegativeWeight {
        /// The offending choice label.
        choice: String,
        /// The negative weight.
        weight: f64,
    },

    /// Returned when a flag or clause does not apply to the dimension it was
    /// attached to (e.g. quantization on a categorical).
    #[error("invalid attribute on dimension '{name}': {reason}")]
    InvalidAttribute {
        /// The dimension the attribute was attached to.
        name: String,
        /// Why the attribute does not apply.
        reason: &'static str,
    },

    /// Returned when a dimension name collides with an existing dimension or
    /// subspace-qualified name.
    #[error("duplicate dimension name '{name}'")]
    DuplicateName {
        /// The colliding (dotted) name.
        name: String,
    },

    /// Returned when a condition references a dimension that does not belong
    /// to the space being instantiated.
    #[error("condition references unknown dimension '{name}'")]
    UnknownDimension {
        /// The referenced name.
        name: String,
    },

    /// Returned when no backend is registered under the requested identifier.
    #[error("unknown backend '{name}'")]
    UnknownBackend {
        /// The requested backend identifier.
        name: String,
    },

    /// Returned when the selected backend cannot express a requested kind,
    /// flag, condition, or forbidden-clause shape.
    #[error("backend '{backend}' does not support {feature}")]
    NotSupported {
        /// The backend that rejected the feature.
        backend: &'static str,
        /// Human-readable description of the unsupported feature.
        feature: String,
    },

    /// Returned when a textual dimension description or a serialized document
    /// entry cannot be parsed.
    #[error("cannot parse entry '{entry}': {reason}")]
    Parse {
        /// The name of the offending entry.
        entry: String,
        /// What went wrong.
        reason: String,
    },

    /// Returned when rejection sampling against forbidden clauses failed to
    /// find a satisfying value within the retry budget.
    #[error("sampling exhausted for dimension '{name}' after {retries} rejected draws")]
    SamplingExhausted {
        /// The dimension whose draws kept matching forbidden clauses.
        name: String,
        /// The retry budget that was spent.
        retries: u32,
    },

    /// Returned when an internal invariant is violated.
    #[error("internal error: {0}")]
    Internal(&'static str),
}

pub type Result<T> = core::result::Result<T, Error>;
