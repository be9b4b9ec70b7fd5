#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]

//! Backend-independent hyperparameter search space descriptions.
//!
//! Describe a search space once — named dimensions with distributions,
//! categorical choices, conditional activation, forbidden values — then
//! materialize it into a concrete sampler from a pluggable backend and draw
//! from it. The abstract description serializes losslessly to JSON and can
//! also be built from Orion-style textual dimension grammars.
//!
//! # Getting Started
//!
//! ```
//! use searchspace::{Space, eq, either};
//!
//! let space = Space::new();
//! let optim = space.categorical("optimizer", ["sgd", "adam"])?;
//! let lr = space
//!     .loguniform("optimizer.lr", 1.0, 2.0)?
//!     .quantization(0.01)?;
//! lr.enable_if(either([eq(&optim, "sgd"), eq(&optim, "adam")]))?;
//! lr.forbid_equal(1)?;
//!
//! for sample in space.sample(2)? {
//!     let lr = sample["optimizer.lr"].as_f64().unwrap();
//!     assert!((1.0..=2.0).contains(&lr));
//!     assert_ne!(lr, 1.0);
//! }
//! # Ok::<(), searchspace::Error>(())
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`Space`] | Ordered collection of dimensions (and nested subspaces); owns serialization and sampling dispatch. |
//! | [`Dim`] | Live handle to one dimension — attach conditions, forbidden clauses, and flags. |
//! | [`Expr`] | Condition algebra built with [`eq`], [`ne`], [`lt`], [`gt`], [`contains`], [`both`], [`either`]. |
//! | [`backend::Adapter`] | Per-backend contract that materializes a space into a concrete sampler. |
//! | [`convert_space`] | Textual dimension grammar (`"uniform(0, 1, discrete=True)"`) to abstract model. |
//!
//! # Backends
//!
//! Sampling itself is delegated to a registered backend; the crate bundles
//! `"random"` (full capability) and `"sobol"` (quasi-random, with documented
//! capability gaps). Unsupported kind/flag combinations fail with
//! [`Error::NotSupported`] at instantiate time — never with a silent
//! fallback. See the [`backend`] module for the capability table and for
//! registering adapters of your own.
//!
//! # Serialization
//!
//! [`Space::serialize`] is a pure function of the abstract model and
//! [`Space::from_dict`] reconstructs an equivalent unbound space, so
//! `from_dict(serialize(s))` re-serializes to the same document on every
//! backend.
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) at instantiate and sample time | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

pub mod backend;
pub mod convert;
mod dimension;
mod error;
mod expr;
mod serial;
mod space;
mod value;

pub use convert::convert_space;
pub use dimension::{Dimension, Kind};
pub use error::{Error, Result};
pub use expr::{Expr, Forbidden, both, contains, either, eq, gt, lt, ne};
pub use space::{Dim, Sample, Space};
pub use value::Value;

/// Convenient wildcard import for the most common types.
///
/// ```
/// use searchspace::prelude::*;
/// ```
pub mod prelude {
    pub use crate::backend::{self, Adapter};
    pub use crate::convert::convert_space;
    pub use crate::dimension::{Dimension, Kind};
    pub use crate::error::{Error, Result};
    pub use crate::expr::{Expr, Forbidden, both, contains, either, eq, gt, lt, ne};
    pub use crate::space::{Dim, Sample, Space};
    pub use crate::value::Value;
}
