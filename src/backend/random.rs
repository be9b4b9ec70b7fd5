//! Pseudo-random backend with full capability coverage.

use std::collections::HashMap;

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::backend::{
    Adapter, MAX_REJECTION_RETRIES, NativeDist, map_unit, translate_common,
};
use crate::dimension::Dimension;
use crate::error::{Error, Result};
use crate::expr::{Expr, Forbidden};
use crate::value::Value;

/// One registered dimension with its native translation and constraints.
struct Registered {
    name: String,
    native: NativeDist,
    condition: Option<Expr>,
    forbidden: Vec<Forbidden>,
}

/// Pseudo-random sampling backend, registered as `"random"`.
///
/// The reference backend: it supports every dimension kind and flag —
/// uniform (linear, log, discrete, quantized), normal including log-normal,
/// weighted categoricals, ordinals, and fidelity axes (drawn as the full
/// budget `high`).
///
/// Conditions are evaluated to a fixed point against each draw, so a
/// dimension whose condition references another deactivated dimension is
/// deactivated too. **Inactive dimensions are omitted from the draw** —
/// this differs from the `"sobol"` backend, which keeps them.
///
/// Forbidden clauses are enforced by a bounded per-dimension rejection loop
/// ([`MAX_REJECTION_RETRIES`]).
pub struct RandomBackend {
    rng: Mutex<fastrand::Rng>,
    dims: Vec<Registered>,
    index: HashMap<String, usize>,
}

impl RandomBackend {
    /// Creates an empty adapter with a randomly seeded RNG.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::new()),
            dims: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Creates an empty adapter with a fixed seed for reproducible draws.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
            dims: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn lookup(&self, name: &str) -> Result<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or(Error::Internal("constraint registered before its dimension"))
    }

    /// Draws one value for a dimension, rejecting forbidden matches.
    fn draw_dimension(&self, rng: &mut fastrand::Rng, reg: &Registered) -> Result<Value> {
        for _ in 0..MAX_REJECTION_RETRIES {
            let value = map_unit(&reg.native, rng.f64(), rng.f64());
            if !reg.forbidden.iter().any(|clause| clause.matches(&value)) {
                return Ok(value);
            }
        }
        Err(Error::SamplingExhausted {
            name: reg.name.clone(),
            retries: MAX_REJECTION_RETRIES,
        })
    }

    /// Deactivates conditioned dimensions to a fixed point.
    ///
    /// A condition is evaluated against the sample restricted to currently
    /// active dimensions, so deactivation cascades through references.
    fn resolve_active(&self, full: &IndexMap<String, Value>) -> Vec<bool> {
        let mut active = vec![true; self.dims.len()];
        loop {
            let visible: IndexMap<String, Value> = self
                .dims
                .iter()
                .zip(&active)
                .filter(|(_, keep)| **keep)
                .map(|(reg, _)| (reg.name.clone(), full[reg.name.as_str()].clone()))
                .collect();
            let mut changed = false;
            for (i, reg) in self.dims.iter().enumerate() {
                if active[i]
                    && let Some(condition) = &reg.condition
                    && !condition.evaluate(&visible)
                {
                    active[i] = false;
                    changed = true;
                }
            }
            if !changed {
                return active;
            }
        }
    }
}

impl Default for RandomBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter for RandomBackend {
    fn backend_name(&self) -> &'static str {
        "random"
    }

    fn register_dimension(&mut self, name: &str, dim: &Dimension) -> Result<String> {
        self.index.insert(name.to_owned(), self.dims.len());
        self.dims.push(Registered {
            name: name.to_owned(),
            native: translate_common(dim),
            condition: None,
            forbidden: Vec::new(),
        });
        Ok(name.to_owned())
    }

    fn register_condition(&mut self, name: &str, condition: &Expr) -> Result<()> {
        let idx = self.lookup(name)?;
        self.dims[idx].condition = Some(condition.clone());
        Ok(())
    }

    fn register_forbidden(&mut self, name: &str, clause: &Forbidden) -> Result<()> {
        let idx = self.lookup(name)?;
        self.dims[idx].forbidden.push(clause.clone());
        Ok(())
    }

    fn draw(&self, n: usize) -> Result<Vec<IndexMap<String, Value>>> {
        let mut rng = self.rng.lock();
        let mut draws = Vec::with_capacity(n);
        for _ in 0..n {
            let mut full = IndexMap::new();
            for reg in &self.dims {
                let value = self.draw_dimension(&mut rng, reg)?;
                full.insert(reg.name.clone(), value);
            }
            let active = self.resolve_active(&full);
            let draw: IndexMap<String, Value> = full
                .into_iter()
                .zip(&active)
                .filter(|(_, keep)| **keep)
                .map(|(pair, _)| pair)
                .collect();
            draws.push(draw);
        }
        Ok(draws)
    }

    fn native_name(&self, abstract_name: &str) -> Option<&str> {
        // Native identifiers are the abstract names themselves.
        self.index
            .get_key_value(abstract_name)
            .map(|(key, _)| key.as_str())
    }

    fn abstract_name(&self, native_name: &str) -> Option<&str> {
        self.native_name(native_name)
    }
}
