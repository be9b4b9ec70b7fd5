//! Quasi-random backend on a scrambled Sobol sequence.

use std::collections::HashMap;

use indexmap::IndexMap;
use parking_lot::Mutex;
use sobol_burley::sample;

use crate::backend::{
    Adapter, MAX_REJECTION_RETRIES, NativeDist, map_unit, not_supported, translate_common,
};
use crate::dimension::{Dimension, Kind};
use crate::error::{Error, Result};
use crate::expr::{Expr, Forbidden};
use crate::value::Value;

/// One registered dimension with its lattice column assignment.
struct Registered {
    abstract_name: String,
    native_name: String,
    /// First Sobol dimension assigned to this axis; normals consume two
    /// (Box–Muller needs a pair of unit coordinates).
    column: u32,
    native: NativeDist,
    forbidden: Vec<Forbidden>,
    condition: Option<Expr>,
}

/// Quasi-random sampling backend, registered as `"sobol"`.
///
/// Generates draws from a scrambled Sobol sequence (Burley 2020), so
/// consecutive samples fill the space more evenly than pseudo-random draws.
/// Each dimension owns one lattice column (two for a normal), and each draw
/// consumes one sequence index.
///
/// # Capability gaps
///
/// - **Log-normal** dimensions are rejected with
///   [`Error::NotSupported`] at registration — they are never silently
///   sampled linearly.
/// - **Ordinal** dimensions are rejected: the lattice has no notion of the
///   declared ordering.
///
/// # Semantics that differ from `"random"`
///
/// - Native identifiers flatten dotted names (`optimizer.lr` becomes
///   `optimizer__lr`); [`Space::sample`](crate::Space::sample) maps them
///   back through the adapter's name table.
/// - Conditions are accepted and kept for introspection, but **inactive
///   dimensions remain present in the draw**: the lattice point is consumed
///   either way, and dropping coordinates would degrade the sequence's
///   uniformity guarantees.
///
/// Forbidden clauses are enforced by skipping lattice points: a draw whose
/// value matches a clause advances the sequence index and retries, up to
/// [`MAX_REJECTION_RETRIES`].
pub struct SobolBackend {
    next_index: Mutex<u32>,
    seed: u32,
    dims: Vec<Registered>,
    by_abstract: HashMap<String, usize>,
    by_native: HashMap<String, usize>,
    columns: u32,
}

impl SobolBackend {
    /// Creates an empty adapter starting at sequence index 0 with seed 0.
    #[must_use]
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Creates an empty adapter with the given scramble seed.
    ///
    /// Different seeds produce statistically independent sequences.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            next_index: Mutex::new(0),
            seed: seed as u32,
            dims: Vec::new(),
            by_abstract: HashMap::new(),
            by_native: HashMap::new(),
            columns: 0,
        }
    }

    fn lookup(&self, abstract_name: &str) -> Result<usize> {
        self.by_abstract
            .get(abstract_name)
            .copied()
            .ok_or(Error::Internal("constraint registered before its dimension"))
    }

    /// Produces the draw for one sequence index, or the name of the first
    /// dimension whose value hit a forbidden clause.
    fn draw_at(&self, index: u32) -> core::result::Result<IndexMap<String, Value>, String> {
        let mut draw = IndexMap::new();
        for reg in &self.dims {
            let u1 = f64::from(sample(index, reg.column, self.seed));
            let u2 = if reg.native.needs_pair() {
                f64::from(sample(index, reg.column + 1, self.seed))
            } else {
                0.0
            };
            let value = map_unit(&reg.native, u1, u2);
            if reg.forbidden.iter().any(|clause| clause.matches(&value)) {
                return Err(reg.abstract_name.clone());
            }
            draw.insert(reg.native_name.clone(), value);
        }
        Ok(draw)
    }
}

impl Default for SobolBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter for SobolBackend {
    fn backend_name(&self) -> &'static str {
        "sobol"
    }

    fn register_dimension(&mut self, name: &str, dim: &Dimension) -> Result<String> {
        match dim.kind() {
            Kind::Normal { .. } if dim.log() => {
                return Err(not_supported(
                    "sobol",
                    format!("log-normal sampling (dimension '{name}')"),
                ));
            }
            Kind::Ordinal { .. } => {
                return Err(not_supported(
                    "sobol",
                    format!("ordinal dimensions (dimension '{name}')"),
                ));
            }
            _ => {}
        }

        let native_name = name.replace('.', "__");
        if self.by_native.contains_key(&native_name) {
            return Err(not_supported(
                "sobol",
                format!("dimension names that flatten identically ('{native_name}')"),
            ));
        }

        let native = translate_common(dim);
        let column = self.columns;
        self.columns += if native.needs_pair() { 2 } else { 1 };

        self.by_abstract.insert(name.to_owned(), self.dims.len());
        self.by_native.insert(native_name.clone(), self.dims.len());
        self.dims.push(Registered {
            abstract_name: name.to_owned(),
            native_name: native_name.clone(),
            column,
            native,
            forbidden: Vec::new(),
            condition: None,
        });
        Ok(native_name)
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
        let mut next_index = self.next_index.lock();
        let mut draws = Vec::with_capacity(n);
        while draws.len() < n {
            let mut attempts: u32 = 0;
            loop {
                let index = *next_index;
                *next_index = next_index.wrapping_add(1);
                match self.draw_at(index) {
                    Ok(draw) => {
                        draws.push(draw);
                        break;
                    }
                    Err(name) => {
                        attempts += 1;
                        if attempts >= MAX_REJECTION_RETRIES {
                            return Err(Error::SamplingExhausted {
                                name,
                                retries: MAX_REJECTION_RETRIES,
                            });
                        }
                    }
                }
            }
        }
        Ok(draws)
    }

    fn native_name(&self, abstract_name: &str) -> Option<&str> {
        self.by_abstract
            .get(abstract_name)
            .map(|&idx| self.dims[idx].native_name.as_str())
    }

    fn abstract_name(&self, native_name: &str) -> Option<&str> {
        self.by_native
            .get(native_name)
            .map(|&idx| self.dims[idx].abstract_name.as_str())
    }
}
