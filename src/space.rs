//! Search space container, dimension handles, and backend binding.
//!
//! A [`Space`] is an ordered mapping from name to dimension, possibly nested
//! into named subspaces. It owns serialization and sampling dispatch; the
//! actual drawing of values is delegated to a [`backend::Adapter`] resolved
//! from the backend registry at instantiate time.
//!
//! # Example
//!
//! ```
//! use searchspace::{Space, eq, either};
//!
//! let space = Space::new();
//! let optim = space.categorical("optimizer", ["sgd", "adam"]).unwrap();
//! let lr = space
//!     .loguniform("optimizer.lr", 1.0, 2.0)
//!     .unwrap()
//!     .quantization(0.01)
//!     .unwrap();
//! lr.enable_if(either([eq(&optim, "sgd"), eq(&optim, "adam")])).unwrap();
//! lr.forbid_equal(1).unwrap();
//!
//! let samples = space.sample(2).unwrap();
//! assert_eq!(samples.len(), 2);
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::backend::{self, Adapter};
use crate::dimension::Dimension;
use crate::error::{Error, Result};
use crate::expr::{Expr, Forbidden};
use crate::value::Value;

/// One draw from a space: dotted dimension name to drawn value.
///
/// Iteration order follows the declaration order of the dimensions that are
/// present in the draw.
pub type Sample = IndexMap<String, Value>;

/// An entry of a space: a leaf dimension or a nested subspace.
#[derive(Clone)]
pub(crate) enum Entry {
    Dimension(Dimension),
    Subspace(Space),
}

/// A cached backend materialization of a space.
///
/// Owned exclusively by the space that created it. The stored subtree
/// revision detects structural mutation since binding time; a stale binding
/// is rebuilt on the next [`Space::sample`] call.
struct Binding {
    backend: String,
    adapter: Box<dyn Adapter>,
    revision: u64,
}

struct Inner {
    declared_backend: Option<String>,
    entries: IndexMap<String, Entry>,
    revision: u64,
    binding: Option<Binding>,
}

/// An ordered collection of dimensions forming one hyperparameter domain.
///
/// `Space` is a cheap-to-clone handle; clones share the same underlying
/// space. Dimensions are added through the constructor methods
/// ([`uniform`](Space::uniform), [`categorical`](Space::categorical), ...),
/// each returning a live [`Dim`] handle for attaching conditions and
/// forbidden clauses.
///
/// # Lifecycle
///
/// A space starts empty and is mutated only by dimension-adding operations.
/// Once [`instantiate`](Space::instantiate) has produced a backend binding,
/// the declared structure is treated as frozen for that binding: any further
/// mutation bumps an internal revision counter, invalidating the cached
/// binding and forcing re-instantiation on the next
/// [`sample`](Space::sample).
#[derive(Clone)]
pub struct Space {
    inner: Arc<RwLock<Inner>>,
    prefix: String,
}

impl Default for Space {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for Space {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Space")
            .field("prefix", &self.prefix)
            .field("dimensions", &self.names())
            .finish()
    }
}

impl Space {
    /// Creates an empty space with no backend selected.
    ///
    /// The backend is resolved at [`instantiate`](Space::instantiate) time,
    /// or defaults to [`backend::DEFAULT_BACKEND`] on the first
    /// [`sample`](Space::sample).
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                declared_backend: None,
                entries: IndexMap::new(),
                revision: 0,
                binding: None,
            })),
            prefix: String::new(),
        }
    }

    /// Creates an empty space with an explicit backend selector.
    ///
    /// The backend is not resolved yet; an unknown identifier surfaces as
    /// [`Error::UnknownBackend`] at instantiate or first sample time.
    ///
    /// ```
    /// use searchspace::Space;
    ///
    /// let space = Space::with_backend("sobol");
    /// space.uniform("x", 0.0, 1.0).unwrap();
    /// let draws = space.sample(3).unwrap();
    /// assert_eq!(draws.len(), 3);
    /// ```
    #[must_use]
    pub fn with_backend(backend: impl Into<String>) -> Self {
        let space = Self::new();
        space.inner.write().declared_backend = Some(backend.into());
        space
    }

    /// The backend selected at construction, if any.
    #[must_use]
    pub fn backend(&self) -> Option<String> {
        self.inner.read().declared_backend.clone()
    }

    fn qualify(&self, local: &str) -> String {
        if self.prefix.is_empty() {
            local.to_owned()
        } else {
            format!("{}.{local}", self.prefix)
        }
    }

    /// Walks a dotted path down through nested subspaces.
    fn path_taken(entries: &IndexMap<String, Entry>, path: &str) -> bool {
        match path.split_once('.') {
            None => entries.contains_key(path),
            Some((head, rest)) => match entries.get(head) {
                Some(Entry::Subspace(sub)) => Self::path_taken(&sub.inner.read().entries, rest),
                // A plain dimension named `head` does not occupy `head.rest`;
                // dotted direct names may coexist with it.
                Some(Entry::Dimension(_)) | None => false,
            },
        }
    }

    pub(crate) fn insert_dimension(&self, dim: Dimension) -> Result<Dim> {
        let local = dim.name().to_owned();
        if local.is_empty() {
            return Err(Error::InvalidAttribute {
                name: local,
                reason: "dimension name must not be empty",
            });
        }
        let mut inner = self.inner.write();
        if inner.entries.contains_key(&local)
            || (local.contains('.') && Self::path_taken(&inner.entries, &local))
        {
            return Err(Error::DuplicateName {
                name: self.qualify(&local),
            });
        }
        inner.entries.insert(local.clone(), Entry::Dimension(dim));
        inner.revision += 1;
        Ok(Dim {
            owner: Arc::clone(&self.inner),
            qualified: self.qualify(&local),
            local,
        })
    }

    /// Adds a continuous uniform dimension over `[low, high]`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidBounds`] unless `low < high`;
    /// [`Error::DuplicateName`] on a name collision.
    pub fn uniform(&self, name: &str, low: f64, high: f64) -> Result<Dim> {
        self.insert_dimension(Dimension::uniform(name, low, high)?)
    }

    /// Adds a log-uniform dimension over `[low, high]`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidBounds`] unless `low < high`;
    /// [`Error::InvalidLogBounds`] unless `low > 0`;
    /// [`Error::DuplicateName`] on a name collision.
    pub fn loguniform(&self, name: &str, low: f64, high: f64) -> Result<Dim> {
        self.insert_dimension(Dimension::loguniform(name, low, high)?)
    }

    /// Adds a normal (Gaussian) dimension with the given location and scale.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidScale`] unless `scale > 0`;
    /// [`Error::DuplicateName`] on a name collision.
    pub fn normal(&self, name: &str, loc: f64, scale: f64) -> Result<Dim> {
        self.insert_dimension(Dimension::normal(name, loc, scale)?)
    }

    /// Alias for [`normal`](Space::normal).
    ///
    /// # Errors
    ///
    /// Same as [`normal`](Space::normal).
    pub fn gaussian(&self, name: &str, loc: f64, scale: f64) -> Result<Dim> {
        self.normal(name, loc, scale)
    }

    /// Adds a categorical dimension with uniform choice weights.
    ///
    /// For explicit weights use
    /// [`categorical_weighted`](Space::categorical_weighted).
    ///
    /// ```
    /// use searchspace::Space;
    ///
    /// let space = Space::new();
    /// space.categorical("activation", ["relu", "tanh", "gelu"]).unwrap();
    /// ```
    ///
    /// # Errors
    ///
    /// [`Error::EmptyChoices`] when no label is given;
    /// [`Error::DuplicateName`] on a name collision.
    pub fn categorical<I, T>(&self, name: &str, labels: I) -> Result<Dim>
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        let choices = labels.into_iter().map(|l| (l.into(), 1.0)).collect();
        self.insert_dimension(Dimension::categorical(name, choices)?)
    }

    /// Adds a categorical dimension with per-choice weights.
    ///
    /// Weights need not sum to one; they are normalized at sample time.
    ///
    /// ```
    /// use searchspace::Space;
    ///
    /// let space = Space::new();
    /// space
    ///     .categorical_weighted("optimizer", [("sgd", 0.2), ("adam", 0.8)])
    ///     .unwrap();
    /// ```
    ///
    /// # Errors
    ///
    /// [`Error::EmptyChoices`] when no choice is given;
    /// [`Error::NegativeWeight`] for a negative weight;
    /// [`Error::DuplicateName`] on a name collision.
    pub fn categorical_weighted<I, T>(&self, name: &str, choices: I) -> Result<Dim>
    where
        I: IntoIterator<Item = (T, f64)>,
        T: Into<Value>,
    {
        let choices = choices.into_iter().map(|(l, w)| (l.into(), w)).collect();
        self.insert_dimension(Dimension::categorical(name, choices)?)
    }

    /// Adds a totally-ordered categorical dimension.
    ///
    /// Backends that cannot express the ordering fail with
    /// [`Error::NotSupported`] at instantiate time rather than silently
    /// treating the values as unordered.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyChoices`] when no value is given;
    /// [`Error::DuplicateName`] on a name collision.
    pub fn ordinal<I, T>(&self, name: &str, values: I) -> Result<Dim>
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.insert_dimension(Dimension::ordinal(name, values)?)
    }

    /// Adds a multi-fidelity budget axis over `[low, high]` with reduction
    /// base `base`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidFidelity`] unless `1 <= low <= high` and `base >= 1`;
    /// [`Error::DuplicateName`] on a name collision.
    pub fn fidelity(&self, name: &str, low: i64, high: i64, base: i64) -> Result<Dim> {
        self.insert_dimension(Dimension::fidelity(name, low, high, base)?)
    }

    /// Adds a nested subspace and returns a handle to it.
    ///
    /// Dimensions added to the returned space appear in this space's view
    /// under `name.<dimension>`.
    ///
    /// ```
    /// use searchspace::Space;
    ///
    /// let space = Space::new();
    /// space.normal("a", 1.0, 2.0).unwrap();
    /// let sub = space.subspace("b").unwrap();
    /// sub.normal("a", 1.0, 2.0).unwrap();
    ///
    /// assert_eq!(space.names(), vec!["a", "b.a"]);
    /// ```
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateName`] when `name` collides with an existing
    /// dimension or subspace.
    pub fn subspace(&self, name: &str) -> Result<Space> {
        if name.is_empty() || name.contains('.') {
            return Err(Error::InvalidAttribute {
                name: name.to_owned(),
                reason: "subspace names must be non-empty and must not contain '.'",
            });
        }
        let mut inner = self.inner.write();
        if inner.entries.contains_key(name) {
            return Err(Error::DuplicateName {
                name: self.qualify(name),
            });
        }
        let child = Space {
            inner: Arc::new(RwLock::new(Inner {
                declared_backend: None,
                entries: IndexMap::new(),
                revision: 0,
                binding: None,
            })),
            prefix: self.qualify(name),
        };
        inner
            .entries
            .insert(name.to_owned(), Entry::Subspace(child.clone()));
        inner.revision += 1;
        Ok(child)
    }

    /// Structural revision of this space and every nested subspace.
    ///
    /// Bumps on any mutation, which is what invalidates cached bindings.
    fn subtree_revision(&self) -> u64 {
        let inner = self.inner.read();
        let mut rev = inner.revision;
        for entry in inner.entries.values() {
            if let Entry::Subspace(sub) = entry {
                rev = rev.wrapping_add(sub.subtree_revision());
            }
        }
        rev
    }

    fn flatten_into(&self, prefix: &str, out: &mut Vec<(String, Dimension)>) {
        let inner = self.inner.read();
        for (name, entry) in &inner.entries {
            let qualified = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}.{name}")
            };
            match entry {
                Entry::Dimension(dim) => out.push((qualified, dim.clone())),
                Entry::Subspace(sub) => sub.flatten_into(&qualified, out),
            }
        }
    }

    /// All dimensions of the subtree, prefix-qualified, in declaration order.
    ///
    /// This is also where qualified-name uniqueness is enforced
    /// authoritatively: a dotted direct name that collides with a
    /// subspace-qualified name surfaces here.
    pub(crate) fn flatten(&self) -> Result<Vec<(String, Dimension)>> {
        let mut out = Vec::new();
        self.flatten_into("", &mut out);
        let mut seen = HashSet::new();
        for (name, _) in &out {
            if !seen.insert(name.as_str()) {
                return Err(Error::DuplicateName { name: name.clone() });
            }
        }
        Ok(out)
    }

    /// Snapshot of the direct entries, for serialization.
    pub(crate) fn entries(&self) -> IndexMap<String, Entry> {
        self.inner.read().entries.clone()
    }

    /// The qualified names of every dimension in the subtree, in order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.flatten_into("", &mut out);
        out.into_iter().map(|(name, _)| name).collect()
    }

    /// The number of dimensions in the subtree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names().len()
    }

    /// Whether the subtree holds no dimension.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Materializes this space with the named backend.
    ///
    /// Registration is two-phase: every dimension first, then every
    /// condition and forbidden clause, because conditions may reference
    /// dimensions declared later. Idempotent: a second call with the same
    /// backend and unchanged structure returns the cached binding without
    /// re-registering.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownBackend`] for an unregistered identifier;
    /// [`Error::DuplicateName`] when flattening reveals a qualified-name
    /// collision; [`Error::UnknownDimension`] when a condition references a
    /// name outside this space; [`Error::NotSupported`] when the backend
    /// cannot express a requested kind, flag, or constraint shape.
    pub fn instantiate(&self, backend: &str) -> Result<()> {
        let revision = self.subtree_revision();
        {
            let inner = self.inner.read();
            if let Some(binding) = &inner.binding
                && binding.backend == backend
                && binding.revision == revision
            {
                return Ok(());
            }
        }

        let dims = self.flatten()?;
        let known: HashSet<&str> = dims.iter().map(|(name, _)| name.as_str()).collect();

        let mut adapter = backend::create(backend)?;
        for (name, dim) in &dims {
            adapter.register_dimension(name, dim)?;
        }
        for (name, dim) in &dims {
            if let Some(condition) = dim.condition() {
                let mut refs = Vec::new();
                condition.collect_referenced(&mut refs);
                for referenced in refs {
                    if !known.contains(referenced) {
                        return Err(Error::UnknownDimension {
                            name: referenced.to_owned(),
                        });
                    }
                }
                adapter.register_condition(name, condition)?;
            }
            for clause in dim.forbidden() {
                adapter.register_forbidden(name, clause)?;
            }
        }

        trace_info!(backend, dimensions = dims.len(), "space bound to backend");

        self.inner.write().binding = Some(Binding {
            backend: backend.to_owned(),
            adapter,
            revision,
        });
        Ok(())
    }

    /// Draws `n` samples from this space.
    ///
    /// Ensures a binding exists first: an existing binding's backend wins,
    /// then the backend declared at construction, then
    /// [`backend::DEFAULT_BACKEND`]. Structure mutated since the last
    /// binding forces re-instantiation. Each draw maps backend-native
    /// identifiers back to the abstract dotted names.
    ///
    /// Whether a dimension deactivated by its condition appears in a draw is
    /// backend-dependent and documented per backend; see the
    /// [`backend`] module.
    ///
    /// # Errors
    ///
    /// Everything [`instantiate`](Space::instantiate) can return, plus
    /// [`Error::SamplingExhausted`] when rejection sampling against
    /// forbidden clauses runs out of retries.
    pub fn sample(&self, n: usize) -> Result<Vec<Sample>> {
        let backend = {
            let inner = self.inner.read();
            inner
                .binding
                .as_ref()
                .map(|b| b.backend.clone())
                .or_else(|| inner.declared_backend.clone())
                .unwrap_or_else(|| backend::DEFAULT_BACKEND.to_owned())
        };
        self.instantiate(&backend)?;

        let inner = self.inner.read();
        let binding = inner
            .binding
            .as_ref()
            .ok_or(Error::Internal("sample ran without a binding"))?;
        trace_debug!(backend = binding.backend.as_str(), n, "drawing samples");

        let draws = binding.adapter.draw(n)?;
        let mut samples = Vec::with_capacity(draws.len());
        for draw in draws {
            let mut sample = Sample::new();
            for (native, value) in draw {
                let name = binding
                    .adapter
                    .abstract_name(&native)
                    .ok_or(Error::Internal("backend draw used an unknown native name"))?;
                sample.insert(name.to_owned(), value);
            }
            samples.push(sample);
        }
        Ok(samples)
    }

    /// Serializes the abstract model to a JSON-compatible document.
    ///
    /// A pure function of the declared structure: the result does not depend
    /// on whether a backend binding currently exists. See
    /// [`from_dict`](Space::from_dict) for the inverse.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateName`] when flattening reveals a qualified-name
    /// collision.
    pub fn serialize(&self) -> Result<serde_json::Value> {
        // Runs the same collision check instantiate would, so a serialized
        // document never encodes an ambiguous space.
        self.flatten()?;
        crate::serial::space_doc(self)
    }

    /// Reconstructs a space from a serialized document.
    ///
    /// The returned space has no backend bound. Entries whose value is a
    /// plain string are parsed with the textual grammar of
    /// [`convert_space`](crate::convert::convert_space), so an Orion-style
    /// text mapping deserializes directly.
    ///
    /// # Errors
    ///
    /// [`Error::Parse`] naming the offending entry; nothing is committed on
    /// failure.
    pub fn from_dict(doc: &serde_json::Value) -> Result<Space> {
        crate::serial::space_from_doc(doc)
    }
}

/// A live handle to a dimension inside a [`Space`].
///
/// Returned by the space constructor methods. The handle stays attached to
/// its owning space: flag setters and constraint attachments mutate the
/// dimension in place (invalidating any cached backend binding), and the
/// handle lends its qualified name to the expression constructors via
/// `AsRef<str>`.
#[derive(Clone)]
pub struct Dim {
    owner: Arc<RwLock<Inner>>,
    local: String,
    qualified: String,
}

impl core::fmt::Debug for Dim {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Dim").field("name", &self.qualified).finish()
    }
}

impl AsRef<str> for Dim {
    fn as_ref(&self) -> &str {
        &self.qualified
    }
}

impl Dim {
    /// The dimension's dotted name, qualified from the space it was created
    /// through.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.qualified
    }

    fn with_dimension<T>(&self, f: impl FnOnce(&mut Dimension) -> Result<T>) -> Result<T> {
        let mut inner = self.owner.write();
        let result = match inner.entries.get_mut(&self.local) {
            Some(Entry::Dimension(dim)) => f(dim),
            _ => Err(Error::Internal("dimension handle lost its entry")),
        };
        if result.is_ok() {
            inner.revision += 1;
        }
        result
    }

    /// Rounds sampled values to integers.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidAttribute`] for kinds without the discrete flag.
    pub fn discrete(self) -> Result<Self> {
        self.with_dimension(Dimension::set_discrete)?;
        Ok(self)
    }

    /// Samples in log space.
    ///
    /// Whether a backend can honor this for a given kind is checked at
    /// instantiate time; a backend without log-normal support fails with
    /// [`Error::NotSupported`] instead of silently sampling linearly.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidAttribute`] for kinds without the log flag;
    /// [`Error::InvalidLogBounds`] for non-positive uniform bounds.
    pub fn log_scale(self) -> Result<Self> {
        self.with_dimension(Dimension::set_log)?;
        Ok(self)
    }

    /// Snaps sampled values to the nearest multiple of `q` within bounds.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidQuantization`] unless `q > 0`;
    /// [`Error::InvalidAttribute`] for kinds without the quantization flag.
    pub fn quantization(self, q: f64) -> Result<Self> {
        self.with_dimension(|d| d.set_quantization(q))?;
        Ok(self)
    }

    /// Attaches (or replaces) the enable condition of this dimension.
    ///
    /// The dimension is considered active in a draw only when the expression
    /// evaluates true against that draw. Names referenced by the expression
    /// are resolved at instantiate time; unknown names fail there with
    /// [`Error::UnknownDimension`].
    ///
    /// # Errors
    ///
    /// [`Error::Internal`] only if the handle outlived its entry.
    pub fn enable_if(&self, expr: Expr) -> Result<()> {
        self.with_dimension(|d| {
            d.set_condition(expr);
            Ok(())
        })
    }

    /// Appends a forbidden clause rejecting draws equal to `value`.
    ///
    /// Clauses are disjunctive: a draw is rejected if any attached clause
    /// matches.
    ///
    /// # Errors
    ///
    /// [`Error::Internal`] only if the handle outlived its entry.
    pub fn forbid_equal(&self, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.with_dimension(|d| {
            d.push_forbidden(Forbidden::Equal { value });
            Ok(())
        })
    }

    /// Appends a forbidden clause rejecting draws equal to any of `values`.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyChoices`] when `values` is empty.
    pub fn forbid_in(&self, values: impl IntoIterator<Item = impl Into<Value>>) -> Result<()> {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Err(Error::EmptyChoices);
        }
        self.with_dimension(|d| {
            d.push_forbidden(Forbidden::In { values });
            Ok(())
        })
    }
}
