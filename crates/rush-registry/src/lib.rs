//! `rush-registry` – the parameter registry boundary.
//!
//! A parameter store never talks to a concrete parameter server.  It goes
//! through the two traits defined here:
//!
//! - [`ParamRegistry`] – lists every known absolute parameter name and
//!   returns the current value for a name.
//! - [`NamespaceContext`] – reports the caller's absolute namespace, used to
//!   resolve relative namespaces (the parameter-space analogue of a current
//!   working directory).
//!
//! # Modules
//!
//! - [`names`] – namespace normalisation, resolution and name validation.
//! - [`memory`] – [`MemoryRegistry`], an in-process registry that can be
//!   populated from TOML documents.  Used by the `rush` shell and in tests.

pub mod memory;
pub mod names;

pub use memory::{MemoryRegistry, parse_value};

use rush_types::{ParamError, ParamValue};

/// A source of externally registered parameters.
///
/// # Contract
///
/// * `list_names` – every absolute parameter name currently known to the
///   registry (leaf names, e.g. `/robot/speed`).
/// * `get_value` – the current value for `name`.
///
/// Failures are reported as [`ParamError::Registry`] and are propagated
/// unchanged by the store.
pub trait ParamRegistry: Send + Sync {
    /// Return every parameter name currently known to the registry.
    fn list_names(&self) -> Result<Vec<String>, ParamError>;

    /// Return the current value for `name`.
    fn get_value(&self, name: &str) -> Result<ParamValue, ParamError>;
}

/// The caller's position in the parameter namespace tree.
pub trait NamespaceContext: Send + Sync {
    /// The absolute namespace relative names are resolved against
    /// (e.g. `/` or `/robot1`).
    fn current_namespace(&self) -> String;
}

/// A [`NamespaceContext`] that always reports the same namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedContext {
    namespace: String,
}

impl FixedContext {
    /// Create a context rooted at `namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::InvalidName`] when `namespace` is not absolute.
    pub fn new(namespace: impl Into<String>) -> Result<Self, ParamError> {
        let namespace = namespace.into();
        if !names::is_absolute(&namespace) {
            return Err(ParamError::InvalidName(format!(
                "context namespace '{namespace}' must start with '{}'",
                names::SEPARATOR
            )));
        }
        Ok(Self { namespace })
    }

    /// The global root context, `/`.
    pub fn root() -> Self {
        Self {
            namespace: names::SEPARATOR.to_string(),
        }
    }
}

impl Default for FixedContext {
    fn default() -> Self {
        Self::root()
    }
}

impl NamespaceContext for FixedContext {
    fn current_namespace(&self) -> String {
        self.namespace.clone()
    }
}
