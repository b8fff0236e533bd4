//! [`MemoryRegistry`] – in-process parameter registry.
//!
//! Holds parameters as a flat map of absolute leaf names to values, behind an
//! [`RwLock`] so one registry can be shared (via `Arc`) between a store and
//! whatever updates it.  Structured values are stored as one leaf per member,
//! the way a parameter server stores them:
//!
//! | Operation | Stored leaves |
//! |---|---|
//! | `set("/pid", { kp = 1.0, ki = 0.1 })` | `/pid/ki`, `/pid/kp` |
//! | `set("/pid/kp", 2.0)` | `/pid/ki`, `/pid/kp` (overwritten) |
//! | `set("/pid", 5)` | `/pid` (subtree replaced) |
//!
//! Reading a name that has leaves beneath it returns them reassembled as a
//! [`ParamValue::Struct`].
//!
//! # Example
//!
//! ```rust
//! use rush_registry::{MemoryRegistry, ParamRegistry};
//!
//! let registry = MemoryRegistry::new();
//! registry
//!     .load_toml_str("[robot]\nspeed = 3.5\nname = \"bot1\"\n", "/")
//!     .unwrap();
//!
//! assert_eq!(registry.list_names().unwrap(), vec!["/robot/name", "/robot/speed"]);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rush_types::{ParamError, ParamValue};
use serde::Deserialize;
use tracing::{debug, info};

use crate::ParamRegistry;
use crate::names::{SEPARATOR, join_name, validate_name};

/// Thread-safe in-memory [`ParamRegistry`].
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    params: RwLock<BTreeMap<String, ParamValue>>,
}

impl MemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to `value`, replacing any parameter at or beneath `name`.
    ///
    /// Struct values are split into one leaf per member.
    ///
    /// # Errors
    ///
    /// [`ParamError::InvalidName`] when `name` (or a leaf derived from a
    /// struct member) is not a valid absolute name.  Nothing is written in
    /// that case.
    pub fn set(&self, name: &str, value: impl Into<ParamValue>) -> Result<(), ParamError> {
        validate_name(name)?;
        let leaves = flatten(name, value.into());
        for (leaf, _) in &leaves {
            validate_name(leaf)?;
        }

        let mut params = self.write();
        remove_subtree(&mut params, name);
        // A leaf sitting on an ancestor path would shadow the new subtree.
        let ancestors: Vec<String> = params
            .keys()
            .filter(|existing| is_strict_ancestor(existing, name))
            .cloned()
            .collect();
        for ancestor in ancestors {
            params.remove(&ancestor);
        }
        for (leaf, value) in leaves {
            debug!(name = %leaf, value = %value, "parameter set");
            params.insert(leaf, value);
        }
        Ok(())
    }

    /// Remove `name` and everything beneath it.
    ///
    /// Returns the number of leaves removed.
    pub fn remove(&self, name: &str) -> usize {
        let removed = remove_subtree(&mut self.write(), name);
        debug!(name, removed, "parameter removed");
        removed
    }

    /// Remove every parameter.
    pub fn clear(&self) {
        self.write().clear();
    }

    /// Number of leaf parameters currently held.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// `true` when the registry holds no parameters.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Parse a TOML document and set every top-level entry beneath
    /// `namespace` (an absolute namespace; `""` and `/` both mean the root).
    ///
    /// Tables become nested namespaces.  Returns the number of leaves
    /// written.
    ///
    /// # Errors
    ///
    /// [`ParamError::Parse`] when the document is not valid TOML, holds a
    /// value with no [`ParamValue`] equivalent (e.g. a datetime), or names
    /// the same leaf twice or a leaf beneath another leaf (`a = 1` next to
    /// `"a/b" = 2`).  Nothing is written in that case.
    pub fn load_toml_str(&self, raw: &str, namespace: &str) -> Result<usize, ParamError> {
        let document: BTreeMap<String, ParamValue> =
            toml::from_str(raw).map_err(|e| ParamError::Parse(e.to_string()))?;

        let mut leaves = Vec::new();
        for (key, value) in document {
            leaves.extend(flatten(&join_name(namespace, &key), value));
        }
        for (leaf, _) in &leaves {
            validate_name(leaf)?;
        }
        check_disjoint(&leaves)?;

        let count = leaves.len();
        for (leaf, value) in leaves {
            self.set(&leaf, value)?;
        }
        Ok(count)
    }

    /// Read `path` and load it with [`MemoryRegistry::load_toml_str`].
    pub fn load_toml_file(&self, path: &Path, namespace: &str) -> Result<usize, ParamError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            ParamError::Parse(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let count = self.load_toml_str(&raw, namespace)?;
        info!(path = %path.display(), namespace, count, "parameter file loaded");
        Ok(count)
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, ParamValue>> {
        self.params.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, ParamValue>> {
        self.params.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ParamRegistry for MemoryRegistry {
    fn list_names(&self) -> Result<Vec<String>, ParamError> {
        Ok(self.read().keys().cloned().collect())
    }

    fn get_value(&self, name: &str) -> Result<ParamValue, ParamError> {
        let params = self.read();
        if let Some(value) = params.get(name) {
            return Ok(value.clone());
        }

        let prefix = subtree_prefix(name);
        let mut members = BTreeMap::new();
        for (leaf, value) in params.range(prefix.clone()..) {
            let Some(relative) = leaf.strip_prefix(&prefix) else {
                break;
            };
            insert_path(&mut members, relative, value.clone());
        }
        if members.is_empty() {
            return Err(ParamError::Registry(format!("parameter {name} is not set")));
        }
        Ok(ParamValue::Struct(members))
    }
}

/// Parse a single value written in TOML literal syntax.
///
/// `3` is an integer, `3.5` a double, `true` a boolean, `"x"` a string,
/// `[1, 2]` an array and `{ a = 1 }` a struct.  Anything that does not parse
/// as a single TOML value is taken verbatim (trimmed) as a string.
///
/// ```
/// use rush_registry::parse_value;
/// use rush_types::ParamValue;
///
/// assert_eq!(parse_value("3.5"), ParamValue::Double(3.5));
/// assert_eq!(parse_value("bot1"), ParamValue::String("bot1".into()));
/// ```
pub fn parse_value(raw: &str) -> ParamValue {
    #[derive(Deserialize)]
    struct Literal {
        value: ParamValue,
    }

    let trimmed = raw.trim();
    if trimmed.contains('\n') {
        return ParamValue::String(trimmed.to_string());
    }
    match toml::from_str::<Literal>(&format!("value = {trimmed}")) {
        Ok(literal) => literal.value,
        Err(_) => ParamValue::String(trimmed.to_string()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ─────────────────────────────────────────────────────────────────────────────

/// `name` followed by exactly one separator.
fn subtree_prefix(name: &str) -> String {
    if name.ends_with(SEPARATOR) {
        name.to_string()
    } else {
        format!("{name}{SEPARATOR}")
    }
}

/// `true` when `candidate` names a strict ancestor path of `name`.
fn is_strict_ancestor(candidate: &str, name: &str) -> bool {
    name.len() > candidate.len()
        && name.starts_with(candidate)
        && name[candidate.len()..].starts_with(SEPARATOR)
}

/// Reject leaf sets where one name repeats or sits beneath another.
fn check_disjoint(leaves: &[(String, ParamValue)]) -> Result<(), ParamError> {
    let mut names = BTreeSet::new();
    for (leaf, _) in leaves {
        if !names.insert(leaf.as_str()) {
            return Err(ParamError::Parse(format!("parameter {leaf} is defined twice")));
        }
    }
    for leaf in &names {
        let ancestor = leaf
            .match_indices(SEPARATOR)
            .skip(1)
            .map(|(at, _)| &leaf[..at])
            .find(|ancestor| names.contains(ancestor));
        if let Some(ancestor) = ancestor {
            return Err(ParamError::Parse(format!(
                "parameter {leaf} lies beneath parameter {ancestor}"
            )));
        }
    }
    Ok(())
}

/// Remove `name` and every leaf beneath it; returns the number removed.
fn remove_subtree(params: &mut BTreeMap<String, ParamValue>, name: &str) -> usize {
    let prefix = subtree_prefix(name);
    let doomed: Vec<String> = params
        .keys()
        .filter(|leaf| leaf.as_str() == name || leaf.starts_with(&prefix))
        .cloned()
        .collect();
    for leaf in &doomed {
        params.remove(leaf);
    }
    doomed.len()
}

/// Split a value into `(leaf name, leaf value)` pairs.
fn flatten(name: &str, value: ParamValue) -> Vec<(String, ParamValue)> {
    let mut out = Vec::new();
    flatten_into(&mut out, name.to_string(), value);
    out
}

fn flatten_into(out: &mut Vec<(String, ParamValue)>, name: String, value: ParamValue) {
    match value {
        ParamValue::Struct(members) => {
            for (key, member) in members {
                flatten_into(out, join_name(&name, &key), member);
            }
        }
        leaf => out.push((name, leaf)),
    }
}

/// Insert `value` into a nested struct at the `/`-separated `path`.
fn insert_path(members: &mut BTreeMap<String, ParamValue>, path: &str, value: ParamValue) {
    match path.split_once(SEPARATOR) {
        None => {
            members.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = members
                .entry(head.to_string())
                .or_insert_with(|| ParamValue::Struct(BTreeMap::new()));
            if let ParamValue::Struct(inner) = child {
                insert_path(inner, rest, value);
            }
        }
    }
}
