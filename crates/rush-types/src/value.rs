//! [`ParamValue`] – dynamically typed parameter value.
//!
//! A parameter registry stores values of a handful of shapes: scalars,
//! ordered arrays and nested string-keyed structs.  [`ParamValue`] models
//! that closed set of shapes as an enum, and [`FromParamValue`] describes how
//! each Rust type is extracted from it.
//!
//! # Conversion rules
//!
//! | Target | Accepted variants |
//! |---|---|
//! | `bool` | [`ParamValue::Bool`] |
//! | `i8` … `i64`, `u8` … `u64`, `isize`, `usize` | [`ParamValue::Int`], range-checked |
//! | `f32`, `f64` | [`ParamValue::Double`], [`ParamValue::Int`] (widened) |
//! | `String` | [`ParamValue::String`] |
//! | `Vec<T>` | [`ParamValue::Array`], element-wise |
//! | `BTreeMap<String, T>`, `HashMap<String, T>` | [`ParamValue::Struct`], member-wise |
//! | `ParamValue` | anything |
//!
//! Every other combination fails with [`ParamError::TypeMismatch`].  Strings
//! are never parsed into numbers.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ParamError;

/// A single parameter value as held by a parameter registry.
///
/// Serialises untagged, so `3`, `3.5`, `"bot1"`, `[1, 2]` and `{ a = 1 }`
/// map directly onto the matching variant in both TOML and JSON.
///
/// # Example
///
/// ```
/// use rush_types::ParamValue;
///
/// let v = ParamValue::from(vec![1, 2, 3]);
/// assert_eq!(v.convert_vec::<u8>().unwrap(), vec![1, 2, 3]);
/// assert_eq!(v.to_string(), "{1,2,3}");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Array(Vec<ParamValue>),
    Struct(BTreeMap<String, ParamValue>),
}

impl ParamValue {
    /// Human-readable name of the stored variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "boolean",
            ParamValue::Int(_) => "integer",
            ParamValue::Double(_) => "double",
            ParamValue::String(_) => "string",
            ParamValue::Array(_) => "array",
            ParamValue::Struct(_) => "struct",
        }
    }

    /// Borrow the elements when this is an [`ParamValue::Array`].
    pub fn as_array(&self) -> Option<&[ParamValue]> {
        match self {
            ParamValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow the members when this is a [`ParamValue::Struct`].
    pub fn as_struct(&self) -> Option<&BTreeMap<String, ParamValue>> {
        match self {
            ParamValue::Struct(members) => Some(members),
            _ => None,
        }
    }

    /// Convert the stored value to `T`.
    ///
    /// # Errors
    ///
    /// [`ParamError::TypeMismatch`] when the stored variant cannot become a `T`.
    pub fn convert<T: FromParamValue>(&self) -> Result<T, ParamError> {
        T::from_param(self)
    }

    /// Convert the stored value to `T` and write it into `out`.
    ///
    /// `out` is only overwritten when the conversion succeeds.
    pub fn convert_into<T: FromParamValue>(&self, out: &mut T) -> Result<(), ParamError> {
        *out = T::from_param(self)?;
        Ok(())
    }

    /// Convert an [`ParamValue::Array`] into a `Vec<T>`, element by element.
    pub fn convert_vec<T: FromParamValue>(&self) -> Result<Vec<T>, ParamError> {
        let mut out = Vec::new();
        self.convert_vec_into(&mut out)?;
        Ok(out)
    }

    /// Convert an [`ParamValue::Array`] into `out`, replacing whatever `out`
    /// held before.
    ///
    /// Elements are converted in order.  When the stored value is not an
    /// array, or any element fails to convert, `out` is left untouched.
    pub fn convert_vec_into<T: FromParamValue>(&self, out: &mut Vec<T>) -> Result<(), ParamError> {
        let items = self
            .as_array()
            .ok_or_else(|| ParamError::mismatch("array", self.type_name()))?;
        let converted = items
            .iter()
            .map(T::from_param)
            .collect::<Result<Vec<T>, ParamError>>()?;
        out.clear();
        out.extend(converted);
        Ok(())
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Int(i) => write!(f, "{i}"),
            ParamValue::Double(d) => write!(f, "{d}"),
            ParamValue::String(s) => f.write_str(s),
            ParamValue::Array(items) => {
                f.write_str("{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("}")
            }
            ParamValue::Struct(members) => {
                f.write_str("[")?;
                for (i, (key, item)) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{key}:{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Construction
// ─────────────────────────────────────────────────────────────────────────────

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(i64::from(v))
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Double(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::String(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::String(v)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(v: Vec<T>) -> Self {
        ParamValue::Array(v.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, ParamValue>> for ParamValue {
    fn from(v: BTreeMap<String, ParamValue>) -> Self {
        ParamValue::Struct(v)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Extraction
// ─────────────────────────────────────────────────────────────────────────────

/// Types that can be extracted from a [`ParamValue`].
///
/// Implement this for your own types to make them usable with
/// [`ParamValue::convert`] and the typed accessors built on it.
pub trait FromParamValue: Sized {
    /// Extract `Self` from `value`.
    fn from_param(value: &ParamValue) -> Result<Self, ParamError>;
}

impl FromParamValue for ParamValue {
    fn from_param(value: &ParamValue) -> Result<Self, ParamError> {
        Ok(value.clone())
    }
}

impl FromParamValue for bool {
    fn from_param(value: &ParamValue) -> Result<Self, ParamError> {
        match value {
            ParamValue::Bool(b) => Ok(*b),
            other => Err(ParamError::mismatch("boolean", other.type_name())),
        }
    }
}

macro_rules! impl_from_param_int {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromParamValue for $ty {
                fn from_param(value: &ParamValue) -> Result<Self, ParamError> {
                    match value {
                        ParamValue::Int(i) => <$ty>::try_from(*i).map_err(|_| {
                            ParamError::mismatch(
                                stringify!($ty),
                                format!("integer {i} (out of range)"),
                            )
                        }),
                        other => Err(ParamError::mismatch(stringify!($ty), other.type_name())),
                    }
                }
            }
        )*
    };
}

impl_from_param_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl FromParamValue for f64 {
    fn from_param(value: &ParamValue) -> Result<Self, ParamError> {
        match value {
            ParamValue::Double(d) => Ok(*d),
            ParamValue::Int(i) => Ok(*i as f64),
            other => Err(ParamError::mismatch("double", other.type_name())),
        }
    }
}

impl FromParamValue for f32 {
    fn from_param(value: &ParamValue) -> Result<Self, ParamError> {
        match value {
            ParamValue::Double(d) => Ok(*d as f32),
            ParamValue::Int(i) => Ok(*i as f32),
            other => Err(ParamError::mismatch("double", other.type_name())),
        }
    }
}

impl FromParamValue for String {
    fn from_param(value: &ParamValue) -> Result<Self, ParamError> {
        match value {
            ParamValue::String(s) => Ok(s.clone()),
            other => Err(ParamError::mismatch("string", other.type_name())),
        }
    }
}

impl<T: FromParamValue> FromParamValue for Vec<T> {
    fn from_param(value: &ParamValue) -> Result<Self, ParamError> {
        value.convert_vec()
    }
}

impl<T: FromParamValue> FromParamValue for BTreeMap<String, T> {
    fn from_param(value: &ParamValue) -> Result<Self, ParamError> {
        let members = value
            .as_struct()
            .ok_or_else(|| ParamError::mismatch("struct", value.type_name()))?;
        members
            .iter()
            .map(|(k, v)| T::from_param(v).map(|t| (k.clone(), t)))
            .collect()
    }
}

impl<T: FromParamValue> FromParamValue for HashMap<String, T> {
    fn from_param(value: &ParamValue) -> Result<Self, ParamError> {
        let members = value
            .as_struct()
            .ok_or_else(|| ParamError::mismatch("struct", value.type_name()))?;
        members
            .iter()
            .map(|(k, v)| T::from_param(v).map(|t| (k.clone(), t)))
            .collect()
    }
}
