//! Tri-state field for partial updates.
//!
//! JSON partial-update bodies need to tell three cases apart: the key was
//! left out, the key was sent as `null`, or the key carried a value. A plain
//! `Option<T>` collapses the first two.
//!
//! Fields of type `Patch<T>` must be annotated with `#[serde(default)]` so
//! that a missing key deserializes to [`Patch::Absent`].
//!
//! ```
//! use mailroom_core::Patch;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Body {
//!     #[serde(default)]
//!     reason: Patch<String>,
//! }
//!
//! let body: Body = serde_json::from_str("{}").unwrap();
//! assert!(body.reason.is_absent());
//!
//! let body: Body = serde_json::from_str(r#"{"reason": null}"#).unwrap();
//! assert!(body.reason.is_null());
//!
//! let body: Body = serde_json::from_str(r#"{"reason": "abuse"}"#).unwrap();
//! assert_eq!(body.reason, Patch::Value("abuse".to_owned()));
//! ```

use serde::{Deserialize, Deserializer};

/// A `null` was sent for a field that cannot be cleared.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field} cannot be null")]
pub struct PatchError {
    /// Name of the offending field.
    pub field: &'static str,
}

/// One field of a partial update.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Patch<T> {
    /// Key not present; leave the stored value untouched.
    #[default]
    Absent,
    /// Key present with `null`; clear the stored value.
    Null,
    /// Key present with a value; overwrite.
    Value(T),
}

impl<T> Patch<T> {
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether the key was sent at all.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        !self.is_absent()
    }

    /// Value for a column that cannot be cleared.
    ///
    /// `Absent` becomes `None` (keep the stored value).
    ///
    /// # Errors
    ///
    /// Returns `PatchError` if the field was sent as `null`.
    pub fn required(self, field: &'static str) -> Result<Option<T>, PatchError> {
        match self {
            Self::Absent => Ok(None),
            Self::Null => Err(PatchError { field }),
            Self::Value(v) => Ok(Some(v)),
        }
    }

    /// Split into `(touch, new_value)` for a nullable column.
    ///
    /// Repositories bind both halves so the statement can write
    /// `CASE WHEN $touch THEN $value ELSE column END`.
    pub fn into_update(self) -> (bool, Option<T>) {
        match self {
            Self::Absent => (false, None),
            Self::Null => (true, None),
            Self::Value(v) => (true, Some(v)),
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Self::Value)
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Only called when the key is present; a missing key goes through
        // `#[serde(default)]`.
        Option::<T>::deserialize(deserializer).map(Self::from)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Body {
        #[serde(default)]
        daily_limit: Patch<i32>,
        #[serde(default)]
        custom_limit_reason: Patch<String>,
    }

    #[test]
    fn test_missing_key_is_absent() {
        let body: Body = serde_json::from_str("{}").unwrap();
        assert!(body.daily_limit.is_absent());
        assert!(body.custom_limit_reason.is_absent());
    }

    #[test]
    fn test_null_and_value_are_distinct() {
        let body: Body =
            serde_json::from_str(r#"{"daily_limit": 10, "custom_limit_reason": null}"#).unwrap();
        assert_eq!(body.daily_limit, Patch::Value(10));
        assert!(body.custom_limit_reason.is_null());
    }

    #[test]
    fn test_required_rejects_null() {
        assert_eq!(Patch::<i32>::Absent.required("daily_limit"), Ok(None));
        assert_eq!(Patch::Value(5).required("daily_limit"), Ok(Some(5)));

        let err = Patch::<i32>::Null.required("daily_limit").unwrap_err();
        assert_eq!(err.to_string(), "daily_limit cannot be null");
    }

    #[test]
    fn test_into_update() {
        assert_eq!(Patch::<String>::Absent.into_update(), (false, None));
        assert_eq!(Patch::<String>::Null.into_update(), (true, None));
        assert_eq!(
            Patch::Value("vip".to_owned()).into_update(),
            (true, Some("vip".to_owned()))
        );
    }

    #[test]
    fn test_wrong_type_is_an_error() {
        assert!(serde_json::from_str::<Body>(r#"{"daily_limit": "ten"}"#).is_err());
    }
}
