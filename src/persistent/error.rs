//! Error types for the persistent treap.
//!
//! Only handle construction can fail. Lookups and writes report their
//! outcome through `Option` and `bool` results instead.

/// Names the comparator(s) absent from a rejected configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum MissingComparator {
    /// The key comparator was not supplied.
    #[error("key comparator")]
    Keys,
    /// The weight comparator was not supplied.
    #[error("weight comparator")]
    Weights,
    /// Neither comparator was supplied.
    #[error("key and weight comparators")]
    Both,
}

/// Represents errors raised while configuring a treap handle.
///
/// # Examples
///
/// ```rust
/// use safe_treap::persistent::{MissingComparator, TreapError, TreapHandle};
///
/// let error = TreapHandle::<i32, u32>::builder()
///     .compare_keys(|left: &i32, right: &i32| left.cmp(right))
///     .build()
///     .unwrap_err();
///
/// assert_eq!(
///     error,
///     TreapError::InvalidConfiguration { missing: MissingComparator::Weights }
/// );
/// assert_eq!(
///     format!("{error}"),
///     "invalid treap configuration: missing weight comparator"
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TreapError {
    /// A required comparator was absent when building the handle.
    #[error("invalid treap configuration: missing {missing}")]
    InvalidConfiguration {
        /// Which comparator(s) were absent.
        missing: MissingComparator,
    },
}
