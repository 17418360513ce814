//! # safe-treap
//!
//! A persistent (immutable) treap for Rust.
//!
//! ## Overview
//!
//! A treap is a binary tree that is a search tree by key and a heap by
//! weight. This crate keeps every version of the tree alive: inserting,
//! upserting or re-weighting a key returns a new root that shares every
//! untouched subtree with the previous one.
//!
//! - **Node**: immutable cell holding a key, an item, a weight and two
//!   shared children.
//! - **Handle**: couples a key ordering with a weight ordering and runs the
//!   operations against any root.
//! - **`PersistentTreap`**: a handle plus a root, behaving like a persistent
//!   ordered map value.
//!
//! ## Feature Flags
//!
//! - `persistent`: The treap itself (enabled by default)
//! - `arc`: Use `Arc` instead of `Rc` so trees can be shared across threads
//! - `full`: Enable all features
//!
//! ## Example
//!
//! ```rust
//! use safe_treap::prelude::*;
//!
//! let treap = PersistentTreap::new(TreapHandle::natural());
//! let (treap, created) = treap.insert("b", 1, 10_u32);
//! assert!(created);
//! assert_eq!(treap.get(&"b"), Some(&1));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Prelude module for convenient imports.
///
/// Re-exports commonly used types and traits.
///
/// # Usage
///
/// ```rust
/// use safe_treap::prelude::*;
/// ```
pub mod prelude {

    #[cfg(feature = "persistent")]
    pub use crate::persistent::*;
}

#[cfg(feature = "persistent")]
pub mod persistent;
