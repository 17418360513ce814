//! Persistent (immutable) treap.
//!
//! This module provides a treap that uses structural sharing to keep every
//! version of the tree valid:
//!
//! - [`Node`]: Immutable tree cell shared between versions
//! - [`TreapHandle`]: Comparator pair running the operations on any root
//! - [`PersistentTreap`]: Handle plus root, usable as a persistent value
//!
//! # Structural Sharing
//!
//! A write copies only the nodes on the search path of its key. Every other
//! subtree is reused by reference, so older roots stay intact and cheap to
//! keep around.
//!
//! # Examples
//!
//! ## Working with roots directly
//!
//! ```rust
//! use safe_treap::persistent::TreapHandle;
//!
//! let handle = TreapHandle::<i32, u32>::natural();
//!
//! let (version1, created) = handle.insert(None, 5, "five", 3);
//! assert!(created);
//! let (version2, _) = handle.insert(version1.as_ref(), 1, "one", 1);
//!
//! // The first version is untouched
//! assert_eq!(handle.get(version1.as_ref(), &1), None);
//! assert_eq!(handle.get(version2.as_ref(), &1), Some(&"one"));
//!
//! // Weight 1 outranks weight 3 under the natural ordering
//! assert_eq!(version2.as_ref().map(|root| *root.key()), Some(1));
//! ```
//!
//! ## `PersistentTreap`
//!
//! ```rust
//! use safe_treap::persistent::{PersistentTreap, TreapHandle};
//!
//! let treap = PersistentTreap::new(TreapHandle::natural());
//! let (treap, _) = treap.insert(3, "three", 7_u64);
//! let (treap, _) = treap.insert(1, "one", 2);
//! let (updated, changed) = treap.upsert(3, "THREE", 7);
//!
//! assert!(!changed);
//! assert_eq!(treap.get(&3), Some(&"three"));   // Original unchanged
//! assert_eq!(updated.get(&3), Some(&"THREE")); // New version
//! assert_eq!(updated.min(), Some(&"one"));
//! ```

// =============================================================================
// Reference Counter Type Alias
// =============================================================================

/// Reference-counted smart pointer type.
///
/// When the `arc` feature is enabled, this is `std::sync::Arc`,
/// which is thread-safe but has slightly higher overhead.
///
/// When the `arc` feature is disabled (default), this is `std::rc::Rc`,
/// which is faster but not thread-safe.
#[cfg(feature = "arc")]
pub type ReferenceCounter<T> = std::sync::Arc<T>;

/// Reference-counted smart pointer type.
///
/// When the `arc` feature is enabled, this is `std::sync::Arc`,
/// which is thread-safe but has slightly higher overhead.
///
/// When the `arc` feature is disabled (default), this is `std::rc::Rc`,
/// which is faster but not thread-safe.
#[cfg(not(feature = "arc"))]
pub type ReferenceCounter<T> = std::rc::Rc<T>;

mod error;
mod treap;

pub use error::MissingComparator;
pub use error::TreapError;
pub use treap::Comparator;
pub use treap::Link;
pub use treap::Node;
pub use treap::NodeRef;
pub use treap::PersistentTreap;
pub use treap::ThreadBound;
pub use treap::TreapHandle;
pub use treap::TreapHandleBuilder;
pub use treap::comparator;
