//! Persistent (immutable) treap with caller-supplied orderings.
//!
//! This module provides [`TreapHandle`], which runs lookups and writes
//! against any root of a persistent treap, and [`PersistentTreap`], which
//! pairs a handle with one root so a tree can be passed around as a value.
//!
//! # Overview
//!
//! A treap is a binary search tree by key and a heap by weight. Keys are
//! ordered by one comparator and weights by another; a weight comparing
//! `Less` than another has the higher priority and sits closer to the root.
//!
//! - O(depth) get, `get_node`, min, max
//! - O(depth) insert, upsert, `update_if`, `set_weight`
//! - depth is O(log N) in expectation when weights are independent and random
//!
//! Writes never modify existing nodes. They rebuild the nodes on the search
//! path of their key and share every other subtree with the input root, so
//! older roots stay valid and readable.
//!
//! # Examples
//!
//! ```rust
//! use safe_treap::persistent::TreapHandle;
//!
//! // Larger weights have the higher priority
//! let handle = TreapHandle::<&str, u32>::max_weight_first();
//!
//! let (root, _) = handle.insert(None, "b", 1, 10);
//! let (root, _) = handle.insert(root.as_ref(), "a", 2, 20);
//!
//! let root = root.unwrap();
//! assert_eq!(*root.key(), "a");
//! assert_eq!(root.right().map(|right| *right.key()), Some("b"));
//! ```
//!
//! # Internal Structure
//!
//! Every reachable root satisfies:
//! 1. Keys in the left subtree compare less than the node's key
//! 2. Keys in the right subtree compare greater than the node's key
//! 3. No child's weight outranks its parent's weight
//! 4. No node changes after construction

use super::ReferenceCounter;
use super::error::{MissingComparator, TreapError};
use std::cmp::Ordering;
use std::fmt;

// =============================================================================
// Comparator Definition
// =============================================================================

/// Thread-safety bound required of comparators.
///
/// With the `arc` feature this is `Send + Sync`, so handles and trees can
/// cross threads. Without it every type satisfies the bound.
#[cfg(feature = "arc")]
pub trait ThreadBound: Send + Sync {}

#[cfg(feature = "arc")]
impl<T: Send + Sync + ?Sized> ThreadBound for T {}

/// Thread-safety bound required of comparators.
///
/// With the `arc` feature this is `Send + Sync`, so handles and trees can
/// cross threads. Without it every type satisfies the bound.
#[cfg(not(feature = "arc"))]
pub trait ThreadBound {}

#[cfg(not(feature = "arc"))]
impl<T: ?Sized> ThreadBound for T {}

/// A shared total order over `T`.
#[cfg(feature = "arc")]
pub type Comparator<T> = ReferenceCounter<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// A shared total order over `T`.
#[cfg(not(feature = "arc"))]
pub type Comparator<T> = ReferenceCounter<dyn Fn(&T, &T) -> Ordering>;

/// Wraps a comparison function into a [`Comparator`].
///
/// # Examples
///
/// ```rust
/// use safe_treap::persistent::{comparator, TreapHandle};
///
/// let handle = TreapHandle::<String, u8>::try_new(
///     Some(comparator(|left: &String, right: &String| left.len().cmp(&right.len()))),
///     Some(comparator(|left: &u8, right: &u8| left.cmp(right))),
/// );
/// assert!(handle.is_ok());
/// ```
pub fn comparator<T, F>(compare: F) -> Comparator<T>
where
    F: Fn(&T, &T) -> Ordering + ThreadBound + 'static,
{
    ReferenceCounter::new(compare)
}

// =============================================================================
// Node Definition
// =============================================================================

/// Shared reference to a node. Many tree versions may hold the same node.
pub type NodeRef<K, V, W> = ReferenceCounter<Node<K, V, W>>;

/// A possibly empty subtree. `None` is the empty tree.
pub type Link<K, V, W> = Option<NodeRef<K, V, W>>;

/// An immutable treap node.
///
/// Nodes are only ever created, never modified. A node reached from one root
/// may be reached from any number of other roots as well.
#[derive(Clone, Debug)]
pub struct Node<K, V, W> {
    key: K,
    item: V,
    weight: W,
    left: Link<K, V, W>,
    right: Link<K, V, W>,
}

impl<K, V, W> Node<K, V, W> {
    /// Creates a node with no children.
    const fn leaf(key: K, item: V, weight: W) -> Self {
        Self {
            key,
            item,
            weight,
            left: None,
            right: None,
        }
    }

    /// Returns the key of this node.
    #[inline]
    pub const fn key(&self) -> &K {
        &self.key
    }

    /// Returns the item stored under the key.
    #[inline]
    pub const fn item(&self) -> &V {
        &self.item
    }

    /// Returns the weight (priority) of this node.
    #[inline]
    pub const fn weight(&self) -> &W {
        &self.weight
    }

    /// Returns the root of the left subtree, if any.
    #[inline]
    pub const fn left(&self) -> Option<&NodeRef<K, V, W>> {
        self.left.as_ref()
    }

    /// Returns the root of the right subtree, if any.
    #[inline]
    pub const fn right(&self) -> Option<&NodeRef<K, V, W>> {
        self.right.as_ref()
    }

    /// Creates a copy of this node with new children.
    fn with_children(&self, left: Link<K, V, W>, right: Link<K, V, W>) -> Self
    where
        K: Clone,
        V: Clone,
        W: Clone,
    {
        Self {
            key: self.key.clone(),
            item: self.item.clone(),
            weight: self.weight.clone(),
            left,
            right,
        }
    }
}

// =============================================================================
// Write Description
// =============================================================================

/// What a write does to the key it targets.
enum Write<V> {
    /// Create the key if absent, leave it alone if present.
    Insert(V),
    /// Create the key if absent, replace item and weight if present.
    Upsert(V),
    /// Replace only the weight if present, leave the tree alone if absent.
    Reweight,
}

/// Predicate consulted before replacing an existing node.
type Decide<'d, K, V, W> = Option<&'d dyn Fn(&Node<K, V, W>) -> bool>;

/// Result of writing into a subtree.
///
/// `Unchanged` means the input subtree is still the answer and nothing was
/// copied; it is never confused with an empty subtree.
enum Written<K, V, W> {
    Unchanged,
    Created(NodeRef<K, V, W>),
    Replaced(NodeRef<K, V, W>),
}

impl<K, V, W> Written<K, V, W> {
    fn map<F>(self, rebuild: F) -> Self
    where
        F: FnOnce(NodeRef<K, V, W>) -> NodeRef<K, V, W>,
    {
        match self {
            Self::Unchanged => Self::Unchanged,
            Self::Created(node) => Self::Created(rebuild(node)),
            Self::Replaced(node) => Self::Replaced(rebuild(node)),
        }
    }

    /// Resolves to the new root and whether a new key was created.
    fn into_created(self, root: Option<&NodeRef<K, V, W>>) -> (Link<K, V, W>, bool) {
        match self {
            Self::Unchanged => (root.cloned(), false),
            Self::Created(node) => (Some(node), true),
            Self::Replaced(node) => (Some(node), false),
        }
    }

    /// Resolves to the new root and whether anything changed.
    fn into_changed(self, root: Option<&NodeRef<K, V, W>>) -> (Link<K, V, W>, bool) {
        match self {
            Self::Unchanged => (root.cloned(), false),
            Self::Created(node) | Self::Replaced(node) => (Some(node), true),
        }
    }
}

/// The child to lift above its parent, already known to exist.
enum Promotion<K, V, W> {
    Left(NodeRef<K, V, W>),
    Right(NodeRef<K, V, W>),
}

// =============================================================================
// TreapHandle Definition
// =============================================================================

/// Runs treap operations against any root using a key and a weight ordering.
///
/// The handle holds nothing but its two comparators. A tree is identified by
/// its root [`Link`]; the same handle serves every version of every tree
/// built with it. Cloning a handle only bumps reference counts.
///
/// # Time Complexity
///
/// | Operation      | Complexity |
/// |----------------|------------|
/// | `get`          | O(depth)   |
/// | `get_node`     | O(depth)   |
/// | `min`/`max`    | O(depth)   |
/// | `insert`       | O(depth)   |
/// | `upsert`       | O(depth)   |
/// | `update_if`    | O(depth)   |
/// | `set_weight`   | O(depth)   |
///
/// Depth is O(log N) in expectation only when weights are independent and
/// random. Monotonic weights degrade the tree to a list.
///
/// # Examples
///
/// ```rust
/// use safe_treap::persistent::TreapHandle;
///
/// let handle = TreapHandle::new(
///     |left: &i32, right: &i32| left.cmp(right),
///     |left: &u32, right: &u32| left.cmp(right),
/// );
///
/// let (root, created) = handle.insert(None, 7, "seven", 1);
/// assert!(created);
///
/// // Inserting an existing key is a no-op that keeps the same root
/// let (again, created) = handle.insert(root.as_ref(), 7, "SEVEN", 0);
/// assert!(!created);
/// assert_eq!(handle.get(again.as_ref(), &7), Some(&"seven"));
/// ```
pub struct TreapHandle<K, W> {
    compare_keys: Comparator<K>,
    compare_weights: Comparator<W>,
}

impl<K, W> TreapHandle<K, W> {
    /// Creates a handle from a key comparator and a weight comparator.
    ///
    /// `compare_weights(a, b) == Ordering::Less` means `a` has the higher
    /// priority.
    pub fn new<KC, WC>(compare_keys: KC, compare_weights: WC) -> Self
    where
        KC: Fn(&K, &K) -> Ordering + ThreadBound + 'static,
        WC: Fn(&W, &W) -> Ordering + ThreadBound + 'static,
    {
        Self {
            compare_keys: comparator(compare_keys),
            compare_weights: comparator(compare_weights),
        }
    }

    /// Creates a handle from optional comparators.
    ///
    /// # Errors
    ///
    /// Returns [`TreapError::InvalidConfiguration`] if either comparator is
    /// `None`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use safe_treap::persistent::{comparator, MissingComparator, TreapError, TreapHandle};
    ///
    /// let result = TreapHandle::<i32, i32>::try_new(
    ///     None,
    ///     Some(comparator(|left: &i32, right: &i32| left.cmp(right))),
    /// );
    /// assert_eq!(
    ///     result.unwrap_err(),
    ///     TreapError::InvalidConfiguration { missing: MissingComparator::Keys }
    /// );
    /// ```
    pub fn try_new(
        compare_keys: Option<Comparator<K>>,
        compare_weights: Option<Comparator<W>>,
    ) -> Result<Self, TreapError> {
        let missing = match (compare_keys, compare_weights) {
            (Some(compare_keys), Some(compare_weights)) => {
                return Ok(Self {
                    compare_keys,
                    compare_weights,
                });
            }
            (None, Some(_)) => MissingComparator::Keys,
            (Some(_), None) => MissingComparator::Weights,
            (None, None) => MissingComparator::Both,
        };
        tracing::debug!(%missing, "rejected treap handle configuration");
        Err(TreapError::InvalidConfiguration { missing })
    }

    /// Starts building a handle one comparator at a time.
    #[inline]
    #[must_use]
    pub const fn builder() -> TreapHandleBuilder<K, W> {
        TreapHandleBuilder::new()
    }

    /// Returns the node whose key compares equal to `key`.
    ///
    /// # Complexity
    ///
    /// O(depth)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use safe_treap::persistent::TreapHandle;
    ///
    /// let handle = TreapHandle::<i32, u8>::natural();
    /// let (root, _) = handle.insert(None, 1, "one", 4);
    ///
    /// let node = handle.get_node(root.as_ref(), &1).unwrap();
    /// assert_eq!(*node.weight(), 4);
    /// assert!(handle.get_node(root.as_ref(), &2).is_none());
    /// ```
    pub fn get_node<'a, V>(
        &self,
        root: Option<&'a NodeRef<K, V, W>>,
        key: &K,
    ) -> Option<&'a NodeRef<K, V, W>> {
        root.and_then(|node| match (self.compare_keys)(key, &node.key) {
            Ordering::Less => self.get_node(node.left.as_ref(), key),
            Ordering::Greater => self.get_node(node.right.as_ref(), key),
            Ordering::Equal => Some(node),
        })
    }

    /// Returns the item stored under `key`.
    ///
    /// # Complexity
    ///
    /// O(depth)
    pub fn get<'a, V>(&self, root: Option<&'a NodeRef<K, V, W>>, key: &K) -> Option<&'a V> {
        self.get_node(root, key).map(|node| &node.item)
    }

    /// Returns `true` if a node with `key` is reachable from `root`.
    pub fn contains_key<V>(&self, root: Option<&NodeRef<K, V, W>>, key: &K) -> bool {
        self.get_node(root, key).is_some()
    }

    /// Returns the item with the smallest key, or `None` for an empty tree.
    ///
    /// The weight ordering never affects the result.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use safe_treap::persistent::TreapHandle;
    ///
    /// let handle = TreapHandle::<i32, u8>::natural();
    /// assert_eq!(TreapHandle::<i32, u8>::min::<&str>(None), None);
    ///
    /// let (root, _) = handle.insert(None, 5, "five", 1);
    /// let (root, _) = handle.insert(root.as_ref(), 3, "three", 2);
    /// assert_eq!(TreapHandle::min(root.as_ref()), Some(&"three"));
    /// ```
    pub fn min<V>(root: Option<&NodeRef<K, V, W>>) -> Option<&V> {
        let mut node = root?;
        while let Some(left) = node.left.as_ref() {
            node = left;
        }
        Some(&node.item)
    }

    /// Returns the item with the largest key, or `None` for an empty tree.
    pub fn max<V>(root: Option<&NodeRef<K, V, W>>) -> Option<&V> {
        let mut node = root?;
        while let Some(right) = node.right.as_ref() {
            node = right;
        }
        Some(&node.item)
    }
}

impl<K: Clone, W: Clone> TreapHandle<K, W> {
    /// Inserts `key` if it is absent.
    ///
    /// Returns the new root and `true` if the key was created. If the key is
    /// already present the input root is returned as is, with `false`.
    ///
    /// # Complexity
    ///
    /// O(depth)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use safe_treap::persistent::TreapHandle;
    ///
    /// let handle = TreapHandle::<&str, u32>::natural();
    /// let (version1, _) = handle.insert(None, "a", 1, 5);
    /// let (version2, created) = handle.insert(version1.as_ref(), "b", 2, 6);
    ///
    /// assert!(created);
    /// assert_eq!(handle.get(version1.as_ref(), &"b"), None); // Original unchanged
    /// assert_eq!(handle.get(version2.as_ref(), &"b"), Some(&2));
    /// ```
    #[must_use]
    pub fn insert<V: Clone>(
        &self,
        root: Option<&NodeRef<K, V, W>>,
        key: K,
        item: V,
        weight: W,
    ) -> (Link<K, V, W>, bool) {
        self.write_node(root, key, weight, Write::Insert(item), None)
            .into_created(root)
    }

    /// Inserts `key`, or replaces its item and weight if it is present.
    ///
    /// Returns the new root and `true` only if the key was created.
    #[must_use]
    pub fn upsert<V: Clone>(
        &self,
        root: Option<&NodeRef<K, V, W>>,
        key: K,
        item: V,
        weight: W,
    ) -> (Link<K, V, W>, bool) {
        self.write_node(root, key, weight, Write::Upsert(item), None)
            .into_created(root)
    }

    /// Replaces the weight of an existing key if `decide` accepts the
    /// current node.
    ///
    /// Only writes that may create a key store items, so the stored item is
    /// kept and `_item` is dropped. An absent key is a no-op and `decide` is
    /// not called. Returns the new root and `true` if the tree changed.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use safe_treap::persistent::TreapHandle;
    ///
    /// let handle = TreapHandle::<&str, u32>::natural();
    /// let (root, _) = handle.insert(None, "session", "alice", 30);
    ///
    /// // Refresh the priority only while the session still belongs to alice
    /// let (root, changed) =
    ///     handle.update_if(root.as_ref(), "session", "bob", 10, |node| *node.item() == "alice");
    /// assert!(changed);
    /// let node = handle.get_node(root.as_ref(), &"session").unwrap();
    /// assert_eq!((*node.item(), *node.weight()), ("alice", 10));
    ///
    /// let (root, changed) =
    ///     handle.update_if(root.as_ref(), "session", "bob", 5, |node| *node.weight() > 20);
    /// assert!(!changed);
    /// assert_eq!(handle.get_node(root.as_ref(), &"session").map(|node| *node.weight()), Some(10));
    /// ```
    #[must_use]
    pub fn update_if<V, F>(
        &self,
        root: Option<&NodeRef<K, V, W>>,
        key: K,
        _item: V,
        weight: W,
        decide: F,
    ) -> (Link<K, V, W>, bool)
    where
        V: Clone,
        F: Fn(&Node<K, V, W>) -> bool,
    {
        let decide: &dyn Fn(&Node<K, V, W>) -> bool = &decide;
        self.write_node(root, key, weight, Write::Reweight, Some(decide))
            .into_changed(root)
    }

    /// Replaces the weight of an existing key, keeping its item.
    ///
    /// Lowering a node's priority sinks it through as many rotations as
    /// needed; raising it lifts it toward the root. An absent key is a no-op.
    #[must_use]
    pub fn set_weight<V: Clone>(
        &self,
        root: Option<&NodeRef<K, V, W>>,
        key: K,
        weight: W,
    ) -> (Link<K, V, W>, bool) {
        self.write_node(root, key, weight, Write::Reweight, None)
            .into_changed(root)
    }

    /// Recursive helper shared by every write.
    ///
    /// Copies exactly the nodes on the search path, and only when something
    /// below them changed.
    fn write_node<V: Clone>(
        &self,
        node: Option<&NodeRef<K, V, W>>,
        key: K,
        weight: W,
        write: Write<V>,
        decide: Decide<'_, K, V, W>,
    ) -> Written<K, V, W> {
        let Some(node) = node else {
            return match write {
                Write::Insert(item) | Write::Upsert(item) => {
                    Written::Created(ReferenceCounter::new(Node::leaf(key, item, weight)))
                }
                Write::Reweight => {
                    tracing::trace!(reason = "absent", "treap write left the tree unchanged");
                    Written::Unchanged
                }
            };
        };

        match (self.compare_keys)(&key, &node.key) {
            Ordering::Less => self
                .write_node(node.left.as_ref(), key, weight, write, decide)
                .map(|left| self.rebalance(node.with_children(Some(left), node.right.clone()))),
            Ordering::Greater => self
                .write_node(node.right.as_ref(), key, weight, write, decide)
                .map(|right| self.rebalance(node.with_children(node.left.clone(), Some(right)))),
            Ordering::Equal => self.replace_node(node, weight, write, decide),
        }
    }

    /// Rebuilds a found node with its new weight and, for upserts, its new
    /// item.
    fn replace_node<V: Clone>(
        &self,
        node: &NodeRef<K, V, W>,
        weight: W,
        write: Write<V>,
        decide: Decide<'_, K, V, W>,
    ) -> Written<K, V, W> {
        let item = match write {
            Write::Insert(_) => {
                tracing::trace!(reason = "insert-only", "treap write left the tree unchanged");
                return Written::Unchanged;
            }
            Write::Upsert(item) => item,
            Write::Reweight => node.item.clone(),
        };

        let current: &Node<K, V, W> = node;
        if let Some(decide) = decide
            && !decide(current)
        {
            tracing::trace!(reason = "rejected", "treap write left the tree unchanged");
            return Written::Unchanged;
        }

        let replacement = Node {
            key: node.key.clone(),
            item,
            weight,
            left: node.left.clone(),
            right: node.right.clone(),
        };
        Written::Replaced(self.rebalance(replacement))
    }

    /// Restores heap order at `node` and publishes it.
    ///
    /// The children are assumed to be valid treaps already.
    fn rebalance<V: Clone>(&self, node: Node<K, V, W>) -> NodeRef<K, V, W> {
        match self.promotion(&node) {
            Some(Promotion::Left(left)) => self.rotate_right(node, &left),
            Some(Promotion::Right(right)) => self.rotate_left(node, &right),
            None => ReferenceCounter::new(node),
        }
    }

    /// Picks the child that must be promoted above `node`, if any.
    ///
    /// When both children outrank the node the stronger one wins; on a tie
    /// the left child does.
    fn promotion<V>(&self, node: &Node<K, V, W>) -> Option<Promotion<K, V, W>> {
        let left = node
            .left
            .as_ref()
            .filter(|left| self.outranks(&left.weight, &node.weight));
        let right = node
            .right
            .as_ref()
            .filter(|right| self.outranks(&right.weight, &node.weight));

        match (left, right) {
            (Some(left), Some(right)) if self.outranks(&right.weight, &left.weight) => {
                Some(Promotion::Right(ReferenceCounter::clone(right)))
            }
            (Some(left), _) => Some(Promotion::Left(ReferenceCounter::clone(left))),
            (None, Some(right)) => Some(Promotion::Right(ReferenceCounter::clone(right))),
            (None, None) => None,
        }
    }

    /// Strict priority test. Equal weights never outrank each other.
    fn outranks(&self, challenger: &W, incumbent: &W) -> bool {
        (self.compare_weights)(challenger, incumbent) == Ordering::Less
    }

    /// Promotes `left`, the left child of `node`.
    ///
    /// ```text
    ///       N            L
    ///      / \          / \
    ///     L   C   =>   A   N
    ///    / \              / \
    ///   A   B            B   C
    /// ```
    ///
    /// The demoted `N` is rebalanced again, which only rotates further when
    /// its priority was lowered.
    fn rotate_right<V: Clone>(
        &self,
        node: Node<K, V, W>,
        left: &NodeRef<K, V, W>,
    ) -> NodeRef<K, V, W> {
        tracing::trace!(direction = "right", "rotated treap node");
        let demoted = self.rebalance(Node {
            left: left.right.clone(),
            ..node
        });
        ReferenceCounter::new(left.with_children(left.left.clone(), Some(demoted)))
    }

    /// Promotes `right`, the right child of `node`. Mirror image of
    /// [`Self::rotate_right`].
    fn rotate_left<V: Clone>(
        &self,
        node: Node<K, V, W>,
        right: &NodeRef<K, V, W>,
    ) -> NodeRef<K, V, W> {
        tracing::trace!(direction = "left", "rotated treap node");
        let demoted = self.rebalance(Node {
            right: right.left.clone(),
            ..node
        });
        ReferenceCounter::new(right.with_children(Some(demoted), right.right.clone()))
    }
}

impl<K: Ord + 'static, W: Ord + 'static> TreapHandle<K, W> {
    /// Creates a handle using `Ord` for keys and weights, where the smaller
    /// weight has the higher priority.
    #[must_use]
    pub fn natural() -> Self {
        Self::new(K::cmp, W::cmp)
    }

    /// Creates a handle using `Ord` for keys and weights, where the larger
    /// weight has the higher priority.
    #[must_use]
    pub fn max_weight_first() -> Self {
        Self::new(K::cmp, |left: &W, right: &W| right.cmp(left))
    }
}

impl<K, W> Clone for TreapHandle<K, W> {
    fn clone(&self) -> Self {
        Self {
            compare_keys: ReferenceCounter::clone(&self.compare_keys),
            compare_weights: ReferenceCounter::clone(&self.compare_weights),
        }
    }
}

impl<K, W> fmt::Debug for TreapHandle<K, W> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("TreapHandle").finish_non_exhaustive()
    }
}

// =============================================================================
// TreapHandleBuilder Definition
// =============================================================================

/// Collects the comparators of a [`TreapHandle`].
///
/// # Examples
///
/// ```rust
/// use safe_treap::persistent::TreapHandle;
///
/// let handle = TreapHandle::<i32, f64>::builder()
///     .compare_keys(|left: &i32, right: &i32| left.cmp(right))
///     .compare_weights(|left: &f64, right: &f64| left.total_cmp(right))
///     .build();
/// assert!(handle.is_ok());
/// ```
pub struct TreapHandleBuilder<K, W> {
    compare_keys: Option<Comparator<K>>,
    compare_weights: Option<Comparator<W>>,
}

impl<K, W> TreapHandleBuilder<K, W> {
    /// Creates a builder with no comparators.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            compare_keys: None,
            compare_weights: None,
        }
    }

    /// Sets the key ordering.
    #[must_use]
    pub fn compare_keys<F>(mut self, compare: F) -> Self
    where
        F: Fn(&K, &K) -> Ordering + ThreadBound + 'static,
    {
        self.compare_keys = Some(comparator(compare));
        self
    }

    /// Sets the weight ordering. `Ordering::Less` means higher priority.
    #[must_use]
    pub fn compare_weights<F>(mut self, compare: F) -> Self
    where
        F: Fn(&W, &W) -> Ordering + ThreadBound + 'static,
    {
        self.compare_weights = Some(comparator(compare));
        self
    }

    /// Builds the handle.
    ///
    /// # Errors
    ///
    /// Returns [`TreapError::InvalidConfiguration`] if a comparator was never
    /// set.
    pub fn build(self) -> Result<TreapHandle<K, W>, TreapError> {
        TreapHandle::try_new(self.compare_keys, self.compare_weights)
    }
}

impl<K, W> Default for TreapHandleBuilder<K, W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, W> fmt::Debug for TreapHandleBuilder<K, W> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TreapHandleBuilder")
            .field("compare_keys", &self.compare_keys.is_some())
            .field("compare_weights", &self.compare_weights.is_some())
            .finish()
    }
}

// =============================================================================
// PersistentTreap Definition
// =============================================================================

/// A persistent treap value: a handle together with one root.
///
/// Every write returns a new `PersistentTreap` and leaves `self` untouched.
/// Cloning is O(1).
///
/// # Time Complexity
///
/// | Operation      | Complexity |
/// |----------------|------------|
/// | `new`          | O(1)       |
/// | `from_root`    | O(N)       |
/// | `get`          | O(depth)   |
/// | `insert`       | O(depth)   |
/// | `upsert`       | O(depth)   |
/// | `update_if`    | O(depth)   |
/// | `set_weight`   | O(depth)   |
/// | `min`/`max`    | O(depth)   |
/// | `len`          | O(1)       |
/// | `is_empty`     | O(1)       |
///
/// # Examples
///
/// ```rust
/// use safe_treap::persistent::{PersistentTreap, TreapHandle};
///
/// let empty = PersistentTreap::new(TreapHandle::natural());
/// let (one, _) = empty.insert(1, "one", 10_u32);
/// let (two, _) = one.insert(2, "two", 5);
///
/// assert!(empty.is_empty());
/// assert_eq!(one.len(), 1);
/// assert_eq!(two.len(), 2);
/// assert_eq!(two.max(), Some(&"two"));
/// ```
pub struct PersistentTreap<K, V, W> {
    handle: TreapHandle<K, W>,
    root: Link<K, V, W>,
    length: usize,
}

impl<K, V, W> PersistentTreap<K, V, W> {
    /// Creates an empty treap.
    #[inline]
    #[must_use]
    pub const fn new(handle: TreapHandle<K, W>) -> Self {
        Self {
            handle,
            root: None,
            length: 0,
        }
    }

    /// Adopts an existing root built with a compatible handle.
    ///
    /// # Complexity
    ///
    /// O(N), to count the entries.
    #[must_use]
    pub fn from_root(handle: TreapHandle<K, W>, root: Link<K, V, W>) -> Self {
        let length = count_nodes(root.as_ref());
        Self {
            handle,
            root,
            length,
        }
    }

    /// Returns the handle this treap writes with.
    #[inline]
    pub const fn handle(&self) -> &TreapHandle<K, W> {
        &self.handle
    }

    /// Returns the root node, or `None` if the treap is empty.
    #[inline]
    pub const fn root(&self) -> Option<&NodeRef<K, V, W>> {
        self.root.as_ref()
    }

    /// Returns the number of entries.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if the treap has no entries.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns the item stored under `key`.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.handle.get(self.root.as_ref(), key)
    }

    /// Returns the node stored under `key`.
    pub fn get_node(&self, key: &K) -> Option<&NodeRef<K, V, W>> {
        self.handle.get_node(self.root.as_ref(), key)
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.handle.contains_key(self.root.as_ref(), key)
    }

    /// Returns the item with the smallest key.
    pub fn min(&self) -> Option<&V> {
        TreapHandle::min(self.root.as_ref())
    }

    /// Returns the item with the largest key.
    pub fn max(&self) -> Option<&V> {
        TreapHandle::max(self.root.as_ref())
    }

    fn with_root(&self, root: Link<K, V, W>, length: usize) -> Self {
        Self {
            handle: self.handle.clone(),
            root,
            length,
        }
    }
}

impl<K: Clone, V: Clone, W: Clone> PersistentTreap<K, V, W> {
    /// Inserts `key` if absent. See [`TreapHandle::insert`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use safe_treap::persistent::{PersistentTreap, TreapHandle};
    ///
    /// let treap = PersistentTreap::new(TreapHandle::natural());
    /// let (treap, created) = treap.insert("key", 1, 0_u8);
    /// assert!(created);
    ///
    /// let (same, created) = treap.insert("key", 2, 0);
    /// assert!(!created);
    /// assert_eq!(same.get(&"key"), Some(&1));
    /// ```
    #[must_use]
    pub fn insert(&self, key: K, item: V, weight: W) -> (Self, bool) {
        let (root, created) = self.handle.insert(self.root.as_ref(), key, item, weight);
        (self.with_root(root, self.length + usize::from(created)), created)
    }

    /// Inserts or replaces `key`. See [`TreapHandle::upsert`].
    #[must_use]
    pub fn upsert(&self, key: K, item: V, weight: W) -> (Self, bool) {
        let (root, created) = self.handle.upsert(self.root.as_ref(), key, item, weight);
        (self.with_root(root, self.length + usize::from(created)), created)
    }

    /// Conditionally re-weights an existing key. See [`TreapHandle::update_if`].
    #[must_use]
    pub fn update_if<F>(&self, key: K, item: V, weight: W, decide: F) -> (Self, bool)
    where
        F: Fn(&Node<K, V, W>) -> bool,
    {
        let (root, changed) = self
            .handle
            .update_if(self.root.as_ref(), key, item, weight, decide);
        (self.with_root(root, self.length), changed)
    }

    /// Replaces the weight of an existing key. See [`TreapHandle::set_weight`].
    #[must_use]
    pub fn set_weight(&self, key: K, weight: W) -> (Self, bool) {
        let (root, changed) = self.handle.set_weight(self.root.as_ref(), key, weight);
        (self.with_root(root, self.length), changed)
    }
}

fn count_nodes<K, V, W>(node: Option<&NodeRef<K, V, W>>) -> usize {
    node.map_or(0, |node| {
        1 + count_nodes(node.left.as_ref()) + count_nodes(node.right.as_ref())
    })
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl<K, V, W> Clone for PersistentTreap<K, V, W> {
    fn clone(&self) -> Self {
        self.with_root(self.root.clone(), self.length)
    }
}

impl<K: Ord + 'static, V, W: Ord + 'static> Default for PersistentTreap<K, V, W> {
    fn default() -> Self {
        Self::new(TreapHandle::natural())
    }
}

impl<K: fmt::Debug, V: fmt::Debug, W: fmt::Debug> fmt::Debug for PersistentTreap<K, V, W> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("PersistentTreap")
            .field("length", &self.length)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
