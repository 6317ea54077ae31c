use std::fmt::Debug;

/// RbtError enumerates over all possible errors that this package
/// shall return.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum RbtError<K>
where
    K: Debug,
{
    /// Returned by insert() API when key is already present. Carries
    /// back the rejected key.
    #[error("duplicate key {0:?}")]
    DuplicateKey(K),
    /// Returned by remove() API when key is not present.
    #[error("key not found")]
    KeyNotFound,
    /// Fatal case, root node is red.
    #[error("root node is red")]
    RedRoot,
    /// Fatal case, a red node has a red child.
    #[error("consecutive red nodes")]
    ConsecutiveReds,
    /// Fatal case, paths to nil leaves count different number of blacks.
    /// The String component of this variant can be used for debugging.
    #[error("unbalanced blacks, {0}")]
    UnbalancedBlacks(String),
    /// Fatal case, index entries are not in sort-order.
    #[error("sort error, {0:?} misplaced relative to {1:?}")]
    SortError(K, K),
    /// Fatal case, parent and child links disagree.
    #[error("broken link, {0}")]
    BrokenLink(String),
    /// Fatal case, number of reachable nodes (second) differs from the
    /// entry count (first).
    #[error("count mismatch, expected {0} found {1}")]
    CountMismatch(usize, usize),
}
