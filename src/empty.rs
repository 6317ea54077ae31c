/// Can be used while indexing keys without values, like ``Rbt<K, Empty>``.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct Empty;
