/// Errors returned by [`AaTree`](crate::AaTree) operations.
///
/// Every error is raised before the tree is modified, so the tree is left exactly as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// The operation requires at least one value, but the tree is empty.
    #[error("tree is empty")]
    EmptyTree,

    /// The value being added is already stored in the tree.
    #[error("value is already present in the tree")]
    DuplicateValue,

    /// The value being removed is not stored in the tree.
    #[error("value is not present in the tree")]
    ValueNotFound,
}
