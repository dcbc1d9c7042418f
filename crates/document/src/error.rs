use css::{CssError, SheetError};
use dom::{NodeId, TreeError};
use thiserror::Error;

/// Failures reported by [`Document`](crate::Document) operations, named
/// after the DOM exceptions a browser would throw.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomException {
    #[error("SyntaxError: {0}")]
    Syntax(#[from] CssError),

    #[error("IndexSizeError: index {index} is out of range for {len} rules")]
    IndexSize { index: usize, len: usize },

    #[error("HierarchyRequestError: {0}")]
    HierarchyRequest(TreeError),

    #[error("NotFoundError: {0}")]
    NotFound(String),

    #[error("InvalidStateError: node {0:?} has no style sheet")]
    NoStyleSheet(NodeId),
}

impl From<SheetError> for DomException {
    fn from(err: SheetError) -> Self {
        match err {
            SheetError::Syntax(e) => DomException::Syntax(e),
            SheetError::IndexOutOfRange { index, len } => DomException::IndexSize { index, len },
        }
    }
}

impl From<TreeError> for DomException {
    fn from(err: TreeError) -> Self {
        match err {
            TreeError::HierarchyRequest { .. } => DomException::HierarchyRequest(err),
            TreeError::NoSuchNode(_) | TreeError::NotAChild { .. } => {
                DomException::NotFound(err.to_string())
            }
        }
    }
}
