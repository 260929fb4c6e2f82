//! Domain errors - Invariant violations of pages, frames and call stacks

use crate::domain::value_objects::{BranchId, PageId, PlayerId};
use thiserror::Error;

/// Domain-specific errors that represent broken runtime invariants
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    #[error("Page {page} has no command list {list}")]
    MissingCommandList { page: PageId, list: BranchId },

    #[error("Frame index {index} is past the end of list {list} (length {len})")]
    FrameIndexOutOfRange {
        list: BranchId,
        index: usize,
        len: usize,
    },

    #[error("Call stack is empty")]
    EmptyCallStack,

    #[error("Unsupported command kind '{kind}'")]
    UnsupportedCommand { kind: String },

    #[error("Invalid page: {reason}")]
    InvalidPage { reason: String },

    #[error("Lock on player {player} is poisoned")]
    PoisonedLock { player: PlayerId },
}

impl DomainError {
    pub fn invalid_page(reason: impl Into<String>) -> Self {
        Self::InvalidPage {
            reason: reason.into(),
        }
    }

    pub fn unsupported(kind: impl Into<String>) -> Self {
        Self::UnsupportedCommand { kind: kind.into() }
    }
}
