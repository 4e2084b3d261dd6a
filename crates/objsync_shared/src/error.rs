//! # Identifier Errors

use thiserror::Error;

/// Errors raised while decoding raw identifiers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KindError {
    /// The raw id belongs to neither object family.
    #[error("unknown object kind id {0:#x}")]
    UnknownObjectKind(u32),
}
