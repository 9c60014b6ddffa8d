//! Error taxonomy shared by every striplat crate.
//!
//! Construction problems, move failures and swap I/O failures are all
//! reported through [`StripError`]. Nothing in the workspace retries on its
//! own; a caller that wants to recover from a move failure calls `reset`.

use std::io;

/// Primary error type for lattice construction, movement and swapping.
#[derive(Debug, thiserror::Error)]
pub enum StripError {
    /// The circumference `L` was zero.
    #[error("circumference must be positive")]
    ZeroCircumference,

    /// The RAM budget was zero.
    #[error("ram budget must be positive")]
    ZeroRamBudget,

    /// The RAM budget does not fit in this platform's address space.
    #[error("ram budget of {bytes} bytes is not addressable on this platform")]
    RamBudgetTooLarge { bytes: u64 },

    /// The derived page width is too narrow to ever shift safely.
    #[error(
        "ram budget yields a page width of {page_width} columns for circumference \
         {circumference}; at least 3 are required"
    )]
    WindowTooSmall { page_width: usize, circumference: u16 },

    /// Allocating the resident page buffers failed.
    #[error("out of memory allocating {bytes} bytes of page buffers")]
    OutOfMemory { bytes: usize },

    /// A page that was materialized before is neither in RAM nor on disk.
    #[error("page at origin {origin} was discarded and cannot be reconstructed")]
    PageUnavailable { origin: i64 },

    /// A swapped-out page image failed validation on reload.
    #[error("swap image for page at origin {origin} is corrupt: {detail}")]
    PageCorrupt { origin: i64, detail: String },

    /// The window would need a column beyond the range of `i64`.
    #[error("page at column {near} would leave the addressable range")]
    OutOfRange { near: i64 },

    /// Underlying file-system failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A horizontal move was attempted after a failed shift.
    #[error("lattice is unusable after a failed shift; reset it first")]
    Unusable,

    /// Broken internal invariant.
    #[error("internal error: {0}")]
    Internal(String),
}

impl StripError {
    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// True for errors reported by construction-time validation.
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ZeroCircumference
                | Self::ZeroRamBudget
                | Self::RamBudgetTooLarge { .. }
                | Self::WindowTooSmall { .. }
                | Self::OutOfMemory { .. }
        )
    }

    /// True when a shift could not obtain the page it needed.
    pub const fn is_move_failure(&self) -> bool {
        matches!(
            self,
            Self::PageUnavailable { .. }
                | Self::PageCorrupt { .. }
                | Self::OutOfRange { .. }
                | Self::Io(_)
                | Self::Unusable
        )
    }
}

/// Result type alias using [`StripError`].
pub type Result<T> = std::result::Result<T, StripError>;
