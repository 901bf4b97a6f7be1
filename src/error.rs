use alloc::string::String;

use thiserror::Error;

/// Errors reported by the compact collections.
///
/// Looking up or removing an absent key is never an error; those operations
/// return `None` or `false`. Errors are reserved for invalid arguments,
/// positional access out of range, and cursor misuse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An argument was rejected at the API boundary.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the rejected argument
        message: String,
    },

    /// A positional accessor was given an index past the live entries.
    #[error("index {index} out of bounds for length {len}")]
    OutOfBounds {
        /// The requested index
        index: usize,
        /// The number of live entries
        len: usize,
    },

    /// A cursor was advanced past its last entry.
    #[error("no more entries")]
    EndOfSequence,

    /// The collection was structurally modified behind a cursor's back.
    #[error("concurrent modification: expected generation {expected}, found {found}")]
    ConcurrentModification {
        /// Generation observed when the cursor last synchronized
        expected: u64,
        /// Generation of the collection now
        found: u64,
    },

    /// `remove` was called on a cursor that has no current entry.
    #[error("cursor has no current entry")]
    NoCurrentElement,

    /// The hash array is not sorted at `index`.
    #[error("hash array out of order at index {index}")]
    Unsorted {
        /// First index whose hash is smaller than its predecessor
        index: usize,
    },

    /// Two equal keys were found at `index` and an earlier slot.
    #[error("duplicate key at index {index}")]
    DuplicateKey {
        /// Index of the later duplicate
        index: usize,
    },
}

impl Error {
    /// Create an invalid argument error.
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an out of bounds error.
    pub fn out_of_bounds(index: usize, len: usize) -> Self {
        Self::OutOfBounds { index, len }
    }
}

/// Result type specialized for this crate's errors.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            Error::out_of_bounds(5, 3).to_string(),
            "index 5 out of bounds for length 3"
        );
        assert_eq!(
            Error::invalid_argument("capacity too large").to_string(),
            "invalid argument: capacity too large"
        );
        assert_eq!(
            Error::ConcurrentModification {
                expected: 1,
                found: 2
            }
            .to_string(),
            "concurrent modification: expected generation 1, found 2"
        );
    }
}
