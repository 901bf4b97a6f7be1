#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

/// Backing-array recycling shared by all collections.
pub mod array_pool;

/// The hash-ordered entry array shared by the set and the map.
///
/// This module provides `ArrayTable`, which keeps entries sorted by a 32-bit
/// hash in a pair of parallel arrays, along with its entry API and cursor.
pub mod array_table;

/// A map storing key/value pairs in one hash-ordered array.
///
/// This module provides a `CompactMap` that wraps the `ArrayTable` and
/// provides a key-value map interface with configurable hashers.
pub mod compact_map;

/// A set storing its elements in one hash-ordered array.
///
/// This module provides a `CompactSet` that wraps the `ArrayTable` and
/// provides a standard set interface with configurable hashers.
pub mod compact_set;

pub mod container_helpers;

mod error;

/// Sorted hash arrays and the binary search over them.
pub mod hash_index;

pub use array_pool::ArrayPool;
pub use array_table::ArrayTable;
pub use compact_map::CompactMap;
pub use compact_map::Entry;
pub use compact_set::CompactSet;
pub use error::Error;
pub use error::Result;
pub use hash_index::HashIndex;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// Hasher builder used when none is specified.
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// Hasher builder used when none is specified.
        pub type DefaultHashBuilder = std::hash::RandomState;
    } else {
        compile_error!("either the `foldhash` or the `std` feature must be enabled");
    }
}
