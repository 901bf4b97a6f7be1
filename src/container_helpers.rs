//! Small pure helpers shared by the array-backed collections.
//!
//! These are the sizing rules and search primitives the collections are
//! parameterized over: the growth-step arithmetic, a null-safe equality
//! predicate and the raw signed binary search.
//!
//! The empty-array constants, the `ideal_*_array_size` functions and
//! [`binary_search_long`] are not used by [`CompactSet`](crate::CompactSet)
//! or [`CompactMap`](crate::CompactMap), whose empty tables hold no
//! allocation at all. They are public for callers that keep their own
//! hash-sorted arrays and want the same sizing and search rules.

use core::hash::BuildHasher;
use core::hash::Hash;

/// Zero-length hash array for callers managing their own hash arrays.
///
/// The collections themselves use an unallocated `Vec` when empty.
pub const EMPTY_INTS: &[i32] = &[];

/// Zero-length array of 64-bit codes. Not used by the collections.
pub const EMPTY_LONGS: &[i64] = &[];

/// Capacity a collection grows to on its first insertion.
pub const BASE_SIZE: usize = 4;

/// Capacities at or below this are never shrunk.
pub const SHRINK_FLOOR: usize = BASE_SIZE * 2;

/// Largest capacity the collections accept.
///
/// Positions are reported through signed 32-bit search results, so the live
/// prefix must stay addressable by an `i32`.
pub const MAX_CAPACITY: usize = i32::MAX as usize;

/// Rounds `need` bytes up to an allocation size that leaves room for a
/// typical 12-byte array header.
///
/// The collections size their arrays with [`grow_size`] and
/// [`shrink_size`] instead; this is for callers allocating their own.
pub fn ideal_byte_array_size(need: usize) -> usize {
    for i in 4..32 {
        let candidate = (1usize << i) - 12;
        if need <= candidate {
            return candidate;
        }
    }
    need
}

/// [`ideal_byte_array_size`] expressed in 32-bit elements.
pub fn ideal_int_array_size(need: usize) -> usize {
    ideal_byte_array_size(need.saturating_mul(4)) / 4
}

/// [`ideal_byte_array_size`] expressed in 64-bit elements.
pub fn ideal_long_array_size(need: usize) -> usize {
    ideal_byte_array_size(need.saturating_mul(8)) / 8
}

/// Next capacity for a full collection of `capacity` slots.
///
/// Small collections jump straight to 4 and then 8 slots; past that the
/// capacity grows by half again.
#[inline]
pub fn grow_size(capacity: usize) -> usize {
    if capacity >= BASE_SIZE * 2 {
        capacity + (capacity >> 1)
    } else if capacity >= BASE_SIZE {
        BASE_SIZE * 2
    } else {
        BASE_SIZE
    }
}

/// Whether a collection of `size` live entries in `capacity` slots should
/// release some of its storage.
#[inline]
pub fn should_shrink(size: usize, capacity: usize) -> bool {
    capacity > SHRINK_FLOOR && size < capacity / 2
}

/// Capacity to shrink to when `size` entries remain.
#[inline]
pub fn shrink_size(size: usize) -> usize {
    if size > SHRINK_FLOOR {
        size + (size >> 1)
    } else {
        SHRINK_FLOOR
    }
}

/// Null-safe equality: two absent values are equal, an absent and a present
/// value never are.
#[inline]
pub fn equal<T: PartialEq + ?Sized>(a: Option<&T>, b: Option<&T>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Binary search over the first `size` elements of a sorted `array`.
///
/// Returns the index of a matching element, or `-(insertion_point) - 1` when
/// `value` is absent. No argument validation is performed beyond slice
/// bounds; `size` must not exceed `array.len()`.
pub fn binary_search(array: &[i32], size: usize, value: i32) -> isize {
    search_sorted(&array[..size], value)
}

/// [`binary_search`] over 64-bit values.
///
/// The collections only search 32-bit hashes; this is for callers keeping
/// sorted arrays of 64-bit codes.
pub fn binary_search_long(array: &[i64], size: usize, value: i64) -> isize {
    search_sorted(&array[..size], value)
}

#[inline]
fn search_sorted<N: Ord + Copy>(array: &[N], value: N) -> isize {
    let mut lo = 0usize;
    let mut hi = array.len();
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        let mid_val = array[mid];
        if mid_val < value {
            lo = mid + 1;
        } else if mid_val > value {
            hi = mid;
        } else {
            return mid as isize;
        }
    }
    -(lo as isize) - 1
}

/// Folds a 64-bit hasher output into the 32-bit code stored in hash arrays.
#[inline(always)]
pub fn fold_hash(hash: u64) -> i32 {
    (hash ^ (hash >> 32)) as u32 as i32
}

/// Hashes `value` with `hash_builder` and folds the result to the 32-bit
/// code the collections sort by.
#[inline]
pub fn hash_code<Q: Hash + ?Sized, S: BuildHasher>(hash_builder: &S, value: &Q) -> i32 {
    fold_hash(hash_builder.hash_one(value))
}

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        type ContentHashBuilder = foldhash::fast::FixedState;
    } else {
        type ContentHashBuilder = core::hash::BuildHasherDefault<std::hash::DefaultHasher>;
    }
}

/// Hashes `value` with a fixed-seed hasher.
///
/// Unlike [`hash_code`], the result does not depend on any collection's
/// hasher builder, so equal values give equal codes in every collection and
/// every process. Whole-collection hash codes are built from it.
#[inline]
pub fn content_hash<Q: Hash + ?Sized>(value: &Q) -> i32 {
    fold_hash(ContentHashBuilder::default().hash_one(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grow_size_steps() {
        assert_eq!(grow_size(0), 4);
        assert_eq!(grow_size(3), 4);
        assert_eq!(grow_size(4), 8);
        assert_eq!(grow_size(7), 8);
        assert_eq!(grow_size(8), 12);
        assert_eq!(grow_size(12), 18);
        assert_eq!(grow_size(100), 150);
    }

    #[test]
    fn test_shrink_policy() {
        assert!(!should_shrink(0, 8));
        assert!(!should_shrink(6, 12));
        assert!(should_shrink(5, 12));
        assert!(should_shrink(0, 12));
        assert_eq!(shrink_size(0), 8);
        assert_eq!(shrink_size(8), 8);
        assert_eq!(shrink_size(20), 30);

        // The shrunk capacity always holds the remaining entries and is
        // strictly smaller than the capacity that triggered the shrink.
        for capacity in 9..500 {
            for size in 0..capacity {
                if should_shrink(size, capacity) {
                    let target = shrink_size(size);
                    assert!(target >= size);
                    assert!(target < capacity, "{size} {capacity} {target}");
                }
            }
        }
    }

    #[test]
    fn test_ideal_sizes() {
        assert_eq!(ideal_byte_array_size(0), 4);
        assert_eq!(ideal_byte_array_size(4), 4);
        assert_eq!(ideal_byte_array_size(5), 20);
        assert_eq!(ideal_byte_array_size(100), 116);
        assert_eq!(ideal_int_array_size(1), 1);
        assert_eq!(ideal_int_array_size(2), 5);
        assert_eq!(ideal_long_array_size(3), 6);
    }

    #[test]
    fn test_equal() {
        assert!(equal::<i32>(None, None));
        assert!(!equal(Some(&1), None));
        assert!(!equal(None, Some(&1)));
        assert!(equal(Some(&1), Some(&1)));
        assert!(!equal(Some("a"), Some("b")));
    }

    #[test]
    fn test_binary_search_encoding() {
        let array = [-5, -1, 3, 3, 9, 0, 0];
        assert_eq!(binary_search(&array, 0, 3), -1);
        assert_eq!(binary_search(&array, 5, -5), 0);
        assert_eq!(binary_search(&array, 5, 9), 4);
        assert!(matches!(binary_search(&array, 5, 3), 2 | 3));
        assert_eq!(binary_search(&array, 5, -10), -1);
        assert_eq!(binary_search(&array, 5, 0), -3);
        assert_eq!(binary_search(&array, 5, 100), -6);

        let longs = [i64::MIN, 0, i64::MAX];
        assert_eq!(binary_search_long(&longs, 3, 0), 1);
        assert_eq!(binary_search_long(&longs, 3, 1), -3);
        assert_eq!(binary_search_long(EMPTY_LONGS, 0, 1), -1);
    }

    #[test]
    fn test_fold_hash() {
        assert_eq!(fold_hash(0), 0);
        assert_eq!(fold_hash(7), 7);
        assert_eq!(fold_hash((-3i32) as u32 as u64), -3);
        assert_eq!(fold_hash(1 << 32), 1);
    }
}
