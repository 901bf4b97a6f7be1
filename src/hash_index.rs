use alloc::vec::Vec;
use core::ops::Range;

use crate::array_pool::shared;
use crate::container_helpers;

/// Locates `target` within the first `size` entries of a sorted hash array.
///
/// Returns the index of some entry whose hash equals `target`, or
/// `-(insertion_point) - 1` if no entry has that hash. The result is never a
/// valid index when negative; use [`decode`] to turn it into a `Result`.
///
/// Hashes are compared as signed 32-bit integers, so negative hash codes sort
/// before positive ones.
#[inline]
pub fn index_of(hashes: &[i32], size: usize, target: i32) -> isize {
    container_helpers::binary_search(hashes, size, target)
}

/// Decodes a signed search result into `Ok(index)` or `Err(insertion_point)`.
#[inline]
pub fn decode(result: isize) -> Result<usize, usize> {
    if result >= 0 {
        Ok(result as usize)
    } else {
        Err((-(result + 1)) as usize)
    }
}

/// A sorted array of 32-bit hash codes.
///
/// `HashIndex` stores no values. It answers where a hash lives (or would
/// live) and walks collision runs, leaving equality tests to the caller via
/// a closure over entry indices. The owning collection keeps its entry array
/// in lockstep with this one.
///
/// Entries with equal hashes form a contiguous run. New members of a run are
/// placed at its end, so a run keeps insertion order.
pub struct HashIndex {
    hashes: Vec<i32>,
}

impl HashIndex {
    /// Creates an empty index. Does not allocate.
    pub const fn new() -> Self {
        Self { hashes: Vec::new() }
    }

    /// Creates an index with room for at least `capacity` hashes.
    pub fn with_capacity(capacity: usize) -> Self {
        if capacity == 0 {
            return Self::new();
        }
        Self {
            hashes: shared::acquire(capacity),
        }
    }

    /// Number of hashes stored.
    #[inline]
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    /// Returns `true` if no hashes are stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Number of hashes the backing array holds without reallocating.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.hashes.capacity()
    }

    /// The stored hashes, in ascending order.
    #[inline]
    pub fn as_slice(&self) -> &[i32] {
        &self.hashes
    }

    /// Signed-encoded position of `hash`. See [`index_of`].
    #[inline]
    pub fn index_of(&self, hash: i32) -> isize {
        index_of(&self.hashes, self.hashes.len(), hash)
    }

    /// Position of some entry with `hash`, or the insertion point if none.
    #[inline]
    pub fn search(&self, hash: i32) -> Result<usize, usize> {
        decode(self.index_of(hash))
    }

    /// Bounds of the collision run containing `index`.
    pub fn run(&self, index: usize) -> Range<usize> {
        let hash = self.hashes[index];
        let mut start = index;
        while start > 0 && self.hashes[start - 1] == hash {
            start -= 1;
        }
        let mut end = index + 1;
        while end < self.hashes.len() && self.hashes[end] == hash {
            end += 1;
        }
        start..end
    }

    /// Finds the entry with `hash` for which `eq` holds.
    ///
    /// `eq` is called with candidate entry indices inside the collision run
    /// for `hash`. Returns `Ok(index)` for the matching entry, otherwise
    /// `Err(insertion_point)`; when the hash is present but no entry matches,
    /// the insertion point is the end of the run.
    pub fn find(&self, hash: i32, mut eq: impl FnMut(usize) -> bool) -> Result<usize, usize> {
        let index = self.search(hash)?;
        if eq(index) {
            return Ok(index);
        }

        let len = self.hashes.len();
        let mut end = index + 1;
        while end < len && self.hashes[end] == hash {
            if eq(end) {
                return Ok(end);
            }
            end += 1;
        }

        let mut i = index;
        while i > 0 && self.hashes[i - 1] == hash {
            i -= 1;
            if eq(i) {
                return Ok(i);
            }
        }

        Err(end)
    }

    /// Inserts `hash` at `index`, shifting later hashes right.
    ///
    /// The caller is responsible for keeping the array sorted and for having
    /// reserved capacity beforehand.
    #[inline]
    pub fn insert(&mut self, index: usize, hash: i32) {
        debug_assert!(self.hashes.len() < self.hashes.capacity());
        self.hashes.insert(index, hash);
    }

    /// Appends `hash` at the end.
    #[inline]
    pub fn push(&mut self, hash: i32) {
        debug_assert!(self.hashes.last().is_none_or(|&last| last <= hash));
        self.hashes.push(hash);
    }

    /// Removes the hash at `index`, shifting later hashes left.
    #[inline]
    pub fn remove(&mut self, index: usize) -> i32 {
        self.hashes.remove(index)
    }

    /// Removes every hash while keeping the backing array.
    #[inline]
    pub fn clear(&mut self) {
        self.hashes.clear();
    }

    /// Returns `true` if the hashes are in non-decreasing order.
    pub fn is_sorted(&self) -> bool {
        self.first_unsorted().is_none()
    }

    /// First index whose hash is smaller than its predecessor.
    pub fn first_unsorted(&self) -> Option<usize> {
        self.hashes
            .windows(2)
            .position(|pair| pair[0] > pair[1])
            .map(|i| i + 1)
    }

    pub(crate) fn hashes_mut(&mut self) -> &mut Vec<i32> {
        &mut self.hashes
    }

    /// Moves the live hashes into a pooled array of `capacity` slots and
    /// hands the old array back to the pool.
    pub(crate) fn reallocate(&mut self, capacity: usize) {
        debug_assert!(capacity >= self.hashes.len());
        let mut hashes = shared::acquire(capacity);
        hashes.extend_from_slice(&self.hashes);
        let old = core::mem::replace(&mut self.hashes, hashes);
        shared::release(old);
    }

    /// Returns the backing array to the pool, leaving the index empty and
    /// unallocated.
    pub(crate) fn release(&mut self) {
        let old = core::mem::take(&mut self.hashes);
        if old.capacity() != 0 {
            shared::release(old);
        }
    }
}

impl Default for HashIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for HashIndex {
    fn clone(&self) -> Self {
        let mut index = Self::with_capacity(self.len());
        index.hashes.extend_from_slice(&self.hashes);
        index
    }
}

impl core::fmt::Debug for HashIndex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.hashes.iter()).finish()
    }
}

impl Drop for HashIndex {
    fn drop(&mut self) {
        self.release();
    }
}
