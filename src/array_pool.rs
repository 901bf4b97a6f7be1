//! Recycling of backing arrays.
//!
//! Small collections churn through the same few array sizes as they grow
//! from empty to [`BASE_SIZE`] to `2 * BASE_SIZE` slots and shrink back. The
//! pool keeps released allocations of those two sizes and hands them to the
//! next collection that needs one, instead of going back to the allocator.
//!
//! Allocations are keyed by their byte [`Layout`], not by element type: an
//! array of eight `i32` hashes and an array of eight `(u16, u16)` pairs share
//! a free list. Larger arrays and zero-sized layouts are never pooled.

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::alloc::Layout;
use core::mem::ManuallyDrop;
use core::ptr::NonNull;

use crate::container_helpers::BASE_SIZE;

/// Number of arrays kept per size class by default.
pub const DEFAULT_BUCKET_LIMIT: usize = 10;

/// Capacities that are pooled, by bucket.
const CLASS_CAPACITIES: [usize; 2] = [BASE_SIZE, BASE_SIZE * 2];

/// Bucket serving a request for `capacity` slots.
#[inline(always)]
fn request_class(capacity: usize) -> Option<usize> {
    if capacity == 0 {
        None
    } else if capacity <= CLASS_CAPACITIES[0] {
        Some(0)
    } else if capacity <= CLASS_CAPACITIES[1] {
        Some(1)
    } else {
        None
    }
}

/// Bucket accepting a released array with exactly `capacity` slots.
#[inline(always)]
fn release_class(capacity: usize) -> Option<usize> {
    CLASS_CAPACITIES.iter().position(|&c| c == capacity)
}

/// A released allocation waiting for reuse.
struct FreeArray {
    ptr: NonNull<u8>,
    layout: Layout,
}

// SAFETY: A `FreeArray` is an owned, uninitialized heap block with no
// element values in it. Ownership moves with the struct, so sending it to
// another thread is sound.
unsafe impl Send for FreeArray {}

impl FreeArray {
    /// Frees the allocation.
    ///
    /// # Safety
    /// `self` must have been produced by [`ArrayPool::release`], so `ptr` was
    /// allocated by the global allocator with `layout`.
    unsafe fn dealloc(self) {
        // SAFETY: Guaranteed by the caller.
        unsafe { alloc::alloc::dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

/// Counters describing how well a pool is being reused.
#[cfg(feature = "stats")]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Requests served from a free list
    pub hits: u64,
    /// Requests in a pooled size class that had to allocate
    pub misses: u64,
    /// Arrays accepted into a free list
    pub released: u64,
    /// Arrays freed because their free list was full
    pub evicted: u64,
}

#[cfg(feature = "stats")]
impl PoolStats {
    const fn new() -> Self {
        Self {
            hits: 0,
            misses: 0,
            released: 0,
            evicted: 0,
        }
    }
}

/// Size-bucketed free lists of backing arrays.
///
/// Each bucket holds at most `bucket_limit` arrays; releasing into a full
/// bucket frees the oldest array in it.
pub struct ArrayPool {
    buckets: [VecDeque<FreeArray>; 2],
    bucket_limit: usize,
    #[cfg(feature = "stats")]
    stats: PoolStats,
}

impl ArrayPool {
    /// Creates an empty pool keeping up to [`DEFAULT_BUCKET_LIMIT`] arrays per
    /// size class.
    pub const fn new() -> Self {
        Self::with_bucket_limit(DEFAULT_BUCKET_LIMIT)
    }

    /// Creates an empty pool keeping up to `bucket_limit` arrays per size
    /// class. A limit of zero disables pooling.
    pub const fn with_bucket_limit(bucket_limit: usize) -> Self {
        Self {
            buckets: [VecDeque::new(), VecDeque::new()],
            bucket_limit,
            #[cfg(feature = "stats")]
            stats: PoolStats::new(),
        }
    }

    /// Returns an empty array with room for at least `capacity` elements,
    /// reusing a pooled allocation when one of the right layout is free.
    pub fn acquire<E>(&mut self, capacity: usize) -> Vec<E> {
        let Some(bucket) = request_class(capacity) else {
            return Vec::with_capacity(capacity);
        };
        let class_capacity = CLASS_CAPACITIES[bucket];
        if size_of::<E>() == 0 {
            return Vec::with_capacity(class_capacity);
        }

        if let Ok(layout) = Layout::array::<E>(class_capacity) {
            let free_list = &mut self.buckets[bucket];
            if let Some(position) = free_list.iter().position(|free| free.layout == layout)
                && let Some(free) = free_list.remove(position)
            {
                #[cfg(feature = "stats")]
                {
                    self.stats.hits += 1;
                }
                // SAFETY: `free` was produced by `release` from a `Vec` whose
                // allocation has exactly `layout`, which we just matched
                // against `Layout::array::<E>(class_capacity)`. Size and
                // alignment therefore agree with a `Vec<E>` of that capacity,
                // and a length of zero means no element is assumed
                // initialized.
                let ptr = free.ptr.as_ptr().cast::<E>();
                return unsafe { Vec::from_raw_parts(ptr, 0, class_capacity) };
            }
        }

        #[cfg(feature = "stats")]
        {
            self.stats.misses += 1;
        }
        Vec::with_capacity(class_capacity)
    }

    /// Takes back an array that is no longer needed.
    ///
    /// Remaining elements are dropped. The allocation is kept if its capacity
    /// is a pooled size class, and freed otherwise.
    pub fn release<E>(&mut self, mut array: Vec<E>) {
        array.clear();
        let Some(bucket) = poolable::<E>(array.capacity()) else {
            return;
        };
        let Ok(layout) = Layout::array::<E>(array.capacity()) else {
            return;
        };
        if self.bucket_limit == 0 {
            return;
        }

        let mut array = ManuallyDrop::new(array);
        // SAFETY: `array` has a non-zero capacity and a non-zero element size
        // (checked by `poolable`), so its pointer is a live heap allocation.
        let ptr = unsafe { NonNull::new_unchecked(array.as_mut_ptr().cast::<u8>()) };

        let free_list = &mut self.buckets[bucket];
        if free_list.len() >= self.bucket_limit
            && let Some(oldest) = free_list.pop_front()
        {
            log::debug!(
                "array pool bucket {} full, evicting {} bytes",
                CLASS_CAPACITIES[bucket],
                oldest.layout.size()
            );
            #[cfg(feature = "stats")]
            {
                self.stats.evicted += 1;
            }
            // SAFETY: Every entry in a free list came from `release`.
            unsafe { oldest.dealloc() };
        }
        free_list.push_back(FreeArray { ptr, layout });
        #[cfg(feature = "stats")]
        {
            self.stats.released += 1;
        }
    }

    /// Number of arrays currently held.
    pub fn pooled(&self) -> usize {
        self.buckets.iter().map(VecDeque::len).sum()
    }

    /// Frees every pooled array.
    pub fn purge(&mut self) {
        let freed = self.pooled();
        for bucket in self.buckets.iter_mut() {
            for free in bucket.drain(..) {
                // SAFETY: Every entry in a free list came from `release`.
                unsafe { free.dealloc() };
            }
        }
        if freed > 0 {
            log::debug!("array pool purged {freed} arrays");
        }
    }

    /// Reuse counters since the pool was created.
    #[cfg(feature = "stats")]
    pub fn stats(&self) -> PoolStats {
        self.stats
    }
}

impl Default for ArrayPool {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ArrayPool {
    fn drop(&mut self) {
        self.purge();
    }
}

impl core::fmt::Debug for ArrayPool {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ArrayPool")
            .field("small", &self.buckets[0].len())
            .field("medium", &self.buckets[1].len())
            .field("bucket_limit", &self.bucket_limit)
            .finish()
    }
}

/// Bucket for a released `Vec<E>` of `capacity`, if it can be pooled at all.
#[inline(always)]
fn poolable<E>(capacity: usize) -> Option<usize> {
    if size_of::<E>() == 0 {
        return None;
    }
    release_class(capacity)
}

/// The process-wide pool shared by every collection.
///
/// With the `std` feature the pool lives behind a mutex and all collections
/// in the process draw from it. Without `std` there is no shared state:
/// acquiring allocates and releasing frees.
pub mod shared {
    use alloc::vec::Vec;

    #[cfg(feature = "stats")]
    use super::PoolStats;

    cfg_if::cfg_if! {
        if #[cfg(feature = "std")] {
            use std::sync::Mutex;
            use std::sync::PoisonError;

            use super::ArrayPool;
            use super::poolable;
            use super::request_class;

            static POOL: Mutex<ArrayPool> = Mutex::new(ArrayPool::new());

            fn with_pool<R>(f: impl FnOnce(&mut ArrayPool) -> R) -> R {
                // The pool has no invariant a panicking holder could leave
                // half-updated, so a poisoned lock is still usable.
                let mut pool = POOL.lock().unwrap_or_else(PoisonError::into_inner);
                f(&mut pool)
            }

            /// Returns an empty array with room for at least `capacity`
            /// elements, from the shared pool when possible.
            pub fn acquire<E>(capacity: usize) -> Vec<E> {
                if request_class(capacity).is_none() || size_of::<E>() == 0 {
                    return Vec::with_capacity(capacity);
                }
                with_pool(|pool| pool.acquire(capacity))
            }

            /// Hands an array back to the shared pool.
            pub fn release<E>(mut array: Vec<E>) {
                // Element destructors may themselves release arrays, so they
                // must run before the lock is taken.
                array.clear();
                if poolable::<E>(array.capacity()).is_none() {
                    return;
                }
                with_pool(|pool| pool.release(array));
            }

            /// Number of arrays held by the shared pool.
            pub fn pooled() -> usize {
                with_pool(|pool| pool.pooled())
            }

            /// Frees every array held by the shared pool.
            pub fn purge() {
                with_pool(ArrayPool::purge);
            }

            /// Reuse counters of the shared pool.
            #[cfg(feature = "stats")]
            pub fn stats() -> PoolStats {
                with_pool(|pool| pool.stats())
            }
        } else {
            use super::CLASS_CAPACITIES;
            use super::request_class;

            /// Returns an empty array with room for at least `capacity`
            /// elements.
            pub fn acquire<E>(capacity: usize) -> Vec<E> {
                match request_class(capacity) {
                    Some(bucket) => Vec::with_capacity(CLASS_CAPACITIES[bucket]),
                    None => Vec::with_capacity(capacity),
                }
            }

            /// Frees an array.
            pub fn release<E>(array: Vec<E>) {
                drop(array);
            }

            /// Always zero: there is no shared pool without `std`.
            pub fn pooled() -> usize {
                0
            }

            /// Nothing to free without `std`.
            pub fn purge() {}

            /// Always empty without `std`.
            #[cfg(feature = "stats")]
            pub fn stats() -> PoolStats {
                PoolStats::default()
            }
        }
    }
}
