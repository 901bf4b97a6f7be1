use alloc::vec::Vec;
use core::fmt::Debug;

use crate::array_pool::shared;
use crate::container_helpers::MAX_CAPACITY;
use crate::container_helpers::grow_size;
use crate::container_helpers::should_shrink;
use crate::container_helpers::shrink_size;
use crate::error::Error;
use crate::error::Result;
use crate::hash_index::HashIndex;

/// A hash-ordered array of entries.
///
/// `ArrayTable` pairs a [`HashIndex`] with an entry array kept in lockstep:
/// `entries()[i]` is the entry whose hash is `hashes()[i]`. Lookups binary
/// search the hash array and then scan the collision run with a caller
/// supplied equality predicate. Insertions and removals shift both arrays.
///
/// The table stores precomputed 32-bit hashes and never hashes entries
/// itself; [`CompactSet`] and [`CompactMap`] supply hashes and equality.
///
/// Capacity follows a fixed schedule: an empty table owns no allocation, the
/// first insertion allocates 4 slots, then 8, then grows by half. Removals
/// that leave a table less than half full (above 8 slots) move it into
/// smaller arrays. Arrays given up by either step are handed to the shared
/// [`ArrayPool`](crate::ArrayPool).
///
/// Every structural change (insertion of a new entry, removal, clearing)
/// advances [`generation`](Self::generation). [`Cursor`] uses it to detect
/// modifications made between its steps.
///
/// [`CompactSet`]: crate::CompactSet
/// [`CompactMap`]: crate::CompactMap
pub struct ArrayTable<E> {
    index: HashIndex,
    entries: Vec<E>,
    generation: u64,
}

impl<E> ArrayTable<E> {
    /// Creates an empty table. Does not allocate.
    pub const fn new() -> Self {
        Self {
            index: HashIndex::new(),
            entries: Vec::new(),
            generation: 0,
        }
    }

    /// Creates a table with room for at least `capacity` entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` exceeds [`MAX_CAPACITY`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use compact_hash::ArrayTable;
    ///
    /// let table: ArrayTable<String> = ArrayTable::with_capacity(10);
    /// assert!(table.capacity() >= 10);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        match Self::try_with_capacity(capacity) {
            Ok(table) => table,
            Err(err) => panic!("{err}"),
        }
    }

    /// Creates a table with room for at least `capacity` entries, rejecting
    /// capacities above [`MAX_CAPACITY`].
    pub fn try_with_capacity(capacity: usize) -> Result<Self> {
        check_capacity(capacity)?;
        if capacity == 0 {
            return Ok(Self::new());
        }
        Ok(Self {
            index: HashIndex::with_capacity(capacity),
            entries: shared::acquire(capacity),
            generation: 0,
        })
    }

    /// Number of live entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries the table holds before it must grow.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.index.capacity().min(self.entries.capacity())
    }

    /// Structural modification counter.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The hash array, sorted ascending.
    #[inline]
    pub fn hashes(&self) -> &[i32] {
        self.index.as_slice()
    }

    /// The entries, in hash order.
    #[inline]
    pub fn entries(&self) -> &[E] {
        &self.entries
    }

    /// The hash index backing this table.
    #[inline]
    pub fn index(&self) -> &HashIndex {
        &self.index
    }

    /// Position of the entry with `hash` matching `eq`, or where such an
    /// entry would be inserted.
    #[inline]
    pub fn find_index(&self, hash: i32, eq: impl Fn(&E) -> bool) -> core::result::Result<usize, usize> {
        self.index.find(hash, |i| eq(&self.entries[i]))
    }

    /// Returns the entry with `hash` matching `eq`.
    pub fn find(&self, hash: i32, eq: impl Fn(&E) -> bool) -> Option<&E> {
        self.find_index(hash, eq).ok().map(|i| &self.entries[i])
    }

    /// Returns a mutable reference to the entry with `hash` matching `eq`.
    ///
    /// The entry must keep the hash and identity it was inserted with.
    pub fn find_mut(&mut self, hash: i32, eq: impl Fn(&E) -> bool) -> Option<&mut E> {
        match self.find_index(hash, eq) {
            Ok(i) => Some(&mut self.entries[i]),
            Err(_) => None,
        }
    }

    /// Looks up the entry with `hash` matching `eq` for in-place
    /// manipulation.
    ///
    /// A vacant entry remembers its insertion point: the end of the collision
    /// run for `hash`, or where `hash` sorts if it is new.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use compact_hash::ArrayTable;
    /// use compact_hash::array_table::Entry;
    ///
    /// let mut table = ArrayTable::new();
    /// match table.entry(7, |v: &&str| *v == "seven") {
    ///     Entry::Vacant(entry) => {
    ///         entry.insert("seven");
    ///     }
    ///     Entry::Occupied(_) => unreachable!(),
    /// }
    /// assert_eq!(table.find(7, |v| *v == "seven"), Some(&"seven"));
    /// ```
    pub fn entry(&mut self, hash: i32, eq: impl Fn(&E) -> bool) -> Entry<'_, E> {
        match self.find_index(hash, eq) {
            Ok(index) => Entry::Occupied(OccupiedEntry { table: self, index }),
            Err(index) => Entry::Vacant(VacantEntry {
                table: self,
                hash,
                index,
            }),
        }
    }

    /// Removes and returns the entry with `hash` matching `eq`.
    pub fn remove(&mut self, hash: i32, eq: impl Fn(&E) -> bool) -> Option<E> {
        let index = self.find_index(hash, eq).ok()?;
        Some(self.take_at(index))
    }

    /// Removes and returns the entry at `index`.
    pub fn remove_at(&mut self, index: usize) -> Result<E> {
        if index >= self.len() {
            return Err(Error::out_of_bounds(index, self.len()));
        }
        Ok(self.take_at(index))
    }

    /// The entry at `index`, in hash order.
    #[inline]
    pub fn get_index(&self, index: usize) -> Option<&E> {
        self.entries.get(index)
    }

    /// Mutable access to the entry at `index`.
    ///
    /// The entry must keep the hash and identity it was inserted with.
    #[inline]
    pub fn get_index_mut(&mut self, index: usize) -> Option<&mut E> {
        self.entries.get_mut(index)
    }

    /// The hash of the entry at `index`.
    #[inline]
    pub fn hash_at(&self, index: usize) -> Option<i32> {
        self.index.as_slice().get(index).copied()
    }

    /// Adds an entry, taking a fast path when `hash` sorts at or after every
    /// stored hash.
    ///
    /// On the fast path the entry is pushed without looking for an equal
    /// entry, which is how bulk loads from already hash-ordered sources stay
    /// linear. Callers that cannot rule out duplicates should check with
    /// [`validate`](Self::validate) afterwards. Otherwise this behaves like
    /// an insert, replacing and returning a matching entry.
    pub fn append(&mut self, hash: i32, entry: E, eq: impl Fn(&E) -> bool) -> Option<E> {
        let sorts_last = self.index.as_slice().last().is_none_or(|&last| last <= hash);
        if !sorts_last {
            return match self.entry(hash, eq) {
                Entry::Occupied(mut occupied) => Some(core::mem::replace(occupied.get_mut(), entry)),
                Entry::Vacant(vacant) => {
                    vacant.insert(entry);
                    None
                }
            };
        }

        self.ensure_room();
        self.index.push(hash);
        self.entries.push(entry);
        self.generation = self.generation.wrapping_add(1);
        None
    }

    /// Checks that hashes are sorted and that no collision run holds two
    /// entries equal under `eq`.
    pub fn validate(&self, eq: impl Fn(&E, &E) -> bool) -> Result<()> {
        if let Some(index) = self.index.first_unsorted() {
            return Err(Error::Unsorted { index });
        }

        let hashes = self.index.as_slice();
        for i in 1..hashes.len() {
            let hash = hashes[i];
            let mut j = i;
            while j > 0 && hashes[j - 1] == hash {
                j -= 1;
                if eq(&self.entries[i], &self.entries[j]) {
                    return Err(Error::DuplicateKey { index: i });
                }
            }
        }
        Ok(())
    }

    /// Keeps only the entries for which `f` returns `true`.
    ///
    /// Returns `true` if any entry was removed.
    pub fn retain(&mut self, mut f: impl FnMut(&mut E) -> bool) -> bool {
        let mut guard = RetainGuard {
            hashes: self.index.hashes_mut(),
            generation: &mut self.generation,
            read: 0,
            write: 0,
        };
        self.entries.retain_mut(|entry| {
            let keep = f(entry);
            if keep {
                guard.hashes[guard.write] = guard.hashes[guard.read];
                guard.write += 1;
            }
            guard.read += 1;
            keep
        });
        let removed = guard.read != guard.write;
        drop(guard);

        if removed {
            self.maybe_shrink();
        }
        debug_assert!(self.index.is_sorted());
        removed
    }

    /// Removes every entry and hands both backing arrays to the pool,
    /// returning the table to its unallocated state.
    pub fn clear(&mut self) {
        self.clear_retaining_capacity();
        self.release_arrays();
    }

    /// Removes every entry but keeps the backing arrays for reuse.
    pub fn clear_retaining_capacity(&mut self) {
        if !self.entries.is_empty() {
            self.generation = self.generation.wrapping_add(1);
        }
        // Index first: an entry's `Drop` may panic partway through.
        self.index.clear();
        self.entries.clear();
    }

    /// Reserves capacity for at least `additional` more entries.
    ///
    /// # Panics
    ///
    /// Panics if the new capacity exceeds [`MAX_CAPACITY`].
    pub fn reserve(&mut self, additional: usize) {
        let required = self.len().saturating_add(additional);
        if let Err(err) = self.ensure_capacity(required) {
            panic!("{err}");
        }
    }

    /// Grows the backing arrays to hold at least `minimum` entries.
    pub fn ensure_capacity(&mut self, minimum: usize) -> Result<()> {
        check_capacity(minimum)?;
        if self.capacity() < minimum {
            self.reallocate(minimum);
        }
        Ok(())
    }

    /// Shrinks the backing arrays to fit the live entries.
    pub fn shrink_to_fit(&mut self) {
        if self.entries.is_empty() {
            self.release_arrays();
        } else if self.capacity() > self.len() {
            self.reallocate(self.len());
        }
    }

    /// Iterates over the entries in hash order.
    pub fn iter(&self) -> Iter<'_, E> {
        Iter {
            inner: self.entries.iter(),
        }
    }

    /// Iterates mutably over the entries in hash order.
    ///
    /// Entries must keep the hash and identity they were inserted with.
    pub fn iter_mut(&mut self) -> IterMut<'_, E> {
        IterMut {
            inner: self.entries.iter_mut(),
        }
    }

    /// Removes and yields every entry. The backing arrays are kept.
    pub fn drain(&mut self) -> Drain<'_, E> {
        if !self.entries.is_empty() {
            self.generation = self.generation.wrapping_add(1);
        }
        self.index.clear();
        Drain {
            inner: self.entries.drain(..),
        }
    }

    /// Starts a cursor at the first entry.
    pub fn cursor(&self) -> Cursor {
        Cursor {
            next: 0,
            current: None,
            generation: self.generation,
        }
    }

    #[inline]
    fn check_generation(&self, expected: u64) -> Result<()> {
        if expected == self.generation {
            Ok(())
        } else {
            Err(Error::ConcurrentModification {
                expected,
                found: self.generation,
            })
        }
    }

    fn insert_at(&mut self, index: usize, hash: i32, entry: E) -> &mut E {
        self.ensure_room();
        self.index.insert(index, hash);
        self.entries.insert(index, entry);
        self.generation = self.generation.wrapping_add(1);
        debug_assert!(self.index.is_sorted());
        &mut self.entries[index]
    }

    fn take_at(&mut self, index: usize) -> E {
        self.index.remove(index);
        let entry = self.entries.remove(index);
        self.generation = self.generation.wrapping_add(1);
        self.maybe_shrink();
        debug_assert!(self.index.is_sorted());
        entry
    }

    /// Grows the backing arrays if they are full.
    #[inline]
    fn ensure_room(&mut self) {
        let capacity = self.capacity();
        if self.len() < capacity {
            return;
        }
        let new_capacity = grow_size(capacity);
        assert!(new_capacity <= MAX_CAPACITY, "capacity overflow");
        log::trace!("growing array table from {capacity} to {new_capacity} slots");
        self.reallocate(new_capacity);
    }

    fn maybe_shrink(&mut self) {
        let capacity = self.capacity();
        if should_shrink(self.len(), capacity) {
            let new_capacity = shrink_size(self.len());
            log::trace!(
                "shrinking array table from {capacity} to {new_capacity} slots ({} live)",
                self.len()
            );
            self.reallocate(new_capacity);
        }
    }

    /// Moves the live entries into arrays of `capacity` slots drawn from the
    /// pool and releases the old arrays.
    fn reallocate(&mut self, capacity: usize) {
        debug_assert!(capacity >= self.len());
        let mut entries = shared::acquire(capacity);
        entries.extend(self.entries.drain(..));
        let old = core::mem::replace(&mut self.entries, entries);
        shared::release(old);
        self.index.reallocate(capacity);
    }

    fn release_arrays(&mut self) {
        let old = core::mem::take(&mut self.entries);
        if old.capacity() != 0 {
            log::trace!("releasing array table storage of {} slots", old.capacity());
            shared::release(old);
        }
        self.index.release();
    }
}

/// Keeps the hash array in lockstep with the entries `Vec::retain_mut` has
/// compacted, even when the predicate panics.
///
/// `Vec::retain_mut` shifts unvisited entries back over the removed ones on
/// unwind; dropping the guard does the same for their hashes.
struct RetainGuard<'a> {
    hashes: &'a mut Vec<i32>,
    generation: &'a mut u64,
    read: usize,
    write: usize,
}

impl Drop for RetainGuard<'_> {
    fn drop(&mut self) {
        if self.read == self.write {
            return;
        }
        let len = self.hashes.len();
        self.hashes.copy_within(self.read..len, self.write);
        self.hashes.truncate(len - (self.read - self.write));
        *self.generation = self.generation.wrapping_add(1);
    }
}

#[inline]
fn check_capacity(capacity: usize) -> Result<()> {
    if capacity > MAX_CAPACITY {
        return Err(Error::invalid_argument(alloc::format!(
            "capacity {capacity} exceeds maximum of {MAX_CAPACITY}"
        )));
    }
    Ok(())
}

impl<E> Default for ArrayTable<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Drop for ArrayTable<E> {
    fn drop(&mut self) {
        self.entries.clear();
        self.release_arrays();
    }
}

impl<E: Clone> Clone for ArrayTable<E> {
    fn clone(&self) -> Self {
        let mut entries = if self.is_empty() {
            Vec::new()
        } else {
            shared::acquire(self.len())
        };
        entries.extend(self.entries.iter().cloned());
        Self {
            index: self.index.clone(),
            entries,
            generation: 0,
        }
    }
}

impl<E: Debug> Debug for ArrayTable<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ArrayTable")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("generation", &self.generation)
            .field(
                "entries",
                &DebugEntries {
                    hashes: self.index.as_slice(),
                    entries: &self.entries,
                },
            )
            .finish()
    }
}

struct DebugEntries<'a, E> {
    hashes: &'a [i32],
    entries: &'a [E],
}

impl<E: Debug> Debug for DebugEntries<'_, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map()
            .entries(self.hashes.iter().zip(self.entries.iter()))
            .finish()
    }
}

impl<E> IntoIterator for ArrayTable<E> {
    type IntoIter = IntoIter<E>;
    type Item = E;

    fn into_iter(mut self) -> Self::IntoIter {
        IntoIter {
            inner: core::mem::take(&mut self.entries).into_iter(),
        }
    }
}

impl<'a, E> IntoIterator for &'a ArrayTable<E> {
    type IntoIter = Iter<'a, E>;
    type Item = &'a E;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A view into a single position of an [`ArrayTable`], which may be vacant
/// or occupied.
///
/// This enum is constructed by [`ArrayTable::entry`].
pub enum Entry<'a, E> {
    /// No entry matched; holds the insertion point.
    Vacant(VacantEntry<'a, E>),
    /// A matching entry exists.
    Occupied(OccupiedEntry<'a, E>),
}

impl<'a, E> Entry<'a, E> {
    /// Inserts `default` if vacant and returns a mutable reference to the
    /// entry.
    pub fn or_insert(self, default: E) -> &'a mut E {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the result of `default` if vacant and returns a mutable
    /// reference to the entry.
    pub fn or_insert_with(self, default: impl FnOnce() -> E) -> &'a mut E {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Position of the entry, or its insertion point if vacant.
    pub fn index(&self) -> usize {
        match self {
            Entry::Occupied(entry) => entry.index,
            Entry::Vacant(entry) => entry.index,
        }
    }
}

/// A vacant position in an [`ArrayTable`].
pub struct VacantEntry<'a, E> {
    table: &'a mut ArrayTable<E>,
    hash: i32,
    index: usize,
}

impl<'a, E> VacantEntry<'a, E> {
    /// The hash the entry will be stored under.
    pub fn hash(&self) -> i32 {
        self.hash
    }

    /// Position the entry will be inserted at.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Inserts `entry` at the remembered position, growing the table if it
    /// is full.
    pub fn insert(self, entry: E) -> &'a mut E {
        self.table.insert_at(self.index, self.hash, entry)
    }
}

/// An occupied position in an [`ArrayTable`].
pub struct OccupiedEntry<'a, E> {
    table: &'a mut ArrayTable<E>,
    index: usize,
}

impl<'a, E> OccupiedEntry<'a, E> {
    /// Position of the entry in hash order.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The entry.
    pub fn get(&self) -> &E {
        &self.table.entries[self.index]
    }

    /// Mutable access to the entry.
    pub fn get_mut(&mut self) -> &mut E {
        &mut self.table.entries[self.index]
    }

    /// Converts into a mutable reference bound to the table's lifetime.
    pub fn into_mut(self) -> &'a mut E {
        &mut self.table.entries[self.index]
    }

    /// Removes the entry, shifting later entries left.
    pub fn remove(self) -> E {
        self.table.take_at(self.index)
    }
}

/// A detached iteration position over an [`ArrayTable`].
///
/// Unlike [`Iter`], a cursor does not borrow the table between steps, so the
/// table may be mutated while a cursor is live. Removing through the cursor
/// itself keeps it aligned. Any other structural change is detected on the
/// next step and reported as [`Error::ConcurrentModification`]. Detection
/// compares generation counters and is a best-effort check, not a
/// synchronization mechanism.
#[derive(Debug, Clone)]
pub struct Cursor {
    next: usize,
    current: Option<usize>,
    generation: u64,
}

impl Cursor {
    /// Returns `true` if another entry remains.
    pub fn has_next<E>(&self, table: &ArrayTable<E>) -> bool {
        self.next < table.len()
    }

    /// Advances to the next entry and returns it.
    ///
    /// Fails with [`Error::EndOfSequence`] past the last entry and with
    /// [`Error::ConcurrentModification`] if the table changed structurally
    /// since the cursor last synchronized with it.
    pub fn next<'a, E>(&mut self, table: &'a ArrayTable<E>) -> Result<&'a E> {
        table.check_generation(self.generation)?;
        let entry = table.entries.get(self.next).ok_or(Error::EndOfSequence)?;
        self.current = Some(self.next);
        self.next += 1;
        Ok(entry)
    }

    /// Removes the entry last returned by [`next`](Self::next).
    ///
    /// The cursor steps back so that the entry shifted into the freed slot is
    /// returned by the following `next`.
    pub fn remove<E>(&mut self, table: &mut ArrayTable<E>) -> Result<E> {
        table.check_generation(self.generation)?;
        let current = self.current.take().ok_or(Error::NoCurrentElement)?;
        let entry = table.take_at(current);
        self.next = current;
        self.generation = table.generation;
        Ok(entry)
    }
}

/// An iterator over the entries of an [`ArrayTable`], in hash order.
pub struct Iter<'a, E> {
    inner: core::slice::Iter<'a, E>,
}

impl<'a, E> Iterator for Iter<'a, E> {
    type Item = &'a E;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<E> DoubleEndedIterator for Iter<'_, E> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

impl<E> ExactSizeIterator for Iter<'_, E> {}

impl<E> Clone for Iter<'_, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// A mutable iterator over the entries of an [`ArrayTable`].
pub struct IterMut<'a, E> {
    inner: core::slice::IterMut<'a, E>,
}

impl<'a, E> Iterator for IterMut<'a, E> {
    type Item = &'a mut E;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<E> ExactSizeIterator for IterMut<'_, E> {}

/// A draining iterator over the entries of an [`ArrayTable`].
pub struct Drain<'a, E> {
    inner: alloc::vec::Drain<'a, E>,
}

impl<E> Iterator for Drain<'_, E> {
    type Item = E;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// A consuming iterator over the entries of an [`ArrayTable`].
pub struct IntoIter<E> {
    inner: alloc::vec::IntoIter<E>,
}

impl<E> Iterator for IntoIter<E> {
    type Item = E;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
