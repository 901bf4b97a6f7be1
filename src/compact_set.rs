use core::borrow::Borrow;
use core::fmt::Debug;
use core::fmt::Display;
use core::hash::BuildHasher;
use core::hash::Hash;

use crate::DefaultHashBuilder;
use crate::array_table::ArrayTable;
use crate::array_table::Cursor;
use crate::array_table::Entry as TableEntry;
use crate::container_helpers::content_hash;
use crate::container_helpers::hash_code;
use crate::error::Result;

/// A hash set stored as a hash-ordered array.
///
/// `CompactSet<T, S>` stores values of type `T` where `T` implements
/// `Hash + Eq` and uses a configurable hasher builder `S` to hash values.
/// Elements live in one array sorted by their 32-bit hash code, next to a
/// parallel array of the codes themselves.
///
/// # Performance Characteristics
///
/// - **Memory**: 4 bytes per entry overhead, plus the size of `T`. An empty
///   set owns no allocation.
/// - **Lookup**: binary search over the hash codes, then a scan of the run
///   of equal codes.
/// - **Insert/remove**: shifts the tail of both arrays.
///
/// Iteration visits elements in ascending hash order.
#[derive(Clone)]
pub struct CompactSet<T, S = DefaultHashBuilder> {
    table: ArrayTable<T>,
    hash_builder: S,
}

impl<T, S, S2> PartialEq<CompactSet<T, S2>> for CompactSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
    S2: BuildHasher,
{
    fn eq(&self, other: &CompactSet<T, S2>) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter().all(|v| other.contains(v))
    }
}

impl<T, S> Eq for CompactSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
}

#[cfg(feature = "std")]
impl<T, S, S2> PartialEq<std::collections::HashSet<T, S2>> for CompactSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
    S2: BuildHasher,
{
    fn eq(&self, other: &std::collections::HashSet<T, S2>) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter().all(|v| other.contains(v))
    }
}

#[cfg(feature = "std")]
impl<T, S, S2> PartialEq<CompactSet<T, S>> for std::collections::HashSet<T, S2>
where
    T: Hash + Eq,
    S: BuildHasher,
    S2: BuildHasher,
{
    fn eq(&self, other: &CompactSet<T, S>) -> bool {
        other == self
    }
}

impl<T, S> Debug for CompactSet<T, S>
where
    T: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.table.iter()).finish()
    }
}

impl<T, S> Display for CompactSet<T, S>
where
    T: Display,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("{")?;
        for (i, value) in self.table.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            Display::fmt(value, f)?;
        }
        f.write_str("}")
    }
}

impl<T, S> CompactSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    /// Creates a new set with the given hasher builder. Does not allocate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(feature = "std")]
    /// # {
    /// use std::collections::hash_map::RandomState;
    ///
    /// use compact_hash::CompactSet;
    ///
    /// let set: CompactSet<i32, _> = CompactSet::with_hasher(RandomState::new());
    /// assert!(set.is_empty());
    /// assert_eq!(set.capacity(), 0);
    /// # }
    /// ```
    pub fn with_hasher(hash_builder: S) -> Self {
        Self {
            table: ArrayTable::new(),
            hash_builder,
        }
    }

    /// Creates a new set with room for at least `capacity` elements.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` exceeds
    /// [`MAX_CAPACITY`](crate::container_helpers::MAX_CAPACITY).
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self {
            table: ArrayTable::with_capacity(capacity),
            hash_builder,
        }
    }

    /// Creates a new set with room for at least `capacity` elements,
    /// rejecting capacities the set cannot address.
    pub fn try_with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Result<Self> {
        Ok(Self {
            table: ArrayTable::try_with_capacity(capacity)?,
            hash_builder,
        })
    }

    /// Returns the number of elements in the set.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use compact_hash::CompactSet;
    ///
    /// let mut set: CompactSet<i32> = CompactSet::new();
    /// assert_eq!(set.len(), 0);
    /// set.insert(1);
    /// assert_eq!(set.len(), 1);
    /// ```
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the set contains no elements.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of elements the set holds before it must grow.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns a reference to the set's hasher builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Removes all elements and releases the backing arrays.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use compact_hash::CompactSet;
    ///
    /// let mut set: CompactSet<i32> = CompactSet::new();
    /// set.insert(1);
    /// set.clear();
    /// assert!(set.is_empty());
    /// assert_eq!(set.capacity(), 0);
    /// ```
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Removes all elements but keeps the backing arrays.
    pub fn clear_retaining_capacity(&mut self) {
        self.table.clear_retaining_capacity();
    }

    /// Shrinks the capacity of the set as much as possible.
    pub fn shrink_to_fit(&mut self) {
        self.table.shrink_to_fit();
    }

    /// Reserves capacity for at least `additional` more elements.
    pub fn reserve(&mut self, additional: usize) {
        self.table.reserve(additional);
    }

    /// Grows the set to hold at least `minimum` elements without further
    /// allocation.
    pub fn ensure_capacity(&mut self, minimum: usize) -> Result<()> {
        self.table.ensure_capacity(minimum)
    }

    /// Adds a value to the set.
    ///
    /// Returns whether the value was newly inserted. A value whose hash
    /// collides with existing elements is placed after them.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use compact_hash::CompactSet;
    ///
    /// let mut set: CompactSet<i32> = CompactSet::new();
    /// assert_eq!(set.insert(37), true);
    /// assert_eq!(set.insert(37), false);
    /// assert_eq!(set.len(), 1);
    /// ```
    pub fn insert(&mut self, value: T) -> bool {
        let hash = hash_code(&self.hash_builder, &value);
        match self.table.entry(hash, |v| v == &value) {
            TableEntry::Occupied(_) => false,
            TableEntry::Vacant(entry) => {
                entry.insert(value);
                true
            }
        }
    }

    /// Adds a value to the set, replacing the existing value, if any, that is
    /// equal to the given one. Returns the replaced value.
    pub fn replace(&mut self, value: T) -> Option<T> {
        let hash = hash_code(&self.hash_builder, &value);
        match self.table.entry(hash, |v| v == &value) {
            TableEntry::Occupied(mut entry) => Some(core::mem::replace(entry.get_mut(), value)),
            TableEntry::Vacant(entry) => {
                entry.insert(value);
                None
            }
        }
    }

    /// Adds a value, pushing it at the end without a duplicate check when
    /// its hash sorts after every stored element.
    ///
    /// Meant for filling a set from a source already ordered by hash, such
    /// as another set built with the same hasher. Use
    /// [`validate`](Self::validate) to check the result when the source may
    /// contain duplicates.
    pub fn append(&mut self, value: T) {
        let hash = hash_code(&self.hash_builder, &value);
        let sorts_last = self.table.hashes().last().is_none_or(|&last| last <= hash);
        if sorts_last {
            self.table.append(hash, value, |_| false);
        } else {
            self.replace(value);
        }
    }

    /// Checks the ordering and uniqueness invariants of the set.
    pub fn validate(&self) -> Result<()> {
        self.table.validate(|a, b| a == b)
    }

    /// Returns `true` if the set contains a value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use compact_hash::CompactSet;
    ///
    /// let mut set: CompactSet<String> = CompactSet::new();
    /// set.insert("a".to_string());
    /// assert!(set.contains("a"));
    /// assert!(!set.contains("b"));
    /// ```
    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index_of(value).is_some()
    }

    /// Returns a reference to the value in the set, if any, that is equal to
    /// the given value.
    pub fn get<Q>(&self, value: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = hash_code(&self.hash_builder, value);
        self.table.find(hash, |v| v.borrow() == value)
    }

    /// Returns the position of `value` in hash order.
    pub fn index_of<Q>(&self, value: &Q) -> Option<usize>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = hash_code(&self.hash_builder, value);
        self.table.find_index(hash, |v| v.borrow() == value).ok()
    }

    /// Returns the element at `index` in hash order.
    pub fn value_at(&self, index: usize) -> Option<&T> {
        self.table.get_index(index)
    }

    /// Removes a value from the set. Returns whether the value was present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use compact_hash::CompactSet;
    ///
    /// let mut set: CompactSet<i32> = CompactSet::new();
    /// set.insert(1);
    /// assert_eq!(set.remove(&1), true);
    /// assert_eq!(set.remove(&1), false);
    /// ```
    pub fn remove<Q>(&mut self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.take(value).is_some()
    }

    /// Removes and returns the value in the set, if any, that is equal to the
    /// given one.
    pub fn take<Q>(&mut self, value: &Q) -> Option<T>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = hash_code(&self.hash_builder, value);
        self.table.remove(hash, |v| v.borrow() == value)
    }

    /// Removes and returns the element at `index` in hash order.
    pub fn remove_at(&mut self, index: usize) -> Result<T> {
        self.table.remove_at(index)
    }

    /// Returns `true` if every value yielded by `values` is in the set.
    pub fn contains_all<'a, I>(&self, values: I) -> bool
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        values.into_iter().all(|v| self.contains(v))
    }

    /// Removes every value yielded by `values`. Returns whether the set
    /// changed.
    pub fn remove_all<'a, I>(&mut self, values: I) -> bool
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        let mut changed = false;
        for value in values {
            changed |= self.remove(value);
        }
        changed
    }

    /// Keeps only the values also contained in `other`. Returns whether the
    /// set changed.
    pub fn retain_all<S2: BuildHasher>(&mut self, other: &CompactSet<T, S2>) -> bool {
        self.table.retain(|v| other.contains(&*v))
    }

    /// Keeps only the values for which `f` returns `true`.
    pub fn retain(&mut self, mut f: impl FnMut(&T) -> bool) {
        self.table.retain(|v| f(v));
    }

    /// Returns an iterator over the values of the set, in hash order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use compact_hash::CompactSet;
    ///
    /// let mut set: CompactSet<i32> = CompactSet::new();
    /// set.insert(1);
    /// set.insert(2);
    ///
    /// for value in set.iter() {
    ///     println!("Value: {}", value);
    /// }
    /// ```
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Returns an iterator that removes and yields all values from the set.
    /// The backing arrays are kept.
    pub fn drain(&mut self) -> Drain<'_, T> {
        Drain {
            inner: self.table.drain(),
        }
    }

    /// Starts a cursor at the first element.
    ///
    /// A cursor does not borrow the set, so elements can be removed while
    /// walking it with [`cursor_remove`](Self::cursor_remove). Structural
    /// changes made by other means are reported on the cursor's next step.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use compact_hash::CompactSet;
    ///
    /// let mut set: CompactSet<i32> = (0..10).collect();
    /// let mut cursor = set.cursor();
    /// while set.cursor_has_next(&cursor) {
    ///     if *set.cursor_next(&mut cursor)? % 2 == 0 {
    ///         set.cursor_remove(&mut cursor)?;
    ///     }
    /// }
    /// assert_eq!(set.len(), 5);
    /// # Ok::<(), compact_hash::Error>(())
    /// ```
    pub fn cursor(&self) -> Cursor {
        self.table.cursor()
    }

    /// Returns `true` if `cursor` has another element to visit.
    pub fn cursor_has_next(&self, cursor: &Cursor) -> bool {
        cursor.has_next(&self.table)
    }

    /// Advances `cursor` and returns the element it moved over.
    pub fn cursor_next<'a>(&'a self, cursor: &mut Cursor) -> Result<&'a T> {
        cursor.next(&self.table)
    }

    /// Removes the element `cursor` last returned.
    pub fn cursor_remove(&mut self, cursor: &mut Cursor) -> Result<T> {
        cursor.remove(&mut self.table)
    }

    /// Order-independent hash of the whole set: the wrapping sum of the
    /// elements' [`content_hash`] codes.
    ///
    /// Equal sets have equal codes whatever hasher builders they use.
    pub fn hash_code(&self) -> i32 {
        self.iter()
            .fold(0i32, |sum, value| sum.wrapping_add(content_hash(value)))
    }

    /// Returns `true` if the set contains no elements in common with `other`.
    pub fn is_disjoint<S2: BuildHasher>(&self, other: &CompactSet<T, S2>) -> bool {
        if self.len() <= other.len() {
            self.iter().all(|v| !other.contains(v))
        } else {
            other.iter().all(|v| !self.contains(v))
        }
    }

    /// Returns `true` if `other` contains at least all the elements in
    /// `self`.
    pub fn is_subset<S2: BuildHasher>(&self, other: &CompactSet<T, S2>) -> bool {
        if self.len() > other.len() {
            return false;
        }
        self.iter().all(|v| other.contains(v))
    }

    /// Returns `true` if `self` contains at least all the elements in
    /// `other`.
    pub fn is_superset<S2: BuildHasher>(&self, other: &CompactSet<T, S2>) -> bool {
        other.is_subset(self)
    }

    /// Visits the values in `self` or `other`, without duplicates.
    pub fn union<'a>(&'a self, other: &'a CompactSet<T, S>) -> Union<'a, T, S> {
        Union {
            iter: self.iter(),
            other_iter: other.iter(),
            other_set: self,
        }
    }

    /// Visits the values in both `self` and `other`.
    pub fn intersection<'a>(&'a self, other: &'a CompactSet<T, S>) -> Intersection<'a, T, S> {
        if self.len() <= other.len() {
            Intersection {
                iter: self.iter(),
                other,
            }
        } else {
            Intersection {
                iter: other.iter(),
                other: self,
            }
        }
    }

    /// Visits the values in `self` but not in `other`.
    pub fn difference<'a>(&'a self, other: &'a CompactSet<T, S>) -> Difference<'a, T, S> {
        Difference {
            iter: self.iter(),
            other,
        }
    }

    /// Visits the values in exactly one of `self` and `other`.
    pub fn symmetric_difference<'a>(
        &'a self,
        other: &'a CompactSet<T, S>,
    ) -> SymmetricDifference<'a, T, S> {
        SymmetricDifference {
            iter: self.difference(other).chain(other.difference(self)),
        }
    }

    #[cfg(test)]
    pub(crate) fn table(&self) -> &ArrayTable<T> {
        &self.table
    }
}

impl<T, S> CompactSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    /// Creates an empty set. Does not allocate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use compact_hash::CompactSet;
    ///
    /// let set: CompactSet<i32> = CompactSet::new();
    /// assert!(set.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }

    /// Creates an empty set with room for at least `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, S::default())
    }

    /// Creates an empty set with room for at least `capacity` elements,
    /// rejecting capacities the set cannot address.
    pub fn try_with_capacity(capacity: usize) -> Result<Self> {
        Self::try_with_capacity_and_hasher(capacity, S::default())
    }
}

impl<T, S> Default for CompactSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

/// An iterator over the values of a `CompactSet`.
pub struct Iter<'a, T> {
    inner: crate::array_table::Iter<'a, T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// A draining iterator over the values of a `CompactSet`.
pub struct Drain<'a, T> {
    inner: crate::array_table::Drain<'a, T>,
}

impl<T> Iterator for Drain<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

/// A consuming iterator over the values of a `CompactSet`.
pub struct IntoIter<T> {
    inner: crate::array_table::IntoIter<T>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

impl<T, S> IntoIterator for CompactSet<T, S> {
    type IntoIter = IntoIter<T>;
    type Item = T;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

impl<'a, T, S> IntoIterator for &'a CompactSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    type IntoIter = Iter<'a, T>;
    type Item = &'a T;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, S> FromIterator<T> for CompactSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = CompactSet::new();
        set.extend(iter);
        set
    }
}

impl<T, S, const N: usize> From<[T; N]> for CompactSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from(values: [T; N]) -> Self {
        values.into_iter().collect()
    }
}

impl<T, S> Extend<T> for CompactSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        if lower > 0 {
            self.reserve(lower);
        }
        for value in iter {
            self.insert(value);
        }
    }
}

impl<'a, T, S> Extend<&'a T> for CompactSet<T, S>
where
    T: Hash + Eq + Copy + 'a,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

/// An iterator over the union of two sets.
pub struct Union<'a, T, S> {
    iter: Iter<'a, T>,
    other_iter: Iter<'a, T>,
    other_set: &'a CompactSet<T, S>,
}

impl<'a, T, S> Iterator for Union<'a, T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(v) = self.iter.next() {
            return Some(v);
        }
        loop {
            let v = self.other_iter.next()?;
            if !self.other_set.contains(v) {
                return Some(v);
            }
        }
    }
}

/// An iterator over the intersection of two sets.
pub struct Intersection<'a, T, S> {
    iter: Iter<'a, T>,
    other: &'a CompactSet<T, S>,
}

impl<'a, T, S> Iterator for Intersection<'a, T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let v = self.iter.next()?;
            if self.other.contains(v) {
                return Some(v);
            }
        }
    }
}

/// An iterator over the difference of two sets.
pub struct Difference<'a, T, S> {
    iter: Iter<'a, T>,
    other: &'a CompactSet<T, S>,
}

impl<'a, T, S> Iterator for Difference<'a, T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let v = self.iter.next()?;
            if !self.other.contains(v) {
                return Some(v);
            }
        }
    }
}

/// An iterator over the symmetric difference of two sets.
pub struct SymmetricDifference<'a, T, S> {
    iter: core::iter::Chain<Difference<'a, T, S>, Difference<'a, T, S>>,
}

impl<'a, T, S> Iterator for SymmetricDifference<'a, T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next()
    }
}
