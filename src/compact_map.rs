use core::borrow::Borrow;
use core::fmt::Debug;
use core::fmt::Display;
use core::hash::BuildHasher;
use core::hash::Hash;

use alloc::vec::Vec;

use crate::DefaultHashBuilder;
use crate::array_table::ArrayTable;
use crate::array_table::Cursor;
use crate::array_table::Entry as TableEntry;
use crate::compact_set::CompactSet;
use crate::container_helpers::equal;
use crate::container_helpers::content_hash;
use crate::container_helpers::hash_code;
use crate::error::Error;
use crate::error::Result;

/// A hash map stored as one hash-ordered array of key/value pairs.
///
/// `CompactMap<K, V, S>` keeps its pairs sorted by the 32-bit hash code of
/// the key, next to a parallel array of the codes. Keys must implement
/// `Hash + Eq`; the hasher builder `S` is configurable.
///
/// Besides lookups by key, pairs can be addressed by their position in hash
/// order ([`key_at`](Self::key_at), [`value_at`](Self::value_at),
/// [`remove_at`](Self::remove_at)). Positions shift when pairs are inserted
/// or removed.
#[derive(Clone)]
pub struct CompactMap<K, V, S = DefaultHashBuilder> {
    table: ArrayTable<(K, V)>,
    hash_builder: S,
}

impl<K, V, S> Debug for CompactMap<K, V, S>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map()
            .entries(self.table.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

impl<K, V, S> Display for CompactMap<K, V, S>
where
    K: Display,
    V: Display,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.table.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}={value}")?;
        }
        f.write_str("}")
    }
}

impl<K, V, S, S2> PartialEq<CompactMap<K, V, S2>> for CompactMap<K, V, S>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
    S2: BuildHasher,
{
    fn eq(&self, other: &CompactMap<K, V, S2>) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter().all(|(k, v)| equal(Some(v), other.get(k)))
    }
}

impl<K, V, S> Eq for CompactMap<K, V, S>
where
    K: Hash + Eq,
    V: Eq,
    S: BuildHasher,
{
}

#[cfg(feature = "std")]
impl<K, V, S, S2> PartialEq<std::collections::HashMap<K, V, S2>> for CompactMap<K, V, S>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
    S2: BuildHasher,
{
    fn eq(&self, other: &std::collections::HashMap<K, V, S2>) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter().all(|(k, v)| equal(Some(v), other.get(k)))
    }
}

#[cfg(feature = "std")]
impl<K, V, S, S2> PartialEq<CompactMap<K, V, S>> for std::collections::HashMap<K, V, S2>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
    S2: BuildHasher,
{
    fn eq(&self, other: &CompactMap<K, V, S>) -> bool {
        other == self
    }
}

impl<K, V, S> CompactMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Creates a new map with the given hasher builder. Does not allocate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use compact_hash::CompactMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let map: CompactMap<i32, String, _> = CompactMap::with_hasher(SimpleHasher);
    /// assert!(map.is_empty());
    /// assert_eq!(map.capacity(), 0);
    /// ```
    pub fn with_hasher(hash_builder: S) -> Self {
        Self {
            table: ArrayTable::new(),
            hash_builder,
        }
    }

    /// Creates a new map with room for at least `capacity` pairs.
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

    /// Creates a new map with room for at least `capacity` pairs, rejecting
    /// capacities the map cannot address.
    pub fn try_with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Result<Self> {
        Ok(Self {
            table: ArrayTable::try_with_capacity(capacity)?,
            hash_builder,
        })
    }

    /// Returns the number of pairs in the map.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map contains no pairs.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of pairs the map holds before it must grow.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns a reference to the map's hasher builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Removes all pairs and releases the backing arrays.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Removes all pairs but keeps the backing arrays.
    pub fn clear_retaining_capacity(&mut self) {
        self.table.clear_retaining_capacity();
    }

    /// Shrinks the capacity of the map as much as possible.
    pub fn shrink_to_fit(&mut self) {
        self.table.shrink_to_fit();
    }

    /// Reserves capacity for at least `additional` more pairs.
    pub fn reserve(&mut self, additional: usize) {
        self.table.reserve(additional);
    }

    /// Grows the map to hold at least `minimum` pairs without further
    /// allocation.
    pub fn ensure_capacity(&mut self, minimum: usize) -> Result<()> {
        self.table.ensure_capacity(minimum)
    }

    /// Inserts a key-value pair into the map.
    ///
    /// If the key was already present its value is replaced and the old
    /// value returned; the stored key is left untouched.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use compact_hash::CompactMap;
    ///
    /// let mut map: CompactMap<i32, &str> = CompactMap::new();
    /// assert_eq!(map.insert(37, "a"), None);
    /// assert_eq!(map.insert(37, "b"), Some("a"));
    /// assert_eq!(map.get(&37), Some(&"b"));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let hash = hash_code(&self.hash_builder, &key);
        match self.table.entry(hash, |(k, _)| k == &key) {
            TableEntry::Occupied(mut entry) => {
                let old_value = core::mem::replace(&mut entry.get_mut().1, value);
                Some(old_value)
            }
            TableEntry::Vacant(entry) => {
                entry.insert((key, value));
                None
            }
        }
    }

    /// Adds a pair, pushing it at the end without a duplicate check when the
    /// key's hash sorts after every stored key.
    ///
    /// Meant for filling a map from a source already in hash order. Use
    /// [`validate`](Self::validate) to check the result when the source may
    /// repeat keys.
    pub fn append(&mut self, key: K, value: V) {
        let hash = hash_code(&self.hash_builder, &key);
        let sorts_last = self.table.hashes().last().is_none_or(|&last| last <= hash);
        if sorts_last {
            self.table.append(hash, (key, value), |_| false);
        } else {
            self.insert(key, value);
        }
    }

    /// Checks the ordering and key uniqueness invariants of the map.
    pub fn validate(&self) -> Result<()> {
        self.table.validate(|(a, _), (b, _)| a == b)
    }

    /// Returns a reference to the value corresponding to the key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use compact_hash::CompactMap;
    ///
    /// let mut map: CompactMap<String, i32> = CompactMap::new();
    /// map.insert("a".to_string(), 1);
    /// assert_eq!(map.get("a"), Some(&1));
    /// assert_eq!(map.get("b"), None);
    /// ```
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_key_value(key).map(|(_, v)| v)
    }

    /// Returns the stored key and value corresponding to `key`.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = hash_code(&self.hash_builder, key);
        self.table
            .find(hash, |(k, _)| k.borrow() == key)
            .map(|(k, v)| (k, v))
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = hash_code(&self.hash_builder, key);
        self.table
            .find_mut(hash, |(k, _)| k.borrow() == key)
            .map(|(_, v)| v)
    }

    /// Returns `true` if the map contains a value for the key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index_of_key(key).is_some()
    }

    /// Returns `true` if any pair holds `value`. Scans every pair.
    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.index_of_value(value).is_some()
    }

    /// Returns `true` if every key yielded by `keys` is in the map.
    pub fn contains_all_keys<'a, I>(&self, keys: I) -> bool
    where
        I: IntoIterator<Item = &'a K>,
        K: 'a,
    {
        keys.into_iter().all(|k| self.contains_key(k))
    }

    /// Position of `key` in hash order.
    pub fn index_of_key<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = hash_code(&self.hash_builder, key);
        self.table.find_index(hash, |(k, _)| k.borrow() == key).ok()
    }

    /// Position of the first pair holding `value`. Scans every pair.
    pub fn index_of_value(&self, value: &V) -> Option<usize>
    where
        V: PartialEq,
    {
        self.table.iter().position(|(_, v)| v == value)
    }

    /// The key at `index` in hash order.
    pub fn key_at(&self, index: usize) -> Option<&K> {
        self.table.get_index(index).map(|(k, _)| k)
    }

    /// The value at `index` in hash order.
    pub fn value_at(&self, index: usize) -> Option<&V> {
        self.table.get_index(index).map(|(_, v)| v)
    }

    /// Mutable access to the value at `index`.
    pub fn value_at_mut(&mut self, index: usize) -> Option<&mut V> {
        self.table.get_index_mut(index).map(|(_, v)| v)
    }

    /// Replaces the value at `index` and returns the old one.
    pub fn set_value_at(&mut self, index: usize, value: V) -> Result<V> {
        let len = self.len();
        match self.value_at_mut(index) {
            Some(slot) => Ok(core::mem::replace(slot, value)),
            None => Err(Error::out_of_bounds(index, len)),
        }
    }

    /// Removes a key from the map, returning its value if it was present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use compact_hash::CompactMap;
    ///
    /// let mut map: CompactMap<i32, &str> = CompactMap::new();
    /// map.insert(1, "a");
    /// assert_eq!(map.remove(&1), Some("a"));
    /// assert_eq!(map.remove(&1), None);
    /// ```
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.remove_entry(key).map(|(_, v)| v)
    }

    /// Removes a key from the map, returning the stored key and value.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = hash_code(&self.hash_builder, key);
        self.table.remove(hash, |(k, _)| k.borrow() == key)
    }

    /// Removes and returns the pair at `index` in hash order.
    pub fn remove_at(&mut self, index: usize) -> Result<(K, V)> {
        self.table.remove_at(index)
    }

    /// Removes every key yielded by `keys`. Returns whether the map changed.
    pub fn remove_all<'a, I>(&mut self, keys: I) -> bool
    where
        I: IntoIterator<Item = &'a K>,
        K: 'a,
    {
        let mut changed = false;
        for key in keys {
            changed |= self.remove(key).is_some();
        }
        changed
    }

    /// Keeps only the pairs whose key is in `keys`. Returns whether the map
    /// changed.
    pub fn retain_all<S2: BuildHasher>(&mut self, keys: &CompactSet<K, S2>) -> bool {
        self.table.retain(|(k, _)| keys.contains(&*k))
    }

    /// Keeps only the pairs for which `f` returns `true`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use compact_hash::CompactMap;
    ///
    /// let mut map: CompactMap<i32, i32> = (0..8).map(|k| (k, k * 10)).collect();
    /// map.retain(|k, v| {
    ///     *v += 1;
    ///     k % 2 == 0
    /// });
    /// assert_eq!(map.len(), 4);
    /// assert_eq!(map.get(&2), Some(&21));
    /// ```
    pub fn retain(&mut self, mut f: impl FnMut(&K, &mut V) -> bool) {
        self.table.retain(|(k, v)| f(k, v));
    }

    /// Gets the given key's entry in the map for in-place manipulation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use compact_hash::CompactMap;
    ///
    /// let mut letters: CompactMap<char, u32> = CompactMap::new();
    /// for ch in "a short treatise on fungi".chars() {
    ///     *letters.entry(ch).or_insert(0) += 1;
    /// }
    /// assert_eq!(letters.get(&'s'), Some(&2));
    /// assert_eq!(letters.get(&'t'), Some(&3));
    /// assert_eq!(letters.get(&'y'), None);
    /// ```
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V> {
        let hash = hash_code(&self.hash_builder, &key);
        match self.table.entry(hash, |(k, _)| k == &key) {
            TableEntry::Occupied(entry) => Entry::Occupied(OccupiedEntry { entry }),
            TableEntry::Vacant(entry) => Entry::Vacant(VacantEntry { entry, key }),
        }
    }

    /// Returns an iterator over the pairs of the map, in hash order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Returns an iterator over the pairs with mutable references to the
    /// values.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            inner: self.table.iter_mut(),
        }
    }

    /// Returns an iterator over the keys of the map, in hash order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Returns an iterator over the values of the map, in key hash order.
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    /// Returns an iterator over mutable references to the values.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    /// A read-only set view of the keys.
    pub fn key_set(&self) -> KeySet<'_, K, V, S> {
        KeySet { map: self }
    }

    /// A set view of the keys whose removals go through to the map.
    pub fn key_set_mut(&mut self) -> KeySetMut<'_, K, V, S> {
        KeySetMut { map: self }
    }

    /// A read-only view of the values.
    pub fn value_collection(&self) -> ValueCollection<'_, K, V, S> {
        ValueCollection { map: self }
    }

    /// A view of the values whose removals go through to the map.
    pub fn value_collection_mut(&mut self) -> ValueCollectionMut<'_, K, V, S> {
        ValueCollectionMut { map: self }
    }

    /// Returns an iterator that removes and yields all pairs. The backing
    /// arrays are kept.
    pub fn drain(&mut self) -> Drain<'_, K, V> {
        Drain {
            inner: self.table.drain(),
        }
    }

    /// Starts a cursor at the first pair. See
    /// [`CompactSet::cursor`](crate::CompactSet::cursor).
    pub fn cursor(&self) -> Cursor {
        self.table.cursor()
    }

    /// Returns `true` if `cursor` has another pair to visit.
    pub fn cursor_has_next(&self, cursor: &Cursor) -> bool {
        cursor.has_next(&self.table)
    }

    /// Advances `cursor` and returns the pair it moved over.
    pub fn cursor_next<'a>(&'a self, cursor: &mut Cursor) -> Result<(&'a K, &'a V)> {
        cursor.next(&self.table).map(|(k, v)| (k, v))
    }

    /// Removes the pair `cursor` last returned.
    pub fn cursor_remove(&mut self, cursor: &mut Cursor) -> Result<(K, V)> {
        cursor.remove(&mut self.table)
    }

    /// Order-independent hash of the whole map: the wrapping sum over all
    /// pairs of the key's [`content_hash`] xor the value's.
    ///
    /// Equal maps have equal codes whatever hasher builders they use.
    pub fn hash_code(&self) -> i32
    where
        V: Hash,
    {
        self.iter().fold(0i32, |sum, (key, value)| {
            sum.wrapping_add(content_hash(key) ^ content_hash(value))
        })
    }

    #[cfg(test)]
    pub(crate) fn table(&self) -> &ArrayTable<(K, V)> {
        &self.table
    }
}

impl<K, V, S> CompactMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    /// Creates an empty map. Does not allocate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use compact_hash::CompactMap;
    ///
    /// let map: CompactMap<i32, String> = CompactMap::new();
    /// assert!(map.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }

    /// Creates an empty map with room for at least `capacity` pairs.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, S::default())
    }

    /// Creates an empty map with room for at least `capacity` pairs,
    /// rejecting capacities the map cannot address.
    pub fn try_with_capacity(capacity: usize) -> Result<Self> {
        Self::try_with_capacity_and_hasher(capacity, S::default())
    }
}

impl<K, V, S> Default for CompactMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> FromIterator<(K, V)> for CompactMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = CompactMap::new();
        map.extend(iter);
        map
    }
}

impl<K, V, S, const N: usize> From<[(K, V); N]> for CompactMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K, V, S> Extend<(K, V)> for CompactMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        if lower > 0 {
            self.reserve(lower);
        }
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<'a, K, V, S> Extend<(&'a K, &'a V)> for CompactMap<K, V, S>
where
    K: Hash + Eq + Copy + 'a,
    V: Copy + 'a,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (&'a K, &'a V)>>(&mut self, iter: I) {
        self.extend(iter.into_iter().map(|(&k, &v)| (k, v)));
    }
}

impl<K, V, S> IntoIterator for CompactMap<K, V, S> {
    type IntoIter = IntoIter<K, V>;
    type Item = (K, V);

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

impl<'a, K, V, S> IntoIterator for &'a CompactMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    type IntoIter = Iter<'a, K, V>;
    type Item = (&'a K, &'a V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S> IntoIterator for &'a mut CompactMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    type IntoIter = IterMut<'a, K, V>;
    type Item = (&'a K, &'a mut V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

/// A view into a single entry in a map, which may either be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`CompactMap`].
///
/// [`entry`]: CompactMap::entry
pub enum Entry<'a, K, V> {
    /// A vacant entry.
    Vacant(VacantEntry<'a, K, V>),
    /// An occupied entry.
    Occupied(OccupiedEntry<'a, K, V>),
}

impl<'a, K, V> Entry<'a, K, V> {
    /// Inserts a default value if the entry is vacant and returns a mutable
    /// reference.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts a value computed from a closure if the entry is vacant and
    /// returns a mutable reference.
    pub fn or_insert_with<F>(self, default: F) -> &'a mut V
    where
        F: FnOnce() -> V,
    {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Provides in-place mutable access to an occupied entry before any
    /// potential inserts.
    pub fn and_modify<F>(self, f: F) -> Self
    where
        F: FnOnce(&mut V),
    {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            Entry::Vacant(entry) => Entry::Vacant(entry),
        }
    }

    /// Returns a reference to this entry's key.
    pub fn key(&self) -> &K {
        match self {
            Entry::Occupied(entry) => entry.key(),
            Entry::Vacant(entry) => entry.key(),
        }
    }

    /// Position of the pair in hash order, or where it would be inserted.
    pub fn index(&self) -> usize {
        match self {
            Entry::Occupied(entry) => entry.entry.index(),
            Entry::Vacant(entry) => entry.entry.index(),
        }
    }
}

impl<'a, K, V> Entry<'a, K, V>
where
    V: Default,
{
    /// Inserts the default value if the entry is vacant and returns a mutable
    /// reference.
    pub fn or_default(self) -> &'a mut V {
        self.or_insert_with(Default::default)
    }
}

/// A view into a vacant entry in the map.
pub struct VacantEntry<'a, K, V> {
    entry: crate::array_table::VacantEntry<'a, (K, V)>,
    key: K,
}

impl<'a, K, V> VacantEntry<'a, K, V> {
    /// Gets a reference to the key that would be used when inserting a value.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Take ownership of the key.
    pub fn into_key(self) -> K {
        self.key
    }

    /// Inserts the value into the map and returns a mutable reference to it.
    pub fn insert(self, value: V) -> &'a mut V {
        &mut self.entry.insert((self.key, value)).1
    }
}

/// A view into an occupied entry in the map.
pub struct OccupiedEntry<'a, K, V> {
    entry: crate::array_table::OccupiedEntry<'a, (K, V)>,
}

impl<'a, K, V> OccupiedEntry<'a, K, V> {
    /// Gets a reference to the key in the entry.
    pub fn key(&self) -> &K {
        &self.entry.get().0
    }

    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &V {
        &self.entry.get().1
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        &mut self.entry.get_mut().1
    }

    /// Converts the entry into a mutable reference to the value.
    pub fn into_mut(self) -> &'a mut V {
        &mut self.entry.into_mut().1
    }

    /// Inserts a value into the entry and returns the old value.
    pub fn insert(&mut self, value: V) -> V {
        core::mem::replace(&mut self.entry.get_mut().1, value)
    }

    /// Removes the entry from the map and returns the value.
    pub fn remove(self) -> V {
        self.entry.remove().1
    }

    /// Removes the entry from the map and returns the key and value.
    pub fn remove_entry(self) -> (K, V) {
        self.entry.remove()
    }
}

/// Read-only set view over the keys of a [`CompactMap`].
pub struct KeySet<'a, K, V, S> {
    map: &'a CompactMap<K, V, S>,
}

impl<'a, K, V, S> KeySet<'a, K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Number of keys.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns `true` if the map contains `key`.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(key)
    }

    /// Returns `true` if the map contains every key yielded by `keys`.
    pub fn contains_all<'b, I>(&self, keys: I) -> bool
    where
        I: IntoIterator<Item = &'b K>,
        K: 'b,
    {
        self.map.contains_all_keys(keys)
    }

    /// Iterates over the keys in hash order.
    pub fn iter(&self) -> Keys<'a, K, V> {
        self.map.keys()
    }
}

/// Set view over the keys of a [`CompactMap`] that removes pairs from the
/// map.
pub struct KeySetMut<'a, K, V, S> {
    map: &'a mut CompactMap<K, V, S>,
}

impl<K, V, S> KeySetMut<'_, K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Number of keys.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns `true` if the map contains `key`.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(key)
    }

    /// Iterates over the keys in hash order.
    pub fn iter(&self) -> Keys<'_, K, V> {
        self.map.keys()
    }

    /// Removes the pair with `key`. Returns whether it was present.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.remove(key).is_some()
    }

    /// Removes the pairs of every key yielded by `keys`.
    pub fn remove_all<'b, I>(&mut self, keys: I) -> bool
    where
        I: IntoIterator<Item = &'b K>,
        K: 'b,
    {
        self.map.remove_all(keys)
    }

    /// Keeps only the pairs whose key is in `keys`.
    pub fn retain_all<S2: BuildHasher>(&mut self, keys: &CompactSet<K, S2>) -> bool {
        self.map.retain_all(keys)
    }

    /// Keeps only the pairs whose key satisfies `f`.
    pub fn retain(&mut self, mut f: impl FnMut(&K) -> bool) {
        self.map.retain(|k, _| f(k));
    }

    /// Removes every pair from the map.
    pub fn clear(&mut self) {
        self.map.clear();
    }
}

/// Read-only view over the values of a [`CompactMap`].
pub struct ValueCollection<'a, K, V, S> {
    map: &'a CompactMap<K, V, S>,
}

impl<'a, K, V, S> ValueCollection<'a, K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Number of values.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns `true` if any pair holds `value`.
    pub fn contains(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.map.contains_value(value)
    }

    /// Iterates over the values in key hash order.
    pub fn iter(&self) -> Values<'a, K, V> {
        self.map.values()
    }
}

/// View over the values of a [`CompactMap`] that removes pairs from the map.
pub struct ValueCollectionMut<'a, K, V, S> {
    map: &'a mut CompactMap<K, V, S>,
}

impl<K, V, S> ValueCollectionMut<'_, K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Number of values.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns `true` if any pair holds `value`.
    pub fn contains(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.map.contains_value(value)
    }

    /// Iterates over the values in key hash order.
    pub fn iter(&self) -> Values<'_, K, V> {
        self.map.values()
    }

    /// Iterates over mutable references to the values.
    pub fn iter_mut(&mut self) -> ValuesMut<'_, K, V> {
        self.map.values_mut()
    }

    /// Removes the first pair, in hash order, holding `value`. Returns
    /// whether one was found.
    pub fn remove(&mut self, value: &V) -> bool
    where
        V: PartialEq,
    {
        match self.map.index_of_value(value) {
            Some(index) => self.map.remove_at(index).is_ok(),
            None => false,
        }
    }

    /// Removes every pair whose value is yielded by `values`. Returns whether
    /// the map changed.
    pub fn remove_all<'b, I>(&mut self, values: I) -> bool
    where
        I: IntoIterator<Item = &'b V>,
        V: PartialEq + 'b,
    {
        let values: Vec<&V> = values.into_iter().collect();
        self.map.table.retain(|(_, v)| !values.iter().any(|x| **x == *v))
    }

    /// Keeps only the pairs whose value is yielded by `values`. Returns
    /// whether the map changed.
    pub fn retain_all<'b, I>(&mut self, values: I) -> bool
    where
        I: IntoIterator<Item = &'b V>,
        V: PartialEq + 'b,
    {
        let values: Vec<&V> = values.into_iter().collect();
        self.map.table.retain(|(_, v)| values.iter().any(|x| **x == *v))
    }

    /// Keeps only the pairs whose value satisfies `f`.
    pub fn retain(&mut self, mut f: impl FnMut(&V) -> bool) {
        self.map.retain(|_, v| f(v));
    }

    /// Removes every pair from the map.
    pub fn clear(&mut self) {
        self.map.clear();
    }
}

/// An iterator over the key-value pairs of a `CompactMap`.
pub struct Iter<'a, K, V> {
    inner: crate::array_table::Iter<'a, (K, V)>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// A mutable iterator over the key-value pairs of a `CompactMap`.
pub struct IterMut<'a, K, V> {
    inner: crate::array_table::IterMut<'a, (K, V)>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (&*k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// An iterator over the keys of a `CompactMap`.
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// An iterator over the values of a `CompactMap`.
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// A mutable iterator over the values of a `CompactMap`.
pub struct ValuesMut<'a, K, V> {
    inner: IterMut<'a, K, V>,
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }
}

/// A draining iterator over the key-value pairs of a `CompactMap`.
pub struct Drain<'a, K, V> {
    inner: crate::array_table::Drain<'a, (K, V)>,
}

impl<K, V> Iterator for Drain<'_, K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

/// A consuming iterator over the key-value pairs of a `CompactMap`.
pub struct IntoIter<K, V> {
    inner: crate::array_table::IntoIter<(K, V)>,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec;
    use core::hash::Hasher;

    use rand::Rng;
    use rand::SeedableRng;
    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use rand::rngs::SmallRng;
    use siphasher::sip::SipHasher;

    use super::*;

    #[derive(Clone)]
    struct SipHashBuilder {
        k1: u64,
        k2: u64,
    }

    impl BuildHasher for SipHashBuilder {
        type Hasher = SipHasher;

        fn build_hasher(&self) -> Self::Hasher {
            SipHasher::new_with_keys(self.k1, self.k2)
        }
    }

    impl Default for SipHashBuilder {
        fn default() -> Self {
            Self {
                k1: OsRng.try_next_u64().unwrap_or(0),
                k2: OsRng.try_next_u64().unwrap_or(0),
            }
        }
    }

    /// Hashes an `i32` to its value divided by 100.
    #[derive(Default)]
    struct BucketHasher(u64);

    impl Hasher for BucketHasher {
        fn finish(&self) -> u64 {
            self.0
        }

        fn write(&mut self, _bytes: &[u8]) {}

        fn write_i32(&mut self, i: i32) {
            self.0 = (i / 100) as u32 as u64;
        }
    }

    #[derive(Clone, Default)]
    struct BucketState;

    impl BuildHasher for BucketState {
        type Hasher = BucketHasher;

        fn build_hasher(&self) -> Self::Hasher {
            BucketHasher::default()
        }
    }

    #[test]
    fn test_new_and_with_hasher() {
        let map: CompactMap<i32, String, SipHashBuilder> = CompactMap::new();
        assert!(map.is_empty());
        assert_eq!(map.capacity(), 0);

        let map2 = CompactMap::<i32, String, _>::with_capacity_and_hasher(100, SipHashBuilder::default());
        assert!(map2.capacity() >= 100);

        let err = CompactMap::<i32, String, SipHashBuilder>::try_with_capacity(usize::MAX);
        assert!(matches!(err, Err(Error::InvalidArgument { .. })));
    }

    #[test]
    fn test_insert_and_get() {
        let mut map = CompactMap::with_hasher(SipHashBuilder::default());

        assert_eq!(map.insert(1, "one".to_string()), None);
        assert_eq!(map.insert(2, "two".to_string()), None);
        assert_eq!(map.len(), 2);

        assert_eq!(map.get(&1), Some(&"one".to_string()));
        assert_eq!(map.get(&3), None);
        assert_eq!(map.get_key_value(&2), Some((&2, &"two".to_string())));

        assert_eq!(map.insert(1, "uno".to_string()), Some("one".to_string()));
        assert_eq!(map.len(), 2);

        if let Some(value) = map.get_mut(&2) {
            value.push('!');
        }
        assert_eq!(map.get(&2).map(String::as_str), Some("two!"));
        assert!(map.contains_key(&1));
        assert!(!map.contains_key(&3));
    }

    #[test]
    fn test_borrowed_lookups() {
        let mut map: CompactMap<String, u32, SipHashBuilder> = CompactMap::new();
        map.insert("alpha".to_string(), 1);
        map.insert("beta".to_string(), 2);
        assert_eq!(map.get("alpha"), Some(&1));
        assert!(map.contains_key("beta"));
        assert_eq!(map.remove_entry("beta"), Some(("beta".to_string(), 2)));
        assert_eq!(map.remove("beta"), None);
    }

    #[test]
    fn test_remove_many() {
        let mut map = CompactMap::with_hasher(SipHashBuilder::default());
        for i in 0..100 {
            map.insert(i, i * 10);
        }
        for i in (0..100).step_by(2) {
            assert_eq!(map.remove(&i), Some(i * 10));
            assert!(map.table().index().is_sorted());
        }
        assert_eq!(map.len(), 50);
        for i in 0..100 {
            assert_eq!(map.contains_key(&i), i % 2 == 1);
        }
        assert_eq!(map.validate(), Ok(()));
    }

    #[test]
    fn test_entry_api() {
        let mut map = CompactMap::with_hasher(SipHashBuilder::default());

        *map.entry("a").or_insert(0) += 1;
        *map.entry("a").or_insert(0) += 1;
        *map.entry("b").or_default() += 5;
        map.entry("b").and_modify(|v| *v *= 2).or_insert(0);
        map.entry("c").and_modify(|v| *v *= 2).or_insert_with(|| 7);

        assert_eq!(map.get("a"), Some(&2));
        assert_eq!(map.get("b"), Some(&10));
        assert_eq!(map.get("c"), Some(&7));

        match map.entry("a") {
            Entry::Occupied(mut entry) => {
                assert_eq!(entry.key(), &"a");
                assert_eq!(entry.insert(3), 2);
                assert_eq!(entry.remove_entry(), ("a", 3));
            }
            Entry::Vacant(_) => panic!("expected occupied"),
        }
        match map.entry("z") {
            Entry::Vacant(entry) => {
                assert_eq!(entry.key(), &"z");
                assert_eq!(entry.into_key(), "z");
            }
            Entry::Occupied(_) => panic!("expected vacant"),
        }
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_entry_index_matches_position() {
        let mut map: CompactMap<i32, i32, BucketState> = CompactMap::new();
        map.insert(100, 0);
        map.insert(300, 0);

        // Hash 1 is taken, so a new colliding key lands after the run.
        assert_eq!(map.entry(150).index(), 1);
        assert_eq!(map.entry(200).index(), 1);
        assert_eq!(map.entry(300).index(), 1);

        map.entry(150).or_insert(1);
        assert_eq!(map.key_at(1), Some(&150));
        assert_eq!(map.entry(300).index(), 2);
    }

    #[test]
    fn test_positional_access() {
        let mut map: CompactMap<i32, &str, BucketState> = CompactMap::new();
        map.insert(500, "e");
        map.insert(100, "a");
        map.insert(300, "c");

        assert_eq!(map.key_at(0), Some(&100));
        assert_eq!(map.value_at(2), Some(&"e"));
        assert_eq!(map.key_at(3), None);
        assert_eq!(map.index_of_key(&300), Some(1));
        assert_eq!(map.index_of_key(&400), None);
        assert_eq!(map.index_of_value(&"e"), Some(2));
        assert!(map.contains_value(&"a"));
        assert!(!map.contains_value(&"z"));

        assert_eq!(map.set_value_at(1, "C"), Ok("c"));
        assert_eq!(map.get(&300), Some(&"C"));
        assert_eq!(map.set_value_at(3, "x"), Err(Error::out_of_bounds(3, 3)));
        if let Some(value) = map.value_at_mut(0) {
            *value = "A";
        }

        assert_eq!(map.remove_at(0), Ok((100, "A")));
        assert_eq!(map.remove_at(5), Err(Error::out_of_bounds(5, 2)));
        assert_eq!(map.table().hashes(), &[3, 5]);
    }

    #[test]
    fn test_collisions() {
        let mut map: CompactMap<i32, i32, BucketState> = CompactMap::new();
        for k in 0..300 {
            assert_eq!(map.insert(k, -k), None);
        }
        assert_eq!(map.len(), 300);
        for k in 0..300 {
            assert_eq!(map.get(&k), Some(&-k));
        }
        // Keys of one bucket keep insertion order inside their run.
        let run: Vec<i32> = map.keys().copied().skip(100).take(100).collect();
        assert_eq!(run, (100..200).collect::<Vec<_>>());

        for k in (0..300).rev() {
            assert_eq!(map.remove(&k), Some(-k));
        }
        assert!(map.is_empty());
        assert_eq!(map.capacity(), 8);
    }

    #[test]
    fn test_iterators() {
        let mut map: CompactMap<i32, i32, BucketState> = (0..5).map(|k| (k * 100, k)).collect();

        let pairs: Vec<(i32, i32)> = map.iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(pairs, vec![(0, 0), (100, 1), (200, 2), (300, 3), (400, 4)]);
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![0, 100, 200, 300, 400]);
        assert_eq!(map.values().copied().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
        assert_eq!(map.iter().len(), 5);

        for (_, v) in map.iter_mut() {
            *v += 10;
        }
        for v in map.values_mut() {
            *v *= 2;
        }
        for (_, v) in &mut map {
            *v -= 1;
        }
        assert_eq!(map.get(&200), Some(&23));

        let drained: Vec<(i32, i32)> = map.drain().collect();
        assert_eq!(drained.len(), 5);
        assert!(map.is_empty());

        map.extend([(1, 1), (2, 2)]);
        let mut owned: Vec<(i32, i32)> = map.into_iter().collect();
        owned.sort();
        assert_eq!(owned, vec![(1, 1), (2, 2)]);
    }

    #[test]
    fn test_retain_and_bulk_removal() {
        let mut map: CompactMap<i32, i32, SipHashBuilder> = (0..20).map(|k| (k, k)).collect();
        map.retain(|k, v| {
            *v *= 3;
            k % 2 == 0
        });
        assert_eq!(map.len(), 10);
        assert_eq!(map.get(&4), Some(&12));

        assert!(map.contains_all_keys(&[0, 2, 4]));
        assert!(!map.contains_all_keys(&[1]));

        assert!(map.remove_all(&[0, 2, 99]));
        assert!(!map.remove_all(&[0]));
        assert_eq!(map.len(), 8);

        let keep: CompactSet<i32, SipHashBuilder> = [4, 6, 8].into();
        assert!(map.retain_all(&keep));
        assert_eq!(map.len(), 3);
        assert!(!map.retain_all(&keep));
    }

    #[test]
    fn test_key_views() {
        let mut map: CompactMap<i32, &str, SipHashBuilder> =
            [(1, "a"), (2, "b"), (3, "c"), (4, "d")].into();

        let keys = map.key_set();
        assert_eq!(keys.len(), 4);
        assert!(keys.contains(&1));
        assert!(keys.contains_all(&[1, 2]));
        assert_eq!(keys.iter().count(), 4);

        let mut keys = map.key_set_mut();
        assert!(keys.remove(&1));
        assert!(!keys.remove(&1));
        keys.retain(|k| *k != 2);
        assert_eq!(keys.len(), 2);
        assert!(keys.remove_all(&[3]));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&4), Some(&"d"));

        let keep: CompactSet<i32, SipHashBuilder> = CompactSet::new();
        assert!(map.key_set_mut().retain_all(&keep));
        assert!(map.is_empty());
    }

    #[test]
    fn test_value_views() {
        let mut map: CompactMap<i32, i32, BucketState> =
            [(100, 7), (200, 8), (300, 7), (400, 9)].into();

        let values = map.value_collection();
        assert_eq!(values.len(), 4);
        assert!(values.contains(&8));
        assert!(!values.contains(&1));
        assert_eq!(values.iter().copied().collect::<Vec<_>>(), vec![7, 8, 7, 9]);

        // Only the first pair holding the value goes.
        let mut values = map.value_collection_mut();
        assert!(values.remove(&7));
        assert!(!values.remove(&1));
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![200, 300, 400]);

        let mut values = map.value_collection_mut();
        for v in values.iter_mut() {
            *v += 1;
        }
        assert!(values.remove_all(&[8]));
        assert_eq!(map.len(), 2);

        let mut values = map.value_collection_mut();
        assert!(values.retain_all(&[10]));
        assert_eq!(map.get(&400), Some(&10));

        map.insert(500, 1);
        map.value_collection_mut().retain(|v| *v > 5);
        assert_eq!(map.len(), 1);
        map.value_collection_mut().clear();
        assert!(map.is_empty());
    }

    #[test]
    fn test_cursor() {
        let mut map: CompactMap<i32, i32, BucketState> = (0..6).map(|k| (k * 100, k)).collect();
        let mut cursor = map.cursor();
        while map.cursor_has_next(&cursor) {
            let (_, value) = map.cursor_next(&mut cursor).unwrap();
            if value % 2 == 0 {
                let (key, _) = map.cursor_remove(&mut cursor).unwrap();
                assert_eq!(key % 200, 0);
            }
        }
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![100, 300, 500]);
        assert_eq!(map.cursor_next(&mut cursor), Err(Error::EndOfSequence));

        let mut cursor = map.cursor();
        map.cursor_next(&mut cursor).unwrap();
        map.remove(&500);
        assert!(matches!(
            map.cursor_remove(&mut cursor),
            Err(Error::ConcurrentModification { .. })
        ));

        // Value overwrites are not structural.
        let mut cursor = map.cursor();
        map.insert(100, 42);
        assert_eq!(map.cursor_next(&mut cursor), Ok((&100, &42)));
    }

    #[test]
    fn test_append_and_validate() {
        let mut map: CompactMap<i32, i32, BucketState> = CompactMap::new();
        for k in 0..10 {
            map.append(k * 100, k);
        }
        assert_eq!(map.validate(), Ok(()));

        map.append(900, 0);
        assert_eq!(map.validate(), Err(Error::DuplicateKey { index: 10 }));

        let mut map: CompactMap<i32, i32, BucketState> = CompactMap::new();
        map.append(900, 1);
        map.append(100, 1);
        map.append(100, 2);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&100), Some(&2));
        assert_eq!(map.validate(), Ok(()));
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_equality() {
        let mut map1: CompactMap<i32, String, SipHashBuilder> = CompactMap::new();
        let mut map2: CompactMap<i32, String, BucketState> = CompactMap::new();
        let mut map3 = std::collections::HashMap::new();
        assert!(map1 == map2);
        assert!(map1 == map3);
        assert!(map3 == map2);

        for i in 0..10 {
            map1.insert(i, i.to_string());
            map2.insert(i, i.to_string());
            map3.insert(i, i.to_string());
        }
        assert!(map1 == map2);
        assert!(map1 == map3);
        assert!(map3 == map1);

        map1.insert(0, "zero".to_string());
        assert!(map1 != map2);
        assert!(map3 != map1);

        map1.remove(&0);
        assert!(map1 != map2);
        assert!(map1 != map3);
    }

    #[test]
    fn test_clone_and_hash_code() {
        let state = SipHashBuilder::default();
        let mut forward = CompactMap::with_hasher(state.clone());
        let mut backward = CompactMap::with_hasher(state);
        for i in 0..30u32 {
            forward.insert(i, i * 2);
            backward.insert(29 - i, (29 - i) * 2);
        }
        assert_eq!(forward, backward);
        assert_eq!(forward.hash_code(), backward.hash_code());

        let mut copy = forward.clone();
        assert_eq!(copy, forward);
        assert_eq!(copy.hash_code(), forward.hash_code());
        copy.insert(0, 1);
        assert_ne!(copy, forward);
        assert_eq!(forward.get(&0), Some(&0));

        let empty: CompactMap<u32, u32, SipHashBuilder> = CompactMap::new();
        assert_eq!(empty.hash_code(), 0);
    }

    #[test]
    fn test_hash_code_ignores_hasher_seed() {
        let a: CompactMap<u32, u64> = (0..20).map(|i| (i, u64::from(i) * 3)).collect();
        let b: CompactMap<u32, u64> = (0..20).rev().map(|i| (i, u64::from(i) * 3)).collect();
        assert_eq!(a, b);
        assert_eq!(a.hash_code(), b.hash_code());

        let sip: CompactMap<u32, u64, SipHashBuilder> =
            (0..20).map(|i| (i, u64::from(i) * 3)).collect();
        assert_eq!(a, sip);
        assert_eq!(a.hash_code(), sip.hash_code());

        let mut changed = b.clone();
        changed.insert(7, 0);
        assert_ne!(a.hash_code(), changed.hash_code());
    }

    #[test]
    fn test_display_and_debug() {
        let map: CompactMap<i32, &str, BucketState> = CompactMap::new();
        assert_eq!(map.to_string(), "{}");

        let map: CompactMap<i32, &str, BucketState> = [(200, "b"), (100, "a")].into();
        assert_eq!(map.to_string(), "{100=a, 200=b}");
        assert_eq!(alloc::format!("{map:?}"), r#"{100: "a", 200: "b"}"#);
    }

    #[test]
    fn test_clear_and_capacity() {
        let mut map: CompactMap<i32, i32, SipHashBuilder> = (0..10).map(|k| (k, k)).collect();
        let capacity = map.capacity();
        map.clear_retaining_capacity();
        assert!(map.is_empty());
        assert_eq!(map.capacity(), capacity);

        map.insert(1, 1);
        map.clear();
        assert_eq!(map.capacity(), 0);

        map.reserve(40);
        assert!(map.capacity() >= 40);
        map.insert(1, 1);
        map.shrink_to_fit();
        assert!(map.capacity() < 40);
        assert!(map.ensure_capacity(usize::MAX).is_err());
    }

    #[test]
    fn test_random_operations_match_reference() {
        let mut rng = SmallRng::seed_from_u64(0xBADC0DE);
        let mut reference = hashbrown::HashMap::new();
        let mut map: CompactMap<i32, u32, BucketState> = CompactMap::new();

        for step in 0..1500u32 {
            // 2000 keys over 20 hash codes.
            let key = rng.random_range(0..2000);
            match rng.random_range(0..10) {
                0..=5 => assert_eq!(reference.insert(key, step), map.insert(key, step)),
                6..=8 => assert_eq!(reference.remove(&key), map.remove(&key)),
                _ => assert_eq!(reference.get(&key), map.get(&key)),
            }
            assert!(map.table().index().is_sorted());
            assert_eq!(reference.len(), map.len(), "step {step}");
            for (key, value) in &reference {
                assert_eq!(map.get(key), Some(value), "step {step}");
            }
        }
        assert_eq!(map.validate(), Ok(()));
    }
}
