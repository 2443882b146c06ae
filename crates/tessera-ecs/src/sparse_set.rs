/// Sparse-set keyed by entity index. Provides O(1) insert/remove/lookup and dense,
/// order-irrelevant iteration.
pub struct SparseSet<T> {
    /// Maps key → dense index. `None` means the key is absent.
    sparse: Vec<Option<usize>>,
    /// Packed values.
    dense: Vec<T>,
    /// Key for each dense slot.
    keys: Vec<u32>,
}

impl<T> SparseSet<T> {
    pub fn new() -> Self {
        Self {
            sparse: Vec::new(),
            dense: Vec::new(),
            keys: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sparse: Vec::with_capacity(capacity),
            dense: Vec::with_capacity(capacity),
            keys: Vec::with_capacity(capacity),
        }
    }

    /// Insert or replace the value for `key`. Returns the previous value, if any.
    pub fn insert(&mut self, key: u32, value: T) -> Option<T> {
        let idx = key as usize;
        if idx >= self.sparse.len() {
            self.sparse.resize(idx + 1, None);
        }
        if let Some(dense_idx) = self.sparse[idx] {
            Some(std::mem::replace(&mut self.dense[dense_idx], value))
        } else {
            self.sparse[idx] = Some(self.dense.len());
            self.dense.push(value);
            self.keys.push(key);
            None
        }
    }

    /// Remove the value for `key`, moving the last dense element into its slot.
    pub fn remove(&mut self, key: u32) -> Option<T> {
        let dense_idx = self.sparse.get_mut(key as usize)?.take()?;
        let value = self.dense.swap_remove(dense_idx);
        self.keys.swap_remove(dense_idx);
        if let Some(&moved) = self.keys.get(dense_idx) {
            self.sparse[moved as usize] = Some(dense_idx);
        }
        Some(value)
    }

    pub fn get(&self, key: u32) -> Option<&T> {
        let dense_idx = (*self.sparse.get(key as usize)?)?;
        self.dense.get(dense_idx)
    }

    pub fn get_mut(&mut self, key: u32) -> Option<&mut T> {
        let dense_idx = (*self.sparse.get(key as usize)?)?;
        self.dense.get_mut(dense_idx)
    }

    pub fn contains(&self, key: u32) -> bool {
        matches!(self.sparse.get(key as usize), Some(Some(_)))
    }

    /// Iterate over all `(key, &value)` pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.keys.iter().copied().zip(self.dense.iter())
    }

    /// Iterate over all `(key, &mut value)` pairs in dense order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (u32, &mut T)> {
        self.keys.iter().copied().zip(self.dense.iter_mut())
    }

    pub fn values(&self) -> &[T] {
        &self.dense
    }

    pub fn keys(&self) -> &[u32] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Drop every entry, keeping the allocations.
    pub fn clear(&mut self) {
        for &key in &self.keys {
            self.sparse[key as usize] = None;
        }
        self.dense.clear();
        self.keys.clear();
    }
}

impl<T> Default for SparseSet<T> {
    fn default() -> Self {
        Self::new()
    }
}
