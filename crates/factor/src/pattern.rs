//! The working pattern of a chain, carried from one pivot to the next during a solve.

/// An unordered set of indices backed by a caller-provided workspace.
///
/// Only the first `len()` slots of the workspace are live. Removal is O(1): the last live entry
/// takes the place of the removed one, so the order of the remaining entries changes. Values
/// stored for a chain are aligned with exactly this order.
#[derive(Debug)]
pub struct PatternSet<'w> {
    slots: &'w mut [usize],
    deg: usize,
}

impl<'w> PatternSet<'w> {
    /// An empty pattern over `workspace`, which must be large enough for the largest pattern.
    pub fn new(workspace: &'w mut [usize]) -> Self {
        PatternSet {
            slots: workspace,
            deg: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.deg
    }

    pub fn is_empty(&self) -> bool {
        self.deg == 0
    }

    pub fn clear(&mut self) {
        self.deg = 0;
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.slots[..self.deg]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, usize> {
        self.as_slice().iter()
    }

    /// Removes the entry at `pos` by moving the last live entry into its slot.
    pub fn remove(&mut self, pos: usize) {
        debug_assert!(pos < self.deg, "removal at {} from pattern of {}", pos, self.deg);
        self.deg -= 1;
        self.slots[pos] = self.slots[self.deg];
    }

    pub fn append(&mut self, index: usize) {
        self.slots[self.deg] = index;
        self.deg += 1;
    }

    pub fn extend(&mut self, indices: &[usize]) {
        self.slots[self.deg..self.deg + indices.len()].copy_from_slice(indices);
        self.deg += indices.len();
    }

    /// Replaces the whole pattern with `indices`.
    pub fn load(&mut self, indices: &[usize]) {
        self.deg = 0;
        self.extend(indices);
    }

    /// Drops the `n` most recently appended entries.
    pub fn pop(&mut self, n: usize) {
        debug_assert!(n <= self.deg);
        self.deg -= n;
    }

    /// Undoes a [`Self::remove`]: the entry at `pos` moves to the end and `index` takes its slot.
    pub fn restore(&mut self, pos: usize, index: usize) {
        debug_assert!(pos <= self.deg);
        self.slots[self.deg] = self.slots[pos];
        self.slots[pos] = index;
        self.deg += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(p: &PatternSet) -> Vec<usize> {
        let mut v = p.as_slice().to_vec();
        v.sort_unstable();
        v
    }

    #[test]
    fn test_chain_inheritance() {
        let mut work = [0; 8];
        let mut p = PatternSet::new(&mut work);
        p.extend(&[5, 7, 9]);
        let pos = p.iter().position(|&r| r == 7).unwrap();
        p.remove(pos);
        p.append(11);
        assert_eq!(p.len(), 3);
        assert_eq!(sorted(&p), vec![5, 9, 11]);
    }

    #[test]
    fn test_remove_last() {
        let mut work = [0; 4];
        let mut p = PatternSet::new(&mut work);
        p.extend(&[3, 4]);
        p.remove(1);
        assert_eq!(p.as_slice(), &[3]);
        p.remove(0);
        assert!(p.is_empty());
    }

    #[test]
    fn test_restore_undoes_remove() {
        let mut work = [0; 6];
        let mut p = PatternSet::new(&mut work);
        p.load(&[2, 6, 4, 8]);
        p.remove(1);
        assert_eq!(p.as_slice(), &[2, 8, 4]);
        p.restore(1, 6);
        assert_eq!(p.as_slice(), &[2, 6, 4, 8]);

        // restoring into an empty pattern
        p.clear();
        p.restore(0, 1);
        assert_eq!(p.as_slice(), &[1]);
    }

    #[test]
    fn test_pop_and_load() {
        let mut work = [0; 6];
        let mut p = PatternSet::new(&mut work);
        p.load(&[1, 2, 3]);
        p.extend(&[7, 8]);
        p.pop(2);
        assert_eq!(p.as_slice(), &[1, 2, 3]);
        p.load(&[9]);
        assert_eq!(p.as_slice(), &[9]);
    }
}
