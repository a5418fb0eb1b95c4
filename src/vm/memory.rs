//! Intcode memory subsystem.
//!
//! Memory is conceptually an infinite array of signed integers. Addresses
//! covered by the loaded program live in a contiguous vector; anything the
//! program touches beyond that spills into a sparse overflow map. Unwritten
//! addresses read as zero.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Sparse, growable Intcode memory.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    cells: Vec<i64>,
    overflow: FxHashMap<usize, i64>,
}

impl Memory {
    /// Create memory seeded with a program at addresses `0..program.len()`.
    pub fn new(program: &[i64]) -> Self {
        Self {
            cells: program.to_vec(),
            overflow: FxHashMap::default(),
        }
    }

    /// Read a cell. Addresses that were never written read as zero.
    #[inline]
    pub fn read(&self, addr: usize) -> i64 {
        match self.cells.get(addr) {
            Some(&value) => value,
            None => self.overflow.get(&addr).copied().unwrap_or(0),
        }
    }

    /// Write a cell.
    #[inline]
    pub fn write(&mut self, addr: usize, value: i64) {
        if let Some(cell) = self.cells.get_mut(addr) {
            *cell = value;
        } else if value == 0 {
            self.overflow.remove(&addr);
        } else {
            self.overflow.insert(addr, value);
        }
    }

    /// Length of the contiguous region seeded from the program.
    pub fn program_len(&self) -> usize {
        self.cells.len()
    }

    /// One past the highest address holding a non-zero overflow value,
    /// or the program length if nothing spilled.
    pub fn extent(&self) -> usize {
        self.overflow
            .keys()
            .map(|&addr| addr + 1)
            .max()
            .unwrap_or(0)
            .max(self.cells.len())
    }

    /// Copy of `count` cells starting at `start`.
    pub fn slice(&self, start: usize, count: usize) -> Vec<i64> {
        (start..start.saturating_add(count))
            .map(|addr| self.read(addr))
            .collect()
    }

    /// Dump address/value pairs for display.
    pub fn dump(&self, start: usize, count: usize) -> Vec<(usize, i64)> {
        (start..start.saturating_add(count))
            .map(|addr| (addr, self.read(addr)))
            .collect()
    }

    /// Overflow cells in ascending address order.
    pub fn overflow_cells(&self) -> Vec<(usize, i64)> {
        let mut cells: Vec<_> = self.overflow.iter().map(|(&a, &v)| (a, v)).collect();
        cells.sort_unstable();
        cells
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memory")
            .field("program_len", &self.cells.len())
            .field("overflow_cells", &self.overflow.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_memory_seeded_from_program() {
        let mem = Memory::new(&[1, 0, 0, 0, 99]);
        assert_eq!(mem.read(0), 1);
        assert_eq!(mem.read(4), 99);
        assert_eq!(mem.program_len(), 5);
    }

    #[test]
    fn test_unwritten_reads_zero() {
        let mem = Memory::new(&[7]);
        assert_eq!(mem.read(1), 0);
        assert_eq!(mem.read(1_000_000), 0);
    }

    #[test]
    fn test_write_beyond_program() {
        let mut mem = Memory::new(&[1, 2, 3]);
        mem.write(1000, -42);
        assert_eq!(mem.read(1000), -42);
        assert_eq!(mem.extent(), 1001);
        assert_eq!(mem.overflow_cells(), vec![(1000, -42)]);

        mem.write(1000, 0);
        assert_eq!(mem.read(1000), 0);
        assert_eq!(mem.extent(), 3);
    }

    #[test]
    fn test_slice_spans_both_regions() {
        let mut mem = Memory::new(&[5, 6]);
        mem.write(3, 9);
        assert_eq!(mem.slice(0, 5), vec![5, 6, 0, 9, 0]);
    }

    proptest! {
        #[test]
        fn last_write_wins(
            program in proptest::collection::vec(any::<i64>(), 0..32),
            writes in proptest::collection::vec((0usize..256, any::<i64>()), 0..64),
        ) {
            let mut mem = Memory::new(&program);
            let mut model = std::collections::HashMap::new();
            for (i, &v) in program.iter().enumerate() {
                model.insert(i, v);
            }
            for &(addr, value) in &writes {
                mem.write(addr, value);
                model.insert(addr, value);
            }
            for addr in 0..256 {
                prop_assert_eq!(mem.read(addr), model.get(&addr).copied().unwrap_or(0));
            }
        }
    }
}
