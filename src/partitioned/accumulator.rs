//! Accumulation of individually produced cell values into a partition.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use parking_lot::Mutex;

use crate::ArrayIndices;

/// Collects cell values destined for one partition until all of its cells
/// have arrived.
///
/// Producers insert values keyed by logical array indices, concurrently and
/// in any order. Re-inserting a cell overwrites the previous value (the last
/// writer wins) without advancing the fill count, so the accumulator is full
/// exactly when every distinct cell has been written at least once. Draining
/// hands the values out exactly once.
#[derive(Debug)]
pub struct PartitionInputAccumulator<T> {
    nr_cells: usize,
    cells: Mutex<HashMap<ArrayIndices, T>>,
    nr_distinct: AtomicUsize,
    drained: AtomicBool,
}

impl<T: Copy + Default> PartitionInputAccumulator<T> {
    /// Create an accumulator expecting `nr_cells` distinct cells.
    #[must_use]
    pub fn new(nr_cells: usize) -> Self {
        Self {
            nr_cells,
            cells: Mutex::new(HashMap::with_capacity(nr_cells)),
            nr_distinct: AtomicUsize::new(0),
            drained: AtomicBool::new(false),
        }
    }

    /// The number of distinct cells the accumulator expects.
    #[must_use]
    pub fn nr_cells(&self) -> usize {
        self.nr_cells
    }

    /// Insert the value of the cell at `indices` (logical array indices).
    ///
    /// Returns whether the insert made the accumulator full.
    pub fn insert(&self, indices: ArrayIndices, value: T) -> bool {
        let previous = self.cells.lock().insert(indices, value);
        if previous.is_none() {
            self.nr_distinct.fetch_add(1, Ordering::AcqRel) + 1 == self.nr_cells
        } else {
            false
        }
    }

    /// Return whether every distinct cell has been written at least once.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.nr_distinct.load(Ordering::Acquire) == self.nr_cells
    }

    /// Drain the accumulated values into a row-major tile covering the
    /// hyperslab at `offset` of `shape`.
    ///
    /// The first call returns the tile; subsequent calls return `None`.
    /// Cells never written come out as `T::default()`.
    #[must_use]
    pub fn drain(&self, offset: &[u64], shape: &[u64]) -> Option<Vec<T>> {
        if self.drained.swap(true, Ordering::AcqRel) {
            return None;
        }
        if self.nr_cells == 0 {
            return Some(Vec::new());
        }
        let mut cells = self.cells.lock();
        let mut tile = Vec::with_capacity(self.nr_cells);
        let mut indices: ArrayIndices = offset.to_vec();
        loop {
            tile.push(cells.remove(&indices).unwrap_or_default());
            if tile.len() == self.nr_cells {
                break;
            }
            // Advance to the next cell in row-major order.
            for dimension in (0..shape.len()).rev() {
                indices[dimension] += 1;
                if indices[dimension] < offset[dimension] + shape[dimension] {
                    break;
                }
                indices[dimension] = offset[dimension];
            }
        }
        Some(tile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_once_per_distinct_cell() {
        let accumulator = PartitionInputAccumulator::new(4);
        assert!(!accumulator.insert(vec![0, 0], 1i32));
        assert!(!accumulator.insert(vec![0, 1], 2));
        // Overwriting does not advance the fill count.
        assert!(!accumulator.insert(vec![0, 1], 20));
        assert!(!accumulator.insert(vec![1, 0], 3));
        assert!(!accumulator.is_full());
        assert!(accumulator.insert(vec![1, 1], 4));
        assert!(accumulator.is_full());

        let tile = accumulator.drain(&[0, 0], &[2, 2]).unwrap();
        // The last writer wins.
        assert_eq!(tile, vec![1, 20, 3, 4]);
        // Draining happens exactly once.
        assert!(accumulator.drain(&[0, 0], &[2, 2]).is_none());
    }

    #[test]
    fn drains_with_offset() {
        let accumulator = PartitionInputAccumulator::new(6);
        // Cells of the partition at offset [10, 20], shape [2, 3].
        for row in 0..2u64 {
            for column in 0..3u64 {
                accumulator.insert(vec![10 + row, 20 + column], (row * 3 + column) as i64);
            }
        }
        assert!(accumulator.is_full());
        assert_eq!(
            accumulator.drain(&[10, 20], &[2, 3]).unwrap(),
            vec![0, 1, 2, 3, 4, 5]
        );
    }
}
