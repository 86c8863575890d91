/**
 * ============================================================================
 * SLOT ARENA MODULE
 * ============================================================================
 *
 * PURPOSE: Fixed-capacity table of mounted feed positions
 *
 * Each occupied cell binds one feed index to a value. Cells are filled
 * by acquire() and emptied by release(); nothing is dropped implicitly.
 * Every acquisition gets a fresh SlotKey, so a key held by a callback
 * stops resolving once its cell is released or reused.
 *
 * ============================================================================
 */

/// Active slot plus one neighbour on each side
pub const NEAR_WINDOW_CAPACITY: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotKey {
    cell: usize,
    generation: u64,
}

#[derive(Debug)]
struct Cell<T> {
    index: usize,
    generation: u64,
    value: T,
}

#[derive(Debug)]
pub struct SlotArena<T> {
    cells: Vec<Option<Cell<T>>>,
    next_generation: u64,
}

impl<T> Default for SlotArena<T> {
    fn default() -> Self {
        Self::with_capacity(NEAR_WINDOW_CAPACITY)
    }
}

impl<T> SlotArena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cells: (0..capacity).map(|_| None).collect(),
            next_generation: 1,
        }
    }

    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    pub fn len(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mount `index`, building its value from the new key
    ///
    /// Returns None (without calling `make`) when `index` is already
    /// mounted or every cell is occupied.
    pub fn acquire_with<F>(&mut self, index: usize, make: F) -> Option<SlotKey>
    where
        F: FnOnce(SlotKey) -> T,
    {
        if self.contains(index) {
            return None;
        }

        let cell = self.cells.iter().position(|c| c.is_none())?;
        let generation = self.next_generation;
        self.next_generation += 1;

        let key = SlotKey { cell, generation };
        self.cells[cell] = Some(Cell {
            index,
            generation,
            value: make(key),
        });
        Some(key)
    }

    pub fn acquire(&mut self, index: usize, value: T) -> Option<SlotKey> {
        self.acquire_with(index, |_| value)
    }

    pub fn release(&mut self, index: usize) -> Option<T> {
        let cell = self.position_of(index)?;
        self.cells[cell].take().map(|c| c.value)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.position_of(index).is_some()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.position_of(index)
            .and_then(|cell| self.cells[cell].as_ref())
            .map(|c| &c.value)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        let cell = self.position_of(index)?;
        self.cells[cell].as_mut().map(|c| &mut c.value)
    }

    pub fn key_of(&self, index: usize) -> Option<SlotKey> {
        let cell = self.position_of(index)?;
        self.cells[cell].as_ref().map(|c| SlotKey {
            cell,
            generation: c.generation,
        })
    }

    /// Resolve a key to (index, value) if its acquisition is still live
    pub fn get_by_key_mut(&mut self, key: SlotKey) -> Option<(usize, &mut T)> {
        match self.cells.get_mut(key.cell) {
            Some(Some(c)) if c.generation == key.generation => Some((c.index, &mut c.value)),
            _ => None,
        }
    }

    pub fn is_live(&self, key: SlotKey) -> bool {
        matches!(self.cells.get(key.cell), Some(Some(c)) if c.generation == key.generation)
    }

    /// Mounted feed indices, ascending
    pub fn indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.cells.iter().flatten().map(|c| c.index).collect();
        indices.sort_unstable();
        indices
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.cells.iter().flatten().map(|c| (c.index, &c.value))
    }

    /// Empty every cell, returning (index, value) pairs
    pub fn drain(&mut self) -> Vec<(usize, T)> {
        self.cells
            .iter_mut()
            .filter_map(|c| c.take())
            .map(|c| (c.index, c.value))
            .collect()
    }

    fn position_of(&self, index: usize) -> Option<usize> {
        self.cells
            .iter()
            .position(|c| matches!(c, Some(c) if c.index == index))
    }
}
