//! Fixed-capacity arena with first-fit allocation.
//!
//! Slots are never dropped or pushed after construction. "Allocate" writes
//! into the first inactive slot, "release" flips the slot's flag.

/// An entry that can sit idle in a [`SlotPool`].
pub trait Slot {
    fn is_active(&self) -> bool;
    fn deactivate(&mut self);
}

#[derive(Clone, Debug)]
pub struct SlotPool<T> {
    slots: Vec<T>,
}

impl<T: Slot> SlotPool<T> {
    /// `make(i)` builds the idle value for slot `i`.
    pub fn new(capacity: usize, make: impl FnMut(usize) -> T) -> Self {
        SlotPool { slots: (0..capacity).map(make).collect() }
    }

    pub fn capacity(&self) -> usize { self.slots.len() }

    /// Overwrite the first inactive slot with `value`. `None` when full.
    pub fn allocate(&mut self, value: T) -> Option<usize> {
        let index = self.slots.iter().position(|s| !s.is_active())?;
        self.slots[index] = value;
        Some(index)
    }

    pub fn release(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.deactivate();
        }
    }

    /// Deactivate every slot.
    pub fn reset(&mut self) {
        self.slots.iter_mut().for_each(Slot::deactivate);
    }

    pub fn get(&self, index: usize) -> Option<&T> { self.slots.get(index) }
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> { self.slots.get_mut(index) }

    /// All slots, active or not, in index order.
    pub fn slots(&self) -> &[T] { &self.slots }

    pub fn iter_active(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter(|s| s.is_active())
    }

    pub fn iter_active_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut().filter(|s| s.is_active())
    }

    pub fn active_count(&self) -> usize { self.iter_active().count() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Cell { tag: u32, on: bool }

    impl Slot for Cell {
        fn is_active(&self) -> bool { self.on }
        fn deactivate(&mut self) { self.on = false; }
    }

    fn pool(n: usize) -> SlotPool<Cell> {
        SlotPool::new(n, |i| Cell { tag: i as u32, on: false })
    }

    #[test]
    fn first_fit_and_reuse() {
        let mut p = pool(3);
        assert_eq!(p.allocate(Cell { tag: 10, on: true }), Some(0));
        assert_eq!(p.allocate(Cell { tag: 11, on: true }), Some(1));
        p.release(0);
        assert_eq!(p.allocate(Cell { tag: 12, on: true }), Some(0));
        assert_eq!(p.get(0).map(|c| c.tag), Some(12));
        assert_eq!(p.active_count(), 2);
    }

    #[test]
    fn full_pool_refuses() {
        let mut p = pool(2);
        p.allocate(Cell { tag: 1, on: true });
        p.allocate(Cell { tag: 2, on: true });
        assert_eq!(p.allocate(Cell { tag: 3, on: true }), None);
        assert_eq!(p.capacity(), 2);
    }

    #[test]
    fn reset_keeps_capacity() {
        let mut p = pool(4);
        p.allocate(Cell { tag: 1, on: true });
        p.reset();
        assert_eq!(p.active_count(), 0);
        assert_eq!(p.slots().len(), 4);
        // out of range release is a no-op
        p.release(99);
    }
}
