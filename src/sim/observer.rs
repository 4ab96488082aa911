//! Module handles change observers,
//! which store which registers and memory words have been touched since the last reset.
//!
//! You would typically access the observer through the [`Processor`] query methods
//! ([`Processor::changed_regs`], [`Processor::changed_mem`], [`Processor::mem_accesses`]).
//!
//! Changes are kept in first-write order, so a front-end can list them
//! in the order they happened.
//!
//! [`Processor`]: crate::sim::Processor
//! [`Processor::changed_regs`]: crate::sim::Processor::changed_regs
//! [`Processor::changed_mem`]: crate::sim::Processor::changed_mem
//! [`Processor::mem_accesses`]: crate::sim::Processor::mem_accesses

use std::collections::BTreeMap;

use crate::ast::Reg;

/// The set of accesses which have occurred at this location.
///
/// ## Example
///
/// ```
/// # use mips_stepper::sim::observer::AccessSet;
///
/// let accesses = AccessSet::READ;
/// assert!(accesses.accessed());
/// assert!(accesses.read());
/// assert!(!accesses.written());
/// ```
#[derive(Default, Clone, Copy, PartialEq, Eq)]
pub struct AccessSet(u8);
impl AccessSet {
    /// Set with only the read flag enabled.
    pub const READ: Self = Self(1 << 0);
    /// Set with only the write flag enabled.
    pub const WRITTEN: Self = Self(1 << 1);

    /// True if any access has occurred.
    pub fn accessed(&self) -> bool {
        self.0 != 0
    }

    /// True if a read has occurred.
    pub fn read(&self) -> bool {
        self.0 & Self::READ.0 != 0
    }
    /// True if a write has occurred (does not necessarily have to change data).
    pub fn written(&self) -> bool {
        self.0 & Self::WRITTEN.0 != 0
    }
}
impl std::ops::BitOr for AccessSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}
impl std::ops::BitOrAssign for AccessSet {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}
impl std::fmt::Debug for AccessSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessSet")
            .field("read", &self.read())
            .field("written", &self.written())
            .finish()
    }
}

/// An insertion-ordered set of indices.
///
/// Membership is a bitset lookup. Iteration yields each index once,
/// in the order it was first inserted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    bits: Vec<u64>,
    order: Vec<usize>,
}
impl ChangeSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an index, returning whether it was newly added.
    pub fn insert(&mut self, index: usize) -> bool {
        let (word, bit) = (index / 64, index % 64);
        if word >= self.bits.len() {
            self.bits.resize(word + 1, 0);
        }

        let mask = 1 << bit;
        let fresh = self.bits[word] & mask == 0;
        if fresh {
            self.bits[word] |= mask;
            self.order.push(index);
        }
        fresh
    }

    /// Whether the index is in the set.
    pub fn contains(&self, index: usize) -> bool {
        self.bits.get(index / 64)
            .is_some_and(|w| w & (1 << (index % 64)) != 0)
    }

    /// The indices in first-insertion order.
    pub fn as_slice(&self) -> &[usize] {
        &self.order
    }

    /// The number of indices in the set.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Removes every index.
    pub fn clear(&mut self) {
        self.bits.clear();
        self.order.clear();
    }
}

/// A struct that tracks register writes and memory accesses.
#[derive(Debug, Default)]
pub struct ChangeObserver {
    regs: ChangeSet,
    mem: ChangeSet,
    mem_accesses: BTreeMap<usize, AccessSet>,
}
impl ChangeObserver {
    /// Creates a new change observer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all changes and accesses.
    pub fn clear(&mut self) {
        std::mem::take(self);
    }

    /// Records that a register was written.
    pub fn record_reg_write(&mut self, reg: Reg) {
        self.regs.insert(usize::from(reg));
    }

    /// Records that a memory word was read.
    ///
    /// Reads only update the access set. They are not changes.
    pub fn record_mem_read(&mut self, index: usize) {
        *self.mem_accesses.entry(index).or_default() |= AccessSet::READ;
    }

    /// Records that a memory word was written.
    pub fn record_mem_write(&mut self, index: usize) {
        self.mem.insert(index);
        *self.mem_accesses.entry(index).or_default() |= AccessSet::WRITTEN;
    }

    /// The registers written, in first-write order.
    pub fn changed_regs(&self) -> impl Iterator<Item = Reg> + '_ {
        // Only valid register numbers are ever inserted.
        self.regs.as_slice()
            .iter()
            .filter_map(|&i| u8::try_from(i).ok())
            .filter_map(|i| Reg::try_from(i).ok())
    }

    /// The memory words written, in first-write order.
    pub fn changed_mem(&self) -> &[usize] {
        self.mem.as_slice()
    }

    /// Gets the access set for the given memory word.
    pub fn mem_accesses(&self, index: usize) -> AccessSet {
        self.mem_accesses.get(&index).copied().unwrap_or_default()
    }
}
