//! Memory handling for the processor.
//!
//! This module consists of:
//! - [`RegFile`]: The register file.
//! - [`Mem`]: The data memory.
//!
//! Both hold plain 32-bit words and start zeroed.
//! Neither records accesses. That is done by the processor
//! through its [`ChangeObserver`](super::observer::ChangeObserver).

use crate::ast::Reg;

/// The smallest data memory the processor will create, in words.
pub const MIN_MEM_WORDS: usize = 4096;
/// The largest data memory the processor will create, in words (256 MiB).
pub const MAX_MEM_WORDS: usize = 1 << 26;

/// The register file.
///
/// This struct can be indexed with a [`Reg`]
/// (which can be constructed using the [`crate::ast::reg_consts`] module or via [`Reg::try_from`]).
///
/// Every slot is writable, including `$zero`.
///
/// # Example
///
/// ```
/// use mips_stepper::sim::mem::RegFile;
/// use mips_stepper::ast::reg_consts::R0;
///
/// let mut reg = RegFile::new();
/// reg[R0] = 11;
/// assert_eq!(reg[R0], 11);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegFile([i32; Reg::COUNT]);
impl RegFile {
    /// Creates a zeroed register file.
    pub fn new() -> Self {
        Self([0; Reg::COUNT])
    }

    /// The registers as an array, indexed by register number.
    pub fn as_array(&self) -> &[i32; Reg::COUNT] {
        &self.0
    }

    /// Zeroes every register.
    pub fn clear(&mut self) {
        self.0 = [0; Reg::COUNT];
    }
}
impl Default for RegFile {
    fn default() -> Self {
        Self::new()
    }
}
impl std::ops::Index<Reg> for RegFile {
    type Output = i32;

    fn index(&self, index: Reg) -> &Self::Output {
        &self.0[usize::from(index)]
    }
}
impl std::ops::IndexMut<Reg> for RegFile {
    fn index_mut(&mut self, index: Reg) -> &mut Self::Output {
        &mut self.0[usize::from(index)]
    }
}

/// The data memory: a fixed number of 32-bit words indexed from 0.
///
/// Note that this is held in the heap, as it can be too large for the stack.
///
/// [`Mem::get`] and [`Mem::set`] return `None` for any index outside `0..len`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mem(Box<[i32]>);
impl Mem {
    /// Creates zeroed memory with the given number of words.
    ///
    /// The size is clamped between [`MIN_MEM_WORDS`] and [`MAX_MEM_WORDS`].
    pub fn new(words: usize) -> Self {
        Self(vec![0; words.clamp(MIN_MEM_WORDS, MAX_MEM_WORDS)].into_boxed_slice())
    }

    /// The number of words in memory.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether memory has no words (never true after [`Mem::new`]).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Reads the word at the given index.
    pub fn get(&self, index: usize) -> Option<i32> {
        self.0.get(index).copied()
    }

    /// Writes the word at the given index, returning `None` if it is out of range.
    pub fn set(&mut self, index: usize, value: i32) -> Option<()> {
        *self.0.get_mut(index)? = value;
        Some(())
    }

    /// Memory as a slice.
    pub fn as_slice(&self) -> &[i32] {
        &self.0
    }

    /// Zeroes every word.
    pub fn clear(&mut self) {
        self.0.fill(0);
    }
}
