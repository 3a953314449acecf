//! Alignment macros and helpers.
//!
//! `align!` rounds up to a machine-word multiple and is kept from this
//! crate's original bump allocator; `align_to!` rounds up to an arbitrary
//! power-of-two alignment and was referenced by the inherited `bump` module
//! but never defined there, so it is restored here. Neither macro is
//! actually called anywhere in this crate outside its own tests and
//! doctests: every block-size computation goes through `align_up8`
//! instead, since the allocator's layout fixes the alignment at 8 bytes
//! rather than the host's native word size. They stay exported (and
//! `#[macro_export]`, matching the teacher) as vestiges of the lineage this
//! crate was built from, not as dead weight to be deleted — a downstream
//! user linking against this crate for its macros, not its allocator, is
//! exactly the kind of consumer the teacher's own crate served.

/// Calculates the machine word alignment for the given size.
///
/// # Examples
///
/// ```rust
/// use std::mem;
/// use segalloc::align;
///
/// match mem::size_of::<usize>() {
///     8 => assert_eq!(align!(13), 16), // 64 bit machine.
///     4 => assert_eq!(align!(11), 12), // 32 bit machine.
///     _ => {},
/// };
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    ($value + mem::size_of::<usize>() - 1) & !(mem::size_of::<usize>() - 1)
  };
}

/// Rounds `$value` up to the nearest multiple of `$align`, which must be a
/// power of two.
///
/// # Examples
///
/// ```rust
/// use segalloc::align_to;
///
/// assert_eq!(align_to!(13usize, 8), 16);
/// assert_eq!(align_to!(16usize, 8), 16);
/// ```
#[macro_export]
macro_rules! align_to {
  ($value:expr, $align:expr) => {
    ($value + ($align - 1)) & !($align - 1)
  };
}

/// Rounds `n` up to the nearest multiple of 8.
///
/// Every block size in the allocator — the adjusted request size, the
/// realloc target size, the bytes requested from the memory system — passes
/// through this function exactly once.
#[inline]
pub const fn align_up8(n: usize) -> usize {
  (n + 7) & !7
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::mem;

  #[test]
  fn test_align() {
    let ptr_size = mem::size_of::<usize>();

    let mut alignments = Vec::new();

    for i in 0..10 {
      let sizes = (ptr_size * i + 1)..=(ptr_size * (i + 1));

      let expected_alignment = ptr_size * (i + 1);

      alignments.push((sizes, expected_alignment));
    }

    for (sizes, expected) in alignments {
      for size in sizes {
        assert_eq!(expected, align!(size));
      }
    }
  }

  #[test]
  fn test_align_to() {
    assert_eq!(align_to!(0usize, 8), 0);
    assert_eq!(align_to!(1usize, 8), 8);
    assert_eq!(align_to!(8usize, 8), 8);
    assert_eq!(align_to!(9usize, 8), 16);
    assert_eq!(align_to!(1usize, 16), 16);
  }

  #[test]
  fn test_align_up8() {
    assert_eq!(align_up8(0), 0);
    assert_eq!(align_up8(1), 8);
    assert_eq!(align_up8(8), 8);
    assert_eq!(align_up8(9), 16);
    assert_eq!(align_up8(200), 200);
    assert_eq!(align_up8(201), 208);
  }
}
