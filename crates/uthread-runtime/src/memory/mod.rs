//! Thread stack memory
//!
//! Each spawned thread owns one [`Stack`]: a private anonymous mapping with
//! an inaccessible guard page below the usable range, so an overflow faults
//! instead of silently corrupting a neighbour. The mapping is released when
//! the `Stack` is dropped, which happens exactly once, when the owning thread
//! record is torn down.

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod unix;
        pub use unix::Stack;
    } else {
        compile_error!("uthread stacks need mmap");
    }
}

use uthread_core::constants::PAGE_SIZE;

/// Round `size` up to a whole number of pages
#[inline]
pub fn page_align(size: usize) -> Option<usize> {
    size.checked_add(PAGE_SIZE - 1).map(|s| s & !(PAGE_SIZE - 1))
}
