//! Unix stack implementation using mmap

use std::ptr::NonNull;

use uthread_core::constants::PAGE_SIZE;
use uthread_core::error::{MemoryError, SchedError, SchedResult};
use uthread_core::kwarn;

use super::page_align;

/// An owned, guard-paged thread stack
///
/// Layout, low to high: one `PROT_NONE` guard page, then `size` usable
/// bytes. The stack grows down from [`Stack::top`].
pub struct Stack {
    /// Start of the mapping (the guard page)
    base: NonNull<u8>,

    /// Whole mapping length, guard included
    map_len: usize,
}

impl Stack {
    /// Map a stack with at least `size` usable bytes
    pub fn new(size: usize) -> SchedResult<Self> {
        if size == 0 {
            return Err(SchedError::InvalidArgument("stack size must be positive"));
        }
        let usable = page_align(size).ok_or(MemoryError::AllocationFailed)?;
        let map_len = usable
            .checked_add(PAGE_SIZE)
            .ok_or(MemoryError::AllocationFailed)?;

        let addr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                map_len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if addr == libc::MAP_FAILED {
            return Err(MemoryError::AllocationFailed.into());
        }

        // Lowest page traps overflow
        let ret = unsafe { libc::mprotect(addr, PAGE_SIZE, libc::PROT_NONE) };
        if ret != 0 {
            unsafe {
                libc::munmap(addr, map_len);
            }
            return Err(MemoryError::ProtectionFailed.into());
        }

        let base = NonNull::new(addr.cast::<u8>()).ok_or(MemoryError::AllocationFailed)?;
        Ok(Self { base, map_len })
    }

    /// Usable bytes
    #[inline]
    pub fn size(&self) -> usize {
        self.map_len - PAGE_SIZE
    }

    /// Lowest usable address
    #[inline]
    pub fn bottom(&self) -> *mut u8 {
        unsafe { self.base.as_ptr().add(PAGE_SIZE) }
    }

    /// One past the highest usable address; page aligned
    #[inline]
    pub fn top(&self) -> *mut u8 {
        unsafe { self.base.as_ptr().add(self.map_len) }
    }
}

impl Drop for Stack {
    fn drop(&mut self) {
        let ret = unsafe { libc::munmap(self.base.as_ptr().cast(), self.map_len) };
        if ret != 0 {
            kwarn!("munmap of stack at {:p} failed", self.base);
        }
    }
}

impl std::fmt::Debug for Stack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stack")
            .field("bottom", &self.bottom())
            .field("top", &self.top())
            .finish()
    }
}
