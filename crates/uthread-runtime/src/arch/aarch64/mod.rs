//! aarch64 context switching implementation (AAPCS64)

use std::arch::naked_asm;

use super::EntryFn;

/// Callee-saved registers of a suspended thread
///
/// x19-x28, the frame pointer, the link register, the stack pointer and
/// the low halves of v8-v15.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct Context {
    pub sp: u64,       // 0x00
    pub lr: u64,       // 0x08
    pub x: [u64; 10],  // 0x10 x19..x28
    pub fp: u64,       // 0x60
    pub d: [u64; 8],   // 0x68 d8..d15
}

impl Context {
    #[inline]
    pub fn stack_pointer(&self) -> usize {
        self.sp as usize
    }
}

/// Prepare `ctx` so that switching to it calls `entry` on the given stack
///
/// # Safety
///
/// `stack_top` must be the top of a writable stack that outlives every
/// switch into `ctx`.
#[inline]
pub unsafe fn init_context(ctx: &mut Context, stack_top: *mut u8, entry: EntryFn) {
    let sp = (stack_top as usize) & !0xF;

    *ctx = Context::default();
    ctx.sp = sp as u64;
    ctx.lr = trampoline_addr();
    ctx.x[0] = entry as usize as u64;
}

#[inline]
fn trampoline_addr() -> u64 {
    entry_trampoline as unsafe extern "C" fn() -> ! as usize as u64
}

/// Calls the entry function held in x19
#[unsafe(naked)]
unsafe extern "C" fn entry_trampoline() -> ! {
    naked_asm!(
        "mov x29, xzr",
        "blr x19",
        "brk #0",
    );
}

/// Save callee-saved registers to `save` and resume from `load`
///
/// # Safety
///
/// `load` must hold a context produced by `init_context` or by an earlier
/// `switch`, whose stack is still mapped.
#[unsafe(naked)]
pub unsafe extern "C" fn switch(_save: *mut Context, _load: *const Context) {
    naked_asm!(
        // Save into `save` (x0)
        "mov x9, sp",
        "str x9, [x0, #0x00]",
        "str x30, [x0, #0x08]",
        "stp x19, x20, [x0, #0x10]",
        "stp x21, x22, [x0, #0x20]",
        "stp x23, x24, [x0, #0x30]",
        "stp x25, x26, [x0, #0x40]",
        "stp x27, x28, [x0, #0x50]",
        "str x29, [x0, #0x60]",
        "stp d8, d9, [x0, #0x68]",
        "stp d10, d11, [x0, #0x78]",
        "stp d12, d13, [x0, #0x88]",
        "stp d14, d15, [x0, #0x98]",
        // Load from `load` (x1)
        "ldr x9, [x1, #0x00]",
        "mov sp, x9",
        "ldr x30, [x1, #0x08]",
        "ldp x19, x20, [x1, #0x10]",
        "ldp x21, x22, [x1, #0x20]",
        "ldp x23, x24, [x1, #0x30]",
        "ldp x25, x26, [x1, #0x40]",
        "ldp x27, x28, [x1, #0x50]",
        "ldr x29, [x1, #0x60]",
        "ldp d8, d9, [x1, #0x68]",
        "ldp d10, d11, [x1, #0x78]",
        "ldp d12, d13, [x1, #0x88]",
        "ldp d14, d15, [x1, #0x98]",
        "ret",
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_layout() {
        assert_eq!(std::mem::size_of::<Context>(), 0xA8);
        assert_eq!(std::mem::offset_of!(Context, fp), 0x60);
        assert_eq!(std::mem::offset_of!(Context, d), 0x68);
    }

    extern "C" fn never() -> ! {
        std::process::abort()
    }

    #[test]
    fn test_fresh_context_targets_trampoline() {
        let mut stack = [0u8; 256];
        let mut ctx = Context::default();
        unsafe {
            init_context(&mut ctx, stack.as_mut_ptr().add(stack.len()), never);
        }
        assert_eq!(ctx.lr, trampoline_addr());
        assert_eq!(ctx.x[0], never as EntryFn as usize as u64);
        assert_eq!(ctx.fp, 0);
    }
}
