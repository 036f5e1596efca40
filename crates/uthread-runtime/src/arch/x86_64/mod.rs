//! x86_64 context switching implementation
//!
//! `#[unsafe(naked)]` + `naked_asm!`, stable since Rust 1.88.

use std::arch::naked_asm;

use super::EntryFn;

/// Callee-saved registers of a suspended thread (System V AMD64)
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct Context {
    pub rsp: u64, // 0x00
    pub rip: u64, // 0x08
    pub rbx: u64, // 0x10
    pub rbp: u64, // 0x18
    pub r12: u64, // 0x20
    pub r13: u64, // 0x28
    pub r14: u64, // 0x30
    pub r15: u64, // 0x38
}

impl Context {
    #[inline]
    pub fn stack_pointer(&self) -> usize {
        self.rsp as usize
    }
}

/// Prepare `ctx` so that switching to it calls `entry` on the given stack
///
/// The trampoline is entered by a jump with `rsp` 16-byte aligned, so the
/// `call` into `entry` leaves `rsp + 8` aligned as the ABI expects.
///
/// # Safety
///
/// `stack_top` must be the top of a writable stack that outlives every
/// switch into `ctx`.
#[inline]
pub unsafe fn init_context(ctx: &mut Context, stack_top: *mut u8, entry: EntryFn) {
    let sp = (stack_top as usize) & !0xF;

    *ctx = Context {
        rsp: sp as u64,
        rip: trampoline_addr(),
        r12: entry as usize as u64,
        ..Context::default()
    };
}

#[inline]
fn trampoline_addr() -> u64 {
    entry_trampoline as unsafe extern "C" fn() -> ! as usize as u64
}

/// Calls the entry function held in r12; rbp is zero so unwinders stop here
#[unsafe(naked)]
unsafe extern "C" fn entry_trampoline() -> ! {
    naked_asm!(
        "call r12",
        "ud2",
    );
}

/// Save callee-saved registers to `save` and resume from `load`
///
/// Returns when some other thread switches back to `save`.
///
/// # Safety
///
/// `load` must hold a context produced by `init_context` or by an earlier
/// `switch`, whose stack is still mapped.
#[unsafe(naked)]
pub unsafe extern "C" fn switch(_save: *mut Context, _load: *const Context) {
    naked_asm!(
        // Save into `save` (RDI)
        "mov [rdi + 0x00], rsp",
        "lea rax, [rip + 1f]",
        "mov [rdi + 0x08], rax",
        "mov [rdi + 0x10], rbx",
        "mov [rdi + 0x18], rbp",
        "mov [rdi + 0x20], r12",
        "mov [rdi + 0x28], r13",
        "mov [rdi + 0x30], r14",
        "mov [rdi + 0x38], r15",
        // Load from `load` (RSI)
        "mov rsp, [rsi + 0x00]",
        "mov rax, [rsi + 0x08]",
        "mov rbx, [rsi + 0x10]",
        "mov rbp, [rsi + 0x18]",
        "mov r12, [rsi + 0x20]",
        "mov r13, [rsi + 0x28]",
        "mov r14, [rsi + 0x30]",
        "mov r15, [rsi + 0x38]",
        "jmp rax",
        // Resume point of a saved context
        "1:",
        "ret",
    );
}
