//! Architecture-specific context switching
//!
//! Each architecture provides the same three items:
//!
//! - `Context`: the callee-saved register file of a suspended thread
//! - `init_context`: prepare a context that starts `entry` on a fresh stack
//! - `switch`: save the running context and resume another
//!
//! `switch` only preserves callee-saved state. It is always entered through
//! an ordinary function call, so everything caller-saved is already spilled
//! by the compiler, and when it is reached from the preemption handler the
//! kernel's signal frame holds the rest.

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        pub mod x86_64;
        pub use self::x86_64::{init_context, switch, Context};
    } else if #[cfg(target_arch = "aarch64")] {
        pub mod aarch64;
        pub use self::aarch64::{init_context, switch, Context};
    } else {
        compile_error!("Unsupported architecture");
    }
}

/// First function run on a fresh stack; must never return
pub type EntryFn = extern "C" fn() -> !;
