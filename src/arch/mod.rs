//! Architecture-specific glue, gated behind `target_arch`.

#[cfg(any(target_arch = "x86_64", test))]
pub mod x86_64;
