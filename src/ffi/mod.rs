// In: src/ffi/mod.rs

//! Host-language surfaces over the `bridge`. Only CPython is supported.

#[cfg(feature = "python")]
pub mod python;
