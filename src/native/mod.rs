// In: src/native/mod.rs

//! Everything that touches the engine's C ABI directly: the wire layouts and
//! entry point table (`abi`), the process-wide library loader (`loader`) and
//! the guards that return engine-allocated buffers (`buffers`).

pub mod abi;
pub mod buffers;
pub mod loader;

#[cfg(test)]
pub(crate) mod fake;

pub use abi::{
    NativeApi, MAX_CELL_STRING_LENGTH, MAX_CHILD_CELLS, MAX_PARENT_CELLS, MAX_SIBLING_CELLS,
    MAX_WIRE_COUNT, VERSION_STRING_LENGTH,
};
pub use loader::{is_library_loaded, load};
