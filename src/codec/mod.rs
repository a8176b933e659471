// In: src/codec/mod.rs

//! The shape codec: lossless, order-preserving conversion between the host
//! shape model in `types` and the `#[repr(C)]` wire structures in
//! `native::abi`.
//!
//! Encoding is split by ownership:
//!
//! - Flat values (points, cells) encode into plain `Vec`s the caller passes
//!   by pointer.
//! - Nested shapes encode into a *buffer* type (`LatLongShapeBuffer`,
//!   `DggsShapeBuffer`) that owns every array the wire pointers refer to. The
//!   wire view is valid for as long as the buffer is alive.
//!
//! Decoding copies everything into host-owned values, so the engine's output
//! can be released as soon as decoding returns.

mod cell;
mod dggs;
mod lat_long;

use std::os::raw::c_ushort;
use std::slice;

use crate::error::EaggrError;
use crate::native::MAX_WIRE_COUNT;

pub use cell::{decode_cell, decode_cells, encode_cell, encode_cells};
pub use dggs::{decode_dggs_shape, decode_dggs_shapes, DggsShapeBuffer};
pub use lat_long::{
    decode_lat_long_shape, decode_point, decode_points, encode_point, encode_points,
    LatLongShapeBuffer,
};

/// Converts a host length into the header's `unsigned short` count.
pub fn wire_count(len: usize, what: &str) -> Result<c_ushort, EaggrError> {
    c_ushort::try_from(len).map_err(|_| {
        EaggrError::InvalidArgument(format!(
            "Too many {}: {} exceeds the maximum of {}",
            what, len, MAX_WIRE_COUNT
        ))
    })
}

/// Borrows a counted wire array.
///
/// # Safety
/// When `count > 0` and `ptr` is non-null, `ptr` must point at `count`
/// initialised elements that outlive `'a`.
pub(crate) unsafe fn wire_slice<'a, T>(
    ptr: *const T,
    count: c_ushort,
    what: &str,
) -> Result<&'a [T], EaggrError> {
    if count == 0 {
        return Ok(&[]);
    }
    if ptr.is_null() {
        return Err(EaggrError::InvalidState(format!(
            "{} has {} elements but a null array",
            what, count
        )));
    }
    Ok(slice::from_raw_parts(ptr, count as usize))
}
