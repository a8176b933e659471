// In: src/codec/cell.rs

use std::os::raw::c_char;

use bytemuck::Zeroable;

use super::wire_count;
use crate::error::EaggrError;
use crate::native::abi::{WireCell, MAX_CELL_STRING_LENGTH};
use crate::types::DggsCell;

/// Copies a cell identifier into a fixed, NUL-terminated wire buffer.
///
/// Identifiers longer than `MAX_CELL_STRING_LENGTH - 1` bytes, or containing
/// a NUL byte, cannot cross the boundary and are rejected here.
pub fn encode_cell(cell: &DggsCell) -> Result<WireCell, EaggrError> {
    let id = cell.cell_id().as_bytes();
    if id.len() >= MAX_CELL_STRING_LENGTH {
        return Err(EaggrError::InvalidArgument(format!(
            "Cell ID '{}' is {} characters long; the maximum is {}",
            cell.cell_id(),
            id.len(),
            MAX_CELL_STRING_LENGTH - 1
        )));
    }
    if id.contains(&0) {
        return Err(EaggrError::InvalidArgument(format!(
            "Cell ID {:?} contains a NUL character",
            cell.cell_id()
        )));
    }
    let mut wire = WireCell::zeroed();
    for (slot, &byte) in wire.0.iter_mut().zip(id) {
        *slot = byte as c_char;
    }
    Ok(wire)
}

/// Reads a wire cell, stopping at the first NUL (or the end of the buffer).
pub fn decode_cell(wire: &WireCell) -> Result<DggsCell, EaggrError> {
    let bytes: Vec<u8> = wire
        .0
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8(bytes)
        .map(DggsCell::new)
        .map_err(|e| EaggrError::InvalidState(format!("Cell ID is not valid UTF-8: {}", e)))
}

pub fn encode_cells(cells: &[DggsCell]) -> Result<Vec<WireCell>, EaggrError> {
    wire_count(cells.len(), "cells")?;
    cells.iter().map(encode_cell).collect()
}

pub fn decode_cells(wire: &[WireCell]) -> Result<Vec<DggsCell>, EaggrError> {
    wire.iter().map(decode_cell).collect()
}
