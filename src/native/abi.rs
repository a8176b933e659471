// In: src/native/abi.rs

//! `#[repr(C)]` mirrors of the engine header's data structures and the typed
//! signatures of its exported functions.
//!
//! Nothing in this file allocates or frees; the codec owns host-side buffers
//! and the `buffers` guards own engine-side ones.

use std::fmt;
use std::os::raw::{c_char, c_double, c_int, c_ushort, c_void};

use bytemuck::Zeroable;

//==================================================================================
// I. Constants
//==================================================================================

/// Bytes in a wire cell, including the NUL terminator.
pub const MAX_CELL_STRING_LENGTH: usize = 43;
pub const MAX_PARENT_CELLS: usize = 3;
pub const MAX_CHILD_CELLS: usize = 7;
pub const MAX_SIBLING_CELLS: usize = 15;
/// Bytes in the version string, including the NUL terminator.
pub const VERSION_STRING_LENGTH: usize = 5;
/// Largest element count expressible in the header's `unsigned short` fields.
pub const MAX_WIRE_COUNT: usize = c_ushort::MAX as usize;

pub type DggsHandle = *mut c_void;

//==================================================================================
// II. Lat/Long Wire Structures
//==================================================================================

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Zeroable)]
pub struct WireLatLongPoint {
    pub latitude: c_double,
    pub longitude: c_double,
    pub accuracy: c_double,
}

#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct WireLatLongLinestring {
    pub points: *mut WireLatLongPoint,
    pub no_of_points: c_ushort,
}

#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct WireLatLongPolygon {
    pub outer_ring: WireLatLongLinestring,
    pub inner_rings: *mut WireLatLongLinestring,
    pub no_of_inner_rings: c_ushort,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union WireLatLongShapeData {
    pub point: WireLatLongPoint,
    pub linestring: WireLatLongLinestring,
    pub polygon: WireLatLongPolygon,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct WireLatLongShape {
    pub shape_type: c_int,
    pub data: WireLatLongShapeData,
}

//==================================================================================
// III. DGGS Wire Structures
//==================================================================================

/// A NUL-terminated cell identifier in a fixed buffer.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct WireCell(pub [c_char; MAX_CELL_STRING_LENGTH]);

impl fmt::Debug for WireCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes: Vec<u8> = self
            .0
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8)
            .collect();
        write!(f, "WireCell({:?})", String::from_utf8_lossy(&bytes))
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct WireDggsLinestring {
    pub cells: *mut WireCell,
    pub no_of_cells: c_ushort,
}

#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct WireDggsPolygon {
    pub outer_ring: WireDggsLinestring,
    pub inner_rings: *mut WireDggsLinestring,
    pub no_of_inner_rings: c_ushort,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union WireDggsShapeData {
    pub cell: WireCell,
    pub linestring: WireDggsLinestring,
    pub polygon: WireDggsPolygon,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct WireDggsShape {
    pub shape_type: c_int,
    pub data: WireDggsShapeData,
    pub location: c_int,
}

// SAFETY: every field is an integer, a float, a raw pointer or an array of
// those, all of which are valid when zeroed (null pointers, zero counts).
unsafe impl Zeroable for WireCell {}
unsafe impl Zeroable for WireLatLongLinestring {}
unsafe impl Zeroable for WireLatLongPolygon {}
unsafe impl Zeroable for WireLatLongShapeData {}
unsafe impl Zeroable for WireLatLongShape {}
unsafe impl Zeroable for WireDggsLinestring {}
unsafe impl Zeroable for WireDggsPolygon {}
unsafe impl Zeroable for WireDggsShapeData {}
unsafe impl Zeroable for WireDggsShape {}

//==================================================================================
// IV. Entry Point Signatures
//==================================================================================

pub type GetVersionFn = unsafe extern "C" fn(version: *mut c_char) -> c_int;
pub type GetLastErrorMessageFn = unsafe extern "C" fn(
    handle: DggsHandle,
    message: *mut *mut c_char,
    message_length: *mut c_ushort,
) -> c_int;
pub type OpenDggsHandleFn = unsafe extern "C" fn(model: c_int, handle: *mut DggsHandle) -> c_int;
pub type CloseDggsHandleFn = unsafe extern "C" fn(handle: *mut DggsHandle) -> c_int;
pub type ConvertPointsToDggsCellsFn = unsafe extern "C" fn(
    handle: DggsHandle,
    points: *const WireLatLongPoint,
    no_of_points: c_ushort,
    cells: *mut WireCell,
) -> c_int;
pub type ConvertShapesToDggsShapesFn = unsafe extern "C" fn(
    handle: DggsHandle,
    shapes: *const WireLatLongShape,
    no_of_shapes: c_ushort,
    dggs_shapes: *mut *mut WireDggsShape,
) -> c_int;
pub type ConvertShapeStringToDggsShapesFn = unsafe extern "C" fn(
    handle: DggsHandle,
    string: *const c_char,
    format: c_int,
    accuracy: c_double,
    dggs_shapes: *mut *mut WireDggsShape,
    no_of_shapes: *mut c_ushort,
) -> c_int;
pub type DeallocateDggsShapesFn = unsafe extern "C" fn(
    handle: DggsHandle,
    dggs_shapes: *mut *mut WireDggsShape,
    no_of_shapes: c_ushort,
) -> c_int;
pub type DeallocateStringFn =
    unsafe extern "C" fn(handle: DggsHandle, string: *mut *mut c_char) -> c_int;
pub type ConvertDggsCellsToPointsFn = unsafe extern "C" fn(
    handle: DggsHandle,
    cells: *const WireCell,
    no_of_cells: c_ushort,
    points: *mut WireLatLongPoint,
) -> c_int;
pub type ConvertDggsCellsToShapeStringFn = unsafe extern "C" fn(
    handle: DggsHandle,
    cells: *const WireCell,
    no_of_cells: c_ushort,
    format: c_int,
    string: *mut *mut c_char,
) -> c_int;
pub type ConvertDggsCellOutlineToShapeStringFn = unsafe extern "C" fn(
    handle: DggsHandle,
    cell: *const WireCell,
    format: c_int,
    string: *mut *mut c_char,
) -> c_int;
/// Shared by the parents, children and siblings queries.
pub type GetRelatedDggsCellsFn = unsafe extern "C" fn(
    handle: DggsHandle,
    cell: *const WireCell,
    related: *mut WireCell,
    no_of_related: *mut c_ushort,
) -> c_int;
pub type GetBoundingDggsCellFn = unsafe extern "C" fn(
    handle: DggsHandle,
    cells: *const WireCell,
    no_of_cells: c_ushort,
    bounding_cell: *mut WireCell,
) -> c_int;
pub type CreateDggsKmlFileFn = unsafe extern "C" fn(
    handle: DggsHandle,
    filename: *const c_char,
    cells: *const WireCell,
    no_of_cells: c_ushort,
) -> c_int;
pub type CompareShapesFn = unsafe extern "C" fn(
    handle: DggsHandle,
    analysis_type: c_int,
    base_shape: *const WireDggsShape,
    comparison_shape: *const WireDggsShape,
    result: *mut bool,
) -> c_int;

/// Every engine entry point the bindings call, resolved once at load time.
#[derive(Clone, Copy)]
pub struct NativeApi {
    pub get_version: GetVersionFn,
    pub get_last_error_message: GetLastErrorMessageFn,
    pub open_dggs_handle: OpenDggsHandleFn,
    pub close_dggs_handle: CloseDggsHandleFn,
    pub convert_points_to_dggs_cells: ConvertPointsToDggsCellsFn,
    pub convert_shapes_to_dggs_shapes: ConvertShapesToDggsShapesFn,
    pub convert_shape_string_to_dggs_shapes: ConvertShapeStringToDggsShapesFn,
    pub deallocate_dggs_shapes: DeallocateDggsShapesFn,
    pub deallocate_string: DeallocateStringFn,
    pub convert_dggs_cells_to_points: ConvertDggsCellsToPointsFn,
    pub convert_dggs_cells_to_shape_string: ConvertDggsCellsToShapeStringFn,
    pub convert_dggs_cell_outline_to_shape_string: ConvertDggsCellOutlineToShapeStringFn,
    pub get_dggs_cell_parents: GetRelatedDggsCellsFn,
    pub get_dggs_cell_children: GetRelatedDggsCellsFn,
    pub get_dggs_cell_siblings: GetRelatedDggsCellsFn,
    pub get_bounding_dggs_cell: GetBoundingDggsCellFn,
    pub create_dggs_kml_file: CreateDggsKmlFileFn,
    pub compare_shapes: CompareShapesFn,
}

impl fmt::Debug for NativeApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeApi").finish_non_exhaustive()
    }
}
