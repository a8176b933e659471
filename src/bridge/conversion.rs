// In: src/bridge/conversion.rs

//! The conversion API: every engine operation, exposed as a method on an open
//! [`Eaggr`] session.

use std::ffi::CString;
use std::os::raw::{c_char, c_ushort};
use std::path::Path;
use std::ptr;

use bytemuck::Zeroable;
use log::debug;

use super::session::Eaggr;
use crate::codec::{
    decode_cell, decode_cells, decode_dggs_shapes, decode_points, encode_cell, encode_cells,
    encode_points, wire_count, DggsShapeBuffer, LatLongShapeBuffer,
};
use crate::error::EaggrError;
use crate::native::abi::{GetRelatedDggsCellsFn, WireCell, WireDggsShape, WireLatLongPoint};
use crate::native::buffers::{NativeShapes, NativeString};
use crate::native::{MAX_CHILD_CELLS, MAX_PARENT_CELLS, MAX_SIBLING_CELLS, VERSION_STRING_LENGTH};
use crate::types::{
    AnalysisType, DggsCell, DggsShape, LatLongPoint, LatLongShape, ReturnCode, ShapeStringFormat,
};

impl Eaggr {
    //==================================================================================
    // I. Engine Information
    //==================================================================================

    /// The engine's version string, e.g. `"v2.0"`.
    pub fn version(&self) -> Result<String, EaggrError> {
        let mut buffer = [0 as c_char; VERSION_STRING_LENGTH];
        // SAFETY: the engine writes at most VERSION_STRING_LENGTH bytes.
        let status = ReturnCode::from_raw(unsafe { (self.api().get_version)(buffer.as_mut_ptr()) });
        if !status.is_success() {
            return Err(EaggrError::engine(
                status,
                "Failed to get version number of EAGGR library",
            ));
        }
        let bytes: Vec<u8> = buffer.iter().take_while(|&&c| c != 0).map(|&c| c as u8).collect();
        String::from_utf8(bytes)
            .map_err(|e| EaggrError::InvalidState(format!("Version string is not UTF-8: {}", e)))
    }

    //==================================================================================
    // II. Lat/Long -> DGGS
    //==================================================================================

    pub fn convert_point_to_dggs_cell(&self, point: &LatLongPoint) -> Result<DggsCell, EaggrError> {
        let mut cells = self.convert_points_to_dggs_cells(std::slice::from_ref(point))?;
        cells.pop().ok_or_else(|| {
            EaggrError::InvalidState("Engine converted a point into no cells".into())
        })
    }

    /// Converts each point to the cell containing it, at the resolution its
    /// accuracy implies. The output is index-aligned with `points`.
    pub fn convert_points_to_dggs_cells(
        &self,
        points: &[LatLongPoint],
    ) -> Result<Vec<DggsCell>, EaggrError> {
        let wire = encode_points(points)?;
        let count = wire_count(wire.len(), "points")?;
        let mut cells = vec![WireCell::zeroed(); wire.len()];
        // SAFETY: `wire` and `cells` both hold `count` elements.
        let status = unsafe {
            (self.api().convert_points_to_dggs_cells)(
                self.raw_handle(),
                wire.as_ptr(),
                count,
                cells.as_mut_ptr(),
            )
        };
        self.check(status)?;
        decode_cells(&cells)
    }

    /// Converts lat/long shapes into DGGS shapes, one output per input.
    pub fn convert_shapes_to_dggs_shapes(
        &self,
        shapes: &[LatLongShape],
    ) -> Result<Vec<DggsShape>, EaggrError> {
        let buffer = LatLongShapeBuffer::encode(shapes)?;
        let count = wire_count(buffer.len(), "shapes")?;
        let mut output: *mut WireDggsShape = ptr::null_mut();
        // SAFETY: `buffer` keeps every array the wire shapes point into alive
        // until the call returns.
        let status = unsafe {
            (self.api().convert_shapes_to_dggs_shapes)(
                self.raw_handle(),
                buffer.as_ptr(),
                count,
                &mut output,
            )
        };
        // A failed call can leave a partial array behind but reports no count
        // for it, so only the array itself is handed back, not the rings of
        // the shapes already written into it.
        let written = if ReturnCode::from_raw(status).is_success() { count } else { 0 };
        // SAFETY: `output` is null or an engine array holding at least
        // `written` shapes, whether or not the call succeeded.
        let owned = unsafe { NativeShapes::from_raw(self.api(), self.raw_handle(), output, written) };
        self.check(status)?;
        self.take_shapes(owned)
    }

    /// Parses WKT or GeoJSON text and converts every shape it contains.
    pub fn convert_shape_string_to_dggs_shapes(
        &self,
        text: &str,
        format: ShapeStringFormat,
        accuracy: f64,
    ) -> Result<Vec<DggsShape>, EaggrError> {
        let text = CString::new(text)
            .map_err(|_| EaggrError::InvalidArgument("Invalid shape string".into()))?;
        if !accuracy.is_finite() {
            return Err(EaggrError::InvalidArgument("Invalid accuracy value".into()));
        }
        let mut output: *mut WireDggsShape = ptr::null_mut();
        let mut count: c_ushort = 0;
        // SAFETY: `text` is NUL-terminated and both out-pointers are valid.
        let status = unsafe {
            (self.api().convert_shape_string_to_dggs_shapes)(
                self.raw_handle(),
                text.as_ptr(),
                format.to_raw(),
                accuracy,
                &mut output,
                &mut count,
            )
        };
        // SAFETY: `output` holds `count` engine-allocated shapes. A failure
        // part-way through the string leaves the shapes converted so far.
        let owned = unsafe { NativeShapes::from_raw(self.api(), self.raw_handle(), output, count) };
        self.check(status)?;
        self.take_shapes(owned)
    }

    //==================================================================================
    // III. DGGS -> Lat/Long
    //==================================================================================

    pub fn convert_dggs_cell_to_point(&self, cell: &DggsCell) -> Result<LatLongPoint, EaggrError> {
        let mut points = self.convert_dggs_cells_to_points(std::slice::from_ref(cell))?;
        points.pop().ok_or_else(|| {
            EaggrError::InvalidState("Engine converted a cell into no points".into())
        })
    }

    /// Converts each cell to its centre point; the accuracy of each point is
    /// the area of the cell.
    pub fn convert_dggs_cells_to_points(
        &self,
        cells: &[DggsCell],
    ) -> Result<Vec<LatLongPoint>, EaggrError> {
        let wire = encode_cells(cells)?;
        let count = wire_count(wire.len(), "cells")?;
        let mut points = vec![WireLatLongPoint::default(); wire.len()];
        // SAFETY: `wire` and `points` both hold `count` elements.
        let status = unsafe {
            (self.api().convert_dggs_cells_to_points)(
                self.raw_handle(),
                wire.as_ptr(),
                count,
                points.as_mut_ptr(),
            )
        };
        self.check(status)?;
        Ok(decode_points(&points))
    }

    /// Renders the centre points of `cells` as a single multi-point string.
    pub fn convert_dggs_cells_to_shape_string(
        &self,
        cells: &[DggsCell],
        format: ShapeStringFormat,
    ) -> Result<String, EaggrError> {
        let wire = encode_cells(cells)?;
        let count = wire_count(wire.len(), "cells")?;
        let mut output: *mut c_char = ptr::null_mut();
        // SAFETY: `wire` holds `count` cells; `output` is a valid out-pointer.
        let status = unsafe {
            (self.api().convert_dggs_cells_to_shape_string)(
                self.raw_handle(),
                wire.as_ptr(),
                count,
                format.to_raw(),
                &mut output,
            )
        };
        // SAFETY: `output` is null or a string the engine allocated for us.
        let owned = unsafe { NativeString::from_raw(self.api(), self.raw_handle(), output) };
        self.check(status)?;
        self.take_string(owned)
    }

    /// Renders the boundary polygon of one cell.
    pub fn convert_dggs_cell_outline_to_shape_string(
        &self,
        cell: &DggsCell,
        format: ShapeStringFormat,
    ) -> Result<String, EaggrError> {
        let wire = encode_cell(cell)?;
        let mut output: *mut c_char = ptr::null_mut();
        // SAFETY: `wire` lives across the call; `output` is a valid out-pointer.
        let status = unsafe {
            (self.api().convert_dggs_cell_outline_to_shape_string)(
                self.raw_handle(),
                &wire,
                format.to_raw(),
                &mut output,
            )
        };
        // SAFETY: `output` is null or a string the engine allocated for us.
        let owned = unsafe { NativeString::from_raw(self.api(), self.raw_handle(), output) };
        self.check(status)?;
        self.take_string(owned)
    }

    //==================================================================================
    // IV. Grid Topology
    //==================================================================================

    pub fn get_dggs_cell_parents(&self, cell: &DggsCell) -> Result<Vec<DggsCell>, EaggrError> {
        self.related_cells(self.api().get_dggs_cell_parents, cell, MAX_PARENT_CELLS, "parents")
    }

    pub fn get_dggs_cell_children(&self, cell: &DggsCell) -> Result<Vec<DggsCell>, EaggrError> {
        self.related_cells(self.api().get_dggs_cell_children, cell, MAX_CHILD_CELLS, "children")
    }

    pub fn get_dggs_cell_siblings(&self, cell: &DggsCell) -> Result<Vec<DggsCell>, EaggrError> {
        self.related_cells(self.api().get_dggs_cell_siblings, cell, MAX_SIBLING_CELLS, "siblings")
    }

    /// The smallest cell that contains every cell in `cells`.
    pub fn get_bounding_dggs_cell(&self, cells: &[DggsCell]) -> Result<DggsCell, EaggrError> {
        let wire = encode_cells(cells)?;
        let count = wire_count(wire.len(), "cells")?;
        let mut bounding = WireCell::zeroed();
        // SAFETY: `wire` holds `count` cells; `bounding` is a full cell buffer.
        let status = unsafe {
            (self.api().get_bounding_dggs_cell)(self.raw_handle(), wire.as_ptr(), count, &mut bounding)
        };
        self.check(status)?;
        decode_cell(&bounding)
    }

    //==================================================================================
    // V. Output and Analysis
    //==================================================================================

    /// Writes `cells` to a KML file at `path`.
    pub fn create_dggs_kml_file(
        &self,
        path: impl AsRef<Path>,
        cells: &[DggsCell],
    ) -> Result<(), EaggrError> {
        let path = path.as_ref();
        let filename = path
            .to_str()
            .and_then(|p| CString::new(p).ok())
            .ok_or_else(|| EaggrError::InvalidArgument("Invalid filename for KML file".into()))?;
        let wire = encode_cells(cells)?;
        let count = wire_count(wire.len(), "cells")?;
        // SAFETY: `filename` is NUL-terminated and `wire` holds `count` cells.
        let status = unsafe {
            (self.api().create_dggs_kml_file)(self.raw_handle(), filename.as_ptr(), wire.as_ptr(), count)
        };
        self.check(status)?;
        debug!("Wrote {} cells to KML file {}", cells.len(), path.display());
        Ok(())
    }

    /// Evaluates `analysis` with `base` as the first operand.
    pub fn compare_dggs_shapes(
        &self,
        base: &DggsShape,
        comparison: &DggsShape,
        analysis: AnalysisType,
    ) -> Result<bool, EaggrError> {
        let base = DggsShapeBuffer::encode(base)?;
        let comparison = DggsShapeBuffer::encode(comparison)?;
        let mut result = false;
        // SAFETY: both buffers stay alive across the call.
        let status = unsafe {
            (self.api().compare_shapes)(
                self.raw_handle(),
                analysis.to_raw(),
                base.as_ptr(),
                comparison.as_ptr(),
                &mut result,
            )
        };
        self.check(status)?;
        Ok(result)
    }

    //==================================================================================
    // VI. Helpers
    //==================================================================================

    fn related_cells(
        &self,
        entry_point: GetRelatedDggsCellsFn,
        cell: &DggsCell,
        capacity: usize,
        what: &str,
    ) -> Result<Vec<DggsCell>, EaggrError> {
        let wire = encode_cell(cell)?;
        let mut related = vec![WireCell::zeroed(); capacity];
        let mut count: c_ushort = 0;
        // SAFETY: `related` has room for `capacity` cells, the most the engine
        // writes for this query.
        let status = unsafe {
            entry_point(self.raw_handle(), &wire, related.as_mut_ptr(), &mut count)
        };
        self.check(status)?;
        let count = count as usize;
        if count > capacity {
            return Err(EaggrError::InvalidState(format!(
                "Engine reported {} {} but at most {} are possible",
                count, what, capacity
            )));
        }
        decode_cells(&related[..count])
    }

    /// Decodes an engine-allocated shape array and hands it back.
    ///
    /// A decode failure returns early and the guard frees the array on drop.
    fn take_shapes(&self, owned: NativeShapes<'_>) -> Result<Vec<DggsShape>, EaggrError> {
        // SAFETY: the guard's array came straight from the engine.
        let shapes = unsafe { decode_dggs_shapes(owned.as_slice()?) }?;
        self.check_release(owned.release())?;
        Ok(shapes)
    }

    fn take_string(&self, owned: NativeString<'_>) -> Result<String, EaggrError> {
        let text = owned
            .to_host_string()?
            .ok_or_else(|| EaggrError::InvalidState("Engine returned a null shape string".into()))?;
        self.check_release(owned.release())?;
        Ok(text)
    }

    fn check_release(&self, code: ReturnCode) -> Result<(), EaggrError> {
        if code.is_success() {
            Ok(())
        } else {
            Err(self.engine_error(code))
        }
    }
}
