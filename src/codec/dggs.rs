// In: src/codec/dggs.rs

use bytemuck::Zeroable;

use super::cell::{decode_cell, encode_cell, encode_cells};
use super::{wire_count, wire_slice};
use crate::error::EaggrError;
use crate::native::abi::{
    WireCell, WireDggsLinestring, WireDggsPolygon, WireDggsShape, WireDggsShapeData,
};
use crate::types::{
    DggsLinestring, DggsPolygon, DggsShape, DggsShapeKind, ShapeLocation, ShapeType,
};

/// Wire form of a single DGGS shape plus the cell and ring arrays it
/// points into. Used to pass shapes *into* the engine.
pub struct DggsShapeBuffer {
    shape: WireDggsShape,
    _cells: Vec<Vec<WireCell>>,
    _rings: Vec<Vec<WireDggsLinestring>>,
}

impl DggsShapeBuffer {
    pub fn encode(shape: &DggsShape) -> Result<Self, EaggrError> {
        let mut buffer = Self {
            shape: WireDggsShape::zeroed(),
            _cells: Vec::new(),
            _rings: Vec::new(),
        };
        let mut wire = WireDggsShape::zeroed();
        wire.shape_type = shape.shape_type().to_raw();
        wire.location = shape.location().to_raw();
        wire.data = match shape.kind() {
            DggsShapeKind::Cell(cell) => WireDggsShapeData {
                cell: encode_cell(cell)?,
            },
            DggsShapeKind::Linestring(linestring) => WireDggsShapeData {
                linestring: buffer.encode_linestring(linestring)?,
            },
            DggsShapeKind::Polygon(polygon) => WireDggsShapeData {
                polygon: buffer.encode_polygon(polygon)?,
            },
        };
        buffer.shape = wire;
        Ok(buffer)
    }

    pub fn wire(&self) -> &WireDggsShape {
        &self.shape
    }

    /// Pointer to the wire shape; valid while `self` is neither moved nor dropped.
    pub fn as_ptr(&self) -> *const WireDggsShape {
        &self.shape
    }

    fn encode_linestring(
        &mut self,
        linestring: &DggsLinestring,
    ) -> Result<WireDggsLinestring, EaggrError> {
        let mut cells = encode_cells(linestring.cells())?;
        let wire = WireDggsLinestring {
            cells: cells.as_mut_ptr(),
            no_of_cells: wire_count(cells.len(), "cells")?,
        };
        self._cells.push(cells);
        Ok(wire)
    }

    fn encode_polygon(&mut self, polygon: &DggsPolygon) -> Result<WireDggsPolygon, EaggrError> {
        let outer_ring = self.encode_linestring(polygon.outer_ring())?;
        let no_of_inner_rings = wire_count(polygon.inner_rings().len(), "inner rings")?;
        let mut inner_rings = polygon
            .inner_rings()
            .iter()
            .map(|ring| self.encode_linestring(ring))
            .collect::<Result<Vec<_>, _>>()?;
        let wire = WireDggsPolygon {
            outer_ring,
            inner_rings: inner_rings.as_mut_ptr(),
            no_of_inner_rings,
        };
        self._rings.push(inner_rings);
        Ok(wire)
    }
}

/// Copies a wire DGGS shape, including all of its rings, into host memory.
///
/// # Safety
/// Every pointer reachable from `wire` must reference as many initialised
/// elements as its companion count says.
pub unsafe fn decode_dggs_shape(wire: &WireDggsShape) -> Result<DggsShape, EaggrError> {
    let shape_type = ShapeType::from_raw(wire.shape_type)?;
    let location = ShapeLocation::from_raw(wire.location)?;
    let kind = match shape_type {
        ShapeType::Cell => DggsShapeKind::Cell(decode_cell(&wire.data.cell)?),
        ShapeType::Linestring => DggsShapeKind::Linestring(decode_linestring(&wire.data.linestring)?),
        ShapeType::Polygon => {
            let polygon = &wire.data.polygon;
            let mut decoded = DggsPolygon::new(decode_linestring(&polygon.outer_ring)?);
            for ring in wire_slice(polygon.inner_rings, polygon.no_of_inner_rings, "DGGS polygon")? {
                decoded.add_inner_ring(decode_linestring(ring)?);
            }
            DggsShapeKind::Polygon(decoded)
        }
    };
    Ok(DggsShape::new(kind, location))
}

/// # Safety
/// As for [`decode_dggs_shape`], for every element of `wire`.
pub unsafe fn decode_dggs_shapes(wire: &[WireDggsShape]) -> Result<Vec<DggsShape>, EaggrError> {
    wire.iter().map(|shape| decode_dggs_shape(shape)).collect()
}

unsafe fn decode_linestring(wire: &WireDggsLinestring) -> Result<DggsLinestring, EaggrError> {
    let cells = wire_slice(wire.cells, wire.no_of_cells, "DGGS linestring")?;
    Ok(DggsLinestring::from(
        cells.iter().map(decode_cell).collect::<Result<Vec<_>, _>>()?,
    ))
}
