//! The host-side shape model.
//!
//! Two families of shapes cross the boundary: shapes described by WGS84
//! lat/long points, which go *into* the engine, and shapes described by DGGS
//! cells, which come back out (and can be passed back in for spatial
//! analysis). Both are plain owned values; ordering of points, cells and
//! inner rings is always significant and is preserved by the codec.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::enums::{ShapeLocation, ShapeType};

//==================================================================================
// I. Lat/Long Shapes
//==================================================================================

/// A WGS84 coordinate with an accuracy area in square metres.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct LatLongPoint {
    latitude: f64,
    longitude: f64,
    accuracy: f64,
}

impl LatLongPoint {
    pub fn new(latitude: f64, longitude: f64, accuracy: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
        }
    }

    /// Latitude in degrees.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees.
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Accuracy in metres squared.
    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }
}

/// An ordered run of lat/long points.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct LatLongLinestring {
    points: Vec<LatLongPoint>,
}

impl LatLongLinestring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a point. Points must be added in line order.
    pub fn add_point(&mut self, point: LatLongPoint) {
        self.points.push(point);
    }

    pub fn points(&self) -> &[LatLongPoint] {
        &self.points
    }
}

impl From<Vec<LatLongPoint>> for LatLongLinestring {
    fn from(points: Vec<LatLongPoint>) -> Self {
        Self { points }
    }
}

/// An outer ring plus zero or more holes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LatLongPolygon {
    outer_ring: LatLongLinestring,
    inner_rings: Vec<LatLongLinestring>,
}

impl LatLongPolygon {
    /// Creates a polygon with no inner rings.
    pub fn new(outer_ring: LatLongLinestring) -> Self {
        Self {
            outer_ring,
            inner_rings: Vec::new(),
        }
    }

    pub fn add_inner_ring(&mut self, inner_ring: LatLongLinestring) {
        self.inner_rings.push(inner_ring);
    }

    pub fn outer_ring(&self) -> &LatLongLinestring {
        &self.outer_ring
    }

    pub fn inner_rings(&self) -> &[LatLongLinestring] {
        &self.inner_rings
    }
}

/// Any shape that can be converted into DGGS cells.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum LatLongShape {
    Point(LatLongPoint),
    Linestring(LatLongLinestring),
    Polygon(LatLongPolygon),
}

impl From<LatLongPoint> for LatLongShape {
    fn from(point: LatLongPoint) -> Self {
        LatLongShape::Point(point)
    }
}

impl From<LatLongLinestring> for LatLongShape {
    fn from(linestring: LatLongLinestring) -> Self {
        LatLongShape::Linestring(linestring)
    }
}

impl From<LatLongPolygon> for LatLongShape {
    fn from(polygon: LatLongPolygon) -> Self {
        LatLongShape::Polygon(polygon)
    }
}

//==================================================================================
// II. DGGS Shapes
//==================================================================================

/// Identifier of a single DGGS cell.
///
/// The identifier is opaque to the bindings. Its length is only checked when
/// it is encoded for the wire, where it must fit the engine's fixed buffer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct DggsCell {
    cell_id: String,
}

impl DggsCell {
    pub fn new(cell_id: impl Into<String>) -> Self {
        Self {
            cell_id: cell_id.into(),
        }
    }

    pub fn cell_id(&self) -> &str {
        &self.cell_id
    }
}

impl fmt::Display for DggsCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cell_id)
    }
}

impl From<&str> for DggsCell {
    fn from(cell_id: &str) -> Self {
        DggsCell::new(cell_id)
    }
}

/// An ordered run of cells.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct DggsLinestring {
    cells: Vec<DggsCell>,
}

impl DggsLinestring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a cell. Cells must be added in line order.
    pub fn add_cell(&mut self, cell: DggsCell) {
        self.cells.push(cell);
    }

    pub fn cells(&self) -> &[DggsCell] {
        &self.cells
    }
}

impl From<Vec<DggsCell>> for DggsLinestring {
    fn from(cells: Vec<DggsCell>) -> Self {
        Self { cells }
    }
}

/// An outer ring of cells plus zero or more inner rings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DggsPolygon {
    outer_ring: DggsLinestring,
    inner_rings: Vec<DggsLinestring>,
}

impl DggsPolygon {
    pub fn new(outer_ring: DggsLinestring) -> Self {
        Self {
            outer_ring,
            inner_rings: Vec::new(),
        }
    }

    pub fn add_inner_ring(&mut self, inner_ring: DggsLinestring) {
        self.inner_rings.push(inner_ring);
    }

    pub fn outer_ring(&self) -> &DggsLinestring {
        &self.outer_ring
    }

    pub fn inner_rings(&self) -> &[DggsLinestring] {
        &self.inner_rings
    }
}

/// Payload of a [`DggsShape`]. The variant *is* the shape type, so the tag
/// and the populated payload cannot disagree.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum DggsShapeKind {
    Cell(DggsCell),
    Linestring(DggsLinestring),
    Polygon(DggsPolygon),
}

/// A shape made of DGGS cells together with its face location.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DggsShape {
    kind: DggsShapeKind,
    location: ShapeLocation,
}

impl DggsShape {
    pub fn new(kind: DggsShapeKind, location: ShapeLocation) -> Self {
        Self { kind, location }
    }

    pub fn cell(cell: DggsCell, location: ShapeLocation) -> Self {
        Self::new(DggsShapeKind::Cell(cell), location)
    }

    pub fn linestring(linestring: DggsLinestring, location: ShapeLocation) -> Self {
        Self::new(DggsShapeKind::Linestring(linestring), location)
    }

    pub fn polygon(polygon: DggsPolygon, location: ShapeLocation) -> Self {
        Self::new(DggsShapeKind::Polygon(polygon), location)
    }

    pub fn kind(&self) -> &DggsShapeKind {
        &self.kind
    }

    pub fn into_kind(self) -> DggsShapeKind {
        self.kind
    }

    pub fn shape_type(&self) -> ShapeType {
        match self.kind {
            DggsShapeKind::Cell(_) => ShapeType::Cell,
            DggsShapeKind::Linestring(_) => ShapeType::Linestring,
            DggsShapeKind::Polygon(_) => ShapeType::Polygon,
        }
    }

    pub fn location(&self) -> ShapeLocation {
        self.location
    }
}
