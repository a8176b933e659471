//! This module defines the strongly-typed host data model used throughout
//! the bindings: the shape types callers build and receive, and the closed
//! enumerations of the engine's C header.

pub mod enums;
pub mod shapes;

// Re-export the main types for easier access.
pub use enums::{
    AnalysisType, LatLongShapeType, Model, ReturnCode, ShapeLocation, ShapeStringFormat,
    ShapeType,
};
pub use shapes::{
    DggsCell, DggsLinestring, DggsPolygon, DggsShape, DggsShapeKind, LatLongLinestring,
    LatLongPoint, LatLongPolygon, LatLongShape,
};
