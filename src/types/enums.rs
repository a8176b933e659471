//! The closed enumerations shared by the host API and the native ABI.
//!
//! Every enum here mirrors a C `enum` of the engine's header, so each one
//! carries the engine's integer discriminants and a checked conversion from
//! the raw `c_int` found on the wire.

use std::fmt;
use std::os::raw::c_int;

use serde::{Deserialize, Serialize};

use crate::error::EaggrError;

/// Grid system selected when a session is opened.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Model {
    /// Icosahedral Snyder equal-area aperture 4 triangle grid.
    Isea4t = 0,
    /// Icosahedral Snyder equal-area aperture 3 hexagon grid.
    Isea3h = 1,
}

impl Model {
    pub fn to_raw(self) -> c_int {
        self as c_int
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Model::Isea4t => f.write_str("ISEA4T"),
            Model::Isea3h => f.write_str("ISEA3H"),
        }
    }
}

/// Status returned by every native entry point.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnCode {
    Success = 0,
    NotImplemented = 1,
    InvalidHandle = 2,
    InvalidParam = 3,
    NullPointer = 4,
    ModelError = 5,
    CellLengthTooLong = 6,
    MemoryAllocationFailure = 7,
    UnknownError = 8,
}

impl ReturnCode {
    /// Maps a raw status. Values outside the known range collapse to
    /// `UnknownError` so a misbehaving engine can never be read as success.
    pub fn from_raw(raw: c_int) -> Self {
        match raw {
            0 => ReturnCode::Success,
            1 => ReturnCode::NotImplemented,
            2 => ReturnCode::InvalidHandle,
            3 => ReturnCode::InvalidParam,
            4 => ReturnCode::NullPointer,
            5 => ReturnCode::ModelError,
            6 => ReturnCode::CellLengthTooLong,
            7 => ReturnCode::MemoryAllocationFailure,
            _ => ReturnCode::UnknownError,
        }
    }

    pub fn to_raw(self) -> c_int {
        self as c_int
    }

    pub fn is_success(self) -> bool {
        self == ReturnCode::Success
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReturnCode::Success => "DGGS_SUCCESS",
            ReturnCode::NotImplemented => "DGGS_NOT_IMPLEMENTED",
            ReturnCode::InvalidHandle => "DGGS_INVALID_HANDLE",
            ReturnCode::InvalidParam => "DGGS_INVALID_PARAM",
            ReturnCode::NullPointer => "DGGS_NULL_POINTER",
            ReturnCode::ModelError => "DGGS_MODEL_ERROR",
            ReturnCode::CellLengthTooLong => "DGGS_CELL_LENGTH_TOO_LONG",
            ReturnCode::MemoryAllocationFailure => "DGGS_MEMORY_ALLOCATION_FAILURE",
            ReturnCode::UnknownError => "DGGS_UNKNOWN_ERROR",
        };
        f.write_str(name)
    }
}

/// Discriminant of a lat/long shape on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LatLongShapeType {
    Point = 0,
    Linestring = 1,
    Polygon = 2,
}

impl LatLongShapeType {
    pub fn to_raw(self) -> c_int {
        self as c_int
    }

    pub fn from_raw(raw: c_int) -> Result<Self, EaggrError> {
        match raw {
            0 => Ok(LatLongShapeType::Point),
            1 => Ok(LatLongShapeType::Linestring),
            2 => Ok(LatLongShapeType::Polygon),
            other => Err(EaggrError::InvalidState(format!(
                "Unrecognised lat/long shape type {}",
                other
            ))),
        }
    }
}

/// Discriminant of a DGGS shape on the wire.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShapeType {
    Cell = 0,
    Linestring = 1,
    Polygon = 2,
}

impl ShapeType {
    pub fn to_raw(self) -> c_int {
        self as c_int
    }

    pub fn from_raw(raw: c_int) -> Result<Self, EaggrError> {
        match raw {
            0 => Ok(ShapeType::Cell),
            1 => Ok(ShapeType::Linestring),
            2 => Ok(ShapeType::Polygon),
            other => Err(EaggrError::InvalidState(format!(
                "DGGS shape contains unrecognised shape type {}",
                other
            ))),
        }
    }
}

/// Where a DGGS shape sits relative to the faces of the polyhedral globe.
///
/// The value is metadata set by whoever produced the shape; the bindings
/// carry it across the boundary without interpreting it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShapeLocation {
    OneFace = 0,
    TwoFaces = 1,
    ManyFaces = 2,
    /// Used for linestrings and polygons.
    NoLocation = 3,
}

impl ShapeLocation {
    pub fn to_raw(self) -> c_int {
        self as c_int
    }

    pub fn from_raw(raw: c_int) -> Result<Self, EaggrError> {
        match raw {
            0 => Ok(ShapeLocation::OneFace),
            1 => Ok(ShapeLocation::TwoFaces),
            2 => Ok(ShapeLocation::ManyFaces),
            3 => Ok(ShapeLocation::NoLocation),
            other => Err(EaggrError::InvalidState(format!(
                "DGGS shape contains unrecognised shape location {}",
                other
            ))),
        }
    }
}

/// Text formats the engine reads and writes shapes in.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ShapeStringFormat {
    Wkt = 0,
    GeoJson = 1,
}

impl ShapeStringFormat {
    pub fn to_raw(self) -> c_int {
        self as c_int
    }
}

/// Binary spatial predicate evaluated by the engine.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisType {
    Contains = 0,
    CoveredBy = 1,
    Covers = 2,
    Crosses = 3,
    Disjoint = 4,
    Equals = 5,
    Intersects = 6,
    Overlaps = 7,
    Touches = 8,
    Within = 9,
}

impl AnalysisType {
    pub const ALL: [AnalysisType; 10] = [
        AnalysisType::Contains,
        AnalysisType::CoveredBy,
        AnalysisType::Covers,
        AnalysisType::Crosses,
        AnalysisType::Disjoint,
        AnalysisType::Equals,
        AnalysisType::Intersects,
        AnalysisType::Overlaps,
        AnalysisType::Touches,
        AnalysisType::Within,
    ];

    pub fn to_raw(self) -> c_int {
        self as c_int
    }

    /// `true` when swapping the operands cannot change the result.
    pub fn is_symmetric(self) -> bool {
        !matches!(
            self,
            AnalysisType::Contains
                | AnalysisType::Within
                | AnalysisType::Covers
                | AnalysisType::CoveredBy
        )
    }
}
