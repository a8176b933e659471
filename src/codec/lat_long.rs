// In: src/codec/lat_long.rs

use bytemuck::Zeroable;

use super::{wire_count, wire_slice};
use crate::error::EaggrError;
use crate::native::abi::{
    WireLatLongLinestring, WireLatLongPoint, WireLatLongPolygon, WireLatLongShape,
    WireLatLongShapeData,
};
use crate::types::{
    LatLongLinestring, LatLongPoint, LatLongPolygon, LatLongShape, LatLongShapeType,
};

//==================================================================================
// I. Points
//==================================================================================

/// Copies a point onto the wire. NaN and infinite fields are rejected, since
/// the engine has no defined behaviour for them.
pub fn encode_point(point: &LatLongPoint) -> Result<WireLatLongPoint, EaggrError> {
    let fields = [point.latitude(), point.longitude(), point.accuracy()];
    if fields.iter().any(|v| !v.is_finite()) {
        return Err(EaggrError::InvalidArgument(format!(
            "Latitude, longitude and accuracy values for a LatLongPoint must all be numeric \
             (got {}, {}, {})",
            point.latitude(),
            point.longitude(),
            point.accuracy()
        )));
    }
    Ok(WireLatLongPoint {
        latitude: point.latitude(),
        longitude: point.longitude(),
        accuracy: point.accuracy(),
    })
}

pub fn encode_points(points: &[LatLongPoint]) -> Result<Vec<WireLatLongPoint>, EaggrError> {
    wire_count(points.len(), "points")?;
    points.iter().map(encode_point).collect()
}

pub fn decode_point(wire: &WireLatLongPoint) -> LatLongPoint {
    LatLongPoint::new(wire.latitude, wire.longitude, wire.accuracy)
}

pub fn decode_points(wire: &[WireLatLongPoint]) -> Vec<LatLongPoint> {
    wire.iter().map(decode_point).collect()
}

//==================================================================================
// II. Shapes
//==================================================================================

/// Wire form of a list of lat/long shapes, together with every point and
/// ring array the wire structures point into.
///
/// Moving the buffer is fine: the nested arrays live on the heap and do not
/// move with it.
pub struct LatLongShapeBuffer {
    shapes: Vec<WireLatLongShape>,
    _points: Vec<Vec<WireLatLongPoint>>,
    _rings: Vec<Vec<WireLatLongLinestring>>,
}

impl LatLongShapeBuffer {
    pub fn encode(shapes: &[LatLongShape]) -> Result<Self, EaggrError> {
        wire_count(shapes.len(), "shapes")?;
        let mut buffer = Self {
            shapes: Vec::with_capacity(shapes.len()),
            _points: Vec::new(),
            _rings: Vec::new(),
        };
        for shape in shapes {
            let wire = buffer.encode_shape(shape)?;
            buffer.shapes.push(wire);
        }
        Ok(buffer)
    }

    pub fn as_ptr(&self) -> *const WireLatLongShape {
        self.shapes.as_ptr()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn shapes(&self) -> &[WireLatLongShape] {
        &self.shapes
    }

    fn encode_shape(&mut self, shape: &LatLongShape) -> Result<WireLatLongShape, EaggrError> {
        let mut wire = WireLatLongShape::zeroed();
        match shape {
            LatLongShape::Point(point) => {
                wire.shape_type = LatLongShapeType::Point.to_raw();
                wire.data = WireLatLongShapeData {
                    point: encode_point(point)?,
                };
            }
            LatLongShape::Linestring(linestring) => {
                wire.shape_type = LatLongShapeType::Linestring.to_raw();
                wire.data = WireLatLongShapeData {
                    linestring: self.encode_linestring(linestring)?,
                };
            }
            LatLongShape::Polygon(polygon) => {
                wire.shape_type = LatLongShapeType::Polygon.to_raw();
                wire.data = WireLatLongShapeData {
                    polygon: self.encode_polygon(polygon)?,
                };
            }
        }
        Ok(wire)
    }

    fn encode_linestring(
        &mut self,
        linestring: &LatLongLinestring,
    ) -> Result<WireLatLongLinestring, EaggrError> {
        let mut points = encode_points(linestring.points())?;
        let wire = WireLatLongLinestring {
            points: points.as_mut_ptr(),
            no_of_points: wire_count(points.len(), "points")?,
        };
        self._points.push(points);
        Ok(wire)
    }

    fn encode_polygon(&mut self, polygon: &LatLongPolygon) -> Result<WireLatLongPolygon, EaggrError> {
        let outer_ring = self.encode_linestring(polygon.outer_ring())?;
        let no_of_inner_rings = wire_count(polygon.inner_rings().len(), "inner rings")?;
        let mut inner_rings = polygon
            .inner_rings()
            .iter()
            .map(|ring| self.encode_linestring(ring))
            .collect::<Result<Vec<_>, _>>()?;
        let wire = WireLatLongPolygon {
            outer_ring,
            inner_rings: inner_rings.as_mut_ptr(),
            no_of_inner_rings,
        };
        self._rings.push(inner_rings);
        Ok(wire)
    }
}

/// Rebuilds a host shape from its wire form.
///
/// # Safety
/// Every pointer reachable from `wire` must reference as many initialised
/// elements as its companion count says.
pub unsafe fn decode_lat_long_shape(wire: &WireLatLongShape) -> Result<LatLongShape, EaggrError> {
    let shape = match LatLongShapeType::from_raw(wire.shape_type)? {
        LatLongShapeType::Point => LatLongShape::Point(decode_point(&wire.data.point)),
        LatLongShapeType::Linestring => {
            LatLongShape::Linestring(decode_linestring(&wire.data.linestring)?)
        }
        LatLongShapeType::Polygon => {
            let polygon = &wire.data.polygon;
            let mut decoded = LatLongPolygon::new(decode_linestring(&polygon.outer_ring)?);
            for ring in wire_slice(polygon.inner_rings, polygon.no_of_inner_rings, "Polygon")? {
                decoded.add_inner_ring(decode_linestring(ring)?);
            }
            LatLongShape::Polygon(decoded)
        }
    };
    Ok(shape)
}

unsafe fn decode_linestring(wire: &WireLatLongLinestring) -> Result<LatLongLinestring, EaggrError> {
    let points = wire_slice(wire.points, wire.no_of_points, "Linestring")?;
    Ok(LatLongLinestring::from(decode_points(points)))
}
