// In: src/ffi/python.rs

use std::path::PathBuf;

use log::LevelFilter;
use pyo3::exceptions::{PyException, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyList;

use crate::bridge::Eaggr;
use crate::types::{
    AnalysisType, DggsCell, DggsLinestring, DggsPolygon, DggsShape, DggsShapeKind,
    LatLongLinestring, LatLongPoint, LatLongPolygon, LatLongShape, Model, ShapeLocation,
    ShapeStringFormat,
};

//==================================================================================
// I. Exception
//==================================================================================

/// Raised when an engine call returns anything other than `DGGS_SUCCESS`.
#[pyclass(extends = PyException, name = "EaggrException", module = "eaggr")]
pub struct EaggrException {
    return_code: i32,
    message: String,
}

#[pymethods]
impl EaggrException {
    #[new]
    fn new(return_code: i32, message: String) -> Self {
        Self {
            return_code,
            message,
        }
    }

    fn get_return_code(&self) -> i32 {
        self.return_code
    }

    fn __str__(&self) -> String {
        self.message.clone()
    }
}

//==================================================================================
// II. Enumerations
//==================================================================================
// The managed API passes enumerations as plain integers, so each one is a
// namespace of integer constants.

#[pyclass(name = "Model", module = "eaggr", frozen)]
pub struct PyModel;

#[pymethods]
impl PyModel {
    #[classattr]
    const ISEA4T: i32 = 0;
    #[classattr]
    const ISEA3H: i32 = 1;
}

#[pyclass(name = "DggsShapeType", module = "eaggr", frozen)]
pub struct PyDggsShapeType;

#[pymethods]
impl PyDggsShapeType {
    #[classattr]
    const CELL: i32 = 0;
    #[classattr]
    const LINESTRING: i32 = 1;
    #[classattr]
    const POLYGON: i32 = 2;
}

#[pyclass(name = "DggsShapeLocation", module = "eaggr", frozen)]
pub struct PyDggsShapeLocation;

#[pymethods]
impl PyDggsShapeLocation {
    #[classattr]
    const ONE_FACE: i32 = 0;
    #[classattr]
    const TWO_FACES: i32 = 1;
    #[classattr]
    const MANY_FACES: i32 = 2;
    #[classattr]
    const NO_LOCATION: i32 = 3;
}

#[pyclass(name = "DggsAnalysisType", module = "eaggr", frozen)]
pub struct PyDggsAnalysisType;

#[pymethods]
impl PyDggsAnalysisType {
    #[classattr]
    const CONTAINS: i32 = 0;
    #[classattr]
    const COVERED_BY: i32 = 1;
    #[classattr]
    const COVERS: i32 = 2;
    #[classattr]
    const CROSSES: i32 = 3;
    #[classattr]
    const DISJOINT: i32 = 4;
    #[classattr]
    const EQUALS: i32 = 5;
    #[classattr]
    const INTERSECTS: i32 = 6;
    #[classattr]
    const OVERLAPS: i32 = 7;
    #[classattr]
    const TOUCHES: i32 = 8;
    #[classattr]
    const WITHIN: i32 = 9;
}

#[pyclass(name = "ShapeStringFormat", module = "eaggr", frozen)]
pub struct PyShapeStringFormat;

#[pymethods]
impl PyShapeStringFormat {
    #[classattr]
    const WKT: i32 = 0;
    #[classattr]
    const GEO_JSON: i32 = 1;
}

#[pyclass(name = "DggsReturnCode", module = "eaggr", frozen)]
pub struct PyDggsReturnCode;

#[pymethods]
impl PyDggsReturnCode {
    #[classattr]
    const DGGS_SUCCESS: i32 = 0;
    #[classattr]
    const DGGS_NOT_IMPLEMENTED: i32 = 1;
    #[classattr]
    const DGGS_INVALID_HANDLE: i32 = 2;
    #[classattr]
    const DGGS_INVALID_PARAM: i32 = 3;
    #[classattr]
    const DGGS_NULL_POINTER: i32 = 4;
    #[classattr]
    const DGGS_MODEL_ERROR: i32 = 5;
    #[classattr]
    const DGGS_CELL_LENGTH_TOO_LONG: i32 = 6;
    #[classattr]
    const DGGS_MEMORY_ALLOCATION_FAILURE: i32 = 7;
    #[classattr]
    const DGGS_UNKNOWN_ERROR: i32 = 8;
}

fn model_arg(value: &Bound<'_, PyAny>) -> PyResult<Model> {
    match value.extract::<i32>() {
        Ok(0) => Ok(Model::Isea4t),
        Ok(1) => Ok(Model::Isea3h),
        _ => Err(PyValueError::new_err(
            "DGGS model type must be one of the Model values",
        )),
    }
}

fn format_arg(value: &Bound<'_, PyAny>) -> PyResult<ShapeStringFormat> {
    match value.extract::<i32>() {
        Ok(0) => Ok(ShapeStringFormat::Wkt),
        Ok(1) => Ok(ShapeStringFormat::GeoJson),
        _ => Err(PyValueError::new_err(
            "Shape string format must be one of the ShapeStringFormat values",
        )),
    }
}

fn location_arg(value: &Bound<'_, PyAny>) -> PyResult<ShapeLocation> {
    value
        .extract::<i32>()
        .ok()
        .and_then(|raw| ShapeLocation::from_raw(raw).ok())
        .ok_or_else(|| {
            PyValueError::new_err("DGGS shape location must be one of the DggsShapeLocation values")
        })
}

fn analysis_arg(value: &Bound<'_, PyAny>) -> PyResult<AnalysisType> {
    value
        .extract::<i32>()
        .ok()
        .and_then(|raw| AnalysisType::ALL.into_iter().find(|a| a.to_raw() == raw))
        .ok_or_else(|| {
            PyValueError::new_err(
                "Analysis type must be CONTAINS, COVERED_BY, COVERS, CROSSES, DISJOINT, \
                 EQUALS, INTERSECTS, OVERLAPS, TOUCHES or WITHIN",
            )
        })
}

//==================================================================================
// III. Shapes
//==================================================================================

#[pyclass(name = "LatLongPoint", module = "eaggr")]
#[derive(Clone)]
pub struct PyLatLongPoint {
    inner: LatLongPoint,
}

#[pymethods]
impl PyLatLongPoint {
    #[new]
    fn new(
        latitude: &Bound<'_, PyAny>,
        longitude: &Bound<'_, PyAny>,
        accuracy: &Bound<'_, PyAny>,
    ) -> PyResult<Self> {
        let numeric = |v: &Bound<'_, PyAny>| {
            v.extract::<f64>().map_err(|_| {
                PyValueError::new_err(
                    "Latitude, longitude and accuracy values for a LatLongPoint object \
                     must all be numeric",
                )
            })
        };
        Ok(Self {
            inner: LatLongPoint::new(numeric(latitude)?, numeric(longitude)?, numeric(accuracy)?),
        })
    }

    fn get_latitude(&self) -> f64 {
        self.inner.latitude()
    }

    fn get_longitude(&self) -> f64 {
        self.inner.longitude()
    }

    fn get_accuracy(&self) -> f64 {
        self.inner.accuracy()
    }

    fn __eq__(&self, other: &Bound<'_, PyAny>) -> bool {
        other
            .extract::<PyLatLongPoint>()
            .map_or(false, |o| o.inner == self.inner)
    }

    fn __repr__(&self) -> String {
        format!(
            "LatLongPoint({}, {}, {})",
            self.inner.latitude(),
            self.inner.longitude(),
            self.inner.accuracy()
        )
    }
}

#[pyclass(name = "LatLongLinestring", module = "eaggr")]
#[derive(Clone, Default)]
pub struct PyLatLongLinestring {
    inner: LatLongLinestring,
}

#[pymethods]
impl PyLatLongLinestring {
    #[new]
    fn new() -> Self {
        Self::default()
    }

    fn add_point(&mut self, point: &Bound<'_, PyAny>) -> PyResult<()> {
        let point = point.extract::<PyLatLongPoint>().map_err(|_| {
            PyValueError::new_err("Input argument to add_point() must be a LatLongPoint")
        })?;
        self.inner.add_point(point.inner);
        Ok(())
    }

    fn get_points(&self) -> Vec<PyLatLongPoint> {
        self.inner
            .points()
            .iter()
            .map(|&inner| PyLatLongPoint { inner })
            .collect()
    }
}

#[pyclass(name = "LatLongPolygon", module = "eaggr")]
#[derive(Clone)]
pub struct PyLatLongPolygon {
    inner: LatLongPolygon,
}

#[pymethods]
impl PyLatLongPolygon {
    #[new]
    fn new(outer_ring: &Bound<'_, PyAny>) -> PyResult<Self> {
        let ring = outer_ring.extract::<PyLatLongLinestring>().map_err(|_| {
            PyValueError::new_err("Input argument to LatLongPolygon() must be a LatLongLinestring")
        })?;
        Ok(Self {
            inner: LatLongPolygon::new(ring.inner),
        })
    }

    fn add_inner_ring(&mut self, inner_ring: &Bound<'_, PyAny>) -> PyResult<()> {
        let ring = inner_ring.extract::<PyLatLongLinestring>().map_err(|_| {
            PyValueError::new_err("Input argument to add_inner_ring() must be a LatLongLinestring")
        })?;
        self.inner.add_inner_ring(ring.inner);
        Ok(())
    }

    fn get_outer_ring(&self) -> PyLatLongLinestring {
        PyLatLongLinestring {
            inner: self.inner.outer_ring().clone(),
        }
    }

    fn get_inner_rings(&self) -> Vec<PyLatLongLinestring> {
        self.inner
            .inner_rings()
            .iter()
            .map(|ring| PyLatLongLinestring { inner: ring.clone() })
            .collect()
    }
}

#[pyclass(name = "DggsCell", module = "eaggr")]
#[derive(Clone)]
pub struct PyDggsCell {
    inner: DggsCell,
}

#[pymethods]
impl PyDggsCell {
    #[new]
    fn new(cell_id: String) -> Self {
        Self {
            inner: DggsCell::new(cell_id),
        }
    }

    fn get_cell_id(&self) -> &str {
        self.inner.cell_id()
    }

    fn __eq__(&self, other: &Bound<'_, PyAny>) -> bool {
        other
            .extract::<PyDggsCell>()
            .map_or(false, |o| o.inner == self.inner)
    }

    fn __hash__(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};
        let mut hasher = DefaultHasher::new();
        self.inner.hash(&mut hasher);
        hasher.finish()
    }

    fn __repr__(&self) -> String {
        format!("DggsCell('{}')", self.inner)
    }
}

#[pyclass(name = "DggsLinestring", module = "eaggr")]
#[derive(Clone, Default)]
pub struct PyDggsLinestring {
    inner: DggsLinestring,
}

#[pymethods]
impl PyDggsLinestring {
    #[new]
    fn new() -> Self {
        Self::default()
    }

    fn add_cell(&mut self, cell: &Bound<'_, PyAny>) -> PyResult<()> {
        let cell = cell.extract::<PyDggsCell>().map_err(|_| {
            PyValueError::new_err("Input argument to add_cell() must be a DggsCell")
        })?;
        self.inner.add_cell(cell.inner);
        Ok(())
    }

    fn get_cells(&self) -> Vec<PyDggsCell> {
        wrap_cells(self.inner.cells().to_vec())
    }
}

#[pyclass(name = "DggsPolygon", module = "eaggr")]
#[derive(Clone)]
pub struct PyDggsPolygon {
    inner: DggsPolygon,
}

#[pymethods]
impl PyDggsPolygon {
    #[new]
    fn new(outer_ring: &Bound<'_, PyAny>) -> PyResult<Self> {
        let ring = outer_ring.extract::<PyDggsLinestring>().map_err(|_| {
            PyValueError::new_err("Input argument to DggsPolygon() must be a DggsLinestring")
        })?;
        Ok(Self {
            inner: DggsPolygon::new(ring.inner),
        })
    }

    fn add_inner_ring(&mut self, inner_ring: &Bound<'_, PyAny>) -> PyResult<()> {
        let ring = inner_ring.extract::<PyDggsLinestring>().map_err(|_| {
            PyValueError::new_err("Input argument to add_inner_ring() must be a DggsLinestring")
        })?;
        self.inner.add_inner_ring(ring.inner);
        Ok(())
    }

    fn get_outer_ring(&self) -> PyDggsLinestring {
        PyDggsLinestring {
            inner: self.inner.outer_ring().clone(),
        }
    }

    fn get_inner_rings(&self) -> Vec<PyDggsLinestring> {
        self.inner
            .inner_rings()
            .iter()
            .map(|ring| PyDggsLinestring { inner: ring.clone() })
            .collect()
    }
}

#[pyclass(name = "DggsShape", module = "eaggr")]
#[derive(Clone)]
pub struct PyDggsShape {
    inner: DggsShape,
}

#[pymethods]
impl PyDggsShape {
    #[new]
    fn new(shape: &Bound<'_, PyAny>, location: &Bound<'_, PyAny>) -> PyResult<Self> {
        let kind = if let Ok(cell) = shape.extract::<PyDggsCell>() {
            DggsShapeKind::Cell(cell.inner)
        } else if let Ok(linestring) = shape.extract::<PyDggsLinestring>() {
            DggsShapeKind::Linestring(linestring.inner)
        } else if let Ok(polygon) = shape.extract::<PyDggsPolygon>() {
            DggsShapeKind::Polygon(polygon.inner)
        } else {
            return Err(PyValueError::new_err(
                "First input argument to DggsShape() must be DggsCell, DggsLinestring or DggsPolygon",
            ));
        };
        Ok(Self {
            inner: DggsShape::new(kind, location_arg(location)?),
        })
    }

    fn get_shape_type(&self) -> i32 {
        self.inner.shape_type().to_raw()
    }

    fn get_shape(&self, py: Python<'_>) -> PyObject {
        match self.inner.kind() {
            DggsShapeKind::Cell(cell) => PyDggsCell { inner: cell.clone() }.into_py(py),
            DggsShapeKind::Linestring(linestring) => PyDggsLinestring {
                inner: linestring.clone(),
            }
            .into_py(py),
            DggsShapeKind::Polygon(polygon) => PyDggsPolygon {
                inner: polygon.clone(),
            }
            .into_py(py),
        }
    }

    fn get_location(&self) -> i32 {
        self.inner.location().to_raw()
    }
}

fn wrap_cells(cells: Vec<DggsCell>) -> Vec<PyDggsCell> {
    cells.into_iter().map(|inner| PyDggsCell { inner }).collect()
}

fn wrap_shapes(shapes: Vec<DggsShape>) -> Vec<PyDggsShape> {
    shapes.into_iter().map(|inner| PyDggsShape { inner }).collect()
}

//==================================================================================
// IV. Argument Lists
//==================================================================================

fn point_arg(value: &Bound<'_, PyAny>) -> PyResult<LatLongPoint> {
    value
        .extract::<PyLatLongPoint>()
        .map(|p| p.inner)
        .map_err(|_| PyValueError::new_err("Argument must be a LatLongPoint object"))
}

fn cell_arg(value: &Bound<'_, PyAny>) -> PyResult<DggsCell> {
    value
        .extract::<PyDggsCell>()
        .map(|c| c.inner)
        .map_err(|_| PyValueError::new_err("Argument must be a DggsCell object"))
}

fn shape_arg(value: &Bound<'_, PyAny>) -> PyResult<DggsShape> {
    value
        .extract::<PyDggsShape>()
        .map(|s| s.inner)
        .map_err(|_| PyValueError::new_err("Argument must be a DggsShape object"))
}

/// Extracts every element of a Python list, reporting the first element that
/// is not of the expected class by index.
fn list_arg<T>(
    value: &Bound<'_, PyAny>,
    list_message: &str,
    element: &str,
    extract: impl Fn(&Bound<'_, PyAny>) -> Option<T>,
) -> PyResult<Vec<T>> {
    let list = value
        .downcast::<PyList>()
        .map_err(|_| PyValueError::new_err(list_message.to_string()))?;
    list.iter()
        .enumerate()
        .map(|(index, item)| {
            extract(&item).ok_or_else(|| {
                PyValueError::new_err(format!(
                    "Element {} in the list is not a {} object",
                    index, element
                ))
            })
        })
        .collect()
}

fn points_arg(value: &Bound<'_, PyAny>) -> PyResult<Vec<LatLongPoint>> {
    list_arg(
        value,
        "Argument must be a list containing only LatLongPoint objects",
        "LatLongPoint",
        |item| item.extract::<PyLatLongPoint>().ok().map(|p| p.inner),
    )
}

fn cells_arg(value: &Bound<'_, PyAny>) -> PyResult<Vec<DggsCell>> {
    list_arg(
        value,
        "Argument must be a list containing only DggsCell objects",
        "DggsCell",
        |item| item.extract::<PyDggsCell>().ok().map(|c| c.inner),
    )
}

fn lat_long_shapes_arg(value: &Bound<'_, PyAny>) -> PyResult<Vec<LatLongShape>> {
    list_arg(
        value,
        "Argument must be a list containing only LatLongPoint, LatLongLinestring and \
         LatLongPolygon objects",
        "LatLongPoint, LatLongLinestring or LatLongPolygon",
        |item| {
            if let Ok(point) = item.extract::<PyLatLongPoint>() {
                Some(LatLongShape::Point(point.inner))
            } else if let Ok(linestring) = item.extract::<PyLatLongLinestring>() {
                Some(LatLongShape::Linestring(linestring.inner))
            } else {
                item.extract::<PyLatLongPolygon>()
                    .ok()
                    .map(|polygon| LatLongShape::Polygon(polygon.inner))
            }
        },
    )
}

//==================================================================================
// V. Session
//==================================================================================

#[pyclass(name = "Eaggr", module = "eaggr")]
pub struct PyEaggr {
    inner: Option<Eaggr>,
}

impl PyEaggr {
    fn session(&self) -> PyResult<&Eaggr> {
        self.inner
            .as_ref()
            .ok_or_else(|| PyRuntimeError::new_err("The Eaggr session has been closed"))
    }
}

#[pymethods]
impl PyEaggr {
    /// Loads the engine if needed and opens a handle for `dggs_model`.
    #[new]
    fn new(dggs_model: &Bound<'_, PyAny>) -> PyResult<Self> {
        let session = Eaggr::new(model_arg(dggs_model)?)?;
        Ok(Self {
            inner: Some(session),
        })
    }

    /// Closes the native handle. Later calls on this object raise.
    fn close(&mut self) {
        if let Some(session) = self.inner.take() {
            session.close();
        }
    }

    fn get_model(&self) -> PyResult<i32> {
        Ok(self.session()?.model().to_raw())
    }

    fn get_version(&self) -> PyResult<String> {
        Ok(self.session()?.version()?)
    }

    fn convert_point_to_dggs_cell(&self, point: &Bound<'_, PyAny>) -> PyResult<PyDggsCell> {
        let cell = self.session()?.convert_point_to_dggs_cell(&point_arg(point)?)?;
        Ok(PyDggsCell { inner: cell })
    }

    fn convert_points_to_dggs_cells(&self, points: &Bound<'_, PyAny>) -> PyResult<Vec<PyDggsCell>> {
        let cells = self.session()?.convert_points_to_dggs_cells(&points_arg(points)?)?;
        Ok(wrap_cells(cells))
    }

    fn convert_shapes_to_dggs_shapes(&self, shapes: &Bound<'_, PyAny>) -> PyResult<Vec<PyDggsShape>> {
        let shapes = self.session()?.convert_shapes_to_dggs_shapes(&lat_long_shapes_arg(shapes)?)?;
        Ok(wrap_shapes(shapes))
    }

    fn convert_shape_string_to_dggs_shapes(
        &self,
        string: &Bound<'_, PyAny>,
        string_format: &Bound<'_, PyAny>,
        accuracy: &Bound<'_, PyAny>,
    ) -> PyResult<Vec<PyDggsShape>> {
        let format = format_arg(string_format)?;
        let text: String = string
            .extract()
            .map_err(|_| PyValueError::new_err("Invalid shape string"))?;
        let accuracy: f64 = accuracy
            .extract()
            .map_err(|_| PyValueError::new_err("Invalid accuracy value"))?;
        let shapes = self
            .session()?
            .convert_shape_string_to_dggs_shapes(&text, format, accuracy)?;
        Ok(wrap_shapes(shapes))
    }

    fn convert_dggs_cell_to_point(&self, cell: &Bound<'_, PyAny>) -> PyResult<PyLatLongPoint> {
        let point = self.session()?.convert_dggs_cell_to_point(&cell_arg(cell)?)?;
        Ok(PyLatLongPoint { inner: point })
    }

    fn convert_dggs_cells_to_points(&self, cells: &Bound<'_, PyAny>) -> PyResult<Vec<PyLatLongPoint>> {
        let points = self.session()?.convert_dggs_cells_to_points(&cells_arg(cells)?)?;
        Ok(points.into_iter().map(|inner| PyLatLongPoint { inner }).collect())
    }

    fn convert_dggs_cells_to_shape_string(
        &self,
        cells: &Bound<'_, PyAny>,
        string_format: &Bound<'_, PyAny>,
    ) -> PyResult<String> {
        let format = format_arg(string_format)?;
        Ok(self
            .session()?
            .convert_dggs_cells_to_shape_string(&cells_arg(cells)?, format)?)
    }

    fn convert_dggs_cell_outline_to_shape_string(
        &self,
        cell: &Bound<'_, PyAny>,
        string_format: &Bound<'_, PyAny>,
    ) -> PyResult<String> {
        let format = format_arg(string_format)?;
        Ok(self
            .session()?
            .convert_dggs_cell_outline_to_shape_string(&cell_arg(cell)?, format)?)
    }

    fn get_dggs_cell_parents(&self, cell: &Bound<'_, PyAny>) -> PyResult<Vec<PyDggsCell>> {
        Ok(wrap_cells(self.session()?.get_dggs_cell_parents(&cell_arg(cell)?)?))
    }

    fn get_dggs_cell_children(&self, cell: &Bound<'_, PyAny>) -> PyResult<Vec<PyDggsCell>> {
        Ok(wrap_cells(self.session()?.get_dggs_cell_children(&cell_arg(cell)?)?))
    }

    fn get_dggs_cell_siblings(&self, cell: &Bound<'_, PyAny>) -> PyResult<Vec<PyDggsCell>> {
        Ok(wrap_cells(self.session()?.get_dggs_cell_siblings(&cell_arg(cell)?)?))
    }

    fn get_bounding_dggs_cell(&self, cells: &Bound<'_, PyAny>) -> PyResult<PyDggsCell> {
        let cell = self.session()?.get_bounding_dggs_cell(&cells_arg(cells)?)?;
        Ok(PyDggsCell { inner: cell })
    }

    fn create_dggs_kml_file(&self, filename: &Bound<'_, PyAny>, cells: &Bound<'_, PyAny>) -> PyResult<()> {
        let filename: PathBuf = filename
            .extract()
            .map_err(|_| PyValueError::new_err("Invalid filename for KML file"))?;
        Ok(self
            .session()?
            .create_dggs_kml_file(filename, &cells_arg(cells)?)?)
    }

    fn compare_dggs_shapes(
        &self,
        base_shape: &Bound<'_, PyAny>,
        comparison_shape: &Bound<'_, PyAny>,
        analysis_type: &Bound<'_, PyAny>,
    ) -> PyResult<bool> {
        let analysis = analysis_arg(analysis_type)?;
        Ok(self.session()?.compare_dggs_shapes(
            &shape_arg(base_shape)?,
            &shape_arg(comparison_shape)?,
            analysis,
        )?)
    }
}

//==================================================================================
// VI. Module Functions
//==================================================================================

/// Routes the crate's log output to stderr, or appends it to `log_file`.
#[pyfunction]
#[pyo3(name = "enable_verbose_logging", signature = (log_file = None))]
pub fn enable_verbose_logging_py(log_file: Option<PathBuf>) -> PyResult<()> {
    crate::logging::init_logging(LevelFilter::Info, log_file.as_deref())?;
    Ok(())
}
