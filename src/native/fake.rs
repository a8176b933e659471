// In: src/native/fake.rs

//! An in-process engine implementing every entry point of the C ABI, used by
//! the test suite in place of the real library.
//!
//! Cells are a simple quad-tree: two decimal digits select one of twenty
//! longitude bands ("faces"), and each further base-4 digit halves the
//! cell's latitude and longitude span. The geometry is crude but the ABI
//! contract is exact: output buffers are heap-allocated and must come back
//! through the deallocation entry points. Every allocation is tracked per
//! handle so tests can assert no leaks and no double frees.

use std::collections::{HashMap, HashSet};
use std::ffi::{CStr, CString};
use std::fmt::Write as _;
use std::fs;
use std::os::raw::{c_char, c_double, c_int, c_ushort, c_void};
use std::ptr;
use std::slice;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use bytemuck::Zeroable;
use once_cell::sync::Lazy;
use serde_json::{json, Value};

use super::abi::*;
use crate::types::{AnalysisType, LatLongShapeType, Model, ReturnCode, ShapeLocation, ShapeType};

const FACE_COUNT: u32 = 20;
const FACE_WIDTH_DEGREES: f64 = 360.0 / FACE_COUNT as f64;
const GLOBE_AREA_M2: f64 = 5.100_656e14;
const FACE_DIGITS: usize = 2;
const MAX_RESOLUTION: usize = MAX_CELL_STRING_LENGTH - 1 - FACE_DIGITS;

pub const FAKE_VERSION: &str = "v2.0";

//==================================================================================
// I. Handle Registry & Allocation Tracking
//==================================================================================

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);
/// Open handles, keyed by address, with their ids.
static OPEN_HANDLES: Lazy<Mutex<HashMap<usize, usize>>> = Lazy::new(|| Mutex::new(HashMap::new()));
static CLOSED_IDS: Lazy<Mutex<HashSet<usize>>> = Lazy::new(|| Mutex::new(HashSet::new()));

enum Allocation {
    Shapes(usize),
    Cells(usize),
    Rings(usize),
    Text,
}

type Failure = (ReturnCode, String);

struct FakeDggs {
    id: usize,
    model: Model,
    last_error: Mutex<String>,
    live: Mutex<HashMap<usize, Allocation>>,
    allocations: AtomicUsize,
    double_frees: AtomicUsize,
    fail_message_retrieval: AtomicBool,
    overreport_topology: AtomicBool,
    corrupt_locations: AtomicBool,
}

impl FakeDggs {
    fn new(model: Model) -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::SeqCst),
            model,
            last_error: Mutex::new(String::new()),
            live: Mutex::new(HashMap::new()),
            allocations: AtomicUsize::new(0),
            double_frees: AtomicUsize::new(0),
            fail_message_retrieval: AtomicBool::new(false),
            overreport_topology: AtomicBool::new(false),
            corrupt_locations: AtomicBool::new(false),
        }
    }

    fn track(&self, address: usize, allocation: Allocation) {
        self.allocations.fetch_add(1, Ordering::SeqCst);
        self.live.lock().unwrap().insert(address, allocation);
    }

    fn untrack(&self, address: usize) -> Option<Allocation> {
        self.live.lock().unwrap().remove(&address)
    }

    fn alloc_slice<T>(&self, items: Vec<T>, kind: fn(usize) -> Allocation) -> *mut T {
        if items.is_empty() {
            return ptr::null_mut();
        }
        let len = items.len();
        let ptr = Box::into_raw(items.into_boxed_slice()) as *mut T;
        self.track(ptr as usize, kind(len));
        ptr
    }

    fn alloc_string(&self, text: &str) -> *mut c_char {
        let raw = CString::new(text).unwrap_or_default().into_raw();
        self.track(raw as usize, Allocation::Text);
        raw
    }

    fn linestring(&self, ids: &[String]) -> WireDggsLinestring {
        let cells: Vec<WireCell> = ids.iter().map(|id| wire_cell(id)).collect();
        let count = cells.len() as c_ushort;
        WireDggsLinestring {
            cells: self.alloc_slice(cells, Allocation::Cells),
            no_of_cells: count,
        }
    }

    /// Frees an engine-owned slice, counting a double free when the pointer
    /// is not (or no longer) one of ours.
    unsafe fn free_slice<T>(&self, ptr: *mut T, expect: fn(&Allocation) -> Option<usize>) {
        if ptr.is_null() {
            return;
        }
        match self.untrack(ptr as usize).as_ref().and_then(expect) {
            Some(len) => drop(Box::from_raw(ptr::slice_from_raw_parts_mut(ptr, len))),
            None => {
                self.double_frees.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn location(&self, location: ShapeLocation) -> c_int {
        if self.corrupt_locations.load(Ordering::SeqCst) {
            99
        } else {
            location.to_raw()
        }
    }
}

fn lookup<'a>(handle: DggsHandle) -> Option<&'a FakeDggs> {
    if handle.is_null() || !OPEN_HANDLES.lock().unwrap().contains_key(&(handle as usize)) {
        return None;
    }
    // SAFETY: registered handles point at live boxed `FakeDggs` values until
    // they are removed by `fake_close_dggs_handle`.
    Some(unsafe { &*(handle as *const FakeDggs) })
}

/// Runs `body` against the handle's state, recording any failure message.
fn run(handle: DggsHandle, body: impl FnOnce(&FakeDggs) -> Result<(), Failure>) -> c_int {
    let Some(dggs) = lookup(handle) else {
        return ReturnCode::InvalidHandle.to_raw();
    };
    match body(dggs) {
        Ok(()) => ReturnCode::Success.to_raw(),
        Err((code, message)) => {
            *dggs.last_error.lock().unwrap() = message;
            code.to_raw()
        }
    }
}

fn fail<T>(code: ReturnCode, message: impl Into<String>) -> Result<T, Failure> {
    Err((code, message.into()))
}

fn check_pointer<T>(ptr: *const T, name: &str) -> Result<(), Failure> {
    if ptr.is_null() {
        return fail(ReturnCode::NullPointer, format!("Null pointer supplied for {}", name));
    }
    Ok(())
}

unsafe fn input_slice<'a, T>(ptr: *const T, count: c_ushort, name: &str) -> Result<&'a [T], Failure> {
    check_pointer(ptr, name)?;
    if count == 0 {
        return Ok(&[]);
    }
    Ok(slice::from_raw_parts(ptr, count as usize))
}

// Test controls and probes.

pub fn live_allocations(handle: DggsHandle) -> usize {
    lookup(handle).map_or(0, |d| d.live.lock().unwrap().len())
}

pub fn total_allocations(handle: DggsHandle) -> usize {
    lookup(handle).map_or(0, |d| d.allocations.load(Ordering::SeqCst))
}

pub fn double_frees(handle: DggsHandle) -> usize {
    lookup(handle).map_or(0, |d| d.double_frees.load(Ordering::SeqCst))
}

pub fn handle_id(handle: DggsHandle) -> Option<usize> {
    lookup(handle).map(|d| d.id)
}

pub fn is_closed(id: usize) -> bool {
    CLOSED_IDS.lock().unwrap().contains(&id)
}

pub fn set_message_retrieval_failure(handle: DggsHandle, fail: bool) {
    if let Some(d) = lookup(handle) {
        d.fail_message_retrieval.store(fail, Ordering::SeqCst);
    }
}

pub fn set_topology_overreport(handle: DggsHandle, on: bool) {
    if let Some(d) = lookup(handle) {
        d.overreport_topology.store(on, Ordering::SeqCst);
    }
}

pub fn set_corrupt_locations(handle: DggsHandle, on: bool) {
    if let Some(d) = lookup(handle) {
        d.corrupt_locations.store(on, Ordering::SeqCst);
    }
}

//==================================================================================
// II. Cell Geometry
//==================================================================================

#[derive(Clone, Debug, PartialEq)]
struct FakeCell {
    face: u32,
    digits: Vec<u8>,
}

impl FakeCell {
    fn parse(id: &str) -> Result<Self, Failure> {
        let invalid = || (ReturnCode::ModelError, format!("Invalid cell ID '{}'", id));
        if id.len() < FACE_DIGITS || !id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if id.len() > FACE_DIGITS + MAX_RESOLUTION {
            return fail(
                ReturnCode::CellLengthTooLong,
                format!("Cell ID '{}' exceeds the maximum resolution", id),
            );
        }
        let face: u32 = id[..FACE_DIGITS].parse().map_err(|_| invalid())?;
        if face >= FACE_COUNT {
            return Err(invalid());
        }
        let digits: Vec<u8> = id[FACE_DIGITS..].bytes().map(|b| b - b'0').collect();
        if digits.iter().any(|&d| d > 3) {
            return Err(invalid());
        }
        Ok(Self { face, digits })
    }

    fn id(&self) -> String {
        let mut id = format!("{:02}", self.face);
        for d in &self.digits {
            id.push((b'0' + d) as char);
        }
        id
    }

    fn locate(latitude: f64, longitude: f64, resolution: usize) -> Self {
        let face = (((longitude + 180.0) / FACE_WIDTH_DEGREES).floor() as i64)
            .clamp(0, FACE_COUNT as i64 - 1) as u32;
        let (mut south, mut north) = (-90.0, 90.0);
        let mut west = -180.0 + face as f64 * FACE_WIDTH_DEGREES;
        let mut east = west + FACE_WIDTH_DEGREES;
        let mut digits = Vec::with_capacity(resolution);
        for _ in 0..resolution {
            let mid_lat = (south + north) / 2.0;
            let mid_lon = (west + east) / 2.0;
            let upper = latitude >= mid_lat;
            let right = longitude >= mid_lon;
            if upper {
                south = mid_lat;
            } else {
                north = mid_lat;
            }
            if right {
                west = mid_lon;
            } else {
                east = mid_lon;
            }
            digits.push(((upper as u8) << 1) | right as u8);
        }
        Self { face, digits }
    }

    /// (south, north, west, east) in degrees.
    fn bounds(&self) -> (f64, f64, f64, f64) {
        let (mut south, mut north) = (-90.0, 90.0);
        let mut west = -180.0 + self.face as f64 * FACE_WIDTH_DEGREES;
        let mut east = west + FACE_WIDTH_DEGREES;
        for &d in &self.digits {
            let mid_lat = (south + north) / 2.0;
            let mid_lon = (west + east) / 2.0;
            if d & 2 != 0 {
                south = mid_lat;
            } else {
                north = mid_lat;
            }
            if d & 1 != 0 {
                west = mid_lon;
            } else {
                east = mid_lon;
            }
        }
        (south, north, west, east)
    }

    fn centre(&self) -> (f64, f64) {
        let (south, north, west, east) = self.bounds();
        ((south + north) / 2.0, (west + east) / 2.0)
    }

    fn area(&self) -> f64 {
        GLOBE_AREA_M2 / FACE_COUNT as f64 / 4f64.powi(self.digits.len() as i32)
    }

    fn outline(&self) -> Vec<(f64, f64)> {
        let (south, north, west, east) = self.bounds();
        vec![
            (south, west),
            (south, east),
            (north, east),
            (north, west),
            (south, west),
        ]
    }
}

fn resolution_for(model: Model, accuracy: f64) -> Result<usize, Failure> {
    if !(accuracy > 0.0) || !accuracy.is_finite() {
        return fail(ReturnCode::InvalidParam, format!("Invalid accuracy {}", accuracy));
    }
    let face_area = GLOBE_AREA_M2 / FACE_COUNT as f64;
    let resolution = (face_area / accuracy).log(4.0).ceil().clamp(1.0, MAX_RESOLUTION as f64) as usize;
    Ok(match model {
        Model::Isea4t => resolution,
        Model::Isea3h => resolution.saturating_sub(1).max(1),
    })
}

fn point_to_cell(model: Model, latitude: f64, longitude: f64, accuracy: f64) -> Result<String, Failure> {
    if !(-90.0..=90.0).contains(&latitude) {
        return fail(ReturnCode::ModelError, format!("Latitude {} is out of range", latitude));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return fail(ReturnCode::ModelError, format!("Longitude {} is out of range", longitude));
    }
    let resolution = resolution_for(model, accuracy)?;
    Ok(FakeCell::locate(latitude, longitude, resolution).id())
}

fn wire_cell(id: &str) -> WireCell {
    let mut cell = WireCell::zeroed();
    for (slot, byte) in cell.0.iter_mut().zip(id.bytes().take(MAX_CELL_STRING_LENGTH - 1)) {
        *slot = byte as c_char;
    }
    cell
}

fn read_cell(cell: &WireCell) -> Result<String, Failure> {
    let Some(end) = cell.0.iter().position(|&c| c == 0) else {
        return fail(ReturnCode::CellLengthTooLong, "Cell ID is not terminated");
    };
    let bytes: Vec<u8> = cell.0[..end].iter().map(|&c| c as u8).collect();
    let id = String::from_utf8(bytes).map_err(|_| (ReturnCode::ModelError, "Cell ID is not text".to_string()))?;
    FakeCell::parse(&id)?;
    Ok(id)
}

//==================================================================================
// III. Shape Strings
//==================================================================================

enum Geometry {
    Point((f64, f64)),
    Line(Vec<(f64, f64)>),
    Polygon(Vec<Vec<(f64, f64)>>),
}

fn parse_wkt(text: &str) -> Option<Vec<Geometry>> {
    text.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_wkt_geometry)
        .collect()
}

fn parse_wkt_geometry(text: &str) -> Option<Geometry> {
    let open = text.find('(')?;
    let tag = text[..open].trim().to_ascii_uppercase();
    let inner = text[open..].trim().strip_prefix('(')?.strip_suffix(')')?;
    match tag.as_str() {
        "POINT" => match parse_wkt_coords(inner)?.as_slice() {
            [single] => Some(Geometry::Point(*single)),
            _ => None,
        },
        "LINESTRING" => Some(Geometry::Line(parse_wkt_coords(inner)?)),
        "POLYGON" => {
            let mut rings = Vec::new();
            let mut rest = inner.trim();
            while !rest.is_empty() {
                let ring = rest.strip_prefix('(')?;
                let close = ring.find(')')?;
                rings.push(parse_wkt_coords(&ring[..close])?);
                rest = ring[close + 1..].trim_start();
                rest = rest.strip_prefix(',').unwrap_or(rest).trim_start();
            }
            if rings.is_empty() {
                None
            } else {
                Some(Geometry::Polygon(rings))
            }
        }
        _ => None,
    }
}

fn parse_wkt_coords(text: &str) -> Option<Vec<(f64, f64)>> {
    text.split(',')
        .map(|pair| {
            let mut parts = pair.split_whitespace();
            let longitude: f64 = parts.next()?.parse().ok()?;
            let latitude: f64 = parts.next()?.parse().ok()?;
            if parts.next().is_some() {
                return None;
            }
            Some((latitude, longitude))
        })
        .collect()
}

fn parse_geojson(text: &str) -> Option<Vec<Geometry>> {
    let value: Value = serde_json::from_str(text).ok()?;
    geojson_geometries(&value)
}

fn geojson_geometries(value: &Value) -> Option<Vec<Geometry>> {
    match value.get("type")?.as_str()? {
        "GeometryCollection" => collect_geojson(value.get("geometries")?),
        "FeatureCollection" => collect_geojson(value.get("features")?),
        "Feature" => geojson_geometries(value.get("geometry")?),
        _ => Some(vec![geojson_geometry(value)?]),
    }
}

fn collect_geojson(items: &Value) -> Option<Vec<Geometry>> {
    let mut out = Vec::new();
    for item in items.as_array()? {
        out.extend(geojson_geometries(item)?);
    }
    Some(out)
}

fn geojson_geometry(value: &Value) -> Option<Geometry> {
    let coordinates = value.get("coordinates")?;
    match value.get("type")?.as_str()? {
        "Point" => Some(Geometry::Point(geojson_position(coordinates)?)),
        "LineString" => Some(Geometry::Line(geojson_positions(coordinates)?)),
        "Polygon" => Some(Geometry::Polygon(
            coordinates
                .as_array()?
                .iter()
                .map(geojson_positions)
                .collect::<Option<Vec<_>>>()?,
        )),
        _ => None,
    }
}

fn geojson_positions(value: &Value) -> Option<Vec<(f64, f64)>> {
    value.as_array()?.iter().map(geojson_position).collect()
}

fn geojson_position(value: &Value) -> Option<(f64, f64)> {
    match value.as_array()?.as_slice() {
        [lon, lat, ..] => Some((lat.as_f64()?, lon.as_f64()?)),
        _ => None,
    }
}

fn format_points(format: c_int, points: &[(f64, f64)]) -> Result<String, Failure> {
    if format == 1 {
        let coordinates: Vec<Value> = points.iter().map(|(lat, lon)| json!([lon, lat])).collect();
        return Ok(json!({ "type": "MultiPoint", "coordinates": coordinates }).to_string());
    }
    check_format(format)?;
    if points.is_empty() {
        return Ok("MULTIPOINT EMPTY".to_string());
    }
    let body: Vec<String> = points.iter().map(|(lat, lon)| format!("{} {}", lon, lat)).collect();
    Ok(format!("MULTIPOINT ({})", body.join(", ")))
}

fn format_outline(format: c_int, ring: &[(f64, f64)]) -> Result<String, Failure> {
    if format == 1 {
        let coordinates: Vec<Value> = ring.iter().map(|(lat, lon)| json!([lon, lat])).collect();
        return Ok(json!({ "type": "Polygon", "coordinates": [coordinates] }).to_string());
    }
    check_format(format)?;
    let body: Vec<String> = ring.iter().map(|(lat, lon)| format!("{} {}", lon, lat)).collect();
    Ok(format!("POLYGON (({}))", body.join(", ")))
}

fn check_format(format: c_int) -> Result<(), Failure> {
    match format {
        0 | 1 => Ok(()),
        other => fail(ReturnCode::InvalidParam, format!("Unsupported shape string format {}", other)),
    }
}

//==================================================================================
// IV. Spatial Analysis
//==================================================================================

unsafe fn shape_cells(shape: &WireDggsShape) -> Result<Vec<String>, Failure> {
    match shape.shape_type {
        0 => Ok(vec![read_cell(&shape.data.cell)?]),
        1 => linestring_cells(&shape.data.linestring),
        2 => linestring_cells(&shape.data.polygon.outer_ring),
        other => fail(ReturnCode::InvalidParam, format!("Unrecognised shape type {}", other)),
    }
}

unsafe fn linestring_cells(line: &WireDggsLinestring) -> Result<Vec<String>, Failure> {
    input_slice(line.cells, line.no_of_cells, "m_cells")?
        .iter()
        .map(read_cell)
        .collect()
}

fn related(a: &str, b: &str) -> bool {
    a.starts_with(b) || b.starts_with(a)
}

/// Every cell of `inner` lies inside some cell of `outer`.
fn covers(outer: &[String], inner: &[String]) -> bool {
    inner.iter().all(|i| outer.iter().any(|o| i.starts_with(o.as_str())))
}

fn compare(analysis: AnalysisType, a: &[String], b: &[String]) -> bool {
    let intersects = a.iter().any(|x| b.iter().any(|y| related(x, y)));
    match analysis {
        AnalysisType::Equals => {
            let (sa, sb): (HashSet<_>, HashSet<_>) = (a.iter().collect(), b.iter().collect());
            sa == sb
        }
        AnalysisType::Contains | AnalysisType::Covers => covers(a, b),
        AnalysisType::Within | AnalysisType::CoveredBy => covers(b, a),
        AnalysisType::Intersects => intersects,
        AnalysisType::Disjoint => !intersects,
        AnalysisType::Overlaps => intersects && !covers(a, b) && !covers(b, a),
        AnalysisType::Touches | AnalysisType::Crosses => false,
    }
}

fn analysis_from_raw(raw: c_int) -> Option<AnalysisType> {
    AnalysisType::ALL.iter().copied().find(|a| a.to_raw() == raw)
}

//==================================================================================
// V. Entry Points
//==================================================================================

unsafe extern "C" fn fake_get_version(version: *mut c_char) -> c_int {
    if version.is_null() {
        return ReturnCode::NullPointer.to_raw();
    }
    let out = slice::from_raw_parts_mut(version, VERSION_STRING_LENGTH);
    out.fill(0);
    for (slot, byte) in out.iter_mut().zip(FAKE_VERSION.bytes()) {
        *slot = byte as c_char;
    }
    ReturnCode::Success.to_raw()
}

unsafe extern "C" fn fake_get_last_error_message(
    handle: DggsHandle,
    message: *mut *mut c_char,
    message_length: *mut c_ushort,
) -> c_int {
    let Some(dggs) = lookup(handle) else {
        return ReturnCode::InvalidHandle.to_raw();
    };
    if message.is_null() || message_length.is_null() {
        return ReturnCode::NullPointer.to_raw();
    }
    if dggs.fail_message_retrieval.load(Ordering::SeqCst) {
        return ReturnCode::UnknownError.to_raw();
    }
    let text = dggs.last_error.lock().unwrap().clone();
    if text.is_empty() {
        *message = ptr::null_mut();
        *message_length = 0;
    } else {
        *message = dggs.alloc_string(&text);
        *message_length = (text.len() + 1) as c_ushort;
    }
    ReturnCode::Success.to_raw()
}

unsafe extern "C" fn fake_open_dggs_handle(model: c_int, handle: *mut DggsHandle) -> c_int {
    if handle.is_null() {
        return ReturnCode::NullPointer.to_raw();
    }
    let model = match model {
        0 => Model::Isea4t,
        1 => Model::Isea3h,
        _ => return ReturnCode::InvalidParam.to_raw(),
    };
    let raw = Box::into_raw(Box::new(FakeDggs::new(model)));
    OPEN_HANDLES.lock().unwrap().insert(raw as usize, (*raw).id);
    *handle = raw as *mut c_void;
    ReturnCode::Success.to_raw()
}

unsafe extern "C" fn fake_open_dggs_handle_failing(_model: c_int, _handle: *mut DggsHandle) -> c_int {
    ReturnCode::MemoryAllocationFailure.to_raw()
}

unsafe extern "C" fn fake_close_dggs_handle(handle: *mut DggsHandle) -> c_int {
    if handle.is_null() {
        return ReturnCode::NullPointer.to_raw();
    }
    let Some(id) = OPEN_HANDLES.lock().unwrap().remove(&(*handle as usize)) else {
        return ReturnCode::InvalidHandle.to_raw();
    };
    drop(Box::from_raw(*handle as *mut FakeDggs));
    CLOSED_IDS.lock().unwrap().insert(id);
    *handle = ptr::null_mut();
    ReturnCode::Success.to_raw()
}

unsafe extern "C" fn fake_convert_points_to_dggs_cells(
    handle: DggsHandle,
    points: *const WireLatLongPoint,
    no_of_points: c_ushort,
    cells: *mut WireCell,
) -> c_int {
    run(handle, |dggs| {
        let points = input_slice(points, no_of_points, "a_points")?;
        check_pointer(cells, "a_pDggsCells")?;
        for (index, point) in points.iter().enumerate() {
            let id = point_to_cell(dggs.model, point.latitude, point.longitude, point.accuracy)?;
            *cells.add(index) = wire_cell(&id);
        }
        Ok(())
    })
}

unsafe fn convert_geometry(dggs: &FakeDggs, geometry: &Geometry, accuracy: f64) -> Result<WireDggsShape, Failure> {
    let cells_for = |points: &[(f64, f64)]| -> Result<Vec<String>, Failure> {
        points
            .iter()
            .map(|&(lat, lon)| point_to_cell(dggs.model, lat, lon, accuracy))
            .collect()
    };
    let mut shape = WireDggsShape::zeroed();
    match geometry {
        Geometry::Point((lat, lon)) => {
            shape.shape_type = ShapeType::Cell.to_raw();
            shape.data.cell = wire_cell(&point_to_cell(dggs.model, *lat, *lon, accuracy)?);
            shape.location = dggs.location(ShapeLocation::OneFace);
        }
        Geometry::Line(points) => {
            let ids = cells_for(points.as_slice())?;
            shape.shape_type = ShapeType::Linestring.to_raw();
            shape.data.linestring = dggs.linestring(&ids);
            shape.location = dggs.location(ShapeLocation::NoLocation);
        }
        Geometry::Polygon(rings) => {
            let (outer, inner) = rings
                .split_first()
                .ok_or((ReturnCode::InvalidParam, "Polygon has no outer ring".to_string()))?;
            let outer_ids = cells_for(outer.as_slice())?;
            let inner_ids = inner
                .iter()
                .map(|r| cells_for(r.as_slice()))
                .collect::<Result<Vec<_>, _>>()?;
            let inner_rings: Vec<WireDggsLinestring> = inner_ids.iter().map(|ids| dggs.linestring(ids)).collect();
            let no_of_inner_rings = inner_rings.len() as c_ushort;
            shape.shape_type = ShapeType::Polygon.to_raw();
            shape.data.polygon = WireDggsPolygon {
                outer_ring: dggs.linestring(&outer_ids),
                inner_rings: dggs.alloc_slice(inner_rings, Allocation::Rings),
                no_of_inner_rings,
            };
            shape.location = dggs.location(ShapeLocation::NoLocation);
        }
    }
    Ok(shape)
}

unsafe fn read_lat_long_shape(shape: &WireLatLongShape) -> Result<(Geometry, f64), Failure> {
    let points = |line: &WireLatLongLinestring| -> Result<Vec<WireLatLongPoint>, Failure> {
        Ok(input_slice(line.points, line.no_of_points, "m_points")?.to_vec())
    };
    fn pairs(pts: &[WireLatLongPoint]) -> Vec<(f64, f64)> {
        pts.iter().map(|p| (p.latitude, p.longitude)).collect()
    }
    match LatLongShapeType::from_raw(shape.shape_type) {
        Ok(LatLongShapeType::Point) => {
            let p = shape.data.point;
            Ok((Geometry::Point((p.latitude, p.longitude)), p.accuracy))
        }
        Ok(LatLongShapeType::Linestring) => {
            let pts = points(&shape.data.linestring)?;
            let accuracy = pts.first().map_or(1.0, |p| p.accuracy);
            Ok((Geometry::Line(pairs(&pts)), accuracy))
        }
        Ok(LatLongShapeType::Polygon) => {
            let polygon = shape.data.polygon;
            let outer = points(&polygon.outer_ring)?;
            let accuracy = outer.first().map_or(1.0, |p| p.accuracy);
            let mut rings = vec![pairs(&outer)];
            for ring in input_slice(polygon.inner_rings, polygon.no_of_inner_rings, "m_innerRings")? {
                rings.push(pairs(&points(ring)?));
            }
            Ok((Geometry::Polygon(rings), accuracy))
        }
        Err(_) => fail(ReturnCode::InvalidParam, format!("Unrecognised shape type {}", shape.shape_type)),
    }
}

unsafe fn emit_shapes(
    dggs: &FakeDggs,
    shapes: Vec<WireDggsShape>,
    out: *mut *mut WireDggsShape,
) -> c_ushort {
    let count = shapes.len() as c_ushort;
    *out = dggs.alloc_slice(shapes, Allocation::Shapes);
    count
}

/// Converts shapes in order into `out`. As in the engine, a failure part-way
/// leaves the shapes converted so far allocated and returns the error.
unsafe fn convert_in_order(
    dggs: &FakeDggs,
    shapes: impl Iterator<Item = Result<(Geometry, f64), Failure>>,
    out: *mut *mut WireDggsShape,
) -> (c_ushort, Result<(), Failure>) {
    let mut converted = Vec::new();
    let mut outcome = Ok(());
    for shape in shapes {
        match shape.and_then(|(geometry, accuracy)| convert_geometry(dggs, &geometry, accuracy)) {
            Ok(wire) => converted.push(wire),
            Err(failure) => {
                outcome = Err(failure);
                break;
            }
        }
    }
    if converted.is_empty() && outcome.is_err() {
        return (0, outcome);
    }
    (emit_shapes(dggs, converted, out), outcome)
}

unsafe extern "C" fn fake_convert_shapes_to_dggs_shapes(
    handle: DggsHandle,
    shapes: *const WireLatLongShape,
    no_of_shapes: c_ushort,
    dggs_shapes: *mut *mut WireDggsShape,
) -> c_int {
    run(handle, |dggs| {
        let shapes = input_slice(shapes, no_of_shapes, "a_shapes")?;
        check_pointer(dggs_shapes, "a_pDggsShapes")?;
        *dggs_shapes = ptr::null_mut();
        let (_, outcome) = convert_in_order(
            dggs,
            shapes.iter().map(|shape| read_lat_long_shape(shape)),
            dggs_shapes,
        );
        outcome
    })
}

unsafe extern "C" fn fake_convert_shape_string_to_dggs_shapes(
    handle: DggsHandle,
    string: *const c_char,
    format: c_int,
    accuracy: c_double,
    dggs_shapes: *mut *mut WireDggsShape,
    no_of_shapes: *mut c_ushort,
) -> c_int {
    run(handle, |dggs| {
        check_pointer(string, "a_string")?;
        check_pointer(dggs_shapes, "a_pDggsShapes")?;
        check_pointer(no_of_shapes, "a_pNoOfShapes")?;
        let text = CStr::from_ptr(string)
            .to_str()
            .map_err(|_| (ReturnCode::InvalidParam, "Shape string is not UTF-8".to_string()))?;
        check_format(format)?;
        let geometries = if format == 0 { parse_wkt(text) } else { parse_geojson(text) }
            .ok_or((ReturnCode::InvalidParam, "Unable to parse shape string".to_string()))?;
        *dggs_shapes = ptr::null_mut();
        let (count, outcome) = convert_in_order(
            dggs,
            geometries.into_iter().map(|geometry| Ok((geometry, accuracy))),
            dggs_shapes,
        );
        *no_of_shapes = count;
        outcome
    })
}

unsafe extern "C" fn fake_deallocate_dggs_shapes(
    handle: DggsHandle,
    dggs_shapes: *mut *mut WireDggsShape,
    no_of_shapes: c_ushort,
) -> c_int {
    run(handle, |dggs| {
        check_pointer(dggs_shapes, "a_pDggsShapes")?;
        let array = *dggs_shapes;
        if array.is_null() {
            return Ok(());
        }
        let len = match dggs.untrack(array as usize) {
            Some(Allocation::Shapes(len)) => len,
            _ => {
                dggs.double_frees.fetch_add(1, Ordering::SeqCst);
                return fail(ReturnCode::InvalidParam, "DGGS shape array is not allocated");
            }
        };
        if no_of_shapes as usize > len {
            dggs.live.lock().unwrap().insert(array as usize, Allocation::Shapes(len));
            return fail(
                ReturnCode::InvalidParam,
                format!("Shape count {} exceeds allocation of {}", no_of_shapes, len),
            );
        }
        let shapes = Box::from_raw(ptr::slice_from_raw_parts_mut(array, len));
        let cells = |a: &Allocation| match a {
            Allocation::Cells(n) => Some(*n),
            _ => None,
        };
        let rings = |a: &Allocation| match a {
            Allocation::Rings(n) => Some(*n),
            _ => None,
        };
        // Only the first `no_of_shapes` shapes have their rings freed.
        for shape in &shapes[..no_of_shapes as usize] {
            match shape.shape_type {
                1 => dggs.free_slice(shape.data.linestring.cells, cells),
                2 => {
                    let polygon = shape.data.polygon;
                    dggs.free_slice(polygon.outer_ring.cells, cells);
                    if !polygon.inner_rings.is_null() {
                        for ring in slice::from_raw_parts(polygon.inner_rings, polygon.no_of_inner_rings as usize) {
                            dggs.free_slice(ring.cells, cells);
                        }
                    }
                    dggs.free_slice(polygon.inner_rings, rings);
                }
                _ => {}
            }
        }
        drop(shapes);
        *dggs_shapes = ptr::null_mut();
        Ok(())
    })
}

unsafe extern "C" fn fake_deallocate_string(handle: DggsHandle, string: *mut *mut c_char) -> c_int {
    run(handle, |dggs| {
        check_pointer(string, "a_pDggsString")?;
        let raw = *string;
        if raw.is_null() {
            return Ok(());
        }
        match dggs.untrack(raw as usize) {
            Some(Allocation::Text) => drop(CString::from_raw(raw)),
            _ => {
                dggs.double_frees.fetch_add(1, Ordering::SeqCst);
                return fail(ReturnCode::InvalidParam, "String is not allocated");
            }
        }
        *string = ptr::null_mut();
        Ok(())
    })
}

unsafe extern "C" fn fake_convert_dggs_cells_to_points(
    handle: DggsHandle,
    cells: *const WireCell,
    no_of_cells: c_ushort,
    points: *mut WireLatLongPoint,
) -> c_int {
    run(handle, |_| {
        let cells = input_slice(cells, no_of_cells, "a_cells")?;
        check_pointer(points, "a_points")?;
        for (index, cell) in cells.iter().enumerate() {
            let cell = FakeCell::parse(&read_cell(cell)?)?;
            let (latitude, longitude) = cell.centre();
            *points.add(index) = WireLatLongPoint {
                latitude,
                longitude,
                accuracy: cell.area(),
            };
        }
        Ok(())
    })
}

unsafe extern "C" fn fake_convert_dggs_cells_to_shape_string(
    handle: DggsHandle,
    cells: *const WireCell,
    no_of_cells: c_ushort,
    format: c_int,
    string: *mut *mut c_char,
) -> c_int {
    run(handle, |dggs| {
        let cells = input_slice(cells, no_of_cells, "a_cells")?;
        check_pointer(string, "a_pString")?;
        let centres = cells
            .iter()
            .map(|c| Ok(FakeCell::parse(&read_cell(c)?)?.centre()))
            .collect::<Result<Vec<_>, Failure>>()?;
        *string = dggs.alloc_string(&format_points(format, &centres)?);
        Ok(())
    })
}

unsafe extern "C" fn fake_convert_dggs_cell_outline_to_shape_string(
    handle: DggsHandle,
    cell: *const WireCell,
    format: c_int,
    string: *mut *mut c_char,
) -> c_int {
    run(handle, |dggs| {
        check_pointer(cell, "a_cell")?;
        check_pointer(string, "a_pString")?;
        let cell = FakeCell::parse(&read_cell(&*cell)?)?;
        *string = dggs.alloc_string(&format_outline(format, &cell.outline())?);
        Ok(())
    })
}

unsafe fn related_cells(
    handle: DggsHandle,
    cell: *const WireCell,
    out: *mut WireCell,
    count: *mut c_ushort,
    capacity: usize,
    relate: fn(&FakeCell) -> Vec<FakeCell>,
) -> c_int {
    run(handle, |dggs| {
        check_pointer(cell, "a_cell")?;
        check_pointer(out, "a_cells")?;
        check_pointer(count, "a_pNoOfCells")?;
        let cell = FakeCell::parse(&read_cell(&*cell)?)?;
        let related = relate(&cell);
        for (index, r) in related.iter().take(capacity).enumerate() {
            *out.add(index) = wire_cell(&r.id());
        }
        *count = if dggs.overreport_topology.load(Ordering::SeqCst) {
            (capacity + 1) as c_ushort
        } else {
            related.len().min(capacity) as c_ushort
        };
        Ok(())
    })
}

fn parents_of(cell: &FakeCell) -> Vec<FakeCell> {
    let mut parent = cell.clone();
    match parent.digits.pop() {
        Some(_) => vec![parent],
        None => Vec::new(),
    }
}

fn children_of(cell: &FakeCell) -> Vec<FakeCell> {
    if cell.digits.len() >= MAX_RESOLUTION {
        return Vec::new();
    }
    (0..4)
        .map(|d| {
            let mut child = cell.clone();
            child.digits.push(d);
            child
        })
        .collect()
}

fn siblings_of(cell: &FakeCell) -> Vec<FakeCell> {
    let Some(&last) = cell.digits.last() else {
        return Vec::new();
    };
    (0..4)
        .filter(|&d| d != last)
        .map(|d| {
            let mut sibling = cell.clone();
            if let Some(slot) = sibling.digits.last_mut() {
                *slot = d;
            }
            sibling
        })
        .collect()
}

unsafe extern "C" fn fake_get_dggs_cell_parents(
    handle: DggsHandle,
    cell: *const WireCell,
    parents: *mut WireCell,
    no_of_parents: *mut c_ushort,
) -> c_int {
    related_cells(handle, cell, parents, no_of_parents, MAX_PARENT_CELLS, parents_of)
}

unsafe extern "C" fn fake_get_dggs_cell_children(
    handle: DggsHandle,
    cell: *const WireCell,
    children: *mut WireCell,
    no_of_children: *mut c_ushort,
) -> c_int {
    related_cells(handle, cell, children, no_of_children, MAX_CHILD_CELLS, children_of)
}

unsafe extern "C" fn fake_get_dggs_cell_siblings(
    handle: DggsHandle,
    cell: *const WireCell,
    siblings: *mut WireCell,
    no_of_siblings: *mut c_ushort,
) -> c_int {
    related_cells(handle, cell, siblings, no_of_siblings, MAX_SIBLING_CELLS, siblings_of)
}

unsafe extern "C" fn fake_get_bounding_dggs_cell(
    handle: DggsHandle,
    cells: *const WireCell,
    no_of_cells: c_ushort,
    bounding_cell: *mut WireCell,
) -> c_int {
    run(handle, |_| {
        let cells = input_slice(cells, no_of_cells, "a_cells")?;
        check_pointer(bounding_cell, "a_pBoundingCell")?;
        let ids = cells.iter().map(read_cell).collect::<Result<Vec<_>, _>>()?;
        let Some((first, rest)) = ids.split_first() else {
            return fail(ReturnCode::InvalidParam, "No cells supplied to find the bounding cell of");
        };
        let mut prefix = first.len();
        for id in rest {
            prefix = first
                .bytes()
                .zip(id.bytes())
                .take(prefix)
                .take_while(|(a, b)| a == b)
                .count();
        }
        if prefix < FACE_DIGITS {
            return fail(ReturnCode::ModelError, "Cells do not share a common bounding cell");
        }
        *bounding_cell = wire_cell(&first[..prefix]);
        Ok(())
    })
}

unsafe extern "C" fn fake_create_dggs_kml_file(
    handle: DggsHandle,
    filename: *const c_char,
    cells: *const WireCell,
    no_of_cells: c_ushort,
) -> c_int {
    run(handle, |_| {
        check_pointer(filename, "a_filename")?;
        let cells = input_slice(cells, no_of_cells, "a_cells")?;
        let path = CStr::from_ptr(filename)
            .to_str()
            .map_err(|_| (ReturnCode::InvalidParam, "KML filename is not UTF-8".to_string()))?;
        let mut kml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<kml xmlns=\"http://www.opengis.net/kml/2.2\">\n<Document>\n",
        );
        for cell in cells {
            let id = read_cell(cell)?;
            let ring: Vec<String> = FakeCell::parse(&id)?
                .outline()
                .iter()
                .map(|(lat, lon)| format!("{},{},0", lon, lat))
                .collect();
            let _ = write!(
                kml,
                "<Placemark><name>{}</name><Polygon><outerBoundaryIs><LinearRing><coordinates>{}</coordinates></LinearRing></outerBoundaryIs></Polygon></Placemark>\n",
                id,
                ring.join(" ")
            );
        }
        kml.push_str("</Document>\n</kml>\n");
        fs::write(path, kml)
            .map_err(|e| (ReturnCode::UnknownError, format!("Unable to write KML file {}: {}", path, e)))
    })
}

unsafe extern "C" fn fake_compare_shapes(
    handle: DggsHandle,
    analysis_type: c_int,
    base_shape: *const WireDggsShape,
    comparison_shape: *const WireDggsShape,
    result: *mut bool,
) -> c_int {
    run(handle, |_| {
        check_pointer(base_shape, "a_baseShape")?;
        check_pointer(comparison_shape, "a_comparisonShape")?;
        check_pointer(result, "a_shapeComparisonResult")?;
        let analysis = analysis_from_raw(analysis_type)
            .ok_or((ReturnCode::InvalidParam, format!("Unrecognised analysis type {}", analysis_type)))?;
        let a = shape_cells(&*base_shape)?;
        let b = shape_cells(&*comparison_shape)?;
        *result = compare(analysis, &a, &b);
        Ok(())
    })
}

//==================================================================================
// VI. Function Tables
//==================================================================================

const FAKE_TABLE: NativeApi = NativeApi {
    get_version: fake_get_version,
    get_last_error_message: fake_get_last_error_message,
    open_dggs_handle: fake_open_dggs_handle,
    close_dggs_handle: fake_close_dggs_handle,
    convert_points_to_dggs_cells: fake_convert_points_to_dggs_cells,
    convert_shapes_to_dggs_shapes: fake_convert_shapes_to_dggs_shapes,
    convert_shape_string_to_dggs_shapes: fake_convert_shape_string_to_dggs_shapes,
    deallocate_dggs_shapes: fake_deallocate_dggs_shapes,
    deallocate_string: fake_deallocate_string,
    convert_dggs_cells_to_points: fake_convert_dggs_cells_to_points,
    convert_dggs_cells_to_shape_string: fake_convert_dggs_cells_to_shape_string,
    convert_dggs_cell_outline_to_shape_string: fake_convert_dggs_cell_outline_to_shape_string,
    get_dggs_cell_parents: fake_get_dggs_cell_parents,
    get_dggs_cell_children: fake_get_dggs_cell_children,
    get_dggs_cell_siblings: fake_get_dggs_cell_siblings,
    get_bounding_dggs_cell: fake_get_bounding_dggs_cell,
    create_dggs_kml_file: fake_create_dggs_kml_file,
    compare_shapes: fake_compare_shapes,
};

/// The fake engine.
pub static FAKE_API: NativeApi = FAKE_TABLE;

/// The fake engine, except that opening a handle always fails.
pub static FAILING_OPEN_API: NativeApi = NativeApi {
    open_dggs_handle: fake_open_dggs_handle_failing,
    ..FAKE_TABLE
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_and_centre_agree() {
        let cell = FakeCell::locate(51.5, -0.12, 20);
        let (lat, lon) = cell.centre();
        let (south, north, west, east) = cell.bounds();
        assert!(south <= 51.5 && 51.5 <= north);
        assert!(west <= -0.12 && -0.12 <= east);
        assert!((lat - 51.5).abs() <= north - south);
        assert!((lon + 0.12).abs() <= east - west);
        assert_eq!(FakeCell::parse(&cell.id()).unwrap(), cell);
    }

    #[test]
    fn test_cell_parsing_rejects_garbage() {
        assert!(FakeCell::parse("7").is_err());
        assert!(FakeCell::parse("20").is_err());
        assert!(FakeCell::parse("0704").is_err());
        assert!(FakeCell::parse("07a1").is_err());
        assert!(FakeCell::parse("0701").is_ok());
    }

    #[test]
    fn test_wkt_parsing() {
        let shapes = parse_wkt("POINT (1 2); LINESTRING (0 0, 1 1); POLYGON ((0 0, 1 0, 1 1, 0 0), (0.2 0.2, 0.3 0.2, 0.2 0.2))").unwrap();
        assert_eq!(shapes.len(), 3);
        assert!(matches!(shapes[0], Geometry::Point((lat, lon)) if lat == 2.0 && lon == 1.0));
        assert!(matches!(&shapes[2], Geometry::Polygon(rings) if rings.len() == 2));
        assert!(parse_wkt("CIRCLE (1 2)").is_none());
    }

    #[test]
    fn test_geojson_parsing() {
        let shapes = parse_geojson(r#"{"type":"LineString","coordinates":[[1,2],[3,4]]}"#).unwrap();
        assert!(matches!(&shapes[0], Geometry::Line(points) if points == &vec![(2.0, 1.0), (4.0, 3.0)]));
    }

    #[test]
    fn test_compare_laws() {
        let a = vec!["0701".to_string()];
        let b = vec!["07012".to_string(), "07013".to_string()];
        assert!(compare(AnalysisType::Contains, &a, &b));
        assert!(compare(AnalysisType::Within, &b, &a));
        assert!(compare(AnalysisType::Intersects, &a, &b));
        assert!(!compare(AnalysisType::Disjoint, &a, &b));
        assert!(compare(AnalysisType::Equals, &b, &b));
    }
}
