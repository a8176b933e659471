//! This file is the root of the `eaggr` Rust crate.
//!
//! Its responsibilities are strictly limited to:
//! 1.  Declaring all the top-level modules of the library (`codec`, `bridge`, etc.)
//!     and re-exporting the types callers need.
//! 2.  Defining the `#[pymodule]` which acts as the main entry point when the
//!     compiled library is imported into Python (feature `python`).

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
//==================================================================================
// 1. Module Declarations
//==================================================================================
pub mod bridge;
pub mod codec;
pub mod config;
pub mod error;
pub mod logging;
pub mod native;
pub mod types;

mod ffi;

pub use bridge::Eaggr;
pub use config::LibraryConfig;
pub use error::EaggrError;
pub use types::*;

//==================================================================================
// 2. Python Module Definition
//==================================================================================
#[cfg(feature = "python")]
use pyo3::prelude::*;

/// The `eaggr` Python module.
#[cfg(feature = "python")]
#[pymodule]
fn eaggr(m: &Bound<'_, PyModule>) -> PyResult<()> {
    use ffi::python::*;

    // --- Session and shapes ---
    m.add_class::<PyEaggr>()?;
    m.add_class::<PyLatLongPoint>()?;
    m.add_class::<PyLatLongLinestring>()?;
    m.add_class::<PyLatLongPolygon>()?;
    m.add_class::<PyDggsCell>()?;
    m.add_class::<PyDggsLinestring>()?;
    m.add_class::<PyDggsPolygon>()?;
    m.add_class::<PyDggsShape>()?;

    // --- Enumerations ---
    m.add_class::<PyModel>()?;
    m.add_class::<PyDggsShapeType>()?;
    m.add_class::<PyDggsShapeLocation>()?;
    m.add_class::<PyDggsAnalysisType>()?;
    m.add_class::<PyShapeStringFormat>()?;
    m.add_class::<PyDggsReturnCode>()?;

    // --- Expose the engine error type ---
    m.add_class::<EaggrException>()?;

    // --- Expose version string as a module attribute ---
    m.add("__version__", VERSION)?;

    m.add_function(wrap_pyfunction!(enable_verbose_logging_py, m)?)?;

    Ok(())
}
