// In: src/native/loader.rs

//! Process-wide, load-once access to the engine library.
//!
//! The first successful `load` opens the configured dependencies in order,
//! then the engine, resolves every entry point into a `NativeApi`, and parks
//! the result in a static `OnceCell`. Libraries are never unloaded. A failed
//! load leaves the cell empty so a later call can try again.

use std::path::Path;

use libloading::{Library, Symbol};
use log::{debug, info};
use once_cell::sync::OnceCell;

use super::abi::NativeApi;
use crate::config::LibraryConfig;
use crate::error::EaggrError;

struct NativeLibrary {
    api: NativeApi,
    // Kept open for the lifetime of the process; `api` points into them.
    // Dependencies first, engine last.
    _libraries: Vec<Library>,
}

static NATIVE_LIBRARY: OnceCell<NativeLibrary> = OnceCell::new();

/// Returns the engine's entry points, loading the library on first use.
///
/// Concurrent first calls are serialized; exactly one of them performs the
/// load. Once loaded, `config` is ignored.
pub fn load(config: &LibraryConfig) -> Result<&'static NativeApi, EaggrError> {
    load_into(&NATIVE_LIBRARY, config, NativeLibrary::open)
}

fn load_into<'c>(
    cell: &'c OnceCell<NativeLibrary>,
    config: &LibraryConfig,
    open: impl FnOnce(&LibraryConfig) -> Result<NativeLibrary, EaggrError>,
) -> Result<&'c NativeApi, EaggrError> {
    if let Some(library) = cell.get() {
        return Ok(&library.api);
    }
    let library = cell.get_or_try_init(|| open(config))?;
    Ok(&library.api)
}

/// Installs `api` as the process-wide engine unless one is already loaded,
/// and returns whichever table won.
#[cfg(test)]
pub(crate) fn install(api: NativeApi) -> &'static NativeApi {
    let installed = load_into(&NATIVE_LIBRARY, &LibraryConfig::default(), |_| {
        Ok(NativeLibrary::in_process(api))
    });
    match installed {
        Ok(api) => api,
        Err(e) => panic!("installing an in-process engine cannot fail: {}", e),
    }
}

/// `true` once the engine library has been loaded in this process.
pub fn is_library_loaded() -> bool {
    NATIVE_LIBRARY.get().is_some()
}

impl NativeLibrary {
    fn open(config: &LibraryConfig) -> Result<Self, EaggrError> {
        config.validate()?;

        let mut dependencies = Vec::with_capacity(config.preload.len());
        for path in config.preload_paths() {
            debug!("Loading engine dependency {}", path.display());
            dependencies.push(open_library(&path)?);
        }

        let path = config.library_path();
        let eaggr = open_library(&path)?;
        let api = resolve_api(&eaggr, &path)?;
        info!(
            "Loaded EAGGR engine from {} ({} dependencies)",
            path.display(),
            dependencies.len()
        );

        let mut libraries = dependencies;
        libraries.push(eaggr);
        Ok(Self {
            api,
            _libraries: libraries,
        })
    }

    /// An engine whose entry points are linked into this binary.
    #[cfg(test)]
    fn in_process(api: NativeApi) -> Self {
        Self {
            api,
            _libraries: Vec::new(),
        }
    }
}

fn open_library(path: &Path) -> Result<Library, EaggrError> {
    // SAFETY: loading runs the library's initialisers. The engine and its
    // dependencies are trusted native code shipped alongside the bindings.
    unsafe { Library::new(path) }.map_err(|e| EaggrError::LibraryLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn symbol<T: Copy>(library: &Library, path: &Path, name: &str) -> Result<T, EaggrError> {
    // SAFETY: `T` is the signature declared for `name` in `abi`, matching
    // the engine header.
    let sym: Symbol<T> = unsafe { library.get(name.as_bytes()) }.map_err(|e| {
        EaggrError::LibraryLoad {
            path: path.to_path_buf(),
            reason: format!("missing symbol {}: {}", name, e),
        }
    })?;
    Ok(*sym)
}

fn resolve_api(library: &Library, path: &Path) -> Result<NativeApi, EaggrError> {
    Ok(NativeApi {
        get_version: symbol(library, path, "EAGGR_GetVersion")?,
        get_last_error_message: symbol(library, path, "EAGGR_GetLastErrorMessage")?,
        open_dggs_handle: symbol(library, path, "EAGGR_OpenDggsHandle")?,
        close_dggs_handle: symbol(library, path, "EAGGR_CloseDggsHandle")?,
        convert_points_to_dggs_cells: symbol(library, path, "EAGGR_ConvertPointsToDggsCells")?,
        convert_shapes_to_dggs_shapes: symbol(library, path, "EAGGR_ConvertShapesToDggsShapes")?,
        convert_shape_string_to_dggs_shapes: symbol(
            library,
            path,
            "EAGGR_ConvertShapeStringToDggsShapes",
        )?,
        deallocate_dggs_shapes: symbol(library, path, "EAGGR_DeallocateDggsShapes")?,
        deallocate_string: symbol(library, path, "EAGGR_DeallocateString")?,
        convert_dggs_cells_to_points: symbol(library, path, "EAGGR_ConvertDggsCellsToPoints")?,
        convert_dggs_cells_to_shape_string: symbol(
            library,
            path,
            "EAGGR_ConvertDggsCellsToShapeString",
        )?,
        convert_dggs_cell_outline_to_shape_string: symbol(
            library,
            path,
            "EAGGR_ConvertDggsCellOutlineToShapeString",
        )?,
        get_dggs_cell_parents: symbol(library, path, "EAGGR_GetDggsCellParents")?,
        get_dggs_cell_children: symbol(library, path, "EAGGR_GetDggsCellChildren")?,
        get_dggs_cell_siblings: symbol(library, path, "EAGGR_GetDggsCellSiblings")?,
        get_bounding_dggs_cell: symbol(library, path, "EAGGR_GetBoundingDggsCell")?,
        create_dggs_kml_file: symbol(library, path, "EAGGR_CreateDggsKmlFile")?,
        compare_shapes: symbol(library, path, "EAGGR_CompareShapes")?,
    })
}
