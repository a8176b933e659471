// In: src/bridge/session.rs

use std::os::raw::c_void;
use std::ptr::{self, NonNull};

use log::{debug, warn};

use crate::config::LibraryConfig;
use crate::error::EaggrError;
use crate::native::abi::DggsHandle;
use crate::native::{self, NativeApi};
use crate::types::{Model, ReturnCode};

/// A session with the EAGGR engine, bound to one grid model.
///
/// The native handle is opened by the constructor and closed exactly once,
/// by [`Eaggr::close`] or when the session is dropped. Closing is
/// best-effort: a failure is logged and otherwise ignored.
#[derive(Debug)]
pub struct Eaggr {
    api: &'static NativeApi,
    handle: NonNull<c_void>,
    model: Model,
}

// SAFETY: the handle is owned exclusively by this value and the engine does
// not tie handles to the opening thread. `Eaggr` is deliberately not `Sync`,
// so the handle is never used from two threads at the same time.
unsafe impl Send for Eaggr {}

impl Eaggr {
    /// Opens a session, loading the engine on first use from the location
    /// described by the environment (see [`LibraryConfig::from_env`]).
    pub fn new(model: Model) -> Result<Self, EaggrError> {
        Self::with_config(model, &LibraryConfig::from_env()?)
    }

    /// Opens a session, loading the engine from `config` if no session has
    /// loaded it yet. Once loaded, `config` has no effect.
    pub fn with_config(model: Model, config: &LibraryConfig) -> Result<Self, EaggrError> {
        if native::is_library_loaded() {
            debug!("EAGGR engine already loaded; library configuration ignored");
        }
        let api = native::load(config)?;
        Self::open(api, model)
    }

    pub(crate) fn open(api: &'static NativeApi, model: Model) -> Result<Self, EaggrError> {
        let mut handle: DggsHandle = ptr::null_mut();
        // SAFETY: `handle` is a valid out-pointer for the duration of the call.
        let status = ReturnCode::from_raw(unsafe { (api.open_dggs_handle)(model.to_raw(), &mut handle) });
        if !status.is_success() {
            // There is no valid handle to fetch a message with.
            return Err(EaggrError::engine(
                status,
                format!("Failed to open a handle to the {} DGGS model", model),
            ));
        }
        let handle = NonNull::new(handle).ok_or_else(|| {
            EaggrError::InvalidState("Engine reported success but returned a null handle".into())
        })?;
        debug!("Opened {} DGGS handle {:p}", model, handle);
        Ok(Self { api, handle, model })
    }

    /// The grid model this session was opened with.
    pub fn model(&self) -> Model {
        self.model
    }

    /// Closes the native handle now rather than at the end of scope.
    pub fn close(self) {
        drop(self)
    }

    pub(crate) fn api(&self) -> &'static NativeApi {
        self.api
    }

    pub(crate) fn raw_handle(&self) -> DggsHandle {
        self.handle.as_ptr()
    }
}

impl Drop for Eaggr {
    fn drop(&mut self) {
        let mut raw = self.handle.as_ptr();
        // SAFETY: the handle was opened by this session and, since `drop`
        // runs once, is closed at most once.
        let status = ReturnCode::from_raw(unsafe { (self.api.close_dggs_handle)(&mut raw) });
        if status.is_success() {
            debug!("Closed {} DGGS handle {:p}", self.model, self.handle);
        } else {
            warn!(
                "Failed to close {} DGGS handle {:p}: {}",
                self.model, self.handle, status
            );
        }
    }
}
