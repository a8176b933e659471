// In: src/native/buffers.rs

//! Guards for buffers the engine allocates and the caller must hand back.
//!
//! A guard is created as soon as a native call returns, before its status is
//! checked: a failing call may still have filled an output pointer. The happy
//! path calls `release()`, which runs the paired deallocation entry point and
//! reports its status. Any early return drops the guard instead, and `Drop`
//! performs the same deallocation, logging (but not raising) a failure. Either
//! way the engine buffer is freed exactly once.

use std::ffi::CStr;
use std::os::raw::{c_char, c_ushort};
use std::ptr;
use std::slice;

use log::{debug, warn};

use super::abi::{DggsHandle, NativeApi, WireDggsShape};
use crate::error::EaggrError;
use crate::types::ReturnCode;

//==================================================================================
// I. Native Strings
//==================================================================================

/// A NUL-terminated string allocated by the engine.
pub struct NativeString<'a> {
    api: &'a NativeApi,
    handle: DggsHandle,
    ptr: *mut c_char,
}

impl<'a> NativeString<'a> {
    /// Takes ownership of `ptr`, which may be null.
    ///
    /// # Safety
    /// `ptr` must be null or a string returned by the engine bound to
    /// `handle`, not yet deallocated and not owned by any other guard.
    pub unsafe fn from_raw(api: &'a NativeApi, handle: DggsHandle, ptr: *mut c_char) -> Self {
        Self { api, handle, ptr }
    }

    /// Copies the string into host memory. A null string reads as `None`.
    pub fn to_host_string(&self) -> Result<Option<String>, EaggrError> {
        if self.ptr.is_null() {
            return Ok(None);
        }
        // SAFETY: non-null and NUL-terminated per the `from_raw` contract.
        let text = unsafe { CStr::from_ptr(self.ptr) };
        text.to_str().map(|s| Some(s.to_owned())).map_err(|e| {
            EaggrError::InvalidState(format!("Engine returned a string that is not UTF-8: {}", e))
        })
    }

    /// Frees the string now and reports the engine's status.
    pub fn release(mut self) -> ReturnCode {
        self.deallocate()
    }

    fn deallocate(&mut self) -> ReturnCode {
        if self.ptr.is_null() {
            return ReturnCode::Success;
        }
        let mut ptr = self.ptr;
        self.ptr = ptr::null_mut();
        // SAFETY: `ptr` is owned by this guard and is freed at most once
        // because the field was cleared above.
        let status = unsafe { (self.api.deallocate_string)(self.handle, &mut ptr) };
        ReturnCode::from_raw(status)
    }
}

impl Drop for NativeString<'_> {
    fn drop(&mut self) {
        if self.ptr.is_null() {
            return;
        }
        let code = self.deallocate();
        if !code.is_success() {
            warn!("Failed to deallocate engine string during cleanup: {}", code);
        }
    }
}

//==================================================================================
// II. Native Shape Arrays
//==================================================================================

/// An array of DGGS shapes allocated by the engine, with its element count.
pub struct NativeShapes<'a> {
    api: &'a NativeApi,
    handle: DggsHandle,
    ptr: *mut WireDggsShape,
    count: c_ushort,
}

impl<'a> NativeShapes<'a> {
    /// Takes ownership of the array at `ptr` holding `count` shapes.
    ///
    /// # Safety
    /// `ptr` must be null or an array of `count` shapes returned by the engine
    /// bound to `handle`, not yet deallocated and not owned by another guard.
    pub unsafe fn from_raw(
        api: &'a NativeApi,
        handle: DggsHandle,
        ptr: *mut WireDggsShape,
        count: c_ushort,
    ) -> Self {
        Self {
            api,
            handle,
            ptr,
            count,
        }
    }

    /// Borrows the shapes. A null array is only acceptable when it is empty.
    pub fn as_slice(&self) -> Result<&[WireDggsShape], EaggrError> {
        if self.count == 0 {
            return Ok(&[]);
        }
        if self.ptr.is_null() {
            return Err(EaggrError::InvalidState(format!(
                "Engine reported {} shapes but returned a null array",
                self.count
            )));
        }
        // SAFETY: non-null array of `count` shapes per the `from_raw` contract.
        Ok(unsafe { slice::from_raw_parts(self.ptr, self.count as usize) })
    }

    /// Frees the array (and every ring inside it) now.
    pub fn release(mut self) -> ReturnCode {
        self.deallocate()
    }

    fn deallocate(&mut self) -> ReturnCode {
        if self.ptr.is_null() {
            return ReturnCode::Success;
        }
        let mut ptr = self.ptr;
        self.ptr = ptr::null_mut();
        debug!("Releasing {} engine-allocated DGGS shapes", self.count);
        // SAFETY: as for `NativeString::deallocate`.
        let status = unsafe { (self.api.deallocate_dggs_shapes)(self.handle, &mut ptr, self.count) };
        ReturnCode::from_raw(status)
    }
}

impl Drop for NativeShapes<'_> {
    fn drop(&mut self) {
        if self.ptr.is_null() {
            return;
        }
        let code = self.deallocate();
        if !code.is_success() {
            warn!("Failed to deallocate engine shapes during cleanup: {}", code);
        }
    }
}
