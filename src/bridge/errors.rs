// In: src/bridge/errors.rs

//! Translation of native status codes into `EaggrError::Engine`.

use std::os::raw::{c_char, c_int, c_ushort};
use std::ptr;

use log::warn;

use super::session::Eaggr;
use crate::error::EaggrError;
use crate::native::buffers::NativeString;
use crate::types::ReturnCode;

/// Message used when the engine's explanation of a failure cannot be fetched.
pub const MESSAGE_UNAVAILABLE: &str = "Error occurred, but failed to get error message";
/// Message used when the engine reports a failure without recording why.
pub const NO_MESSAGE_RECORDED: &str = "Error occurred, but no error message was recorded";

impl Eaggr {
    /// Maps a raw status from an entry point bound to this session.
    pub(crate) fn check(&self, status: c_int) -> Result<(), EaggrError> {
        let code = ReturnCode::from_raw(status);
        if code.is_success() {
            Ok(())
        } else {
            Err(self.engine_error(code))
        }
    }

    /// Builds the error for a failed call, fetching the engine's last message.
    ///
    /// A failure while fetching the message never replaces `code`; it only
    /// degrades the message to [`MESSAGE_UNAVAILABLE`].
    pub(crate) fn engine_error(&self, code: ReturnCode) -> EaggrError {
        EaggrError::engine(code, self.last_error_message())
    }

    fn last_error_message(&self) -> String {
        let api = self.api();
        let handle = self.raw_handle();
        let mut message: *mut c_char = ptr::null_mut();
        let mut length: c_ushort = 0;

        // SAFETY: both out-pointers are valid for the duration of the call.
        let status = ReturnCode::from_raw(unsafe {
            (api.get_last_error_message)(handle, &mut message, &mut length)
        });
        if !status.is_success() {
            warn!("Could not retrieve the engine's error message: {}", status);
            return MESSAGE_UNAVAILABLE.to_string();
        }

        // SAFETY: on success the engine hands us ownership of `message`.
        let owned = unsafe { NativeString::from_raw(api, handle, message) };
        let text = match owned.to_host_string() {
            Ok(Some(text)) => text,
            Ok(None) => NO_MESSAGE_RECORDED.to_string(),
            Err(e) => {
                warn!("Could not read the engine's error message: {}", e);
                MESSAGE_UNAVAILABLE.to_string()
            }
        };
        let released = owned.release();
        if !released.is_success() {
            warn!("Failed to deallocate the engine's error message: {}", released);
        }
        text
    }
}
