// In: src/bridge/mod.rs

// ====================================================================================
// ARCHITECTURAL OVERVIEW: The Bridge Layer
// ====================================================================================
//
// The `bridge` is the public face of the bindings. A caller opens an `Eaggr`
// session for one grid `Model` and issues every conversion through it. Each
// operation follows the same shape:
//
//   1. [Codec (encode)]        -> host values become wire structures owned by a
//                                 host-side buffer (`codec::*Buffer`, `Vec<Wire*>`)
//         |
//   2. [Native call]           -> the entry point from the loaded `NativeApi`,
//                                 bound to this session's handle
//         |
//   3. [Output guard]          -> engine-allocated results are wrapped in a
//                                 `NativeShapes` / `NativeString` guard, even
//                                 when the call failed part-way
//         |
//         `-> status != SUCCESS -> [Error Translator (errors.rs)]
//                                   fetches + frees the engine's message and
//                                   returns `EaggrError::Engine { code, message }`;
//                                   dropping the guard frees any partial output
//         |
//   4. [Codec (decode)]        -> results are copied into host values
//         |
//   5. [Release]               -> the guard hands the buffer back to the engine
//                                 before the call returns (or in `Drop` if
//                                 the call or decoding failed)
//
// Session lifecycle (session.rs):
//
//   Eaggr::new / with_config -> native::load (once per process) -> OpenDggsHandle
//   ...operations...
//   Eaggr::close / Drop      -> CloseDggsHandle, exactly once, failures logged
//
// An `Eaggr` is `Send` but not `Sync`: a session can move between threads but
// is never used from two threads at once. Use one session per thread.
//
// ====================================================================================
mod conversion;
pub(crate) mod errors;
mod session;

pub use errors::{MESSAGE_UNAVAILABLE, NO_MESSAGE_RECORDED};
pub use session::Eaggr;
