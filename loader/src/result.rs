//! Result types used by the [`workflow_script_loader`](super) crate
use wasm_bindgen::JsValue;

pub type JsResult<T> = std::result::Result<T, JsValue>;
/// Result carrying an [`Error`](crate::error::Error) over the host event type `E`
pub type Result<T, E = JsValue> = std::result::Result<T, crate::error::Error<E>>;
