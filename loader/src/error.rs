//!
//! Errors returned by the [`workflow_script_loader`](super) crate
//!
use thiserror::Error;
use wasm_bindgen::JsValue;
use workflow_core::channel::RecvError;

/// Errors returned by the [`workflow_script_loader`](super) crate.
///
/// The error is generic over the host event type `E` so that a failed
/// load can hand the original native event back to the caller untouched.
/// In the browser `E` is [`JsValue`].
#[derive(Error, Debug, Clone)]
pub enum Error<E = JsValue> {
    /// No `window`/`document` pair is available in the current environment
    #[error("load_script can only be used in the browser (window.document is not available)")]
    Environment,
    /// The script `src` is empty
    #[error("No \"src\" provided to load_script")]
    MissingSource,
    /// An option value supplied from JavaScript could not be interpreted
    #[error("invalid script option: {0}")]
    InvalidOption(String),
    /// Neither `<head>` nor `<body>` exist in the document
    #[error("Unable to locate head or body element")]
    MissingTarget,
    /// The native `error` event fired on the injected element
    #[error("script load failed: {0:?}")]
    Load(E),
    /// Custom string error
    #[error("{0}")]
    String(String),
    /// Error containing [`wasm_bindgen::JsValue`] value
    #[error("{0:?}")]
    JsValue(JsValue),
    /// The settlement channel closed before the element settled
    #[error("{0}")]
    RecvError(RecvError),
}

impl<E> Error<E> {
    /// Returns the native event carried by [`Error::Load`]
    pub fn load_event(&self) -> Option<&E> {
        match self {
            Error::Load(event) => Some(event),
            _ => None,
        }
    }

    /// Returns `true` for errors caused by the request itself
    /// (missing `src` or an unrecognized option value)
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::MissingSource | Error::InvalidOption(_))
    }
}

impl<E> From<String> for Error<E> {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl<E> From<&str> for Error<E> {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl<E> From<JsValue> for Error<E> {
    fn from(v: JsValue) -> Self {
        Self::JsValue(v)
    }
}

impl<E> From<RecvError> for Error<E> {
    fn from(err: RecvError) -> Self {
        Self::RecvError(err)
    }
}

impl From<Error> for JsValue {
    fn from(err: Error) -> Self {
        match err {
            Error::Load(event) => event,
            Error::JsValue(value) => value,
            err => js_sys::Error::new(&err.to_string()).into(),
        }
    }
}
