//!
//! [<img alt="github" src="https://img.shields.io/badge/github-workflow--rs-8da0cb?style=for-the-badge&labelColor=555555&color=8da0cb&logo=github" height="20">](https://github.com/workflow-rs/workflow-rs)
//! [<img alt="crates.io" src="https://img.shields.io/crates/v/workflow-script-loader.svg?maxAge=2592000&style=for-the-badge&color=fc8d62&logo=rust" height="20">](https://crates.io/crates/workflow-script-loader)
//! [<img alt="docs.rs" src="https://img.shields.io/badge/docs.rs-workflow--script--loader-56c2a5?maxAge=2592000&style=for-the-badge&logo=rust" height="20">](https://docs.rs/workflow-script-loader)
//! <img alt="license" src="https://img.shields.io/crates/l/workflow-script-loader.svg?maxAge=2592000&color=6ac&style=for-the-badge&logo=opensourceinitiative&logoColor=fff" height="20">
//! <img src="https://img.shields.io/badge/platform- wasm32/browser -informational?style=for-the-badge&color=50a0f0" height="20">
//!
//! Cache-aware `<script>` injection.
//!
//! Appends `<script>` elements to the DOM and resolves once the browser
//! fires the element's `load` event (or rejects on `error`). Requests for
//! the same `src` are deduplicated: concurrent and repeated callers share a
//! single element and a single future for as long as that element remains
//! attached to the document. Scripts already present in the document are
//! adopted instead of injected again.
//!
//! Example:
//!
//! ```rust ignore
//! use workflow_script_loader::prelude::*;
//!
//! let options = ScriptOptions::new().fetch_priority(FetchPriority::Low);
//! let script = load_script("https://example.com/library.js", options, None).await?;
//! ```

pub mod bindings;
pub mod cache;
pub mod error;
pub mod host;
pub mod loader;
pub mod options;
pub mod prelude;
pub mod result;
pub mod utils;
pub mod web;

cfg_if::cfg_if! {
    if #[cfg(any(test, feature = "test"))] {
        pub mod memory;
    }
}
