//! Common imports for the `workflow_script_loader` crate.
pub use crate::cache::{ScriptCache, ScriptFuture};
pub use crate::error::Error;
pub use crate::host::{ScriptHost, Settlement};
pub use crate::loader::ScriptLoader;
pub use crate::options::{
    AttributeValue, Blocking, CrossOrigin, FetchPriority, ReferrerPolicy, ScriptOptions,
    ScriptType,
};
pub use crate::result::Result;
pub use crate::web::{load_script, reset_script_cache, WebHost};
