//!
//! Configuration of a single script load request.
//!
//! [`ScriptOptions`] carries the recognized `<script>` properties, any
//! additional literal attributes (typically `data-*`) and the optional
//! `load`/`error` callbacks. Options are constructed using the chained
//! builder functions:
//!
//! ```rust ignore
//! let options = ScriptOptions::new()
//!     .type_(ScriptType::Module)
//!     .fetch_priority(FetchPriority::Low)
//!     .attribute("data-widget", "chart");
//! ```
//!

use crate::error::Error;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use wasm_bindgen::JsValue;

/// Callback receiving the native event that settled the script element
pub type EventCallback<E> = Rc<dyn Fn(&E)>;

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $value:literal ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )*
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $value, )*
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $value => Ok($name::$variant), )*
                    _ => Err(Error::InvalidOption(format!("unsupported {} `{}`", $label, s))),
                }
            }
        }
    };
}

string_enum! {
    /// Relative priority hint used by the browser when fetching the script
    #[derive(Default)]
    FetchPriority, "fetchPriority" {
        High => "high",
        Low => "low",
        #[default]
        Auto => "auto",
    }
}

string_enum! {
    /// CORS mode of the script request
    CrossOrigin, "crossOrigin" {
        Anonymous => "anonymous",
        UseCredentials => "use-credentials",
    }
}

string_enum! {
    /// Referrer policy applied when fetching the script
    ReferrerPolicy, "referrerPolicy" {
        Empty => "",
        NoReferrer => "no-referrer",
        NoReferrerWhenDowngrade => "no-referrer-when-downgrade",
        Origin => "origin",
        OriginWhenCrossOrigin => "origin-when-cross-origin",
        SameOrigin => "same-origin",
        StrictOrigin => "strict-origin",
        StrictOriginWhenCrossOrigin => "strict-origin-when-cross-origin",
        UnsafeUrl => "unsafe-url",
    }
}

string_enum! {
    /// Operations that should be blocked while the script is fetched
    Blocking, "blocking" {
        Render => "render",
    }
}

/// Value of the `type` property of the script element
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ScriptType {
    #[default]
    JavaScript,
    Module,
    ImportMap,
    SpeculationRules,
    /// Any other MIME type (e.g. `application/json` data blocks)
    Custom(String),
}

impl ScriptType {
    pub fn as_str(&self) -> &str {
        match self {
            ScriptType::JavaScript => "text/javascript",
            ScriptType::Module => "module",
            ScriptType::ImportMap => "importmap",
            ScriptType::SpeculationRules => "speculationrules",
            ScriptType::Custom(mime) => mime.as_str(),
        }
    }
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScriptType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let script_type = match s {
            "text/javascript" => ScriptType::JavaScript,
            "module" => ScriptType::Module,
            "importmap" => ScriptType::ImportMap,
            "speculationrules" => ScriptType::SpeculationRules,
            "" => return Err(Error::InvalidOption("empty script type".to_string())),
            mime => ScriptType::Custom(mime.to_string()),
        };
        Ok(script_type)
    }
}

impl From<&str> for ScriptType {
    fn from(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

/// Value of an additional attribute. Rendered to its string form
/// when assigned to the element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    String(String),
    Bool(bool),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::String(s) => f.write_str(s),
            AttributeValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::String(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::String(v)
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

/// Options applied to a script element created by the loader.
///
/// `E` is the host event type handed to [`ScriptOptions::on_load`]
/// and [`ScriptOptions::on_error`] callbacks ([`JsValue`] in the browser).
pub struct ScriptOptions<E = JsValue> {
    pub id: Option<String>,
    /// `async` property (default `true`)
    pub is_async: bool,
    pub defer: bool,
    pub no_module: bool,
    /// Subresource integrity hash
    pub integrity: Option<String>,
    /// Content-Security-Policy nonce
    pub nonce: Option<String>,
    /// Emitted as a literal `blocking` attribute
    pub blocking: Option<Blocking>,
    pub script_type: ScriptType,
    pub referrer_policy: Option<ReferrerPolicy>,
    pub fetch_priority: FetchPriority,
    pub cross_origin: Option<CrossOrigin>,
    /// Raw HTML body. Disables caching.
    pub inner_html: Option<String>,
    /// Plain text body. Disables caching.
    pub text_content: Option<String>,
    /// Literal attributes assigned via `setAttribute()`, in insertion order
    pub attributes: Vec<(String, AttributeValue)>,
    pub on_load: Option<EventCallback<E>>,
    pub on_error: Option<EventCallback<E>>,
}

impl<E> Default for ScriptOptions<E> {
    fn default() -> Self {
        ScriptOptions {
            id: None,
            is_async: true,
            defer: false,
            no_module: false,
            integrity: None,
            nonce: None,
            blocking: None,
            script_type: ScriptType::default(),
            referrer_policy: None,
            fetch_priority: FetchPriority::default(),
            cross_origin: None,
            inner_html: None,
            text_content: None,
            attributes: Vec::new(),
            on_load: None,
            on_error: None,
        }
    }
}

impl<E> Clone for ScriptOptions<E> {
    fn clone(&self) -> Self {
        ScriptOptions {
            id: self.id.clone(),
            is_async: self.is_async,
            defer: self.defer,
            no_module: self.no_module,
            integrity: self.integrity.clone(),
            nonce: self.nonce.clone(),
            blocking: self.blocking,
            script_type: self.script_type.clone(),
            referrer_policy: self.referrer_policy,
            fetch_priority: self.fetch_priority,
            cross_origin: self.cross_origin,
            inner_html: self.inner_html.clone(),
            text_content: self.text_content.clone(),
            attributes: self.attributes.clone(),
            on_load: self.on_load.clone(),
            on_error: self.on_error.clone(),
        }
    }
}

impl<E> fmt::Debug for ScriptOptions<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptOptions")
            .field("id", &self.id)
            .field("is_async", &self.is_async)
            .field("defer", &self.defer)
            .field("no_module", &self.no_module)
            .field("integrity", &self.integrity)
            .field("nonce", &self.nonce)
            .field("blocking", &self.blocking)
            .field("script_type", &self.script_type)
            .field("referrer_policy", &self.referrer_policy)
            .field("fetch_priority", &self.fetch_priority)
            .field("cross_origin", &self.cross_origin)
            .field("inner_html", &self.inner_html)
            .field("text_content", &self.text_content)
            .field("attributes", &self.attributes)
            .field("on_load", &self.on_load.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Returns the value if it is present and not an empty string
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl<E> ScriptOptions<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests carrying inline content are not idempotent and
    /// always produce a new element.
    pub fn is_cacheable(&self) -> bool {
        non_empty(&self.inner_html).is_none() && non_empty(&self.text_content).is_none()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn async_(mut self, is_async: bool) -> Self {
        self.is_async = is_async;
        self
    }

    pub fn defer(mut self, defer: bool) -> Self {
        self.defer = defer;
        self
    }

    pub fn no_module(mut self, no_module: bool) -> Self {
        self.no_module = no_module;
        self
    }

    pub fn integrity(mut self, integrity: impl Into<String>) -> Self {
        self.integrity = Some(integrity.into());
        self
    }

    pub fn nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    pub fn blocking(mut self, blocking: Blocking) -> Self {
        self.blocking = Some(blocking);
        self
    }

    pub fn type_(mut self, script_type: impl Into<ScriptType>) -> Self {
        self.script_type = script_type.into();
        self
    }

    pub fn referrer_policy(mut self, policy: ReferrerPolicy) -> Self {
        self.referrer_policy = Some(policy);
        self
    }

    pub fn fetch_priority(mut self, priority: FetchPriority) -> Self {
        self.fetch_priority = priority;
        self
    }

    pub fn cross_origin(mut self, cross_origin: CrossOrigin) -> Self {
        self.cross_origin = Some(cross_origin);
        self
    }

    pub fn inner_html(mut self, html: impl Into<String>) -> Self {
        self.inner_html = Some(html.into());
        self
    }

    pub fn text_content(mut self, text: impl Into<String>) -> Self {
        self.text_content = Some(text.into());
        self
    }

    /// Append a literal attribute (e.g. `data-*`). The value is
    /// string-coerced when assigned.
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn on_load<F>(mut self, callback: F) -> Self
    where
        F: Fn(&E) + 'static,
    {
        let callback: EventCallback<E> = Rc::new(callback);
        self.on_load = Some(callback);
        self
    }

    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&E) + 'static,
    {
        let callback: EventCallback<E> = Rc::new(callback);
        self.on_error = Some(callback);
        self
    }

    /// Attributes assigned after the recognized properties, including
    /// the `blocking` hint which has no dedicated DOM property.
    pub fn literal_attributes(&self) -> Vec<(String, String)> {
        self.blocking
            .iter()
            .map(|blocking| ("blocking".to_string(), blocking.to_string()))
            .chain(
                self.attributes
                    .iter()
                    .map(|(name, value)| (name.clone(), value.to_string())),
            )
            .collect()
    }
}
