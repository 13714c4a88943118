//!
//! JavaScript bindings exposing the per-thread default loader as
//! `loadScript()` / `resetScriptCache()`.
//!
//! Options are passed as a plain JavaScript object using the DOM property
//! names (`async`, `noModule`, `fetchPriority`, `crossOrigin`, ...). Any key
//! that is not a recognized option becomes a literal attribute:
//!
//! ```javascript
//! const script = await loadScript("https://example.com/widget.js", {
//!     fetchPriority: "low",
//!     "data-widget": "chart",
//!     onLoad: (event) => console.log("loaded", event),
//! });
//! ```
//!

use crate::error::Error;
use crate::options::*;
use crate::result::Result;
use crate::web::{load_script, reset_script_cache};
use js_sys::{Function, Object, Promise, Reflect};
use std::rc::Rc;
use std::str::FromStr;
use wasm_bindgen::prelude::*;
use web_sys::Element;
use workflow_log::*;

fn is_nullish(value: &JsValue) -> bool {
    value.is_undefined() || value.is_null()
}

fn string(name: &str, value: &JsValue) -> Result<Option<String>> {
    if is_nullish(value) {
        return Ok(None);
    }
    value
        .as_string()
        .map(Some)
        .ok_or_else(|| Error::InvalidOption(format!("`{name}` must be a string")))
}

fn boolean(name: &str, value: &JsValue) -> Result<Option<bool>> {
    if is_nullish(value) {
        return Ok(None);
    }
    value
        .as_bool()
        .map(Some)
        .ok_or_else(|| Error::InvalidOption(format!("`{name}` must be a boolean")))
}

fn parsed<T>(name: &str, value: &JsValue) -> Result<Option<T>>
where
    T: FromStr<Err = Error>,
{
    string(name, value)?.map(|v| v.parse()).transpose()
}

fn callback(name: &str, value: JsValue) -> Result<Option<EventCallback<JsValue>>> {
    if is_nullish(&value) {
        return Ok(None);
    }
    let function = value
        .dyn_into::<Function>()
        .map_err(|_| Error::InvalidOption(format!("`{name}` must be a function")))?;
    let name = name.to_string();
    let callback: EventCallback<JsValue> = Rc::new(move |event: &JsValue| {
        if let Err(err) = function.call1(&JsValue::UNDEFINED, event) {
            log_error!("{name} callback failed: {err:?}");
        }
    });
    Ok(Some(callback))
}

/// String coercion equivalent to JavaScript `String(value)`
fn attribute_value(value: &JsValue) -> AttributeValue {
    if let Some(b) = value.as_bool() {
        AttributeValue::Bool(b)
    } else if let Some(s) = value.as_string() {
        AttributeValue::String(s)
    } else if value.is_null() {
        AttributeValue::String("null".to_string())
    } else {
        AttributeValue::String(value.unchecked_ref::<Object>().to_string().into())
    }
}

impl TryFrom<JsValue> for ScriptOptions {
    type Error = Error;

    fn try_from(value: JsValue) -> Result<Self> {
        let mut options = ScriptOptions::new();
        if is_nullish(&value) {
            return Ok(options);
        }

        let object = value
            .dyn_into::<Object>()
            .map_err(|_| Error::InvalidOption("options must be an object".to_string()))?;

        for key in Object::keys(&object).iter() {
            let Some(key) = key.as_string() else {
                continue;
            };
            let value = Reflect::get(&object, &JsValue::from_str(&key))?;
            let name = key.as_str();

            match name {
                "id" => options.id = string(name, &value)?,
                "async" => {
                    if let Some(is_async) = boolean(name, &value)? {
                        options.is_async = is_async;
                    }
                }
                "defer" => {
                    if let Some(defer) = boolean(name, &value)? {
                        options.defer = defer;
                    }
                }
                "noModule" => {
                    if let Some(no_module) = boolean(name, &value)? {
                        options.no_module = no_module;
                    }
                }
                "integrity" => options.integrity = string(name, &value)?,
                "nonce" => options.nonce = string(name, &value)?,
                "blocking" => options.blocking = parsed(name, &value)?,
                "type" => {
                    if let Some(script_type) = parsed(name, &value)? {
                        options.script_type = script_type;
                    }
                }
                "referrerPolicy" => options.referrer_policy = parsed(name, &value)?,
                "fetchPriority" => {
                    if let Some(priority) = parsed(name, &value)? {
                        options.fetch_priority = priority;
                    }
                }
                "crossOrigin" => options.cross_origin = parsed(name, &value)?,
                "innerHTML" => options.inner_html = string(name, &value)?,
                "textContent" => options.text_content = string(name, &value)?,
                "onLoad" => options.on_load = callback(name, value)?,
                "onError" => options.on_error = callback(name, value)?,
                _ => {
                    if !value.is_undefined() {
                        options
                            .attributes
                            .push((key.clone(), attribute_value(&value)));
                    }
                }
            }
        }

        Ok(options)
    }
}

/// `loadScript(src, options?, target?) -> Promise<HTMLScriptElement>`
///
/// The element is injected before the promise is returned. A failed load
/// rejects with the native error event.
#[wasm_bindgen(js_name = loadScript)]
pub fn js_load_script(src: Option<String>, options: JsValue, target: Option<Element>) -> Promise {
    let options = match ScriptOptions::try_from(options) {
        Ok(options) => options,
        Err(err) => return Promise::reject(&JsValue::from(err)),
    };

    let future = load_script(&src.unwrap_or_default(), options, target.as_ref());
    wasm_bindgen_futures::future_to_promise(async move {
        future.await.map(JsValue::from).map_err(JsValue::from)
    })
}

/// `resetScriptCache()` drops every cached script future
#[wasm_bindgen(js_name = resetScriptCache)]
pub fn js_reset_script_cache() {
    reset_script_cache();
}
