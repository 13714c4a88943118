//!
//! Browser [`ScriptHost`] backed by [`web_sys`] and the per-thread default
//! loader used by [`load_script`].
//!

use crate::cache::ScriptFuture;
use crate::host::{ScriptHost, SettleHandler, Settlement};
use crate::loader::ScriptLoader;
use crate::options::{non_empty, ScriptOptions};
use crate::result::Result;
use crate::utils::*;
use js_sys::{Function, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Element, HtmlScriptElement, Node};
use workflow_wasm::callback::{Callback, CallbackClosureWithoutResult};

pub type EventCallback = Callback<CallbackClosureWithoutResult<JsValue>>;

/// [`ScriptHost`] operating on the global `window.document`
#[derive(Debug, Clone, Copy, Default)]
pub struct WebHost;

/// `load`/`error` listeners registered on a script element.
/// Dropping the listener removes both handlers from the element.
pub struct WebListener {
    script: HtmlScriptElement,
    load: EventCallback,
    error: EventCallback,
}

impl Drop for WebListener {
    fn drop(&mut self) {
        let load: &Function = self.load.as_ref();
        let error: &Function = self.error.as_ref();
        self.script
            .remove_event_listener_with_callback("load", load)
            .ok();
        self.script
            .remove_event_listener_with_callback("error", error)
            .ok();
    }
}

fn set_property(script: &HtmlScriptElement, name: &str, value: &str) -> Result<()> {
    Reflect::set(script, &JsValue::from_str(name), &JsValue::from_str(value))?;
    Ok(())
}

impl ScriptHost for WebHost {
    type Element = HtmlScriptElement;
    type Container = Element;
    type Event = JsValue;
    type Listener = WebListener;

    fn is_available(&self) -> bool {
        document().is_ok()
    }

    fn find_script(&self, src: &str) -> Result<Option<HtmlScriptElement>> {
        let scripts = document()?.get_elements_by_tag_name("script");
        for index in 0..scripts.length() {
            let Some(script) = scripts.item(index) else {
                continue;
            };
            if script.get_attribute("src").as_deref() == Some(src) {
                if let Ok(script) = script.dyn_into::<HtmlScriptElement>() {
                    return Ok(Some(script));
                }
            }
        }
        Ok(None)
    }

    fn is_attached(&self, element: &HtmlScriptElement) -> bool {
        let node: &Node = element.as_ref();
        document()
            .map(|document| document.contains(Some(node)))
            .unwrap_or(false)
    }

    fn default_target(&self) -> Result<Element> {
        root(&document()?)
    }

    fn create_script(&self) -> Result<HtmlScriptElement> {
        document()?
            .create_element("script")?
            .dyn_into::<HtmlScriptElement>()
            .map_err(|_| "Unable to create script element".into())
    }

    fn append(&self, target: &Element, element: &HtmlScriptElement) -> Result<()> {
        target.append_child(element)?;
        Ok(())
    }

    fn apply(&self, script: &HtmlScriptElement, src: &str, options: &ScriptOptions) -> Result<()> {
        script.set_src(src);
        script.set_type(options.script_type.as_str());
        // not exposed by web-sys
        set_property(script, "fetchPriority", options.fetch_priority.as_str())?;
        script.set_async(options.is_async);
        script.set_defer(options.defer);
        script.set_no_module(options.no_module);
        script.set_text_content(options.text_content.as_deref());

        if let Some(id) = non_empty(&options.id) {
            script.set_id(id);
        }
        if let Some(html) = non_empty(&options.inner_html) {
            script.set_inner_html(html);
        }
        if let Some(cross_origin) = options.cross_origin {
            script.set_cross_origin(Some(cross_origin.as_str()));
        }
        if let Some(policy) = options.referrer_policy {
            set_property(script, "referrerPolicy", policy.as_str())?;
        }
        if let Some(integrity) = non_empty(&options.integrity) {
            script.set_integrity(integrity);
        }
        if let Some(nonce) = non_empty(&options.nonce) {
            set_property(script, "nonce", nonce)?;
        }
        Ok(())
    }

    fn set_attribute(&self, script: &HtmlScriptElement, name: &str, value: &str) -> Result<()> {
        script.set_attribute(name, value)?;
        Ok(())
    }

    fn listen(
        &self,
        script: &HtmlScriptElement,
        handler: SettleHandler<JsValue>,
    ) -> Result<WebListener> {
        let load: EventCallback = {
            let handler = handler.clone();
            Callback::new(move |event: JsValue| handler(Settlement::Load(event)))
        };
        let error: EventCallback =
            Callback::new(move |event: JsValue| handler(Settlement::Error(event)));

        let load_fn: &Function = load.as_ref();
        let error_fn: &Function = error.as_ref();
        script.add_event_listener_with_callback("load", load_fn)?;
        script.add_event_listener_with_callback("error", error_fn)?;

        Ok(WebListener {
            script: script.clone(),
            load,
            error,
        })
    }
}

thread_local! {
    static LOADER: ScriptLoader<WebHost> = ScriptLoader::new(WebHost);
}

/// Load the script at `src` using the per-thread default [`ScriptLoader`].
///
/// The element is appended to `target` (or the document head) before this
/// function returns. Repeated requests for the same `src` without inline
/// content share one element and one future.
///
/// ```rust ignore
/// let script = load_script("https://example.com/library.js", ScriptOptions::new(), None).await?;
/// ```
pub fn load_script(
    src: &str,
    options: ScriptOptions,
    target: Option<&Element>,
) -> ScriptFuture<HtmlScriptElement, JsValue> {
    LOADER.with(|loader| loader.load(src, options, target))
}

/// Clear the cache of the per-thread default loader
pub fn reset_script_cache() {
    LOADER.with(|loader| loader.reset());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[tokio::test]
    async fn rejects_outside_of_a_browser_environment() {
        assert!(!WebHost.is_available());

        let result = load_script("https://cdn.example.com/test.js", ScriptOptions::new(), None).await;
        assert!(matches!(result, Err(Error::Environment)));
        assert_eq!(
            result.unwrap_err().to_string(),
            "load_script can only be used in the browser (window.document is not available)"
        );
    }
}
