//!
//! [`ScriptLoader`] injects `<script>` elements and collapses repeated
//! requests for the same `src` onto a single shared future.
//!
//! Lookup order for cacheable requests (no inline content):
//!
//! 1. query the document for a script with a matching `src` attribute
//! 2. if the cache holds a future for `src` and its element is still
//!    attached, return that future; otherwise evict the stale entry
//! 3. adopt a script found in step 1 (resolved immediately, not cached)
//! 4. inject a new element and cache its future
//!
//! Requests carrying `inner_html` or `text_content` skip straight to step 4
//! and are never cached.
//!

use crate::cache::{settled, ScriptCache, ScriptFuture};
use crate::error::Error;
use crate::host::{ScriptHost, Settlement};
use crate::options::ScriptOptions;
use crate::result::Result;
use futures::future::FutureExt;
use std::cell::RefCell;
use std::rc::Rc;
use workflow_core::channel::oneshot;
use workflow_log::*;

type HostFuture<H> = ScriptFuture<<H as ScriptHost>::Element, <H as ScriptHost>::Event>;

pub struct ScriptLoader<H: ScriptHost> {
    host: H,
    cache: ScriptCache<H::Element, H::Event>,
}

impl<H> Default for ScriptLoader<H>
where
    H: ScriptHost + Default,
{
    fn default() -> Self {
        ScriptLoader::new(H::default())
    }
}

impl<H: ScriptHost> ScriptLoader<H> {
    pub fn new(host: H) -> Self {
        ScriptLoader {
            host,
            cache: ScriptCache::new(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn cache(&self) -> &ScriptCache<H::Element, H::Event> {
        &self.cache
    }

    /// Clear every cached future. Elements already in the document
    /// are left untouched and will be adopted by subsequent loads.
    pub fn reset(&self) {
        self.cache.clear();
    }

    /// Load the script at `src`, appending a new element to `target`
    /// (document head when `None`) unless a live one can be reused.
    ///
    /// All document mutation happens before this function returns; the
    /// returned future only waits for the native `load` or `error` event.
    /// Environment and validation failures are reported as an already
    /// rejected future.
    pub fn load(
        &self,
        src: &str,
        options: ScriptOptions<H::Event>,
        target: Option<&H::Container>,
    ) -> HostFuture<H> {
        match self.try_load(src, options, target) {
            Ok(future) => future,
            Err(err) => settled(Err(err)),
        }
    }

    fn try_load(
        &self,
        src: &str,
        options: ScriptOptions<H::Event>,
        target: Option<&H::Container>,
    ) -> Result<HostFuture<H>, H::Event> {
        if !self.host.is_available() {
            return Err(Error::Environment);
        }

        if src.is_empty() {
            return Err(Error::MissingSource);
        }

        let cacheable = options.is_cacheable();

        if cacheable {
            let existing = self.host.find_script(src)?;

            if let Some(entry) = self.cache.get(src) {
                if self.host.is_attached(&entry.element) {
                    log_trace!("script `{src}` served from cache");
                    return Ok(entry.future);
                }

                log_trace!("script `{src}` was removed from the document, evicting");
                self.cache.remove(src);
            }

            if let Some(element) = existing {
                log_trace!("script `{src}` already present in the document");
                return Ok(settled(Ok(element)));
            }
        }

        let (element, future) = self.inject(src, options, target)?;

        if cacheable {
            self.cache.insert(src, element, future.clone());
        }

        Ok(future)
    }

    fn inject(
        &self,
        src: &str,
        options: ScriptOptions<H::Event>,
        target: Option<&H::Container>,
    ) -> Result<(H::Element, HostFuture<H>), H::Event> {
        let target = match target {
            Some(target) => target.clone(),
            None => self.host.default_target()?,
        };

        log_trace!("injecting script `{src}`");

        let script = self.host.create_script()?;
        self.host.append(&target, &script)?;

        // once attached, the element is tracked even if wiring fails
        let future = match self.wire(&script, src, options) {
            Ok(future) => future,
            Err(err) => {
                log_error!("unable to configure script `{src}`: {err}");
                settled(Err(err))
            }
        };

        Ok((script, future))
    }

    fn wire(
        &self,
        script: &H::Element,
        src: &str,
        options: ScriptOptions<H::Event>,
    ) -> Result<HostFuture<H>, H::Event> {
        self.host.apply(script, src, &options)?;

        let (sender, receiver) = oneshot::<Result<H::Element, H::Event>>();
        let pending = RefCell::new(Some(sender));
        let element = script.clone();
        let on_load = options.on_load.clone();
        let on_error = options.on_error.clone();

        let handler = Rc::new(move |settlement: Settlement<H::Event>| {
            // only the first settlement counts
            let Some(sender) = pending.borrow_mut().take() else {
                return;
            };

            let result = match settlement {
                Settlement::Load(event) => {
                    if let Some(on_load) = &on_load {
                        on_load(&event);
                    }
                    Ok(element.clone())
                }
                Settlement::Error(event) => {
                    if let Some(on_error) = &on_error {
                        on_error(&event);
                    }
                    Err(Error::Load(event))
                }
            };

            // the receiver is gone if every holder dropped the future
            sender.try_send(result).ok();
        });

        let listener = self.host.listen(script, handler)?;

        for (name, value) in options.literal_attributes() {
            self.host.set_attribute(script, &name, &value)?;
        }

        let future = async move {
            let _listener = listener;
            receiver
                .recv()
                .await
                .unwrap_or_else(|err| Err(Error::from(err)))
        }
        .boxed_local()
        .shared();

        Ok(future)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SettleHandler;
    use crate::memory::{MemoryEvent, MemoryHost, MemoryListener, MemoryNode};
    use crate::options::{CrossOrigin, FetchPriority, ReferrerPolicy};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    const SCRIPT_SRC: &str = "https://example.com/script.js";

    type Loader = ScriptLoader<MemoryHost>;
    type Options = ScriptOptions<MemoryEvent>;

    fn loader() -> Loader {
        ScriptLoader::new(MemoryHost::new())
    }

    #[tokio::test]
    async fn rejects_outside_of_a_browser_environment() {
        let loader = ScriptLoader::new(MemoryHost::without_document());
        let result = loader.load(SCRIPT_SRC, Options::new(), None).await;
        assert!(matches!(result, Err(Error::Environment)));
    }

    #[tokio::test]
    async fn rejects_empty_src_before_touching_the_document() {
        let loader = loader();
        let result = loader.load("", Options::new(), None).await;
        assert!(matches!(result, Err(Error::MissingSource)));
        assert!(loader.host().scripts().is_empty());
        assert!(loader.cache().is_empty());
    }

    #[tokio::test]
    async fn assigns_all_direct_script_properties() {
        let loader = loader();
        let options = Options::new()
            .async_(false)
            .defer(true)
            .fetch_priority(FetchPriority::Low)
            .no_module(true)
            .id("test-script")
            .type_("text/javascript")
            .cross_origin(CrossOrigin::Anonymous)
            .referrer_policy(ReferrerPolicy::Origin)
            .integrity("sha384-abc123")
            .nonce("xyz123")
            .text_content("Hello, world!");

        let future = loader.load(SCRIPT_SRC, options, None);
        let script = loader.host().find(SCRIPT_SRC).unwrap();
        loader.host().dispatch_load(&script);
        let resolved = future.await.unwrap();

        assert_eq!(resolved, script);
        let props = resolved.properties();
        assert!(!props.is_async);
        assert!(props.defer);
        assert_eq!(props.fetch_priority, "low");
        assert!(props.no_module);
        assert_eq!(props.id, "test-script");
        assert_eq!(props.script_type, "text/javascript");
        assert_eq!(props.cross_origin.as_deref(), Some("anonymous"));
        assert_eq!(props.referrer_policy, "origin");
        assert_eq!(props.integrity, "sha384-abc123");
        assert_eq!(props.nonce, "xyz123");
        assert_eq!(props.text_content.as_deref(), Some("Hello, world!"));
    }

    #[tokio::test]
    async fn absent_options_leave_element_defaults() {
        let loader = loader();
        let future = loader.load(SCRIPT_SRC, Options::new(), None);
        let script = loader.host().find(SCRIPT_SRC).unwrap();
        loader.host().dispatch_load(&script);
        let props = future.await.unwrap().properties();

        assert!(props.is_async);
        assert!(!props.defer);
        assert_eq!(props.fetch_priority, "auto");
        assert_eq!(props.script_type, "text/javascript");
        assert_eq!(props.id, "");
        assert_eq!(props.cross_origin, None);
        assert_eq!(props.integrity, "");
        assert_eq!(props.inner_html, "");
    }

    #[tokio::test]
    async fn applies_additional_attributes_as_strings() {
        let loader = loader();
        let options = Options::new()
            .attribute("data-id", "custom-script-id")
            .attribute("data-flag", true);

        let future = loader.load(SCRIPT_SRC, options, None);
        let script = loader.host().find(SCRIPT_SRC).unwrap();
        loader.host().dispatch_load(&script);
        let resolved = future.await.unwrap();

        assert_eq!(
            resolved.attribute("data-id").as_deref(),
            Some("custom-script-id")
        );
        assert_eq!(resolved.attribute("data-flag").as_deref(), Some("true"));
    }

    #[tokio::test]
    async fn resolves_immediately_with_existing_element() {
        let loader = loader();
        let host = loader.host();
        let script = host.create_node("script");
        script.set_attribute("src", SCRIPT_SRC);
        host.head().append_child(&script);

        let resolved = loader.load(SCRIPT_SRC, Options::new(), None).await.unwrap();

        assert_eq!(resolved, script);
        assert_eq!(host.scripts().len(), 1);
        assert!(loader.cache().is_empty());
    }

    #[tokio::test]
    async fn injects_once_per_src_without_inline_content() {
        let loader = loader();
        let first = loader.load(SCRIPT_SRC, Options::new().async_(true), None);
        let second = loader.load(SCRIPT_SRC, Options::new().async_(true), None);

        let scripts = loader.host().scripts();
        assert_eq!(scripts.len(), 1);

        loader.host().dispatch_load(&scripts[0]);
        let (s1, s2) = futures::join!(first, second);
        assert_eq!(s1.unwrap(), s2.unwrap());
    }

    #[tokio::test]
    async fn injects_every_time_with_inline_content() {
        let loader = loader();
        let first = loader.load(
            SCRIPT_SRC,
            Options::new().inner_html(r#"{ "symbol": "AAPL" }"#),
            None,
        );
        let second = loader.load(
            SCRIPT_SRC,
            Options::new().inner_html(r#"{ "symbol": "TSLA" }"#),
            None,
        );

        let scripts = loader.host().scripts();
        assert_eq!(scripts.len(), 2);
        assert!(loader.cache().is_empty());

        loader.host().dispatch_load(&scripts[0]);
        loader.host().dispatch_load(&scripts[1]);

        let s1 = first.await.unwrap();
        let s2 = second.await.unwrap();
        assert_ne!(s1, s2);
        assert_eq!(s2.properties().inner_html, r#"{ "symbol": "TSLA" }"#);
    }

    #[tokio::test]
    async fn evicts_stale_cache_entry_when_script_was_removed() {
        let loader = loader();
        let first = loader.load(SCRIPT_SRC, Options::new(), None);
        let script1 = loader.host().find(SCRIPT_SRC).unwrap();
        loader.host().dispatch_load(&script1);
        let resolved1 = first.await.unwrap();
        assert_eq!(resolved1, script1);

        script1.remove();

        let second = loader.load(SCRIPT_SRC, Options::new(), None);
        let script2 = loader.host().find(SCRIPT_SRC).unwrap();
        assert_ne!(script1, script2);

        loader.host().dispatch_load(&script2);
        let resolved2 = second.await.unwrap();
        assert_ne!(resolved2, resolved1);
        assert_eq!(loader.cache().get(SCRIPT_SRC).unwrap().element, script2);
    }

    #[tokio::test]
    async fn adopts_live_element_over_stale_cache_entry() {
        let loader = loader();
        let host = loader.host();
        let first = loader.load(SCRIPT_SRC, Options::new(), None);
        let cached = host.find(SCRIPT_SRC).unwrap();
        host.dispatch_load(&cached);
        first.await.unwrap();

        cached.remove();
        let external = host.create_node("script");
        external.set_attribute("src", SCRIPT_SRC);
        host.body().append_child(&external);

        let resolved = loader.load(SCRIPT_SRC, Options::new(), None).await.unwrap();
        assert_eq!(resolved, external);
        assert!(!loader.cache().contains(SCRIPT_SRC));
        assert_eq!(host.scripts().len(), 1);
    }

    #[tokio::test]
    async fn falls_back_to_document_head() {
        let loader = loader();
        let future = loader.load(SCRIPT_SRC, Options::new(), None);
        let script = loader.host().find(SCRIPT_SRC).unwrap();
        loader.host().dispatch_load(&script);
        let resolved = future.await.unwrap();

        assert_eq!(resolved.parent(), Some(loader.host().head()));
    }

    #[tokio::test]
    async fn appends_to_explicit_target() {
        let loader = loader();
        let host = loader.host();
        let container = host.create_node("div");
        host.body().append_child(&container);

        let future = loader.load(SCRIPT_SRC, Options::new(), Some(&container));
        let script = host.find(SCRIPT_SRC).unwrap();
        assert_eq!(script.parent(), Some(container.clone()));

        host.dispatch_load(&script);
        future.await.unwrap();
    }

    #[tokio::test]
    async fn appends_before_assigning_properties() {
        let loader = loader();
        let _future = loader.load(SCRIPT_SRC, Options::new().id("ordered"), None);
        let script = loader.host().find(SCRIPT_SRC).unwrap();

        let journal = script.journal();
        assert_eq!(journal.first().map(String::as_str), Some("append"));
        assert_eq!(journal.get(1).map(String::as_str), Some("src"));
    }

    #[tokio::test]
    async fn rejects_with_the_native_error_event() {
        let loader = loader();
        let future = loader.load(SCRIPT_SRC, Options::new(), None);
        let script = loader.host().find(SCRIPT_SRC).unwrap();

        let event = MemoryEvent::error("network");
        loader.host().dispatch_error(&script, event.clone());

        match future.await {
            Err(Error::Load(received)) => assert_eq!(received, event),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn callbacks_fire_once_and_before_settlement() {
        let loader = loader();
        let pending: Rc<RefCell<Option<HostFuture<MemoryHost>>>> = Rc::new(RefCell::new(None));
        let observed: Rc<RefCell<Vec<(String, bool)>>> = Rc::new(RefCell::new(Vec::new()));

        let on_load = {
            let pending = pending.clone();
            let observed = observed.clone();
            move |event: &MemoryEvent| {
                let unsettled = pending
                    .borrow()
                    .as_ref()
                    .map(|future| future.peek().is_none())
                    .unwrap_or(false);
                observed.borrow_mut().push((event.kind.clone(), unsettled));
            }
        };
        let errors = Rc::new(Cell::new(0));
        let on_error = {
            let errors = errors.clone();
            move |_: &MemoryEvent| errors.set(errors.get() + 1)
        };

        let future = loader.load(
            SCRIPT_SRC,
            Options::new().on_load(on_load).on_error(on_error),
            None,
        );
        *pending.borrow_mut() = Some(future.clone());

        let script = loader.host().find(SCRIPT_SRC).unwrap();
        loader.host().dispatch_load(&script);
        loader.host().dispatch_load(&script);
        loader
            .host()
            .dispatch_error(&script, MemoryEvent::error("late"));

        let resolved = future.await.unwrap();
        assert_eq!(resolved, script);
        assert_eq!(*observed.borrow(), vec![("load".to_string(), true)]);
        assert_eq!(errors.get(), 0);
    }

    #[tokio::test]
    async fn on_error_fires_before_rejection() {
        let loader = loader();
        let calls = Rc::new(Cell::new(0));
        let options = Options::new().on_error({
            let calls = calls.clone();
            move |event: &MemoryEvent| {
                assert_eq!(event.kind, "error");
                calls.set(calls.get() + 1);
            }
        });

        let future = loader.load(SCRIPT_SRC, options, None);
        let script = loader.host().find(SCRIPT_SRC).unwrap();
        loader
            .host()
            .dispatch_error(&script, MemoryEvent::error("404"));

        assert_eq!(calls.get(), 1);
        assert!(future.await.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn failed_load_is_retried_once_the_element_is_gone() {
        let loader = loader();
        let first = loader.load(SCRIPT_SRC, Options::new(), None);
        let failed = loader.host().find(SCRIPT_SRC).unwrap();
        loader
            .host()
            .dispatch_error(&failed, MemoryEvent::error("503"));
        assert!(first.await.is_err());

        // still attached: the rejected future stays authoritative
        assert!(loader.load(SCRIPT_SRC, Options::new(), None).await.is_err());
        assert_eq!(loader.host().scripts().len(), 1);

        failed.remove();

        let retry = loader.load(SCRIPT_SRC, Options::new(), None);
        let script = loader.host().find(SCRIPT_SRC).unwrap();
        assert_ne!(script, failed);
        loader.host().dispatch_load(&script);
        assert_eq!(retry.await.unwrap(), script);
    }

    #[tokio::test]
    async fn reset_clears_cache_and_adopts_live_elements() {
        let loader = loader();
        let future = loader.load(SCRIPT_SRC, Options::new(), None);
        let script = loader.host().find(SCRIPT_SRC).unwrap();
        assert_eq!(loader.cache().len(), 1);

        loader.reset();
        assert!(loader.cache().is_empty());

        loader.host().dispatch_load(&script);
        future.await.unwrap();

        let adopted = loader.load(SCRIPT_SRC, Options::new(), None).await.unwrap();
        assert_eq!(adopted, script);
        assert_eq!(loader.host().scripts().len(), 1);
    }

    #[tokio::test]
    async fn independent_loaders_do_not_share_cache() {
        let host = MemoryHost::new();
        let first = ScriptLoader::new(host.clone());
        let second = ScriptLoader::new(MemoryHost::new());

        let _a = first.load(SCRIPT_SRC, Options::new(), None);
        let _b = second.load(SCRIPT_SRC, Options::new(), None);

        assert_eq!(host.scripts().len(), 1);
        assert_eq!(second.host().scripts().len(), 1);
        assert_eq!(first.cache().len(), 1);
        assert_eq!(second.cache().len(), 1);
    }

    /// Host rejecting attribute names that contain whitespace,
    /// as `setAttribute` does in the browser
    #[derive(Default)]
    struct StrictHost(MemoryHost);

    impl ScriptHost for StrictHost {
        type Element = MemoryNode;
        type Container = MemoryNode;
        type Event = MemoryEvent;
        type Listener = MemoryListener;

        fn is_available(&self) -> bool {
            self.0.is_available()
        }

        fn find_script(&self, src: &str) -> Result<Option<MemoryNode>, MemoryEvent> {
            self.0.find_script(src)
        }

        fn is_attached(&self, element: &MemoryNode) -> bool {
            self.0.is_attached(element)
        }

        fn default_target(&self) -> Result<MemoryNode, MemoryEvent> {
            self.0.default_target()
        }

        fn create_script(&self) -> Result<MemoryNode, MemoryEvent> {
            self.0.create_script()
        }

        fn append(&self, target: &MemoryNode, element: &MemoryNode) -> Result<(), MemoryEvent> {
            self.0.append(target, element)
        }

        fn apply(
            &self,
            element: &MemoryNode,
            src: &str,
            options: &Options,
        ) -> Result<(), MemoryEvent> {
            self.0.apply(element, src, options)
        }

        fn set_attribute(&self, element: &MemoryNode, name: &str, value: &str) -> Result<(), MemoryEvent> {
            if name.contains(char::is_whitespace) {
                return Err(Error::String(format!("invalid attribute name `{name}`")));
            }
            self.0.set_attribute(element, name, value)
        }

        fn listen(
            &self,
            element: &MemoryNode,
            handler: SettleHandler<MemoryEvent>,
        ) -> Result<MemoryListener, MemoryEvent> {
            self.0.listen(element, handler)
        }
    }

    #[tokio::test]
    async fn attached_element_with_failed_attributes_stays_rejected() {
        let loader = ScriptLoader::new(StrictHost::default());
        let host = &loader.host().0;

        let first = loader.load(SCRIPT_SRC, Options::new().attribute("bad name", "x"), None);
        let failed = host.find(SCRIPT_SRC).unwrap();
        assert!(matches!(first.await, Err(Error::String(_))));
        assert_eq!(loader.cache().get(SCRIPT_SRC).unwrap().element, failed);

        // a late load event on the broken element settles nothing
        host.dispatch_load(&failed);

        let second = loader.load(SCRIPT_SRC, Options::new(), None).await;
        assert!(matches!(second, Err(Error::String(_))));
        assert_eq!(host.scripts().len(), 1);

        failed.remove();

        let retry = loader.load(SCRIPT_SRC, Options::new(), None);
        let script = host.find(SCRIPT_SRC).unwrap();
        assert_ne!(script, failed);
        host.dispatch_load(&script);
        assert_eq!(retry.await.unwrap(), script);
    }

    #[tokio::test]
    async fn inline_request_with_failed_attributes_is_rejected_uncached() {
        let loader = ScriptLoader::new(StrictHost::default());
        let options = Options::new()
            .text_content("console.log(1)")
            .attribute("bad name", "x");

        let result = loader.load(SCRIPT_SRC, options, None).await;
        assert!(matches!(result, Err(Error::String(_))));
        assert!(loader.cache().is_empty());
        assert_eq!(loader.host().0.scripts().len(), 1);
    }

    #[tokio::test]
    async fn missing_head_and_body_is_reported() {
        let host = MemoryHost::new();
        host.head().remove();
        host.body().remove();
        let loader = ScriptLoader::new(host);

        let result = loader.load(SCRIPT_SRC, Options::new(), None).await;
        assert!(matches!(result, Err(Error::MissingTarget)));
    }
}
