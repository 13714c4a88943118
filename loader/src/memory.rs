//!
//! In-memory document implementing [`ScriptHost`].
//!
//! [`MemoryHost`] models just enough of a DOM (`html > head, body`) to
//! exercise [`ScriptLoader`](crate::loader::ScriptLoader) natively: element
//! attachment and removal, script properties, literal attributes and manual
//! dispatch of `load`/`error` events. Available under `cfg(test)` and the
//! `test` feature.
//!

use crate::error::Error;
use crate::host::{ScriptHost, SettleHandler, Settlement};
use crate::options::{non_empty, ScriptOptions};
use crate::result::Result;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Event delivered by [`MemoryHost::dispatch_load`] and [`MemoryHost::dispatch_error`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryEvent {
    pub kind: String,
    pub detail: String,
}

impl MemoryEvent {
    pub fn load() -> Self {
        MemoryEvent {
            kind: "load".to_string(),
            detail: String::new(),
        }
    }

    pub fn error(detail: &str) -> Self {
        MemoryEvent {
            kind: "error".to_string(),
            detail: detail.to_string(),
        }
    }
}

/// Snapshot of the script properties assigned to a [`MemoryNode`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptProperties {
    pub script_type: String,
    pub fetch_priority: String,
    pub is_async: bool,
    pub defer: bool,
    pub no_module: bool,
    pub text_content: Option<String>,
    pub id: String,
    pub inner_html: String,
    pub cross_origin: Option<String>,
    pub referrer_policy: String,
    pub integrity: String,
    pub nonce: String,
}

impl Default for ScriptProperties {
    fn default() -> Self {
        ScriptProperties {
            script_type: String::new(),
            fetch_priority: "auto".to_string(),
            is_async: true,
            defer: false,
            no_module: false,
            text_content: None,
            id: String::new(),
            inner_html: String::new(),
            cross_origin: None,
            referrer_policy: String::new(),
            integrity: String::new(),
            nonce: String::new(),
        }
    }
}

struct NodeInner {
    tag: String,
    parent: RefCell<Weak<NodeInner>>,
    children: RefCell<Vec<MemoryNode>>,
    attributes: RefCell<Vec<(String, String)>>,
    properties: RefCell<ScriptProperties>,
    journal: RefCell<Vec<String>>,
    handler: RefCell<Option<SettleHandler<MemoryEvent>>>,
}

/// Element of the in-memory document. Equality is identity.
#[derive(Clone)]
pub struct MemoryNode(Rc<NodeInner>);

impl PartialEq for MemoryNode {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for MemoryNode {}

impl fmt::Debug for MemoryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.0.tag)?;
        for (name, value) in self.0.attributes.borrow().iter() {
            write!(f, " {name}=\"{value}\"")?;
        }
        write!(f, ">")
    }
}

impl MemoryNode {
    fn new(tag: &str) -> Self {
        MemoryNode(Rc::new(NodeInner {
            tag: tag.to_string(),
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
            attributes: RefCell::new(Vec::new()),
            properties: RefCell::new(ScriptProperties::default()),
            journal: RefCell::new(Vec::new()),
            handler: RefCell::new(None),
        }))
    }

    pub fn tag(&self) -> &str {
        &self.0.tag
    }

    pub fn parent(&self) -> Option<MemoryNode> {
        self.0.parent.borrow().upgrade().map(MemoryNode)
    }

    pub fn children(&self) -> Vec<MemoryNode> {
        self.0.children.borrow().clone()
    }

    /// Append `child`, detaching it from its current parent first
    pub fn append_child(&self, child: &MemoryNode) {
        child.remove();
        *child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
        self.0.children.borrow_mut().push(child.clone());
        child.record("append");
    }

    /// Detach the node from its parent
    pub fn remove(&self) {
        let parent = self.0.parent.replace(Weak::new()).upgrade();
        if let Some(parent) = parent {
            parent
                .children
                .borrow_mut()
                .retain(|child| !Rc::ptr_eq(&child.0, &self.0));
        }
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.0
            .attributes
            .borrow()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value.clone())
    }

    pub fn set_attribute(&self, name: &str, value: &str) {
        let mut attributes = self.0.attributes.borrow_mut();
        match attributes.iter_mut().find(|(n, _)| n == name) {
            Some((_, current)) => *current = value.to_string(),
            None => attributes.push((name.to_string(), value.to_string())),
        }
    }

    pub fn properties(&self) -> ScriptProperties {
        self.0.properties.borrow().clone()
    }

    /// Mutations applied to this node, in order
    pub fn journal(&self) -> Vec<String> {
        self.0.journal.borrow().clone()
    }

    fn record(&self, entry: &str) {
        self.0.journal.borrow_mut().push(entry.to_string());
    }

    fn update<F>(&self, entry: &str, f: F)
    where
        F: FnOnce(&mut ScriptProperties),
    {
        f(&mut *self.0.properties.borrow_mut());
        self.record(entry);
    }

    fn is_descendant_of(&self, ancestor: &MemoryNode) -> bool {
        let mut current = self.parent();
        while let Some(node) = current {
            if node == *ancestor {
                return true;
            }
            current = node.parent();
        }
        false
    }

    fn collect(&self, tag: &str, list: &mut Vec<MemoryNode>) {
        for child in self.0.children.borrow().iter() {
            if child.0.tag == tag {
                list.push(child.clone());
            }
            child.collect(tag, list);
        }
    }

    fn settle(&self, settlement: Settlement<MemoryEvent>) {
        let handler = self.0.handler.borrow().clone();
        if let Some(handler) = handler {
            handler(settlement);
        }
    }
}

/// Keeps the settlement handler installed on a [`MemoryNode`]
pub struct MemoryListener {
    node: MemoryNode,
}

impl Drop for MemoryListener {
    fn drop(&mut self) {
        self.node.0.handler.borrow_mut().take();
    }
}

#[derive(Clone)]
pub struct MemoryHost {
    available: bool,
    document: MemoryNode,
    head: MemoryNode,
    body: MemoryNode,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    pub fn new() -> Self {
        let document = MemoryNode::new("#document");
        let html = MemoryNode::new("html");
        let head = MemoryNode::new("head");
        let body = MemoryNode::new("body");
        document.append_child(&html);
        html.append_child(&head);
        html.append_child(&body);

        MemoryHost {
            available: true,
            document,
            head,
            body,
        }
    }

    /// Host reporting no document, as outside of a browser
    pub fn without_document() -> Self {
        MemoryHost {
            available: false,
            ..Self::new()
        }
    }

    pub fn head(&self) -> MemoryNode {
        self.head.clone()
    }

    pub fn body(&self) -> MemoryNode {
        self.body.clone()
    }

    pub fn create_node(&self, tag: &str) -> MemoryNode {
        MemoryNode::new(tag)
    }

    /// Attached `<script>` elements in document order
    pub fn scripts(&self) -> Vec<MemoryNode> {
        let mut list = Vec::new();
        self.document.collect("script", &mut list);
        list
    }

    /// First attached script with a `src` attribute equal to `src`
    pub fn find(&self, src: &str) -> Option<MemoryNode> {
        self.scripts()
            .into_iter()
            .find(|script| script.attribute("src").as_deref() == Some(src))
    }

    pub fn dispatch_load(&self, node: &MemoryNode) {
        node.settle(Settlement::Load(MemoryEvent::load()));
    }

    pub fn dispatch_error(&self, node: &MemoryNode, event: MemoryEvent) {
        node.settle(Settlement::Error(event));
    }
}

impl ScriptHost for MemoryHost {
    type Element = MemoryNode;
    type Container = MemoryNode;
    type Event = MemoryEvent;
    type Listener = MemoryListener;

    fn is_available(&self) -> bool {
        self.available
    }

    fn find_script(&self, src: &str) -> Result<Option<MemoryNode>, MemoryEvent> {
        Ok(self.find(src))
    }

    fn is_attached(&self, element: &MemoryNode) -> bool {
        element.is_descendant_of(&self.document)
    }

    fn default_target(&self) -> Result<MemoryNode, MemoryEvent> {
        [&self.head, &self.body]
            .into_iter()
            .find(|node| self.is_attached(node))
            .cloned()
            .ok_or(Error::MissingTarget)
    }

    fn create_script(&self) -> Result<MemoryNode, MemoryEvent> {
        Ok(MemoryNode::new("script"))
    }

    fn append(&self, target: &MemoryNode, element: &MemoryNode) -> Result<(), MemoryEvent> {
        target.append_child(element);
        Ok(())
    }

    fn apply(
        &self,
        element: &MemoryNode,
        src: &str,
        options: &ScriptOptions<MemoryEvent>,
    ) -> Result<(), MemoryEvent> {
        element.set_attribute("src", src);
        element.record("src");
        element.update("type", |p| p.script_type = options.script_type.to_string());
        element.update("fetchPriority", |p| {
            p.fetch_priority = options.fetch_priority.to_string()
        });
        element.update("async", |p| p.is_async = options.is_async);
        element.update("defer", |p| p.defer = options.defer);
        element.update("noModule", |p| p.no_module = options.no_module);
        element.update("textContent", |p| {
            p.text_content = options.text_content.clone()
        });

        if let Some(id) = non_empty(&options.id) {
            element.update("id", |p| p.id = id.to_string());
        }
        if let Some(html) = non_empty(&options.inner_html) {
            element.update("innerHTML", |p| p.inner_html = html.to_string());
        }
        if let Some(cross_origin) = options.cross_origin {
            element.update("crossOrigin", |p| {
                p.cross_origin = Some(cross_origin.to_string())
            });
        }
        if let Some(policy) = options.referrer_policy {
            element.update("referrerPolicy", |p| {
                p.referrer_policy = policy.to_string()
            });
        }
        if let Some(integrity) = non_empty(&options.integrity) {
            element.update("integrity", |p| p.integrity = integrity.to_string());
        }
        if let Some(nonce) = non_empty(&options.nonce) {
            element.update("nonce", |p| p.nonce = nonce.to_string());
        }
        Ok(())
    }

    fn set_attribute(&self, element: &MemoryNode, name: &str, value: &str) -> Result<(), MemoryEvent> {
        element.set_attribute(name, value);
        element.record(&format!("attribute:{name}"));
        Ok(())
    }

    fn listen(
        &self,
        element: &MemoryNode,
        handler: SettleHandler<MemoryEvent>,
    ) -> Result<MemoryListener, MemoryEvent> {
        element.0.handler.borrow_mut().replace(handler);
        element.record("listen");
        Ok(MemoryListener {
            node: element.clone(),
        })
    }
}
