//!
//! [`ScriptHost`] abstracts the document the loader injects into.
//!
//! [`ScriptLoader`](crate::loader::ScriptLoader) implements the lookup and
//! injection protocol purely in terms of this trait. The browser
//! implementation is [`WebHost`](crate::web::WebHost).
//!

use crate::options::ScriptOptions;
use crate::result::Result;
use std::fmt::Debug;
use std::rc::Rc;

/// Native outcome of a script element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement<E> {
    /// `load` event
    Load(E),
    /// `error` event (or value)
    Error(E),
}

/// Handler wired to both `load` and `error` events of an element
pub type SettleHandler<E> = Rc<dyn Fn(Settlement<E>)>;

pub trait ScriptHost {
    /// Script element produced by this host
    type Element: Clone + 'static;
    /// Element that a script can be appended to
    type Container: Clone;
    /// Native event delivered on settlement
    type Event: Clone + Debug + 'static;
    /// Keeps event wiring alive; dropping it unhooks the handlers
    type Listener: 'static;

    /// Returns `true` if a document is present
    fn is_available(&self) -> bool;

    /// Locate the first script whose `src` attribute equals `src`
    fn find_script(&self, src: &str) -> Result<Option<Self::Element>, Self::Event>;

    /// Returns `true` if the element is attached to the document
    fn is_attached(&self, element: &Self::Element) -> bool;

    /// Container used when the caller supplies no target (document head)
    fn default_target(&self) -> Result<Self::Container, Self::Event>;

    /// Create a detached `<script>` element
    fn create_script(&self) -> Result<Self::Element, Self::Event>;

    /// Append `element` as the last child of `target`
    fn append(&self, target: &Self::Container, element: &Self::Element) -> Result<(), Self::Event>;

    /// Assign `src` and the recognized script properties. Absent
    /// optional properties must leave the element defaults untouched.
    fn apply(
        &self,
        element: &Self::Element,
        src: &str,
        options: &ScriptOptions<Self::Event>,
    ) -> Result<(), Self::Event>;

    /// Set a literal attribute on the element
    fn set_attribute(&self, element: &Self::Element, name: &str, value: &str) -> Result<(), Self::Event>;

    /// Wire `handler` to the `load` and `error` events of the element
    fn listen(
        &self,
        element: &Self::Element,
        handler: SettleHandler<Self::Event>,
    ) -> Result<Self::Listener, Self::Event>;
}
