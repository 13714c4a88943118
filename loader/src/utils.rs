//! Helper functions for accessing DOM environment
use crate::error::Error;
use crate::result::Result;
use web_sys::{Document, Element, Window};

/// Return the current browser [`web_sys::Window`] element or
/// [`Error::Environment`] when running outside of a browser
pub fn window() -> Result<Window> {
    if !cfg!(target_arch = "wasm32") {
        return Err(Error::Environment);
    }
    web_sys::window().ok_or(Error::Environment)
}

/// Return the current browser [`web_sys::Document`] element
pub fn document() -> Result<Document> {
    window()?.document().ok_or(Error::Environment)
}

fn first_by_tag_name(document: &Document, tag: &str) -> Option<Element> {
    document.get_elements_by_tag_name(tag).item(0)
}

/// Return the `head` element of the document, falling back
/// to `body` when the document has no `head`
pub fn root(document: &Document) -> Result<Element> {
    first_by_tag_name(document, "head")
        .or_else(|| first_by_tag_name(document, "body"))
        .ok_or(Error::MissingTarget)
}
