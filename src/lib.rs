//! Error-message hiding for the Superlists item form, running on a
//! deterministic lightweight DOM so the page behavior can be driven from
//! plain Rust tests.
//!
//! ```
//! use superlists_dom::{Page, probes, superlists};
//!
//! let html = r#"
//!   <input name="text">
//!   <div class="has-error" style="display: block">required</div>
//! "#;
//! let mut page = Page::from_html(html)?;
//! superlists::initialize(&mut page)?;
//! page.press_key("input[name='text']")?;
//! let error = probes::get_error_element(&page)?;
//! assert!(!probes::is_visible(&page, error));
//! # Ok::<(), superlists_dom::Error>(())
//! ```

mod core_dom_utils;
mod dom;
mod events;
mod html;
pub mod item_form;
mod layout;
mod page;
pub mod probes;
mod selector;
pub mod superlists;

pub use dom::NodeId;
pub use events::{Event, EventHandler, EventInit, EventPhase};
pub use layout::{DomRect, LayoutConfig};
pub use page::Page;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("html parse error: {0}")]
    HtmlParse(String),
    #[error("runtime error: {0}")]
    Runtime(String),
    #[error("selector not found: {0}")]
    SelectorNotFound(String),
    #[error("unsupported selector: {0}")]
    UnsupportedSelector(String),
    #[error(
        "assertion failed for {selector}: expected {expected}, actual {actual}, snippet {dom_snippet}"
    )]
    AssertionFailed {
        selector: String,
        expected: String,
        actual: String,
        dom_snippet: String,
    },
}
