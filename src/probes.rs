//! Read-only probes used by page tests, plus a synthetic event trigger.

use crate::dom::NodeId;
use crate::events::{Event, EventInit};
use crate::page::Page;
use crate::superlists::{ERROR_SELECTOR, INPUT_SELECTOR};
use crate::Result;

pub fn get_error_element(page: &Page) -> Result<Option<NodeId>> {
    page.query_selector(ERROR_SELECTOR)
}

pub fn get_input_element(page: &Page) -> Result<Option<NodeId>> {
    page.query_selector(INPUT_SELECTOR)
}

/// True when the element has a non-zero offset width or height, or at least
/// one client rect. Absent handles, text nodes and handles from another page
/// are never visible.
pub fn is_visible(page: &Page, element: Option<NodeId>) -> bool {
    let Some(element) = element else {
        return false;
    };
    let width = page.offset_width(element).unwrap_or(0);
    let height = page.offset_height(element).unwrap_or(0);
    let has_rects = page
        .client_rects(element)
        .is_ok_and(|rects| !rects.is_empty());
    width > 0 || height > 0 || has_rects
}

/// Dispatches a bubbling, non-cancelable event of `event_type` at `element`.
pub fn trigger_event(page: &mut Page, event_type: &str, element: NodeId) -> Result<Event> {
    page.dispatch_event(element, event_type, EventInit::BUBBLING)
}
