//! Markup of the to-do item form as the list pages render it. Pages built
//! from it satisfy the selector contract of [`crate::superlists`].

use crate::core_dom_utils::{escape_html_attr, escape_html_text};

pub const EMPTY_ITEM_ERROR: &str = "You can't have an empty list item";
pub const DUPLICATE_ITEM_ERROR: &str = "You've already got this in your list";
pub const ITEM_PLACEHOLDER: &str = "Enter a to-do item";

/// Renders the item form. The error block is only emitted when `error` is
/// set, matching a form that failed validation.
pub fn render_item_form(action: &str, error: Option<&str>) -> String {
    let mut out = String::new();
    out.push_str("<form method=\"POST\" action=\"");
    out.push_str(&escape_html_attr(action));
    out.push_str("\">");
    out.push_str("<input name=\"text\" id=\"id_text\" class=\"form-control input-lg\" placeholder=\"");
    out.push_str(&escape_html_attr(ITEM_PLACEHOLDER));
    out.push_str("\">");
    if let Some(error) = error {
        out.push_str("<div class=\"form-group has-error\"><span class=\"help-block\">");
        out.push_str(&escape_html_text(error));
        out.push_str("</span></div>");
    }
    out.push_str("</form>");
    out
}

/// A whole list page: the item form followed by the numbered item table.
pub fn render_list_page(items: &[&str], action: &str, error: Option<&str>) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html><html><head><title>To-Do lists</title></head><body>");
    out.push_str("<div class=\"container\"><div class=\"row\">");
    out.push_str("<h1>Your To-Do list</h1>");
    out.push_str(&render_item_form(action, error));
    out.push_str("</div><div class=\"row\"><table id=\"id_list_table\" class=\"table\">");
    for (idx, item) in items.iter().enumerate() {
        out.push_str("<tr><td>");
        out.push_str(&escape_html_text(&format!("{}: {}", idx + 1, item)));
        out.push_str("</td></tr>");
    }
    out.push_str("</table></div></div></body></html>");
    out
}
