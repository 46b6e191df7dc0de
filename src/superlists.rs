//! The page behavior: hide the form's error message as soon as the user
//! starts interacting with the item input.
//!
//! Host markup must contain an `input[name="text"]` and a `.has-error`
//! element. When several elements match, only the first in document order
//! is used.

use crate::events::EventHandler;
use crate::page::Page;
use crate::Result;

pub const ERROR_SELECTOR: &str = ".has-error";
pub const INPUT_SELECTOR: &str = "input[name=\"text\"]";

/// Event kinds on the input that hide the error message, in registration
/// order.
pub const EVENTS_THAT_HIDE: [&str; 2] = ["click", "keypress"];

/// Registers [`hide_error_message`] on the item input for every kind in
/// [`EVENTS_THAT_HIDE`].
///
/// Calling it again registers the listeners again.
pub fn initialize(page: &mut Page) -> Result<()> {
    let handler = EventHandler::new(|page, _event| hide_error_message(page));
    for event_type in EVENTS_THAT_HIDE {
        hide_error_message_on_event(page, event_type, &handler)?;
    }
    Ok(())
}

/// Sets `display: none` on the first `.has-error` element.
pub fn hide_error_message(page: &mut Page) -> Result<()> {
    let error = page.select_one(ERROR_SELECTOR).inspect_err(|err| {
        tracing::warn!(%err, "cannot hide the error message");
    })?;
    page.set_style(error, "display", "none")
}

fn hide_error_message_on_event(
    page: &mut Page,
    event_type: &str,
    handler: &EventHandler,
) -> Result<()> {
    let input = page.select_one(INPUT_SELECTOR)?;
    tracing::debug!(event_type, "registering error-hide listener on {INPUT_SELECTOR}");
    page.add_event_listener(input, event_type, handler.clone(), false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    const FORM: &str = r#"
        <form method="POST">
          <input name="text" id="id_text">
          <div class="form-group has-error" style="display: block">
            <span class="help-block">You can't have an empty list item</span>
          </div>
        </form>
    "#;

    #[test]
    fn initialize_registers_click_and_keypress_listeners() -> Result<()> {
        let mut page = Page::from_html(FORM)?;
        let input = page.select_one(INPUT_SELECTOR)?;
        initialize(&mut page)?;
        assert_eq!(page.listener_count(input, "click"), 1);
        assert_eq!(page.listener_count(input, "keypress"), 1);
        assert_eq!(page.listener_count(input, "keydown"), 0);
        Ok(())
    }

    #[test]
    fn initialize_twice_duplicates_listeners() -> Result<()> {
        let mut page = Page::from_html(FORM)?;
        let input = page.select_one(INPUT_SELECTOR)?;
        initialize(&mut page)?;
        initialize(&mut page)?;
        assert_eq!(page.listener_count(input, "click"), 2);
        assert_eq!(page.listener_count(input, "keypress"), 2);

        page.click(INPUT_SELECTOR)?;
        page.assert_style(ERROR_SELECTOR, "display", "none")?;
        Ok(())
    }

    #[test]
    fn initialize_without_input_fails_and_registers_nothing() -> Result<()> {
        let mut page = Page::from_html(r#"<div class="has-error">x</div>"#)?;
        let err = initialize(&mut page).err();
        assert_eq!(err, Some(Error::SelectorNotFound(INPUT_SELECTOR.into())));
        Ok(())
    }

    #[test]
    fn hide_error_message_sets_display_none_and_keeps_the_element() -> Result<()> {
        let mut page = Page::from_html(FORM)?;
        hide_error_message(&mut page)?;
        page.assert_style(ERROR_SELECTOR, "display", "none")?;
        page.assert_exists(".help-block")?;

        hide_error_message(&mut page)?;
        let error = page.select_one(ERROR_SELECTOR)?;
        assert_eq!(page.attr(error, "style").as_deref(), Some("display: none;"));
        Ok(())
    }

    #[test]
    fn hide_error_message_only_touches_the_first_match() -> Result<()> {
        let mut page = Page::from_html(
            r#"<p class="has-error" id="a">a</p><p class="has-error" id="b">b</p>"#,
        )?;
        hide_error_message(&mut page)?;
        page.assert_style("#a", "display", "none")?;
        page.assert_style("#b", "display", "")?;
        Ok(())
    }

    #[test]
    fn hide_error_message_without_error_element_fails() -> Result<()> {
        let mut page = Page::from_html(r#"<input name="text">"#)?;
        let err = hide_error_message(&mut page).err();
        assert_eq!(err, Some(Error::SelectorNotFound(ERROR_SELECTOR.into())));
        Ok(())
    }

    #[test]
    fn listener_failure_surfaces_from_the_user_action() -> Result<()> {
        let mut page = Page::from_html(r#"<input name="text">"#)?;
        page.set_trace_stderr(false);
        page.enable_trace(true);
        initialize(&mut page)?;

        let err = page.click(INPUT_SELECTOR).err();
        assert_eq!(err, Some(Error::SelectorNotFound(ERROR_SELECTOR.into())));
        let logs = page.take_trace_logs();
        assert!(
            logs.iter()
                .any(|line| line.starts_with("[event] error click")
                    && line.contains("selector not found: .has-error"))
        );
        Ok(())
    }

    #[test]
    fn other_events_leave_the_error_visible() -> Result<()> {
        let mut page = Page::from_html(FORM)?;
        initialize(&mut page)?;
        page.dispatch(INPUT_SELECTOR, "focus")?;
        page.dispatch(INPUT_SELECTOR, "keydown")?;
        page.assert_style(ERROR_SELECTOR, "display", "block")?;
        page.assert_visible(ERROR_SELECTOR, true)?;
        Ok(())
    }
}
