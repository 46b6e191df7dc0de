use proptest::collection::vec;
use proptest::prelude::*;
use proptest::test_runner::{FileFailurePersistence, TestCaseError, TestCaseResult};
use superlists_dom::probes::{get_error_element, is_visible};
use superlists_dom::{EventHandler, EventInit, Page, superlists};

const PAGE_PROPTEST_REGRESSION_FILE: &str = "tests/proptest-regressions/page_property_fuzz_test.txt";
const DEFAULT_PAGE_PROPTEST_CASES: u32 = 128;

fn page_proptest_cases() -> u32 {
    std::env::var("SUPERLISTS_DOM_PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_PAGE_PROPTEST_CASES)
}

fn fail(err: superlists_dom::Error) -> TestCaseError {
    TestCaseError::fail(format!("{err:?}"))
}

#[derive(Clone, Debug)]
enum UserAction {
    ClickInput,
    PressKeyInInput,
    Dispatch(&'static str),
    ClickOther,
}

fn user_action_strategy() -> BoxedStrategy<UserAction> {
    prop_oneof![
        2 => Just(UserAction::ClickInput),
        2 => Just(UserAction::PressKeyInInput),
        3 => prop_oneof![
            Just("focus"),
            Just("blur"),
            Just("input"),
            Just("change"),
            Just("keydown"),
            Just("keyup"),
            Just("click"),
            Just("keypress"),
        ]
        .prop_map(UserAction::Dispatch),
        1 => Just(UserAction::ClickOther),
    ]
    .boxed()
}

/// Wrapper elements placed around the error block, innermost last.
fn wrapper_strategy() -> BoxedStrategy<Vec<(&'static str, bool)>> {
    vec(
        (
            prop_oneof![Just("div"), Just("section"), Just("span"), Just("p")],
            any::<bool>(),
        ),
        0..=4,
    )
    .boxed()
}

const FORM_HTML: &str = r#"
<form id="form">
  <input name="text" id="id_text">
  <button id="other">go</button>
  <div class="form-group has-error"><span class="help-block">bad</span></div>
</form>
"#;

fn run_action(page: &mut Page, action: &UserAction) -> superlists_dom::Result<()> {
    match action {
        UserAction::ClickInput => page.click("#id_text"),
        UserAction::PressKeyInInput => page.press_key("#id_text"),
        UserAction::Dispatch(event_type) => page.dispatch("#id_text", event_type).map(|_| ()),
        UserAction::ClickOther => page.click("#other"),
    }
}

fn hides_on(action: &UserAction) -> bool {
    match action {
        UserAction::ClickInput | UserAction::PressKeyInInput => true,
        UserAction::Dispatch(event_type) => superlists::EVENTS_THAT_HIDE.contains(event_type),
        UserAction::ClickOther => false,
    }
}

fn assert_error_hidden_iff_hiding_event_seen(actions: &[UserAction]) -> TestCaseResult {
    let mut page = Page::from_html(FORM_HTML).map_err(fail)?;
    superlists::initialize(&mut page).map_err(fail)?;

    let mut hidden = false;
    for (step, action) in actions.iter().enumerate() {
        run_action(&mut page, action).map_err(fail)?;
        hidden |= hides_on(action);

        let error = get_error_element(&page).map_err(fail)?;
        prop_assert!(error.is_some(), "error element removed at step {step}");
        prop_assert_eq!(
            is_visible(&page, error),
            !hidden,
            "step {} action {:?} actions={:?}",
            step,
            action,
            actions
        );
    }
    Ok(())
}

fn nested_page(wrappers: &[(&'static str, bool)]) -> String {
    let mut html = String::new();
    for (tag, hidden) in wrappers {
        html.push('<');
        html.push_str(tag);
        if *hidden {
            html.push_str(" style=\"display: none\"");
        }
        html.push('>');
    }
    html.push_str(r#"<div class="has-error" id="target">text</div>"#);
    for (tag, _) in wrappers.iter().rev() {
        html.push_str("</");
        html.push_str(tag);
        html.push('>');
    }
    html
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: page_proptest_cases(),
        failure_persistence: Some(Box::new(
            FileFailurePersistence::Direct(PAGE_PROPTEST_REGRESSION_FILE),
        )),
        .. ProptestConfig::default()
    })]

    #[test]
    fn error_hides_exactly_after_a_click_or_keypress_on_the_input(
        actions in vec(user_action_strategy(), 1..=16)
    ) {
        assert_error_hidden_iff_hiding_event_seen(&actions)?;
    }

    #[test]
    fn display_none_ancestors_hide_the_error(wrappers in wrapper_strategy()) {
        let page = Page::from_html(&nested_page(&wrappers)).map_err(fail)?;
        let target = page.get_element_by_id("target");
        let any_hidden = wrappers.iter().any(|(_, hidden)| *hidden);
        prop_assert_eq!(is_visible(&page, target), !any_hidden);
    }

    #[test]
    fn query_selector_is_the_head_of_query_selector_all(
        wrappers in wrapper_strategy(),
        selector in prop_oneof![
            Just(".has-error"),
            Just("div"),
            Just("span, p"),
            Just("div > div"),
            Just("section div"),
            Just(":not(div)"),
            Just("*:first-child"),
        ]
    ) {
        let page = Page::from_html(&nested_page(&wrappers)).map_err(fail)?;
        let first = page.query_selector(selector).map_err(fail)?;
        let all = page.query_selector_all(selector).map_err(fail)?;
        prop_assert_eq!(first, all.first().copied());
        let mut deduped = all.clone();
        deduped.sort();
        deduped.dedup();
        prop_assert_eq!(deduped.len(), all.len());
    }

    #[test]
    fn non_bubbling_events_never_reach_ancestors(
        wrappers in wrapper_strategy(),
        bubbles in any::<bool>(),
    ) {
        let mut page = Page::from_html(&nested_page(&wrappers)).map_err(fail)?;
        let target = page.select_one("#target").map_err(fail)?;
        let counter = std::rc::Rc::new(std::cell::Cell::new(0usize));
        let ancestors = page.query_selector_all("div, section, span, p").map_err(fail)?;
        for node in ancestors.into_iter().filter(|node| *node != target) {
            let counter = counter.clone();
            page.add_event_listener(
                node,
                "ping",
                EventHandler::new(move |_, _| {
                    counter.set(counter.get() + 1);
                    Ok(())
                }),
                false,
            )
            .map_err(fail)?;
        }
        let init = EventInit { bubbles, cancelable: false };
        page.dispatch_event(target, "ping", init).map_err(fail)?;
        let expected = if bubbles { wrappers.len() } else { 0 };
        prop_assert_eq!(counter.get(), expected);
    }
}
