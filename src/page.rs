use std::collections::VecDeque;

use crate::core_dom_utils::truncate_chars;
use crate::dom::{Dom, NodeId};
use crate::events::{Event, EventHandler, EventInit, EventPhase, ListenerStore};
use crate::html::parse_html;
use crate::layout::{DomRect, LayoutConfig};
use crate::{Error, Result};

/// Stack reserved for each top-level user action. Handlers may dispatch
/// further events, so dispatch depth is bounded by handler code, not by us.
const ACTION_STACK_SIZE: usize = 32 * 1024 * 1024;

/// A loaded document plus its registered listeners. This is the whole
/// "browser": every query, mutation and event goes through it.
pub struct Page {
    dom: Dom,
    listeners: ListenerStore,
    layout: LayoutConfig,
    trace: bool,
    trace_events: bool,
    trace_listeners: bool,
    trace_logs: VecDeque<String>,
    trace_log_limit: usize,
    trace_to_stderr: bool,
}

impl Page {
    pub fn from_html(html: &str) -> Result<Self> {
        let dom = parse_html(html)?;
        Ok(Self {
            dom,
            listeners: ListenerStore::default(),
            layout: LayoutConfig::default(),
            trace: false,
            trace_events: true,
            trace_listeners: true,
            trace_logs: VecDeque::new(),
            trace_log_limit: 10_000,
            trace_to_stderr: true,
        })
    }

    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace = enabled;
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        self.trace_logs.drain(..).collect()
    }

    pub fn set_trace_stderr(&mut self, enabled: bool) {
        self.trace_to_stderr = enabled;
    }

    pub fn set_trace_events(&mut self, enabled: bool) {
        self.trace_events = enabled;
    }

    pub fn set_trace_listeners(&mut self, enabled: bool) {
        self.trace_listeners = enabled;
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::Runtime(
                "set_trace_log_limit requires at least 1 entry".into(),
            ));
        }
        self.trace_log_limit = max_entries;
        if self.trace_logs.len() > self.trace_log_limit {
            let excess = self.trace_logs.len() - self.trace_log_limit;
            self.trace_logs.drain(..excess);
        }
        Ok(())
    }

    pub fn layout(&self) -> LayoutConfig {
        self.layout
    }

    pub fn set_layout(&mut self, layout: LayoutConfig) -> Result<()> {
        layout.validate()?;
        self.layout = layout;
        Ok(())
    }

    // Queries.

    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        self.dom.query_selector(selector)
    }

    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        self.dom.query_selector_all(selector)
    }

    /// First match, or `Error::SelectorNotFound`.
    pub fn select_one(&self, selector: &str) -> Result<NodeId> {
        self.dom
            .query_selector(selector)?
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.dom.by_id(id)
    }

    pub fn matches(&self, node: NodeId, selector: &str) -> Result<bool> {
        self.dom.matches_selector(node, selector)
    }

    pub fn closest(&self, node: NodeId, selector: &str) -> Result<Option<NodeId>> {
        self.dom.closest(node, selector)
    }

    pub fn tag_name(&self, node: NodeId) -> Option<String> {
        self.dom.tag_name(node).map(ToOwned::to_owned)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.dom.parent(node)
    }

    pub fn text_content(&self, node: NodeId) -> String {
        self.dom.text_content(node)
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        self.dom.attr(node, name)
    }

    pub fn has_attr(&self, node: NodeId, name: &str) -> bool {
        self.dom.has_attr(node, name)
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) -> Result<()> {
        self.dom.set_attr(node, name, value)
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) -> Result<()> {
        self.dom.remove_attr(node, name)
    }

    pub fn class_list(&self, node: NodeId) -> Result<Vec<String>> {
        self.dom.class_list(node)
    }

    pub fn has_class(&self, node: NodeId, class_name: &str) -> Result<bool> {
        self.dom.class_contains(node, class_name)
    }

    /// `element.style[prop]`; `""` when the declaration is absent.
    pub fn style(&self, node: NodeId, prop: &str) -> Result<String> {
        self.dom.style_get(node, prop)
    }

    /// `element.style[prop] = value`; an empty value removes the declaration.
    pub fn set_style(&mut self, node: NodeId, prop: &str, value: &str) -> Result<()> {
        self.dom.style_set(node, prop, value)
    }

    // Layout.

    pub fn is_rendered(&self, node: NodeId) -> bool {
        self.dom.is_rendered(node)
    }

    pub fn offset_width(&self, node: NodeId) -> Result<i64> {
        self.dom.offset_width(node, &self.layout)
    }

    pub fn offset_height(&self, node: NodeId) -> Result<i64> {
        self.dom.offset_height(node, &self.layout)
    }

    pub fn client_rects(&self, node: NodeId) -> Result<Vec<DomRect>> {
        self.dom.client_rects(node, &self.layout)
    }

    // Listeners.

    pub fn add_event_listener(
        &mut self,
        node: NodeId,
        event_type: &str,
        handler: EventHandler,
        capture: bool,
    ) -> Result<()> {
        self.require_node(node, "addEventListener")?;
        self.trace_listener_line(format!(
            "[listener] add {} target={} phase={}",
            event_type,
            self.trace_node_label(node),
            if capture { "capture" } else { "bubble" }
        ));
        self.listeners
            .add(node, event_type.to_string(), capture, handler);
        Ok(())
    }

    pub fn remove_event_listener(
        &mut self,
        node: NodeId,
        event_type: &str,
        handler: &EventHandler,
        capture: bool,
    ) -> bool {
        let removed = self.listeners.remove(node, event_type, capture, handler);
        self.trace_listener_line(format!(
            "[listener] remove {} target={} removed={}",
            event_type,
            self.trace_node_label(node),
            removed
        ));
        removed
    }

    pub fn listener_count(&self, node: NodeId, event_type: &str) -> usize {
        self.listeners.count(node, event_type)
    }

    // Events.

    /// Dispatches a synthetic event at `target` and returns it after the
    /// last listener ran. The first listener error aborts the dispatch and is
    /// returned.
    pub fn dispatch_event(
        &mut self,
        target: NodeId,
        event_type: &str,
        init: EventInit,
    ) -> Result<Event> {
        self.require_node(target, "dispatchEvent")?;
        let mut event = Event::new(event_type, target, init);

        let mut path = Vec::new();
        let mut cursor = self.dom.parent(target);
        while let Some(node) = cursor {
            path.push(node);
            cursor = self.dom.parent(node);
        }
        path.reverse();

        let outcome = self.run_dispatch(&path, &mut event);
        event.finish();
        match outcome {
            Ok(label) => {
                self.trace_event_done(&event, label);
                Ok(event)
            }
            Err(err) => {
                self.trace_event_line(format!(
                    "[event] error {} target={} error={}",
                    event.event_type(),
                    self.trace_node_label(target),
                    err
                ));
                Err(err)
            }
        }
    }

    fn run_dispatch(&mut self, ancestors: &[NodeId], event: &mut Event) -> Result<&'static str> {
        let target = event.target();

        for node in ancestors {
            event.enter(*node, EventPhase::Capturing);
            self.invoke_listeners(*node, event, true)?;
            if event.propagation_stopped() {
                return Ok("propagation_stopped");
            }
        }

        // At the target, capture listeners run before bubble listeners.
        event.enter(target, EventPhase::AtTarget);
        self.invoke_listeners(target, event, true)?;
        if event.propagation_stopped() {
            return Ok("propagation_stopped");
        }
        self.invoke_listeners(target, event, false)?;
        if event.propagation_stopped() {
            return Ok("propagation_stopped");
        }

        if event.bubbles() {
            for node in ancestors.iter().rev() {
                event.enter(*node, EventPhase::Bubbling);
                self.invoke_listeners(*node, event, false)?;
                if event.propagation_stopped() {
                    return Ok("propagation_stopped");
                }
            }
        }

        Ok("completed")
    }

    fn invoke_listeners(&mut self, node: NodeId, event: &mut Event, capture: bool) -> Result<()> {
        let listeners = self.listeners.get(node, event.event_type(), capture);
        for listener in listeners {
            // Listeners removed by an earlier one in this dispatch are skipped.
            if !self.listeners.contains(node, event.event_type(), listener.id) {
                continue;
            }
            if self.trace {
                let phase = if capture { "capture" } else { "bubble" };
                let line = format!(
                    "[event] {} target={} current={} phase={} default_prevented={}",
                    event.event_type(),
                    self.trace_node_label(event.target()),
                    self.trace_node_label(event.current_target()),
                    phase,
                    event.default_prevented()
                );
                self.trace_event_line(line);
            }
            listener.handler.call(self, event)?;
            if event.immediate_propagation_stopped() {
                break;
            }
        }
        Ok(())
    }

    // User actions.

    /// Dispatches a bubbling, cancelable `click`. Disabled elements ignore it.
    pub fn click(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        stacker::grow(ACTION_STACK_SIZE, || {
            if self.dom.has_attr(target, "disabled") {
                return Ok(());
            }
            self.dispatch_event(target, "click", EventInit::USER_ACTION)?;
            Ok(())
        })
    }

    /// Dispatches `keydown`, `keypress` and `keyup`. A canceled `keydown`
    /// suppresses the `keypress`.
    pub fn press_key(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        stacker::grow(ACTION_STACK_SIZE, || {
            let keydown = self.dispatch_event(target, "keydown", EventInit::USER_ACTION)?;
            if !keydown.default_prevented() {
                self.dispatch_event(target, "keypress", EventInit::USER_ACTION)?;
            }
            self.dispatch_event(target, "keyup", EventInit::USER_ACTION)?;
            Ok(())
        })
    }

    /// Dispatches a bubbling, non-cancelable event of any type.
    pub fn dispatch(&mut self, selector: &str, event_type: &str) -> Result<Event> {
        let target = self.select_one(selector)?;
        stacker::grow(ACTION_STACK_SIZE, || {
            self.dispatch_event(target, event_type, EventInit::BUBBLING)
        })
    }

    // Assertions.

    pub fn assert_exists(&self, selector: &str) -> Result<()> {
        let _ = self.select_one(selector)?;
        Ok(())
    }

    pub fn assert_text(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.text_content(target);
        self.check(selector, target, expected, actual)
    }

    pub fn assert_style(&self, selector: &str, prop: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.style_get(target, prop)?;
        self.check(selector, target, expected, actual)
    }

    pub fn assert_visible(&self, selector: &str, expected: bool) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = crate::probes::is_visible(self, Some(target));
        self.check(selector, target, &expected.to_string(), actual.to_string())
    }

    pub fn dump_dom(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        Ok(self.dom.dump_node(target))
    }

    fn check(&self, selector: &str, target: NodeId, expected: &str, actual: String) -> Result<()> {
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual,
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    fn node_snippet(&self, node: NodeId) -> String {
        truncate_chars(&self.dom.dump_node(node), 200)
    }

    fn require_node(&self, node: NodeId, what: &str) -> Result<()> {
        if !self.dom.is_valid_node(node) {
            return Err(Error::Runtime(format!(
                "{what} target node-{} does not belong to this page",
                node.0
            )));
        }
        Ok(())
    }

    // Trace.

    fn trace_event_done(&mut self, event: &Event, outcome: &str) {
        if !(self.trace && self.trace_events) {
            return;
        }
        let line = format!(
            "[event] done {} target={} outcome={} default_prevented={}",
            event.event_type(),
            self.trace_node_label(event.target()),
            outcome,
            event.default_prevented()
        );
        self.trace_line(line);
    }

    fn trace_event_line(&mut self, line: String) {
        if self.trace && self.trace_events {
            self.trace_line(line);
        }
    }

    fn trace_listener_line(&mut self, line: String) {
        if self.trace && self.trace_listeners {
            self.trace_line(line);
        }
    }

    fn trace_line(&mut self, line: String) {
        tracing::debug!(target: "superlists_dom::trace", "{line}");
        if self.trace_to_stderr {
            eprintln!("{line}");
        }
        while self.trace_logs.len() >= self.trace_log_limit {
            self.trace_logs.pop_front();
        }
        self.trace_logs.push_back(line);
    }

    fn trace_node_label(&self, node: NodeId) -> String {
        if let Some(id) = self.dom.attr(node, "id") {
            if !id.is_empty() {
                return format!("#{id}");
            }
        }
        if node == self.dom.root {
            return "document".into();
        }
        self.dom
            .tag_name(node)
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| format!("node-{}", node.0))
    }
}
