use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::dom::NodeId;
use crate::page::Page;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPhase {
    None,
    Capturing,
    AtTarget,
    Bubbling,
}

/// Flags of a synthetic event, as in `new Event(type, init)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventInit {
    pub bubbles: bool,
    pub cancelable: bool,
}

impl EventInit {
    /// What `initEvent(type, true, false)` produces.
    pub const BUBBLING: Self = Self {
        bubbles: true,
        cancelable: false,
    };

    /// What a user click or key press produces.
    pub const USER_ACTION: Self = Self {
        bubbles: true,
        cancelable: true,
    };
}

#[derive(Debug, Clone)]
pub struct Event {
    event_type: String,
    target: NodeId,
    current_target: NodeId,
    phase: EventPhase,
    bubbles: bool,
    cancelable: bool,
    default_prevented: bool,
    propagation_stopped: bool,
    immediate_propagation_stopped: bool,
}

impl Event {
    pub(crate) fn new(event_type: &str, target: NodeId, init: EventInit) -> Self {
        Self {
            event_type: event_type.to_string(),
            target,
            current_target: target,
            phase: EventPhase::None,
            bubbles: init.bubbles,
            cancelable: init.cancelable,
            default_prevented: false,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn current_target(&self) -> NodeId {
        self.current_target
    }

    pub fn phase(&self) -> EventPhase {
        self.phase
    }

    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    pub fn cancelable(&self) -> bool {
        self.cancelable
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    /// Has no effect on non-cancelable events.
    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_propagation_stopped = true;
    }

    pub(crate) fn immediate_propagation_stopped(&self) -> bool {
        self.immediate_propagation_stopped
    }

    pub(crate) fn enter(&mut self, current_target: NodeId, phase: EventPhase) {
        self.current_target = current_target;
        self.phase = phase;
    }

    pub(crate) fn finish(&mut self) {
        self.current_target = self.target;
        self.phase = EventPhase::None;
    }
}

type HandlerFn = dyn Fn(&mut Page, &mut Event) -> Result<()>;

/// A listener callback. Clones share identity, which is what
/// [`Page::remove_event_listener`] compares.
#[derive(Clone)]
pub struct EventHandler {
    callback: Rc<HandlerFn>,
}

impl EventHandler {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&mut Page, &mut Event) -> Result<()> + 'static,
    {
        Self {
            callback: Rc::new(callback),
        }
    }

    pub fn same_as(&self, other: &EventHandler) -> bool {
        Rc::ptr_eq(&self.callback, &other.callback)
    }

    pub(crate) fn call(&self, page: &mut Page, event: &mut Event) -> Result<()> {
        (self.callback)(page, event)
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventHandler({:p})", Rc::as_ptr(&self.callback))
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Listener {
    pub(crate) id: u64,
    pub(crate) capture: bool,
    pub(crate) handler: EventHandler,
}

#[derive(Debug, Default, Clone)]
pub(crate) struct ListenerStore {
    map: HashMap<NodeId, HashMap<String, Vec<Listener>>>,
    next_id: u64,
}

impl ListenerStore {
    /// Listeners are not deduplicated: adding the same handler twice makes it
    /// run twice.
    pub(crate) fn add(
        &mut self,
        node_id: NodeId,
        event: String,
        capture: bool,
        handler: EventHandler,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let listener = Listener {
            id,
            capture,
            handler,
        };
        self.map
            .entry(node_id)
            .or_default()
            .entry(event)
            .or_default()
            .push(listener);
        id
    }

    /// Whether the registration `id` is still present.
    pub(crate) fn contains(&self, node_id: NodeId, event: &str, id: u64) -> bool {
        self.map
            .get(&node_id)
            .and_then(|events| events.get(event))
            .is_some_and(|listeners| listeners.iter().any(|listener| listener.id == id))
    }

    /// Removes the first listener registered with this handler and phase.
    pub(crate) fn remove(
        &mut self,
        node_id: NodeId,
        event: &str,
        capture: bool,
        handler: &EventHandler,
    ) -> bool {
        let Some(events) = self.map.get_mut(&node_id) else {
            return false;
        };
        let Some(listeners) = events.get_mut(event) else {
            return false;
        };

        let Some(pos) = listeners
            .iter()
            .position(|listener| listener.capture == capture && listener.handler.same_as(handler))
        else {
            return false;
        };

        listeners.remove(pos);
        if listeners.is_empty() {
            events.remove(event);
        }
        if events.is_empty() {
            self.map.remove(&node_id);
        }
        true
    }

    /// Snapshot of the listeners for one phase; registrations made while they
    /// run do not affect the current dispatch.
    pub(crate) fn get(&self, node_id: NodeId, event: &str, capture: bool) -> Vec<Listener> {
        self.map
            .get(&node_id)
            .and_then(|events| events.get(event))
            .map(|listeners| {
                listeners
                    .iter()
                    .filter(|listener| listener.capture == capture)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn count(&self, node_id: NodeId, event: &str) -> usize {
        self.map
            .get(&node_id)
            .and_then(|events| events.get(event))
            .map(Vec::len)
            .unwrap_or(0)
    }
}
