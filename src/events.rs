use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::document::Element;
use crate::dom::NodeId;

/// Callback handles are reference-counted so the same closure can sit in a
/// builder's keyed registry and in the document's listener table at once.
pub type EventCallback = Rc<dyn Fn(&mut Event)>;

/// The value passed to listener callbacks during dispatch. Mutating methods
/// only flip flags; the walk itself lives on `Element::dispatch`.
pub struct Event {
    event_type: String,
    target: Element,
    current_target: Element,
    bubbles: bool,
    default_prevented: bool,
    propagation_stopped: bool,
    immediate_propagation_stopped: bool,
}

impl Event {
    pub(crate) fn new(event_type: &str, target: Element) -> Self {
        Self {
            event_type: event_type.to_string(),
            current_target: target.clone(),
            target,
            bubbles: true,
            default_prevented: false,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn target(&self) -> Element {
        self.target.clone()
    }

    pub fn current_target(&self) -> Element {
        self.current_target.clone()
    }

    pub(crate) fn set_current_target(&mut self, element: Element) {
        self.current_target = element;
    }

    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    /// No default actions exist in this host; the flag is only readable
    /// after dispatch.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// Ends the walk after the current node's remaining listeners have run.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub(crate) fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    /// Ends the walk immediately, skipping the current node's remaining
    /// listeners as well.
    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_propagation_stopped = true;
    }

    pub(crate) fn immediate_propagation_stopped(&self) -> bool {
        self.immediate_propagation_stopped
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("event_type", &self.event_type)
            .field("target", &self.target)
            .field("bubbles", &self.bubbles)
            .field("default_prevented", &self.default_prevented)
            .finish()
    }
}

#[derive(Default)]
pub(crate) struct ListenerStore {
    map: HashMap<NodeId, HashMap<String, Vec<EventCallback>>>,
}

impl ListenerStore {
    pub(crate) fn add(&mut self, node_id: NodeId, event: &str, callback: EventCallback) {
        let listeners = self
            .map
            .entry(node_id)
            .or_default()
            .entry(event.to_string())
            .or_default();

        // Match browser semantics: re-registering the same callback handle
        // for the same node/event pair is a no-op. Distinct closures are not
        // deduplicated.
        if listeners
            .iter()
            .any(|existing| Rc::ptr_eq(existing, &callback))
        {
            return;
        }

        listeners.push(callback);
    }

    pub(crate) fn remove(&mut self, node_id: NodeId, event: &str, callback: &EventCallback) -> bool {
        let Some(events) = self.map.get_mut(&node_id) else {
            return false;
        };
        let Some(listeners) = events.get_mut(event) else {
            return false;
        };

        if let Some(pos) = listeners
            .iter()
            .position(|existing| Rc::ptr_eq(existing, callback))
        {
            listeners.remove(pos);
            if listeners.is_empty() {
                events.remove(event);
            }
            if events.is_empty() {
                self.map.remove(&node_id);
            }
            return true;
        }

        false
    }

    pub(crate) fn get(&self, node_id: NodeId, event: &str) -> Vec<EventCallback> {
        self.map
            .get(&node_id)
            .and_then(|events| events.get(event))
            .cloned()
            .unwrap_or_default()
    }
}

impl fmt::Debug for ListenerStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total: usize = self
            .map
            .values()
            .flat_map(|events| events.values())
            .map(Vec::len)
            .sum();
        f.debug_struct("ListenerStore")
            .field("nodes", &self.map.len())
            .field("listeners", &total)
            .finish()
    }
}
