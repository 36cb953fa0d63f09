// Copyright 2024 The willow Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Synchronous event dispatch.
//!
//! Every node is an event target with listener lists keyed by
//! `(type, capture)`.  Dispatch runs the capture phase from the root down,
//! the target phase, and the bubble phase back up.  Listeners run in
//! registration order and may freely mutate the tree; the propagation path
//! and each target's listener list are fixed when the respective phase
//! reaches them.

use std::rc::Rc;

use log::debug;
use tendril::StrTendril;

use crate::node::Handle;

/// The legacy mutation event fired after a node is inserted.
pub const DOM_NODE_INSERTED: &str = "DOMNodeInserted";
/// The legacy mutation event fired before a node is removed.
pub const DOM_NODE_REMOVED: &str = "DOMNodeRemoved";

/// A listener callback: receives the current target and the event.
pub type EventHandler = Rc<dyn Fn(&Handle, &mut Event)>;

pub(crate) struct EventListenerEntry {
    pub event_type: StrTendril,
    pub capture: bool,
    pub handler: EventHandler,
}

/// Which leg of propagation the event is on.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum EventPhase {
    Capturing,
    AtTarget,
    Bubbling,
}

/// An event in flight.
pub struct Event {
    pub event_type: StrTendril,
    pub bubbles: bool,
    pub cancelable: bool,
    /// The node the event was dispatched to.  Set by `dispatch_event`.
    pub target: Option<Handle>,
    pub phase: EventPhase,
    default_prevented: bool,
    propagation_stopped: bool,
    immediate_stopped: bool,
}

impl Event {
    pub fn new(event_type: StrTendril, bubbles: bool, cancelable: bool) -> Event {
        Event {
            event_type,
            bubbles,
            cancelable,
            target: None,
            phase: EventPhase::AtTarget,
            default_prevented: false,
            propagation_stopped: false,
            immediate_stopped: false,
        }
    }

    /// Ask the default action to be skipped.  Ignored for non-cancelable
    /// events.
    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// Let the current target finish, then stop.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Stop at once, skipping the current target's remaining listeners.
    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_stopped = true;
    }
}

/// Register a listener on a node for `(event_type, capture)`.
pub fn add_event_listener(
    node: &Handle,
    event_type: &str,
    capture: bool,
    handler: EventHandler,
) {
    node.listeners.borrow_mut().push(EventListenerEntry {
        event_type: event_type.into(),
        capture,
        handler,
    });
}

/// Does the node have any listeners registered?
pub fn has_event_listeners(node: &Handle) -> bool {
    !node.listeners.borrow().is_empty()
}

/// Remove a previously registered listener; the handler is compared by
/// identity.
pub fn remove_event_listener(node: &Handle, event_type: &str, capture: bool, handler: &EventHandler) {
    node.listeners.borrow_mut().retain(|entry| {
        !(entry.capture == capture
            && &*entry.event_type == event_type
            && Rc::ptr_eq(&entry.handler, handler))
    });
}

fn listeners_for(node: &Handle, event_type: &str, phase: EventPhase) -> Vec<EventHandler> {
    node.listeners
        .borrow()
        .iter()
        .filter(|entry| {
            &*entry.event_type == event_type
                && match phase {
                    EventPhase::Capturing => entry.capture,
                    EventPhase::AtTarget => true,
                    EventPhase::Bubbling => !entry.capture,
                }
        })
        .map(|entry| entry.handler.clone())
        .collect()
}

fn invoke(node: &Handle, event: &mut Event) {
    // The listener list is fixed before the first call, so a listener
    // removing itself (or its siblings) doesn't disturb this dispatch.
    for handler in listeners_for(node, &event.event_type.clone(), event.phase) {
        handler(node, event);
        if event.immediate_stopped {
            return;
        }
    }
}

/// Dispatch `event` to `target`: capture phase root-to-parent, target
/// phase, then bubble phase parent-to-root if the event bubbles.
///
/// Returns `true` unless a listener called `prevent_default`.
pub fn dispatch_event(target: &Handle, event: &mut Event) -> bool {
    event.target = Some(target.clone());

    // The propagation path is frozen at dispatch time.
    let mut ancestors = Vec::new();
    let mut cursor = target.parent_node();
    while let Some(node) = cursor {
        cursor = node.parent_node();
        ancestors.push(node);
    }

    debug!(
        "dispatching {} with {} ancestors",
        event.event_type,
        ancestors.len()
    );

    event.phase = EventPhase::Capturing;
    for node in ancestors.iter().rev() {
        invoke(node, event);
        if event.propagation_stopped {
            return !event.default_prevented;
        }
    }

    event.phase = EventPhase::AtTarget;
    invoke(target, event);
    if event.propagation_stopped || !event.bubbles {
        return !event.default_prevented;
    }

    event.phase = EventPhase::Bubbling;
    for node in ancestors.iter() {
        invoke(node, event);
        if event.propagation_stopped {
            break;
        }
    }

    !event.default_prevented
}

/// Fire a legacy mutation event at `target`, skipping the work entirely
/// when nothing on the propagation path is listening.
pub(crate) fn fire_mutation_event(target: &Handle, event_type: &str) {
    let mut listening = false;
    let mut cursor = Some(target.clone());
    while let Some(node) = cursor {
        if node
            .listeners
            .borrow()
            .iter()
            .any(|entry| &*entry.event_type == event_type)
        {
            listening = true;
            break;
        }
        cursor = node.parent_node();
    }
    if !listening {
        return;
    }

    let mut event = Event::new(event_type.into(), true, false);
    dispatch_event(target, &mut event);
}
