//! Hook registry and event queue.
//!
//! The [`Dispatcher`] stores callbacks ("hooks") per [`EventKind`] and a FIFO
//! queue of pending [`Event`]s. Delivery is pull-based: the frame loop calls
//! [`Dispatcher::poll_events`] for one kind at a time and every queued event
//! of that kind is handed to every live hook of that kind, hooks in
//! registration order, events in insertion order. Delivered events are gone
//! afterwards whether or not any hook matched.
//!
//! Hooks are never removed while a poll may be walking the registry.
//! [`Dispatcher::unhook`] and [`Dispatcher::reset`] only set a
//! `pending_removal` flag; a flagged hook is skipped from that moment on and
//! physically dropped by the next [`Dispatcher::sweep`].
//!
//! Callbacks are free to call back into the dispatcher (hook, unhook, send)
//! while a poll is running. [`Dispatcher::poll_events`] therefore works on a
//! `RefCell` and never holds a borrow across a callback:
//!
//! - matching events are taken out of the queue on entry, so events sent by a
//!   callback wait for the next poll of their kind
//! - the hook count is fixed on entry, so hooks added by a callback first fire
//!   on the next poll
//! - the removal flag is read right before each invocation
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use flatengine::events::{EventKind, EventPayload};
//! use flatengine::resources::dispatcher::Dispatcher;
//!
//! let dispatcher = RefCell::new(Dispatcher::<&str>::new());
//! dispatcher.borrow_mut().hook(EventKind::Update, "tick");
//! dispatcher.borrow_mut().send(EventPayload::Update);
//!
//! let mut seen = Vec::new();
//! let delivered = Dispatcher::poll_events(&dispatcher, EventKind::Update, |cb, _event| {
//!     seen.push(*cb);
//!     Ok::<_, flatengine::error::EngineError>(())
//! })
//! .unwrap();
//! assert_eq!(delivered, 1);
//! assert_eq!(seen, ["tick"]);
//! ```

use std::cell::RefCell;

use log::debug;

use crate::error::{EngineError, EngineResult};
use crate::events::{Event, EventKind, EventPayload};

/// Identifies one registration returned by [`Dispatcher::hook`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookHandle(u64);

#[derive(Debug)]
struct Hook<C> {
    id: u64,
    kind: EventKind,
    callback: C,
    pending_removal: bool,
}

impl<C> Hook<C> {
    fn is_live(&self, kind: EventKind) -> bool {
        self.kind == kind && !self.pending_removal
    }
}

#[derive(Debug)]
pub struct Dispatcher<C> {
    hooks: Vec<Hook<C>>,
    events: Vec<Event>,
    next_id: u64,
}

impl<C> Default for Dispatcher<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Dispatcher<C> {
    pub fn new() -> Self {
        Self {
            hooks: Vec::new(),
            events: Vec::new(),
            next_id: 0,
        }
    }

    pub fn hook(&mut self, kind: EventKind, callback: C) -> HookHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.hooks.push(Hook {
            id,
            kind,
            callback,
            pending_removal: false,
        });
        HookHandle(id)
    }

    /// Registers a hook for a kind given as a raw script integer.
    pub fn hook_raw(&mut self, raw: i64, callback: C) -> EngineResult<HookHandle> {
        let kind = EventKind::from_raw(raw)?;
        Ok(self.hook(kind, callback))
    }

    /// Flags every live hook registered with both `kind` and `callback`.
    /// Returns how many were flagged.
    pub fn unhook(&mut self, kind: EventKind, callback: &C) -> usize
    where
        C: PartialEq,
    {
        let mut flagged = 0;
        for hook in self
            .hooks
            .iter_mut()
            .filter(|h| h.is_live(kind) && h.callback == *callback)
        {
            hook.pending_removal = true;
            flagged += 1;
        }
        flagged
    }

    pub fn unhook_handle(&mut self, handle: HookHandle) -> bool {
        match self
            .hooks
            .iter_mut()
            .find(|h| h.id == handle.0 && !h.pending_removal)
        {
            Some(hook) => {
                hook.pending_removal = true;
                true
            }
            None => false,
        }
    }

    /// Flags every hook.
    pub fn reset(&mut self) {
        for hook in &mut self.hooks {
            hook.pending_removal = true;
        }
    }

    /// Enqueues an event, checking that `payload` belongs to `kind`.
    pub fn send_event(&mut self, kind: EventKind, payload: EventPayload) -> EngineResult<()> {
        self.events.push(Event::new(kind, payload)?);
        Ok(())
    }

    /// Enqueues an event under the kind of its payload.
    pub fn send(&mut self, payload: EventPayload) {
        self.events.push(Event::from(payload));
    }

    /// Drops flagged hooks. Returns how many were removed.
    pub fn sweep(&mut self) -> usize {
        let before = self.hooks.len();
        self.hooks.retain(|h| !h.pending_removal);
        let removed = before - self.hooks.len();
        if removed > 0 {
            debug!("swept {removed} hooks");
        }
        removed
    }

    /// Drops every hook and every queued event immediately.
    pub fn clear(&mut self) {
        self.hooks.clear();
        self.events.clear();
    }

    pub fn queued(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind() == kind).count()
    }

    pub fn live_hooks(&self, kind: EventKind) -> usize {
        self.hooks.iter().filter(|h| h.is_live(kind)).count()
    }

    /// Number of registry slots, flagged ones included.
    pub fn registered(&self) -> usize {
        self.hooks.len()
    }

    fn take_events(&mut self, kind: EventKind) -> Vec<Event> {
        let (taken, kept): (Vec<Event>, Vec<Event>) = std::mem::take(&mut self.events)
            .into_iter()
            .partition(|e| e.kind() == kind);
        self.events = kept;
        taken
    }

    /// Delivers every queued event of `kind` to every live hook of `kind`.
    ///
    /// Returns the number of callback invocations. The first error returned
    /// by `deliver` aborts the poll; the remaining events of this poll are
    /// discarded.
    pub fn poll_events<E, F>(cell: &RefCell<Self>, kind: EventKind, mut deliver: F) -> Result<usize, E>
    where
        C: Clone,
        E: From<EngineError>,
        F: FnMut(&C, &Event) -> Result<(), E>,
    {
        let (events, hook_count) = {
            let mut dispatcher = cell
                .try_borrow_mut()
                .map_err(|_| EngineError::validation("dispatcher is busy"))?;
            let events = dispatcher.take_events(kind);
            (events, dispatcher.hooks.len())
        };

        let mut delivered = 0;
        for event in &events {
            for index in 0..hook_count {
                let callback = {
                    let dispatcher = cell
                        .try_borrow()
                        .map_err(|_| EngineError::validation("dispatcher is busy"))?;
                    match dispatcher.hooks.get(index) {
                        Some(hook) if hook.is_live(kind) => hook.callback.clone(),
                        _ => continue,
                    }
                };
                deliver(&callback, event)?;
                delivered += 1;
            }
        }
        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Log = RefCell<Vec<(u32, EventPayload)>>;

    fn poll(cell: &RefCell<Dispatcher<u32>>, kind: EventKind, log: &Log) -> usize {
        Dispatcher::poll_events(cell, kind, |cb, event| {
            log.borrow_mut().push((*cb, event.payload().clone()));
            Ok::<_, EngineError>(())
        })
        .unwrap()
    }

    // ==================== REGISTRATION TESTS ====================

    #[test]
    fn hook_raw_rejects_invalid_kind() {
        let mut d = Dispatcher::new();
        assert!(matches!(d.hook_raw(0, 1u32), Err(EngineError::Validation(_))));
        assert!(matches!(d.hook_raw(8, 1u32), Err(EngineError::Validation(_))));
        assert!(d.hook_raw(1, 1u32).is_ok());
        assert_eq!(d.live_hooks(EventKind::Update), 1);
    }

    #[test]
    fn unhook_matches_kind_and_callback() {
        let mut d = Dispatcher::new();
        d.hook(EventKind::Update, 1u32);
        d.hook(EventKind::Render, 1u32);
        d.hook(EventKind::Update, 2u32);
        assert_eq!(d.unhook(EventKind::Update, &1), 1);
        assert_eq!(d.live_hooks(EventKind::Update), 1);
        assert_eq!(d.live_hooks(EventKind::Render), 1);
        // Flagged but still in the registry until swept.
        assert_eq!(d.registered(), 3);
        assert_eq!(d.sweep(), 1);
        assert_eq!(d.registered(), 2);
    }

    #[test]
    fn unhook_handle_flags_once() {
        let mut d = Dispatcher::new();
        let handle = d.hook(EventKind::Mouse, 5u32);
        assert!(d.unhook_handle(handle));
        assert!(!d.unhook_handle(handle));
    }

    #[test]
    fn reset_flags_every_hook() {
        let mut d = Dispatcher::new();
        for kind in EventKind::ALL {
            d.hook(kind, 0u32);
        }
        d.reset();
        for kind in EventKind::ALL {
            assert_eq!(d.live_hooks(kind), 0);
        }
        assert_eq!(d.sweep(), 7);
    }

    // ==================== DELIVERY TESTS ====================

    #[test]
    fn delivers_in_registration_then_insertion_order() {
        let cell = RefCell::new(Dispatcher::new());
        {
            let mut d = cell.borrow_mut();
            d.hook(EventKind::Keyboard, 1u32);
            d.hook(EventKind::Keyboard, 2u32);
            d.send(EventPayload::Keyboard {
                code: 65,
                action: crate::events::InputAction::Press,
            });
            d.send(EventPayload::Keyboard {
                code: 66,
                action: crate::events::InputAction::Press,
            });
        }
        let log = Log::default();
        assert_eq!(poll(&cell, EventKind::Keyboard, &log), 4);
        let order: Vec<(u32, i32)> = log
            .borrow()
            .iter()
            .map(|(cb, p)| match p {
                EventPayload::Keyboard { code, .. } => (*cb, *code),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(order, vec![(1, 65), (2, 65), (1, 66), (2, 66)]);
    }

    #[test]
    fn events_are_consumed_even_without_hooks() {
        let cell = RefCell::new(Dispatcher::<u32>::new());
        cell.borrow_mut().send(EventPayload::Render);
        let log = Log::default();
        assert_eq!(poll(&cell, EventKind::Render, &log), 0);
        assert_eq!(cell.borrow().queued(EventKind::Render), 0);
    }

    #[test]
    fn poll_leaves_other_kinds_queued() {
        let cell = RefCell::new(Dispatcher::<u32>::new());
        cell.borrow_mut().send(EventPayload::Render);
        cell.borrow_mut().send(EventPayload::Update);
        let log = Log::default();
        poll(&cell, EventKind::Update, &log);
        assert_eq!(cell.borrow().queued(EventKind::Render), 1);
    }

    #[test]
    fn events_sent_during_poll_wait_for_next_poll() {
        let cell = RefCell::new(Dispatcher::new());
        cell.borrow_mut().hook(EventKind::Update, 1u32);
        cell.borrow_mut().send(EventPayload::Update);

        let delivered = Dispatcher::poll_events(&cell, EventKind::Update, |_, _| {
            cell.borrow_mut().send(EventPayload::Update);
            Ok::<_, EngineError>(())
        })
        .unwrap();
        assert_eq!(delivered, 1);
        assert_eq!(cell.borrow().queued(EventKind::Update), 1);
    }

    #[test]
    fn hooks_added_during_poll_fire_next_time() {
        let cell = RefCell::new(Dispatcher::new());
        cell.borrow_mut().hook(EventKind::Update, 1u32);
        cell.borrow_mut().send(EventPayload::Update);

        let delivered = Dispatcher::poll_events(&cell, EventKind::Update, |_, _| {
            cell.borrow_mut().hook(EventKind::Update, 2);
            Ok::<_, EngineError>(())
        })
        .unwrap();
        assert_eq!(delivered, 1);
        assert_eq!(cell.borrow().live_hooks(EventKind::Update), 2);
    }

    #[test]
    fn hook_flagged_mid_poll_is_skipped() {
        let cell = RefCell::new(Dispatcher::new());
        cell.borrow_mut().hook(EventKind::Update, 1u32);
        cell.borrow_mut().hook(EventKind::Update, 2u32);
        cell.borrow_mut().send(EventPayload::Update);

        let log = RefCell::new(Vec::new());
        Dispatcher::poll_events(&cell, EventKind::Update, |cb, _| {
            log.borrow_mut().push(*cb);
            if *cb == 1 {
                cell.borrow_mut().unhook(EventKind::Update, &2);
            }
            Ok::<_, EngineError>(())
        })
        .unwrap();
        assert_eq!(*log.borrow(), vec![1]);
    }

    #[test]
    fn failing_callback_aborts_poll() {
        let cell = RefCell::new(Dispatcher::new());
        cell.borrow_mut().hook(EventKind::Update, 1u32);
        cell.borrow_mut().hook(EventKind::Update, 2u32);
        cell.borrow_mut().send(EventPayload::Update);
        cell.borrow_mut().send(EventPayload::Update);

        let mut calls = Vec::new();
        let result = Dispatcher::poll_events(&cell, EventKind::Update, |cb, _| {
            calls.push(*cb);
            if *cb == 1 {
                Err(EngineError::Script("boom".into()))
            } else {
                Ok(())
            }
        });
        assert!(matches!(result, Err(EngineError::Script(_))));
        assert_eq!(calls, vec![1]);
        assert_eq!(cell.borrow().queued(EventKind::Update), 0);
    }

    #[test]
    fn send_event_validates_payload() {
        let mut d = Dispatcher::<u32>::new();
        assert!(d.send_event(EventKind::Phase, EventPayload::Update).is_err());
        assert!(d.send_event(EventKind::Update, EventPayload::Update).is_ok());
        assert_eq!(d.queued(EventKind::Update), 1);
    }
}
