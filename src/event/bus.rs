use std::cell::RefCell;

use crate::event::{EditorEvent, EventHandler};

/// Broadcasts editor events to registered handlers, in subscription order
pub struct EventBus {
    handlers: RefCell<Vec<Box<dyn EventHandler>>>,
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        // handlers belong to one editor; a clone starts without any
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &format!("<{} handlers>", self.handlers.borrow().len()))
            .finish()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: RefCell::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, handler: Box<dyn EventHandler>) {
        self.handlers.borrow_mut().push(handler);
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.borrow().len()
    }

    /// Deliver `event` to every handler.
    ///
    /// Handlers only observe; a handler that emits on the same bus while
    /// being called is skipped for that nested event.
    pub fn emit(&self, event: EditorEvent) {
        let Ok(mut handlers) = self.handlers.try_borrow_mut() else {
            log::warn!("Dropped re-entrant event {:?}", event);
            return;
        };
        for handler in handlers.iter_mut() {
            handler.handle_event(&event);
        }
    }
}
