mod bus;
mod events;
mod throttle;

pub use bus::EventBus;
pub use events::EditorEvent;
pub use throttle::{DEFAULT_REDRAW_INTERVAL_MS, RedrawThrottle};

pub trait EventHandler: Send {
    fn handle_event(&mut self, event: &EditorEvent);
}
