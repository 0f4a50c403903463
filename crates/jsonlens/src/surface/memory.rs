//! In-process surfaces for headless use and tests.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use super::{
    CursorPosition, EditorEvent, EditorSurface, FilterInputEvent, FilterInputSurface, InputOrigin,
};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct EditorState {
    value: String,
    cursor: CursorPosition,
    options: BTreeMap<String, serde_json::Value>,
}

/// Editor surface backed by a string. Emits the same notifications a widget
/// would: `Change` on every content update, `InputRead` for user input.
pub struct MemoryEditor {
    state: Mutex<EditorState>,
    events: broadcast::Sender<EditorEvent>,
}

impl std::fmt::Debug for MemoryEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEditor").finish()
    }
}

impl Default for MemoryEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEditor {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Mutex::new(EditorState::default()),
            events,
        }
    }

    /// Replace the content as a paste would.
    pub fn paste(&self, text: &str) {
        self.state.lock().value = text.to_string();
        self.emit(EditorEvent::InputRead {
            origin: InputOrigin::Paste,
        });
        self.emit(EditorEvent::Change);
    }

    /// Append typed text at the end of the content.
    pub fn type_text(&self, text: &str) {
        self.state.lock().value.push_str(text);
        self.emit(EditorEvent::InputRead {
            origin: InputOrigin::Input,
        });
        self.emit(EditorEvent::Change);
    }

    pub fn cursor(&self) -> CursorPosition {
        self.state.lock().cursor
    }

    pub fn option(&self, name: &str) -> Option<serde_json::Value> {
        self.state.lock().options.get(name).cloned()
    }

    fn emit(&self, event: EditorEvent) {
        let _ = self.events.send(event);
    }
}

impl EditorSurface for MemoryEditor {
    fn get_value(&self) -> String {
        self.state.lock().value.clone()
    }

    fn set_value(&self, value: &str) {
        self.state.lock().value = value.to_string();
        self.emit(EditorEvent::Change);
    }

    fn set_cursor(&self, position: CursorPosition) {
        self.state.lock().cursor = position;
    }

    fn set_option(&self, name: &str, value: serde_json::Value) {
        self.state.lock().options.insert(name.to_string(), value);
    }

    fn subscribe(&self) -> broadcast::Receiver<EditorEvent> {
        self.events.subscribe()
    }
}

/// Filter input backed by a string.
pub struct MemoryFilterInput {
    value: Mutex<String>,
    events: broadcast::Sender<FilterInputEvent>,
}

impl std::fmt::Debug for MemoryFilterInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryFilterInput").finish()
    }
}

impl Default for MemoryFilterInput {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFilterInput {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            value: Mutex::new(String::new()),
            events,
        }
    }

    /// Set the value without a key-up notification.
    pub fn set(&self, text: &str) {
        *self.value.lock() = text.to_string();
    }

    /// Set the value and release a key, as the user typing it would.
    pub fn type_text(&self, text: &str) {
        self.set(text);
        let _ = self.events.send(FilterInputEvent::KeyUp);
    }
}

impl FilterInputSurface for MemoryFilterInput {
    fn value(&self) -> String {
        self.value.lock().clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<FilterInputEvent> {
        self.events.subscribe()
    }
}
