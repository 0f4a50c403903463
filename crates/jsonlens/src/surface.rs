//! Capabilities the host UI provides: the editor widget and the filter input.

mod memory;

pub use memory::{MemoryEditor, MemoryFilterInput};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Zero-based line/column position inside the editor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorPosition {
    pub line: usize,
    pub ch: usize,
}

impl CursorPosition {
    pub fn new(line: usize, ch: usize) -> Self {
        Self { line, ch }
    }
}

/// Where a batch of user input came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputOrigin {
    Paste,
    Input,
    Other(String),
}

impl InputOrigin {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "paste" => InputOrigin::Paste,
            "+input" | "input" => InputOrigin::Input,
            other => InputOrigin::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    /// Content changed, for any reason including `set_value`.
    Change,
    /// The user put text into the editor.
    InputRead { origin: InputOrigin },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterInputEvent {
    KeyUp,
}

pub trait EditorSurface: Send + Sync {
    fn get_value(&self) -> String;
    fn set_value(&self, value: &str);
    fn set_cursor(&self, position: CursorPosition);
    fn set_option(&self, name: &str, value: serde_json::Value);
    fn subscribe(&self) -> broadcast::Receiver<EditorEvent>;
}

pub trait FilterInputSurface: Send + Sync {
    fn value(&self) -> String;
    fn subscribe(&self) -> broadcast::Receiver<FilterInputEvent>;
}
