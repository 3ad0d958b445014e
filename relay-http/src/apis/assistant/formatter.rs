use crate::streaming::{EventFormatter, StreamEvent};

/// Formatter for the command-list endpoint: text goes out as `message` frames
pub struct AssistantFormatter;

impl EventFormatter for AssistantFormatter {
    fn delta(&self, text: String) -> StreamEvent {
        StreamEvent::Message { delta: text }
    }
}
