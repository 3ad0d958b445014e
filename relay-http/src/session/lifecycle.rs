use tracing::{debug, info};

/// Tracks one streamed request.
///
/// Owned by the response stream: when the client disconnects the stream is
/// dropped together with the runtime's event source, and this guard records
/// that the turn was abandoned.
pub struct RequestLifecycle {
    pub request_id: String,
    pub conversation: String,
    frames: usize,
    completed: bool,
}

impl RequestLifecycle {
    pub fn new(request_id: String, conversation: String) -> Self {
        Self {
            request_id,
            conversation,
            frames: 0,
            completed: false,
        }
    }

    pub fn record_frame(&mut self) {
        self.frames += 1;
    }

    /// Mark the stream as finished; only the `end` frame remains to be sent
    pub fn complete(&mut self) {
        self.completed = true;
    }

    #[cfg(test)]
    fn frames(&self) -> usize {
        self.frames
    }

    #[cfg(test)]
    fn is_completed(&self) -> bool {
        self.completed
    }
}

impl Drop for RequestLifecycle {
    fn drop(&mut self) {
        if self.completed {
            debug!("[{}] - [{}] Stream completed after {} frames", self.request_id, self.conversation, self.frames);
        } else {
            info!(
                "[{}] - [{}] Client went away after {} frames, dropping agent stream",
                self.request_id, self.conversation, self.frames
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_frames_until_completed() {
        let mut lifecycle = RequestLifecycle::new("r".into(), "u/t".into());
        lifecycle.record_frame();
        lifecycle.record_frame();
        assert_eq!(lifecycle.frames(), 2);
        assert!(!lifecycle.is_completed());

        lifecycle.complete();
        assert!(lifecycle.is_completed());
    }
}
