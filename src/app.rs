use ratatui::layout::Rect;

use crate::client::{ChatClient, ClientError};
use crate::state::Message;

/// A prompt that has been appended to the transcript and still needs sending
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub seq: u64,
    pub prompt: String,
}

pub struct App {
    pub should_quit: bool,

    // Draft input
    pub draft: String,
    pub cursor: usize, // char index into draft

    // Transcript, append-only for the session
    pub messages: Vec<Message>,

    // Round-trips started but not yet settled
    pub pending: usize,
    next_seq: u64,

    // Transcript scrolling
    pub scroll: u16,
    pub follow_bottom: bool,
    pub rendered_lines: u16,    // wrapped rows, measured during render
    pub transcript_height: u16, // inner height, updated during render

    // Panel areas for mouse hit-testing (updated during render)
    pub transcript_area: Option<Rect>,
    pub send_area: Option<Rect>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    pub client: ChatClient,
}

impl App {
    pub fn new(client: ChatClient) -> Self {
        Self {
            should_quit: false,
            draft: String::new(),
            cursor: 0,
            messages: Vec::new(),
            pending: 0,
            next_seq: 1,
            scroll: 0,
            follow_bottom: true,
            rendered_lines: 0,
            transcript_height: 0,
            transcript_area: None,
            send_area: None,
            animation_frame: 0,
            client,
        }
    }

    // Draft editing

    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.draft, self.cursor);
        self.draft.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.draft, self.cursor);
            self.draft.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.draft.chars().count() {
            let byte_pos = char_to_byte_index(&self.draft, self.cursor);
            self.draft.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.draft.chars().count());
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.draft.chars().count();
    }

    /// Append the draft as a user message and hand back what must be sent.
    ///
    /// Only the exact empty string is refused; whitespace goes out as typed.
    /// Nothing blocks a second submission while earlier ones are in flight.
    pub fn submit(&mut self) -> Option<Submission> {
        if self.draft.is_empty() {
            return None;
        }

        let prompt = std::mem::take(&mut self.draft);
        self.cursor = 0;
        self.messages.push(Message::user(prompt.clone()));

        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending += 1;

        tracing::debug!(seq, pending = self.pending, "submitted prompt");
        self.scroll_to_bottom();

        Some(Submission { seq, prompt })
    }

    /// Settle one round-trip. Replies land in the order they arrive,
    /// which is not necessarily the order they were sent.
    pub fn receive_reply(&mut self, seq: u64, result: Result<String, ClientError>) {
        self.pending = self.pending.saturating_sub(1);

        match result {
            Ok(reply) => {
                tracing::debug!(seq, "reply received");
                self.messages.push(Message::bot(reply));
            }
            Err(e) => {
                // Failures stay out of the transcript
                tracing::warn!(seq, error = %e, "round-trip failed, no reply appended");
            }
        }

        self.scroll_to_bottom();
    }

    pub fn is_waiting(&self) -> bool {
        self.pending > 0
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_waiting() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Scrolling

    /// Record the wrapped row count the renderer measured for this frame.
    /// Snaps to the bottom while following, otherwise just clamps.
    pub fn sync_scroll(&mut self, rendered_lines: u16, visible_height: u16) {
        self.rendered_lines = rendered_lines;
        self.transcript_height = visible_height;

        if self.follow_bottom {
            self.scroll = self.max_scroll();
        } else {
            self.scroll = self.scroll.min(self.max_scroll());
        }
    }

    pub fn max_scroll(&self) -> u16 {
        self.rendered_lines.saturating_sub(self.transcript_height)
    }

    /// Follow the newest message; the exact offset is settled at the next render
    pub fn scroll_to_bottom(&mut self) {
        self.follow_bottom = true;
        self.scroll = self.max_scroll();
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_sub(lines);
        self.follow_bottom = self.scroll >= self.max_scroll();
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines).min(self.max_scroll());
        self.follow_bottom = self.scroll >= self.max_scroll();
    }

    pub fn half_page(&self) -> u16 {
        (self.transcript_height / 2).max(1)
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}
