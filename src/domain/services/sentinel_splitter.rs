#[cfg(test)]
#[path = "sentinel_splitter_test.rs"]
mod tests;

use crate::domain::models::INTERRUPT_MARKER;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SplitEvent {
    /// Conversation text proven not to contain the marker.
    PlainText(String),
    /// The marker completed. `before` is the conversation text that preceded
    /// it and had not been emitted yet, `payload` whatever followed it in the
    /// same fragment.
    MarkerFound { before: String, payload: String },
    /// Fragment received after the marker. Always part of the payload.
    Payload(String),
}

/// Splits streamed text at a control marker that may straddle fragment
/// boundaries.
///
/// Any suffix of the text seen so far that is also a prefix of the marker is
/// held back, so at most `marker.len() - 1` bytes are ever buffered. Once the
/// marker is found every further fragment is passed through as payload
/// without scanning.
pub struct SentinelSplitter {
    marker: String,
    held: String,
    found: bool,
}

impl Default for SentinelSplitter {
    fn default() -> SentinelSplitter {
        return SentinelSplitter::new(INTERRUPT_MARKER);
    }
}

impl SentinelSplitter {
    pub fn new(marker: &str) -> SentinelSplitter {
        return SentinelSplitter {
            marker: marker.to_string(),
            held: "".to_string(),
            found: false,
        };
    }

    pub fn marker_found(&self) -> bool {
        return self.found;
    }

    pub fn push(&mut self, fragment: &str) -> Option<SplitEvent> {
        if self.found {
            if fragment.is_empty() {
                return None;
            }
            return Some(SplitEvent::Payload(fragment.to_string()));
        }

        let mut text = std::mem::take(&mut self.held);
        text.push_str(fragment);

        if !self.marker.is_empty() {
            if let Some(idx) = text.find(&self.marker) {
                self.found = true;
                let payload = text[idx + self.marker.len()..].to_string();
                text.truncate(idx);

                return Some(SplitEvent::MarkerFound {
                    before: text,
                    payload,
                });
            }
        }

        let keep = self.partial_marker_len(&text);
        self.held = text.split_off(text.len() - keep);
        if text.is_empty() {
            return None;
        }

        return Some(SplitEvent::PlainText(text));
    }

    /// Flushes held-back text at end of stream. A marker prefix that never
    /// completed was ordinary text after all.
    pub fn finish(&mut self) -> Option<SplitEvent> {
        if self.found || self.held.is_empty() {
            return None;
        }

        return Some(SplitEvent::PlainText(std::mem::take(&mut self.held)));
    }

    fn partial_marker_len(&self, text: &str) -> usize {
        let max = self.marker.len().saturating_sub(1).min(text.len());
        for len in (1..=max).rev() {
            let start = text.len() - len;
            if text.is_char_boundary(start) && self.marker.starts_with(&text[start..]) {
                return len;
            }
        }

        return 0;
    }
}
