#[cfg(test)]
#[path = "stream_decoder_test.rs"]
mod tests;

use std::str;

use crate::domain::models::SessionError;

/// Incremental UTF-8 decoder for a chunked response body. A character split
/// across two fragments is held back until the rest of its bytes arrive.
#[derive(Default)]
pub struct StreamDecoder {
    pending: Vec<u8>,
}

impl StreamDecoder {
    pub fn decode(&mut self, fragment: &[u8]) -> Result<String, SessionError> {
        self.pending.extend_from_slice(fragment);

        let valid_up_to = match str::from_utf8(&self.pending) {
            Ok(_) => self.pending.len(),
            Err(err) => {
                if let Some(invalid_len) = err.error_len() {
                    let start = err.valid_up_to();
                    let bytes = &self.pending[start..start + invalid_len];
                    tracing::error!(bytes = ?bytes, offset = start, "Invalid UTF-8 in stream");
                    return Err(SessionError::Decode(format!(
                        "invalid UTF-8 sequence {bytes:?} in response stream"
                    )));
                }

                // Incomplete trailing character, wait for the next fragment.
                err.valid_up_to()
            }
        };

        let rest = self.pending.split_off(valid_up_to);
        let decoded = String::from_utf8(std::mem::replace(&mut self.pending, rest))
            .map_err(|err| return SessionError::Decode(err.to_string()))?;

        return Ok(decoded);
    }

    /// Called once the transport signals end of stream. Leftover bytes can
    /// only be a truncated character at that point.
    pub fn finish(&mut self) -> Result<(), SessionError> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let leftover = std::mem::take(&mut self.pending);
        tracing::error!(bytes = ?leftover, "Stream ended inside a UTF-8 character");

        return Err(SessionError::Decode(format!(
            "stream ended with {} undecodable trailing byte(s)",
            leftover.len()
        )));
    }
}
