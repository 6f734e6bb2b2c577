//! Line framing for `text/event-stream` bodies.

use crate::ProviderError;

/// Accumulates raw body bytes and yields complete `data:` payloads.
///
/// Bytes are buffered until a newline arrives, so a multi-byte character
/// split across two network chunks is decoded only once it is whole.
#[derive(Debug, Default)]
pub(crate) struct SseLineBuffer {
    pending: Vec<u8>,
}

impl SseLineBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, bytes: &[u8]) -> Result<Vec<String>, ProviderError> {
        self.pending.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some(newline_index) = self.pending.iter().position(|byte| *byte == b'\n') {
            let line = self.pending.drain(..=newline_index).collect::<Vec<_>>();
            if let Some(payload) = data_payload(&line)? {
                payloads.push(payload);
            }
        }

        Ok(payloads)
    }

    /// Flushes a final line that arrived without a trailing newline.
    pub(crate) fn finish(&mut self) -> Result<Option<String>, ProviderError> {
        if self.pending.is_empty() {
            return Ok(None);
        }

        let line = std::mem::take(&mut self.pending);
        data_payload(&line)
    }
}

pub(crate) fn map_send_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::timeout(err.to_string())
    } else if err.is_connect() {
        ProviderError::unavailable(format!("connection failed: {err}"))
    } else {
        ProviderError::transport(err.to_string())
    }
}

fn data_payload(line: &[u8]) -> Result<Option<String>, ProviderError> {
    let line = std::str::from_utf8(line)
        .map_err(|err| ProviderError::transport(format!("stream was not valid UTF-8: {err}")))?;
    let line = line.trim();

    let Some(payload) = line.strip_prefix("data:") else {
        return Ok(None);
    };

    let payload = payload.trim();
    if payload.is_empty() {
        return Ok(None);
    }

    Ok(Some(payload.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_payloads_across_chunks() {
        let mut buffer = SseLineBuffer::new();

        assert!(buffer.push(b"data: {\"a\"").expect("push").is_empty());
        let payloads = buffer
            .push(b":1}\n\ndata: [DONE]\n")
            .expect("push");

        assert_eq!(payloads, vec!["{\"a\":1}".to_string(), "[DONE]".to_string()]);
    }

    #[test]
    fn multibyte_characters_survive_chunk_boundaries() {
        let line = "data: 你好\n".as_bytes();
        let split = line.len() - 3;
        let mut buffer = SseLineBuffer::new();

        assert!(buffer.push(&line[..split]).expect("first half").is_empty());
        let payloads = buffer.push(&line[split..]).expect("second half");

        assert_eq!(payloads, vec!["你好".to_string()]);
    }

    #[test]
    fn ignores_comments_and_event_names() {
        let mut buffer = SseLineBuffer::new();
        let payloads = buffer
            .push(b": keep-alive\nevent: message\r\ndata: x\r\n")
            .expect("push");

        assert_eq!(payloads, vec!["x".to_string()]);
    }

    #[test]
    fn finish_flushes_unterminated_line() {
        let mut buffer = SseLineBuffer::new();
        assert!(buffer.push(b"data: tail").expect("push").is_empty());
        assert_eq!(buffer.finish().expect("finish"), Some("tail".to_string()));
        assert_eq!(buffer.finish().expect("finish"), None);
    }
}
