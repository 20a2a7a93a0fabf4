use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use wxstation_core::Command;
use wxstation_core::protocol::FRAME_DELIMITER;

use super::{Transport, TransportError};

/// What the mock answers to the next request frame.
#[derive(Debug, Clone)]
enum Scripted {
    Line(Vec<u8>),
    Timeout,
}

#[derive(Debug, Default)]
struct MockState {
    script: VecDeque<Scripted>,
    written: Vec<Vec<u8>>,
    open: bool,
    transactions: usize,
}

/// In-memory transport answering from a script.
///
/// Clones share state, so a test can keep one handle to inspect the frames
/// written while the poller owns another. Flush frames are answered with an
/// empty line and do not consume the script. Once the script runs dry every
/// request times out.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock that answers with `lines`, in order.
    pub fn with_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mock = Self::new();
        for line in lines {
            mock.push_line(line.as_ref());
        }
        mock
    }

    /// Queue a response line. A `\r\n` terminator is appended.
    pub fn push_line(&self, line: &str) {
        let mut bytes = line.as_bytes().to_vec();
        bytes.extend_from_slice(b"\r\n");
        self.state().script.push_back(Scripted::Line(bytes));
    }

    /// Queue a request that gets no answer.
    pub fn push_timeout(&self) {
        self.state().script.push_back(Scripted::Timeout);
    }

    /// Every frame written so far, flushes included.
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.state().written.clone()
    }

    /// Command tokens written so far, with delimiters stripped.
    pub fn commands(&self) -> Vec<String> {
        self.state()
            .written
            .iter()
            .map(|frame| {
                let text = String::from_utf8_lossy(frame);
                text.trim_matches(FRAME_DELIMITER as char).to_owned()
            })
            .collect()
    }

    /// Number of completed open/write/close cycles.
    pub fn transactions(&self) -> usize {
        self.state().transactions
    }

    /// Scripted responses not consumed yet.
    pub fn remaining(&self) -> usize {
        self.state().script.len()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for MockTransport {
    fn open(&mut self) -> Result<(), TransportError> {
        self.state().open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.state().open = false;
    }

    fn is_open(&self) -> bool {
        self.state().open
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<Vec<u8>, TransportError> {
        let mut state = self.state();
        state.open = true;
        state.written.push(frame.to_vec());
        state.transactions += 1;

        let answer = if frame == Command::Flush.frame().as_slice() {
            Scripted::Line(b"\r\n".to_vec())
        } else {
            state.script.pop_front().unwrap_or(Scripted::Timeout)
        };
        state.open = false;

        match answer {
            Scripted::Line(line) => Ok(line),
            Scripted::Timeout => Err(TransportError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wxstation_core::FrameCodec;

    #[test]
    fn test_answers_in_order_then_times_out() {
        let mut mock = MockTransport::with_lines(["a", "b"]);

        assert_eq!(mock.write_frame(b"|node1|").unwrap(), b"a\r\n");
        assert_eq!(mock.write_frame(b"|node2|").unwrap(), b"b\r\n");
        assert!(matches!(
            mock.write_frame(b"|node3|"),
            Err(TransportError::Timeout)
        ));
        assert_eq!(mock.transactions(), 3);
        assert!(!mock.is_open());
    }

    #[test]
    fn test_open_and_close() {
        let mut mock = MockTransport::new();
        mock.open().unwrap();
        assert!(mock.is_open());
        mock.close();
        assert!(!mock.is_open());
    }

    #[test]
    fn test_flush_does_not_consume_script() {
        let mut mock = MockTransport::with_lines(["a"]);

        assert_eq!(mock.write_frame(&FrameCodec::encode("")).unwrap(), b"\r\n");
        assert_eq!(mock.remaining(), 1);
        assert_eq!(mock.commands(), vec![""]);
    }

    #[test]
    fn test_clones_share_state() {
        let handle = MockTransport::new();
        let mut owned = handle.clone();
        handle.push_timeout();
        handle.push_line("x");

        assert!(owned.write_frame(b"|lacrosse|").is_err());
        assert!(owned.write_frame(b"|lacrosse|").is_ok());
        assert_eq!(handle.commands(), vec!["lacrosse", "lacrosse"]);
    }
}
