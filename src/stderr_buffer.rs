use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};
use tracing_subscriber::fmt::MakeWriter;

static BUFFER: Mutex<Option<Vec<String>>> = Mutex::new(None);

fn buffer() -> MutexGuard<'static, Option<Vec<String>>> {
    BUFFER.lock().unwrap_or_else(|e| e.into_inner())
}

/// Activate buffering. While active, log lines are stored instead of
/// printed to stderr, so they don't tear the TUI.
pub fn activate() {
    *buffer() = Some(Vec::new());
}

/// Deactivate buffering and return all collected lines.
pub fn drain() -> Vec<String> {
    buffer().take().unwrap_or_default()
}

/// Print every buffered line to stderr and stop buffering
pub fn flush_to_stderr() {
    for line in drain() {
        eprintln!("{}", line);
    }
}

/// `MakeWriter` for the tracing subscriber that routes each event through
/// the buffer when it is active.
#[derive(Clone, Copy, Debug, Default)]
pub struct BufferedStderr;

impl<'a> MakeWriter<'a> for BufferedStderr {
    type Writer = EventWriter;

    fn make_writer(&'a self) -> Self::Writer {
        EventWriter { bytes: Vec::new() }
    }
}

/// Collects one formatted event and hands it off when dropped
pub struct EventWriter {
    bytes: Vec<u8>,
}

impl Write for EventWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for EventWriter {
    fn drop(&mut self) {
        if self.bytes.is_empty() {
            return;
        }
        let line = String::from_utf8_lossy(&self.bytes);
        let line = line.trim_end_matches('\n');

        let mut guard = buffer();
        if let Some(buf) = guard.as_mut() {
            buf.push(line.to_string());
        } else {
            drop(guard);
            eprintln!("{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffered_lines_are_drained_in_order() {
        activate();
        {
            let mut w = BufferedStderr.make_writer();
            w.write_all(b"first\n").unwrap();
        }
        {
            let mut w = BufferedStderr.make_writer();
            w.write_all(b"second").unwrap();
            w.write_all(b" part\n").unwrap();
        }

        let lines = drain();
        assert_eq!(lines, vec!["first", "second part"]);
        // Buffering is off after drain
        assert!(drain().is_empty());
    }
}
