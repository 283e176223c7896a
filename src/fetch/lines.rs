//! Line splitting for tools that redraw progress with carriage returns.
//!
//! yt-dlp terminates progress updates with `\r` and everything else with
//! `\n`; both count as line ends here. Empty lines are skipped.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Lazy stream of output lines read from `R`.
#[derive(Debug)]
pub struct OutputLines<R> {
    reader: R,
    line: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> OutputLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::new(),
        }
    }

    /// Returns the next non-empty line, or `None` at end of stream.
    ///
    /// Invalid UTF-8 is replaced rather than rejected.
    ///
    /// # Errors
    ///
    /// Propagates read errors from the underlying stream.
    pub async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        loop {
            let (consumed, line_done, eof) = {
                let available = self.reader.fill_buf().await?;
                if available.is_empty() {
                    (0, false, true)
                } else if let Some(pos) = available.iter().position(|b| *b == b'\n' || *b == b'\r')
                {
                    self.line.extend_from_slice(&available[..pos]);
                    (pos + 1, true, false)
                } else {
                    self.line.extend_from_slice(available);
                    (available.len(), false, false)
                }
            };
            self.reader.consume(consumed);

            if eof {
                return Ok(self.take_line());
            }
            if line_done && let Some(line) = self.take_line() {
                return Ok(Some(line));
            }
        }
    }

    fn take_line(&mut self) -> Option<String> {
        if self.line.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.line).into_owned();
        self.line.clear();
        Some(line)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::OutputLines;
    use tokio::io::BufReader;

    async fn collect(input: &[u8], capacity: usize) -> Vec<String> {
        let mut lines = OutputLines::new(BufReader::with_capacity(capacity, input));
        let mut out = Vec::new();
        while let Some(line) = lines.next_line().await.unwrap() {
            out.push(line);
        }
        out
    }

    #[tokio::test]
    async fn test_splits_on_lf_cr_and_crlf() {
        let out = collect(b"one\ntwo\rthree\r\nfour", 64).await;
        assert_eq!(out, vec!["one", "two", "three", "four"]);
    }

    #[tokio::test]
    async fn test_lines_spanning_buffer_refills() {
        let out = collect(b"[download] Destination: a-long-file-name.mp4\nnext\n", 4).await;
        assert_eq!(out, vec!["[download] Destination: a-long-file-name.mp4", "next"]);
    }

    #[tokio::test]
    async fn test_skips_empty_lines() {
        let out = collect(b"\n\r\n\ra\n\n", 8).await;
        assert_eq!(out, vec!["a"]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_replaced() {
        let out = collect(b"ok \xff\n", 8).await;
        assert_eq!(out, vec!["ok \u{fffd}"]);
    }

    #[tokio::test]
    async fn test_empty_stream() {
        assert!(collect(b"", 8).await.is_empty());
    }
}
