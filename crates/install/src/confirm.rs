//! Cleanup confirmation service.
//!
//! Owns the buffered reader used for interactive confirmations and
//! enforces the single-outstanding-request contract. Constructed once per
//! run and passed to the writers; there is no timeout and no cancellation,
//! so a hung interactive prompt blocks the run.

use std::{
    io::Write as _,
    pin::Pin,
    sync::atomic::{AtomicBool, Ordering},
};

use {
    tokio::{
        io::{AsyncRead, AsyncReadExt},
        sync::Mutex,
    },
    tracing::info,
};

use crate::error::{Error, Result};

/// How confirmation requests resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmPolicy {
    /// Never prompt; every request is approved.
    AssumeYes,
    /// Never prompt; every request is declined, with a log line for
    /// visibility.
    NonInteractive,
    /// Prompt and block on operator input.
    Interactive,
}

pub struct ConfirmService {
    policy: ConfirmPolicy,
    pending: AtomicBool,
    reader: Mutex<LineReader>,
    last_answer: std::sync::Mutex<Option<String>>,
}

impl ConfirmService {
    /// Service reading interactive answers from stdin.
    pub fn new(policy: ConfirmPolicy) -> Self {
        Self::with_input(policy, tokio::io::stdin())
    }

    /// Service reading interactive answers from the given source.
    pub fn with_input(policy: ConfirmPolicy, input: impl AsyncRead + Send + 'static) -> Self {
        Self {
            policy,
            pending: AtomicBool::new(false),
            reader: Mutex::new(LineReader::new(Box::pin(input))),
            last_answer: std::sync::Mutex::new(None),
        }
    }

    /// Ask the operator to approve a destructive step.
    ///
    /// At most one confirmation may be outstanding; a second concurrent
    /// request is a contract violation and fails instead of queueing.
    pub async fn confirm(&self, message: &str) -> Result<bool> {
        match self.policy {
            ConfirmPolicy::AssumeYes => Ok(true),
            ConfirmPolicy::NonInteractive => {
                println!("{message} [y/N] (non-interactive mode: defaulting to No)");
                info!("confirmation declined (non-interactive mode)");
                Ok(false)
            },
            ConfirmPolicy::Interactive => self.prompt(message).await,
        }
    }

    async fn prompt(&self, message: &str) -> Result<bool> {
        if self.pending.swap(true, Ordering::SeqCst) {
            return Err(Error::ConfirmationOutstanding);
        }

        print!("{message} [y/N] ");
        let _ = std::io::stdout().flush();

        let answer = {
            let mut reader = self.reader.lock().await;
            reader.next_line().await
        };
        self.pending.store(false, Ordering::SeqCst);

        match answer? {
            Some(answer) => {
                let approved = is_yes(&answer);
                *self
                    .last_answer
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(answer);
                Ok(approved)
            },
            // Source fully drained: reuse the last seen answer.
            None => {
                let last = self
                    .last_answer
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                Ok(last.as_deref().is_some_and(is_yes))
            },
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Buffered line reader over an arbitrary async source.
///
/// Tolerates input delivered ahead of the prompt, input arriving byte at a
/// time, and end-of-input with leftover unterminated data (the leftover is
/// the final answer).
struct LineReader {
    input: Pin<Box<dyn AsyncRead + Send>>,
    buffer: Vec<u8>,
    eof: bool,
}

impl LineReader {
    fn new(input: Pin<Box<dyn AsyncRead + Send>>) -> Self {
        Self {
            input,
            buffer: Vec::new(),
            eof: false,
        }
    }

    /// The next newline-terminated answer, or trailing unterminated data
    /// once the source ends. `None` only after the source is fully drained.
    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        loop {
            if let Some(position) = self.buffer.iter().position(|byte| *byte == b'\n') {
                let mut line: Vec<u8> = self.buffer.drain(..=position).collect();
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
            }

            if self.eof {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                let trailing = std::mem::take(&mut self.buffer);
                return Ok(Some(String::from_utf8_lossy(&trailing).into_owned()));
            }

            let mut chunk = [0u8; 256];
            let read = self.input.read(&mut chunk).await?;
            if read == 0 {
                self.eof = true;
            } else {
                self.buffer.extend_from_slice(&chunk[..read]);
            }
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn assume_yes_never_reads() {
        let service = ConfirmService::with_input(ConfirmPolicy::AssumeYes, &b""[..]);
        assert!(service.confirm("Delete?").await.unwrap());
        assert!(service.confirm("Again?").await.unwrap());
    }

    #[tokio::test]
    async fn non_interactive_always_declines() {
        let service = ConfirmService::with_input(ConfirmPolicy::NonInteractive, &b"y\ny\n"[..]);
        assert!(!service.confirm("Delete?").await.unwrap());
        assert!(!service.confirm("Again?").await.unwrap());
    }

    #[tokio::test]
    async fn interactive_reads_queued_answers_in_order() {
        let service = ConfirmService::with_input(ConfirmPolicy::Interactive, &b"y\nno\nYES\n"[..]);
        assert!(service.confirm("First?").await.unwrap());
        assert!(!service.confirm("Second?").await.unwrap());
        assert!(service.confirm("Third?").await.unwrap());
    }

    #[tokio::test]
    async fn interactive_handles_byte_at_a_time_input() {
        let input = tokio_test::io::Builder::new()
            .read(b"y")
            .read(b"e")
            .read(b"s")
            .read(b"\r\n")
            .build();
        let service = ConfirmService::with_input(ConfirmPolicy::Interactive, input);
        assert!(service.confirm("Delete?").await.unwrap());
    }

    #[tokio::test]
    async fn eof_with_unterminated_data_is_the_final_answer() {
        let service = ConfirmService::with_input(ConfirmPolicy::Interactive, &b"y"[..]);
        assert!(service.confirm("Delete?").await.unwrap());
    }

    #[tokio::test]
    async fn eof_reuses_the_last_answer() {
        let service = ConfirmService::with_input(ConfirmPolicy::Interactive, &b"y\n"[..]);
        assert!(service.confirm("First?").await.unwrap());
        // Input is drained; the earlier yes stands in.
        assert!(service.confirm("Second?").await.unwrap());

        let declined = ConfirmService::with_input(ConfirmPolicy::Interactive, &b"n\n"[..]);
        assert!(!declined.confirm("First?").await.unwrap());
        assert!(!declined.confirm("Second?").await.unwrap());
    }

    #[tokio::test]
    async fn eof_with_no_prior_answer_declines() {
        let service = ConfirmService::with_input(ConfirmPolicy::Interactive, &b""[..]);
        assert!(!service.confirm("Delete?").await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn second_outstanding_confirmation_fails_loudly() {
        let input = tokio_test::io::Builder::new()
            .wait(Duration::from_millis(50))
            .read(b"y\n")
            .build();
        let service = ConfirmService::with_input(ConfirmPolicy::Interactive, input);

        let (first, second) = tokio::join!(service.confirm("First?"), service.confirm("Second?"));

        let results = [first, second];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .any(|r| matches!(r, Err(Error::ConfirmationOutstanding)))
        );
    }
}
