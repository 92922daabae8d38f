//! Progress reporting support (requires `progress` feature)
//!
//! A [`Spinner`] drains the lossy status channel installed with
//! [`IngestOptions::with_progress`](crate::IngestOptions::with_progress) and
//! shows the most recent message.

use crossbeam_channel::{Receiver, RecvTimeoutError};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

const MAX_MESSAGE_CHARS: usize = 60;
const TICK: Duration = Duration::from_millis(100);

/// Create a default spinner for status messages
#[must_use]
pub fn create_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb
}

/// A spinner following a progress channel on a background thread.
///
/// Stops when [`Spinner::finish`] is called, when dropped, or when every
/// sender has gone away.
#[derive(Debug)]
pub struct Spinner {
    bar: ProgressBar,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Spinner {
    /// Follow `receiver` with a [`create_spinner`] bar.
    #[must_use]
    pub fn follow(receiver: Receiver<String>) -> Self {
        let bar = create_spinner();
        bar.enable_steady_tick(TICK);
        Self::with_bar(receiver, bar)
    }

    /// Follow `receiver` with a caller-supplied bar.
    #[must_use]
    pub fn with_bar(receiver: Receiver<String>, bar: ProgressBar) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let handle = {
            let bar = bar.clone();
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    match receiver.recv_timeout(TICK) {
                        Ok(msg) => bar.set_message(truncate(&msg, MAX_MESSAGE_CHARS)),
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })
        };
        Self {
            bar,
            stop,
            handle: Some(handle),
        }
    }

    /// The underlying bar, e.g. to `suspend` it around a prompt.
    #[must_use]
    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }

    /// Stop following and clear the spinner.
    pub fn finish(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.bar.finish_and_clear();
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn truncate(msg: &str, max: usize) -> String {
    if msg.chars().count() <= max {
        return msg.to_string();
    }
    let mut out: String = msg.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}
