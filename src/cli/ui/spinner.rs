//! Spinner shown while a request is outstanding

use std::io::{self, Write};
use std::time::Duration;
use tokio::sync::oneshot;

const SPINNER_CHARS: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
const SPINNER_INTERVAL: Duration = Duration::from_millis(80);

/// Animated progress line. Stops and clears itself when dropped, so the
/// line is gone on every exit path of the guarded call.
pub struct Spinner {
    stop_tx: Option<oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl Spinner {
    pub fn start(message: impl Into<String>) -> Self {
        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(Self::run(message.into(), stop_rx));

        Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        }
    }

    fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        Self::clear_line();
    }

    async fn run(message: String, mut stop_rx: oneshot::Receiver<()>) {
        let mut frame = 0;
        let mut stdout = io::stdout();

        loop {
            let spinner_char = SPINNER_CHARS[frame % SPINNER_CHARS.len()];
            print!("\r{} {}", spinner_char, message);
            let _ = stdout.flush();
            frame += 1;

            tokio::select! {
                _ = tokio::time::sleep(SPINNER_INTERVAL) => {},
                _ = &mut stop_rx => break,
            }
        }
        Self::clear_line();
    }

    fn clear_line() {
        print!("\r\x1b[K");
        let _ = io::stdout().flush();
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Run a future with a spinner
pub async fn with_spinner<F, T>(message: impl Into<String>, future: F) -> T
where
    F: std::future::Future<Output = T>,
{
    let _spinner = Spinner::start(message);
    future.await
}
