//! Background activities of an interactive session
//!
//! The tokio tasks here stop when their [`CancellationToken`] fires. The
//! stdin reader is a plain thread because a blocking read cannot be
//! cancelled; it ends on EOF or when its receiver is dropped.

use std::io::{self, Read};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use sw_core::CallbackShell;

const INPUT_CHUNK_SIZE: usize = 1024;
const INPUT_CHANNEL_CAPACITY: usize = 64;
const CALLBACK_CHANNEL_CAPACITY: usize = 8;
/// Floor for the resize poll period; `interval_at` rejects zero
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Terminal dimensions as `(cols, rows)`
pub type TermSize = (u16, u16);

/// Poll the terminal size and send it whenever it changes
///
/// Exits without reporting when `query` fails or the receiver is gone.
pub fn spawn_resize_watcher<F>(
    cancel: CancellationToken,
    poll_interval: Duration,
    initial: TermSize,
    mut query: F,
    tx: mpsc::Sender<TermSize>,
) -> JoinHandle<()>
where
    F: FnMut() -> io::Result<TermSize> + Send + 'static,
{
    let poll_interval = poll_interval.max(MIN_POLL_INTERVAL);
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + poll_interval, poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last = initial;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let current = match query() {
                Ok(size) => size,
                Err(e) => {
                    tracing::debug!("Terminal size unavailable, stopping resize watcher: {}", e);
                    break;
                }
            };
            if current != last {
                tracing::trace!("Terminal resized to {}x{}", current.0, current.1);
                last = current;
                if tx.send(current).await.is_err() {
                    break;
                }
            }
        }
    })
}

/// Forward chunks read from `reader` until EOF or a read error
///
/// The returned receiver yields `None` once the reader is done.
pub fn spawn_input_reader<R>(mut reader: R) -> mpsc::Receiver<Vec<u8>>
where
    R: Read + Send + 'static,
{
    let (tx, rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);
    let spawned = std::thread::Builder::new()
        .name("sshw-stdin".into())
        .spawn(move || {
            let mut buf = [0u8; INPUT_CHUNK_SIZE];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.blocking_send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        tracing::debug!("Input read failed: {}", e);
                        break;
                    }
                }
            }
        });
    if let Err(e) = spawned {
        tracing::error!("Failed to start input reader: {}", e);
    }
    rx
}

/// Queue each callback command after its delay, in order
///
/// Each line is the command followed by a carriage return. The receiver
/// yields `None` once every command is queued or the session is cancelled.
pub fn spawn_callback_typist(
    cancel: CancellationToken,
    shells: Vec<CallbackShell>,
) -> (JoinHandle<()>, mpsc::Receiver<Vec<u8>>) {
    let (tx, rx) = mpsc::channel(CALLBACK_CHANNEL_CAPACITY);
    let handle = tokio::spawn(async move {
        for shell in shells {
            if !shell.delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(shell.delay) => {}
                }
            }
            tracing::debug!("Typing callback command: {}", shell.cmd);
            let mut line = shell.cmd.into_bytes();
            line.push(b'\r');
            if tx.send(line).await.is_err() {
                return;
            }
        }
    });
    (handle, rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[tokio::test(start_paused = true)]
    async fn test_resize_watcher_reports_changes_only() {
        let sizes = Arc::new(Mutex::new(VecDeque::from(vec![
            Ok((80, 24)),
            Ok((120, 40)),
            Ok((120, 40)),
            Ok((100, 30)),
            Err(io::Error::new(io::ErrorKind::Other, "no tty")),
        ])));
        let (tx, mut rx) = mpsc::channel(8);
        let source = Arc::clone(&sizes);
        let handle = spawn_resize_watcher(
            CancellationToken::new(),
            Duration::from_secs(1),
            (80, 24),
            move || {
                source
                    .lock()
                    .unwrap()
                    .pop_front()
                    .unwrap_or_else(|| Err(io::Error::new(io::ErrorKind::Other, "drained")))
            },
            tx,
        );

        assert_eq!(rx.recv().await, Some((120, 40)));
        assert_eq!(rx.recv().await, Some((100, 30)));
        assert_eq!(rx.recv().await, None);
        handle.await.unwrap();
        assert!(sizes.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resize_watcher_stops_on_cancel() {
        let cancel = CancellationToken::new();
        let (tx, _rx) = mpsc::channel(8);
        let handle = spawn_resize_watcher(
            cancel.clone(),
            Duration::from_secs(1),
            (80, 24),
            || Ok((80, 24)),
            tx,
        );
        tokio::time::sleep(Duration::from_secs(5)).await;
        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_input_reader_forwards_then_closes() {
        let mut rx = spawn_input_reader(io::Cursor::new(b"ls -la\n".to_vec()));
        assert_eq!(rx.recv().await.as_deref(), Some(&b"ls -la\n"[..]));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resize_watcher_survives_zero_interval() {
        let cancel = CancellationToken::new();
        let (tx, mut rx) = mpsc::channel(8);
        let handle = spawn_resize_watcher(
            cancel.clone(),
            Duration::ZERO,
            (80, 24),
            || Ok((100, 30)),
            tx,
        );

        assert_eq!(rx.recv().await, Some((100, 30)));
        cancel.cancel();
        handle.await.unwrap();
    }

    fn callbacks() -> Vec<CallbackShell> {
        vec![
            CallbackShell {
                cmd: "cd /srv".into(),
                delay: Duration::from_millis(500),
            },
            CallbackShell {
                cmd: "ls".into(),
                delay: Duration::ZERO,
            },
        ]
    }

    #[tokio::test(start_paused = true)]
    async fn test_callbacks_typed_in_order_after_delay() {
        let start = Instant::now();
        let (handle, mut rx) = spawn_callback_typist(CancellationToken::new(), callbacks());

        assert_eq!(rx.recv().await.as_deref(), Some(&b"cd /srv\r"[..]));
        assert!(start.elapsed() >= Duration::from_millis(500));
        assert_eq!(rx.recv().await.as_deref(), Some(&b"ls\r"[..]));
        assert_eq!(rx.recv().await, None);
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_typist_stops_on_cancel() {
        let cancel = CancellationToken::new();
        let (handle, mut rx) = spawn_callback_typist(cancel.clone(), callbacks());

        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(rx.recv().await, None);
    }
}
