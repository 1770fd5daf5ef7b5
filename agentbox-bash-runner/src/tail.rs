use std::collections::VecDeque;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Rolling buffer of the most recent output of a long-running process.
///
/// A background task drains the process's broadcast stream so the channel
/// never lags, keeping only the last `capacity` bytes. The task is aborted
/// when the tail is dropped.
#[derive(Debug)]
pub struct OutputTail {
    buffer: Arc<StdMutex<VecDeque<u8>>>,
    task: JoinHandle<()>,
}

impl OutputTail {
    pub fn spawn(mut output_rx: broadcast::Receiver<Vec<u8>>, capacity: usize) -> Self {
        let buffer = Arc::new(StdMutex::new(VecDeque::with_capacity(capacity)));
        let sink = Arc::clone(&buffer);
        let task = tokio::spawn(async move {
            loop {
                match output_rx.recv().await {
                    Ok(chunk) => {
                        let Ok(mut guard) = sink.lock() else {
                            break;
                        };
                        guard.extend(chunk);
                        let excess = guard.len().saturating_sub(capacity);
                        guard.drain(..excess);
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Self { buffer, task }
    }

    /// Recent output decoded lossily as UTF-8.
    pub fn snapshot(&self) -> String {
        self.buffer
            .lock()
            .map(|guard| {
                let (front, back) = guard.as_slices();
                let mut bytes = Vec::with_capacity(front.len() + back.len());
                bytes.extend_from_slice(front);
                bytes.extend_from_slice(back);
                String::from_utf8_lossy(&bytes).into_owned()
            })
            .unwrap_or_default()
    }
}

impl Drop for OutputTail {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn keeps_only_most_recent_bytes() {
        let (tx, rx) = broadcast::channel(16);
        let tail = OutputTail::spawn(rx, 5);
        tx.send(b"abc".to_vec()).unwrap();
        tx.send(b"defgh".to_vec()).unwrap();

        let mut snapshot = String::new();
        for _ in 0..50 {
            snapshot = tail.snapshot();
            if snapshot == "defgh" {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(snapshot, "defgh");
    }
}
