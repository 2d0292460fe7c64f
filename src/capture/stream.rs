//! Background frame streaming.
//!
//! A frame thread opens the source and stores each frame in a single slot,
//! one frame per interval. A frame the UI thread has not taken yet is
//! replaced, so at most one frame is held no matter how rarely it polls.
//! Start and failure notices go over a channel.

use anyhow::Result;
use image::RgbaImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::FrameSource;

/// How long `stop` waits for the frame thread before detaching it.
const STOP_TIMEOUT: Duration = Duration::from_millis(500);

/// Notice from the frame thread.
#[derive(Debug)]
pub enum StreamEvent {
    /// Source opened successfully.
    Started { source: String },
    /// Source could not be opened or stopped producing frames.
    /// The thread exits after sending this.
    Failed(String),
}

/// Result of draining the stream once.
#[derive(Debug, Default)]
pub struct StreamPoll {
    /// Newest frame since the last poll, older ones are dropped.
    pub frame: Option<RgbaImage>,
    pub started: Option<String>,
    pub failure: Option<String>,
}

pub struct FrameStream {
    events: Receiver<StreamEvent>,
    latest: Arc<Mutex<Option<RgbaImage>>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FrameStream {
    /// Spawns the frame thread.
    ///
    /// `open` runs on the frame thread, so sources that must stay on the
    /// thread that created them (camera handles) are fine.
    pub fn start<F>(open: F, interval: Duration) -> Self
    where
        F: FnOnce() -> Result<Box<dyn FrameSource>> + Send + 'static,
    {
        let (sender, events) = channel();
        let latest = Arc::new(Mutex::new(None));
        let stop = Arc::new(AtomicBool::new(false));
        let slot = Arc::clone(&latest);
        let stop_flag = Arc::clone(&stop);

        let handle = thread::spawn(move || {
            let mut source = match open() {
                Ok(source) => source,
                Err(e) => {
                    let _ = sender.send(StreamEvent::Failed(format!("{:#}", e)));
                    return;
                }
            };

            if sender
                .send(StreamEvent::Started {
                    source: source.name(),
                })
                .is_err()
            {
                return;
            }

            while !stop_flag.load(Ordering::SeqCst) {
                match source.next_frame() {
                    Ok(frame) => match slot.lock() {
                        Ok(mut latest) => *latest = Some(frame),
                        // UI thread panicked holding the slot
                        Err(_) => break,
                    },
                    Err(e) => {
                        let _ = sender.send(StreamEvent::Failed(format!("{:#}", e)));
                        break;
                    }
                }
                thread::sleep(interval);
            }
        });

        Self {
            events,
            latest,
            stop,
            handle: Some(handle),
        }
    }

    /// Takes the newest frame and drains pending notices without blocking.
    pub fn poll(&self) -> StreamPoll {
        let mut poll = StreamPoll {
            frame: self.latest.lock().ok().and_then(|mut latest| latest.take()),
            ..StreamPoll::default()
        };
        loop {
            match self.events.try_recv() {
                Ok(StreamEvent::Started { source }) => poll.started = Some(source),
                Ok(StreamEvent::Failed(msg)) => poll.failure = Some(msg),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        poll
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signals the frame thread to stop and waits up to `STOP_TIMEOUT` for it.
    ///
    /// A thread stuck inside the source (a camera read that never returns) is
    /// detached; it exits on its own once the read comes back.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);

        let deadline = Instant::now() + STOP_TIMEOUT;
        while self.is_running() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }

        let Some(handle) = self.handle.take() else {
            return;
        };
        if !handle.is_finished() {
            crate::log(&format!(
                "Frame thread did not stop within {:?}, detaching it",
                STOP_TIMEOUT
            ));
            return;
        }
        if handle.join().is_err() {
            crate::log("Frame thread panicked");
        }
    }
}

impl Drop for FrameStream {
    fn drop(&mut self) {
        self.stop();
    }
}
