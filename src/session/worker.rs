//! OCR worker thread for capture requests.
//!
//! Each accepted capture spawns one worker that runs the engine on the band
//! snapshot and sends the raw text back over a one-shot channel. The UI
//! thread polls the channel; it never blocks on the engine.

use anyhow::Result;
use image::GrayImage;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::ocr::{OcrEngine, OcrProgress};

/// State of a pending recognition when polled.
#[derive(Debug)]
pub enum WorkerPoll {
    Pending,
    Finished(Result<String>),
    /// Worker exited without sending a result (it panicked).
    Lost,
}

/// A recognition running on its worker thread.
pub struct PendingRecognition {
    job_id: u64,
    started_at: Instant,
    receiver: Receiver<Result<String>>,
}

impl PendingRecognition {
    pub fn job_id(&self) -> u64 {
        self.job_id
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Checks for a result without blocking.
    pub fn poll(&self) -> WorkerPoll {
        match self.receiver.try_recv() {
            Ok(result) => WorkerPoll::Finished(result),
            Err(TryRecvError::Empty) => WorkerPoll::Pending,
            Err(TryRecvError::Disconnected) => WorkerPoll::Lost,
        }
    }

    /// Blocks up to `timeout` for a result.
    pub fn wait(&self, timeout: Duration) -> WorkerPoll {
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => WorkerPoll::Finished(result),
            Err(RecvTimeoutError::Timeout) => WorkerPoll::Pending,
            Err(RecvTimeoutError::Disconnected) => WorkerPoll::Lost,
        }
    }
}

fn log_progress(job_id: u64, engine: &str, progress: &OcrProgress) {
    let msg = match progress {
        OcrProgress::Loading { language } => format!("loading language '{}'", language),
        OcrProgress::Recognizing { width, height } => {
            format!("recognizing {}x{} band", width, height)
        }
        OcrProgress::Done { chars } => format!("done ({} chars)", chars),
    };
    crate::log(&format!("OCR #{} [{}]: {}", job_id, engine, msg));
}

/// Spawns a worker that runs `engine` on `band`.
///
/// `band` is an owned snapshot, so redraws of the canvas after this call do
/// not affect what is recognized.
pub fn spawn_recognition(
    engine: Arc<dyn OcrEngine>,
    band: GrayImage,
    job_id: u64,
) -> PendingRecognition {
    let (sender, receiver) = channel();

    thread::spawn(move || {
        let engine_name = engine.name().to_string();
        let result = engine.recognize(&band, &mut |progress| {
            log_progress(job_id, &engine_name, &progress)
        });

        if let Err(e) = &result {
            crate::log(&format!("OCR #{} failed: {:#}", job_id, e));
        }

        // Receiver may already be gone if the session was dropped
        let _ = sender.send(result);
    });

    PendingRecognition {
        job_id,
        started_at: Instant::now(),
        receiver,
    }
}
