//! Scanning session.
//!
//! `PlateSession` owns everything a scanning window works with: the frame
//! stream, the canvas, the accepted-plate list, the manual input field, the
//! error message, and at most one pending recognition.

pub mod worker;

use image::RgbaImage;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::capture::{scale_to_canvas, FrameStream};
use crate::config::AppConfig;
use crate::ocr::{prepare_band, CaptureBand, OcrEngine};
use crate::plate::{first_valid_plate, normalize_manual_input, PlateFormat, PlateList, PlateOrigin};

use worker::{spawn_recognition, PendingRecognition, WorkerPoll};

/// Shown when OCR finished without any line matching a plate format.
pub const NO_PLATE_MESSAGE: &str = "No valid plate detected. Try again or use manual entry.";

/// Shown when manually entered text is not a valid plate.
pub const FORMAT_ERROR_MESSAGE: &str = "The entered format is not valid.";

/// Session parameters taken from the app configuration.
#[derive(Clone, Debug)]
pub struct SessionSettings {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub band_height_ratio: f32,
    pub binarize_threshold: u8,
    /// Directory to save capture bands into, if enabled.
    pub debug_dir: Option<PathBuf>,
}

impl SessionSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            canvas_width: config.canvas_width.max(1),
            canvas_height: config.canvas_height.max(1),
            band_height_ratio: config.band_height_ratio,
            binarize_threshold: config.binarize_threshold,
            debug_dir: config
                .save_debug_bands
                .then(crate::paths::get_debug_dir),
        }
    }
}

/// Answer to a capture request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureRequest {
    /// Band captured and handed to the OCR worker.
    Started { job_id: u64 },
    /// A recognition is already pending; request rejected.
    Busy,
    /// No frame has been drawn yet.
    NoFrame,
    /// Band captured but there is no OCR engine; the no-plate message is
    /// already shown and nothing is pending.
    NoEngine,
}

/// Result of a finished recognition, after format filtering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecognitionOutcome {
    Accepted { plate: String, format: PlateFormat },
    NoPlate,
    /// The engine failed; shown to the user like `NoPlate`.
    EngineFailed(String),
}

pub struct PlateSession {
    settings: SessionSettings,
    engine: Option<Arc<dyn OcrEngine>>,
    stream: Option<FrameStream>,
    video_error: Option<String>,
    canvas: Option<RgbaImage>,
    canvas_version: u64,
    plates: PlateList,
    error_message: Option<String>,
    manual_input: String,
    pending: Option<PendingRecognition>,
    next_job_id: u64,
}

impl PlateSession {
    /// Creates a session. Without an engine, capture requests fail with the
    /// no-plate message; manual entry still works.
    pub fn new(settings: SessionSettings, engine: Option<Arc<dyn OcrEngine>>) -> Self {
        Self {
            settings,
            engine,
            stream: None,
            video_error: None,
            canvas: None,
            canvas_version: 0,
            plates: PlateList::new(),
            error_message: None,
            manual_input: String::new(),
            pending: None,
            next_job_id: 1,
        }
    }

    // Video

    /// Starts drawing frames from `stream`, replacing any previous one.
    pub fn attach_stream(&mut self, stream: FrameStream) {
        self.detach_stream();
        self.video_error = None;
        self.stream = Some(stream);
    }

    /// Stops the frame stream and clears the canvas.
    pub fn detach_stream(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            crate::log("Video stream stopped");
        }
        self.canvas = None;
    }

    pub fn has_stream(&self) -> bool {
        self.stream.is_some()
    }

    /// Error that ended the video stream, if any.
    pub fn video_error(&self) -> Option<&str> {
        self.video_error.as_deref()
    }

    /// Pulls the newest frame from the stream onto the canvas.
    ///
    /// Returns true if the canvas changed. A stream failure is logged and the
    /// stream dropped; the session keeps working without video.
    pub fn pump_frames(&mut self) -> bool {
        let Some(stream) = &self.stream else {
            return false;
        };
        let poll = stream.poll();

        if let Some(source) = &poll.started {
            crate::log(&format!("Video stream started: {}", source));
        }

        let changed = match poll.frame {
            Some(frame) => {
                self.draw_frame(frame);
                true
            }
            None => false,
        };

        if let Some(msg) = poll.failure {
            crate::log(&format!("Video stream failed: {}", msg));
            self.video_error = Some(msg);
            if let Some(mut stream) = self.stream.take() {
                stream.stop();
            }
        }

        changed
    }

    /// Scales `frame` to the canvas size and makes it the current canvas.
    pub fn draw_frame(&mut self, frame: RgbaImage) {
        self.canvas = Some(scale_to_canvas(
            frame,
            self.settings.canvas_width,
            self.settings.canvas_height,
        ));
        self.canvas_version += 1;
    }

    pub fn canvas(&self) -> Option<&RgbaImage> {
        self.canvas.as_ref()
    }

    /// Incremented whenever the canvas pixels change.
    pub fn canvas_version(&self) -> u64 {
        self.canvas_version
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        (self.settings.canvas_width, self.settings.canvas_height)
    }

    /// Capture band for the current canvas size.
    pub fn capture_band(&self) -> CaptureBand {
        CaptureBand::for_canvas(
            self.settings.canvas_width,
            self.settings.canvas_height,
            self.settings.band_height_ratio,
        )
    }

    // Capture & recognition

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Binarizes the canvas, snapshots the capture band and starts OCR on it.
    ///
    /// Only one recognition runs at a time; requests while one is pending are
    /// rejected.
    pub fn request_capture(&mut self) -> CaptureRequest {
        if let Some(pending) = &self.pending {
            crate::log(&format!(
                "Capture ignored: recognition #{} still running ({:.1}s)",
                pending.job_id(),
                pending.elapsed().as_secs_f32()
            ));
            return CaptureRequest::Busy;
        }

        let Some(canvas) = self.canvas.as_mut() else {
            crate::log("Capture ignored: no video frame yet");
            return CaptureRequest::NoFrame;
        };

        let band = prepare_band(
            canvas,
            self.settings.binarize_threshold,
            self.settings.band_height_ratio,
        );
        self.canvas_version += 1;

        let job_id = self.next_job_id;
        self.next_job_id += 1;

        if let Some(dir) = &self.settings.debug_dir {
            let path = dir.join(format!(
                "band_{}_{}.png",
                chrono::Local::now().format("%Y%m%d_%H%M%S"),
                job_id
            ));
            match band.save(&path) {
                Ok(()) => crate::log(&format!("Saved capture band: {}", path.display())),
                Err(e) => crate::log(&format!("Could not save capture band: {}", e)),
            }
        }

        let Some(engine) = &self.engine else {
            crate::log("Capture failed: no OCR engine available");
            self.apply_outcome(RecognitionOutcome::EngineFailed(
                "no OCR engine available".to_string(),
            ));
            return CaptureRequest::NoEngine;
        };

        crate::log(&format!(
            "Capture #{}: {}x{} band sent to {}",
            job_id,
            band.width(),
            band.height(),
            engine.name()
        ));
        self.pending = Some(spawn_recognition(Arc::clone(engine), band, job_id));

        CaptureRequest::Started { job_id }
    }

    /// Applies a finished recognition, if there is one. Never blocks.
    pub fn poll_recognition(&mut self) -> Option<RecognitionOutcome> {
        let poll = self.pending.as_ref()?.poll();
        self.finish(poll)
    }

    /// Blocks up to `timeout` for the pending recognition and applies it.
    pub fn wait_for_recognition(&mut self, timeout: Duration) -> Option<RecognitionOutcome> {
        let poll = self.pending.as_ref()?.wait(timeout);
        self.finish(poll)
    }

    fn finish(&mut self, poll: WorkerPoll) -> Option<RecognitionOutcome> {
        let outcome = match poll {
            WorkerPoll::Pending => return None,
            WorkerPoll::Finished(Ok(text)) => match first_valid_plate(&text) {
                Some((plate, format)) => RecognitionOutcome::Accepted { plate, format },
                None => {
                    crate::log(&format!(
                        "No plate in OCR text: {:?}",
                        text.lines().map(str::trim).collect::<Vec<_>>()
                    ));
                    RecognitionOutcome::NoPlate
                }
            },
            WorkerPoll::Finished(Err(e)) => RecognitionOutcome::EngineFailed(format!("{:#}", e)),
            WorkerPoll::Lost => {
                RecognitionOutcome::EngineFailed("OCR worker exited without a result".to_string())
            }
        };

        self.pending = None;
        self.apply_outcome(outcome.clone());
        Some(outcome)
    }

    fn apply_outcome(&mut self, outcome: RecognitionOutcome) {
        match outcome {
            RecognitionOutcome::Accepted { plate, .. } => {
                self.display_plate(&plate, PlateOrigin::Ocr);
            }
            RecognitionOutcome::NoPlate => {
                self.error_message = Some(NO_PLATE_MESSAGE.to_string());
            }
            RecognitionOutcome::EngineFailed(e) => {
                crate::log(&format!("Recognition failed: {}", e));
                self.error_message = Some(NO_PLATE_MESSAGE.to_string());
            }
        }
    }

    // Manual entry

    #[cfg(test)]
    pub fn manual_input(&self) -> &str {
        &self.manual_input
    }

    pub fn manual_input_mut(&mut self) -> &mut String {
        &mut self.manual_input
    }

    /// Handles Enter in the manual input field.
    ///
    /// The input is trimmed and uppercased. A valid plate is displayed and the
    /// field cleared; otherwise the format error is shown and the field is left
    /// as typed.
    pub fn submit_manual(&mut self) -> bool {
        let plate = normalize_manual_input(&self.manual_input);
        if self.display_plate(&plate, PlateOrigin::Manual) {
            self.manual_input.clear();
            true
        } else {
            crate::log(&format!("Manual entry rejected: {:?}", plate));
            self.error_message = Some(FORMAT_ERROR_MESSAGE.to_string());
            false
        }
    }

    // Display

    /// Appends a plate to the list and clears the error message.
    ///
    /// Returns false (and changes nothing) if `plate` is not a valid plate.
    pub fn display_plate(&mut self, plate: &str, origin: PlateOrigin) -> bool {
        match self.plates.push(plate, origin) {
            Some(format) => {
                crate::log(&format!("Plate accepted ({}, {:?}): {}", format, origin, plate));
                self.error_message = None;
                true
            }
            None => false,
        }
    }

    pub fn plates(&self) -> &PlateList {
        &self.plates
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}

impl Drop for PlateSession {
    fn drop(&mut self) {
        self.detach_stream();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::FrameSource;
    use crate::ocr::OcrProgress;
    use anyhow::{anyhow, Result};
    use image::{GrayImage, Rgba};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc::{channel, Receiver, Sender};
    use std::sync::Mutex;

    const WAIT: Duration = Duration::from_secs(5);

    /// Returns fixed text and records the band sizes it was given.
    struct ScriptedEngine {
        text: String,
        calls: AtomicUsize,
        sizes: Mutex<Vec<(u32, u32)>>,
    }

    impl ScriptedEngine {
        fn new(text: &str) -> Arc<Self> {
            Arc::new(Self {
                text: text.to_string(),
                calls: AtomicUsize::new(0),
                sizes: Mutex::new(Vec::new()),
            })
        }
    }

    impl OcrEngine for ScriptedEngine {
        fn name(&self) -> &str {
            "scripted"
        }

        fn recognize(&self, img: &GrayImage, _: &mut dyn FnMut(OcrProgress)) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.sizes.lock().unwrap().push(img.dimensions());
            Ok(self.text.clone())
        }
    }

    /// Blocks until released, so a recognition stays pending.
    struct GatedEngine {
        gate: Mutex<Receiver<()>>,
    }

    impl GatedEngine {
        fn new() -> (Arc<Self>, Sender<()>) {
            let (tx, rx) = channel();
            (Arc::new(Self { gate: Mutex::new(rx) }), tx)
        }
    }

    impl OcrEngine for GatedEngine {
        fn name(&self) -> &str {
            "gated"
        }

        fn recognize(&self, _: &GrayImage, _: &mut dyn FnMut(OcrProgress)) -> Result<String> {
            let _ = self.gate.lock().unwrap().recv();
            Ok("123ABC".to_string())
        }
    }

    /// Like `GatedEngine`, but keeps a copy of the band it was given.
    struct RecordingGatedEngine {
        gate: Mutex<Receiver<()>>,
        seen: Mutex<Option<GrayImage>>,
    }

    impl RecordingGatedEngine {
        fn new() -> (Arc<Self>, Sender<()>) {
            let (tx, rx) = channel();
            let engine = Self {
                gate: Mutex::new(rx),
                seen: Mutex::new(None),
            };
            (Arc::new(engine), tx)
        }
    }

    impl OcrEngine for RecordingGatedEngine {
        fn name(&self) -> &str {
            "recording"
        }

        fn recognize(&self, img: &GrayImage, _: &mut dyn FnMut(OcrProgress)) -> Result<String> {
            let _ = self.gate.lock().unwrap().recv();
            *self.seen.lock().unwrap() = Some(img.clone());
            Ok("123ABC".to_string())
        }
    }

    struct BrokenEngine;

    impl OcrEngine for BrokenEngine {
        fn name(&self) -> &str {
            "broken"
        }

        fn recognize(&self, _: &GrayImage, _: &mut dyn FnMut(OcrProgress)) -> Result<String> {
            Err(anyhow!("tesseract exited with status 1"))
        }
    }

    fn settings() -> SessionSettings {
        SessionSettings {
            canvas_width: 64,
            canvas_height: 40,
            band_height_ratio: 0.15,
            binarize_threshold: 127,
            debug_dir: None,
        }
    }

    fn session_with(engine: Arc<dyn OcrEngine>) -> PlateSession {
        let mut session = PlateSession::new(settings(), Some(engine));
        session.draw_frame(RgbaImage::from_pixel(32, 20, Rgba([100, 140, 160, 255])));
        session
    }

    #[test]
    fn test_capture_accepts_first_valid_line() {
        let engine = ScriptedEngine::new("NOISE\n 12345 \nABC 123XY\n123ABC\n");
        let mut session = session_with(engine.clone());

        assert!(matches!(session.request_capture(), CaptureRequest::Started { .. }));
        let outcome = session.wait_for_recognition(WAIT);

        assert_eq!(
            outcome,
            Some(RecognitionOutcome::Accepted {
                plate: "ABC 123XY".to_string(),
                format: PlateFormat::Car
            })
        );
        assert_eq!(session.plates().texts(), vec!["ABC 123XY"]);
        assert_eq!(session.error_message(), None);
        assert!(!session.is_busy());
    }

    #[test]
    fn test_capture_sends_band_and_binarizes_canvas() {
        let engine = ScriptedEngine::new("AB123");
        let mut session = session_with(engine.clone());
        let version = session.canvas_version();

        session.request_capture();
        session.wait_for_recognition(WAIT);

        // 15% of 40 rows = 6 rows, full width
        assert_eq!(engine.sizes.lock().unwrap().as_slice(), &[(64, 6)]);
        assert!(session.canvas_version() > version);
        // (100, 140, 160) averages above 127
        assert_eq!(
            session.canvas().unwrap().get_pixel(0, 0),
            &Rgba([255, 255, 255, 255])
        );
    }

    #[test]
    fn test_redraw_during_recognition_does_not_change_band() {
        let (engine, release) = RecordingGatedEngine::new();
        let mut session = PlateSession::new(settings(), Some(engine.clone()));
        // Bright frame binarizes to white
        session.draw_frame(RgbaImage::from_pixel(64, 40, Rgba([200, 200, 200, 255])));

        assert!(matches!(session.request_capture(), CaptureRequest::Started { .. }));

        // Dark frame arrives while OCR is still running
        session.draw_frame(RgbaImage::from_pixel(64, 40, Rgba([20, 20, 20, 255])));
        assert_eq!(session.canvas().unwrap().get_pixel(0, 0), &Rgba([20, 20, 20, 255]));

        release.send(()).unwrap();
        let outcome = session.wait_for_recognition(WAIT);
        assert!(matches!(outcome, Some(RecognitionOutcome::Accepted { .. })));

        let seen = engine.seen.lock().unwrap().take().expect("engine saw a band");
        assert_eq!(seen.dimensions(), (64, 6));
        assert!(seen.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn test_capture_without_valid_line_shows_message() {
        let engine = ScriptedEngine::new("12345\nABCDE\n");
        let mut session = session_with(engine);
        session.display_plate("AB123", PlateOrigin::Manual);

        session.request_capture();
        let outcome = session.wait_for_recognition(WAIT);

        assert_eq!(outcome, Some(RecognitionOutcome::NoPlate));
        assert_eq!(session.error_message(), Some(NO_PLATE_MESSAGE));
        assert_eq!(session.plates().texts(), vec!["AB123"]);
    }

    #[test]
    fn test_engine_failure_shows_no_plate_message() {
        let mut session = session_with(Arc::new(BrokenEngine));

        session.request_capture();
        let outcome = session.wait_for_recognition(WAIT);

        assert!(matches!(outcome, Some(RecognitionOutcome::EngineFailed(_))));
        assert_eq!(session.error_message(), Some(NO_PLATE_MESSAGE));
        assert!(session.plates().is_empty());
    }

    #[test]
    fn test_missing_engine_shows_no_plate_message() {
        let mut session = PlateSession::new(settings(), None);
        session.draw_frame(RgbaImage::new(64, 40));

        assert_eq!(session.request_capture(), CaptureRequest::NoEngine);
        assert!(!session.is_busy());
        assert_eq!(session.error_message(), Some(NO_PLATE_MESSAGE));
    }

    #[test]
    fn test_second_capture_rejected_while_pending() {
        let (engine, release) = GatedEngine::new();
        let mut session = session_with(engine);

        assert_eq!(session.request_capture(), CaptureRequest::Started { job_id: 1 });
        assert!(session.is_busy());
        assert_eq!(session.request_capture(), CaptureRequest::Busy);
        assert_eq!(session.poll_recognition(), None);

        release.send(()).unwrap();
        let outcome = session.wait_for_recognition(WAIT);
        assert!(matches!(outcome, Some(RecognitionOutcome::Accepted { .. })));
        assert_eq!(session.plates().len(), 1);

        // Free again after the result was consumed
        release.send(()).unwrap();
        assert_eq!(session.request_capture(), CaptureRequest::Started { job_id: 2 });
    }

    #[test]
    fn test_capture_without_frame() {
        let engine = ScriptedEngine::new("AB123");
        let mut session = PlateSession::new(settings(), Some(engine.clone()));

        assert_eq!(session.request_capture(), CaptureRequest::NoFrame);
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_manual_entry_uppercases_and_clears() {
        let mut session = PlateSession::new(settings(), None);
        session.manual_input_mut().push_str("ab 123");

        assert!(session.submit_manual());
        assert_eq!(session.plates().texts(), vec!["AB 123"]);
        assert_eq!(session.plates().last().unwrap().origin, PlateOrigin::Manual);
        assert_eq!(session.manual_input(), "");
        assert_eq!(session.error_message(), None);
    }

    #[test]
    fn test_manual_entry_rejected_keeps_input() {
        let mut session = PlateSession::new(settings(), None);
        session.manual_input_mut().push_str("12AB3");

        assert!(!session.submit_manual());
        assert!(session.plates().is_empty());
        assert_eq!(session.manual_input(), "12AB3");
        assert_eq!(session.error_message(), Some(FORMAT_ERROR_MESSAGE));
    }

    #[test]
    fn test_display_clears_error() {
        let mut session = PlateSession::new(settings(), None);
        session.manual_input_mut().push_str("bad");
        session.submit_manual();
        assert!(session.error_message().is_some());

        assert!(session.display_plate("A123 ABC", PlateOrigin::Ocr));
        assert_eq!(session.error_message(), None);
    }

    struct SolidSource;

    impl FrameSource for SolidSource {
        fn name(&self) -> String {
            "solid".to_string()
        }

        fn next_frame(&mut self) -> Result<RgbaImage> {
            Ok(RgbaImage::from_pixel(16, 10, Rgba([10, 10, 10, 255])))
        }
    }

    fn pump_until<F: Fn(&PlateSession) -> bool>(session: &mut PlateSession, done: F) {
        let deadline = std::time::Instant::now() + WAIT;
        while !done(session) && std::time::Instant::now() < deadline {
            session.pump_frames();
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_stream_frames_scaled_onto_canvas() {
        let mut session = PlateSession::new(settings(), None);
        session.attach_stream(FrameStream::start(
            || Ok(Box::new(SolidSource) as Box<dyn FrameSource>),
            Duration::from_millis(1),
        ));

        pump_until(&mut session, |s| s.canvas().is_some());

        assert_eq!(session.canvas().unwrap().dimensions(), (64, 40));
        session.detach_stream();
        assert!(session.canvas().is_none());
        assert!(!session.has_stream());
    }

    #[test]
    fn test_stream_failure_keeps_manual_entry_working() {
        let mut session = PlateSession::new(settings(), None);
        session.attach_stream(FrameStream::start(
            || Err(anyhow!("camera access denied")),
            Duration::from_millis(1),
        ));

        pump_until(&mut session, |s| s.video_error().is_some());

        assert!(session.video_error().unwrap().contains("denied"));
        assert!(!session.has_stream());
        assert_eq!(session.error_message(), None);

        session.manual_input_mut().push_str("123abc");
        assert!(session.submit_manual());
    }
}
