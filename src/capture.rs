//! GIF frame-capture export.
//!
//! A capture renders a fixed number of frames at scheduled `time`/`progress`
//! values, then hands them to a background thread that encodes and writes
//! the GIF.

use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
    thread::JoinHandle,
};

use image::{
    Delay, Frame, RgbaImage,
    codecs::gif::{GifEncoder, Repeat},
};
use parking_lot::Mutex;

use crate::{Error, Result};

/// GIF frame delays are stored in hundredths of a second.
pub const MAX_FPS: u32 = 100;
pub const MAX_DURATION_SECS: f32 = 60.0;
/// Frames are held in memory until encoding, so a capture never exceeds this.
pub const MAX_FRAMES: u32 = 1200;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CaptureSettings {
    pub duration_secs: f32,
    pub fps: u32,
    /// Encoder speed/quality trade-off, 1 (best) to 30 (fastest).
    pub quality: i32,
}

impl CaptureSettings {
    pub fn new(duration_secs: f32, fps: u32) -> Self {
        Self {
            duration_secs,
            fps,
            quality: 10,
        }
    }

    /// Number of frames to render, capped at [`MAX_FRAMES`]. A NaN or
    /// negative duration gives zero frames.
    pub fn frame_count(&self) -> u32 {
        let frames = (self.duration_secs.max(0.0) * self.fps.min(MAX_FPS) as f32).round();
        (frames as u32).min(MAX_FRAMES)
    }

    /// Pulls `duration_secs` and `fps` into the range a capture can hold.
    /// A non-finite duration falls back to `fallback_secs`.
    pub fn bounded(self, fallback_secs: f32) -> Self {
        let duration_secs = if self.duration_secs.is_finite() {
            self.duration_secs.clamp(0.0, MAX_DURATION_SECS)
        } else {
            fallback_secs
        };
        Self {
            duration_secs,
            fps: self.fps.min(MAX_FPS),
            ..self
        }
    }

    pub fn schedule(&self) -> CaptureSchedule {
        CaptureSchedule {
            settings: *self,
            total: self.frame_count(),
            next: 0,
        }
    }
}

/// Uniform values for one captured frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTiming {
    pub index: u32,
    pub progress: f32,
    pub elapsed: f32,
    pub delay_ms: u32,
}

/// Iterates the frames of a capture. Frame `i` of `n` has
/// `progress = i / n` and `elapsed = (i / fps) * duration`.
#[derive(Clone, Debug)]
pub struct CaptureSchedule {
    settings: CaptureSettings,
    total: u32,
    next: u32,
}

impl CaptureSchedule {
    pub fn total(&self) -> u32 {
        self.total
    }
}

impl Iterator for CaptureSchedule {
    type Item = FrameTiming;

    fn next(&mut self) -> Option<FrameTiming> {
        if self.next >= self.total {
            return None;
        }
        let i = self.next;
        self.next += 1;

        let fps = self.settings.fps.clamp(1, MAX_FPS);
        Some(FrameTiming {
            index: i,
            progress: i as f32 / self.total as f32,
            elapsed: (i as f32 / fps as f32) * self.settings.duration_secs,
            delay_ms: 1000 / fps,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.total - self.next) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for CaptureSchedule {}

/// One rendered frame, tightly packed RGBA8.
#[derive(Clone, Debug)]
pub struct CapturedFrame {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl CapturedFrame {
    /// Builds a frame from a GPU readback whose rows are `padded_row` bytes
    /// apart. `bgra` swaps the red and blue channels.
    pub fn from_readback(width: u32, height: u32, padded_row: usize, data: &[u8], bgra: bool) -> Self {
        let mut rgba = unpad_rows(data, width as usize * 4, padded_row, height as usize);
        if bgra {
            rgba.chunks_exact_mut(4).for_each(|px| px.swap(0, 2));
        }
        Self { width, height, rgba }
    }
}

/// Copies `rows` rows of `row_bytes` out of a buffer whose rows are
/// `padded_row` bytes apart.
pub fn unpad_rows(data: &[u8], row_bytes: usize, padded_row: usize, rows: usize) -> Vec<u8> {
    if row_bytes == padded_row {
        return data[..row_bytes * rows].to_vec();
    }
    data.chunks(padded_row)
        .take(rows)
        .flat_map(|row| &row[..row_bytes])
        .copied()
        .collect()
}

/// Writes `frames` as an infinitely looping GIF.
pub fn encode_gif<W: Write>(frames: Vec<CapturedFrame>, settings: &CaptureSettings, writer: W) -> Result<()> {
    let first = frames.first().ok_or(Error::EmptyCapture)?;
    let expected = (first.width, first.height);

    let delay = Delay::from_numer_denom_ms(1000, settings.fps.clamp(1, MAX_FPS));
    let mut gif_frames = Vec::with_capacity(frames.len());
    for frame in frames {
        let found = (frame.width, frame.height);
        if found != expected {
            return Err(Error::FrameSizeMismatch { expected, found });
        }
        let image = RgbaImage::from_raw(frame.width, frame.height, frame.rgba)
            .ok_or(Error::FrameSizeMismatch { expected, found })?;
        gif_frames.push(Frame::from_parts(image, 0, 0, delay));
    }

    let mut encoder = GifEncoder::new_with_speed(writer, settings.quality.clamp(1, 30));
    encoder.set_repeat(Repeat::Infinite)?;
    encoder.encode_frames(gif_frames)?;
    Ok(())
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum CaptureStatus {
    #[default]
    Idle,
    Rendering { done: u32, total: u32 },
    Encoding { frames: u32 },
    Finished(PathBuf),
    Failed(String),
}

impl CaptureStatus {
    pub fn is_busy(&self) -> bool {
        matches!(self, CaptureStatus::Rendering { .. } | CaptureStatus::Encoding { .. })
    }
}

/// Tracks an export from the first rendered frame until the GIF lands on disk.
#[derive(Default)]
pub struct CaptureJob {
    status: Arc<Mutex<CaptureStatus>>,
    worker: Option<JoinHandle<()>>,
}

impl CaptureJob {
    pub fn status(&self) -> CaptureStatus {
        self.status.lock().clone()
    }

    /// Claims the job for a new capture of `total` frames. Returns `false`
    /// and leaves the status alone while another capture is rendering or
    /// encoding.
    pub fn begin(&self, total: u32) -> bool {
        let mut status = self.status.lock();
        if status.is_busy() {
            return false;
        }
        *status = CaptureStatus::Rendering { done: 0, total };
        true
    }

    pub fn set_rendering(&self, done: u32, total: u32) {
        *self.status.lock() = CaptureStatus::Rendering { done, total };
    }

    pub fn fail(&self, err: &Error) {
        log::error!("Capture failed: {err}");
        *self.status.lock() = CaptureStatus::Failed(err.to_string());
    }

    /// Encodes `frames` on a background thread and writes them to `path`.
    pub fn encode(&mut self, frames: Vec<CapturedFrame>, settings: CaptureSettings, path: PathBuf) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("Previous capture worker panicked");
            }
        }

        *self.status.lock() = CaptureStatus::Encoding {
            frames: frames.len() as u32,
        };
        let status = Arc::clone(&self.status);

        self.worker = Some(std::thread::spawn(move || {
            let result = write_gif(frames, &settings, &path);
            let mut status = status.lock();
            *status = match result {
                Ok(()) => {
                    log::info!("Saved capture to {}", path.display());
                    CaptureStatus::Finished(path)
                }
                Err(err) => {
                    log::error!("Capture failed: {err}");
                    CaptureStatus::Failed(err.to_string())
                }
            };
        }));
    }

    /// Blocks until the encoder thread, if any, has finished.
    pub fn wait(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("Capture worker panicked");
            }
        }
    }
}

impl Drop for CaptureJob {
    fn drop(&mut self) {
        self.wait();
    }
}

/// Encodes in memory first so a failed encode leaves nothing on disk.
fn write_gif(frames: Vec<CapturedFrame>, settings: &CaptureSettings, path: &Path) -> Result<()> {
    let mut gif = Vec::new();
    encode_gif(frames, settings, &mut gif)?;
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, gif)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> CapturedFrame {
        CapturedFrame {
            width,
            height,
            rgba: rgba.repeat((width * height) as usize),
        }
    }

    #[test]
    fn schedule_maps_frames_to_progress_and_time() {
        let frames: Vec<_> = CaptureSettings::new(2.0, 50).schedule().collect();
        assert_eq!(frames.len(), 100);
        assert_eq!(frames[0].progress, 0.0);
        assert_eq!(frames[50].progress, 0.5);
        assert!((frames[50].elapsed - 2.0).abs() < 1e-6);
        assert!(frames.iter().all(|f| f.delay_ms == 20 && f.progress < 1.0));
    }

    #[test]
    fn empty_schedule_yields_nothing() {
        assert_eq!(CaptureSettings::new(0.0, 20).schedule().count(), 0);
        assert_eq!(CaptureSettings::new(3.0, 0).schedule().len(), 0);
    }

    #[test]
    fn oversized_captures_are_capped() {
        let settings = CaptureSettings::new(f32::INFINITY, 20);
        assert_eq!(settings.frame_count(), MAX_FRAMES);
        assert_eq!(CaptureSettings::new(5.0, u32::MAX).frame_count(), 500);

        let first = CaptureSettings::new(1.0, 2000).schedule().next().unwrap();
        assert_eq!(first.delay_ms, 10);

        let bounded = CaptureSettings::new(f32::INFINITY, 4_000_000_000).bounded(2.0);
        assert_eq!(bounded.duration_secs, 2.0);
        assert_eq!(bounded.fps, MAX_FPS);
        assert_eq!(CaptureSettings::new(1e9, 20).bounded(2.0).duration_secs, MAX_DURATION_SECS);
        assert_eq!(CaptureSettings::new(f32::NAN, 20).frame_count(), 0);
    }

    #[test]
    fn readback_strips_padding_and_swizzles() {
        // 2x2 pixels, rows padded to 12 bytes.
        let data = [
            1, 2, 3, 4, 5, 6, 7, 8, 0, 0, 0, 0, //
            9, 10, 11, 12, 13, 14, 15, 16, 0, 0, 0, 0,
        ];
        let frame = CapturedFrame::from_readback(2, 2, 12, &data, true);
        assert_eq!(
            frame.rgba,
            vec![3, 2, 1, 4, 7, 6, 5, 8, 11, 10, 9, 12, 15, 14, 13, 16]
        );
    }

    #[test]
    fn encodes_a_looping_gif() {
        let frames = vec![solid(4, 4, [255, 0, 0, 255]), solid(4, 4, [0, 0, 255, 255])];
        let mut out = Vec::new();
        encode_gif(frames, &CaptureSettings::new(1.0, 2), &mut out).unwrap();
        assert_eq!(&out[..6], b"GIF89a");
    }

    #[test]
    fn rejects_empty_and_mismatched_captures() {
        let settings = CaptureSettings::new(1.0, 10);
        assert!(matches!(
            encode_gif(vec![], &settings, Vec::new()),
            Err(Error::EmptyCapture)
        ));
        let frames = vec![solid(4, 4, [0; 4]), solid(2, 2, [0; 4])];
        assert!(matches!(
            encode_gif(frames, &settings, Vec::new()),
            Err(Error::FrameSizeMismatch { expected: (4, 4), found: (2, 2) })
        ));
    }

    #[test]
    fn background_job_writes_the_file() {
        let dir = std::env::temp_dir().join(format!("particle_scenes_capture_{}", std::process::id()));
        let path = dir.join("animation.gif");
        let mut job = CaptureJob::default();
        job.encode(vec![solid(2, 2, [0, 255, 0, 255])], CaptureSettings::new(1.0, 1), path.clone());
        job.wait();

        assert_eq!(job.status(), CaptureStatus::Finished(path.clone()));
        assert!(path.exists());
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn failed_encode_leaves_no_file() {
        let dir = std::env::temp_dir().join(format!("particle_scenes_failed_{}", std::process::id()));
        let path = dir.join("animationGrid.gif");
        let frames = vec![solid(4, 4, [0; 4]), solid(2, 2, [0; 4])];
        assert!(write_gif(frames, &CaptureSettings::new(1.0, 10), &path).is_err());
        assert!(!path.exists());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn begin_is_refused_while_busy() {
        let job = CaptureJob::default();
        assert!(job.begin(40));
        assert_eq!(job.status(), CaptureStatus::Rendering { done: 0, total: 40 });

        assert!(!job.begin(10));
        assert_eq!(job.status(), CaptureStatus::Rendering { done: 0, total: 40 });

        *job.status.lock() = CaptureStatus::Encoding { frames: 40 };
        assert!(!job.begin(10));
        assert_eq!(job.status(), CaptureStatus::Encoding { frames: 40 });

        job.fail(&Error::EmptyCapture);
        assert!(job.begin(10));
    }
}
