use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use image::RgbaImage;
use tracing::{debug, info};

/// One rasterized capture-surface frame, tagged with the clock value its
/// draw used.
pub struct CapturedFrame {
    pub image: RgbaImage,
    /// Raw (unwrapped) milliseconds from the session's time source.
    pub timestamp_millis: f64,
}

/// An ordered frame sequence produced by one capture run, plus the frame
/// delay the export should advertise. Ephemeral: created by the
/// sequencer, consumed by the encoder handoff.
pub struct FrameCaptureSession {
    frames: Vec<CapturedFrame>,
    frame_delay: Duration,
}

impl FrameCaptureSession {
    pub(crate) fn new(frames: Vec<CapturedFrame>, frame_delay: Duration) -> Self {
        Self {
            frames,
            frame_delay,
        }
    }

    pub fn frames(&self) -> &[CapturedFrame] {
        &self.frames
    }

    pub fn frame_delay(&self) -> Duration {
        self.frame_delay
    }
}

/// The encoder collaborator: turns a capture session into GIF bytes.
///
/// Frame quantization dominates encode time, so each frame is palettized
/// on its own worker thread; the workers fan back in over a channel and
/// the assembled frames are written strictly in capture order. The worker
/// set is bounded by the session's frame count.
pub struct GifExporter {
    /// Quantization speed, 1 (best) to 30 (fastest); see
    /// [`gif::Frame::from_rgba_speed`].
    speed: i32,
}

impl Default for GifExporter {
    fn default() -> Self {
        Self { speed: 10 }
    }
}

impl GifExporter {
    pub fn new(speed: i32) -> Self {
        Self { speed }
    }

    /// Encodes the session into an in-memory GIF with infinite repeat.
    pub fn encode(&self, session: &FrameCaptureSession) -> Result<Vec<u8>> {
        let frames = session.frames();
        let Some(first) = frames.first() else {
            bail!("capture session holds no frames");
        };
        let (width, height) = first.image.dimensions();
        if width > u16::MAX as u32 || height > u16::MAX as u32 {
            bail!("capture surface {width}x{height} exceeds GIF dimensions");
        }
        // GIF stores delays in centiseconds.
        let delay = (session.frame_delay().as_millis() / 10) as u16;
        let speed = self.speed;

        let (done_tx, done_rx) = crossbeam_channel::bounded(frames.len());
        std::thread::scope(|scope| {
            for (index, frame) in frames.iter().enumerate() {
                let done_tx = done_tx.clone();
                scope.spawn(move || {
                    let mut pixels = frame.image.as_raw().clone();
                    let mut encoded = gif::Frame::from_rgba_speed(
                        width as u16,
                        height as u16,
                        &mut pixels,
                        speed,
                    );
                    encoded.delay = delay;
                    let _ = done_tx.send((index, encoded));
                });
            }
        });
        drop(done_tx);

        // Join: every worker has finished once the channel drains; restore
        // capture order before anything is written.
        let mut slots: Vec<Option<gif::Frame<'static>>> =
            (0..frames.len()).map(|_| None).collect();
        for (index, encoded) in done_rx.iter() {
            slots[index] = Some(encoded);
        }

        let mut bytes = Vec::new();
        {
            let mut encoder = gif::Encoder::new(&mut bytes, width as u16, height as u16, &[])
                .context("failed to start GIF encoder")?;
            encoder
                .set_repeat(gif::Repeat::Infinite)
                .context("failed to set GIF repeat")?;
            for slot in slots {
                let encoded = slot.expect("quantization worker dropped a frame");
                encoder
                    .write_frame(&encoded)
                    .context("failed to write GIF frame")?;
            }
        }

        debug!(
            frames = frames.len(),
            bytes = bytes.len(),
            "encoded capture session"
        );
        Ok(bytes)
    }

    /// Encodes the session and writes the result to `path`.
    pub fn export_to_path(&self, session: &FrameCaptureSession, path: &Path) -> Result<()> {
        let bytes = self.encode(session)?;
        fs::write(path, &bytes)
            .with_context(|| format!("failed to write GIF to {}", path.display()))?;
        info!(path = %path.display(), frames = session.frames().len(), "exported GIF");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(rgba: [u8; 4], timestamp_millis: f64) -> CapturedFrame {
        let image = RgbaImage::from_pixel(8, 8, image::Rgba(rgba));
        CapturedFrame {
            image,
            timestamp_millis,
        }
    }

    fn decode_frames(bytes: &[u8]) -> Vec<gif::Frame<'static>> {
        let mut options = gif::DecodeOptions::new();
        options.set_color_output(gif::ColorOutput::RGBA);
        let mut decoder = options.read_info(bytes).expect("valid GIF stream");
        let mut frames = Vec::new();
        while let Some(frame) = decoder.read_next_frame().expect("decodable frame") {
            frames.push(frame.clone());
        }
        frames
    }

    #[test]
    fn encodes_all_frames_in_capture_order() {
        let session = FrameCaptureSession::new(
            vec![
                solid_frame([255, 0, 0, 255], 0.0),
                solid_frame([0, 255, 0, 255], 100.0),
                solid_frame([0, 0, 255, 255], 200.0),
            ],
            Duration::from_millis(100),
        );

        let bytes = GifExporter::default().encode(&session).expect("encode");
        let frames = decode_frames(&bytes);
        assert_eq!(frames.len(), 3);

        // First pixel of each decoded frame tracks the input order.
        assert_eq!(&frames[0].buffer[0..3], &[255, 0, 0]);
        assert_eq!(&frames[1].buffer[0..3], &[0, 255, 0]);
        assert_eq!(&frames[2].buffer[0..3], &[0, 0, 255]);
    }

    #[test]
    fn frame_delay_lands_in_centiseconds() {
        let session = FrameCaptureSession::new(
            vec![solid_frame([10, 20, 30, 255], 0.0)],
            Duration::from_millis(100),
        );
        let bytes = GifExporter::default().encode(&session).expect("encode");
        let frames = decode_frames(&bytes);
        assert_eq!(frames[0].delay, 10);
    }

    #[test]
    fn ten_frame_session_round_trips() {
        let frames = (0..10)
            .map(|index| solid_frame([(index * 25) as u8, 0, 0, 255], index as f64 * 100.0))
            .collect();
        let session = FrameCaptureSession::new(frames, Duration::from_millis(100));
        let bytes = GifExporter::default().encode(&session).expect("encode");
        assert_eq!(decode_frames(&bytes).len(), 10);
    }

    #[test]
    fn empty_session_is_rejected() {
        let session = FrameCaptureSession::new(Vec::new(), Duration::from_millis(100));
        assert!(GifExporter::default().encode(&session).is_err());
    }

    #[test]
    fn export_writes_the_blob() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("out.gif");
        let session = FrameCaptureSession::new(
            vec![solid_frame([1, 2, 3, 255], 0.0)],
            Duration::from_millis(100),
        );
        GifExporter::default()
            .export_to_path(&session, &path)
            .expect("export");
        let bytes = fs::read(&path).expect("read back");
        assert!(bytes.starts_with(b"GIF89a"));
    }
}
