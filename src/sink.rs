//! Write-side video handles.
//!
//! A [`SinkBackend`] opens a [`FrameSink`] for a path, FourCC, frame rate and
//! fixed frame size. [`FfmpegSinkBackend`] encodes real files through
//! FFmpeg; [`MemorySinkBackend`] records frames in memory so assembly can be
//! exercised without an encoder.
//!
//! A sink must be finished exactly once for its output to be complete.
//! Dropping an unfinished sink releases it without writing a trailer.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use ffmpeg_next::{
    Packet, Rational,
    codec::context::Context as CodecContext,
    encoder::video::Encoder as VideoEncoder,
    format::{Flags as FormatFlags, Pixel, context::Output},
    frame::Video as VideoFrame,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};

use crate::{codec::FourCc, conversion::BgrFrame, error::StitchError, utilities};

/// Parameters fixed when a sink is opened.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkConfig {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Output frame rate.
    pub fps: f64,
    /// Output codec.
    pub codec: FourCc,
}

/// An open video output accepting BGR frames of a fixed size.
pub trait FrameSink {
    /// Append one frame.
    fn write_frame(&mut self, frame: &BgrFrame) -> Result<(), StitchError>;

    /// Flush pending output and close the file.
    fn finish(self: Box<Self>) -> Result<(), StitchError>;
}

/// Opens [`FrameSink`]s.
pub trait SinkBackend: Send + Sync {
    /// Open a sink writing to `path`.
    ///
    /// Implementations must return [`StitchError::SinkUnavailable`] rather
    /// than a sink that silently discards frames.
    fn open(&self, path: &Path, config: &SinkConfig) -> Result<Box<dyn FrameSink>, StitchError>;
}

/// FFmpeg-backed sink backend.
///
/// The container format is inferred from the path's extension; the encoder
/// from the FourCC.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegSinkBackend;

impl SinkBackend for FfmpegSinkBackend {
    fn open(&self, path: &Path, config: &SinkConfig) -> Result<Box<dyn FrameSink>, StitchError> {
        Ok(Box::new(FfmpegSink::open(path, config)?))
    }
}

/// A video file being encoded by FFmpeg.
pub struct FfmpegSink {
    output: Output,
    encoder: VideoEncoder,
    scaler: ScalingContext,
    stream_index: usize,
    encoder_time_base: Rational,
    width: u32,
    height: u32,
    next_pts: i64,
    path: PathBuf,
    finished: bool,
}

fn frame_rate_rational(fps: f64) -> Rational {
    if fps.fract() == 0.0 && fps <= i32::MAX as f64 {
        Rational::new(fps as i32, 1)
    } else {
        Rational::from(fps)
    }
}

impl FfmpegSink {
    /// Open `path` for writing.
    ///
    /// # Errors
    ///
    /// [`StitchError::SinkUnavailable`] if the FourCC has no encoder, the
    /// container cannot be created at `path`, or the encoder rejects the
    /// configuration.
    pub fn open(path: &Path, config: &SinkConfig) -> Result<Self, StitchError> {
        let unavailable = |reason: String| StitchError::SinkUnavailable {
            path: path.to_path_buf(),
            reason,
        };

        log::debug!(
            "Opening video sink {} ({}x{}, codec={}, fps={})",
            path.display(),
            config.width,
            config.height,
            config.codec,
            config.fps,
        );

        ffmpeg_next::init().map_err(|e| unavailable(format!("FFmpeg initialisation failed: {e}")))?;

        let codec_id = config
            .codec
            .codec_id()
            .ok_or_else(|| unavailable(format!("no codec known for FourCC {:?}", config.codec.as_str())))?;
        let encoder_codec = ffmpeg_next::encoder::find(codec_id)
            .ok_or_else(|| unavailable(format!("encoder for {codec_id:?} not available")))?;

        let target_pixel = encoder_codec
            .video()
            .ok()
            .and_then(|video| video.formats())
            .and_then(|formats| {
                let formats: Vec<Pixel> = formats.collect();
                if formats.contains(&Pixel::YUV420P) {
                    Some(Pixel::YUV420P)
                } else {
                    formats.first().copied()
                }
            })
            .unwrap_or(Pixel::YUV420P);

        let mut output = ffmpeg_next::format::output(&path)
            .map_err(|e| unavailable(format!("cannot open output: {e}")))?;

        // Check if we need global header before adding the stream (avoids borrow conflict).
        let needs_global_header = output.format().flags().contains(FormatFlags::GLOBAL_HEADER);

        let mut stream = output
            .add_stream(encoder_codec)
            .map_err(|e| unavailable(format!("cannot add stream: {e}")))?;
        let stream_index = stream.index();

        let mut encoder = CodecContext::from_parameters(stream.parameters())
            .map_err(|e| unavailable(format!("cannot create codec context: {e}")))?
            .encoder()
            .video()
            .map_err(|e| unavailable(format!("cannot create video encoder: {e}")))?;

        let frame_rate = frame_rate_rational(config.fps);
        let encoder_time_base = frame_rate.invert();

        encoder.set_width(config.width);
        encoder.set_height(config.height);
        encoder.set_format(target_pixel);
        encoder.set_time_base(encoder_time_base);
        encoder.set_frame_rate(Some(frame_rate));

        if needs_global_header {
            unsafe {
                (*encoder.as_mut_ptr()).flags |=
                    ffmpeg_sys_next::AV_CODEC_FLAG_GLOBAL_HEADER as i32;
            }
        }

        let encoder = encoder
            .open_as(encoder_codec)
            .map_err(|e| unavailable(format!("cannot open encoder: {e}")))?;

        stream.set_parameters(&encoder);
        stream.set_time_base(encoder_time_base);

        output
            .write_header()
            .map_err(|e| unavailable(format!("cannot write header: {e}")))?;

        let scaler = ScalingContext::get(
            Pixel::BGR24,
            config.width,
            config.height,
            target_pixel,
            config.width,
            config.height,
            ScalingFlags::BILINEAR,
        )
        .map_err(|e| unavailable(format!("cannot create scaler: {e}")))?;

        Ok(Self {
            output,
            encoder,
            scaler,
            stream_index,
            encoder_time_base,
            width: config.width,
            height: config.height,
            next_pts: 0,
            path: path.to_path_buf(),
            finished: false,
        })
    }

    fn drain_packets(&mut self) -> Result<(), StitchError> {
        let stream_time_base = self
            .output
            .stream(self.stream_index)
            .map(|stream| stream.time_base())
            .ok_or_else(|| StitchError::VideoEncodeError("output stream disappeared".to_string()))?;

        let mut packet = Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(self.stream_index);
            packet.rescale_ts(self.encoder_time_base, stream_time_base);
            packet
                .write_interleaved(&mut self.output)
                .map_err(|e| StitchError::VideoEncodeError(format!("write packet failed: {e}")))?;
        }
        Ok(())
    }
}

impl FrameSink for FfmpegSink {
    fn write_frame(&mut self, frame: &BgrFrame) -> Result<(), StitchError> {
        if frame.width != self.width || frame.height != self.height {
            return Err(StitchError::VideoEncodeError(format!(
                "frame is {}x{}, sink expects {}x{}",
                frame.width, frame.height, self.width, self.height
            )));
        }

        let mut source = VideoFrame::new(Pixel::BGR24, self.width, self.height);
        utilities::buffer_to_frame(&frame.data, &mut source, 3);

        let mut converted = VideoFrame::empty();
        self.scaler
            .run(&source, &mut converted)
            .map_err(|e| StitchError::VideoEncodeError(format!("scaling failed: {e}")))?;

        converted.set_pts(Some(self.next_pts));
        self.next_pts += 1;

        self.encoder
            .send_frame(&converted)
            .map_err(|e| StitchError::VideoEncodeError(format!("send_frame failed: {e}")))?;
        self.drain_packets()
    }

    fn finish(mut self: Box<Self>) -> Result<(), StitchError> {
        self.encoder
            .send_eof()
            .map_err(|e| StitchError::VideoEncodeError(format!("send_eof failed: {e}")))?;
        self.drain_packets()?;
        self.output
            .write_trailer()
            .map_err(|e| StitchError::VideoEncodeError(format!("cannot write trailer: {e}")))?;
        self.finished = true;
        log::debug!("Finished {} frames to {}", self.next_pts, self.path.display());
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if !self.finished {
            log::warn!(
                "Releasing unfinished video sink {} after {} frames",
                self.path.display(),
                self.next_pts
            );
        }
    }
}

/// Everything a [`MemorySinkBackend`] has observed.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecording {
    /// Path and configuration of the last opened sink.
    pub opened: Option<(PathBuf, SinkConfig)>,
    /// Frames written to the last opened sink, in write order.
    pub frames: Vec<BgrFrame>,
    /// Whether the last opened sink was finished.
    pub finished: bool,
}

/// Sink backend that records frames in memory instead of encoding.
///
/// Clones share one recording.
#[derive(Debug, Clone, Default)]
pub struct MemorySinkBackend {
    recording: Arc<Mutex<MemoryRecording>>,
    refuse_open: bool,
}

impl MemorySinkBackend {
    /// A backend that accepts every configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose `open` always fails, like an unusable codec or path.
    pub fn refusing() -> Self {
        Self {
            refuse_open: true,
            ..Self::default()
        }
    }

    /// Snapshot of what has been recorded so far.
    pub fn recording(&self) -> MemoryRecording {
        lock(&self.recording).clone()
    }
}

fn lock(recording: &Mutex<MemoryRecording>) -> MutexGuard<'_, MemoryRecording> {
    recording
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SinkBackend for MemorySinkBackend {
    fn open(&self, path: &Path, config: &SinkConfig) -> Result<Box<dyn FrameSink>, StitchError> {
        if self.refuse_open {
            return Err(StitchError::SinkUnavailable {
                path: path.to_path_buf(),
                reason: "sink refused by backend".to_string(),
            });
        }

        *lock(&self.recording) = MemoryRecording {
            opened: Some((path.to_path_buf(), config.clone())),
            frames: Vec::new(),
            finished: false,
        };
        Ok(Box::new(MemorySink {
            recording: Arc::clone(&self.recording),
        }))
    }
}

struct MemorySink {
    recording: Arc<Mutex<MemoryRecording>>,
}

impl FrameSink for MemorySink {
    fn write_frame(&mut self, frame: &BgrFrame) -> Result<(), StitchError> {
        lock(&self.recording).frames.push(frame.clone());
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<(), StitchError> {
        lock(&self.recording).finished = true;
        Ok(())
    }
}
