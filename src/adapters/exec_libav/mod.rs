//! FFmpeg execution adapter using libav bindings
//!
//! Cuts one window out of a source and re-encodes it into a standalone MP4.
//! Video is decoded and re-encoded with the configured encoder (H.264 by
//! default); audio is passed through when the MP4 muxer can carry it.
//! Segments carry their provenance tag in the container metadata. Previews
//! are the same job starting at zero and scaled to a fixed width.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::adapters::probe_libav::SEGMENT_TAG_KEY;
use crate::domain::errors::DomainError;
use crate::domain::model::*;
use crate::ports::*;
use ffmpeg_next as ffmpeg;
use ffmpeg::codec::{self, encoder, Id};
use ffmpeg::format::{self, Pixel};
use ffmpeg::software::scaling;
use ffmpeg::util::frame;
use ffmpeg::{media, picture, rescale, Dictionary, Packet, Rational, Rescale};

/// Audio codecs that can be copied into an MP4 container as-is
const MP4_AUDIO_CODECS: &[Id] = &[Id::AAC, Id::MP3, Id::AC3, Id::EAC3, Id::OPUS, Id::ALAC, Id::FLAC];

/// FFmpeg execution adapter using libav FFI
pub struct EncodeLibavAdapter {
    thread_count: usize,
}

impl EncodeLibavAdapter {
    pub fn new() -> Result<Self, DomainError> {
        ffmpeg::init().map_err(|e| {
            DomainError::InternalError(format!("FFmpeg initialization failed: {}", e))
        })?;

        Ok(Self {
            thread_count: Self::optimize_thread_count(),
        })
    }

    /// Use 75% of CPU cores, between 1 and 16 threads
    fn optimize_thread_count() -> usize {
        let cpu_count = num_cpus::get();
        let optimal_threads = (cpu_count as f64 * 0.75).ceil() as usize;
        optimal_threads.clamp(1, 16)
    }

    fn effective_threads(&self, settings: &EncodeSettings) -> usize {
        if settings.threads > 0 {
            settings.threads
        } else {
            self.thread_count
        }
    }
}

#[async_trait]
impl EncodePort for EncodeLibavAdapter {
    async fn encode_segment(
        &self,
        segment: &Segment,
        output_path: &str,
        settings: &EncodeSettings,
    ) -> Result<EncodedSegment, DomainError> {
        let job = SegmentJob {
            source: segment.source.to_string_lossy().to_string(),
            output: output_path.to_string(),
            start: segment.start,
            end: segment.end,
            width: None,
            tag: Some(segment.tag().to_string()),
            settings: settings.clone(),
            threads: self.effective_threads(settings),
        };

        run_blocking(job).await?.map_err(|reason| DomainError::EncodeFailure {
            path: segment.source.to_string_lossy().to_string(),
            index: segment.index,
            reason,
        })
    }

    async fn encode_preview(
        &self,
        request: &PreviewRequest,
        output_path: &str,
        settings: &EncodeSettings,
    ) -> Result<EncodedSegment, DomainError> {
        let job = SegmentJob {
            source: request.source.to_string_lossy().to_string(),
            output: output_path.to_string(),
            start: 0.0,
            end: request.length,
            width: Some(request.width),
            tag: None,
            settings: settings.clone(),
            threads: self.effective_threads(settings),
        };

        run_blocking(job).await?.map_err(|reason| DomainError::EncodeFailure {
            path: request.source.to_string_lossy().to_string(),
            index: 0,
            reason: format!("preview: {}", reason),
        })
    }
}

async fn run_blocking(job: SegmentJob) -> Result<Result<EncodedSegment, String>, DomainError> {
    tokio::task::spawn_blocking(move || job.run())
        .await
        .map_err(|e| DomainError::InternalError(format!("Encode task failed: {}", e)))
}

/// Let the MP4 muxer choose the codec tag of a copied stream; tags from
/// other containers (AVI's numeric audio tags) are rejected by it.
fn clear_codec_tag(stream: &mut format::stream::StreamMut) {
    // SAFETY: the pointer is the stream's own codec parameters, valid for as
    // long as `stream` borrows the output context mutably.
    unsafe {
        (*stream.parameters().as_mut_ptr()).codec_tag = 0;
    }
}

/// Even output size for a target width, keeping the source aspect ratio
fn scaled_size(width: u32, height: u32, target_width: Option<u32>) -> (u32, u32) {
    match target_width {
        Some(target) if width > 0 => {
            let scaled = (f64::from(height) * f64::from(target) / f64::from(width)).round() as u32;
            (target & !1, (scaled & !1).max(2))
        }
        _ => (width, height),
    }
}

/// Everything a blocking encode needs, owned so it can move to another thread
struct SegmentJob {
    source: String,
    output: String,
    start: f64,
    end: f64,
    /// Scale to this width, height following the aspect ratio
    width: Option<u32>,
    /// Provenance written to the container metadata
    tag: Option<String>,
    settings: EncodeSettings,
    threads: usize,
}

/// Audio pass-through state
struct AudioCopy {
    input_index: usize,
    output_index: usize,
    input_time_base: Rational,
    output_time_base: Rational,
    start_pts: i64,
    end_pts: i64,
}

impl SegmentJob {
    fn run(self) -> Result<EncodedSegment, String> {
        let mut ictx = format::input(&self.source)
            .map_err(|e| format!("failed to open source: {}", e))?;

        let (video_index, video_time_base, video_params, frame_rate) = {
            let stream = ictx
                .streams()
                .best(media::Type::Video)
                .ok_or_else(|| "no video stream found".to_string())?;
            (
                stream.index(),
                stream.time_base(),
                stream.parameters(),
                stream.avg_frame_rate(),
            )
        };

        let audio_input = ictx
            .streams()
            .best(media::Type::Audio)
            .map(|stream| (stream.index(), stream.time_base(), stream.parameters()));

        let decoder = codec::context::Context::from_parameters(video_params)
            .and_then(|ctx| ctx.decoder().video())
            .map_err(|e| format!("failed to create video decoder: {}", e))?;

        let codec = encoder::find_by_name(&self.settings.video_codec)
            .or_else(|| {
                warn!(
                    "Encoder {} not available, falling back to the default H.264 encoder",
                    self.settings.video_codec
                );
                encoder::find(Id::H264)
            })
            .ok_or_else(|| "no H.264 encoder available".to_string())?;

        let mut octx = format::output_as(&self.output, "mp4")
            .map_err(|e| format!("failed to create output: {}", e))?;
        let global_header = octx.format().flags().contains(format::Flags::GLOBAL_HEADER);
        let (out_width, out_height) = scaled_size(decoder.width(), decoder.height(), self.width);

        // Video encoder, always YUV420P for broad playback support
        let (out_video_index, encoder) = {
            let mut ost = octx
                .add_stream(codec)
                .map_err(|e| format!("failed to add video stream: {}", e))?;

            let mut video_encoder = codec::context::Context::new_with_codec(codec)
                .encoder()
                .video()
                .map_err(|e| format!("failed to create video encoder: {}", e))?;

            video_encoder.set_width(out_width);
            video_encoder.set_height(out_height);
            video_encoder.set_aspect_ratio(decoder.aspect_ratio());
            video_encoder.set_format(Pixel::YUV420P);
            video_encoder.set_time_base(video_time_base);
            if frame_rate.numerator() > 0 && frame_rate.denominator() > 0 {
                video_encoder.set_frame_rate(Some(frame_rate));
            }
            if global_header {
                video_encoder.set_flags(codec::Flags::GLOBAL_HEADER);
            }

            let mut options = Dictionary::new();
            options.set("preset", &self.settings.preset);
            options.set("crf", &self.settings.crf.to_string());
            options.set("threads", &self.threads.to_string());

            let opened = video_encoder
                .open_with(options)
                .map_err(|e| format!("failed to open video encoder: {}", e))?;
            ost.set_parameters(&opened);
            (ost.index(), opened)
        };

        let mut audio = None;
        if let Some((input_index, input_time_base, params)) = audio_input {
            if MP4_AUDIO_CODECS.contains(&params.id()) {
                let mut ost = octx
                    .add_stream(encoder::find(Id::None))
                    .map_err(|e| format!("failed to add audio stream: {}", e))?;
                ost.set_parameters(params);
                clear_codec_tag(&mut ost);
                audio = Some((input_index, ost.index(), input_time_base));
            } else {
                warn!(
                    "Dropping audio of {}: codec {:?} cannot be copied into MP4",
                    self.source,
                    params.id()
                );
            }
        }

        if let Some(tag) = &self.tag {
            let mut metadata = Dictionary::new();
            metadata.set(SEGMENT_TAG_KEY, tag);
            octx.set_metadata(metadata);
        }

        octx.write_header()
            .map_err(|e| format!("failed to write header: {}", e))?;

        let start_us = (self.start * ffmpeg::ffi::AV_TIME_BASE as f64) as i64;
        let end_us = (self.end * ffmpeg::ffi::AV_TIME_BASE as f64) as i64;

        let out_video_time_base = octx
            .stream(out_video_index)
            .map(|stream| stream.time_base())
            .ok_or_else(|| "output video stream missing".to_string())?;

        let mut audio = match audio {
            Some((input_index, output_index, input_time_base)) => {
                let output_time_base = octx
                    .stream(output_index)
                    .map(|stream| stream.time_base())
                    .ok_or_else(|| "output audio stream missing".to_string())?;
                Some(AudioCopy {
                    input_index,
                    output_index,
                    input_time_base,
                    output_time_base,
                    start_pts: start_us.rescale(rescale::TIME_BASE, input_time_base),
                    end_pts: end_us.rescale(rescale::TIME_BASE, input_time_base),
                })
            }
            None => None,
        };

        let needs_scaling = decoder.format() != Pixel::YUV420P
            || out_width != decoder.width()
            || out_height != decoder.height();
        let scaler = if needs_scaling {
            Some(
                scaling::Context::get(
                    decoder.format(),
                    decoder.width(),
                    decoder.height(),
                    Pixel::YUV420P,
                    out_width,
                    out_height,
                    scaling::Flags::BILINEAR,
                )
                .map_err(|e| format!("failed to create scaler: {}", e))?,
            )
        } else {
            None
        };

        let mut transcoder = VideoTranscoder {
            decoder,
            encoder,
            scaler,
            input_time_base: video_time_base,
            output_index: out_video_index,
            output_time_base: out_video_time_base,
            start_pts: start_us.rescale(rescale::TIME_BASE, video_time_base),
            end_pts: end_us.rescale(rescale::TIME_BASE, video_time_base),
            held: None,
            frames: 0,
            bytes: 0,
        };

        if start_us > 0 {
            ictx.seek(start_us, ..start_us)
                .map_err(|e| format!("failed to seek to {:.3}s: {}", self.start, e))?;
        }

        let mut reached_end = false;
        for (stream, mut packet) in ictx.packets() {
            let index = stream.index();
            if index == video_index {
                transcoder
                    .decoder
                    .send_packet(&packet)
                    .map_err(|e| format!("failed to decode packet: {}", e))?;
                if transcoder.receive_frames(&mut octx)? {
                    reached_end = true;
                    break;
                }
            } else if let Some(copy) = audio.as_mut().filter(|copy| copy.input_index == index) {
                let Some(pts) = packet.pts() else { continue };
                if pts < copy.start_pts || pts >= copy.end_pts {
                    continue;
                }
                packet.set_pts(Some(pts - copy.start_pts));
                packet.set_dts(Some(pts - copy.start_pts));
                packet.set_position(-1);
                packet.set_stream(copy.output_index);
                packet.rescale_ts(copy.input_time_base, copy.output_time_base);
                packet
                    .write_interleaved(&mut octx)
                    .map_err(|e| format!("failed to write audio packet: {}", e))?;
            }
        }

        if !reached_end {
            transcoder
                .decoder
                .send_eof()
                .map_err(|e| format!("failed to flush decoder: {}", e))?;
            transcoder.receive_frames(&mut octx)?;
        }

        // Windows past the last video frame reuse the frame before them
        if transcoder.frames == 0 && !transcoder.encode_held_frame(&mut octx)? {
            return Err(format!(
                "no video frames between {:.3}s and {:.3}s",
                self.start, self.end
            ));
        }

        transcoder
            .encoder
            .send_eof()
            .map_err(|e| format!("failed to flush encoder: {}", e))?;
        transcoder.write_packets(&mut octx)?;

        octx.write_trailer()
            .map_err(|e| format!("failed to write trailer: {}", e))?;

        debug!(
            "Encoded {:.3}s-{:.3}s of {}: {} frames, {} bytes",
            self.start, self.end, self.source, transcoder.frames, transcoder.bytes
        );

        Ok(EncodedSegment {
            frames: transcoder.frames,
            bytes: transcoder.bytes,
        })
    }
}

/// Decode -> (scale) -> encode pipeline for the video stream of one window
struct VideoTranscoder {
    decoder: codec::decoder::Video,
    encoder: codec::encoder::Video,
    scaler: Option<scaling::Context>,
    input_time_base: Rational,
    output_index: usize,
    output_time_base: Rational,
    start_pts: i64,
    end_pts: i64,
    /// Latest frame decoded before the window start
    held: Option<frame::Video>,
    frames: u64,
    bytes: u64,
}

impl VideoTranscoder {
    /// Encode every decoded frame inside the window.
    ///
    /// Returns `true` once a frame at or past the window end is seen.
    fn receive_frames(&mut self, octx: &mut format::context::Output) -> Result<bool, String> {
        let mut decoded = frame::Video::empty();
        while self.decoder.receive_frame(&mut decoded).is_ok() {
            let Some(pts) = decoded.timestamp() else {
                continue;
            };
            if pts < self.start_pts {
                self.held = Some(decoded.clone());
                continue;
            }
            if pts >= self.end_pts {
                return Ok(true);
            }

            self.encode_frame(&mut decoded, pts - self.start_pts, octx)?;
        }
        Ok(false)
    }

    /// Encode the held frame at the window start; `false` if none was decoded
    fn encode_held_frame(&mut self, octx: &mut format::context::Output) -> Result<bool, String> {
        match self.held.take() {
            Some(mut frame) => {
                self.encode_frame(&mut frame, 0, octx)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn encode_frame(
        &mut self,
        decoded: &mut frame::Video,
        relative: i64,
        octx: &mut format::context::Output,
    ) -> Result<(), String> {
        match self.scaler.as_mut() {
            Some(scaler) => {
                let mut converted = frame::Video::empty();
                scaler
                    .run(decoded, &mut converted)
                    .map_err(|e| format!("failed to convert frame: {}", e))?;
                converted.set_pts(Some(relative));
                converted.set_kind(picture::Type::None);
                self.encoder
                    .send_frame(&converted)
                    .map_err(|e| format!("failed to encode frame: {}", e))?;
            }
            None => {
                decoded.set_pts(Some(relative));
                decoded.set_kind(picture::Type::None);
                self.encoder
                    .send_frame(decoded)
                    .map_err(|e| format!("failed to encode frame: {}", e))?;
            }
        }
        self.frames += 1;
        self.write_packets(octx)
    }

    fn write_packets(&mut self, octx: &mut format::context::Output) -> Result<(), String> {
        let mut encoded = Packet::empty();
        while self.encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(self.output_index);
            encoded.rescale_ts(self.input_time_base, self.output_time_base);
            self.bytes += encoded.size() as u64;
            encoded
                .write_interleaved(octx)
                .map_err(|e| format!("failed to write video packet: {}", e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_thread_count_bounds() {
        let threads = EncodeLibavAdapter::optimize_thread_count();
        assert!((1..=16).contains(&threads));
    }

    #[test]
    fn test_explicit_threads_win() {
        let adapter = EncodeLibavAdapter::new().unwrap();
        let settings = EncodeSettings {
            threads: 3,
            ..EncodeSettings::default()
        };
        assert_eq!(adapter.effective_threads(&settings), 3);
        assert_eq!(
            adapter.effective_threads(&EncodeSettings::default()),
            adapter.thread_count
        );
    }

    #[test]
    fn test_scaled_size_keeps_aspect_and_even_dimensions() {
        assert_eq!(scaled_size(1920, 1080, Some(640)), (640, 360));
        assert_eq!(scaled_size(1280, 534, Some(640)), (640, 266));
        assert_eq!(scaled_size(160, 120, Some(640)), (640, 480));
        assert_eq!(scaled_size(721, 480, None), (721, 480));
    }

    #[tokio::test]
    async fn test_unreadable_preview_source_is_encode_failure() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("bad.mp4");
        std::fs::write(&source, b"not a video").unwrap();
        let output = dir.path().join("bad_compressed.mp4");

        let request = PreviewRequest {
            source,
            length: 3.0,
            width: 640,
            output_path: output.clone(),
        };

        let adapter = EncodeLibavAdapter::new().unwrap();
        let result = adapter
            .encode_preview(&request, output.to_str().unwrap(), &EncodeSettings::default())
            .await;

        match result {
            Err(DomainError::EncodeFailure { reason, .. }) => assert!(reason.starts_with("preview:")),
            other => panic!("expected encode failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreadable_source_is_encode_failure() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("bad.mp4");
        std::fs::write(&source, b"not a video").unwrap();
        let output = dir.path().join("bad_part_0.mp4");

        let segment = Segment {
            source: source.clone(),
            index: 0,
            start: 0.0,
            end: 30.0,
            output_path: PathBuf::from(&output),
        };

        let adapter = EncodeLibavAdapter::new().unwrap();
        let result = adapter
            .encode_segment(&segment, output.to_str().unwrap(), &EncodeSettings::default())
            .await;

        match result {
            Err(DomainError::EncodeFailure { index, .. }) => assert_eq!(index, 0),
            other => panic!("expected encode failure, got {:?}", other),
        }
    }
}
