use std::path::Path;

use anyhow::{anyhow, Context, Result};
use ffmpeg_next as ffmpeg;
use image::RgbImage;

/// A decoded frame and its presentation time in seconds.
pub struct TimedFrame {
    pub image: RgbImage,
    pub timestamp: f64,
}

/// Sequential RGB frame decoder for a video file
pub struct VideoDecoder {
    input_ctx: ffmpeg::format::context::Input,
    decoder: ffmpeg::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    video_stream_index: usize,
    width: u32,
    height: u32,
    time_base: f64,
    fps: f64,
    duration_secs: Option<f64>,
    frames_decoded: u64,
    flushed: bool,
}

impl VideoDecoder {
    pub fn open(path: &Path) -> Result<Self> {
        ffmpeg::init().context("initialise ffmpeg")?;

        let input_ctx = ffmpeg::format::input(&path)
            .with_context(|| format!("open video {}", path.display()))?;

        let stream = input_ctx
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow!("No video stream found in {}", path.display()))?;

        let video_stream_index = stream.index();
        let time_base = f64::from(stream.time_base());
        let fps = match f64::from(stream.avg_frame_rate()) {
            rate if rate.is_finite() && rate > 0.0 => rate,
            _ => f64::from(stream.rate()),
        };

        let context = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
            .context("read codec parameters")?;
        let decoder = context.decoder().video().context("open video decoder")?;

        let width = decoder.width();
        let height = decoder.height();

        let scaler = ffmpeg::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg::format::Pixel::RGB24,
            width,
            height,
            ffmpeg::software::scaling::Flags::BILINEAR,
        )
        .context("create RGB scaler")?;

        let duration_secs = match input_ctx.duration() {
            d if d > 0 => Some(d as f64 / f64::from(ffmpeg::ffi::AV_TIME_BASE)),
            _ => None,
        };

        log::info!(
            "Video: {}x{}, {:.2} fps, {}",
            width,
            height,
            fps,
            duration_secs
                .map(|d| format!("{:.1}s", d))
                .unwrap_or_else(|| "unknown length".to_string())
        );

        Ok(Self {
            input_ctx,
            decoder,
            scaler,
            video_stream_index,
            width,
            height,
            time_base,
            fps,
            duration_secs,
            frames_decoded: 0,
            flushed: false,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn duration_secs(&self) -> Option<f64> {
        self.duration_secs
    }

    /// Decode the next frame, or `None` at end of stream.
    pub fn next_frame(&mut self) -> Result<Option<TimedFrame>> {
        loop {
            let mut frame = ffmpeg::frame::Video::empty();
            if self.decoder.receive_frame(&mut frame).is_ok() {
                return self.convert(&frame).map(Some);
            }
            if self.flushed {
                return Ok(None);
            }

            // Need more packets
            loop {
                match self.input_ctx.packets().next() {
                    Some((stream, packet)) => {
                        if stream.index() == self.video_stream_index {
                            self.decoder
                                .send_packet(&packet)
                                .context("send packet to decoder")?;
                            break;
                        }
                    }
                    None => {
                        self.decoder.send_eof().context("flush decoder")?;
                        self.flushed = true;
                        break;
                    }
                }
            }
        }
    }

    fn convert(&mut self, frame: &ffmpeg::frame::Video) -> Result<TimedFrame> {
        let timestamp = match frame.timestamp().or_else(|| frame.pts()) {
            Some(pts) => pts as f64 * self.time_base,
            None => self.frames_decoded as f64 / self.fps,
        };
        self.frames_decoded += 1;

        let mut rgb_frame = ffmpeg::frame::Video::empty();
        self.scaler
            .run(frame, &mut rgb_frame)
            .context("convert frame to RGB")?;

        // Rows may be padded past width * 3
        let stride = rgb_frame.stride(0);
        let row_len = self.width as usize * 3;
        let data = rgb_frame.data(0);
        let mut pixels = Vec::with_capacity(row_len * self.height as usize);
        for row in 0..self.height as usize {
            let start = row * stride;
            pixels.extend_from_slice(&data[start..start + row_len]);
        }

        let image = RgbImage::from_raw(self.width, self.height, pixels)
            .ok_or_else(|| anyhow!("decoded frame does not fit {}x{}", self.width, self.height))?;

        Ok(TimedFrame { image, timestamp })
    }
}
