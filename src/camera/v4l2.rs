use super::frame::{grey_to_image, yuyv_to_image};
use super::{StreamRequest, VideoBackend, VideoDevice, VideoStream};
use crate::common::config::CameraConfig;
use crate::common::{ConsoleError, Result};
use image::{DynamicImage, ImageFormat};
use std::fs;
use std::time::Duration;
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

/// V4L2 capture devices under `/dev/video*`.
pub struct V4lBackend {
    default_device: u32,
    warmup_frames: u32,
    warmup_delay: Duration,
}

pub struct V4lStream {
    device: Device,
    format: v4l::Format,
    warmup_frames: u32,
    warmup_delay: Duration,
}

impl V4lBackend {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            default_device: config.device_index,
            warmup_frames: config.warmup_frames,
            warmup_delay: Duration::from_millis(config.warmup_delay_ms),
        }
    }

    fn scan_indices() -> Result<Vec<u32>> {
        let mut indices = Vec::new();
        for entry in fs::read_dir("/dev")? {
            let entry = entry?;
            let path = entry.path();
            let filename = path.file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("");

            if let Some(index) = filename.strip_prefix("video").and_then(|s| s.parse::<u32>().ok()) {
                indices.push(index);
            }
        }
        indices.sort_unstable();
        Ok(indices)
    }
}

impl VideoBackend for V4lBackend {
    type Stream = V4lStream;

    fn enumerate(&self) -> Result<Vec<VideoDevice>> {
        let mut devices = Vec::new();

        for index in Self::scan_indices()? {
            let Ok(device) = Device::new(index as usize) else {
                continue;
            };
            let Ok(caps) = device.query_caps() else {
                continue;
            };
            if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
                continue;
            }

            let formats = device.enum_formats()
                .unwrap_or_default()
                .iter()
                .map(|fmt| fmt.fourcc.str().unwrap_or("UNKNOWN").to_string())
                .collect();

            devices.push(VideoDevice {
                index,
                label: format!("Camera {} ({})", devices.len() + 1, caps.card),
                formats,
            });
        }

        Ok(devices)
    }

    fn open(&mut self, request: &StreamRequest) -> Result<V4lStream> {
        let index = request.device.unwrap_or(self.default_device);
        tracing::debug!("Opening camera device {}...", index);

        let device = Device::new(index as usize)
            .map_err(|e| ConsoleError::Camera(format!("Failed to open camera {}: {}", index, e)))?;

        let caps = device.query_caps()
            .map_err(|e| ConsoleError::Camera(format!("Failed to query capabilities: {}", e)))?;
        if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
            return Err(ConsoleError::Camera(format!(
                "Device {} ({}) does not support video capture", index, caps.card
            )));
        }

        let mut fmt = device.format()
            .map_err(|e| ConsoleError::Camera(format!("Failed to get format: {}", e)))?;

        fmt.width = request.ideal_width;
        fmt.height = request.ideal_height;
        fmt.fourcc = FourCC::new(b"MJPG");

        // Resolution is only a preference; keep whatever the device settles on.
        if let Err(e) = device.set_format(&fmt) {
            tracing::warn!("Could not set {}x{} MJPG: {}. Using device defaults.",
                           fmt.width, fmt.height, e);
        }

        let format = device.format()
            .map_err(|e| ConsoleError::Camera(format!("Failed to get final format: {}", e)))?;

        tracing::info!("Camera {} streaming {}x{} {}", index, format.width, format.height,
                       format.fourcc.str().unwrap_or("????"));

        Ok(V4lStream {
            device,
            format,
            warmup_frames: self.warmup_frames,
            warmup_delay: self.warmup_delay,
        })
    }
}

impl VideoStream for V4lStream {
    fn grab(&mut self) -> Result<DynamicImage> {
        let mut stream = v4l::io::mmap::Stream::with_buffers(&mut self.device, Type::VideoCapture, 4)
            .map_err(|e| ConsoleError::Camera(format!("Failed to create stream: {}", e)))?;

        // Queued buffers may hold stale frames
        for _ in 0..self.warmup_frames {
            stream.next()
                .map_err(|e| ConsoleError::Camera(format!("Failed to capture warmup frame: {}", e)))?;
            std::thread::sleep(self.warmup_delay);
        }

        let (buf, meta) = stream.next()
            .map_err(|e| ConsoleError::Camera(format!("Failed to capture: {}", e)))?;
        let used = match meta.bytesused as usize {
            0 => buf.len(),
            n => n.min(buf.len()),
        };
        let data = &buf[..used];

        let (width, height) = (self.format.width, self.format.height);
        match self.format.fourcc.str().unwrap_or("") {
            "MJPG" | "JPEG" => Ok(image::load_from_memory_with_format(data, ImageFormat::Jpeg)?),
            "YUYV" => yuyv_to_image(data, width, height),
            "GREY" => grey_to_image(data, width, height),
            other => Err(ConsoleError::Camera(format!("Unsupported pixel format: {}", other))),
        }
    }
}
