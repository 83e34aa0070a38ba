pub mod bus;
pub mod frame;
pub mod v4l2;

pub use bus::{CaptureBus, CaptureEvent};
pub use frame::{CapturedImage, DataUri};
pub use v4l2::V4lBackend;

use crate::common::Result;
use image::DynamicImage;
use std::sync::mpsc::Receiver;

/// A selectable capture device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDevice {
    pub index: u32,
    pub label: String,
    pub formats: Vec<String>,
}

/// What `start` asks the backend for. Width and height are ideals, not requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRequest {
    pub device: Option<u32>,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

pub trait VideoBackend {
    type Stream: VideoStream;

    fn enumerate(&self) -> Result<Vec<VideoDevice>>;
    fn open(&mut self, request: &StreamRequest) -> Result<Self::Stream>;
}

/// An open stream. Dropping it releases the device.
pub trait VideoStream {
    fn grab(&mut self) -> Result<DynamicImage>;
}

/// Owns at most one active stream and announces every capture on its bus.
pub struct CameraController<B: VideoBackend> {
    backend: B,
    stream: Option<B::Stream>,
    bus: CaptureBus,
    ideal_width: u32,
    ideal_height: u32,
    jpeg_quality: u8,
}

impl<B: VideoBackend> CameraController<B> {
    pub fn new(backend: B, ideal_width: u32, ideal_height: u32, jpeg_quality: u8) -> Self {
        Self {
            backend,
            stream: None,
            bus: CaptureBus::new(),
            ideal_width,
            ideal_height,
            jpeg_quality,
        }
    }

    pub fn subscribe(&mut self) -> Receiver<CaptureEvent> {
        self.bus.subscribe()
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }

    /// Start streaming. Already streaming is a no-op; stop first to switch devices.
    pub fn start(&mut self, device: Option<u32>) -> Result<()> {
        if self.stream.is_some() {
            tracing::debug!("Camera already streaming, ignoring start");
            return Ok(());
        }

        let request = StreamRequest {
            device,
            ideal_width: self.ideal_width,
            ideal_height: self.ideal_height,
        };
        let stream = self.backend.open(&request)?;
        self.stream = Some(stream);
        tracing::info!("Camera stream started (device {:?})", device);
        Ok(())
    }

    pub fn stop(&mut self) {
        if self.stream.take().is_some() {
            tracing::info!("Camera stream stopped");
        }
    }

    /// Grab and encode the current frame. `Ok(None)` when not streaming; nothing is published then.
    pub fn capture_frame(&mut self) -> Result<Option<CapturedImage>> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(None);
        };

        let frame = stream.grab()?;
        let captured = CapturedImage::encode(&frame, self.jpeg_quality)?;
        tracing::debug!(
            "Captured {}x{} frame ({} bytes)",
            captured.width(),
            captured.height(),
            captured.jpeg_bytes().len()
        );

        self.bus.publish(CaptureEvent { image: captured.clone() });
        Ok(Some(captured))
    }

    /// Enumeration failures are logged and yield an empty list.
    pub fn list_devices(&self) -> Vec<VideoDevice> {
        match self.backend.enumerate() {
            Ok(devices) => devices,
            Err(e) => {
                tracing::warn!("Failed to enumerate capture devices: {}", e);
                Vec::new()
            }
        }
    }
}
