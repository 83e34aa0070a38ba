pub mod camera;
pub mod cli;
pub mod common;
pub mod core;
pub mod service;

#[cfg(test)]
pub mod testing;

// Re-export commonly used types
pub use crate::camera::{CameraController, CapturedImage, V4lBackend};
pub use crate::common::{Config, ConsoleError, DevMode, Result};
pub use crate::core::{RecognitionPanel, Ui, UserManagementPanel};
pub use crate::service::{FaceApi, HttpFaceApi};
