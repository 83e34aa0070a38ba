use crate::camera::{CameraController, CaptureEvent, CapturedImage, DataUri, VideoBackend, VideoDevice};
use crate::common::{ConsoleError, FailureKind, Result};
use crate::core::Ui;
use crate::service::{FaceApi, RecognizeRequest, RecognizedFace};
use image::DynamicImage;
use serde_json::Value;
use std::sync::mpsc::Receiver;

pub const RESULTS_HEADING: &str = "Kết quả nhận diện:";
pub const NO_FACES: &str = "Không phát hiện khuôn mặt nào.";
pub const UNKNOWN_NAME: &str = "Không xác định";

const RECOGNIZE_FALLBACK: &str = "Không thể nhận diện";
const CONNECTION_ALERT: &str = "Lỗi kết nối đến máy chủ. Vui lòng thử lại sau.";
const CAMERA_ALERT: &str = "Không thể truy cập camera. Vui lòng cho phép quyền truy cập và thử lại.";
const NOT_STREAMING_ALERT: &str = "Camera chưa được bật. Hãy bật camera trước khi nhận diện.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecognitionSettings {
    confidence: u8,
    pub show_details: bool,
}

impl RecognitionSettings {
    pub fn new(confidence: i64, show_details: bool) -> Self {
        let mut settings = Self { confidence: 0, show_details };
        settings.set_confidence(confidence);
        settings
    }

    pub fn confidence(&self) -> u8 {
        self.confidence
    }

    /// Clamped to the slider range 0–100.
    pub fn set_confidence(&mut self, value: i64) {
        self.confidence = value.clamp(0, 100) as u8;
    }

    pub fn confidence_label(&self) -> String {
        format!("{}%", self.confidence)
    }
}

/// One line of the result list.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceEntry {
    pub ordinal: usize,
    pub label: String,
    /// One decimal place, no percent sign.
    pub confidence: String,
    pub recognized: bool,
    pub details: Vec<(String, String)>,
    pub bbox: Option<[f64; 4]>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultList {
    NoFaces,
    Faces(Vec<FaceEntry>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayedImage {
    /// Frame grabbed locally, shown while the request is in flight.
    Captured(CapturedImage),
    /// Server-annotated data URI.
    Annotated(String),
}

impl DisplayedImage {
    pub fn decode(&self) -> Result<DynamicImage> {
        match self {
            DisplayedImage::Captured(image) => image.decode(),
            DisplayedImage::Annotated(uri) => DataUri::parse(uri)?.decode_image(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecognitionView {
    pub displayed_image: Option<DisplayedImage>,
    pub results: Option<ResultList>,
}

pub fn build_results(faces: &[RecognizedFace]) -> ResultList {
    if faces.is_empty() {
        return ResultList::NoFaces;
    }

    let entries = faces
        .iter()
        .enumerate()
        .map(|(i, face)| {
            let recognized = face.user_id.as_deref().is_some_and(|id| !id.is_empty());
            let details = match (&face.info, recognized) {
                (Some(info), true) => info
                    .iter()
                    .filter(|(key, value)| key.as_str() != "name" && is_present(value))
                    .map(|(key, value)| (key.clone(), display_value(value)))
                    .collect(),
                _ => Vec::new(),
            };

            FaceEntry {
                ordinal: i + 1,
                label: face
                    .name
                    .clone()
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| UNKNOWN_NAME.to_string()),
                confidence: one_decimal(face.confidence),
                recognized,
                details,
                bbox: face.bbox,
            }
        })
        .collect();

    ResultList::Faces(entries)
}

/// Null, empty strings, zero and false count as empty attribute values.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Lists are joined with commas and whole numbers lose their fraction, so
/// `["a.jpg","b.jpg"]` shows as `a.jpg,b.jpg`.
fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.is_finite() && f.fract() == 0.0 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Value::Array(items) => items.iter().map(display_value).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

/// Formats with one decimal, rounding exact ties away from zero.
///
/// `{:.1}` already rounds on the exact binary value, which only differs for
/// values sitting exactly halfway between two tenths. Those are the odd
/// multiples of 0.25, so 87.25 becomes "87.3" while 0.15 (stored just below
/// 0.15) stays "0.1".
fn one_decimal(value: f64) -> String {
    let quarters = value * 4.0;
    if quarters.is_finite() && quarters.fract() == 0.0 && quarters % 2.0 != 0.0 {
        return format!("{:.1}", (value * 10.0).round() / 10.0);
    }
    format!("{:.1}", value)
}

pub struct RecognitionPanel<A: FaceApi, B: VideoBackend, U: Ui> {
    api: A,
    camera: CameraController<B>,
    captures: Receiver<CaptureEvent>,
    settings: RecognitionSettings,
    view: RecognitionView,
    ui: U,
}

impl<A: FaceApi, B: VideoBackend, U: Ui> RecognitionPanel<A, B, U> {
    pub fn new(api: A, mut camera: CameraController<B>, settings: RecognitionSettings, ui: U) -> Self {
        let captures = camera.subscribe();
        Self {
            api,
            camera,
            captures,
            settings,
            view: RecognitionView::default(),
            ui,
        }
    }

    pub fn start_camera(&mut self, device: Option<u32>) -> bool {
        match self.camera.start(device) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to start camera: {}", e);
                self.ui.alert(CAMERA_ALERT);
                false
            }
        }
    }

    pub fn stop_camera(&mut self) {
        self.camera.stop();
    }

    pub fn list_devices(&self) -> Vec<VideoDevice> {
        self.camera.list_devices()
    }

    /// Grab a frame and show it. `None` when the camera is off or the grab failed.
    pub fn capture(&mut self) -> Option<CapturedImage> {
        match self.camera.capture_frame() {
            Ok(frame) => {
                self.apply_captures();
                frame
            }
            Err(e) => {
                self.report(&e);
                None
            }
        }
    }

    /// Capture a frame and submit it.
    pub fn recognize(&mut self) -> bool {
        if !self.camera.is_streaming() {
            self.ui.alert(NOT_STREAMING_ALERT);
            return false;
        }

        match self.capture() {
            Some(image) => self.submit(&image),
            None => false,
        }
    }

    /// Submit an image that did not come from the camera.
    pub fn recognize_image(&mut self, image: CapturedImage) -> bool {
        self.view.displayed_image = Some(DisplayedImage::Captured(image.clone()));
        self.submit(&image)
    }

    fn submit(&mut self, image: &CapturedImage) -> bool {
        let request = RecognizeRequest {
            image: image.to_data_uri(),
            confidence: self.settings.confidence(),
            show_details: self.settings.show_details,
        };

        match self.api.recognize(&request) {
            Ok(response) => {
                tracing::info!("Recognition returned {} face(s)", response.faces.len());
                self.view.displayed_image = Some(DisplayedImage::Annotated(response.image));
                self.view.results = Some(build_results(&response.faces));
                true
            }
            Err(e) => {
                self.report(&e);
                false
            }
        }
    }

    fn apply_captures(&mut self) {
        while let Ok(event) = self.captures.try_recv() {
            self.view.displayed_image = Some(DisplayedImage::Captured(event.image));
        }
    }

    fn report(&mut self, err: &ConsoleError) {
        let message = match err.kind() {
            FailureKind::Application => {
                format!("Lỗi: {}", err.server_message().unwrap_or(RECOGNIZE_FALLBACK))
            }
            FailureKind::Transport => {
                tracing::error!("Lỗi khi gọi API: {}", err);
                CONNECTION_ALERT.to_string()
            }
            FailureKind::Platform => {
                tracing::error!("Camera failure: {}", err);
                CAMERA_ALERT.to_string()
            }
            FailureKind::Local => format!("Lỗi: {}", err),
        };
        self.ui.alert(&message);
    }

    pub fn view(&self) -> &RecognitionView {
        &self.view
    }

    pub fn settings(&self) -> &RecognitionSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut RecognitionSettings {
        &mut self.settings
    }

    pub fn is_streaming(&self) -> bool {
        self.camera.is_streaming()
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn ui_mut(&mut self) -> &mut U {
        &mut self.ui
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeApi, FakeBackend, FakeFailure, RecordingUi};
    use serde_json::json;

    fn face(name: Option<&str>, confidence: f64, user_id: Option<&str>, info: Value) -> RecognizedFace {
        RecognizedFace {
            name: name.map(str::to_string),
            confidence,
            user_id: user_id.map(str::to_string),
            bbox: Some([5.0, 5.0, 20.0, 20.0]),
            info: info.as_object().cloned(),
        }
    }

    fn panel(api: FakeApi) -> RecognitionPanel<FakeApi, FakeBackend, RecordingUi> {
        let camera = CameraController::new(FakeBackend::new(), 640, 480, 85);
        RecognitionPanel::new(api, camera, RecognitionSettings::new(30, true), RecordingUi::new())
    }

    #[test]
    fn test_zero_faces_renders_message_not_list() {
        assert_eq!(build_results(&[]), ResultList::NoFaces);
        assert_eq!(NO_FACES, "Không phát hiện khuôn mặt nào.");
    }

    #[test]
    fn test_entries_format_confidence_and_unknown_name() {
        let results = build_results(&[
            face(Some("Lan"), 87.26, Some("u1"), json!({})),
            face(None, 12.0, None, Value::Null),
        ]);

        let ResultList::Faces(entries) = results else {
            panic!("expected faces");
        };
        assert_eq!(entries[0].ordinal, 1);
        assert_eq!(entries[0].label, "Lan");
        assert_eq!(entries[0].confidence, "87.3");
        assert!(entries[0].recognized);
        assert_eq!(entries[1].label, UNKNOWN_NAME);
        assert_eq!(entries[1].confidence, "12.0");
        assert!(!entries[1].recognized);
    }

    #[test]
    fn test_details_skip_name_and_empty_values() {
        let results = build_results(&[face(
            Some("Lan"),
            91.0,
            Some("u1"),
            json!({"name": "Lan", "department": "IT", "email": "", "phone": null, "position": "Dev"}),
        )]);

        let ResultList::Faces(entries) = results else {
            panic!("expected faces");
        };
        assert_eq!(
            entries[0].details,
            vec![
                ("department".to_string(), "IT".to_string()),
                ("position".to_string(), "Dev".to_string()),
            ]
        );
    }

    #[test]
    fn test_one_decimal_rounds_exact_ties_up() {
        assert_eq!(one_decimal(87.25), "87.3");
        assert_eq!(one_decimal(12.25), "12.3");
        assert_eq!(one_decimal(0.25), "0.3");
        assert_eq!(one_decimal(87.75), "87.8");
        assert_eq!(one_decimal(0.15), "0.1");
        assert_eq!(one_decimal(87.26), "87.3");
        assert_eq!(one_decimal(87.24), "87.2");
        assert_eq!(one_decimal(100.0), "100.0");

        let ResultList::Faces(entries) = build_results(&[face(Some("Lan"), 87.25, Some("u1"), json!({}))]) else {
            panic!("expected faces");
        };
        assert_eq!(entries[0].confidence, "87.3");
    }

    #[test]
    fn test_detail_lists_are_joined_with_commas() {
        let results = build_results(&[face(
            Some("Lan"),
            91.0,
            Some("u1"),
            json!({"face_images": ["data/u1/1.jpg", "data/u1/2.jpg"], "age": 30.0, "score": 1.5}),
        )]);

        let ResultList::Faces(entries) = results else {
            panic!("expected faces");
        };
        assert_eq!(
            entries[0].details,
            vec![
                ("face_images".to_string(), "data/u1/1.jpg,data/u1/2.jpg".to_string()),
                ("age".to_string(), "30".to_string()),
                ("score".to_string(), "1.5".to_string()),
            ]
        );
    }

    #[test]
    fn test_unmatched_face_has_no_details() {
        let results = build_results(&[face(Some("?"), 10.0, None, json!({"department": "IT"}))]);
        let ResultList::Faces(entries) = results else {
            panic!("expected faces");
        };
        assert!(entries[0].details.is_empty());
    }

    #[test]
    fn test_confidence_is_clamped() {
        let mut settings = RecognitionSettings::new(150, false);
        assert_eq!(settings.confidence(), 100);
        settings.set_confidence(-4);
        assert_eq!(settings.confidence(), 0);
        settings.set_confidence(45);
        assert_eq!(settings.confidence_label(), "45%");
    }

    #[test]
    fn test_recognize_posts_settings_and_replaces_image() {
        let api = FakeApi::new().with_faces(vec![face(Some("Lan"), 80.0, Some("u1"), json!({}))]);
        let mut panel = panel(api);
        panel.settings_mut().set_confidence(55);
        panel.settings_mut().show_details = false;
        assert!(panel.start_camera(None));

        assert!(panel.recognize());

        let request = panel.api().last_recognize().unwrap();
        assert!(request.image.starts_with("data:image/jpeg;base64,"));
        assert_eq!(request.confidence, 55);
        assert!(!request.show_details);
        assert_eq!(panel.api().calls(), vec!["POST /api/recognize"]);

        assert_eq!(
            panel.view().displayed_image,
            Some(DisplayedImage::Annotated(FakeApi::ANNOTATED_IMAGE.to_string()))
        );
        assert!(matches!(panel.view().results, Some(ResultList::Faces(ref f)) if f.len() == 1));
    }

    #[test]
    fn test_recognize_without_stream_sends_nothing() {
        let mut panel = panel(FakeApi::new());
        assert!(!panel.recognize());
        assert!(panel.api().calls().is_empty());
        assert_eq!(panel.ui().alerts, vec![NOT_STREAMING_ALERT]);
        assert_eq!(panel.view(), &RecognitionView::default());
    }

    #[test]
    fn test_capture_shows_frame_through_bus() {
        let mut panel = panel(FakeApi::new());
        assert!(panel.capture().is_none());
        assert!(panel.view().displayed_image.is_none());

        panel.start_camera(None);
        let frame = panel.capture().unwrap();
        assert_eq!(panel.view().displayed_image, Some(DisplayedImage::Captured(frame)));
    }

    #[test]
    fn test_rejected_request_keeps_previous_results() {
        let api = FakeApi::new().with_faces(vec![]);
        let mut panel = panel(api);
        panel.start_camera(None);
        assert!(panel.recognize());
        let before = panel.view().results.clone();
        assert_eq!(before, Some(ResultList::NoFaces));

        panel.api().fail_next(FakeFailure::Rejected(Some("Không thể giải mã ảnh".into())));
        assert!(!panel.recognize());
        assert_eq!(panel.view().results, before);
        assert_eq!(panel.ui().alerts, vec!["Lỗi: Không thể giải mã ảnh"]);
    }

    #[test]
    fn test_rejection_without_message_uses_fallback() {
        let mut panel = panel(FakeApi::new());
        panel.start_camera(None);
        panel.api().fail_next(FakeFailure::Rejected(None));
        assert!(!panel.recognize());
        assert_eq!(panel.ui().alerts, vec!["Lỗi: Không thể nhận diện"]);
    }

    #[test]
    fn test_transport_failure_alerts_connection_error() {
        let mut panel = panel(FakeApi::new());
        panel.start_camera(None);
        panel.api().fail_next(FakeFailure::Transport);
        assert!(!panel.recognize());
        assert_eq!(panel.ui().alerts, vec![CONNECTION_ALERT]);
        assert!(panel.view().results.is_none());
    }

    #[test]
    fn test_denied_camera_alerts() {
        let camera = CameraController::new(FakeBackend::new().denied(), 640, 480, 85);
        let mut panel = RecognitionPanel::new(
            FakeApi::new(),
            camera,
            RecognitionSettings::new(30, true),
            RecordingUi::new(),
        );
        assert!(!panel.start_camera(Some(3)));
        assert!(!panel.is_streaming());
        assert_eq!(panel.ui().alerts, vec![CAMERA_ALERT]);
    }

    #[test]
    fn test_recognize_image_from_file_source() {
        let mut panel = panel(FakeApi::new());
        let image = crate::testing::sample_image(32, 24);
        assert!(panel.recognize_image(image));
        assert_eq!(panel.view().results, Some(ResultList::NoFaces));
    }
}
