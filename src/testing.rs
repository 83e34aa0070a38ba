//! In-memory stand-ins for the service, the capture device and the terminal.

use crate::camera::{CapturedImage, StreamRequest, VideoBackend, VideoDevice, VideoStream};
use crate::common::{ConsoleError, Result};
use crate::core::Ui;
use crate::service::{
    FaceApi, FaceUpload, RecognizeRequest, RecognizeResponse, RecognizedFace, RegisterRequest,
    Route, UserDetail, UserSummary, UserUpdate,
};
use image::{DynamicImage, Rgb, RgbImage};
use reqwest::Method;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::rc::Rc;

pub fn sample_image(width: u32, height: u32) -> CapturedImage {
    let image = RgbImage::from_pixel(width, height, Rgb([120, 90, 60]));
    CapturedImage::encode(&DynamicImage::ImageRgb8(image), 85).unwrap()
}

#[derive(Debug, Clone)]
pub enum FakeFailure {
    Rejected(Option<String>),
    /// Surfaces as an unreadable response.
    Transport,
}

impl FakeFailure {
    fn into_error(self) -> ConsoleError {
        match self {
            FakeFailure::Rejected(message) => ConsoleError::Rejected(message),
            FakeFailure::Transport => ConsoleError::InvalidResponse("connection reset".into()),
        }
    }
}

/// Service double keeping users as raw JSON records, the way the server stores them.
#[derive(Default)]
pub struct FakeApi {
    users: RefCell<Vec<(String, Value)>>,
    faces: Vec<RecognizedFace>,
    calls: RefCell<Vec<String>>,
    last_recognize: RefCell<Option<RecognizeRequest>>,
    failure: RefCell<Option<FakeFailure>>,
}

impl FakeApi {
    pub const ANNOTATED_IMAGE: &'static str = "data:image/jpeg;base64,YW5ub3RhdGVk";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, user_id: &str, record: Value) -> Self {
        self.users.borrow_mut().push((user_id.to_string(), record));
        self
    }

    pub fn with_faces(mut self, faces: Vec<RecognizedFace>) -> Self {
        self.faces = faces;
        self
    }

    /// The next call fails with `failure`, whatever it is.
    pub fn fail_next(&self, failure: FakeFailure) {
        *self.failure.borrow_mut() = Some(failure);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn last_recognize(&self) -> Option<RecognizeRequest> {
        self.last_recognize.borrow().clone()
    }

    fn enter(&self, route: Route) -> Result<()> {
        self.calls.borrow_mut().push(route.to_string());
        match self.failure.borrow_mut().take() {
            Some(failure) => Err(failure.into_error()),
            None => Ok(()),
        }
    }

    fn not_found() -> ConsoleError {
        ConsoleError::Rejected(Some("Không tìm thấy người dùng".into()))
    }

    fn with_record<T>(&self, user_id: &str, f: impl FnOnce(&mut Value) -> T) -> Result<T> {
        let mut users = self.users.borrow_mut();
        let (_, record) = users
            .iter_mut()
            .find(|(id, _)| id == user_id)
            .ok_or_else(Self::not_found)?;
        Ok(f(record))
    }
}

impl FaceApi for FakeApi {
    fn recognize(&self, request: &RecognizeRequest) -> Result<RecognizeResponse> {
        self.enter(Route::recognize())?;
        *self.last_recognize.borrow_mut() = Some(request.clone());
        Ok(RecognizeResponse {
            image: Self::ANNOTATED_IMAGE.to_string(),
            faces: self.faces.clone(),
        })
    }

    fn register_user(&self, request: &RegisterRequest) -> Result<String> {
        self.enter(Route::register())?;
        let mut record = json!({
            "name": request.name,
            "face_images": [request.image],
        });
        for (key, value) in &request.extra {
            record[key.as_str()] = json!(value);
        }
        self.users.borrow_mut().push((request.user_id.clone(), record));
        Ok(format!("Đã đăng ký người dùng {}", request.user_id))
    }

    fn list_users(&self) -> Result<Vec<UserSummary>> {
        self.enter(Route::users())?;
        self.users
            .borrow()
            .iter()
            .map(|(id, record)| UserSummary::from_entry(id.clone(), record.clone()))
            .collect()
    }

    fn get_user(&self, user_id: &str) -> Result<UserDetail> {
        self.enter(Route::user(Method::GET, user_id))?;
        let mut record = self.with_record(user_id, |record| record.clone())?;
        let faces: Vec<Value> = record["face_images"]
            .as_array()
            .map(|images| images.iter().map(|data| json!({ "data": data })).collect())
            .unwrap_or_default();
        record["face_images"] = Value::Array(faces);
        serde_json::from_value(record).map_err(|e| ConsoleError::InvalidResponse(e.to_string()))
    }

    fn update_user(&self, user_id: &str, update: &UserUpdate) -> Result<()> {
        self.enter(Route::user(Method::PUT, user_id))?;
        self.with_record(user_id, |record| {
            record["name"] = json!(update.name);
            record["email"] = json!(update.email);
            record["phone"] = json!(update.phone);
            record["position"] = json!(update.position);
            record["department"] = json!(update.department);
        })
    }

    fn delete_user(&self, user_id: &str) -> Result<String> {
        self.enter(Route::user(Method::DELETE, user_id))?;
        let mut users = self.users.borrow_mut();
        let before = users.len();
        users.retain(|(id, _)| id != user_id);
        if users.len() == before {
            return Err(Self::not_found());
        }
        Ok(format!("Đã xóa người dùng {}", user_id))
    }

    fn add_face(&self, user_id: &str, upload: &FaceUpload) -> Result<String> {
        self.enter(Route::add_face(user_id))?;
        self.with_record(user_id, |record| {
            if !record["face_images"].is_array() {
                record["face_images"] = json!([]);
            }
            if let Some(images) = record["face_images"].as_array_mut() {
                images.push(json!(upload.image));
            }
        })?;
        Ok("Đã thêm ảnh khuôn mặt".to_string())
    }

    fn delete_face(&self, user_id: &str, index: usize) -> Result<String> {
        self.enter(Route::delete_face(user_id, index))?;
        let removed = self.with_record(user_id, |record| {
            match record["face_images"].as_array_mut() {
                Some(images) if index >= 1 && index <= images.len() => {
                    images.remove(index - 1);
                    true
                }
                _ => false,
            }
        })?;
        if !removed {
            return Err(ConsoleError::Rejected(Some("Chỉ số ảnh không hợp lệ".into())));
        }
        Ok(format!("Đã xóa ảnh khuôn mặt số {}", index))
    }
}

/// Capture double producing solid frames at a fixed native size.
pub struct FakeBackend {
    native_size: (u32, u32),
    denied: bool,
    failing_enumeration: bool,
    requests: Rc<RefCell<Vec<StreamRequest>>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            native_size: (64, 48),
            denied: false,
            failing_enumeration: false,
            requests: Rc::default(),
        }
    }

    pub fn with_native_size(mut self, width: u32, height: u32) -> Self {
        self.native_size = (width, height);
        self
    }

    pub fn denied(mut self) -> Self {
        self.denied = true;
        self
    }

    pub fn failing_enumeration(mut self) -> Self {
        self.failing_enumeration = true;
        self
    }

    /// Shared log of every `open` request, including denied ones.
    pub fn requests(&self) -> Rc<RefCell<Vec<StreamRequest>>> {
        Rc::clone(&self.requests)
    }
}

impl VideoBackend for FakeBackend {
    type Stream = FakeStream;

    fn enumerate(&self) -> Result<Vec<VideoDevice>> {
        if self.failing_enumeration {
            return Err(ConsoleError::Camera("no video devices".into()));
        }
        Ok(vec![VideoDevice {
            index: 0,
            label: "Camera 1 (fake)".into(),
            formats: vec!["MJPG".into()],
        }])
    }

    fn open(&mut self, request: &StreamRequest) -> Result<FakeStream> {
        self.requests.borrow_mut().push(*request);
        if self.denied {
            return Err(ConsoleError::Camera("permission denied".into()));
        }
        Ok(FakeStream { size: self.native_size })
    }
}

pub struct FakeStream {
    size: (u32, u32),
}

impl VideoStream for FakeStream {
    fn grab(&mut self) -> Result<DynamicImage> {
        let (width, height) = self.size;
        Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([30, 160, 90]))))
    }
}

/// Records alerts and confirmation prompts; answers every confirmation the same way.
pub struct RecordingUi {
    pub alerts: Vec<String>,
    pub confirmations: Vec<String>,
    answer: bool,
}

impl RecordingUi {
    pub fn new() -> Self {
        Self {
            alerts: Vec::new(),
            confirmations: Vec::new(),
            answer: true,
        }
    }

    pub fn answering(mut self, answer: bool) -> Self {
        self.answer = answer;
        self
    }
}

impl Ui for RecordingUi {
    fn alert(&mut self, message: &str) {
        self.alerts.push(message.to_string());
    }

    fn confirm(&mut self, message: &str) -> bool {
        self.confirmations.push(message.to_string());
        self.answer
    }
}
