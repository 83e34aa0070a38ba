use crate::camera::{CameraController, CapturedImage, VideoBackend};
use crate::common::{ConsoleError, FailureKind};
use crate::core::roster::{Roster, RosterView, SortKey};
use crate::core::Ui;
use crate::service::{FaceApi, FaceUpload, RegisterRequest, UserDetail, UserUpdate};
use std::collections::BTreeMap;
use std::str::FromStr;

pub const LOADING_TITLE: &str = "Đang tải...";
pub const NO_FACE_IMAGES: &str = "Không có ảnh khuôn mặt nào";
pub const UPDATE_OK: &str = "Cập nhật thông tin thành công";

const ERROR_FALLBACK: &str = "Không xác định";

/// Editable fields of the detail form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Email,
    Phone,
    Position,
    Department,
}

impl FormField {
    /// Field name on the wire.
    pub fn key(&self) -> &'static str {
        match self {
            FormField::Name => "name",
            FormField::Email => "email",
            FormField::Phone => "phone",
            FormField::Position => "position",
            FormField::Department => "department",
        }
    }
}

impl FromStr for FormField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(FormField::Name),
            "email" => Ok(FormField::Email),
            "phone" => Ok(FormField::Phone),
            "position" => Ok(FormField::Position),
            "department" => Ok(FormField::Department),
            other => Err(format!("unknown field '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserForm {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub position: String,
    pub department: String,
}

impl UserForm {
    fn from_detail(user_id: &str, detail: &UserDetail) -> Self {
        let text = |field: &Option<String>| field.clone().unwrap_or_default();
        Self {
            user_id: user_id.to_string(),
            name: text(&detail.name),
            email: text(&detail.email),
            phone: text(&detail.phone),
            position: text(&detail.position),
            department: text(&detail.department),
        }
    }

    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        let slot = match field {
            FormField::Name => &mut self.name,
            FormField::Email => &mut self.email,
            FormField::Phone => &mut self.phone,
            FormField::Position => &mut self.position,
            FormField::Department => &mut self.department,
        };
        *slot = value.into();
    }

    pub fn to_update(&self) -> UserUpdate {
        UserUpdate {
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            position: self.position.clone(),
            department: self.department.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceTile {
    /// 1-based, as the delete endpoint expects.
    pub index: usize,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenDetail {
    pub user_id: String,
    pub title: String,
    pub form: UserForm,
    pub faces: Vec<FaceTile>,
}

impl OpenDetail {
    fn new(user_id: &str, detail: UserDetail) -> Self {
        let title = format!("Chi tiết: {}", detail.name.as_deref().unwrap_or(""));
        let form = UserForm::from_detail(user_id, &detail);
        let faces = detail
            .face_images
            .into_iter()
            .enumerate()
            .map(|(i, face)| FaceTile { index: i + 1, data: face.data })
            .collect();

        Self {
            user_id: user_id.to_string(),
            title,
            form,
            faces,
        }
    }
}

/// The user-detail modal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DetailSession {
    #[default]
    Closed,
    Loading { user_id: String },
    Open(OpenDetail),
}

impl DetailSession {
    pub fn title(&self) -> Option<&str> {
        match self {
            DetailSession::Closed => None,
            DetailSession::Loading { .. } => Some(LOADING_TITLE),
            DetailSession::Open(detail) => Some(&detail.title),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            DetailSession::Closed => None,
            DetailSession::Loading { user_id } => Some(user_id),
            DetailSession::Open(detail) => Some(&detail.user_id),
        }
    }

    pub fn open_detail(&self) -> Option<&OpenDetail> {
        match self {
            DetailSession::Open(detail) => Some(detail),
            _ => None,
        }
    }
}

/// Where a click inside the modal layer landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    Backdrop,
    Content,
}

/// State of the enrollment camera inside the detail modal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnrollmentView {
    pub preview_visible: bool,
    pub captured: Option<CapturedImage>,
}

impl EnrollmentView {
    pub fn can_save(&self) -> bool {
        self.captured.is_some()
    }
}

/// Fields for `POST /api/register`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Registration {
    pub user_id: String,
    pub name: String,
    pub attributes: BTreeMap<String, String>,
}

pub struct UserManagementPanel<A: FaceApi, B: VideoBackend, U: Ui> {
    api: A,
    camera: CameraController<B>,
    roster: Roster,
    listing: RosterView,
    session: DetailSession,
    enrollment: EnrollmentView,
    ui: U,
}

impl<A: FaceApi, B: VideoBackend, U: Ui> UserManagementPanel<A, B, U> {
    pub fn new(api: A, camera: CameraController<B>, ui: U) -> Self {
        Self {
            api,
            camera,
            roster: Roster::default(),
            listing: RosterView::Empty,
            session: DetailSession::Closed,
            enrollment: EnrollmentView::default(),
            ui,
        }
    }

    /// Replace the roster cache from the server. Failures render into the listing.
    pub fn load_users(&mut self) -> bool {
        self.listing = RosterView::Loading;

        match self.api.list_users() {
            Ok(users) => {
                tracing::info!("Loaded {} user(s)", users.len());
                self.roster = Roster::new(users);
                self.listing = RosterView::from_users(&self.roster.all());
                true
            }
            Err(e) => {
                self.listing = RosterView::Failed(failure_message(&e));
                false
            }
        }
    }

    pub fn filter(&mut self, query: &str) {
        self.listing = RosterView::from_users(&self.roster.filter(query));
    }

    pub fn sort(&mut self, key: SortKey) {
        self.listing = RosterView::from_users(&self.roster.sorted(key));
    }

    pub fn open_user(&mut self, user_id: &str) -> bool {
        self.camera.stop();
        self.enrollment = EnrollmentView::default();
        self.session = DetailSession::Loading { user_id: user_id.to_string() };

        match self.api.get_user(user_id) {
            Ok(detail) => {
                self.session = DetailSession::Open(OpenDetail::new(user_id, detail));
                true
            }
            Err(e) => {
                self.ui.alert(&failure_message(&e));
                self.close();
                false
            }
        }
    }

    pub fn close(&mut self) {
        self.session = DetailSession::Closed;
        self.camera.stop();
        self.enrollment.preview_visible = false;
    }

    pub fn click(&mut self, target: ClickTarget) {
        if target == ClickTarget::Backdrop {
            self.close();
        }
    }

    pub fn form_mut(&mut self) -> Option<&mut UserForm> {
        match &mut self.session {
            DetailSession::Open(detail) => Some(&mut detail.form),
            _ => None,
        }
    }

    /// Submit the form. A successful update reloads the whole roster.
    pub fn update_user(&mut self) -> bool {
        let Some(detail) = self.session.open_detail() else {
            return false;
        };
        let user_id = detail.form.user_id.clone();
        let update = detail.form.to_update();

        match self.api.update_user(&user_id, &update) {
            Ok(()) => {
                self.ui.alert(UPDATE_OK);
                self.load_users();
                true
            }
            Err(e) => {
                self.ui.alert(&failure_message(&e));
                false
            }
        }
    }

    pub fn delete_user(&mut self) -> bool {
        let Some(detail) = self.session.open_detail() else {
            return false;
        };
        let user_id = detail.user_id.clone();
        let prompt = format!("Bạn có chắc chắn muốn xóa người dùng {} ({})?", detail.form.name, user_id);
        if !self.ui.confirm(&prompt) {
            return false;
        }

        match self.api.delete_user(&user_id) {
            Ok(message) => {
                self.close();
                self.ui.alert(&message);
                self.load_users();
                true
            }
            Err(e) => {
                // The modal stays open only when the request never got an answer.
                if e.kind() != FailureKind::Transport {
                    self.close();
                }
                self.ui.alert(&failure_message(&e));
                false
            }
        }
    }

    /// Start the enrollment camera, or stop it when already running.
    pub fn toggle_camera(&mut self) -> bool {
        if self.camera.is_streaming() {
            self.camera.stop();
            self.enrollment.preview_visible = false;
            return true;
        }

        match self.camera.start(None) {
            Ok(()) => {
                self.enrollment.preview_visible = true;
                self.enrollment.captured = None;
                true
            }
            Err(e) => {
                self.ui.alert(&format!("Không thể truy cập camera: {}", e));
                false
            }
        }
    }

    /// Freeze the current frame for saving.
    pub fn capture_face(&mut self) -> bool {
        match self.camera.capture_frame() {
            Ok(Some(image)) => {
                self.enrollment.captured = Some(image);
                self.enrollment.preview_visible = false;
                true
            }
            Ok(None) => false,
            Err(e) => {
                self.ui.alert(&format!("Không thể truy cập camera: {}", e));
                false
            }
        }
    }

    /// Use an image from elsewhere as the pending enrollment still.
    pub fn stage_face_image(&mut self, image: CapturedImage) {
        self.enrollment.captured = Some(image);
        self.enrollment.preview_visible = false;
    }

    /// Upload the captured still, then re-fetch the open user.
    pub fn save_face(&mut self) -> bool {
        let (Some(image), Some(user_id)) = (&self.enrollment.captured, self.session.user_id()) else {
            return false;
        };
        let user_id = user_id.to_string();
        let upload = FaceUpload { image: image.to_data_uri() };

        match self.api.add_face(&user_id, &upload) {
            Ok(message) => {
                self.ui.alert(&message);
                self.open_user(&user_id);
                true
            }
            Err(e) => {
                self.ui.alert(&failure_message(&e));
                false
            }
        }
    }

    /// Delete face `index` (1-based) of the open user after confirmation.
    pub fn delete_face(&mut self, index: usize) -> bool {
        let Some((user_id, face_count)) = self
            .session
            .open_detail()
            .map(|d| (d.user_id.clone(), d.faces.len()))
        else {
            return false;
        };
        if index == 0 || index > face_count {
            self.ui.alert(&format!("Không có ảnh khuôn mặt số {}", index));
            return false;
        }
        if !self.ui.confirm(&format!("Bạn có chắc chắn muốn xóa ảnh khuôn mặt số {}?", index)) {
            return false;
        }

        match self.api.delete_face(&user_id, index) {
            Ok(message) => {
                self.ui.alert(&message);
                self.open_user(&user_id);
                true
            }
            Err(e) => {
                self.ui.alert(&failure_message(&e));
                false
            }
        }
    }

    pub fn register_user(&mut self, registration: Registration, image: &CapturedImage) -> bool {
        let request = RegisterRequest {
            user_id: registration.user_id,
            name: registration.name,
            image: image.to_data_uri(),
            extra: registration.attributes,
        };

        match self.api.register_user(&request) {
            Ok(message) => {
                self.ui.alert(&message);
                self.load_users();
                true
            }
            Err(e) => {
                self.ui.alert(&failure_message(&e));
                false
            }
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn listing(&self) -> &RosterView {
        &self.listing
    }

    pub fn session(&self) -> &DetailSession {
        &self.session
    }

    pub fn enrollment(&self) -> &EnrollmentView {
        &self.enrollment
    }

    pub fn is_camera_streaming(&self) -> bool {
        self.camera.is_streaming()
    }

    pub fn camera_button_label(&self) -> &'static str {
        if self.camera.is_streaming() { "Tắt camera" } else { "Bật camera" }
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

fn failure_message(err: &ConsoleError) -> String {
    match err.kind() {
        FailureKind::Application => {
            format!("Lỗi: {}", err.server_message().unwrap_or(ERROR_FALLBACK))
        }
        FailureKind::Transport => {
            tracing::error!("Request failed: {}", err);
            format!("Lỗi kết nối: {}", err)
        }
        FailureKind::Platform => format!("Không thể truy cập camera: {}", err),
        FailureKind::Local => format!("Lỗi: {}", err),
    }
}
