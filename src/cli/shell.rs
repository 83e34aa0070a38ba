//! Line-oriented interactive shells over the two panels.

use crate::camera::{CapturedImage, DataUri, VideoBackend};
use crate::cli::ascii_preview::{AsciiRenderer, FaceOverlay};
use crate::cli::render;
use crate::cli::terminal::TerminalUi;
use crate::common::{DevMode, Result};
use crate::core::recognition::{DisplayedImage, RecognitionPanel, RecognitionView};
use crate::core::roster::SortKey;
use crate::core::users::{FormField, UserManagementPanel};
use crate::core::Ui;
use crate::service::FaceApi;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::str::FromStr;

const LIVE_HELP: &str = "\
Lệnh:
  start [N]        bật camera (thiết bị N)
  stop             tắt camera
  capture          chụp một khung hình
  recognize        chụp và nhận diện
  confidence N     ngưỡng tin cậy 0-100
  details on|off   hiện thông tin chi tiết
  devices          liệt kê camera
  quit             thoát";

const ADMIN_HELP: &str = "\
Lệnh:
  list                      tải lại danh sách người dùng
  filter [Q]                lọc danh sách
  sort name|id|created_at   sắp xếp danh sách
  open ID                   xem chi tiết người dùng
  close                     đóng chi tiết
  set field=value ...       sửa name, email, phone, position, department
  update                    lưu thông tin
  delete                    xóa người dùng đang mở
  camera                    bật/tắt camera
  capture                   chụp ảnh khuôn mặt
  image FILE                dùng ảnh từ tệp
  save-face                 lưu ảnh khuôn mặt
  delete-face N             xóa ảnh khuôn mặt số N
  quit                      thoát";

/// Settings shared by both shells.
pub struct ShellOptions {
    pub dev: DevMode,
    pub preview: Option<AsciiRenderer>,
    pub jpeg_quality: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveCommand {
    Start(Option<u32>),
    Stop,
    Capture,
    Recognize,
    Confidence(i64),
    Details(bool),
    Devices,
    Help,
    Quit,
}

impl FromStr for LiveCommand {
    type Err = String;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let (word, rest) = split_command(line);
        match word {
            "start" => match rest {
                "" => Ok(LiveCommand::Start(None)),
                index => index
                    .parse::<u32>()
                    .map(|i| LiveCommand::Start(Some(i)))
                    .map_err(|_| format!("Thiết bị không hợp lệ: {}", index)),
            },
            "stop" => Ok(LiveCommand::Stop),
            "capture" | "c" => Ok(LiveCommand::Capture),
            "recognize" | "r" => Ok(LiveCommand::Recognize),
            "confidence" => rest
                .parse()
                .map(LiveCommand::Confidence)
                .map_err(|_| format!("Ngưỡng không hợp lệ: {}", rest)),
            "details" => parse_switch(rest).map(LiveCommand::Details),
            "devices" => Ok(LiveCommand::Devices),
            "help" | "?" => Ok(LiveCommand::Help),
            "quit" | "exit" | "q" => Ok(LiveCommand::Quit),
            other => Err(format!("Lệnh không hợp lệ: {} (gõ 'help')", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    List,
    Filter(String),
    Sort(SortKey),
    Open(String),
    Close,
    Set(Vec<(FormField, String)>),
    Update,
    Delete,
    Camera,
    Capture,
    Image(PathBuf),
    SaveFace,
    DeleteFace(usize),
    Help,
    Quit,
}

impl FromStr for AdminCommand {
    type Err = String;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let (word, rest) = split_command(line);
        let required = |what: &str| {
            if rest.is_empty() {
                Err(format!("Thiếu {}", what))
            } else {
                Ok(rest.to_string())
            }
        };

        match word {
            "list" | "reload" => Ok(AdminCommand::List),
            "filter" | "search" => Ok(AdminCommand::Filter(rest.to_string())),
            "sort" => rest.parse().map(AdminCommand::Sort),
            "open" | "show" => required("ID").map(AdminCommand::Open),
            "close" => Ok(AdminCommand::Close),
            "set" => parse_assignments(rest).map(AdminCommand::Set),
            "update" => Ok(AdminCommand::Update),
            "delete" => Ok(AdminCommand::Delete),
            "camera" => Ok(AdminCommand::Camera),
            "capture" => Ok(AdminCommand::Capture),
            "image" => required("FILE").map(|p| AdminCommand::Image(PathBuf::from(p))),
            "save-face" => Ok(AdminCommand::SaveFace),
            "delete-face" => rest
                .parse::<usize>()
                .ok()
                .filter(|index| *index >= 1)
                .map(AdminCommand::DeleteFace)
                .ok_or_else(|| format!("Số ảnh không hợp lệ: {}", rest)),
            "help" | "?" => Ok(AdminCommand::Help),
            "quit" | "exit" | "q" => Ok(AdminCommand::Quit),
            other => Err(format!("Lệnh không hợp lệ: {} (gõ 'help')", other)),
        }
    }
}

fn split_command(line: &str) -> (&str, &str) {
    let line = line.trim();
    match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    }
}

fn parse_switch(value: &str) -> std::result::Result<bool, String> {
    match value {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        other => Err(format!("Giá trị không hợp lệ: {} (on|off)", other)),
    }
}

/// `name=Nguyen Van A email=a@x.vn`: a value runs until the next `field=`.
pub fn parse_assignments(input: &str) -> std::result::Result<Vec<(FormField, String)>, String> {
    let mut assignments: Vec<(FormField, String)> = Vec::new();

    for token in input.split_whitespace() {
        let field = token
            .split_once('=')
            .and_then(|(key, value)| key.parse::<FormField>().ok().map(|field| (field, value)));

        match field {
            Some((field, value)) => assignments.push((field, value.to_string())),
            None => match assignments.last_mut() {
                Some((_, value)) => {
                    value.push(' ');
                    value.push_str(token);
                }
                None => return Err(format!("Thiếu tên trường trước '{}'", token)),
            },
        }
    }

    if assignments.is_empty() {
        return Err("Cần ít nhất một field=value".to_string());
    }
    Ok(assignments)
}

/// Annotated image if present, otherwise the captured frame, with face boxes on top.
pub fn describe_recognition(view: &RecognitionView, preview: Option<&AsciiRenderer>) -> String {
    let mut sections = Vec::new();

    if let (Some(renderer), Some(image)) = (preview, &view.displayed_image) {
        match image.decode() {
            Ok(decoded) => {
                let overlays = view
                    .results
                    .as_ref()
                    .map(FaceOverlay::from_results)
                    .unwrap_or_default();
                sections.push(renderer.render(&decoded, &overlays));
            }
            Err(e) => tracing::warn!("Cannot preview image: {}", e),
        }
    }
    if let Some(results) = render::recognition(view) {
        sections.push(results);
    }

    sections.join("\n")
}

/// Keep the server-annotated image in dev mode.
pub fn save_annotated(dev: &DevMode, view: &RecognitionView) {
    let Some(DisplayedImage::Annotated(uri)) = &view.displayed_image else {
        return;
    };
    let saved = DataUri::parse(uri).and_then(|data| dev.save("recognized", &data.bytes));
    if let Err(e) = saved {
        tracing::warn!("Failed to save annotated image: {}", e);
    }
}

fn save_capture(dev: &DevMode, prefix: &str, image: &CapturedImage) {
    if let Err(e) = dev.save(prefix, image.jpeg_bytes()) {
        tracing::warn!("Failed to save capture: {}", e);
    }
}

pub fn run_live<A, B, R, W>(
    panel: &mut RecognitionPanel<A, B, TerminalUi<R, W>>,
    options: &ShellOptions,
) -> Result<()>
where
    A: FaceApi,
    B: VideoBackend,
    R: BufRead,
    W: Write,
{
    panel.ui_mut().print(LIVE_HELP);

    while let Some(line) = panel.ui_mut().read_line("nhận diện> ")? {
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<LiveCommand>() {
            Ok(LiveCommand::Quit) => break,
            Ok(command) => execute_live(panel, command, options),
            Err(message) => panel.ui_mut().print(&message),
        }
    }

    panel.stop_camera();
    Ok(())
}

fn execute_live<A, B, R, W>(
    panel: &mut RecognitionPanel<A, B, TerminalUi<R, W>>,
    command: LiveCommand,
    options: &ShellOptions,
) where
    A: FaceApi,
    B: VideoBackend,
    R: BufRead,
    W: Write,
{
    match command {
        LiveCommand::Start(device) => {
            if panel.start_camera(device) {
                panel.ui_mut().print("Camera đang bật");
            }
        }
        LiveCommand::Stop => {
            panel.stop_camera();
            panel.ui_mut().print("Camera đang tắt");
        }
        LiveCommand::Capture => match panel.capture() {
            Some(frame) => {
                save_capture(&options.dev, "capture", &frame);
                let summary = format!("Đã chụp {}x{}", frame.width(), frame.height());
                let preview = describe_recognition(panel.view(), options.preview.as_ref());
                panel.ui_mut().print(&summary);
                if !preview.is_empty() {
                    panel.ui_mut().print(&preview);
                }
            }
            None if !panel.is_streaming() => panel.ui_mut().print("Camera chưa được bật"),
            None => {}
        },
        LiveCommand::Recognize => {
            if panel.recognize() {
                save_annotated(&options.dev, panel.view());
                let output = describe_recognition(panel.view(), options.preview.as_ref());
                panel.ui_mut().print(&output);
            }
        }
        LiveCommand::Confidence(value) => {
            panel.settings_mut().set_confidence(value);
            let label = format!("Ngưỡng tin cậy: {}", panel.settings().confidence_label());
            panel.ui_mut().print(&label);
        }
        LiveCommand::Details(show) => {
            panel.settings_mut().show_details = show;
        }
        LiveCommand::Devices => {
            let listing = render::devices(&panel.list_devices());
            panel.ui_mut().print(&listing);
        }
        LiveCommand::Help => panel.ui_mut().print(LIVE_HELP),
        LiveCommand::Quit => {}
    }
}

pub fn run_admin<A, B, R, W>(
    panel: &mut UserManagementPanel<A, B, TerminalUi<R, W>>,
    options: &ShellOptions,
) -> Result<()>
where
    A: FaceApi,
    B: VideoBackend,
    R: BufRead,
    W: Write,
{
    panel.load_users();
    let listing = render::roster(panel.listing());
    panel.ui_mut().print(&listing);

    while let Some(line) = panel.ui_mut().read_line("quản trị> ")? {
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<AdminCommand>() {
            Ok(AdminCommand::Quit) => break,
            Ok(command) => execute_admin(panel, command, options),
            Err(message) => panel.ui_mut().print(&message),
        }
    }

    panel.close();
    Ok(())
}

fn execute_admin<A, B, R, W>(
    panel: &mut UserManagementPanel<A, B, TerminalUi<R, W>>,
    command: AdminCommand,
    options: &ShellOptions,
) where
    A: FaceApi,
    B: VideoBackend,
    R: BufRead,
    W: Write,
{
    match command {
        AdminCommand::List => {
            panel.load_users();
            print_listing(panel);
        }
        AdminCommand::Filter(query) => {
            panel.filter(&query);
            print_listing(panel);
        }
        AdminCommand::Sort(key) => {
            panel.sort(key);
            print_listing(panel);
        }
        AdminCommand::Open(user_id) => {
            if panel.open_user(&user_id) {
                print_detail(panel);
            }
        }
        AdminCommand::Close => panel.close(),
        AdminCommand::Set(assignments) => match panel.form_mut() {
            Some(form) => {
                for (field, value) in assignments {
                    form.set(field, value);
                }
                print_detail(panel);
            }
            None => panel.ui_mut().print("Chưa mở người dùng nào"),
        },
        AdminCommand::Update => {
            if panel.update_user() {
                print_listing(panel);
            }
        }
        AdminCommand::Delete => {
            if panel.delete_user() {
                print_listing(panel);
            }
        }
        AdminCommand::Camera => {
            panel.toggle_camera();
            print_enrollment(panel);
        }
        AdminCommand::Capture => {
            if panel.capture_face() {
                if let Some(image) = &panel.enrollment().captured {
                    save_capture(&options.dev, "enroll", image);
                }
            }
            print_enrollment(panel);
        }
        AdminCommand::Image(path) => match CapturedImage::from_file(&path, options.jpeg_quality) {
            Ok(image) => {
                panel.stage_face_image(image);
                print_enrollment(panel);
            }
            Err(e) => panel.ui_mut().alert(&format!("Không thể đọc ảnh {}: {}", path.display(), e)),
        },
        AdminCommand::SaveFace => {
            if panel.save_face() {
                print_detail(panel);
            }
        }
        AdminCommand::DeleteFace(index) => {
            if panel.delete_face(index) {
                print_detail(panel);
            }
        }
        AdminCommand::Help => panel.ui_mut().print(ADMIN_HELP),
        AdminCommand::Quit => {}
    }
}

fn print_listing<A: FaceApi, B: VideoBackend, R: BufRead, W: Write>(
    panel: &mut UserManagementPanel<A, B, TerminalUi<R, W>>,
) {
    let text = render::roster(panel.listing());
    panel.ui_mut().print(&text);
}

fn print_detail<A: FaceApi, B: VideoBackend, R: BufRead, W: Write>(
    panel: &mut UserManagementPanel<A, B, TerminalUi<R, W>>,
) {
    if let Some(text) = render::detail(panel.session()) {
        panel.ui_mut().print(&text);
    }
}

fn print_enrollment<A: FaceApi, B: VideoBackend, R: BufRead, W: Write>(
    panel: &mut UserManagementPanel<A, B, TerminalUi<R, W>>,
) {
    let text = format!("{} | {}", render::enrollment(panel.enrollment()), panel.camera_button_label());
    panel.ui_mut().print(&text);
}
