//! Plain-text views of the panels' state.

use crate::camera::VideoDevice;
use crate::core::recognition::{FaceEntry, RecognitionView, ResultList, NO_FACES, RESULTS_HEADING};
use crate::core::roster::{RosterView, UserCard, EMPTY_ROSTER, LOADING_ROSTER};
use crate::core::users::{DetailSession, EnrollmentView, OpenDetail, NO_FACE_IMAGES};
use std::fmt::Write;

pub fn results(list: &ResultList) -> String {
    let mut out = String::new();
    match list {
        ResultList::NoFaces => out.push_str(NO_FACES),
        ResultList::Faces(entries) => {
            out.push_str(RESULTS_HEADING);
            for entry in entries {
                out.push('\n');
                face_entry(&mut out, entry);
            }
        }
    }
    out
}

fn face_entry(out: &mut String, entry: &FaceEntry) {
    let _ = write!(out, "Khuôn mặt {}: {} ({}%)", entry.ordinal, entry.label, entry.confidence);
    for (key, value) in &entry.details {
        let _ = write!(out, "\n    {}: {}", key, value);
    }
}

/// The result block of a recognition view, or nothing before the first answer.
pub fn recognition(view: &RecognitionView) -> Option<String> {
    view.results.as_ref().map(results)
}

pub fn roster(view: &RosterView) -> String {
    match view {
        RosterView::Loading => LOADING_ROSTER.to_string(),
        RosterView::Failed(message) => message.clone(),
        RosterView::Empty => EMPTY_ROSTER.to_string(),
        RosterView::Cards(cards) => cards.iter().map(card).collect::<Vec<_>>().join("\n\n"),
    }
}

pub fn card(card: &UserCard) -> String {
    let mut out = format!(
        "{}\n  ID: {}\n  Email: {}\n  SĐT: {}\n  Ngày tạo: {}",
        card.title, card.id, card.email, card.phone, card.created_at
    );
    if let Some(last) = &card.last_recognized {
        let _ = write!(out, "\n  Lần nhận diện gần nhất: {}", last);
    }
    let _ = write!(out, "\n  Số ảnh: {}", card.image_count);
    out
}

pub fn detail(session: &DetailSession) -> Option<String> {
    match session {
        DetailSession::Closed => None,
        DetailSession::Loading { .. } => session.title().map(str::to_string),
        DetailSession::Open(open) => Some(open_detail(open)),
    }
}

fn open_detail(detail: &OpenDetail) -> String {
    let form = &detail.form;
    let mut out = format!(
        "{}\n  ID: {}\n  name: {}\n  email: {}\n  phone: {}\n  position: {}\n  department: {}\n  Ảnh khuôn mặt:",
        detail.title, form.user_id, form.name, form.email, form.phone, form.position, form.department
    );

    if detail.faces.is_empty() {
        let _ = write!(out, "\n    {}", NO_FACE_IMAGES);
    }
    for face in &detail.faces {
        let _ = write!(out, "\n    [{}] {}", face.index, describe_face_data(&face.data));
    }
    out
}

fn describe_face_data(data: &str) -> String {
    match data.split_once(',') {
        Some((header, payload)) if header.starts_with("data:") => {
            format!("{} ({} ký tự)", header.trim_start_matches("data:"), payload.len())
        }
        _ => format!("({} ký tự)", data.len()),
    }
}

pub fn enrollment(view: &EnrollmentView) -> String {
    match (&view.captured, view.preview_visible) {
        (Some(image), _) => format!("Ảnh đã chụp: {}x{}", image.width(), image.height()),
        (None, true) => "Camera đang bật".to_string(),
        (None, false) => "Camera đang tắt".to_string(),
    }
}

pub fn devices(devices: &[VideoDevice]) -> String {
    if devices.is_empty() {
        return "Không tìm thấy camera nào".to_string();
    }
    devices
        .iter()
        .map(|device| {
            if device.formats.is_empty() {
                format!("/dev/video{}: {}", device.index, device.label)
            } else {
                format!("/dev/video{}: {} [{}]", device.index, device.label, device.formats.join(", "))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
