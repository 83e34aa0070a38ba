use crate::common::{ConsoleError, Result};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

// Endpoints

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub method: Method,
    pub segments: Vec<String>,
}

impl Route {
    fn new(method: Method, segments: &[&str]) -> Self {
        Self {
            method,
            segments: segments.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn recognize() -> Self {
        Self::new(Method::POST, &["api", "recognize"])
    }

    pub fn register() -> Self {
        Self::new(Method::POST, &["api", "register"])
    }

    pub fn users() -> Self {
        Self::new(Method::GET, &["api", "users"])
    }

    /// GET, PUT or DELETE on a single user.
    pub fn user(method: Method, user_id: &str) -> Self {
        Self::new(method, &["api", "users", user_id])
    }

    pub fn add_face(user_id: &str) -> Self {
        Self::new(Method::POST, &["api", "users", user_id, "faces"])
    }

    /// `index` is 1-based.
    pub fn delete_face(user_id: &str, index: usize) -> Self {
        let index = index.to_string();
        Self::new(Method::DELETE, &["api", "users", user_id, "faces", &index])
    }

    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path())
    }
}

// Requests

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RecognizeRequest {
    pub image: String,
    pub confidence: u8,
    pub show_details: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct UserUpdate {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub position: String,
    pub department: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FaceUpload {
    pub image: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RegisterRequest {
    pub user_id: String,
    pub name: String,
    pub image: String,
    /// Stored by the server as additional user attributes.
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

// Responses

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RecognizeResponse {
    /// Annotated image as a data URI.
    pub image: String,
    #[serde(default)]
    pub faces: Vec<RecognizedFace>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
pub struct RecognizedFace {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub user_id: Option<String>,
    /// `[x, y, w, h]` in pixels of the submitted image.
    #[serde(default)]
    pub bbox: Option<[f64; 4]>,
    #[serde(default)]
    pub info: Option<Map<String, Value>>,
}

#[derive(Deserialize, Debug)]
pub struct UsersResponse {
    #[serde(default)]
    pub users: Map<String, Value>,
}

#[derive(Deserialize, Debug)]
pub struct UserDetailResponse {
    pub user: UserDetail,
}

#[derive(Deserialize, Debug, Default)]
pub struct MessageReply {
    #[serde(default)]
    pub message: String,
}

/// Roster entry as listed by `GET /api/users`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserSummary {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub department: Option<String>,
    pub created_at: Option<String>,
    pub last_recognized: Option<String>,
    pub face_image_count: usize,
}

#[derive(Deserialize)]
struct RawUserEntry {
    #[serde(default, deserialize_with = "lenient_string")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    position: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    department: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    created_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    last_recognized: Option<String>,
    #[serde(default)]
    face_images: Option<Vec<Value>>,
    #[serde(default)]
    face_image: Option<Value>,
}

impl UserSummary {
    pub fn from_entry(id: String, value: Value) -> Result<Self> {
        let raw: RawUserEntry = serde_json::from_value(value)
            .map_err(|e| ConsoleError::InvalidResponse(format!("user {}: {}", id, e)))?;

        // Older records carry a single `face_image` path instead of a list.
        let face_image_count = match (&raw.face_images, &raw.face_image) {
            (Some(images), _) => images.len(),
            (None, Some(Value::String(path))) if !path.is_empty() => 1,
            _ => 0,
        };

        Ok(Self {
            id,
            name: raw.name,
            email: raw.email,
            phone: raw.phone,
            position: raw.position,
            department: raw.department,
            created_at: raw.created_at,
            last_recognized: raw.last_recognized,
            face_image_count,
        })
    }
}

impl UsersResponse {
    /// Entries in server order.
    pub fn into_summaries(self) -> Result<Vec<UserSummary>> {
        self.users
            .into_iter()
            .map(|(id, value)| UserSummary::from_entry(id, value))
            .collect()
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
pub struct UserDetail {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub position: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub department: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub face_images: Vec<FaceImage>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct FaceImage {
    pub data: String,
    #[serde(default)]
    pub path: Option<String>,
}

/// Accepts strings, numbers and booleans as text; null as absent.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Unwrap the `{success, error, ...}` envelope every endpoint answers with.
pub fn decode_envelope<T: DeserializeOwned>(body: Value) -> Result<T> {
    let success = body.get("success").and_then(Value::as_bool).unwrap_or(false);
    if !success {
        let message = body
            .get("error")
            .and_then(Value::as_str)
            .map(str::to_string);
        return Err(ConsoleError::Rejected(message));
    }

    serde_json::from_value(body).map_err(|e| ConsoleError::InvalidResponse(e.to_string()))
}
