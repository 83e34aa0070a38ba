use crate::common::config::ServerConfig;
use crate::common::{ConsoleError, Result};
use crate::service::protocol::{
    decode_envelope, FaceUpload, MessageReply, RecognizeRequest, RecognizeResponse,
    RegisterRequest, Route, UserDetail, UserDetailResponse, UserSummary, UserUpdate,
    UsersResponse,
};
use reqwest::blocking::Client;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Operations exposed by the remote face-recognition service.
pub trait FaceApi {
    fn recognize(&self, request: &RecognizeRequest) -> Result<RecognizeResponse>;
    fn register_user(&self, request: &RegisterRequest) -> Result<String>;
    fn list_users(&self) -> Result<Vec<UserSummary>>;
    fn get_user(&self, user_id: &str) -> Result<UserDetail>;
    fn update_user(&self, user_id: &str, update: &UserUpdate) -> Result<()>;
    fn delete_user(&self, user_id: &str) -> Result<String>;
    fn add_face(&self, user_id: &str, upload: &FaceUpload) -> Result<String>;
    /// `index` is 1-based.
    fn delete_face(&self, user_id: &str, index: usize) -> Result<String>;
}

pub struct HttpFaceApi {
    client: Client,
    base_url: Url,
}

impl HttpFaceApi {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ConsoleError::Config(format!("Invalid server URL {}: {}", config.base_url, e)))?;

        let client = Client::builder()
            .timeout(config.request_timeout_secs.map(Duration::from_secs))
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn endpoint(&self, route: &Route) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ConsoleError::Config(format!("Server URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(&route.segments);
        Ok(url)
    }

    fn call<B, T>(&self, route: Route, body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(&route)?;
        tracing::debug!("{} {}", route.method, url);

        let mut request = self.client.request(route.method.clone(), url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send()?;
        let status = response.status();
        let payload: Value = response.json()?;
        tracing::debug!("{} -> {}", route, status);

        decode_envelope(payload)
    }

    fn call_without_body<T: DeserializeOwned>(&self, route: Route) -> Result<T> {
        self.call::<Value, T>(route, None)
    }
}

impl FaceApi for HttpFaceApi {
    fn recognize(&self, request: &RecognizeRequest) -> Result<RecognizeResponse> {
        self.call(Route::recognize(), Some(request))
    }

    fn register_user(&self, request: &RegisterRequest) -> Result<String> {
        let reply: MessageReply = self.call(Route::register(), Some(request))?;
        Ok(reply.message)
    }

    fn list_users(&self) -> Result<Vec<UserSummary>> {
        let response: UsersResponse = self.call_without_body(Route::users())?;
        response.into_summaries()
    }

    fn get_user(&self, user_id: &str) -> Result<UserDetail> {
        let response: UserDetailResponse =
            self.call_without_body(Route::user(Method::GET, user_id))?;
        Ok(response.user)
    }

    fn update_user(&self, user_id: &str, update: &UserUpdate) -> Result<()> {
        let _: MessageReply = self.call(Route::user(Method::PUT, user_id), Some(update))?;
        Ok(())
    }

    fn delete_user(&self, user_id: &str) -> Result<String> {
        let reply: MessageReply = self.call_without_body(Route::user(Method::DELETE, user_id))?;
        Ok(reply.message)
    }

    fn add_face(&self, user_id: &str, upload: &FaceUpload) -> Result<String> {
        let reply: MessageReply = self.call(Route::add_face(user_id), Some(upload))?;
        Ok(reply.message)
    }

    fn delete_face(&self, user_id: &str, index: usize) -> Result<String> {
        let reply: MessageReply = self.call_without_body(Route::delete_face(user_id, index))?;
        Ok(reply.message)
    }
}
