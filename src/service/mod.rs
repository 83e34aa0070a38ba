pub mod client;
pub mod protocol;

pub use client::{FaceApi, HttpFaceApi};
pub use protocol::{
    FaceImage, FaceUpload, RecognizeRequest, RecognizeResponse, RecognizedFace, RegisterRequest,
    Route, UserDetail, UserSummary, UserUpdate,
};
