use lb_importer_core::MAX_BATCH_SIZE;
use reqwest::{
    header::InvalidHeaderValue,
    StatusCode,
};

use crate::{
    Body,
    Response,
};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("still rate limited after {retries} retries")]
    RateLimitExhausted { retries: u8, response: Response },
    #[error("network failure: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("error {status}: {body}")]
    UnexpectedStatus { status: StatusCode, body: Body },
    #[error("no recording id to submit feedback for: {0}")]
    MissingRecordingId(String),
    #[error("batch of {0} listens exceeds the limit of {max}", max = MAX_BATCH_SIZE)]
    BatchTooLarge(usize),
    #[error("invalid token: {0}")]
    InvalidToken(#[from] InvalidHeaderValue),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}
