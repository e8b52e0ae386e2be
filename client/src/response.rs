use std::fmt::Display;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    ClientError,
    RateLimit,
};

/// Response body; JSON when it parses as such, the raw bytes otherwise
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Value),
    Raw(Vec<u8>),
}

impl From<Vec<u8>> for Body {
    fn from(raw: Vec<u8>) -> Self { serde_json::from_slice(&raw).map_or(Self::Raw(raw), Self::Json) }
}

impl Display for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(v) => write!(f, "{v}"),
            Self::Raw(raw) => f.write_str(&String::from_utf8_lossy(raw)),
        }
    }
}


#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    rate_limit: RateLimit,
    body: Body,
}

impl Response {
    pub fn new(status: StatusCode, rate_limit: RateLimit, body: impl Into<Body>) -> Self {
        Self {
            status,
            rate_limit,
            body: body.into(),
        }
    }

    pub fn status(&self) -> StatusCode { self.status }

    pub fn rate_limit(&self) -> RateLimit { self.rate_limit }

    pub fn body(&self) -> &Body { &self.body }

    pub fn is_success(&self) -> bool { self.status == StatusCode::OK }

    /// Turns anything but `200 OK` into [`ClientError::UnexpectedStatus`]
    ///
    /// # Errors
    ///
    /// See above.
    pub fn error_for_status(self) -> Result<Self, ClientError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ClientError::UnexpectedStatus {
                status: self.status,
                body: self.body,
            })
        }
    }

    /// # Errors
    ///
    /// Fails if the body isn't JSON or doesn't match `D`.
    pub fn deserialize<D: DeserializeOwned>(&self) -> Result<D, serde_json::Error> {
        match &self.body {
            Body::Json(v) => D::deserialize(v),
            Body::Raw(raw) => serde_json::from_slice(raw),
        }
    }
}
