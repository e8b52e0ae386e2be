//! Client for submitting listens to a ListenBrainz compatible API
//!
//! - <https://listenbrainz.readthedocs.io/en/latest/users/api/core.html>

use std::fmt::Display;

use lb_importer_core::{
    CanonicalTrack,
    Listen,
    ListenPayload,
    RecordingId,
    MAX_BATCH_SIZE,
};
use reqwest::{
    header::{
        HeaderMap,
        HeaderValue,
        AUTHORIZATION,
        CONTENT_TYPE,
    },
    Method,
    StatusCode,
};
use serde::{
    Deserialize,
    Serialize,
};
use tracing::{
    debug,
    error,
    warn,
};

mod clock;
mod error;
mod rate_limit;
mod response;
mod transport;

pub use clock::*;
pub use error::*;
pub use rate_limit::*;
pub use response::*;
pub use transport::*;

pub const DEFAULT_API_URL: &str = "https://api.listenbrainz.org/";

const PATH_SUBMIT: &str = "1/submit-listens";
const PATH_FEEDBACK: &str = "1/feedback/recording-feedback";
const PATH_VALIDATE_TOKEN: &str = "1/validate-token";

/// How many times a request rejected with `429 Too Many Requests` is sent again before giving up
pub const MAX_RETRIES: u8 = 5;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenType {
    Single,
    Import,
}

impl Display for ListenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Single => "single",
            Self::Import => "import",
        })
    }
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenValidity {
    Valid { user_name: String },
    Invalid,
}

impl TokenValidity {
    pub const fn is_valid(&self) -> bool { matches!(self, Self::Valid { .. }) }
}


#[derive(Serialize)]
struct SubmitListens<'p> {
    listen_type: ListenType,
    payload: &'p [ListenPayload<'p>],
}

#[derive(Serialize)]
struct RecordingFeedback<'r> {
    #[serde(flatten)]
    recording: RecordingId<'r>,
    score: i8,
}


/// Submits listens and feedback on behalf of a single user token
///
/// Requests are throttled using the rate limit headers of the previous response, so each token needs its own client.
#[derive(Debug)]
pub struct Client<T = HttpTransport, C = SystemClock> {
    base_url: String,
    headers: HeaderMap,
    transport: T,
    clock: C,
    rate_limit: RateLimitState,
}

impl Client {
    /// Client for the public ListenBrainz instance
    ///
    /// # Errors
    ///
    /// Fails if the token can't be used as a header value or the HTTP client can't be built.
    pub fn new(token: impl Display) -> Result<Self, ClientError> { Self::with_url(DEFAULT_API_URL, token) }

    /// Client for the ListenBrainz compatible API rooted at `url`
    ///
    /// Plain `http` is only used when `url` asks for it explicitly.
    ///
    /// # Errors
    ///
    /// Fails if the token can't be used as a header value or the HTTP client can't be built.
    pub fn with_url(url: impl Into<String>, token: impl Display) -> Result<Self, ClientError> {
        let url = url.into();
        let transport = HttpTransport::new(https_only(&url)).map_err(|e| ClientError::Transport(e.into()))?;
        Self::with_parts(url, token, transport, SystemClock)
    }
}

fn https_only(url: &str) -> bool { !url.get(..7).is_some_and(|scheme| scheme.eq_ignore_ascii_case("http://")) }

impl<T: Transport, C: Clock> Client<T, C> {
    /// # Errors
    ///
    /// Fails if the token can't be used as a header value.
    pub fn with_parts(url: impl Into<String>, token: impl Display, transport: T, clock: C) -> Result<Self, ClientError> {
        let mut base_url = url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        let mut auth = HeaderValue::from_str(&format!("Token {token}"))?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::with_capacity(2);
        headers.insert(AUTHORIZATION, auth);

        Ok(Self {
            base_url,
            headers,
            transport,
            clock,
            rate_limit: RateLimitState::default(),
        })
    }

    pub fn rate_limit(&self) -> &RateLimitState { &self.rate_limit }

    /// Submits `batch` as historical listens
    ///
    /// A response with a status other than `200 OK` is logged and still returned, so the caller can decide
    /// whether to carry on.
    ///
    /// # Errors
    ///
    /// [`ClientError::BatchTooLarge`] if more than [`MAX_BATCH_SIZE`] listens are given,
    /// [`ClientError::RateLimitExhausted`] once [`MAX_RETRIES`] retries were all rate limited,
    /// [`ClientError::Transport`] if the request couldn't be completed.
    pub fn import_listens(&mut self, batch: &[Listen]) -> Result<Response, ClientError> {
        if batch.len() > MAX_BATCH_SIZE {
            return Err(ClientError::BatchTooLarge(batch.len()));
        }
        let payload: Vec<_> = batch.iter().map(Listen::to_wire_payload).collect();
        self.submit_listens(ListenType::Import, &payload)
    }

    /// Submits one listen as it happens
    ///
    /// # Errors
    ///
    /// See [`Client::import_listens`].
    pub fn submit_single(&mut self, listen: &Listen) -> Result<Response, ClientError> {
        self.submit_listens(ListenType::Single, &[listen.to_wire_payload()])
    }

    /// Submits a feedback `score` for the recording `track` identifies, `1` being love and `-1` hate
    ///
    /// # Errors
    ///
    /// [`ClientError::MissingRecordingId`] if the track has neither a `recording_mbid` nor a `recording_msid`,
    /// otherwise see [`Client::import_listens`].
    pub fn submit_feedback(&mut self, track: &CanonicalTrack, score: i8) -> Result<Response, ClientError> {
        let recording = track.recording_id().ok_or_else(|| ClientError::MissingRecordingId(track.to_string()))?;
        debug!("ListenBrainz feedback {score}: {}", recording.as_str());

        let body = serde_json::to_vec(&RecordingFeedback { recording, score })?;
        self.send(Method::POST, PATH_FEEDBACK, Some(body))
    }

    /// # Errors
    ///
    /// Fails if the service can't be reached or answers with something other than a token status.
    pub fn validate_token(&mut self) -> Result<TokenValidity, ClientError> {
        #[derive(Deserialize)]
        struct RawTokenValidity {
            valid: bool,
            user_name: Option<String>,
        }

        let response = self.send(Method::GET, PATH_VALIDATE_TOKEN, None)?.error_for_status()?;
        let raw: RawTokenValidity = response.deserialize()?;
        Ok(match raw {
            RawTokenValidity {
                valid: true,
                user_name: Some(user_name),
            } => TokenValidity::Valid { user_name },
            _ => TokenValidity::Invalid,
        })
    }

    fn submit_listens(&mut self, listen_type: ListenType, payload: &[ListenPayload<'_>]) -> Result<Response, ClientError> {
        let body = serde_json::to_vec(&SubmitListens { listen_type, payload })?;
        debug!("ListenBrainz {listen_type}: {}", String::from_utf8_lossy(&body));
        self.send(Method::POST, PATH_SUBMIT, Some(body))
    }

    fn send(&mut self, method: Method, path: &str, body: Option<Vec<u8>>) -> Result<Response, ClientError> {
        let mut headers = self.headers.clone();
        if body.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        let request = HttpRequest {
            method,
            url: format!("{}{path}", self.base_url),
            headers,
            body,
        };

        let mut retries_left = MAX_RETRIES;
        loop {
            self.wait_for_rate_limit();
            let raw = self.transport.send(&request).map_err(|e| ClientError::Transport(e.into()))?;
            let rate_limit = self.rate_limit.update(&raw.headers, self.clock.now());
            debug!(remaining = rate_limit.remaining, reset_in = rate_limit.reset_in, "rate limit");

            let response = Response::new(raw.status, rate_limit, raw.body);
            match response.status() {
                StatusCode::TOO_MANY_REQUESTS if retries_left > 0 => {
                    retries_left -= 1;
                    warn!("Response {}: {}; retrying ({retries_left} left)", response.status(), response.body());
                },
                StatusCode::TOO_MANY_REQUESTS => {
                    error!("Response {}: {}; giving up", response.status(), response.body());
                    return Err(ClientError::RateLimitExhausted {
                        retries: MAX_RETRIES,
                        response,
                    });
                },
                StatusCode::OK => {
                    debug!("Response {}: {}", response.status(), response.body());
                    return Ok(response);
                },
                status => {
                    error!("Response {status}: {}", response.body());
                    if let Some(ref body) = request.body {
                        error!("{}", String::from_utf8_lossy(body));
                    }
                    return Ok(response);
                },
            }
        }
    }

    fn wait_for_rate_limit(&self) {
        if let Some(delay) = self.rate_limit.delay(self.clock.now()) {
            debug!("Rate limit applies, delay {}s", delay.as_secs_f32());
            self.clock.sleep(delay);
        }
    }
}

#[cfg(test)]
mod tests;
