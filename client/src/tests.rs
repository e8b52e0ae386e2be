use std::{
    cell::{
        Cell,
        RefCell,
    },
    collections::VecDeque,
    rc::Rc,
    time::{
        Duration,
        Instant,
    },
};

use lb_importer_core::AdditionalInfo;
use reqwest::header::HeaderName;
use serde_json::{
    json,
    Value,
};

use super::*;

#[derive(Clone)]
struct FakeClock {
    start: Instant,
    elapsed: Rc<Cell<Duration>>,
    sleeps: Rc<RefCell<Vec<Duration>>>,
}

impl FakeClock {
    fn new() -> Self {
        Self {
            start: Instant::now(),
            elapsed: Rc::default(),
            sleeps: Rc::default(),
        }
    }

    fn elapsed(&self) -> Duration { self.elapsed.get() }

    fn sleeps(&self) -> Vec<Duration> { self.sleeps.borrow().clone() }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant { self.start + self.elapsed.get() }

    fn sleep(&self, duration: Duration) {
        self.elapsed.set(self.elapsed.get() + duration);
        self.sleeps.borrow_mut().push(duration);
    }
}


#[derive(Debug, thiserror::Error)]
#[error("connection refused")]
struct Refused;

type Sent = Rc<RefCell<Vec<(Duration, HttpRequest)>>>;

struct FakeTransport {
    clock: FakeClock,
    responses: VecDeque<Result<HttpResponse, Refused>>,
    sent: Sent,
}

impl Transport for FakeTransport {
    type Error = Refused;

    fn send(&mut self, request: &HttpRequest) -> Result<HttpResponse, Self::Error> {
        self.sent.borrow_mut().push((self.clock.elapsed(), request.clone()));
        self.responses.pop_front().unwrap_or_else(|| Ok(reply(200, &[], r#"{"status": "ok"}"#)))
    }
}


fn reply(status: u16, headers: &[(&str, &'static str)], body: &str) -> HttpResponse {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        map.insert(HeaderName::from_bytes(name.as_bytes()).unwrap(), HeaderValue::from_static(value));
    }
    HttpResponse {
        status: StatusCode::from_u16(status).unwrap(),
        headers: map,
        body: body.as_bytes().to_vec(),
    }
}

fn ok_with_quota(remaining: &'static str, reset_in: &'static str) -> Result<HttpResponse, Refused> {
    Ok(reply(200, &[("X-RateLimit-Remaining", remaining), ("X-RateLimit-Reset-In", reset_in)], r#"{"status": "ok"}"#))
}

fn too_many() -> Result<HttpResponse, Refused> { Ok(reply(429, &[("X-RateLimit-Remaining", "10")], r#"{"code": 429}"#)) }

fn client(responses: impl IntoIterator<Item = Result<HttpResponse, Refused>>) -> (Client<FakeTransport, FakeClock>, FakeClock, Sent) {
    let clock = FakeClock::new();
    let sent = Sent::default();
    let transport = FakeTransport {
        clock: clock.clone(),
        responses: responses.into_iter().collect(),
        sent: sent.clone(),
    };
    let client = Client::with_parts("https://lb.test", "0000-token", transport, clock.clone()).unwrap();
    (client, clock, sent)
}

fn track(info: Value) -> CanonicalTrack {
    let info = match info {
        Value::Object(m) => Some(m),
        _ => None::<AdditionalInfo>,
    };
    CanonicalTrack::from_source_fields("Lansdowne", "Burn Brighter", Some("No Home but the Road"), info).unwrap()
}

fn listens(n: i64) -> Vec<Listen> { (1..=n).rev().map(|ts| Listen::new(ts, track(json!({"music_service": "spotify.com"})))).collect() }

fn body_json(request: &HttpRequest) -> Value { serde_json::from_slice(request.body.as_deref().unwrap()).unwrap() }


#[test]
fn test_import_request_shape() {
    let (mut client, _, sent) = client([]);
    let response = client.import_listens(&listens(2)).unwrap();
    assert!(response.is_success());

    let sent = sent.borrow();
    assert_eq!(sent.len(), 1);
    let request = &sent[0].1;
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.url, "https://lb.test/1/submit-listens");
    assert_eq!(request.headers[AUTHORIZATION], "Token 0000-token");
    assert_eq!(request.headers[CONTENT_TYPE], "application/json");
    assert_eq!(
        body_json(request),
        json!({
            "listen_type": "import",
            "payload": [
                {
                    "listened_at": 2,
                    "track_metadata": {
                        "artist_name": "Lansdowne",
                        "track_name": "Burn Brighter",
                        "release_name": "No Home but the Road",
                        "additional_info": {"music_service": "spotify.com"},
                    },
                },
                {
                    "listened_at": 1,
                    "track_metadata": {
                        "artist_name": "Lansdowne",
                        "track_name": "Burn Brighter",
                        "release_name": "No Home but the Road",
                        "additional_info": {"music_service": "spotify.com"},
                    },
                },
            ],
        })
    );
}

#[test]
fn test_single() {
    let (mut client, _, sent) = client([]);
    client.submit_single(&listens(1)[0]).unwrap();

    let sent = sent.borrow();
    let single = body_json(&sent[0].1);
    assert_eq!(single["listen_type"], "single");
    assert_eq!(single["payload"][0]["listened_at"], 1);
    assert_eq!(single["payload"][0]["track_metadata"]["track_name"], "Burn Brighter");
}

#[test]
fn test_exhausted_quota_blocks_next_request() {
    let (mut client, clock, sent) = client([ok_with_quota("0", "30"), ok_with_quota("5", "30")]);
    client.import_listens(&listens(1)).unwrap();
    assert!(clock.sleeps().is_empty());
    assert_eq!(client.rate_limit().delay(clock.now()), Some(Duration::from_secs(30)));

    client.import_listens(&listens(1)).unwrap();
    assert_eq!(clock.sleeps(), [Duration::from_secs(30)]);

    let times: Vec<_> = sent.borrow().iter().map(|(t, _)| *t).collect();
    assert_eq!(times, [Duration::ZERO, Duration::from_secs(30)]);
}

#[test]
fn test_remaining_quota_does_not_block() {
    let (mut client, clock, sent) = client([ok_with_quota("3", "30"), ok_with_quota("2", "30")]);
    client.import_listens(&listens(1)).unwrap();
    client.import_listens(&listens(1)).unwrap();
    client.import_listens(&listens(1)).unwrap();

    assert!(clock.sleeps().is_empty());
    assert_eq!(sent.borrow().len(), 3);
    assert_eq!(client.rate_limit().next_request(), None);
}

#[test]
fn test_missing_headers_do_not_block() {
    let (mut client, clock, _) = client([Ok(reply(200, &[], "{}")), Ok(reply(200, &[("x-ratelimit-remaining", "zero")], "{}"))]);
    client.import_listens(&listens(1)).unwrap();
    client.import_listens(&listens(1)).unwrap();
    client.import_listens(&listens(1)).unwrap();
    assert!(clock.sleeps().is_empty());
}

#[test]
fn test_unrepresentable_reset_does_not_block() {
    let (mut client, clock, sent) = client([ok_with_quota("0", "18446744073709551615"), ok_with_quota("5", "30")]);
    client.import_listens(&listens(1)).unwrap();
    assert_eq!(client.rate_limit().next_request(), None);

    client.import_listens(&listens(1)).unwrap();
    assert!(clock.sleeps().is_empty());
    assert_eq!(sent.borrow().len(), 2);
}

#[test]
fn test_retries_until_success() {
    let mut responses: Vec<_> = (0..5).map(|_| too_many()).collect();
    responses.push(ok_with_quota("10", "60"));
    let (mut client, _, sent) = client(responses);

    let response = client.import_listens(&listens(3)).unwrap();
    assert!(response.is_success());

    let sent = sent.borrow();
    assert_eq!(sent.len(), 6);
    assert!(sent.iter().all(|(_, r)| r.body == sent[0].1.body));
}

#[test]
fn test_retries_exhausted() {
    let responses: Vec<_> = (0..7).map(|_| too_many()).collect();
    let (mut client, _, sent) = client(responses);

    match client.import_listens(&listens(3)) {
        Err(ClientError::RateLimitExhausted { retries, response }) => {
            assert_eq!(retries, MAX_RETRIES);
            assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        },
        other => panic!("expected rate limit failure, got {other:?}"),
    }
    assert_eq!(sent.borrow().len(), 6);
}

#[test]
fn test_retry_waits_for_reset() {
    let limited = Ok(reply(429, &[("X-RateLimit-Remaining", "0"), ("X-RateLimit-Reset-In", "5")], "{}"));
    let (mut client, clock, sent) = client([limited, ok_with_quota("10", "60")]);

    assert!(client.import_listens(&listens(1)).unwrap().is_success());
    assert_eq!(clock.sleeps(), [Duration::from_secs(5)]);
    assert_eq!(sent.borrow()[1].0, Duration::from_secs(5));
}

#[test]
fn test_other_status_returned_without_retry() {
    let (mut client, _, sent) = client([Ok(reply(500, &[("X-RateLimit-Remaining", "10")], "<html>oops</html>"))]);

    let response = client.import_listens(&listens(1)).unwrap();
    assert!(!response.is_success());
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body(), &Body::Raw(b"<html>oops</html>".to_vec()));
    assert_eq!(sent.borrow().len(), 1);

    match response.error_for_status() {
        Err(ClientError::UnexpectedStatus { status, body }) => {
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body.to_string(), "<html>oops</html>");
        },
        other => panic!("expected unexpected status, got {other:?}"),
    }
}

#[test]
fn test_json_error_body() {
    let (mut client, _, _) = client([Ok(reply(400, &[], r#"{"code": 400, "error": "bad listen"}"#))]);
    let response = client.import_listens(&listens(1)).unwrap();
    assert_eq!(response.body(), &Body::Json(json!({"code": 400, "error": "bad listen"})));
}

#[test]
fn test_transport_error_not_retried() {
    let (mut client, _, sent) = client([Err(Refused)]);
    assert!(matches!(client.import_listens(&listens(1)), Err(ClientError::Transport(_))));
    assert_eq!(sent.borrow().len(), 1);
}

#[test]
fn test_batch_too_large() {
    let (mut client, _, sent) = client([]);
    let result = client.import_listens(&listens(MAX_BATCH_SIZE as i64 + 1));
    assert!(matches!(result, Err(ClientError::BatchTooLarge(201))));
    assert!(sent.borrow().is_empty());
}

#[test]
fn test_feedback() {
    let (mut client, _, sent) = client([]);
    let loved = track(json!({"recording_mbid": "b92334c4-574a-46f5-89d8-417fcd1e873f"}));
    assert!(client.submit_feedback(&loved, 1).unwrap().is_success());

    let sent = sent.borrow();
    let request = &sent[0].1;
    assert_eq!(request.url, "https://lb.test/1/feedback/recording-feedback");
    assert_eq!(request.headers[AUTHORIZATION], "Token 0000-token");
    assert_eq!(body_json(request), json!({"recording_mbid": "b92334c4-574a-46f5-89d8-417fcd1e873f", "score": 1}));
}

#[test]
fn test_feedback_requires_recording() {
    let (mut client, _, sent) = client([]);
    let result = client.submit_feedback(&track(json!({"music_service": "spotify.com"})), 1);
    assert!(matches!(result, Err(ClientError::MissingRecordingId(_))));
    assert!(sent.borrow().is_empty());
}

#[test]
fn test_validate_token() {
    let (mut client, _, sent) = client([
        Ok(reply(200, &[], r#"{"code": 200, "message": "Token valid.", "valid": true, "user_name": "zozCXAEwpVLa"}"#)),
        Ok(reply(200, &[], r#"{"code": 200, "message": "Token invalid.", "valid": false}"#)),
    ]);

    assert_eq!(client.validate_token().unwrap(), TokenValidity::Valid {
        user_name: "zozCXAEwpVLa".to_owned()
    });
    assert_eq!(client.validate_token().unwrap(), TokenValidity::Invalid);

    let sent = sent.borrow();
    assert_eq!(sent[0].1.method, Method::GET);
    assert_eq!(sent[0].1.url, "https://lb.test/1/validate-token");
    assert!(sent[0].1.body.is_none());
    assert!(!sent[0].1.headers.contains_key(CONTENT_TYPE));
}

#[test]
fn test_https_only_unless_http_requested() {
    assert!(https_only(DEFAULT_API_URL));
    assert!(https_only("api.listenbrainz.org"));
    assert!(!https_only("http://localhost:8100/"));
    assert!(!https_only("HTTP://localhost:8100/"));

    let mut secure = HttpTransport::new(true).unwrap();
    let request = HttpRequest {
        method: Method::GET,
        url: "http://127.0.0.1:9/1/validate-token".to_owned(),
        headers: HeaderMap::new(),
        body: None,
    };
    assert!(secure.send(&request).unwrap_err().is_builder());
}
