use std::time::Duration;

use reqwest::{
    header::HeaderMap,
    Method,
    StatusCode,
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}


/// Sends a single request, without any retrying
pub trait Transport {
    type Error: std::error::Error + Send + Sync + 'static;

    /// # Errors
    ///
    /// Fails only if no response was received at all.
    fn send(&mut self, request: &HttpRequest) -> Result<HttpResponse, Self::Error>;
}


#[derive(Debug, Clone)]
pub struct HttpTransport {
    net: reqwest::blocking::Client,
}

impl HttpTransport {
    /// With `https_only`, any request to a non `https` URL fails without being sent
    ///
    /// # Errors
    ///
    /// Fails if the TLS backend can't be initialized.
    pub fn new(https_only: bool) -> Result<Self, reqwest::Error> {
        let net = reqwest::blocking::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .https_only(https_only)
            .build()?;
        Ok(Self { net })
    }
}

impl Transport for HttpTransport {
    type Error = reqwest::Error;

    fn send(&mut self, request: &HttpRequest) -> Result<HttpResponse, Self::Error> {
        let mut builder = self
            .net
            .request(request.method.clone(), &request.url)
            .headers(request.headers.clone());
        if let Some(ref body) = request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send()?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes()?.to_vec();
        Ok(HttpResponse { status, headers, body })
    }
}
