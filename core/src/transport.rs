//! Executing `HttpRequest`s.
//!
//! `Transport` is the I/O boundary between the stateless `ApiClient` and the
//! network. Non-2xx statuses are data, not errors. Only a failure to obtain
//! any response at all is an `ApiError::Transport`.

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};

pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }
}

#[cfg(feature = "ureq")]
pub use self::blocking::UreqTransport;

#[cfg(feature = "ureq")]
mod blocking {
    use std::time::Duration;

    use tracing::debug;

    use super::Transport;
    use crate::error::ApiError;
    use crate::http::{HttpMethod, HttpRequest, HttpResponse};

    /// Blocking transport backed by `ureq`.
    ///
    /// The agent keeps a cookie jar, so the session cookie set by sign-in is
    /// replayed on every later request. Clones share the jar.
    #[derive(Debug, Clone)]
    pub struct UreqTransport {
        agent: ureq::Agent,
    }

    impl UreqTransport {
        pub fn new(timeout: Duration) -> Self {
            Self {
                agent: new_agent(timeout),
            }
        }
    }

    impl Default for UreqTransport {
        fn default() -> Self {
            Self::new(Duration::from_secs(30))
        }
    }

    fn new_agent(timeout: Duration) -> ureq::Agent {
        ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent()
    }

    fn with_headers<B>(
        mut builder: ureq::RequestBuilder<B>,
        headers: &[(String, String)],
    ) -> ureq::RequestBuilder<B> {
        for (name, value) in headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder
    }

    impl Transport for UreqTransport {
        fn execute(&self, req: &HttpRequest) -> Result<HttpResponse, ApiError> {
            let agent = &self.agent;
            debug!(method = %req.method, url = %req.path, "sending request");

            let body = req.body.as_deref();
            let result = match req.method {
                HttpMethod::Get => with_headers(agent.get(&req.path), &req.headers).call(),
                HttpMethod::Delete => with_headers(agent.delete(&req.path), &req.headers).call(),
                HttpMethod::Post => send(with_headers(agent.post(&req.path), &req.headers), body),
                HttpMethod::Put => send(with_headers(agent.put(&req.path), &req.headers), body),
                HttpMethod::Patch => send(with_headers(agent.patch(&req.path), &req.headers), body),
            };
            let mut response = result.map_err(|e| ApiError::Transport(e.to_string()))?;

            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_string(), v.to_string()))
                })
                .collect();
            let body = response
                .body_mut()
                .read_to_string()
                .map_err(|e| ApiError::Transport(e.to_string()))?;
            debug!(status, url = %req.path, "received response");

            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        }
    }

    fn send(
        builder: ureq::RequestBuilder<ureq::typestate::WithBody>,
        body: Option<&str>,
    ) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
        match body {
            Some(body) => builder.send(body.as_bytes()),
            None => builder.send_empty(),
        }
    }
}
