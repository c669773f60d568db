//! Stateless HTTP request builder and response parser for the tasks API.
//!
//! # Design
//! `ApiClient` holds only a `base_url` and carries no mutable state between
//! calls. Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! Every request carries credentials. A 401 becomes `ApiError::Unauthorized`
//! unless the call opted out with `skip_auth`. Reacting to it is left to the
//! caller.

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ApiError, ErrorBody};
use crate::http::{Credentials, HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    AuthResponse, CreateTask, ListTasks, LoginRequest, Task, TaskList,
    UpdateTask,
};

pub const SIGN_UP: &str = "/auth/signup";
pub const SIGN_IN: &str = "/auth/signin";
pub const SIGN_OUT: &str = "/auth/signout";

/// Options for a single call through `ApiClient::request`.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: HttpMethod,
    pub body: Option<String>,
    pub headers: Vec<(String, String)>,
    /// Treat a 401 like any other error status instead of the
    /// unauthenticated signal.
    pub skip_auth: bool,
}

impl RequestOptions {
    pub fn new(method: HttpMethod) -> Self {
        Self {
            method,
            body: None,
            headers: Vec::new(),
            skip_auth: false,
        }
    }

    pub fn json<T: Serialize>(mut self, payload: &T) -> Result<Self, ApiError> {
        let body =
            serde_json::to_string(payload).map_err(|e| ApiError::Serialization(e.to_string()))?;
        self.body = Some(body);
        Ok(self)
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn skip_auth(mut self) -> Self {
        self.skip_auth = true;
        self
    }
}

/// Synchronous, stateless client for the tasks API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a request for `endpoint` (relative to the base URL).
    ///
    /// `content-type: application/json` is always present; caller headers
    /// with the same name replace it.
    pub fn request(&self, endpoint: &str, options: &RequestOptions) -> HttpRequest {
        let mut headers = vec![("content-type".to_string(), "application/json".to_string())];
        for (name, value) in &options.headers {
            headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
            headers.push((name.clone(), value.clone()));
        }
        HttpRequest {
            method: options.method,
            path: format!("{}{endpoint}", self.base_url),
            headers,
            body: options.body.clone(),
            credentials: Credentials::Include,
            skip_auth: options.skip_auth,
        }
    }

    /// Translate the response to `request` into a typed value, `None` for
    /// 204, or an error. The request's `skip_auth` decides how a 401 reads.
    pub fn parse<T: DeserializeOwned>(
        &self,
        request: &HttpRequest,
        response: HttpResponse,
    ) -> Result<Option<T>, ApiError> {
        self.decode(response, request.skip_auth)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        response: HttpResponse,
        skip_auth: bool,
    ) -> Result<Option<T>, ApiError> {
        if response.status == 401 && !skip_auth {
            return Err(ApiError::Unauthorized);
        }
        if response.status == 204 {
            return Ok(None);
        }
        if !response.is_success() {
            return Err(ErrorBody::from_body(&response.body).into_api_error(response.status));
        }
        serde_json::from_str(&response.body)
            .map(Some)
            .map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    // -----------------------------------------------------------------------
    // Auth
    // -----------------------------------------------------------------------

    pub fn build_sign_up(&self, email: &str, password: &str) -> Result<HttpRequest, ApiError> {
        self.build_credentials(SIGN_UP, email, password)
    }

    pub fn build_sign_in(&self, email: &str, password: &str) -> Result<HttpRequest, ApiError> {
        self.build_credentials(SIGN_IN, email, password)
    }

    pub fn build_sign_out(&self) -> HttpRequest {
        self.request(SIGN_OUT, &RequestOptions::new(HttpMethod::Post))
    }

    /// Parse a sign-up or sign-in response. 401 is an ordinary failure here.
    pub fn parse_auth(&self, response: HttpResponse) -> Result<AuthResponse, ApiError> {
        required(self.decode(response, true)?)
    }

    pub fn parse_sign_out(&self, response: HttpResponse) -> Result<(), ApiError> {
        self.decode::<serde_json::Value>(response, false)?;
        Ok(())
    }

    fn build_credentials(
        &self,
        endpoint: &str,
        email: &str,
        password: &str,
    ) -> Result<HttpRequest, ApiError> {
        let payload = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let options = RequestOptions::new(HttpMethod::Post).json(&payload)?.skip_auth();
        Ok(self.request(endpoint, &options))
    }

    // -----------------------------------------------------------------------
    // Tasks
    // -----------------------------------------------------------------------

    pub fn build_list_tasks(&self, user_id: Uuid, query: ListTasks) -> HttpRequest {
        let endpoint = format!("{}{}", tasks_path(user_id), query.query_string());
        self.request(&endpoint, &RequestOptions::new(HttpMethod::Get))
    }

    pub fn build_create_task(
        &self,
        user_id: Uuid,
        input: &CreateTask,
    ) -> Result<HttpRequest, ApiError> {
        let options = RequestOptions::new(HttpMethod::Post).json(input)?;
        Ok(self.request(&tasks_path(user_id), &options))
    }

    pub fn build_get_task(&self, user_id: Uuid, task_id: Uuid) -> HttpRequest {
        self.request(&task_path(user_id, task_id), &RequestOptions::new(HttpMethod::Get))
    }

    pub fn build_update_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        input: &UpdateTask,
    ) -> Result<HttpRequest, ApiError> {
        let options = RequestOptions::new(HttpMethod::Put).json(input)?;
        Ok(self.request(&task_path(user_id, task_id), &options))
    }

    pub fn build_toggle_complete(&self, user_id: Uuid, task_id: Uuid) -> HttpRequest {
        let endpoint = format!("{}/complete", task_path(user_id, task_id));
        self.request(&endpoint, &RequestOptions::new(HttpMethod::Patch))
    }

    pub fn build_delete_task(&self, user_id: Uuid, task_id: Uuid) -> HttpRequest {
        self.request(&task_path(user_id, task_id), &RequestOptions::new(HttpMethod::Delete))
    }

    pub fn parse_task_list(&self, response: HttpResponse) -> Result<TaskList, ApiError> {
        required(self.decode(response, false)?)
    }

    /// Parse any endpoint answering with a single task (get, create, update,
    /// toggle).
    pub fn parse_task(&self, response: HttpResponse) -> Result<Task, ApiError> {
        required(self.decode(response, false)?)
    }

    pub fn parse_delete_task(&self, response: HttpResponse) -> Result<(), ApiError> {
        self.decode::<serde_json::Value>(response, false)?;
        Ok(())
    }
}

fn tasks_path(user_id: Uuid) -> String {
    format!("/users/{user_id}/tasks")
}

fn task_path(user_id: Uuid, task_id: Uuid) -> String {
    format!("/users/{user_id}/tasks/{task_id}")
}

fn required<T>(value: Option<T>) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::Deserialization("empty response body".to_string()))
}
