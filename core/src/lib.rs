//! Synchronous API client core for the tasks service.
//!
//! # Overview
//! `ApiClient` builds `HttpRequest` values and parses `HttpResponse` values
//! without touching the network (host-does-IO pattern). `TasksApi` pairs it
//! with a `Transport`, an injected `SessionStore` and an optional
//! `Navigator` to run complete sign-in / task flows.
//!
//! # Design
//! - `ApiClient` is stateless. It holds only `base_url`.
//! - Every request is marked `Credentials::Include`. The session cookie
//!   belongs to the transport and is never read here.
//! - Non-2xx responses become `ApiError` values carrying the server's error
//!   envelope. A 401 becomes `ApiError::Unauthorized` and the facade routes
//!   it to the navigator. The client itself never navigates.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod api;
pub mod board;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod navigation;
pub mod session;
pub mod transport;
pub mod types;

pub use api::TasksApi;
pub use board::{BoardAction, TaskBoard};
pub use client::{ApiClient, RequestOptions};
pub use config::{ClientConfig, ConfigError};
pub use error::{ApiError, ErrorBody, ErrorEnvelope};
pub use http::{Credentials, HttpMethod, HttpRequest, HttpResponse};
pub use navigation::{Navigator, RecordingNavigator, Route};
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionError, SessionStore};
pub use transport::Transport;
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
pub use types::{AuthResponse, CreateTask, ListTasks, LoginRequest, Task, TaskList, UpdateTask, User};
