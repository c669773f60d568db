//! Session-aware facade over `ApiClient` and a `Transport`.
//!
//! # Design
//! `TasksApi` runs build → execute → parse for every operation and owns the
//! reactions the stateless client leaves to its caller:
//! - sign-up / sign-in save the returned identity in the injected
//!   `SessionStore`;
//! - sign-out clears it whatever the server says;
//! - an `ApiError::Unauthorized` from a task call clears the session and
//!   sends the navigator to the login route, once per call.
//!
//! Calls are sequential and never retried.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::navigation::{Navigator, Route};
use crate::session::{Session, SessionStore};
use crate::transport::Transport;
use crate::types::{AuthResponse, CreateTask, ListTasks, Task, TaskList, UpdateTask};

pub struct TasksApi<T> {
    client: ApiClient,
    transport: T,
    session: Arc<dyn SessionStore>,
    navigator: Option<Arc<dyn Navigator>>,
}

#[cfg(feature = "ureq")]
impl TasksApi<crate::transport::UreqTransport> {
    /// Wire a blocking client from configuration: `ureq` transport plus a
    /// file-backed session when `session_file` is set.
    pub fn from_config(config: &crate::config::ClientConfig) -> Self {
        let session: Arc<dyn SessionStore> = match &config.session_file {
            Some(path) => Arc::new(crate::session::FileSessionStore::new(path)),
            None => Arc::new(crate::session::MemorySessionStore::new()),
        };
        Self::new(
            ApiClient::new(&config.base_url),
            crate::transport::UreqTransport::new(config.timeout),
            session,
        )
    }
}

impl<T: Transport> TasksApi<T> {
    pub fn new(client: ApiClient, transport: T, session: Arc<dyn SessionStore>) -> Self {
        Self {
            client,
            transport,
            session,
            navigator: None,
        }
    }

    /// Install the navigation controller. Without one, unauthenticated
    /// signals are only reported through the returned error.
    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn current_session(&self) -> Result<Option<Session>, ApiError> {
        Ok(self.session.load()?)
    }

    // -----------------------------------------------------------------------
    // Auth
    // -----------------------------------------------------------------------

    #[instrument(skip(self, password))]
    pub fn sign_up(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let request = self.client.build_sign_up(email, password)?;
        let auth = self.exchange(&request, ApiClient::parse_auth)?;
        self.remember(&auth)?;
        info!(user_id = %auth.user.id, "account created");
        Ok(auth)
    }

    #[instrument(skip(self, password))]
    pub fn sign_in(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let request = self.client.build_sign_in(email, password)?;
        let auth = self.exchange(&request, ApiClient::parse_auth)?;
        self.remember(&auth)?;
        info!(user_id = %auth.user.id, "signed in");
        Ok(auth)
    }

    /// End the session. The local identity is cleared even when the server
    /// call fails; that failure is logged, not returned.
    #[instrument(skip(self))]
    pub fn sign_out(&self) -> Result<(), ApiError> {
        let request = self.client.build_sign_out();
        if let Err(e) = self.exchange(&request, ApiClient::parse_sign_out) {
            warn!(error = %e, "sign-out request failed, clearing local session anyway");
        }
        self.session.clear()?;
        info!("signed out");
        Ok(())
    }

    fn remember(&self, auth: &AuthResponse) -> Result<(), ApiError> {
        self.session.save(&Session::from(&auth.user))?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Tasks
    // -----------------------------------------------------------------------

    pub fn list_tasks(&self, query: ListTasks) -> Result<TaskList, ApiError> {
        let uid = self.user_id()?;
        let list = self.call(&self.client.build_list_tasks(uid, query), ApiClient::parse_task_list)?;
        debug!(count = list.tasks.len(), total = list.total, "listed tasks");
        Ok(list)
    }

    pub fn create_task(&self, input: &CreateTask) -> Result<Task, ApiError> {
        input.validate()?;
        let uid = self.user_id()?;
        let task = self.call(&self.client.build_create_task(uid, input)?, ApiClient::parse_task)?;
        debug!(task_id = %task.id, "created task");
        Ok(task)
    }

    pub fn get_task(&self, task_id: Uuid) -> Result<Task, ApiError> {
        let uid = self.user_id()?;
        self.call(&self.client.build_get_task(uid, task_id), ApiClient::parse_task)
    }

    pub fn update_task(&self, task_id: Uuid, input: &UpdateTask) -> Result<Task, ApiError> {
        input.validate()?;
        let uid = self.user_id()?;
        let request = self.client.build_update_task(uid, task_id, input)?;
        self.call(&request, ApiClient::parse_task)
    }

    pub fn toggle_complete(&self, task_id: Uuid) -> Result<Task, ApiError> {
        let uid = self.user_id()?;
        let task = self.call(&self.client.build_toggle_complete(uid, task_id), ApiClient::parse_task)?;
        debug!(task_id = %task.id, completed = task.is_completed, "toggled task");
        Ok(task)
    }

    pub fn delete_task(&self, task_id: Uuid) -> Result<(), ApiError> {
        let uid = self.user_id()?;
        self.call(&self.client.build_delete_task(uid, task_id), ApiClient::parse_delete_task)?;
        debug!(%task_id, "deleted task");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Plumbing
    // -----------------------------------------------------------------------

    /// Cached user id, or `SignedOut` (and a trip to the login page).
    fn user_id(&self) -> Result<Uuid, ApiError> {
        match self.session.load()? {
            Some(session) => Ok(session.user_id),
            None => {
                debug!("no cached session");
                self.navigate(Route::Login);
                Err(ApiError::SignedOut)
            }
        }
    }

    fn exchange<R>(
        &self,
        request: &HttpRequest,
        parse: impl FnOnce(&ApiClient, HttpResponse) -> Result<R, ApiError>,
    ) -> Result<R, ApiError> {
        let response = self.transport.execute(request)?;
        parse(&self.client, response)
    }

    /// `exchange` plus the unauthenticated reaction.
    fn call<R>(
        &self,
        request: &HttpRequest,
        parse: impl FnOnce(&ApiClient, HttpResponse) -> Result<R, ApiError>,
    ) -> Result<R, ApiError> {
        let result = self.exchange(request, parse);
        if let Err(ApiError::Unauthorized) = &result {
            warn!(url = %request.path, "session rejected by server");
            if let Err(e) = self.session.clear() {
                warn!(error = %e, "failed to clear session");
            }
            self.navigate(Route::Login);
        }
        result
    }

    fn navigate(&self, route: Route) {
        if let Some(navigator) = &self.navigator {
            navigator.navigate(route);
        }
    }
}
