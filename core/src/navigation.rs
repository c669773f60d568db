//! Navigation seam for unauthenticated signals.
//!
//! The data layer never navigates. `TasksApi` hands a `Route` to the single
//! installed `Navigator`, which owns the actual page change.

use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Login => "/login",
        }
    }
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Records every navigation request. Useful for hosts that poll for the
/// next route and for tests.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn routes(&self) -> Vec<Route> {
        self.routes
            .lock()
            .map(|routes| routes.clone())
            .unwrap_or_default()
    }

    pub fn take(&self) -> Vec<Route> {
        self.routes
            .lock()
            .map(|mut routes| std::mem::take(&mut *routes))
            .unwrap_or_default()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        if let Ok(mut routes) = self.routes.lock() {
            routes.push(route);
        }
    }
}
