//! Request routing.

use crate::parser::Method;

/// Every path the share server answers.
///
/// Resolved once per request; adding a route means adding a variant here and
/// handling it wherever routes are matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `GET /`: the self-refreshing file table.
    Index,
    /// `GET /api/files`
    ListFiles,
    /// `GET /api/clients`
    ListClients,
    /// `GET /api/logs`
    ListLogs,
    /// `GET /download?name=...`
    Download,
    /// A known path requested with a method other than GET.
    MethodNotAllowed,
    NotFound,
}

impl Route {
    /// Resolve a route from the method and the query-stripped path.
    pub fn resolve(method: Method, path: &str) -> Self {
        let route = match path {
            "/" => Route::Index,
            "/api/files" => Route::ListFiles,
            "/api/clients" => Route::ListClients,
            "/api/logs" => Route::ListLogs,
            "/download" => Route::Download,
            _ => return Route::NotFound,
        };

        if method == Method::GET {
            route
        } else {
            Route::MethodNotAllowed
        }
    }

    /// Paths with a handler, for the start-up banner.
    pub fn endpoints() -> &'static [&'static str] {
        &["/", "/api/files", "/api/clients", "/api/logs", "/download?name=<file>"]
    }
}
