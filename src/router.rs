//! Route table: (path, method) → route.
//!
//! Paths live in one radix tree ([`matchit`]). Each path node owns the routes
//! registered under it, one per method. That layout is what lets
//! [`RouteTable::resolve`] tell "no such path" (404) apart from "path exists,
//! method does not" (405).

use std::collections::HashMap;
use std::sync::Arc;

use matchit::Router as MatchitRouter;

use crate::error::Error;
use crate::handler::BoxedHandler;
use crate::method::Method;
use tracing::warn;

use crate::middleware::{Middleware, MiddlewareId, SharedMiddleware, compose, unmatched_forbidden};

// ── Route ─────────────────────────────────────────────────────────────────────

/// One registered (path, method) pair with its handler and middleware.
pub struct Route {
    path: String,
    method: Method,
    handler: BoxedHandler,
    middlewares: Vec<SharedMiddleware>,
    forbidden: Vec<MiddlewareId>,
    chain: Vec<SharedMiddleware>,
}

impl Route {
    pub(crate) fn new(method: Method, path: &str, handler: BoxedHandler, options: RouteOptions) -> Self {
        Self {
            path: path.to_owned(),
            method,
            handler,
            middlewares: options.middlewares,
            forbidden: options.forbidden,
            chain: Vec::new(),
        }
    }

    pub fn path(&self) -> &str { &self.path }
    pub fn method(&self) -> Method { self.method }
    pub fn forbidden(&self) -> &[MiddlewareId] { &self.forbidden }

    /// The composed middleware chain. Empty until the table is finalized.
    pub fn chain(&self) -> &[SharedMiddleware] { &self.chain }

    pub(crate) fn handler(&self) -> &BoxedHandler { &self.handler }
}

/// Per-route middleware configuration.
///
/// ```rust
/// use tsumugi::RouteOptions;
/// use tsumugi::middleware::ApiKey;
///
/// // run ApiKey on this route only, and skip the global logger
/// RouteOptions::new()
///     .middleware(ApiKey::new("s3cret"))
///     .forbid("logger");
/// ```
#[derive(Default)]
pub struct RouteOptions {
    middlewares: Vec<SharedMiddleware>,
    forbidden: Vec<MiddlewareId>,
}

impl RouteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a middleware that runs after the global ones.
    pub fn middleware(self, mw: impl Middleware) -> Self {
        self.shared_middleware(Arc::new(mw))
    }

    pub fn shared_middleware(mut self, mw: SharedMiddleware) -> Self {
        self.middlewares.push(mw);
        self
    }

    /// Removes every middleware with this identity from the route's chain,
    /// global or local.
    pub fn forbid(mut self, id: impl Into<MiddlewareId>) -> Self {
        self.forbidden.push(id.into());
        self
    }
}

// ── Resolution ────────────────────────────────────────────────────────────────

/// Result of looking up a request.
pub enum Resolution<'a> {
    Found {
        route: &'a Route,
        params: HashMap<String, String>,
    },
    /// The path exists but not under this method. `allowed` is sorted.
    MethodNotAllowed { allowed: Vec<Method> },
    NotFound,
}

impl<'a> Resolution<'a> {
    pub fn route_found(&self) -> bool {
        !matches!(self, Self::NotFound)
    }

    pub fn method_allowed(&self) -> bool {
        matches!(self, Self::Found { .. })
    }

    pub fn route(&self) -> Option<&'a Route> {
        match self {
            Self::Found { route, .. } => Some(*route),
            _ => None,
        }
    }
}

// ── RouteTable ────────────────────────────────────────────────────────────────

/// Registered routes.
///
/// Registration is append-only. After [`App::build`](crate::App::build) the
/// table is only read, so concurrent lookups need no locking.
#[derive(Default)]
pub struct RouteTable {
    tree: MatchitRouter<usize>,
    paths: Vec<Vec<Route>>,
    slots: HashMap<String, usize>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a route. On error the table is left exactly as it was.
    pub fn register(&mut self, route: Route) -> Result<(), Error> {
        if let Some(&slot) = self.slots.get(&route.path) {
            let routes = &mut self.paths[slot];
            if routes.iter().any(|r| r.method == route.method) {
                return Err(Error::DuplicateRoute { method: route.method, path: route.path });
            }
            routes.push(route);
            return Ok(());
        }

        let slot = self.paths.len();
        self.tree
            .insert(route.path.clone(), slot)
            .map_err(|source| Error::InvalidPath { path: route.path.clone(), source })?;
        self.slots.insert(route.path.clone(), slot);
        self.paths.push(vec![route]);
        Ok(())
    }

    pub fn resolve(&self, path: &str, method: &http::Method) -> Resolution<'_> {
        let Ok(matched) = self.tree.at(path) else {
            return Resolution::NotFound;
        };
        let routes = &self.paths[*matched.value];

        let route = Method::from_http(method).and_then(|m| routes.iter().find(|r| r.method == m));
        match route {
            Some(route) => Resolution::Found {
                route,
                params: matched.params.iter().map(|(k, v)| (k.to_owned(), v.to_owned())).collect(),
            },
            None => {
                let mut allowed: Vec<Method> = routes.iter().map(|r| r.method).collect();
                allowed.sort_unstable();
                Resolution::MethodNotAllowed { allowed }
            }
        }
    }

    /// Every route, grouped by path in registration order.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.paths.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.paths.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Composes each route's chain against the global middleware list.
    ///
    /// A forbidden identity that matches nothing the route would run is
    /// logged at `WARN`, with same-named candidates when there are any.
    pub(crate) fn finalize(&mut self, global: &[SharedMiddleware]) {
        for route in self.paths.iter_mut().flatten() {
            for id in unmatched_forbidden(global, &route.middlewares, &route.forbidden) {
                let candidates: Vec<String> = global
                    .iter()
                    .chain(&route.middlewares)
                    .map(|mw| mw.identity())
                    .filter(|candidate| candidate.name() == id.name())
                    .map(|candidate| candidate.to_string())
                    .collect();
                warn!(
                    method = %route.method,
                    path = %route.path,
                    forbidden = %id,
                    candidates = ?candidates,
                    "forbidden middleware matches nothing on this route"
                );
            }
            route.chain = compose(global, &route.middlewares, &route.forbidden);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Handler;
    use crate::reply::Reply;
    use crate::request::Request;

    fn route(method: Method, path: &str, reply: &'static str) -> Route {
        let handler = move |_req: Request| async move { reply };
        Route::new(method, path, handler.into_boxed_handler(), RouteOptions::new())
    }

    async fn call(route: &Route) -> String {
        let req = Request::builder().build().unwrap();
        match route.handler().call(req).await {
            Ok(Reply::Text(text)) => text,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn registered_pair_resolves_to_its_handler() {
        let mut table = RouteTable::new();
        table.register(route(Method::Get, "/users", "list")).unwrap();
        table.register(route(Method::Post, "/users", "create")).unwrap();

        let res = table.resolve("/users", &http::Method::POST);
        assert!(res.route_found());
        assert!(res.method_allowed());
        let found = res.route().unwrap();
        assert_eq!((found.method(), found.path()), (Method::Post, "/users"));
        assert_eq!(call(found).await, "create");
    }

    #[test]
    fn known_path_with_other_method_is_not_allowed() {
        let mut table = RouteTable::new();
        table.register(route(Method::Put, "/items", "put")).unwrap();
        table.register(route(Method::Get, "/items", "get")).unwrap();

        let res = table.resolve("/items", &http::Method::DELETE);
        assert!(res.route_found());
        assert!(!res.method_allowed());
        assert!(res.route().is_none());
        assert!(matches!(res, Resolution::MethodNotAllowed { ref allowed } if allowed == &[Method::Get, Method::Put]));

        // methods outside the supported set land here too
        assert!(!table.resolve("/items", &http::Method::HEAD).method_allowed());
    }

    #[test]
    fn unknown_path_is_not_found() {
        let mut table = RouteTable::new();
        table.register(route(Method::Get, "/a", "a")).unwrap();

        let res = table.resolve("/b", &http::Method::GET);
        assert!(!res.route_found());
        assert!(!res.method_allowed());
        assert!(!table.resolve("/a/b", &http::Method::GET).route_found());
    }

    #[tokio::test]
    async fn duplicate_registration_fails_and_leaves_table_unchanged() {
        let mut table = RouteTable::new();
        table.register(route(Method::Get, "/a", "first")).unwrap();

        let err = table.register(route(Method::Get, "/a", "second")).unwrap_err();
        assert!(matches!(err, Error::DuplicateRoute { method: Method::Get, ref path } if path == "/a"));
        assert_eq!(table.len(), 1);
        let found = table.resolve("/a", &http::Method::GET);
        assert_eq!(call(found.route().unwrap()).await, "first");
    }

    #[test]
    fn path_parameters_are_captured() {
        let mut table = RouteTable::new();
        table.register(route(Method::Get, "/users/{id}/posts/{post}", "x")).unwrap();

        match table.resolve("/users/42/posts/7", &http::Method::GET) {
            Resolution::Found { params, .. } => {
                assert_eq!(params["id"], "42");
                assert_eq!(params["post"], "7");
            }
            _ => panic!("route should resolve"),
        }
    }

    #[test]
    fn conflicting_patterns_are_rejected() {
        let mut table = RouteTable::new();
        table.register(route(Method::Get, "/users/{id}", "x")).unwrap();

        let err = table.register(route(Method::Get, "/users/{name}", "y")).unwrap_err();
        assert!(matches!(err, Error::InvalidPath { .. }));
        assert_eq!(table.len(), 1);
    }
}
