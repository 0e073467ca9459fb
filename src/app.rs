//! Application builder: the registration API.

use std::sync::Arc;

use tracing::debug;

use crate::adapter::ResponseAdapter;
use crate::config::Config;
use crate::context::Context;
use crate::dispatcher::Dispatcher;
use crate::error::Error;
use crate::handler::Handler;
use crate::method::Method;
use crate::middleware::{Middleware, MiddlewareRegistry, Params, SharedMiddleware};
use crate::response::ContentType;
use crate::router::{Route, RouteOptions, RouteTable};

/// Collects routes and global middleware, then freezes them into a
/// [`Dispatcher`].
///
/// Every registration call validates immediately and returns `&mut Self`, so
/// calls chain with `?`:
///
/// ```rust
/// use tsumugi::{App, Method, Request, RouteOptions};
/// use tsumugi::middleware::{ApiKey, Logger};
///
/// async fn list(_req: Request) -> &'static str { "[]" }
/// async fn create(_req: Request) -> &'static str { "created" }
/// async fn health(_req: Request) -> &'static str { "ok" }
///
/// # fn main() -> Result<(), tsumugi::Error> {
/// let mut app = App::new();
/// app.register_middleware(Logger)
///     .get("/users", list)?
///     .on(Method::Post, "/users", create, RouteOptions::new().middleware(ApiKey::new("s3cret")))?
///     .on(Method::Get, "/healthz", health, RouteOptions::new().forbid("logger"))?;
///
/// let dispatcher = app.build();
/// # Ok(())
/// # }
/// ```
///
/// Route chains are composed in [`build`](App::build), so a global
/// middleware registered after a route still applies to it.
pub struct App {
    table: RouteTable,
    globals: Vec<SharedMiddleware>,
    registry: MiddlewareRegistry,
    context: Arc<Context>,
    adapter: ResponseAdapter,
    expose_errors: bool,
}

impl App {
    pub fn new() -> Self {
        Self {
            table: RouteTable::new(),
            globals: Vec::new(),
            registry: MiddlewareRegistry::default(),
            context: Arc::new(Context::default()),
            adapter: ResponseAdapter::new(),
            expose_errors: false,
        }
    }

    /// `App::new()` followed by [`configure`](App::configure).
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let mut app = Self::new();
        app.configure(config)?;
        Ok(app)
    }

    /// Applies configuration: context constants, response policy, and the
    /// configured global middleware, instantiated through the registry in
    /// the order listed.
    ///
    /// Register custom middleware names with
    /// [`registry_mut`](App::registry_mut) before calling this.
    pub fn configure(&mut self, config: &Config) -> Result<&mut Self, Error> {
        self.context = Arc::new(Context::from_config(config));
        self.adapter = self.adapter.with_text_content_type(config.text_content_type);
        self.expose_errors = config.debug;
        for spec in config.get_middleware() {
            self.register_middleware_named(&spec.name, &spec.params)?;
        }
        Ok(self)
    }

    pub fn registry_mut(&mut self) -> &mut MiddlewareRegistry {
        &mut self.registry
    }

    /// Application context for handlers to capture.
    pub fn context(&self) -> Arc<Context> {
        Arc::clone(&self.context)
    }

    /// Content type used for plain string replies.
    pub fn text_content_type(&mut self, content_type: ContentType) -> &mut Self {
        self.adapter = self.adapter.with_text_content_type(content_type);
        self
    }

    /// Include internal error text in `500` bodies. Off by default.
    pub fn expose_errors(&mut self, expose: bool) -> &mut Self {
        self.expose_errors = expose;
        self
    }

    // ── Global middleware ────────────────────────────────────────────────────

    pub fn register_middleware(&mut self, mw: impl Middleware) -> &mut Self {
        self.register_shared_middleware(Arc::new(mw))
    }

    pub fn register_shared_middleware(&mut self, mw: SharedMiddleware) -> &mut Self {
        debug!(middleware = %mw.identity(), "global middleware registered");
        self.globals.push(mw);
        self
    }

    /// Instantiates a middleware by registry name and registers it globally.
    pub fn register_middleware_named(&mut self, name: &str, params: &Params) -> Result<&mut Self, Error> {
        let mw = self.registry.build(name, params, &self.context)?;
        Ok(self.register_shared_middleware(mw))
    }

    // ── Routes ───────────────────────────────────────────────────────────────

    /// Registers a handler for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them.
    pub fn on(
        &mut self,
        method: Method,
        path: &str,
        handler: impl Handler,
        options: RouteOptions,
    ) -> Result<&mut Self, Error> {
        self.table.register(Route::new(method, path, handler.into_boxed_handler(), options))?;
        debug!(%method, path, "route registered");
        Ok(self)
    }

    /// Like [`on`](App::on) with the method given as a string, e.g. `"get"`.
    pub fn route(
        &mut self,
        method: &str,
        path: &str,
        handler: impl Handler,
        options: RouteOptions,
    ) -> Result<&mut Self, Error> {
        self.on(method.parse()?, path, handler, options)
    }

    pub fn get(&mut self, path: &str, handler: impl Handler) -> Result<&mut Self, Error> {
        self.on(Method::Get, path, handler, RouteOptions::new())
    }

    pub fn post(&mut self, path: &str, handler: impl Handler) -> Result<&mut Self, Error> {
        self.on(Method::Post, path, handler, RouteOptions::new())
    }

    pub fn put(&mut self, path: &str, handler: impl Handler) -> Result<&mut Self, Error> {
        self.on(Method::Put, path, handler, RouteOptions::new())
    }

    pub fn delete(&mut self, path: &str, handler: impl Handler) -> Result<&mut Self, Error> {
        self.on(Method::Delete, path, handler, RouteOptions::new())
    }

    pub fn patch(&mut self, path: &str, handler: impl Handler) -> Result<&mut Self, Error> {
        self.on(Method::Patch, path, handler, RouteOptions::new())
    }

    /// Composes every route's middleware chain and freezes the application.
    pub fn build(mut self) -> Dispatcher {
        self.table.finalize(&self.globals);
        for route in self.table.routes() {
            let chain: Vec<String> = route.chain().iter().map(|m| m.identity().to_string()).collect();
            debug!(method = %route.method(), path = route.path(), chain = ?chain, "route ready");
        }
        Dispatcher::new(self.table, self.adapter, self.expose_errors)
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Request;

    async fn ok(_req: Request) -> &'static str {
        "ok"
    }

    #[test]
    fn string_methods_are_validated() {
        let mut app = App::new();
        assert!(app.route("patch", "/a", ok, RouteOptions::new()).is_ok());
        let err = app.route("TRACE", "/a", ok, RouteOptions::new()).err().unwrap();
        assert!(matches!(err, Error::UnsupportedMethod(m) if m == "TRACE"));
    }

    #[test]
    fn duplicate_routes_fail_at_registration() {
        let mut app = App::new();
        app.get("/a", ok).unwrap();
        assert!(matches!(app.get("/a", ok).err().unwrap(), Error::DuplicateRoute { .. }));
        assert!(app.post("/a", ok).is_ok());
    }

    #[test]
    fn unknown_named_middleware_fails_at_registration() {
        let mut app = App::new();
        let err = app.register_middleware_named("nope", &Params::new()).err().unwrap();
        assert!(matches!(err, Error::UnknownMiddleware(_)));
    }

    #[test]
    fn globals_registered_after_a_route_still_apply() {
        let mut app = App::new();
        app.get("/a", ok).unwrap();
        app.register_middleware(crate::middleware::Logger);

        let dispatcher = app.build();
        let route = dispatcher.routes().routes().next().unwrap();
        assert_eq!(route.chain().len(), 1);
    }
}
