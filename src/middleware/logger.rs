use std::time::Instant;

use tracing::{info, warn};

use super::{Middleware, MiddlewareId};
use crate::fault::HandlerError;
use crate::request::Request;
use crate::response::Response;

/// Start time recorded by [`Logger`] in the request state bag.
#[derive(Clone, Copy, Debug)]
pub struct RequestStart(pub Instant);

/// Access log: one event per request with method, path, status and latency.
///
/// Server errors are logged at `WARN`, everything else at `INFO`.
pub struct Logger;

impl Middleware for Logger {
    fn identity(&self) -> MiddlewareId {
        MiddlewareId::new("logger")
    }

    fn before(&self, req: &mut Request) -> Result<(), HandlerError> {
        req.state_mut().insert(RequestStart(Instant::now()));
        Ok(())
    }

    fn after(&self, req: &Request, res: &mut Response) -> Result<(), HandlerError> {
        let elapsed_ms = req
            .state()
            .get::<RequestStart>()
            .map(|start| start.0.elapsed().as_secs_f64() * 1000.0);
        let status = res.status_code();
        let query = req.query_string().unwrap_or("");

        if status >= 500 {
            warn!(method = %req.method(), path = req.path(), query, status, elapsed_ms, "request");
        } else {
            info!(method = %req.method(), path = req.path(), query, status, elapsed_ms, "request");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_start_time_before_and_reads_it_after() {
        let mut req = Request::builder().uri("/ping?x=1").build().unwrap();
        Logger.before(&mut req).unwrap();
        assert!(req.state().get::<RequestStart>().is_some());

        let mut res = Response::text("pong");
        Logger.after(&req, &mut res).unwrap();
        assert_eq!(res.body(), b"pong".as_slice());
    }
}
