use crate::http::{make_error_response, make_ok_response};
use http_body_util::combinators::BoxBody;
use hyper::body::Bytes;
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use std::convert::Infallible;
use std::future::{Ready, ready};

/// Liveness and readiness endpoints for the process itself.
///
/// `/health` only proves the process is serving; it does not look at
/// upstream dependencies. `/ready` consults the supplied readiness check.
pub struct AdminService<F> {
    is_ready: F,
}

impl<F> AdminService<F>
where
    F: Fn() -> bool,
{
    pub fn new(is_ready: F) -> Self {
        Self { is_ready }
    }

    fn respond(&self, path: &str) -> Response<BoxBody<Bytes, Infallible>> {
        match path {
            "/health" => make_ok_response(),
            "/ready" => match (self.is_ready)() {
                true => make_ok_response(),
                false => make_error_response(StatusCode::SERVICE_UNAVAILABLE),
            },
            _ => make_error_response(StatusCode::NOT_FOUND),
        }
    }
}

impl<F, B> Service<Request<B>> for AdminService<F>
where
    F: Fn() -> bool,
{
    type Response = Response<BoxBody<Bytes, Infallible>>;
    type Error = Infallible;
    type Future = Ready<Result<Self::Response, Self::Error>>;

    fn call(&self, req: Request<B>) -> Self::Future {
        ready(Ok(self.respond(req.uri().path())))
    }
}
