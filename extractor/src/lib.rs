use middleware::{auth::AuthGuard, extractor::ExtractionMiddleware};

pub mod middleware {
    pub mod auth;
    pub mod extractor;
}

/// Decodes the bearer token, if any, into request extensions.
pub fn middleware() -> ExtractionMiddleware {
    ExtractionMiddleware::new()
}

/// Rejects requests without valid claims and injects the `Principal`.
pub fn auth_middleware() -> AuthGuard {
    AuthGuard::new()
}
