/// Security headers middleware
///
/// Adds the OWASP recommended response headers to every response:
///
/// - `X-Content-Type-Options: nosniff`
/// - `X-Frame-Options: DENY`
/// - `Referrer-Policy: strict-origin-when-cross-origin`
/// - `Permissions-Policy`
/// - `Content-Security-Policy` (API responses never load resources)
/// - `Strict-Transport-Security` in production only
///
/// # Example
///
/// ```no_run
/// use axum::{middleware::from_fn_with_state, Router};
/// use leadcrm_api::middleware::security::{security_headers, SecurityHeaders};
///
/// let app: Router = Router::new()
///     .layer(from_fn_with_state(SecurityHeaders::new(true), security_headers));
/// ```

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

const BASE_HEADERS: [(&str, &str); 5] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    (
        "permissions-policy",
        "geolocation=(), microphone=(), camera=(), payment=(), usb=()",
    ),
    (
        "content-security-policy",
        "default-src 'none'; frame-ancestors 'none'",
    ),
];

const HSTS: (&str, &str) = (
    "strict-transport-security",
    "max-age=31536000; includeSubDomains",
);

/// Middleware settings
#[derive(Debug, Clone, Copy)]
pub struct SecurityHeaders {
    /// Send HSTS; only behind HTTPS
    enable_hsts: bool,
}

impl SecurityHeaders {
    pub fn new(enable_hsts: bool) -> Self {
        Self { enable_hsts }
    }
}

/// Appends the security headers to the response of `next`
pub async fn security_headers(
    State(settings): State<SecurityHeaders>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    let hsts = settings.enable_hsts.then_some(HSTS);
    for (name, value) in BASE_HEADERS.into_iter().chain(hsts) {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }

    response
}
