use axum::{
    async_trait,
    body::Body,
    extract::{rejection::JsonRejection, FromRequest, Request as ExtractRequest},
    http::{HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use once_cell::sync::Lazy;
use prometheus::{IntCounterVec, Opts};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;

pub const ERROR_CODE_HEADER: &str = "X-Error-Code";

/// Every failure leaves the service in the same envelope the website's forms
/// already understand: `success: false` plus a human readable `message`.
#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub success: bool,
    pub code: String,
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    /// Malformed or missing input.
    BadRequest { code: &'static str, message: String },
    /// Request signature missing or wrong.
    Unauthorized { code: &'static str, message: String },
    /// Storage write failed; message is the route-specific public text.
    Persistence { message: String },
    /// Gateway pay call failed.
    PaymentInitiation { message: String },
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest { code, message: message.into() }
    }

    pub fn unauthorized(code: &'static str, message: impl Into<String>) -> Self {
        Self::Unauthorized { code, message: message.into() }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence { message: message.into() }
    }

    pub fn payment_initiation(message: impl Into<String>) -> Self {
        Self::PaymentInitiation { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest { code, .. } | ApiError::Unauthorized { code, .. } => *code,
            ApiError::Persistence { .. } => "persistence_error",
            ApiError::PaymentInitiation { .. } => "payment_initiation_failed",
            ApiError::Internal { .. } => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Persistence { .. }
            | ApiError::PaymentInitiation { .. }
            | ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_code = self.code();
        let message = match self {
            ApiError::BadRequest { message, .. }
            | ApiError::Unauthorized { message, .. }
            | ApiError::Persistence { message }
            | ApiError::PaymentInitiation { message }
            | ApiError::Internal { message } => message,
        };
        let body = ErrorBody { success: false, code: error_code.into(), message };
        let mut resp = (status, Json(body)).into_response();
        resp.headers_mut()
            .insert(ERROR_CODE_HEADER, HeaderValue::from_static(error_code));
        resp
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request("invalid_body", rejection.body_text())
    }
}

/// `Json` extractor whose rejections render as the [`ErrorBody`] envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: ExtractRequest, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

static HTTP_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let c = IntCounterVec::new(
        Opts::new(
            "http_errors_total",
            "Count of HTTP error responses emitted (status >= 400)",
        ),
        &["service", "code", "status"],
    )
    .expect("http_errors_total");
    let _ = prometheus::default_registry().register(Box::new(c.clone()));
    c
});

type LayerFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// Middleware (for `axum::middleware::from_fn`) counting responses with
/// status >= 400 by their `X-Error-Code` header.
pub fn http_error_metrics_layer(
    service: &'static str,
) -> impl Fn(Request<Body>, Next) -> LayerFuture + Clone + Send + Sync + 'static {
    move |req: Request<Body>, next: Next| {
        Box::pin(async move {
            let resp = next.run(req).await;
            let status = resp.status();
            if status.as_u16() >= 400 {
                let code = resp
                    .headers()
                    .get(ERROR_CODE_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                HTTP_ERRORS_TOTAL
                    .with_label_values(&[service, code, status.as_str()])
                    .inc();
            }
            resp
        })
    }
}
