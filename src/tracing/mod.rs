/*!
 * Request correlation for logs.
 *
 * The id of the request being served lives in a task-local for the duration
 * of the handler, so service code can log it without threading it through
 * every call.
 */

use axum::http::{HeaderValue, Request};
use std::{fmt, future::Future, sync::Arc};
use tower_http::trace::MakeSpan;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest caller-supplied id that is echoed back instead of replaced.
const MAX_CALLER_ID_LEN: usize = 128;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(Arc<str>);

impl RequestId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string().into())
    }

    /// Accepts a caller's id when it is short printable ASCII.
    pub fn from_header(value: &HeaderValue) -> Option<Self> {
        let raw = value.to_str().ok()?.trim();
        let acceptable = !raw.is_empty()
            && raw.len() <= MAX_CALLER_ID_LEN
            && raw.bytes().all(|b| b.is_ascii_graphic());
        acceptable.then(|| Self(raw.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_header_value(&self) -> Option<HeaderValue> {
        HeaderValue::from_str(&self.0).ok()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

tokio::task_local! {
    static REQUEST_ID: RequestId;
}

/// Runs `future` with `request_id` visible through [`current_request_id`].
pub async fn scope_request_id<F: Future>(request_id: RequestId, future: F) -> F::Output {
    REQUEST_ID.scope(request_id, future).await
}

pub fn current_request_id() -> Option<RequestId> {
    REQUEST_ID.try_with(RequestId::clone).ok()
}

/// `TraceLayer` span factory; reads the id the middleware stored in the
/// request extensions.
#[derive(Clone, Copy, Default)]
pub struct RequestSpanMaker;

impl<B> MakeSpan<B> for RequestSpanMaker {
    fn make_span(&mut self, request: &Request<B>) -> tracing::Span {
        let request_id = request
            .extensions()
            .get::<RequestId>()
            .map(RequestId::as_str)
            .unwrap_or("-");

        tracing::info_span!(
            "http.request",
            %request_id,
            method = %request.method(),
            path = %request.uri().path(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn id_is_visible_inside_scope_only() {
        assert!(current_request_id().is_none());

        let id = RequestId::generate();
        let seen = scope_request_id(id.clone(), async { current_request_id() }).await;
        assert_eq!(seen, Some(id));

        assert!(current_request_id().is_none());
    }

    #[test]
    fn caller_ids_are_screened() {
        let ok = HeaderValue::from_static("batch-7/req-1");
        assert_eq!(RequestId::from_header(&ok).unwrap().as_str(), "batch-7/req-1");

        let spaced = HeaderValue::from_static("two words");
        assert!(RequestId::from_header(&spaced).is_none());

        let long = HeaderValue::from_str(&"x".repeat(MAX_CALLER_ID_LEN + 1)).unwrap();
        assert!(RequestId::from_header(&long).is_none());
    }

    #[test]
    fn generated_ids_are_uuids() {
        let id = RequestId::generate();
        assert!(Uuid::parse_str(id.as_str()).is_ok());
        assert!(id.to_header_value().is_some());
    }
}
