use crate::tracing::{scope_request_id, RequestId, REQUEST_ID_HEADER};
use axum::{extract::Request, http::header::HeaderName, middleware::Next, response::Response};
use tracing::Instrument;

/// Tags the request with an id and echoes it on the response.
///
/// A caller-supplied `x-request-id` is kept when acceptable, otherwise a
/// fresh UUID replaces it.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let header = HeaderName::from_static(REQUEST_ID_HEADER);
    let request_id = request
        .headers()
        .get(&header)
        .and_then(RequestId::from_header)
        .unwrap_or_else(RequestId::generate);
    let header_value = request_id.to_header_value();

    match &header_value {
        Some(value) => {
            request.headers_mut().insert(header.clone(), value.clone());
        }
        None => {
            request.headers_mut().remove(&header);
        }
    }
    request.extensions_mut().insert(request_id.clone());

    let span = tracing::debug_span!("request", request_id = %request_id);
    let mut response = scope_request_id(request_id, next.run(request))
        .instrument(span)
        .await;

    if let Some(value) = header_value {
        response.headers_mut().insert(header, value);
    }
    response
}
