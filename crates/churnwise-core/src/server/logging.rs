//! Logging middleware for HTTP requests with request IDs and timing.

use std::task::{Context, Poll};
use std::time::Instant;

use http::{HeaderValue, Request, Response};
use tower::{Layer, Service};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Header carrying the request ID on both the request and the response.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// A `Layer` that tags every request with an ID and logs its outcome and duration.
#[derive(Debug, Clone)]
pub struct RequestLoggerLayer;

impl<S> Layer<S> for RequestLoggerLayer {
    type Service = RequestLoggerService<S>;

    fn layer(&self, service: S) -> Self::Service {
        RequestLoggerService { service }
    }
}

#[derive(Debug, Clone)]
pub struct RequestLoggerService<S> {
    service: S,
}

impl<S, B, R> Service<Request<B>> for RequestLoggerService<S>
where
    S: Service<Request<B>, Response = Response<R>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<B>) -> Self::Future {
        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map_or_else(|| Uuid::new_v4().to_string(), ToString::to_string);
        let header_value = HeaderValue::from_str(&request_id).ok();

        if !request.headers().contains_key(REQUEST_ID_HEADER) {
            if let Some(value) = header_value.clone() {
                request.headers_mut().insert(REQUEST_ID_HEADER, value);
            }
        }

        let method = request.method().clone();
        let uri = request.uri().path().to_string();
        let start_time = Instant::now();

        info!(request_id = %request_id, method = %method, uri = %uri, "Received request");
        for (name, value) in request.headers() {
            debug!(
                request_id = %request_id,
                header = %name,
                value = %value.to_str().unwrap_or("<?>"),
                "Request header"
            );
        }

        let future = self.service.call(request);
        Box::pin(async move {
            let mut result = future.await;
            let duration = start_time.elapsed();

            match &mut result {
                Ok(response) => {
                    if let Some(value) = header_value {
                        response.headers_mut().insert(REQUEST_ID_HEADER, value);
                    }
                    info!(
                        request_id = %request_id,
                        method = %method,
                        uri = %uri,
                        status = response.status().as_u16(),
                        duration_ms = duration.as_millis(),
                        "Request completed"
                    );
                }
                Err(_) => {
                    warn!(
                        request_id = %request_id,
                        method = %method,
                        uri = %uri,
                        duration_ms = duration.as_millis(),
                        "Request failed"
                    );
                }
            }

            result
        })
    }
}
