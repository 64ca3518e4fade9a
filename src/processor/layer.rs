use crate::processor::ProcessorState;
use crate::snapshot::{RequestSnapshot, ResponseSnapshot};
use axum::body::{to_bytes, Body, Bytes};
use axum::http::{header, HeaderMap, Request};
use axum::response::Response;
use chrono::Utc;
use futures::future::BoxFuture;
use log::*;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Tower layer produced by [`RequestResponseProcessor::layer`].
///
/// [`RequestResponseProcessor::layer`]: crate::RequestResponseProcessor::layer
#[derive(Clone)]
pub struct ProcessorLayer {
    state: Arc<ProcessorState>,
}

impl ProcessorLayer {
    pub(crate) fn new(state: Arc<ProcessorState>) -> Self {
        Self { state }
    }
}

impl<S> Layer<S> for ProcessorLayer {
    type Service = ProcessorService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ProcessorService {
            inner,
            state: self.state.clone(),
        }
    }
}

/// Middleware wrapping the inner service. Captures UTC start/end times around
/// the inner call, evaluates the status filter on the finished response and
/// invokes the registered callback, then returns the response with status,
/// headers and body unchanged.
#[derive(Clone)]
pub struct ProcessorService<S> {
    inner: S,
    state: Arc<ProcessorState>,
}

impl<S> Service<Request<Body>> for ProcessorService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        // take the service that was polled ready and leave the clone behind
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let state = self.state.clone();

        Box::pin(async move {
            let start_time = Utc::now();
            let callback = state.callback.read().unwrap().clone();

            // Only buffer the request payload if there is a callback that
            // could ever see it.
            let (req, request_snapshot) = if callback.is_some() {
                let (mut parts, body) = req.into_parts();
                let bytes = buffer_body(body, &mut parts.headers).await;
                let snapshot = RequestSnapshot::from_parts(&parts, bytes.clone());
                (Request::from_parts(parts, Body::from(bytes)), Some(snapshot))
            } else {
                (req, None)
            };

            let response = inner.call(req).await?;
            let end_time = Utc::now();

            let should_process = state
                .config
                .read()
                .unwrap()
                .should_process(response.status().as_u16());
            if !should_process {
                return Ok(response);
            }
            let (Some(callback), Some(request_snapshot)) = (callback, request_snapshot) else {
                return Ok(response);
            };

            let (mut parts, body) = response.into_parts();
            let bytes = buffer_body(body, &mut parts.headers).await;
            let response_snapshot = ResponseSnapshot::from_parts(&parts, bytes.clone());
            debug!(
                "Dispatching {} {} ({}) to processing callback",
                request_snapshot.method(),
                request_snapshot.path(),
                response_snapshot.status_code()
            );
            callback(&request_snapshot, start_time, end_time, &response_snapshot);
            Ok(Response::from_parts(parts, Body::from(bytes)))
        })
    }
}

// A body stream that errors mid-buffer is reported and treated as empty.
// The content-length header is dropped along with it, so the reassembled
// message never advertises a length the substituted body doesn't have.
// Processing never fails the request from here.
async fn buffer_body(body: Body, headers: &mut HeaderMap) -> Bytes {
    match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Failed to buffer body for processing: {}", e);
            headers.remove(header::CONTENT_LENGTH);
            Bytes::new()
        }
    }
}
