use axum::body::Body;
use axum::http::header::RANGE;
use axum::http::HeaderMap;
use axum::response::Response;
use tokio::io::AsyncWrite;
use tracing::debug;

use crate::stream::{StreamedBody, THROTTLE_INTERVAL};
use crate::{
    parse_range, plan_response, ByteWindow, ChunkedStreamer, Error, RangeBody, RangeResult,
    SenderConfig, StreamResponse,
};

/// Answers a request with a [`StreamResponse`], honouring `Range` when enabled.
///
/// Holds only its immutable configuration, so one sender can serve any number
/// of requests concurrently.
#[derive(Debug, Clone)]
pub struct StreamResponseSender {
    config: SenderConfig,
}

impl StreamResponseSender {
    /// Fails with [`Error::ZeroChunkSize`] if the configuration is invalid.
    pub fn new(config: SenderConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(StreamResponseSender { config })
    }

    pub fn config(&self) -> &SenderConfig {
        &self.config
    }

    /// The streamer used for response bodies.
    pub fn streamer(&self) -> ChunkedStreamer {
        let streamer = ChunkedStreamer::new(self.config.chunk_size);
        if self.config.enable_speed_limit {
            streamer.throttled(THROTTLE_INTERVAL)
        } else {
            streamer
        }
    }

    /// Checks the request's `Range` header against a resource of `size` bytes.
    ///
    /// Always [`RangeResult::NoRange`] while range support is disabled.
    pub fn range_result(&self, request: &HeaderMap, size: u64) -> RangeResult {
        if !self.config.enable_range_support {
            return RangeResult::NoRange;
        }
        match request.get(RANGE) {
            None => RangeResult::NoRange,
            // not visible ASCII, so not a valid range either
            Some(value) => match value.to_str() {
                Ok(header) => parse_range(Some(header), size),
                Err(_) => RangeResult::Unsatisfiable,
            },
        }
    }

    /// Decides status and headers for `response` and applies them.
    ///
    /// Returns the window to stream, or `None` when the response has no body.
    pub fn prepare<B: RangeBody>(&self, request: &HeaderMap, response: &mut StreamResponse<B>) -> Option<ByteWindow> {
        let size = response.byte_size();
        let result = self.range_result(request, size);
        let plan = plan_response(self.config.enable_range_support, result, size, response.headers());

        debug!(
            status = %plan.status,
            size,
            offset = plan.window.map(|w| w.offset),
            length = plan.content_length(),
            "planned stream response"
        );

        response.set_status(plan.status);
        response.set_headers(plan.headers);
        plan.window
    }

    /// Sends `response` to `sink`: status and headers are applied to
    /// `response`, then the selected bytes are written in chunks.
    ///
    /// Returns the number of body bytes written. I/O failures are returned
    /// as is, after any bytes already flushed.
    pub async fn send<B, W>(
        &self,
        request: &HeaderMap,
        response: &mut StreamResponse<B>,
        sink: &mut W,
    ) -> Result<u64, Error>
    where
        B: RangeBody,
        W: AsyncWrite + Unpin + ?Sized,
    {
        match self.prepare(request, response) {
            Some(window) => self.streamer().stream(response.body_mut(), window, sink).await,
            None => Ok(0),
        }
    }

    /// Builds an axum [`Response`] for `response`.
    ///
    /// The body is streamed from a task spawned on the current tokio runtime,
    /// so this must be called from within one (any axum handler is).
    pub fn respond<B>(&self, request: &HeaderMap, mut response: StreamResponse<B>) -> Response
    where
        B: RangeBody + Send + 'static,
    {
        let window = self.prepare(request, &mut response);
        let (status, headers, source) = response.into_parts();

        let body = match window {
            Some(window) if !window.is_empty() => Body::new(StreamedBody::spawn(self.streamer(), source, window)),
            _ => Body::empty(),
        };

        let mut res = Response::new(body);
        *res.status_mut() = status;
        headers.write_to(res.headers_mut());
        res
    }
}
