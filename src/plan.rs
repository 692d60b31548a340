use axum::http::header::{HeaderName, ACCEPT_RANGES};
use axum::http::{HeaderValue, StatusCode};
use axum_extra::headers::{ContentLength, ContentRange};

use crate::{ByteWindow, HeaderList, RangeResult};

/// `Content-Transfer-Encoding`, sent on every response that carries a body.
pub const CONTENT_TRANSFER_ENCODING: HeaderName = HeaderName::from_static("content-transfer-encoding");

/// Status, headers and byte window decided for one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponsePlan {
    pub status: StatusCode,
    pub headers: HeaderList,
    /// Bytes to stream, `None` when the response has no body.
    pub window: Option<ByteWindow>,
}

impl ResponsePlan {
    /// Number of body bytes the response announces.
    pub fn content_length(&self) -> u64 {
        self.window.map_or(0, |window| window.len())
    }
}

/// Decides the response for a resource of `size` bytes.
///
/// `base` holds the caller's resource identity headers (disposition, content
/// type). They come first, followed by the headers computed here.
pub fn plan_response(
    range_support: bool,
    result: RangeResult,
    size: u64,
    base: &HeaderList,
) -> ResponsePlan {
    let mut headers = base.clone();

    let (status, window) = match (range_support, result) {
        (false, _) => {
            push_body_headers(&mut headers, size);
            headers.push(ACCEPT_RANGES, HeaderValue::from_static("none"));
            (StatusCode::OK, Some(ByteWindow::full(size)))
        }
        (true, RangeResult::NoRange) => {
            push_body_headers(&mut headers, size);
            headers.push(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
            // an empty resource has no byte positions to describe
            if size > 0 {
                push_content_range(&mut headers, ByteWindow::full(size), size);
            }
            (StatusCode::OK, Some(ByteWindow::full(size)))
        }
        (true, RangeResult::Satisfiable { start, end }) if start <= end && end < size => {
            let window = ByteWindow::inclusive(start, end);
            push_body_headers(&mut headers, window.len());
            headers.push(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
            push_content_range(&mut headers, window, size);
            (StatusCode::PARTIAL_CONTENT, Some(window))
        }
        // unsatisfiable, or a satisfiable range that does not fit the resource
        (true, _) => {
            headers.push_typed(ContentRange::unsatisfied_bytes(size));
            (StatusCode::RANGE_NOT_SATISFIABLE, None)
        }
    };

    ResponsePlan { status, headers, window }
}

fn push_body_headers(headers: &mut HeaderList, content_length: u64) {
    headers.push(CONTENT_TRANSFER_ENCODING.clone(), HeaderValue::from_static("binary"));
    headers.push_typed(ContentLength(content_length));
}

fn push_content_range(headers: &mut HeaderList, window: ByteWindow, size: u64) {
    // only fails for an empty or out-of-bounds window, which callers rule out
    if let Ok(content_range) = ContentRange::bytes(window.offset..window.end_exclusive(), size) {
        headers.push_typed(content_range);
    }
}
