//! # axum-stream-sender
//!
//! Chunked, range-aware streaming responses for [`axum`][1].
//!
//! A [`StreamResponseSender`] answers a request with a [`StreamResponse`]:
//! it checks the `Range` header against the resource size, decides between
//! `200 OK`, `206 Partial Content` and `416 Range Not Satisfiable`, and then
//! copies the selected bytes in fixed-size chunks, optionally pausing one
//! second after each chunk to cap the transfer rate.
//!
//! Any type implementing both [`AsyncRead`] and [`AsyncSeek`] can be used
//! through the [`KnownSize`] adapter struct. There is also special cased
//! support for [`tokio::fs::File`], see [`StreamResponse::open`].
//!
//! ```
//! use axum::http::HeaderMap;
//! use axum::response::Response;
//! use axum::routing::get;
//! use axum::Router;
//!
//! use axum_stream_sender::{SenderConfig, StreamResponse, StreamResponseSender};
//!
//! async fn file(headers: HeaderMap) -> Response {
//!     let config = SenderConfig::default().with_range_support(true);
//!     let sender = StreamResponseSender::new(config).unwrap();
//!     let response = StreamResponse::open("document.txt").await.unwrap();
//!     sender.respond(&headers, response)
//! }
//!
//! let _app = Router::<()>::new().route("/", get(file));
//! ```
//!
//! Outside of axum, [`StreamResponseSender::send`] writes the body to any
//! [`AsyncWrite`](tokio::io::AsyncWrite) and leaves status and headers on the
//! [`StreamResponse`].
//!
//! [1]: https://docs.rs/axum

mod config;
mod error;
mod file;
mod headers;
mod plan;
mod range;
mod response;
mod sender;
mod stream;

use tokio::io::{AsyncRead, AsyncSeek};

pub use config::{SenderConfig, DEFAULT_CHUNK_SIZE};
pub use error::Error;
pub use file::KnownSize;
pub use headers::HeaderList;
pub use plan::{plan_response, ResponsePlan, CONTENT_TRANSFER_ENCODING};
pub use range::{parse_range, ByteWindow, RangeResult};
pub use response::StreamResponse;
pub use sender::StreamResponseSender;
pub use stream::{ChunkedStreamer, StreamedBody, THROTTLE_INTERVAL};

/// An [`AsyncRead`] and [`AsyncSeek`] with a fixed known byte size.
pub trait RangeBody: AsyncRead + AsyncSeek + Unpin {
    /// The total size of the underlying resource.
    ///
    /// This should not change for the lifetime of the object once queried.
    /// Behaviour is not guaranteed if it does change.
    fn byte_size(&self) -> u64;
}
