use std::io;

/// Failures that abort a send.
///
/// An unsatisfiable or malformed `Range` header is not one of these: it is
/// answered with `416 Range Not Satisfiable` through the normal return path.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configured chunk size was zero.
    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,

    /// Seeking or reading the resource failed.
    #[error("failed to read resource: {0}")]
    Source(#[source] io::Error),

    /// Writing or flushing the output sink failed.
    #[error("failed to write response body: {0}")]
    Sink(#[source] io::Error),

    /// The resource ended before the announced byte window was delivered.
    #[error("resource ended at offset {offset}, {missing} bytes short of the requested window")]
    SourceExhausted { offset: u64, missing: u64 },
}
