use std::io;
use std::path::Path;

use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use tokio::fs::File;

use crate::{HeaderList, KnownSize, RangeBody};

/// A response whose body is streamed from a [`RangeBody`].
///
/// Starts out as `200 OK` carrying only the caller's identity headers.
/// [`StreamResponseSender`](crate::StreamResponseSender) replaces the status
/// and header list once it has decided how to answer the request.
#[derive(Debug)]
pub struct StreamResponse<B> {
    status: StatusCode,
    headers: HeaderList,
    body: B,
}

impl<B: RangeBody> StreamResponse<B> {
    pub fn new(body: B) -> Self {
        StreamResponse {
            status: StatusCode::OK,
            headers: HeaderList::new(),
            body,
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.push(name, value);
        self
    }

    /// Adds `Content-Disposition: attachment; filename="<name>"`.
    ///
    /// Quotes, backslashes and control characters are dropped from `name`.
    pub fn attachment(self, name: &str) -> Self {
        let name: String = name
            .chars()
            .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
            .collect();
        match HeaderValue::from_str(&format!("attachment; filename=\"{name}\"")) {
            Ok(value) => self.with_header(CONTENT_DISPOSITION, value),
            Err(_) => self,
        }
    }

    /// Adds `Content-Type`. An invalid header value is ignored.
    pub fn content_type(self, mime: &str) -> Self {
        match HeaderValue::from_str(mime) {
            Ok(value) => self.with_header(CONTENT_TYPE, value),
            Err(_) => self,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn headers(&self) -> &HeaderList {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderList {
        &mut self.headers
    }

    pub fn set_headers(&mut self, headers: HeaderList) {
        self.headers = headers;
    }

    /// Declared size of the resource in bytes.
    pub fn byte_size(&self) -> u64 {
        self.body.byte_size()
    }

    pub fn body_mut(&mut self) -> &mut B {
        &mut self.body
    }

    pub fn into_parts(self) -> (StatusCode, HeaderList, B) {
        (self.status, self.headers, self.body)
    }
}

impl StreamResponse<KnownSize<File>> {
    /// Opens the file at `path` for download.
    ///
    /// The file name becomes the attachment name and the content type is
    /// guessed from its extension, falling back to `application/octet-stream`.
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let body = KnownSize::open(path).await?;
        let mime = mime_guess::from_path(path).first_or_octet_stream();

        let mut response = StreamResponse::new(body);
        if let Some(name) = path.file_name() {
            response = response.attachment(&name.to_string_lossy());
        }
        Ok(response.content_type(mime.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn body() -> KnownSize<Cursor<Vec<u8>>> {
        KnownSize::sized(Cursor::new(b"abc".to_vec()), 3)
    }

    #[test]
    fn test_identity_headers() {
        let response = StreamResponse::new(body())
            .attachment("report.pdf")
            .content_type("application/octet-stream");

        assert_eq!(StatusCode::OK, response.status());
        assert_eq!(3, response.byte_size());
        assert_eq!(
            vec![
                "content-disposition: attachment; filename=\"report.pdf\"",
                "content-type: application/octet-stream",
            ],
            response.headers().lines()
        );
    }

    #[test]
    fn test_attachment_name_is_sanitized() {
        let response = StreamResponse::new(body()).attachment("evil\"\r\nname\\.txt");
        assert_eq!(
            vec!["content-disposition: attachment; filename=\"evilname.txt\""],
            response.headers().lines()
        );
    }

    #[tokio::test]
    async fn test_open_fixture() {
        let response = StreamResponse::open("test/sample-stream-file.txt").await.unwrap();
        assert_eq!(66, response.byte_size());
        assert_eq!(
            vec![
                "content-disposition: attachment; filename=\"sample-stream-file.txt\"",
                "content-type: text/plain",
            ],
            response.headers().lines()
        );
    }
}
