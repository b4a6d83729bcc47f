use bytes::{Bytes, BytesMut};
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;
use http_body_util::Full;
use hyper::Response;
use std::fmt::{self, Debug, Formatter};
use std::mem;
use std::sync::Mutex;

/// Buffers the response being produced for the current request.
///
/// The writer captures the status code on the first write, ignores repeated
/// [`write_header`](Writer::write_header) calls and counts the body bytes
/// written. All state sits behind a mutex, so a handler may hand the context
/// to a background task and both sides can touch the response; the writes
/// are serialized.
pub struct Writer {
    state: Mutex<WriterState>,
}

struct WriterState {
    status: StatusCode,
    headers: HeaderMap,
    body: BytesMut,
    written: bool,
    size: usize,
}

impl Default for WriterState {
    fn default() -> Self {
        WriterState {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: BytesMut::new(),
            written: false,
            size: 0,
        }
    }
}

impl Writer {
    pub(crate) fn new() -> Writer {
        Writer {
            state: Mutex::new(WriterState::default()),
        }
    }

    /// Sets the response status code. The second and any later call is
    /// ignored, as is a call after the first body write.
    pub fn write_header(&self, status: StatusCode) {
        let mut state = self.state.lock().unwrap();
        if state.written {
            return;
        }
        state.status = status;
        state.written = true;
    }

    /// Appends `data` to the response body, latching the current status code
    /// on the first write. Returns the number of bytes written.
    pub fn write(&self, data: &[u8]) -> usize {
        let mut state = self.state.lock().unwrap();
        state.written = true;
        state.body.extend_from_slice(data);
        state.size += data.len();
        data.len()
    }

    /// Returns the status code the response will carry.
    pub fn status(&self) -> StatusCode {
        self.state.lock().unwrap().status
    }

    /// Returns the number of body bytes written so far.
    pub fn size(&self) -> usize {
        self.state.lock().unwrap().size
    }

    /// Returns `true` once the status code has been latched by a
    /// [`write_header`](Writer::write_header) or body write.
    pub fn written(&self) -> bool {
        self.state.lock().unwrap().written
    }

    /// Sets a response header, replacing any previous value.
    pub fn set_header(&self, name: HeaderName, value: HeaderValue) {
        self.state.lock().unwrap().headers.insert(name, value);
    }

    /// Appends a response header, keeping any previous values.
    pub fn add_header(&self, name: HeaderName, value: HeaderValue) {
        self.state.lock().unwrap().headers.append(name, value);
    }

    /// Removes a response header.
    pub fn remove_header(&self, name: HeaderName) {
        self.state.lock().unwrap().headers.remove(name);
    }

    /// Returns a response header as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }

    pub(crate) fn reset(&self) {
        *self.state.lock().unwrap() = WriterState::default();
    }

    /// Drains the buffered status, headers and body into a hyper response,
    /// leaving the writer ready for the next request.
    pub(crate) fn take_response(&self) -> Response<Full<Bytes>> {
        let (status, headers, body) = {
            let mut state = self.state.lock().unwrap();
            let status = state.status;
            let headers = mem::take(&mut state.headers);
            let body = state.body.split().freeze();
            *state = WriterState::default();
            (status, headers, body)
        };

        let mut response = Response::new(Full::new(body));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }
}

impl Debug for Writer {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let state = self.state.lock().unwrap();
        write!(
            f,
            "Writer {{ status: {:?}, written: {}, size: {} }}",
            state.status, state.written, state.size
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header;

    #[test]
    fn write_header_is_idempotent() {
        let writer = Writer::new();
        writer.write_header(StatusCode::CREATED);
        writer.write_header(StatusCode::INTERNAL_SERVER_ERROR);

        assert_eq!(writer.status(), StatusCode::CREATED);
        assert!(writer.written());
    }

    #[test]
    fn first_write_latches_default_status() {
        let writer = Writer::new();
        writer.write(b"hello");
        writer.write_header(StatusCode::NOT_FOUND);

        assert_eq!(writer.status(), StatusCode::OK);
        assert_eq!(writer.size(), 5);
    }

    #[test]
    fn size_accumulates_across_writes() {
        let writer = Writer::new();
        assert_eq!(writer.write(b"hel"), 3);
        assert_eq!(writer.write(b"lo"), 2);
        assert_eq!(writer.size(), 5);
    }

    #[test]
    fn take_response_drains_state() {
        let writer = Writer::new();
        writer.set_header(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        writer.write_header(StatusCode::ACCEPTED);
        writer.write(b"queued");

        let response = writer.take_response();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain"
        );

        assert!(!writer.written());
        assert_eq!(writer.size(), 0);
        assert_eq!(writer.status(), StatusCode::OK);
    }

    #[test]
    fn header_roundtrip() {
        let writer = Writer::new();
        writer.set_header(header::ALLOW, HeaderValue::from_static("GET"));
        assert_eq!(writer.header("allow").as_deref(), Some("GET"));

        writer.remove_header(header::ALLOW);
        assert_eq!(writer.header("allow"), None);
    }
}
