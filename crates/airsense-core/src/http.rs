//! Minimal HTTP/1.1 client
//!
//! One request per connection (`Connection: close`). Responses are read into
//! memory with bounded header and body sizes; bodies may be delimited by
//! `content-length`, chunked transfer encoding, or the server closing the
//! connection.

use core::fmt::Write as _;

use alloc::vec::Vec;
use embedded_io::ErrorKind;
use embedded_io_async::{Read, Write};
use log::debug;
use thiserror_no_std::Error;

pub const MAX_HEADER_LEN: usize = 1024;
pub const MAX_BODY_LEN: usize = 4096;
/// Room for chunk-size lines on top of the body limit.
const MAX_CHUNKED_LEN: usize = MAX_BODY_LEN + 512;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpError {
    #[error("I/O error: {0:?}")]
    Io(ErrorKind),
    #[error("Connection closed before the response was complete")]
    ConnectionClosed,
    #[error("Malformed HTTP response")]
    MalformedResponse,
    #[error("Response headers too large")]
    HeadersTooLarge,
    #[error("Response body too large")]
    BodyTooLarge,
}

fn io_error<E: embedded_io::Error>(e: E) -> HttpError {
    HttpError::Io(e.kind())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    pub method: Method,
    pub host: &'a str,
    pub path: &'a str,
    pub content_type: Option<&'a str>,
    pub body: &'a [u8],
}

impl<'a> Request<'a> {
    pub const fn get(host: &'a str, path: &'a str) -> Self {
        Self {
            method: Method::Get,
            host,
            path,
            content_type: None,
            body: &[],
        }
    }

    pub const fn post(host: &'a str, path: &'a str, content_type: &'a str, body: &'a [u8]) -> Self {
        Self {
            method: Method::Post,
            host,
            path,
            content_type: Some(content_type),
            body,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Response {
    pub fn body_str(&self) -> Result<&str, HttpError> {
        core::str::from_utf8(&self.body).map_err(|_| HttpError::MalformedResponse)
    }
}

/// Send `request` over `conn` and read the complete response.
pub async fn send<C>(conn: &mut C, request: &Request<'_>) -> Result<Response, HttpError>
where
    C: Read + Write,
{
    write_request(conn, request).await?;
    read_response(conn).await
}

async fn write_request<C: Write>(conn: &mut C, request: &Request<'_>) -> Result<(), HttpError> {
    let mut length: heapless::String<10> = heapless::String::new();
    let _ = write!(length, "{}", request.body.len());

    let parts: [&[u8]; 8] = [
        request.method.as_str().as_bytes(),
        b" ",
        request.path.as_bytes(),
        b" HTTP/1.1\r\nHost: ",
        request.host.as_bytes(),
        b"\r\nConnection: close\r\nUser-Agent: airsense\r\ncontent-length: ",
        length.as_bytes(),
        b"\r\n",
    ];
    for part in parts {
        conn.write_all(part).await.map_err(io_error)?;
    }

    if let Some(content_type) = request.content_type {
        conn.write_all(b"content-type: ").await.map_err(io_error)?;
        conn.write_all(content_type.as_bytes())
            .await
            .map_err(io_error)?;
        conn.write_all(b"\r\n").await.map_err(io_error)?;
    }

    conn.write_all(b"\r\n").await.map_err(io_error)?;
    conn.write_all(request.body).await.map_err(io_error)?;
    conn.flush().await.map_err(io_error)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn parse_status_line(line: &str) -> Result<u16, HttpError> {
    let mut parts = line.split_whitespace();
    let version = parts.next().ok_or(HttpError::MalformedResponse)?;
    if !version.starts_with("HTTP/1.") {
        return Err(HttpError::MalformedResponse);
    }
    parts
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or(HttpError::MalformedResponse)
}

async fn read_response<C: Read>(conn: &mut C) -> Result<Response, HttpError> {
    let mut head = [0u8; MAX_HEADER_LEN];
    let mut total = 0usize;

    // Read until the blank line that ends the headers.
    let header_end = loop {
        if total == head.len() {
            return Err(HttpError::HeadersTooLarge);
        }
        let n = conn.read(&mut head[total..]).await.map_err(io_error)?;
        if n == 0 {
            return Err(HttpError::ConnectionClosed);
        }
        total += n;
        if let Some(pos) = find(&head[..total], b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head_str =
        core::str::from_utf8(&head[..header_end]).map_err(|_| HttpError::MalformedResponse)?;
    let mut lines = head_str.split("\r\n");
    let status = parse_status_line(lines.next().unwrap_or(""))?;

    let mut content_length = None;
    let mut chunked = false;
    for line in lines.filter(|line| !line.is_empty()) {
        let (name, value) = line
            .split_once(':')
            .ok_or(HttpError::MalformedResponse)?;
        let (name, value) = (name.trim(), value.trim());
        if name.eq_ignore_ascii_case("content-length") {
            let length = value
                .parse::<usize>()
                .map_err(|_| HttpError::MalformedResponse)?;
            content_length = Some(length);
        } else if name.eq_ignore_ascii_case("transfer-encoding") {
            chunked = value.eq_ignore_ascii_case("chunked");
        }
    }
    debug!(
        "HTTP {} (content-length={:?}, chunked={})",
        status, content_length, chunked
    );

    let mut raw = Vec::new();
    raw.extend_from_slice(&head[header_end..total]);

    let body = if chunked {
        read_to_end(conn, &mut raw, MAX_CHUNKED_LEN).await?;
        decode_chunked(&raw)?
    } else if let Some(length) = content_length {
        if length > MAX_BODY_LEN {
            return Err(HttpError::BodyTooLarge);
        }
        let mut chunk = [0u8; 256];
        while raw.len() < length {
            let n = conn.read(&mut chunk).await.map_err(io_error)?;
            if n == 0 {
                return Err(HttpError::ConnectionClosed);
            }
            raw.extend_from_slice(&chunk[..n]);
        }
        raw.truncate(length);
        raw
    } else {
        read_to_end(conn, &mut raw, MAX_BODY_LEN).await?;
        raw
    };

    Ok(Response { status, body })
}

async fn read_to_end<C: Read>(
    conn: &mut C,
    out: &mut Vec<u8>,
    limit: usize,
) -> Result<(), HttpError> {
    let mut chunk = [0u8; 256];
    while out.len() <= limit {
        let n = conn.read(&mut chunk).await.map_err(io_error)?;
        if n == 0 {
            return Ok(());
        }
        out.extend_from_slice(&chunk[..n]);
    }
    Err(HttpError::BodyTooLarge)
}

fn decode_chunked(mut rest: &[u8]) -> Result<Vec<u8>, HttpError> {
    let mut body = Vec::new();
    loop {
        let line_end = find(rest, b"\r\n").ok_or(HttpError::ConnectionClosed)?;
        let size_line =
            core::str::from_utf8(&rest[..line_end]).map_err(|_| HttpError::MalformedResponse)?;
        // Chunk extensions after ';' are ignored.
        let size_hex = size_line.split(';').next().unwrap_or("").trim();
        let size =
            usize::from_str_radix(size_hex, 16).map_err(|_| HttpError::MalformedResponse)?;
        rest = &rest[line_end + 2..];

        if size == 0 {
            return Ok(body);
        }
        // `size` comes off the wire; compare without adding to it.
        if size > MAX_BODY_LEN - body.len() {
            return Err(HttpError::BodyTooLarge);
        }
        if rest.len() < size + 2 {
            return Err(HttpError::ConnectionClosed);
        }
        body.extend_from_slice(&rest[..size]);
        rest = &rest[size + 2..];
    }
}
