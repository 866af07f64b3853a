use std::fmt;
use std::io::{self, Write};

const PROTOCOL: &str = "HTTP/1.1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    BadRequest,
    NotFound,
}

impl Status {
    pub fn code(&self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::BadRequest => 400,
            Status::NotFound => 404,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::BadRequest => "BAD REQUEST",
            Status::NotFound => "Not Found",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

/// A fully formed response, ready to be serialized.
///
/// `Content-Type` and `Content-Length` are present exactly when there is a
/// body; [`ResponseBuilder::build`] is the only way to attach one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: Status,
    headers: Vec<(&'static str, String)>,
    body: Option<Vec<u8>>,
}

pub struct ResponseBuilder {
    status: Status,
    content_type: Option<String>,
    body: Option<Vec<u8>>,
}

impl Response {
    pub fn ok() -> Self {
        Response {
            status: Status::Ok,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn err(status: Status) -> Self {
        Response {
            status,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn builder(status: Status) -> ResponseBuilder {
        ResponseBuilder {
            status,
            content_type: None,
            body: None,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn headers(&self) -> impl Iterator<Item=(&str, &str)> {
        self.headers.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Writes the wire form: status line, headers, blank line and, when
    /// present, the body followed by its own CRLF.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        write!(out, "{} {}\r\n", PROTOCOL, self.status)?;
        for (name, value) in self.headers.iter() {
            log::trace!("Writing header: {}: {}", name, value);
            write!(out, "{}: {}\r\n", name, value)?;
        }
        out.write_all(b"\r\n")?;

        if let Some(body) = self.body.as_ref() {
            log::trace!("Writing {} bytes to body", body.len());
            out.write_all(body)?;
            out.write_all(b"\r\n")?;
        }

        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(64 + self.body.as_ref().map_or(0, Vec::len));
        // Writing into a Vec cannot fail
        let _ = self.write_to(&mut bytes);
        bytes
    }
}

impl ResponseBuilder {
    pub fn content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    /// Sets the body bytes; they are written exactly as given.
    pub fn body(mut self, b: Vec<u8>) -> Self {
        self.body = Some(b);
        self
    }

    pub fn body_from_string(self, s: &str) -> Self {
        self.body(s.as_bytes().to_vec())
    }

    pub fn build(self) -> Response {
        let mut headers = Vec::new();

        if let Some(body) = self.body.as_ref() {
            let content_type = self.content_type.unwrap_or_else(|| String::from("text/plain"));
            headers.push(("Content-Type", content_type));
            headers.push(("Content-Length", body.len().to_string()));
        }

        Response {
            status: self.status,
            headers,
            body: self.body,
        }
    }
}
