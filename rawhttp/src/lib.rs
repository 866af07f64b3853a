use std::collections::HashMap;

pub mod parse;
pub mod response;
pub mod router;
pub mod server;

pub use parse::{parse_request, ParseError};
pub use response::{Response, Status};
pub use router::Route;

/// Request headers, keyed by the name exactly as the client sent it.
///
/// Names and values are kept as raw bytes. Lookups are case-sensitive and a
/// repeated name keeps the last value seen.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Headers {
    data: HashMap<Vec<u8>, Vec<u8>>,
}

impl Headers {
    pub fn set<K, V>(&mut self, key: K, value: V)
        where K: Into<Vec<u8>>, V: Into<Vec<u8>> {
        self.data.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.data.get(key.as_bytes()).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item=(&[u8], &[u8])> {
        self.data.iter().map(|(k, v)| (k.as_slice(), v.as_slice()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Vec<u8>,
    path: Vec<u8>,
    http_version: Vec<u8>,
    headers: Headers,
}

impl Request {
    pub fn method(&self) -> &[u8] {
        &self.method
    }

    pub fn path(&self) -> &[u8] {
        &self.path
    }

    pub fn http_version(&self) -> &[u8] {
        &self.http_version
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&[u8]> {
        self.headers.get(name)
    }
}
