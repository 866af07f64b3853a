use super::{parse_request, Headers, Request, Response, Status};

const ECHO_PREFIX: &[u8] = b"/echo/";
const USER_AGENT_PATH: &[u8] = b"/user-agent";

/// The fixed set of outcomes a request can be routed to.
///
/// Routing looks at the path only, plus the `User-Agent` header for the
/// user-agent route. Method and version are never consulted. Echoed text is
/// the raw bytes of the path, never decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    Root,
    Echo(&'a [u8]),
    UserAgent(&'a [u8]),
    NotFound,
    BadRequest,
}

impl<'a> Route<'a> {
    pub fn resolve(path: &'a [u8], headers: &'a Headers) -> Self {
        if path == b"/" {
            Route::Root
        } else if let Some(message) = path.strip_prefix(ECHO_PREFIX) {
            Route::Echo(message)
        } else if path == USER_AGENT_PATH {
            Route::UserAgent(headers.get("User-Agent").unwrap_or(&b""[..]))
        } else {
            Route::NotFound
        }
    }

    pub fn for_request(req: &'a Request) -> Self {
        Route::resolve(req.path(), req.headers())
    }

    pub fn into_response(self) -> Response {
        match self {
            Route::Root => Response::ok(),
            Route::Echo(text) | Route::UserAgent(text) => Response::builder(Status::Ok)
                .content_type("text/plain")
                .body(text.to_vec())
                .build(),
            Route::NotFound => Response::err(Status::NotFound),
            Route::BadRequest => Response::err(Status::BadRequest),
        }
    }
}

/// Parses one read buffer and produces the response for it.
pub fn respond(raw: &[u8]) -> Response {
    match parse_request(raw) {
        Ok(req) => {
            let route = Route::for_request(&req);
            log::trace!(
                "{} {} -> {:?}",
                String::from_utf8_lossy(req.method()),
                String::from_utf8_lossy(req.path()),
                route
            );
            route.into_response()
        }
        Err(e) => {
            log::debug!("Responding with 400: {}", e);
            Route::BadRequest.into_response()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> Headers {
        let mut headers = Headers::default();
        for (k, v) in pairs {
            headers.set(*k, *v);
        }
        headers
    }

    #[test]
    fn resolves_fixed_routes() {
        let none = Headers::default();

        assert_eq!(Route::resolve(b"/", &none), Route::Root);
        assert_eq!(Route::resolve(b"/echo/abc", &none), Route::Echo(b"abc"));
        assert_eq!(Route::resolve(b"/user-agent", &none), Route::UserAgent(b""));
        assert_eq!(Route::resolve(b"/nope", &none), Route::NotFound);
    }

    #[test]
    fn echo_takes_everything_after_the_prefix_verbatim() {
        let none = Headers::default();

        assert_eq!(Route::resolve(b"/echo/", &none), Route::Echo(b""));
        assert_eq!(Route::resolve(b"/echo/a/b%20c", &none), Route::Echo(b"a/b%20c"));
        assert_eq!(Route::resolve(b"/echo/x/echo/y", &none), Route::Echo(b"x/echo/y"));
        assert_eq!(Route::resolve(b"/echo/\xff", &none), Route::Echo(b"\xff"));
    }

    #[test]
    fn near_misses_are_not_found() {
        let none = Headers::default();

        assert_eq!(Route::resolve(b"/echo", &none), Route::NotFound);
        assert_eq!(Route::resolve(b"/user-agent/", &none), Route::NotFound);
        assert_eq!(Route::resolve(b"//", &none), Route::NotFound);
        assert_eq!(Route::resolve(b"", &none), Route::NotFound);
    }

    #[test]
    fn user_agent_route_reads_exact_header_name() {
        let ua = headers(&[("User-Agent", "test-client")]);
        assert_eq!(Route::resolve(b"/user-agent", &ua), Route::UserAgent(b"test-client"));

        let lower = headers(&[("user-agent", "test-client")]);
        assert_eq!(Route::resolve(b"/user-agent", &lower), Route::UserAgent(b""));
    }

    #[test]
    fn root_responds_without_body() {
        let response = respond(b"GET / HTTP/1.1\r\n\r\n");

        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.to_bytes(), b"HTTP/1.1 200 OK\r\n\r\n".to_vec());
    }

    #[test]
    fn echo_responds_with_plain_text() {
        assert_eq!(
            respond(b"GET /echo/abc HTTP/1.1\r\n\r\n").to_bytes(),
            b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 3\r\n\r\nabc\r\n".to_vec()
        );
    }

    #[test]
    fn echo_of_invalid_utf8_returns_the_same_bytes() {
        assert_eq!(
            respond(b"GET /echo/\xff HTTP/1.1\r\n\r\n").to_bytes(),
            b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 1\r\n\r\n\xff\r\n".to_vec()
        );
    }

    #[test]
    fn echo_of_multibyte_char_split_by_truncation_keeps_the_partial_bytes() {
        // "é" is \xc3\xa9; only its first byte made it into the path
        let response = respond(b"GET /echo/caf\xc3 HTTP/1.1\r\n\r\n");

        assert_eq!(response.body(), Some(&b"caf\xc3"[..]));
        assert!(response.headers().any(|(name, value)| name == "Content-Length" && value == "4"));
    }

    #[test]
    fn user_agent_responds_with_header_value() {
        let response = respond(b"GET /user-agent HTTP/1.1\r\nHost: localhost\r\nUser-Agent: test-client\r\n\r\n");

        assert_eq!(
            response.to_bytes(),
            b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 11\r\n\r\ntest-client\r\n".to_vec()
        );
    }

    #[test]
    fn user_agent_with_invalid_utf8_is_returned_as_sent() {
        let response = respond(b"GET /user-agent HTTP/1.1\r\nUser-Agent: caf\xe9\r\n\r\n");

        assert_eq!(response.body(), Some(&b"caf\xe9"[..]));
        assert!(response.headers().any(|(name, value)| name == "Content-Length" && value == "4"));
    }

    #[test]
    fn user_agent_sent_after_blank_line_is_still_used() {
        let response = respond(b"GET /user-agent HTTP/1.1\r\n\r\nUser-Agent: late\r\n");

        assert_eq!(response.body(), Some(&b"late"[..]));
    }

    #[test]
    fn missing_user_agent_responds_with_empty_body() {
        assert_eq!(
            respond(b"GET /user-agent HTTP/1.1\r\n\r\n").to_bytes(),
            b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 0\r\n\r\n\r\n".to_vec()
        );
    }

    #[test]
    fn unknown_path_is_not_found() {
        let response = respond(b"GET /nope HTTP/1.1\r\n\r\n");

        assert_eq!(response.status(), Status::NotFound);
        assert_eq!(response.to_bytes(), b"HTTP/1.1 404 Not Found\r\n\r\n".to_vec());
    }

    #[test]
    fn malformed_start_line_is_bad_request() {
        let malformed: [&[u8]; 3] = [b"GET /\r\n\r\n", b"GET / HTTP/1.1 x\r\n\r\n", b"GET / HTTP/1.1 x y\r\n\r\n"];
        for raw in malformed.iter() {
            let response = respond(raw);
            assert_eq!(response.status(), Status::BadRequest);
            assert_eq!(response.to_bytes(), b"HTTP/1.1 400 BAD REQUEST\r\n\r\n".to_vec());
        }
    }

    #[test]
    fn method_and_version_do_not_affect_routing() {
        let get = respond(b"GET /echo/same HTTP/1.1\r\n\r\n");
        let post = respond(b"POST /echo/same HTTP/1.0\r\n\r\n");
        let made_up = respond(b"FETCH /echo/same SPDY/3\r\n\r\n");

        assert_eq!(get, post);
        assert_eq!(get, made_up);
    }

    #[test]
    fn echo_with_multibyte_text_reports_byte_length() {
        let response = respond("GET /echo/grüße HTTP/1.1\r\n\r\n".as_bytes());

        assert_eq!(response.body(), Some("grüße".as_bytes()));
        assert!(response.headers().any(|(name, value)| name == "Content-Length" && value == "7"));
    }
}
