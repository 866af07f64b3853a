use std::{fs::File, net::TcpStream, path::PathBuf, time::Duration};
use std::{
    env,
    io::{Read, Write},
    process::{Command, Stdio},
};


struct RawhttpdServerInstance {
    pub port: u16,
    _tempdir: tempfile::TempDir,
    process: std::process::Child,
}

impl Drop for RawhttpdServerInstance {
    fn drop(&mut self) {
        if let Ok(Some(st)) = self.process.try_wait() {
            log::debug!("Server shut down with status: {}", st);
        } else {
            // Error likely implies process already dead (possible via a race with the try_wait).
            let _ = self.process.kill();
            // Either way we should wait around to read it.
            let _ = self.process.wait();
        }
    }
}

fn start_server(extra_args: &[&str]) -> RawhttpdServerInstance {
    let rawhttpd_path = PathBuf::from(
        env::var("RAWHTTPD_BIN").expect("Need to set RAWHTTPD_BIN environment variable"),
    );

    log::info!("Using rawhttpd bin from: {}", rawhttpd_path.to_string_lossy());

    let working_dir = tempfile::tempdir().expect("Setting up temp directory");
    let config_path = working_dir.path().join("rawhttpd.toml");
    let mut config = File::create(&config_path).expect("creating server config");
    write!(
        config,
        "\
        [rawhttpd]\n\
        bind = \"127.0.0.1:0\"\n\
        read-buffer-size = 1024\n"
    )
    .unwrap();
    drop(config);

    let mut server = Command::new(rawhttpd_path)
        .arg("--print-info")
        .arg("--config")
        .arg(config_path.as_os_str())
        .args(extra_args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .current_dir(working_dir.path())
        .spawn()
        .expect("Unable to launch rawhttpd server");

    let mut server_info = String::new();
    let server_stdout = server.stdout.as_mut().unwrap();
    server_stdout
        .read_to_string(&mut server_info)
        .expect("reading server info");
    let server_info = json::parse(&server_info)
        .expect("Couldn't understand server_info from rawhttpd server process");

    let port = server_info["port"]
        .as_u16()
        .ok_or("port not found in server info")
        .unwrap();

    RawhttpdServerInstance {
        port,
        _tempdir: working_dir,
        process: server,
    }
}

fn connect(server: &RawhttpdServerInstance) -> TcpStream {
    let stream = TcpStream::connect(("127.0.0.1", server.port)).expect("connecting to server");
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("setting read timeout");
    stream
}

fn exchange(stream: &mut TcpStream, request: &[u8], expected_len: usize) -> Vec<u8> {
    stream.write_all(request).expect("sending request");
    let mut response = vec![0u8; expected_len];
    stream.read_exact(&mut response).expect("reading response");
    log::trace!("Got response: {:?}", String::from_utf8_lossy(&response));
    response
}

fn assert_response(server: &RawhttpdServerInstance, request: &[u8], expected: &[u8]) {
    let mut stream = connect(server);
    let response = exchange(&mut stream, request, expected.len());
    assert_eq!(
        String::from_utf8_lossy(&response),
        String::from_utf8_lossy(expected),
        "response to {:?}",
        String::from_utf8_lossy(request)
    );
}

fn check_fixed_routes(server: &RawhttpdServerInstance) {
    log::info!("Checking fixed routes...");

    assert_response(server, b"GET / HTTP/1.1\r\n\r\n", b"HTTP/1.1 200 OK\r\n\r\n");
    assert_response(
        server,
        b"GET /echo/abc HTTP/1.1\r\n\r\n",
        b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 3\r\n\r\nabc\r\n",
    );
    assert_response(
        server,
        b"GET /user-agent HTTP/1.1\r\nUser-Agent: test-client\r\n\r\n",
        b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 11\r\n\r\ntest-client\r\n",
    );
    assert_response(server, b"GET /nope HTTP/1.1\r\n\r\n", b"HTTP/1.1 404 Not Found\r\n\r\n");
}

fn check_malformed_start_lines(server: &RawhttpdServerInstance) {
    log::info!("Checking malformed start lines...");

    assert_response(server, b"GET /\r\n\r\n", b"HTTP/1.1 400 BAD REQUEST\r\n\r\n");
    assert_response(server, b"GET / HTTP/1.1 x\r\n\r\n", b"HTTP/1.1 400 BAD REQUEST\r\n\r\n");
    assert_response(server, b"GET / HTTP/1.1 x y z\r\n\r\n", b"HTTP/1.1 400 BAD REQUEST\r\n\r\n");
}

fn check_multibyte_echo(server: &RawhttpdServerInstance) {
    log::info!("Checking multi-byte echo...");

    let body = "añb✓";
    let request = format!("GET /echo/{} HTTP/1.1\r\n\r\n", body);
    let expected = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\n\r\n{}\r\n",
        body.len(),
        body
    );
    assert_eq!(body.len(), 7);
    assert_response(server, request.as_bytes(), expected.as_bytes());
}

fn check_connection_reuse(server: &RawhttpdServerInstance) {
    log::info!("Checking sequential requests on one connection...");

    let request = b"GET /user-agent HTTP/1.1\r\nUser-Agent: same-again\r\n\r\n";
    let expected: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 10\r\n\r\nsame-again\r\n";

    let mut stream = connect(server);
    let first = exchange(&mut stream, request, expected.len());
    let second = exchange(&mut stream, request, expected.len());

    assert_eq!(first, expected);
    assert_eq!(first, second);

    // A bad request does not end the connection either
    let bad = exchange(&mut stream, b"NOPE\r\n\r\n", b"HTTP/1.1 400 BAD REQUEST\r\n\r\n".len());
    assert_eq!(bad, b"HTTP/1.1 400 BAD REQUEST\r\n\r\n");
    let after = exchange(&mut stream, b"GET / HTTP/1.1\r\n\r\n", b"HTTP/1.1 200 OK\r\n\r\n".len());
    assert_eq!(after, b"HTTP/1.1 200 OK\r\n\r\n");
}

fn check_http_client_interop(server: &RawhttpdServerInstance) {
    log::info!("Checking interop with an http client...");

    let response = ureq::get(&format!("http://127.0.0.1:{}/echo/from-ureq", server.port))
        .call()
        .unwrap();
    log::trace!(
        "Got echo response with HTTP version: {}",
        response.http_version()
    );
    assert_eq!(response.status(), 200);
    assert_eq!(response.header("Content-Type"), Some("text/plain"));
    assert_eq!(response.into_string().unwrap(), "from-ureq");

    let response = ureq::get(&format!("http://127.0.0.1:{}/user-agent", server.port))
        .set("User-Agent", "rawhttpd-harness/1.0")
        .call()
        .unwrap();
    assert_eq!(response.into_string().unwrap(), "rawhttpd-harness/1.0");

    match ureq::get(&format!("http://127.0.0.1:{}/missing", server.port)).call() {
        Err(ureq::Error::Status(code, _)) => assert_eq!(code, 404),
        other => panic!("expected a 404, got {:?}", other.map(|r| r.status())),
    }
}

fn check_single_request_mode() {
    log::info!("Checking single-request mode...");

    let server = start_server(&["--single-request"]);
    let mut stream = connect(&server);

    stream.write_all(b"GET /echo/once HTTP/1.1\r\n\r\n").unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).unwrap();

    assert_eq!(
        response,
        b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 4\r\n\r\nonce\r\n"
    );
}

fn check_bind_failure_exits_non_zero() {
    log::info!("Checking bind failure...");

    let rawhttpd_path = env::var("RAWHTTPD_BIN").expect("Need to set RAWHTTPD_BIN environment variable");
    let status = Command::new(rawhttpd_path)
        .arg("--bind")
        .arg("127.0.0.1:notaport")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .expect("Unable to launch rawhttpd server");

    assert!(!status.success(), "server should fail to start: {}", status);
}

// #[test]
fn main() {
    pretty_env_logger::init_timed();

    let mut server = start_server(&[]);
    log::debug!("Server listening on port {}", server.port);

    check_fixed_routes(&server);
    check_malformed_start_lines(&server);
    check_multibyte_echo(&server);
    check_connection_reuse(&server);
    check_http_client_interop(&server);
    check_single_request_mode();
    check_bind_failure_exits_non_zero();

    log::info!("Server status: {:?}", server.process.try_wait());
}
