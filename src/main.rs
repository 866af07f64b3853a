use std::{io::{Write, stdout}, os::unix::prelude::AsRawFd, path::PathBuf, process};
use anyhow::{Context, Result};
use rawhttp::server::{ServeError, Server};

mod config;


fn exit_on_fatal(error: ServeError) {
    log::error!("{}", error);
    process::exit(1);
}

pub fn main() -> Result<()> {
    pretty_env_logger::init_timed();

    let matches = clap::App::new("rawhttpd")
        .version(clap::crate_version!())
        .author(clap::crate_authors!())
        .arg(
            clap::Arg::with_name("print-info")
                .long("print-info")
                .help("If set, the server will print connection details and then close stdout")
                .long_help("If set, the server will print connection details and then close stdout. This is useful when the server is allowed to pick the listen port.")
                .takes_value(false))
        .arg(
            clap::Arg::with_name("config")
                .long("config")
                .short("c")
                .help("Where can I find my configuration?")
                .takes_value(true))
        .arg(
            clap::Arg::with_name("bind")
                .long("bind")
                .short("b")
                .help("Address to listen on (default 0.0.0.0:4221)")
                .takes_value(true))
        .arg(
            clap::Arg::with_name("single-request")
                .long("single-request")
                .help("Close each connection after its first response")
                .takes_value(false))
        .get_matches();

    let mut config = config::load(matches.value_of("config").map(PathBuf::from))?;
    if let Some(bind) = matches.value_of("bind") {
        config.bind_address = bind.to_string();
    }
    if matches.is_present("single-request") {
        config.keep_alive = false;
    }

    let bind_address = config.bind_address.clone();
    let server = match Server::bind(config) {
        Ok(server) => server,
        Err(e) => {
            log::error!("Failed to bind to {}: {}", bind_address, e);
            return Err(e).with_context(|| format!("Failed to bind to {}", bind_address));
        }
    };

    if matches.is_present("print-info") {
        let port = server.local_addr().context("Reading bound address")?.port();
        let stdout = stdout();
        let mut s = stdout.lock();
        write!(s, r#"{{ "port": {} }}"#, port)?;
        s.flush()?;
        unsafe {
            let _ = libc::close(s.as_raw_fd());
        };
    }

    log::info!(
        "Serving on {} (keep-alive: {}, read buffer: {} bytes)",
        bind_address,
        server.config().keep_alive,
        server.config().read_buffer_size
    );
    server.serve_forever(exit_on_fatal);

    Ok(())
}
