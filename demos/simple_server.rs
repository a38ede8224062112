//! Simple MJPEG streaming server example
//!
//! Run with: cargo run --example simple_server [BIND_ADDR] [OPTIONS]
//!
//! Examples:
//!   cargo run --example simple_server                      # binds to 0.0.0.0:8088
//!   cargo run --example simple_server localhost            # binds to 127.0.0.1:8088
//!   cargo run --example simple_server 127.0.0.1:9000       # binds to 127.0.0.1:9000
//!   cargo run --example simple_server -- --fps 10          # 10 frames per second
//!   cargo run --example simple_server -- --user u --pass p # require Basic auth
//!
//! ## Watching the stream
//!
//! Browser: http://localhost:8088/image.mjpg
//! ffplay:  ffplay http://localhost:8088/image.mjpg
//! VLC:     vlc http://localhost:8088/image.mjpg
//!
//! The demo broadcasts a tiny placeholder JPEG over and over; real
//! deployments implement `FrameSource` over a camera or capture pipeline.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use mjpeg_rs::{FrameSource, MjpegServer, Paced, ServerConfig};

/// Smallest JPEG that mainstream decoders accept: one gray pixel
const PLACEHOLDER_JPEG: &[u8] = &[
    0xff, 0xd8, 0xff, 0xdb, 0x00, 0x43, 0x00, 0x03, 0x02, 0x02, 0x02, 0x02, 0x02, 0x03, 0x02,
    0x02, 0x02, 0x03, 0x03, 0x03, 0x03, 0x04, 0x06, 0x04, 0x04, 0x04, 0x04, 0x04, 0x08, 0x06,
    0x06, 0x05, 0x06, 0x09, 0x08, 0x0a, 0x0a, 0x09, 0x08, 0x09, 0x09, 0x0a, 0x0c, 0x0f, 0x0c,
    0x0a, 0x0b, 0x0e, 0x0b, 0x09, 0x09, 0x0d, 0x11, 0x0d, 0x0e, 0x0f, 0x10, 0x10, 0x11, 0x10,
    0x0a, 0x0c, 0x12, 0x13, 0x12, 0x10, 0x13, 0x0f, 0x10, 0x10, 0x10, 0xff, 0xc9, 0x00, 0x0b,
    0x08, 0x00, 0x01, 0x00, 0x01, 0x01, 0x01, 0x11, 0x00, 0xff, 0xcc, 0x00, 0x06, 0x00, 0x10,
    0x10, 0x05, 0xff, 0xda, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3f, 0x00, 0xd2, 0xcf, 0x20,
    0xff, 0xd9,
];

/// Endless source that repeats the placeholder frame
struct TestPatternSource;

impl FrameSource for TestPatternSource {
    async fn next_frame(&mut self) -> io::Result<Option<Bytes>> {
        Ok(Some(Bytes::from_static(PLACEHOLDER_JPEG)))
    }
}

/// Parse bind address from command line argument.
///
/// Accepts formats:
/// - "localhost" -> 127.0.0.1:8088
/// - "localhost:9000" -> 127.0.0.1:9000
/// - "127.0.0.1" -> 127.0.0.1:8088
/// - "0.0.0.0:9000" -> 0.0.0.0:9000
fn parse_bind_addr(arg: &str) -> Result<SocketAddr, String> {
    const DEFAULT_PORT: u16 = 8088;

    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

fn print_usage() {
    eprintln!("Usage: simple_server [BIND_ADDR] [--fps N] [--user USER --pass PASS]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_ADDR    Address to bind to (default: 0.0.0.0:8088)");
    eprintln!("  --fps N      Target frame rate (default: 30)");
    eprintln!("  --user USER  Require Basic auth with this username");
    eprintln!("  --pass PASS  Require Basic auth with this password");
}

struct Args {
    bind_addr: SocketAddr,
    fps: u32,
    user: Option<String>,
    pass: Option<String>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        bind_addr: "0.0.0.0:8088".parse().unwrap(),
        fps: 30,
        user: None,
        pass: None,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--fps" => {
                let value = iter.next().ok_or("--fps requires a value")?;
                args.fps = value
                    .parse()
                    .map_err(|_| format!("invalid fps value: '{}'", value))?;
            }
            "--user" => args.user = Some(iter.next().ok_or("--user requires a value")?),
            "--pass" => args.pass = Some(iter.next().ok_or("--pass requires a value")?),
            other => args.bind_addr = parse_bind_addr(other)?,
        }
    }

    if args.user.is_some() != args.pass.is_some() {
        return Err("--user and --pass must be given together".to_string());
    }

    Ok(args)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::args().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mjpeg_rs=debug".parse()?)
                .add_directive("simple_server=debug".parse()?),
        )
        .init();

    let mut config = ServerConfig::with_addr(args.bind_addr);
    if let (Some(user), Some(pass)) = (args.user, args.pass) {
        config = config.auth_validator(move |u, p| u == user && p == pass);
    }

    println!("Starting MJPEG server on {}", config.bind_addr);
    println!();
    println!("=== Watch the stream ===");
    println!("Browser: http://localhost:{}/image.mjpg", args.bind_addr.port());
    println!("ffplay:  ffplay http://localhost:{}/image.mjpg", args.bind_addr.port());
    println!();

    let server = Arc::new(MjpegServer::new(config));

    let accept = Arc::clone(&server);
    let accept_task = tokio::spawn(async move {
        if let Err(e) = accept.run().await {
            eprintln!("Server error: {}", e);
        }
    });

    let source = Paced::new(TestPatternSource, args.fps);

    tokio::select! {
        result = server.stream_from(source) => {
            if let Err(e) = result {
                eprintln!("Source error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\nShutting down...");
        }
    }

    accept_task.abort();
    let stats = server.stats();
    println!(
        "Served {} connections, {} broadcasts, {} frames delivered ({} dropped)",
        stats.total_connections,
        stats.frames_broadcast,
        stats.frames_delivered,
        stats.frames_dropped
    );

    Ok(())
}
