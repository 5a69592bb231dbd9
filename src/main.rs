// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! netscope CLI
//!
//! Drives the in-memory reference host through representative traffic and
//! prints every message the inspector bridge would carry.

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use bytes::Bytes;
use serde_json::json;

use netscope::network::{BlobInfo, FormPart, SseErrorKind};
use netscope::{
    BodyContent, ChannelBridge, Headers, HostSeams, InspectorConfig, MemoryEventSources,
    MemoryHttp, MemorySocketModule, NetworkInspector, RequestBody, SystemClock,
};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("netscope=info".parse().unwrap()),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    match args[1].as_str() {
        "demo" => {
            let config_path = match args.get(2).map(String::as_str) {
                Some("--config") => match args.get(3) {
                    Some(path) => Some(path.as_str()),
                    None => {
                        eprintln!("Usage: netscope demo [--config <file>]");
                        return ExitCode::from(1);
                    }
                },
                Some(other) => {
                    eprintln!("Unknown option: {}", other);
                    return ExitCode::from(1);
                }
                None => None,
            };

            match run_demo(config_path).await {
                Ok(count) => {
                    eprintln!("{} bridge messages", count);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("Demo failed: {:#}", e);
                    ExitCode::from(1)
                }
            }
        }
        "--help" | "-h" | "help" => {
            print_usage();
            ExitCode::SUCCESS
        }
        "--version" | "-v" | "version" => {
            println!("netscope {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            ExitCode::from(1)
        }
    }
}

fn print_usage() {
    println!(
        r#"netscope - Network Activity Inspection Core

USAGE:
    netscope <COMMAND> [OPTIONS]

COMMANDS:
    demo [--config <file>]   Run HTTP, WebSocket and SSE traffic through the
                             reference host and print bridge messages as JSON lines
    help                     Show this help message
    version                  Show version information

ENVIRONMENT:
    RUST_LOG                 Log filter (default: netscope=info), logs go to stderr

EXAMPLES:
    netscope demo
    netscope demo --config inspector.json
    RUST_LOG=netscope=debug netscope demo
"#
    );
}

async fn run_demo(config_path: Option<&str>) -> anyhow::Result<usize> {
    let config = match config_path {
        Some(path) => InspectorConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path))?,
        None => InspectorConfig::default().sse(true),
    };

    let http = MemoryHttp::new();
    let sockets = MemorySocketModule::new();
    let sources = MemoryEventSources::new(http.clone());
    let (bridge, mut outgoing) = ChannelBridge::new();

    let inspector = NetworkInspector::new(
        config,
        HostSeams::new()
            .http(http.clone())
            .sockets(sockets.clone())
            .event_sources(sources.clone()),
        bridge.clone(),
        Arc::new(SystemClock),
    );
    inspector.attach();

    // The inspector UI connects and arms interception
    bridge.deliver("network-enable", json!({}));
    anyhow::ensure!(inspector.is_enabled(), "inspection did not enable");

    // JSON fetch with progress
    let users = http.create();
    users.open("GET", "https://api.example.com/users");
    users.set_request_header("Accept", "application/json");
    users.set_initiator_stack(
        "at XMLHttpRequest.send (http://localhost:8081/index.bundle:812:14)\n\
         at loadUsers (http://localhost:8081/index.bundle:1204:9)",
    );
    users.send(None);
    let mut headers = Headers::new();
    headers.append("Content-Type", "application/json; charset=utf-8");
    users.receive_headers(200, "OK", headers);
    users.progress(16, Some(32));
    users.complete(BodyContent::Bytes(Bytes::from_static(
        b"[{\"id\":1,\"name\":\"Ada\"}]",
    )));

    // Multipart upload that times out
    let upload = http.create();
    upload.open("POST", "https://api.example.com/avatar");
    upload.send(Some(RequestBody::FormData(vec![
        FormPart::text("user", "1"),
        FormPart::file(
            "avatar",
            BlobInfo::new(48_213)
                .with_mime_type("image/jpeg")
                .with_name("me.jpg"),
        ),
    ])));
    upload.time_out();

    // Canceled search
    let search = http.create();
    search.open("GET", "https://api.example.com/search?q=net");
    search.send(None);
    search.abort();

    // Dev-server traffic stays invisible
    let symbolicate = http.create();
    symbolicate.open("POST", "http://localhost:8081/symbolicate");
    symbolicate.send(Some(RequestBody::Text("{}".into())));

    // WebSocket chat
    let socket = sockets.connect("wss://chat.example.com/room", &["chat.v1"]);
    sockets.server_open(socket, Some("chat.v1"));
    sockets.send(socket, "hello");
    sockets.server_message(socket, "hello back");
    sockets.send_binary(socket, &[0xde, 0xad, 0xbe, 0xef]);
    sockets.close(socket, 1000, "bye");
    sockets.server_close(socket, 1000, "bye");

    // Event stream
    let stream = sources.open("https://api.example.com/events");
    stream.connected();
    stream.message("price", "{\"eur\":1.08}", Some("1"));
    stream.message("price", "{\"eur\":1.09}", Some("2"));
    stream.error(SseErrorKind::Timeout, Some("no data for 45s"));

    // The inspector asks for the first body
    inspector.send_response_body("req_1").await;

    bridge.deliver("network-disable", json!({}));
    inspector.detach();

    let mut count = 0;
    while let Ok(message) = outgoing.try_recv() {
        let line = serde_json::to_string(&message).context("serializing bridge message")?;
        println!("{}", line);
        count += 1;
    }
    Ok(count)
}
