// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

// Correctness
#![deny(clippy::indexing_slicing)]
#![deny(clippy::string_slice)]
#![deny(clippy::cast_possible_wrap)]
#![deny(clippy::undocumented_unsafe_blocks)]
// Panicking code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::unimplemented)]
#![deny(clippy::todo)]
// Debug code that shouldn't be in production
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]

use std::fs::{DirBuilder, OpenOptions, Permissions};
use std::io::{ErrorKind, Write};
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use dd_containerps::{Config, DockerRuntime, cli::Args, columns, generate};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use log::{error, info};
use serde_json::json;
use tokio::net::UnixListener;
use tokio::signal::unix::{SignalKind, signal};

static NOTFOUND: &[u8] = b"Not found";

const SCAN_PATH: &str = "/table/container_processes/scan";
const SCHEMA_PATH: &str = "/table/container_processes/schema";

/// Shared, read-only per-process state. Scans are independent; this is the
/// only thing they share.
struct AppState {
    runtime: DockerRuntime,
    config: Config,
}

fn write_pid_file(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        DirBuilder::new()
            .recursive(true)
            .mode(0o755)
            .create(parent)
            .context("Failed to create PID file parent directory")?;
    }

    let pid = std::process::id();
    let mut file = OpenOptions::new()
        .write(true)
        .mode(0o644)
        .truncate(true)
        .create(true)
        .open(path)
        .context("Failed to write PID file")?;
    file.write_all(pid.to_string().as_bytes())
        .context("Failed to write PID to file")?;

    info!("Created PID file at {}", path.display());
    Ok(())
}

fn remove_pid_file(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        error!("Failed to remove PID file: {}", e);
    } else {
        info!("Removed PID file at {}", path.display());
    }
}

fn setup_socket(socket_path: &Path) -> Result<UnixListener> {
    std::fs::remove_file(socket_path)
        .or_else(|error| {
            if error.kind() == ErrorKind::NotFound {
                Ok(())
            } else {
                Err(error)
            }
        })
        .context("failed to remove existing socket")?;

    let sock = UnixListener::bind(socket_path).context("could not bind extension socket")?;
    std::fs::set_permissions(socket_path, Permissions::from_mode(0o720))
        .context("could not set socket permissions")?;

    Ok(sock)
}

async fn handle_scan(state: &AppState) -> Result<Response<BoxBody<Bytes, std::io::Error>>> {
    match generate(&state.runtime, &state.config).await {
        Ok(outcome) => json_response(&json!({ "rows": outcome.rows })),
        Err(e) => {
            error!("scan failed: {e}");
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .header("Content-Type", "application/json")
                .body(
                    Full::new(
                        serde_json::to_vec(&json!({ "error": e.to_string() }))
                            .unwrap_or_else(|_| b"{}".to_vec())
                            .into(),
                    )
                    .map_err(|e| match e {})
                    .boxed(),
                )
                .map_err(|e| anyhow!("Failed to build error response: {}", e))
        }
    }
}

fn handle_schema() -> Result<Response<BoxBody<Bytes, std::io::Error>>> {
    json_response(&json!({
        "name": dd_containerps::TABLE_NAME,
        "columns": columns(),
    }))
}

fn handle_debug_stats() -> Result<Response<BoxBody<Bytes, std::io::Error>>> {
    json_response(&json!({}))
}

fn json_response(
    value: &serde_json::Value,
) -> Result<Response<BoxBody<Bytes, std::io::Error>>> {
    Response::builder()
        .header("Content-Type", "application/json")
        .body(
            Full::new(
                serde_json::to_vec(value)
                    .unwrap_or_else(|e| {
                        error!("Failed to serialize response: {e}");
                        b"Internal server error".to_vec()
                    })
                    .into(),
            )
            .map_err(|e| match e {})
            .boxed(),
        )
        .map_err(|e| anyhow!("Failed to build response: {}", e))
}

fn not_found() -> Result<Response<BoxBody<Bytes, std::io::Error>>> {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .body(Full::new(NOTFOUND.into()).map_err(|e| match e {}).boxed())
        .map_err(|e| anyhow!("Failed to build not found response: {}", e))
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody<Bytes, std::io::Error>>> {
    match (req.method(), req.uri().path()) {
        (&Method::POST, SCAN_PATH) => {
            info!("Handling table scan request");
            handle_scan(&state).await
        }
        (&Method::GET, SCHEMA_PATH) => handle_schema(),
        (&Method::GET, "/debug/stats") => handle_debug_stats(),
        _ => {
            info!(
                "{} Request to unknown endpoint: {}",
                req.method(),
                req.uri().path()
            );
            not_found()
        }
    }
}

async fn run_server(socket_path: &Path, state: Arc<AppState>) -> Result<()> {
    let sock = setup_socket(socket_path).context("Failed to setup Unix socket")?;

    let mut sigterm = signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    loop {
        tokio::select! {
            accept_result = sock.accept() => {
                let (stream, _) = accept_result?;
                let io = TokioIo::new(stream);
                let state = Arc::clone(&state);

                // One task per connection; scans stay sequential within a
                // request and independent across requests.
                tokio::task::spawn(async move {
                    if let Err(err) = http1::Builder::new()
                        .serve_connection(
                            io,
                            service_fn(|req| {
                                let state = Arc::clone(&state);
                                async {
                                    Ok::<_, anyhow::Error>(handle_request(req, state).await.unwrap_or_else(|e| {
                                        error!("Request handling failed: {e}");
                                        Response::builder()
                                            .status(StatusCode::INTERNAL_SERVER_ERROR)
                                            .body(
                                                Full::new(Bytes::from(&b"Internal Server Error"[..]))
                                                    .map_err(|e| match e {})
                                                    .boxed(),
                                            )
                                            .unwrap_or_else(|_| {
                                                // Last resort if even error response building fails
                                                Response::new(
                                                    Full::new(Bytes::from(&b"Error"[..]))
                                                        .map_err(|e| match e {})
                                                        .boxed(),
                                                )
                                            })
                                    }))
                                }
                            }),
                        )
                        .await
                    {
                        error!("Error serving connection: {err}");
                    }
                });
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
                return Ok(());
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down");
                return Ok(());
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    simple_logger::init_with_level(args.log_level)?;

    let config = Config::new(args.container_id_length)
        .context("invalid --container-id-length")?;
    let runtime = DockerRuntime::connect()?;
    let state = Arc::new(AppState { runtime, config });

    if let Some(ref path) = args.pid {
        write_pid_file(path)?;
    }

    info!(
        "Starting container-ps-agent on {}",
        args.socket.display()
    );
    let result = run_server(&args.socket, state).await;

    // Cleanup PID file on exit (defer pattern)
    if let Some(path) = args.pid {
        remove_pid_file(&path);
    }

    result
}
