// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::path::PathBuf;

use clap::Parser;

use crate::config::DEFAULT_CONTAINER_ID_LENGTH;

#[derive(Parser, Debug)]
#[command(name = "container-ps-agent")]
#[command(
    about = "Serves the container_processes table to the extension host over a Unix socket",
    long_about = None
)]
pub struct Args {
    /// Path to the extension Unix domain socket
    #[arg(long, env = "CONTAINER_PS_SOCKET")]
    pub socket: PathBuf,

    /// Number of leading characters of the container id to expose
    #[arg(
        long,
        default_value_t = DEFAULT_CONTAINER_ID_LENGTH,
        env = "CONTAINER_PS_ID_LENGTH"
    )]
    pub container_id_length: usize,

    /// PID file path
    #[arg(long)]
    pub pid: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: log::Level,
}
