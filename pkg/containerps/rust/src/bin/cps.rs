// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use anyhow::Result;
use clap::Parser;
use dd_containerps::{Config, DockerRuntime, generate};

#[derive(Parser, Debug)]
#[command(name = "cps")]
#[command(about = "Prints the container_processes table of the local Docker daemon", long_about = None)]
struct Args {
    /// Number of leading characters of the container id to print
    #[arg(long, default_value_t = dd_containerps::config::DEFAULT_CONTAINER_ID_LENGTH)]
    container_id_length: usize,
}

#[allow(clippy::print_stdout, clippy::print_stderr)]
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::new(args.container_id_length)?;
    let runtime = DockerRuntime::connect()?;

    let outcome = generate(&runtime, &config).await?;

    match serde_json::to_string_pretty(&outcome.rows) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing rows: {}", e),
    }
    Ok(())
}
