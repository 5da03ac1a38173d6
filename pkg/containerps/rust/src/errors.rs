// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Listing containers failed. Fails the whole scan; the caller decides
    /// how to surface it.
    #[error("could not list containers: {context}")]
    RuntimeUnavailable { context: String },

    /// Reading one container's process table failed. Never escapes the
    /// generator; converted into a [`Skip`] so the scan continues.
    #[error("could not read processes of container {container_id}: {context}")]
    ContainerQuery {
        container_id: String,
        context: String,
    },
}

/// Container-scoped conditions that drop a container from a scan without
/// failing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Skip {
    /// The runtime's process-table call failed for this container.
    ContainerQueryFailed { container_id: String },
    /// The snapshot lacks a resolvable PID or COMMAND/CMD column.
    SchemaMismatch {
        container_id: String,
        titles: Vec<String>,
    },
}
