// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use anyhow::{Context, Result};
use bollard::Docker;
use bollard::container::{ListContainersOptions, TopOptions};

use crate::errors::Error;

/// One container as reported by the runtime. A read-only snapshot taken per
/// scan; never cached across scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub id: String,
    /// First entry is the display name and may carry a leading "/".
    pub names: Vec<String>,
    pub image: String,
}

/// Point-in-time process table of one container: a header row of column
/// titles plus data rows of string fields. The runtime promises each row
/// matches `titles` in arity, but callers must not rely on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessSnapshot {
    pub titles: Vec<String>,
    pub processes: Vec<Vec<String>>,
}

#[allow(async_fn_in_trait)]
pub trait ContainerLister {
    async fn list_containers(&self, include_stopped: bool) -> Result<Vec<Container>, Error>;
}

#[allow(async_fn_in_trait)]
pub trait ProcessTopReader {
    async fn top_processes(&self, container_id: &str) -> Result<ProcessSnapshot, Error>;
}

/// Docker-engine implementation of both collaborator traits. The connection
/// is lazy; nothing touches the daemon socket until the first call.
#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Honors `DOCKER_HOST`, falling back to the platform's local socket.
    pub fn connect() -> Result<Self> {
        let docker =
            Docker::connect_with_local_defaults().context("could not create Docker client")?;
        Ok(DockerRuntime { docker })
    }
}

impl ContainerLister for DockerRuntime {
    async fn list_containers(&self, include_stopped: bool) -> Result<Vec<Container>, Error> {
        let options = ListContainersOptions::<String> {
            all: include_stopped,
            ..Default::default()
        };
        let summaries = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| Error::RuntimeUnavailable {
                context: e.to_string(),
            })?;

        // The generated models are Option-heavy; an entry without an id
        // cannot be queried further and is dropped here.
        Ok(summaries
            .into_iter()
            .filter_map(|summary| {
                Some(Container {
                    id: summary.id?,
                    names: summary.names.unwrap_or_default(),
                    image: summary.image.unwrap_or_default(),
                })
            })
            .collect())
    }
}

impl ProcessTopReader for DockerRuntime {
    async fn top_processes(&self, container_id: &str) -> Result<ProcessSnapshot, Error> {
        let top = self
            .docker
            .top_processes(container_id, None::<TopOptions<String>>)
            .await
            .map_err(|e| Error::ContainerQuery {
                container_id: container_id.to_string(),
                context: e.to_string(),
            })?;

        Ok(ProcessSnapshot {
            titles: top.titles.unwrap_or_default(),
            processes: top.processes.unwrap_or_default(),
        })
    }
}
