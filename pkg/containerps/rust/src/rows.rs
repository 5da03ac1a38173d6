// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use log::{debug, info, warn};
use serde::Serialize;

use crate::config::Config;
use crate::docker::{Container, ContainerLister, ProcessSnapshot, ProcessTopReader};
use crate::errors::{Error, Skip};

const PID_TITLE: &str = "PID";
const COMMAND_TITLE: &str = "COMMAND";
const COMMAND_TITLE_SHORT: &str = "CMD";
const UNKNOWN_CONTAINER_NAME: &str = "unknown";

/// One emitted table row: one host-visible process of one container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessRow {
    pub host_pid: String,
    pub name: String,
    pub container_id: String,
    pub container_name: String,
    pub container_image: String,
}

/// Result of one scan pass: the emitted rows, in container-enumeration then
/// snapshot-row order, plus the containers that were dropped along the way.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub rows: Vec<ProcessRow>,
    pub skips: Vec<Skip>,
    /// Data rows shorter than their own titles, dropped without affecting the
    /// rest of their container's snapshot.
    pub malformed_rows: usize,
}

/// Produces the full row set for one table scan. A single stateless pass: no
/// retry, no cursor, no state shared between calls. One broken container
/// never aborts the scan; only a failed container listing does. Dropping the
/// returned future between awaits abandons the remaining containers.
pub async fn generate<R>(runtime: &R, config: &Config) -> Result<ScanOutcome, Error>
where
    R: ContainerLister + ProcessTopReader,
{
    let containers = runtime.list_containers(true).await?;

    let mut outcome = ScanOutcome::default();
    for container in &containers {
        match runtime.top_processes(&container.id).await {
            Ok(snapshot) => {
                emit_rows(
                    container,
                    &snapshot,
                    config.container_id_length,
                    &mut outcome,
                );
            }
            Err(e) => {
                warn!("skipping container: {e}");
                outcome.skips.push(Skip::ContainerQueryFailed {
                    container_id: container.id.clone(),
                });
            }
        }
    }

    info!(
        "scan produced {} rows from {} containers ({} skipped)",
        outcome.rows.len(),
        containers.len(),
        outcome.skips.len()
    );
    Ok(outcome)
}

fn emit_rows(
    container: &Container,
    snapshot: &ProcessSnapshot,
    id_length: usize,
    outcome: &mut ScanOutcome,
) {
    let pid_index = find_title_index(&snapshot.titles, PID_TITLE);
    let cmd_index = find_title_index(&snapshot.titles, COMMAND_TITLE)
        .or_else(|| find_title_index(&snapshot.titles, COMMAND_TITLE_SHORT));

    let (Some(pid_index), Some(cmd_index)) = (pid_index, cmd_index) else {
        warn!(
            "container {} has no PID or COMMAND/CMD column, titles: {:?}",
            container.id, snapshot.titles
        );
        outcome.skips.push(Skip::SchemaMismatch {
            container_id: container.id.clone(),
            titles: snapshot.titles.clone(),
        });
        return;
    };

    let container_name = display_name(&container.names);
    let container_id = id_prefix(&container.id, id_length);

    for process in &snapshot.processes {
        // Rows shorter than their own titles happen when the runtime's ps
        // output is mangled; drop the row, keep the container.
        let (Some(host_pid), Some(name)) = (process.get(pid_index), process.get(cmd_index)) else {
            debug!(
                "container {} returned a process row with {} fields, need {}",
                container.id,
                process.len(),
                pid_index.max(cmd_index) + 1
            );
            outcome.malformed_rows += 1;
            continue;
        };

        outcome.rows.push(ProcessRow {
            host_pid: host_pid.clone(),
            name: name.clone(),
            container_id: container_id.clone(),
            container_name: container_name.clone(),
            container_image: container.image.clone(),
        });
    }
}

fn find_title_index(titles: &[String], title: &str) -> Option<usize> {
    titles.iter().position(|t| t == title)
}

/// First name wins, with a single leading "/" stripped (the runtime reports
/// names in "/web" form). No names at all yields the literal "unknown".
fn display_name(names: &[String]) -> String {
    match names.first() {
        Some(name) => name.strip_prefix('/').unwrap_or(name).to_string(),
        None => UNKNOWN_CONTAINER_NAME.to_string(),
    }
}

/// Clamped prefix: ids shorter than the configured length are emitted whole.
fn id_prefix(id: &str, length: usize) -> String {
    id.chars().take(length).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FakeRuntime {
        list_fails: bool,
        containers: Vec<Container>,
        snapshots: HashMap<String, ProcessSnapshot>,
    }

    impl FakeRuntime {
        fn new() -> Self {
            FakeRuntime {
                list_fails: false,
                containers: Vec::new(),
                snapshots: HashMap::new(),
            }
        }

        fn with_container(
            mut self,
            container: Container,
            titles: &[&str],
            processes: &[&[&str]],
        ) -> Self {
            self.snapshots.insert(
                container.id.clone(),
                ProcessSnapshot {
                    titles: titles.iter().map(|t| t.to_string()).collect(),
                    processes: processes
                        .iter()
                        .map(|row| row.iter().map(|f| f.to_string()).collect())
                        .collect(),
                },
            );
            self.containers.push(container);
            self
        }

        /// Container is listed but its process-table call fails.
        fn with_broken_container(mut self, container: Container) -> Self {
            self.containers.push(container);
            self
        }
    }

    impl ContainerLister for FakeRuntime {
        async fn list_containers(&self, _include_stopped: bool) -> Result<Vec<Container>, Error> {
            if self.list_fails {
                return Err(Error::RuntimeUnavailable {
                    context: "connection refused".to_string(),
                });
            }
            Ok(self.containers.clone())
        }
    }

    impl ProcessTopReader for FakeRuntime {
        async fn top_processes(&self, container_id: &str) -> Result<ProcessSnapshot, Error> {
            match self.snapshots.get(container_id) {
                Some(snapshot) => Ok(snapshot.clone()),
                None => Err(Error::ContainerQuery {
                    container_id: container_id.to_string(),
                    context: "no such container".to_string(),
                }),
            }
        }
    }

    fn container(id: &str, names: &[&str], image: &str) -> Container {
        Container {
            id: id.to_string(),
            names: names.iter().map(|n| n.to_string()).collect(),
            image: image.to_string(),
        }
    }

    #[tokio::test]
    async fn test_single_container_single_process() {
        let runtime = FakeRuntime::new().with_container(
            container("abc123def456789", &["/web"], "nginx:latest"),
            &["PID", "COMMAND"],
            &[&["42", "nginx: worker"]],
        );

        let outcome = generate(&runtime, &Config::default()).await.unwrap();

        assert_eq!(
            outcome.rows,
            vec![ProcessRow {
                host_pid: "42".to_string(),
                name: "nginx: worker".to_string(),
                container_id: "abc123def456".to_string(),
                container_name: "web".to_string(),
                container_image: "nginx:latest".to_string(),
            }]
        );
        assert!(outcome.skips.is_empty());
        assert_eq!(outcome.malformed_rows, 0);
    }

    #[tokio::test]
    async fn test_cmd_title_fallback() {
        let runtime = FakeRuntime::new().with_container(
            container("abc123def456789", &["/web"], "nginx:latest"),
            &["PID", "CMD"],
            &[&["42", "nginx: worker"]],
        );

        let outcome = generate(&runtime, &Config::default()).await.unwrap();

        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0].host_pid, "42");
        assert_eq!(outcome.rows[0].name, "nginx: worker");
    }

    #[tokio::test]
    async fn test_command_preferred_over_cmd() {
        let runtime = FakeRuntime::new().with_container(
            container("aaa111", &[], "img"),
            &["PID", "CMD", "COMMAND"],
            &[&["1", "short", "full command line"]],
        );

        let outcome = generate(&runtime, &Config::default()).await.unwrap();

        assert_eq!(outcome.rows[0].name, "full command line");
    }

    #[tokio::test]
    async fn test_row_count_matches_well_formed_rows() {
        let runtime = FakeRuntime::new().with_container(
            container("aaa111bbb222ccc", &["/app"], "app:1"),
            &["UID", "PID", "PPID", "COMMAND"],
            &[
                &["root", "1", "0", "/sbin/init"],
                &["root", "2"], // truncated, dropped
                &["app", "7", "1", "worker"],
                &[], // empty, dropped
            ],
        );

        let outcome = generate(&runtime, &Config::default()).await.unwrap();

        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.malformed_rows, 2);
        assert_eq!(outcome.rows[0].host_pid, "1");
        assert_eq!(outcome.rows[0].name, "/sbin/init");
        assert_eq!(outcome.rows[1].host_pid, "7");
        assert_eq!(outcome.rows[1].name, "worker");
    }

    #[tokio::test]
    async fn test_unresolvable_titles_skip_container_only() {
        let runtime = FakeRuntime::new()
            .with_container(
                container("nocmd000000000", &["/a"], "a:1"),
                &["PID", "USER"],
                &[&["1", "root"]],
            )
            .with_container(
                container("ok000000000000", &["/b"], "b:1"),
                &["PID", "COMMAND"],
                &[&["2", "bash"]],
            )
            .with_container(
                container("nopid00000000", &["/c"], "c:1"),
                &["USER", "COMMAND"],
                &[&["root", "sh"]],
            );

        let outcome = generate(&runtime, &Config::default()).await.unwrap();

        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0].container_name, "b");
        assert_eq!(
            outcome.skips,
            vec![
                Skip::SchemaMismatch {
                    container_id: "nocmd000000000".to_string(),
                    titles: vec!["PID".to_string(), "USER".to_string()],
                },
                Skip::SchemaMismatch {
                    container_id: "nopid00000000".to_string(),
                    titles: vec!["USER".to_string(), "COMMAND".to_string()],
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_title_match_is_case_sensitive() {
        let runtime = FakeRuntime::new().with_container(
            container("case0000000000", &["/a"], "a:1"),
            &["pid", "command"],
            &[&["1", "sh"]],
        );

        let outcome = generate(&runtime, &Config::default()).await.unwrap();

        assert!(outcome.rows.is_empty());
        assert_eq!(outcome.skips.len(), 1);
    }

    #[tokio::test]
    async fn test_failing_top_isolates_container() {
        let runtime = FakeRuntime::new()
            .with_container(
                container("before00000000", &["/before"], "a:1"),
                &["PID", "COMMAND"],
                &[&["1", "one"]],
            )
            .with_broken_container(container("broken00000000", &["/broken"], "b:1"))
            .with_container(
                container("after000000000", &["/after"], "c:1"),
                &["PID", "COMMAND"],
                &[&["3", "three"]],
            );

        let outcome = generate(&runtime, &Config::default()).await.unwrap();

        let names: Vec<&str> = outcome
            .rows
            .iter()
            .map(|r| r.container_name.as_str())
            .collect();
        assert_eq!(names, vec!["before", "after"]);
        assert_eq!(
            outcome.skips,
            vec![Skip::ContainerQueryFailed {
                container_id: "broken00000000".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_failing_list_fails_whole_scan() {
        let mut runtime = FakeRuntime::new().with_container(
            container("unreached00000", &["/a"], "a:1"),
            &["PID", "COMMAND"],
            &[&["1", "sh"]],
        );
        runtime.list_fails = true;

        let result = generate(&runtime, &Config::default()).await;

        assert!(matches!(result, Err(Error::RuntimeUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_id_shorter_than_configured_length_is_emitted_whole() {
        let runtime = FakeRuntime::new().with_container(
            container("short", &["/a"], "a:1"),
            &["PID", "COMMAND"],
            &[&["1", "sh"]],
        );

        let outcome = generate(&runtime, &Config::default()).await.unwrap();

        assert_eq!(outcome.rows[0].container_id, "short");
    }

    #[tokio::test]
    async fn test_id_prefix_length_is_configurable() {
        let runtime = FakeRuntime::new().with_container(
            container("abcdefghij", &["/a"], "a:1"),
            &["PID", "COMMAND"],
            &[&["1", "sh"]],
        );
        let config = Config::new(4).unwrap();

        let outcome = generate(&runtime, &config).await.unwrap();

        assert_eq!(outcome.rows[0].container_id, "abcd");
    }

    #[tokio::test]
    async fn test_missing_names_yield_unknown() {
        let runtime = FakeRuntime::new().with_container(
            container("noname00000000", &[], "scratch"),
            &["PID", "COMMAND"],
            &[&["9", "sleep"]],
        );

        let outcome = generate(&runtime, &Config::default()).await.unwrap();

        assert_eq!(outcome.rows[0].container_name, "unknown");
    }

    #[test]
    fn test_leading_slash_stripped_once() {
        assert_eq!(display_name(&["/web".to_string()]), "web");
        assert_eq!(display_name(&["web".to_string()]), "web");
        assert_eq!(display_name(&["//web".to_string()]), "/web");
        // Only the first name counts.
        assert_eq!(
            display_name(&["/first".to_string(), "/second".to_string()]),
            "first"
        );
        // A present-but-empty first name is used as-is.
        assert_eq!(display_name(&[String::new()]), "");
    }

    #[tokio::test]
    async fn test_empty_container_list() {
        let runtime = FakeRuntime::new();

        let outcome = generate(&runtime, &Config::default()).await.unwrap();

        assert!(outcome.rows.is_empty());
        assert!(outcome.skips.is_empty());
    }

    #[tokio::test]
    async fn test_row_serialization_matches_schema_names() {
        let row = ProcessRow {
            host_pid: "42".to_string(),
            name: "nginx: worker".to_string(),
            container_id: "abc123def456".to_string(),
            container_name: "web".to_string(),
            container_image: "nginx:latest".to_string(),
        };

        let json = serde_json::to_value(&row).unwrap();
        let keys: Vec<&str> = crate::schema::columns().iter().map(|c| c.name).collect();
        for key in keys {
            assert!(json.get(key).is_some(), "missing column {key} in row JSON");
        }
    }
}
