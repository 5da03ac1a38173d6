// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use serde::Serialize;

pub const TABLE_NAME: &str = "container_processes";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    Integer,
    Text,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnDefinition {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

/// Declared column schema, in emission order. `host_pid` is integer-typed on
/// the host side even though row values travel as strings.
pub fn columns() -> Vec<ColumnDefinition> {
    vec![
        ColumnDefinition {
            name: "host_pid",
            column_type: ColumnType::Integer,
        },
        ColumnDefinition {
            name: "name",
            column_type: ColumnType::Text,
        },
        ColumnDefinition {
            name: "container_id",
            column_type: ColumnType::Text,
        },
        ColumnDefinition {
            name: "container_name",
            column_type: ColumnType::Text,
        },
        ColumnDefinition {
            name: "container_image",
            column_type: ColumnType::Text,
        },
    ]
}
