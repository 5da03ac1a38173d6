// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use anyhow::{Result, bail};

pub const DEFAULT_CONTAINER_ID_LENGTH: usize = 12;

/// Validated settings for the row generator.
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of leading characters of a container id exposed in output rows.
    /// Ids shorter than this are emitted whole.
    pub container_id_length: usize,
}

impl Config {
    /// A zero length is rejected up front; the upper bound is enforced per id
    /// when the prefix is taken, since ids vary in length.
    pub fn new(container_id_length: usize) -> Result<Self> {
        if container_id_length == 0 {
            bail!("container id display length must be greater than zero");
        }
        Ok(Config {
            container_id_length,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            container_id_length: DEFAULT_CONTAINER_ID_LENGTH,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_length() {
        assert!(Config::new(0).is_err());
    }

    #[test]
    fn test_accepts_positive_length() {
        let config = Config::new(7).unwrap();
        assert_eq!(config.container_id_length, 7);
    }

    #[test]
    fn test_default_length() {
        assert_eq!(
            Config::default().container_id_length,
            DEFAULT_CONTAINER_ID_LENGTH
        );
    }
}
