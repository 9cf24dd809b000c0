// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::error::{Error, Result};
use log::debug;
use std::path::Path;

const SPACES: &[char] = &[' ', '\t'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub name: String,
    pub command: String,
}

/// Read the manifest at `path`.
pub fn load_manifest(path: &Path) -> Result<Vec<ManifestEntry>> {
    let contents = std::fs::read_to_string(path).map_err(|source| Error::ManifestIo {
        path: path.to_path_buf(),
        source,
    })?;
    let entries = parse_manifest(&contents)?;
    debug!("loaded {} entries from {}", entries.len(), path.display());
    Ok(entries)
}

/// Parse `name: command` lines. Blank lines and `#` comments are skipped; the
/// first `:` separates the name from the command.
pub fn parse_manifest(contents: &str) -> Result<Vec<ManifestEntry>> {
    let mut entries = Vec::new();
    for (i, line) in contents.lines().enumerate() {
        let line = line.trim_matches(SPACES);
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((name, command)) = line.split_once(':') else {
            return Err(Error::ManifestMissingColon { line: i + 1 });
        };
        let name = name.trim_matches(SPACES);
        if name.is_empty() {
            return Err(Error::ManifestEmptyName { line: i + 1 });
        }
        entries.push(ManifestEntry {
            name: name.to_string(),
            command: command.trim_matches(SPACES).to_string(),
        });
    }
    Ok(entries)
}
