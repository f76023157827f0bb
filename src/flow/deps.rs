//! Dependency lines and version checks
//!
//! A flow carries its requirements as newline-separated lines of
//! `name`, `name==version`, `name>=version`, or `name>version`.
//! Versions compare leniently: dotted numeric segments, with a `dev`
//! marker ranking below the matching release.

use super::error::{FlowError, Result};
use regex::Regex;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::LazyLock;

static DEPENDENCY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<name>[\w\-]+)((?P<operation>==|>=|>)(?P<version>(\d+\.)?(\d+\.)?(\d+)?(dev)?[0-9]*))?$",
    )
    .expect("dependency pattern is valid")
});

/// Lenient version: dotted numeric parts plus a dev marker
#[derive(Debug, Clone)]
pub struct LooseVersion {
    parts: Vec<u64>,
    dev: bool,
}

// Equality goes through the ordering so trailing zero segments do not
// distinguish versions: 1.2 == 1.2.0.
impl PartialEq for LooseVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for LooseVersion {}

impl LooseVersion {
    /// Never fails: unparsable segments are skipped
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        let dev = text.contains("dev");
        let parts = text
            .split('.')
            .filter_map(|segment| {
                let digits: String = segment.chars().take_while(char::is_ascii_digit).collect();
                digits.parse().ok()
            })
            .collect();
        Self { parts, dev }
    }
}

impl PartialOrd for LooseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LooseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        for i in 0..len {
            let a = self.parts.get(i).copied().unwrap_or(0);
            let b = other.parts.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        // A dev build precedes its release.
        other.dev.cmp(&self.dev)
    }
}

/// Comparison operator in a dependency line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionOp {
    Eq,
    Ge,
    Gt,
}

impl VersionOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionOp::Eq => "==",
            VersionOp::Ge => ">=",
            VersionOp::Gt => ">",
        }
    }

    fn holds(&self, installed: &LooseVersion, required: &LooseVersion) -> bool {
        match self {
            VersionOp::Eq => installed == required,
            VersionOp::Ge => installed >= required,
            VersionOp::Gt => installed > required,
        }
    }
}

/// One parsed dependency line
#[derive(Debug, Clone, PartialEq)]
pub struct Dependency {
    pub name: String,
    pub constraint: Option<(VersionOp, String)>,
}

/// Parse one dependency line
pub fn parse_dependency(line: &str) -> Result<Dependency> {
    let caps = DEPENDENCY_PATTERN
        .captures(line.trim())
        .ok_or_else(|| FlowError::MalformedDependency(line.to_string()))?;
    let name = caps["name"].to_string();
    let constraint = match (caps.name("operation"), caps.name("version")) {
        (Some(op), Some(version)) => {
            let op = match op.as_str() {
                "==" => VersionOp::Eq,
                ">=" => VersionOp::Ge,
                ">" => VersionOp::Gt,
                _ => return Err(FlowError::MalformedDependency(line.to_string())),
            };
            Some((op, version.as_str().to_string()))
        }
        _ => None,
    };
    Ok(Dependency { name, constraint })
}

/// What this process has available, by package name
///
/// Stands in for a package-manager query: the host registers what it
/// ships, and flows are checked against it before reconstruction.
#[derive(Debug, Clone)]
pub struct InstalledPackages {
    versions: HashMap<String, String>,
}

impl Default for InstalledPackages {
    fn default() -> Self {
        let mut versions = HashMap::new();
        versions.insert(
            env!("CARGO_PKG_NAME").to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        );
        versions.insert("ndarray".to_string(), "0.16".to_string());
        Self { versions }
    }
}

impl InstalledPackages {
    /// An empty registry, nothing available
    pub fn empty() -> Self {
        Self {
            versions: HashMap::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, version: impl Into<String>) {
        self.versions.insert(name.into(), version.into());
    }

    pub fn version_of(&self, name: &str) -> Option<&str> {
        self.versions.get(name).map(String::as_str)
    }

    /// Verify every dependency line against the registered versions
    pub fn check(&self, dependencies: &str) -> Result<()> {
        for line in dependencies.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let dep = parse_dependency(line)?;
            let installed = self
                .version_of(&dep.name)
                .ok_or_else(|| FlowError::MissingPackage(dep.name.clone()))?;
            if let Some((op, required)) = dep.constraint {
                let have = LooseVersion::parse(installed);
                let want = LooseVersion::parse(&required);
                if !op.holds(&have, &want) {
                    return Err(FlowError::DependencyUnsatisfied {
                        name: dep.name,
                        operation: op.as_str(),
                        required,
                        installed: installed.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}
