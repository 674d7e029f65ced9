//! Source descriptors and the immutable registry they live in.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// What kind of stream a source's command produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Aggregated logs of a process group (e.g. `docker compose logs -f`).
    ProcessGroupLogs,
    /// A single followed file (e.g. `tail -F /var/log/app.log`).
    FileTail,
    /// The system journal (e.g. `journalctl -f`).
    SystemJournal,
}

/// A configured log source. Immutable after load.
///
/// `command` is split on whitespace into program and arguments — there is
/// no shell involved. Commands that need pipes or quoting are configured
/// as `sh -c '...'` explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceDescriptor {
    /// Unique, stable identifier. Used in URLs.
    pub id: String,
    /// Human-readable display name.
    pub name: String,
    /// Wire and config name is `type`, kept as `kind` in code to avoid
    /// clashing with the keyword.
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub command: String,
    #[serde(default = "default_working_dir")]
    pub working_dir: String,
    #[serde(default)]
    pub description: String,
    /// Start the backing process at boot instead of on first subscribe.
    #[serde(default)]
    pub eager: bool,
}

fn default_working_dir() -> String {
    "/".to_string()
}

/// Discovery view of a source, as returned by `GET /api/sources`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSummary {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub description: String,
}

/// Lookup table of configured sources. Built once from the config,
/// shared behind an `Arc`; concurrent lookups need no locking.
#[derive(Debug)]
pub struct SourceRegistry {
    sources: BTreeMap<String, SourceDescriptor>,
}

impl SourceRegistry {
    /// Build the registry from validated config. Duplicate ids have
    /// already been rejected by `AppConfig::validate`.
    pub fn new(sources: Vec<SourceDescriptor>) -> Self {
        let sources = sources
            .into_iter()
            .map(|descriptor| (descriptor.id.clone(), descriptor))
            .collect();
        Self { sources }
    }

    /// Resolve a source by id.
    pub fn lookup(&self, id: &str) -> Result<&SourceDescriptor, CoreError> {
        self.sources
            .get(id)
            .ok_or_else(|| CoreError::SourceNotFound(id.to_string()))
    }

    /// Discovery mapping of id to summary, in id order.
    pub fn list(&self) -> BTreeMap<String, SourceSummary> {
        self.sources
            .iter()
            .map(|(id, descriptor)| {
                (
                    id.clone(),
                    SourceSummary {
                        name: descriptor.name.clone(),
                        kind: descriptor.kind,
                        description: descriptor.description.clone(),
                    },
                )
            })
            .collect()
    }

    /// Iterate all descriptors (bootstrap uses this for eager starts).
    pub fn iter(&self) -> impl Iterator<Item = &SourceDescriptor> {
        self.sources.values()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(id: &str) -> SourceDescriptor {
        SourceDescriptor {
            id: id.to_string(),
            name: format!("Source {id}"),
            kind: SourceKind::FileTail,
            command: format!("tail -F /var/log/{id}.log"),
            working_dir: "/".to_string(),
            description: String::new(),
            eager: false,
        }
    }

    #[test]
    fn lookup_finds_configured_source() {
        let registry = SourceRegistry::new(vec![descriptor("a"), descriptor("b")]);
        assert_eq!(registry.lookup("a").unwrap().id, "a");
    }

    #[test]
    fn lookup_fails_for_unknown_id() {
        let registry = SourceRegistry::new(vec![descriptor("a")]);
        let err = registry.lookup("missing").unwrap_err();
        assert!(matches!(err, CoreError::SourceNotFound(id) if id == "missing"));
    }

    #[test]
    fn list_returns_summaries_in_id_order() {
        let registry = SourceRegistry::new(vec![descriptor("b"), descriptor("a")]);
        let listing = registry.list();
        let ids: Vec<&String> = listing.keys().collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(listing["a"].name, "Source a");
    }

    #[test]
    fn kind_serializes_kebab_case() {
        let json = serde_json::to_string(&SourceKind::ProcessGroupLogs).unwrap();
        assert_eq!(json, "\"process-group-logs\"");
        let json = serde_json::to_string(&SourceKind::SystemJournal).unwrap();
        assert_eq!(json, "\"system-journal\"");
    }

    #[test]
    fn summary_serializes_kind_as_type() {
        let registry = SourceRegistry::new(vec![descriptor("a")]);
        let json = serde_json::to_value(registry.list()).unwrap();
        assert_eq!(json["a"]["type"], "file-tail");
    }
}
