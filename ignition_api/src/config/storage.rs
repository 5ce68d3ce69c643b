use serde::{Deserialize, Serialize};
use url::Url;

use crate::primitives::Hash;

/// A fetchable blob: file contents, a CA bundle, or a config to merge in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Resource {
    pub source: Url,
    pub compression: Option<Compression>,
    pub verification: Option<Verification>,
    #[serde(default)]
    pub http_headers: Vec<HttpHeader>,
    /// Whether a fetch failure for this resource (currently: an HTTP 404) is
    /// tolerated instead of fatal (§4.3). Only consulted by callers that fetch
    /// `ignition.config.append` entries; every other fetch treats this as if
    /// it were always `false`.
    pub optional: Option<bool>,
}

impl Resource {
    pub fn optional(&self) -> bool {
        self.optional.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    Gzip,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Verification {
    pub hash: Option<Hash>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpHeader {
    pub name: String,
    pub value: String,
}

/// Fields shared by `File`, `Directory`, and `Link`.
///
/// Never gets `deny_unknown_fields`: it's always used as a `#[serde(flatten)]`
/// target, and flatten buffers the *whole* remaining object for each
/// flattened field to pick from — a `deny_unknown_fields` here would reject
/// the host struct's own fields (e.g. `File::mode`) as unrecognized. Unknown
/// fields on `File`/`Directory`/`Link` are instead caught by
/// `unknown_fields::check` against the raw JSON before typed parsing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Node {
    pub path: String,
    pub user: NodeUser,
    pub group: NodeGroup,
    pub overwrite: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct NodeUser {
    pub id: Option<u32>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct NodeGroup {
    pub id: Option<u32>,
    pub name: Option<String>,
}

// No `deny_unknown_fields` on File/Directory/Link themselves either: serde
// doesn't support combining it with a flattened field. `unknown_fields::check`
// covers these three against the raw JSON instead.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    #[serde(flatten)]
    pub node: Node,
    pub mode: Option<u32>,
    pub contents: Option<Resource>,
    #[serde(default)]
    pub append: Vec<Resource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Directory {
    #[serde(flatten)]
    pub node: Node,
    pub mode: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    #[serde(flatten)]
    pub node: Node,
    pub target: String,
    #[serde(default)]
    pub hard: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Disk {
    pub device: String,
    #[serde(default)]
    pub wipe_table: bool,
    #[serde(default)]
    pub partitions: Vec<Partition>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Partition {
    pub number: u32,
    pub label: Option<String>,
    pub type_guid: Option<String>,
    pub guid: Option<String>,
    pub start_mi_b: u64,
    pub size_mi_b: u64,
    pub wipe_partition_entry: bool,
    pub should_exist: Option<bool>,
    pub resize: bool,
}

impl Partition {
    pub fn should_exist(&self) -> bool {
        self.should_exist.unwrap_or(true)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Raid {
    pub name: String,
    pub level: sysdefs::raid::RaidLevel,
    pub devices: Vec<String>,
    #[serde(default)]
    pub spares: u32,
    #[serde(default)]
    pub wipe_volume: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Luks {
    pub name: String,
    pub device: String,
    pub label: Option<String>,
    pub uuid: Option<String>,
    pub cipher: Option<String>,
    pub key_file: Option<Resource>,
    pub clevis: Option<Clevis>,
    #[serde(default)]
    pub wipe_volume: bool,
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Clevis {
    pub tpm2: bool,
    pub tang: Vec<ClevisTang>,
    pub threshold: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClevisTang {
    pub url: Url,
    pub thumbprint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Filesystem {
    pub device: String,
    pub format: sysdefs::filesystems::FilesystemFormat,
    pub label: Option<String>,
    pub uuid: Option<String>,
    /// Mount point, relative to the stage root. `None` means this filesystem
    /// is formatted/probed but never mounted (e.g. `swap`).
    pub path: Option<String>,
    #[serde(default)]
    pub wipe_filesystem: bool,
    #[serde(default)]
    pub mount_options: Vec<String>,
    #[serde(default)]
    pub options: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_should_exist_defaults_true() {
        let partition = Partition::default();
        assert!(partition.should_exist());
    }

    #[test]
    fn file_deserializes_flattened_node_fields() {
        let json = r#"{"path":"/foo/bar","mode":420,"contents":{"source":"data:,hi"}}"#;
        let file: File = serde_json::from_str(json).unwrap();
        assert_eq!(file.node.path, "/foo/bar");
        assert_eq!(file.mode, Some(420));
        assert!(file.contents.is_some());
    }
}
