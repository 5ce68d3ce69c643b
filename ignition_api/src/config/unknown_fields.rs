//! Manual unknown-field rejection for `File`/`Directory`/`Link` (§4.1:
//! "unknown fields under a recognized object are fatal").
//!
//! Every other struct in [`super`] gets this for free via
//! `#[serde(deny_unknown_fields)]`. These three can't: they flatten [`Node`]
//! into themselves, and serde's flatten machinery buffers the whole
//! remaining JSON object for each flattened field to pick from, so a
//! `deny_unknown_fields` on either side would reject the other side's own
//! fields as unrecognized. This walks the raw JSON instead, before the typed
//! parse ever runs.

use serde_json::Value;

use crate::error::ConfigError;

const NODE_FIELDS: &[&str] = &["path", "user", "group", "overwrite"];
const FILE_EXTRA: &[&str] = &["mode", "contents", "append"];
const DIRECTORY_EXTRA: &[&str] = &["mode"];
const LINK_EXTRA: &[&str] = &["target", "hard"];

/// Checks `storage.files`/`storage.directories`/`storage.links` in `raw`
/// against their known key sets. A no-op for any array that's absent, empty,
/// or not shaped like an array of objects — the typed parse that follows
/// reports those shape errors on its own.
pub fn check(raw: &Value) -> Result<(), ConfigError> {
    check_array(raw, "/storage/files", FILE_EXTRA)?;
    check_array(raw, "/storage/directories", DIRECTORY_EXTRA)?;
    check_array(raw, "/storage/links", LINK_EXTRA)?;
    Ok(())
}

fn check_array(raw: &Value, pointer: &str, extra_allowed: &[&str]) -> Result<(), ConfigError> {
    let Some(items) = raw.pointer(pointer).and_then(Value::as_array) else {
        return Ok(());
    };

    for (i, item) in items.iter().enumerate() {
        let Some(object) = item.as_object() else { continue };
        for key in object.keys() {
            if !NODE_FIELDS.contains(&key.as_str()) && !extra_allowed.contains(&key.as_str()) {
                return Err(ConfigError::UnknownField {
                    pointer: format!("{pointer}/{i}"),
                    field: key.clone(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_file_fields() {
        let raw: Value = serde_json::from_str(
            r#"{"storage":{"files":[{"path":"/a","mode":420,"contents":{"source":"data:,hi"}}]}}"#,
        )
        .unwrap();
        assert!(check(&raw).is_ok());
    }

    #[test]
    fn rejects_unknown_file_field() {
        let raw: Value = serde_json::from_str(r#"{"storage":{"files":[{"path":"/a","modee":420}]}}"#).unwrap();
        let err = check(&raw).unwrap_err();
        match err {
            ConfigError::UnknownField { pointer, field } => {
                assert_eq!(pointer, "/storage/files/0");
                assert_eq!(field, "modee");
            }
            other => panic!("expected UnknownField, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_link_field_but_not_hard_or_target() {
        let raw: Value = serde_json::from_str(
            r#"{"storage":{"links":[{"path":"/a","target":"/b","hard":true}]}}"#,
        )
        .unwrap();
        assert!(check(&raw).is_ok());

        let raw: Value = serde_json::from_str(r#"{"storage":{"links":[{"path":"/a","bogus":1}]}}"#).unwrap();
        assert!(check(&raw).is_err());
    }
}
