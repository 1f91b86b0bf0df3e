use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Metadata that may accompany an upload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_disposition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_metadata: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5_hash: Option<String>,
}

impl UploadMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_custom_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_metadata
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }
}

/// Partial metadata update.
///
/// Fields left as `None` are not touched. Custom metadata keys are merged one by one; mapping a
/// key to `None` serializes as JSON `null`, which removes that key from the object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettableMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_disposition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_metadata: Option<BTreeMap<String, Option<String>>>,
}

impl SettableMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn set_custom(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_metadata
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), Some(value.into()));
        self
    }

    pub fn remove_custom(mut self, key: impl Into<String>) -> Self {
        self.custom_metadata
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), None);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Full object metadata as reported by the backend.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub full_path: String,
    #[serde(default)]
    pub generation: String,
    #[serde(default)]
    pub metageneration: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub time_created: String,
    #[serde(default)]
    pub updated: String,
    #[serde(default)]
    pub md5_hash: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub cache_control: Option<String>,
    #[serde(default)]
    pub content_disposition: Option<String>,
    #[serde(default)]
    pub content_language: Option<String>,
    #[serde(default)]
    pub content_encoding: Option<String>,
    #[serde(default)]
    pub custom_metadata: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_tokens: Option<String>,
}

impl ObjectMetadata {
    /// Lenient conversion from a JSON payload; unknown or mistyped fields fall back to defaults.
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Applies `update` in place using the documented partial-update rules.
    pub fn apply_update(&mut self, update: &SettableMetadata) {
        fn assign(target: &mut Option<String>, value: &Option<String>) {
            if let Some(value) = value {
                *target = Some(value.clone());
            }
        }

        assign(&mut self.cache_control, &update.cache_control);
        assign(&mut self.content_disposition, &update.content_disposition);
        assign(&mut self.content_encoding, &update.content_encoding);
        assign(&mut self.content_language, &update.content_language);
        assign(&mut self.content_type, &update.content_type);

        if let Some(changes) = &update.custom_metadata {
            let custom = self.custom_metadata.get_or_insert_with(BTreeMap::new);
            for (key, value) in changes {
                match value {
                    Some(value) => {
                        custom.insert(key.clone(), value.clone());
                    }
                    None => {
                        custom.remove(key);
                    }
                }
            }
            if custom.is_empty() {
                self.custom_metadata = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn settable_metadata_serializes_removals_as_null() {
        let update = SettableMetadata::new()
            .with_content_type("image/png")
            .set_custom("owner", "ada")
            .remove_custom("draft");
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(
            value,
            json!({
                "contentType": "image/png",
                "customMetadata": {"draft": null, "owner": "ada"}
            })
        );
    }

    #[test]
    fn apply_update_merges_custom_metadata_and_keeps_untouched_fields() {
        let mut metadata = ObjectMetadata {
            content_type: Some("text/plain".into()),
            cache_control: Some("no-cache".into()),
            custom_metadata: Some(BTreeMap::from([
                ("draft".to_string(), "yes".to_string()),
                ("lang".to_string(), "en".to_string()),
            ])),
            ..Default::default()
        };

        metadata.apply_update(
            &SettableMetadata::new()
                .with_content_type("text/markdown")
                .set_custom("owner", "ada")
                .remove_custom("draft"),
        );

        assert_eq!(metadata.content_type.as_deref(), Some("text/markdown"));
        assert_eq!(metadata.cache_control.as_deref(), Some("no-cache"));
        let custom = metadata.custom_metadata.unwrap();
        assert_eq!(custom.get("lang").map(String::as_str), Some("en"));
        assert_eq!(custom.get("owner").map(String::as_str), Some("ada"));
        assert!(!custom.contains_key("draft"));
    }

    #[test]
    fn apply_update_drops_empty_custom_map() {
        let mut metadata = ObjectMetadata {
            custom_metadata: Some(BTreeMap::from([("k".to_string(), "v".to_string())])),
            ..Default::default()
        };
        metadata.apply_update(&SettableMetadata::new().remove_custom("k"));
        assert!(metadata.custom_metadata.is_none());
    }

    #[test]
    fn object_metadata_parses_camel_case_payload() {
        let metadata = ObjectMetadata::from_value(json!({
            "bucket": "b",
            "name": "cat.jpg",
            "fullPath": "photos/cat.jpg",
            "size": 42,
            "contentType": "image/jpeg"
        }));
        assert_eq!(metadata.full_path, "photos/cat.jpg");
        assert_eq!(metadata.size, 42);
        assert_eq!(metadata.content_type.as_deref(), Some("image/jpeg"));
        assert!(metadata.custom_metadata.is_none());
    }
}
