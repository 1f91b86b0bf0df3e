use serde_json::Value;

use crate::storage::constants::MAX_LIST_RESULTS;
use crate::storage::error::{expected_argument, StorageResult};
use crate::storage::reference::StorageReference;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Page size, 1 to 1000. The backend picks its own default when unset.
    pub max_results: Option<u32>,
    /// Continuation token returned as [`ListResult::next_page_token`].
    pub page_token: Option<String>,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn with_page_token(mut self, page_token: impl Into<String>) -> Self {
        self.page_token = Some(page_token.into());
        self
    }

    /// Reads `{"maxResults": number, "pageToken": string}` from loosely typed JSON (for example
    /// options forwarded from a scripting layer). `null` and missing keys mean unset.
    pub fn from_json(value: &Value) -> StorageResult<Self> {
        let mut options = ListOptions::default();

        match value.get("maxResults") {
            None | Some(Value::Null) => {}
            Some(Value::Number(number)) => {
                let max = number
                    .as_u64()
                    .and_then(|max| u32::try_from(max).ok())
                    .ok_or_else(|| expected_argument("options.maxResults", "a number value between 1 and 1000"))?;
                options.max_results = Some(max);
            }
            Some(_) => return Err(expected_argument("options.maxResults", "a number value")),
        }

        match value.get("pageToken") {
            None | Some(Value::Null) => {}
            Some(Value::String(token)) => options.page_token = Some(token.clone()),
            Some(_) => return Err(expected_argument("options.pageToken", "a string value")),
        }

        Ok(options)
    }

    /// Range checks applied before a list call is forwarded.
    pub fn validate(&self) -> StorageResult<()> {
        if let Some(max) = self.max_results {
            if max == 0 || max > MAX_LIST_RESULTS {
                return Err(expected_argument("options.maxResults", "a number value between 1 and 1000"));
            }
        }
        if self.page_token.as_deref().is_some_and(str::is_empty) {
            return Err(expected_argument("options.pageToken", "a non-empty string value"));
        }
        Ok(())
    }
}

/// One page of a listing: sub-folders (`prefixes`) and objects (`items`).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListResult {
    pub prefixes: Vec<StorageReference>,
    pub items: Vec<StorageReference>,
    pub next_page_token: Option<String>,
}

impl ListResult {
    /// Appends another page, taking over its continuation token.
    pub fn merge(&mut self, page: ListResult) {
        self.prefixes.extend(page.prefixes);
        self.items.extend(page.items);
        self.next_page_token = page.next_page_token;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_json_reads_known_keys() {
        let options = ListOptions::from_json(&json!({"maxResults": 10, "pageToken": "abc"})).unwrap();
        assert_eq!(options, ListOptions::new().with_max_results(10).with_page_token("abc"));
        assert_eq!(ListOptions::from_json(&json!({})).unwrap(), ListOptions::default());
        assert_eq!(
            ListOptions::from_json(&json!({"maxResults": null})).unwrap(),
            ListOptions::default()
        );
    }

    #[test]
    fn from_json_rejects_mistyped_values() {
        let err = ListOptions::from_json(&json!({"maxResults": "foo"})).unwrap_err();
        assert_eq!(err.message(), "Invalid argument 'options.maxResults'. Expected a number value.");

        let err = ListOptions::from_json(&json!({"pageToken": 0})).unwrap_err();
        assert_eq!(err.message(), "Invalid argument 'options.pageToken'. Expected a string value.");

        let err = ListOptions::from_json(&json!({"maxResults": -3})).unwrap_err();
        assert_eq!(err.argument(), Some("options.maxResults"));
    }

    #[test]
    fn validate_enforces_ranges() {
        assert!(ListOptions::new().with_max_results(1000).validate().is_ok());
        assert!(ListOptions::new().with_max_results(0).validate().is_err());
        assert!(ListOptions::new().with_max_results(1001).validate().is_err());
        let err = ListOptions::new().with_page_token("").validate().unwrap_err();
        assert_eq!(err.argument(), Some("options.pageToken"));
    }
}
