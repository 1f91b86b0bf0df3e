use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use url::Url;

use crate::storage::constants::{CLOUD_STORAGE_HOSTS, DEFAULT_HOST};
use crate::storage::error::{invalid_default_bucket, invalid_url, StorageResult};
use crate::storage::path::canonicalize;

/// A bucket plus a decoded, canonical object path. The empty path is the bucket root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    bucket: String,
    path: String,
}

impl Location {
    pub fn new(bucket: impl Into<String>, path: impl AsRef<str>) -> Self {
        Self {
            bucket: bucket.into(),
            path: canonicalize(path.as_ref()),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Wire form of the object address: `/b/<bucket>/o/<encoded path>`.
    pub fn full_server_url(&self) -> String {
        format!(
            "/b/{}/o/{}",
            utf8_percent_encode(&self.bucket, NON_ALPHANUMERIC),
            utf8_percent_encode(&self.path, NON_ALPHANUMERIC)
        )
    }

    pub fn bucket_only_server_url(&self) -> String {
        format!("/b/{}/o", utf8_percent_encode(&self.bucket, NON_ALPHANUMERIC))
    }

    /// Parses a default bucket given as `gs://bucket`, a bucket root URL or a bare bucket name.
    pub fn from_bucket_spec(bucket_spec: &str, host: &str) -> StorageResult<Self> {
        if let Some(rest) = bucket_spec.strip_prefix("gs://") {
            let rest = rest.trim_end_matches('/');
            return match rest.split_once('/') {
                None if !rest.is_empty() => Ok(Self::new(rest, "")),
                _ => Err(invalid_default_bucket(bucket_spec)),
            };
        }

        if is_http_url(bucket_spec) {
            return match Self::parse_http_url(bucket_spec, host) {
                Ok(location) if location.is_root() => Ok(location),
                _ => Err(invalid_default_bucket(bucket_spec)),
            };
        }

        if bucket_spec.is_empty() || bucket_spec.contains('/') {
            return Err(invalid_default_bucket(bucket_spec));
        }
        Ok(Self::new(bucket_spec, ""))
    }

    /// Parses `gs://<bucket>/<path>`; both bucket and path must be present.
    pub fn parse_gs_url(url: &str) -> StorageResult<Self> {
        let rest = url.strip_prefix("gs://").ok_or_else(|| invalid_url(url))?;
        let (bucket, path) = rest.split_once('/').ok_or_else(|| invalid_url(url))?;
        let location = Self::new(bucket, path);
        if location.bucket.is_empty() || location.is_root() {
            return Err(invalid_url(url));
        }
        Ok(location)
    }

    /// Parses a download URL on the Firebase host (`/[v0/]b/<bucket>/o/<path>`), the configured
    /// emulator host, or a Cloud Storage host (`/<bucket>/<path>`). Query strings are ignored.
    pub fn parse_http_url(url: &str, configured_host: &str) -> StorageResult<Self> {
        let parsed = Url::parse(url).map_err(|_| invalid_url(url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid_url(url));
        }
        let host = parsed.host_str().ok_or_else(|| invalid_url(url))?;
        let authority = match parsed.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        let mut segments: Vec<&str> = parsed.path_segments().ok_or_else(|| invalid_url(url))?.collect();
        if segments.last().is_some_and(|segment| segment.is_empty()) {
            segments.pop();
        }

        let is_firebase_host =
            authority.eq_ignore_ascii_case(configured_host) || authority.eq_ignore_ascii_case(DEFAULT_HOST);
        let (bucket, path_segments) = if is_firebase_host {
            if segments.first().is_some_and(|segment| is_version_segment(segment)) {
                segments.remove(0);
            }
            match segments.as_slice() {
                ["b", bucket, "o", path @ ..] => (*bucket, path),
                ["b", bucket] | ["b", bucket, "o"] => (*bucket, &[][..]),
                _ => return Err(invalid_url(url)),
            }
        } else if CLOUD_STORAGE_HOSTS.iter().any(|known| host.eq_ignore_ascii_case(known)) {
            match segments.as_slice() {
                [bucket, path @ ..] => (*bucket, path),
                [] => return Err(invalid_url(url)),
            }
        } else {
            return Err(invalid_url(url));
        };

        let bucket = decode_segment(bucket).ok_or_else(|| invalid_url(url))?;
        if bucket.is_empty() {
            return Err(invalid_url(url));
        }
        let path = path_segments
            .iter()
            .map(|segment| decode_segment(segment))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| invalid_url(url))?
            .join("/");
        Ok(Self::new(bucket, path))
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gs://{}/{}", self.bucket, self.path)
    }
}

pub fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Any input starting with `http` is treated as a download URL attempt, so a truncated scheme is
/// reported as a bad URL rather than resolved as a relative path.
pub fn looks_like_http_url(value: &str) -> bool {
    value.starts_with("http")
}

pub fn is_gs_url(value: &str) -> bool {
    value.starts_with("gs://")
}

fn is_version_segment(segment: &str) -> bool {
    segment.len() > 1 && segment.starts_with('v') && segment[1..].chars().all(|ch| ch.is_ascii_digit())
}

fn decode_segment(segment: &str) -> Option<String> {
    percent_decode_str(segment)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}
