use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use percent_encoding::percent_decode_str;

use crate::storage::error::{expected_argument, invalid_format, StorageError, StorageResult};

/// Encodings accepted by `upload_string`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StringFormat {
    /// UTF-8 text.
    #[default]
    Raw,
    /// Standard base64.
    Base64,
    /// URL-safe base64, padding optional.
    Base64Url,
    /// A `data:` URL, e.g. `data:image/png;base64,...`.
    DataUrl,
}

impl StringFormat {
    pub const ALL: [StringFormat; 4] = [
        StringFormat::Raw,
        StringFormat::Base64,
        StringFormat::Base64Url,
        StringFormat::DataUrl,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StringFormat::Raw => "raw",
            StringFormat::Base64 => "base64",
            StringFormat::Base64Url => "base64url",
            StringFormat::DataUrl => "data_url",
        }
    }
}

impl fmt::Display for StringFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StringFormat {
    type Err = StorageError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        StringFormat::ALL
            .into_iter()
            .find(|format| format.as_str() == value)
            .ok_or_else(|| expected_argument("format", "a StringFormat value"))
    }
}

/// Bytes and inferred content type produced from a string upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedString {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

pub fn prepare_string_upload(value: &str, format: StringFormat) -> StorageResult<PreparedString> {
    let (bytes, content_type) = match format {
        StringFormat::Raw => (value.as_bytes().to_vec(), None),
        StringFormat::Base64 => (decode_base64(value, format)?, None),
        StringFormat::Base64Url => {
            let bytes = URL_SAFE_NO_PAD
                .decode(value.trim_end_matches('='))
                .map_err(|err| invalid_format(format.as_str(), err.to_string()))?;
            (bytes, None)
        }
        StringFormat::DataUrl => decode_data_url(value)?,
    };
    Ok(PreparedString { bytes, content_type })
}

fn decode_base64(value: &str, format: StringFormat) -> StorageResult<Vec<u8>> {
    STANDARD
        .decode(value)
        .map_err(|err| invalid_format(format.as_str(), err.to_string()))
}

fn decode_data_url(value: &str) -> StorageResult<(Vec<u8>, Option<String>)> {
    let format = StringFormat::DataUrl.as_str();
    let rest = value
        .strip_prefix("data:")
        .ok_or_else(|| invalid_format(format, "Must be formatted 'data:[<mediatype>][;base64],<data>'"))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| invalid_format(format, "Must be formatted 'data:[<mediatype>][;base64],<data>'"))?;

    let (media_type, is_base64) = match header.strip_suffix(";base64") {
        Some(media_type) => (media_type, true),
        None => (header, false),
    };
    let media_type = media_type.trim();
    let content_type = (!media_type.is_empty()).then(|| media_type.to_string());

    let bytes = if is_base64 {
        decode_base64(payload, StringFormat::DataUrl)?
    } else {
        percent_decode_str(payload)
            .decode_utf8()
            .map_err(|_| invalid_format(format, "Malformed percent-encoded data"))?
            .into_owned()
            .into_bytes()
    };
    Ok((bytes, content_type))
}
