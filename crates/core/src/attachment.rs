use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use serde::{Deserialize, Serialize};

use crate::error::RequestError;

const BASE64_SUFFIX: &str = ";base64";
const JSON_MIME: &str = "application/json";

/// How the attachment data was encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentEncoding {
    Base64,
    Utf8,
}

/// The exported data carried by a request.
///
/// `data_buffer` is only populated when the declared mime type and the data
/// decoded cleanly. `data_json` is additionally populated when the mime type
/// is exactly `application/json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Attachment {
    pub mime: Option<String>,
    pub file_extension: Option<String>,
    pub encoding: Option<AttachmentEncoding>,
    #[serde(default, with = "base64_bytes")]
    pub data_buffer: Option<Vec<u8>>,
    pub data_json: Option<serde_json::Value>,
}

impl Attachment {
    /// Build an attachment from the wire fields, decoding `data` according
    /// to the declared mime type.
    pub fn decode(
        mime: Option<String>,
        extension: Option<String>,
        data: Option<&str>,
    ) -> Result<Self, RequestError> {
        let mut attachment = Self {
            mime,
            file_extension: extension,
            ..Self::default()
        };

        let (Some(mime), Some(data)) = (attachment.mime.as_deref(), data) else {
            return Ok(attachment);
        };
        if data.is_empty() {
            return Ok(attachment);
        }

        if mime.ends_with(BASE64_SUFFIX) {
            let bytes = B64
                .decode(data)
                .map_err(|e| RequestError::InvalidAttachment(format!("invalid base64: {e}")))?;
            attachment.encoding = Some(AttachmentEncoding::Base64);
            attachment.data_buffer = Some(bytes);
        } else {
            attachment.encoding = Some(AttachmentEncoding::Utf8);
            attachment.data_buffer = Some(data.as_bytes().to_vec());
        }

        if mime == JSON_MIME {
            let parsed = serde_json::from_str(data).map_err(RequestError::AttachmentJson)?;
            attachment.data_json = Some(parsed);
        }

        Ok(attachment)
    }

    /// The decoded data as text, replacing invalid UTF-8 sequences.
    pub fn data_text(&self) -> Option<String> {
        self.data_buffer
            .as_deref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }
}

/// Carries the raw buffer as base64 text across the worker boundary.
mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD as B64;
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => s.serialize_some(&B64.encode(bytes)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        raw.map(|s| B64.decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
