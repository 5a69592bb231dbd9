// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Request and response payload types
//!
//! Request bodies are classified at send time without reading binary
//! content. Response payloads are only ever produced by an explicit body read.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Metadata of a binary blob or file part
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobInfo {
    pub size: u64,
    pub mime_type: Option<String>,
    pub name: Option<String>,
}

impl BlobInfo {
    pub fn new(size: u64) -> Self {
        Self {
            size,
            ..Default::default()
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// One field of a multipart form body
#[derive(Debug, Clone, PartialEq)]
pub struct FormPart {
    pub name: String,
    pub value: FormValue,
}

/// Form field value
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    Text(String),
    File(BlobInfo),
}

impl FormPart {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: FormValue::Text(value.into()),
        }
    }

    pub fn file(name: impl Into<String>, blob: BlobInfo) -> Self {
        Self {
            name: name.into(),
            value: FormValue::File(blob),
        }
    }
}

/// Body handed to the host's send primitive
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Text(String),
    UrlEncoded(String),
    Blob(BlobInfo),
    ArrayBuffer(Bytes),
    FormData(Vec<FormPart>),
}

/// Classified request body, as reported to the inspector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PostData {
    Text {
        data: String,
    },
    #[serde(rename_all = "camelCase")]
    Binary {
        size: u64,
        mime_type: Option<String>,
        name: Option<String>,
    },
    FormData {
        fields: Vec<PostField>,
    },
}

/// Classified form field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostField {
    pub name: String,
    pub value: PostData,
}

impl PostData {
    /// Classify a request body. Binary content is described, never read.
    pub fn classify(body: &RequestBody) -> Self {
        match body {
            RequestBody::Text(text) | RequestBody::UrlEncoded(text) => PostData::Text {
                data: text.clone(),
            },
            RequestBody::Blob(blob) => PostData::from_blob(blob),
            RequestBody::ArrayBuffer(bytes) => PostData::Binary {
                size: bytes.len() as u64,
                mime_type: None,
                name: None,
            },
            RequestBody::FormData(parts) => PostData::FormData {
                fields: parts
                    .iter()
                    .map(|part| PostField {
                        name: part.name.clone(),
                        value: match &part.value {
                            FormValue::Text(text) => PostData::Text { data: text.clone() },
                            FormValue::File(blob) => PostData::from_blob(blob),
                        },
                    })
                    .collect(),
            },
        }
    }

    fn from_blob(blob: &BlobInfo) -> Self {
        PostData::Binary {
            size: blob.size,
            mime_type: blob.mime_type.clone(),
            name: blob.name.clone(),
        }
    }
}

/// Content type implied by a body when the request sets none
pub fn infer_content_type(body: &RequestBody) -> String {
    match body {
        RequestBody::Text(text) => {
            let trimmed = text.trim_start();
            let looks_json = trimmed.starts_with('{') || trimmed.starts_with('[');
            if looks_json && serde_json::from_str::<serde_json::Value>(text).is_ok() {
                "application/json".to_string()
            } else {
                "text/plain;charset=UTF-8".to_string()
            }
        }
        RequestBody::UrlEncoded(_) => "application/x-www-form-urlencoded;charset=UTF-8".to_string(),
        RequestBody::Blob(blob) => blob
            .mime_type
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "application/octet-stream".to_string()),
        RequestBody::ArrayBuffer(_) => "application/octet-stream".to_string(),
        RequestBody::FormData(_) => "multipart/form-data".to_string(),
    }
}

/// Response content as read back from a native handle
#[derive(Debug, Clone, PartialEq)]
pub enum BodyContent {
    Text(String),
    Bytes(Bytes),
    Json(serde_json::Value),
}

/// A response body ready for the inspector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedBody {
    pub body: String,
    pub base64_encoded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_text() {
        let data = PostData::classify(&RequestBody::Text("{\"a\":1}".into()));
        assert_eq!(
            data,
            PostData::Text {
                data: "{\"a\":1}".into()
            }
        );
    }

    #[test]
    fn test_classify_binary_is_metadata_only() {
        let blob = BlobInfo::new(2048)
            .with_mime_type("image/png")
            .with_name("avatar.png");
        let data = PostData::classify(&RequestBody::Blob(blob));

        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["type"], "binary");
        assert_eq!(json["size"], 2048);
        assert_eq!(json["mimeType"], "image/png");
        assert_eq!(json["name"], "avatar.png");
    }

    #[test]
    fn test_classify_form_data_recurses() {
        let body = RequestBody::FormData(vec![
            FormPart::text("title", "holiday"),
            FormPart::file("photo", BlobInfo::new(10).with_mime_type("image/jpeg")),
        ]);

        let PostData::FormData { fields } = PostData::classify(&body) else {
            panic!("expected form data");
        };
        assert_eq!(fields.len(), 2);
        assert!(matches!(fields[0].value, PostData::Text { .. }));
        assert!(matches!(fields[1].value, PostData::Binary { size: 10, .. }));
    }

    #[test]
    fn test_infer_content_type() {
        assert_eq!(
            infer_content_type(&RequestBody::Text("[1,2]".into())),
            "application/json"
        );
        assert_eq!(
            infer_content_type(&RequestBody::Text("{not json".into())),
            "text/plain;charset=UTF-8"
        );
        assert_eq!(
            infer_content_type(&RequestBody::FormData(vec![])),
            "multipart/form-data"
        );
        assert_eq!(
            infer_content_type(&RequestBody::Blob(BlobInfo::new(1))),
            "application/octet-stream"
        );
    }
}
