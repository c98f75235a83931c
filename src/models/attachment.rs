use serde::{Deserialize, Serialize};

/// A caller-supplied file to be folded into the message sent to the model.
///
/// `content` is base64, optionally carrying a `data:` URL prefix exactly as
/// browsers produce it. The declared media type drives normalization; the
/// payload itself is never sniffed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAttachment {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "type")]
    pub media_type: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<i64>,
}

impl FileAttachment {
    pub fn new<N, M, C>(name: N, media_type: M, content: C) -> Self
    where
        N: Into<String>,
        M: Into<String>,
        C: Into<String>,
    {
        let content = content.into();
        Self {
            name: name.into(),
            size: content.len() as u64,
            media_type: media_type.into(),
            content,
            last_modified: None,
        }
    }
}
