use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Image-edit models the upstream API accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageModel {
    #[serde(rename = "gpt-image-1")]
    GptImage1,
    #[serde(rename = "flux-kontext-pro")]
    FluxKontextPro,
    #[serde(rename = "flux-kontext-max")]
    FluxKontextMax,
}

impl ImageModel {
    pub const ALL: [Self; 3] = [Self::GptImage1, Self::FluxKontextPro, Self::FluxKontextMax];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GptImage1 => "gpt-image-1",
            Self::FluxKontextPro => "flux-kontext-pro",
            Self::FluxKontextMax => "flux-kontext-max",
        }
    }

    /// Comma-separated list used in validation messages
    #[must_use]
    pub fn supported_list() -> String {
        Self::ALL
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl FromStr for ImageModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "Unsupported model. Supported models: {}",
                    Self::supported_list()
                )
            })
    }
}

impl std::fmt::Display for ImageModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An upload spooled to the upload directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Form field the file arrived in (`image` or `mask`)
    pub field: String,
    pub path: PathBuf,
    pub original_name: String,
    pub content_type: String,
    pub size: u64,
}

/// One edit call forwarded to the upstream API
#[derive(Debug, Clone)]
pub struct ImageEditRequest {
    pub image: UploadedFile,
    pub prompt: String,
    pub model: ImageModel,
    pub mask: Option<UploadedFile>,
    pub n: Option<u32>,
    pub quality: Option<String>,
    pub size: Option<String>,
}
