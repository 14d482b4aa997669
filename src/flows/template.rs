use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::genai::PromptPart;
use crate::images::{MealPhoto, PhotoError};

lazy_static! {
    static ref PLACEHOLDER_RE: Regex =
        Regex::new(r"\{\{\s*(media\s+url=)?([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").unwrap();
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("missing value for placeholder '{0}'")]
    MissingValue(String),
    #[error("placeholder '{name}': {source}")]
    Media { name: String, source: PhotoError },
}

/// A prompt with `{{field}}` text placeholders and `{{media url=field}}`
/// inline-media placeholders.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    source: String,
}

impl PromptTemplate {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn placeholders(&self) -> Vec<&str> {
        PLACEHOLDER_RE
            .captures_iter(&self.source)
            .filter_map(|c| c.get(2).map(|m| m.as_str()))
            .collect()
    }

    pub fn render(&self, input: &Value) -> Result<Vec<PromptPart>, RenderError> {
        let mut parts = Vec::new();
        let mut text = String::new();
        let mut last = 0;

        for caps in PLACEHOLDER_RE.captures_iter(&self.source) {
            let Some(whole) = caps.get(0) else { continue };
            text.push_str(&self.source[last..whole.start()]);
            last = whole.end();

            let name = &caps[2];
            let value = match input.get(name) {
                None | Some(Value::Null) => return Err(RenderError::MissingValue(name.into())),
                Some(v) => v,
            };

            if caps.get(1).is_some() {
                let uri = value.as_str().unwrap_or_default();
                let photo = MealPhoto::from_data_uri(uri).map_err(|source| RenderError::Media {
                    name: name.into(),
                    source,
                })?;
                if !text.is_empty() {
                    parts.push(PromptPart::Text(std::mem::take(&mut text)));
                }
                parts.push(PromptPart::Media {
                    mime_type: photo.mime_type,
                    data: photo.data,
                });
            } else {
                match value {
                    Value::String(s) => text.push_str(s),
                    other => text.push_str(&other.to_string()),
                }
            }
        }

        text.push_str(&self.source[last..]);
        if !text.is_empty() {
            parts.push(PromptPart::Text(text));
        }
        Ok(parts)
    }
}
