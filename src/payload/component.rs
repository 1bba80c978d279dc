//! JSON chat components.
//!
//! A chat payload is either a component object, a bare JSON string, or an
//! array whose first element is the parent and the rest are its `extra`
//! children.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::{PayloadError, PayloadFormat};

/// Action run when a component is clicked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "value", rename_all = "snake_case")]
pub enum ClickEvent {
    OpenUrl(String),
    OpenFile(String),
    RunCommand(String),
    SuggestCommand(String),
    ChangePage(String),
    CopyToClipboard(String),
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// One styled text component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextComponent {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insertion: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub underlined: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub strikethrough: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub obfuscated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub click_event: Option<ClickEvent>,
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "extra_components"
    )]
    pub extra: Vec<TextComponent>,
}

impl TextComponent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    pub fn italic(mut self, italic: bool) -> Self {
        self.italic = italic;
        self
    }

    pub fn click(mut self, event: ClickEvent) -> Self {
        self.click_event = Some(event);
        self
    }

    pub fn with_extra(mut self, child: TextComponent) -> Self {
        self.extra.push(child);
        self
    }

    /// Parent followed by its direct `extra` children, each without children.
    pub fn flatten(&self) -> Vec<TextComponent> {
        let mut out = Vec::with_capacity(1 + self.extra.len());
        let mut parent = self.clone();
        let children = std::mem::take(&mut parent.extra);
        out.push(parent);
        out.extend(children);
        out
    }

    /// Concatenated text of this component and all descendants.
    pub fn plain_text(&self) -> String {
        let mut out = self.text.clone();
        for child in &self.extra {
            out.push_str(&child.plain_text());
        }
        out
    }
}

fn component_from_value(value: Value) -> Result<TextComponent, PayloadError> {
    match value {
        Value::String(text) => Ok(TextComponent::text(text)),
        Value::Object(_) => {
            serde_json::from_value(value).map_err(|e| PayloadError(e.to_string()))
        }
        Value::Array(items) => {
            let mut items = items.into_iter();
            let mut parent = match items.next() {
                Some(first) => component_from_value(first)?,
                None => return Err(PayloadError("empty component array".to_string())),
            };
            for item in items {
                parent.extra.push(component_from_value(item)?);
            }
            Ok(parent)
        }
        other => Err(PayloadError(format!("unexpected component value: {other}"))),
    }
}

/// `extra` entries may be objects, bare strings or nested arrays.
fn extra_components<'de, D>(deserializer: D) -> Result<Vec<TextComponent>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<Value>::deserialize(deserializer)?
        .into_iter()
        .map(|item| component_from_value(item).map_err(serde::de::Error::custom))
        .collect()
}

/// JSON chat component format.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonChat;

impl PayloadFormat for JsonChat {
    type Structured = TextComponent;

    fn parse(&self, raw: &str) -> Result<TextComponent, PayloadError> {
        let value: Value = serde_json::from_str(raw).map_err(|e| PayloadError(e.to_string()))?;
        component_from_value(value)
    }

    fn build(&self, structured: &TextComponent) -> Result<String, PayloadError> {
        serde_json::to_string(structured).map_err(|e| PayloadError(e.to_string()))
    }
}
