use crate::task::TaskKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JSON shape carried by a toolbar drag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ToolItem {
    fn new(kind: &str, description: &str) -> Self {
        Self {
            id: kind.to_string(),
            kind: kind.to_string(),
            content: kind.to_string(),
            description: Some(description.to_string()),
        }
    }

    pub fn to_json(&self) -> Result<String, PayloadError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("malformed drop payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unsupported task type `{0}`")]
    UnknownKind(String),
}

pub fn tool_catalogue() -> Vec<ToolItem> {
    vec![
        ToolItem::new("move", "Move forward"),
        ToolItem::new("turn", "Turn direction"),
        ToolItem::new("goto", "Go to position"),
        ToolItem::new("say", "Say something"),
        ToolItem::new("think", "Think thought"),
    ]
}

/// Turns a drag payload into a task kind carrying the tool's default parameters.
pub fn parse_drop_payload(json: &str) -> Result<TaskKind, PayloadError> {
    let item: ToolItem = serde_json::from_str(json)?;
    TaskKind::with_defaults(&item.kind).ok_or(PayloadError::UnknownKind(item.kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_items_parse_back_into_their_kinds() {
        let names: Vec<&str> = tool_catalogue()
            .iter()
            .map(|item| {
                let json = item.to_json().unwrap();
                parse_drop_payload(&json).unwrap().name()
            })
            .collect();
        assert_eq!(names, vec!["move", "turn", "goto", "say", "think"]);
    }

    #[test]
    fn accepts_payload_without_description() {
        let kind =
            parse_drop_payload(r#"{"id":"turn","type":"turn","content":"turn"}"#).unwrap();
        assert_eq!(kind, TaskKind::Turn { degrees: 90.0 });
    }

    #[test]
    fn rejects_malformed_json() {
        let err = parse_drop_payload("{\"id\": ").unwrap_err();
        assert!(matches!(err, PayloadError::Malformed(_)));
    }

    #[test]
    fn rejects_unknown_tool() {
        let err =
            parse_drop_payload(r#"{"id":"jump","type":"jump","content":"jump"}"#).unwrap_err();
        assert!(matches!(err, PayloadError::UnknownKind(kind) if kind == "jump"));
    }
}
