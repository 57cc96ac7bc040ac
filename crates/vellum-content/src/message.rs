use serde::{Deserialize, Serialize};

use crate::{ActionRow, Embed};

/// Full content of a remote message as sent, edited, or fetched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ActionRow>,
    /// Only visible to the user who triggered the interaction.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ephemeral: bool,
}

impl MessageContent {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    /// Text body with surrounding whitespace removed; an absent body reads as empty.
    pub fn body(&self) -> &str {
        self.content.as_deref().map(str::trim).unwrap_or("")
    }

    /// Iterate every component in row-major order.
    pub fn components_flat(&self) -> impl Iterator<Item = &crate::Component> {
        self.components.iter().flat_map(|row| row.components.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ButtonStyle, Component};

    #[test]
    fn body_trims_and_defaults_to_empty() {
        assert_eq!(MessageContent::default().body(), "");
        assert_eq!(MessageContent::text("  hi \n").body(), "hi");
    }

    #[test]
    fn serializes_without_empty_collections() {
        let json = serde_json::to_value(MessageContent::text("hello")).expect("serialize");
        assert_eq!(json, serde_json::json!({ "content": "hello" }));
    }

    #[test]
    fn components_flat_walks_rows_in_order() {
        let message = MessageContent {
            components: vec![
                ActionRow::new(vec![
                    Component::button("a", "A", ButtonStyle::Primary),
                    Component::button("b", "B", ButtonStyle::Secondary),
                ]),
                ActionRow::new(vec![Component::button("c", "C", ButtonStyle::Danger)]),
            ],
            ..Default::default()
        };

        let ids: Vec<_> = message
            .components_flat()
            .filter_map(Component::custom_id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
