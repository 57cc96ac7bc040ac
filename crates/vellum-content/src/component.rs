use serde::{Deserialize, Serialize};

/// One horizontal row of interactive components.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRow {
    pub components: Vec<Component>,
}

impl ActionRow {
    pub fn new(components: Vec<Component>) -> Self {
        Self { components }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Secondary,
    Success,
    Danger,
    Link,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub default: bool,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            description: None,
            default: false,
        }
    }
}

/// Interactive control as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Component {
    Button {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        custom_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        label: String,
        style: ButtonStyle,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        emoji: Option<String>,
        #[serde(default)]
        disabled: bool,
    },
    StringSelect {
        custom_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        placeholder: Option<String>,
        options: Vec<SelectOption>,
        min_values: u8,
        max_values: u8,
        #[serde(default)]
        disabled: bool,
    },
}

/// Structural kind of a component, ignoring labels and ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Button,
    LinkButton,
    StringSelect,
}

impl Component {
    pub fn button(custom_id: impl Into<String>, label: impl Into<String>, style: ButtonStyle) -> Self {
        Self::Button {
            custom_id: Some(custom_id.into()),
            url: None,
            label: label.into(),
            style,
            emoji: None,
            disabled: false,
        }
    }

    pub fn link(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Button {
            custom_id: None,
            url: Some(url.into()),
            label: label.into(),
            style: ButtonStyle::Link,
            emoji: None,
            disabled: false,
        }
    }

    pub fn kind(&self) -> ComponentKind {
        match self {
            Component::Button { url: Some(_), .. } => ComponentKind::LinkButton,
            Component::Button { .. } => ComponentKind::Button,
            Component::StringSelect { .. } => ComponentKind::StringSelect,
        }
    }

    pub fn custom_id(&self) -> Option<&str> {
        match self {
            Component::Button { custom_id, .. } => custom_id.as_deref(),
            Component::StringSelect { custom_id, .. } => Some(custom_id.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_buttons_have_their_own_kind() {
        assert_eq!(Component::link("Docs", "https://example.com").kind(), ComponentKind::LinkButton);
        assert_eq!(
            Component::button("0:0", "Go", ButtonStyle::Primary).kind(),
            ComponentKind::Button
        );
    }

    #[test]
    fn component_json_is_tagged_by_type() {
        let json = serde_json::to_value(Component::button("0:1", "Next", ButtonStyle::Secondary))
            .expect("serialize");
        assert_eq!(json["type"], "button");
        assert_eq!(json["custom_id"], "0:1");
        assert_eq!(json["style"], "secondary");
    }
}
