//! Typed command options.

use serde::{Deserialize, Serialize};

use super::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    String,
    Integer,
    Number,
    Boolean,
    User,
    Channel,
    Role,
    Mentionable,
    Attachment,
}

impl OptionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OptionKind::String => "string",
            OptionKind::Integer => "integer",
            OptionKind::Number => "number",
            OptionKind::Boolean => "boolean",
            OptionKind::User => "user",
            OptionKind::Channel => "channel",
            OptionKind::Role => "role",
            OptionKind::Mentionable => "mentionable",
            OptionKind::Attachment => "attachment",
        }
    }
}

/// Value of a single command option. Snowflake-typed kinds carry the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum OptionValue {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    User(String),
    Channel(String),
    Role(String),
    Mentionable(String),
    Attachment(String),
}

impl OptionValue {
    pub fn kind(&self) -> OptionKind {
        match self {
            OptionValue::String(_) => OptionKind::String,
            OptionValue::Integer(_) => OptionKind::Integer,
            OptionValue::Number(_) => OptionKind::Number,
            OptionValue::Boolean(_) => OptionKind::Boolean,
            OptionValue::User(_) => OptionKind::User,
            OptionValue::Channel(_) => OptionKind::Channel,
            OptionValue::Role(_) => OptionKind::Role,
            OptionValue::Mentionable(_) => OptionKind::Mentionable,
            OptionValue::Attachment(_) => OptionKind::Attachment,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOption {
    pub name: String,
    pub value: OptionValue,
}

impl CommandOption {
    pub fn new(name: impl Into<String>, value: OptionValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Options supplied with a command, in the order the user entered them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandOptions(Vec<CommandOption>);

impl CommandOptions {
    pub fn new(options: Vec<CommandOption>) -> Self {
        Self(options)
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.0
            .iter()
            .find(|option| option.name == name)
            .map(|option| &option.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandOption> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn string(&self, name: &str) -> Result<Option<&str>, DomainError> {
        match self.get(name) {
            None => Ok(None),
            Some(OptionValue::String(value)) => Ok(Some(value)),
            Some(other) => Err(mismatch(name, OptionKind::String, other)),
        }
    }

    pub fn integer(&self, name: &str) -> Result<Option<i64>, DomainError> {
        match self.get(name) {
            None => Ok(None),
            Some(OptionValue::Integer(value)) => Ok(Some(*value)),
            Some(other) => Err(mismatch(name, OptionKind::Integer, other)),
        }
    }

    /// Integers are accepted where a number is expected.
    pub fn number(&self, name: &str) -> Result<Option<f64>, DomainError> {
        match self.get(name) {
            None => Ok(None),
            Some(OptionValue::Number(value)) => Ok(Some(*value)),
            Some(OptionValue::Integer(value)) => Ok(Some(*value as f64)),
            Some(other) => Err(mismatch(name, OptionKind::Number, other)),
        }
    }

    pub fn boolean(&self, name: &str) -> Result<Option<bool>, DomainError> {
        match self.get(name) {
            None => Ok(None),
            Some(OptionValue::Boolean(value)) => Ok(Some(*value)),
            Some(other) => Err(mismatch(name, OptionKind::Boolean, other)),
        }
    }

    /// Id of a user, channel, role, mentionable or attachment option.
    pub fn snowflake(&self, name: &str, kind: OptionKind) -> Result<Option<&str>, DomainError> {
        let Some(value) = self.get(name) else {
            return Ok(None);
        };
        match (kind, value) {
            (OptionKind::User, OptionValue::User(id))
            | (OptionKind::Channel, OptionValue::Channel(id))
            | (OptionKind::Role, OptionValue::Role(id))
            | (OptionKind::Mentionable, OptionValue::Mentionable(id))
            | (OptionKind::Attachment, OptionValue::Attachment(id)) => Ok(Some(id)),
            (OptionKind::Mentionable, OptionValue::User(id) | OptionValue::Role(id)) => Ok(Some(id)),
            (expected, other) => Err(mismatch(name, expected, other)),
        }
    }
}

impl FromIterator<CommandOption> for CommandOptions {
    fn from_iter<I: IntoIterator<Item = CommandOption>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn mismatch(name: &str, expected: OptionKind, found: &OptionValue) -> DomainError {
    DomainError::option_kind(name, expected.as_str(), found.kind().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> CommandOptions {
        CommandOptions::new(vec![
            CommandOption::new("query", OptionValue::String("rust".into())),
            CommandOption::new("limit", OptionValue::Integer(5)),
            CommandOption::new("who", OptionValue::User("42".into())),
        ])
    }

    #[test]
    fn typed_getters_match_kind() {
        let options = options();
        assert_eq!(options.string("query").unwrap(), Some("rust"));
        assert_eq!(options.integer("limit").unwrap(), Some(5));
        assert_eq!(options.number("limit").unwrap(), Some(5.0));
        assert_eq!(options.snowflake("who", OptionKind::User).unwrap(), Some("42"));
        assert_eq!(options.snowflake("who", OptionKind::Mentionable).unwrap(), Some("42"));
        assert_eq!(options.boolean("missing").unwrap(), None);
    }

    #[test]
    fn kind_mismatch_is_reported() {
        let err = options().boolean("query").unwrap_err();
        assert_eq!(err, DomainError::option_kind("query", "boolean", "string"));
        assert_eq!(err.to_string(), "option `query` is a string, expected boolean");
    }

    #[test]
    fn wire_shape_is_tagged() {
        let json = serde_json::to_value(options()).unwrap();
        assert_eq!(
            json[1],
            serde_json::json!({"name": "limit", "value": {"type": "integer", "value": 5}})
        );
        let back: CommandOptions = serde_json::from_value(json).unwrap();
        assert_eq!(back, options());
    }
}
