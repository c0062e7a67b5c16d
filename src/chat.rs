//! Type definitions for chat primitives
//!

use serde::{Deserialize, Serialize};

/// The author of a `Message`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A `System` message is an authoritative message which is used to
    /// instruct the model. Usually, it appears as the first message
    /// in a dialog.
    System,

    /// A message authored by the user
    User,

    /// A message authored by the model
    Assistant,
}

/// A `Message` in a chat converstation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The author of the message
    pub role: Role,
    /// The contents of the message
    pub content: String,
}

impl Message {
    pub fn new<S: Into<String>>(role: Role, content: S) -> Message {
        Message {
            role,
            content: content.into(),
        }
    }

    pub fn system<S: Into<String>>(content: S) -> Message {
        Message::new(Role::System, content)
    }

    pub fn user<S: Into<String>>(content: S) -> Message {
        Message::new(Role::User, content)
    }

    pub fn assistant<S: Into<String>>(content: S) -> Message {
        Message::new(Role::Assistant, content)
    }
}

/// Join the contents of every message with newlines. Workflow-style providers
/// accept a single string rather than a dialog.
pub fn joined_content(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| m.content.as_str())
        .collect::<Vec<&str>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_names() {
        let msg = Message::assistant("hi");
        let json = serde_json::to_string(&msg).unwrap();

        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }

    #[test]
    fn test_joined_content() {
        let messages = [
            Message::system("be brief"),
            Message::user("hello"),
            Message::assistant("hi"),
        ];

        assert_eq!(joined_content(&messages), "be brief\nhello\nhi");
        assert_eq!(joined_content(&[]), "");
    }
}
