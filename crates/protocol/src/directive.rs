//! The directive value type.

use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// The sentinel every directive carries in its `protocol` field.
pub const PROTOCOL: &str = "modai";

/// Why a JSON value is not a directive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectiveError {
    #[error("not a JSON object")]
    NotAnObject,

    #[error("missing \"protocol\" field")]
    MissingProtocol,

    #[error("protocol is {0}, expected \"modai\"")]
    WrongProtocol(String),

    #[error("missing or non-string \"tool\" field")]
    MissingTool,

    #[error("\"tool\" is empty")]
    EmptyTool,

    #[error("missing \"arguments\" field")]
    MissingArguments,

    #[error("\"arguments\" is not an object")]
    ArgumentsNotObject,

    #[error("\"arguments\" recovered no key/value pairs")]
    EmptyArguments,
}

impl DirectiveError {
    /// Whether the rejected value still identified itself as a modai directive.
    pub fn claims_protocol(&self) -> bool {
        !matches!(
            self,
            DirectiveError::NotAnObject
                | DirectiveError::MissingProtocol
                | DirectiveError::WrongProtocol(_)
        )
    }
}

/// A tool call embedded in model output.
///
/// Immutable once built; `protocol` is implied by the type.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    tool: String,
    arguments: Map<String, Value>,
}

impl Directive {
    /// Build a directive, rejecting an empty tool name.
    pub fn new(
        tool: impl Into<String>,
        arguments: Map<String, Value>,
    ) -> Result<Self, DirectiveError> {
        let tool = tool.into();
        if tool.is_empty() {
            return Err(DirectiveError::EmptyTool);
        }
        Ok(Self { tool, arguments })
    }

    /// Validate a parsed JSON value as a directive.
    pub fn from_value(value: &Value) -> Result<Self, DirectiveError> {
        let object = value.as_object().ok_or(DirectiveError::NotAnObject)?;

        match object.get("protocol") {
            Some(Value::String(p)) if p == PROTOCOL => {}
            Some(other) => return Err(DirectiveError::WrongProtocol(other.to_string())),
            None => return Err(DirectiveError::MissingProtocol),
        }

        let tool = match object.get("tool") {
            Some(Value::String(t)) => t.clone(),
            _ => return Err(DirectiveError::MissingTool),
        };

        let arguments = match object.get("arguments") {
            Some(Value::Object(args)) => args.clone(),
            Some(_) => return Err(DirectiveError::ArgumentsNotObject),
            None => return Err(DirectiveError::MissingArguments),
        };

        Self::new(tool, arguments)
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn arguments(&self) -> &Map<String, Value> {
        &self.arguments
    }

    /// The wire encoding as a JSON value.
    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        object.insert("protocol".into(), Value::String(PROTOCOL.into()));
        object.insert("tool".into(), Value::String(self.tool.clone()));
        object.insert("arguments".into(), Value::Object(self.arguments.clone()));
        Value::Object(object)
    }
}

impl Serialize for Directive {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Directive", 3)?;
        state.serialize_field("protocol", PROTOCOL)?;
        state.serialize_field("tool", &self.tool)?;
        state.serialize_field("arguments", &self.arguments)?;
        state.end()
    }
}

/// Renders the compact wire form, `{"protocol":"modai","tool":...,"arguments":...}`.
impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => Err(fmt::Error),
        }
    }
}
