//! # Change Records
//!
//! One notification from the upstream order stream, plus the wire envelope the
//! stream transport delivers it in.
//!
//! Attribute values use the stream's typed encoding, where every value is a
//! single-key object naming its type:
//!
//! ```json
//! { "p_key": { "S": "ord-1" }, "amount": { "N": "42.5" } }
//! ```
//!
//! Numbers stay as the decimal strings the stream carries; interpretation is
//! left to the record converter.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Kind of change carried by a stream record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventName {
    Insert,
    Modify,
    Remove,
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => write!(f, "INSERT"),
            Self::Modify => write!(f, "MODIFY"),
            Self::Remove => write!(f, "REMOVE"),
        }
    }
}

impl std::str::FromStr for EventName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INSERT" => Ok(Self::Insert),
            "MODIFY" => Ok(Self::Modify),
            "REMOVE" => Ok(Self::Remove),
            _ => Err(format!("Invalid event name: {s}")),
        }
    }
}

/// Typed attribute value as encoded by the change stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    #[serde(rename = "S")]
    S(String),
    #[serde(rename = "N")]
    N(String),
    /// Base64 encoded binary
    #[serde(rename = "B")]
    B(String),
    #[serde(rename = "BOOL")]
    Bool(bool),
    #[serde(rename = "NULL")]
    Null(bool),
    #[serde(rename = "SS")]
    Ss(Vec<String>),
    #[serde(rename = "NS")]
    Ns(Vec<String>),
    #[serde(rename = "BS")]
    Bs(Vec<String>),
    #[serde(rename = "L")]
    L(Vec<AttributeValue>),
    #[serde(rename = "M")]
    M(HashMap<String, AttributeValue>),
}

impl AttributeValue {
    pub fn string(value: impl Into<String>) -> Self {
        Self::S(value.into())
    }

    pub fn number(value: impl ToString) -> Self {
        Self::N(value.to_string())
    }

    /// Short type tag used in error messages
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::S(_) => "S",
            Self::N(_) => "N",
            Self::B(_) => "B",
            Self::Bool(_) => "BOOL",
            Self::Null(_) => "NULL",
            Self::Ss(_) => "SS",
            Self::Ns(_) => "NS",
            Self::Bs(_) => "BS",
            Self::L(_) => "L",
            Self::M(_) => "M",
        }
    }
}

/// One change notification, owned by the controller for a single processing call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub event_name: EventName,
    pub keys: HashMap<String, AttributeValue>,
    #[serde(default)]
    pub new_image: HashMap<String, AttributeValue>,
    /// Transport-assigned id, kept for log correlation
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub sequence_number: Option<String>,
}

impl ChangeRecord {
    pub fn new(event_name: EventName) -> Self {
        Self {
            event_name,
            keys: HashMap::new(),
            new_image: HashMap::new(),
            event_id: None,
            sequence_number: None,
        }
    }

    pub fn with_key(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.keys.insert(name.into(), value);
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.new_image.insert(name.into(), value);
        self
    }

    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    /// Best-effort string key for logging; never used for writes
    pub fn key_for_logging(&self, primary_key: &str) -> String {
        match self.keys.get(primary_key) {
            Some(AttributeValue::S(s)) => s.clone(),
            Some(AttributeValue::N(n)) => n.clone(),
            Some(other) => format!("<{}>", other.type_tag()),
            None => "<missing>".to_string(),
        }
    }

    pub fn event_id_or_unknown(&self) -> &str {
        self.event_id.as_deref().unwrap_or("unknown")
    }
}

/// Batch of stream records as delivered by the transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<StreamRecord>,
}

impl StreamEvent {
    pub fn into_change_records(self) -> Vec<ChangeRecord> {
        self.records.into_iter().map(ChangeRecord::from).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamRecord {
    #[serde(rename = "eventID", default)]
    pub event_id: Option<String>,
    #[serde(rename = "eventName")]
    pub event_name: EventName,
    #[serde(rename = "eventVersion", default)]
    pub event_version: Option<String>,
    #[serde(rename = "eventSource", default)]
    pub event_source: Option<String>,
    #[serde(rename = "eventSourceARN", default)]
    pub event_source_arn: Option<String>,
    pub dynamodb: StreamChange,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StreamChange {
    #[serde(default)]
    pub keys: HashMap<String, AttributeValue>,
    #[serde(default)]
    pub new_image: HashMap<String, AttributeValue>,
    #[serde(default)]
    pub old_image: HashMap<String, AttributeValue>,
    #[serde(default)]
    pub sequence_number: Option<String>,
}

impl From<StreamRecord> for ChangeRecord {
    fn from(record: StreamRecord) -> Self {
        Self {
            event_name: record.event_name,
            keys: record.dynamodb.keys,
            new_image: record.dynamodb.new_image,
            event_id: record.event_id,
            sequence_number: record.dynamodb.sequence_number,
        }
    }
}
