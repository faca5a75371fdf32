//! # Message Payload Model
//!
//! The broker moves exactly one payload shape: an ordered mapping of string
//! keys to JSON values, used both for client request/reply traffic and for
//! control-plane signal envelopes. Reserved `$`-prefixed keys carry protocol
//! meaning; everything else is application data.
//!
//! A message is immutable once sent. Handlers receive a borrowed request and
//! build a fresh reply, typically by copying the request fields forward with
//! [`Message::reply`] and layering protocol keys on top with [`Message::with`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Reserved message keys.
pub mod keys {
    /// Request kind selector.
    pub const REQ: &str = "$req";
    /// Reply payload or status.
    pub const REP: &str = "$rep";
    /// Failure description on an unhandled or rejected request.
    pub const ERROR: &str = "$error";
    /// Control verb (`ready`, `stop`).
    pub const SIGNAL: &str = "$signal";
    /// Optional service routing hint.
    pub const SERVICE: &str = "$service";
    /// Attribute name for introspection requests.
    pub const ATTR: &str = "$attr";
}

/// Control verbs carried under [`keys::SIGNAL`].
pub mod signals {
    /// Startup handshake: a worker or service has reached its loop.
    pub const READY: &str = "ready";
    /// Graceful shutdown request and its acknowledgment.
    pub const STOP: &str = "stop";
}

/// Well-known peer tokens used on control-plane frames.
pub mod peers {
    /// The owning controller's token; handshakes are addressed to it.
    pub const CONTROLLER: &str = "$controller";
    /// The service's identity on its control channel.
    pub const SERVICE: &str = "$service";
}

/// An ordered string-to-value mapping exchanged over broker channels.
///
/// # Examples
///
/// ```rust
/// use switchboard::message::{keys, Message};
///
/// let request = Message::request("sum").with("a", 2).with("b", 3);
/// assert_eq!(request.str_field(keys::REQ), Some("sum"));
///
/// let reply = request.reply().with(keys::REP, 5);
/// assert_eq!(reply.get("a"), request.get("a"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message {
    fields: Map<String, Value>,
}

impl Message {
    /// Create an empty message. As a handler pattern this matches everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a `{"$signal": <verb>}` control envelope.
    pub fn signal(verb: &str) -> Self {
        Self::new().with(keys::SIGNAL, verb)
    }

    /// Create a `{"$req": <kind>}` request skeleton.
    pub fn request(kind: &str) -> Self {
        Self::new().with(keys::REQ, kind)
    }

    /// Build a message from a JSON value. Fails unless the value is an object.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the message has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look up a field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Look up a field and coerce it to a string slice.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key)?.as_str()
    }

    /// True when `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Insert or replace a field in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Start a reply by copying every request field forward.
    pub fn reply(&self) -> Self {
        self.clone()
    }

    /// True iff every key in `pattern` is present here with an equal value.
    ///
    /// The empty pattern matches any message, which is what makes a
    /// catch-all handler binding possible.
    pub fn matches(&self, pattern: &Message) -> bool {
        pattern
            .fields
            .iter()
            .all(|(key, value)| self.fields.get(key) == Some(value))
    }

    /// True when the message is `{"$signal": <verb>, ...}`.
    pub fn is_signal(&self, verb: &str) -> bool {
        self.str_field(keys::SIGNAL) == Some(verb)
    }

    /// Iterate over fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.fields) {
            Ok(json) => f.write_str(&json),
            Err(_) => f.write_str("<unprintable message>"),
        }
    }
}

impl FromIterator<(String, Value)> for Message {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_pattern_matches_everything() {
        let pattern = Message::new();
        assert!(Message::new().matches(&pattern));
        assert!(Message::request("sum").with("a", 1).matches(&pattern));
    }

    #[test]
    fn test_pattern_requires_equal_values() {
        let pattern = Message::request("sum");
        assert!(Message::request("sum").with("a", 2).matches(&pattern));
        assert!(!Message::request("multiply").matches(&pattern));
        assert!(!Message::new().with("a", 2).matches(&pattern));
    }

    #[test]
    fn test_reply_copies_fields_forward() {
        let request = Message::request("sum").with("a", 2).with("b", 3);
        let reply = request.reply().with(keys::REP, 5);

        assert_eq!(reply.get("a"), Some(&json!(2)));
        assert_eq!(reply.get("b"), Some(&json!(3)));
        assert_eq!(reply.get(keys::REP), Some(&json!(5)));
        // The original request is untouched.
        assert!(!request.contains(keys::REP));
    }

    #[test]
    fn test_signal_envelope() {
        let ready = Message::signal(signals::READY);
        assert!(ready.is_signal(signals::READY));
        assert!(!ready.is_signal(signals::STOP));
        assert_eq!(ready.len(), 1);
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(Message::from_value(json!({"$req": "sum"})).is_ok());
        assert!(Message::from_value(json!([1, 2, 3])).is_err());
        assert!(Message::from_value(json!("plain string")).is_err());
    }

    #[test]
    fn test_round_trips_through_json() {
        let message = Message::request("eval").with(keys::ATTR, "total_client_requests");
        let json = serde_json::to_string(&message).expect("serialize");
        let back: Message = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(message, back);
    }
}
