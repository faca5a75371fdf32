//! Property tests for pattern matching, which everything downstream of the
//! handler table relies on.

use proptest::prelude::*;
use serde_json::Value;
use switchboard::Message;

fn message_from(fields: &std::collections::HashMap<String, i64>) -> Message {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), Value::from(*value)))
        .collect()
}

proptest! {
    /// The empty pattern is the catch-all: it matches any message.
    #[test]
    fn empty_pattern_matches_any_message(
        fields in prop::collection::hash_map("[a-z]{1,8}", any::<i64>(), 0..8)
    ) {
        let message = message_from(&fields);
        prop_assert!(message.matches(&Message::new()));
    }

    /// Any subset of a message's fields, taken as a pattern, matches it.
    #[test]
    fn field_subset_always_matches(
        fields in prop::collection::hash_map("[a-z]{1,8}", any::<i64>(), 1..8),
        keep in any::<u8>(),
    ) {
        let message = message_from(&fields);
        let pattern: Message = fields
            .iter()
            .enumerate()
            .filter(|(index, _)| (keep >> (index % 8)) & 1 != 0)
            .map(|(_, (key, value))| (key.clone(), Value::from(*value)))
            .collect();
        prop_assert!(message.matches(&pattern));
    }

    /// A pattern whose value disagrees with the message never matches.
    #[test]
    fn conflicting_value_never_matches(
        key in "[a-z]{1,8}",
        left in any::<i64>(),
        right in any::<i64>(),
    ) {
        prop_assume!(left != right);
        let message = Message::new().with(key.clone(), left);
        let pattern = Message::new().with(key, right);
        prop_assert!(!message.matches(&pattern));
    }

    /// A pattern with a key the message lacks never matches.
    #[test]
    fn missing_key_never_matches(
        present in "[a-m]{1,6}",
        absent in "[n-z]{1,6}",
        value in any::<i64>(),
    ) {
        let message = Message::new().with(present, value);
        let pattern = Message::new().with(absent, value);
        prop_assert!(!message.matches(&pattern));
    }
}
