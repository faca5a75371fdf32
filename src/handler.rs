//! # Pattern-Based Handler Dispatch
//!
//! An ordered collection of (pattern, callback) bindings. A pattern is a
//! [`Message`] fragment; an incoming message matches it when every pattern
//! key is present with an equal value. Bindings are kept sorted by
//! descending specificity (pattern key count), so the most specific match
//! wins; ties go to the earlier binding (the sort is stable).
//!
//! The table is generic over a state type `S` threaded mutably into every
//! callback. Worker handlers use it to raise the stop flag; the service's
//! administrative handlers use it to read live counters. The state is owned
//! by the dispatching thread, so no synchronization is involved.

use std::cmp::Reverse;

use crate::error::{Result, SwitchboardError};
use crate::message::Message;

/// A dispatch callback: borrows the loop state and the request, returns the
/// reply.
pub type Handler<S> = Box<dyn Fn(&mut S, &Message) -> Message + Send>;

struct Binding<S> {
    pattern: Message,
    handler: Handler<S>,
}

/// Ordered (pattern, callback) table resolving messages to callbacks.
///
/// # Examples
///
/// ```rust
/// use switchboard::handler::HandlerTable;
/// use switchboard::message::{keys, Message};
///
/// let mut table: HandlerTable<()> = HandlerTable::new();
/// table.bind(Message::new(), |_, request| {
///     request.reply().with(keys::ERROR, "No handler match")
/// });
/// table.bind(Message::request("sum"), |_, request| {
///     request.reply().with(keys::REP, 5)
/// });
///
/// let reply = table
///     .resolve(&mut (), &Message::request("sum"))
///     .expect("catch-all guarantees a match");
/// assert_eq!(reply.get(keys::REP), Some(&5.into()));
/// ```
pub struct HandlerTable<S> {
    bindings: Vec<Binding<S>>,
}

impl<S> HandlerTable<S> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// True when no bindings are installed.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Install a binding and re-sort by descending specificity.
    ///
    /// The sort is stable, so among equally specific patterns the one bound
    /// first keeps winning. That tie-break is part of the contract.
    pub fn bind(
        &mut self,
        pattern: Message,
        handler: impl Fn(&mut S, &Message) -> Message + Send + 'static,
    ) {
        self.bindings.push(Binding {
            pattern,
            handler: Box::new(handler),
        });
        self.bindings.sort_by_key(|binding| Reverse(binding.pattern.len()));
    }

    /// Resolve `message` to the most specific matching callback and invoke it.
    ///
    /// With a catch-all binding installed a miss is unreachable; if it is
    /// observed anyway it surfaces as [`SwitchboardError::HandlerLookup`],
    /// an internal-consistency bug rather than a runtime condition.
    pub fn resolve(&self, state: &mut S, message: &Message) -> Result<Message> {
        let binding = self
            .bindings
            .iter()
            .find(|binding| message.matches(&binding.pattern))
            .ok_or_else(|| SwitchboardError::handler_lookup(message))?;
        Ok((binding.handler)(state, message))
    }
}

impl<S> Default for HandlerTable<S> {
    fn default() -> Self {
        Self::new()
    }
}
