use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;

use crate::envelope::Envelope;

/// A handler registered against a layer's subscription table (spec.md
/// §4.5). `Typed` carries a user callback that receives the raw envelope
/// (the caller is responsible for parsing via [`goby_marshal`]); `Regex`
/// matches on `(scheme, type, group)` rather than exact identifier prefix.
pub enum SubscriptionHandler {
    Typed(Arc<dyn Fn(&Envelope) + Send + Sync>),
    Regex { group_re: Regex, type_re: Regex, callback: Arc<dyn Fn(&Envelope) + Send + Sync> },
}

/// Per-layer multimap from identifier prefix to active subscription
/// handlers (spec.md §4.5). Dispatch finds all matching typed
/// subscriptions, then evaluates regex subscriptions against the
/// envelope's `(scheme, type, group)`, posting **at most one** forwarded
/// regex delivery per message so a forwarder fanning out to several
/// threads doesn't duplicate delivery.
#[derive(Default)]
pub struct SubscriptionTable {
    typed: HashMap<String, Vec<Arc<dyn Fn(&Envelope) + Send + Sync>>>,
    regex: Vec<(Regex, Regex, Arc<dyn Fn(&Envelope) + Send + Sync>)>,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe_typed(&mut self, prefix: impl Into<String>, callback: Arc<dyn Fn(&Envelope) + Send + Sync>) {
        self.typed.entry(prefix.into()).or_default().push(callback);
    }

    pub fn subscribe_regex(&mut self, group_re: Regex, type_re: Regex, callback: Arc<dyn Fn(&Envelope) + Send + Sync>) {
        self.regex.push((group_re, type_re, callback));
    }

    pub fn unsubscribe(&mut self, prefix: &str) {
        self.typed.remove(prefix);
    }

    pub fn unsubscribe_all(&mut self) {
        self.typed.clear();
        self.regex.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.typed.is_empty() && self.regex.is_empty()
    }

    /// Dispatches `envelope` to every typed subscription whose prefix is a
    /// prefix of the envelope's wire identifier, then to at most one
    /// matching regex subscription. Returns the number of callbacks
    /// invoked.
    pub fn dispatch(&self, envelope: &Envelope) -> usize {
        let wire = envelope.identifier.to_wire();
        let mut delivered = 0;
        for (prefix, callbacks) in self.typed.iter() {
            if wire.starts_with(prefix.as_str()) {
                for cb in callbacks {
                    cb(envelope);
                    delivered += 1;
                }
            }
        }

        for (group_re, type_re, callback) in &self.regex {
            if group_re.is_match(&envelope.group.to_string()) && type_re.is_match(&envelope.type_name) {
                callback(envelope);
                delivered += 1;
                break;
            }
        }
        delivered
    }
}
