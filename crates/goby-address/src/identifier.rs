use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// The wire-level routing key: `/<group>/<scheme-name>/<type-name>/<pid>/<thread-id>/`.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Identifier {
    pub group: String,
    pub scheme: String,
    pub type_name: String,
    pub pid: u32,
    pub thread_id: u64,
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum IdentifierError {
    #[error("identifier must split into exactly five '/'-delimited fields, got {0}")]
    WrongFieldCount(usize),
    #[error("identifier field {0} is not valid: {1}")]
    InvalidField(&'static str, String),
}

impl Identifier {
    pub fn new(
        group: impl Into<String>,
        scheme: impl Into<String>,
        type_name: impl Into<String>,
        pid: u32,
        thread_id: u64,
    ) -> Self {
        Self { group: group.into(), scheme: scheme.into(), type_name: type_name.into(), pid, thread_id }
    }

    /// Render as `/group/scheme/type/pid/thread/`.
    pub fn to_wire(&self) -> String {
        format!("/{}/{}/{}/{}/{:x}/", self.group, self.scheme, self.type_name, self.pid, self.thread_id)
    }

    /// The prefix a receiver subscribes with to receive from any
    /// process/thread: `/group/scheme/type/`.
    pub fn subscription_prefix(group: &str, scheme: &str, type_name: &str) -> String {
        format!("/{}/{}/{}/", group, scheme, type_name)
    }

    pub fn parse(s: &str) -> Result<Self, IdentifierError> {
        let trimmed = s.strip_prefix('/').unwrap_or(s);
        let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
        let fields: Vec<&str> = trimmed.split('/').collect();
        if fields.len() != 5 {
            return Err(IdentifierError::WrongFieldCount(fields.len()));
        }
        let pid: u32 = fields[3]
            .parse()
            .map_err(|_| IdentifierError::InvalidField("pid", fields[3].to_string()))?;
        let thread_id = u64::from_str_radix(fields[4], 16)
            .map_err(|_| IdentifierError::InvalidField("thread_id", fields[4].to_string()))?;
        Ok(Self {
            group: fields[0].to_string(),
            scheme: fields[1].to_string(),
            type_name: fields[2].to_string(),
            pid,
            thread_id,
        })
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_wire())
    }
}

/// Caches the per-thread, per-scheme wire prefix so repeated publishes from
/// the same thread don't reformat the same string every time.
pub struct IdentifierFactory {
    pid: u32,
    thread_id: u64,
    prefix_cache: HashMap<(String, String, String), String>,
}

impl IdentifierFactory {
    pub fn new(pid: u32, thread_id: u64) -> Self {
        Self { pid, thread_id, prefix_cache: HashMap::new() }
    }

    /// Build (and cache) the full wire identifier for this process/thread.
    pub fn make(&mut self, group: &str, scheme: &str, type_name: &str) -> &str {
        let key = (group.to_string(), scheme.to_string(), type_name.to_string());
        self.prefix_cache.entry(key).or_insert_with(|| {
            Identifier::new(group, scheme, type_name, self.pid, self.thread_id).to_wire()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let id = Identifier::new("nav", "PROTOBUF", "Position", 1234, 0xdead);
        let wire = id.to_wire();
        assert_eq!(wire, "/nav/PROTOBUF/Position/1234/dead/");
        assert_eq!(Identifier::parse(&wire).unwrap(), id);
    }

    #[test]
    fn wrong_field_count_rejected() {
        assert_eq!(Identifier::parse("/a/b/c/"), Err(IdentifierError::WrongFieldCount(3)));
    }

    #[test]
    fn subscription_prefix_is_type_terminated() {
        let prefix = Identifier::subscription_prefix("nav", "PROTOBUF", "Position");
        let wire = Identifier::new("nav", "PROTOBUF", "Position", 1, 2).to_wire();
        assert!(wire.starts_with(&prefix));
    }

    #[test]
    fn factory_caches_by_group_scheme_type() {
        let mut factory = IdentifierFactory::new(10, 20);
        let a = factory.make("nav", "PROTOBUF", "Position").to_string();
        let b = factory.make("nav", "PROTOBUF", "Position").to_string();
        assert_eq!(a, b);
        assert_eq!(factory.prefix_cache.len(), 1);
    }
}
