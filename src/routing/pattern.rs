//! Registration-time topic filters.
//!
//! Each field of a [`Pattern`] is written as `None`, `"<value>"` or `"!<value>"`
//! and decoded once into a [`FieldMatcher`]. The host fields additionally
//! accept `"all"` and `"*"` as match-any; those sentinels are only special on
//! the pattern side.

use super::topic::TopicAddress;
use std::fmt;

const NEGATION_PREFIX: char = '!';
pub const HOST_WILDCARDS: [&str; 2] = ["all", "*"];

/// One decoded field filter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldMatcher {
    #[default]
    MatchAny,
    /// `"all"` or `"*"` on a host field.
    AnyHost,
    Equals(String),
    NotEquals(String),
}

impl FieldMatcher {
    /// Decode a raw field filter. `allow_host_wildcard` enables the
    /// `"all"` / `"*"` sentinels.
    pub fn parse(pattern: Option<&str>, allow_host_wildcard: bool) -> Self {
        let Some(pattern) = pattern else {
            return Self::MatchAny;
        };
        if allow_host_wildcard && HOST_WILDCARDS.contains(&pattern) {
            return Self::AnyHost;
        }
        match pattern.strip_prefix(NEGATION_PREFIX) {
            Some(rest) => Self::NotEquals(rest.to_string()),
            None => Self::Equals(pattern.to_string()),
        }
    }

    pub fn matches(&self, value: Option<&str>) -> bool {
        match self {
            Self::MatchAny | Self::AnyHost => true,
            Self::Equals(expected) => value == Some(expected.as_str()),
            Self::NotEquals(excluded) => value != Some(excluded.as_str()),
        }
    }
}

impl fmt::Display for FieldMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MatchAny => f.write_str("<any>"),
            Self::AnyHost => f.write_str("*"),
            Self::Equals(v) => f.write_str(v),
            Self::NotEquals(v) => write!(f, "!{v}"),
        }
    }
}

/// Test one field value against a raw filter string.
pub fn match_field(value: Option<&str>, pattern: Option<&str>, allow_host_wildcard: bool) -> bool {
    FieldMatcher::parse(pattern, allow_host_wildcard).matches(value)
}

/// Per-field filter over a [`TopicAddress`]. The default pattern matches
/// every well-formed address.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pattern {
    pub fromhost: FieldMatcher,
    pub tohost: FieldMatcher,
    pub event_type: FieldMatcher,
    pub entity: FieldMatcher,
}

impl Pattern {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn fromhost(mut self, filter: &str) -> Self {
        self.fromhost = FieldMatcher::parse(Some(filter), true);
        self
    }

    pub fn tohost(mut self, filter: &str) -> Self {
        self.tohost = FieldMatcher::parse(Some(filter), true);
        self
    }

    pub fn event_type(mut self, filter: &str) -> Self {
        self.event_type = FieldMatcher::parse(Some(filter), false);
        self
    }

    pub fn entity(mut self, filter: &str) -> Self {
        self.entity = FieldMatcher::parse(Some(filter), false);
        self
    }

    /// Build from four optional raw filters, in address field order.
    pub fn from_filters(
        fromhost: Option<&str>,
        tohost: Option<&str>,
        event_type: Option<&str>,
        entity: Option<&str>,
    ) -> Self {
        Self {
            fromhost: FieldMatcher::parse(fromhost, true),
            tohost: FieldMatcher::parse(tohost, true),
            event_type: FieldMatcher::parse(event_type, false),
            entity: FieldMatcher::parse(entity, false),
        }
    }

    pub fn matches(&self, address: &TopicAddress) -> bool {
        self.fromhost.matches(Some(&address.fromhost))
            && self.tohost.matches(address.tohost.as_deref())
            && self.event_type.matches(Some(&address.event_type))
            && self.entity.matches(address.entity.as_deref())
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.fromhost, self.tohost, self.event_type, self.entity
        )
    }
}
