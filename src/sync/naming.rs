//! Host-suffix encoding for mirrored entity ids.
//!
//! `light.porch` mirrored from host `haven` becomes `light.porch_haven`.
//! The same codec is used by the outbound publisher and the inbound consumer
//! so an already-mirrored id is always recognised and never re-imported.

use crate::routing::HOST_WILDCARDS;
use std::collections::BTreeSet;

pub const HOST_DELIMITER: char = '_';

/// Characters that can never appear in a host suffix token.
const RESERVED: [char; 4] = [HOST_DELIMITER, '/', '#', '+'];

#[derive(Debug, Clone, Default)]
pub struct EntityNameCodec {
    /// When non-empty, only these tokens count as host suffixes.
    known_hosts: BTreeSet<String>,
}

impl EntityNameCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict suffix recognition to the given peer hosts.
    pub fn with_known_hosts<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known_hosts: hosts.into_iter().map(Into::into).collect(),
        }
    }

    pub fn register_host(&mut self, host: &str) {
        self.known_hosts.insert(host.to_string());
    }

    pub fn known_hosts(&self) -> impl Iterator<Item = &str> {
        self.known_hosts.iter().map(String::as_str)
    }

    pub fn add_host(&self, entity_id: &str, host: &str) -> String {
        format!("{entity_id}{HOST_DELIMITER}{host}")
    }

    /// `light.porch_haven` -> (`light.porch`, Some(`haven`));
    /// `light.porch` -> (`light.porch`, None).
    pub fn split_host<'a>(&self, entity_id: &'a str) -> (&'a str, Option<&'a str>) {
        match entity_id.rsplit_once(HOST_DELIMITER) {
            Some((base, token)) if self.is_host_token(token) => (base, Some(token)),
            _ => (entity_id, None),
        }
    }

    fn is_host_token(&self, token: &str) -> bool {
        if token.is_empty() || token.contains(RESERVED) {
            return false;
        }
        self.known_hosts.is_empty() || self.known_hosts.contains(token)
    }
}

/// Whether `host` can be carried as a suffix token without ambiguity.
/// The pattern wildcards are excluded so a host filter on a real name never
/// widens to match-any.
pub fn is_valid_host_token(host: &str) -> bool {
    !host.is_empty() && !host.contains(RESERVED) && !HOST_WILDCARDS.contains(&host)
}
