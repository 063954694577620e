//! Lookup of the address currently published in DNS.

use crate::error::{DdnsError, Result};
use crate::target::{qualify, RecordType};
use async_trait::async_trait;
use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::proto::rr::{RData, RecordType as WireRecordType};
use hickory_resolver::TokioAsyncResolver;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Source of the currently published address for a name.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PublishedResolver: Send + Sync {
    /// Resolve `subdomain.domain` (or `domain` for the apex) and return the
    /// first address of `record_type` as text.
    async fn resolve_published_address(
        &self,
        domain: &str,
        subdomain: &str,
        record_type: RecordType,
    ) -> Result<String>;
}

/// DNS resolver backed by hickory.
pub struct DnsResolver {
    resolver: TokioAsyncResolver,
}

impl DnsResolver {
    /// Create a resolver from the system configuration.
    pub fn from_system_conf() -> Result<Self> {
        let (config, opts) = hickory_resolver::system_conf::read_system_conf().map_err(|e| {
            DdnsError::Resolution {
                name: "system configuration".to_string(),
                message: e.to_string(),
            }
        })?;
        Ok(Self::with_config(config, opts))
    }

    /// Create a resolver that queries a single nameserver.
    pub fn with_nameserver(nameserver: SocketAddr) -> Self {
        let group =
            NameServerConfigGroup::from_ips_clear(&[nameserver.ip()], nameserver.port(), true);
        let config = ResolverConfig::from_parts(None, vec![], group);
        Self::with_config(config, ResolverOpts::default())
    }

    fn with_config(config: ResolverConfig, mut opts: ResolverOpts) -> Self {
        opts.timeout = Duration::from_secs(5);
        opts.attempts = 2;
        // Every cycle must see the live answer, not one cached from the last.
        opts.cache_size = 0;

        Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
        }
    }
}

fn wire_type(record_type: RecordType) -> WireRecordType {
    match record_type {
        RecordType::A => WireRecordType::A,
        RecordType::AAAA => WireRecordType::AAAA,
    }
}

#[async_trait]
impl PublishedResolver for DnsResolver {
    async fn resolve_published_address(
        &self,
        domain: &str,
        subdomain: &str,
        record_type: RecordType,
    ) -> Result<String> {
        let qname = qualify(domain, subdomain);
        let absolute = format!("{}.", qname.trim_end_matches('.'));

        let lookup = self
            .resolver
            .lookup(absolute.as_str(), wire_type(record_type))
            .await
            .map_err(|e| DdnsError::Resolution {
                name: qname.clone(),
                message: e.to_string(),
            })?;

        let address = lookup
            .iter()
            .find_map(|rdata| match (record_type, rdata) {
                (RecordType::A, RData::A(a)) => Some(IpAddr::V4(a.0)),
                (RecordType::AAAA, RData::AAAA(aaaa)) => Some(IpAddr::V6(aaaa.0)),
                _ => None,
            })
            .ok_or_else(|| DdnsError::Resolution {
                name: qname.clone(),
                message: format!("no {} record in answer", record_type),
            })?;

        tracing::debug!("Remote {} address for {} is {}", record_type, qname, address);
        Ok(address.to_string())
    }
}
