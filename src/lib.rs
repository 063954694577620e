//! # ddns-updater
//!
//! A dynamic DNS updater that keeps records under one parent domain pointed
//! at this host's public IP address.
//!
//! ## Features
//!
//! - Compact target specification: `vpn,nas{AAAA}` (empty means the domain itself)
//! - IPv4 (A) and IPv6 (AAAA) records
//! - Live DNS lookup of the published address before every update
//! - Session-based provider login with optional TOTP second factor
//! - Per-target fault isolation: one failing record never stops the others
//!
//! ## Usage
//!
//! ```bash
//! USERNAME=alice PASSWORD=secret DOMAIN_NUMBER=4711 CONTRACT=c-1 \
//! DOMAIN=example.com SUBDOMAIN="vpn,nas{AAAA}" INTERVAL=30 ddns-updater
//!
//! # Single check, then exit
//! ddns-updater --once
//! ```

pub mod config;
pub mod detector;
pub mod error;
pub mod providers;
pub mod reconcile;
pub mod resolver;
pub mod scheduler;
pub mod target;

pub use config::{Config, Settings};
pub use detector::{AddressObserver, IpDetector};
pub use error::{DdnsError, Result};
pub use providers::{SessionClient, UpdateClient};
pub use reconcile::{CycleReport, Reconciler, TargetOutcome};
pub use resolver::{DnsResolver, PublishedResolver};
pub use target::{parse_targets, RecordType, Target};
