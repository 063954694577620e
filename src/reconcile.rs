//! Compare-and-update pass over every configured target.

use crate::config::Config;
use crate::detector::AddressObserver;
use crate::error::{DdnsError, Result};
use crate::providers::UpdateClient;
use crate::resolver::PublishedResolver;
use crate::target::{parse_targets, RecordType, Target};
use chrono::{DateTime, Utc};
use std::net::IpAddr;

/// What happened to one target during a pass.
#[derive(Debug)]
pub enum TargetOutcome {
    /// Published address already matches.
    UpToDate { address: String },
    /// Provider accepted the new address.
    Updated { from: String, to: String },
    /// Provider answered but refused the update.
    Rejected { from: String, to: String },
    /// Observation, resolution or the update itself failed.
    Failed(DdnsError),
}

/// Result of a single reconciliation pass.
#[derive(Debug)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub outcomes: Vec<(Target, TargetOutcome)>,
}

impl CycleReport {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
            outcomes: Vec::new(),
        }
    }

    /// Number of targets for which an update was sent.
    pub fn updates_attempted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| {
                matches!(
                    o,
                    TargetOutcome::Updated { .. } | TargetOutcome::Rejected { .. }
                )
            })
            .count()
    }

    /// Number of targets that failed this pass.
    pub fn failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, TargetOutcome::Failed(_)))
            .count()
    }
}

/// Drives reconciliation of every target under one parent domain.
pub struct Reconciler<O, R> {
    domain: String,
    subdomain_spec: String,
    default_record_type: RecordType,
    observer: O,
    resolver: R,
}

impl<O: AddressObserver, R: PublishedResolver> Reconciler<O, R> {
    pub fn new(
        domain: impl Into<String>,
        subdomain_spec: impl Into<String>,
        default_record_type: RecordType,
        observer: O,
        resolver: R,
    ) -> Self {
        Self {
            domain: domain.into(),
            subdomain_spec: subdomain_spec.into(),
            default_record_type,
            observer,
            resolver,
        }
    }

    pub fn from_config(config: &Config, observer: O, resolver: R) -> Self {
        Self::new(
            config.domain.clone(),
            config.subdomain.clone(),
            config.default_record_type,
            observer,
            resolver,
        )
    }

    /// Run one pass. Failures are isolated to the target they occur on.
    pub async fn reconcile<U>(&self, client: &mut U) -> CycleReport
    where
        U: UpdateClient + ?Sized,
    {
        tracing::info!("Checking for changes...");
        let mut report = CycleReport::new();

        let targets = parse_targets(&self.subdomain_spec, self.default_record_type);
        if targets.is_empty() {
            tracing::warn!("No valid targets in SUBDOMAIN, nothing to do this cycle");
            return report;
        }

        for target in targets {
            let outcome = match self.reconcile_target(&target, client).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(
                        "Skipping {} ({}) this cycle: {}",
                        target.fqdn(&self.domain),
                        target.record_type,
                        e
                    );
                    TargetOutcome::Failed(e)
                }
            };
            report.outcomes.push((target, outcome));
        }

        report
    }

    async fn reconcile_target<U>(&self, target: &Target, client: &mut U) -> Result<TargetOutcome>
    where
        U: UpdateClient + ?Sized,
    {
        let fqdn = target.fqdn(&self.domain);

        let observed = self
            .observer
            .observe_public_address(target.record_type.family())
            .await?;
        let published = self
            .resolver
            .resolve_published_address(&self.domain, &target.name, target.record_type)
            .await?;

        if addresses_match(&observed, &published) {
            tracing::info!(
                "DNS records still up to date for {} ({}). No update needed.",
                fqdn,
                target.record_type
            );
            return Ok(TargetOutcome::UpToDate { address: published });
        }

        tracing::info!(
            "DNS records are not up to date for {} ({}). Updating from '{}' to '{}'.",
            fqdn,
            target.record_type,
            published,
            observed
        );

        client.ensure_authenticated().await?;
        let accepted = client
            .update_record(&target.name, target.record_type, &observed)
            .await?;

        if accepted {
            tracing::info!("Updated {} ({}) to {}", fqdn, target.record_type, observed);
            Ok(TargetOutcome::Updated {
                from: published,
                to: observed,
            })
        } else {
            tracing::warn!(
                "Provider did not accept the update for {} ({})",
                fqdn,
                target.record_type
            );
            Ok(TargetOutcome::Rejected {
                from: published,
                to: observed,
            })
        }
    }
}

/// Compare two addresses, as IPs when both parse, otherwise as text.
fn addresses_match(observed: &str, published: &str) -> bool {
    let (observed, published) = (observed.trim(), published.trim());
    match (observed.parse::<IpAddr>(), published.parse::<IpAddr>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => observed == published,
    }
}
