use async_trait::async_trait;
use shared::protocol::DOMAIN_DIRECTIVE;
use shared::types::{Job, JobQuery};
use crate::whois::client::{Lookup, WhoisQuery};

/// Outcome of resolving one job. `payload` is kept even when `error` is set.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub query: String,
    pub is_host_lookup: bool,
    pub payload: String,
    pub error: Option<String>,
}

#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, job: &Job) -> Resolution;
}

/// Text sent to the data source for a job query
pub fn wire_query(query: &JobQuery) -> WhoisQuery {
    match query {
        JobQuery::Host(fqdn) => WhoisQuery {
            text: format!("{} {}", DOMAIN_DIRECTIVE, fqdn),
            host_lookup: true,
        },
        JobQuery::Address(ip) => WhoisQuery {
            text: ip.clone(),
            host_lookup: false,
        },
    }
}

/// Adapts a WHOIS `Lookup` to the `Resolver` contract
pub struct WhoisResolver<L> {
    lookup: L,
}

impl<L: Lookup> WhoisResolver<L> {
    pub fn new(lookup: L) -> Self {
        Self { lookup }
    }
}

#[async_trait]
impl<L: Lookup> Resolver for WhoisResolver<L> {
    async fn resolve(&self, job: &Job) -> Resolution {
        tracing::info!("Resolving [{}] {}", job.id, job.query.as_str());

        let wire = wire_query(&job.query);
        let (payload, error) = match self.lookup.lookup(&wire).await {
            Ok(data) => (data, None),
            Err(e) => {
                tracing::warn!("WHOIS lookup for [{}] failed: {}", job.id, e);
                (e.partial().to_string(), Some(e.to_string()))
            }
        };

        Resolution {
            query: job.query.as_str().to_string(),
            is_host_lookup: job.query.is_host_lookup(),
            payload,
            error,
        }
    }
}
