use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /resolve`.
/// Exactly one of `fqdn` / `ip` is expected; `fqdn` wins if both are sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    /// Caller-chosen job identifier, not guaranteed unique
    pub uuid: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

/// What a job asks to look up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobQuery {
    /// Fully-qualified domain name
    Host(String),
    /// IP address, passed through to the data source unchanged
    Address(String),
}

impl JobQuery {
    /// The literal query string as submitted
    pub fn as_str(&self) -> &str {
        match self {
            JobQuery::Host(fqdn) => fqdn,
            JobQuery::Address(ip) => ip,
        }
    }

    pub fn is_host_lookup(&self) -> bool {
        matches!(self, JobQuery::Host(_))
    }
}

/// A queued unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: String,
    pub query: JobQuery,
}

impl Job {
    pub fn host(id: impl Into<String>, fqdn: impl Into<String>) -> Self {
        Self { id: id.into(), query: JobQuery::Host(fqdn.into()) }
    }

    pub fn address(id: impl Into<String>, ip: impl Into<String>) -> Self {
        Self { id: id.into(), query: JobQuery::Address(ip.into()) }
    }
}

/// Returned when a submission carries neither `fqdn` nor `ip`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingQuery;

impl std::fmt::Display for MissingQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(crate::protocol::MSG_MISSING_QUERY)
    }
}

impl std::error::Error for MissingQuery {}

impl TryFrom<SubmitRequest> for Job {
    type Error = MissingQuery;

    fn try_from(req: SubmitRequest) -> Result<Self, Self::Error> {
        let query = match (req.fqdn, req.ip) {
            (Some(fqdn), _) => JobQuery::Host(fqdn),
            (None, Some(ip)) => JobQuery::Address(ip),
            (None, None) => return Err(MissingQuery),
        };
        Ok(Job { id: req.uuid, query })
    }
}

/// The stored outcome of resolving one job.
/// Keyed in the store by its own identifier, never by the job's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRecord {
    /// Identifier of the job that produced this record
    pub uuid: String,

    /// Literal query, e.g. "example.com" or "192.0.2.1"
    pub query: String,

    pub is_host_lookup: bool,

    /// Raw WHOIS payload; empty if the lookup failed outright
    pub result: String,

    pub resolved_at: DateTime<Utc>,
}

/// Uniform response envelope. Failures are signalled in-body with HTTP 200.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub error: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ResolvedRecord>,
}

impl ApiResponse {
    pub fn ok() -> Self {
        Self { error: false, msg: Some(crate::protocol::MSG_OK.to_string()), result: None }
    }

    pub fn found(record: ResolvedRecord) -> Self {
        Self { error: false, msg: None, result: Some(record) }
    }

    pub fn failure(msg: impl Into<String>) -> Self {
        Self { error: true, msg: Some(msg.into()), result: None }
    }
}

/// Body of the registry `PUT /register` call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub service: String,
    pub endpoint: String,
    pub tags: Vec<String>,
}

/// Registry answer to a successful registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationAck {
    pub uuid: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submit(fqdn: Option<&str>, ip: Option<&str>) -> SubmitRequest {
        SubmitRequest {
            uuid: "a1".to_string(),
            fqdn: fqdn.map(str::to_string),
            ip: ip.map(str::to_string),
        }
    }

    #[test]
    fn test_fqdn_selects_host_lookup() {
        let job = Job::try_from(submit(Some("example.com"), None)).unwrap();
        assert_eq!(job, Job::host("a1", "example.com"));
        assert!(job.query.is_host_lookup());
    }

    #[test]
    fn test_ip_selects_address_lookup() {
        let job = Job::try_from(submit(None, Some("192.0.2.1"))).unwrap();
        assert_eq!(job.query, JobQuery::Address("192.0.2.1".to_string()));
        assert!(!job.query.is_host_lookup());
    }

    #[test]
    fn test_fqdn_wins_when_both_present() {
        let job = Job::try_from(submit(Some("example.com"), Some("192.0.2.1"))).unwrap();
        assert_eq!(job.query.as_str(), "example.com");
    }

    #[test]
    fn test_missing_query_rejected() {
        assert_eq!(Job::try_from(submit(None, None)), Err(MissingQuery));
    }

    #[test]
    fn test_submit_request_wire_format() {
        let req: SubmitRequest =
            serde_json::from_str(r#"{"uuid":"a1","ip":"192.0.2.1"}"#).unwrap();
        assert_eq!(req.uuid, "a1");
        assert!(req.fqdn.is_none());
        assert_eq!(req.ip.as_deref(), Some("192.0.2.1"));
    }

    #[test]
    fn test_record_uses_camel_case() {
        let record = ResolvedRecord {
            uuid: "a1".to_string(),
            query: "example.com".to_string(),
            is_host_lookup: true,
            result: String::new(),
            resolved_at: Utc::now(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["isHostLookup"], true);
        assert!(value.get("resolvedAt").is_some());
    }

    #[test]
    fn test_envelopes() {
        let ok = serde_json::to_value(ApiResponse::ok()).unwrap();
        assert_eq!(ok, serde_json::json!({"error": false, "msg": "ok"}));

        let miss = serde_json::to_value(ApiResponse::failure("No such resolved UUID")).unwrap();
        assert_eq!(miss, serde_json::json!({"error": true, "msg": "No such resolved UUID"}));
    }
}
