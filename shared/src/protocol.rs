/// Name this service declares to the dispatch registry
pub const SERVICE_NAME: &str = "service-whois";

/// Capability tags declared at registration
pub const TAG_DNS: &str = "dns";
pub const TAG_IP: &str = "ip";
pub const SERVICE_TAGS: [&str; 2] = [TAG_DNS, TAG_IP];

/// WHOIS directive prefixed to domain queries
pub const DOMAIN_DIRECTIVE: &str = "domain";

/// Well-known WHOIS TCP port (RFC 3912)
pub const WHOIS_PORT: u16 = 43;

/// API paths
pub const RESOLVE_PATH: &str = "/resolve";
pub const RESOLVED_PATH: &str = "/resolved";

/// Registry paths, relative to the registry base URL
pub const REGISTRY_REGISTER_PATH: &str = "/register";
pub const REGISTRY_SERVICE_PATH: &str = "/service/uuid";

/// Response messages
pub const MSG_OK: &str = "ok";
pub const MSG_NO_SUCH_RESOLVED: &str = "No such resolved UUID";
pub const MSG_MISSING_QUERY: &str = "Request must include fqdn or ip";

/// Result identifiers accepted on `/resolved/{id}`: `[a-zA-Z0-9-]+`
pub fn is_valid_result_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}
