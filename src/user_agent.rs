//! User-Agent string for upstream traffic.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/sede-proxy";

/// Default User-Agent for every request sent to the identity provider and query service.
#[must_use]
pub(crate) fn default_relay_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("sede-proxy/{version} (query-relay; +{PROJECT_UA_URL})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_carries_version_and_project_url() {
        let ua = default_relay_user_agent();
        assert!(ua.contains(PROJECT_UA_URL), "UA must contain project URL: {ua}");
        assert_eq!(
            ua.strip_prefix("sede-proxy/").and_then(|s| s.split(' ').next()),
            Some(env!("CARGO_PKG_VERSION")),
            "UA must contain crate version"
        );
    }
}
