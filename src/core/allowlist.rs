use std::collections::HashSet;

/// Environment variable holding extra allowed hosts as a comma-separated
/// list, e.g. `DEVPROXY_ALLOWED_HOSTS="webserver, annotator.local"`.
pub const ALLOWED_HOSTS_ENV: &str = "DEVPROXY_ALLOWED_HOSTS";

/// Aliases under which the dev server can always reach itself.
const LOOPBACK_ALIASES: &[&str] = &["localhost", "127.0.0.1", "::1"];

/// The set of Host header values this server answers for. Built once at
/// startup and read-only afterwards; requests whose Host is not in the set
/// are rejected before any routing attempt.
#[derive(Debug)]
pub struct HostAllowlist {
    hosts: HashSet<String>,
}

impl HostAllowlist {
    /// Merge the loopback aliases, the configured hosts, and an externally
    /// supplied comma-separated list (entries trimmed, empty ones dropped).
    pub fn new(configured: &[String], external: Option<&str>) -> Self {
        let mut hosts: HashSet<String> =
            LOOPBACK_ALIASES.iter().map(|h| h.to_string()).collect();
        hosts.extend(configured.iter().map(|h| h.trim().to_string()));
        hosts.extend(
            external
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(str::to_string),
        );
        hosts.remove("");
        Self { hosts }
    }

    /// Build from config plus the DEVPROXY_ALLOWED_HOSTS environment
    /// variable. An unset or unreadable variable counts as empty; a broken
    /// environment must not keep the dev server from starting.
    pub fn from_env(configured: &[String]) -> Self {
        let external = std::env::var(ALLOWED_HOSTS_ENV).ok();
        Self::new(configured, external.as_deref())
    }

    /// Exact, case-sensitive match on the hostname as presented in the Host
    /// header, after stripping an optional port. No DNS, no wildcards.
    pub fn is_allowed(&self, host: &str) -> bool {
        self.hosts.contains(host_without_port(host).as_ref())
    }
}

/// Drop a trailing `:port` from a Host header value, unwrapping bracketed
/// IPv6 literals. A bare IPv6 address (more than one colon, no brackets) is
/// returned as-is.
fn host_without_port(raw: &str) -> std::borrow::Cow<'_, str> {
    let trimmed = raw.trim();

    if let Some(rest) = trimmed.strip_prefix('[') {
        if let Some(end) = rest.find(']') {
            return rest[..end].into();
        }
        return trimmed.into();
    }

    if trimmed.chars().filter(|c| *c == ':').count() == 1 {
        if let Some((host, _port)) = trimmed.rsplit_once(':') {
            return host.into();
        }
    }

    trimmed.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_aliases_are_always_allowed() {
        let allowlist = HostAllowlist::new(&[], None);
        assert!(allowlist.is_allowed("localhost"));
        assert!(allowlist.is_allowed("127.0.0.1"));
        assert!(allowlist.is_allowed("localhost:8080"));
        assert!(allowlist.is_allowed("[::1]:8080"));
    }

    #[test]
    fn configured_hosts_are_allowed() {
        let allowlist = HostAllowlist::new(&["webserver".to_string()], None);
        assert!(allowlist.is_allowed("webserver"));
        assert!(allowlist.is_allowed("webserver:8080"));
    }

    #[test]
    fn unknown_hosts_are_rejected() {
        let allowlist = HostAllowlist::new(&["webserver".to_string()], None);
        assert!(!allowlist.is_allowed("evil.example.com"));
        assert!(!allowlist.is_allowed("webserver.evil.example.com"));
        assert!(!allowlist.is_allowed(""));
    }

    #[test]
    fn comparison_is_case_sensitive() {
        let allowlist = HostAllowlist::new(&["webserver".to_string()], None);
        assert!(!allowlist.is_allowed("WebServer"));
        assert!(!allowlist.is_allowed("LOCALHOST"));
    }

    #[test]
    fn external_list_is_split_trimmed_and_filtered() {
        let allowlist = HostAllowlist::new(&[], Some(" annotator.local ,, webserver,\t"));
        assert!(allowlist.is_allowed("annotator.local"));
        assert!(allowlist.is_allowed("webserver"));
        // The blank entries between commas must not admit the empty host.
        assert!(!allowlist.is_allowed(""));
    }

    #[test]
    fn absent_external_list_means_base_set_only() {
        let allowlist = HostAllowlist::new(&[], None);
        assert!(allowlist.is_allowed("localhost"));
        assert!(!allowlist.is_allowed("webserver"));
    }

    #[test]
    fn port_is_stripped_before_comparison() {
        let allowlist = HostAllowlist::new(&["webserver".to_string()], None);
        assert!(allowlist.is_allowed("webserver:5001"));
        // A second colon means an unbracketed IPv6 literal, not a port.
        assert!(!allowlist.is_allowed("fe80::1"));
    }
}
