//! Hostname to organization mapping.

use std::collections::HashMap;

/// Immutable table resolving a request's Host header to an organization name.
///
/// Entries are exact hostnames (`registry.example.com`) or suffix wildcards
/// (`.example.com`, matching any subdomain). Exact entries win; among
/// wildcards the longest suffix wins.
#[derive(Clone, Debug, Default)]
pub struct OrganizationTable {
    exact: HashMap<String, String>,
    wildcards: Vec<(String, String)>,
}

impl OrganizationTable {
    /// Build a table from `(organization, hostnames)` pairs.
    ///
    /// Fails when a hostname is claimed twice or an organization name is not a
    /// valid path segment.
    pub fn new<'a, I, H>(organizations: I) -> crate::Result<Self>
    where
        I: IntoIterator<Item = (&'a str, H)>,
        H: IntoIterator<Item = &'a str>,
    {
        let mut table = Self::default();
        for (org, hostnames) in organizations {
            crate::coordinate::validate_segment(org)
                .map_err(|e| crate::Error::Config(format!("invalid organization name: {e}")))?;
            for hostname in hostnames {
                let hostname = hostname.trim().to_ascii_lowercase();
                if hostname.is_empty() || hostname == "." {
                    return Err(crate::Error::Config(format!(
                        "empty hostname for organization {org}"
                    )));
                }
                if table.contains(&hostname) {
                    return Err(crate::Error::Config(format!(
                        "hostname {hostname} is mapped more than once"
                    )));
                }
                if hostname.starts_with('.') {
                    table.wildcards.push((hostname, org.to_string()));
                } else {
                    table.exact.insert(hostname, org.to_string());
                }
            }
        }
        table.wildcards.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Ok(table)
    }

    fn contains(&self, hostname: &str) -> bool {
        self.exact.contains_key(hostname) || self.wildcards.iter().any(|(h, _)| h == hostname)
    }

    /// Resolve a Host header value (port optional) to an organization.
    pub fn resolve(&self, host: &str) -> crate::Result<&str> {
        let hostname = strip_port(host.trim()).to_ascii_lowercase();
        if let Some(org) = self.exact.get(&hostname) {
            return Ok(org);
        }
        self.wildcards
            .iter()
            .find(|(suffix, _)| hostname.ends_with(suffix.as_str()))
            .map(|(_, org)| org.as_str())
            .ok_or_else(|| crate::Error::UnknownHost(hostname))
    }

    /// Distinct organization names in the table.
    pub fn organizations(&self) -> Vec<&str> {
        let mut orgs: Vec<&str> = self
            .exact
            .values()
            .chain(self.wildcards.iter().map(|(_, org)| org))
            .map(String::as_str)
            .collect();
        orgs.sort_unstable();
        orgs.dedup();
        orgs
    }
}

/// Strip a `:port` suffix, keeping bracketed IPv6 literals intact.
fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        return match rest.find(']') {
            Some(end) => &host[..end + 2],
            None => host,
        };
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}
