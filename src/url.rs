//! URL construction: host partition table, cache-bust token, segment resources.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;

/// Maps a segment's partition key (first path component, e.g. `2024` in
/// `2024/05`) to the host serving that partition's assets.
///
/// Unmapped partitions are served from the origin. Table entries without a
/// scheme inherit the origin's scheme.
#[derive(Debug, Clone)]
pub struct HostTable {
    origin: String,
    hosts: BTreeMap<String, String>,
}

impl HostTable {
    /// Build a table for `origin`. When the origin is a `localhost` address
    /// the partition table is ignored so a local mirror serves everything.
    pub fn new(origin: &str, hosts: BTreeMap<String, String>) -> Self {
        let origin = origin.trim_end_matches('/').to_string();
        let scheme = scheme_of(&origin);
        let hosts = if host_of(&origin).starts_with("localhost") {
            if !hosts.is_empty() {
                debug!("hosts: origin {origin} is local, ignoring {} partition(s)", hosts.len());
            }
            BTreeMap::new()
        } else {
            hosts
                .into_iter()
                .map(|(partition, host)| {
                    let host = host.trim_end_matches('/');
                    let host = if host.contains("://") {
                        host.to_string()
                    } else {
                        format!("{scheme}://{host}")
                    };
                    (partition, host)
                })
                .collect()
        };
        Self { origin, hosts }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Host for a segment name.
    pub fn resolve(&self, segment: &str) -> &str {
        let partition = segment.split('/').next().unwrap_or(segment);
        self.hosts
            .get(partition)
            .map(String::as_str)
            .unwrap_or(self.origin.as_str())
    }
}

fn scheme_of(origin: &str) -> &str {
    origin.split_once("://").map(|(s, _)| s).unwrap_or("https")
}

fn host_of(origin: &str) -> &str {
    let rest = origin.split_once("://").map(|(_, r)| r).unwrap_or(origin);
    rest.split('/').next().unwrap_or(rest)
}

/// Hourly cache-bust token: whole hours since the Unix epoch in base 36.
pub fn cache_bust_token(now: SystemTime) -> String {
    let hours = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() / 3600)
        .unwrap_or(0);
    to_base36(hours)
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".into();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Directory manifest URL (fetched once, no cache-bust token).
pub fn directory_url(origin: &str) -> String {
    format!("{}/images/dir_index.json", origin.trim_end_matches('/'))
}

/// Resolved URLs for one segment's resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentUrls {
    /// `{host}/images/{segment}`, base for full-size images.
    pub base: String,
    pub manifest: String,
    pub thumbnails: String,
}

impl SegmentUrls {
    pub fn new(hosts: &HostTable, segment: &str, cache_bust: &str) -> Self {
        let base = format!("{}/images/{}", hosts.resolve(segment), segment);
        Self {
            manifest: format!("{base}/entry_index.json?cb={cache_bust}"),
            thumbnails: format!("{base}/thumbnails.jpg?cb={cache_bust}"),
            base,
        }
    }

    /// Full-size image URL for a manifest entry name.
    pub fn image(&self, name: &str) -> String {
        format!("{}/{}", self.base, name)
    }
}
