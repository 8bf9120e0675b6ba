use std::time::{Duration, Instant};

use tracing::trace;
use ttl_cache::TtlCache;

use crate::answer::DnsAnswer;
use crate::header::ResourceType;

#[derive(Debug, PartialEq, Eq, Hash, Clone)]
struct CacheKey {
    name: String,
    rtype: ResourceType,
}

impl CacheKey {
    fn new(name: &str, rtype: ResourceType) -> Self {
        CacheKey {
            name: name.trim_end_matches('.').to_ascii_lowercase(),
            rtype,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    records: Vec<DnsAnswer>,
    expires_at: Instant,
}

/// Resolved records keyed by (name, type). Entries past their TTL read as
/// absent and are dropped on that read.
pub struct Cache {
    entries: TtlCache<CacheKey, CacheEntry>,
}

impl Cache {
    pub fn new(capacity: usize) -> Self {
        Cache {
            entries: TtlCache::new(capacity),
        }
    }

    pub fn get(&mut self, name: &str, rtype: ResourceType) -> Option<Vec<DnsAnswer>> {
        let key = CacheKey::new(name, rtype);
        let expired = match self.entries.get(&key) {
            Some(entry) if Instant::now() < entry.expires_at => {
                trace!(name, ?rtype, "cache hit");
                return Some(entry.records.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(&key);
        }
        None
    }

    pub fn put(&mut self, name: &str, rtype: ResourceType, records: Vec<DnsAnswer>, ttl_seconds: u32) {
        let ttl = Duration::from_secs(u64::from(ttl_seconds));
        let entry = CacheEntry {
            records,
            expires_at: Instant::now() + ttl,
        };
        self.entries.insert(CacheKey::new(name, rtype), entry, ttl);
    }

    /// Caches `records` for the smallest TTL among them.
    pub fn put_records(&mut self, name: &str, rtype: ResourceType, records: Vec<DnsAnswer>) {
        if let Some(ttl) = records.iter().map(|r| r.ttl).min() {
            self.put(name, rtype, records, ttl);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordData;
    use pretty_assertions::assert_eq;
    use std::net::Ipv4Addr;

    fn a_record(name: &str, ttl: u32, last_octet: u8) -> DnsAnswer {
        DnsAnswer::new(name, ttl, RecordData::A(Ipv4Addr::new(10, 0, 0, last_octet)))
    }

    #[test]
    fn test_get_returns_what_was_put() {
        let mut cache = Cache::new(8);
        let records = vec![a_record("foo.com", 60, 1), a_record("foo.com", 60, 2)];
        cache.put("foo.com", ResourceType::A, records.clone(), 60);
        assert_eq!(Some(records.clone()), cache.get("foo.com", ResourceType::A));
        assert_eq!(Some(records), cache.get("FOO.com.", ResourceType::A));
    }

    #[test]
    fn test_key_includes_type() {
        let mut cache = Cache::new(8);
        cache.put("foo.com", ResourceType::A, vec![a_record("foo.com", 60, 1)], 60);
        assert_eq!(None, cache.get("foo.com", ResourceType::AAAA));
        assert_eq!(None, cache.get("bar.com", ResourceType::A));
    }

    #[test]
    fn test_expired_entry_reads_as_absent() {
        let mut cache = Cache::new(8);
        cache.put("foo.com", ResourceType::A, vec![a_record("foo.com", 0, 1)], 0);
        assert_eq!(None, cache.get("foo.com", ResourceType::A));
        assert_eq!(None, cache.get("foo.com", ResourceType::A));
    }

    #[test]
    fn test_put_records_uses_smallest_ttl() {
        let mut cache = Cache::new(8);
        cache.put_records("foo.com", ResourceType::A, vec![a_record("foo.com", 300, 1), a_record("foo.com", 0, 2)]);
        assert_eq!(None, cache.get("foo.com", ResourceType::A));

        cache.put_records("bar.com", ResourceType::A, vec![a_record("bar.com", 300, 1)]);
        assert!(cache.get("bar.com", ResourceType::A).is_some());
    }

    #[test]
    fn test_put_records_ignores_empty_sets() {
        let mut cache = Cache::new(8);
        cache.put_records("foo.com", ResourceType::A, Vec::new());
        assert_eq!(None, cache.get("foo.com", ResourceType::A));
    }
}
