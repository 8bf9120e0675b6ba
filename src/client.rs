use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tracing::{debug, info, warn};

use crate::answer::DnsAnswer;
use crate::cache::Cache;
use crate::config::{ResolverConfig, DNS_PORT};
use crate::error::{ResolveError, TransportError};
use crate::header::{ResourceType, ResponseCode};
use crate::packet::{is_subdomain, DnsPacket, Referral};
use crate::serialization::validate_domain;
use crate::transport::Transport;

/// What one reply tells the resolver to do next.
#[derive(Debug)]
enum Step {
    Answer(Vec<DnsAnswer>),
    /// The name is an alias; `hops` CNAMEs were followed inside the reply
    /// without reaching records of the wanted type.
    Alias { target: String, hops: usize },
    Referral(Referral),
}

/// The resolver engine. Owns the caches for the life of the process and
/// talks to nameservers through `T`.
pub struct DnsClient<T>
where
    T: Transport,
{
    transport: T,
    cache: Cache,
    /// Nameserver addresses learned from referrals. Only used to reach a
    /// zone's servers, never to answer a lookup.
    glue: Cache,
    config: ResolverConfig,
}

impl<T> DnsClient<T>
where
    T: Transport,
{
    pub fn new(transport: T, config: ResolverConfig) -> Self {
        DnsClient {
            transport,
            cache: Cache::new(config.cache_capacity),
            glue: Cache::new(config.cache_capacity),
            config,
        }
    }

    pub fn cache_mut(&mut self) -> &mut Cache {
        &mut self.cache
    }

    /// Resolves `hostname` to the first IPv4 address found. With
    /// `nameserver` set, only that server (and whoever it refers to) is
    /// asked.
    pub fn resolve(
        &mut self,
        hostname: &str,
        nameserver: Option<SocketAddr>,
    ) -> Result<Ipv4Addr, ResolveError> {
        let records = self.lookup(hostname, ResourceType::A, nameserver)?;
        records
            .iter()
            .find_map(DnsAnswer::ipv4)
            .ok_or_else(|| ResolveError::NoRecords(hostname.to_owned()))
    }

    /// Finds the name an address points back to through its in-addr.arpa
    /// PTR record.
    pub fn reverse(
        &mut self,
        addr: Ipv4Addr,
        nameserver: Option<SocketAddr>,
    ) -> Result<String, ResolveError> {
        let name = reverse_name(addr);
        let records = self.lookup(&name, ResourceType::Pointer, nameserver)?;
        records
            .iter()
            .find_map(|record| record.target().map(str::to_owned))
            .ok_or(ResolveError::NoRecords(name))
    }

    pub fn lookup(
        &mut self,
        name: &str,
        rtype: ResourceType,
        nameserver: Option<SocketAddr>,
    ) -> Result<Vec<DnsAnswer>, ResolveError> {
        validate_domain(name).map_err(|source| ResolveError::InvalidName {
            name: name.to_owned(),
            source,
        })?;
        let start = match nameserver.or(self.config.nameserver) {
            Some(server) => vec![server],
            None => self.config.root_servers.clone(),
        };
        self.lookup_from(name, rtype, &start, 0)
    }

    /// The resolution loop. `depth` counts referrals and aliases followed so
    /// far, including those of the lookups that led here, so nested lookups
    /// for nameserver addresses share one budget.
    fn lookup_from(
        &mut self,
        name: &str,
        rtype: ResourceType,
        start: &[SocketAddr],
        mut depth: usize,
    ) -> Result<Vec<DnsAnswer>, ResolveError> {
        let mut qname = name.trim_end_matches('.').to_owned();
        let mut servers = start.to_vec();
        let mut zone: Option<String> = None;
        let mut aliases = 0;

        loop {
            if depth > self.config.max_referral_depth || aliases > self.config.max_cname_depth {
                warn!(name, depth, aliases, "giving up");
                return Err(ResolveError::ResolutionDepthExceeded(name.to_owned()));
            }

            if let Some(records) = self.cache.get(&qname, rtype) {
                debug!(name = %qname, ?rtype, "answered from cache");
                return Ok(records);
            }
            if let Some(target) = self.cached_alias(&qname) {
                debug!(alias = %qname, %target, "alias from cache");
                qname = target;
                servers = start.to_vec();
                zone = None;
                aliases += 1;
                depth += 1;
                continue;
            }

            let response = self.query_servers(&servers, &qname, rtype)?;
            match self.process(&response, &qname, rtype)? {
                Step::Answer(records) => {
                    info!(name = %qname, ?rtype, count = records.len(), "resolved");
                    return Ok(records);
                }
                Step::Alias { target, hops } => {
                    debug!(alias = %qname, %target, "following cname");
                    qname = target;
                    servers = start.to_vec();
                    zone = None;
                    aliases += hops;
                    depth += 1;
                }
                Step::Referral(referral) => {
                    if let Some(current) = &zone {
                        if !is_closer(&referral.zone, current) {
                            warn!(zone = %referral.zone, %current, "referral does not get closer to the name");
                            return Err(ResolveError::ResolutionDepthExceeded(name.to_owned()));
                        }
                    }
                    debug!(zone = %referral.zone, nameservers = ?referral.nameservers, "following referral");
                    servers = self.referral_servers(&response, &referral, start, depth)?;
                    zone = Some(referral.zone);
                    depth += 1;
                }
            }
        }
    }

    fn cached_alias(&mut self, name: &str) -> Option<String> {
        self.cache
            .get(name, ResourceType::CName)?
            .first()?
            .target()
            .map(str::to_owned)
    }

    /// Asks each server in turn until one gives an answer or NXDOMAIN.
    fn query_servers(
        &mut self,
        servers: &[SocketAddr],
        qname: &str,
        rtype: ResourceType,
    ) -> Result<DnsPacket, ResolveError> {
        let request = DnsPacket::new_query(qname, rtype, 0);
        let mut failure = None;
        for &server in servers {
            debug!(%server, name = qname, ?rtype, "querying");
            match self.transport.query(server, &request, self.config.timeout) {
                Ok(reply) => match reply.header.response_code {
                    ResponseCode::NoError | ResponseCode::NameError => return Ok(reply),
                    rcode => {
                        warn!(%server, ?rcode, "nameserver failed the query");
                        failure = Some(ResolveError::ServerFailure {
                            name: qname.to_owned(),
                            rcode,
                        });
                    }
                },
                Err(e) => {
                    warn!(%server, error = %e, "no usable reply");
                    failure = Some(match e {
                        TransportError::Timeout(_) | TransportError::Unreachable(_) => {
                            ResolveError::NameserverUnreachable(e)
                        }
                        other => ResolveError::Transport(other),
                    });
                }
            }
        }
        Err(failure.unwrap_or_else(|| ResolveError::NoNameservers(qname.to_owned())))
    }

    fn process(
        &mut self,
        response: &DnsPacket,
        qname: &str,
        rtype: ResourceType,
    ) -> Result<Step, ResolveError> {
        if response.header.response_code == ResponseCode::NameError {
            return Err(ResolveError::NoSuchName(qname.to_owned()));
        }

        let mut current = qname.to_owned();
        let mut hops = 0;
        loop {
            let records = response.answers_for(&current, rtype);
            if !records.is_empty() {
                self.cache.put_records(&current, rtype, records.clone());
                return Ok(Step::Answer(records));
            }
            let alias = match response.cname_for(&current) {
                Some(alias) if hops <= self.config.max_cname_depth => alias.clone(),
                _ => break,
            };
            let target = match alias.target() {
                Some(target) => target.to_owned(),
                None => break,
            };
            self.cache.put_records(&current, ResourceType::CName, vec![alias]);
            current = target;
            hops += 1;
        }
        if hops > 0 {
            return Ok(Step::Alias { target: current, hops });
        }

        match response.referral_for(qname) {
            Some(referral) => Ok(Step::Referral(referral)),
            None => Err(ResolveError::NoRecords(qname.to_owned())),
        }
    }

    /// Addresses of a referral's nameservers: glue from the reply first,
    /// then glue kept from earlier referrals, then a lookup of each name
    /// until one resolves.
    fn referral_servers(
        &mut self,
        response: &DnsPacket,
        referral: &Referral,
        start: &[SocketAddr],
        depth: usize,
    ) -> Result<Vec<SocketAddr>, ResolveError> {
        let mut servers = Vec::new();
        for nameserver in &referral.nameservers {
            let glue = response.glue_for(nameserver);
            servers.extend(glue.iter().filter_map(DnsAnswer::ipv4).map(to_socket_addr));
            // glue outside the delegated zone is good for this hop only
            if is_subdomain(nameserver, &referral.zone) {
                self.glue.put_records(nameserver, ResourceType::A, glue);
            }
        }
        if servers.is_empty() {
            for nameserver in &referral.nameservers {
                if let Some(glue) = self.glue.get(nameserver, ResourceType::A) {
                    debug!(%nameserver, "using glue from an earlier referral");
                    servers.extend(glue.iter().filter_map(DnsAnswer::ipv4).map(to_socket_addr));
                }
            }
        }
        if !servers.is_empty() {
            return Ok(servers);
        }

        for nameserver in &referral.nameservers {
            debug!(%nameserver, "referral has no glue, resolving nameserver");
            match self.lookup_from(nameserver, ResourceType::A, start, depth + 1) {
                Ok(records) => {
                    servers.extend(records.iter().filter_map(DnsAnswer::ipv4).map(to_socket_addr));
                    if !servers.is_empty() {
                        return Ok(servers);
                    }
                }
                Err(e @ ResolveError::ResolutionDepthExceeded(_)) => return Err(e),
                Err(e) => warn!(%nameserver, error = %e, "could not resolve nameserver"),
            }
        }
        Err(ResolveError::NoNameservers(referral.zone.clone()))
    }
}

/// Whether `zone` is strictly below `current`.
fn is_closer(zone: &str, current: &str) -> bool {
    is_subdomain(zone, current) && zone.trim_end_matches('.').len() > current.trim_end_matches('.').len()
}

fn to_socket_addr(ip: Ipv4Addr) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(ip), DNS_PORT)
}

/// `1.2.3.4` becomes `4.3.2.1.in-addr.arpa`.
pub fn reverse_name(addr: Ipv4Addr) -> String {
    let [a, b, c, d] = addr.octets();
    format!("{}.{}.{}.{}.in-addr.arpa", d, c, b, a)
}
