//! Keeps page fetches on the public internet.
//!
//! Three layers: the submitted host is resolved and vetted before any request,
//! the client's resolver drops non-public addresses at connect time (so a
//! rebinding DNS answer cannot slip through), and the redirect policy refuses
//! hops to literal non-public IPs, which never reach the resolver.

use std::error::Error;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::redirect::{Attempt, Policy};
use tracing::warn;
use url::{Host, Url};

use super::ExtractionError;

/// Whether `ip` is routable on the public internet.
#[must_use]
pub fn is_public_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_public_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_public_v4(v4),
            None => is_public_v6(v6),
        },
    }
}

fn is_public_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    let shared = a == 100 && (64..128).contains(&b);
    let reserved = a >= 240;
    !(ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_documentation()
        || ip.is_multicast()
        || a == 0
        || shared
        || reserved)
}

fn is_public_v6(ip: Ipv6Addr) -> bool {
    !(ip.is_loopback()
        || ip.is_unspecified()
        || ip.is_multicast()
        || ip.is_unique_local()
        || ip.is_unicast_link_local())
}

/// Literal IP in `url`'s host, if it has one.
fn literal_ip(url: &Url) -> Option<IpAddr> {
    match url.host()? {
        Host::Ipv4(v4) => Some(IpAddr::V4(v4)),
        Host::Ipv6(v6) => Some(IpAddr::V6(v6)),
        Host::Domain(_) => None,
    }
}

/// Reject `url` unless every address its host resolves to is public.
///
/// # Errors
///
/// Returns `ExtractionError::InvalidUrl` for a non-public or unresolvable
/// host.
pub async fn ensure_public(url: &Url) -> Result<(), ExtractionError> {
    if let Some(ip) = literal_ip(url) {
        return if is_public_ip(ip) {
            Ok(())
        } else {
            Err(not_public())
        };
    }

    let host = url
        .host_str()
        .ok_or_else(|| ExtractionError::InvalidUrl("url has no host".to_string()))?;
    let port = url.port_or_known_default().unwrap_or(443);

    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
        .await
        .map_err(|_| ExtractionError::InvalidUrl(format!("cannot resolve host: {host}")))?
        .collect();

    if addrs.is_empty() || addrs.iter().any(|addr| !is_public_ip(addr.ip())) {
        warn!(host = %host, "refusing to fetch non-public host");
        return Err(not_public());
    }
    Ok(())
}

fn not_public() -> ExtractionError {
    ExtractionError::InvalidUrl("host is not publicly routable".to_string())
}

/// Redirect policy: at most `max` hops, http(s) only, no literal non-public
/// IPs. Named hosts are vetted by [`PublicResolver`] when connecting.
#[must_use]
pub fn redirect_policy(max: usize) -> Policy {
    Policy::custom(move |attempt: Attempt| {
        if attempt.previous().len() >= max {
            return attempt.error("too many redirects");
        }
        let url = attempt.url();
        if !matches!(url.scheme(), "http" | "https") {
            return attempt.error("redirect to unsupported scheme");
        }
        if literal_ip(url).is_some_and(|ip| !is_public_ip(ip)) {
            return attempt.error("redirect to non-public address");
        }
        attempt.follow()
    })
}

/// DNS resolver that only hands out public addresses.
#[derive(Debug, Default, Clone, Copy)]
pub struct PublicResolver;

impl Resolve for PublicResolver {
    fn resolve(&self, name: Name) -> Resolving {
        Box::pin(resolve_public(name.as_str().to_string()))
    }
}

async fn resolve_public(host: String) -> Result<Addrs, Box<dyn Error + Send + Sync>> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host.as_str(), 0))
        .await?
        .filter(|addr| is_public_ip(addr.ip()))
        .collect();

    if addrs.is_empty() {
        warn!(host = %host, "resolved only to non-public addresses");
        return Err(format!("{host} does not resolve to a public address").into());
    }
    Ok(Box::new(addrs.into_iter()))
}
