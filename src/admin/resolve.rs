//! Resolution of free-form `host[:port]` strings into datanode identities

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use http::Uri;

use silo_cluster::node::DatanodeInfo;
use silo_cluster::registry::NodeRegistry;

use crate::error::AdminError;

/// Parsed form of a `host[:port]` input string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostDefinition {
	/// The input exactly as given, for error reporting
	pub raw: String,
	/// The host component
	pub hostname: String,
	/// The port component, if one was given
	pub port: Option<u16>,
}

impl HostDefinition {
	/// Parse by reading the input as the authority component of a URI, so
	/// that bracketed IPv6 literals and port separators follow standard
	/// authority rules instead of ad-hoc splitting
	pub fn parse(input: &str) -> Result<Self, AdminError> {
		let uri = format!("empty://{}", input.trim())
			.parse::<Uri>()
			.map_err(|e| AdminError::invalid_host(input, format!("cannot be parsed: {}", e)))?;
		let host = match uri.host() {
			Some(host) if !host.is_empty() => host,
			_ => {
				return Err(AdminError::invalid_host(
					input,
					"does not contain a valid hostname",
				));
			}
		};
		Ok(Self {
			raw: input.to_string(),
			hostname: host
				.trim_start_matches('[')
				.trim_end_matches(']')
				.to_string(),
			port: uri.port_u16(),
		})
	}
}

/// Result of resolving a host through a name service
#[derive(Debug, Clone)]
pub struct ResolvedHost {
	pub addr: IpAddr,
	/// Canonical hostname of the address, from a reverse lookup
	pub hostname: String,
}

/// Forward and reverse name resolution. The system implementation asks the
/// platform resolver; statically addressed clusters and tests answer from a
/// fixed table instead.
#[async_trait]
pub trait NameService: Send + Sync {
	async fn lookup(&self, host: &str) -> Result<ResolvedHost, std::io::Error>;
}

/// Name service backed by the platform resolver
pub struct DnsNameService;

#[async_trait]
impl NameService for DnsNameService {
	async fn lookup(&self, host: &str) -> Result<ResolvedHost, std::io::Error> {
		let addr = tokio::net::lookup_host((host, 0u16))
			.await?
			.next()
			.ok_or_else(|| {
				std::io::Error::new(
					std::io::ErrorKind::NotFound,
					format!("no address found for {}", host),
				)
			})?
			.ip();
		// getnameinfo blocks, hand it to the blocking pool
		let hostname = tokio::task::spawn_blocking(move || dns_lookup::lookup_addr(&addr))
			.await
			.map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))??;
		Ok(ResolvedHost { addr, hostname })
	}
}

/// Name service answering from a fixed table. Lookups succeed for the
/// registered hostname and for its address in dotted form.
#[derive(Default)]
pub struct StaticNameService {
	hosts: HashMap<String, ResolvedHost>,
}

impl StaticNameService {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, hostname: &str, addr: IpAddr) -> Self {
		let resolved = ResolvedHost {
			addr,
			hostname: hostname.to_string(),
		};
		self.hosts.insert(hostname.to_string(), resolved.clone());
		self.hosts.insert(addr.to_string(), resolved);
		self
	}
}

#[async_trait]
impl NameService for StaticNameService {
	async fn lookup(&self, host: &str) -> Result<ResolvedHost, std::io::Error> {
		self.hosts.get(host).cloned().ok_or_else(|| {
			std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("unknown host {}", host),
			)
		})
	}
}

/// Translates the host strings given to administrative commands into
/// datanode identities known to the node registry
pub struct HostResolver {
	registry: Arc<dyn NodeRegistry>,
	names: Arc<dyn NameService>,
	use_hostnames: bool,
}

impl HostResolver {
	pub fn new(
		registry: Arc<dyn NodeRegistry>,
		names: Arc<dyn NameService>,
		use_hostnames: bool,
	) -> Self {
		Self {
			registry,
			names,
			use_hostnames,
		}
	}

	/// Resolve a whole batch of host strings. Resolution is all-or-nothing:
	/// the first input that fails aborts the batch before any node changes
	/// state.
	pub async fn resolve(&self, hosts: &[String]) -> Result<Vec<DatanodeInfo>, AdminError> {
		let mut results = Vec::with_capacity(hosts.len());
		for host in hosts {
			results.push(self.resolve_one(host).await?);
		}
		Ok(results)
	}

	async fn resolve_one(&self, input: &str) -> Result<DatanodeInfo, AdminError> {
		let host = HostDefinition::parse(input)?;
		let resolved = self.names.lookup(&host.hostname).await.map_err(|e| {
			AdminError::invalid_host(&host.raw, format!("unable to resolve host: {}", e))
		})?;
		let key = if self.use_hostnames {
			resolved.hostname
		} else {
			resolved.addr.to_string()
		};

		let mut matched = self.registry.get_nodes_by_address(&key).await;
		if matched.is_empty() {
			return Err(AdminError::invalid_host(
				&host.raw,
				"not found in the node registry",
			));
		}
		if matched.len() == 1 {
			let dn = matched.remove(0);
			return match host.port {
				Some(port) if !dn.has_port(port) => Err(AdminError::invalid_host(
					&host.raw,
					format!("port {} is not used by datanode {}", port, dn.id),
				)),
				_ => Ok(dn),
			};
		}
		// Several datanodes advertise the same address; take the first whose
		// ports include the given one. Without a port there is no way to
		// pick, so the input fails.
		matched
			.into_iter()
			.find(|dn| matches!(host.port, Some(port) if dn.has_port(port)))
			.ok_or_else(|| {
				AdminError::invalid_host(
					&host.raw,
					"several datanodes match the address but none matched on port",
				)
			})
	}
}
