//! Hypervisor access
//!
//! The console only needs two things from libvirt: the list of domains and
//! each domain's display name. [`Hypervisor`] captures exactly that, and
//! [`VirshConnection`] implements it by driving `virsh` against a fixed
//! connection URI.

use crate::{Error, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command as AsyncCommand;
use tracing::{debug, info};

/// Which domains a listing should include
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainFilter {
    /// Running and defined-but-inactive domains
    All,
    /// Running domains only
    Active,
}

impl DomainFilter {
    pub fn from_active_only(active_only: bool) -> Self {
        if active_only {
            Self::Active
        } else {
            Self::All
        }
    }
}

/// Opaque handle to a domain, resolvable to a name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DomainRef(pub String);

impl DomainRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DomainRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two hypervisor operations the console depends on
#[async_trait]
pub trait Hypervisor: Send + Sync {
    /// List domains matching the filter
    async fn list_domains(&self, filter: DomainFilter) -> Result<Vec<DomainRef>>;

    /// Resolve a domain's display name
    async fn domain_name(&self, domain: &DomainRef) -> Result<String>;
}

#[async_trait]
impl<T: Hypervisor + ?Sized> Hypervisor for std::sync::Arc<T> {
    async fn list_domains(&self, filter: DomainFilter) -> Result<Vec<DomainRef>> {
        (**self).list_domains(filter).await
    }

    async fn domain_name(&self, domain: &DomainRef) -> Result<String> {
        (**self).domain_name(domain).await
    }
}

/// libvirt connection driven through the `virsh` CLI
#[derive(Debug)]
pub struct VirshConnection {
    program: String,
    uri: String,
}

impl VirshConnection {
    /// Open a connection to `uri`, failing if libvirt cannot be reached
    pub async fn open(uri: impl Into<String>) -> Result<Self> {
        Self::open_with_program("virsh", uri).await
    }

    /// Open using an explicit `virsh` binary
    pub async fn open_with_program(
        program: impl Into<String>,
        uri: impl Into<String>,
    ) -> Result<Self> {
        let conn = Self {
            program: program.into(),
            uri: uri.into(),
        };

        // `virsh uri` round-trips through libvirtd, so it proves the URI is usable.
        let canonical = conn.run(&["uri"]).await.map_err(|e| Error::HypervisorConnect {
            uri: conn.uri().to_string(),
            reason: e.to_string(),
        })?;

        info!("Connected to hypervisor at {}", canonical.trim());
        Ok(conn)
    }

    /// Connection URI
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Release the connection
    pub fn close(self) {
        info!("Closing hypervisor connection {}", self.uri());
    }

    async fn run(&self, args: &[&str]) -> Result<String> {
        debug!("{} --connect {} {}", self.program, self.uri, args.join(" "));

        let output = AsyncCommand::new(&self.program)
            .arg("--connect")
            .arg(&self.uri)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::Hypervisor(format!("failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Hypervisor(format!(
                "{} {} exited with {}: {}",
                self.program,
                args.join(" "),
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl Hypervisor for VirshConnection {
    async fn list_domains(&self, filter: DomainFilter) -> Result<Vec<DomainRef>> {
        let stdout = match filter {
            DomainFilter::All => self.run(&["list", "--uuid", "--all"]).await?,
            DomainFilter::Active => self.run(&["list", "--uuid"]).await?,
        };
        Ok(parse_domain_list(&stdout))
    }

    async fn domain_name(&self, domain: &DomainRef) -> Result<String> {
        let stdout = self
            .run(&["domname", domain.as_str()])
            .await
            .map_err(|e| Error::DomainLookup {
                domain: domain.to_string(),
                reason: e.to_string(),
            })?;

        let name = stdout.trim();
        if name.is_empty() {
            return Err(Error::DomainLookup {
                domain: domain.to_string(),
                reason: "empty name".to_string(),
            });
        }
        Ok(name.to_string())
    }
}

/// Parse `virsh list --uuid` output: one id per line, blank lines ignored
pub fn parse_domain_list(stdout: &str) -> Vec<DomainRef> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(DomainRef::new)
        .collect()
}
