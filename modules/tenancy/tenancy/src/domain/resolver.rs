//! Tenant identity resolution.
//!
//! Derives a tenant slug from the request's host (or forwarded host,
//! referer, or an explicit parameter), then resolves the slug to a tenant
//! record through the [`TenantDirectory`] collaborator.
//!
//! Resolution is deliberately memoryless: it runs per request and caches
//! nothing, because host-to-tenant mappings can change administratively.

use std::sync::Arc;

use tenancy_sdk::{ResolvedTenant, TenancyError, TenantDirectory};

use crate::config::ResolverConfig;
use crate::domain::domain_map::DomainMap;

/// Host-related request inputs, already extracted from headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostInfo<'a> {
    /// `Host` header value.
    pub host: Option<&'a str>,
    /// `X-Forwarded-Host`, preferred over `host` when present.
    pub forwarded_host: Option<&'a str>,
    /// `Referer` header, used only as a last-resort development convenience.
    pub referer: Option<&'a str>,
}

pub struct TenantResolver {
    cfg: ResolverConfig,
    domains: DomainMap,
    directory: Arc<dyn TenantDirectory>,
}

impl TenantResolver {
    #[must_use]
    pub fn new(cfg: ResolverConfig, directory: Arc<dyn TenantDirectory>) -> Self {
        let domains = DomainMap::new(cfg.custom_domains.clone());
        Self {
            cfg,
            domains,
            directory,
        }
    }

    /// Resolve the request to a tenant.
    ///
    /// # Errors
    /// - [`TenancyError::TenantNotResolved`] when no slug can be derived
    /// - [`TenancyError::TenantNotFound`] when a slug matches no tenant
    pub async fn resolve(
        &self,
        hosts: HostInfo<'_>,
        explicit_slug: Option<&str>,
    ) -> Result<ResolvedTenant, TenancyError> {
        let slug = self
            .derive_slug(hosts, explicit_slug)
            .ok_or(TenancyError::TenantNotResolved)?;

        let tenant = self
            .directory
            .find_by_slug(&slug)
            .await?
            .ok_or(TenancyError::TenantNotFound { slug: slug.clone() })?;

        Ok(ResolvedTenant {
            tenant_id: tenant.id,
            slug: tenant.slug,
        })
    }

    /// Ordered slug derivation, first match wins.
    #[must_use]
    pub fn derive_slug(&self, hosts: HostInfo<'_>, explicit_slug: Option<&str>) -> Option<String> {
        let host = hosts
            .forwarded_host
            .or(hosts.host)
            .map(strip_port)
            .map(str::to_lowercase);

        if let Some(host) = host.as_deref() {
            if let Some(root) = self.cfg.root_domain.as_deref() {
                if let Some(slug) = strip_domain_suffix(host, root) {
                    return Some(slug);
                }
            }
            if let Some(slug) = strip_domain_suffix(host, &self.cfg.dev_suffix) {
                return Some(slug);
            }
            if let Some(slug) = self.domains.slug_for(host) {
                return Some(slug.to_owned());
            }
        }

        if let Some(slug) = explicit_slug {
            if !slug.is_empty() {
                return Some(slug.to_owned());
            }
        }

        if let Some(slug) = hosts.referer.and_then(|r| self.slug_from_referer(r)) {
            return Some(slug);
        }

        self.cfg.default_slug.clone()
    }

    /// Apply the host rules to the referer's host. Covers local tools that
    /// hit the API by IP while the browser sits on a tenant subdomain.
    fn slug_from_referer(&self, referer: &str) -> Option<String> {
        let url = url::Url::parse(referer).ok()?;
        let host = url.host_str()?.to_lowercase();
        if let Some(root) = self.cfg.root_domain.as_deref() {
            if let Some(slug) = strip_domain_suffix(&host, root) {
                return Some(slug);
            }
        }
        strip_domain_suffix(&host, &self.cfg.dev_suffix)
    }
}

/// `<slug>.<suffix>` -> `slug`. Empty remainders (the bare suffix) yield
/// nothing.
fn strip_domain_suffix(host: &str, suffix: &str) -> Option<String> {
    if suffix.is_empty() {
        return None;
    }
    let suffix = suffix.trim_start_matches('.');
    let rest = host.strip_suffix(suffix)?;
    let rest = rest.strip_suffix('.')?;
    if rest.is_empty() {
        None
    } else {
        Some(rest.to_owned())
    }
}

fn strip_port(host: &str) -> &str {
    host.rsplit_once(':').map_or(host, |(h, _)| h)
}
