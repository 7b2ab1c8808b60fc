//! Frontend routing maps
//!
//! Walks the finalized hosts and fills the maps the proxy uses to dispatch a
//! request: host and SNI to backend, HTTPS redirect, ssl-passthrough, body
//! size limits, client certificate errors, and the certificate list.
//!
//! Some maps use yes/no answers instead of a found/missing list. This avoids
//! overlap when a `/path` has a feature that a declared `/path/sub` doesn't,
//! or when a wildcard or alias has a feature a declared hostname doesn't.

use crate::config::{Config, ModelSnapshot};
use crate::writer::{write_maps, MapWriter};
use crate::{CoreError, Result};
use router_api::{non_empty, Backend, FrontendGroup, Host, HostPath};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Value of the namespace map when a host doesn't expose it
pub const NAMESPACE_PLACEHOLDER: &str = "-";

fn yesno(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

impl Config {
    /// Compile and persist the frontend maps
    ///
    /// Nothing is written if any host fails to compile. A writer failure
    /// leaves the maps already written in place; the whole build must be
    /// retried.
    pub fn build_frontend_group<W: MapWriter + ?Sized>(&mut self, writer: &W) -> Result<()> {
        let fgroup = compile_frontend_group(self.snapshot())?;
        write_maps(fgroup.maps(), writer)?;
        info!(
            "Built frontend maps: {} hosts, {} certificate entries",
            self.hosts.items.len(),
            fgroup.crt_list.match_entries.len()
        );
        self.fgroup = Some(fgroup);
        Ok(())
    }
}

/// Build the frontend maps of a finalized model, without persisting them
pub fn compile_frontend_group(model: ModelSnapshot<'_>) -> Result<FrontendGroup> {
    let mut fgroup = FrontendGroup::new(model.maps_dir, model.frontend);
    fgroup.crt_list.append_item(model.default_x509_cert);
    for host in &model.hosts.items {
        if host.ssl_passthrough {
            add_ssl_passthrough_host(&mut fgroup, model, host)?;
        } else {
            add_http_host(&mut fgroup, model, host);
        }
    }
    Ok(fgroup)
}

fn resolve_backend<'a>(model: ModelSnapshot<'a>, path: &HostPath) -> Option<&'a Backend> {
    path.backend.as_ref().and_then(|key| model.backends.get(key))
}

fn add_ssl_passthrough_host(
    fgroup: &mut FrontendGroup,
    model: ModelSnapshot<'_>,
    host: &Host,
) -> Result<()> {
    let root_path = host
        .find_path("/")
        .ok_or_else(|| CoreError::MissingRootPath {
            hostname: host.hostname.clone(),
        })?;
    match resolve_backend(model, root_path) {
        Some(backend) => fgroup
            .ssl_passthrough_map
            .append_hostname(&host.hostname, &backend.id),
        None => warn!("ssl-passthrough host {} has no backend", host.hostname),
    }
    let root = format!("{}/", host.hostname);
    let http_backend = non_empty(&host.http_passthrough_backend);
    fgroup
        .https_redir_map
        .append_hostname(&root, yesno(http_backend.is_none()));
    if let Some(http_backend) = http_backend {
        fgroup.http_fronts_map.append_hostname(&root, http_backend);
    }
    Ok(())
}

fn add_http_host(fgroup: &mut FrontendGroup, model: ModelSnapshot<'_>, host: &Host) {
    let alias_name = non_empty(&host.alias.alias_name).filter(|alias| {
        let shadowed = model.hosts.find_host(alias).is_some();
        if shadowed {
            warn!(
                "Ignoring alias {} of host {}: declared as a host",
                alias, host.hostname
            );
        }
        !shadowed
    });
    let alias_regex = non_empty(&host.alias.alias_regex);
    let has_tls_auth = host.has_tls_auth();
    let fronting_proxy = model.global.bind.has_fronting_proxy();

    let mut max_body_sizes: HashMap<String, i64> = HashMap::new();
    for path in &host.paths {
        let backend = resolve_backend(model, path);
        let base = format!("{}{}", host.hostname, path.path);
        let has_ssl_redirect =
            host.has_tls() && backend.is_some_and(|b| b.has_ssl_redirect_hostpath(&base));
        fgroup
            .https_redir_map
            .append_hostname(&base, yesno(has_ssl_redirect));

        let Some(backend) = backend else {
            warn!("Skipping {}: backend not found", base);
            continue;
        };
        let alias_name = alias_name.map(|alias| format!("{}{}", alias, path.path));
        let alias_regex = alias_regex.map(|regex| format!("{}{}", regex, path.path));
        let backends_map = if has_tls_auth {
            &mut fgroup.sni_backends_map
        } else {
            &mut fgroup.host_backends_map
        };
        backends_map.append_hostname(&base, &backend.id);
        backends_map.append_alias_name(alias_name.as_deref(), &backend.id);
        backends_map.append_alias_regex(alias_regex.as_deref(), &backend.id);

        let max_body_size = backend.max_body_size_hostpath(&base);
        if max_body_size > 0 {
            max_body_sizes.insert(base.clone(), max_body_size);
        }
        if !has_ssl_redirect || fronting_proxy {
            fgroup.http_fronts_map.append_hostname(&base, &backend.id);
        }
        let namespace = if host.var_namespace {
            backend.namespace.as_str()
        } else {
            NAMESPACE_PLACEHOLDER
        };
        fgroup.var_namespace_map.append_hostname(&base, namespace);
    }

    if !max_body_sizes.is_empty() {
        // every path of the host, so a shorter prefix doesn't leak its limit; 0 is unlimited
        for path in &host.paths {
            let base = format!("{}{}", host.hostname, path.path);
            let size = max_body_sizes.get(&base).copied().unwrap_or(0);
            fgroup
                .max_body_size_map
                .append_hostname(&base, &size.to_string());
        }
    }

    if has_tls_auth {
        let verify_required = !host.tls.ca_verify_optional;
        fgroup
            .tls_invalid_crt_error_list
            .append_hostname(&host.hostname, "");
        if verify_required {
            fgroup.tls_no_crt_error_list.append_hostname(&host.hostname, "");
        }
        if let Some(page) = non_empty(&host.tls.ca_error_page) {
            fgroup
                .tls_invalid_crt_error_pages_map
                .append_hostname(&host.hostname, page);
            if verify_required {
                fgroup
                    .tls_no_crt_error_pages_map
                    .append_hostname(&host.hostname, page);
            }
        }
    }

    if let Some(target) = non_empty(&host.root_redirect) {
        fgroup.http_root_redir_map.append_hostname(&host.hostname, target);
        fgroup.root_redir_map.append_hostname(&host.hostname, target);
    }
    fgroup.use_server_list.append_hostname(&host.hostname, "");

    if let Some(entry) = crt_list_entry(host, model.default_x509_cert) {
        debug!("Certificate binding: {}", entry);
        fgroup.crt_list.append_item(&entry);
    }
}

/// Certificate list line of a host, None if the default certificate serves it
fn crt_list_entry(host: &Host, default_x509_cert: &str) -> Option<String> {
    let tls = &host.tls;
    let crt_file = non_empty(&tls.tls_filename).unwrap_or(default_x509_cert);
    match non_empty(&tls.ca_filename) {
        None if crt_file == default_x509_cert => None,
        None => Some(format!("{} {}", crt_file, host.hostname)),
        Some(ca_file) => {
            let crl = non_empty(&tls.crl_filename)
                .map(|crl_file| format!(" crl-file {}", crl_file))
                .unwrap_or_default();
            Some(format!(
                "{} [ca-file {}{} verify optional] {}",
                crt_file, ca_file, crl, host.hostname
            ))
        }
    }
}
