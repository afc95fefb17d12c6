//! Installation boundary
//!
//! The single place where an installation pass can fail. Nothing escapes
//! it: failures end up in the returned report, and optionally on the page
//! when the host's debug flag is set. Entries installed before a failure
//! stay installed.

use super::applier::OverrideApplier;
use super::capability::HostBindings;
use super::catalog::OverrideCatalog;
use super::profile::ResistConfig;
use super::report::{InstallReport, InstallStatus};

/// Install the standard catalog for `config` on `host`, once.
pub fn install_all<H: HostBindings>(host: &mut H, config: &ResistConfig) -> InstallReport {
    match OverrideCatalog::standard(config) {
        Ok(catalog) => install_catalog(host, &catalog, config),
        Err(e) => {
            log::error!("Override catalog is invalid: {}", e);
            let report = InstallReport::aborted(&e);
            surface(host, &report);
            report
        }
    }
}

/// Install an explicit catalog on `host`, once.
pub fn install_catalog<H: HostBindings>(
    host: &mut H,
    catalog: &OverrideCatalog,
    config: &ResistConfig,
) -> InstallReport {
    if !host.claim_installation() {
        log::debug!("Fingerprinting overrides already installed, skipping");
        return InstallReport::already_installed();
    }

    let report = OverrideApplier::new(host, &config.consent_message).apply(catalog);

    match report.status {
        InstallStatus::Completed => log::info!(
            "Installed {} fingerprinting overrides",
            report.installed_count()
        ),
        _ => log::warn!(
            "Installed {} of {} fingerprinting overrides",
            report.installed_count(),
            report.entries.len()
        ),
    }

    surface(host, &report);
    report
}

/// Render failures on the page when the debug flag asks for it.
fn surface<H: HostBindings>(host: &mut H, report: &InstallReport) {
    if !host.debug_enabled() {
        return;
    }
    if let Some(diagnostic) = report.diagnostic() {
        if let Err(e) = host.render_diagnostic(&diagnostic) {
            log::warn!("Could not render install diagnostic: {}", e);
        }
    }
}
