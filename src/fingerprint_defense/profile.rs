//! Normalized browser profile and installation configuration.
//!
//! Every protected page reports the same values for the capabilities the
//! catalog covers, modeled after Firefox's resistFingerprinting defaults.

use serde::{Deserialize, Serialize};

/// The normalized values reported by the installed overrides.
pub struct NormalizedProfile;

impl NormalizedProfile {
    pub const BUILD_ID: &'static str = "20100101";
    pub const HARDWARE_CONCURRENCY: u32 = 2;
    pub const LANGUAGE: &'static str = "en-US";
    pub const LANGUAGES: &'static [&'static str] = &["en-US", "en"];
    pub const SCREEN_COLOR_DEPTH: u32 = 24;
    pub const SCREEN_ORIENTATION: &'static str = "landscape-primary";
    pub const SCREEN_ORIENTATION_ANGLE: u32 = 0;
    pub const DEVICE_PIXEL_RATIO: f64 = 1.0;
    pub const TIME_BUCKET_MS: f64 = 100.0;
    pub const CONSENT_MESSAGE: &'static str = "Do you want to allow canvas image extraction?";

    /// Navigation-timing members zeroed by the `performance.timing` shim.
    pub const PERFORMANCE_TIMING_MEMBERS: &'static [&'static str] = &[
        "connectEnd",
        "connectStart",
        "domComplete",
        "domContentLoadedEventEnd",
        "domContentLoadedEventStart",
        "domInteractive",
        "domLoading",
        "domainLookupEnd",
        "domainLookupStart",
        "fetchStart",
        "loadEventEnd",
        "loadEventStart",
        "navigationStart",
        "redirectEnd",
        "redirectStart",
        "requestStart",
        "responseEnd",
        "responseStart",
        "secureConnectionStart",
        "unloadEventEnd",
        "unloadEventStart",
    ];

    /// Global flag that makes installation failures visible on the page.
    pub const DEBUG_FLAG: &'static str = "__showResistFingerprintingErrors";
}

/// Configuration for which capability areas to override.
/// All areas are enabled by default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResistConfig {
    pub clock: bool,
    pub screen: bool,
    pub events: bool,
    pub navigator: bool,
    pub plugins: bool,
    pub canvas: bool,
    pub date: bool,
    /// Replace `performance.timing` with a zeroed record.
    pub performance_timing: bool,
    /// Freeze `window.confirm` after the canvas entries are installed.
    pub freeze_confirm: bool,
    pub consent_message: String,
}

impl Default for ResistConfig {
    fn default() -> Self {
        Self {
            clock: true,
            screen: true,
            events: true,
            navigator: true,
            plugins: true,
            canvas: true,
            date: true,
            performance_timing: true,
            freeze_confirm: true,
            consent_message: NormalizedProfile::CONSENT_MESSAGE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_enables_everything() {
        let config = ResistConfig::default();
        assert!(config.clock && config.screen && config.events);
        assert!(config.navigator && config.plugins && config.canvas && config.date);
        assert!(config.performance_timing && config.freeze_confirm);
        assert_eq!(config.consent_message, NormalizedProfile::CONSENT_MESSAGE);
    }

    #[test]
    fn test_partial_options_keep_defaults() {
        let config: ResistConfig =
            serde_json::from_str(r#"{ "canvas": false, "consent_message": "ok?" }"#).unwrap();
        assert!(!config.canvas);
        assert!(config.clock);
        assert_eq!(config.consent_message, "ok?");
    }

    #[test]
    fn test_timing_members() {
        assert_eq!(NormalizedProfile::PERFORMANCE_TIMING_MEMBERS.len(), 21);
    }
}
