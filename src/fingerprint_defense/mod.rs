//! Fingerprinting resistance for a browser page.
//!
//! A fixed catalog of overrides is installed once, before page scripts run,
//! onto the shared type descriptors (`Performance.prototype`,
//! `Screen.prototype`, `HTMLCanvasElement.prototype`, the global object, ...).
//! Every installed member is non-configurable, so page scripts can neither
//! restore the original nor install a competing override.
//!
//! ## Usage
//!
//! ```javascript
//! import init, { install_resist_fingerprinting } from './pkg/resist_fingerprinting.js';
//! await init();
//! const report = install_resist_fingerprinting();       // every area
//! install_resist_fingerprinting({ canvas: false });     // selective
//! ```
//!
//! Setting `window.__showResistFingerprintingErrors = true` before
//! installing appends failures to the page as an `error_message` element.

use js_sys::{Array, Object, Reflect};
use serde::Serialize;
use wasm_bindgen::prelude::*;

pub mod applier;
pub mod boundary;
pub mod capability;
pub mod catalog;
pub mod consent;
#[cfg(any(test, feature = "testing"))]
pub mod fake_host;
pub mod normalize;
pub mod profile;
pub mod report;
pub mod value;
pub mod web_host;

use crate::error::ResistError;
use profile::{NormalizedProfile, ResistConfig};
use report::InstallReport;
use web_host::WebHost;

/// Install the override catalog on this page.
///
/// Pass a JS object with boolean fields to disable areas:
/// ```javascript
/// install_resist_fingerprinting({ date: false, freeze_confirm: false });
/// ```
///
/// Returns the install report: `{ status, entries: [{ area, target, member, result }] }`.
/// A second call does nothing and reports `alreadyInstalled`.
#[wasm_bindgen]
pub fn install_resist_fingerprinting(options: JsValue) -> JsValue {
    let config: ResistConfig = if options.is_undefined() || options.is_null() {
        ResistConfig::default()
    } else {
        serde_wasm_bindgen::from_value(options).unwrap_or_else(|e| {
            let err = ResistError::InvalidConfig(e.to_string());
            log::warn!("{}, using defaults", err);
            ResistConfig::default()
        })
    };

    let report = match WebHost::new() {
        Ok(mut host) => boundary::install_all(&mut host, &config),
        Err(e) => {
            log::error!("No usable global object: {}", e);
            InstallReport::aborted(&e)
        }
    };

    report
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .unwrap_or(JsValue::UNDEFINED)
}

/// Check the live page for each normalized behavior.
#[wasm_bindgen]
pub fn check_resist_status() -> JsValue {
    let status = Object::new();
    let check = |name: &str, script: &str| {
        let ok = js_sys::eval(script).unwrap_or(JsValue::FALSE);
        let _ = Reflect::set(&status, &JsValue::from_str(name), &ok);
    };

    check("clock", "performance.now() % 100 === 0");
    check(
        "screen",
        "screen.width === innerWidth && screen.height === innerHeight",
    );
    check("navigator", "navigator.hardwareConcurrency === 2");
    check("plugins", "navigator.plugins.length === 0 && navigator.mimeTypes.length === 0");
    check(
        "date",
        "(function(){ var d = new Date(); return d.getHours() === d.getUTCHours(); })()",
    );
    check(
        "frozen",
        "(function(){ try { var d = Object.getOwnPropertyDescriptor(Performance.prototype, 'now'); \
         return !!d && !d.configurable && !d.writable; } catch(e) { return false; } })()",
    );
    check(
        "antiDetection",
        "(function(){ try { return Performance.prototype.now.toString().includes('[native code]'); } \
         catch(e) { return false; } })()",
    );

    status.into()
}

/// Get the normalized profile the overrides report.
#[wasm_bindgen]
pub fn get_normalized_profile() -> JsValue {
    build_normalized_object().unwrap_or(JsValue::UNDEFINED)
}

fn build_normalized_object() -> Result<JsValue, JsValue> {
    let obj = Object::new();
    Reflect::set(
        &obj,
        &JsValue::from_str("buildID"),
        &JsValue::from_str(NormalizedProfile::BUILD_ID),
    )?;
    Reflect::set(
        &obj,
        &JsValue::from_str("hardwareConcurrency"),
        &JsValue::from_f64(NormalizedProfile::HARDWARE_CONCURRENCY as f64),
    )?;
    Reflect::set(
        &obj,
        &JsValue::from_str("language"),
        &JsValue::from_str(NormalizedProfile::LANGUAGE),
    )?;
    let languages = Array::new();
    for language in NormalizedProfile::LANGUAGES {
        languages.push(&JsValue::from_str(language));
    }
    Reflect::set(&obj, &JsValue::from_str("languages"), &languages)?;
    Reflect::set(
        &obj,
        &JsValue::from_str("colorDepth"),
        &JsValue::from_f64(NormalizedProfile::SCREEN_COLOR_DEPTH as f64),
    )?;
    Reflect::set(
        &obj,
        &JsValue::from_str("orientation"),
        &JsValue::from_str(NormalizedProfile::SCREEN_ORIENTATION),
    )?;
    Reflect::set(
        &obj,
        &JsValue::from_str("devicePixelRatio"),
        &JsValue::from_f64(NormalizedProfile::DEVICE_PIXEL_RATIO),
    )?;
    Reflect::set(
        &obj,
        &JsValue::from_str("timePrecision"),
        &JsValue::from_f64(NormalizedProfile::TIME_BUCKET_MS),
    )?;
    Ok(obj.into())
}
