//! Browser integration tests
//!
//! Run with: wasm-pack test --headless --firefox
//! (or --chrome)

#![cfg(target_arch = "wasm32")]

use js_sys::{Object, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen_test::*;

use resist_fingerprinting::fingerprint_defense::{
    check_resist_status, get_normalized_profile, install_resist_fingerprinting,
};

wasm_bindgen_test_configure!(run_in_browser);

/// Install once per page with a prompt that always declines.
///
/// The test runner shares one page between tests, so every test goes
/// through here and only the first call does any work.
fn ensure_installed() {
    js_sys::eval("window.confirm = function confirm() { return false; }").unwrap();
    install_resist_fingerprinting(JsValue::UNDEFINED);
}

fn eval_f64(script: &str) -> f64 {
    js_sys::eval(script).unwrap().as_f64().unwrap()
}

fn eval_bool(script: &str) -> bool {
    js_sys::eval(script).unwrap().as_bool().unwrap()
}

// ===== Install Report Tests =====

#[wasm_bindgen_test]
fn second_install_reports_already_installed() {
    ensure_installed();

    let report = install_resist_fingerprinting(JsValue::UNDEFINED);
    let status = Reflect::get(&report, &JsValue::from_str("status"))
        .unwrap()
        .as_string()
        .unwrap();
    assert_eq!(status, "alreadyInstalled");
}

#[wasm_bindgen_test]
fn selective_options_are_accepted() {
    ensure_installed();

    let options = Object::new();
    Reflect::set(&options, &JsValue::from_str("canvas"), &JsValue::FALSE).unwrap();
    let report = install_resist_fingerprinting(options.into());
    assert!(report.is_object(), "report should serialize to an object");
}

// ===== Clock Tests =====

#[wasm_bindgen_test]
fn performance_now_quantized() {
    ensure_installed();

    let remainder = eval_f64("performance.now() % 100");
    assert_eq!(remainder, 0.0, "performance.now() should be rounded to 100ms");
}

#[wasm_bindgen_test]
fn event_timestamp_quantized() {
    ensure_installed();

    let remainder = eval_f64("new Event('tick').timeStamp % 100");
    assert_eq!(remainder, 0.0, "Event.timeStamp should be rounded to 100ms");
}

#[wasm_bindgen_test]
fn performance_now_looks_native() {
    ensure_installed();

    assert!(
        eval_bool("Performance.prototype.now.toString().includes('[native code]')"),
        "replacement should keep the native toString()"
    );
    assert!(eval_bool("performance.now.name === 'now'"));
}

#[wasm_bindgen_test]
fn overrides_are_frozen() {
    ensure_installed();

    assert!(eval_bool(
        "!Object.getOwnPropertyDescriptor(Performance.prototype, 'now').configurable"
    ));
    let restored = eval_bool(
        "(function(){ try { Object.defineProperty(Performance.prototype, 'now', \
         { value: function() { return 1; } }); return true; } catch(e) { return false; } })()",
    );
    assert!(!restored, "redefining an installed member should throw");
}

#[wasm_bindgen_test]
fn host_errors_keep_their_type() {
    ensure_installed();

    // Thrown by the original and passed through unchanged
    assert!(eval_bool(
        "(function(){ try { Performance.prototype.now.call({}); return false; } \
         catch(e) { return e instanceof TypeError; } })()"
    ));
    assert!(eval_bool(
        "(function(){ try { Object.getOwnPropertyDescriptor(Event.prototype, 'timeStamp')\
         .get.call({}); return false; } catch(e) { return e instanceof TypeError; } })()"
    ));
    // Raised by the replacement itself
    assert!(eval_bool(
        "(function(){ try { Object.getOwnPropertyDescriptor(MouseEvent.prototype, 'screenX')\
         .get.call({}); return false; } catch(e) { return e instanceof TypeError; } })()"
    ));
}

// ===== Screen Tests =====

#[wasm_bindgen_test]
fn screen_reports_viewport() {
    ensure_installed();

    assert_eq!(eval_f64("screen.width"), eval_f64("innerWidth"));
    assert_eq!(eval_f64("screen.availHeight"), eval_f64("innerHeight"));
    assert_eq!(eval_f64("outerWidth"), eval_f64("innerWidth"));
    assert_eq!(eval_f64("screen.colorDepth"), 24.0);
    assert_eq!(eval_f64("devicePixelRatio"), 1.0);
}

// ===== Navigator Tests =====

#[wasm_bindgen_test]
fn navigator_normalized() {
    ensure_installed();

    assert_eq!(eval_f64("navigator.hardwareConcurrency"), 2.0);
    let language = js_sys::eval("navigator.language")
        .unwrap()
        .as_string()
        .unwrap();
    assert_eq!(language, "en-US", "language should be normalized to en-US");
    assert!(eval_bool("Object.isFrozen(navigator.languages)"));
}

#[wasm_bindgen_test]
fn plugins_empty() {
    ensure_installed();

    assert_eq!(eval_f64("navigator.plugins.length"), 0.0);
    assert_eq!(eval_f64("navigator.mimeTypes.length"), 0.0);
    assert!(eval_bool("navigator.plugins.item(0) === null"));
    assert!(eval_bool("navigator.mimeTypes.namedItem('application/pdf') === null"));
    assert!(eval_bool("navigator.plugins instanceof PluginArray"));
}

// ===== Date Tests =====

#[wasm_bindgen_test]
fn local_time_matches_utc() {
    ensure_installed();

    assert!(eval_bool(
        "(function(){ var d = new Date(); d.setHours(5, 30); \
         return d.getUTCHours() === 5 && d.getHours() === d.getUTCHours() \
         && d.getDate() === d.getUTCDate(); })()"
    ));
}

// ===== Canvas Tests =====

#[wasm_bindgen_test]
fn denied_canvas_matches_blank() {
    ensure_installed();

    let drawn = js_sys::eval(
        "(function(){ var c = document.createElement('canvas'); c.width = 10; c.height = 10; \
         var g = c.getContext('2d'); g.fillStyle = '#f00'; g.fillRect(2, 2, 5, 5); \
         return c.toDataURL(); })()",
    )
    .unwrap()
    .as_string()
    .unwrap();
    let blank = js_sys::eval(
        "(function(){ var c = document.createElement('canvas'); c.width = 10; c.height = 10; \
         return c.toDataURL(); })()",
    )
    .unwrap()
    .as_string()
    .unwrap();
    assert!(drawn.starts_with("data:image/png"));
    assert_eq!(drawn, blank, "denied extraction should read a blank canvas");
}

// ===== Status / Profile Tests =====

#[wasm_bindgen_test]
fn status_reports_active_overrides() {
    ensure_installed();

    let status = check_resist_status();
    for key in ["clock", "navigator", "plugins", "date", "frozen", "antiDetection"] {
        let value = Reflect::get(&status, &JsValue::from_str(key)).unwrap();
        assert_eq!(value, JsValue::TRUE, "{} check should pass", key);
    }
}

#[wasm_bindgen_test]
fn normalized_profile_values() {
    let profile = get_normalized_profile();
    let concurrency = Reflect::get(&profile, &JsValue::from_str("hardwareConcurrency"))
        .unwrap()
        .as_f64()
        .unwrap();
    assert_eq!(concurrency, 2.0);
    let build_id = Reflect::get(&profile, &JsValue::from_str("buildID"))
        .unwrap()
        .as_string()
        .unwrap();
    assert_eq!(build_id, "20100101");
}
