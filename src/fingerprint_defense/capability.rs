//! Capability provider interfaces.
//!
//! `HostBindings` exposes the shared type descriptors the catalog patches.
//! The smaller traits are the host capabilities replacements consult at
//! call time, so the applier never touches a concrete browser object.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::report::Diagnostic;
use super::value::Member;
use crate::error::Result;

/// A shared type descriptor: the single definition point for every
/// instance of a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TargetType {
    Performance,
    PerformanceTiming,
    Screen,
    ScreenOrientation,
    /// The global object itself.
    Window,
    Event,
    MouseEvent,
    Navigator,
    PluginArray,
    MimeTypeArray,
    HtmlCanvasElement,
    Date,
}

impl TargetType {
    /// Global constructor whose `prototype` holds the descriptor.
    /// `None` for the global object.
    pub fn constructor_name(self) -> Option<&'static str> {
        match self {
            TargetType::Performance => Some("Performance"),
            TargetType::PerformanceTiming => Some("PerformanceTiming"),
            TargetType::Screen => Some("Screen"),
            TargetType::ScreenOrientation => Some("ScreenOrientation"),
            TargetType::Window => None,
            TargetType::Event => Some("Event"),
            TargetType::MouseEvent => Some("MouseEvent"),
            TargetType::Navigator => Some("Navigator"),
            TargetType::PluginArray => Some("PluginArray"),
            TargetType::MimeTypeArray => Some("MimeTypeArray"),
            TargetType::HtmlCanvasElement => Some("HTMLCanvasElement"),
            TargetType::Date => Some("Date"),
        }
    }

    /// Descriptor inherited from, where the catalog relies on it.
    pub fn parent(self) -> Option<TargetType> {
        match self {
            TargetType::MouseEvent => Some(TargetType::Event),
            _ => None,
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.constructor_name().unwrap_or("window"))
    }
}

/// Viewport geometry the screen overrides report.
pub trait ScreenInfo {
    fn inner_width(&self) -> Result<f64>;
    fn inner_height(&self) -> Result<f64>;
}

/// Pointer coordinates of an event, relative to the viewport.
pub trait PointerEventSource<O> {
    fn client_x(&self, event: &O) -> Result<f64>;
    fn client_y(&self, event: &O) -> Result<f64>;
}

/// Canvas geometry and construction.
pub trait CanvasSource<O> {
    fn dimensions(&self, canvas: &O) -> Result<(u32, u32)>;
    /// A new canvas of the given size with nothing drawn on it.
    fn create_blank(&self, width: u32, height: u32) -> Result<O>;
}

/// Synchronous yes/no question to the user (a modal confirmation).
pub trait ConsentPrompt {
    fn confirm(&self, message: &str) -> Result<bool>;
}

/// The capability provider the applier installs overrides through.
///
/// One implementation is backed by the browser, one by in-memory tables.
pub trait HostBindings {
    /// Receiver handle (`this`) for calls on host objects.
    type Object: Clone + 'static;

    /// Whether the descriptor for `target` exists on this host.
    fn has_target(&self, target: TargetType) -> bool;

    /// Current member `name` of the descriptor, searching inherited descriptors.
    fn member(&self, target: TargetType, name: &str) -> Result<Option<Member<Self::Object>>>;

    /// Define `name` directly on the descriptor for `target`.
    fn define(&mut self, target: TargetType, name: &str, member: Member<Self::Object>)
        -> Result<()>;

    fn screen(&self) -> Rc<dyn ScreenInfo>;
    fn pointer(&self) -> Rc<dyn PointerEventSource<Self::Object>>;
    fn canvas(&self) -> Rc<dyn CanvasSource<Self::Object>>;
    fn prompt(&self) -> Rc<dyn ConsentPrompt>;

    /// Whether the global debug flag is set.
    fn debug_enabled(&self) -> bool;

    /// Make a diagnostic visible on the page.
    fn render_diagnostic(&mut self, diagnostic: &Diagnostic) -> Result<()>;

    /// Latch the one-shot installation. Returns false if it already ran.
    fn claim_installation(&mut self) -> bool;
}
