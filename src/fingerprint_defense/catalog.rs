//! Override catalog
//!
//! Declarative table of every capability the installer intercepts, grouped
//! by capability area. Each entry names the shared descriptor, the member,
//! how the member is installed and what the replacement does.
//!
//! Entries never depend on each other; the applier may install them in any
//! order within a group. The catalog is validated on construction so a
//! mis-specified entry shows up in tests rather than on a page.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::capability::TargetType;
use super::normalize::{utc_redirection_table, UtcRedirect};
use super::profile::{NormalizedProfile, ResistConfig};
use super::value::{Facade, Literal};
use crate::error::{ResistError, Result};

/// Capability areas, in installation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CapabilityArea {
    Clock,
    Screen,
    Events,
    Navigator,
    Plugins,
    Canvas,
    Date,
}

/// How a replacement is attached to the descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverrideKind {
    /// Fixed data member, not writable.
    Constant,
    /// Read-only accessor.
    Getter,
    /// Accessor with both paths replaced.
    SetterAndGetter,
    /// Data member page code may still assign.
    Mutable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Width,
    Height,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// What a replacement does.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behavior {
    /// A fixed value.
    Literal(Literal),
    /// Call the original method, quantize the numeric result.
    QuantizedMethod,
    /// Read the original accessor, quantize the numeric result.
    QuantizedGetter,
    /// Report the inner viewport dimension.
    InnerViewport(Dimension),
    /// Report the event's client coordinate.
    ClientCoordinate(Axis),
    /// Return a shape-preserving empty stand-in.
    Facade(Facade),
    /// Run the original extraction on the canvas the consent gate selects.
    ConsentGatedExtraction,
    /// Forward to the UTC accessor on the same receiver.
    UtcRedirect(UtcRedirect),
    /// Reinstall the original value as a frozen constant.
    FreezeOriginal,
    /// Accessor pair over a private slot with an initial value.
    Slot(Literal),
}

impl Behavior {
    /// Whether `kind` can carry this behavior.
    pub fn fits(&self, kind: OverrideKind) -> bool {
        match kind {
            OverrideKind::Constant => matches!(
                self,
                Behavior::Literal(_)
                    | Behavior::QuantizedMethod
                    | Behavior::ConsentGatedExtraction
                    | Behavior::UtcRedirect(_)
                    | Behavior::FreezeOriginal
            ),
            OverrideKind::Getter => matches!(
                self,
                Behavior::Literal(_)
                    | Behavior::QuantizedGetter
                    | Behavior::InnerViewport(_)
                    | Behavior::ClientCoordinate(_)
                    | Behavior::Facade(_)
            ),
            OverrideKind::SetterAndGetter => matches!(self, Behavior::Slot(_)),
            OverrideKind::Mutable => matches!(self, Behavior::Literal(_)),
        }
    }
}

/// One capability override.
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideSpec {
    pub area: CapabilityArea,
    pub target: TargetType,
    pub member: &'static str,
    pub kind: OverrideKind,
    pub behavior: Behavior,
    /// Skip instead of failing when the host lacks `target`.
    pub optional: bool,
}

impl OverrideSpec {
    pub fn new(
        area: CapabilityArea,
        target: TargetType,
        member: &'static str,
        kind: OverrideKind,
        behavior: Behavior,
    ) -> Self {
        Self {
            area,
            target,
            member,
            kind,
            behavior,
            optional: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Member whose original the replacement delegates to, if any.
    pub fn delegate_member(&self) -> Option<&'static str> {
        match self.behavior {
            Behavior::QuantizedMethod
            | Behavior::QuantizedGetter
            | Behavior::ConsentGatedExtraction
            | Behavior::FreezeOriginal => Some(self.member),
            Behavior::UtcRedirect(row) => Some(row.utc),
            _ => None,
        }
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| ResistError::InvalidCatalog {
            target: self.target,
            member: self.member.to_string(),
            reason: reason.to_string(),
        };

        if self.member.is_empty() {
            return Err(invalid("empty member name"));
        }
        if !self.behavior.fits(self.kind) {
            return Err(invalid("behavior does not fit the override kind"));
        }
        if let Behavior::UtcRedirect(row) = self.behavior {
            if self.target != TargetType::Date || row.local != self.member {
                return Err(invalid("UTC redirect must replace its own local accessor on Date"));
            }
        }
        if matches!(self.behavior, Behavior::ConsentGatedExtraction)
            && self.target != TargetType::HtmlCanvasElement
        {
            return Err(invalid("consent gating only applies to canvas extraction"));
        }
        Ok(())
    }
}

/// Ordered sequence of overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideCatalog {
    entries: Vec<OverrideSpec>,
}

impl OverrideCatalog {
    /// Build a catalog, rejecting duplicates and ill-formed entries.
    pub fn new(entries: Vec<OverrideSpec>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for entry in &entries {
            entry.validate()?;
            if !seen.insert((entry.target, entry.member)) {
                return Err(ResistError::DuplicateEntry {
                    target: entry.target,
                    member: entry.member.to_string(),
                });
            }
        }
        Ok(Self { entries })
    }

    /// The full catalog for the enabled capability areas.
    pub fn standard(config: &ResistConfig) -> Result<Self> {
        let mut entries = Vec::new();

        if config.clock {
            clock_entries(&mut entries, config);
        }
        if config.screen {
            screen_entries(&mut entries);
        }
        if config.events {
            event_entries(&mut entries);
        }
        if config.navigator {
            navigator_entries(&mut entries);
        }
        if config.plugins {
            plugin_entries(&mut entries);
        }
        if config.canvas {
            canvas_entries(&mut entries, config);
        }
        if config.date {
            date_entries(&mut entries);
        }

        Self::new(entries)
    }

    pub fn entries(&self) -> &[OverrideSpec] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, target: TargetType, member: &str) -> Option<&OverrideSpec> {
        self.entries
            .iter()
            .find(|e| e.target == target && e.member == member)
    }

    pub fn area(&self, area: CapabilityArea) -> impl Iterator<Item = &OverrideSpec> {
        self.entries.iter().filter(move |e| e.area == area)
    }
}

fn constants(
    out: &mut Vec<OverrideSpec>,
    area: CapabilityArea,
    target: TargetType,
    members: &[(&'static str, Literal)],
) {
    for (member, literal) in members {
        out.push(OverrideSpec::new(
            area,
            target,
            *member,
            OverrideKind::Constant,
            Behavior::Literal(*literal),
        ));
    }
}

fn getters(
    out: &mut Vec<OverrideSpec>,
    area: CapabilityArea,
    target: TargetType,
    members: &[(&'static str, Behavior)],
) {
    for (member, behavior) in members {
        out.push(OverrideSpec::new(
            area,
            target,
            *member,
            OverrideKind::Getter,
            *behavior,
        ));
    }
}

fn clock_entries(out: &mut Vec<OverrideSpec>, config: &ResistConfig) {
    use CapabilityArea::Clock;

    out.push(OverrideSpec::new(
        Clock,
        TargetType::Performance,
        "now",
        OverrideKind::Constant,
        Behavior::QuantizedMethod,
    ));
    if config.performance_timing {
        getters(
            out,
            Clock,
            TargetType::Performance,
            &[("timing", Behavior::Facade(Facade::ZeroedTiming))],
        );
    }
}

fn screen_entries(out: &mut Vec<OverrideSpec>) {
    use CapabilityArea::Screen;
    let orientation = Literal::Str(NormalizedProfile::SCREEN_ORIENTATION);

    constants(
        out,
        Screen,
        TargetType::Screen,
        &[
            ("availLeft", Literal::Number(0.0)),
            ("availTop", Literal::Number(0.0)),
            (
                "colorDepth",
                Literal::Number(NormalizedProfile::SCREEN_COLOR_DEPTH as f64),
            ),
            ("left", Literal::Number(0.0)),
            ("mozOrientation", orientation),
            ("top", Literal::Number(0.0)),
        ],
    );
    getters(
        out,
        Screen,
        TargetType::Screen,
        &[
            ("availHeight", Behavior::InnerViewport(Dimension::Height)),
            ("availWidth", Behavior::InnerViewport(Dimension::Width)),
            ("height", Behavior::InnerViewport(Dimension::Height)),
            ("width", Behavior::InnerViewport(Dimension::Width)),
        ],
    );
    out.push(OverrideSpec::new(
        Screen,
        TargetType::Screen,
        "onmozorientationchange",
        OverrideKind::Mutable,
        Behavior::Literal(Literal::Null),
    ));

    // Not every host exposes ScreenOrientation
    let mut orientation_entries = Vec::new();
    constants(
        &mut orientation_entries,
        Screen,
        TargetType::ScreenOrientation,
        &[
            ("type", orientation),
            (
                "angle",
                Literal::Number(NormalizedProfile::SCREEN_ORIENTATION_ANGLE as f64),
            ),
        ],
    );
    orientation_entries.push(OverrideSpec::new(
        Screen,
        TargetType::ScreenOrientation,
        "onchange",
        OverrideKind::SetterAndGetter,
        Behavior::Slot(Literal::Null),
    ));
    out.extend(orientation_entries.into_iter().map(OverrideSpec::optional));

    constants(
        out,
        Screen,
        TargetType::Window,
        &[
            ("screenX", Literal::Number(0.0)),
            ("screenY", Literal::Number(0.0)),
            (
                "devicePixelRatio",
                Literal::Number(NormalizedProfile::DEVICE_PIXEL_RATIO),
            ),
        ],
    );
    getters(
        out,
        Screen,
        TargetType::Window,
        &[
            ("outerWidth", Behavior::InnerViewport(Dimension::Width)),
            ("outerHeight", Behavior::InnerViewport(Dimension::Height)),
        ],
    );
}

fn event_entries(out: &mut Vec<OverrideSpec>) {
    use CapabilityArea::Events;

    getters(
        out,
        Events,
        TargetType::Event,
        &[("timeStamp", Behavior::QuantizedGetter)],
    );
    getters(
        out,
        Events,
        TargetType::MouseEvent,
        &[
            ("screenX", Behavior::ClientCoordinate(Axis::X)),
            ("screenY", Behavior::ClientCoordinate(Axis::Y)),
        ],
    );
}

fn navigator_entries(out: &mut Vec<OverrideSpec>) {
    constants(
        out,
        CapabilityArea::Navigator,
        TargetType::Navigator,
        &[
            ("buildID", Literal::Str(NormalizedProfile::BUILD_ID)),
            ("getBattery", Literal::Undefined),
            (
                "hardwareConcurrency",
                Literal::Number(NormalizedProfile::HARDWARE_CONCURRENCY as f64),
            ),
            ("language", Literal::Str(NormalizedProfile::LANGUAGE)),
            ("languages", Literal::List(NormalizedProfile::LANGUAGES)),
        ],
    );
}

fn plugin_entries(out: &mut Vec<OverrideSpec>) {
    getters(
        out,
        CapabilityArea::Plugins,
        TargetType::Navigator,
        &[
            ("mimeTypes", Behavior::Facade(Facade::EmptyMimeTypes)),
            ("plugins", Behavior::Facade(Facade::EmptyPlugins)),
        ],
    );
}

fn canvas_entries(out: &mut Vec<OverrideSpec>, config: &ResistConfig) {
    use CapabilityArea::Canvas;

    for member in ["toBlob", "toDataURL"] {
        out.push(OverrideSpec::new(
            Canvas,
            TargetType::HtmlCanvasElement,
            member,
            OverrideKind::Constant,
            Behavior::ConsentGatedExtraction,
        ));
    }
    // The gate prompts through confirm(); pin it once the gate holds it
    if config.freeze_confirm {
        out.push(OverrideSpec::new(
            Canvas,
            TargetType::Window,
            "confirm",
            OverrideKind::Constant,
            Behavior::FreezeOriginal,
        ));
    }
}

fn date_entries(out: &mut Vec<OverrideSpec>) {
    for row in utc_redirection_table() {
        out.push(OverrideSpec::new(
            CapabilityArea::Date,
            TargetType::Date,
            row.local,
            OverrideKind::Constant,
            Behavior::UtcRedirect(row),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog_is_well_formed() {
        let catalog = OverrideCatalog::standard(&ResistConfig::default()).unwrap();
        assert_eq!(catalog.len(), 49);
        assert_eq!(catalog.area(CapabilityArea::Date).count(), 15);
        assert_eq!(catalog.area(CapabilityArea::Canvas).count(), 3);
    }

    #[test]
    fn test_areas_are_contiguous_and_ordered() {
        let catalog = OverrideCatalog::standard(&ResistConfig::default()).unwrap();
        let mut areas: Vec<CapabilityArea> = Vec::new();
        for entry in catalog.entries() {
            if areas.last() != Some(&entry.area) {
                assert!(!areas.contains(&entry.area), "{:?} split", entry.area);
                areas.push(entry.area);
            }
        }
        assert_eq!(
            areas,
            vec![
                CapabilityArea::Clock,
                CapabilityArea::Screen,
                CapabilityArea::Events,
                CapabilityArea::Navigator,
                CapabilityArea::Plugins,
                CapabilityArea::Canvas,
                CapabilityArea::Date,
            ]
        );
    }

    #[test]
    fn test_config_drops_areas() {
        let config = ResistConfig {
            canvas: false,
            date: false,
            performance_timing: false,
            ..ResistConfig::default()
        };
        let catalog = OverrideCatalog::standard(&config).unwrap();
        assert!(catalog.find(TargetType::HtmlCanvasElement, "toDataURL").is_none());
        assert!(catalog.find(TargetType::Window, "confirm").is_none());
        assert!(catalog.find(TargetType::Date, "getHours").is_none());
        assert!(catalog.find(TargetType::Performance, "timing").is_none());
        assert!(catalog.find(TargetType::Performance, "now").is_some());
    }

    #[test]
    fn test_duplicate_rejected() {
        let entry = OverrideSpec::new(
            CapabilityArea::Navigator,
            TargetType::Navigator,
            "language",
            OverrideKind::Constant,
            Behavior::Literal(Literal::Str("en-US")),
        );
        let err = OverrideCatalog::new(vec![entry.clone(), entry]).unwrap_err();
        assert!(err.is_catalog_error());
        assert!(matches!(err, ResistError::DuplicateEntry { .. }));
    }

    #[test]
    fn test_mismatched_kind_rejected() {
        let entry = OverrideSpec::new(
            CapabilityArea::Clock,
            TargetType::Performance,
            "now",
            OverrideKind::Getter,
            Behavior::QuantizedMethod,
        );
        let err = OverrideCatalog::new(vec![entry]).unwrap_err();
        assert!(matches!(err, ResistError::InvalidCatalog { .. }));
    }

    #[test]
    fn test_delegating_entries_name_their_original() {
        let catalog = OverrideCatalog::standard(&ResistConfig::default()).unwrap();
        let now = catalog.find(TargetType::Performance, "now").unwrap();
        assert_eq!(now.delegate_member(), Some("now"));

        let hours = catalog.find(TargetType::Date, "setHours").unwrap();
        assert_eq!(hours.delegate_member(), Some("setUTCHours"));

        let language = catalog.find(TargetType::Navigator, "language").unwrap();
        assert_eq!(language.delegate_member(), None);
    }

    #[test]
    fn test_only_orientation_is_optional() {
        let catalog = OverrideCatalog::standard(&ResistConfig::default()).unwrap();
        for entry in catalog.entries() {
            assert_eq!(
                entry.optional,
                entry.target == TargetType::ScreenOrientation,
                "{}.{}",
                entry.target,
                entry.member
            );
        }
    }
}
