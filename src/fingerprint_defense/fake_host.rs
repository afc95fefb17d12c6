//! In-memory host for exercising the catalog without a browser.
//!
//! Each target type gets a descriptor table seeded with members that behave
//! like a distinctive real machine: a 2560x1440 screen, a high-DPI display,
//! 16 cores, a non-UTC time zone, a non-empty plugin list. Descriptors follow
//! the same rules the browser enforces on `Object.defineProperty`:
//! redefining a non-configurable member fails, and assigning to a
//! non-writable one fails.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use base64::Engine;

use super::capability::{
    CanvasSource, ConsentPrompt, HostBindings, PointerEventSource, ScreenInfo, TargetType,
};
use super::normalize::{accessor_names, AccessorOp, CalendarUnit};
use super::report::Diagnostic;
use super::value::{Callable, Facade, Member, NativeFn, Value};
use crate::error::{ResistError, Result};

/// Mutable state behind a fake object.
#[derive(Debug, Clone, PartialEq)]
pub enum FakeState {
    Plain,
    Event(EventInit),
    Canvas {
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    },
    Date(f64),
    /// A zero-information stand-in handed out by an installed getter.
    Facade(Facade),
}

/// Raw values a fake event reports before any override.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EventInit {
    pub time_stamp: f64,
    pub client_x: f64,
    pub client_y: f64,
    pub screen_x: f64,
    pub screen_y: f64,
}

pub struct FakeInstance {
    target: TargetType,
    state: RefCell<FakeState>,
}

/// Receiver handle; equality is identity.
#[derive(Clone)]
pub struct FakeRef(Rc<FakeInstance>);

impl FakeRef {
    pub fn new(target: TargetType, state: FakeState) -> Self {
        Self(Rc::new(FakeInstance {
            target,
            state: RefCell::new(state),
        }))
    }

    pub fn target(&self) -> TargetType {
        self.0.target
    }

    pub fn state(&self) -> FakeState {
        self.0.state.borrow().clone()
    }

    fn date_ms(&self) -> Result<f64> {
        match *self.0.state.borrow() {
            FakeState::Date(ms) => Ok(ms),
            _ => Err(not_a(self, "Date")),
        }
    }

    fn set_date_ms(&self, ms: f64) {
        *self.0.state.borrow_mut() = FakeState::Date(ms);
    }

    fn facade(&self) -> Option<Facade> {
        match *self.0.state.borrow() {
            FakeState::Facade(facade) => Some(facade),
            _ => None,
        }
    }

    fn event(&self) -> Result<EventInit> {
        match *self.0.state.borrow() {
            FakeState::Event(init) => Ok(init),
            _ => Err(not_a(self, "Event")),
        }
    }
}

impl PartialEq for FakeRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for FakeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FakeRef({}, {:?})", self.0.target, self.0.state.borrow())
    }
}

fn not_a(obj: &FakeRef, what: &str) -> ResistError {
    ResistError::Host(format!("{} receiver is not a {}", obj.target(), what))
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<f64>,
}

impl ManualClock {
    pub fn set(&self, now: f64) {
        self.now.set(now);
    }

    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn now(&self) -> f64 {
        self.now.get()
    }
}

/// Time zone with a constant UTC offset.
#[derive(Debug)]
pub struct FixedOffsetZone {
    minutes: Cell<f64>,
}

impl FixedOffsetZone {
    pub fn set_offset_minutes(&self, minutes: f64) {
        self.minutes.set(minutes);
    }

    /// Minutes to add to UTC to obtain local time.
    pub fn offset_minutes(&self) -> f64 {
        self.minutes.get()
    }
}

/// Window and monitor geometry.
#[derive(Debug)]
pub struct FakeViewport {
    pub inner: Cell<(f64, f64)>,
    pub outer: Cell<(f64, f64)>,
    pub screen: Cell<(f64, f64)>,
}

impl ScreenInfo for FakeViewport {
    fn inner_width(&self) -> Result<f64> {
        Ok(self.inner.get().0)
    }

    fn inner_height(&self) -> Result<f64> {
        Ok(self.inner.get().1)
    }
}

/// Consent prompt with a preset answer. `None` makes the prompt fail.
#[derive(Debug)]
pub struct ScriptedPrompt {
    answer: Cell<Option<bool>>,
    asked: Cell<u32>,
    last_message: RefCell<Option<String>>,
}

impl ScriptedPrompt {
    pub fn answer(&self, answer: Option<bool>) {
        self.answer.set(answer);
    }

    pub fn times_asked(&self) -> u32 {
        self.asked.get()
    }

    pub fn last_message(&self) -> Option<String> {
        self.last_message.borrow().clone()
    }
}

impl ConsentPrompt for ScriptedPrompt {
    fn confirm(&self, message: &str) -> Result<bool> {
        self.asked.set(self.asked.get() + 1);
        *self.last_message.borrow_mut() = Some(message.to_string());
        self.answer
            .get()
            .ok_or_else(|| ResistError::ConsentUnavailable("prompt dismissed".into()))
    }
}

struct FakePointer;

impl PointerEventSource<FakeRef> for FakePointer {
    fn client_x(&self, event: &FakeRef) -> Result<f64> {
        Ok(event.event()?.client_x)
    }

    fn client_y(&self, event: &FakeRef) -> Result<f64> {
        Ok(event.event()?.client_y)
    }
}

struct FakeCanvases;

impl CanvasSource<FakeRef> for FakeCanvases {
    fn dimensions(&self, canvas: &FakeRef) -> Result<(u32, u32)> {
        match &*canvas.0.state.borrow() {
            FakeState::Canvas { width, height, .. } => Ok((*width, *height)),
            _ => Err(not_a(canvas, "canvas")),
        }
    }

    fn create_blank(&self, width: u32, height: u32) -> Result<FakeRef> {
        Ok(blank_canvas(width, height))
    }
}

fn blank_canvas(width: u32, height: u32) -> FakeRef {
    FakeRef::new(
        TargetType::HtmlCanvasElement,
        FakeState::Canvas {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        },
    )
}

type Table = BTreeMap<String, Member<FakeRef>>;

pub struct FakeHost {
    descriptors: BTreeMap<TargetType, Table>,
    window: FakeRef,
    performance: FakeRef,
    screen: FakeRef,
    orientation: FakeRef,
    navigator: FakeRef,
    clock: Rc<ManualClock>,
    zone: Rc<FixedOffsetZone>,
    viewport: Rc<FakeViewport>,
    prompt: Rc<ScriptedPrompt>,
    debug: bool,
    rendered: Vec<Diagnostic>,
    facades: RefCell<Vec<(Facade, FakeRef)>>,
    installed: bool,
    failing: Vec<(TargetType, String)>,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeHost {
    pub fn new() -> Self {
        let singleton = |target| FakeRef::new(target, FakeState::Plain);
        let mut host = Self {
            descriptors: BTreeMap::new(),
            window: singleton(TargetType::Window),
            performance: singleton(TargetType::Performance),
            screen: singleton(TargetType::Screen),
            orientation: singleton(TargetType::ScreenOrientation),
            navigator: singleton(TargetType::Navigator),
            clock: Rc::new(ManualClock::default()),
            zone: Rc::new(FixedOffsetZone {
                minutes: Cell::new(120.0),
            }),
            viewport: Rc::new(FakeViewport {
                inner: Cell::new((1280.0, 720.0)),
                outer: Cell::new((1296.0, 811.0)),
                screen: Cell::new((2560.0, 1440.0)),
            }),
            prompt: Rc::new(ScriptedPrompt {
                answer: Cell::new(Some(false)),
                asked: Cell::new(0),
                last_message: RefCell::new(None),
            }),
            debug: false,
            rendered: Vec::new(),
            facades: RefCell::new(Vec::new()),
            installed: false,
            failing: Vec::new(),
        };
        host.seed();
        host
    }

    /// Drop a whole descriptor, as on a host that lacks the capability.
    pub fn without_target(mut self, target: TargetType) -> Self {
        self.descriptors.remove(&target);
        self
    }

    /// Set the global debug flag.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Make `define` fail for one member.
    pub fn fail_define(&mut self, target: TargetType, member: &str) {
        self.failing.push((target, member.to_string()));
    }

    pub fn remove_member(&mut self, target: TargetType, member: &str) {
        if let Some(table) = self.descriptors.get_mut(&target) {
            table.remove(member);
        }
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    pub fn zone(&self) -> &FixedOffsetZone {
        &self.zone
    }

    pub fn viewport(&self) -> &FakeViewport {
        &self.viewport
    }

    pub fn consent_prompt(&self) -> &ScriptedPrompt {
        &self.prompt
    }

    /// Diagnostics appended to the page so far.
    pub fn rendered(&self) -> &[Diagnostic] {
        &self.rendered
    }

    pub fn window_object(&self) -> FakeRef {
        self.window.clone()
    }

    pub fn performance_object(&self) -> FakeRef {
        self.performance.clone()
    }

    pub fn screen_object(&self) -> FakeRef {
        self.screen.clone()
    }

    pub fn orientation_object(&self) -> FakeRef {
        self.orientation.clone()
    }

    pub fn navigator_object(&self) -> FakeRef {
        self.navigator.clone()
    }

    pub fn new_event(&self, init: EventInit) -> FakeRef {
        FakeRef::new(TargetType::Event, FakeState::Event(init))
    }

    pub fn new_mouse_event(&self, init: EventInit) -> FakeRef {
        FakeRef::new(TargetType::MouseEvent, FakeState::Event(init))
    }

    pub fn new_canvas(&self, width: u32, height: u32) -> FakeRef {
        blank_canvas(width, height)
    }

    pub fn new_date(&self, epoch_ms: f64) -> FakeRef {
        FakeRef::new(TargetType::Date, FakeState::Date(epoch_ms))
    }

    /// Set one RGBA pixel on a fake canvas.
    pub fn paint(&self, canvas: &FakeRef, x: u32, y: u32, rgba: [u8; 4]) -> Result<()> {
        match &mut *canvas.0.state.borrow_mut() {
            FakeState::Canvas {
                width,
                height,
                pixels,
            } if x < *width && y < *height => {
                let offset = (y as usize * *width as usize + x as usize) * 4;
                pixels[offset..offset + 4].copy_from_slice(&rgba);
                Ok(())
            }
            _ => Err(ResistError::Host("pixel outside canvas".into())),
        }
    }

    fn lookup(&self, target: TargetType, name: &str) -> Option<(TargetType, &Member<FakeRef>)> {
        let mut current = Some(target);
        while let Some(t) = current {
            if let Some(member) = self.descriptors.get(&t).and_then(|table| table.get(name)) {
                return Some((t, member));
            }
            current = t.parent();
        }
        None
    }

    /// Property read, as page code would do it.
    ///
    /// Facade values come back as one shared object per kind whose own
    /// members shadow the prototype's.
    pub fn get(&self, obj: &FakeRef, name: &str) -> Result<Value<FakeRef>> {
        if let Some(value) = obj.facade().and_then(|facade| facade_member(facade, name)) {
            return Ok(value);
        }
        let value = match self.lookup(obj.target(), name) {
            Some((_, Member::Data { value, .. })) => value.clone(),
            Some((_, Member::Accessor { get: Some(get), .. })) => get.invoke(obj, &[])?,
            Some((_, Member::Accessor { get: None, .. })) | None => Value::Undefined,
        };
        Ok(match value {
            Value::Facade(facade) => Value::Object(self.facade_object(facade)),
            other => other,
        })
    }

    fn facade_object(&self, facade: Facade) -> FakeRef {
        let mut cache = self.facades.borrow_mut();
        if let Some((_, obj)) = cache.iter().find(|(kind, _)| *kind == facade) {
            return obj.clone();
        }
        let obj = FakeRef::new(facade.prototype(), FakeState::Facade(facade));
        cache.push((facade, obj.clone()));
        obj
    }

    /// Property assignment, with strict-mode failures.
    pub fn set(&mut self, obj: &FakeRef, name: &str, value: Value<FakeRef>) -> Result<()> {
        let not_writable = || ResistError::NotWritable {
            target: obj.target(),
            member: name.to_string(),
        };
        // Facades are frozen
        if obj.facade().is_some() {
            return Err(not_writable());
        }
        let owner = match self.lookup(obj.target(), name) {
            Some((_, Member::Accessor { set: Some(set), .. })) => {
                set.invoke(obj, &[value])?;
                return Ok(());
            }
            Some((_, Member::Accessor { set: None, .. })) => return Err(not_writable()),
            Some((_, Member::Data {
                writable: false, ..
            })) => return Err(not_writable()),
            Some((owner, Member::Data { .. })) => owner,
            None => obj.target(),
        };

        let table = self.descriptors.entry(owner).or_default();
        match table.get_mut(name) {
            Some(Member::Data { value: slot, .. }) => *slot = value,
            _ => {
                table.insert(name.to_string(), data(value));
            }
        }
        Ok(())
    }

    /// Method call, as page code would do it.
    pub fn call(&self, obj: &FakeRef, name: &str, args: &[Value<FakeRef>]) -> Result<Value<FakeRef>> {
        match self.get(obj, name)? {
            Value::Function(f) => f.invoke(obj, args),
            other => Err(ResistError::Host(format!(
                "{}.{} is {}, not a function",
                obj.target(),
                name,
                other.type_name()
            ))),
        }
    }

    fn table(&mut self, target: TargetType) -> &mut Table {
        self.descriptors.entry(target).or_default()
    }

    fn seed(&mut self) {
        self.seed_performance();
        self.seed_screen();
        self.seed_window();
        self.seed_events();
        self.seed_navigator();
        self.seed_canvas();
        self.seed_date();
    }

    fn seed_performance(&mut self) {
        let clock = Rc::clone(&self.clock);
        self.table(TargetType::Performance).insert(
            "now".into(),
            method(move |_, _| Ok(Value::Number(clock.now()))),
        );

        let timing = FakeRef::new(TargetType::PerformanceTiming, FakeState::Plain);
        self.table(TargetType::Performance).insert(
            "timing".into(),
            getter(move |_, _| Ok(Value::Object(timing.clone()))),
        );
        let timing_table = self.table(TargetType::PerformanceTiming);
        timing_table.insert(
            "navigationStart".into(),
            getter(|_, _| Ok(Value::Number(1_700_000_000_123.0))),
        );
        timing_table.insert(
            "fetchStart".into(),
            getter(|_, _| Ok(Value::Number(1_700_000_000_131.0))),
        );
    }

    fn seed_screen(&mut self) {
        let viewport = Rc::clone(&self.viewport);
        let screen = self.table(TargetType::Screen);
        for (name, value) in [
            ("availLeft", 2560.0),
            ("availTop", 25.0),
            ("left", 2560.0),
            ("top", 0.0),
            ("colorDepth", 30.0),
        ] {
            screen.insert(name.into(), getter(move |_, _| Ok(Value::Number(value))));
        }
        screen.insert(
            "mozOrientation".into(),
            getter(|_, _| Ok(Value::Str("portrait-primary".into()))),
        );
        let v = Rc::clone(&viewport);
        screen.insert(
            "width".into(),
            getter(move |_, _| Ok(Value::Number(v.screen.get().0))),
        );
        let v = Rc::clone(&viewport);
        screen.insert(
            "height".into(),
            getter(move |_, _| Ok(Value::Number(v.screen.get().1))),
        );
        let v = Rc::clone(&viewport);
        screen.insert(
            "availWidth".into(),
            getter(move |_, _| Ok(Value::Number(v.screen.get().0))),
        );
        let v = viewport;
        screen.insert(
            "availHeight".into(),
            getter(move |_, _| Ok(Value::Number(v.screen.get().1 - 40.0))),
        );
        screen.insert("onmozorientationchange".into(), data(Value::Null));

        let handler: Rc<RefCell<Value<FakeRef>>> = Rc::new(RefCell::new(Value::Null));
        let orientation = self.table(TargetType::ScreenOrientation);
        orientation.insert(
            "type".into(),
            getter(|_, _| Ok(Value::Str("portrait-primary".into()))),
        );
        orientation.insert("angle".into(), getter(|_, _| Ok(Value::Number(90.0))));
        let read = Rc::clone(&handler);
        let write = handler;
        orientation.insert(
            "onchange".into(),
            Member::Accessor {
                get: Some(host_fn(move |_, _| Ok(read.borrow().clone()))),
                set: Some(host_fn(move |_, args| {
                    *write.borrow_mut() = args.first().cloned().unwrap_or(Value::Undefined);
                    Ok(Value::Undefined)
                })),
                configurable: true,
            },
        );
    }

    fn seed_window(&mut self) {
        let viewport = Rc::clone(&self.viewport);
        let prompt = Rc::clone(&self.prompt);
        let window = self.table(TargetType::Window);

        window.insert("screenX".into(), getter(|_, _| Ok(Value::Number(37.0))));
        window.insert("screenY".into(), getter(|_, _| Ok(Value::Number(42.0))));
        window.insert("devicePixelRatio".into(), data(Value::Number(2.0)));
        let v = Rc::clone(&viewport);
        window.insert(
            "innerWidth".into(),
            getter(move |_, _| Ok(Value::Number(v.inner.get().0))),
        );
        let v = Rc::clone(&viewport);
        window.insert(
            "innerHeight".into(),
            getter(move |_, _| Ok(Value::Number(v.inner.get().1))),
        );
        let v = Rc::clone(&viewport);
        window.insert(
            "outerWidth".into(),
            getter(move |_, _| Ok(Value::Number(v.outer.get().0))),
        );
        let v = viewport;
        window.insert(
            "outerHeight".into(),
            getter(move |_, _| Ok(Value::Number(v.outer.get().1))),
        );
        window.insert(
            "confirm".into(),
            method(move |_, args| {
                let message = args.first().and_then(|a| a.as_str()).unwrap_or_default();
                Ok(Value::Bool(prompt.confirm(message).unwrap_or(false)))
            }),
        );
    }

    fn seed_events(&mut self) {
        self.table(TargetType::Event).insert(
            "timeStamp".into(),
            getter(|this, _| Ok(Value::Number(this.event()?.time_stamp))),
        );

        let mouse = self.table(TargetType::MouseEvent);
        mouse.insert(
            "screenX".into(),
            getter(|this, _| Ok(Value::Number(this.event()?.screen_x))),
        );
        mouse.insert(
            "screenY".into(),
            getter(|this, _| Ok(Value::Number(this.event()?.screen_y))),
        );
        mouse.insert(
            "clientX".into(),
            getter(|this, _| Ok(Value::Number(this.event()?.client_x))),
        );
        mouse.insert(
            "clientY".into(),
            getter(|this, _| Ok(Value::Number(this.event()?.client_y))),
        );
    }

    fn seed_navigator(&mut self) {
        let plugins = FakeRef::new(TargetType::PluginArray, FakeState::Plain);
        let mime_types = FakeRef::new(TargetType::MimeTypeArray, FakeState::Plain);

        let navigator = self.table(TargetType::Navigator);
        navigator.insert("buildID".into(), data(Value::Str("20181001000000".into())));
        navigator.insert(
            "getBattery".into(),
            method(|_, _| Ok(Value::Str("BatteryManager".into()))),
        );
        navigator.insert(
            "hardwareConcurrency".into(),
            getter(|_, _| Ok(Value::Number(16.0))),
        );
        navigator.insert(
            "language".into(),
            getter(|_, _| Ok(Value::Str("de-DE".into()))),
        );
        navigator.insert(
            "languages".into(),
            getter(|_, _| {
                Ok(Value::List(vec!["de-DE".into(), "de".into(), "en".into()]))
            }),
        );
        navigator.insert(
            "plugins".into(),
            getter(move |_, _| Ok(Value::Object(plugins.clone()))),
        );
        navigator.insert(
            "mimeTypes".into(),
            getter(move |_, _| Ok(Value::Object(mime_types.clone()))),
        );

        for (target, names) in [
            (TargetType::PluginArray, ["PDF Viewer", "Chrome PDF Viewer"]),
            (TargetType::MimeTypeArray, ["application/pdf", "text/pdf"]),
        ] {
            let table = self.table(target);
            table.insert(
                "length".into(),
                getter(move |_, _| Ok(Value::Number(names.len() as f64))),
            );
            table.insert(
                "item".into(),
                method(move |_, args| {
                    let index = args.first().and_then(|a| a.as_f64()).unwrap_or(-1.0);
                    Ok(names
                        .get(index as usize)
                        .filter(|_| index >= 0.0)
                        .map(|n| Value::Str(n.to_string()))
                        .unwrap_or(Value::Null))
                }),
            );
            table.insert(
                "namedItem".into(),
                method(move |_, args| {
                    let name = args.first().and_then(|a| a.as_str()).unwrap_or_default();
                    Ok(names
                        .iter()
                        .find(|n| **n == name)
                        .map(|n| Value::Str(n.to_string()))
                        .unwrap_or(Value::Null))
                }),
            );
        }
    }

    fn seed_canvas(&mut self) {
        let canvas = self.table(TargetType::HtmlCanvasElement);
        canvas.insert(
            "width".into(),
            getter(|this, _| Ok(Value::Number(FakeCanvases.dimensions(this)?.0 as f64))),
        );
        canvas.insert(
            "height".into(),
            getter(|this, _| Ok(Value::Number(FakeCanvases.dimensions(this)?.1 as f64))),
        );
        canvas.insert(
            "toDataURL".into(),
            method(|this, args| {
                let mime = args.first().and_then(|a| a.as_str()).unwrap_or("image/png");
                Ok(Value::Str(format!(
                    "data:{};base64,{}",
                    encoded_type(mime),
                    encode_canvas(this)?
                )))
            }),
        );
        canvas.insert(
            "toBlob".into(),
            method(|this, args| {
                let callback = match args.first() {
                    Some(Value::Function(f)) => f.clone(),
                    _ => return Err(ResistError::Host("toBlob needs a callback".into())),
                };
                let mime = args.get(1).and_then(|a| a.as_str()).unwrap_or("image/png");
                let blob = format!("blob:{}:{}", encoded_type(mime), encode_canvas(this)?);
                callback.invoke(this, &[Value::Str(blob)])?;
                Ok(Value::Undefined)
            }),
        );
    }

    fn seed_date(&mut self) {
        let zone = Rc::clone(&self.zone);
        let date = self.table(TargetType::Date);
        for unit in CalendarUnit::ALL {
            for op in [AccessorOp::Get, AccessorOp::Set] {
                let Some((local, utc)) = accessor_names(unit, op) else {
                    continue;
                };
                for (name, is_utc) in [(local, false), (utc, true)] {
                    let zone = Rc::clone(&zone);
                    let offset = move |_ms: f64| {
                        if is_utc {
                            0.0
                        } else {
                            zone.offset_minutes() * 60_000.0
                        }
                    };
                    let member = match op {
                        AccessorOp::Get => method(move |this, _| {
                            let ms = this.date_ms()?;
                            Ok(Value::Number(calendar::read(ms + offset(ms), unit)))
                        }),
                        AccessorOp::Set => method(move |this, args| {
                            let ms = this.date_ms()?;
                            let shift = offset(ms);
                            let updated = calendar::write(ms + shift, unit, args) - shift;
                            this.set_date_ms(updated);
                            Ok(Value::Number(updated))
                        }),
                    };
                    date.insert(name.into(), member);
                }
            }
        }
    }
}

fn host_fn(
    f: impl Fn(&FakeRef, &[Value<FakeRef>]) -> Result<Value<FakeRef>> + 'static,
) -> Callable<FakeRef> {
    let body: NativeFn<FakeRef> = Rc::new(f);
    Callable::host(body, None)
}

fn method(
    f: impl Fn(&FakeRef, &[Value<FakeRef>]) -> Result<Value<FakeRef>> + 'static,
) -> Member<FakeRef> {
    data(Value::Function(host_fn(f)))
}

fn getter(
    f: impl Fn(&FakeRef, &[Value<FakeRef>]) -> Result<Value<FakeRef>> + 'static,
) -> Member<FakeRef> {
    Member::Accessor {
        get: Some(host_fn(f)),
        set: None,
        configurable: true,
    }
}

/// Own members of a facade object.
fn facade_member(facade: Facade, name: &str) -> Option<Value<FakeRef>> {
    if !facade.is_enumeration() {
        return facade.timing_member(name).map(Value::Number);
    }
    match name {
        "length" => Some(Value::Number(facade.len() as f64)),
        "item" | "namedItem" => Some(Value::Function(host_fn(|_, _| Ok(Value::Null)))),
        "refresh" if facade == Facade::EmptyPlugins => {
            Some(Value::Function(host_fn(|_, _| Ok(Value::Undefined))))
        }
        _ => None,
    }
}

fn data(value: Value<FakeRef>) -> Member<FakeRef> {
    Member::Data {
        value,
        writable: true,
        configurable: true,
    }
}

/// Browsers fall back to PNG for types they cannot encode.
fn encoded_type(mime: &str) -> &str {
    match mime {
        "image/png" | "image/jpeg" | "image/webp" => mime,
        _ => "image/png",
    }
}

/// Deterministic stand-in for an image encoder: size header plus raw pixels.
fn encode_canvas(canvas: &FakeRef) -> Result<String> {
    match &*canvas.0.state.borrow() {
        FakeState::Canvas {
            width,
            height,
            pixels,
        } => {
            let mut bytes = Vec::with_capacity(8 + pixels.len());
            bytes.extend_from_slice(&width.to_be_bytes());
            bytes.extend_from_slice(&height.to_be_bytes());
            bytes.extend_from_slice(pixels);
            Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
        }
        _ => Err(not_a(canvas, "canvas")),
    }
}

impl HostBindings for FakeHost {
    type Object = FakeRef;

    fn has_target(&self, target: TargetType) -> bool {
        self.descriptors.contains_key(&target)
    }

    fn member(&self, target: TargetType, name: &str) -> Result<Option<Member<FakeRef>>> {
        Ok(self.lookup(target, name).map(|(_, member)| member.clone()))
    }

    fn define(&mut self, target: TargetType, name: &str, member: Member<FakeRef>) -> Result<()> {
        if self
            .failing
            .iter()
            .any(|(t, m)| *t == target && m == name)
        {
            return Err(ResistError::InjectedFailure {
                target,
                member: name.to_string(),
            });
        }

        let table = self
            .descriptors
            .get_mut(&target)
            .ok_or(ResistError::TargetUnavailable(target))?;
        if let Some(existing) = table.get(name) {
            if !existing.is_configurable() {
                return Err(ResistError::NotConfigurable {
                    target,
                    member: name.to_string(),
                });
            }
        }
        table.insert(name.to_string(), member);
        Ok(())
    }

    fn screen(&self) -> Rc<dyn ScreenInfo> {
        self.viewport.clone()
    }

    fn pointer(&self) -> Rc<dyn PointerEventSource<FakeRef>> {
        Rc::new(FakePointer)
    }

    fn canvas(&self) -> Rc<dyn CanvasSource<FakeRef>> {
        Rc::new(FakeCanvases)
    }

    fn prompt(&self) -> Rc<dyn ConsentPrompt> {
        self.prompt.clone()
    }

    fn debug_enabled(&self) -> bool {
        self.debug
    }

    fn render_diagnostic(&mut self, diagnostic: &Diagnostic) -> Result<()> {
        self.rendered.push(diagnostic.clone());
        Ok(())
    }

    fn claim_installation(&mut self) -> bool {
        !std::mem::replace(&mut self.installed, true)
    }
}

/// Proleptic Gregorian calendar arithmetic on millisecond timestamps.
mod calendar {
    use super::{CalendarUnit, Value};

    const MS_PER_DAY: f64 = 86_400_000.0;

    #[derive(Debug, Clone, Copy)]
    struct Fields {
        year: f64,
        month: f64,
        date: f64,
        hours: f64,
        minutes: f64,
        seconds: f64,
        millis: f64,
    }

    fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
        let y = if month <= 2 { year - 1 } else { year };
        let era = if y >= 0 { y } else { y - 399 } / 400;
        let yoe = y - era * 400;
        let mp = (month + 9) % 12;
        let doy = (153 * mp + 2) / 5 + day - 1;
        let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
        era * 146_097 + doe - 719_468
    }

    fn civil_from_days(days: i64) -> (i64, i64, i64) {
        let z = days + 719_468;
        let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
        let doe = z - era * 146_097;
        let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
        let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
        let mp = (5 * doy + 2) / 153;
        let day = doy - (153 * mp + 2) / 5 + 1;
        let month = if mp < 10 { mp + 3 } else { mp - 9 };
        let year = yoe + era * 400 + if month <= 2 { 1 } else { 0 };
        (year, month, day)
    }

    fn split(ms: f64) -> (Fields, f64) {
        let days = (ms / MS_PER_DAY).floor();
        let time = ms - days * MS_PER_DAY;
        let (year, month, date) = civil_from_days(days as i64);
        let fields = Fields {
            year: year as f64,
            month: (month - 1) as f64,
            date: date as f64,
            hours: (time / 3_600_000.0).floor(),
            minutes: (time / 60_000.0).floor() % 60.0,
            seconds: (time / 1000.0).floor() % 60.0,
            millis: time % 1000.0,
        };
        (fields, days)
    }

    fn compose(f: Fields) -> f64 {
        let year = f.year + (f.month / 12.0).floor();
        let month = f.month.rem_euclid(12.0);
        let days = days_from_civil(year as i64, month as i64 + 1, 1) as f64 + f.date - 1.0;
        days * MS_PER_DAY + f.hours * 3_600_000.0 + f.minutes * 60_000.0 + f.seconds * 1000.0
            + f.millis
    }

    pub(super) fn read(ms: f64, unit: CalendarUnit) -> f64 {
        if ms.is_nan() {
            return f64::NAN;
        }
        let (f, days) = split(ms);
        match unit {
            CalendarUnit::Date => f.date,
            CalendarUnit::Day => (days + 4.0).rem_euclid(7.0),
            CalendarUnit::FullYear => f.year,
            CalendarUnit::Hours => f.hours,
            CalendarUnit::Milliseconds => f.millis,
            CalendarUnit::Minutes => f.minutes,
            CalendarUnit::Month => f.month,
            CalendarUnit::Seconds => f.seconds,
        }
    }

    /// Apply a setter's arguments (`setHours(h, m?, s?, ms?)` and friends).
    pub(super) fn write<O>(ms: f64, unit: CalendarUnit, args: &[Value<O>]) -> f64 {
        let arg = |i: usize| args.get(i).and_then(|a| a.as_f64());
        let Some(first) = arg(0) else {
            return f64::NAN;
        };
        if ms.is_nan() {
            return f64::NAN;
        }

        let (mut f, _) = split(ms);
        match unit {
            CalendarUnit::FullYear => {
                f.year = first;
                f.month = arg(1).unwrap_or(f.month);
                f.date = arg(2).unwrap_or(f.date);
            }
            CalendarUnit::Month => {
                f.month = first;
                f.date = arg(1).unwrap_or(f.date);
            }
            CalendarUnit::Date => f.date = first,
            CalendarUnit::Hours => {
                f.hours = first;
                f.minutes = arg(1).unwrap_or(f.minutes);
                f.seconds = arg(2).unwrap_or(f.seconds);
                f.millis = arg(3).unwrap_or(f.millis);
            }
            CalendarUnit::Minutes => {
                f.minutes = first;
                f.seconds = arg(1).unwrap_or(f.seconds);
                f.millis = arg(2).unwrap_or(f.millis);
            }
            CalendarUnit::Seconds => {
                f.seconds = first;
                f.millis = arg(1).unwrap_or(f.millis);
            }
            CalendarUnit::Milliseconds => f.millis = first,
            CalendarUnit::Day => return f64::NAN,
        }
        compose(f)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_epoch_fields() {
            assert_eq!(read(0.0, CalendarUnit::FullYear), 1970.0);
            assert_eq!(read(0.0, CalendarUnit::Month), 0.0);
            assert_eq!(read(0.0, CalendarUnit::Date), 1.0);
            assert_eq!(read(0.0, CalendarUnit::Day), 4.0);
        }

        #[test]
        fn test_known_instant() {
            // 2024-02-29T13:45:30.250Z, a Thursday
            let ms = 1_709_214_330_250.0;
            assert_eq!(read(ms, CalendarUnit::FullYear), 2024.0);
            assert_eq!(read(ms, CalendarUnit::Month), 1.0);
            assert_eq!(read(ms, CalendarUnit::Date), 29.0);
            assert_eq!(read(ms, CalendarUnit::Day), 4.0);
            assert_eq!(read(ms, CalendarUnit::Hours), 13.0);
            assert_eq!(read(ms, CalendarUnit::Minutes), 45.0);
            assert_eq!(read(ms, CalendarUnit::Seconds), 30.0);
            assert_eq!(read(ms, CalendarUnit::Milliseconds), 250.0);
        }

        #[test]
        fn test_write_overflows_like_js() {
            let ms = 1_709_214_330_250.0;
            let next = write::<()>(ms, CalendarUnit::Month, &[Value::Number(12.0)]);
            assert_eq!(read(next, CalendarUnit::FullYear), 2025.0);
            assert_eq!(read(next, CalendarUnit::Month), 0.0);

            let hours = write::<()>(ms, CalendarUnit::Hours, &[Value::Number(25.0)]);
            assert_eq!(read(hours, CalendarUnit::Date), 1.0);
            assert_eq!(read(hours, CalendarUnit::Hours), 1.0);
        }

        #[test]
        fn test_round_trip_before_epoch() {
            let ms = -86_400_000.0 * 365.0 - 1.0;
            let (f, _) = split(ms);
            assert_eq!(compose(f), ms);
        }
    }
}
