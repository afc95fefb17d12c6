//! Browser host bindings.
//!
//! Replacement functions are installed as `Proxy` objects whose target is the
//! host function they replace, with an `apply` trap that runs the WASM
//! closure. `Function.prototype.toString()` on a proxied function reports the
//! target's source, so a replacement still reads `[native code]` with the
//! original name and arity.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use js_sys::{Array, Function, Object, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use super::capability::{
    CanvasSource, ConsentPrompt, HostBindings, PointerEventSource, ScreenInfo, TargetType,
};
use super::profile::NormalizedProfile;
use super::report::Diagnostic;
use super::value::{Callable, CallableOrigin, Facade, Member, Value};
use crate::error::{ResistError, Result};

thread_local! {
    static INSTALLED: Cell<bool> = const { Cell::new(false) };
    static FACADES: RefCell<Vec<(Facade, JsValue)>> = const { RefCell::new(Vec::new()) };
}

type TrapFn = dyn FnMut(JsValue, JsValue, JsValue) -> std::result::Result<JsValue, JsValue>;
type ApplyTrap = Closure<TrapFn>;

/// Host bindings over the page's global object.
pub struct WebHost {
    global: JsValue,
    prompt: Rc<WebPrompt>,
}

impl WebHost {
    /// Bind to the current global. `window.confirm` is captured here, before
    /// anything is overridden.
    pub fn new() -> Result<Self> {
        let global: JsValue = js_sys::global().into();
        let confirm = Reflect::get(&global, &JsValue::from_str("confirm"))?
            .dyn_into::<Function>()
            .ok();
        Ok(Self {
            prompt: Rc::new(WebPrompt {
                window: global.clone(),
                confirm,
            }),
            global,
        })
    }

    /// The object whose descriptor `target` names: a constructor's
    /// prototype, or the global object itself for `Window`.
    fn target_object(&self, target: TargetType) -> Result<Option<JsValue>> {
        let Some(name) = target.constructor_name() else {
            return Ok(Some(self.global.clone()));
        };
        let ctor = Reflect::get(&self.global, &JsValue::from_str(name))?;
        if !ctor.is_function() {
            return Ok(None);
        }
        let proto = Reflect::get(&ctor, &JsValue::from_str("prototype"))?;
        Ok(proto.is_object().then_some(proto))
    }

    fn require(&self, target: TargetType) -> Result<JsValue> {
        self.target_object(target)?
            .ok_or(ResistError::TargetUnavailable(target))
    }
}

impl HostBindings for WebHost {
    type Object = JsValue;

    fn has_target(&self, target: TargetType) -> bool {
        matches!(self.target_object(target), Ok(Some(_)))
    }

    fn member(&self, target: TargetType, name: &str) -> Result<Option<Member<JsValue>>> {
        let key = JsValue::from_str(name);
        let mut current = self.require(target)?;
        while current.is_object() {
            let descriptor = Object::get_own_property_descriptor::<JsValue>(current.unchecked_ref(), &key);
            if !descriptor.is_undefined() {
                return member_from_descriptor(&descriptor).map(Some);
            }
            current = Object::get_prototype_of(&current).into();
        }
        Ok(None)
    }

    fn define(&mut self, target: TargetType, name: &str, member: Member<JsValue>) -> Result<()> {
        let obj = self.require(target)?;
        let key = JsValue::from_str(name);

        let own = Object::get_own_property_descriptor::<JsValue>(obj.unchecked_ref(), &key);
        if !own.is_undefined()
            && !Reflect::get(&own, &JsValue::from_str("configurable"))?.is_truthy()
        {
            return Err(ResistError::NotConfigurable {
                target,
                member: name.to_string(),
            });
        }

        let descriptor = Object::new();
        let put = |field: &str, value: &JsValue| {
            Reflect::set(&descriptor, &JsValue::from_str(field), value)
        };
        match &member {
            Member::Data {
                value,
                writable,
                configurable,
            } => {
                put("value", &to_js(value)?)?;
                put("writable", &JsValue::from_bool(*writable))?;
                put("configurable", &JsValue::from_bool(*configurable))?;
            }
            Member::Accessor {
                get,
                set,
                configurable,
            } => {
                if let Some(get) = get {
                    put("get", &function_to_js(get)?)?;
                }
                if let Some(set) = set {
                    put("set", &function_to_js(set)?)?;
                }
                put("configurable", &JsValue::from_bool(*configurable))?;
            }
        }
        put("enumerable", &JsValue::TRUE)?;

        define_property(&obj, &key, &descriptor)?;
        Ok(())
    }

    fn screen(&self) -> Rc<dyn ScreenInfo> {
        Rc::new(WebScreen)
    }

    fn pointer(&self) -> Rc<dyn PointerEventSource<JsValue>> {
        Rc::new(WebPointer)
    }

    fn canvas(&self) -> Rc<dyn CanvasSource<JsValue>> {
        Rc::new(WebCanvas)
    }

    fn prompt(&self) -> Rc<dyn ConsentPrompt> {
        self.prompt.clone()
    }

    fn debug_enabled(&self) -> bool {
        Reflect::get(&self.global, &JsValue::from_str(NormalizedProfile::DEBUG_FLAG))
            .map(|flag| flag.is_truthy())
            .unwrap_or(false)
    }

    fn render_diagnostic(&mut self, diagnostic: &Diagnostic) -> Result<()> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| ResistError::Host("no document".into()))?;
        let body = document
            .body()
            .ok_or_else(|| ResistError::Host("document has no body".into()))?;
        let div = document.create_element("div")?;
        div.set_class_name(Diagnostic::CLASS);
        div.set_text_content(Some(&diagnostic.text()));
        body.append_child(&div)?;
        Ok(())
    }

    fn claim_installation(&mut self) -> bool {
        INSTALLED.with(|installed| !installed.replace(true))
    }
}

/// `window.innerWidth` / `window.innerHeight`.
struct WebScreen;

impl ScreenInfo for WebScreen {
    fn inner_width(&self) -> Result<f64> {
        let window = web_sys::window().ok_or_else(|| ResistError::Host("no window".into()))?;
        number(window.inner_width()?, "innerWidth")
    }

    fn inner_height(&self) -> Result<f64> {
        let window = web_sys::window().ok_or_else(|| ResistError::Host("no window".into()))?;
        number(window.inner_height()?, "innerHeight")
    }
}

struct WebPointer;

impl PointerEventSource<JsValue> for WebPointer {
    fn client_x(&self, event: &JsValue) -> Result<f64> {
        number(Reflect::get(event, &JsValue::from_str("clientX"))?, "clientX")
    }

    fn client_y(&self, event: &JsValue) -> Result<f64> {
        number(Reflect::get(event, &JsValue::from_str("clientY"))?, "clientY")
    }
}

struct WebCanvas;

impl CanvasSource<JsValue> for WebCanvas {
    fn dimensions(&self, canvas: &JsValue) -> Result<(u32, u32)> {
        let width = number(Reflect::get(canvas, &JsValue::from_str("width"))?, "width")?;
        let height = number(Reflect::get(canvas, &JsValue::from_str("height"))?, "height")?;
        Ok((width as u32, height as u32))
    }

    fn create_blank(&self, width: u32, height: u32) -> Result<JsValue> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| ResistError::Host("no document".into()))?;
        let canvas: web_sys::HtmlCanvasElement = document
            .create_element("canvas")?
            .dyn_into()
            .map_err(|_| ResistError::Host("created element is not a canvas".into()))?;
        canvas.set_width(width);
        canvas.set_height(height);
        Ok(canvas.into())
    }
}

/// The page's own `window.confirm`, captured before installation.
struct WebPrompt {
    window: JsValue,
    confirm: Option<Function>,
}

impl ConsentPrompt for WebPrompt {
    fn confirm(&self, message: &str) -> Result<bool> {
        let confirm = self
            .confirm
            .as_ref()
            .ok_or_else(|| ResistError::ConsentUnavailable("window.confirm is missing".into()))?;
        let answer = Reflect::apply(confirm, &self.window, &Array::of1(&JsValue::from_str(message)))
            .map_err(|e| ResistError::ConsentUnavailable(ResistError::from(e).to_string()))?;
        Ok(answer.is_truthy())
    }
}

fn number(value: JsValue, what: &str) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| ResistError::Host(format!("{} is not a number", what)))
}

/// `Object.defineProperty`, which throws instead of returning false.
fn define_property(obj: &JsValue, key: &JsValue, descriptor: &Object) -> Result<()> {
    let define: Function = js_sys::eval("Object.defineProperty")?
        .dyn_into()
        .map_err(|_| ResistError::Host("Object.defineProperty not found".into()))?;
    Reflect::apply(&define, &JsValue::UNDEFINED, &Array::of3(obj, key, descriptor))?;
    Ok(())
}

fn member_from_descriptor(descriptor: &JsValue) -> Result<Member<JsValue>> {
    let field = |name: &str| Reflect::get(descriptor, &JsValue::from_str(name));
    let has = |name: &str| Reflect::has(descriptor, &JsValue::from_str(name));
    let configurable = field("configurable")?.is_truthy();

    if has("get")? || has("set")? {
        let callable = |f: JsValue| f.is_function().then(|| host_callable(f));
        return Ok(Member::Accessor {
            get: callable(field("get")?),
            set: callable(field("set")?),
            configurable,
        });
    }
    Ok(Member::Data {
        value: from_js(field("value")?),
        writable: field("writable")?.is_truthy(),
        configurable,
    })
}

/// A host function as a callable that applies it with the given receiver.
fn host_callable(function: JsValue) -> Callable<JsValue> {
    let target = function.clone();
    Callable::host(
        Rc::new(move |this: &JsValue, args: &[Value<JsValue>]| {
            let list = Array::new();
            for arg in args {
                list.push(&to_js(arg)?);
            }
            let result = Reflect::apply::<fn() -> JsValue>(target.unchecked_ref(), this, &list)?;
            Ok(from_js(result))
        }),
        Some(function),
    )
}

fn from_js(value: JsValue) -> Value<JsValue> {
    if value.is_undefined() {
        Value::Undefined
    } else if value.is_null() {
        Value::Null
    } else if let Some(b) = value.as_bool() {
        Value::Bool(b)
    } else if let Some(n) = value.as_f64() {
        Value::Number(n)
    } else if let Some(s) = value.as_string() {
        Value::Str(s)
    } else if value.is_function() {
        Value::Function(host_callable(value))
    } else {
        Value::Object(value)
    }
}

fn to_js(value: &Value<JsValue>) -> Result<JsValue> {
    Ok(match value {
        Value::Undefined => JsValue::UNDEFINED,
        Value::Null => JsValue::NULL,
        Value::Bool(b) => JsValue::from_bool(*b),
        Value::Number(n) => JsValue::from_f64(*n),
        Value::Str(s) => JsValue::from_str(s),
        Value::List(items) => {
            let list = Array::new();
            for item in items {
                list.push(&JsValue::from_str(item));
            }
            Object::freeze(&list).into()
        }
        Value::Object(obj) => obj.clone(),
        Value::Function(callable) => function_to_js(callable)?,
        Value::Facade(facade) => facade_object(*facade)?,
    })
}

/// Host callables go back in as the host function itself; replacements are
/// wrapped in a proxy of the function they impersonate.
fn function_to_js(callable: &Callable<JsValue>) -> Result<JsValue> {
    if callable.origin() == CallableOrigin::Host {
        if let Some(native) = callable.native() {
            return Ok(native.clone());
        }
    }

    let target = match callable.native() {
        Some(native) => native.clone(),
        None => Closure::wrap(Box::new(|| JsValue::UNDEFINED) as Box<dyn FnMut() -> JsValue>)
            .into_js_value(),
    };

    let body = callable.clone();
    let trap: ApplyTrap = Closure::wrap(Box::new(
        move |_target: JsValue, this: JsValue, args: JsValue| -> std::result::Result<JsValue, JsValue> {
            let args: Vec<Value<JsValue>> = args.unchecked_into::<Array>().iter().map(from_js).collect();
            body.invoke(&this, &args)
                .and_then(|result| to_js(&result))
                .map_err(JsValue::from)
        },
    ) as Box<TrapFn>);
    proxy_function_with_apply(&target, trap)
}

fn proxy_function_with_apply(target: &JsValue, trap: ApplyTrap) -> Result<JsValue> {
    let handler = Object::new();
    Reflect::set(&handler, &JsValue::from_str("apply"), trap.as_ref())?;
    trap.forget();

    let proxy = js_sys::Proxy::new(target, &handler);
    Ok(proxy.into())
}

/// One shared object per facade kind, so repeated reads compare equal.
fn facade_object(facade: Facade) -> Result<JsValue> {
    let cached = FACADES.with(|cache| {
        cache
            .borrow()
            .iter()
            .find(|(kind, _)| *kind == facade)
            .map(|(_, obj)| obj.clone())
    });
    if let Some(obj) = cached {
        return Ok(obj);
    }

    let built = build_facade(facade)?;
    FACADES.with(|cache| cache.borrow_mut().push((facade, built.clone())));
    Ok(built)
}

fn build_facade(facade: Facade) -> Result<JsValue> {
    let global: JsValue = js_sys::global().into();
    let proto = facade
        .prototype()
        .constructor_name()
        .map(|name| Reflect::get(&global, &JsValue::from_str(name)))
        .transpose()?
        .filter(|ctor| ctor.is_function())
        .map(|ctor| Reflect::get(&ctor, &JsValue::from_str("prototype")))
        .transpose()?
        .filter(|proto| proto.is_object())
        .unwrap_or_else(|| Object::new().into());
    let obj: JsValue = Object::<JsValue>::create(proto.unchecked_ref()).into();

    let fixed = |name: &str, value: &JsValue| -> Result<()> {
        let descriptor = Object::new();
        Reflect::set(&descriptor, &JsValue::from_str("value"), value)?;
        Reflect::set(&descriptor, &JsValue::from_str("enumerable"), &JsValue::TRUE)?;
        define_property(&obj, &JsValue::from_str(name), &descriptor)
    };
    let returning_null = || {
        Closure::wrap(Box::new(|| JsValue::NULL) as Box<dyn FnMut() -> JsValue>).into_js_value()
    };

    if facade.is_enumeration() {
        fixed("length", &JsValue::from_f64(facade.len() as f64))?;
        fixed("item", &returning_null())?;
        fixed("namedItem", &returning_null())?;
        if facade == Facade::EmptyPlugins {
            let refresh = Closure::wrap(Box::new(|| {}) as Box<dyn FnMut()>).into_js_value();
            fixed("refresh", &refresh)?;
        }
    } else {
        let snapshot = Object::new();
        for name in NormalizedProfile::PERFORMANCE_TIMING_MEMBERS {
            let value = JsValue::from_f64(facade.timing_member(name).unwrap_or(0.0));
            fixed(name, &value)?;
            Reflect::set(&snapshot, &JsValue::from_str(name), &value)?;
        }
        let to_json = Closure::wrap(Box::new(move || -> JsValue { snapshot.clone().into() })
            as Box<dyn FnMut() -> JsValue>)
        .into_js_value();
        fixed("toJSON", &to_json)?;
    }

    Object::freeze(obj.unchecked_ref::<Object>());
    Ok(obj)
}
