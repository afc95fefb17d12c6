//! Host-neutral value model.
//!
//! Overrides are built against these types so the same catalog installs on
//! the real browser (`O = JsValue`) and on the in-memory fake host.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::capability::TargetType;
use super::profile::NormalizedProfile;
use crate::error::Result;

/// A callable body: `(receiver, arguments) -> result`.
pub type NativeFn<O> = Rc<dyn Fn(&O, &[Value<O>]) -> Result<Value<O>>>;

/// Where a callable came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallableOrigin {
    /// Read from the host; reinstalling it installs the host function itself.
    Host,
    /// Built by the applier; the host wraps it in a native function.
    Replacement,
}

/// A function value plus, when known, the host function it stands for.
///
/// `native` lets a host give a replacement the name, arity and
/// `toString()` of the function it replaces.
pub struct Callable<O> {
    call: NativeFn<O>,
    native: Option<O>,
    origin: CallableOrigin,
}

impl<O> Callable<O> {
    pub fn host(call: NativeFn<O>, native: Option<O>) -> Self {
        Self {
            call,
            native,
            origin: CallableOrigin::Host,
        }
    }

    pub fn replacement(call: NativeFn<O>, template: Option<O>) -> Self {
        Self {
            call,
            native: template,
            origin: CallableOrigin::Replacement,
        }
    }

    pub fn invoke(&self, this: &O, args: &[Value<O>]) -> Result<Value<O>> {
        (self.call)(this, args)
    }

    pub fn native(&self) -> Option<&O> {
        self.native.as_ref()
    }

    pub fn origin(&self) -> CallableOrigin {
        self.origin
    }

    pub fn body(&self) -> NativeFn<O> {
        Rc::clone(&self.call)
    }
}

impl<O: Clone> Clone for Callable<O> {
    fn clone(&self) -> Self {
        Self {
            call: Rc::clone(&self.call),
            native: self.native.clone(),
            origin: self.origin,
        }
    }
}

impl<O> fmt::Debug for Callable<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("origin", &self.origin)
            .field("has_native", &self.native.is_some())
            .finish()
    }
}

/// Zero-information stand-ins that keep the shape of the type they replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Facade {
    /// `PluginArray` with no entries.
    EmptyPlugins,
    /// `MimeTypeArray` with no entries.
    EmptyMimeTypes,
    /// `PerformanceTiming` with every member at 0.
    ZeroedTiming,
}

impl Facade {
    /// The type descriptor whose shape the facade keeps.
    pub fn prototype(self) -> TargetType {
        match self {
            Facade::EmptyPlugins => TargetType::PluginArray,
            Facade::EmptyMimeTypes => TargetType::MimeTypeArray,
            Facade::ZeroedTiming => TargetType::PerformanceTiming,
        }
    }

    pub fn is_enumeration(self) -> bool {
        matches!(self, Facade::EmptyPlugins | Facade::EmptyMimeTypes)
    }

    /// Entry count (`length`) of an enumeration facade.
    pub fn len(self) -> u32 {
        0
    }

    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// Member read on a timing facade.
    pub fn timing_member(self, name: &str) -> Option<f64> {
        match self {
            Facade::ZeroedTiming => NormalizedProfile::PERFORMANCE_TIMING_MEMBERS
                .contains(&name)
                .then_some(0.0),
            _ => None,
        }
    }
}

/// A value that can be stored in a member or passed through a call.
pub enum Value<O> {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    /// Frozen list of strings (`navigator.languages`).
    List(Vec<String>),
    Object(O),
    Function(Callable<O>),
    Facade(Facade),
}

impl<O> Value<O> {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_callable(&self) -> Option<&Callable<O>> {
        match self {
            Value::Function(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&O> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
            Value::Facade(_) => "facade",
        }
    }
}

impl<O: Clone> Clone for Value<O> {
    fn clone(&self) -> Self {
        match self {
            Value::Undefined => Value::Undefined,
            Value::Null => Value::Null,
            Value::Bool(b) => Value::Bool(*b),
            Value::Number(n) => Value::Number(*n),
            Value::Str(s) => Value::Str(s.clone()),
            Value::List(l) => Value::List(l.clone()),
            Value::Object(o) => Value::Object(o.clone()),
            Value::Function(c) => Value::Function(c.clone()),
            Value::Facade(f) => Value::Facade(*f),
        }
    }
}

impl<O: fmt::Debug> fmt::Debug for Value<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "Undefined"),
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Number(n) => write!(f, "Number({})", n),
            Value::Str(s) => write!(f, "Str({:?})", s),
            Value::List(l) => write!(f, "List({:?})", l),
            Value::Object(o) => write!(f, "Object({:?})", o),
            Value::Function(c) => write!(f, "{:?}", c),
            Value::Facade(facade) => write!(f, "Facade({:?})", facade),
        }
    }
}

/// Functions compare by identity, everything else by value.
impl<O: PartialEq> PartialEq for Value<O> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(&a.call, &b.call),
            (Value::Facade(a), Value::Facade(b)) => a == b,
            _ => false,
        }
    }
}

/// Static data a catalog entry can carry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(&'static str),
    List(&'static [&'static str]),
}

impl Literal {
    pub fn to_value<O>(self) -> Value<O> {
        match self {
            Literal::Undefined => Value::Undefined,
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(b),
            Literal::Number(n) => Value::Number(n),
            Literal::Str(s) => Value::Str(s.to_string()),
            Literal::List(items) => Value::List(items.iter().map(|s| s.to_string()).collect()),
        }
    }
}

/// A member as stored on a shared type descriptor.
pub enum Member<O> {
    Data {
        value: Value<O>,
        writable: bool,
        configurable: bool,
    },
    Accessor {
        get: Option<Callable<O>>,
        set: Option<Callable<O>>,
        configurable: bool,
    },
}

impl<O> Member<O> {
    pub fn is_configurable(&self) -> bool {
        match self {
            Member::Data { configurable, .. } | Member::Accessor { configurable, .. } => {
                *configurable
            }
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Member::Data { .. } => "data",
            Member::Accessor { .. } => "accessor",
        }
    }
}

impl<O: Clone> Clone for Member<O> {
    fn clone(&self) -> Self {
        match self {
            Member::Data {
                value,
                writable,
                configurable,
            } => Member::Data {
                value: value.clone(),
                writable: *writable,
                configurable: *configurable,
            },
            Member::Accessor {
                get,
                set,
                configurable,
            } => Member::Accessor {
                get: get.clone(),
                set: set.clone(),
                configurable: *configurable,
            },
        }
    }
}

impl<O: fmt::Debug> fmt::Debug for Member<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Member::Data {
                value,
                writable,
                configurable,
            } => f
                .debug_struct("Data")
                .field("value", value)
                .field("writable", writable)
                .field("configurable", configurable)
                .finish(),
            Member::Accessor {
                get,
                set,
                configurable,
            } => f
                .debug_struct("Accessor")
                .field("get", &get.is_some())
                .field("set", &set.is_some())
                .field("configurable", configurable)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enumeration_facades_are_empty() {
        for facade in [Facade::EmptyPlugins, Facade::EmptyMimeTypes] {
            assert!(facade.is_enumeration());
            assert!(facade.is_empty());
            assert_eq!(facade.timing_member("length"), None);
        }
        assert_eq!(Facade::EmptyPlugins.prototype(), TargetType::PluginArray);
    }

    #[test]
    fn test_timing_facade() {
        let timing = Facade::ZeroedTiming;
        assert!(!timing.is_enumeration());
        assert_eq!(timing.timing_member("navigationStart"), Some(0.0));
        assert_eq!(timing.timing_member("toJSON"), None);
        assert_eq!(timing.prototype(), TargetType::PerformanceTiming);
    }

    #[test]
    fn test_function_identity() {
        let body: NativeFn<u8> = Rc::new(|_, _| Ok(Value::Null));
        let a: Value<u8> = Value::Function(Callable::replacement(body.clone(), None));
        let b = a.clone();
        let c: Value<u8> = Value::Function(Callable::replacement(Rc::new(|_, _| Ok(Value::Null)), None));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_literal_list() {
        let value: Value<u8> = Literal::List(&["en-US", "en"]).to_value();
        assert_eq!(value, Value::List(vec!["en-US".into(), "en".into()]));
    }
}
