//! Override applier
//!
//! Walks the catalog once, in order. For each entry the current member is
//! captured before anything is replaced, so a replacement that delegates to
//! the original calls the host's behavior and never itself. Every member is
//! defined non-configurable on the shared descriptor, so no later script
//! (and no second pass) can swap it out again.

use std::cell::RefCell;
use std::rc::Rc;

use super::capability::{HostBindings, TargetType};
use super::catalog::{Axis, Behavior, Dimension, OverrideCatalog, OverrideKind, OverrideSpec};
use super::consent::ConsentGate;
use super::normalize::quantize_time;
use super::report::{EntryOutcome, EntryResult, InstallReport};
use super::value::{Callable, Literal, Member, NativeFn, Value};
use crate::error::{ResistError, Result};

pub struct OverrideApplier<'h, H: HostBindings> {
    host: &'h mut H,
    gate: Rc<ConsentGate>,
}

impl<'h, H: HostBindings> OverrideApplier<'h, H> {
    pub fn new(host: &'h mut H, consent_message: &str) -> Self {
        let gate = Rc::new(ConsentGate::new(host.prompt(), consent_message));
        Self { host, gate }
    }

    /// Gate shared by every canvas extraction entry.
    pub fn gate(&self) -> Rc<ConsentGate> {
        Rc::clone(&self.gate)
    }

    /// Install every entry. A failing entry is recorded and the pass goes on.
    pub fn apply(&mut self, catalog: &OverrideCatalog) -> InstallReport {
        let mut outcomes = Vec::with_capacity(catalog.len());
        for spec in catalog.entries() {
            let outcome = match self.install(spec) {
                Ok(result) => {
                    log::debug!("{}.{}: {:?}", spec.target, spec.member, result);
                    EntryOutcome::new(spec, result)
                }
                Err(e) => {
                    log::warn!("Failed to override {}.{}: {}", spec.target, spec.member, e);
                    EntryOutcome::failed(spec, &e)
                }
            };
            outcomes.push(outcome);
        }
        InstallReport::from_entries(outcomes)
    }

    fn install(&mut self, spec: &OverrideSpec) -> Result<EntryResult> {
        if !self.host.has_target(spec.target) {
            if spec.optional {
                return Ok(EntryResult::Skipped);
            }
            return Err(ResistError::TargetUnavailable(spec.target));
        }

        // Capture before anything on the descriptor changes
        let existing = self.host.member(spec.target, spec.member)?;
        let delegate = match spec.delegate_member() {
            Some(name) => {
                let member = if name == spec.member {
                    existing.clone()
                } else {
                    self.host.member(spec.target, name)?
                };
                Some(member.ok_or_else(|| ResistError::MissingOriginal {
                    target: spec.target,
                    member: name.to_string(),
                })?)
            }
            None => None,
        };
        let originals = Originals { existing, delegate };

        let replacement = self.build(spec, originals)?;
        self.host.define(spec.target, spec.member, replacement)?;
        Ok(EntryResult::Installed)
    }

    fn build(
        &self,
        spec: &OverrideSpec,
        originals: Originals<H::Object>,
    ) -> Result<Member<H::Object>> {
        let member = match spec.kind {
            OverrideKind::Constant => Member::Data {
                value: self.constant_value(spec, originals)?,
                writable: false,
                configurable: false,
            },
            OverrideKind::Getter => Member::Accessor {
                get: Some(self.getter(spec, originals)?),
                set: None,
                configurable: false,
            },
            OverrideKind::SetterAndGetter => {
                let Behavior::Slot(initial) = spec.behavior else {
                    return Err(mismatch(spec, "setter-and-getter needs a slot"));
                };
                let (get, set) = slot(initial);
                Member::Accessor {
                    get: Some(get),
                    set: Some(set),
                    configurable: false,
                }
            }
            OverrideKind::Mutable => {
                let Behavior::Literal(literal) = spec.behavior else {
                    return Err(mismatch(spec, "mutable members hold a literal"));
                };
                Member::Data {
                    value: literal.to_value(),
                    writable: true,
                    configurable: false,
                }
            }
        };
        Ok(member)
    }

    fn constant_value(
        &self,
        spec: &OverrideSpec,
        originals: Originals<H::Object>,
    ) -> Result<Value<H::Object>> {
        let template = originals.method_native();
        let original = originals.delegate;
        let value = match spec.behavior {
            Behavior::Literal(literal) => literal.to_value(),
            Behavior::FreezeOriginal => match original {
                Some(Member::Data { value, .. }) => value,
                _ => return Err(mismatch(spec, "only data members can be frozen")),
            },
            Behavior::QuantizedMethod => {
                let original = original_method(spec, original)?;
                let delegate = original.body();
                let (target, member) = (spec.target, spec.member);
                let body: NativeFn<H::Object> =
                    Rc::new(move |this: &H::Object, args: &[Value<H::Object>]| {
                        quantized(target, member, delegate(this, args)?)
                    });
                Value::Function(Callable::replacement(body, template))
            }
            Behavior::UtcRedirect(_) => {
                let original = original_method(spec, original)?;
                let delegate = original.body();
                let body: NativeFn<H::Object> =
                    Rc::new(move |this: &H::Object, args: &[Value<H::Object>]| {
                        delegate(this, args)
                    });
                Value::Function(Callable::replacement(body, template))
            }
            Behavior::ConsentGatedExtraction => {
                let original = original_method(spec, original)?;
                let extract = original.body();
                let gate = Rc::clone(&self.gate);
                let canvases = self.host.canvas();
                let body: NativeFn<H::Object> =
                    Rc::new(move |this: &H::Object, args: &[Value<H::Object>]| {
                        let canvas = gate.select(this, canvases.as_ref())?;
                        extract(&canvas, args)
                    });
                Value::Function(Callable::replacement(body, template))
            }
            _ => return Err(mismatch(spec, "behavior cannot be a constant")),
        };
        Ok(value)
    }

    fn getter(
        &self,
        spec: &OverrideSpec,
        originals: Originals<H::Object>,
    ) -> Result<Callable<H::Object>> {
        let template = originals.getter_native();
        let original = originals.delegate;

        let (target, member) = (spec.target, spec.member);
        let body: NativeFn<H::Object> = match spec.behavior {
            Behavior::Literal(literal) => {
                Rc::new(move |_: &H::Object, _: &[Value<H::Object>]| Ok(literal.to_value()))
            }
            Behavior::QuantizedGetter => {
                let read = match original {
                    Some(Member::Accessor { get: Some(g), .. }) => g.body(),
                    _ => return Err(mismatch(spec, "original is not a getter")),
                };
                Rc::new(move |this: &H::Object, _: &[Value<H::Object>]| {
                    quantized(target, member, read(this, &[])?)
                })
            }
            Behavior::InnerViewport(dimension) => {
                let screen = self.host.screen();
                Rc::new(move |_: &H::Object, _: &[Value<H::Object>]| {
                    let value = match dimension {
                        Dimension::Width => screen.inner_width()?,
                        Dimension::Height => screen.inner_height()?,
                    };
                    Ok(Value::Number(value))
                })
            }
            Behavior::ClientCoordinate(axis) => {
                let pointer = self.host.pointer();
                Rc::new(move |event: &H::Object, _: &[Value<H::Object>]| {
                    let value = match axis {
                        Axis::X => pointer.client_x(event)?,
                        Axis::Y => pointer.client_y(event)?,
                    };
                    Ok(Value::Number(value))
                })
            }
            Behavior::Facade(facade) => {
                Rc::new(move |_: &H::Object, _: &[Value<H::Object>]| Ok(Value::Facade(facade)))
            }
            _ => return Err(mismatch(spec, "behavior cannot be a getter")),
        };
        Ok(Callable::replacement(body, template))
    }
}

/// Members captured before an entry is installed.
struct Originals<O> {
    /// Current value of the member being replaced.
    existing: Option<Member<O>>,
    /// Member the replacement delegates to.
    delegate: Option<Member<O>>,
}

impl<O: Clone> Originals<O> {
    /// Host function a replacement method should impersonate.
    fn method_native(&self) -> Option<O> {
        match &self.existing {
            Some(Member::Data {
                value: Value::Function(c),
                ..
            }) => c.native().cloned(),
            _ => None,
        }
    }

    /// Host getter a replacement accessor should impersonate.
    fn getter_native(&self) -> Option<O> {
        match &self.existing {
            Some(Member::Accessor { get: Some(g), .. }) => g.native().cloned(),
            _ => None,
        }
    }
}

fn mismatch(spec: &OverrideSpec, reason: &str) -> ResistError {
    ResistError::TypeMismatch {
        target: spec.target,
        member: spec.member.to_string(),
        reason: reason.to_string(),
    }
}

fn original_method<O>(spec: &OverrideSpec, original: Option<Member<O>>) -> Result<Callable<O>> {
    match original {
        Some(Member::Data {
            value: Value::Function(callable),
            ..
        }) => Ok(callable),
        Some(other) => Err(mismatch(
            spec,
            &format!("original is a {} member, not a method", other.kind_name()),
        )),
        None => Err(ResistError::MissingOriginal {
            target: spec.target,
            member: spec.delegate_member().unwrap_or(spec.member).to_string(),
        }),
    }
}

fn quantized<O>(target: TargetType, member: &str, raw: Value<O>) -> Result<Value<O>> {
    match raw {
        Value::Number(n) => Ok(Value::Number(quantize_time(n))),
        other => Err(ResistError::TypeMismatch {
            target,
            member: member.to_string(),
            reason: format!("expected a number, got {}", other.type_name()),
        }),
    }
}

/// Getter/setter pair over one private value.
fn slot<O: Clone + 'static>(initial: Literal) -> (Callable<O>, Callable<O>) {
    let cell: Rc<RefCell<Value<O>>> = Rc::new(RefCell::new(initial.to_value()));

    let read = Rc::clone(&cell);
    let get: NativeFn<O> = Rc::new(move |_: &O, _: &[Value<O>]| Ok(read.borrow().clone()));

    let write = cell;
    let set: NativeFn<O> = Rc::new(move |_: &O, args: &[Value<O>]| {
        *write.borrow_mut() = args.first().cloned().unwrap_or(Value::Undefined);
        Ok(Value::Undefined)
    });

    (
        Callable::replacement(get, None),
        Callable::replacement(set, None),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint_defense::catalog::CapabilityArea;
    use crate::fingerprint_defense::fake_host::FakeHost;
    use crate::fingerprint_defense::profile::ResistConfig;

    #[test]
    fn test_constant_is_frozen() {
        let mut host = FakeHost::new();
        let catalog = OverrideCatalog::standard(&ResistConfig::default()).unwrap();
        let report = OverrideApplier::new(&mut host, "allow?").apply(&catalog);
        assert_eq!(report.installed_count(), catalog.len());

        match host.member(TargetType::Navigator, "language").unwrap() {
            Some(Member::Data {
                writable,
                configurable,
                ..
            }) => {
                assert!(!writable);
                assert!(!configurable);
            }
            other => panic!("unexpected member {:?}", other),
        }
    }

    #[test]
    fn test_missing_original_is_reported() {
        let mut host = FakeHost::new();
        host.remove_member(TargetType::Performance, "now");
        let catalog = OverrideCatalog::new(vec![OverrideSpec::new(
            CapabilityArea::Clock,
            TargetType::Performance,
            "now",
            OverrideKind::Constant,
            Behavior::QuantizedMethod,
        )])
        .unwrap();

        let report = OverrideApplier::new(&mut host, "allow?").apply(&catalog);
        assert_eq!(report.installed_count(), 0);
        let outcome = report.outcome(TargetType::Performance, "now").unwrap();
        assert!(matches!(outcome.result, EntryResult::Failed { .. }));
    }

    #[test]
    fn test_second_pass_does_not_double_wrap() {
        let mut host = FakeHost::new();
        let catalog = OverrideCatalog::standard(&ResistConfig::default()).unwrap();
        OverrideApplier::new(&mut host, "allow?").apply(&catalog);
        let again = OverrideApplier::new(&mut host, "allow?").apply(&catalog);
        assert_eq!(again.installed_count(), 0);
        assert_eq!(again.failures().count(), catalog.len());

        host.clock().set(1234.0);
        let now = host.call(&host.performance_object(), "now", &[]).unwrap();
        assert_eq!(now, Value::Number(1200.0));
    }

    #[test]
    fn test_slot_round_trips_assignments() {
        let (get, set) = slot::<u8>(Literal::Null);
        assert_eq!(get.invoke(&0, &[]).unwrap(), Value::Null);
        set.invoke(&0, &[Value::Str("handler".into())]).unwrap();
        assert_eq!(get.invoke(&0, &[]).unwrap(), Value::Str("handler".into()));
    }
}
