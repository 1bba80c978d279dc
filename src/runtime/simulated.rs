//! In-memory [`Runtime`] with a declared class table.
//!
//! Every shape lookup (`class`, `constructor`, `field_of_type`,
//! `static_field`, `method`) bumps a counter, so tests can tell how often a
//! caller went back to introspection.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use super::{
    ClassRef, ConstructorRef, FieldRef, MethodRef, NativeObject, NativeType, NativeValue, Runtime,
    RuntimeError,
};

type MethodBody = Arc<
    dyn Fn(
            &SimulatedRuntime,
            Option<&NativeObject>,
            Vec<NativeValue>,
        ) -> Result<NativeValue, RuntimeError>
        + Send
        + Sync,
>;

#[derive(Debug, Clone)]
struct SimField {
    name: Arc<str>,
    ty: NativeType,
}

#[derive(Debug, Clone)]
struct SimConstructor {
    params: Vec<NativeType>,
    /// Field slot each parameter is stored in; `None` discards it.
    slots: Vec<Option<usize>>,
}

#[derive(Clone)]
struct SimMethod {
    name: Arc<str>,
    params: Vec<NativeType>,
    body: MethodBody,
}

/// Backing state of a simulated instance.
#[derive(Debug)]
struct Instance {
    slots: RwLock<Vec<NativeValue>>,
}

/// Declares one class of a [`SimulatedRuntime`].
#[derive(Clone)]
pub struct ClassBuilder {
    name: Arc<str>,
    fields: Vec<SimField>,
    statics: Vec<(SimField, NativeValue)>,
    constructors: Vec<SimConstructor>,
    methods: Vec<SimMethod>,
}

impl ClassBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            fields: Vec::new(),
            statics: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Declare an instance field. Slots are numbered in declaration order.
    pub fn field(mut self, name: &str, ty: NativeType) -> Self {
        self.fields.push(SimField {
            name: Arc::from(name),
            ty,
        });
        self
    }

    pub fn static_field(mut self, name: &str, ty: NativeType, value: NativeValue) -> Self {
        self.statics.push((
            SimField {
                name: Arc::from(name),
                ty,
            },
            value,
        ));
        self
    }

    /// Declare a constructor whose i-th parameter is stored in `slots[i]`.
    pub fn constructor(mut self, params: Vec<NativeType>, slots: Vec<Option<usize>>) -> Self {
        self.constructors.push(SimConstructor { params, slots });
        self
    }

    pub fn method<F>(mut self, name: &str, params: Vec<NativeType>, body: F) -> Self
    where
        F: Fn(
                &SimulatedRuntime,
                Option<&NativeObject>,
                Vec<NativeValue>,
            ) -> Result<NativeValue, RuntimeError>
            + Send
            + Sync
            + 'static,
    {
        self.methods.push(SimMethod {
            name: Arc::from(name),
            params,
            body: Arc::new(body),
        });
        self
    }
}

pub struct SimulatedRuntimeBuilder {
    build: String,
    classes: HashMap<Arc<str>, ClassBuilder>,
}

impl SimulatedRuntimeBuilder {
    pub fn class(mut self, class: ClassBuilder) -> Self {
        self.classes.insert(Arc::clone(&class.name), class);
        self
    }

    pub fn build(self) -> SimulatedRuntime {
        SimulatedRuntime {
            build: self.build,
            classes: self.classes,
            lookups: AtomicUsize::new(0),
        }
    }
}

/// A runtime whose object model is declared up front.
pub struct SimulatedRuntime {
    build: String,
    classes: HashMap<Arc<str>, ClassBuilder>,
    lookups: AtomicUsize,
}

impl fmt::Debug for SimulatedRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut classes: Vec<_> = self.classes.keys().collect();
        classes.sort();
        f.debug_struct("SimulatedRuntime")
            .field("build", &self.build)
            .field("classes", &classes)
            .field("lookups", &self.lookup_count())
            .finish()
    }
}

fn no_member(class: &str, member: &str) -> RuntimeError {
    RuntimeError::NoSuchMember {
        class: class.to_string(),
        member: member.to_string(),
    }
}

fn poisoned() -> RuntimeError {
    RuntimeError::Invocation("instance lock poisoned".to_string())
}

fn check_args(params: &[NativeType], args: &[NativeValue]) -> Result<(), RuntimeError> {
    if params.len() != args.len() {
        return Err(RuntimeError::Invocation(format!(
            "expected {} arguments, got {}",
            params.len(),
            args.len()
        )));
    }
    for (param, arg) in params.iter().zip(args) {
        if !arg.conforms_to(param) {
            return Err(RuntimeError::TypeMismatch {
                expected: param.to_string(),
                found: arg.type_name(),
            });
        }
    }
    Ok(())
}

impl SimulatedRuntime {
    pub fn builder(build: &str) -> SimulatedRuntimeBuilder {
        SimulatedRuntimeBuilder {
            build: build.to_string(),
            classes: HashMap::new(),
        }
    }

    /// Number of shape lookups served so far.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn lookup(&self) {
        self.lookups.fetch_add(1, Ordering::SeqCst);
    }

    fn declared(&self, class: &str) -> Result<&ClassBuilder, RuntimeError> {
        self.classes
            .get(class)
            .ok_or_else(|| RuntimeError::NotFound(class.to_string()))
    }

    fn slot_of(&self, field: &FieldRef) -> Result<usize, RuntimeError> {
        self.declared(field.class())?
            .fields
            .iter()
            .position(|f| &*f.name == field.name())
            .ok_or_else(|| no_member(field.class(), field.name()))
    }

    fn instance<'o>(
        &self,
        field: &FieldRef,
        target: Option<&'o NativeObject>,
    ) -> Result<&'o Instance, RuntimeError> {
        let target = target.ok_or_else(|| {
            RuntimeError::Invocation(format!(
                "instance field '{}' read without a target",
                field.name()
            ))
        })?;
        if target.class() != field.class() {
            return Err(RuntimeError::TypeMismatch {
                expected: field.class().to_string(),
                found: target.class().to_string(),
            });
        }
        target.state::<Instance>().ok_or_else(|| {
            RuntimeError::Invocation(format!("foreign object of class '{}'", target.class()))
        })
    }
}

impl Runtime for SimulatedRuntime {
    fn build(&self) -> &str {
        &self.build
    }

    fn class(&self, name: &str) -> Option<ClassRef> {
        self.lookup();
        self.classes.get(name).map(|c| ClassRef::new(Arc::clone(&c.name)))
    }

    fn constructor(&self, class: &ClassRef, params: &[NativeType]) -> Option<ConstructorRef> {
        self.lookup();
        self.classes
            .get(class.name())?
            .constructors
            .iter()
            .find(|c| c.params == params)
            .map(|c| ConstructorRef::new(class.name(), c.params.clone()))
    }

    fn field_of_type(&self, class: &ClassRef, ty: &NativeType, index: usize) -> Option<FieldRef> {
        self.lookup();
        self.classes
            .get(class.name())?
            .fields
            .iter()
            .filter(|f| &f.ty == ty)
            .nth(index)
            .map(|f| FieldRef::new(class.name(), Arc::clone(&f.name), f.ty.clone(), false))
    }

    fn static_field(&self, class: &ClassRef, name: &str) -> Option<FieldRef> {
        self.lookup();
        self.classes
            .get(class.name())?
            .statics
            .iter()
            .find(|(f, _)| &*f.name == name)
            .map(|(f, _)| FieldRef::new(class.name(), Arc::clone(&f.name), f.ty.clone(), true))
    }

    fn method(&self, class: &ClassRef, name: &str, params: &[NativeType]) -> Option<MethodRef> {
        self.lookup();
        self.classes
            .get(class.name())?
            .methods
            .iter()
            .find(|m| &*m.name == name && m.params == params)
            .map(|m| MethodRef::new(class.name(), Arc::clone(&m.name), m.params.clone()))
    }

    fn construct(
        &self,
        ctor: &ConstructorRef,
        args: Vec<NativeValue>,
    ) -> Result<NativeObject, RuntimeError> {
        let class = self.declared(ctor.class())?;
        let declared = class
            .constructors
            .iter()
            .find(|c| c.params == ctor.params())
            .ok_or_else(|| no_member(ctor.class(), "<init>"))?;
        check_args(&declared.params, &args)?;

        let mut slots: Vec<NativeValue> = class
            .fields
            .iter()
            .map(|f| match f.ty {
                NativeType::Bool => NativeValue::Bool(false),
                NativeType::Int => NativeValue::Int(0),
                NativeType::Double => NativeValue::Double(0.0),
                _ => NativeValue::Null,
            })
            .collect();
        for (arg, slot) in args.into_iter().zip(&declared.slots) {
            if let Some(i) = *slot {
                let target = slots.get_mut(i).ok_or_else(|| no_member(ctor.class(), "<slot>"))?;
                *target = arg;
            }
        }

        Ok(NativeObject::new(
            Arc::clone(&class.name),
            Arc::new(Instance {
                slots: RwLock::new(slots),
            }),
        ))
    }

    fn get(
        &self,
        field: &FieldRef,
        target: Option<&NativeObject>,
    ) -> Result<NativeValue, RuntimeError> {
        if field.is_static() {
            return self
                .declared(field.class())?
                .statics
                .iter()
                .find(|(f, _)| &*f.name == field.name())
                .map(|(_, value)| value.clone())
                .ok_or_else(|| no_member(field.class(), field.name()));
        }
        let slot = self.slot_of(field)?;
        let instance = self.instance(field, target)?;
        let slots = instance.slots.read().map_err(|_| poisoned())?;
        slots
            .get(slot)
            .cloned()
            .ok_or_else(|| no_member(field.class(), field.name()))
    }

    fn set(
        &self,
        field: &FieldRef,
        target: Option<&NativeObject>,
        value: NativeValue,
    ) -> Result<(), RuntimeError> {
        if field.is_static() {
            return Err(RuntimeError::Invocation(format!(
                "static field '{}' is final",
                field.name()
            )));
        }
        if !value.conforms_to(field.ty()) {
            return Err(RuntimeError::TypeMismatch {
                expected: field.ty().to_string(),
                found: value.type_name(),
            });
        }
        let slot = self.slot_of(field)?;
        let instance = self.instance(field, target)?;
        let mut slots = instance.slots.write().map_err(|_| poisoned())?;
        let entry = slots
            .get_mut(slot)
            .ok_or_else(|| no_member(field.class(), field.name()))?;
        *entry = value;
        Ok(())
    }

    fn invoke(
        &self,
        method: &MethodRef,
        target: Option<&NativeObject>,
        args: Vec<NativeValue>,
    ) -> Result<NativeValue, RuntimeError> {
        let declared = self
            .declared(method.class())?
            .methods
            .iter()
            .find(|m| &*m.name == method.name() && m.params == method.params())
            .ok_or_else(|| no_member(method.class(), method.name()))?;
        if let Some(target) = target {
            if target.class() != method.class() {
                return Err(RuntimeError::TypeMismatch {
                    expected: method.class().to_string(),
                    found: target.class().to_string(),
                });
            }
        }
        check_args(&declared.params, &args)?;
        (declared.body)(self, target, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point_runtime() -> SimulatedRuntime {
        SimulatedRuntime::builder("test")
            .class(
                ClassBuilder::new("Point")
                    .field("x", NativeType::Int)
                    .field("y", NativeType::Int)
                    .field("label", NativeType::Str)
                    .static_field(
                        "ORIGIN_LABEL",
                        NativeType::Str,
                        NativeValue::Str("origin".into()),
                    )
                    .constructor(vec![NativeType::Int, NativeType::Int], vec![Some(0), Some(1)])
                    .method("sum", vec![], |rt, target, _| {
                        let class = ClassRef::new("Point");
                        let x = rt
                            .field_of_type(&class, &NativeType::Int, 0)
                            .ok_or_else(|| no_member("Point", "x"))?;
                        let y = rt
                            .field_of_type(&class, &NativeType::Int, 1)
                            .ok_or_else(|| no_member("Point", "y"))?;
                        let sum = rt.get(&x, target)?.into_int()? + rt.get(&y, target)?.into_int()?;
                        Ok(NativeValue::Int(sum))
                    }),
            )
            .build()
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn test_construct_get_set_invoke() {
        let rt = point_runtime();
        let class = rt.class("Point").expect("class");
        let ctor = rt
            .constructor(&class, &[NativeType::Int, NativeType::Int])
            .expect("ctor");
        let point = rt
            .construct(&ctor, vec![NativeValue::Int(2), NativeValue::Int(5)])
            .expect("construct");

        let y = rt.field_of_type(&class, &NativeType::Int, 1).expect("y");
        assert_eq!(rt.get(&y, Some(&point)).expect("get"), NativeValue::Int(5));
        rt.set(&y, Some(&point), NativeValue::Int(7)).expect("set");

        let sum = rt.method(&class, "sum", &[]).expect("method");
        assert_eq!(rt.invoke(&sum, Some(&point), vec![]).expect("invoke"), NativeValue::Int(9));

        let label = rt.field_of_type(&class, &NativeType::Str, 0).expect("label");
        assert_eq!(rt.get(&label, Some(&point)).expect("get"), NativeValue::Null);

        let origin = rt.static_field(&class, "ORIGIN_LABEL").expect("static");
        assert_eq!(rt.get(&origin, None).expect("get"), NativeValue::Str("origin".into()));
    }

    #[test]
    fn test_missing_shapes_are_none_and_counted() {
        let rt = point_runtime();
        assert!(rt.class("Missing").is_none());
        let class = ClassRef::new("Point");
        assert!(rt.constructor(&class, &[NativeType::Str]).is_none());
        assert!(rt.field_of_type(&class, &NativeType::Double, 0).is_none());
        assert!(rt.field_of_type(&class, &NativeType::Int, 2).is_none());
        assert!(rt.static_field(&class, "NOPE").is_none());
        assert_eq!(rt.lookup_count(), 5);
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn test_type_checks() {
        let rt = point_runtime();
        let ctor = ConstructorRef::new("Point", vec![NativeType::Int, NativeType::Int]);
        assert!(matches!(
            rt.construct(&ctor, vec![NativeValue::Int(1)]),
            Err(RuntimeError::Invocation(_))
        ));
        assert!(matches!(
            rt.construct(&ctor, vec![NativeValue::Int(1), NativeValue::Str("2".into())]),
            Err(RuntimeError::TypeMismatch { .. })
        ));

        let point = rt
            .construct(&ctor, vec![NativeValue::Int(1), NativeValue::Int(2)])
            .expect("construct");
        let x = FieldRef::new("Point", "x", NativeType::Int, false);
        assert!(matches!(
            rt.set(&x, Some(&point), NativeValue::Double(1.0)),
            Err(RuntimeError::TypeMismatch { .. })
        ));
        assert!(matches!(rt.get(&x, None), Err(RuntimeError::Invocation(_))));
    }
}
