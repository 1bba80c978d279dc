//! Prebuilt simulated runtimes for the three attribute-snapshot shapes.
//!
//! | build      | snapshot constructor                               | key storage     |
//! |------------|----------------------------------------------------|-----------------|
//! | `v1_8_R3`  | `(UpdateAttributes, String, double, Collection)`   | `String` field  |
//! | `v1_15_R1` | `(String, double, Collection)`                     | `String` field  |
//! | `v1_16_R3` | `(AttributeBase, double, Collection)`              | `AttributeBase` |
//!
//! The `v1_16_R3` base is resolved through `IRegistry.ATTRIBUTE`.

use std::sync::Arc;

use super::{
    ClassBuilder, ConstructorRef, FieldRef, NativeObject, NativeType, NativeValue, Runtime,
    RuntimeError, SimulatedRuntime,
};
use crate::shim::attribute::{
    ATTRIBUTE_BASE_CLASS, ATTRIBUTE_MODIFIER_CLASS, ATTRIBUTE_SNAPSHOT_CLASS, MINECRAFT_KEY_CLASS,
    REGISTRY_CLASS, UPDATE_ATTRIBUTES_CLASS,
};

/// Attribute keys the registry build knows about.
pub const REGISTERED_ATTRIBUTES: &[&str] = &[
    "generic.max_health",
    "generic.follow_range",
    "generic.knockback_resistance",
    "generic.movement_speed",
    "generic.attack_damage",
    "generic.attack_speed",
    "generic.armor",
    "generic.armor_toughness",
    "generic.luck",
];

fn modifier_class() -> ClassBuilder {
    ClassBuilder::new(ATTRIBUTE_MODIFIER_CLASS)
        .field("uuid", NativeType::Uuid)
        .field("name", NativeType::Str)
        .field("amount", NativeType::Double)
        .field("operation", NativeType::Int)
        .constructor(
            vec![NativeType::Uuid, NativeType::Str, NativeType::Double, NativeType::Int],
            vec![Some(0), Some(1), Some(2), Some(3)],
        )
}

/// Snapshot is an inner class; its constructor takes the enclosing packet.
pub fn outer_instance() -> SimulatedRuntime {
    SimulatedRuntime::builder("v1_8_R3")
        .class(ClassBuilder::new(UPDATE_ATTRIBUTES_CLASS).constructor(vec![], vec![]))
        .class(
            ClassBuilder::new(ATTRIBUTE_SNAPSHOT_CLASS)
                .field("this$0", NativeType::object(UPDATE_ATTRIBUTES_CLASS))
                .field("key", NativeType::Str)
                .field("value", NativeType::Double)
                .field("modifiers", NativeType::Collection)
                .constructor(
                    vec![
                        NativeType::object(UPDATE_ATTRIBUTES_CLASS),
                        NativeType::Str,
                        NativeType::Double,
                        NativeType::Collection,
                    ],
                    vec![Some(0), Some(1), Some(2), Some(3)],
                ),
        )
        .class(modifier_class())
        .build()
}

/// Snapshot is a static nested class keyed by a plain string.
pub fn string_key() -> SimulatedRuntime {
    SimulatedRuntime::builder("v1_15_R1")
        .class(ClassBuilder::new(UPDATE_ATTRIBUTES_CLASS).constructor(vec![], vec![]))
        .class(
            ClassBuilder::new(ATTRIBUTE_SNAPSHOT_CLASS)
                .field("key", NativeType::Str)
                .field("value", NativeType::Double)
                .field("modifiers", NativeType::Collection)
                .constructor(
                    vec![NativeType::Str, NativeType::Double, NativeType::Collection],
                    vec![Some(0), Some(1), Some(2)],
                ),
        )
        .class(modifier_class())
        .build()
}

/// Snapshot declares both the inner-class and the string-key constructor.
pub fn overlapping() -> SimulatedRuntime {
    SimulatedRuntime::builder("v1_8_R3_overlap")
        .class(ClassBuilder::new(UPDATE_ATTRIBUTES_CLASS).constructor(vec![], vec![]))
        .class(
            ClassBuilder::new(ATTRIBUTE_SNAPSHOT_CLASS)
                .field("this$0", NativeType::object(UPDATE_ATTRIBUTES_CLASS))
                .field("key", NativeType::Str)
                .field("value", NativeType::Double)
                .field("modifiers", NativeType::Collection)
                .constructor(
                    vec![NativeType::Str, NativeType::Double, NativeType::Collection],
                    vec![Some(1), Some(2), Some(3)],
                )
                .constructor(
                    vec![
                        NativeType::object(UPDATE_ATTRIBUTES_CLASS),
                        NativeType::Str,
                        NativeType::Double,
                        NativeType::Collection,
                    ],
                    vec![Some(0), Some(1), Some(2), Some(3)],
                ),
        )
        .class(modifier_class())
        .build()
}

fn registry_get(
    rt: &SimulatedRuntime,
    _registry: Option<&NativeObject>,
    args: Vec<NativeValue>,
) -> Result<NativeValue, RuntimeError> {
    let Some(NativeValue::Object(key)) = args.into_iter().next() else {
        return Ok(NativeValue::Null);
    };
    let key_field = FieldRef::new(MINECRAFT_KEY_CLASS, "key", NativeType::Str, false);
    let key = rt.get(&key_field, Some(&key))?.into_string()?;
    let path = key.strip_prefix("minecraft:").unwrap_or(&key);
    if !REGISTERED_ATTRIBUTES.contains(&path) {
        return Ok(NativeValue::Null);
    }
    let ctor = ConstructorRef::new(ATTRIBUTE_BASE_CLASS, vec![NativeType::Str]);
    let base = rt.construct(&ctor, vec![NativeValue::Str(path.to_string())])?;
    Ok(NativeValue::Object(base))
}

/// Snapshot references an `AttributeBase` looked up through the registry.
pub fn registry() -> SimulatedRuntime {
    let registry_instance = NativeObject::new(REGISTRY_CLASS, Arc::new(()));
    SimulatedRuntime::builder("v1_16_R3")
        .class(ClassBuilder::new(UPDATE_ATTRIBUTES_CLASS).constructor(vec![], vec![]))
        .class(
            ClassBuilder::new(ATTRIBUTE_BASE_CLASS)
                .field("name", NativeType::Str)
                .constructor(vec![NativeType::Str], vec![Some(0)]),
        )
        .class(
            ClassBuilder::new(MINECRAFT_KEY_CLASS)
                .field("key", NativeType::Str)
                .constructor(vec![NativeType::Str], vec![Some(0)]),
        )
        .class(
            ClassBuilder::new(REGISTRY_CLASS)
                .static_field(
                    "ATTRIBUTE",
                    NativeType::object(REGISTRY_CLASS),
                    NativeValue::Object(registry_instance),
                )
                .method("get", vec![NativeType::object(MINECRAFT_KEY_CLASS)], registry_get),
        )
        .class(
            ClassBuilder::new(ATTRIBUTE_SNAPSHOT_CLASS)
                .field("base", NativeType::object(ATTRIBUTE_BASE_CLASS))
                .field("value", NativeType::Double)
                .field("modifiers", NativeType::Collection)
                .constructor(
                    vec![
                        NativeType::object(ATTRIBUTE_BASE_CLASS),
                        NativeType::Double,
                        NativeType::Collection,
                    ],
                    vec![Some(0), Some(1), Some(2)],
                ),
        )
        .class(modifier_class())
        .build()
}

/// All three builds, oldest first.
pub fn all() -> Vec<SimulatedRuntime> {
    vec![outer_instance(), string_key(), registry()]
}
