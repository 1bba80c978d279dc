//! Attribute snapshot shim.
//!
//! The native attribute snapshot changed shape twice:
//!
//! 1. an inner class constructed with its enclosing packet and a string key
//! 2. a nested class constructed with a string key
//! 3. a nested class holding an `AttributeBase`, looked up by key through the
//!    static `IRegistry.ATTRIBUTE` registry
//!
//! Each logical operation is its own [`Capability`], so a build that only
//! differs in how the key is stored still reuses the value and modifier
//! strategies unchanged.

use std::fmt;

use tracing::instrument;
use uuid::Uuid;

use crate::capability::{Candidate, Capability};
use crate::error::{ProtocolError, Result};
use crate::protocol::attributes::{AttributeModifier, AttributeProperty, ModifierOperation};
use crate::runtime::{
    ConstructorRef, FieldRef, MethodRef, NativeObject, NativeType, NativeValue, RuntimeError,
    SharedRuntime,
};

pub const UPDATE_ATTRIBUTES_CLASS: &str = "PacketPlayOutUpdateAttributes";
pub const ATTRIBUTE_SNAPSHOT_CLASS: &str = "PacketPlayOutUpdateAttributes$AttributeSnapshot";
pub const ATTRIBUTE_BASE_CLASS: &str = "AttributeBase";
pub const ATTRIBUTE_MODIFIER_CLASS: &str = "AttributeModifier";
pub const REGISTRY_CLASS: &str = "IRegistry";
pub const MINECRAFT_KEY_CLASS: &str = "MinecraftKey";

pub const OP_REGISTRY_LOOKUP: &str = "attribute.registry_lookup";
pub const OP_SNAPSHOT_CONSTRUCT: &str = "attribute_snapshot.construct";
pub const OP_SNAPSHOT_KEY: &str = "attribute_snapshot.key";
pub const OP_SNAPSHOT_VALUE: &str = "attribute_snapshot.value";
pub const OP_SNAPSHOT_MODIFIERS: &str = "attribute_snapshot.modifiers";
pub const OP_MODIFIER_FIELDS: &str = "attribute_modifier.fields";
pub const OP_MODIFIER_CONSTRUCT: &str = "attribute_modifier.construct";

/// How a snapshot is constructed on this build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstructStrategy {
    /// `(outer packet, key, value, modifiers)`; the outer instance is passed as null.
    WithOuter(ConstructorRef),
    /// `(key, value, modifiers)`
    StringKey(ConstructorRef),
    /// `(attribute base, value, modifiers)`
    RegistryBase(ConstructorRef),
}

/// Handles for turning a key into an `AttributeBase`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryLookup {
    registry: FieldRef,
    get: MethodRef,
    key_constructor: ConstructorRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyStrategy {
    Direct(FieldRef),
    ViaBase { base: FieldRef, name: FieldRef },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifierFields {
    uuid: FieldRef,
    name: FieldRef,
    amount: FieldRef,
    operation: FieldRef,
}

fn snapshot_constructor(rt: &SharedRuntime, params: Vec<NativeType>) -> Option<ConstructorRef> {
    let snapshot = rt.class(ATTRIBUTE_SNAPSHOT_CLASS)?;
    rt.constructor(&snapshot, &params)
}

fn probe_with_outer(rt: &SharedRuntime) -> Option<ConstructStrategy> {
    rt.class(UPDATE_ATTRIBUTES_CLASS)?;
    snapshot_constructor(
        rt,
        vec![
            NativeType::object(UPDATE_ATTRIBUTES_CLASS),
            NativeType::Str,
            NativeType::Double,
            NativeType::Collection,
        ],
    )
    .map(ConstructStrategy::WithOuter)
}

fn probe_string_key(rt: &SharedRuntime) -> Option<ConstructStrategy> {
    snapshot_constructor(rt, vec![NativeType::Str, NativeType::Double, NativeType::Collection])
        .map(ConstructStrategy::StringKey)
}

fn probe_registry_base(rt: &SharedRuntime) -> Option<ConstructStrategy> {
    rt.class(ATTRIBUTE_BASE_CLASS)?;
    snapshot_constructor(
        rt,
        vec![
            NativeType::object(ATTRIBUTE_BASE_CLASS),
            NativeType::Double,
            NativeType::Collection,
        ],
    )
    .map(ConstructStrategy::RegistryBase)
}

fn probe_registry(rt: &SharedRuntime) -> Option<RegistryLookup> {
    let registry_class = rt.class(REGISTRY_CLASS)?;
    let key_class = rt.class(MINECRAFT_KEY_CLASS)?;
    Some(RegistryLookup {
        registry: rt.static_field(&registry_class, "ATTRIBUTE")?,
        get: rt.method(
            &registry_class,
            "get",
            &[NativeType::object(MINECRAFT_KEY_CLASS)],
        )?,
        key_constructor: rt.constructor(&key_class, &[NativeType::Str])?,
    })
}

fn probe_direct_key(rt: &SharedRuntime) -> Option<KeyStrategy> {
    let snapshot = rt.class(ATTRIBUTE_SNAPSHOT_CLASS)?;
    rt.field_of_type(&snapshot, &NativeType::Str, 0)
        .map(KeyStrategy::Direct)
}

fn probe_key_via_base(rt: &SharedRuntime) -> Option<KeyStrategy> {
    let snapshot = rt.class(ATTRIBUTE_SNAPSHOT_CLASS)?;
    let base_class = rt.class(ATTRIBUTE_BASE_CLASS)?;
    Some(KeyStrategy::ViaBase {
        base: rt.field_of_type(&snapshot, &NativeType::object(ATTRIBUTE_BASE_CLASS), 0)?,
        name: rt.field_of_type(&base_class, &NativeType::Str, 0)?,
    })
}

fn probe_snapshot_field(rt: &SharedRuntime, ty: NativeType) -> Option<FieldRef> {
    let snapshot = rt.class(ATTRIBUTE_SNAPSHOT_CLASS)?;
    rt.field_of_type(&snapshot, &ty, 0)
}

fn probe_modifier_fields(rt: &SharedRuntime) -> Option<ModifierFields> {
    let modifier = rt.class(ATTRIBUTE_MODIFIER_CLASS)?;
    Some(ModifierFields {
        uuid: rt.field_of_type(&modifier, &NativeType::Uuid, 0)?,
        name: rt.field_of_type(&modifier, &NativeType::Str, 0)?,
        amount: rt.field_of_type(&modifier, &NativeType::Double, 0)?,
        operation: rt.field_of_type(&modifier, &NativeType::Int, 0)?,
    })
}

fn probe_modifier_constructor(rt: &SharedRuntime) -> Option<ConstructorRef> {
    let modifier = rt.class(ATTRIBUTE_MODIFIER_CLASS)?;
    rt.constructor(
        &modifier,
        &[NativeType::Uuid, NativeType::Str, NativeType::Double, NativeType::Int],
    )
}

fn status<C, S>(capability: &Capability<C, S>) -> Option<(&'static str, Option<&'static str>)> {
    capability
        .is_resolved()
        .then(|| (capability.operation(), capability.bound_candidate()))
}

/// Resolver-backed access to native attribute snapshots.
pub struct AttributeShim {
    runtime: SharedRuntime,
    registry: Capability<SharedRuntime, RegistryLookup>,
    construct: Capability<SharedRuntime, ConstructStrategy>,
    key: Capability<SharedRuntime, KeyStrategy>,
    value: Capability<SharedRuntime, FieldRef>,
    modifiers: Capability<SharedRuntime, FieldRef>,
    modifier_fields: Capability<SharedRuntime, ModifierFields>,
    modifier_construct: Capability<SharedRuntime, ConstructorRef>,
}

impl fmt::Debug for AttributeShim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeShim")
            .field("build", &self.runtime.build())
            .field("resolved", &self.resolved_operations())
            .finish()
    }
}

impl AttributeShim {
    pub fn new(runtime: SharedRuntime) -> Self {
        Self {
            runtime,
            registry: Capability::new(OP_REGISTRY_LOOKUP)
                .candidate(Candidate::new("static_registry_get", probe_registry)),
            construct: Capability::new(OP_SNAPSHOT_CONSTRUCT)
                .candidate(Candidate::new("outer_instance_string_key", probe_with_outer))
                .candidate(Candidate::new("string_key", probe_string_key))
                .candidate(Candidate::new("attribute_base", probe_registry_base)),
            key: Capability::new(OP_SNAPSHOT_KEY)
                .candidate(Candidate::new("string_field", probe_direct_key))
                .candidate(Candidate::new("attribute_base_field", probe_key_via_base)),
            value: Capability::new(OP_SNAPSHOT_VALUE).candidate(Candidate::new(
                "double_field",
                |rt: &SharedRuntime| probe_snapshot_field(rt, NativeType::Double),
            )),
            modifiers: Capability::new(OP_SNAPSHOT_MODIFIERS).candidate(Candidate::new(
                "collection_field",
                |rt: &SharedRuntime| probe_snapshot_field(rt, NativeType::Collection),
            )),
            modifier_fields: Capability::new(OP_MODIFIER_FIELDS)
                .candidate(Candidate::new("typed_fields", probe_modifier_fields)),
            modifier_construct: Capability::new(OP_MODIFIER_CONSTRUCT).candidate(Candidate::new(
                "uuid_name_amount_operation",
                probe_modifier_constructor,
            )),
        }
    }

    pub fn runtime(&self) -> &SharedRuntime {
        &self.runtime
    }

    /// Operation name and bound candidate for every operation resolved so far.
    pub fn resolved_operations(&self) -> Vec<(&'static str, Option<&'static str>)> {
        [
            status(&self.registry),
            status(&self.construct),
            status(&self.key),
            status(&self.value),
            status(&self.modifiers),
            status(&self.modifier_fields),
            status(&self.modifier_construct),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Name of the bound construction candidate, resolving if needed.
    pub fn construct_mode(&self) -> Result<&'static str> {
        self.construct.resolve(&self.runtime)?;
        Ok(self.construct.bound_candidate().unwrap_or_default())
    }

    /// Wrap an existing native snapshot.
    pub fn wrap(&self, object: NativeObject) -> AttributeSnapshot<'_> {
        AttributeSnapshot { shim: self, object }
    }

    /// Construct a native snapshot.
    #[instrument(level = "debug", skip(self, modifiers), fields(build = self.runtime.build()))]
    pub fn create(
        &self,
        key: &str,
        value: f64,
        modifiers: &[AttributeModifier],
    ) -> Result<AttributeSnapshot<'_>> {
        let native_modifiers = NativeValue::Collection(
            modifiers
                .iter()
                .map(|m| self.native_modifier(m).map(NativeValue::Object))
                .collect::<Result<Vec<_>>>()?,
        );

        let object = match self.construct.resolve(&self.runtime)? {
            ConstructStrategy::WithOuter(ctor) => self.runtime.construct(
                ctor,
                vec![
                    NativeValue::Null,
                    NativeValue::Str(key.to_string()),
                    NativeValue::Double(value),
                    native_modifiers,
                ],
            )?,
            ConstructStrategy::StringKey(ctor) => self.runtime.construct(
                ctor,
                vec![
                    NativeValue::Str(key.to_string()),
                    NativeValue::Double(value),
                    native_modifiers,
                ],
            )?,
            ConstructStrategy::RegistryBase(ctor) => {
                let base = self.lookup_base(key)?;
                self.runtime.construct(
                    ctor,
                    vec![
                        NativeValue::Object(base),
                        NativeValue::Double(value),
                        native_modifiers,
                    ],
                )?
            }
        };
        Ok(self.wrap(object))
    }

    pub fn from_property(&self, property: &AttributeProperty) -> Result<AttributeSnapshot<'_>> {
        self.create(&property.key, property.value, &property.modifiers)
    }

    /// Look up the registered `AttributeBase` for `key`.
    pub fn lookup_base(&self, key: &str) -> Result<NativeObject> {
        let lookup = self.registry.resolve(&self.runtime)?;
        let key_object = self
            .runtime
            .construct(&lookup.key_constructor, vec![NativeValue::Str(key.to_string())])?;
        let registry = self.runtime.get(&lookup.registry, None)?.into_object()?;
        match self.runtime.invoke(
            &lookup.get,
            Some(&registry),
            vec![NativeValue::Object(key_object)],
        )? {
            NativeValue::Null => Err(RuntimeError::NotFound(key.to_string()).into()),
            found => Ok(found.into_object()?),
        }
    }

    /// Build a native modifier. The native name is the modifier's UUID, as the
    /// wire format does not carry names.
    pub fn native_modifier(&self, modifier: &AttributeModifier) -> Result<NativeObject> {
        let ctor = self.modifier_construct.resolve(&self.runtime)?;
        Ok(self.runtime.construct(
            ctor,
            vec![
                NativeValue::Uuid(modifier.uuid),
                NativeValue::Str(modifier.uuid.hyphenated().to_string()),
                NativeValue::Double(modifier.amount),
                NativeValue::Int(modifier.operation.ordinal()),
            ],
        )?)
    }

    pub fn read_modifier(&self, object: &NativeObject) -> Result<AttributeModifier> {
        let fields = self.modifier_fields.resolve(&self.runtime)?;
        let uuid: Uuid = self.runtime.get(&fields.uuid, Some(object))?.into_uuid()?;
        let amount = self.runtime.get(&fields.amount, Some(object))?.into_double()?;
        let ordinal = self.runtime.get(&fields.operation, Some(object))?.into_int()?;
        let operation =
            ModifierOperation::from_ordinal(ordinal).ok_or_else(|| ProtocolError::InvalidEnumValue {
                field: fields.operation.name().to_string(),
                value: ordinal,
            })?;
        Ok(AttributeModifier {
            uuid,
            amount,
            operation,
        })
    }

    /// Native display name of a modifier.
    pub fn modifier_name(&self, object: &NativeObject) -> Result<String> {
        let fields = self.modifier_fields.resolve(&self.runtime)?;
        Ok(self.runtime.get(&fields.name, Some(object))?.into_string()?)
    }
}

/// A native snapshot addressed through the shim.
#[derive(Clone)]
pub struct AttributeSnapshot<'s> {
    shim: &'s AttributeShim,
    object: NativeObject,
}

impl fmt::Debug for AttributeSnapshot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeSnapshot")
            .field("object", &self.object)
            .finish()
    }
}

impl<'s> AttributeSnapshot<'s> {
    pub fn native(&self) -> &NativeObject {
        &self.object
    }

    pub fn into_native(self) -> NativeObject {
        self.object
    }

    fn runtime(&self) -> &SharedRuntime {
        &self.shim.runtime
    }

    pub fn key(&self) -> Result<String> {
        match self.shim.key.resolve(self.runtime())? {
            KeyStrategy::Direct(field) => {
                Ok(self.runtime().get(field, Some(&self.object))?.into_string()?)
            }
            KeyStrategy::ViaBase { base, name } => {
                let base = self.runtime().get(base, Some(&self.object))?.into_object()?;
                Ok(self.runtime().get(name, Some(&base))?.into_string()?)
            }
        }
    }

    /// Replace the key. On registry builds the key must name a registered attribute.
    pub fn set_key(&self, key: &str) -> Result<()> {
        match self.shim.key.resolve(self.runtime())? {
            KeyStrategy::Direct(field) => {
                self.runtime()
                    .set(field, Some(&self.object), NativeValue::Str(key.to_string()))?;
            }
            KeyStrategy::ViaBase { base, .. } => {
                let resolved = self.shim.lookup_base(key)?;
                self.runtime()
                    .set(base, Some(&self.object), NativeValue::Object(resolved))?;
            }
        }
        Ok(())
    }

    pub fn value(&self) -> Result<f64> {
        let field = self.shim.value.resolve(self.runtime())?;
        Ok(self.runtime().get(field, Some(&self.object))?.into_double()?)
    }

    pub fn set_value(&self, value: f64) -> Result<()> {
        let field = self.shim.value.resolve(self.runtime())?;
        Ok(self
            .runtime()
            .set(field, Some(&self.object), NativeValue::Double(value))?)
    }

    /// Native modifier objects held by the snapshot.
    pub fn native_modifiers(&self) -> Result<Vec<NativeObject>> {
        let field = self.shim.modifiers.resolve(self.runtime())?;
        self.runtime()
            .get(field, Some(&self.object))?
            .into_collection()?
            .into_iter()
            .map(|item| item.into_object().map_err(ProtocolError::from))
            .collect()
    }

    pub fn modifiers(&self) -> Result<Vec<AttributeModifier>> {
        self.native_modifiers()?
            .iter()
            .map(|m| self.shim.read_modifier(m))
            .collect()
    }

    pub fn set_modifiers(&self, modifiers: &[AttributeModifier]) -> Result<()> {
        let field = self.shim.modifiers.resolve(self.runtime())?;
        let natives = modifiers
            .iter()
            .map(|m| self.shim.native_modifier(m).map(NativeValue::Object))
            .collect::<Result<Vec<_>>>()?;
        Ok(self
            .runtime()
            .set(field, Some(&self.object), NativeValue::Collection(natives))?)
    }

    pub fn to_property(&self) -> Result<AttributeProperty> {
        Ok(AttributeProperty {
            key: self.key()?,
            value: self.value()?,
            modifiers: self.modifiers()?,
        })
    }
}
