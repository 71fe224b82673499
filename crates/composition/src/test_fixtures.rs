//! Type universe and a fake artifact builder shared by unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use amalgam_types::{ConstructorInfo, TypeInfo, TypeRef};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::artifact::{ArtifactBuilder, DefinitionBuilder, DescriptorRecovery, ResolvedDefinition};
use crate::cache::{CompoundCacheKey, ParticipantState};
use crate::descriptor::{ClassDescriptor, MixinBinding, MixinOrigin};
use crate::error::{AssemblyError, CompositionError};

pub(crate) fn object() -> TypeRef {
	TypeInfo::class("System.Object")
		.constructor(ConstructorInfo::public([]))
		.build()
}

pub(crate) fn string() -> TypeRef {
	TypeInfo::class("System.String").extends(&object()).build()
}

pub(crate) fn double() -> TypeRef {
	TypeInfo::class("System.Double").extends(&object()).build()
}

pub(crate) fn int32() -> TypeRef {
	TypeInfo::class("System.Int32").extends(&object()).build()
}

pub(crate) fn date_time() -> TypeRef {
	TypeInfo::class("System.DateTime").extends(&object()).build()
}

pub(crate) fn null_target() -> TypeRef {
	TypeInfo::class("Sample.NullTarget").extends(&object()).build()
}

pub(crate) fn derived_null_target() -> TypeRef {
	TypeInfo::class("Sample.DerivedNullTarget")
		.extends(&null_target())
		.build()
}

pub(crate) fn base_type() -> TypeRef {
	TypeInfo::class("Sample.BaseType")
		.extends(&object())
		.constructor(ConstructorInfo::public([]))
		.constructor(ConstructorInfo::non_public([string()]))
		.build()
}

pub(crate) fn derived_type() -> TypeRef {
	TypeInfo::class("Sample.DerivedType")
		.extends(&base_type())
		.constructor(ConstructorInfo::public([]))
		.build()
}

/// Class deriving from [`derived_type`].
pub(crate) fn grandchild_type() -> TypeRef {
	TypeInfo::class("Sample.GrandchildType")
		.extends(&derived_type())
		.constructor(ConstructorInfo::public([]))
		.build()
}

pub(crate) fn mixin_a() -> TypeRef {
	TypeInfo::class("Sample.MixinA").extends(&object()).build()
}

pub(crate) fn mixin_b() -> TypeRef {
	TypeInfo::class("Sample.MixinB").extends(&object()).build()
}

/// Subclass of [`mixin_a`], a more specific member of its override family.
pub(crate) fn mixin_a_derived() -> TypeRef {
	TypeInfo::class("Sample.MixinADerived").extends(&mixin_a()).build()
}

/// Open generic mixin `GenericMixin`1`.
pub(crate) fn generic_mixin() -> TypeRef {
	TypeInfo::generic_class("Sample.GenericMixin", 1)
		.extends(&object())
		.build()
}

/// Open generic target `GenericTarget`1`.
pub(crate) fn generic_target() -> TypeRef {
	TypeInfo::generic_class("Sample.GenericTarget", 1)
		.extends(&object())
		.constructor(ConstructorInfo::public([]))
		.build()
}

pub(crate) fn service_interface() -> TypeRef {
	TypeInfo::interface("Sample.IService").build()
}

pub(crate) fn other_interface() -> TypeRef {
	TypeInfo::interface("Sample.IOther").build()
}

/// Mixin implementing [`service_interface`].
pub(crate) fn service_mixin() -> TypeRef {
	TypeInfo::class("Sample.ServiceMixin")
		.extends(&object())
		.implements(&service_interface())
		.build()
}

pub(crate) fn binding(mixin: TypeRef) -> MixinBinding {
	MixinBinding::new(mixin, MixinOrigin::declared("test"))
}

pub(crate) fn descriptor_with(target: TypeRef, mixins: impl IntoIterator<Item = TypeRef>) -> ClassDescriptor {
	ClassDescriptor::new(target, mixins.into_iter().map(binding), []).unwrap()
}

/// Participant-state slot counting assemblies.
pub(crate) const BUILD_COUNTER_SLOT: &str = "fake.builds";

/// Artifact builder producing `{requested}$Mixed{n}` subclasses.
#[derive(Default)]
pub(crate) struct FakeBuilder {
	assemblies: AtomicUsize,
	fail: AtomicBool,
	recovered: Mutex<FxHashMap<TypeRef, Arc<ClassDescriptor>>>,
}

impl FakeBuilder {
	pub(crate) fn assemblies(&self) -> usize {
		self.assemblies.load(Ordering::SeqCst)
	}

	pub(crate) fn set_failing(&self, fail: bool) {
		self.fail.store(fail, Ordering::SeqCst);
	}

	/// Records `descriptor` as the origin of `concrete`, as a persisted
	/// artifact registry would.
	pub(crate) fn remember(&self, concrete: &TypeRef, descriptor: Arc<ClassDescriptor>) {
		self.recovered.lock().insert(concrete.clone(), descriptor);
	}
}

/// Builds a generated artifact the way [`FakeBuilder`] does, without a cache.
pub(crate) fn generated_artifact(requested: &TypeRef, suffix: &str) -> TypeRef {
	TypeInfo::class(format!("{requested}$Mixed{suffix}"))
		.extends(requested)
		.constructors(requested.constructors().iter().cloned())
		.generated()
		.build()
}

impl DescriptorRecovery for FakeBuilder {
	fn recover_descriptor(&self, concrete: &TypeRef) -> Option<Arc<ClassDescriptor>> {
		self.recovered.lock().get(concrete).cloned()
	}
}

impl DefinitionBuilder for FakeBuilder {
	fn build_definition(&self, descriptor: &Arc<ClassDescriptor>) -> Result<ResolvedDefinition, CompositionError> {
		Ok(ResolvedDefinition::new(descriptor.clone()))
	}
}

impl ArtifactBuilder for FakeBuilder {
	fn assemble_type(&self, key: &CompoundCacheKey, state: &mut ParticipantState) -> Result<TypeRef, AssemblyError> {
		if self.fail.load(Ordering::SeqCst) {
			return Err(AssemblyError::new(key.requested().clone(), "forced failure"));
		}
		let n = self.assemblies.fetch_add(1, Ordering::SeqCst) + 1;
		match state.get_mut::<usize>(BUILD_COUNTER_SLOT) {
			Some(count) => *count += 1,
			None => {
				state.insert(BUILD_COUNTER_SLOT, 1usize);
			}
		}

		let concrete = generated_artifact(key.requested(), &n.to_string());
		if let Some(descriptor) = key.descriptor() {
			self.remember(&concrete, descriptor.clone());
		}
		Ok(concrete)
	}
}
