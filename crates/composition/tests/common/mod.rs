#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use amalgam_composition::{
	ArtifactBuilder, AssemblyError, ClassDescriptor, CompositionError, CompoundCacheKey, ConstructorInfo, DefinitionBuilder,
	DescriptorRecovery, ParticipantState, ResolvedDefinition, TypeInfo, TypeRef,
};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

pub fn object() -> TypeRef {
	TypeInfo::class("System.Object")
		.constructor(ConstructorInfo::public([]))
		.build()
}

pub fn widget() -> TypeRef {
	TypeInfo::class("Demo.Widget")
		.extends(&object())
		.constructor(ConstructorInfo::public([]))
		.build()
}

pub fn logging_mixin() -> TypeRef {
	TypeInfo::class("Demo.LoggingMixin").extends(&object()).build()
}

pub fn caching_mixin() -> TypeRef {
	TypeInfo::class("Demo.CachingMixin").extends(&object()).build()
}

/// Builder that sleeps during assembly to widen race windows.
#[derive(Default)]
pub struct SlowBuilder {
	assemblies: AtomicUsize,
	recovered: Mutex<FxHashMap<TypeRef, Arc<ClassDescriptor>>>,
}

impl SlowBuilder {
	pub fn assemblies(&self) -> usize {
		self.assemblies.load(Ordering::SeqCst)
	}
}

impl DescriptorRecovery for SlowBuilder {
	fn recover_descriptor(&self, concrete: &TypeRef) -> Option<Arc<ClassDescriptor>> {
		self.recovered.lock().get(concrete).cloned()
	}
}

impl DefinitionBuilder for SlowBuilder {
	fn build_definition(&self, descriptor: &Arc<ClassDescriptor>) -> Result<ResolvedDefinition, CompositionError> {
		Ok(ResolvedDefinition::new(descriptor.clone()))
	}
}

impl ArtifactBuilder for SlowBuilder {
	fn assemble_type(&self, key: &CompoundCacheKey, _state: &mut ParticipantState) -> Result<TypeRef, AssemblyError> {
		let n = self.assemblies.fetch_add(1, Ordering::SeqCst) + 1;
		std::thread::sleep(Duration::from_millis(20));
		let requested = key.requested();
		let concrete = TypeInfo::class(format!("{requested}$Mixed{n}"))
			.extends(requested)
			.constructors(requested.constructors().iter().cloned())
			.generated()
			.build();
		if let Some(descriptor) = key.descriptor() {
			self.recovered.lock().insert(concrete.clone(), descriptor.clone());
		}
		Ok(concrete)
	}
}
