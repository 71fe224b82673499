use std::sync::Arc;

use amalgam_types::{ConstructorInfo, TypeInfo};
use pretty_assertions::assert_eq;

use super::*;
use crate::config::{ConfigurationSet, MasterConfiguration};
use crate::descriptor::ClassDescriptor;
use crate::error::{AssemblyError, LookupError};
use crate::test_fixtures::*;

struct Harness {
	fake: Arc<FakeBuilder>,
	cache: CompositionCache,
}

fn harness(master: ConfigurationSet) -> Harness {
	let fake = Arc::new(FakeBuilder::default());
	let master = Arc::new(MasterConfiguration::with_configuration(master));
	let cache = CompositionCache::new(fake.clone()).with_contributor(Arc::new(MixinKeyContributor::new(master, fake.clone())));
	Harness { fake, cache }
}

fn configured() -> ConfigurationSet {
	ConfigurationSet::new([descriptor_with(base_type(), [mixin_a()])]).unwrap()
}

/// Contributes a fixed token to every key.
struct TokenContributor(&'static str);

impl KeyContributor for TokenContributor {
	fn name(&self) -> &'static str {
		"token"
	}

	fn cache_key_for(&self, _requested: &TypeRef) -> Result<KeyPart, CompositionError> {
		Ok(KeyPart::Token(Arc::from(self.0)))
	}

	fn rebuild_key_from_artifact(&self, _artifact: &TypeRef) -> KeyPart {
		KeyPart::Token(Arc::from(self.0))
	}
}

/// Keys every request by a host type that can change between requests.
struct HostTypeContributor(parking_lot::Mutex<TypeRef>);

impl KeyContributor for HostTypeContributor {
	fn name(&self) -> &'static str {
		"host"
	}

	fn cache_key_for(&self, _requested: &TypeRef) -> Result<KeyPart, CompositionError> {
		Ok(KeyPart::Type(self.0.lock().clone()))
	}

	fn rebuild_key_from_artifact(&self, _artifact: &TypeRef) -> KeyPart {
		KeyPart::Type(self.0.lock().clone())
	}
}

#[test]
fn test_same_request_returns_same_type() {
	let h = harness(configured());

	let first = h.cache.resolve_or_build_type(&base_type()).unwrap();
	let second = h.cache.resolve_or_build_type(&base_type()).unwrap();
	assert!(TypeRef::ptr_eq(&first, &second));
	assert_eq!(h.fake.assemblies(), 1);
	assert_eq!(h.cache.type_count(), 1);
	assert!(first.is_generated());
	assert_eq!(first.base(), Some(&base_type()));
}

#[test]
fn test_unconfigured_type_is_still_built() {
	let h = harness(ConfigurationSet::empty());

	let key = h.cache.type_key(&string()).unwrap();
	assert_eq!(key.participants(), [KeyPart::Absent]);
	assert!(key.descriptor().is_none());
	h.cache.resolve_or_build_type(&string()).unwrap();
	assert_eq!(h.fake.assemblies(), 1);
}

#[test]
fn test_key_follows_active_scope() {
	let h = harness(configured());
	let master_type = h.cache.resolve_or_build_type(&base_type()).unwrap();

	let other = ConfigurationSet::new([descriptor_with(base_type(), [mixin_b()])]).unwrap();
	let scoped_type = {
		let _scope = other.enter_scope();
		h.cache.resolve_or_build_type(&base_type()).unwrap()
	};
	assert_ne!(master_type, scoped_type);

	let equal = ConfigurationSet::new([descriptor_with(base_type(), [mixin_b()])]).unwrap();
	let again = {
		let _scope = equal.enter_scope();
		h.cache.resolve_or_build_type(&base_type()).unwrap()
	};
	assert!(TypeRef::ptr_eq(&again, &scoped_type), "equal compositions share a key");
	assert_eq!(h.fake.assemblies(), 2);
}

#[test]
fn test_rejects_interfaces_and_open_generics() {
	let h = harness(configured());

	let err = h.cache.resolve_or_build_type(&service_interface()).unwrap_err();
	assert!(matches!(err, CacheError::Argument(ArgumentError::InterfaceRequest { .. })), "{err}");

	let err = h.cache.resolve_or_build_type(&generic_target()).unwrap_err();
	assert!(matches!(err, CacheError::Argument(ArgumentError::OpenGenericRequest { .. })), "{err}");

	let closed = generic_target().close(&[int32()]).unwrap();
	assert!(h.cache.resolve_or_build_type(&closed).is_ok());
}

#[test]
fn test_failed_assembly_stores_nothing() {
	let h = harness(configured());
	h.fake.set_failing(true);

	let err = h.cache.resolve_or_build_type(&base_type()).unwrap_err();
	assert!(matches!(err, CacheError::Assembly(AssemblyError { .. })), "{err}");
	assert_eq!(h.cache.type_count(), 0);

	h.fake.set_failing(false);
	let built = h.cache.resolve_or_build_type(&base_type()).unwrap();
	assert!(built.is_generated());
	assert_eq!(h.cache.type_count(), 1);
}

#[test]
fn test_constructor_binding() {
	let h = harness(configured());

	let shape = InvokerShape::new("create", []);
	let invoker = h.cache.resolve_or_build_constructor(&base_type(), shape.clone(), false).unwrap();
	assert!(invoker.constructor().parameters().is_empty());
	assert_eq!(invoker.shape(), &shape);
	assert_eq!(invoker.concrete(), &h.cache.resolve_or_build_type(&base_type()).unwrap());

	let again = h.cache.resolve_or_build_constructor(&base_type(), shape, false).unwrap();
	assert_eq!(again, invoker);
	assert_eq!(h.cache.constructor_count(), 1);
	assert_eq!(h.fake.assemblies(), 1, "type and constructor share one assembly");
}

#[test]
fn test_constructor_visibility() {
	let h = harness(configured());
	let shape = InvokerShape::new("create", [string()]);

	let err = h.cache.resolve_or_build_constructor(&base_type(), shape.clone(), false).unwrap_err();
	match err {
		CacheError::Lookup(LookupError::ConstructorNotFound { signature, visibility, .. }) => {
			assert_eq!(signature, "(System.String)");
			assert_eq!(visibility, "public");
		}
		other => panic!("expected lookup failure, got {other}"),
	}
	assert_eq!(h.cache.constructor_count(), 0, "failed binding stores nothing");
	assert_eq!(h.cache.type_count(), 1, "the type itself was built");

	let invoker = h.cache.resolve_or_build_constructor(&base_type(), shape, true).unwrap();
	assert!(!invoker.constructor().is_public());
}

#[test]
fn test_participant_state_persists_across_assemblies() {
	let h = harness(configured());
	h.cache.resolve_or_build_type(&base_type()).unwrap();
	h.cache.resolve_or_build_type(&string()).unwrap();

	let count = h
		.cache
		.with_participant_state(|state| state.get::<usize>(BUILD_COUNTER_SLOT).copied());
	assert_eq!(count, Some(2));
}

#[test]
fn test_contributors_are_ordered() {
	let h = harness(configured());
	let cache = h.cache.with_contributor(Arc::new(TokenContributor("v1")));

	let names: Vec<_> = cache.contributors().map(|c| c.name()).collect();
	assert_eq!(names, ["mixins", "token"]);

	let key = cache.type_key(&base_type()).unwrap();
	assert!(matches!(key.participants(), [KeyPart::Descriptor(_), KeyPart::Token(_)]));
}

#[test]
fn test_type_part_separates_builds() {
	let fake = Arc::new(FakeBuilder::default());
	let host = Arc::new(HostTypeContributor(parking_lot::Mutex::new(string())));
	let cache = CompositionCache::new(fake.clone()).with_contributor(host.clone());

	let under_string = cache.resolve_or_build_type(&base_type()).unwrap();
	assert_eq!(cache.type_key(&base_type()).unwrap().participants(), [KeyPart::Type(string())]);

	*host.0.lock() = int32();
	let under_int = cache.resolve_or_build_type(&base_type()).unwrap();
	assert_ne!(under_string, under_int);

	*host.0.lock() = string();
	let again = cache.resolve_or_build_type(&base_type()).unwrap();
	assert!(TypeRef::ptr_eq(&again, &under_string));
	assert_eq!(fake.assemblies(), 2);
}

#[test]
fn test_load_prebuilt_first_wins() {
	let h = harness(configured());
	let descriptor = Arc::new(descriptor_with(base_type(), [mixin_a()]));
	let a = generated_artifact(&base_type(), "A");
	let b = generated_artifact(&base_type(), "B");
	h.fake.remember(&a, descriptor.clone());
	h.fake.remember(&b, descriptor);

	let report = h.cache.load_prebuilt([a.clone(), b]);
	assert_eq!(
		report,
		PrebuiltReport {
			registered: 1,
			discarded: 1,
			skipped: 0
		}
	);

	let resolved = h.cache.resolve_or_build_type(&base_type()).unwrap();
	assert!(TypeRef::ptr_eq(&resolved, &a), "live request hits the prebuilt key");
	assert_eq!(h.fake.assemblies(), 0);
}

#[test]
fn test_load_prebuilt_never_replaces_live_entry() {
	let h = harness(configured());
	let live = h.cache.resolve_or_build_type(&base_type()).unwrap();

	let stale = generated_artifact(&base_type(), "Stale");
	h.fake.remember(&stale, Arc::new(descriptor_with(base_type(), [mixin_a()])));
	let report = h.cache.load_prebuilt([stale]);
	assert_eq!(report.discarded, 1);
	assert!(TypeRef::ptr_eq(&h.cache.resolve_or_build_type(&base_type()).unwrap(), &live));
}

#[test]
fn test_load_prebuilt_skips_plain_types() {
	let h = harness(configured());
	let orphan = TypeInfo::class("Sample.Orphan")
		.constructor(ConstructorInfo::public([]))
		.generated()
		.build();

	let report = h.cache.load_prebuilt([base_type(), orphan]);
	assert_eq!(report.skipped, 2);
	assert_eq!(report.registered, 0);
	assert_eq!(h.cache.type_count(), 0);
}

#[test]
fn test_prebuilt_without_descriptor_keys_as_unconfigured() {
	let h = harness(ConfigurationSet::empty());
	let artifact = generated_artifact(&string(), "Plain");

	let report = h.cache.load_prebuilt([artifact.clone()]);
	assert_eq!(report.registered, 1);
	assert!(TypeRef::ptr_eq(&h.cache.resolve_or_build_type(&string()).unwrap(), &artifact));
}

#[test]
fn test_key_equality_is_structural() {
	let d1 = Arc::new(ClassDescriptor::empty(string()));
	let d2 = Arc::new(ClassDescriptor::empty(string()));
	let k1 = CompoundCacheKey::for_type(string(), [KeyPart::Descriptor(d1)]);
	let k2 = CompoundCacheKey::for_type(string(), [KeyPart::Descriptor(d2)]);
	assert_eq!(k1, k2);

	let selector = ConstructorSelector {
		shape: InvokerShape::new("create", []),
		allow_non_public: false,
	};
	let ctor = CompoundCacheKey::for_constructor(k1.clone(), selector);
	assert_ne!(ctor, k1);
	assert_eq!(ctor.type_key(), k1);
}
