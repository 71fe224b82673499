mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use amalgam_composition::{
	ClassDescriptor, Composer, ComposerConfig, ConfigurationBuilder, ConfigurationSet, InvokerShape, MasterConfiguration, MixinBinding,
	MixinOrigin, TypeRef,
};
use common::{SlowBuilder, caching_mixin, logging_mixin, widget};

const THREADS: usize = 16;

fn composer(builder: Arc<SlowBuilder>) -> Arc<Composer> {
	let mut config = ConfigurationBuilder::new();
	config
		.for_class(&widget())
		.unwrap()
		.add_mixin(&logging_mixin())
		.unwrap();
	let master = MasterConfiguration::with_configuration(config.build().unwrap());
	Arc::new(Composer::new(ComposerConfig::default(), Arc::new(master), builder))
}

/// Many threads requesting one composition observe one concrete type built
/// by exactly one assembly.
#[test]
fn test_parallel_requests_assemble_once() {
	let builder = Arc::new(SlowBuilder::default());
	let composer = composer(builder.clone());
	let barrier = Arc::new(Barrier::new(THREADS));

	let handles: Vec<_> = (0..THREADS)
		.map(|_| {
			let composer = composer.clone();
			let barrier = barrier.clone();
			thread::spawn(move || {
				barrier.wait();
				composer.resolve_or_build_type(&widget()).unwrap()
			})
		})
		.collect();
	let results: Vec<TypeRef> = handles.into_iter().map(|h| h.join().unwrap()).collect();

	assert_eq!(builder.assemblies(), 1);
	assert!(results.iter().all(|t| TypeRef::ptr_eq(t, &results[0])));
	assert_eq!(composer.cache().type_count(), 1);
}

/// Threads under different scopes get one assembly per distinct composition.
#[test]
fn test_parallel_scopes_assemble_once_per_composition() {
	let builder = Arc::new(SlowBuilder::default());
	let composer = composer(builder.clone());
	let scoped = ConfigurationSet::new([ClassDescriptor::new(
		widget(),
		[MixinBinding::new(caching_mixin(), MixinOrigin::declared("integration"))],
		[],
	)
	.unwrap()])
	.unwrap();
	let barrier = Arc::new(Barrier::new(THREADS));

	let handles: Vec<_> = (0..THREADS)
		.map(|i| {
			let composer = composer.clone();
			let barrier = barrier.clone();
			let scoped = scoped.clone();
			thread::spawn(move || {
				let _scope = (i % 2 == 0).then(|| scoped.enter_scope());
				barrier.wait();
				let ty = composer.resolve_or_build_type(&widget()).unwrap();
				(i % 2 == 0, ty)
			})
		})
		.collect();
	let results: Vec<(bool, TypeRef)> = handles.into_iter().map(|h| h.join().unwrap()).collect();

	assert_eq!(builder.assemblies(), 2);
	let (in_scope, in_master): (Vec<_>, Vec<_>) = results.into_iter().partition(|(scoped, _)| *scoped);
	assert!(in_scope.iter().all(|(_, t)| TypeRef::ptr_eq(t, &in_scope[0].1)));
	assert!(in_master.iter().all(|(_, t)| TypeRef::ptr_eq(t, &in_master[0].1)));
	assert_ne!(in_scope[0].1, in_master[0].1);
}

#[test]
fn test_parallel_constructor_requests_share_type() {
	let builder = Arc::new(SlowBuilder::default());
	let composer = composer(builder.clone());
	let barrier = Arc::new(Barrier::new(THREADS));

	let handles: Vec<_> = (0..THREADS)
		.map(|i| {
			let composer = composer.clone();
			let barrier = barrier.clone();
			thread::spawn(move || {
				barrier.wait();
				if i % 2 == 0 {
					composer
						.resolve_or_build_constructor(&widget(), InvokerShape::new("new", []), false)
						.unwrap()
						.concrete()
						.clone()
				} else {
					composer.resolve_or_build_type(&widget()).unwrap()
				}
			})
		})
		.collect();
	let results: Vec<TypeRef> = handles.into_iter().map(|h| h.join().unwrap()).collect();

	assert_eq!(builder.assemblies(), 1);
	assert!(results.iter().all(|t| TypeRef::ptr_eq(t, &results[0])));
	assert_eq!(composer.cache().constructor_count(), 1);
}
