//! A resource tree with the file handler wired in, for driving the manager
//! the way an outer service would

use anyhow::{anyhow, Result};
use arbor_core::{
	config::AppConfig,
	context::CoreContext,
	domain::{Actor, ResourceInstance, ResourceTypeRegistry, DIRECTORY_TYPE},
	infra::{
		dispatch::DispatchBus,
		security::OwnershipPolicy,
		store::{InstanceTreeStore, MemoryStore},
	},
	ops::{handlers::FileHandler, ResourceManager, ReturnHandle},
	NewResource, ResourceType,
};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use uuid::Uuid;

pub struct TreeHarness {
	pub manager: ResourceManager,
	pub files: Arc<FileHandler>,
	pub alice: Actor,
	pub bob: Actor,
	pub root: ResourceInstance,
	known: Mutex<Vec<Uuid>>,
	dir: TempDir,
}

impl TreeHarness {
	/// In-memory store, creator ownership
	pub async fn new() -> Result<Self> {
		Self::build(None).await
	}

	/// In-memory store with a custom ownership policy
	pub async fn with_ownership(ownership: Arc<dyn OwnershipPolicy>) -> Result<Self> {
		Self::build(Some(ownership)).await
	}

	/// Everything wired through `CoreContext` on a SQLite file
	pub async fn sqlite() -> Result<Self> {
		let dir = TempDir::new()?;
		let mut config = AppConfig::default_with_dir(dir.path().join("data"));
		config.export_dir = Some(dir.path().join("exports"));

		let CoreContext {
			files, resources, ..
		} = CoreContext::open(config).await?;

		Self::finish(resources, files, dir).await
	}

	async fn build(ownership: Option<Arc<dyn OwnershipPolicy>>) -> Result<Self> {
		let dir = TempDir::new()?;
		let files = Arc::new(FileHandler::new(dir.path().join("files")));

		let bus = Arc::new(DispatchBus::new());
		bus.register("file", files.clone());

		let types = ResourceTypeRegistry::with_types([ResourceType::new("file")]);
		let mut manager = ResourceManager::new(Arc::new(MemoryStore::new()), Arc::new(types), bus)
			.with_export_dir(dir.path().join("exports"));
		if let Some(ownership) = ownership {
			manager = manager.with_ownership(ownership);
		}

		Self::finish(manager, files, dir).await
	}

	async fn finish(manager: ResourceManager, files: Arc<FileHandler>, dir: TempDir) -> Result<Self> {
		let alice = Actor::new("alice");
		let root = manager
			.create_workspace_root(&alice, Uuid::new_v4(), "workspace")
			.await?;

		Ok(Self {
			manager,
			files,
			alice,
			bob: Actor::new("bob"),
			known: Mutex::new(vec![root.resource_id]),
			root,
			dir,
		})
	}

	pub fn scratch(&self) -> &std::path::Path {
		self.dir.path()
	}

	pub fn store(&self) -> &Arc<dyn InstanceTreeStore> {
		self.manager.store()
	}

	pub fn track(&self, resource_id: Uuid) {
		self.known
			.lock()
			.expect("known resources lock poisoned")
			.push(resource_id);
	}

	pub async fn dir(&self, actor: &Actor, name: &str, parent: Uuid) -> Result<ResourceInstance> {
		let instance = self
			.manager
			.create(
				actor,
				NewResource::new(name),
				parent,
				DIRECTORY_TYPE,
				ReturnHandle::Instance,
			)
			.await?
			.into_instance()
			.ok_or_else(|| anyhow!("expected an instance handle"))?;

		self.track(instance.resource_id);
		Ok(instance)
	}

	pub async fn file(
		&self,
		actor: &Actor,
		name: &str,
		parent: Uuid,
		body: &str,
	) -> Result<ResourceInstance> {
		let new = self.files.import(name, body.as_bytes()).await?;
		let instance = self
			.manager
			.create(actor, new, parent, "file", ReturnHandle::Instance)
			.await?
			.into_instance()
			.ok_or_else(|| anyhow!("expected an instance handle"))?;

		self.track(instance.resource_id);
		Ok(instance)
	}

	pub async fn count(&self, resource_id: Uuid) -> Result<Option<u32>> {
		Ok(self
			.store()
			.find_resource(resource_id)
			.await?
			.map(|resource| resource.instance_count()))
	}

	/// Recounts every resource seen so far from the live instances
	pub async fn verify_refcounts(&self) -> Result<()> {
		let known = self
			.known
			.lock()
			.expect("known resources lock poisoned")
			.clone();

		for resource_id in known {
			let live = self.store().instances_of(resource_id).await?.len();
			let stored = self.count(resource_id).await?;

			match stored {
				Some(count) if count as usize == live => {}
				None if live == 0 => {}
				_ => {
					return Err(anyhow!(
						"resource {resource_id}: stored count {stored:?}, live instances {live}"
					))
				}
			}
		}

		Ok(())
	}
}
