use super::ResourceManager;
use crate::{
	common::errors::Result,
	domain::{AbstractResource, Actor, ResourceInstance},
	infra::store::ChangeSet,
};
use std::slice;
use tracing::{debug, info};
use uuid::Uuid;

impl ResourceManager {
	/// Removes an instance and, with it, whatever it alone kept alive
	///
	/// Directories are deleted recursively. Every node is committed on its
	/// own, so a failure partway through leaves the already processed nodes
	/// deleted.
	pub async fn delete(&self, actor: &Actor, instance_id: Uuid) -> Result<()> {
		let instance = self.store.get_instance(instance_id).await?;

		if instance.is_directory() {
			self.delete_directory(actor, &instance).await
		} else {
			let resource = self.store.get_resource(instance.resource_id).await?;
			if resource.instance_count() == 1 {
				self.dispatch_delete(&resource).await?;
			}
			self.unlink(&instance, &resource).await?;

			info!(%instance_id, resource_id = %resource.id, "Deleted resource instance");
			Ok(())
		}
	}

	async fn delete_directory(&self, actor: &Actor, root: &ResourceInstance) -> Result<()> {
		let descendants = self.store.descendants(root.id).await?;
		let total = descendants.len();

		// Deepest first so nothing is unlinked while it still has children
		for node in descendants.iter().rev() {
			let resource = self.store.get_resource(node.resource_id).await?;

			if !node.is_directory()
				&& (resource.instance_count() == 1
					|| self.ownership.is_owner(&resource, actor).await?)
			{
				self.dispatch_delete(&resource).await?;
			}

			self.unlink(node, &resource).await?;
		}

		let resource = self.store.get_resource(root.resource_id).await?;
		self.unlink(root, &resource).await?;

		info!(
			instance_id = %root.id,
			descendants = total,
			"Deleted directory"
		);

		Ok(())
	}

	/// Removes the node and drops the resource record once it is unreferenced
	async fn unlink(&self, instance: &ResourceInstance, resource: &AbstractResource) -> Result<()> {
		let mut changes = ChangeSet::new();
		changes
			.remove_instance(instance)
			.remove_resource(resource.id);
		self.store.flush(changes).await?;

		if self.release_if_destroyed(resource).await? {
			debug!(resource_id = %resource.id, "Destroyed resource");
		}

		Ok(())
	}

	async fn dispatch_delete(&self, resource: &AbstractResource) -> Result<()> {
		self.bus
			.publish_delete(&resource.resource_type, slice::from_ref(resource))
			.await?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::super::test_utils::*;
	use crate::{
		common::errors::{CoreError, Result},
		domain::{AbstractResource, ResourceInstance},
		infra::store::{ChangeSet, InstanceTreeStore, MemoryStore},
	};
	use async_trait::async_trait;
	use std::sync::Arc;
	use tracing_test::traced_test;
	use uuid::Uuid;

	/// Hands control back to the runtime before every store call
	#[derive(Default)]
	struct YieldingStore {
		inner: MemoryStore,
	}

	#[async_trait]
	impl InstanceTreeStore for YieldingStore {
		async fn find_resource(&self, id: Uuid) -> Result<Option<AbstractResource>> {
			tokio::task::yield_now().await;
			self.inner.find_resource(id).await
		}

		async fn find_instance(&self, id: Uuid) -> Result<Option<ResourceInstance>> {
			tokio::task::yield_now().await;
			self.inner.find_instance(id).await
		}

		async fn instances_of(&self, resource_id: Uuid) -> Result<Vec<ResourceInstance>> {
			tokio::task::yield_now().await;
			self.inner.instances_of(resource_id).await
		}

		async fn children(&self, parent_id: Uuid) -> Result<Vec<ResourceInstance>> {
			tokio::task::yield_now().await;
			self.inner.children(parent_id).await
		}

		async fn flush(&self, changes: ChangeSet) -> Result<()> {
			tokio::task::yield_now().await;
			self.inner.flush(changes).await
		}
	}

	#[traced_test]
	#[tokio::test]
	async fn deleting_a_directory_cascades_to_sole_leaves() {
		let fx = fixture().await;
		let docs = fx.dir(&fx.alice, "D", fx.root.id).await;
		let file = fx.file(&fx.alice, "F", docs.id).await;

		fx.manager.delete(&fx.alice, docs.id).await.unwrap();

		assert_eq!(fx.count(file.resource_id).await, None);
		assert_eq!(fx.count(docs.resource_id).await, None);
		assert!(fx.manager.store().find_instance(file.id).await.unwrap().is_none());
		assert_eq!(
			*fx.handler.deleted.lock().unwrap(),
			vec![file.resource_id]
		);
		assert!(logs_contain("Deleted directory"));
	}

	#[tokio::test]
	async fn shared_leaf_survives_non_owner_delete() {
		let fx = fixture().await;
		let d1 = fx.dir(&fx.alice, "D1", fx.root.id).await;
		let d2 = fx.dir(&fx.bob, "D2", fx.root.id).await;
		let f1 = fx.file(&fx.alice, "F", d1.id).await;
		let f2 = fx
			.manager
			.add_to_directory_by_reference(&fx.alice, f1.resource_id, d2.id)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(fx.count(f1.resource_id).await, Some(2));

		fx.manager.delete(&fx.bob, d2.id).await.unwrap();

		assert_eq!(fx.count(f1.resource_id).await, Some(1));
		assert!(fx.manager.store().find_instance(f2.id).await.unwrap().is_none());
		assert!(fx.manager.store().find_instance(f1.id).await.unwrap().is_some());
		assert!(fx.handler.deleted.lock().unwrap().is_empty());
	}

	#[tokio::test]
	async fn leaf_delete_dispatches_only_for_last_instance() {
		let fx = fixture().await;
		let first = fx.file(&fx.alice, "F", fx.root.id).await;
		let second = fx
			.manager
			.add_to_directory_by_reference(&fx.alice, first.resource_id, fx.root.id)
			.await
			.unwrap()
			.unwrap();

		fx.manager.delete(&fx.alice, first.id).await.unwrap();
		assert_eq!(fx.count(first.resource_id).await, Some(1));
		assert!(fx.handler.deleted.lock().unwrap().is_empty());

		fx.manager.delete(&fx.alice, second.id).await.unwrap();
		assert_eq!(fx.count(first.resource_id).await, None);
		assert_eq!(fx.handler.deleted.lock().unwrap().len(), 1);

		assert!(matches!(
			fx.manager.delete(&fx.alice, second.id).await,
			Err(CoreError::InstanceNotFound(_))
		));
	}

	#[tokio::test]
	async fn nested_directories_are_removed_bottom_up() {
		let fx = fixture().await;
		let top = fx.dir(&fx.alice, "top", fx.root.id).await;
		let mid = fx.dir(&fx.alice, "mid", top.id).await;
		let low = fx.dir(&fx.alice, "low", mid.id).await;
		let leaf = fx.file(&fx.alice, "leaf", low.id).await;

		fx.manager.delete(&fx.alice, top.id).await.unwrap();

		for id in [top.resource_id, mid.resource_id, low.resource_id, leaf.resource_id] {
			assert_eq!(fx.count(id).await, None);
		}
		assert!(fx.manager.store().children(fx.root.id).await.unwrap().is_empty());
		assert_eq!(fx.count(fx.root.resource_id).await, Some(1));
	}

	#[tokio::test]
	async fn overlapping_deletes_uncount_an_instance_once() {
		let fx = fixture_with_store(Arc::new(YieldingStore::default())).await;
		let first = fx.file(&fx.alice, "F", fx.root.id).await;
		let second = fx
			.manager
			.add_to_directory_by_reference(&fx.alice, first.resource_id, fx.root.id)
			.await
			.unwrap()
			.unwrap();

		let (a, b) = tokio::join!(
			fx.manager.delete(&fx.alice, first.id),
			fx.manager.delete(&fx.alice, first.id)
		);

		let failed = [a, b]
			.into_iter()
			.filter_map(|result| result.err())
			.collect::<Vec<_>>();
		assert_eq!(failed.len(), 1);
		assert!(matches!(&failed[0], CoreError::InstanceNotFound(id) if *id == first.id));

		assert_eq!(fx.count(first.resource_id).await, Some(1));
		assert!(fx.manager.store().find_instance(second.id).await.unwrap().is_some());
		assert!(fx.handler.deleted.lock().unwrap().is_empty());
	}
}
