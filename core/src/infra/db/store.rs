//! Tree store backed by a sea-orm connection

use super::{
	entities::{resource, resource_instance},
	migration::Migrator,
};
use crate::{
	common::errors::{CoreError, Result},
	domain::{AbstractResource, ResourceInstance},
	infra::store::{Change, ChangeSet, InstanceTreeStore},
};
use async_trait::async_trait;
use sea_orm::{
	sea_query::Expr,
	ActiveValue::{NotSet, Set},
	ColumnTrait, ConnectionTrait, Database, DatabaseConnection, EntityTrait, QueryFilter,
	QueryOrder, TransactionTrait,
};
use sea_orm_migration::MigratorTrait;
use tracing::{debug, trace};
use uuid::Uuid;

pub struct DbStore {
	conn: DatabaseConnection,
}

impl DbStore {
	/// Connects to `database_url` and brings the schema up to date
	pub async fn connect(database_url: &str) -> Result<Self> {
		debug!(%database_url, "Opening resource database");
		let conn = Database::connect(database_url).await?;
		Self::with_connection(conn).await
	}

	pub async fn with_connection(conn: DatabaseConnection) -> Result<Self> {
		Migrator::up(&conn, None).await?;
		Ok(Self { conn })
	}

	pub fn conn(&self) -> &DatabaseConnection {
		&self.conn
	}
}

async fn resource_exists<C: ConnectionTrait>(conn: &C, resource_id: Uuid) -> Result<bool> {
	Ok(resource::Entity::find()
		.filter(resource::Column::Uuid.eq(resource_id))
		.one(conn)
		.await?
		.is_some())
}

async fn apply<C: ConnectionTrait>(conn: &C, change: Change) -> Result<()> {
	match change {
		Change::InsertResource(new) => {
			let instance_count = i32::try_from(new.instance_count())
				.map_err(|_| CoreError::InvalidResource("instance count out of range".into()))?;

			resource::Entity::insert(resource::ActiveModel {
				id: NotSet,
				uuid: Set(new.id),
				name: Set(new.name),
				resource_type: Set(new.resource_type),
				creator_id: Set(new.creator_id),
				share_type: Set(new.share_type.into()),
				instance_count: Set(instance_count),
				content: Set(new.content),
				created_at: Set(new.created_at),
			})
			.exec(conn)
			.await?;
		}

		Change::UpdateResource(update) => {
			let result = resource::Entity::update_many()
				.filter(resource::Column::Uuid.eq(update.id))
				.set(resource::ActiveModel {
					name: Set(update.name),
					share_type: Set(update.share_type.into()),
					content: Set(update.content),
					..Default::default()
				})
				.exec(conn)
				.await?;

			if result.rows_affected == 0 {
				return Err(CoreError::ResourceNotFound(update.id));
			}
		}

		Change::AdjustInstanceCount { resource_id, delta } => {
			// Single statement read-modify-write, refusing to go below zero
			let result = resource::Entity::update_many()
				.col_expr(
					resource::Column::InstanceCount,
					Expr::col(resource::Column::InstanceCount).add(delta),
				)
				.filter(resource::Column::Uuid.eq(resource_id))
				.filter(resource::Column::InstanceCount.gte(-delta))
				.exec(conn)
				.await?;

			if result.rows_affected == 0 {
				return Err(if resource_exists(conn, resource_id).await? {
					CoreError::InstanceCountUnderflow(resource_id)
				} else {
					CoreError::ResourceNotFound(resource_id)
				});
			}
		}

		Change::RemoveResource(resource_id) => {
			resource::Entity::delete_many()
				.filter(resource::Column::Uuid.eq(resource_id))
				.filter(resource::Column::InstanceCount.eq(0))
				.exec(conn)
				.await?;
		}

		Change::InsertInstance(new) => {
			resource_instance::Entity::insert(resource_instance::ActiveModel {
				id: NotSet,
				uuid: Set(new.id),
				workspace_id: Set(new.workspace_id),
				parent_uuid: Set(new.parent_id),
				creator_id: Set(new.creator_id),
				resource_type: Set(new.resource_type),
				resource_uuid: Set(new.resource_id),
				created_at: Set(new.created_at),
			})
			.exec(conn)
			.await?;
		}

		Change::PlaceInstance {
			instance_id,
			parent_id,
			workspace_id,
		} => {
			let result = resource_instance::Entity::update_many()
				.filter(resource_instance::Column::Uuid.eq(instance_id))
				.set(resource_instance::ActiveModel {
					parent_uuid: Set(parent_id),
					workspace_id: Set(workspace_id),
					..Default::default()
				})
				.exec(conn)
				.await?;

			if result.rows_affected == 0 {
				return Err(CoreError::InstanceNotFound(instance_id));
			}
		}

		Change::RemoveInstance(instance_id) => {
			let result = resource_instance::Entity::delete_many()
				.filter(resource_instance::Column::Uuid.eq(instance_id))
				.exec(conn)
				.await?;

			if result.rows_affected == 0 {
				return Err(CoreError::InstanceNotFound(instance_id));
			}
		}
	}

	Ok(())
}

#[async_trait]
impl InstanceTreeStore for DbStore {
	async fn find_resource(&self, id: Uuid) -> Result<Option<AbstractResource>> {
		Ok(resource::Entity::find()
			.filter(resource::Column::Uuid.eq(id))
			.one(&self.conn)
			.await?
			.map(Into::into))
	}

	async fn find_instance(&self, id: Uuid) -> Result<Option<ResourceInstance>> {
		Ok(resource_instance::Entity::find()
			.filter(resource_instance::Column::Uuid.eq(id))
			.one(&self.conn)
			.await?
			.map(Into::into))
	}

	async fn instances_of(&self, resource_id: Uuid) -> Result<Vec<ResourceInstance>> {
		Ok(resource_instance::Entity::find()
			.filter(resource_instance::Column::ResourceUuid.eq(resource_id))
			.order_by_asc(resource_instance::Column::Id)
			.all(&self.conn)
			.await?
			.into_iter()
			.map(Into::into)
			.collect())
	}

	async fn children(&self, parent_id: Uuid) -> Result<Vec<ResourceInstance>> {
		Ok(resource_instance::Entity::find()
			.filter(resource_instance::Column::ParentUuid.eq(parent_id))
			.order_by_asc(resource_instance::Column::Id)
			.all(&self.conn)
			.await?
			.into_iter()
			.map(Into::into)
			.collect())
	}

	async fn flush(&self, changes: ChangeSet) -> Result<()> {
		if changes.is_empty() {
			return Ok(());
		}

		let total = changes.len();
		let txn = self.conn.begin().await?;

		// Dropping the transaction on error rolls every change back
		for change in changes.into_changes() {
			apply(&txn, change).await?;
		}

		txn.commit().await?;
		trace!(changes = total, "Flushed change set");

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::domain::{Actor, NewResource, DIRECTORY_TYPE};
	use tempfile::TempDir;

	async fn create_test_store() -> (DbStore, TempDir) {
		let temp_dir = TempDir::new().unwrap();
		let db_path = temp_dir.path().join("test_resources.db");
		let database_url = format!("sqlite://{}?mode=rwc", db_path.display());

		(DbStore::connect(&database_url).await.unwrap(), temp_dir)
	}

	#[tokio::test]
	async fn test_round_trip_through_sqlite() {
		let (store, _temp) = create_test_store().await;
		let actor = Actor::new("alice");

		let dir = AbstractResource::from_new(NewResource::new("root"), DIRECTORY_TYPE, &actor);
		let root = ResourceInstance::detached(&dir, &actor);
		let file = AbstractResource::from_new(
			NewResource::new("a.txt").with_content(serde_json::json!({ "size": 3 })),
			"file",
			&actor,
		);
		let mut leaf = ResourceInstance::detached(&file, &actor);
		leaf.attach_to(&root);

		let mut changes = ChangeSet::new();
		changes
			.persist_resource(dir.clone())
			.persist_instance(root.clone())
			.persist_resource(file.clone())
			.persist_instance(leaf.clone());
		store.flush(changes).await.unwrap();

		let loaded = store.get_resource(file.id).await.unwrap();
		assert_eq!(loaded.instance_count(), 1);
		assert_eq!(loaded.content, serde_json::json!({ "size": 3 }));
		let children = store.children(root.id).await.unwrap();
		assert_eq!(children.iter().map(|i| i.id).collect::<Vec<_>>(), vec![leaf.id]);
		assert_eq!(store.get_instance(leaf.id).await.unwrap().parent_id, Some(root.id));
	}

	#[tokio::test]
	async fn test_failed_flush_rolls_back() {
		let (store, _temp) = create_test_store().await;
		let actor = Actor::new("alice");
		let dir = AbstractResource::from_new(NewResource::new("root"), DIRECTORY_TYPE, &actor);

		let mut changes = ChangeSet::new();
		changes
			.persist_resource(dir.clone())
			.adjust_instance_count(dir.id, -1);

		let err = store.flush(changes).await.unwrap_err();
		assert!(matches!(err, CoreError::InstanceCountUnderflow(_)));
		assert!(store.find_resource(dir.id).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_count_adjustments_accumulate() {
		let (store, _temp) = create_test_store().await;
		let actor = Actor::new("alice");
		let file = AbstractResource::from_new(NewResource::new("a.txt"), "file", &actor);

		let mut changes = ChangeSet::new();
		changes.persist_resource(file.clone());
		store.flush(changes).await.unwrap();

		for delta in [1, 1, 1, -1] {
			let mut changes = ChangeSet::new();
			changes.adjust_instance_count(file.id, delta);
			store.flush(changes).await.unwrap();
		}

		assert_eq!(store.get_resource(file.id).await.unwrap().instance_count(), 2);

		let mut missing = ChangeSet::new();
		missing.adjust_instance_count(Uuid::new_v4(), 1);
		assert!(matches!(
			store.flush(missing).await.unwrap_err(),
			CoreError::ResourceNotFound(_)
		));
	}

	#[tokio::test]
	async fn test_second_removal_of_an_instance_fails() {
		let (store, _temp) = create_test_store().await;
		let actor = Actor::new("alice");
		let file = AbstractResource::from_new(NewResource::new("a.txt"), "file", &actor);
		let first = ResourceInstance::detached(&file, &actor);
		let second = ResourceInstance::detached(&file, &actor);

		let mut changes = ChangeSet::new();
		changes
			.persist_resource(file.clone())
			.persist_instance(first.clone())
			.persist_instance(second);
		store.flush(changes).await.unwrap();

		let mut removal = ChangeSet::new();
		removal.remove_instance(&first);
		store.flush(removal.clone()).await.unwrap();

		let err = store.flush(removal).await.unwrap_err();
		assert!(matches!(err, CoreError::InstanceNotFound(id) if id == first.id));
		assert_eq!(store.get_resource(file.id).await.unwrap().instance_count(), 1);
	}
}
