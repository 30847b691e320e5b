//! Initial database schema
//!
//! Creates the resource and resource instance tables. Instances reference
//! resources and parents by UUID; children are ordered by the integer key.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
	async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
		// Create resources table
		manager
			.create_table(
				Table::create()
					.table(Resources::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(Resources::Id)
							.integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(
						ColumnDef::new(Resources::Uuid)
							.uuid()
							.not_null()
							.unique_key(),
					)
					.col(ColumnDef::new(Resources::Name).string().not_null())
					.col(ColumnDef::new(Resources::ResourceType).string().not_null())
					.col(ColumnDef::new(Resources::CreatorId).uuid().not_null())
					.col(
						ColumnDef::new(Resources::ShareType)
							.integer()
							.not_null()
							.default(0),
					)
					.col(
						ColumnDef::new(Resources::InstanceCount)
							.integer()
							.not_null()
							.default(0),
					)
					.col(ColumnDef::new(Resources::Content).json().not_null())
					.col(
						ColumnDef::new(Resources::CreatedAt)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.to_owned(),
			)
			.await?;

		// Create resource_instances table
		manager
			.create_table(
				Table::create()
					.table(ResourceInstances::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(ResourceInstances::Id)
							.integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(
						ColumnDef::new(ResourceInstances::Uuid)
							.uuid()
							.not_null()
							.unique_key(),
					)
					.col(ColumnDef::new(ResourceInstances::WorkspaceId).uuid().not_null())
					.col(ColumnDef::new(ResourceInstances::ParentUuid).uuid())
					.col(ColumnDef::new(ResourceInstances::CreatorId).uuid().not_null())
					.col(
						ColumnDef::new(ResourceInstances::ResourceType)
							.string()
							.not_null(),
					)
					.col(
						ColumnDef::new(ResourceInstances::ResourceUuid)
							.uuid()
							.not_null(),
					)
					.col(
						ColumnDef::new(ResourceInstances::CreatedAt)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.to_owned(),
			)
			.await?;

		// Child enumeration and reference counting both look instances up by these
		manager
			.create_index(
				Index::create()
					.name("idx_resource_instances_parent")
					.table(ResourceInstances::Table)
					.col(ResourceInstances::ParentUuid)
					.to_owned(),
			)
			.await?;

		manager
			.create_index(
				Index::create()
					.name("idx_resource_instances_resource")
					.table(ResourceInstances::Table)
					.col(ResourceInstances::ResourceUuid)
					.to_owned(),
			)
			.await?;

		Ok(())
	}

	async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
		manager
			.drop_table(Table::drop().table(ResourceInstances::Table).to_owned())
			.await?;

		manager
			.drop_table(Table::drop().table(Resources::Table).to_owned())
			.await
	}
}

#[derive(DeriveIden)]
enum Resources {
	Table,
	Id,
	Uuid,
	Name,
	ResourceType,
	CreatorId,
	ShareType,
	InstanceCount,
	Content,
	CreatedAt,
}

#[derive(DeriveIden)]
enum ResourceInstances {
	Table,
	Id,
	Uuid,
	WorkspaceId,
	ParentUuid,
	CreatorId,
	ResourceType,
	ResourceUuid,
	CreatedAt,
}
