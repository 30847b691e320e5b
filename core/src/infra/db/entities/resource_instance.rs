//! Resource instance entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::ResourceInstance;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "resource_instances")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i32, // Insertion order, children are listed by it
	#[sea_orm(unique)]
	pub uuid: Uuid,
	pub workspace_id: Uuid,
	pub parent_uuid: Option<Uuid>, // None only for workspace roots
	pub creator_id: Uuid,
	pub resource_type: String,
	pub resource_uuid: Uuid,
	pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::resource::Entity",
		from = "Column::ResourceUuid",
		to = "super::resource::Column::Uuid"
	)]
	Resource,
	#[sea_orm(belongs_to = "Entity", from = "Column::ParentUuid", to = "Column::Uuid")]
	Parent,
}

impl Related<super::resource::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Resource.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for ResourceInstance {
	fn from(model: Model) -> Self {
		Self {
			id: model.uuid,
			workspace_id: model.workspace_id,
			parent_id: model.parent_uuid,
			creator_id: model.creator_id,
			resource_type: model.resource_type,
			resource_id: model.resource_uuid,
			created_at: model.created_at,
		}
	}
}
