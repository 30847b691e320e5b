//! Resource entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::{AbstractResource, ShareType};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "resources")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i32,
	#[sea_orm(unique)]
	pub uuid: Uuid,
	pub name: String,
	pub resource_type: String,
	pub creator_id: Uuid,
	pub share_type: i32, // 0=Private, 1=Public
	pub instance_count: i32,
	pub content: Json,
	pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(has_many = "super::resource_instance::Entity")]
	ResourceInstance,
}

impl Related<super::resource_instance::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::ResourceInstance.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for AbstractResource {
	fn from(model: Model) -> Self {
		Self {
			id: model.uuid,
			name: model.name,
			resource_type: model.resource_type,
			creator_id: model.creator_id,
			share_type: ShareType::from(model.share_type),
			content: model.content,
			created_at: model.created_at,
			instance_count: u32::try_from(model.instance_count).unwrap_or_default(),
		}
	}
}
