//! Type Dispatch Bus
//!
//! The tree manager knows nothing about concrete resource kinds. Whatever is
//! type specific (cloning a payload, cleaning it up, turning it into a file) is
//! published as a named event, `<action>_<type>`, and answered by the handler
//! registered for that name.
//!
//! An unanswered event is reported back as `None`/`false` so the caller can
//! decide whether that is a skip (export) or a contract violation (copy).

use crate::{
	common::errors::{CoreError, Result},
	domain::{AbstractResource, NewResource},
};
use async_trait::async_trait;
use std::{
	collections::HashMap,
	path::PathBuf,
	sync::{Arc, PoisonError, RwLock},
};
use strum::IntoEnumIterator;
use tracing::{debug, warn};

#[derive(
	Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr, strum::Display, strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum ResourceAction {
	Copy,
	Delete,
	Export,
}

/// `<action>_<lowercased type with spaces replaced by underscores>`
pub fn event_name(action: ResourceAction, resource_type: &str) -> String {
	format!(
		"{}_{}",
		action.as_ref(),
		resource_type.to_lowercase().replace(' ', "_")
	)
}

/// Type-specific behaviour of one kind of resource
///
/// Every non-directory type is expected to answer all three actions. The
/// default bodies only matter when a handler is registered for an action it
/// does not implement.
#[async_trait]
pub trait ResourceTypeHandler: Send + Sync {
	/// Produces an independent clone of `source`'s payload
	async fn copy(&self, source: &AbstractResource) -> Result<NewResource> {
		Err(CoreError::MissingHandler(event_name(
			ResourceAction::Copy,
			&source.resource_type,
		)))
	}

	/// Cleans up the payload of resources that are going away
	async fn delete(&self, _resources: &[AbstractResource]) -> Result<()> {
		Ok(())
	}

	/// Materializes the resource as a file, `None` when there is nothing to export
	async fn export(&self, _resource: &AbstractResource) -> Result<Option<PathBuf>> {
		Ok(None)
	}
}

#[derive(Default)]
pub struct DispatchBus {
	handlers: RwLock<HashMap<String, Arc<dyn ResourceTypeHandler>>>,
}

impl DispatchBus {
	pub fn new() -> Self {
		Self::default()
	}

	/// Answers copy, delete and export events for `resource_type`
	pub fn register(&self, resource_type: &str, handler: Arc<dyn ResourceTypeHandler>) {
		for action in ResourceAction::iter() {
			self.register_action(action, resource_type, Arc::clone(&handler));
		}
	}

	/// Answers a single event, returning the handler it replaced
	pub fn register_action(
		&self,
		action: ResourceAction,
		resource_type: &str,
		handler: Arc<dyn ResourceTypeHandler>,
	) -> Option<Arc<dyn ResourceTypeHandler>> {
		let name = event_name(action, resource_type);
		debug!(event = %name, "Registering resource handler");

		self.handlers
			.write()
			.unwrap_or_else(PoisonError::into_inner)
			.insert(name, handler)
	}

	pub fn has_handler(&self, action: ResourceAction, resource_type: &str) -> bool {
		self.handler(&event_name(action, resource_type)).is_some()
	}

	fn handler(&self, event: &str) -> Option<Arc<dyn ResourceTypeHandler>> {
		self.handlers
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.get(event)
			.cloned()
	}

	/// Publishes `copy_<type>`; `None` when nobody answered
	pub async fn publish_copy(&self, source: &AbstractResource) -> Result<Option<NewResource>> {
		let event = event_name(ResourceAction::Copy, &source.resource_type);
		let Some(handler) = self.handler(&event) else {
			warn!(%event, resource_id = %source.id, "No handler answered copy event");
			return Ok(None);
		};

		debug!(%event, resource_id = %source.id, "Publishing copy event");
		handler.copy(source).await.map(Some)
	}

	/// Publishes `delete_<type>`; `false` when nobody acknowledged
	pub async fn publish_delete(
		&self,
		resource_type: &str,
		resources: &[AbstractResource],
	) -> Result<bool> {
		let event = event_name(ResourceAction::Delete, resource_type);
		let Some(handler) = self.handler(&event) else {
			warn!(%event, count = resources.len(), "No handler answered delete event");
			return Ok(false);
		};

		debug!(%event, count = resources.len(), "Publishing delete event");
		handler.delete(resources).await?;

		Ok(true)
	}

	/// Publishes `export_<type>`; `None` when nobody answered or nothing was produced
	pub async fn publish_export(&self, resource: &AbstractResource) -> Result<Option<PathBuf>> {
		let event = event_name(ResourceAction::Export, &resource.resource_type);
		let Some(handler) = self.handler(&event) else {
			debug!(%event, resource_id = %resource.id, "No handler answered export event");
			return Ok(None);
		};

		debug!(%event, resource_id = %resource.id, "Publishing export event");
		handler.export(resource).await
	}
}
