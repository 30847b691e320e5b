//! The fully wired core on SQLite

mod helpers;

use arbor_core::{
	config::AppConfig, context::CoreContext, infra::store::InstanceTreeStore, Actor, ShareType,
};
use arbor_archive::TarWriter;
use helpers::*;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

#[tokio::test]
async fn test_tree_lifecycle_on_sqlite() -> anyhow::Result<()> {
	let harness = TreeHarness::sqlite().await?;
	let d = harness.dir(&harness.alice, "D", harness.root.id).await?;
	let f = harness.file(&harness.alice, "F", d.id, "stored").await?;
	let other = harness.dir(&harness.bob, "other", harness.root.id).await?;

	harness
		.manager
		.set_share_type(&harness.alice, f.resource_id, ShareType::Public)
		.await?;
	let link = harness
		.manager
		.add_to_directory_by_reference(&harness.bob, f.resource_id, other.id)
		.await?
		.expect("public file");
	assert_eq!(harness.count(f.resource_id).await?, Some(2));

	let archive = harness.manager.export(d.id).await?.expect("archive");
	assert_eq!(TarWriter::entry_names(&archive)?, vec!["D/", "D/F"]);

	harness.manager.delete(&harness.bob, other.id).await?;
	assert!(harness.store().find_instance(link.id).await?.is_none());
	assert_eq!(harness.count(f.resource_id).await?, Some(1));

	harness.manager.delete(&harness.alice, d.id).await?;
	assert_eq!(harness.count(f.resource_id).await?, None);
	harness.verify_refcounts().await?;

	Ok(())
}

#[tokio::test]
async fn test_tree_survives_reopening() -> anyhow::Result<()> {
	let dir = TempDir::new()?;
	let config = AppConfig::load_or_create(dir.path())?;
	let alice = Actor::new("alice");

	let (root, leaf) = {
		let context = CoreContext::open(config.clone()).await?;
		let root = context
			.resources
			.create_workspace_root(&alice, uuid::Uuid::new_v4(), "home")
			.await?;
		let new = context.files.import("kept.txt", b"kept").await?;
		let leaf = context
			.resources
			.create(
				&alice,
				new,
				root.id,
				"file",
				arbor_core::ReturnHandle::Instance,
			)
			.await?
			.into_instance()
			.expect("instance handle");
		(root, leaf)
	};

	let context = CoreContext::open(AppConfig::load_from(dir.path())?).await?;
	let children = context.resources.store().children(root.id).await?;
	assert_eq!(children.len(), 1);
	assert_eq!(children[0].id, leaf.id);
	assert_eq!(children[0].workspace_id, root.workspace_id);
	assert_eq!(children[0].creator_id, alice.id);

	let resource = context.resources.store().get_resource(leaf.resource_id).await?;
	assert_eq!(context.files.read(&resource).await?, b"kept");

	Ok(())
}
