use super::ResourceManager;
use crate::{
	common::errors::{CoreError, Result},
	domain::ResourceInstance,
};
use arbor_archive::join_entry;
use std::{
	collections::{HashMap, HashSet},
	path::PathBuf,
	sync::Arc,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

impl ResourceManager {
	/// Turns an instance into a transportable file
	///
	/// Leaves are exported by their type handler, which may have nothing to
	/// produce. Directories always yield an archive holding a `<root>/` entry
	/// and every exportable leaf below it at `<root>/<ancestors>/<leaf>`.
	pub async fn export(&self, instance_id: Uuid) -> Result<Option<PathBuf>> {
		let instance = self.store.get_instance(instance_id).await?;
		let resource = self.store.get_resource(instance.resource_id).await?;

		if !instance.is_directory() {
			return self.bus.publish_export(&resource).await;
		}

		self.export_directory(&instance, resource.name)
			.await
			.map(Some)
	}

	async fn export_directory(&self, root: &ResourceInstance, root_name: String) -> Result<PathBuf> {
		// Directory instance -> (parent, name), filled in pre-order so every
		// ancestor is known before its descendants are reached
		let mut directories = HashMap::<Uuid, (Option<Uuid>, String)>::new();
		let mut entries = Vec::new();
		let mut taken = HashSet::new();

		for node in self.store.descendants(root.id).await? {
			let resource = self.store.get_resource(node.resource_id).await?;

			if node.is_directory() {
				directories.insert(node.id, (node.parent_id, resource.name));
				continue;
			}

			let Some(source) = self.bus.publish_export(&resource).await? else {
				debug!(resource_id = %resource.id, "Nothing to export");
				continue;
			};

			let entry = entry_path(root.id, &root_name, node.parent_id, &directories, &resource.name);
			let unique = unique_entry(&entry, &mut taken);
			if unique != entry {
				warn!(
					resource_id = %resource.id,
					%entry,
					renamed = %unique,
					"Duplicate archive entry renamed"
				);
			}
			entries.push((source, unique));
		}

		tokio::fs::create_dir_all(&self.export_dir).await?;
		let path = self
			.export_dir
			.join(format!("{}.{}", Uuid::new_v4(), self.archive.extension()));

		let archive = Arc::clone(&self.archive);
		let files = entries.len();
		let path = tokio::task::spawn_blocking(move || -> Result<PathBuf> {
			let mut writer = archive.open(&path)?;
			writer.add_empty_directory(&root_name)?;
			for (source, entry) in &entries {
				writer.add_file(source, entry)?;
			}

			Ok(writer.finish()?)
		})
		.await
		.map_err(|e| CoreError::Other(e.into()))??;

		info!(
			instance_id = %root.id,
			files,
			path = %path.display(),
			"Exported directory"
		);

		Ok(path)
	}
}

/// `<root>/<ancestor directories, outermost first>/<leaf>`
fn entry_path(
	root_id: Uuid,
	root_name: &str,
	parent_id: Option<Uuid>,
	directories: &HashMap<Uuid, (Option<Uuid>, String)>,
	leaf: &str,
) -> String {
	let mut segments = vec![leaf];
	let mut cursor = parent_id;

	while let Some(id) = cursor.filter(|id| *id != root_id) {
		let Some((parent, name)) = directories.get(&id) else {
			break;
		};
		segments.push(name.as_str());
		cursor = *parent;
	}

	segments.push(root_name);
	join_entry(segments.into_iter().rev())
}

/// First of `entry`, `entry (1)`, `entry (2)`... not yet in `taken`; the
/// counter goes before the leaf's extension
fn unique_entry(entry: &str, taken: &mut HashSet<String>) -> String {
	if taken.insert(entry.to_string()) {
		return entry.to_string();
	}

	let (dir, leaf) = match entry.rsplit_once('/') {
		Some((dir, leaf)) => (Some(dir), leaf),
		None => (None, entry),
	};
	let (stem, ext) = match leaf.rsplit_once('.') {
		Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
		_ => (leaf, None),
	};

	let mut n = 1;
	loop {
		let leaf = match ext {
			Some(ext) => format!("{stem} ({n}).{ext}"),
			None => format!("{stem} ({n})"),
		};
		let candidate = match dir {
			Some(dir) => format!("{dir}/{leaf}"),
			None => leaf,
		};
		if taken.insert(candidate.clone()) {
			return candidate;
		}
		n += 1;
	}
}
