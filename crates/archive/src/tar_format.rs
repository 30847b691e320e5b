use std::{
	fs::File,
	io::{self, BufWriter, Write},
	path::{Path, PathBuf},
};

use tar::{Archive, Builder, EntryType, Header};
use tracing::trace;

use crate::{validate_entry, ArchiveError, ArchiveFormat, ArchiveWriter};

/// Plain (uncompressed) tar archives.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarFormat;

impl ArchiveFormat for TarFormat {
	fn extension(&self) -> &'static str {
		"tar"
	}

	fn open(&self, path: &Path) -> Result<Box<dyn ArchiveWriter>, ArchiveError> {
		Ok(Box::new(TarWriter::create(path)?))
	}
}

pub struct TarWriter {
	path: PathBuf,
	builder: Builder<BufWriter<File>>,
}

impl TarWriter {
	pub fn create(path: impl AsRef<Path>) -> Result<Self, ArchiveError> {
		let path = path.as_ref().to_path_buf();
		let file = File::create(&path).map_err(|source| ArchiveError::Open {
			path: path.clone(),
			source,
		})?;

		// Entries carry the content of linked files, never the link itself
		let mut builder = Builder::new(BufWriter::new(file));
		builder.follow_symlinks(true);

		Ok(Self { path, builder })
	}

	/// Lists the entry names of a tar archive, directories with a trailing `/`.
	pub fn entry_names(path: impl AsRef<Path>) -> Result<Vec<String>, ArchiveError> {
		let path = path.as_ref();
		let read_err = |source| ArchiveError::Read {
			path: path.to_path_buf(),
			source,
		};

		let mut archive = Archive::new(File::open(path).map_err(read_err)?);
		let mut names = Vec::new();

		for entry in archive.entries().map_err(read_err)? {
			let entry = entry.map_err(read_err)?;
			let mut name = entry
				.path()
				.map_err(read_err)?
				.to_string_lossy()
				.into_owned();

			if entry.header().entry_type().is_dir() && !name.ends_with('/') {
				name.push('/');
			}

			names.push(name);
		}

		Ok(names)
	}
}

impl ArchiveWriter for TarWriter {
	fn add_file(&mut self, source: &Path, entry: &str) -> Result<(), ArchiveError> {
		validate_entry(entry)?;
		trace!(source = %source.display(), %entry, "Adding file to archive");

		self.builder
			.append_path_with_name(source, entry)
			.map_err(|e| ArchiveError::AddFile {
				path: source.to_path_buf(),
				entry: entry.to_string(),
				source: e,
			})
	}

	fn add_empty_directory(&mut self, entry: &str) -> Result<(), ArchiveError> {
		let entry = format!("{}/", entry.trim_end_matches('/'));
		validate_entry(&entry)?;
		trace!(%entry, "Adding empty directory to archive");

		let mut header = Header::new_gnu();
		header.set_entry_type(EntryType::Directory);
		header.set_size(0);
		header.set_mode(0o755);

		self.builder
			.append_data(&mut header, &entry, io::empty())
			.map_err(|source| ArchiveError::AddDirectory { entry, source })
	}

	fn finish(self: Box<Self>) -> Result<PathBuf, ArchiveError> {
		let Self { path, builder } = *self;
		let finish_err = |source| ArchiveError::Finish {
			path: path.clone(),
			source,
		};

		let mut writer = builder.into_inner().map_err(finish_err)?;
		writer.flush().map_err(finish_err)?;

		Ok(path)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[test]
	fn writes_files_and_directory_markers() {
		let dir = TempDir::new().unwrap();
		let source = dir.path().join("blob");
		std::fs::write(&source, b"hello").unwrap();

		let mut writer = TarFormat.open(&dir.path().join("out.tar")).unwrap();
		writer.add_empty_directory("docs").unwrap();
		writer.add_file(&source, "docs/nested/hello.txt").unwrap();
		let path = writer.finish().unwrap();

		let names = TarWriter::entry_names(&path).unwrap();
		assert_eq!(names, vec!["docs/", "docs/nested/hello.txt"]);
	}

	#[test]
	fn empty_archive_still_exists() {
		let dir = TempDir::new().unwrap();

		let writer = TarFormat.open(&dir.path().join("empty.tar")).unwrap();
		let path = writer.finish().unwrap();

		assert!(path.exists());
		assert!(TarWriter::entry_names(&path).unwrap().is_empty());
	}

	#[cfg(unix)]
	#[test]
	fn linked_sources_are_archived_by_content() {
		use std::io::Read;

		let dir = TempDir::new().unwrap();
		let target = dir.path().join("blob");
		std::fs::write(&target, b"linked body").unwrap();
		let link = dir.path().join("link");
		std::os::unix::fs::symlink(&target, &link).unwrap();

		let mut writer = TarFormat.open(&dir.path().join("out.tar")).unwrap();
		writer.add_file(&link, "root/file").unwrap();
		let path = writer.finish().unwrap();

		let mut archive = Archive::new(File::open(&path).unwrap());
		let mut entry = archive.entries().unwrap().next().unwrap().unwrap();
		assert_eq!(entry.header().entry_type(), EntryType::Regular);

		let mut body = String::new();
		entry.read_to_string(&mut body).unwrap();
		assert_eq!(body, "linked body");
	}

	#[test]
	fn missing_source_is_reported() {
		let dir = TempDir::new().unwrap();

		let mut writer = TarFormat.open(&dir.path().join("out.tar")).unwrap();
		let err = writer
			.add_file(&dir.path().join("missing"), "root/missing")
			.unwrap_err();

		assert!(matches!(err, ArchiveError::AddFile { .. }));
	}
}
