//! Archive writers used to bundle exported resources.
//!
//! An archive is opened at a path, filled with files and empty directory
//! markers addressed by forward-slash joined names, then finished. The only
//! format shipped here is `tar`, but callers hold an [`ArchiveFormat`] so other
//! containers can be plugged in.

use std::path::{Path, PathBuf};

use thiserror::Error;

mod tar_format;

pub use tar_format::{TarFormat, TarWriter};

#[derive(Error, Debug)]
pub enum ArchiveError {
	#[error("failed to open archive at {path}: {source}")]
	Open {
		path: PathBuf,
		source: std::io::Error,
	},

	#[error("failed to add {path} as <{entry}>: {source}")]
	AddFile {
		path: PathBuf,
		entry: String,
		source: std::io::Error,
	},

	#[error("failed to add directory entry <{entry}>: {source}")]
	AddDirectory {
		entry: String,
		source: std::io::Error,
	},

	#[error("invalid archive entry name <{0}>")]
	InvalidEntryName(String),

	#[error("failed to finish archive at {path}: {source}")]
	Finish {
		path: PathBuf,
		source: std::io::Error,
	},

	#[error("failed to read archive at {path}: {source}")]
	Read {
		path: PathBuf,
		source: std::io::Error,
	},
}

/// A container format able to create new archives.
pub trait ArchiveFormat: Send + Sync {
	/// File extension (without dot) of archives produced by this format.
	fn extension(&self) -> &'static str;

	fn open(&self, path: &Path) -> Result<Box<dyn ArchiveWriter>, ArchiveError>;
}

/// An archive being written.
pub trait ArchiveWriter {
	/// Copies the file at `source` into the archive under `entry`.
	fn add_file(&mut self, source: &Path, entry: &str) -> Result<(), ArchiveError>;

	/// Adds an entry for an empty directory called `entry`.
	fn add_empty_directory(&mut self, entry: &str) -> Result<(), ArchiveError>;

	/// Closes the archive and returns where it was written.
	fn finish(self: Box<Self>) -> Result<PathBuf, ArchiveError>;
}

/// Joins archive path segments with `/`, skipping empty segments.
pub fn join_entry<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
	segments
		.into_iter()
		.filter(|segment| !segment.is_empty())
		.collect::<Vec<_>>()
		.join("/")
}

pub(crate) fn validate_entry(entry: &str) -> Result<(), ArchiveError> {
	if entry.is_empty()
		|| entry.starts_with('/')
		|| entry.split('/').any(|segment| segment == "..")
	{
		return Err(ArchiveError::InvalidEntryName(entry.to_string()));
	}

	Ok(())
}
