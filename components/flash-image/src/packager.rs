//! Replays a host directory tree into the image.

use core::fmt;
use std::{
    fs::File,
    io::{self, Read},
    path::{Component, Path, PathBuf},
};

use littlefs2::{driver::Storage, fs::Filesystem};
use walkdir::{DirEntry, WalkDir};

use crate::{
    constants::{HIDDEN_MARKER, PATH_SEPARATOR},
    Error, Result,
};

/// Location of a file inside the image, relative to the image root.
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TargetPath {
    segments: Vec<String>,
}

impl TargetPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, segment: impl Into<String>) {
        self.segments.push(segment.into());
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The containing directory, `None` for entries at the image root.
    pub fn parent(&self) -> Option<TargetPath> {
        match self.segments.split_last() {
            Some((_, parent)) if !parent.is_empty() => Some(Self {
                segments: parent.to_vec(),
            }),
            _ => None,
        }
    }

    /// Builds the target path of `path`, which must be located below `root`.
    pub fn relative(root: &Path, path: &Path) -> Result<Self> {
        let invalid = || Error::InvalidPath { path: path.into() };
        let relative = path.strip_prefix(root).map_err(|_| invalid())?;
        let mut target = Self::new();
        for component in relative.components() {
            match component {
                Component::Normal(segment) => target.push(segment.to_str().ok_or_else(invalid)?),
                _ => return Err(invalid()),
            }
        }
        Ok(target)
    }

    fn to_littlefs(&self) -> Result<littlefs2::path::PathBuf> {
        let path = self.to_string();
        littlefs2::path::PathBuf::try_from(path.as_str())
            .map_err(|_| Error::InvalidPath { path: path.into() })
    }
}

impl<S: Into<String>> FromIterator<S> for TargetPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for TargetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join(PATH_SEPARATOR))
    }
}

/// Receives the files found by the [`Packager`].
pub trait ImageWriter {
    /// Creates (or truncates) the file at `path` and stores `content` in it.
    fn add_file(&mut self, path: &TargetPath, content: &[u8]) -> Result<()>;
}

impl<S: Storage> ImageWriter for Filesystem<'_, S> {
    fn add_file(&mut self, path: &TargetPath, content: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            self.create_dir_all(&parent.to_littlefs()?)?;
        }
        let file = path.to_littlefs()?;
        debug!("Opened image file {}", path);
        self.write(&file, content)?;
        debug!("Closed image file {}", path);
        Ok(())
    }
}

/// Outcome of a packaging run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Summary {
    /// Files stored in the image.
    pub files: usize,
    /// Bytes of file content stored in the image.
    pub bytes: usize,
    /// Files that could not be opened or named.
    pub skipped: usize,
    /// Files that could not be read or stored.
    pub failed: usize,
    /// Directories that could not be listed.
    pub unreadable_dirs: usize,
}

/// Walks a source directory depth-first and hands every regular file to an
/// [`ImageWriter`].
///
/// Entries are visited in the order the host filesystem lists them.
/// Symbolic links are not followed and neither they nor other special files
/// are packaged.
pub struct Packager<F = HostFiles> {
    root: PathBuf,
    files: F,
}

/// Opens the regular files found by the [`Packager`].
pub trait SourceFiles {
    type File: Read;

    fn open(&self, path: &Path) -> io::Result<Self::File>;

    /// Number of bytes `file` is expected to contain.
    fn len(&self, file: &Self::File) -> io::Result<u64>;
}

/// Reads source files from the host filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct HostFiles;

impl SourceFiles for HostFiles {
    type File = File;

    fn open(&self, path: &Path) -> io::Result<File> {
        File::open(path)
    }

    fn len(&self, file: &File) -> io::Result<u64> {
        Ok(file.metadata()?.len())
    }
}

impl Packager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_files(root, HostFiles)
    }
}

impl<F: SourceFiles> Packager<F> {
    pub fn with_files(root: impl Into<PathBuf>, files: F) -> Self {
        Self {
            root: root.into(),
            files,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pack<W: ImageWriter + ?Sized>(&self, writer: &mut W) -> Summary {
        let mut summary = Summary::default();
        let walker = WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|entry| !is_hidden_dir(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("Unable to open directory {:?}: {}", err.path(), err);
                    summary.unreadable_dirs += 1;
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            match self.add_file(writer, entry.path()) {
                Ok(len) => {
                    summary.files += 1;
                    summary.bytes += len;
                }
                Err(err @ (Error::Open { .. } | Error::InvalidPath { .. })) => {
                    warn!("Skipping {:?}: {}", entry.path(), err);
                    summary.skipped += 1;
                }
                Err(err) => {
                    error!("Unable to add {:?}: {}", entry.path(), err);
                    summary.failed += 1;
                }
            }
        }

        summary
    }

    fn add_file<W: ImageWriter + ?Sized>(&self, writer: &mut W, path: &Path) -> Result<usize> {
        let target = TargetPath::relative(&self.root, path)?;
        let content = read_source(&self.files, path)?;
        debug!("{} bytes read from {:?}", content.len(), path);
        writer.add_file(&target, &content)?;
        info!("{} added to image ({} bytes)", target, content.len());
        Ok(content.len())
    }
}

/// Hidden directories are skipped, hidden files are not.
fn is_hidden_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry.file_name().to_string_lossy().starts_with(HIDDEN_MARKER)
}

fn read_source<F: SourceFiles>(files: &F, path: &Path) -> Result<Vec<u8>> {
    let file = files.open(path).map_err(|source| Error::Open {
        path: path.into(),
        source,
    })?;
    let read_error = |source| Error::Read {
        path: path.into(),
        source,
    };
    let expected = files.len(&file).map_err(read_error)?;

    let mut content = Vec::with_capacity(expected as usize);
    file.take(expected)
        .read_to_end(&mut content)
        .map_err(read_error)?;
    if content.len() as u64 != expected {
        return Err(Error::ShortRead {
            path: path.into(),
            expected,
            actual: content.len() as u64,
        });
    }
    Ok(content)
}
