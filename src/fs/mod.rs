//! Filesystem abstraction consumed by the indexing core.
//!
//! The builder, the entry builder and the manifest codec never touch `std::fs`
//! directly. They go through [`FileSystem`], which has a real implementation
//! ([`OsFileSystem`]) and an in-memory one ([`MemoryFileSystem`]) used to inject
//! faults in tests.

mod memory;

pub use memory::MemoryFileSystem;

use std::ffi::OsStr;
use std::fs::{self, File, Metadata};
use std::io::{self, Read, Write};
use std::path::Path;
use std::time::SystemTime;
use walkdir::WalkDir;

/// Kind of a filesystem entry, as reported without following symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Regular file
    File,
    /// Directory
    Dir,
    /// Symbolic link
    Symlink,
    /// Device, socket, fifo or anything else that is not a regular file
    Other,
}

/// Stat metadata for one filesystem entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Base name exactly as the filesystem reports it (not normalized)
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Last modification time, full resolution
    pub modified: SystemTime,
    /// Entry kind
    pub kind: FileKind,
}

impl FileInfo {
    /// Builds `FileInfo` from `std` metadata obtained without following links.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform does not report a modification time.
    pub fn from_metadata(name: &OsStr, metadata: &Metadata) -> io::Result<Self> {
        let file_type = metadata.file_type();
        let kind = if file_type.is_symlink() {
            FileKind::Symlink
        } else if file_type.is_dir() {
            FileKind::Dir
        } else if file_type.is_file() {
            FileKind::File
        } else {
            FileKind::Other
        };

        Ok(Self {
            name: name.to_string_lossy().into_owned(),
            size: metadata.len(),
            modified: metadata.modified()?,
            kind,
        })
    }

    /// True for directories.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Dir
    }

    /// True for regular files only.
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }
}

/// A writable handle whose contents can be forced to stable storage.
pub trait SyncWrite: Write {
    /// Flushes OS buffers to the underlying device.
    ///
    /// # Errors
    ///
    /// Returns an error if the data could not be made durable.
    fn sync_all(&mut self) -> io::Result<()>;
}

impl SyncWrite for File {
    fn sync_all(&mut self) -> io::Result<()> {
        File::sync_all(self)
    }
}

/// Returned by a walk visitor to steer the traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkControl {
    /// Keep going
    Continue,
    /// Do not descend into the directory just visited
    SkipDir,
}

/// Visitor invoked once per walked path with its metadata or the error that
/// prevented reading it.
pub type WalkVisitor<'a> = dyn FnMut(&Path, io::Result<&FileInfo>) -> WalkControl + 'a;

/// The filesystem primitives the core requires.
pub trait FileSystem {
    /// Opens a file for reading.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or cannot be opened.
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + '_>>;

    /// Creates or truncates a file for writing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    fn create(&self, path: &Path) -> io::Result<Box<dyn SyncWrite + '_>>;

    /// Creates a directory and all missing parents.
    ///
    /// # Errors
    ///
    /// Returns an error if any directory cannot be created.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Renames a file, replacing the destination if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the source does not exist or the rename fails.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Stats a path without following symlinks.
    ///
    /// # Errors
    ///
    /// Returns an error if the path does not exist or cannot be read.
    fn stat(&self, path: &Path) -> io::Result<FileInfo>;

    /// Walks the tree under `root` depth-first, visiting `root` itself first
    /// and siblings in file-name order. Symlinks are reported but never
    /// followed. Per-entry failures are handed to `visit` rather than ending
    /// the walk.
    ///
    /// # Errors
    ///
    /// Returns an error only if the walk as a whole could not proceed.
    fn walk(&self, root: &Path, visit: &mut WalkVisitor<'_>) -> io::Result<()>;
}

/// [`FileSystem`] backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(File::open(path)?))
    }

    fn create(&self, path: &Path) -> io::Result<Box<dyn SyncWrite + '_>> {
        Ok(Box::new(File::create(path)?))
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn stat(&self, path: &Path) -> io::Result<FileInfo> {
        let metadata = fs::symlink_metadata(path)?;
        let name = path.file_name().unwrap_or(path.as_os_str());
        FileInfo::from_metadata(name, &metadata)
    }

    fn walk(&self, root: &Path, visit: &mut WalkVisitor<'_>) -> io::Result<()> {
        let mut entries = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        while let Some(item) = entries.next() {
            let entry = match item {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().unwrap_or(root).to_path_buf();
                    visit(&path, Err(io::Error::from(err)));
                    continue;
                }
            };

            let info = entry
                .metadata()
                .map_err(io::Error::from)
                .and_then(|metadata| FileInfo::from_metadata(entry.file_name(), &metadata));

            match info {
                Ok(info) => {
                    let control = visit(entry.path(), Ok(&info));
                    if control == WalkControl::SkipDir && entry.file_type().is_dir() {
                        entries.skip_current_dir();
                    }
                }
                Err(err) => {
                    visit(entry.path(), Err(err));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn collect_walk(fs: &dyn FileSystem, root: &Path) -> Vec<(PathBuf, FileKind)> {
        let mut seen = Vec::new();
        fs.walk(root, &mut |path, info| {
            if let Ok(info) = info {
                seen.push((path.to_path_buf(), info.kind));
            }
            WalkControl::Continue
        })
        .unwrap();
        seen
    }

    #[test]
    fn test_os_walk_is_depth_first_and_sorted() -> Result<()> {
        let temp = TempDir::new()?;
        let root = temp.path();
        fs::create_dir_all(root.join("a/nested"))?;
        fs::write(root.join("a/nested/deep.txt"), b"deep")?;
        fs::write(root.join("a.txt"), b"a")?;
        fs::write(root.join("b.txt"), b"b")?;

        let seen: Vec<PathBuf> = collect_walk(&OsFileSystem, root)
            .into_iter()
            .map(|(p, _)| p.strip_prefix(root).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            seen,
            vec![
                PathBuf::new(),
                PathBuf::from("a"),
                PathBuf::from("a/nested"),
                PathBuf::from("a/nested/deep.txt"),
                PathBuf::from("a.txt"),
                PathBuf::from("b.txt"),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_os_walk_skip_dir() -> Result<()> {
        let temp = TempDir::new()?;
        let root = temp.path();
        fs::create_dir_all(root.join("skip/inner"))?;
        fs::write(root.join("skip/inner/file"), b"x")?;
        fs::write(root.join("keep"), b"y")?;

        let mut files = Vec::new();
        OsFileSystem.walk(root, &mut |_, info| {
            let info = info.unwrap();
            if info.is_dir() && info.name == "skip" {
                return WalkControl::SkipDir;
            }
            if info.is_file() {
                files.push(info.name.clone());
            }
            WalkControl::Continue
        })?;

        assert_eq!(files, vec!["keep".to_string()]);
        Ok(())
    }

    #[test]
    fn test_os_walk_missing_root_reports_error() -> Result<()> {
        let temp = TempDir::new()?;
        let missing = temp.path().join("missing");

        let mut errors = 0;
        OsFileSystem.walk(&missing, &mut |_, info| {
            if info.is_err() {
                errors += 1;
            }
            WalkControl::Continue
        })?;

        assert_eq!(errors, 1);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_os_stat_does_not_follow_symlinks() -> Result<()> {
        let temp = TempDir::new()?;
        let target = temp.path().join("target");
        let link = temp.path().join("link");
        fs::write(&target, b"content")?;
        std::os::unix::fs::symlink(&target, &link)?;

        assert_eq!(OsFileSystem.stat(&target)?.kind, FileKind::File);
        assert_eq!(OsFileSystem.stat(&link)?.kind, FileKind::Symlink);
        Ok(())
    }

    #[test]
    fn test_os_create_and_rename() -> Result<()> {
        let temp = TempDir::new()?;
        let dir = temp.path().join("save/dir");
        OsFileSystem.create_dir_all(&dir)?;

        let first = dir.join("first");
        {
            let mut out = OsFileSystem.create(&first)?;
            out.write_all(b"payload")?;
            out.sync_all()?;
        }

        let second = dir.join("second");
        OsFileSystem.rename(&first, &second)?;

        assert!(!first.exists());
        let mut content = String::new();
        OsFileSystem.open(&second)?.read_to_string(&mut content)?;
        assert_eq!(content, "payload");
        Ok(())
    }
}
