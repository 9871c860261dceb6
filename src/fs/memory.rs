use super::{FileInfo, FileKind, FileSystem, SyncWrite, WalkControl, WalkVisitor};
use crate::utils::paths;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::io::{self, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// One node in the arena.
#[derive(Debug, Clone)]
struct Node {
    kind: FileKind,
    data: Vec<u8>,
    modified: SystemTime,
    opens: usize,
}

/// Arena plus the path lookup table pointing into it.
#[derive(Debug, Default)]
struct Arena {
    nodes: Vec<Node>,
    by_path: BTreeMap<String, usize>,
    read_failures: HashSet<String>,
    walk_failures: HashSet<String>,
    read_only: bool,
}

impl Arena {
    fn lookup(&self, key: &str) -> Option<&Node> {
        self.by_path.get(key).map(|&id| &self.nodes[id])
    }

    fn insert(&mut self, key: String, node: Node) {
        if let Some(&id) = self.by_path.get(&key) {
            self.nodes[id] = node;
        } else {
            self.nodes.push(node);
            self.by_path.insert(key, self.nodes.len() - 1);
        }
    }

    /// Creates every missing ancestor directory of `key`.
    fn ensure_parents(&mut self, key: &str, modified: SystemTime) -> io::Result<()> {
        let mut missing = Vec::new();
        let mut current = parent_key(key);

        while let Some(parent) = current {
            match self.lookup(&parent).map(|n| n.kind) {
                Some(FileKind::Dir) => break,
                Some(_) => {
                    return Err(io::Error::other(format!("'{parent}' is not a directory")));
                }
                None => {}
            }
            current = parent_key(&parent);
            missing.push(parent);
        }

        for dir in missing {
            self.insert(dir, Node::dir(modified));
        }
        Ok(())
    }

    /// Keys of the direct children of `dir`, in name order.
    fn children(&self, dir: &str) -> Vec<String> {
        let prefix = if dir.ends_with('/') {
            dir.to_string()
        } else {
            format!("{dir}/")
        };

        self.by_path
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter(|(key, _)| key.len() > prefix.len() && !key[prefix.len()..].contains('/'))
            .map(|(key, _)| key.clone())
            .collect()
    }

    fn info(&self, key: &str) -> Option<FileInfo> {
        self.lookup(key).map(|node| FileInfo {
            name: paths::base_name(key).to_string(),
            size: if node.kind == FileKind::Dir {
                0
            } else {
                node.data.len() as u64
            },
            modified: node.modified,
            kind: node.kind,
        })
    }
}

impl Node {
    fn dir(modified: SystemTime) -> Self {
        Self {
            kind: FileKind::Dir,
            data: Vec::new(),
            modified,
            opens: 0,
        }
    }
}

fn key_of(path: &Path) -> String {
    paths::clean(&paths::to_slash(&path.to_string_lossy()))
}

fn parent_key(key: &str) -> Option<String> {
    match key.rfind('/') {
        Some(0) if key.len() > 1 => Some("/".to_string()),
        Some(0) | None => None,
        Some(i) => Some(key[..i].to_string()),
    }
}

fn not_found(key: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("'{key}' does not exist"))
}

fn read_only() -> io::Error {
    io::Error::new(io::ErrorKind::PermissionDenied, "filesystem is read-only")
}

/// In-memory [`FileSystem`] for tests.
///
/// Nodes live in an arena indexed by normalized `/` separated path. Names are
/// kept byte-for-byte, so decomposed Unicode names can be modelled. Faults are
/// injected per path: failing reads, failing walk entries, and a global
/// read-only switch that makes every write fail.
///
/// # Examples
///
/// ```
/// use yabrc::fs::{FileSystem, MemoryFileSystem};
/// use std::io::Read;
/// use std::path::Path;
///
/// let fs = MemoryFileSystem::new();
/// fs.add_file("/data/a.txt", b"hello");
///
/// let mut content = String::new();
/// fs.open(Path::new("/data/a.txt")).unwrap().read_to_string(&mut content).unwrap();
/// assert_eq!(content, "hello");
/// assert_eq!(fs.open_count("/data/a.txt"), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    arena: RefCell<Arena>,
}

impl MemoryFileSystem {
    /// Creates an empty filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a regular file, creating parent directories.
    /// The modification time is the current time.
    pub fn add_file(&self, path: impl AsRef<Path>, content: &[u8]) {
        self.add_file_with_mtime(path, content, SystemTime::now());
    }

    /// Adds (or replaces) a regular file with an explicit modification time.
    pub fn add_file_with_mtime(&self, path: impl AsRef<Path>, content: &[u8], modified: SystemTime) {
        self.add_node(path.as_ref(), FileKind::File, content.to_vec(), modified);
    }

    /// Adds a directory and its parents.
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        self.add_node(path.as_ref(), FileKind::Dir, Vec::new(), SystemTime::now());
    }

    /// Adds a symlink-like entry. It is reported by `walk` and `stat` but
    /// never followed.
    pub fn add_symlink(&self, path: impl AsRef<Path>, target: &str) {
        self.add_node(
            path.as_ref(),
            FileKind::Symlink,
            target.as_bytes().to_vec(),
            SystemTime::now(),
        );
    }

    /// Changes the modification time of an existing entry.
    pub fn set_modified(&self, path: impl AsRef<Path>, modified: SystemTime) {
        let key = key_of(path.as_ref());
        let mut arena = self.arena.borrow_mut();
        if let Some(&id) = arena.by_path.get(&key) {
            arena.nodes[id].modified = modified;
        }
    }

    /// Makes every read of `path` fail after a successful open.
    pub fn fail_reads(&self, path: impl AsRef<Path>) {
        let key = key_of(path.as_ref());
        self.arena.borrow_mut().read_failures.insert(key);
    }

    /// Makes `walk` report an error instead of metadata for `path`.
    pub fn fail_walk(&self, path: impl AsRef<Path>) {
        let key = key_of(path.as_ref());
        self.arena.borrow_mut().walk_failures.insert(key);
    }

    /// Toggles read-only mode: creates, directory creation and renames fail.
    pub fn set_read_only(&self, read_only: bool) {
        self.arena.borrow_mut().read_only = read_only;
    }

    /// Number of times `path` has been opened for reading.
    #[must_use]
    pub fn open_count(&self, path: impl AsRef<Path>) -> usize {
        let key = key_of(path.as_ref());
        self.arena.borrow().lookup(&key).map_or(0, |node| node.opens)
    }

    /// Raw contents of a file, if it exists.
    #[must_use]
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        let key = key_of(path.as_ref());
        self.arena.borrow().lookup(&key).map(|node| node.data.clone())
    }

    /// True if anything exists at `path`.
    #[must_use]
    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        let key = key_of(path.as_ref());
        self.arena.borrow().by_path.contains_key(&key)
    }

    fn add_node(&self, path: &Path, kind: FileKind, data: Vec<u8>, modified: SystemTime) {
        let key = key_of(path);
        let mut arena = self.arena.borrow_mut();
        // a parent that is not a directory is a broken fixture, not a runtime case
        if arena.ensure_parents(&key, modified).is_ok() {
            arena.insert(
                key,
                Node {
                    kind,
                    data,
                    modified,
                    opens: 0,
                },
            );
        }
    }

    fn walk_node(&self, key: &str, visit: &mut WalkVisitor<'_>) {
        let path = PathBuf::from(key);

        let info = {
            let arena = self.arena.borrow();
            if arena.walk_failures.contains(key) {
                Err(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    format!("cannot read '{key}'"),
                ))
            } else {
                arena.info(key).ok_or_else(|| not_found(key))
            }
        };

        let info = match info {
            Ok(info) => info,
            Err(err) => {
                visit(&path, Err(err));
                return;
            }
        };

        let control = visit(&path, Ok(&info));
        if !info.is_dir() || control == WalkControl::SkipDir {
            return;
        }

        let children = self.arena.borrow().children(key);
        for child in children {
            self.walk_node(&child, visit);
        }
    }
}

/// Reader over a snapshot of a file's bytes, optionally failing every read.
enum MemoryReader {
    Data(Cursor<Vec<u8>>),
    Failing(String),
}

impl Read for MemoryReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Data(cursor) => cursor.read(buf),
            Self::Failing(key) => Err(io::Error::other(format!(
                "injected read failure on '{key}'"
            ))),
        }
    }
}

/// Buffered writer that publishes its contents into the arena on flush,
/// sync and drop.
struct MemoryWriter<'a> {
    fs: &'a MemoryFileSystem,
    key: String,
    buf: Vec<u8>,
}

impl MemoryWriter<'_> {
    fn publish(&self) {
        let mut arena = self.fs.arena.borrow_mut();
        if let Some(&id) = arena.by_path.get(&self.key) {
            let node = &mut arena.nodes[id];
            node.data.clone_from(&self.buf);
            node.modified = SystemTime::now();
        }
    }
}

impl Write for MemoryWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.publish();
        Ok(())
    }
}

impl SyncWrite for MemoryWriter<'_> {
    fn sync_all(&mut self) -> io::Result<()> {
        self.publish();
        Ok(())
    }
}

impl Drop for MemoryWriter<'_> {
    fn drop(&mut self) {
        self.publish();
    }
}

impl FileSystem for MemoryFileSystem {
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + '_>> {
        let key = key_of(path);
        let mut arena = self.arena.borrow_mut();
        let fail = arena.read_failures.contains(&key);

        let id = *arena.by_path.get(&key).ok_or_else(|| not_found(&key))?;
        let node = &mut arena.nodes[id];
        if node.kind == FileKind::Dir {
            return Err(io::Error::other(format!("'{key}' is a directory")));
        }
        node.opens += 1;

        if fail {
            return Ok(Box::new(MemoryReader::Failing(key)));
        }
        Ok(Box::new(MemoryReader::Data(Cursor::new(node.data.clone()))))
    }

    fn create(&self, path: &Path) -> io::Result<Box<dyn SyncWrite + '_>> {
        let key = key_of(path);
        {
            let mut arena = self.arena.borrow_mut();
            if arena.read_only {
                return Err(read_only());
            }
            if let Some(parent) = parent_key(&key)
                && arena.lookup(&parent).map(|n| n.kind) != Some(FileKind::Dir)
            {
                return Err(not_found(&parent));
            }
            arena.insert(
                key.clone(),
                Node {
                    kind: FileKind::File,
                    data: Vec::new(),
                    modified: SystemTime::now(),
                    opens: 0,
                },
            );
        }

        Ok(Box::new(MemoryWriter {
            fs: self,
            key,
            buf: Vec::new(),
        }))
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let key = key_of(path);
        let mut arena = self.arena.borrow_mut();
        if arena.read_only {
            return Err(read_only());
        }
        match arena.lookup(&key).map(|n| n.kind) {
            Some(FileKind::Dir) => Ok(()),
            Some(_) => Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("'{key}' exists and is not a directory"),
            )),
            None => {
                let now = SystemTime::now();
                arena.ensure_parents(&key, now)?;
                arena.insert(key, Node::dir(now));
                Ok(())
            }
        }
    }

    /// Only files can be renamed; children are keyed by full path and would be
    /// left behind under the old directory.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let from = key_of(from);
        let to = key_of(to);
        let mut arena = self.arena.borrow_mut();
        if arena.read_only {
            return Err(read_only());
        }
        if arena.lookup(&from).map(|n| n.kind) == Some(FileKind::Dir) {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("cannot rename directory '{from}'"),
            ));
        }

        let id = arena.by_path.remove(&from).ok_or_else(|| not_found(&from))?;
        arena.by_path.insert(to, id);
        Ok(())
    }

    fn stat(&self, path: &Path) -> io::Result<FileInfo> {
        let key = key_of(path);
        self.arena.borrow().info(&key).ok_or_else(|| not_found(&key))
    }

    fn walk(&self, root: &Path, visit: &mut WalkVisitor<'_>) -> io::Result<()> {
        self.walk_node(&key_of(root), visit);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn walked(fs: &MemoryFileSystem, root: &str) -> Vec<String> {
        let mut seen = Vec::new();
        fs.walk(Path::new(root), &mut |path, _| {
            seen.push(path.to_string_lossy().into_owned());
            WalkControl::Continue
        })
        .unwrap();
        seen
    }

    #[test]
    fn test_walk_order_matches_name_order() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/r/a.txt", b"1");
        fs.add_file("/r/a/inner", b"2");
        fs.add_file("/r/b", b"3");

        assert_eq!(
            walked(&fs, "/r"),
            vec!["/r", "/r/a", "/r/a/inner", "/r/a.txt", "/r/b"]
        );
    }

    #[test]
    fn test_walk_missing_root() {
        let fs = MemoryFileSystem::new();
        let mut errors = 0;
        fs.walk(Path::new("/nope"), &mut |_, info| {
            if info.is_err() {
                errors += 1;
            }
            WalkControl::Continue
        })
        .unwrap();
        assert_eq!(errors, 1);
    }

    #[test]
    fn test_walk_failure_injection() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/r/bad/file", b"x");
        fs.add_file("/r/good", b"y");
        fs.fail_walk("/r/bad");

        let mut errors = Vec::new();
        let mut files = Vec::new();
        fs.walk(Path::new("/r"), &mut |path, info| {
            match info {
                Ok(info) if info.is_file() => files.push(info.name.clone()),
                Ok(_) => {}
                Err(_) => errors.push(path.to_path_buf()),
            }
            WalkControl::Continue
        })
        .unwrap();

        assert_eq!(errors, vec![PathBuf::from("/r/bad")]);
        assert_eq!(files, vec!["good".to_string()]);
    }

    #[test]
    fn test_writer_publishes_on_drop() {
        let fs = MemoryFileSystem::new();
        fs.create_dir_all(Path::new("/save")).unwrap();
        {
            let mut out = fs.create(Path::new("/save/index")).unwrap();
            out.write_all(b"abc").unwrap();
        }
        assert_eq!(fs.contents("/save/index"), Some(b"abc".to_vec()));
    }

    #[test]
    fn test_create_requires_parent() {
        let fs = MemoryFileSystem::new();
        assert!(fs.create(Path::new("/missing/dir/file")).is_err());
    }

    #[test]
    fn test_read_only_rejects_writes() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/d/f", b"1");
        fs.set_read_only(true);

        assert!(fs.create(Path::new("/d/g")).is_err());
        assert!(fs.create_dir_all(Path::new("/e")).is_err());
        assert!(fs.rename(Path::new("/d/f"), Path::new("/d/h")).is_err());
        assert!(fs.exists("/d/f"));
    }

    #[test]
    fn test_rename_moves_content() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/d/f", b"payload");
        fs.rename(Path::new("/d/f"), Path::new("/d/g")).unwrap();

        assert!(!fs.exists("/d/f"));
        assert_eq!(fs.contents("/d/g"), Some(b"payload".to_vec()));
    }

    #[test]
    fn test_rename_rejects_directories() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/d/sub/f", b"payload");

        let err = fs.rename(Path::new("/d/sub"), Path::new("/d/moved")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::IsADirectory);
        assert!(fs.exists("/d/sub/f"));
        assert!(!fs.exists("/d/moved"));
    }

    #[test]
    fn test_failing_reads_and_open_count() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/d/f", b"payload");
        fs.fail_reads("/d/f");

        let mut reader = fs.open(Path::new("/d/f")).unwrap();
        let mut buf = Vec::new();
        assert!(reader.read_to_end(&mut buf).is_err());
        assert_eq!(fs.open_count("/d/f"), 1);
    }

    #[test]
    fn test_explicit_mtime_and_symlink_kind() {
        let fs = MemoryFileSystem::new();
        let when = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        fs.add_file_with_mtime("/d/f", b"x", when);
        fs.add_symlink("/d/link", "/d/f");

        assert_eq!(fs.stat(Path::new("/d/f")).unwrap().modified, when);
        assert_eq!(fs.stat(Path::new("/d/link")).unwrap().kind, FileKind::Symlink);
    }
}
