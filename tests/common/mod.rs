#![allow(dead_code)]

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use yabrc::config::Config;
use yabrc::fs::MemoryFileSystem;

/// A real directory tree with a config file pointing at it.
pub struct TestTree {
    pub temp_dir: TempDir,
    pub root: PathBuf,
    pub save: PathBuf,
    pub config_path: PathBuf,
}

impl TestTree {
    /// Creates `data/` to index, `manifests/` to save into, and `tree.toml`.
    pub fn new() -> Result<Self> {
        Self::with_base_name("tree")
    }

    pub fn with_base_name(base_name: &str) -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().join("data");
        let save = temp_dir.path().join("manifests");
        fs::create_dir_all(&root)?;

        let config_path = temp_dir.path().join(format!("{base_name}.toml"));
        fs::write(
            &config_path,
            format!(
                "root = '{}'\nbaseName = '{base_name}'\nsavePath = '{}'\nignoredDirs = ['/skip$']\n",
                root.display(),
                save.display()
            ),
        )?;

        Ok(Self {
            temp_dir,
            root,
            save,
            config_path,
        })
    }

    /// Writes `content` to `relative` under the indexed root.
    pub fn write(&self, relative: &str, content: &[u8]) -> Result<PathBuf> {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Path of the manifest labelled `ext`.
    pub fn manifest(&self, ext: &str) -> PathBuf {
        self.save.join(format!(
            "{}{ext}",
            self.config_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        ))
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }
}

/// Config rooted at `/data` saving into `/manifests`, for in-memory trees.
pub fn memory_config(ignored: &[&str]) -> Config {
    let ignored: Vec<String> = ignored.iter().map(|s| (*s).to_string()).collect();
    Config::new("/data", "tree", "/manifests", &ignored).unwrap()
}

/// In-memory tree with a handful of files and a writable manifest directory.
pub fn memory_tree() -> MemoryFileSystem {
    let fs = MemoryFileSystem::new();
    fs.add_file("/data/a.txt", b"alpha");
    fs.add_file("/data/photos/b.jpg", b"jpeg bytes");
    fs.add_file("/data/photos/c.jpg", b"more jpeg bytes");
    fs.add_dir("/manifests");
    fs
}
