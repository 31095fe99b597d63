//! Codebase store: the files the engine plans against and mutates.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use thiserror::Error;
use tracing::{debug, instrument};
use walkdir::WalkDir;

use crate::core::summary::{FileSnapshot, render_summary};

/// Returned (wrapped in `anyhow::Error`) when reading a file that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("file not found: {0}")]
pub struct NotFound(pub String);

/// Abstraction over the file store. File identity is the relative path string.
///
/// Lines are stored without terminators.
pub trait Codebase {
    /// Every file name, in a stable order.
    fn list(&self) -> Result<Vec<String>>;
    /// Read a file as lines. Fails with [`NotFound`] if absent.
    fn read(&self, name: &str) -> Result<Vec<String>>;
    /// Create or overwrite a file.
    fn write(&self, name: &str, lines: &[String]) -> Result<()>;
    /// Remove a file; absent files are not an error.
    fn delete(&self, name: &str) -> Result<()>;
}

/// Directory-backed codebase rooted at a single directory.
#[derive(Debug, Clone)]
pub struct DirCodebase {
    root: PathBuf,
}

impl DirCodebase {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a file name onto a path under the root, refusing anything that
    /// could escape it.
    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        if name.trim().is_empty() {
            bail!("empty file name");
        }
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    bail!("path `{name}` is outside the codebase");
                }
            }
        }
        Ok(self.root.join(relative))
    }
}

impl Codebase for DirCodebase {
    #[instrument(skip_all, fields(root = %self.root.display()))]
    fn list(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.with_context(|| format!("walk {}", self.root.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .with_context(|| format!("relativize {}", entry.path().display()))?;
            let name = relative
                .components()
                .map(|component| component.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            names.push(name);
        }
        debug!(files = names.len(), "listed codebase");
        Ok(names)
    }

    fn read(&self, name: &str) -> Result<Vec<String>> {
        let path = self.resolve(name)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(contents.lines().map(str::to_string).collect()),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(anyhow!(NotFound(name.to_string()))),
            Err(err) => Err(err).with_context(|| format!("read {}", path.display())),
        }
    }

    fn write(&self, name: &str, lines: &[String]) -> Result<()> {
        let path = self.resolve(name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        let mut buf = String::new();
        for line in lines {
            buf.push_str(line);
            buf.push('\n');
        }
        fs::write(&path, buf).with_context(|| format!("write {}", path.display()))
    }

    fn delete(&self, name: &str) -> Result<()> {
        let path = self.resolve(name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("delete {}", path.display())),
        }
    }
}

/// Read every file into a snapshot. Unreadable files are recorded rather than
/// failing the whole snapshot; only a failure to list is an error.
pub fn snapshot<B: Codebase>(codebase: &B) -> Result<Vec<FileSnapshot>> {
    let names = codebase.list().context("list codebase files")?;
    Ok(names
        .into_iter()
        .map(|name| match codebase.read(&name) {
            Ok(lines) => FileSnapshot::Readable { name, lines },
            Err(err) => FileSnapshot::Unreadable {
                name,
                error: format!("{err:#}"),
            },
        })
        .collect())
}

/// Snapshot and render the codebase in one go.
pub fn summarize<B: Codebase>(codebase: &B, budget_bytes: usize) -> Result<String> {
    Ok(render_summary(&snapshot(codebase)?, budget_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::lines;

    #[test]
    fn write_read_list_delete() {
        let temp = tempfile::tempdir().expect("tempdir");
        let codebase = DirCodebase::new(temp.path().join("codebase"));
        assert!(codebase.list().expect("list empty").is_empty());

        codebase
            .write("pkg/util.py", &lines(&["def f():", "    pass"]))
            .expect("write nested");
        codebase.write("main.py", &lines(&["print(1)"])).expect("write");

        assert_eq!(codebase.list().expect("list"), vec!["main.py", "pkg/util.py"]);
        assert_eq!(
            codebase.read("pkg/util.py").expect("read"),
            lines(&["def f():", "    pass"])
        );
        assert_eq!(
            fs::read_to_string(temp.path().join("codebase/main.py")).expect("raw"),
            "print(1)\n"
        );

        codebase.delete("main.py").expect("delete");
        codebase.delete("main.py").expect("delete again is a no-op");
        assert_eq!(codebase.list().expect("list"), vec!["pkg/util.py"]);
    }

    #[test]
    fn read_missing_is_not_found() {
        let temp = tempfile::tempdir().expect("tempdir");
        let codebase = DirCodebase::new(temp.path());
        let err = codebase.read("missing.py").unwrap_err();
        assert_eq!(
            err.downcast_ref::<NotFound>(),
            Some(&NotFound("missing.py".to_string()))
        );
    }

    #[test]
    fn refuses_paths_outside_root() {
        let temp = tempfile::tempdir().expect("tempdir");
        let codebase = DirCodebase::new(temp.path().join("codebase"));
        assert!(codebase.write("../escape.py", &[]).is_err());
        assert!(codebase.read("/etc/passwd").is_err());
        assert!(codebase.delete("").is_err());
    }

    #[test]
    fn snapshot_records_unreadable_files() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        fs::write(root.join("ok.py"), "x = 1\n").expect("write ok");
        fs::write(root.join("blob.bin"), [0xff, 0xfe, 0x00]).expect("write blob");

        let summary = summarize(&DirCodebase::new(root), 10_000).expect("summarize");
        assert!(summary.contains("Filename: ok.py\nx = 1\n"));
        assert!(summary.contains("Filename: blob.bin\n[unreadable: "));
    }
}
