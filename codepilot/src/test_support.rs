//! Test-only collaborators: an in-memory codebase plus scripted completion and
//! search backends that replay canned replies in order.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;

use crate::core::types::{LineEdit, SearchResult, Step, StepOp};
use crate::io::codebase::{Codebase, DirCodebase, NotFound};
use crate::io::config::{EngineConfig, default_config_path, write_config};
use crate::io::completion::Completer;
use crate::io::search::{SearchError, WebSearch};

/// Owned lines from string literals.
pub fn lines(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

/// Temporary working root laid out the way the CLI expects: config under
/// `.codepilot/`, files under the configured codebase directory.
pub struct TempWorkspace {
    dir: TempDir,
}

impl TempWorkspace {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create temp workspace")?;
        Ok(Self { dir })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn codebase_dir(&self) -> PathBuf {
        EngineConfig::default().codebase_path(self.root())
    }

    pub fn codebase(&self) -> DirCodebase {
        DirCodebase::new(self.codebase_dir())
    }

    pub fn write_file(&self, name: &str, contents: &str) -> Result<()> {
        let path = self.codebase_dir().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))
    }

    pub fn read_file(&self, name: &str) -> Result<String> {
        let path = self.codebase_dir().join(name);
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))
    }

    /// Write `config` to the default location and return its path.
    pub fn write_config(&self, config: &EngineConfig) -> Result<PathBuf> {
        let path = default_config_path(self.root());
        write_config(&path, config)?;
        Ok(path)
    }
}

/// Codebase held in a sorted map, so listing order matches [`crate::io::codebase::DirCodebase`].
#[derive(Debug, Default)]
pub struct MemoryCodebase {
    files: RefCell<BTreeMap<String, Vec<String>>>,
    unreadable: RefCell<BTreeSet<String>>,
}

impl MemoryCodebase {
    pub fn with_files<'a>(files: impl IntoIterator<Item = (&'a str, &'a [&'a str])>) -> Self {
        let codebase = Self::default();
        {
            let mut map = codebase.files.borrow_mut();
            for (name, content) in files {
                map.insert(name.to_string(), lines(content));
            }
        }
        codebase
    }

    /// Current contents of `name`, if present.
    pub fn file(&self, name: &str) -> Option<Vec<String>> {
        self.files.borrow().get(name).cloned()
    }

    /// Make reads of `name` fail while it stays listed.
    pub fn mark_unreadable(&self, name: &str) {
        self.unreadable.borrow_mut().insert(name.to_string());
    }
}

impl Codebase for MemoryCodebase {
    fn list(&self) -> Result<Vec<String>> {
        Ok(self.files.borrow().keys().cloned().collect())
    }

    fn read(&self, name: &str) -> Result<Vec<String>> {
        if self.unreadable.borrow().contains(name) {
            return Err(anyhow!("permission denied reading {name}"));
        }
        self.files
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!(NotFound(name.to_string())))
    }

    fn write(&self, name: &str, lines: &[String]) -> Result<()> {
        self.files
            .borrow_mut()
            .insert(name.to_string(), lines.to_vec());
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<()> {
        self.files.borrow_mut().remove(name);
        Ok(())
    }
}

/// One canned completion reply.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Text(String),
    Fail(String),
}

/// Completer that returns queued replies and records every prompt it saw.
/// Running out of replies is an error.
#[derive(Debug, Default)]
pub struct ScriptedCompleter {
    replies: RefCell<VecDeque<ScriptedReply>>,
    prompts: RefCell<Vec<String>>,
}

impl ScriptedCompleter {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_replies(
            responses
                .into_iter()
                .map(|text| ScriptedReply::Text(text.into())),
        )
    }

    pub fn with_replies(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            replies: RefCell::new(replies.into_iter().collect()),
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.borrow().len()
    }
}

impl Completer for ScriptedCompleter {
    fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.borrow_mut().push(prompt.to_string());
        match self.replies.borrow_mut().pop_front() {
            Some(ScriptedReply::Text(text)) => Ok(text),
            Some(ScriptedReply::Fail(message)) => Err(anyhow!(message)),
            None => Err(anyhow!(
                "scripted completer exhausted after {} prompts",
                self.prompts.borrow().len()
            )),
        }
    }
}

/// One canned search reply.
#[derive(Debug, Clone)]
pub enum ScriptedSearchReply {
    Results(Vec<SearchResult>),
    Timeout,
    Fail(String),
}

/// Search backend that replays queued replies and records `(query, max_results)`.
/// Running out of replies reports the provider as unavailable.
#[derive(Debug, Default)]
pub struct ScriptedSearch {
    replies: RefCell<VecDeque<ScriptedSearchReply>>,
    calls: RefCell<Vec<(String, usize)>>,
}

impl ScriptedSearch {
    pub fn new(replies: Vec<ScriptedSearchReply>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, usize)> {
        self.calls.borrow().clone()
    }
}

impl WebSearch for ScriptedSearch {
    fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>, SearchError> {
        self.calls
            .borrow_mut()
            .push((query.to_string(), max_results));
        match self.replies.borrow_mut().pop_front() {
            Some(ScriptedSearchReply::Results(results)) => Ok(results),
            Some(ScriptedSearchReply::Timeout) => {
                Err(SearchError::Timeout(std::time::Duration::from_secs(1)))
            }
            Some(ScriptedSearchReply::Fail(message)) => Err(SearchError::Failed(message)),
            None => Err(SearchError::Unavailable(
                "no scripted replies left".to_string(),
            )),
        }
    }
}

/// Deterministic search result keyed by title.
pub fn search_result(title: &str) -> SearchResult {
    SearchResult {
        title: title.to_string(),
        url: format!("https://example.test/{}", title.replace(' ', "-")),
        content: format!("{title} content"),
    }
}

pub fn write_step(file: &str, content: &str) -> Step {
    Step::new(
        file,
        StepOp::Write {
            content: content.to_string(),
        },
    )
}

pub fn modify_step(file: &str, line: usize, new_code: &str) -> Step {
    Step::new(
        file,
        StepOp::ApplyChange(LineEdit::Modify {
            line,
            new_code: new_code.to_string(),
        }),
    )
}
