use crate::rules::{Rule, RuleError, RuleSet};
use crate::tree::{Document, TreeError};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid rule file: {0}")]
    Rules(#[from] RuleError),
    #[error("Invalid document: {0}")]
    Document(#[from] TreeError),
}

/// Where the engine reads its rules from.
///
/// Called once per start, reload and rule change.
pub trait RuleSource {
    fn load_rules(&self) -> Result<Vec<Rule>, IoError>;
}

/// A rule file on disk, in any envelope [`RuleSet::from_json`] accepts.
///
/// Re-read on every load so edits to the file are picked up by a reload.
/// Malformed rules are skipped with a warning; the rest still load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonRuleFile {
    path: PathBuf,
}

impl JsonRuleFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RuleSource for JsonRuleFile {
    fn load_rules(&self) -> Result<Vec<Rule>, IoError> {
        let content = read_file(&self.path)?;
        Ok(RuleSet::from_stored_json(&content)?.rules)
    }
}

/// Rules held in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticRules {
    rules: Vec<Rule>,
}

impl StaticRules {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Swap the stored rules, as a rule editor would.
    pub fn set(&mut self, rules: Vec<Rule>) {
        self.rules = rules;
    }
}

impl RuleSource for StaticRules {
    fn load_rules(&self) -> Result<Vec<Rule>, IoError> {
        Ok(self.rules.clone())
    }
}

/// Read an XHTML file into a document tree
pub fn read_document(path: &Path) -> Result<Document, IoError> {
    let content = read_file(path)?;
    Ok(Document::parse_xhtml(&content)?)
}

fn read_file(path: &Path) -> Result<String, IoError> {
    if !path.exists() {
        return Err(IoError::NotFound(path.to_path_buf()));
    }
    fs::read_to_string(path).map_err(IoError::Io)
}
