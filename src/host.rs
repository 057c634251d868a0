// ============================================================================
// Host model - what the analysis host exposes to the bridge
// ============================================================================
//
// The host owns file discovery and storage. The bridge only sees:
// - SourceFile: read-only input
// - HostSink: the mutation surface (issues, highlighting, CPD, measures)
//
// All positions handed to a HostSink are host coordinates: 1-based lines,
// 0-based columns.
// ============================================================================

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Repository key under which all TypeScript rules are registered.
pub const REPOSITORY_KEY: &str = "typescript";

/// Language key of analyzable files.
pub const LANGUAGE_KEY: &str = "ts";

/// A discovered source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    path: PathBuf,
    contents: Option<String>,
    language: String,
}

impl SourceFile {
    /// A file whose contents will be read from disk on demand.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            contents: None,
            language: LANGUAGE_KEY.to_string(),
        }
    }

    /// A file with contents already in memory (unsaved buffers, tests).
    pub fn with_contents(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: Some(contents.into()),
            language: LANGUAGE_KEY.to_string(),
        }
    }

    /// Declare a language other than TypeScript. Such files are ignored by
    /// the orchestrator.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn contents(&self) -> std::io::Result<String> {
        match &self.contents {
            Some(c) => Ok(c.clone()),
            None => fs::read_to_string(&self.path),
        }
    }
}

/// Host rule identifier, e.g. `typescript:S1751`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleKey {
    pub repository: String,
    pub rule: String,
}

impl RuleKey {
    pub fn of(repository: &str, rule: &str) -> Self {
        Self {
            repository: repository.to_string(),
            rule: rule.to_string(),
        }
    }

    pub fn typescript(rule: &str) -> Self {
        Self::of(REPOSITORY_KEY, rule)
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.rule)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TextPointer {
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TextRange {
    pub start: TextPointer,
    pub end: TextPointer,
}

impl TextRange {
    pub fn new(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Self {
        Self {
            start: TextPointer { line: start_line, column: start_column },
            end: TextPointer { line: end_line, column: end_column },
        }
    }

    /// Zero-width or inverted (line, then column order).
    pub fn is_degenerate(&self) -> bool {
        self.end <= self.start
    }
}

/// Highlighting classes understood by the host renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeOfText {
    Annotation,
    Constant,
    Comment,
    CppDoc,
    StructuredComment,
    Keyword,
    String,
    KeywordLight,
    PreprocessDirective,
}

impl TypeOfText {
    /// Parse the engine's `textType` tag (case-insensitive).
    pub fn from_tag(tag: &str) -> Option<Self> {
        let t = match tag.to_ascii_lowercase().as_str() {
            "annotation" => TypeOfText::Annotation,
            "constant" => TypeOfText::Constant,
            "comment" => TypeOfText::Comment,
            "cpp_doc" => TypeOfText::CppDoc,
            "structured_comment" => TypeOfText::StructuredComment,
            "keyword" => TypeOfText::Keyword,
            "string" => TypeOfText::String,
            "keyword_light" => TypeOfText::KeywordLight,
            "preprocess_directive" => TypeOfText::PreprocessDirective,
            _ => return None,
        };
        Some(t)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Ncloc,
    CommentLines,
    ExecutableLines,
    Functions,
    Statements,
    Classes,
}

/// Keys of the per-line data store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineDataKey {
    NclocData,
    CommentLinesData,
    ExecutableLinesData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIssue {
    pub rule: RuleKey,
    pub file: PathBuf,
    pub range: TextRange,
    pub message: Option<String>,
}

/// Mutation surface of the host.
///
/// Implementations are not required to be thread-safe; the orchestrator
/// serializes all calls behind one lock.
pub trait HostSink: Send {
    fn save_issue(&mut self, issue: NewIssue);

    fn highlight(&mut self, file: &Path, range: TextRange, kind: TypeOfText);

    fn cpd_token(&mut self, file: &Path, range: TextRange, image: &str);

    fn save_measure(&mut self, file: &Path, metric: Metric, value: i64);

    fn set_line_value(&mut self, file: &Path, key: LineDataKey, line: u32, value: i32);

    fn no_sonar_lines(&mut self, file: &Path, lines: BTreeSet<u32>);
}

// ============================================================================
// MemorySink - in-memory host used by the CLI report and tests
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct CpdToken {
    pub range: TextRange,
    pub image: String,
}

/// Everything recorded for one file
#[derive(Debug, Default, Clone, Serialize)]
pub struct FileRecord {
    pub highlights: Vec<(TextRange, TypeOfText)>,
    pub cpd_tokens: Vec<CpdToken>,
    pub measures: BTreeMap<Metric, i64>,
    pub line_data: BTreeMap<LineDataKey, BTreeMap<u32, i32>>,
    pub no_sonar: BTreeSet<u32>,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct MemorySink {
    pub issues: Vec<NewIssue>,
    pub files: BTreeMap<PathBuf, FileRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(&self, path: &Path) -> Option<&FileRecord> {
        self.files.get(path)
    }

    pub fn measure(&self, path: &Path, metric: Metric) -> Option<i64> {
        self.files.get(path).and_then(|r| r.measures.get(&metric).copied())
    }

    pub fn line_values(&self, path: &Path, key: LineDataKey) -> Vec<(u32, i32)> {
        self.files
            .get(path)
            .and_then(|r| r.line_data.get(&key))
            .map(|m| m.iter().map(|(l, v)| (*l, *v)).collect())
            .unwrap_or_default()
    }

    fn record(&mut self, path: &Path) -> &mut FileRecord {
        self.files.entry(path.to_path_buf()).or_default()
    }
}

impl HostSink for MemorySink {
    fn save_issue(&mut self, issue: NewIssue) {
        self.issues.push(issue);
    }

    fn highlight(&mut self, file: &Path, range: TextRange, kind: TypeOfText) {
        self.record(file).highlights.push((range, kind));
    }

    fn cpd_token(&mut self, file: &Path, range: TextRange, image: &str) {
        self.record(file).cpd_tokens.push(CpdToken {
            range,
            image: image.to_string(),
        });
    }

    fn save_measure(&mut self, file: &Path, metric: Metric, value: i64) {
        self.record(file).measures.insert(metric, value);
    }

    fn set_line_value(&mut self, file: &Path, key: LineDataKey, line: u32, value: i32) {
        self.record(file)
            .line_data
            .entry(key)
            .or_default()
            .insert(line, value);
    }

    fn no_sonar_lines(&mut self, file: &Path, lines: BTreeSet<u32>) {
        self.record(file).no_sonar.extend(lines);
    }
}
