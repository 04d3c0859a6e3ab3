//! Source files
//!
//! A program may be split over several `.i` files; they are read in
//! order and run as one text. Line numbers in the joined text map back
//! to the file they came from.

use cringe_core::Fault;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const SOURCE_EXTENSION: &str = "i";

#[derive(Debug)]
pub enum LoadError {
    /// No files, or a file that is not a `.i` source
    Fault(Fault),
    /// A file that could not be read
    Io(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Fault(fault) => write!(f, "{}", fault),
            LoadError::Io(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<Fault> for LoadError {
    fn from(fault: Fault) -> Self {
        LoadError::Fault(fault)
    }
}

#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct Sources {
    files: Vec<SourceFile>,
    /// First line of each file in the joined text, from 1
    starts: Vec<usize>,
}

impl Sources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every file in order. E777 without files, E998 for a file
    /// without the `.i` extension.
    pub fn load(paths: &[PathBuf]) -> Result<Self, LoadError> {
        if paths.is_empty() {
            return Err(Fault::NoSource.into());
        }
        let mut sources = Sources::new();
        for path in paths {
            if path.extension().is_none_or(|ext| ext != SOURCE_EXTENSION) {
                return Err(Fault::WrongCompiler(path.display().to_string()).into());
            }
            let text = fs::read_to_string(path)
                .map_err(|e| LoadError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
            sources.push(path.clone(), text);
        }
        Ok(sources)
    }

    pub fn push(&mut self, path: PathBuf, mut text: String) {
        if !text.ends_with('\n') {
            text.push('\n');
        }
        let start = match (self.starts.last(), self.files.last()) {
            (Some(start), Some(file)) => start + file.text.matches('\n').count(),
            _ => 1,
        };
        self.starts.push(start);
        self.files.push(SourceFile { path, text });
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    /// All files joined into one program text
    pub fn text(&self) -> String {
        self.files.iter().map(|f| f.text.as_str()).collect()
    }

    /// File and line within it for a line of the joined text
    pub fn locate(&self, line: usize) -> Option<(&Path, usize)> {
        let index = self.starts.iter().rposition(|&start| start <= line)?;
        let file = &self.files[index];
        Some((file.path.as_path(), line - self.starts[index] + 1))
    }
}
