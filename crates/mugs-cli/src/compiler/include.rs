//! `#load "path"` include expansion.
//!
//! A line of the form `#load "relative/path.star"` is replaced by the content
//! of the named file, resolved relative to the including file. Starlark sees
//! the directive as a comment, so expansion is purely textual and happens
//! before parsing. Each file is expanded at most once per compile; cycles and
//! repeated includes collapse to the first occurrence.
//!
//! Targets must resolve inside the directory of the file being compiled.
//! Every output line remembers the file and line it came from, so
//! diagnostics against the expanded text can point back at the real source.

use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::error::CompileError;

fn directive() -> &'static Regex {
    static DIRECTIVE: OnceLock<Regex> = OnceLock::new();
    DIRECTIVE.get_or_init(|| Regex::new(r#"^\s*#load\s+"([^"]+)"\s*$"#).expect("valid regex"))
}

/// Where one line of expanded source came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineOrigin {
    pub file: PathBuf,
    /// 1-based line number within `file`.
    pub line: usize,
}

/// Source text after include expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expanded {
    pub source: String,
    /// Files pulled in by directives, in expansion order.
    pub includes: Vec<PathBuf>,
    /// One entry per line of `source`.
    pub origins: Vec<LineOrigin>,
}

impl Expanded {
    fn push_line(&mut self, text: &str, file: &Path, line: usize) {
        self.source.push_str(text);
        self.source.push('\n');
        self.origins.push(LineOrigin {
            file: file.to_path_buf(),
            line,
        });
    }
}

struct Expansion<'a> {
    root_dir: &'a Path,
    visited: HashSet<PathBuf>,
    out: Expanded,
}

/// Reads `path` and expands its include directives recursively.
pub fn expand(path: &Path) -> Result<Expanded, CompileError> {
    let root = fs::canonicalize(path).map_err(|e| CompileError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let root_dir = root.parent().unwrap_or_else(|| Path::new("/")).to_path_buf();

    let mut expansion = Expansion {
        root_dir: &root_dir,
        visited: HashSet::from([root.clone()]),
        out: Expanded {
            source: String::new(),
            includes: Vec::new(),
            origins: Vec::new(),
        },
    };
    expansion.expand_file(&root)?;
    Ok(expansion.out)
}

impl Expansion<'_> {
    fn expand_file(&mut self, path: &Path) -> Result<(), CompileError> {
        let source = fs::read_to_string(path).map_err(|e| CompileError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));

        for (index, line) in source.lines().enumerate() {
            let number = index + 1;
            let Some(caps) = directive().captures(line) else {
                self.out.push_line(line, path, number);
                continue;
            };

            let target = &caps[1];
            let location = format!("{}:{}", path.display(), number);
            if Path::new(target).is_absolute() {
                return Err(CompileError::IncludeOutsideRoot {
                    location,
                    include: target.to_string(),
                });
            }
            let resolved = fs::canonicalize(base.join(target)).map_err(|_| {
                CompileError::IncludeNotFound {
                    location: location.clone(),
                    include: target.to_string(),
                }
            })?;
            if !resolved.starts_with(self.root_dir) {
                return Err(CompileError::IncludeOutsideRoot {
                    location,
                    include: target.to_string(),
                });
            }

            if self.visited.insert(resolved.clone()) {
                self.out.includes.push(resolved.clone());
                self.expand_file(&resolved)?;
            } else {
                self.out
                    .push_line(&format!("# already included: {}", target), path, number);
            }
        }
        Ok(())
    }
}
