//! Loading schema files.
//!
//! A schema file is a plain SQL script with two additions, both handled
//! before the script is split into statements:
//!
//! - a line `#!include <path>` is replaced by the contents of `path`,
//!   resolved relative to the including file;
//! - `${NAME}` is replaced by the value defined for `NAME`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::{Captures, Regex};
use tracing::{debug, warn};

use crate::error::{Result, SyncError};
use crate::orchestrator::Source;

const INCLUDE_DIRECTIVE: &str = "#!include";

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("Invalid placeholder regex")
    })
}

/// Reads schema files into [`Source`]s.
#[derive(Debug, Clone, Default)]
pub struct SourceLoader {
    defines: BTreeMap<String, String>,
}

impl SourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines a substitution for `${name}`.
    #[must_use]
    pub fn define(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defines.insert(name.into(), value.into());
        self
    }

    /// Loads one file, expanding includes and substitutions.
    pub fn load(&self, path: &Path) -> Result<Source> {
        let mut stack = Vec::new();
        let text = self.read(path, &mut stack)?;
        let text = self.substitute(&text);
        let source = Source::from_text(path.display().to_string(), &text);
        debug!(source = %source.name, statements = source.statements.len(), "Loaded source");
        Ok(source)
    }

    /// Loads every file, in order.
    pub fn load_all<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Vec<Source>> {
        paths.iter().map(|path| self.load(path.as_ref())).collect()
    }

    fn read(&self, path: &Path, stack: &mut Vec<PathBuf>) -> Result<String> {
        let canonical = fs::canonicalize(path)?;
        if stack.contains(&canonical) {
            return Err(SyncError::IncludeCycle(canonical));
        }
        let text = fs::read_to_string(&canonical)?;
        stack.push(canonical);

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let mut expanded = String::with_capacity(text.len());
        for line in text.lines() {
            match line.trim().strip_prefix(INCLUDE_DIRECTIVE) {
                Some(target) if target.starts_with(char::is_whitespace) => {
                    let included = base.join(target.trim());
                    debug!(file = %included.display(), "Including");
                    expanded.push_str(&self.read(&included, stack)?);
                }
                _ => expanded.push_str(line),
            }
            expanded.push('\n');
        }

        stack.pop();
        Ok(expanded)
    }

    /// Replaces `${NAME}` placeholders. Unknown names are left in place.
    pub fn substitute(&self, text: &str) -> String {
        placeholder()
            .replace_all(text, |captures: &Captures<'_>| {
                let name = &captures[1];
                match self.defines.get(name) {
                    Some(value) => value.clone(),
                    None => {
                        warn!(name = %name, "Undefined substitution");
                        captures[0].to_string()
                    }
                }
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn write(dir: &TempDir, name: &str, text: &str) -> PathBuf {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn substitutes_defined_names() {
        let loader = SourceLoader::new().define("DB", "shop");
        assert_eq!(
            loader.substitute("GRANT SELECT ON ${DB}.* TO ${USER}"),
            "GRANT SELECT ON shop.* TO ${USER}"
        );
    }

    #[test]
    fn includes_relative_to_the_including_file() {
        let dir = TempDir::new().unwrap();
        write(&dir, "parts/users.sql", "CREATE TABLE users (id INT);\n");
        let main = write(
            &dir,
            "main.sql",
            "#!include parts/users.sql\nCREATE TABLE orders (id INT);\n",
        );
        let source = SourceLoader::new().load(&main).unwrap();
        assert_eq!(source.statements.len(), 2);
        assert!(source.statements[0].starts_with("CREATE TABLE users"));
    }

    #[test]
    fn include_cycle_is_an_error() {
        let dir = TempDir::new().unwrap();
        write(&dir, "b.sql", "#!include a.sql\n");
        let a = write(&dir, "a.sql", "#!include b.sql\n");
        let err = SourceLoader::new().load(&a).unwrap_err();
        assert!(matches!(err, SyncError::IncludeCycle(_)));
    }

    #[test]
    fn shebang_like_comment_is_not_an_include() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.sql", "#!included nothing\nCREATE TABLE t (id INT);\n");
        let source = SourceLoader::new().load(&path).unwrap();
        assert_eq!(source.statements.len(), 1);
    }
}
