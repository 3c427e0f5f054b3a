//! # The Anatomist: Python source dissection
//!
//! **Role**: Turns Python sources into logic graph facts.
//!
//! **Stages**:
//! - [`parser`]: tree-sitter parsing and syntax-error rejection.
//! - [`symbols`]: function, class, module and name-reference nodes.
//! - [`imports`]: `import` records and their resolution to analyzed modules.
//! - [`dependencies`]: `calls` and `inherits` edges through a [`Resolver`].
//! - [`graph`]: the assembled [`LogicGraph`].
//! - [`scan`]: discovery and loading of `.py` files.
//!
//! Every stage works on one file at a time except assembly, so the caller is
//! free to fan files out over worker threads.

pub mod dependencies;
pub mod graph;
pub mod heuristics;
pub mod imports;
pub mod parser;
pub mod path_util;
pub mod scan;
pub mod symbols;

pub use common::AnalysisError;
pub use dependencies::{DependencyAnalyzer, NameResolver, Resolver};
pub use graph::LogicGraph;
pub use heuristics::Heuristic;
pub use imports::{ImportRecord, ModuleIndex};
pub use parser::{ParsedFile, ParserHost};

use memmap2::MmapOptions;
use std::fs::File;
use std::path::Path;

/// One Python source handed to the analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Normalized path (forward slashes). Used verbatim in node ids.
    pub path: String,
    pub text: String,
    /// Dotted module name; derived from `path` when not given.
    pub module: Option<String>,
}

impl SourceFile {
    /// Builds an in-memory source. The module name is derived from the path.
    ///
    /// # Example
    /// ```
    /// # use anatomist::SourceFile;
    /// let src = SourceFile::new("pkg/utils.py", "def helper(): pass\n");
    /// assert_eq!(src.module_name(), "pkg.utils");
    /// ```
    pub fn new(path: impl AsRef<Path>, text: impl Into<String>) -> Self {
        Self {
            path: path_util::display_path(path.as_ref()),
            text: text.into(),
            module: None,
        }
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Reads a file through a read-only memory map.
    ///
    /// `root` anchors the dotted module name; pass the directory the file was
    /// discovered under.
    ///
    /// # Errors
    /// - `Io`: file not found, permission denied, mmap failure
    /// - `ByteRangeOverflow`: file larger than 4GB (tree-sitter u32 limit)
    /// - `Encoding`: contents are not UTF-8
    pub fn load(path: &Path, root: &Path) -> Result<Self, AnalysisError> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();

        if file_len > u32::MAX as u64 {
            return Err(AnalysisError::ByteRangeOverflow);
        }

        let text = if file_len == 0 {
            String::new()
        } else {
            // SAFETY: The file handle is held for the duration of the mmap lifetime.
            let mmap = unsafe { MmapOptions::new().map(&file)? };
            std::str::from_utf8(&mmap[..])
                .map_err(|e| AnalysisError::Encoding(format!("{}: {e}", path.display())))?
                .to_string()
        };

        let relative = path.strip_prefix(root).unwrap_or(path);
        Ok(Self {
            path: path_util::display_path(path),
            text,
            module: Some(path_util::module_name(relative).0),
        })
    }

    /// Dotted module name, explicit or derived from the path.
    pub fn module_name(&self) -> String {
        match &self.module {
            Some(module) => module.clone(),
            None => path_util::module_name(Path::new(&self.path)).0,
        }
    }

    /// `__init__.py` files define a package rather than a plain module.
    pub fn is_package(&self) -> bool {
        Path::new(&self.path)
            .file_name()
            .is_some_and(|name| name == "__init__.py")
    }
}

/// `__init__`, `__enter__` and friends.
pub fn is_dunder(name: &str) -> bool {
    name.len() > 4 && name.starts_with("__") && name.ends_with("__")
}
