use crate::document::document_type;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Finds the documents under a directory that a batch build should read.
///
/// Hidden entries and anything `.gitignore` excludes are skipped, as are
/// the configured excluded directories (relative to the root).
#[derive(Debug, Clone)]
pub struct DocumentScanner {
    root: PathBuf,
    extensions: Vec<String>,
    excluded: Vec<PathBuf>,
}

impl DocumentScanner {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            extensions: Vec::new(),
            excluded: Vec::new(),
        }
    }

    /// Keep only files with one of these extensions. Matching ignores case
    /// and a leading dot; an empty list keeps every file.
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        self
    }

    #[must_use]
    pub fn excluding<I, P>(mut self, directories: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.excluded = directories
            .into_iter()
            .map(|dir| self.root.join(dir))
            .collect();
        self
    }

    /// Matching files in path order.
    pub fn scan(&self) -> Vec<PathBuf> {
        let excluded = self.excluded.clone();
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true);
        builder.filter_entry(move |entry| !excluded.iter().any(|dir| entry.path().starts_with(dir)));

        let mut files = Vec::new();
        for result in builder.build() {
            match result {
                Ok(entry) => {
                    if !entry.file_type().is_some_and(|t| t.is_file()) {
                        continue;
                    }
                    if !self.accepts(entry.path()) {
                        continue;
                    }
                    files.push(entry.into_path());
                }
                Err(e) => log::warn!("Failed to read entry: {e}"),
            }
        }
        files.sort();

        log::info!(
            "Found {} documents under {}",
            files.len(),
            self.root.display()
        );
        files
    }

    fn accepts(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        let ext = document_type(path);
        self.extensions.iter().any(|candidate| *candidate == ext)
    }
}
