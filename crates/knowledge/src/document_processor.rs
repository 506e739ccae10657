use lawguide_common::{Document, LawGuideError, Result, SourceRef};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// A PDF that could not be read and was left out of the corpus.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Pages extracted from a directory of PDFs.
#[derive(Debug, Clone, Default)]
pub struct LoadedCorpus {
    pub documents: Vec<Document>,
    pub files_found: usize,
    pub skipped: Vec<SkippedFile>,
}

impl LoadedCorpus {
    pub fn files_loaded(&self) -> usize {
        self.files_found - self.skipped.len()
    }
}

/// Loads PDF files and turns every non-blank page into a [`Document`].
#[derive(Debug, Default, Clone)]
pub struct DocumentProcessor;

impl DocumentProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Loads every `*.pdf` in `dir`, in file-name order.
    ///
    /// A missing or unreadable directory is an error. Individual files that
    /// fail to parse are skipped with a warning and listed in
    /// [`LoadedCorpus::skipped`].
    pub async fn load_directory(&self, dir: &Path) -> Result<LoadedCorpus> {
        let pdfs = self.find_pdfs(dir).await?;
        info!("Found {} PDF files in {}", pdfs.len(), dir.display());

        let mut corpus = LoadedCorpus {
            files_found: pdfs.len(),
            ..Default::default()
        };

        for path in pdfs {
            match self.load_file(&path).await {
                Ok(documents) => {
                    debug!("Loaded {} pages from {}", documents.len(), path.display());
                    corpus.documents.extend(documents);
                }
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    corpus.skipped.push(SkippedFile {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Loaded {} documents from {} files ({} skipped)",
            corpus.documents.len(),
            corpus.files_loaded(),
            corpus.skipped.len()
        );
        Ok(corpus)
    }

    /// Loads a single PDF. Pages without text are dropped.
    pub async fn load_file(&self, path: &Path) -> Result<Vec<Document>> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| LawGuideError::DocumentLoad(format!("not a file: {}", path.display())))?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| LawGuideError::Io(format!("failed to read {}: {}", path.display(), e)))?;

        // pdf-extract can panic on malformed input; the blocking task contains it.
        let name = file_name.clone();
        let pages = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem_by_pages(&bytes))
            .await
            .map_err(|e| LawGuideError::DocumentLoad(format!("PDF parser crashed on {}: {}", name, e)))?
            .map_err(|e| LawGuideError::DocumentLoad(format!("failed to extract text from {}: {}", name, e)))?;

        let documents = pages_to_documents(&file_name, pages);
        if documents.is_empty() {
            warn!("{} contains no extractable text", file_name);
        }
        Ok(documents)
    }

    async fn find_pdfs(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| LawGuideError::Io(format!("cannot read directory {}: {}", dir.display(), e)))?;

        let mut pdfs = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| LawGuideError::Io(format!("cannot list directory {}: {}", dir.display(), e)))?
        {
            let path = entry.path();
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if is_file && is_pdf(&path) {
                pdfs.push(path);
            }
        }

        pdfs.sort();
        Ok(pdfs)
    }
}

pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Converts raw per-page text into documents numbered from page 1.
pub fn pages_to_documents(file_name: &str, pages: Vec<String>) -> Vec<Document> {
    pages
        .into_iter()
        .enumerate()
        .filter_map(|(i, raw)| {
            let text = normalize_page_text(&raw);
            if text.is_empty() {
                None
            } else {
                Some(Document::new(text, SourceRef::new(file_name, i as u32 + 1)))
            }
        })
        .collect()
}

/// Cleans extraction artifacts while keeping paragraph structure intact.
pub fn normalize_page_text(raw: &str) -> String {
    static HORIZONTAL_SPACE: OnceLock<Regex> = OnceLock::new();
    static TRAILING_SPACE: OnceLock<Regex> = OnceLock::new();
    static BLANK_LINES: OnceLock<Regex> = OnceLock::new();

    let horizontal = HORIZONTAL_SPACE.get_or_init(|| Regex::new(r"[ \t\u{a0}]+").expect("valid regex"));
    let trailing = TRAILING_SPACE.get_or_init(|| Regex::new(r" *\n *").expect("valid regex"));
    let blank = BLANK_LINES.get_or_init(|| Regex::new(r"\n{3,}").expect("valid regex"));

    let cleaned: String = raw
        .replace("\r\n", "\n")
        .chars()
        .map(|c| if c == '\r' { '\n' } else { c })
        .filter(|c| *c != '\0' && *c != '\u{c}')
        .collect();

    let cleaned = horizontal.replace_all(&cleaned, " ");
    let cleaned = trailing.replace_all(&cleaned, "\n");
    let cleaned = blank.replace_all(&cleaned, "\n\n");
    cleaned.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_page_text() {
        let raw = "  Article 21.\t Protection of life   and personal liberty \r\n\n\n\n\x0cNo person shall be deprived\0 ";
        assert_eq!(
            normalize_page_text(raw),
            "Article 21. Protection of life and personal liberty\n\nNo person shall be deprived"
        );
    }

    #[test]
    fn test_pages_to_documents_skips_blank_pages() {
        let pages = vec![
            "Preamble".to_string(),
            "   \n ".to_string(),
            "Article 1".to_string(),
        ];
        let docs = pages_to_documents("constitution.pdf", pages);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].source, SourceRef::new("constitution.pdf", 1));
        assert_eq!(docs[1].source, SourceRef::new("constitution.pdf", 3));
        assert_eq!(docs[1].text, "Article 1");
    }

    #[test]
    fn test_is_pdf() {
        assert!(is_pdf(Path::new("data/ipc.PDF")));
        assert!(is_pdf(Path::new("constitution.pdf")));
        assert!(!is_pdf(Path::new("notes.txt")));
        assert!(!is_pdf(Path::new("pdf")));
    }

    #[tokio::test]
    async fn test_missing_directory_is_io_error() {
        let processor = DocumentProcessor::new();
        let result = processor.load_directory(Path::new("/definitely/not/here")).await;
        assert!(matches!(result, Err(LawGuideError::Io(_))));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.pdf"), b"this is not a pdf").unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"ignored").unwrap();

        let processor = DocumentProcessor::new();
        let corpus = processor.load_directory(dir.path()).await.unwrap();

        assert_eq!(corpus.files_found, 1);
        assert_eq!(corpus.skipped.len(), 1);
        assert_eq!(corpus.files_loaded(), 0);
        assert!(corpus.documents.is_empty());
        assert!(corpus.skipped[0].path.ends_with("broken.pdf"));
    }
}
