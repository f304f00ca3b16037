use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

use crate::error::ExtractionError;

const PAGE_PREFIX: &str = "page";

/// Renders every page of a PDF to PNG bytes with poppler's `pdftoppm`.
///
/// The document is staged in a private temporary directory that is removed
/// when rasterization returns, on success and on every error path.
pub struct PdfRasterizer {
    dpi: u32,
}

impl PdfRasterizer {
    pub fn new(dpi: u32) -> Self {
        Self { dpi }
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    /// Returns one PNG per page, in page order.
    pub fn rasterize(&self, pdf_bytes: &[u8]) -> Result<Vec<Vec<u8>>, ExtractionError> {
        let _span = tracing::info_span!("extract.rasterize", dpi = self.dpi).entered();

        let workdir = tempfile::Builder::new()
            .prefix("gradeflow_")
            .tempdir()
            .map_err(ExtractionError::TempStorage)?;
        let pdf_path = workdir.path().join("document.pdf");
        std::fs::write(&pdf_path, pdf_bytes).map_err(ExtractionError::TempStorage)?;

        let page_count = match lopdf::Document::load_mem(pdf_bytes) {
            Ok(doc) => doc.get_pages().len(),
            Err(e) => {
                tracing::warn!("lopdf failed to parse document: {}. Asking pdfinfo.", e);
                count_pages_with_pdfinfo(&pdf_path)?
            }
        };

        if page_count == 0 {
            return Err(ExtractionError::NoPages);
        }

        render_pages(&workdir, &pdf_path, self.dpi, page_count)
    }
}

/// Get the page count of a PDF using pdfinfo (poppler-utils).
/// Used as fallback when lopdf can't parse the PDF structure.
fn count_pages_with_pdfinfo(pdf_path: &Path) -> Result<usize, ExtractionError> {
    let output = Command::new("pdfinfo").arg(pdf_path).output().map_err(|e| {
        ExtractionError::Rasterize(format!(
            "Failed to run pdfinfo: {}. Make sure poppler-utils is installed.",
            e
        ))
    })?;

    if !output.status.success() {
        return Err(ExtractionError::Rasterize(format!(
            "pdfinfo failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    parse_pdfinfo_pages(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
        ExtractionError::Rasterize("pdfinfo did not report a page count".to_string())
    })
}

fn parse_pdfinfo_pages(stdout: &str) -> Option<usize> {
    stdout.lines().find_map(|line| {
        line.strip_prefix("Pages:")
            .and_then(|count| count.trim().parse::<usize>().ok())
    })
}

fn render_pages(
    workdir: &TempDir,
    pdf_path: &Path,
    dpi: u32,
    page_count: usize,
) -> Result<Vec<Vec<u8>>, ExtractionError> {
    let output_prefix = workdir.path().join(PAGE_PREFIX);

    let output = Command::new("pdftoppm")
        .arg("-png")
        .arg("-r")
        .arg(dpi.to_string())
        .arg(pdf_path)
        .arg(&output_prefix)
        .output()
        .map_err(|e| {
            ExtractionError::Rasterize(format!(
                "Failed to run pdftoppm: {}. Make sure poppler-utils is installed.",
                e
            ))
        })?;

    if !output.status.success() {
        return Err(ExtractionError::Rasterize(format!(
            "pdftoppm failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let entries = std::fs::read_dir(workdir.path()).map_err(ExtractionError::TempStorage)?;
    let mut pages: Vec<(usize, std::path::PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name();
            page_number(&name.to_string_lossy()).map(|n| (n, entry.path()))
        })
        .collect();
    pages.sort_by_key(|(n, _)| *n);

    if pages.len() != page_count {
        return Err(ExtractionError::Rasterize(format!(
            "Expected {} rendered pages, found {}",
            page_count,
            pages.len()
        )));
    }

    pages
        .into_iter()
        .map(|(_, path)| std::fs::read(&path).map_err(ExtractionError::TempStorage))
        .collect()
}

/// pdftoppm names pages `page-1.png`, `page-01.png` or `page-001.png`
/// depending on the document's page count.
fn page_number(file_name: &str) -> Option<usize> {
    file_name
        .strip_prefix(PAGE_PREFIX)?
        .strip_prefix('-')?
        .strip_suffix(".png")?
        .parse()
        .ok()
}
