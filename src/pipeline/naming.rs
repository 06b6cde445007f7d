//! Output naming: `(source key, page number)` → output key.
//!
//! The output key is `{base}-{page}.jpg`, where `base` is the final path
//! segment of the source key with one trailing `.pdf` removed and `page` is
//! zero-padded to a width fixed per document: three digits, or the digit
//! count of the page total when that is larger. Every key of one document
//! therefore has the same length and keys sort lexically in page order;
//! a 1500-page document runs `report-0001.jpg` … `report-1500.jpg`.

/// Extension stripped from source file names (matched case-insensitively).
pub const SOURCE_EXTENSION: &str = ".pdf";

/// Extension appended to every output key.
pub const OUTPUT_EXTENSION: &str = ".jpg";

/// Minimum number of digits in the page number.
pub const PAGE_NUMBER_WIDTH: usize = 3;

/// Derive the output key for page `page_num` (1-indexed) of `source_key`,
/// using the minimum page-number width.
///
/// Identical to [`derive_page_key`] for any document of up to 999 pages.
///
/// ```rust
/// use pdfsplit::derive_output_key;
///
/// assert_eq!(derive_output_key("reports/report.pdf.pdf", 1), "report.pdf-001.jpg");
/// assert_eq!(derive_output_key("scan.pdf", 42), "scan-042.jpg");
/// ```
pub fn derive_output_key(source_key: &str, page_num: usize) -> String {
    derive_page_key(source_key, page_num, 0)
}

/// Derive the output key for page `page_num` of a `total_pages`-page document.
///
/// ```rust
/// use pdfsplit::derive_page_key;
///
/// assert_eq!(derive_page_key("scan.pdf", 7, 40), "scan-007.jpg");
/// assert_eq!(derive_page_key("scan.pdf", 7, 1500), "scan-0007.jpg");
/// ```
pub fn derive_page_key(source_key: &str, page_num: usize, total_pages: usize) -> String {
    debug_assert!(page_num >= 1, "page numbers are 1-indexed");
    let file_name = source_key.rsplit('/').next().unwrap_or(source_key);
    let base = strip_source_extension(file_name);
    let width = page_number_width(total_pages.max(page_num));
    format!("{base}-{page_num:0width$}{OUTPUT_EXTENSION}")
}

/// Digits used for page numbers in a document of `total_pages` pages.
pub fn page_number_width(total_pages: usize) -> usize {
    let mut digits = 1;
    let mut n = total_pages;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    digits.max(PAGE_NUMBER_WIDTH)
}

/// Remove one trailing [`SOURCE_EXTENSION`], leaving earlier occurrences alone.
fn strip_source_extension(file_name: &str) -> &str {
    let cut = match file_name.len().checked_sub(SOURCE_EXTENSION.len()) {
        Some(cut) if cut > 0 && file_name.is_char_boundary(cut) => cut,
        _ => return file_name,
    };
    if file_name[cut..].eq_ignore_ascii_case(SOURCE_EXTENSION) {
        &file_name[..cut]
    } else {
        file_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn replaces_only_trailing_extension() {
        assert_eq!(
            derive_output_key("reports/report.pdf.pdf", 1),
            "report.pdf-001.jpg"
        );
        assert_eq!(derive_output_key("my.pdf.notes.pdf", 2), "my.pdf.notes-002.jpg");
    }

    #[test]
    fn uses_final_path_segment() {
        assert_eq!(derive_output_key("a/b/c/invoice.pdf", 7), "invoice-007.jpg");
        assert_eq!(derive_output_key("invoice.pdf", 7), "invoice-007.jpg");
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        assert_eq!(derive_output_key("SCAN.PDF", 1), "SCAN-001.jpg");
        assert_eq!(derive_output_key("Scan.Pdf", 1), "Scan-001.jpg");
    }

    #[test]
    fn keeps_names_without_extension() {
        assert_eq!(derive_output_key("archive/blob", 1), "blob-001.jpg");
        assert_eq!(derive_output_key("notes.pdfx", 1), "notes.pdfx-001.jpg");
        assert_eq!(derive_output_key(".pdf", 1), ".pdf-001.jpg");
    }

    #[test]
    fn width_follows_page_total() {
        assert_eq!(page_number_width(0), 3);
        assert_eq!(page_number_width(999), 3);
        assert_eq!(page_number_width(1000), 4);
        assert_eq!(page_number_width(1500), 4);
        assert_eq!(page_number_width(100_000), 6);
    }

    #[test]
    fn large_documents_share_one_width() {
        assert_eq!(derive_page_key("d.pdf", 1, 1500), "d-0001.jpg");
        assert_eq!(derive_page_key("d.pdf", 999, 1500), "d-0999.jpg");
        assert_eq!(derive_page_key("d.pdf", 1500, 1500), "d-1500.jpg");

        let keys: Vec<String> = (1..=1500).map(|p| derive_page_key("d.pdf", p, 1500)).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted, "keys must sort lexically in page order");
        assert!(keys.iter().all(|k| k.len() == "d-0001.jpg".len()));
    }

    #[test]
    fn small_documents_keep_three_digits() {
        assert_eq!(derive_page_key("r.pdf", 5, 12), "r-005.jpg");
        assert_eq!(derive_page_key("r.pdf", 5, 12), derive_output_key("r.pdf", 5));
    }

    #[test]
    fn pads_to_three_digits_then_grows() {
        assert_eq!(derive_output_key("d.pdf", 9), "d-009.jpg");
        assert_eq!(derive_output_key("d.pdf", 10), "d-010.jpg");
        assert_eq!(derive_output_key("d.pdf", 999), "d-999.jpg");
        assert_eq!(derive_output_key("d.pdf", 1000), "d-1000.jpg");
        assert_eq!(derive_output_key("d.pdf", 12345), "d-12345.jpg");
    }

    #[test]
    fn injective_over_page_numbers() {
        let keys: HashSet<String> = (1..=2500)
            .map(|p| derive_output_key("reports/big.pdf", p))
            .collect();
        assert_eq!(keys.len(), 2500);
    }

    #[test]
    fn deterministic() {
        assert_eq!(
            derive_output_key("x/y.pdf", 3),
            derive_output_key("x/y.pdf", 3)
        );
    }

    #[test]
    fn multibyte_names_do_not_panic() {
        assert_eq!(derive_output_key("résumé.pdf", 1), "résumé-001.jpg");
        assert_eq!(derive_output_key("日本語", 1), "日本語-001.jpg");
    }
}
