pub mod excel_read;
pub mod excel_write;
pub mod pdf;

/// Content type of the stacked workbook.
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
/// Content type of the merged page document.
pub const PDF_MIME: &str = "application/pdf";

const DEFAULT_PDF_STEM: &str = "merged_document";

/// Download name for a stacked workbook: `report.xlsx` becomes
/// `report__stacked.xlsx`.
pub fn stacked_file_name(input_name: &str) -> String {
    let stem = match input_name.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => input_name,
    };
    format!("{stem}__stacked.xlsx")
}

/// Output name for a merged PDF. Blank names fall back to `merged_document`
/// and `.pdf` is appended unless already present.
pub fn pdf_file_name(requested: &str) -> String {
    let name = requested.trim();
    let name = if name.is_empty() { DEFAULT_PDF_STEM } else { name };
    if name.to_lowercase().ends_with(".pdf") {
        name.to_string()
    } else {
        format!("{name}.pdf")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stacked_name_replaces_last_extension_only() {
        assert_eq!(stacked_file_name("report.xlsx"), "report__stacked.xlsx");
        assert_eq!(stacked_file_name("q1.final.xlsx"), "q1.final__stacked.xlsx");
        assert_eq!(stacked_file_name("plain"), "plain__stacked.xlsx");
    }

    #[test]
    fn pdf_name_gets_default_and_extension() {
        assert_eq!(pdf_file_name("  "), "merged_document.pdf");
        assert_eq!(pdf_file_name("handout"), "handout.pdf");
        assert_eq!(pdf_file_name("Handout.PDF"), "Handout.PDF");
        assert_eq!(pdf_file_name(" minutes "), "minutes.pdf");
    }
}
