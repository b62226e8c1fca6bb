use super::*;
use tempfile::TempDir;

#[test]
fn discovery_finds_pdfs_recursively_and_sorted() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let nested = temp_dir.path().join("substation");
    std::fs::create_dir_all(&nested).expect("should create nested dir");

    std::fs::write(temp_dir.path().join("b-grounding.pdf"), b"x").expect("write");
    std::fs::write(temp_dir.path().join("a-climbing.PDF"), b"x").expect("write");
    std::fs::write(nested.join("switching.pdf"), b"x").expect("write");
    std::fs::write(temp_dir.path().join("notes.txt"), b"x").expect("write");

    let paths = discover_pdfs(temp_dir.path()).expect("discovery should succeed");

    assert_eq!(paths.len(), 3);
    assert!(paths.windows(2).all(|w| w[0] <= w[1]));
    assert!(
        paths
            .iter()
            .all(|p| p.extension().is_some_and(|e| e.eq_ignore_ascii_case("pdf")))
    );
}

#[test]
fn discovery_of_missing_directory_fails() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let missing = temp_dir.path().join("no-such-dir");

    let result = discover_pdfs(&missing);
    assert!(matches!(result, Err(SopError::Document(_))));
}

#[test]
fn unreadable_pdf_reports_document_error() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("missing.pdf");

    let result = load_document(&path);
    assert!(matches!(result, Err(SopError::Document(_))));
}

#[test]
fn single_page_text_without_form_feeds() {
    let pages = split_pages("Wear insulated gloves before touching energized lines. POP 4.2.\n");

    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].page_number, 1);
    assert!(pages[0].text.contains("insulated gloves"));
}

#[test]
fn form_feeds_separate_pages_and_blank_pages_are_dropped() {
    let pages = split_pages("page one text\x0C\x0Cpage three text\x0C   ");

    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].page_number, 1);
    assert_eq!(pages[0].text, "page one text");
    assert_eq!(pages[1].page_number, 3);
    assert_eq!(pages[1].text, "page three text");
}

#[test]
fn empty_extraction_yields_no_pages() {
    assert!(split_pages("   \n ").is_empty());
}

#[test]
fn file_name_uses_the_final_component() {
    let document = Document {
        path: std::path::PathBuf::from("data/nested/live-line-work.pdf"),
        pages: Vec::new(),
    };

    assert_eq!(document.file_name(), "live-line-work.pdf");
    assert_eq!(document.page_count(), 0);
}
