//! Integration-level coverage of the chapter segmentation cascade
//! across a broader set of fixtures than the in-module unit tests.
use std::io::Write;

use bookcast::parser::BookParser;
use rstest::rstest;

fn temp_book(content: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(content.as_bytes()).unwrap();
    f
}

#[rstest]
#[case::chinese_numeral_chapters(
    "标题\n\n第一章 出发\n正文甲。\n\n第二章 归来\n正文乙。\n",
    2
)]
#[case::digit_chapters(
    "标题\n\n第1章 出发\n正文甲。\n\n第2章 归来\n正文乙。\n",
    2
)]
#[case::english_chapter_markers(
    "Title\n\nChapter 1\nSome body text here.\n\nChapter 2\nMore body text here.\n",
    2
)]
#[case::parenthesized_numerals(
    "标题\n\n（一）楔子\n正文甲。\n\n（二）尾声\n正文乙。\n",
    2
)]
fn parses_expected_chapter_count(#[case] content: &str, #[case] expected_chapters: usize) {
    let f = temp_book(content);
    let meta = BookParser::new(f.path()).unwrap().parse().unwrap();
    assert_eq!(meta.chapters.len(), expected_chapters);
}

#[test]
fn simple_bare_numeral_headers_are_detected_when_isolated() {
    let content = "标题\n\n一\n第一部分的内容，写得比较长一些。\n\n二\n第二部分的内容，也写得比较长一些。\n";
    let f = temp_book(content);
    let meta = BookParser::new(f.path()).unwrap().parse().unwrap();
    assert!(meta.chapters.len() >= 2);
}

#[test]
fn empty_file_produces_a_parse_error() {
    let f = temp_book("");
    let err = BookParser::new(f.path()).unwrap().parse().unwrap_err();
    assert!(matches!(err, bookcast::error::BookError::Parse { .. }));
}

#[test]
fn chapter_content_excludes_blank_lines_after_cleaning() {
    let content = "标题\n\n第一章 开始\n第一行。\n\n\n第二行。\n\n第二章 结束\n内容。\n";
    let f = temp_book(content);
    let meta = BookParser::new(f.path()).unwrap().parse().unwrap();
    assert!(!meta.chapters[0].content.contains("\n\n"));
}
