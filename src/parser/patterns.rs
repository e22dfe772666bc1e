//! Constants and compiled patterns used by the chapter-segmentation
//! cascade in [`crate::parser`]. Ported from the header-detection
//! heuristics of the original ingester, which targets Chinese-language
//! books with occasional English chapter markers.
use std::sync::LazyLock;

use regex::Regex;

pub(super) const ZERO_WIDTH_CHARS: &[char] = &[
    '\u{feff}', '\u{200b}', '\u{200c}', '\u{200d}', '\u{202a}', '\u{202b}', '\u{202c}', '\u{202d}',
    '\u{202e}',
];

pub(super) const CHINESE_NUMERAL: &str = "〇零一二三四五六七八九十百千万";
pub(super) const ROMAN_NUMERAL: &str = "IVXLCDM";
pub(super) const CHAPTER_KEYWORDS: &str = "章节回卷篇部";
pub(super) const HEADER_KEYWORDS: &[&str] =
    &["序", "前言", "自序", "引言", "后记", "跋", "序言", "代序", "代后记"];
pub(super) const PARAGRAPH_BREAK_MARKERS: &[&str] =
    &["——", "***", "＊＊＊", "~~~", "=== ", "---"];

pub(super) const MAX_TITLE_LENGTH: usize = 512;
pub(super) const TARGET_CHUNK_SIZE: usize = 2200;
pub(super) const MIN_CHUNK_SIZE: usize = 800;
pub(super) const MAX_CHUNK_SIZE: usize = 3600;

pub(super) static MULTI_BLANK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n\s*\n+").unwrap());

pub(super) static CHAPTER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(&format!(
            r"^\s*(第[\s]*[{n}0-9]+[\s]*[{k}](?:\s+[{n}0-9]+)?)\s*[：:,，、\s．.\-—]*([^\n]*)$",
            n = CHINESE_NUMERAL,
            k = CHAPTER_KEYWORDS,
        ))
        .unwrap(),
        Regex::new(&format!(
            r"^\s*([{k}][\s]*[{n}0-9]+)\s*[：:,，、\s．.\-—]*([^\n]*)$",
            n = CHINESE_NUMERAL,
            k = CHAPTER_KEYWORDS,
        ))
        .unwrap(),
        Regex::new(r"^\s*((?:CHAPTER|Chapter|chapter)\s+[0-9IVXLCDM]+)\s*[：:,，、\s．.\-—]*([^\n]*)$")
            .unwrap(),
        Regex::new(&format!(
            r"^\s*([（(][\s]*[{n}0-9{r}]+[\s]*[)）])\s*[：:,，、\s．.\-—]*([^\n]*)$",
            n = CHINESE_NUMERAL,
            r = ROMAN_NUMERAL,
        ))
        .unwrap(),
    ]
});

pub(super) static SIMPLE_HEADER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^(?:第)?[{n}0-9{r}]+(?:[{k}])?$",
        n = CHINESE_NUMERAL,
        r = ROMAN_NUMERAL,
        k = CHAPTER_KEYWORDS,
    ))
    .unwrap()
});

pub(super) static ROMAN_NUMERAL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)^[{r}]+$", r = ROMAN_NUMERAL)).unwrap());
