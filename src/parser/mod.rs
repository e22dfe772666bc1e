//! Splits a raw book text file into titled chapters.
//!
//! [`BookParser::parse`] runs a cascade of four segmentation strategies
//! in order — pattern-matched chapter headers, then bare numeral
//! headers, then paragraph-break markers, then fixed-size chunking —
//! and keeps the first one that yields at least two sections. Every
//! real book hits one of the first three; the fourth exists so that
//! even an unstructured wall of text still gets imported as evenly
//! sized, independently narratable chunks instead of being rejected.
mod patterns;
mod strategies;

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{BookError, BookResult};
use crate::models::{BookMetadata, Chapter, Section};

use patterns::{CHAPTER_KEYWORDS, CHAPTER_PATTERNS, CHINESE_NUMERAL, MAX_TITLE_LENGTH, ROMAN_NUMERAL_PATTERN, ZERO_WIDTH_CHARS};

/// Parses a single book source file into ordered, titled chapters.
pub struct BookParser {
    path: PathBuf,
}

impl BookParser {
    pub fn new<P: Into<PathBuf>>(path: P) -> BookResult<Self> {
        let path = path.into();
        if !path.exists() {
            return Err(BookError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                path.display().to_string(),
            )));
        }
        Ok(Self { path })
    }

    /// Parse the file into chapter metadata. Fails if no segmentation
    /// strategy — including the unconditional auto-chunk fallback —
    /// produces any sections, which only happens for an empty file.
    pub fn parse(&self) -> BookResult<BookMetadata> {
        let raw_text = self.read_file()?;
        let (header_title, header_author) = self.extract_header(&raw_text);
        let sections = self.locate_sections(&raw_text);
        if sections.is_empty() {
            return Err(BookError::parse(self.path.display().to_string()));
        }

        let mut chapters = Vec::with_capacity(sections.len());
        for (idx, section) in sections.iter().enumerate() {
            let content = clean_text(&raw_text[section.start..section.end]);
            if content.is_empty() {
                continue;
            }
            chapters.push(Chapter {
                index: idx + 1,
                title: sanitize_title(&section.title),
                content,
            });
        }

        let title = header_title.unwrap_or_else(|| {
            self.path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.path.display().to_string())
        });

        Ok(BookMetadata {
            title,
            author: header_author,
            chapters,
        })
    }

    fn locate_sections(&self, text: &str) -> Vec<Section> {
        let sections = strategies::sections_from_matches(text);
        if !sections.is_empty() {
            return sections;
        }

        let sections = strategies::sections_from_simple_headers(text);
        if !sections.is_empty() {
            tracing::info!(path = %self.path.display(), "using simple header fallback");
            return sections;
        }

        let sections = strategies::sections_from_paragraph_breaks(text);
        if !sections.is_empty() {
            tracing::info!(path = %self.path.display(), "using paragraph break fallback");
            return sections;
        }

        let sections = strategies::sections_from_auto_chunks(text);
        if !sections.is_empty() {
            tracing::info!(path = %self.path.display(), "using auto chunk fallback");
        }
        sections
    }

    fn read_file(&self) -> BookResult<String> {
        let bytes = std::fs::read(&self.path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn extract_header(&self, text: &str) -> (Option<String>, Option<String>) {
        let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        let title = lines.first().map(|s| s.to_string()).or_else(|| {
            self.path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
        });
        let mut author = None;
        if lines.len() > 1 {
            let author_line = lines[1];
            if author_line.contains('著') || author_line.contains("作者") {
                author = Some(author_line.to_string());
            }
        }
        (title, author)
    }
}

/// Normalize a candidate header line into a title, or return `None` if
/// the line does not look like a chapter header at all.
pub(super) fn normalize_header_line(line: &str) -> Option<String> {
    let stripped = line.trim();
    if stripped.is_empty() || stripped.chars().count() > 40 {
        return None;
    }
    let candidate = stripped.trim_end_matches(['：', ':', '、', '．', '.', '(', ')', '（', '）', '-', '—', '*', '~', '　']);
    if candidate.is_empty() {
        return None;
    }
    let no_spaces: String = candidate.chars().filter(|c| *c != ' ').collect();

    if patterns::HEADER_KEYWORDS
        .iter()
        .any(|kw| candidate.starts_with(*kw))
    {
        return Some(candidate.to_string());
    }

    let lower = candidate.to_lowercase();
    if lower.starts_with("chapter") {
        return Some(title_case(candidate));
    }

    let tokens: Vec<&str> = candidate.split_whitespace().collect();

    if candidate.starts_with('第') && CHAPTER_KEYWORDS.chars().any(|k| candidate.contains(k)) {
        if tokens.len() > 1 && looks_like_numeric_token(tokens[tokens.len() - 1]) {
            return Some(format!("{} · {}", tokens[0], tokens[tokens.len() - 1]));
        }
        return Some(tokens.first().copied().unwrap_or(candidate).to_string());
    }

    if tokens.len() == 1 && looks_like_numeric_token(tokens[0]) {
        return Some(tokens[0].to_string());
    }

    if tokens.len() == 2
        && CHAPTER_KEYWORDS.chars().any(|k| tokens[0].contains(k))
        && looks_like_numeric_token(tokens[1])
    {
        return Some(format!("{} · {}", tokens[0], tokens[1]));
    }

    if looks_like_numeric_token(&no_spaces) && no_spaces.chars().count() <= 6 {
        return Some(no_spaces);
    }

    for pattern in CHAPTER_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(candidate) {
            let groups: Vec<&str> = caps
                .iter()
                .skip(1)
                .filter_map(|g| g)
                .map(|g| g.as_str())
                .filter(|s| !s.is_empty())
                .collect();
            return Some(groups.join(" ").trim().to_string());
        }
    }

    None
}

fn looks_like_numeric_token(token: &str) -> bool {
    let stripped = token.trim_matches(['(', ')', '（', '）', '．', '.', '、', '，', '：', ':', '—', '-']);
    if stripped.is_empty() {
        return false;
    }
    if stripped.chars().all(|c| CHINESE_NUMERAL.contains(c)) {
        return true;
    }
    if stripped.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    ROMAN_NUMERAL_PATTERN.is_match(stripped)
}

/// Rust analogue of Python's `str.title()`: uppercase the first letter
/// of every whitespace-delimited word, lowercase the rest.
fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn sanitize_title(title: &str) -> String {
    let trimmed = title.trim();
    if trimmed.chars().count() > MAX_TITLE_LENGTH {
        warn!(
            length = trimmed.chars().count(),
            limit = MAX_TITLE_LENGTH,
            "chapter title too long, truncating"
        );
        return trimmed.chars().take(MAX_TITLE_LENGTH).collect();
    }
    trimmed.to_string()
}

fn clean_text(text: &str) -> String {
    let mut cleaned = text.replace('\r', "");
    for ch in ZERO_WIDTH_CHARS {
        cleaned = cleaned.replace(*ch, "");
    }
    let collapsed = collapse_inline_whitespace(&cleaned);
    collapsed
        .split('\n')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collapse runs of spaces/tabs into a single space, leaving newlines
/// untouched — the Rust equivalent of `re.sub(r"[ \t]+", " ", text)`.
fn collapse_inline_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for ch in text.chars() {
        if ch == ' ' || ch == '\t' {
            if !in_run {
                out.push(' ');
                in_run = true;
            }
        } else {
            in_run = false;
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parses_numbered_chinese_chapters() {
        let content = "我的书\n作者著\n\n第一章 开始\n这是第一章的内容。\n\n第二章 继续\n这是第二章的内容。\n";
        let f = write_temp(content);
        let parser = BookParser::new(f.path()).unwrap();
        let meta = parser.parse().unwrap();
        assert_eq!(meta.chapters.len(), 2);
        assert_eq!(meta.chapters[0].title, "第一章");
        assert_eq!(meta.chapters[1].title, "第二章");
    }

    #[test]
    fn falls_back_to_paragraph_breaks_when_no_headers_found() {
        let long_para = "字".repeat(900);
        let content = format!("{long_para}\n\n\n***\n\n\n{long_para}");
        let f = write_temp(&content);
        let parser = BookParser::new(f.path()).unwrap();
        let meta = parser.parse().unwrap();
        assert_eq!(meta.chapters.len(), 2);
        assert!(meta.chapters[0].title.starts_with("段落分段"));
    }

    #[test]
    fn falls_back_to_auto_chunks_for_unstructured_text() {
        let content = "字".repeat(9000);
        let f = write_temp(&content);
        let parser = BookParser::new(f.path()).unwrap();
        let meta = parser.parse().unwrap();
        assert!(meta.chapters.len() >= 2);
        assert!(meta.chapters[0].title.starts_with("自动分段"));
    }

    #[test]
    fn rejects_missing_file() {
        assert!(BookParser::new("/no/such/file.txt").is_err());
    }

    #[test]
    fn detects_author_line_with_zhu_marker() {
        let content = "三体\n刘慈欣著\n\n第一章 地球往事\n内容。\n\n第二章 三体问题\n内容。\n";
        let f = write_temp(content);
        let meta = BookParser::new(f.path()).unwrap().parse().unwrap();
        assert_eq!(meta.author.as_deref(), Some("刘慈欣著"));
    }

    #[test]
    fn strips_zero_width_characters_from_content() {
        let content = "第一章 甲\n带\u{feff}零宽\u{200b}字符的内容。\n\n第二章 乙\n正常内容。\n";
        let f = write_temp(content);
        let meta = BookParser::new(f.path()).unwrap().parse().unwrap();
        assert!(!meta.chapters[0].content.contains('\u{feff}'));
        assert!(!meta.chapters[0].content.contains('\u{200b}'));
    }
}
