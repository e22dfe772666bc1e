//! The four-strategy section-location cascade: pattern-matched chapter
//! headers, then simple bare-numeral headers, then paragraph-break
//! markers, then fixed-size auto-chunking. Each strategy is tried in
//! order by [`super::BookParser::locate_sections`] and the first one to
//! produce at least two sections wins.
use std::collections::BTreeMap;

use crate::models::Section;

use super::patterns::{
    CHAPTER_PATTERNS, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE, MULTI_BLANK_PATTERN, PARAGRAPH_BREAK_MARKERS,
    SIMPLE_HEADER_PATTERN, TARGET_CHUNK_SIZE,
};
use super::{looks_like_numeric_token, normalize_header_line};

/// Walk `text` into `(start, end)` byte ranges, one per line, with the
/// trailing `\n` (if any) included in the range — mirroring Python's
/// `str.splitlines(keepends=True)` closely enough for header detection,
/// which only inspects trimmed line content.
pub(super) fn iter_line_offsets(text: &str) -> Vec<(usize, usize)> {
    let mut offsets = Vec::new();
    let mut start = 0;
    let bytes = text.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'\n' {
            offsets.push((start, i + 1));
            start = i + 1;
        }
    }
    if start < text.len() {
        offsets.push((start, text.len()));
    }
    offsets
}

/// Round a byte index down to the nearest character boundary.
fn floor_boundary(text: &str, mut idx: usize) -> usize {
    idx = idx.min(text.len());
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn finalize_sections(mut sections: Vec<Section>, text_len: usize) -> Vec<Section> {
    if sections.is_empty() {
        return sections;
    }
    let starts: Vec<usize> = sections.iter().map(|s| s.start).collect();
    let len = sections.len();
    for idx in 0..len {
        sections[idx].end = if idx + 1 < len { starts[idx + 1] } else { text_len };
    }
    sections
}

pub(super) fn sections_from_matches(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    for (start, end) in iter_line_offsets(text) {
        let line = &text[start..end];
        let Some(title) = normalize_header_line(line) else {
            continue;
        };
        sections.push(Section {
            title,
            start: end,
            end: 0,
        });
    }
    if sections.len() < 2 {
        return Vec::new();
    }
    finalize_sections(sections, text.len())
}

pub(super) fn sections_from_simple_headers(text: &str) -> Vec<Section> {
    let offsets = iter_line_offsets(text);
    let lines: Vec<&str> = offsets.iter().map(|&(s, e)| &text[s..e]).collect();
    let mut headers = Vec::new();

    for (idx, &(start, end)) in offsets.iter().enumerate() {
        let line = lines[idx];
        let stripped = line.trim();
        if stripped.is_empty() {
            continue;
        }
        let candidate = stripped.trim_end_matches(['：', ':', '、', '．', '.', '(', ')', '（', '）', '-', '—', '*', '~', '　']);
        if candidate.chars().count() > 12 {
            continue;
        }
        if SIMPLE_HEADER_PATTERN.is_match(candidate) {
            let prev_blank = idx > 0 && lines[idx - 1].trim().is_empty();
            let next_blank = idx + 1 < lines.len() && lines[idx + 1].trim().is_empty();
            if !(prev_blank || next_blank) {
                continue;
            }
            headers.push(Section {
                title: stripped.to_string(),
                start: end,
                end: 0,
            });
        } else if super::patterns::HEADER_KEYWORDS
            .iter()
            .any(|kw| stripped.contains(*kw))
        {
            headers.push(Section {
                title: stripped.to_string(),
                start: end,
                end: 0,
            });
        }
    }

    if headers.len() < 2 {
        return Vec::new();
    }
    finalize_sections(headers, text.len())
}

pub(super) fn sections_from_paragraph_breaks(text: &str) -> Vec<Section> {
    let mut break_positions: BTreeMap<usize, usize> = BTreeMap::new();
    for m in MULTI_BLANK_PATTERN.find_iter(text) {
        break_positions.insert(m.start(), m.end());
    }

    for (start, end) in iter_line_offsets(text) {
        let line = &text[start..end];
        let stripped = line.trim();
        if stripped.is_empty() {
            continue;
        }
        if PARAGRAPH_BREAK_MARKERS.iter().any(|m| stripped.contains(*m)) {
            break_positions.insert(start, end);
        }
    }

    if break_positions.is_empty() {
        return Vec::new();
    }

    let mut sections = Vec::new();
    let mut last = 0usize;
    let mut idx = 1u32;
    for (&split_start, &split_end) in &break_positions {
        if split_start < last || split_start - last < MIN_CHUNK_SIZE {
            continue;
        }
        sections.push(Section {
            title: format!("段落分段 {idx:03}"),
            start: last,
            end: split_start,
        });
        idx += 1;
        last = split_end;
    }

    if text.len() - last >= MIN_CHUNK_SIZE {
        sections.push(Section {
            title: format!("段落分段 {idx:03}"),
            start: last,
            end: text.len(),
        });
    }

    if sections.len() < 2 {
        return Vec::new();
    }
    sections
}

pub(super) fn sections_from_auto_chunks(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let length = text.len();
    let mut start = 0usize;
    let mut chunk_index = 1u32;
    while start < length {
        let tentative_end = (start + MAX_CHUNK_SIZE).min(length);
        let split_point = find_split_point(text, start, tentative_end);
        sections.push(Section {
            title: format!("自动分段 {chunk_index:03}"),
            start,
            end: split_point,
        });
        chunk_index += 1;
        start = split_point;
        while start < length && text[start..].starts_with(char::is_whitespace) {
            let next = text[start..].chars().next().map(|c| c.len_utf8()).unwrap_or(1);
            start += next;
        }
    }
    sections
}

fn find_split_point(text: &str, start: usize, max_end: usize) -> usize {
    let length = text.len();
    let search_end = floor_boundary(text, max_end.min(length));
    let preferred = floor_boundary(text, (start + TARGET_CHUNK_SIZE).min(length));
    let min_pos = (start + MIN_CHUNK_SIZE).min(length);
    if min_pos >= search_end {
        return search_end;
    }
    if preferred >= search_end {
        return search_end;
    }

    let window = &text[preferred..search_end];
    let mut split = window.rfind("\n\n").map(|p| preferred + p);
    if split.is_none_or(|p| p <= start) {
        split = None;
        for delimiter in ["。", "！", "？", "；", ".", "!", "?"] {
            if let Some(pos) = window.rfind(delimiter) {
                split = Some(preferred + pos + delimiter.len());
                break;
            }
        }
    }
    match split {
        Some(p) if p > start => p,
        _ => search_end,
    }
}
