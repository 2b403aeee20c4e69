// src/classify.rs

use crate::config::{LanguageSpec, ScanConfig};
use crate::model::{FileMetrics, SkipReason, SkippedFile};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Character sets tried when decoding file content. Strict decoders:
/// any invalid sequence rejects the candidate and the next one is tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Charset {
    Utf8,
    Ascii,
    Utf16Le,
    Utf16Be,
    Latin1,
}

impl Charset {
    /// Decode `bytes`, returning None on any invalid sequence.
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            Charset::Utf8 => {
                let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
                std::str::from_utf8(bytes).ok().map(str::to_string)
            }
            Charset::Ascii => {
                if bytes.iter().all(u8::is_ascii) {
                    Some(bytes.iter().map(|&b| b as char).collect())
                } else {
                    None
                }
            }
            Charset::Utf16Le => {
                // An opposite-endian BOM rejects the candidate outright,
                // otherwise BE content decodes as plausible LE garbage.
                if bytes.starts_with(&[0xFE, 0xFF]) {
                    return None;
                }
                let bytes = bytes.strip_prefix(&[0xFF, 0xFE]).unwrap_or(bytes);
                decode_utf16_with(bytes, u16::from_le_bytes)
            }
            Charset::Utf16Be => {
                if bytes.starts_with(&[0xFF, 0xFE]) {
                    return None;
                }
                let bytes = bytes.strip_prefix(&[0xFE, 0xFF]).unwrap_or(bytes);
                decode_utf16_with(bytes, u16::from_be_bytes)
            }
            // Every byte maps to a code point, so this never fails;
            // place it last in a candidate list.
            Charset::Latin1 => Some(bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

fn decode_utf16_with(bytes: &[u8], unpack: fn([u8; 2]) -> u16) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units = bytes.chunks_exact(2).map(|pair| unpack([pair[0], pair[1]]));
    char::decode_utf16(units).collect::<Result<String, _>>().ok()
}

/// How one line of a file was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Code,
    Comment,
    Blank,
}

/// Block-comment tracking state, carried across lines of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineState {
    Code,
    InBlockComment,
}

/// Per-file line counts produced by the state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineCounts {
    pub total: u64,
    pub code: u64,
    pub comment: u64,
    pub blank: u64,
}

/// Classify one file's raw bytes into metrics, or a skip record.
///
/// `path` is the root-relative path recorded in the result. Exclusion
/// globs are applied by the scanner before this point; here we handle
/// content-level skips: empty files, binary data, undecodable text and
/// unregistered languages.
pub fn classify(config: &ScanConfig, path: &Path, bytes: &[u8]) -> Result<FileMetrics, SkippedFile> {
    let skip = |reason| SkippedFile {
        path: path.to_path_buf(),
        reason,
    };

    if bytes.is_empty() {
        return Err(skip(SkipReason::Excluded));
    }
    if looks_binary(bytes) {
        return Err(skip(SkipReason::Encoding));
    }

    let text = decode_text(&config.charsets, bytes).ok_or_else(|| skip(SkipReason::Encoding))?;

    let spec = detect_language(config, path, &text).ok_or_else(|| skip(SkipReason::Excluded))?;
    let counts = count_lines(spec, &text);

    Ok(FileMetrics {
        path: path.to_path_buf(),
        language: spec.tag.clone(),
        total_lines: counts.total,
        code_lines: counts.code,
        comment_lines: counts.comment,
        blank_lines: counts.blank,
        size_bytes: bytes.len() as u64,
    })
}

/// First clean decode among the candidates wins. A UTF-16 BOM commits
/// the file to the UTF-16 candidates: it already bypassed the binary
/// check, so letting it fall through to Latin1 would count every BOM'd
/// blob as mojibake text.
fn decode_text(charsets: &[Charset], bytes: &[u8]) -> Option<String> {
    if bytes.starts_with(&[0xFF, 0xFE]) || bytes.starts_with(&[0xFE, 0xFF]) {
        return charsets
            .iter()
            .filter(|c| matches!(c, Charset::Utf16Le | Charset::Utf16Be))
            .find_map(|charset| charset.decode(bytes));
    }
    charsets.iter().find_map(|charset| charset.decode(bytes))
}

/// NUL byte in the leading chunk marks the file as binary, the same
/// heuristic git uses. UTF-16 files carry NULs legitimately, so a
/// UTF-16 BOM bypasses the check.
fn looks_binary(bytes: &[u8]) -> bool {
    if bytes.starts_with(&[0xFF, 0xFE]) || bytes.starts_with(&[0xFE, 0xFF]) {
        return false;
    }
    let head = &bytes[..bytes.len().min(8000)];
    head.contains(&0)
}

fn detect_language<'a>(
    config: &'a ScanConfig,
    path: &Path,
    text: &str,
) -> Option<&'a LanguageSpec> {
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        if let Some(spec) = config.language_for_extension(&ext.to_lowercase()) {
            return Some(spec);
        }
    }
    let first_line = text.lines().next().unwrap_or("");
    config.language_for_shebang(first_line)
}

/// Split `text` into blank / comment / code line counts.
///
/// A line is comment-only if, after trimming, it starts with a line
/// comment prefix or lies fully within a block comment. Any characters
/// outside comment spans make it a code line. A blank line is empty
/// after trimming and not inside a block comment.
pub fn count_lines(spec: &LanguageSpec, text: &str) -> LineCounts {
    let mut counts = LineCounts::default();
    let mut state = LineState::Code;

    for line in text.lines() {
        counts.total += 1;
        match classify_line(spec, line, &mut state) {
            LineKind::Code => counts.code += 1,
            LineKind::Comment => counts.comment += 1,
            LineKind::Blank => counts.blank += 1,
        }
    }
    counts
}

fn classify_line(spec: &LanguageSpec, line: &str, state: &mut LineState) -> LineKind {
    let mut has_code = false;
    let mut has_comment = *state == LineState::InBlockComment;
    let mut rest = line;

    loop {
        if *state == LineState::InBlockComment {
            let end = spec.block_comment.as_ref().map(|(_, end)| end.as_str());
            match end.and_then(|end| rest.find(end).map(|i| i + end.len())) {
                Some(after) => {
                    rest = &rest[after..];
                    *state = LineState::Code;
                }
                // Unterminated span: the rest of the line is comment.
                None => break,
            }
            continue;
        }

        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }
        // Block start first: a line comment prefix may be a prefix of
        // the block token (lua's "--" vs "--[[").
        if let Some((start, _)) = &spec.block_comment {
            if rest.starts_with(start.as_str()) {
                *state = LineState::InBlockComment;
                has_comment = true;
                rest = &rest[start.len()..];
                continue;
            }
        }
        if spec
            .line_comments
            .iter()
            .any(|prefix| rest.starts_with(prefix.as_str()))
        {
            has_comment = true;
            break;
        }

        let ch = match rest.chars().next() {
            Some(ch) => ch,
            None => break,
        };
        if spec.quotes.contains(&ch) {
            has_code = true;
            match skip_string_literal(rest, ch) {
                Some(after) => rest = &rest[after..],
                // Unterminated on this line; quoting is per-line only.
                None => break,
            }
            continue;
        }
        has_code = true;
        rest = &rest[ch.len_utf8()..];
    }

    if has_code {
        LineKind::Code
    } else if has_comment {
        LineKind::Comment
    } else {
        LineKind::Blank
    }
}

/// Byte offset just past the closing quote, honoring backslash escapes.
fn skip_string_literal(rest: &str, quote: char) -> Option<usize> {
    let mut chars = rest.char_indices().skip(1);
    while let Some((i, ch)) = chars.next() {
        if ch == '\\' {
            chars.next();
        } else if ch == quote {
            return Some(i + ch.len_utf8());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanConfig;
    use std::path::PathBuf;

    fn config() -> ScanConfig {
        ScanConfig::default()
    }

    fn rust_counts(text: &str) -> LineCounts {
        let config = config();
        let spec = config.language_for_extension("rs").unwrap();
        count_lines(spec, text)
    }

    #[test]
    fn hash_comments_and_blanks_in_python() {
        let config = config();
        let spec = config.language_for_extension("py").unwrap();
        let counts = count_lines(spec, "# header\n\nx = 1\n  # indented\n");
        assert_eq!(counts.total, 4);
        assert_eq!(counts.code, 1);
        assert_eq!(counts.comment, 2);
        assert_eq!(counts.blank, 1);
    }

    #[test]
    fn block_comment_spans_lines() {
        let counts = rust_counts("/*\n inside\n\n*/\nfn main() {}\n");
        // The empty line inside the span counts as comment, not blank.
        assert_eq!(counts.comment, 4);
        assert_eq!(counts.code, 1);
        assert_eq!(counts.blank, 0);
    }

    #[test]
    fn code_after_block_comment_end_is_code() {
        let counts = rust_counts("/* a */ let x = 1;\n");
        assert_eq!(counts.code, 1);
        assert_eq!(counts.comment, 0);
    }

    #[test]
    fn comment_tokens_inside_strings_are_ignored() {
        let counts = rust_counts("let s = \"/* not a comment */\";\nlet t = \"// nor this\";\n");
        assert_eq!(counts.code, 2);
        assert_eq!(counts.comment, 0);
    }

    #[test]
    fn unterminated_block_comment_swallows_the_rest() {
        let counts = rust_counts("/* open\nstill comment\nand more\n");
        assert_eq!(counts.comment, 3);
        assert_eq!(counts.code, 0);
    }

    #[test]
    fn lua_block_token_wins_over_its_line_comment_prefix() {
        let config = config();
        let spec = config.language_for_extension("lua").unwrap();
        let counts = count_lines(spec, "--[[ block\nstill ]]\nprint(1) -- tail\n");
        assert_eq!(counts.comment, 2);
        assert_eq!(counts.code, 1);
    }

    #[test]
    fn languages_without_block_comments() {
        let config = config();
        let spec = config.language_for_extension("toml").unwrap();
        let counts = count_lines(spec, "key = \"value # not comment\"\n# real comment\n");
        assert_eq!(counts.code, 1);
        assert_eq!(counts.comment, 1);
    }

    #[test]
    fn classify_maps_extension_to_tag() {
        let metrics = classify(&config(), &PathBuf::from("src/lib.rs"), b"fn f() {}\n").unwrap();
        assert_eq!(metrics.language, "rust");
        assert_eq!(metrics.total_lines, 1);
        assert_eq!(metrics.size_bytes, 10);
    }

    #[test]
    fn classify_uses_shebang_for_extensionless_files() {
        let metrics = classify(
            &config(),
            &PathBuf::from("bin/tool"),
            b"#!/usr/bin/env python3\nprint(1)\n",
        )
        .unwrap();
        assert_eq!(metrics.language, "python");
        assert_eq!(metrics.comment_lines, 1);
        assert_eq!(metrics.code_lines, 1);
    }

    #[test]
    fn binary_and_empty_files_are_skipped() {
        let config = config();
        let binary = classify(&config, &PathBuf::from("a.rs"), b"\x00\x01\x02").unwrap_err();
        assert_eq!(binary.reason, SkipReason::Encoding);
        let empty = classify(&config, &PathBuf::from("a.rs"), b"").unwrap_err();
        assert_eq!(empty.reason, SkipReason::Excluded);
    }

    #[test]
    fn unknown_extension_is_skipped() {
        let skipped = classify(&config(), &PathBuf::from("data.bin2"), b"hello\n").unwrap_err();
        assert_eq!(skipped.reason, SkipReason::Excluded);
    }

    #[test]
    fn utf16le_content_decodes_via_candidate_list() {
        let text = "// c\nfn f() {}\n";
        let mut bytes = vec![0xFF, 0xFE];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let metrics = classify(&config(), &PathBuf::from("a.rs"), &bytes).unwrap();
        assert_eq!(metrics.comment_lines, 1);
        assert_eq!(metrics.code_lines, 1);
    }

    #[test]
    fn utf16_bom_with_invalid_payload_is_an_encoding_skip() {
        // Odd payload length cannot be UTF-16; the BOM must not let it
        // land in the Latin1 catch-all.
        let bytes = [0xFF, 0xFE, 0x41, 0x00, 0x42];
        let skipped = classify(&config(), &PathBuf::from("a.rs"), &bytes).unwrap_err();
        assert_eq!(skipped.reason, SkipReason::Encoding);

        let unpaired_surrogate = [0xFE, 0xFF, 0xD8, 0x00];
        let skipped =
            classify(&config(), &PathBuf::from("a.rs"), &unpaired_surrogate).unwrap_err();
        assert_eq!(skipped.reason, SkipReason::Encoding);
    }

    #[test]
    fn strict_decoders_reject_invalid_sequences() {
        assert!(Charset::Utf8.decode(&[0xC3, 0x28]).is_none());
        assert!(Charset::Ascii.decode(&[0x80]).is_none());
        assert!(Charset::Utf16Le.decode(&[0x00]).is_none());
        assert_eq!(Charset::Latin1.decode(&[0xE9]).unwrap(), "é");
    }
}
