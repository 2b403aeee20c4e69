// src/config.rs

use crate::classify::Charset;
use glob::Pattern;
use std::collections::HashMap;
use std::time::Duration;

/// Comment and quoting rules for one language.
///
/// The quote list is a best-effort heuristic: comment tokens inside a
/// registered quote character are ignored, but this is not a full
/// string-literal parser (no raw strings, no triple quotes).
#[derive(Debug, Clone)]
pub struct LanguageSpec {
    /// Classification label, e.g. "rust" or "python".
    pub tag: String,
    /// Single-line comment prefixes, matched after trimming.
    pub line_comments: Vec<String>,
    /// Block comment start/end tokens, if the language has them.
    pub block_comment: Option<(String, String)>,
    /// Quote characters that open a string literal.
    pub quotes: Vec<char>,
}

impl LanguageSpec {
    pub fn new(
        tag: &str,
        line_comments: &[&str],
        block_comment: Option<(&str, &str)>,
        quotes: &[char],
    ) -> Self {
        LanguageSpec {
            tag: tag.to_string(),
            line_comments: line_comments.iter().map(|s| s.to_string()).collect(),
            block_comment: block_comment.map(|(s, e)| (s.to_string(), e.to_string())),
            quotes: quotes.to_vec(),
        }
    }
}

/// Everything a scan pass needs to know, owned and passed in explicitly.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Lowercased file extension -> language rules.
    pub languages: HashMap<String, LanguageSpec>,
    /// Shebang interpreter substring -> language tag, for files
    /// without a recognized extension.
    pub shebangs: Vec<(String, String)>,
    /// Directory names pruned outright during the walk.
    pub skip_dirs: Vec<String>,
    /// Exclusion globs, matched against root-relative paths.
    /// Checked before includes; exclude wins.
    pub exclude: Vec<Pattern>,
    /// Include globs. Empty means "everything".
    pub include: Vec<Pattern>,
    /// Files above this many bytes are skipped as TooLarge.
    pub max_file_size: u64,
    /// Charsets tried in order; the first clean decode wins.
    pub charsets: Vec<Charset>,
    /// Per-file read time limit. A read that exceeds it is an IoError skip.
    pub read_timeout: Option<Duration>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            languages: default_language_table(),
            shebangs: vec![
                ("python".to_string(), "python".to_string()),
                ("bash".to_string(), "shell".to_string()),
                ("sh".to_string(), "shell".to_string()),
                ("node".to_string(), "javascript".to_string()),
                ("ruby".to_string(), "ruby".to_string()),
                ("perl".to_string(), "perl".to_string()),
            ],
            skip_dirs: vec![
                ".git".to_string(),
                ".hg".to_string(),
                ".svn".to_string(),
                "target".to_string(),
                "node_modules".to_string(),
            ],
            exclude: Vec::new(),
            include: Vec::new(),
            max_file_size: 10 * 1024 * 1024,
            // Ascii goes before Utf8 (its superset) so it can win, and
            // Latin1 never fails, so it goes last as the catch-all.
            charsets: vec![
                Charset::Ascii,
                Charset::Utf8,
                Charset::Utf16Le,
                Charset::Utf16Be,
                Charset::Latin1,
            ],
            read_timeout: None,
        }
    }
}

impl ScanConfig {
    /// Look up the language rules for a lowercased extension.
    pub fn language_for_extension(&self, ext: &str) -> Option<&LanguageSpec> {
        self.languages.get(ext)
    }

    /// Resolve a shebang interpreter line to a language, if registered.
    pub fn language_for_shebang(&self, first_line: &str) -> Option<&LanguageSpec> {
        if !first_line.starts_with("#!") {
            return None;
        }
        let tag = self
            .shebangs
            .iter()
            .find(|(needle, _)| first_line.contains(needle.as_str()))
            .map(|(_, tag)| tag.clone())?;
        self.languages.values().find(|spec| spec.tag == tag)
    }
}

fn default_language_table() -> HashMap<String, LanguageSpec> {
    let mut table = HashMap::new();
    let mut add = |exts: &[&str], spec: LanguageSpec| {
        for ext in exts {
            table.insert(ext.to_string(), spec.clone());
        }
    };

    let c_style = |tag: &str| LanguageSpec::new(tag, &["//"], Some(("/*", "*/")), &['"']);

    add(&["rs"], c_style("rust"));
    add(&["java"], c_style("java"));
    add(&["c", "h"], c_style("c"));
    add(&["cpp", "cc", "cxx", "hpp", "hh"], c_style("cpp"));
    add(&["cs"], c_style("csharp"));
    add(&["kt", "kts"], c_style("kotlin"));
    add(&["swift"], c_style("swift"));
    add(&["scala"], c_style("scala"));
    add(
        &["go"],
        LanguageSpec::new("go", &["//"], Some(("/*", "*/")), &['"', '`']),
    );
    add(
        &["js", "mjs", "cjs", "jsx"],
        LanguageSpec::new("javascript", &["//"], Some(("/*", "*/")), &['"', '\'', '`']),
    );
    add(
        &["ts", "tsx"],
        LanguageSpec::new("typescript", &["//"], Some(("/*", "*/")), &['"', '\'', '`']),
    );
    add(
        &["py"],
        LanguageSpec::new("python", &["#"], None, &['"', '\'']),
    );
    add(
        &["rb"],
        LanguageSpec::new("ruby", &["#"], Some(("=begin", "=end")), &['"', '\'']),
    );
    add(
        &["sh", "bash"],
        LanguageSpec::new("shell", &["#"], None, &['"', '\'']),
    );
    add(
        &["php"],
        LanguageSpec::new("php", &["//", "#"], Some(("/*", "*/")), &['"', '\'']),
    );
    add(
        &["pl", "pm"],
        LanguageSpec::new("perl", &["#"], None, &['"', '\'']),
    );
    add(
        &["lua"],
        LanguageSpec::new("lua", &["--"], Some(("--[[", "]]")), &['"', '\'']),
    );
    add(
        &["sql"],
        LanguageSpec::new("sql", &["--"], Some(("/*", "*/")), &['\'']),
    );
    add(&["css"], LanguageSpec::new("css", &[], Some(("/*", "*/")), &[]));
    add(
        &["html", "htm"],
        LanguageSpec::new("html", &[], Some(("<!--", "-->")), &[]),
    );
    add(
        &["xml"],
        LanguageSpec::new("xml", &[], Some(("<!--", "-->")), &[]),
    );
    add(
        &["yml", "yaml"],
        LanguageSpec::new("yaml", &["#"], None, &['"', '\'']),
    );
    add(
        &["toml"],
        LanguageSpec::new("toml", &["#"], None, &['"', '\'']),
    );
    add(&["json"], LanguageSpec::new("json", &[], None, &['"']));

    table
}
