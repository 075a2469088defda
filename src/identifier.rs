//! Column identifier normalization and quoting.
//!
//! Header text from evaluation spreadsheets is a mix of Latin words, CJK
//! labels, punctuation and units. [`normalize_identifier()`] maps any header
//! onto a stable SQL identifier, [`quote_identifier()`] decides whether the
//! result still has to be quoted when emitted into a statement, and
//! [`NameRegistry`] keeps every name in a table unique.

use std::collections::HashSet;

/// Prefix added to identifiers that would otherwise start with a digit.
pub const DIGIT_PREFIX: &str = "col_";

const CJK_RANGES: &[(char, char)] = &[
    ('\u{3400}', '\u{4DBF}'),
    ('\u{4E00}', '\u{9FFF}'),
    ('\u{F900}', '\u{FAFF}'),
];

// SQLite keyword list (https://sqlite.org/lang_keywords.html).
const SQL_KEYWORDS: &[&str] = &[
    "ABORT", "ACTION", "ADD", "AFTER", "ALL", "ALTER", "ALWAYS", "ANALYZE", "AND", "AS", "ASC",
    "ATTACH", "AUTOINCREMENT", "BEFORE", "BEGIN", "BETWEEN", "BY", "CASCADE", "CASE", "CAST",
    "CHECK", "COLLATE", "COLUMN", "COMMIT", "CONFLICT", "CONSTRAINT", "CREATE", "CROSS",
    "CURRENT", "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "DATABASE", "DEFAULT",
    "DEFERRABLE", "DEFERRED", "DELETE", "DESC", "DETACH", "DISTINCT", "DO", "DROP", "EACH",
    "ELSE", "END", "ESCAPE", "EXCEPT", "EXCLUDE", "EXCLUSIVE", "EXISTS", "EXPLAIN", "FAIL",
    "FILTER", "FIRST", "FOLLOWING", "FOR", "FOREIGN", "FROM", "FULL", "GENERATED", "GLOB",
    "GROUP", "GROUPS", "HAVING", "IF", "IGNORE", "IMMEDIATE", "IN", "INDEX", "INDEXED",
    "INITIALLY", "INNER", "INSERT", "INSTEAD", "INTERSECT", "INTO", "IS", "ISNULL", "JOIN",
    "KEY", "LAST", "LEFT", "LIKE", "LIMIT", "MATCH", "MATERIALIZED", "NATURAL", "NO", "NOT",
    "NOTHING", "NOTNULL", "NULL", "NULLS", "OF", "OFFSET", "ON", "OR", "ORDER", "OTHERS",
    "OUTER", "OVER", "PARTITION", "PLAN", "PRAGMA", "PRECEDING", "PRIMARY", "QUERY", "RAISE",
    "RANGE", "RECURSIVE", "REFERENCES", "REGEXP", "REINDEX", "RELEASE", "RENAME", "REPLACE",
    "RESTRICT", "RETURNING", "RIGHT", "ROLLBACK", "ROW", "ROWS", "SAVEPOINT", "SELECT", "SET",
    "TABLE", "TEMP", "TEMPORARY", "THEN", "TIES", "TO", "TRANSACTION", "TRIGGER", "UNBOUNDED",
    "UNION", "UNIQUE", "UPDATE", "USING", "VACUUM", "VALUES", "VIEW", "VIRTUAL", "WHEN", "WHERE",
    "WINDOW", "WITH", "WITHOUT",
];

pub fn is_script_char(ch: char) -> bool {
    CJK_RANGES
        .iter()
        .any(|(start, end)| (*start..=*end).contains(&ch))
}

/// Maps a raw header onto an SQL identifier.
///
/// Characters outside `[A-Za-z0-9_]` (plus CJK ideographs when
/// `preserve_script` is set) become `_`, runs of `_` collapse, leading and
/// trailing `_` are trimmed, and a leading digit gains [`DIGIT_PREFIX`].
/// ASCII letters are lowercased unless `preserve_script` is set. The prefix is
/// applied last so that the function is idempotent. Empty or all-punctuation
/// input yields an empty string.
pub fn normalize_identifier(raw: &str, preserve_script: bool) -> String {
    let mut collapsed = String::with_capacity(raw.len());
    let mut last_was_underscore = false;
    for ch in raw.chars() {
        let keep = ch.is_ascii_alphanumeric() || (preserve_script && is_script_char(ch));
        if keep {
            if preserve_script {
                collapsed.push(ch);
            } else {
                collapsed.push(ch.to_ascii_lowercase());
            }
            last_was_underscore = false;
        } else if !last_was_underscore {
            collapsed.push('_');
            last_was_underscore = true;
        }
    }

    let trimmed = collapsed.trim_matches('_');
    if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        format!("{DIGIT_PREFIX}{trimmed}")
    } else {
        trimmed.to_string()
    }
}

pub fn is_keyword(name: &str) -> bool {
    SQL_KEYWORDS
        .iter()
        .any(|keyword| keyword.eq_ignore_ascii_case(name))
}

pub fn needs_quoting(name: &str) -> bool {
    let mut chars = name.chars();
    let plain = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    !plain || is_keyword(name)
}

/// Renders `name` for use inside an SQL statement.
pub fn quote_identifier(name: &str) -> String {
    if needs_quoting(name) {
        format!("\"{}\"", name.replace('"', "\"\""))
    } else {
        name.to_string()
    }
}

/// Hands out unique column names for one table.
///
/// SQLite compares identifiers without regard to ASCII case, so uniqueness
/// is checked on the ASCII-lowercased form.
#[derive(Debug, Default)]
pub struct NameRegistry {
    taken: HashSet<String>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a name that must be kept verbatim, returning `false` when it
    /// was already taken.
    pub fn reserve(&mut self, name: &str) -> bool {
        self.taken.insert(name.to_ascii_lowercase())
    }

    /// Claims `candidate`, falling back to `col_<position>` when it is empty
    /// and appending `_<position>` (then `_<position>_<n>`) on collision.
    pub fn claim(&mut self, candidate: &str, position: usize) -> String {
        let base = if candidate.is_empty() {
            format!("{DIGIT_PREFIX}{position}")
        } else {
            candidate.to_string()
        };
        if self.reserve(&base) {
            return base;
        }
        let suffixed = format!("{base}_{position}");
        if self.reserve(&suffixed) {
            return suffixed;
        }
        let mut counter = 2usize;
        loop {
            let attempt = format!("{suffixed}_{counter}");
            if self.reserve(&attempt) {
                return attempt;
            }
            counter += 1;
        }
    }
}
