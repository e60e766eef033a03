//! Value sources: the injected environment, `KEY=VALUE` files, and the
//! merged mapping built from them.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use super::error::ConfigError;

/// Read-only key/value view of an environment.
///
/// Resolution never reads `std::env` directly; callers hand in a source.
pub trait EnvSource {
    /// All `(name, value)` pairs currently visible.
    fn vars(&self) -> Vec<(String, String)>;
}

/// The live process environment. Entries that are not valid UTF-8 are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn vars(&self) -> Vec<(String, String)> {
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }
}

impl EnvSource for BTreeMap<String, String> {
    fn vars(&self) -> Vec<(String, String)> {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

impl EnvSource for HashMap<String, String> {
    fn vars(&self) -> Vec<(String, String)> {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

impl<E: EnvSource + ?Sized> EnvSource for &E {
    fn vars(&self) -> Vec<(String, String)> {
        (**self).vars()
    }
}

/// An environment with explicit assignments layered over a base source.
///
/// Lets a caller show environment precedence without touching process state.
#[derive(Debug, Clone)]
pub struct Overlay<E> {
    base: E,
    assignments: BTreeMap<String, String>,
}

impl<E: EnvSource> Overlay<E> {
    pub fn new(base: E) -> Self {
        Self {
            base,
            assignments: BTreeMap::new(),
        }
    }

    /// Adds or replaces one assignment. Names compare ignoring ASCII case.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.assignments.retain(|k, _| !k.eq_ignore_ascii_case(&name));
        self.assignments.insert(name, value.into());
        self
    }

    fn shadows(&self, name: &str) -> bool {
        self.assignments.keys().any(|k| k.eq_ignore_ascii_case(name))
    }

    pub fn assignments(&self) -> &BTreeMap<String, String> {
        &self.assignments
    }
}

impl<E: EnvSource> EnvSource for Overlay<E> {
    fn vars(&self) -> Vec<(String, String)> {
        let mut vars: Vec<(String, String)> = self
            .base
            .vars()
            .into_iter()
            .filter(|(k, _)| !self.shadows(k))
            .collect();
        vars.extend(
            self.assignments
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        vars
    }
}

/// Where a merged value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// An environment variable, by its full name.
    Env { var: String },
    /// An override file.
    File { path: PathBuf },
    /// Supplied directly by the caller (tests, re-parsed output).
    Inline,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Env { var } => write!(f, "environment ({})", var),
            Origin::File { path } => write!(f, "file {}", path.display()),
            Origin::Inline => f.write_str("inline"),
        }
    }
}

/// One merged value with its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub value: String,
    pub origin: Origin,
}

/// Flat mapping from field name to raw value, built highest layer first.
///
/// Keys are lower-case with the environment prefix removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMap {
    entries: BTreeMap<String, SourceEntry>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `value` for `key` unless a higher layer already defined it.
    ///
    /// The value is stored verbatim; an empty value still defines the key.
    /// Returns whether the value was taken.
    pub fn insert_if_absent(&mut self, key: &str, value: &str, origin: Origin) -> bool {
        let key = key.trim().to_ascii_lowercase();
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(
            key,
            SourceEntry {
                value: value.to_string(),
                origin,
            },
        );
        true
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|e| e.value.as_str())
    }

    pub fn origin(&self, key: &str) -> Option<&Origin> {
        self.entries.get(key).map(|e| &e.origin)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SourceEntry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for SourceMap {
    /// Earlier pairs win over later ones, as with layered sources.
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = SourceMap::new();
        for (k, v) in iter {
            map.insert_if_absent(k.as_ref(), v.as_ref(), Origin::Inline);
        }
        map
    }
}

/// Strips `prefix` from `name`, ignoring ASCII case, and lower-cases the rest.
///
/// Returns `None` when the name is not under the prefix or nothing follows it.
pub fn strip_prefix(name: &str, prefix: &str) -> Option<String> {
    if name.len() <= prefix.len() || !name.is_char_boundary(prefix.len()) {
        return None;
    }
    let (head, rest) = name.split_at(prefix.len());
    if !head.eq_ignore_ascii_case(prefix) {
        return None;
    }
    Some(rest.to_ascii_lowercase())
}

/// Reads a `KEY=VALUE` file in file order.
///
/// Blank lines, `#` comments and a leading `export` are skipped. Values may
/// be single- or double-quoted; double quotes accept backslash escapes.
/// Values are taken literally: `$NAME` and `${NAME}` are never expanded.
pub fn read_env_file(path: &Path) -> Result<Vec<(String, String)>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::FileAccess {
        path: path.to_path_buf(),
        source,
    })?;
    parse_env_lines(&content).map_err(|line| ConfigError::FileParse {
        path: path.to_path_buf(),
        line,
    })
}

/// Parses file content, failing with the 1-based number of the first bad line.
fn parse_env_lines(content: &str) -> Result<Vec<(String, String)>, usize> {
    let mut pairs = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let line_no = index + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line
            .strip_prefix("export ")
            .map(str::trim_start)
            .unwrap_or(line);

        let (key, raw) = line.split_once('=').ok_or(line_no)?;
        let key = key.trim();
        if !is_valid_key(key) {
            return Err(line_no);
        }
        let value = parse_value(raw.trim_start()).ok_or(line_no)?;
        pairs.push((key.to_string(), value));
    }
    Ok(pairs)
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

fn parse_value(raw: &str) -> Option<String> {
    let quote = match raw.chars().next() {
        Some(q @ ('"' | '\'')) => q,
        _ => {
            let end = raw.find(" #").or_else(|| raw.find("\t#")).unwrap_or(raw.len());
            return Some(raw[..end].trim_end().to_string());
        }
    };

    let body = &raw[1..];
    let mut value = String::new();
    let mut chars = body.char_indices();
    while let Some((i, c)) = chars.next() {
        if c == quote {
            let rest = body[i + 1..].trim_start();
            return (rest.is_empty() || rest.starts_with('#')).then_some(value);
        }
        if c == '\\' && quote == '"' {
            let (_, escaped) = chars.next()?;
            value.push(match escaped {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                other => other,
            });
        } else {
            value.push(c);
        }
    }
    // Unterminated quote.
    None
}
