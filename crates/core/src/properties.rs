//! Raw property source and typed, verifying reads.
//!
//! [`VerifiableProperties`] is a plain string map. Components derive their
//! typed configuration through a [`PropertyReader`], which falls back to
//! defaults and collects every malformed value so that one
//! [`ConfigurationError`] reports all of them.

use std::collections::{BTreeSet, HashMap};
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

use crate::errors::{ConfigurationError, InvalidProperty};

/// In-memory property source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifiableProperties {
    props: HashMap<String, String>,
}

impl VerifiableProperties {
    /// Create an empty property source
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a `.properties` file, see [`parse`](Self::parse) for the syntax
    pub fn load<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(Self::parse(&contents))
    }

    /// Parse `.properties` text.
    ///
    /// - `#` and `!` start a comment line; blank lines are skipped.
    /// - The key ends at the first unescaped `=`, `:` or whitespace; a
    ///   separator surrounded by whitespace is allowed (`key = value`).
    /// - A line ending in an odd number of backslashes continues on the next
    ///   line, whose leading whitespace is dropped.
    /// - `\t`, `\n`, `\r` and `\f` are control characters, any other escaped
    ///   character stands for itself (`\=`, `\:`, `\ `, `\\`).
    /// - Leading and trailing whitespace of a line is dropped. `\uXXXX`
    ///   escapes are not decoded; files are read as UTF-8.
    pub fn parse(contents: &str) -> Self {
        let mut props = Self::new();
        let mut lines = contents.lines();
        while let Some(first) = lines.next() {
            let mut line = first.trim().to_string();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            while ends_with_continuation(&line) {
                line.pop();
                match lines.next() {
                    Some(next) => line.push_str(next.trim()),
                    None => break,
                }
            }
            let (key, value) = split_entry(&line);
            props.set(unescape(key), unescape(value));
        }
        props
    }

    /// Set (or replace) a property
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.props.insert(key.into(), value.into());
    }

    /// Raw value of a property
    pub fn get(&self, key: &str) -> Option<&str> {
        self.props.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.props.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    /// All keys, sorted
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.props.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Start a verifying read over these properties
    pub fn reader(&self) -> PropertyReader<'_> {
        PropertyReader {
            props: self,
            read: BTreeSet::new(),
            invalid: Vec::new(),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for VerifiableProperties
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut props = Self::new();
        for (key, value) in iter {
            props.set(key, value);
        }
        props
    }
}

/// Typed reads over a [`VerifiableProperties`].
///
/// Malformed values are recorded and the default is returned in their place,
/// so a whole configuration struct can be read before [`finish`] reports.
///
/// [`finish`]: PropertyReader::finish
pub struct PropertyReader<'a> {
    props: &'a VerifiableProperties,
    read: BTreeSet<String>,
    invalid: Vec<InvalidProperty>,
}

impl<'a> PropertyReader<'a> {
    fn raw(&mut self, key: &str) -> Option<&'a str> {
        self.read.insert(key.to_string());
        self.props.get(key)
    }

    fn reject(&mut self, key: &str, value: &str, reason: String) {
        self.invalid.push(InvalidProperty {
            key: key.to_string(),
            value: value.to_string(),
            reason,
        });
    }

    /// String value, or `default` when absent
    pub fn string(&mut self, key: &str, default: &str) -> String {
        self.raw(key).unwrap_or(default).to_string()
    }

    /// Parsed value of any `FromStr` type, or `default` when absent
    pub fn parsed<T>(&mut self, key: &str, default: T) -> T
    where
        T: FromStr,
        T::Err: Display,
    {
        let Some(raw) = self.raw(key) else {
            return default;
        };
        match raw.parse() {
            Ok(value) => value,
            Err(e) => {
                self.reject(key, raw, e.to_string());
                default
            }
        }
    }

    /// Boolean value (`true`/`false`, case-insensitive)
    pub fn bool(&mut self, key: &str, default: bool) -> bool {
        let Some(raw) = self.raw(key) else {
            return default;
        };
        match raw.to_ascii_lowercase().as_str() {
            "true" => true,
            "false" => false,
            _ => {
                self.reject(key, raw, "expected true or false".to_string());
                default
            }
        }
    }

    /// Number within `[min, max]`
    pub fn int_in_range<T>(&mut self, key: &str, default: T, min: T, max: T) -> T
    where
        T: FromStr + PartialOrd + Display + Copy,
    {
        let Some(raw) = self.raw(key) else {
            return default;
        };
        match raw.parse::<T>() {
            Ok(value) if value >= min && value <= max => value,
            _ => {
                self.reject(key, raw, format!("expected an integer in [{}, {}]", min, max));
                default
            }
        }
    }

    /// Comma separated list; blank entries are dropped
    pub fn list(&mut self, key: &str) -> Vec<String> {
        self.raw(key)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Keys under `prefix` present in the source but never read
    pub fn unread(&self, prefix: &str) -> Vec<String> {
        self.props
            .keys()
            .into_iter()
            .filter(|k| k.starts_with(prefix) && !self.read.contains(*k))
            .map(str::to_string)
            .collect()
    }

    /// Report every malformed value seen so far
    pub fn finish(self) -> Result<(), ConfigurationError> {
        if self.invalid.is_empty() {
            Ok(())
        } else {
            Err(ConfigurationError::InvalidProperties {
                invalid: self.invalid,
            })
        }
    }
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

/// Split a logical line at the first unescaped separator
fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    for (idx, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => return (&line[..idx], line[idx + 1..].trim_start()),
            c if c.is_whitespace() => {
                let rest = line[idx..].trim_start();
                let rest = rest.strip_prefix(['=', ':']).unwrap_or(rest);
                return (&line[..idx], rest.trim_start());
            }
            _ => {}
        }
    }
    (line, "")
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_properties_text() {
        let props = VerifiableProperties::parse(
            "# comment\n! also a comment\n\nhttp.server.port = 8080\nname: portal\nflag\n",
        );

        assert_eq!(props.len(), 3);
        assert_eq!(props.get("http.server.port"), Some("8080"));
        assert_eq!(props.get("name"), Some("portal"));
        assert_eq!(props.get("flag"), Some(""));
    }

    #[test]
    fn test_parse_continuations_and_escapes() {
        let props = VerifiableProperties::parse(
            "portal.access.log.request.headers = Host, \\\n    User-Agent,\\\n\tAccept\n\
             key\\=with\\:separators = v\n\
             path C:\\\\temp\n\
             tabbed\\tvalue=a\\tb\n\
             trailing = backslash\\\\\n",
        );

        assert_eq!(
            props.get("portal.access.log.request.headers"),
            Some("Host, User-Agent,Accept")
        );
        assert_eq!(props.get("key=with:separators"), Some("v"));
        assert_eq!(props.get("path"), Some("C:\\temp"));
        assert_eq!(props.get("tabbed\tvalue"), Some("a\tb"));
        assert_eq!(props.get("trailing"), Some("backslash\\"));
        assert_eq!(props.len(), 5);
    }

    #[test]
    fn test_whitespace_separator() {
        let props = VerifiableProperties::parse("host 127.0.0.1\nport\t: 80\nurl = http://x:1\n");
        assert_eq!(props.get("host"), Some("127.0.0.1"));
        assert_eq!(props.get("port"), Some("80"));
        assert_eq!(props.get("url"), Some("http://x:1"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "a=1").unwrap();
        writeln!(file, "b = two").unwrap();

        let props = VerifiableProperties::load(file.path()).unwrap();
        assert_eq!(props.keys(), vec!["a", "b"]);
        assert_eq!(props.get("b"), Some("two"));
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(VerifiableProperties::load("/definitely/not/here.properties").is_err());
    }

    #[test]
    fn test_defaults_when_absent() {
        let props = VerifiableProperties::new();
        let mut reader = props.reader();

        assert_eq!(reader.string("host", "0.0.0.0"), "0.0.0.0");
        assert_eq!(reader.int_in_range("port", 1174u16, 0, u16::MAX), 1174);
        assert!(reader.bool("flag", true));
        assert!(reader.list("headers").is_empty());
        assert!(reader.finish().is_ok());
    }

    #[test]
    fn test_all_invalid_values_reported_together() {
        let props: VerifiableProperties = [
            ("port", "not-a-number"),
            ("limit", "0"),
            ("flag", "maybe"),
            ("ok", "5"),
        ]
        .into_iter()
        .collect();

        let mut reader = props.reader();
        assert_eq!(reader.int_in_range("port", 1u16, 0, u16::MAX), 1);
        assert_eq!(reader.int_in_range("limit", 10usize, 1, 100), 10);
        assert!(!reader.bool("flag", false));
        assert_eq!(reader.int_in_range("ok", 1u32, 1, 10), 5);

        let err = reader.finish().unwrap_err();
        assert_eq!(err.invalid_keys(), vec!["port", "limit", "flag"]);
    }

    #[test]
    fn test_parsed_reports_parse_error() {
        let props: VerifiableProperties = [("addr", "nowhere")].into_iter().collect();
        let mut reader = props.reader();

        let addr: std::net::IpAddr = reader.parsed("addr", std::net::IpAddr::from([127, 0, 0, 1]));
        assert_eq!(addr.to_string(), "127.0.0.1");
        assert_eq!(reader.finish().unwrap_err().invalid_keys(), vec!["addr"]);
    }

    #[test]
    fn test_list_and_unread() {
        let props: VerifiableProperties = [
            ("log.headers", " a, ,b ,c"),
            ("log.tyop", "x"),
            ("other", "y"),
        ]
        .into_iter()
        .collect();

        let mut reader = props.reader();
        assert_eq!(reader.list("log.headers"), vec!["a", "b", "c"]);
        assert_eq!(reader.unread("log."), vec!["log.tyop"]);
    }
}
