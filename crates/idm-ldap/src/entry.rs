//! Directory entries, DN helpers and equality filters.

use std::collections::HashSet;

use ldap3::SearchEntry;

use crate::schema::OBJECT_CLASS;

/// A directory entry: a DN, object classes and an attribute multimap.
///
/// Attribute names are matched case-insensitively. Values keep their
/// insertion order and are deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Distinguished Name.
    pub dn: String,

    /// Declared object classes.
    pub object_classes: Vec<String>,

    attributes: Vec<(String, Vec<String>)>,
}

impl DirectoryEntry {
    /// Creates an empty entry.
    #[must_use]
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            object_classes: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Sets the object classes.
    #[must_use]
    pub fn with_object_classes(mut self, classes: &[String]) -> Self {
        self.object_classes = classes.to_vec();
        self
    }

    /// Sets an attribute, builder style.
    #[must_use]
    pub fn with_attr(mut self, name: &str, values: Vec<String>) -> Self {
        self.set(name, values);
        self
    }

    /// Creates an entry from an ldap3 search result.
    #[must_use]
    pub fn from_search_entry(entry: SearchEntry) -> Self {
        let mut result = Self::new(entry.dn);
        let mut names: Vec<String> = entry.attrs.keys().cloned().collect();
        names.sort();

        let mut attrs = entry.attrs;
        for name in names {
            let values = attrs.remove(&name).unwrap_or_default();
            if name.eq_ignore_ascii_case(OBJECT_CLASS) {
                result.object_classes = values;
            } else {
                result.set(&name, values);
            }
        }
        result
    }

    /// Converts to the attribute list ldap3 expects for an add.
    #[must_use]
    pub fn to_ldap3_attrs(&self) -> Vec<(String, HashSet<String>)> {
        let mut attrs = Vec::with_capacity(self.attributes.len() + 1);
        if !self.object_classes.is_empty() {
            attrs.push((
                OBJECT_CLASS.to_string(),
                self.object_classes.iter().cloned().collect(),
            ));
        }
        for (name, values) in &self.attributes {
            attrs.push((name.clone(), values.iter().cloned().collect()));
        }
        attrs
    }

    /// Replaces the values of an attribute. Empty `values` removes it.
    pub fn set(&mut self, name: &str, values: Vec<String>) {
        let values = dedup(values);
        match self.position(name) {
            Some(index) if values.is_empty() => {
                self.attributes.remove(index);
            }
            Some(index) => self.attributes[index].1 = values,
            None if values.is_empty() => {}
            None => self.attributes.push((name.to_string(), values)),
        }
    }

    /// Adds one value to an attribute. Returns `false` if it was present.
    pub fn add_value(&mut self, name: &str, value: impl Into<String>) -> bool {
        let value = value.into();
        match self.position(name) {
            Some(index) => {
                let values = &mut self.attributes[index].1;
                if values.iter().any(|v| v.eq_ignore_ascii_case(&value)) {
                    return false;
                }
                values.push(value);
                true
            }
            None => {
                self.attributes.push((name.to_string(), vec![value]));
                true
            }
        }
    }

    /// Removes an attribute, returning its values.
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.position(name)
            .map(|index| self.attributes.remove(index).1)
    }

    /// Gets the values of an attribute.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.position(name)
            .map(|index| self.attributes[index].1.as_slice())
    }

    /// Gets the first value of an attribute.
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(<[String]>::first)
            .map(String::as_str)
    }

    /// Checks if the entry has an attribute.
    #[must_use]
    pub fn has_attr(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Checks if the entry declares an object class.
    #[must_use]
    pub fn has_object_class(&self, class: &str) -> bool {
        self.object_classes
            .iter()
            .any(|c| c.eq_ignore_ascii_case(class))
    }

    /// Iterates over attributes (object classes excluded).
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.attributes
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Keeps only the named attributes. An empty list keeps everything.
    pub fn retain_attrs(&mut self, names: &[&str]) {
        if names.is_empty() || names.contains(&"*") {
            return;
        }
        self.attributes
            .retain(|(name, _)| names.iter().any(|n| n.eq_ignore_ascii_case(name)));
    }

    /// Checks if every clause of the filter matches this entry.
    #[must_use]
    pub fn matches(&self, filter: &EqualityFilter) -> bool {
        filter.clauses().iter().all(|(attr, value)| {
            let values = if attr.eq_ignore_ascii_case(OBJECT_CLASS) {
                Some(self.object_classes.as_slice())
            } else {
                self.get(attr)
            };
            values.is_some_and(|values| {
                values.iter().any(|v| v.eq_ignore_ascii_case(value))
            })
        })
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.attributes
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))
    }
}

fn dedup(values: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(v.to_lowercase()))
        .collect()
}

// ============================================================================
// Filters
// ============================================================================

/// A conjunction of attribute equality assertions.
///
/// This is the only filter shape the store issues: lookups by naming
/// attribute and reverse searches on `member`. Values are always literal,
/// so `*` asserts equality with an asterisk and never presence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EqualityFilter {
    clauses: Vec<(String, String)>,
}

impl EqualityFilter {
    /// Creates a filter with one assertion.
    #[must_use]
    pub fn eq(attr: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            clauses: vec![(attr.into(), value.into())],
        }
    }

    /// Adds another assertion.
    #[must_use]
    pub fn and(mut self, attr: impl Into<String>, value: impl Into<String>) -> Self {
        self.clauses.push((attr.into(), value.into()));
        self
    }

    /// The assertions.
    #[must_use]
    pub fn clauses(&self) -> &[(String, String)] {
        &self.clauses
    }

    /// Renders the filter in RFC 4515 string form.
    #[must_use]
    pub fn to_filter_string(&self) -> String {
        let rendered: Vec<String> = self
            .clauses
            .iter()
            .map(|(attr, value)| format!("({attr}={})", ldap_escape(value)))
            .collect();

        match rendered.len() {
            0 => format!("({OBJECT_CLASS}=*)"),
            1 => rendered.concat(),
            _ => format!("(&{})", rendered.concat()),
        }
    }
}

impl std::fmt::Display for EqualityFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_filter_string())
    }
}

/// Escapes special characters in LDAP filter values.
#[must_use]
pub fn ldap_escape(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\5c"),
            '*' => result.push_str("\\2a"),
            '(' => result.push_str("\\28"),
            ')' => result.push_str("\\29"),
            '\0' => result.push_str("\\00"),
            _ => result.push(c),
        }
    }
    result
}

// ============================================================================
// DN helpers
// ============================================================================

/// Splits a DN into its RDN components, honouring backslash escapes.
#[must_use]
pub fn split_rdns(dn: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (i, c) in dn.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            ',' => {
                parts.push(dn[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = dn[start..].trim();
    if !last.is_empty() || !parts.is_empty() {
        parts.push(last);
    }
    parts
}

/// Splits a DN into its first RDN's attribute, raw value and parent DN.
#[must_use]
pub fn parse_rdn(dn: &str) -> Option<(&str, &str, String)> {
    let rdns = split_rdns(dn);
    let (first, rest) = rdns.split_first()?;
    let (attr, value) = first.split_once('=')?;
    Some((attr.trim(), value.trim(), rest.join(",")))
}

/// Reverses RFC 4514 escaping of an attribute value.
#[must_use]
pub fn unescape_rdn_value(value: &str) -> String {
    let mut out: Vec<u8> = Vec::with_capacity(value.len());
    let bytes = value.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 1 < bytes.len() {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok());
            if let Some(byte) = hex {
                out.push(byte);
                i += 3;
            } else {
                out.push(bytes[i + 1]);
                i += 2;
            }
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Normalizes a DN for comparison.
#[must_use]
pub fn normalize_dn(dn: &str) -> String {
    split_rdns(dn)
        .iter()
        .map(|rdn| match rdn.split_once('=') {
            Some((attr, value)) => format!("{}={}", attr.trim(), value.trim()),
            None => (*rdn).to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
        .to_lowercase()
}

/// Compares two DNs ignoring case and insignificant whitespace.
#[must_use]
pub fn dn_eq(a: &str, b: &str) -> bool {
    normalize_dn(a) == normalize_dn(b)
}

/// Parent DN, if the DN has more than one component.
#[must_use]
pub fn parent_dn(dn: &str) -> Option<String> {
    let rdns = split_rdns(dn);
    (rdns.len() > 1).then(|| rdns[1..].join(","))
}
