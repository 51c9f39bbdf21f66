/// Fighter identity across update sources.
///
/// Fighters are joined purely by name. `ExactMatch` keeps the raw string as the
/// key; `NormalizedMatch` folds Unicode composition and whitespace differences
/// but is otherwise just as literal (no case folding, no alias tables).
use std::borrow::Cow;
use std::collections::HashMap;

use unicode_normalization::UnicodeNormalization;

pub trait NameMatcher {
    /// Key under which `name` is joined. Two names match iff their keys are equal.
    fn key<'a>(&self, name: &'a str) -> Cow<'a, str>;

    fn matches(&self, a: &str, b: &str) -> bool {
        self.key(a) == self.key(b)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatch;

impl NameMatcher for ExactMatch {
    fn key<'a>(&self, name: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(name)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedMatch;

impl NameMatcher for NormalizedMatch {
    fn key<'a>(&self, name: &'a str) -> Cow<'a, str> {
        let collapsed = name.split_whitespace().collect::<Vec<_>>().join(" ");
        let normalized: String = collapsed.nfc().collect();
        if normalized == name {
            Cow::Borrowed(name)
        } else {
            Cow::Owned(normalized)
        }
    }
}

/// Immutable name-keyed lookup table, built once per operation.
///
/// When two entries share a key the later one wins.
pub struct NameIndex<'m, V> {
    matcher: &'m dyn NameMatcher,
    entries: HashMap<String, V>,
}

impl<'m, V> NameIndex<'m, V> {
    pub fn build<I, S>(matcher: &'m dyn NameMatcher, pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, V)>,
        S: AsRef<str>,
    {
        let mut entries = HashMap::new();
        for (name, value) in pairs {
            entries.insert(matcher.key(name.as_ref()).into_owned(), value);
        }
        Self { matcher, entries }
    }

    pub fn get(&self, name: &str) -> Option<&V> {
        self.entries.get(self.matcher.key(name).as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
