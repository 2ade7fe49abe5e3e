//! Search-bar query language: `domain:nytimes.com text:"climate change" politics`.

use std::sync::LazyLock;

use driftnet_common::WebPage;
use regex::Regex;

use crate::error::{StoreError, StoreResult};

/// A field prefix only counts when it names a field, so `https://x.com` and
/// `12:30` stay free terms.
static TERM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:((?i:url|domain|text|labels?|html)):)?(?:"([^"]*)"|(\S+))"#)
        .expect("valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Url,
    Domain,
    Text,
    Labels,
}

impl Field {
    fn parse(name: &str) -> StoreResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "url" => Ok(Self::Url),
            "domain" => Ok(Self::Domain),
            "text" => Ok(Self::Text),
            "labels" | "label" => Ok(Self::Labels),
            "html" => Err(StoreError::Query(
                "html is stored but not searchable".to_string(),
            )),
            other => Err(StoreError::Query(format!("unknown field: {other}"))),
        }
    }
}

fn is_field_name(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "url" | "domain" | "text" | "label" | "labels" | "html"
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    /// `None` searches every searchable field.
    pub field: Option<Field>,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combine {
    All,
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub terms: Vec<Term>,
    pub combine: Combine,
}

impl Query {
    pub fn parse(input: &str) -> StoreResult<Self> {
        Self::parse_with(input, Combine::All)
    }

    pub fn parse_any(input: &str) -> StoreResult<Self> {
        Self::parse_with(input, Combine::Any)
    }

    fn parse_with(input: &str, combine: Combine) -> StoreResult<Self> {
        let mut terms = Vec::new();
        for cap in TERM_RE.captures_iter(input) {
            let field = cap.get(1).map(|m| Field::parse(m.as_str())).transpose()?;
            let value = cap
                .get(2)
                .or_else(|| cap.get(3))
                .map(|m| m.as_str().trim())
                .unwrap_or_default();
            let bare_field = field.is_none()
                && value.strip_suffix(':').is_some_and(is_field_name);
            if bare_field {
                Field::parse(value.trim_end_matches(':'))?;
            }
            if value.is_empty() || bare_field {
                return Err(StoreError::Query(format!("empty value in {:?}", &cap[0])));
            }
            terms.push(Term {
                field,
                value: value.to_string(),
            });
        }

        if terms.is_empty() {
            return Err(StoreError::Query("empty query".to_string()));
        }
        Ok(Self { terms, combine })
    }

    pub fn matches(&self, page: &WebPage) -> bool {
        match self.combine {
            Combine::All => self.terms.iter().all(|t| t.matches(page)),
            Combine::Any => self.terms.iter().any(|t| t.matches(page)),
        }
    }
}

impl Term {
    pub fn matches(&self, page: &WebPage) -> bool {
        let v = self.value.as_str();
        match self.field {
            Some(Field::Url) => page.url == v,
            Some(Field::Domain) => page.domain.eq_ignore_ascii_case(v),
            Some(Field::Text) => contains_word(&page.text, v),
            Some(Field::Labels) => page.has_label(v),
            None => {
                contains_word(&page.text, v)
                    || page.domain.eq_ignore_ascii_case(v)
                    || page.has_label(v)
                    || page.url == v
            }
        }
    }
}

/// Case-insensitive containment anchored at the start of a word, so `cat`
/// matches "Cats" and "the cat" but not "concatenate". A quoted phrase must
/// appear as written.
pub(crate) fn contains_word(haystack: &str, needle: &str) -> bool {
    let haystack = haystack.to_lowercase();
    let needle = needle.to_lowercase();
    let mut at_word_start = true;
    for (i, c) in haystack.char_indices() {
        if at_word_start && haystack[i..].starts_with(&needle) {
            return true;
        }
        at_word_start = !c.is_alphanumeric();
    }
    false
}

/// The same word-start rule as [`contains_word`], as a Postgres regex for `~*`.
pub(crate) fn word_start_pattern(needle: &str) -> String {
    let mut pattern = String::from("(^|[^[:alnum:]])");
    for c in needle.chars() {
        if !c.is_alphanumeric() && !c.is_whitespace() {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern
}
