//! Placeholder templating for HTML functions.
//!
//! `{{name}}` inserts an HTML-escaped value, `{{{name}}}` inserts pre-rendered
//! markup as-is, and `\{{` is a literal `{{`. Every placeholder must be bound.

use std::collections::HashMap;

use crate::error::TemplateError;

pub type Vars<'a> = HashMap<&'a str, &'a str>;

pub fn render(template: &str, vars: &Vars<'_>) -> Result<String, TemplateError> {
    let mut result = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&'{') {
            chars.next();
            if chars.peek() == Some(&'{') {
                chars.next();
                result.push_str("{{");
            } else {
                result.push_str("\\{");
            }
            continue;
        }

        if c != '{' || chars.peek() != Some(&'{') {
            result.push(c);
            continue;
        }
        chars.next();

        let raw = chars.peek() == Some(&'{');
        if raw {
            chars.next();
        }
        let closing = if raw { 3 } else { 2 };

        let mut name = String::new();
        loop {
            match chars.next() {
                Some('}') => {
                    let mut seen = 1;
                    while seen < closing && chars.peek() == Some(&'}') {
                        chars.next();
                        seen += 1;
                    }
                    if seen == closing {
                        break;
                    }
                    for _ in 0..seen {
                        name.push('}');
                    }
                }
                Some(ch) => name.push(ch),
                None => return Err(TemplateError::Unclosed(name)),
            }
        }

        let name = name.trim();
        let value = vars
            .get(name)
            .ok_or_else(|| TemplateError::Unknown(name.to_string()))?;
        if raw {
            result.push_str(value);
        } else {
            escape_into(&mut result, value);
        }
    }

    Ok(result)
}

fn escape_into(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}
