// HTML pages served by the function router.

use driftnet_common::WebPage;

use crate::error::TemplateError;
use crate::template::{render, Vars};

const SEARCH_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{{title}}</title>
<style>
body { font-family: sans-serif; max-width: 48rem; margin: 2rem auto; }
li { margin-bottom: 1rem; }
.meta { color: #666; font-size: 0.85rem; }
</style>
</head>
<body>
<h1>{{title}}</h1>
<form method="get" action="{{endpoint}}">
<input type="search" name="q" value="{{query}}" placeholder="domain:nytimes.com text:covid" size="48">
<button type="submit">Search</button>
</form>
{{{results}}}
</body>
</html>
"#;

const RESULT_LIST: &str = r#"<p class="meta">{{count}} result(s)</p>
<ol>
{{{items}}}</ol>"#;

const RESULT_ITEM: &str = r#"<li><a href="{{url}}">{{url}}</a>
<div class="meta">{{domain}} · {{captured_at}} · {{labels}}</div>
<div>{{snippet}}</div></li>
"#;

const SNIPPET_CHARS: usize = 240;

/// Search form posting back to `endpoint`, followed by a result list when
/// `results` is given.
pub fn search_page(
    endpoint: &str,
    query: &str,
    results: Option<&[WebPage]>,
) -> Result<String, TemplateError> {
    let results_html = match results {
        Some(pages) => result_list(pages)?,
        None => String::new(),
    };

    let vars = Vars::from([
        ("title", "driftnet search"),
        ("endpoint", endpoint),
        ("query", query),
        ("results", results_html.as_str()),
    ]);
    render(SEARCH_PAGE, &vars)
}

fn result_list(pages: &[WebPage]) -> Result<String, TemplateError> {
    let mut items = String::new();
    for page in pages {
        items.push_str(&result_item(page)?);
    }
    let count = pages.len().to_string();
    render(
        RESULT_LIST,
        &Vars::from([("count", count.as_str()), ("items", items.as_str())]),
    )
}

fn result_item(page: &WebPage) -> Result<String, TemplateError> {
    let captured_at = page.captured_at.format("%Y-%m-%d %H:%M UTC").to_string();
    let labels = page.labels.join(", ");
    let snippet = snippet(&page.text);
    render(
        RESULT_ITEM,
        &Vars::from([
            ("url", page.url.as_str()),
            ("domain", page.domain.as_str()),
            ("captured_at", captured_at.as_str()),
            ("labels", labels.as_str()),
            ("snippet", snippet.as_str()),
        ]),
    )
}

fn snippet(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(SNIPPET_CHARS) {
        Some((cut, _)) => format!("{}…", &flat[..cut]),
        None => flat,
    }
}
