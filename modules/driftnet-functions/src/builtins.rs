//! Functions over a record store: `records.*` answer JSON, `pages.search` renders HTML.

use std::sync::Arc;

use async_trait::async_trait;
use driftnet_common::{RecordId, WebPage};
use driftnet_store::RecordStore;
use serde_json::{json, Map, Value};

use crate::error::{FunctionError, FunctionResult};
use crate::pages::search_page;
use crate::registry::{FunctionHandler, FunctionOutput, FunctionRegistryBuilder, FunctionSpec};

/// Register every built-in against `store`. Calls without an `index`
/// argument use `default_index`.
pub fn register_builtins(
    builder: FunctionRegistryBuilder,
    store: Arc<dyn RecordStore>,
    default_index: &str,
) -> FunctionRegistryBuilder {
    let ctx = StoreContext {
        store,
        default_index: default_index.to_string(),
    };
    builder
        .register(FunctionSpec::json("records.count"), RecordsCount(ctx.clone()))
        .register(FunctionSpec::json("records.list"), RecordsList(ctx.clone()))
        .register(FunctionSpec::json("records.get"), RecordsGet(ctx.clone()))
        .register(FunctionSpec::json("records.search"), RecordsSearch(ctx.clone()))
        .register(
            FunctionSpec::html("pages.search").max_concurrency(4),
            PagesSearch(ctx),
        )
}

#[derive(Clone)]
struct StoreContext {
    store: Arc<dyn RecordStore>,
    default_index: String,
}

impl StoreContext {
    fn index<'a>(&'a self, args: &'a Args) -> FunctionResult<&'a str> {
        Ok(args.opt_str("index")?.unwrap_or(&self.default_index))
    }
}

/// Typed access to a JSON argument object. GET query strings arrive as
/// strings, so numbers and flags are also accepted in string form.
struct Args(Map<String, Value>);

impl Args {
    fn new(value: Value) -> FunctionResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self(Map::new())),
            other => Err(FunctionError::bad_args(format!(
                "expected an object, got {other}"
            ))),
        }
    }

    fn opt_str(&self, name: &str) -> FunctionResult<Option<&str>> {
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(FunctionError::bad_args(format!(
                "{name} must be a string, got {other}"
            ))),
        }
    }

    fn str(&self, name: &str) -> FunctionResult<&str> {
        self.opt_str(name)?
            .ok_or_else(|| FunctionError::bad_args(format!("{name} is required")))
    }

    fn opt_usize(&self, name: &str) -> FunctionResult<Option<usize>> {
        let bad = || FunctionError::bad_args(format!("{name} must be a non-negative integer"));
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .map(Some)
                .ok_or_else(bad),
            Some(Value::String(s)) => s.trim().parse().map(Some).map_err(|_| bad()),
            Some(_) => Err(bad()),
        }
    }

    fn flag(&self, name: &str) -> FunctionResult<bool> {
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(false),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::String(s)) => match s.as_str() {
                "" | "0" | "false" | "no" => Ok(false),
                "1" | "true" | "yes" | "on" => Ok(true),
                _ => Err(FunctionError::bad_args(format!("{name} must be a boolean"))),
            },
            Some(_) => Err(FunctionError::bad_args(format!("{name} must be a boolean"))),
        }
    }

    /// `id`, or the id derived from `url`.
    fn record_id(&self) -> FunctionResult<RecordId> {
        if let Some(id) = self.opt_str("id")? {
            return Ok(RecordId::parse(id)?);
        }
        if let Some(url) = self.opt_str("url")? {
            return Ok(RecordId::derive(url)?);
        }
        Err(FunctionError::bad_args("id or url is required"))
    }
}

/// Search hit without the raw markup.
fn summary(page: &WebPage) -> Value {
    json!({
        "id": page.id,
        "url": page.url,
        "domain": page.domain,
        "labels": page.labels,
        "captured_at": page.captured_at,
    })
}

struct RecordsCount(StoreContext);

#[async_trait]
impl FunctionHandler for RecordsCount {
    async fn call(&self, args: Value) -> FunctionResult<FunctionOutput> {
        let args = Args::new(args)?;
        let index = self.0.index(&args)?;
        let count = self.0.store.count(index).await?;
        Ok(FunctionOutput::Json(json!({ "index": index, "count": count })))
    }
}

struct RecordsList(StoreContext);

#[async_trait]
impl FunctionHandler for RecordsList {
    async fn call(&self, args: Value) -> FunctionResult<FunctionOutput> {
        let args = Args::new(args)?;
        let index = self.0.index(&args)?;
        let offset = args.opt_usize("offset")?.unwrap_or(0);
        let limit = args.opt_usize("limit")?.unwrap_or(usize::MAX);

        let ids = self.0.store.list(index).await?;
        let total = ids.len();
        let records: Vec<Value> = ids
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|id| {
                let url = id.recover().ok();
                json!({ "id": id, "url": url })
            })
            .collect();
        Ok(FunctionOutput::Json(
            json!({ "index": index, "total": total, "records": records }),
        ))
    }
}

struct RecordsGet(StoreContext);

#[async_trait]
impl FunctionHandler for RecordsGet {
    async fn call(&self, args: Value) -> FunctionResult<FunctionOutput> {
        let args = Args::new(args)?;
        let index = self.0.index(&args)?;
        let id = args.record_id()?;
        match self.0.store.get(index, &id).await? {
            Some(page) => Ok(FunctionOutput::Json(json!(page))),
            None => Err(FunctionError::NotFound(format!("no record {id} in {index}"))),
        }
    }
}

struct RecordsSearch(StoreContext);

#[async_trait]
impl FunctionHandler for RecordsSearch {
    async fn call(&self, args: Value) -> FunctionResult<FunctionOutput> {
        let args = Args::new(args)?;
        let index = self.0.index(&args)?;
        let query = args.str("q")?;
        let hits = if args.flag("any")? {
            self.0.store.search_any(index, query).await?
        } else {
            self.0.store.search_bar(index, query).await?
        };
        let results: Vec<Value> = hits.iter().map(summary).collect();
        Ok(FunctionOutput::Json(
            json!({ "index": index, "query": query, "results": results }),
        ))
    }
}

struct PagesSearch(StoreContext);

#[async_trait]
impl FunctionHandler for PagesSearch {
    async fn call(&self, args: Value) -> FunctionResult<FunctionOutput> {
        let args = Args::new(args)?;
        let index = self.0.index(&args)?;
        let query = args.opt_str("q")?.unwrap_or("").trim();

        let hits = if query.is_empty() {
            None
        } else {
            Some(self.0.store.search_bar(index, query).await?)
        };
        let html = search_page("/functions/pages.search", query, hits.as_deref())
            .map_err(|e| FunctionError::Internal(e.into()))?;
        Ok(FunctionOutput::Html(html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_accept_query_string_forms() {
        let args = Args::new(json!({ "a": "true", "b": "0", "c": true, "d": "maybe" })).unwrap();
        assert!(args.flag("a").unwrap());
        assert!(!args.flag("b").unwrap());
        assert!(args.flag("c").unwrap());
        assert!(args.flag("d").is_err());
        assert!(!args.flag("missing").unwrap());
    }

    #[test]
    fn numbers_accept_strings() {
        let args = Args::new(json!({ "limit": "5", "offset": 2, "bad": "-1" })).unwrap();
        assert_eq!(args.opt_usize("limit").unwrap(), Some(5));
        assert_eq!(args.opt_usize("offset").unwrap(), Some(2));
        assert!(args.opt_usize("bad").is_err());
    }

    #[test]
    fn record_id_from_url_or_id() {
        let url = "https://example.com/a";
        let derived = RecordId::derive(url).unwrap();

        let by_url = Args::new(json!({ "url": url })).unwrap();
        assert_eq!(by_url.record_id().unwrap(), derived);

        let by_id = Args::new(json!({ "id": derived.as_str() })).unwrap();
        assert_eq!(by_id.record_id().unwrap(), derived);

        let neither = Args::new(json!({})).unwrap();
        assert!(matches!(neither.record_id(), Err(FunctionError::BadArgs(_))));
    }

    #[test]
    fn non_object_args_rejected() {
        assert!(Args::new(json!([1, 2])).is_err());
        assert!(Args::new(Value::Null).is_ok());
    }
}
