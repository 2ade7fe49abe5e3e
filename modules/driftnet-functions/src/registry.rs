//! Registration table of callable functions, built once at process start.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::error::{FunctionResult, RegistryError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    Json,
    Html,
}

/// Invocation metadata for one function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionSpec {
    pub name: String,
    pub method: Method,
    pub response: ResponseKind,
    pub max_concurrency: usize,
}

const DEFAULT_MAX_CONCURRENCY: usize = 8;

impl FunctionSpec {
    /// JSON function, called with POST.
    pub fn json(name: &str) -> Self {
        Self {
            name: name.to_string(),
            method: Method::Post,
            response: ResponseKind::Json,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// HTML page, called with GET.
    pub fn html(name: &str) -> Self {
        Self {
            name: name.to_string(),
            method: Method::Get,
            response: ResponseKind::Html,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionOutput {
    Json(Value),
    Html(String),
}

impl FunctionOutput {
    pub fn kind(&self) -> ResponseKind {
        match self {
            FunctionOutput::Json(_) => ResponseKind::Json,
            FunctionOutput::Html(_) => ResponseKind::Html,
        }
    }
}

#[async_trait]
pub trait FunctionHandler: Send + Sync {
    /// `args` is always a JSON object: the query string for GET, the body for POST.
    async fn call(&self, args: Value) -> FunctionResult<FunctionOutput>;
}

pub struct RegisteredFunction {
    pub spec: FunctionSpec,
    pub handler: Arc<dyn FunctionHandler>,
    pub(crate) permits: Arc<Semaphore>,
}

pub struct FunctionRegistry {
    functions: BTreeMap<String, RegisteredFunction>,
}

impl FunctionRegistry {
    pub fn builder() -> FunctionRegistryBuilder {
        FunctionRegistryBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredFunction> {
        self.functions.get(name)
    }

    /// Specs sorted by name.
    pub fn specs(&self) -> Vec<&FunctionSpec> {
        self.functions.values().map(|f| &f.spec).collect()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

#[derive(Default)]
pub struct FunctionRegistryBuilder {
    entries: Vec<(FunctionSpec, Arc<dyn FunctionHandler>)>,
}

impl FunctionRegistryBuilder {
    pub fn register(mut self, spec: FunctionSpec, handler: impl FunctionHandler + 'static) -> Self {
        self.entries.push((spec, Arc::new(handler)));
        self
    }

    pub fn build(self) -> Result<FunctionRegistry, RegistryError> {
        let mut functions = BTreeMap::new();
        for (spec, handler) in self.entries {
            validate_name(&spec.name)?;
            if spec.max_concurrency == 0 {
                return Err(RegistryError::ZeroConcurrency(spec.name));
            }
            if functions.contains_key(&spec.name) {
                return Err(RegistryError::Duplicate(spec.name));
            }
            let permits = Arc::new(Semaphore::new(spec.max_concurrency));
            functions.insert(
                spec.name.clone(),
                RegisteredFunction {
                    spec,
                    handler,
                    permits,
                },
            );
        }
        Ok(FunctionRegistry { functions })
    }
}

fn validate_name(name: &str) -> Result<(), RegistryError> {
    let ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'));
    if ok {
        Ok(())
    } else {
        Err(RegistryError::InvalidName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl FunctionHandler for Echo {
        async fn call(&self, args: Value) -> FunctionResult<FunctionOutput> {
            Ok(FunctionOutput::Json(args))
        }
    }

    #[test]
    fn defaults_follow_response_kind() {
        assert_eq!(FunctionSpec::json("a").method, Method::Post);
        assert_eq!(FunctionSpec::html("a").method, Method::Get);
    }

    #[test]
    fn builds_sorted_table() {
        let registry = FunctionRegistry::builder()
            .register(FunctionSpec::json("records.list"), Echo)
            .register(FunctionSpec::html("pages.search"), Echo)
            .build()
            .unwrap();
        let names: Vec<&str> = registry.specs().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["pages.search", "records.list"]);
        assert!(registry.get("records.list").is_some());
        assert!(registry.get("records.nope").is_none());
    }

    #[test]
    fn duplicate_names_rejected() {
        let err = FunctionRegistry::builder()
            .register(FunctionSpec::json("echo"), Echo)
            .register(FunctionSpec::html("echo"), Echo)
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, RegistryError::Duplicate(name) if name == "echo"));
    }

    #[test]
    fn zero_concurrency_rejected() {
        let err = FunctionRegistry::builder()
            .register(FunctionSpec::json("echo").max_concurrency(0), Echo)
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, RegistryError::ZeroConcurrency(_)));
    }

    #[test]
    fn names_must_be_path_safe() {
        for bad in ["", "Echo", "a/b", "a b"] {
            let result = FunctionRegistry::builder()
                .register(FunctionSpec::json(bad), Echo)
                .build();
            assert!(matches!(result, Err(RegistryError::InvalidName(_))), "{bad:?}");
        }
    }
}
