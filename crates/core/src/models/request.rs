use crate::ClassifiedError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// HTTP method of a request descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identity of a request, used to key cached results
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for CacheKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Immutable description of one API call.
///
/// Built per call site and never persisted. The endpoint path, method, query
/// parameters and body make up the request identity; headers, required
/// parameter names and the response tag do not.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    path: String,
    method: HttpMethod,
    query: BTreeMap<String, String>,
    body: Option<Value>,
    headers: BTreeMap<String, String>,
    required: Vec<String>,
    response_tag: Option<String>,
}

impl RequestDescriptor {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            query: BTreeMap::new(),
            body: None,
            headers: BTreeMap::new(),
            required: Vec::new(),
            response_tag: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    /// Add a query parameter, replacing any previous value for `name`
    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.insert(name.into(), value.to_string());
        self
    }

    /// Add a query parameter only when a value is present
    pub fn optional_query<V: ToString>(self, name: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.query(name, value),
            None => self,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn json_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Mark a query parameter as required for the endpoint to be valid
    pub fn require(mut self, name: impl Into<String>) -> Self {
        self.required.push(name.into());
        self
    }

    /// Tag the expected response type, e.g. `"games"`
    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.response_tag = Some(tag.into());
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn query_params(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn response_tag(&self) -> Option<&str> {
        self.response_tag.as_deref()
    }

    /// Path without leading or trailing slashes
    pub fn normalized_path(&self) -> &str {
        self.path.trim().trim_matches('/')
    }

    /// Check the descriptor can be turned into a request.
    ///
    /// Fails with `InvalidEndpoint` when the path is empty, is not a plain
    /// relative path below the base URL, or when a required parameter is
    /// missing or blank.
    pub fn validate(&self) -> Result<(), ClassifiedError> {
        let path = self.normalized_path();
        // A leading `//` would make the path network-relative
        if path.is_empty() || self.path.trim().starts_with("//") || !is_relative_path(path) {
            return Err(ClassifiedError::InvalidEndpoint);
        }

        let missing = self.required.iter().any(|name| {
            self.query
                .get(name)
                .map_or(true, |value| value.trim().is_empty())
        });
        if missing {
            return Err(ClassifiedError::InvalidEndpoint);
        }

        Ok(())
    }

    /// Derive the cache key for this request.
    ///
    /// `GET games` with `page=1` yields `games?page=1`. Parameters are sorted
    /// by name and url-encoded; other methods are prefixed with the method
    /// name and a body is appended as canonical JSON.
    pub fn cache_key(&self) -> CacheKey {
        let mut key = String::new();

        if self.method != HttpMethod::Get {
            key.push_str(self.method.as_str());
            key.push(' ');
        }

        key.push_str(self.normalized_path());

        if !self.query.is_empty() {
            let pairs = self
                .query
                .iter()
                .map(|(name, value)| {
                    format!(
                        "{}={}",
                        urlencoding::encode(name),
                        urlencoding::encode(value)
                    )
                })
                .collect::<Vec<_>>()
                .join("&");
            key.push('?');
            key.push_str(&pairs);
        }

        if let Some(body) = &self.body {
            key.push(' ');
            write_canonical_json(body, &mut key);
        }

        CacheKey(key)
    }
}

/// A path made only of plain segments: no scheme, authority, query, fragment
/// or dot segments that could leave the base URL
fn is_relative_path(path: &str) -> bool {
    if path.contains(|c: char| c.is_whitespace() || matches!(c, '?' | '#' | '\\')) {
        return false;
    }

    // Url::join reads `name:rest` in the first segment as a scheme
    let first = path.split('/').next().unwrap_or_default();
    if first.contains(':') {
        return false;
    }

    path.split('/').all(|segment| {
        let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
        !segment.is_empty() && decoded != "." && decoded != ".."
    })
}

/// Serialize JSON with object keys sorted at every level
fn write_canonical_json(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (index, (name, value)) in entries.into_iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(name.clone()).to_string());
                out.push(':');
                write_canonical_json(value, out);
            }
            out.push('}');
        }
        Value::Array(values) => {
            out.push('[');
            for (index, value) in values.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_canonical_json(value, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
