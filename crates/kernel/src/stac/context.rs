//! Request-scoped presentation context.

use url::form_urlencoded;

use super::StacSettings;

/// Base URLs and preserved query string of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// STAC base URL, without trailing slash.
    pub stac_url: String,
    /// Asset file-root URL.
    pub file_root: String,
    /// `?key=value` suffix carried onto links and asset hrefs, or empty.
    pub query_suffix: String,
}

impl RequestContext {
    pub fn new(
        stac_url: impl Into<String>,
        file_root: impl Into<String>,
        query_suffix: impl Into<String>,
    ) -> Self {
        Self {
            stac_url: stac_url.into().trim_end_matches('/').to_string(),
            file_root: file_root.into(),
            query_suffix: query_suffix.into(),
        }
    }

    /// Resolve the context from the `X-Stac-Url` and `X-Script-Name` override
    /// headers and the request query string, falling back to configured
    /// defaults.
    pub fn resolve(
        stac_url: Option<&str>,
        file_root: Option<&str>,
        query: Option<&str>,
        settings: &StacSettings,
    ) -> Self {
        let preserved = query
            .map(|q| preserved_query(q, &settings.preserved_query))
            .unwrap_or_default();

        Self::new(
            stac_url.unwrap_or(&settings.base_url),
            file_root.unwrap_or(&settings.file_root),
            preserved,
        )
    }

    /// `{stac_url}{path}{query}`.
    pub fn href(&self, path: &str) -> String {
        format!("{}{}{}", self.stac_url, path, self.query_suffix)
    }

    /// Landing page URL without the preserved query.
    pub fn root(&self) -> String {
        format!("{}/", self.stac_url)
    }
}

/// Keep only the preserved keys of a query string, re-encoded with a leading
/// `?`. Empty when none are present.
fn preserved_query(query: &str, keys: &[String]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    let mut kept = 0;

    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if keys.iter().any(|k| *k == key) {
            serializer.append_pair(&key, &value);
            kept += 1;
        }
    }

    if kept == 0 {
        String::new()
    } else {
        format!("?{}", serializer.finish())
    }
}
