//! Request extractors shared by the STAC handlers.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;

use crate::catalog::AccessPolicy;
use crate::stac::RequestContext;
use crate::state::AppState;

/// Header carrying an alternate STAC base URL.
pub const STAC_URL_HEADER: &str = "x-stac-url";

/// Header carrying an alternate asset file-root URL.
pub const FILE_ROOT_HEADER: &str = "x-script-name";

/// Header carrying the caller's roles, set by a trusted auth proxy.
pub const ROLES_HEADER: &str = "x-stac-roles";

/// Roles of the calling principal.
///
/// Empty for anonymous callers. Populated from `X-Stac-Roles` only when the
/// deployment trusts that header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerRoles(pub Vec<String>);

impl CallerRoles {
    pub fn policy(&self) -> AccessPolicy {
        AccessPolicy::from_roles(&self.0)
    }

    fn from_headers(headers: &HeaderMap) -> Self {
        let roles = header_str(headers, ROLES_HEADER)
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|role| !role.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self(roles)
    }
}

impl FromRequestParts<AppState> for CallerRoles {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if !state.config().trust_role_header {
            return Ok(Self::default());
        }

        Ok(Self::from_headers(&parts.headers))
    }
}

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(RequestContext::resolve(
            header_str(&parts.headers, STAC_URL_HEADER),
            header_str(&parts.headers, FILE_ROOT_HEADER),
            parts.uri.query(),
            state.presenter().settings(),
        ))
    }
}

/// Non-empty header value as text.
fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn roles_split_and_trimmed() {
        let mut headers = HeaderMap::new();
        headers.insert(ROLES_HEADER, HeaderValue::from_static("S2-16D-2, ,LC8-30D-1 "));

        let roles = CallerRoles::from_headers(&headers);
        assert_eq!(roles.0, vec!["S2-16D-2", "LC8-30D-1"]);
        assert_eq!(
            roles.policy(),
            AccessPolicy::Restricted(vec!["S2-16D-2".into(), "LC8-30D-1".into()])
        );
    }

    #[test]
    fn missing_header_is_anonymous() {
        let roles = CallerRoles::from_headers(&HeaderMap::new());
        assert!(roles.0.is_empty());
        assert_eq!(roles.policy(), AccessPolicy::anonymous());
    }
}
