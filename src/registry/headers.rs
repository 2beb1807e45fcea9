use anyhow::{Context, Result};
use reqwest::header::{
    ACCEPT, ACCEPT_ENCODING, CONNECTION, HeaderMap, HeaderName, HeaderValue, USER_AGENT,
};

pub(crate) const DOCKER_MANIFEST_V2: &str = "application/vnd.docker.distribution.manifest.v2+json";

pub(crate) static DOCKER_CONTENT_DIGEST: HeaderName =
    HeaderName::from_static("docker-content-digest");

/// The two header sets sent to the registry.
///
/// Registries pick the manifest variant (and therefore the digest) from the
/// `Accept` header, so manifest reads always ask for the V2 media type and
/// nothing is ever compressed.
#[derive(Debug, Clone)]
pub(crate) struct RequestHeaders {
    pub generic: HeaderMap,
    pub manifest: HeaderMap,
}

impl RequestHeaders {
    pub fn new(user_agent: &str) -> Result<Self> {
        let user_agent = HeaderValue::from_str(user_agent)
            .with_context(|| format!("Invalid user agent: {user_agent}"))?;

        let mut generic = HeaderMap::new();
        generic.insert(USER_AGENT, user_agent);
        generic.insert(ACCEPT, HeaderValue::from_static("*/*"));
        generic.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        generic.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

        let mut manifest = generic.clone();
        manifest.insert(ACCEPT, HeaderValue::from_static(DOCKER_MANIFEST_V2));

        Ok(Self { generic, manifest })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_headers_only_differ_in_accept() {
        let headers = RequestHeaders::new("curl/8.7.1").unwrap();

        assert_eq!(headers.generic[ACCEPT], "*/*");
        assert_eq!(headers.manifest[ACCEPT], DOCKER_MANIFEST_V2);

        for name in [USER_AGENT, CONNECTION, ACCEPT_ENCODING] {
            assert_eq!(headers.generic[&name], headers.manifest[&name]);
        }

        assert_eq!(headers.generic[USER_AGENT], "curl/8.7.1");
        assert_eq!(headers.generic[ACCEPT_ENCODING], "identity");
    }

    #[test]
    fn rejects_unprintable_user_agent() {
        assert!(RequestHeaders::new("bad\nagent").is_err());
    }
}
