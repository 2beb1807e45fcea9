use std::sync::LazyLock;
use std::task::{Context, Poll};

use http::{Request, Response, Uri};
use percent_encoding::{NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use regex::{Captures, Regex};
use tower::Service;

// /delete/team/app/latest -> /delete/team%2Fapp/latest
static DELETE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^/delete/)(.+)(/[^/]+$)").expect("valid regex"));

/// Folds the slash separated repository name in a delete path into a single
/// path segment, so the router can match it as one parameter.
#[derive(Clone)]
pub(crate) struct RewriteUriLayer;

impl<S> tower::Layer<S> for RewriteUriLayer {
    type Service = RewriteUriService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RewriteUriService { inner }
    }
}

#[derive(Clone)]
pub(crate) struct RewriteUriService<S> {
    inner: S,
}

fn rewrite(uri: &Uri) -> Option<Uri> {
    let path = uri.path();

    if !DELETE_PATH.is_match(path) {
        return None;
    }

    let result = DELETE_PATH.replace(path, |caps: &Captures| {
        let prefix = &caps[1];
        // Clients may have encoded the name already.
        let repository = percent_decode_str(&caps[2]).decode_utf8_lossy();
        let encoded = utf8_percent_encode(&repository, NON_ALPHANUMERIC).to_string();
        let suffix = &caps[3];

        format!("{prefix}{encoded}{suffix}")
    });

    let rewritten = match uri.query() {
        Some(query) => format!("{result}?{query}"),
        None => result.into_owned(),
    };

    rewritten.parse::<Uri>().ok()
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RewriteUriService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    #[inline]
    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        if let Some(uri) = rewrite(req.uri()) {
            *req.uri_mut() = uri;
        }

        self.inner.call(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        extract::{Path, Query},
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Debug, Deserialize)]
    pub struct DeletePath {
        repository: String,
        tag: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct QueryRequest {
        bob: Option<String>,
    }

    pub(crate) async fn echo_path(
        Path(DeletePath { repository, tag }): Path<DeletePath>,
        Query(QueryRequest { bob }): Query<QueryRequest>,
    ) -> String {
        format!("{repository}:{tag}\n{bob:?}")
    }

    async fn call(uri: &str) -> (StatusCode, String) {
        let app = Router::new().route(
            "/delete/{repository}/{tag}",
            axum::routing::delete(echo_path),
        );

        let app = tower::ServiceBuilder::new()
            .layer(RewriteUriLayer)
            .service(app);

        let req = Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .unwrap();

        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let body = res.into_body().collect().await.unwrap().to_bytes();

        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_uri_rewriting() {
        assert_eq!(
            call("/delete/some/repo/latest").await,
            (StatusCode::OK, "some/repo:latest\nNone".to_string())
        );
        assert_eq!(
            call("/delete/alpine/3.20").await,
            (StatusCode::OK, "alpine:3.20\nNone".to_string())
        );
    }

    #[tokio::test]
    async fn test_uri_rewriting_with_query() {
        assert_eq!(
            call("/delete/a/b/c/v1?bob=uncertain").await,
            (StatusCode::OK, "a/b/c:v1\nSome(\"uncertain\")".to_string())
        );
    }

    #[tokio::test]
    async fn already_encoded_repository() {
        assert_eq!(
            call("/delete/team%2Fapp/v1").await,
            (StatusCode::OK, "team/app:v1\nNone".to_string())
        );
        assert_eq!(
            call("/delete/org/team%2Fapp/v1").await,
            (StatusCode::OK, "org/team/app:v1\nNone".to_string())
        );
    }

    #[test]
    fn other_paths_untouched() {
        assert!(rewrite(&"/api/images".parse().unwrap()).is_none());
        assert!(rewrite(&"/health/liveness".parse().unwrap()).is_none());
    }
}
