//! GitHub REST API implementation of [`RepositoryHost`]

use super::{
    BranchCreation, FileFetch, FileUpdate, NewPullRequest, PrCreation, PullRequest, RepoId,
    RepositoryHost,
};
use crate::error::{HostingError, HttpError};
use crate::manifest::{decode_content, encode_content};
use crate::registry::{HttpClient, DEFAULT_USER_AGENT};
use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Public GitHub API base URL
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Media type requested from the API
pub const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// GitHub service using the shared HTTP client
#[derive(Debug, Clone)]
pub struct GitHubHost {
    client: HttpClient,
    api_url: String,
}

#[derive(Deserialize)]
struct RepoResponse {
    default_branch: Option<String>,
}

#[derive(Deserialize)]
struct RefObject {
    sha: String,
}

#[derive(Deserialize)]
struct RefResponse {
    object: RefObject,
}

#[derive(Deserialize)]
struct ContentsResponse {
    sha: String,
    content: Option<String>,
    encoding: Option<String>,
}

#[derive(Deserialize)]
struct CommitRef {
    sha: String,
}

#[derive(Deserialize)]
struct PutContentsResponse {
    commit: CommitRef,
}

#[derive(Serialize)]
struct CreateRefPayload<'a> {
    #[serde(rename = "ref")]
    git_ref: String,
    sha: &'a str,
}

#[derive(Serialize)]
struct PutContentsPayload<'a> {
    message: &'a str,
    content: String,
    sha: &'a str,
    branch: &'a str,
}

#[derive(Serialize)]
struct CreatePullPayload<'a> {
    title: &'a str,
    body: &'a str,
    head: &'a str,
    base: &'a str,
}

impl GitHubHost {
    /// Create a GitHub service authenticating with `token`
    pub fn new(
        token: &str,
        api_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, HttpError> {
        let client = HttpClient::with_config(timeout, DEFAULT_USER_AGENT)?
            .with_bearer_token(token)
            .with_accept(GITHUB_ACCEPT);
        Ok(Self::from_client(client, api_url))
    }

    /// Create a GitHub service from a preconfigured client
    pub fn from_client(client: HttpClient, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn repo_url(&self, repo: &RepoId, path: &str) -> String {
        format!("{}/repos/{}/{}{}", self.api_url, repo.owner, repo.name, path)
    }
}

#[async_trait]
impl RepositoryHost for GitHubHost {
    async fn default_branch(&self, repo: &RepoId) -> Result<String, HostingError> {
        let operation = format!("read repository {}", repo);
        let info: RepoResponse = self
            .client
            .get_json(&self.repo_url(repo, ""))
            .await
            .map_err(|e| HostingError::transport(&operation, e))?;

        match info.default_branch {
            Some(branch) if !branch.is_empty() => Ok(branch),
            _ => {
                tracing::debug!(%repo, "no default_branch in response, assuming main");
                Ok("main".to_string())
            }
        }
    }

    async fn branch_head(&self, repo: &RepoId, branch: &str) -> Result<String, HostingError> {
        let url = self.repo_url(repo, &format!("/git/ref/heads/{}", branch));
        let reference: RefResponse = self
            .client
            .get_json(&url)
            .await
            .map_err(|e| HostingError::transport(format!("read head of {}", branch), e))?;
        Ok(reference.object.sha)
    }

    async fn fetch_file(
        &self,
        repo: &RepoId,
        path: &str,
        git_ref: &str,
    ) -> Result<FileFetch, HostingError> {
        let operation = format!("read {}", path);
        let url = self.repo_url(
            repo,
            &format!("/contents/{}?ref={}", path, urlencoding::encode(git_ref)),
        );

        let contents: ContentsResponse = match self.client.get_json(&url).await {
            Ok(contents) => contents,
            Err(e) if e.status() == Some(404) => return Ok(FileFetch::NotFound),
            Err(e) => return Err(HostingError::transport(operation, e)),
        };

        if let Some(encoding) = contents.encoding.as_deref() {
            if encoding != "base64" {
                return Err(HostingError::unexpected(
                    operation,
                    format!("unsupported encoding '{}'", encoding),
                ));
            }
        }
        let encoded = contents
            .content
            .ok_or_else(|| HostingError::unexpected(&operation, "missing file content"))?;
        let content = decode_content(path, &encoded)
            .map_err(|e| HostingError::unexpected(&operation, e.to_string()))?;

        Ok(FileFetch::Found {
            content,
            sha: contents.sha,
        })
    }

    async fn create_branch(
        &self,
        repo: &RepoId,
        branch: &str,
        from_sha: &str,
    ) -> Result<BranchCreation, HostingError> {
        let payload = CreateRefPayload {
            git_ref: format!("refs/heads/{}", branch),
            sha: from_sha,
        };
        let result: Result<serde_json::Value, HttpError> = self
            .client
            .send_json(Method::POST, &self.repo_url(repo, "/git/refs"), &payload)
            .await;

        match result {
            Ok(_) => Ok(BranchCreation::Created),
            Err(HttpError::Status { status: 422, body, .. })
                if body.to_lowercase().contains("already exists") =>
            {
                tracing::debug!(branch, "branch already exists");
                Ok(BranchCreation::AlreadyExists)
            }
            Err(e) => Err(HostingError::transport(
                format!("create branch {}", branch),
                e,
            )),
        }
    }

    async fn put_file(&self, repo: &RepoId, update: &FileUpdate) -> Result<String, HostingError> {
        let payload = PutContentsPayload {
            message: &update.message,
            content: encode_content(&update.content),
            sha: &update.sha,
            branch: &update.branch,
        };
        let response: PutContentsResponse = self
            .client
            .send_json(
                Method::PUT,
                &self.repo_url(repo, &format!("/contents/{}", update.path)),
                &payload,
            )
            .await
            .map_err(|e| {
                HostingError::transport(format!("commit {} to {}", update.path, update.branch), e)
            })?;
        Ok(response.commit.sha)
    }

    async fn create_pull_request(
        &self,
        repo: &RepoId,
        pr: &NewPullRequest,
    ) -> Result<PrCreation, HostingError> {
        let payload = CreatePullPayload {
            title: &pr.title,
            body: &pr.body,
            head: &pr.head,
            base: &pr.base,
        };
        let result: Result<PullRequest, HttpError> = self
            .client
            .send_json(Method::POST, &self.repo_url(repo, "/pulls"), &payload)
            .await;

        match result {
            Ok(created) => Ok(PrCreation::Created(created)),
            Err(HttpError::Status { status: 422, body, .. })
                if body.to_lowercase().contains("already exists") =>
            {
                Ok(PrCreation::AlreadyExists)
            }
            Err(e) => Err(HostingError::transport(
                format!("open pull request from {}", pr.head),
                e,
            )),
        }
    }

    async fn find_open_pull_request(
        &self,
        repo: &RepoId,
        branch: &str,
    ) -> Result<Option<PullRequest>, HostingError> {
        let head = format!("{}:{}", repo.owner, branch);
        let url = self.repo_url(
            repo,
            &format!("/pulls?head={}&state=open", urlencoding::encode(&head)),
        );
        let pulls: Vec<PullRequest> = self
            .client
            .get_json(&url)
            .await
            .map_err(|e| HostingError::transport(format!("list pull requests for {}", branch), e))?;
        Ok(pulls.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn host(server: &mockito::Server) -> GitHubHost {
        GitHubHost::new("ghp_test", server.url(), Duration::from_secs(5)).unwrap()
    }

    fn repo() -> RepoId {
        RepoId::new("octo", "app")
    }

    #[tokio::test]
    async fn test_default_branch_sends_auth_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/octo/app")
            .match_header("authorization", "Bearer ghp_test")
            .match_header("accept", GITHUB_ACCEPT)
            .with_status(200)
            .with_body(r#"{"default_branch":"develop"}"#)
            .create_async()
            .await;

        assert_eq!(host(&server).default_branch(&repo()).await.unwrap(), "develop");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_default_branch_unreachable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/octo/app")
            .with_status(401)
            .with_body(r#"{"message":"Bad credentials"}"#)
            .create_async()
            .await;

        let err = host(&server).default_branch(&repo()).await.unwrap_err();
        assert!(err.to_string().contains("Bad credentials"));
    }

    #[tokio::test]
    async fn test_branch_head() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/octo/app/git/ref/heads/main")
            .with_status(200)
            .with_body(r#"{"ref":"refs/heads/main","object":{"sha":"abc123","type":"commit"}}"#)
            .create_async()
            .await;

        assert_eq!(
            host(&server).branch_head(&repo(), "main").await.unwrap(),
            "abc123"
        );
    }

    #[tokio::test]
    async fn test_fetch_file_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/octo/app/contents/package.json")
            .match_query(Matcher::UrlEncoded("ref".into(), "main".into()))
            .with_status(200)
            .with_body(format!(
                r#"{{"sha":"filesha","encoding":"base64","content":"{}"}}"#,
                "eyJkZXBlbmRlbmNpZXMiOnt9\\nfQ=="
            ))
            .create_async()
            .await;

        let fetched = host(&server)
            .fetch_file(&repo(), "package.json", "main")
            .await
            .unwrap();
        assert_eq!(
            fetched,
            FileFetch::Found {
                content: r#"{"dependencies":{}}"#.to_string(),
                sha: "filesha".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_fetch_file_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/octo/app/contents/package.json")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"message":"Not Found"}"#)
            .create_async()
            .await;

        let fetched = host(&server)
            .fetch_file(&repo(), "package.json", "main")
            .await
            .unwrap();
        assert_eq!(fetched, FileFetch::NotFound);
    }

    #[tokio::test]
    async fn test_fetch_file_server_error_is_not_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/octo/app/contents/package.json")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let result = host(&server).fetch_file(&repo(), "package.json", "main").await;
        assert!(matches!(result, Err(HostingError::Transport { .. })));
    }

    #[tokio::test]
    async fn test_create_branch_created_and_existing() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/repos/octo/app/git/refs")
            .match_body(Matcher::Json(serde_json::json!({
                "ref": "refs/heads/auto/new",
                "sha": "abc123"
            })))
            .with_status(201)
            .with_body(r#"{"ref":"refs/heads/auto/new","object":{"sha":"abc123"}}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/repos/octo/app/git/refs")
            .match_body(Matcher::PartialJson(
                serde_json::json!({"ref": "refs/heads/auto/old"}),
            ))
            .with_status(422)
            .with_body(r#"{"message":"Reference already exists"}"#)
            .create_async()
            .await;

        let host = host(&server);
        assert_eq!(
            host.create_branch(&repo(), "auto/new", "abc123").await.unwrap(),
            BranchCreation::Created
        );
        assert_eq!(
            host.create_branch(&repo(), "auto/old", "abc123").await.unwrap(),
            BranchCreation::AlreadyExists
        );
    }

    #[tokio::test]
    async fn test_create_branch_other_validation_error_fails() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/repos/octo/app/git/refs")
            .with_status(422)
            .with_body(r#"{"message":"Object does not exist"}"#)
            .create_async()
            .await;

        let result = host(&server)
            .create_branch(&repo(), "auto/new", "badsha")
            .await;
        match result {
            Err(HostingError::Transport { .. }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_put_file_encodes_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/repos/octo/app/contents/package.json")
            .match_body(Matcher::Json(serde_json::json!({
                "message": "bump",
                "content": "eyJkZXBlbmRlbmNpZXMiOnt9fQ==",
                "sha": "filesha",
                "branch": "auto/x"
            })))
            .with_status(200)
            .with_body(r#"{"content":{},"commit":{"sha":"commitsha"}}"#)
            .create_async()
            .await;

        let sha = host(&server)
            .put_file(
                &repo(),
                &FileUpdate {
                    path: "package.json".into(),
                    content: r#"{"dependencies":{}}"#.into(),
                    sha: "filesha".into(),
                    branch: "auto/x".into(),
                    message: "bump".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(sha, "commitsha");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_pull_request_variants() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/repos/octo/app/pulls")
            .match_body(Matcher::PartialJson(serde_json::json!({"head": "fresh"})))
            .with_status(201)
            .with_body(r#"{"number":5,"html_url":"https://github.com/octo/app/pull/5"}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/repos/octo/app/pulls")
            .match_body(Matcher::PartialJson(serde_json::json!({"head": "dup"})))
            .with_status(422)
            .with_body(r#"{"message":"Validation Failed","errors":[{"message":"A pull request already exists for octo:dup."}]}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/repos/octo/app/pulls")
            .match_body(Matcher::PartialJson(serde_json::json!({"head": "empty"})))
            .with_status(422)
            .with_body(r#"{"message":"Validation Failed","errors":[{"message":"No commits between main and empty"}]}"#)
            .create_async()
            .await;

        let host = host(&server);
        let pr = |head: &str| NewPullRequest {
            title: "t".into(),
            body: "b".into(),
            head: head.into(),
            base: "main".into(),
        };

        assert_eq!(
            host.create_pull_request(&repo(), &pr("fresh")).await.unwrap(),
            PrCreation::Created(PullRequest {
                number: 5,
                html_url: "https://github.com/octo/app/pull/5".into()
            })
        );
        assert_eq!(
            host.create_pull_request(&repo(), &pr("dup")).await.unwrap(),
            PrCreation::AlreadyExists
        );
        assert!(host.create_pull_request(&repo(), &pr("empty")).await.is_err());
    }

    #[tokio::test]
    async fn test_find_open_pull_request() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/octo/app/pulls")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("head".into(), "octo:auto/x".into()),
                Matcher::UrlEncoded("state".into(), "open".into()),
            ]))
            .with_status(200)
            .with_body(r#"[{"number":9,"html_url":"https://github.com/octo/app/pull/9"}]"#)
            .create_async()
            .await;

        let found = host(&server)
            .find_open_pull_request(&repo(), "auto/x")
            .await
            .unwrap();
        assert_eq!(found.map(|p| p.number), Some(9));
    }
}
