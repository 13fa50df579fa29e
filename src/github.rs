//! GitHub issue creation
//!
//! Files the tracking issue over the REST v3 API and attaches it to a
//! Projects-V2 board with a GraphQL mutation. Only what the tracking
//! workflow needs: create, resolve the node ID, add to board.

use crate::{BundlewatchError, Result};
use anyhow::Context;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Per-request timeout for GraphQL calls
const GRAPHQL_TIMEOUT: Duration = Duration::from_secs(30);
/// Per-request timeout for issue creation
const WRITE_TIMEOUT: Duration = Duration::from_secs(15);

const REST_BASE_URL: &str = "https://api.github.com";
const GRAPHQL_URL: &str = "https://api.github.com/graphql";

/// GitHub API client scoped to issue filing
pub struct GithubClient {
    client: Client,
    token: String,
}

/// Created issue (REST API format, reduced to what callers use)
#[derive(Debug, Clone, Deserialize)]
pub struct GithubIssue {
    pub number: u64,
    #[serde(default)]
    pub node_id: Option<String>,
    pub title: String,
    pub html_url: String,
}

/// Issue creation request
#[derive(Debug, Clone, Serialize)]
pub struct CreateIssueRequest {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
}

/// GraphQL response wrapper
#[derive(Debug, Clone, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLError>>,
}

#[derive(Debug, Clone, Deserialize)]
struct GraphQLError {
    message: String,
}

#[derive(Debug, Clone, Deserialize)]
struct IssueIdData {
    repository: IssueIdRepository,
}

#[derive(Debug, Clone, Deserialize)]
struct IssueIdRepository {
    issue: IssueIdNode,
}

#[derive(Debug, Clone, Deserialize)]
struct IssueIdNode {
    id: String,
}

#[derive(Debug, Clone, Deserialize)]
struct AddItemData {
    #[serde(rename = "addProjectV2ItemById")]
    add_item: AddItemPayload,
}

#[derive(Debug, Clone, Deserialize)]
struct AddItemPayload {
    item: AddedItem,
}

#[derive(Debug, Clone, Deserialize)]
struct AddedItem {
    id: String,
}

impl GithubClient {
    /// Create a new client authenticated with an OAuth token.
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers({
                let mut headers = header::HeaderMap::new();
                headers.insert(
                    header::USER_AGENT,
                    header::HeaderValue::from_static("bundlewatch/0.3"),
                );
                headers.insert(
                    header::ACCEPT,
                    header::HeaderValue::from_static("application/vnd.github.v3+json"),
                );
                headers
            })
            .build()?;

        Ok(Self {
            client,
            token: token.into(),
        })
    }

    /// Create an issue and add it to a project board; returns the issue.
    pub async fn create_issue_in_board(
        &self,
        repo: &str,
        title: &str,
        body: &str,
        labels: &[String],
        board_id: &str,
    ) -> Result<GithubIssue> {
        let request = CreateIssueRequest {
            title: title.to_string(),
            body: Some(body.to_string()),
            labels: if labels.is_empty() {
                None
            } else {
                Some(labels.to_vec())
            },
        };

        let issue = self.create_issue(repo, request).await?;

        let node_id = match &issue.node_id {
            Some(id) => id.clone(),
            None => self.issue_node_id(repo, issue.number).await?,
        };
        self.add_issue_to_board(&node_id, board_id).await?;

        Ok(issue)
    }

    /// Create a new issue (REST API)
    pub async fn create_issue(
        &self,
        repo: &str,
        request: CreateIssueRequest,
    ) -> Result<GithubIssue> {
        let url = format!("{}/repos/{}/issues", REST_BASE_URL, repo);

        info!(repo = %repo, title = %request.title, "creating GitHub issue");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&request)
            .timeout(WRITE_TIMEOUT)
            .send()
            .await?;

        match response.status() {
            StatusCode::CREATED => {
                let issue: GithubIssue = response.json().await?;
                info!(number = issue.number, "GitHub issue created");
                Ok(issue)
            }
            StatusCode::UNAUTHORIZED => Err(BundlewatchError::GitHub(
                "GitHub authentication failed".to_string(),
            )),
            StatusCode::NOT_FOUND => Err(BundlewatchError::GitHub(format!(
                "repository not found: {}",
                repo
            ))),
            status => {
                let error_body = response.text().await.unwrap_or_default();
                Err(BundlewatchError::GitHub(format!(
                    "create issue failed: HTTP {}: {}",
                    status, error_body
                )))
            }
        }
    }

    /// Resolve an issue number to its GraphQL node ID
    pub async fn issue_node_id(&self, repo: &str, number: u64) -> Result<String> {
        let (owner, name) = repo
            .split_once('/')
            .with_context(|| format!("repository {:?} is not in owner/repo form", repo))?;

        let query = r#"
            query($owner: String!, $repo: String!, $number: Int!) {
                repository(owner: $owner, name: $repo) {
                    issue(number: $number) { id }
                }
            }
        "#;

        let variables = serde_json::json!({
            "owner": owner,
            "repo": name,
            "number": number,
        });

        let data: IssueIdData = self.graphql(query, variables).await?;
        Ok(data.repository.issue.id)
    }

    /// Add an issue to a Projects-V2 board; returns the created item ID
    pub async fn add_issue_to_board(&self, issue_node_id: &str, board_id: &str) -> Result<String> {
        let mutation = r#"
            mutation($issue_id: ID!, $board_id: ID!) {
                addProjectV2ItemById(input: {contentId: $issue_id, projectId: $board_id}) {
                    item { id }
                }
            }
        "#;

        let variables = serde_json::json!({
            "issue_id": issue_node_id,
            "board_id": board_id,
        });

        debug!(issue = %issue_node_id, board = %board_id, "adding issue to board");

        let data: AddItemData = self.graphql(mutation, variables).await?;
        Ok(data.add_item.item.id)
    }

    /// Execute a GraphQL query
    async fn graphql<T: for<'de> Deserialize<'de>>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T> {
        let body = serde_json::json!({
            "query": query,
            "variables": variables,
        });

        let response = self
            .client
            .post(GRAPHQL_URL)
            .bearer_auth(&self.token)
            .json(&body)
            .timeout(GRAPHQL_TIMEOUT)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let result: GraphQLResponse<T> = response.json().await?;
                if let Some(errors) = result.errors {
                    let message = errors
                        .iter()
                        .map(|e| e.message.clone())
                        .collect::<Vec<_>>()
                        .join("; ");
                    return Err(BundlewatchError::GitHub(format!(
                        "GraphQL error: {}",
                        message
                    )));
                }
                result.data.ok_or_else(|| {
                    BundlewatchError::GitHub("no data in GraphQL response".to_string())
                })
            }
            StatusCode::UNAUTHORIZED => Err(BundlewatchError::GitHub(
                "GitHub authentication failed".to_string(),
            )),
            status => {
                let error_body = response.text().await.unwrap_or_default();
                Err(BundlewatchError::GitHub(format!(
                    "GraphQL request failed: HTTP {}: {}",
                    status, error_body
                )))
            }
        }
    }
}
