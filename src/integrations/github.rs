//! GitHub search adapter
//!
//! Runs an issue search through the GraphQL API and returns issues and pull
//! requests as flat [`SearchResult`]s.

use super::{check_status, request_error};
use crate::{NirvanaError, Result};
use reqwest::{header, Client};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Per-request timeout for GraphQL queries (can return large result sets)
const GRAPHQL_TIMEOUT: Duration = Duration::from_secs(30);

/// GitHub caps a single search page at 100 nodes
const PAGE_SIZE: u32 = 100;

const SEARCH_QUERY: &str = r#"
    query($query: String!, $first: Int!, $after: String) {
        search(query: $query, type: ISSUE, first: $first, after: $after) {
            issueCount
            pageInfo { hasNextPage endCursor }
            nodes {
                __typename
                ... on Issue {
                    id
                    number
                    title
                    url
                    repository { nameWithOwner }
                }
                ... on PullRequest {
                    id
                    number
                    title
                    url
                    repository { nameWithOwner }
                }
            }
        }
    }
"#;

/// GitHub API client
pub struct GitHubAdapter {
    client: Client,
    graphql_url: String,
    auth_token: String,
}

/// One issue or pull request returned by a search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub id: String,
    pub number: u64,
    pub title: String,
    pub url: String,
    pub repository_full_name: String,
    pub is_pull_request: bool,
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
struct SearchData {
    search: SearchConnection,
}

#[derive(Debug, Clone, Deserialize)]
struct SearchConnection {
    #[serde(rename = "issueCount")]
    issue_count: u32,
    #[serde(rename = "pageInfo")]
    page_info: PageInfo,
    /// Entries are null when the token cannot see the result
    nodes: Vec<Option<SearchNode>>,
}

#[derive(Debug, Clone, Deserialize)]
struct PageInfo {
    #[serde(rename = "hasNextPage")]
    has_next_page: bool,
    #[serde(rename = "endCursor")]
    end_cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "__typename")]
enum SearchNode {
    Issue(IssueNode),
    PullRequest(IssueNode),
    #[serde(other)]
    Other,
}

/// Issue or pull request node from GraphQL
#[derive(Debug, Clone, Deserialize)]
struct IssueNode {
    id: String,
    number: u64,
    title: String,
    url: String,
    repository: RepositoryNode,
}

#[derive(Debug, Clone, Deserialize)]
struct RepositoryNode {
    #[serde(rename = "nameWithOwner")]
    name_with_owner: String,
}

impl SearchNode {
    fn into_result(self) -> Option<SearchResult> {
        let (node, is_pull_request) = match self {
            SearchNode::Issue(node) => (node, false),
            SearchNode::PullRequest(node) => (node, true),
            SearchNode::Other => return None,
        };
        Some(SearchResult {
            id: node.id,
            number: node.number,
            title: node.title,
            url: node.url,
            repository_full_name: node.repository.name_with_owner,
            is_pull_request,
        })
    }
}

impl GitHubAdapter {
    /// Create a new GitHub adapter
    ///
    /// `url` is the instance URL: `https://github.com`, `https://api.github.com`
    /// or a GitHub Enterprise host.
    pub fn new(url: &str, token: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers({
                let mut headers = header::HeaderMap::new();
                headers.insert(
                    header::USER_AGENT,
                    header::HeaderValue::from_static("nirvana/0.3"),
                );
                headers
            })
            .build()?;

        Ok(Self {
            client,
            graphql_url: Self::graphql_url_for(url),
            auth_token: token.into(),
        })
    }

    fn graphql_url_for(url: &str) -> String {
        let base_url = url.trim_end_matches('/');
        if base_url.contains("github.com") {
            "https://api.github.com/graphql".to_string()
        } else {
            format!("{}/api/graphql", base_url)
        }
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
            .post(&self.graphql_url)
            .bearer_auth(&self.auth_token)
            .json(&body)
            .timeout(GRAPHQL_TIMEOUT)
            .send()
            .await
            .map_err(request_error)?;

        let response = check_status(response, "GitHub").await?;
        let result: GraphQLResponse<T> = response.json().await.map_err(request_error)?;
        if let Some(errors) = result.errors {
            let error_msg = errors
                .iter()
                .map(|e| e.message.clone())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(NirvanaError::Integration(format!(
                "GraphQL error: {}",
                error_msg
            )));
        }
        result
            .data
            .ok_or_else(|| NirvanaError::Integration("No data in GraphQL response".to_string()))
    }

    /// Run a search and return up to `limit` issues and pull requests
    pub async fn search_all(&self, query: &str, limit: u32) -> Result<Vec<SearchResult>> {
        let mut results = Vec::new();
        let mut after: Option<String> = None;
        let mut total = 0;

        while (results.len() as u32) < limit {
            let first = (limit - results.len() as u32).min(PAGE_SIZE);
            let variables = serde_json::json!({
                "query": query,
                "first": first,
                "after": after,
            });

            debug!(query = %query, first = %first, after = ?after, "Searching GitHub");

            let data: SearchData = self.graphql(SEARCH_QUERY, variables).await?;
            let page_len = data.search.nodes.len();
            total = data.search.issue_count;
            results.extend(
                data.search
                    .nodes
                    .into_iter()
                    .flatten()
                    .filter_map(SearchNode::into_result),
            );

            info!(
                count = data.search.issue_count,
                returned = page_len,
                "GitHub search page complete"
            );

            match data.search.page_info.end_cursor {
                Some(cursor) if data.search.page_info.has_next_page && page_len > 0 => {
                    after = Some(cursor)
                }
                _ => break,
            }
        }

        if total > limit {
            warn!(
                total = total,
                limit = limit,
                "GitHub search matched more results than the limit; results past it \
                 are treated as closed and their items completed. Raise github.limit"
            );
        }

        results.truncate(limit as usize);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_creation() {
        let adapter = GitHubAdapter::new("https://github.com", "token").unwrap();
        assert_eq!(adapter.graphql_url, "https://api.github.com/graphql");

        let adapter = GitHubAdapter::new("https://api.github.com/", "token").unwrap();
        assert_eq!(adapter.graphql_url, "https://api.github.com/graphql");
    }

    #[test]
    fn test_enterprise_urls() {
        let adapter = GitHubAdapter::new("https://github.example.com/", "token").unwrap();
        assert_eq!(
            adapter.graphql_url,
            "https://github.example.com/api/graphql"
        );
    }

    #[test]
    fn test_parse_search_page() {
        let body = r#"{
            "data": {
                "search": {
                    "issueCount": 3,
                    "pageInfo": { "hasNextPage": false, "endCursor": "Y3Vyc29yOjM=" },
                    "nodes": [
                        {
                            "__typename": "Issue",
                            "id": "I_1", "number": 12, "title": "Crash on start",
                            "url": "https://github.com/acme/api/issues/12",
                            "repository": { "nameWithOwner": "acme/api" }
                        },
                        {
                            "__typename": "PullRequest",
                            "id": "PR_1", "number": 13, "title": "Fix crash",
                            "url": "https://github.com/acme/api/pull/13",
                            "repository": { "nameWithOwner": "acme/api" }
                        },
                        { "__typename": "Discussion" }
                    ]
                }
            }
        }"#;

        let response: GraphQLResponse<SearchData> = serde_json::from_str(body).unwrap();
        let results: Vec<SearchResult> = response
            .data
            .unwrap()
            .search
            .nodes
            .into_iter()
            .flatten()
            .filter_map(SearchNode::into_result)
            .collect();

        assert_eq!(results.len(), 2);
        assert!(!results[0].is_pull_request);
        assert_eq!(results[0].repository_full_name, "acme/api");
        assert!(results[1].is_pull_request);
        assert_eq!(results[1].url, "https://github.com/acme/api/pull/13");
    }

    #[test]
    fn test_parse_page_with_hidden_nodes() {
        let body = r#"{
            "data": {
                "search": {
                    "issueCount": 2,
                    "pageInfo": { "hasNextPage": false, "endCursor": null },
                    "nodes": [
                        null,
                        {
                            "__typename": "Issue",
                            "id": "I_7", "number": 7, "title": "Visible",
                            "url": "https://github.com/acme/web/issues/7",
                            "repository": { "nameWithOwner": "acme/web" }
                        }
                    ]
                }
            }
        }"#;

        let response: GraphQLResponse<SearchData> = serde_json::from_str(body).unwrap();
        let search = response.data.unwrap().search;
        assert_eq!(search.nodes.len(), 2);

        let results: Vec<SearchResult> = search
            .nodes
            .into_iter()
            .flatten()
            .filter_map(SearchNode::into_result)
            .collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].number, 7);
    }

    #[test]
    fn test_parse_graphql_errors() {
        let body = r#"{ "data": null, "errors": [{ "message": "Bad query" }] }"#;
        let response: GraphQLResponse<SearchData> = serde_json::from_str(body).unwrap();
        assert!(response.data.is_none());
        assert_eq!(response.errors.unwrap()[0].message, "Bad query");
    }
}
