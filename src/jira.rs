//! JIRA REST client for ticket creation.

use anyhow::{bail, Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::JiraConfig;

#[derive(Serialize)]
struct Issue {
    fields: Fields,
}

#[derive(Serialize)]
struct Fields {
    project: ProjectRef,
    summary: String,
    description: String,
    issuetype: IssueTypeRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    assignee: Option<AssigneeRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent: Option<ParentRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    labels: Vec<String>,
}

#[derive(Serialize)]
struct ProjectRef {
    key: String,
}

#[derive(Serialize)]
struct IssueTypeRef {
    name: String,
}

#[derive(Serialize)]
struct AssigneeRef {
    #[serde(rename = "accountId")]
    account_id: String,
}

#[derive(Serialize)]
struct ParentRef {
    key: String,
}

#[derive(Deserialize)]
struct CreatedIssue {
    key: String,
}

#[derive(Deserialize)]
struct AssignableUser {
    #[serde(rename = "accountId")]
    account_id: String,
}

/// Thin client over the JIRA REST v2 API.
pub struct JiraClient {
    http: reqwest::Client,
    config: JiraConfig,
}

impl JiraClient {
    pub fn new(config: JiraConfig) -> Result<Self> {
        if config.api_token.is_empty() || config.username.is_empty() {
            bail!("JIRA API credentials not set");
        }
        if config.project_key.is_empty() {
            bail!("JIRA project key not set");
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http, config })
    }

    /// Create a ticket and return its browse URL. A missing assignee is a
    /// warning, not an error.
    pub async fn create_ticket(
        &self,
        title: &str,
        description: &str,
        assignee: &str,
        parent: &str,
    ) -> Result<String> {
        let issue_type = if self.config.issue_type.is_empty() {
            "Task".to_string()
        } else {
            self.config.issue_type.clone()
        };

        // Sub-tasks inherit labels from their parent; only standalone
        // tickets get tagged.
        let labels = if issue_type.eq_ignore_ascii_case("sub-task") {
            Vec::new()
        } else {
            vec![
                "CI/CD".to_string(),
                "automation".to_string(),
                "git-report".to_string(),
            ]
        };

        let assignee_ref = if assignee.is_empty() {
            None
        } else {
            match self.find_assignable_user(assignee).await {
                Ok(account_id) => Some(AssigneeRef { account_id }),
                Err(err) => {
                    warn!("Unable to find user {}: {}", assignee, err);
                    None
                }
            }
        };

        let issue = Issue {
            fields: Fields {
                project: ProjectRef {
                    key: self.config.project_key.clone(),
                },
                summary: title.to_string(),
                description: description.to_string(),
                issuetype: IssueTypeRef { name: issue_type },
                assignee: assignee_ref,
                parent: (!parent.is_empty()).then(|| ParentRef {
                    key: parent.to_string(),
                }),
                labels,
            },
        };

        let url = format!("{}/rest/api/2/issue", self.config.base_url);
        debug!("Creating JIRA ticket '{}' via {}", title, url);
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.config.username, Some(&self.config.api_token))
            .json(&issue)
            .send()
            .await
            .context("JIRA request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("JIRA returned {status}: {body}");
        }

        let created: CreatedIssue = response
            .json()
            .await
            .context("Failed to decode JIRA response")?;
        Ok(format!("{}/browse/{}", self.config.base_url, created.key))
    }

    async fn find_assignable_user(&self, query: &str) -> Result<String> {
        let url = format!(
            "{}/rest/api/2/user/assignable/search",
            self.config.base_url
        );
        let users: Vec<AssignableUser> = self
            .http
            .get(&url)
            .basic_auth(&self.config.username, Some(&self.config.api_token))
            .query(&[("query", query), ("project", self.config.project_key.as_str())])
            .send()
            .await
            .context("JIRA user search failed")?
            .error_for_status()
            .context("JIRA user search rejected")?
            .json()
            .await
            .context("Failed to decode JIRA user search response")?;

        users
            .into_iter()
            .next()
            .map(|user| user.account_id)
            .with_context(|| format!("no assignable user matches '{query}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_requires_credentials() {
        assert!(JiraClient::new(JiraConfig::default()).is_err());
        let config = JiraConfig {
            enabled: true,
            base_url: "https://jira.example.com".to_string(),
            username: "bot".to_string(),
            api_token: "token".to_string(),
            project_key: "OPS".to_string(),
            ..JiraConfig::default()
        };
        assert!(JiraClient::new(config).is_ok());
    }

    #[test]
    fn test_issue_payload_shape() {
        let issue = Issue {
            fields: Fields {
                project: ProjectRef {
                    key: "OPS".to_string(),
                },
                summary: "Stale branch".to_string(),
                description: "cleanup".to_string(),
                issuetype: IssueTypeRef {
                    name: "Task".to_string(),
                },
                assignee: None,
                parent: Some(ParentRef {
                    key: "OPS-1".to_string(),
                }),
                labels: vec!["automation".to_string()],
            },
        };
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["fields"]["project"]["key"], "OPS");
        assert_eq!(json["fields"]["issuetype"]["name"], "Task");
        assert_eq!(json["fields"]["parent"]["key"], "OPS-1");
        assert!(json["fields"].get("assignee").is_none());
    }
}
