//! HTTP timeline client
//!
//! This module handles all requests to the platform API:
//! - Building the shared HTTP client with the configured user agent and timeouts
//! - Building channel timeline and like-list URLs
//! - Fetching one page and classifying failures

use crate::config::RemoteConfig;
use crate::media::{Feed, TimelinePage};
use crate::remote::SessionProvider;
use crate::BackupError;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Produces pages of a profile's timeline or like-list
///
/// Pages are numbered from 1. Implementations perform no retries.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(
        &self,
        feed: Feed,
        profile: &str,
        page: u32,
    ) -> Result<TimelinePage, BackupError>;
}

/// Builds an HTTP client with proper configuration
///
/// The same client is used for timeline pages and media downloads.
pub fn build_http_client(config: &RemoteConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// `PageSource` backed by the platform's v2 timeline API
pub struct TimelineClient {
    client: Client,
    base_url: Url,
    session: Arc<dyn SessionProvider>,
}

impl TimelineClient {
    pub fn new(
        client: Client,
        base_url: &str,
        session: Arc<dyn SessionProvider>,
    ) -> Result<Self, BackupError> {
        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
            session,
        })
    }

    /// Builds the request URL for one page of a feed
    ///
    /// The like-list endpoint is scoped by the session, not by the profile in
    /// the path; the profile only labels the stored records.
    pub fn timeline_url(&self, feed: Feed, profile: &str, page: u32) -> Result<Url, BackupError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let mut url = match feed {
            Feed::Channel => Url::parse(&format!("{}/api/v2/timeline/channel/{}", base, profile))?,
            Feed::Likes => Url::parse(&format!("{}/api/v2/timeline/likes", base))?,
        };

        {
            let mut query = url.query_pairs_mut();
            match feed {
                Feed::Channel => {
                    query
                        .append_pair("order_by", "newest")
                        .append_pair("permalink", profile)
                        .append_pair("type", "");
                }
                Feed::Likes => {
                    query.append_pair("all", "true").append_pair("order_by", "date");
                }
            }
            query.append_pair("page", &page.to_string());
        }

        Ok(url)
    }
}

#[async_trait]
impl PageSource for TimelineClient {
    async fn fetch_page(
        &self,
        feed: Feed,
        profile: &str,
        page: u32,
    ) -> Result<TimelinePage, BackupError> {
        let url = self.timeline_url(feed, profile, page)?;
        let headers = self.session.headers()?;

        tracing::debug!(%url, "Requesting timeline page");

        let response = self
            .client
            .get(url.clone())
            .headers(headers)
            .send()
            .await
            .map_err(|source| BackupError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackupError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|source| BackupError::Http {
            url: url.to_string(),
            source,
        })?;

        TimelinePage::from_slice(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::HeaderTemplate;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_config() -> RemoteConfig {
        RemoteConfig {
            base_url: "https://coub.com".to_string(),
            user_agent: "coub-backup-test/1.0".to_string(),
            timeout_secs: 5,
            headers_file: None,
        }
    }

    fn client_for(base_url: &str, session: HeaderTemplate) -> TimelineClient {
        let client = build_http_client(&create_test_config()).unwrap();
        TimelineClient::new(client, base_url, Arc::new(session)).unwrap()
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(&create_test_config()).is_ok());
    }

    #[test]
    fn test_channel_url() {
        let client = client_for("https://coub.com/", HeaderTemplate::empty());
        let url = client.timeline_url(Feed::Channel, "alice", 3).unwrap();
        assert_eq!(
            url.as_str(),
            "https://coub.com/api/v2/timeline/channel/alice?order_by=newest&permalink=alice&type=&page=3"
        );
    }

    #[test]
    fn test_likes_url() {
        let client = client_for("https://coub.com", HeaderTemplate::empty());
        let url = client.timeline_url(Feed::Likes, "alice", 1).unwrap();
        assert_eq!(
            url.as_str(),
            "https://coub.com/api/v2/timeline/likes?all=true&order_by=date&page=1"
        );
    }

    #[tokio::test]
    async fn test_fetch_page_sends_session_headers() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v2/timeline/channel/alice"))
            .and(query_param("page", "2"))
            .and(header("cookie", "session=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"page": 2, "per_page": 10, "total_pages": 4, "coubs": []}"#,
            ))
            .expect(1)
            .mount(&mock_server)
            .await;

        let session = HeaderTemplate::parse("Cookie: session=abc").unwrap();
        let client = client_for(&mock_server.uri(), session);
        let page = client.fetch_page(Feed::Channel, "alice", 2).await.unwrap();

        assert_eq!(page.page, 2);
        assert_eq!(page.total_pages, 4);
        assert!(page.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_page_non_success_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server.uri(), HeaderTemplate::empty());
        let err = client.fetch_page(Feed::Likes, "alice", 1).await.unwrap_err();

        assert!(matches!(err, BackupError::Status { status: 403, .. }));
        assert!(err.is_fetch());
    }

    #[tokio::test]
    async fn test_fetch_page_malformed_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server.uri(), HeaderTemplate::empty());
        let err = client.fetch_page(Feed::Channel, "alice", 1).await.unwrap_err();

        assert!(matches!(err, BackupError::Decode { .. }));
    }
}
