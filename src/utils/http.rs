use crate::config::ScrapeConfig;
use crate::error::ScrapeError;
use crate::scrape::SearchKeyword;
use reqwest::header::USER_AGENT;
use reqwest::{Client, Response};

/// Build the search results URL for one keyword
pub fn search_url(config: &ScrapeConfig, keyword: &SearchKeyword) -> String {
    format!(
        "{}?q={}&{}",
        config.search_url,
        keyword.query_form(),
        config.query_params
    )
}

/// Send a GET with the given User-Agent and fail on any non-success status
pub async fn get(client: &Client, url: &str, user_agent: &str) -> Result<Response, ScrapeError> {
    let response = client
        .get(url)
        .header(USER_AGENT, user_agent)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(ScrapeError::Status {
            status: response.status(),
            url: url.to_string(),
        });
    }

    Ok(response)
}

/// Fetch a page and return its body as text
pub async fn fetch_page(client: &Client, url: &str, user_agent: &str) -> Result<String, ScrapeError> {
    let response = get(client, url, user_agent).await?;
    Ok(response.text().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn search_url_templates_keyword_and_fixed_params() {
        let config = ScrapeConfig {
            search_url: "http://engine.test/search".to_string(),
            query_params: "tbm=isch&dpr=1".to_string(),
            ..ScrapeConfig::default()
        };
        let keyword = SearchKeyword::new("red car");

        assert_eq!(
            search_url(&config, &keyword),
            "http://engine.test/search?q=red%20car&tbm=isch&dpr=1"
        );
    }

    #[tokio::test]
    async fn fetch_page_sends_user_agent() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "clio"))
            .and(header("user-agent", "TestAgent/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = Client::new();
        let url = format!("{}/search?q=clio", mock_server.uri());
        let body = fetch_page(&client, &url, "TestAgent/1.0").await.unwrap();

        assert_eq!(body, "<html>ok</html>");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let client = Client::new();
        let err = fetch_page(&client, &mock_server.uri(), "TestAgent/1.0")
            .await
            .unwrap_err();

        match err {
            ScrapeError::Status { status, .. } => assert_eq!(status.as_u16(), 503),
            other => panic!("unexpected error: {}", other),
        }
    }
}
