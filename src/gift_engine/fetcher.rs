//! Outbound fetch orchestration for the scrape target
//!
//! One GET per search, browser-like headers, rotated user agent and an
//! optional randomized courtesy delay. No automatic retry.

use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::header::HeaderMap;
use reqwest::{redirect, Client};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use tokio::time::sleep;

use crate::gift_engine::{EngineConfig, SearchError};

const SEARCH_PATH: &str = "/busca/";

/// Builds the scrape target URL from the query and an optional affiliate base.
pub fn build_search_url(query: &str, affiliate_base: Option<&str>, default_base: &str) -> String {
    let base = affiliate_base.unwrap_or(default_base);
    let base = base.strip_suffix('/').unwrap_or(base);
    let encoded = utf8_percent_encode(query, NON_ALPHANUMERIC);
    format!("{base}{SEARCH_PATH}{encoded}")
}

pub struct Fetcher {
    config: EngineConfig,
    client: Client,
    user_agents: Vec<String>,
}

impl Fetcher {
    pub fn new(config: EngineConfig) -> Self {
        let user_agents = vec![
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36".to_string(),
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15".to_string(),
        ];

        let mut headers = HeaderMap::new();
        headers.insert("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7".parse().unwrap());
        headers.insert("Accept-Language", "pt-BR,pt;q=0.9,en-US;q=0.8,en;q=0.7".parse().unwrap());
        headers.insert("Connection", "keep-alive".parse().unwrap());
        headers.insert("Upgrade-Insecure-Requests", "1".parse().unwrap());
        headers.insert("Sec-Fetch-Dest", "document".parse().unwrap());
        headers.insert("Sec-Fetch-Mode", "navigate".parse().unwrap());
        headers.insert("Sec-Fetch-Site", "none".parse().unwrap());
        headers.insert("Sec-Fetch-User", "?1".parse().unwrap());
        headers.insert("Cache-Control", "max-age=0".parse().unwrap());
        headers.insert("Referer", "https://www.google.com/".parse().unwrap());
        headers.insert("DNT", "1".parse().unwrap());
        headers.insert("sec-ch-ua", "\"Not_A Brand\";v=\"8\", \"Chromium\";v=\"120\", \"Google Chrome\";v=\"120\"".parse().unwrap());
        headers.insert("sec-ch-ua-mobile", "?0".parse().unwrap());
        headers.insert("sec-ch-ua-platform", "\"Windows\"".parse().unwrap());

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(redirect::Policy::limited(5))
            .default_headers(headers)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            config,
            client,
            user_agents,
        }
    }

    /// Fetches the search-results page, classifying the outcome.
    ///
    /// Exactly 200 yields the body. 403 means the source site blocked the
    /// request; other statuses are surfaced with their code. Transport
    /// failures (including timeouts) become `SearchError::Network`.
    pub async fn fetch(&self, url: &str) -> Result<String, SearchError> {
        if self.config.courtesy_delay {
            let ms = rand::thread_rng()
                .gen_range(self.config.delay_min_ms..=self.config.delay_max_ms);
            tracing::debug!(delay_ms = ms, "waiting before request");
            sleep(Duration::from_millis(ms)).await;
        }

        let user_agent = if self.config.user_agent_rotation {
            self.user_agents
                .choose(&mut rand::thread_rng())
                .cloned()
                .unwrap_or_else(|| self.user_agents[0].clone())
        } else {
            self.user_agents[0].clone()
        };

        let response = self
            .client
            .get(url)
            .header("User-Agent", user_agent)
            .send()
            .await?;

        let status = response.status().as_u16();
        match status {
            200 => Ok(response.text().await?),
            403 => Err(SearchError::Blocked),
            other => Err(SearchError::UpstreamStatus(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gift_engine::DEFAULT_SEARCH_BASE;

    #[test]
    fn default_base_is_used_when_no_affiliate() {
        assert_eq!(
            build_search_url("caneca", None, DEFAULT_SEARCH_BASE),
            "https://www.magazineluiza.com.br/busca/caneca"
        );
    }

    #[test]
    fn affiliate_base_replaces_default_and_loses_trailing_slash() {
        assert_eq!(
            build_search_url(
                "caneca",
                Some("https://www.magazinevoce.com.br/elislecio/"),
                DEFAULT_SEARCH_BASE
            ),
            "https://www.magazinevoce.com.br/elislecio/busca/caneca"
        );
    }

    #[test]
    fn query_is_percent_encoded() {
        assert_eq!(
            build_search_url("caneca azul", None, DEFAULT_SEARCH_BASE),
            "https://www.magazineluiza.com.br/busca/caneca%20azul"
        );
    }
}
