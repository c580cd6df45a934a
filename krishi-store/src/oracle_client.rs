use async_trait::async_trait;
use krishi_core::oracle::{OracleRequest, OracleResponse, PricingOracle};
use std::time::Duration;
use tracing::debug;

/// Pricing oracle reached over HTTP: `POST {endpoint}/suggest-pricing`.
pub struct HttpPricingOracle {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPricingOracle {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self) -> String {
        format!("{}/suggest-pricing", self.endpoint)
    }
}

#[async_trait]
impl PricingOracle for HttpPricingOracle {
    async fn suggest_price(
        &self,
        request: &OracleRequest,
    ) -> Result<OracleResponse, Box<dyn std::error::Error + Send + Sync>> {
        let url = self.url();
        debug!("Requesting price suggestion from {}", url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json::<OracleResponse>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_strips_trailing_slash() {
        let oracle = HttpPricingOracle::new("http://localhost:3400/", Duration::from_secs(1)).unwrap();
        assert_eq!(oracle.url(), "http://localhost:3400/suggest-pricing");
    }
}
