use serde::Deserialize;
use tracing::warn;

use gist_core::Result;

/// What localized prompts fall back to when the lookup fails.
pub const FALLBACK_REGION: &str = "your region";

#[derive(Deserialize)]
struct IpApiResponse {
    country_name: Option<String>,
}

/// Best-effort country detection for the Home Politics category.
pub async fn detect(client: &reqwest::Client) -> String {
    match lookup(client).await {
        Ok(Some(country)) => country,
        Ok(None) => FALLBACK_REGION.to_string(),
        Err(err) => {
            warn!(error = %err, "failed to detect location, falling back to general region");
            FALLBACK_REGION.to_string()
        }
    }
}

async fn lookup(client: &reqwest::Client) -> Result<Option<String>> {
    let response = client
        .get("https://ipapi.co/json/")
        .send()
        .await?
        .error_for_status()?
        .json::<IpApiResponse>()
        .await?;
    Ok(response.country_name.filter(|c| !c.is_empty()))
}
