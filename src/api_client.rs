use crate::config::Config;
use crate::error::Error;
use crate::report::{AdGroupRow, CampaignRow, CreativeSetRow, Id, Report, ReportEnvelope};
use crate::request::ReportRequest;
use log::{debug, error};
use reqwest::{header::AUTHORIZATION, Client, Identity, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SearchAdsApi: Send + Sync + 'static {
    /// Fetches the campaign report.
    /// # Arguments
    /// * `request` - The report body, see [`crate::request::campaigns_report`].
    /// # Returns
    /// A Result containing either the report rows (and grand totals, when requested) or an Error.
    async fn fetch_campaigns(&self, request: &ReportRequest) -> Result<Report<CampaignRow>, Error>;

    /// Fetches the ad-group report of a single campaign.
    async fn fetch_ad_groups(
        &self,
        campaign_id: &Id,
        request: &ReportRequest,
    ) -> Result<Vec<AdGroupRow>, Error>;

    /// Fetches the creative-set report of a single campaign.
    /// An empty vector means the campaign has no creative sets with metrics in the window.
    async fn fetch_creative_sets(
        &self,
        campaign_id: &Id,
        request: &ReportRequest,
    ) -> Result<Vec<CreativeSetRow>, Error>;
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    org_id: String,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self, Error> {
        // Identity::from_pem takes PKCS#8, PKCS#1 (RSA) and SEC1 (EC) keys.
        let mut pem = read_certificate(&config.cert_path)?;
        pem.push(b'\n');
        pem.extend(read_certificate(&config.key_path)?);

        let identity = Identity::from_pem(&pem).map_err(|source| Error::Certificate {
            path: config.key_path.clone(),
            source: source.into(),
        })?;
        let client = Client::builder()
            .identity(identity)
            .build()
            .map_err(|source| Error::Certificate {
                path: config.key_path.clone(),
                source: source.into(),
            })?;

        Ok(ApiClient {
            client,
            base_url: config.api_url.to_string(),
            org_id: config.org_id.to_string(),
        })
    }

    async fn post_report<R: DeserializeOwned>(
        &self,
        url: Url,
        request: &ReportRequest,
    ) -> Result<Report<R>, Error> {
        debug!("POST {}", url);

        let resp = self
            .client
            .post(url)
            .header(AUTHORIZATION, format!("orgId={}", self.org_id))
            .json(request)
            .send()
            .await?;

        read_report(resp).await
    }
}

fn read_certificate(path: &Path) -> Result<Vec<u8>, Error> {
    fs::read(path).map_err(|source| Error::Certificate {
        path: path.to_path_buf(),
        source: source.into(),
    })
}

/// Builds `{base_url}/reports/campaigns[/{campaign_id}/{report}]`.
fn report_url(base_url: &str, campaign_report: Option<(&Id, &str)>) -> Result<Url, Error> {
    let mut url = Url::parse(base_url)?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| Error::UrlParsingFailed(url::ParseError::SetHostOnCannotBeABaseUrl))?;
        segments.pop_if_empty().extend(&["reports", "campaigns"]);
        if let Some((campaign_id, report)) = campaign_report {
            segments.extend(&[campaign_id.as_str(), report]);
        }
    }
    Ok(url)
}

/// Anything but 200 aborts with the raw body as the diagnostic.
async fn read_report<R: DeserializeOwned>(resp: Response) -> Result<Report<R>, Error> {
    let status = resp.status();
    let body = resp.text().await?;

    if status != StatusCode::OK {
        error!("Report request failed with {}: {}", status, body);
        return Err(Error::ApiFailure {
            status: status.as_u16(),
            body,
        });
    }

    let envelope: ReportEnvelope<R> = serde_json::from_str(&body)?;
    Ok(envelope.into_report())
}

#[async_trait::async_trait]
impl SearchAdsApi for ApiClient {
    async fn fetch_campaigns(&self, request: &ReportRequest) -> Result<Report<CampaignRow>, Error> {
        let url = report_url(&self.base_url, None)?;
        self.post_report(url, request).await
    }

    async fn fetch_ad_groups(
        &self,
        campaign_id: &Id,
        request: &ReportRequest,
    ) -> Result<Vec<AdGroupRow>, Error> {
        let url = report_url(&self.base_url, Some((campaign_id, "adgroups")))?;
        let report = self.post_report(url, request).await?;
        Ok(report.row)
    }

    async fn fetch_creative_sets(
        &self,
        campaign_id: &Id,
        request: &ReportRequest,
    ) -> Result<Vec<CreativeSetRow>, Error> {
        let url = report_url(&self.base_url, Some((campaign_id, "creativesets")))?;
        let report = self.post_report(url, request).await?;
        Ok(report.row)
    }
}
