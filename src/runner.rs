use crate::api_client::{ApiClient, SearchAdsApi};
use crate::config::Config;
use crate::data::{
    ad_groups_to_df, campaigns_to_df, creative_sets_to_df, fill_missing, flatten_creative_sets,
    join_creative_sets,
};
use crate::error::Error;
use crate::export::{output_path, print_table, write_table, ExportFormat, Table};
use crate::report::{CampaignRow, Id};
use crate::request::{self, Granularity, ReportWindow};
use chrono::NaiveDate;
use datafusion::prelude::{DataFrame, SessionContext};
use log::{debug, info};
use std::collections::HashSet;
use std::path::PathBuf;

const CAMPAIGNS_FILE: &str = "campaigns_data";
const CREATIVE_SETS_FILE: &str = "creative_sets";

pub async fn download_campaign_report(
    config: Config,
    start: &NaiveDate,
    end: &NaiveDate,
    format: ExportFormat,
) -> Result<PathBuf, Error> {
    config.validate()?;
    let window = ReportWindow::new(*start, *end, config.time_zone)?;

    let api_client = ApiClient::new(&config)?;
    let ctx = SessionContext::new();

    let df = campaign_table(&api_client, &ctx, &window, config.page_limit).await?;
    let df = fill_missing(df)?;

    let table = Table::collect(df).await?;
    print_table(&table)?;

    let path = output_path(&config.output_dir, CAMPAIGNS_FILE, format);
    write_table(&ctx, table, &path, format).await?;

    Ok(path)
}

pub async fn download_creative_sets_report(
    config: Config,
    start: &NaiveDate,
    end: &NaiveDate,
    granularity: Granularity,
    format: ExportFormat,
) -> Result<PathBuf, Error> {
    config.validate()?;
    let window = ReportWindow::new(*start, *end, config.time_zone)?;

    let api_client = ApiClient::new(&config)?;
    let ctx = SessionContext::new();

    let df = creative_set_table(&api_client, &ctx, &window, config.page_limit, granularity).await?;
    let df = fill_missing(df)?;

    let table = Table::collect(df).await?;
    print_table(&table)?;

    let path = output_path(&config.output_dir, CREATIVE_SETS_FILE, format);
    write_table(&ctx, table, &path, format).await?;

    Ok(path)
}

/// Campaign report with row totals, one row per campaign and country or region.
pub async fn campaign_table<A: SearchAdsApi>(
    api: &A,
    ctx: &SessionContext,
    window: &ReportWindow,
    limit: u32,
) -> Result<DataFrame, Error> {
    let report = api
        .fetch_campaigns(&request::campaigns_report(window, limit, true))
        .await?;

    info!("Fetched {} campaign rows", report.row.len());
    if let Some(grand_totals) = &report.grand_totals {
        let total = &grand_totals.total;
        info!(
            "Grand totals: {} impressions, {} taps, {} installs, {} spend",
            total.impressions.unwrap_or_default(),
            total.taps.unwrap_or_default(),
            total.installs.unwrap_or_default(),
            total.local_spend.as_ref().map(|m| m.amount).unwrap_or_default()
        );
    }

    campaigns_to_df(&report.row, ctx)
}

/// Creative sets of every enabled campaign, joined with campaign and ad-group names.
///
/// Ad groups and creative sets are fetched one campaign at a time. Campaigns
/// without creative sets are skipped.
pub async fn creative_set_table<A: SearchAdsApi>(
    api: &A,
    ctx: &SessionContext,
    window: &ReportWindow,
    limit: u32,
    granularity: Granularity,
) -> Result<DataFrame, Error> {
    let campaigns = api
        .fetch_campaigns(&request::campaigns_report(window, limit, false))
        .await?
        .row;

    if campaigns.is_empty() {
        return Err(Error::NoData {
            message: "No campaigns found for processing".to_string(),
        });
    }

    let campaign_ids = distinct_campaign_ids(&campaigns);
    info!("Fetched {} distinct campaigns", campaign_ids.len());

    let ad_groups_request = request::ad_groups_report(window, limit);
    let mut ad_groups = Vec::new();
    for campaign_id in &campaign_ids {
        let rows = api.fetch_ad_groups(campaign_id, &ad_groups_request).await?;
        debug!("Campaign {}: {} ad groups", campaign_id, rows.len());
        ad_groups.extend(rows);
    }

    let creative_sets_request = request::creative_sets_report(window, limit, granularity);
    let mut creative_sets = Vec::with_capacity(campaign_ids.len());
    for campaign_id in &campaign_ids {
        let rows = api
            .fetch_creative_sets(campaign_id, &creative_sets_request)
            .await?;
        if rows.is_empty() {
            debug!("Campaign {} has no creative sets, skipping", campaign_id);
            continue;
        }
        creative_sets.push((campaign_id, rows));
    }

    let records: Vec<_> = creative_sets
        .iter()
        .flat_map(|(campaign_id, rows)| flatten_creative_sets(campaign_id, rows))
        .collect();
    info!(
        "Fetched {} ad groups and {} creative set records",
        ad_groups.len(),
        records.len()
    );

    join_creative_sets(
        creative_sets_to_df(&records, ctx)?,
        campaigns_to_df(&campaigns, ctx)?,
        ad_groups_to_df(&ad_groups, ctx)?,
    )
}

/// Campaign ids in first-seen order. The campaign report has one row per country or region.
fn distinct_campaign_ids(campaigns: &[CampaignRow]) -> Vec<Id> {
    let mut seen = HashSet::new();
    campaigns
        .iter()
        .map(|row| &row.metadata.campaign_id)
        .filter(|id| seen.insert(*id))
        .cloned()
        .collect()
}
