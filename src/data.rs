use crate::error::Error;
use crate::report::{
    AdGroupRow, CampaignRow, CreativeSetMetadata, CreativeSetRow, GranularityRecord, Id, Metrics,
    Money,
};
use datafusion::arrow::array::{
    ArrayRef, BooleanBuilder, Float64Builder, RecordBatch, StringBuilder, UInt64Builder,
};
use datafusion::arrow::datatypes::{DataType, Field, Schema};
use datafusion::common::{JoinType, ScalarValue};
use datafusion::prelude::{col, DataFrame, SessionContext};
use std::sync::Arc;

/// A creative-set row expanded to one of its time buckets.
///
/// The parent metadata and the campaign the report was requested for are
/// shared by every bucket of the same row.
#[derive(Debug, Clone, Copy)]
pub struct CreativeSetRecord<'a> {
    pub campaign_id: &'a Id,
    pub metadata: &'a CreativeSetMetadata,
    pub granularity: &'a GranularityRecord,
}

/// Expands every creative-set row into one record per granularity entry.
/// Rows without granularity entries produce nothing.
pub fn flatten_creative_sets<'a>(
    campaign_id: &'a Id,
    rows: &'a [CreativeSetRow],
) -> Vec<CreativeSetRecord<'a>> {
    rows.iter()
        .flat_map(|row| {
            row.granularity
                .iter()
                .map(move |granularity| CreativeSetRecord {
                    campaign_id,
                    metadata: &row.metadata,
                    granularity,
                })
        })
        .collect()
}

fn utf8(name: &str, nullable: bool) -> Field {
    Field::new(name, DataType::Utf8, nullable)
}

/// Metric columns shared by all report tables, in builder order.
fn metric_fields() -> Vec<Field> {
    vec![
        Field::new("impressions", DataType::UInt64, true),
        Field::new("taps", DataType::UInt64, true),
        Field::new("installs", DataType::UInt64, true),
        Field::new("new_downloads", DataType::UInt64, true),
        Field::new("redownloads", DataType::UInt64, true),
        Field::new("lat_on_installs", DataType::UInt64, true),
        Field::new("lat_off_installs", DataType::UInt64, true),
        Field::new("ttr", DataType::Float64, true),
        Field::new("conversion_rate", DataType::Float64, true),
        Field::new("avg_cpa", DataType::Float64, true),
        Field::new("avg_cpt", DataType::Float64, true),
        Field::new("local_spend", DataType::Float64, true),
        utf8("currency", true),
    ]
}

/// Creates the schema of the campaign table.
///
/// # Returns
/// An [`Arc<Schema>`] with the campaign metadata columns followed by the row totals.
pub fn campaign_schema() -> Arc<Schema> {
    let mut fields = vec![
        utf8("campaign_id", false),
        utf8("campaign_name", true),
        utf8("campaign_status", true),
        utf8("serving_status", true),
        utf8("display_status", true),
        Field::new("deleted", DataType::Boolean, true),
        utf8("country_or_region", true),
        utf8("ad_channel_type", true),
        utf8("app_name", true),
        utf8("adam_id", true),
        Field::new("daily_budget", DataType::Float64, true),
        Field::new("total_budget", DataType::Float64, true),
    ];
    fields.extend(metric_fields());
    Arc::new(Schema::new(fields))
}

pub fn ad_group_schema() -> Arc<Schema> {
    let mut fields = vec![
        utf8("campaign_id", false),
        utf8("ad_group_id", false),
        utf8("ad_group_name", true),
        utf8("ad_group_status", true),
        utf8("serving_status", true),
        utf8("display_status", true),
        Field::new("deleted", DataType::Boolean, true),
        Field::new("default_cpc_bid", DataType::Float64, true),
    ];
    fields.extend(metric_fields());
    Arc::new(Schema::new(fields))
}

pub fn creative_set_schema() -> Arc<Schema> {
    let mut fields = vec![
        utf8("date", true),
        utf8("campaign_id", false),
        utf8("ad_group_id", false),
        utf8("creative_set_id", false),
        utf8("creative_set_name", true),
        utf8("status", true),
        utf8("serving_status", true),
        utf8("language", true),
        Field::new("deleted", DataType::Boolean, true),
    ];
    fields.extend(metric_fields());
    Arc::new(Schema::new(fields))
}

struct MetricsBuilder {
    impressions: UInt64Builder,
    taps: UInt64Builder,
    installs: UInt64Builder,
    new_downloads: UInt64Builder,
    redownloads: UInt64Builder,
    lat_on_installs: UInt64Builder,
    lat_off_installs: UInt64Builder,
    ttr: Float64Builder,
    conversion_rate: Float64Builder,
    avg_cpa: Float64Builder,
    avg_cpt: Float64Builder,
    local_spend: Float64Builder,
    currency: StringBuilder,
}

fn amount(money: Option<&Money>) -> Option<f64> {
    money.map(|m| m.amount)
}

impl MetricsBuilder {
    fn with_capacity(capacity: usize) -> Self {
        MetricsBuilder {
            impressions: UInt64Builder::with_capacity(capacity),
            taps: UInt64Builder::with_capacity(capacity),
            installs: UInt64Builder::with_capacity(capacity),
            new_downloads: UInt64Builder::with_capacity(capacity),
            redownloads: UInt64Builder::with_capacity(capacity),
            lat_on_installs: UInt64Builder::with_capacity(capacity),
            lat_off_installs: UInt64Builder::with_capacity(capacity),
            ttr: Float64Builder::with_capacity(capacity),
            conversion_rate: Float64Builder::with_capacity(capacity),
            avg_cpa: Float64Builder::with_capacity(capacity),
            avg_cpt: Float64Builder::with_capacity(capacity),
            local_spend: Float64Builder::with_capacity(capacity),
            currency: StringBuilder::new(),
        }
    }

    /// Rows without totals get nulls, which are filled later.
    fn append(&mut self, metrics: Option<&Metrics>) {
        let default = Metrics::default();
        let metrics = metrics.unwrap_or(&default);

        self.impressions.append_option(metrics.impressions);
        self.taps.append_option(metrics.taps);
        self.installs.append_option(metrics.installs);
        self.new_downloads.append_option(metrics.new_downloads);
        self.redownloads.append_option(metrics.redownloads);
        self.lat_on_installs.append_option(metrics.lat_on_installs);
        self.lat_off_installs.append_option(metrics.lat_off_installs);
        self.ttr.append_option(metrics.ttr);
        self.conversion_rate.append_option(metrics.conversion_rate);
        self.avg_cpa.append_option(amount(metrics.avg_cpa.as_ref()));
        self.avg_cpt.append_option(amount(metrics.avg_cpt.as_ref()));
        self.local_spend.append_option(amount(metrics.local_spend.as_ref()));

        let currency = [&metrics.local_spend, &metrics.avg_cpt, &metrics.avg_cpa]
            .into_iter()
            .flatten()
            .map(|money| money.currency.as_str())
            .next();
        self.currency.append_option(currency);
    }

    fn finish(mut self) -> Vec<ArrayRef> {
        vec![
            Arc::new(self.impressions.finish()),
            Arc::new(self.taps.finish()),
            Arc::new(self.installs.finish()),
            Arc::new(self.new_downloads.finish()),
            Arc::new(self.redownloads.finish()),
            Arc::new(self.lat_on_installs.finish()),
            Arc::new(self.lat_off_installs.finish()),
            Arc::new(self.ttr.finish()),
            Arc::new(self.conversion_rate.finish()),
            Arc::new(self.avg_cpa.finish()),
            Arc::new(self.avg_cpt.finish()),
            Arc::new(self.local_spend.finish()),
            Arc::new(self.currency.finish()),
        ]
    }
}

/// Converts campaign report rows to a DataFrame.
///
/// # Arguments
/// * `rows` - The rows of the campaign report
/// * `ctx` - A reference to the [`SessionContext`] for DataFrame operations
///
/// # Returns
/// A Result containing either a [`DataFrame`] with one row per report row or an [`Error`]
pub fn campaigns_to_df(rows: &[CampaignRow], ctx: &SessionContext) -> Result<DataFrame, Error> {
    let batch = {
        let mut campaign_id = StringBuilder::new();
        let mut campaign_name = StringBuilder::new();
        let mut campaign_status = StringBuilder::new();
        let mut serving_status = StringBuilder::new();
        let mut display_status = StringBuilder::new();
        let mut deleted = BooleanBuilder::with_capacity(rows.len());
        let mut country_or_region = StringBuilder::new();
        let mut ad_channel_type = StringBuilder::new();
        let mut app_name = StringBuilder::new();
        let mut adam_id = StringBuilder::new();
        let mut daily_budget = Float64Builder::with_capacity(rows.len());
        let mut total_budget = Float64Builder::with_capacity(rows.len());
        let mut metrics = MetricsBuilder::with_capacity(rows.len());

        for row in rows {
            let m = &row.metadata;
            let app = m.app.as_ref();

            campaign_id.append_value(m.campaign_id.as_str());
            campaign_name.append_option(m.campaign_name.as_deref());
            campaign_status.append_option(m.campaign_status.as_deref());
            serving_status.append_option(m.serving_status.as_deref());
            display_status.append_option(m.display_status.as_deref());
            deleted.append_option(m.deleted);
            country_or_region.append_option(m.country_or_region.as_deref());
            ad_channel_type.append_option(m.ad_channel_type.as_deref());
            app_name.append_option(app.and_then(|a| a.app_name.as_deref()));
            adam_id.append_option(app.and_then(|a| a.adam_id.as_ref()).map(Id::as_str));
            daily_budget.append_option(amount(m.daily_budget.as_ref()));
            total_budget.append_option(amount(m.total_budget.as_ref()));
            metrics.append(row.total.as_ref());
        }

        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(campaign_id.finish()),
            Arc::new(campaign_name.finish()),
            Arc::new(campaign_status.finish()),
            Arc::new(serving_status.finish()),
            Arc::new(display_status.finish()),
            Arc::new(deleted.finish()),
            Arc::new(country_or_region.finish()),
            Arc::new(ad_channel_type.finish()),
            Arc::new(app_name.finish()),
            Arc::new(adam_id.finish()),
            Arc::new(daily_budget.finish()),
            Arc::new(total_budget.finish()),
        ];
        columns.extend(metrics.finish());

        RecordBatch::try_new(campaign_schema(), columns)
    }?;

    Ok(ctx.read_batch(batch)?)
}

pub fn ad_groups_to_df(rows: &[AdGroupRow], ctx: &SessionContext) -> Result<DataFrame, Error> {
    let batch = {
        let mut campaign_id = StringBuilder::new();
        let mut ad_group_id = StringBuilder::new();
        let mut ad_group_name = StringBuilder::new();
        let mut ad_group_status = StringBuilder::new();
        let mut serving_status = StringBuilder::new();
        let mut display_status = StringBuilder::new();
        let mut deleted = BooleanBuilder::with_capacity(rows.len());
        let mut default_cpc_bid = Float64Builder::with_capacity(rows.len());
        let mut metrics = MetricsBuilder::with_capacity(rows.len());

        for row in rows {
            let m = &row.metadata;

            campaign_id.append_value(m.campaign_id.as_str());
            ad_group_id.append_value(m.ad_group_id.as_str());
            ad_group_name.append_option(m.ad_group_name.as_deref());
            ad_group_status.append_option(m.ad_group_status.as_deref());
            serving_status.append_option(m.ad_group_serving_status.as_deref());
            display_status.append_option(m.ad_group_display_status.as_deref());
            deleted.append_option(m.deleted);
            default_cpc_bid.append_option(amount(m.default_cpc_bid.as_ref()));
            metrics.append(row.total.as_ref());
        }

        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(campaign_id.finish()),
            Arc::new(ad_group_id.finish()),
            Arc::new(ad_group_name.finish()),
            Arc::new(ad_group_status.finish()),
            Arc::new(serving_status.finish()),
            Arc::new(display_status.finish()),
            Arc::new(deleted.finish()),
            Arc::new(default_cpc_bid.finish()),
        ];
        columns.extend(metrics.finish());

        RecordBatch::try_new(ad_group_schema(), columns)
    }?;

    Ok(ctx.read_batch(batch)?)
}

pub fn creative_sets_to_df(
    records: &[CreativeSetRecord<'_>],
    ctx: &SessionContext,
) -> Result<DataFrame, Error> {
    let batch = {
        let mut date = StringBuilder::new();
        let mut campaign_id = StringBuilder::new();
        let mut ad_group_id = StringBuilder::new();
        let mut creative_set_id = StringBuilder::new();
        let mut creative_set_name = StringBuilder::new();
        let mut status = StringBuilder::new();
        let mut serving_status = StringBuilder::new();
        let mut language = StringBuilder::new();
        let mut deleted = BooleanBuilder::with_capacity(records.len());
        let mut metrics = MetricsBuilder::with_capacity(records.len());

        for record in records {
            let m = record.metadata;

            date.append_option(record.granularity.date.as_deref());
            campaign_id.append_value(record.campaign_id.as_str());
            ad_group_id.append_value(m.ad_group_id.as_str());
            creative_set_id.append_value(m.creative_set_id.as_str());
            creative_set_name.append_option(m.creative_set_name.as_deref());
            status.append_option(m.status.as_deref());
            serving_status.append_option(m.serving_status.as_deref());
            language.append_option(m.language.as_deref());
            deleted.append_option(m.deleted);
            metrics.append(Some(&record.granularity.metrics));
        }

        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(date.finish()),
            Arc::new(campaign_id.finish()),
            Arc::new(ad_group_id.finish()),
            Arc::new(creative_set_id.finish()),
            Arc::new(creative_set_name.finish()),
            Arc::new(status.finish()),
            Arc::new(serving_status.finish()),
            Arc::new(language.finish()),
            Arc::new(deleted.finish()),
        ];
        columns.extend(metrics.finish());

        RecordBatch::try_new(creative_set_schema(), columns)
    }?;

    Ok(ctx.read_batch(batch)?)
}

///
/// Joins creative sets with their campaign and ad-group names.
///
/// Both lookup tables are reduced to their key and name columns and made
/// distinct first, so a campaign reported once per country still matches
/// each creative-set record exactly once. Records without a matching
/// campaign or ad group are dropped.
///
/// # Arguments
/// * `creative_sets` - [`DataFrame`] built by [`creative_sets_to_df`]
/// * `campaigns` - [`DataFrame`] built by [`campaigns_to_df`]
/// * `ad_groups` - [`DataFrame`] built by [`ad_groups_to_df`]
///
/// # Returns
/// A Result containing either the joined [`DataFrame`] or an [`Error`]
pub fn join_creative_sets(
    creative_sets: DataFrame,
    campaigns: DataFrame,
    ad_groups: DataFrame,
) -> Result<DataFrame, Error> {
    let cmp_campaign_id = "cmp_campaign_id";
    let ag_campaign_id = "ag_campaign_id";
    let ag_ad_group_id = "ag_ad_group_id";

    let campaigns = campaigns
        .select(vec![
            col("campaign_id").alias(cmp_campaign_id),
            col("campaign_name").alias("campaign_name"),
        ])?
        .distinct()?;

    let df = creative_sets
        .join(
            campaigns,
            JoinType::Inner,
            &["campaign_id"],
            &[cmp_campaign_id],
            None,
        )?
        .drop_columns(&[cmp_campaign_id])?;

    let ad_groups = ad_groups
        .select(vec![
            col("campaign_id").alias(ag_campaign_id),
            col("ad_group_id").alias(ag_ad_group_id),
            col("ad_group_name").alias("ad_group_name"),
        ])?
        .distinct()?;

    let df = df
        .join(
            ad_groups,
            JoinType::Inner,
            &["campaign_id", "ad_group_id"],
            &[ag_campaign_id, ag_ad_group_id],
            None,
        )?
        .drop_columns(&[ag_campaign_id, ag_ad_group_id])?;

    Ok(df)
}

/// Replaces every null with 0, cast to the column's type.
pub fn fill_missing(df: DataFrame) -> Result<DataFrame, Error> {
    let columns = df
        .schema()
        .fields()
        .iter()
        .map(|field| field.name().to_owned())
        .collect();

    Ok(df.fill_null(ScalarValue::from(0), columns)?)
}
