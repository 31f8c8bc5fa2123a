use serde::{de, Deserialize, Deserializer};
use std::fmt;

/// Canonical identifier used for every join key.
///
/// The reporting endpoints are not consistent about sending ids as JSON
/// numbers or strings, so both decode to the same text.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(String);

impl Id {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Id(value.to_string())
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => Id(text),
            RawId::Number(number) => Id(number.to_string()),
        })
    }
}

/// Amounts arrive as decimal strings, e.g. `{"amount": "12.5", "currency": "USD"}`.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Money {
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: f64,
    pub currency: String,
}

fn deserialize_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawAmount {
        Text(String),
        Number(f64),
    }

    match RawAmount::deserialize(deserializer)? {
        RawAmount::Number(amount) => Ok(amount),
        RawAmount::Text(text) => text
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid amount '{text}'"))),
    }
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub impressions: Option<u64>,
    pub taps: Option<u64>,
    pub installs: Option<u64>,
    pub new_downloads: Option<u64>,
    pub redownloads: Option<u64>,
    pub lat_on_installs: Option<u64>,
    pub lat_off_installs: Option<u64>,
    pub ttr: Option<f64>,
    pub conversion_rate: Option<f64>,
    #[serde(rename = "avgCPA")]
    pub avg_cpa: Option<Money>,
    #[serde(rename = "avgCPT")]
    pub avg_cpt: Option<Money>,
    pub local_spend: Option<Money>,
}

/// Metrics for one time bucket of a creative-set row.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct GranularityRecord {
    pub date: Option<String>,
    #[serde(flatten)]
    pub metrics: Metrics,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct App {
    pub app_name: Option<String>,
    pub adam_id: Option<Id>,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CampaignMetadata {
    pub campaign_id: Id,
    pub campaign_name: Option<String>,
    pub campaign_status: Option<String>,
    pub serving_status: Option<String>,
    pub display_status: Option<String>,
    pub deleted: Option<bool>,
    pub country_or_region: Option<String>,
    pub ad_channel_type: Option<String>,
    pub app: Option<App>,
    pub daily_budget: Option<Money>,
    pub total_budget: Option<Money>,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdGroupMetadata {
    pub campaign_id: Id,
    pub ad_group_id: Id,
    pub ad_group_name: Option<String>,
    pub ad_group_status: Option<String>,
    pub ad_group_serving_status: Option<String>,
    pub ad_group_display_status: Option<String>,
    pub deleted: Option<bool>,
    pub default_cpc_bid: Option<Money>,
}

/// The campaign a creative set belongs to is only known from the request URL.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreativeSetMetadata {
    pub creative_set_id: Id,
    pub creative_set_name: Option<String>,
    pub ad_group_id: Id,
    pub status: Option<String>,
    pub serving_status: Option<String>,
    pub language: Option<String>,
    pub deleted: Option<bool>,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct CampaignRow {
    pub metadata: CampaignMetadata,
    pub total: Option<Metrics>,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct AdGroupRow {
    pub metadata: AdGroupMetadata,
    pub total: Option<Metrics>,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct CreativeSetRow {
    pub metadata: CreativeSetMetadata,
    #[serde(default)]
    pub granularity: Vec<GranularityRecord>,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct GrandTotals {
    pub total: Metrics,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Report<R> {
    pub row: Vec<R>,
    pub grand_totals: Option<GrandTotals>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ReportData<R> {
    reporting_data_response: Report<R>,
}

/// `{"data": {"reportingDataResponse": {"row": [...]}}}`
#[derive(Deserialize, Debug)]
pub struct ReportEnvelope<R> {
    data: ReportData<R>,
}

impl<R> ReportEnvelope<R> {
    pub fn into_report(self) -> Report<R> {
        self.data.reporting_data_response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_id_from_number_and_text_are_equal() {
        let from_number: Id = serde_json::from_value(json!(42)).unwrap();
        let from_text: Id = serde_json::from_value(json!("42")).unwrap();

        assert_eq!(from_number, from_text);
        assert_eq!(from_number.as_str(), "42");
    }

    #[test]
    fn test_id_rejects_other_types() {
        assert!(serde_json::from_value::<Id>(json!(true)).is_err());
        assert!(serde_json::from_value::<Id>(json!(null)).is_err());
    }

    #[test]
    fn test_money_amount_from_string() {
        let money: Money =
            serde_json::from_value(json!({"amount": "12.50", "currency": "USD"})).unwrap();
        assert_eq!(money.amount, 12.5);
        assert_eq!(money.currency, "USD");

        let invalid = serde_json::from_value::<Money>(json!({"amount": "abc", "currency": "USD"}));
        assert!(invalid.is_err());
    }

    #[test]
    fn test_decode_campaign_envelope() {
        let body = json!({
            "data": {
                "reportingDataResponse": {
                    "row": [{
                        "metadata": {
                            "campaignId": 1001,
                            "campaignName": "Brand",
                            "deleted": false,
                            "countryOrRegion": "US",
                            "app": {"appName": "Notes", "adamId": 123456789},
                            "dailyBudget": {"amount": "50", "currency": "USD"}
                        },
                        "total": {
                            "impressions": 1200,
                            "taps": 30,
                            "ttr": 0.025,
                            "avgCPT": {"amount": "0.5", "currency": "USD"},
                            "localSpend": {"amount": "15", "currency": "USD"}
                        }
                    }],
                    "grandTotals": {"other": false, "total": {"impressions": 1200}}
                }
            }
        });

        let report = serde_json::from_value::<ReportEnvelope<CampaignRow>>(body)
            .unwrap()
            .into_report();

        assert_eq!(report.row.len(), 1);
        let row = &report.row[0];
        assert_eq!(row.metadata.campaign_id, Id::from("1001"));
        assert_eq!(row.metadata.app.as_ref().unwrap().adam_id, Some(Id::from("123456789")));
        let total = row.total.as_ref().unwrap();
        assert_eq!(total.impressions, Some(1200));
        assert_eq!(total.avg_cpt.as_ref().unwrap().amount, 0.5);
        assert_eq!(total.installs, None);
        assert_eq!(report.grand_totals.unwrap().total.impressions, Some(1200));
    }

    #[test]
    fn test_decode_creative_set_granularity() {
        let row: CreativeSetRow = serde_json::from_value(json!({
            "metadata": {"creativeSetId": "77", "adGroupId": 5, "creativeSetName": "Dark"},
            "granularity": [
                {"date": "2019-11-01", "impressions": 10, "taps": 1},
                {"date": "2019-11-02", "impressions": 20}
            ]
        }))
        .unwrap();

        assert_eq!(row.granularity.len(), 2);
        assert_eq!(row.granularity[1].date.as_deref(), Some("2019-11-02"));
        assert_eq!(row.granularity[1].metrics.impressions, Some(20));
        assert_eq!(row.metadata.ad_group_id, Id::from("5"));
    }

    #[test]
    fn test_decode_missing_row_fails() {
        let body = json!({"data": {"reportingDataResponse": {}}});
        assert!(serde_json::from_value::<ReportEnvelope<CampaignRow>>(body).is_err());
    }
}
