use crate::error::Error;
use chrono::NaiveDate;
use clap::ValueEnum;
use serde::Serialize;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Serialize, ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Granularity {
    Daily,
    Weekly,
    Monthly,
}

/// Time zone the API uses to bucket metrics. `Ortz` is the organization's own time zone.
#[derive(Serialize, ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeZone {
    Utc,
    Ortz,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortOrder {
    Ascending,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    Equals,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderBy {
    pub field: String,
    pub sort_order: SortOrder,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub values: Vec<String>,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct Pagination {
    pub offset: u32,
    pub limit: u32,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Selector {
    pub order_by: Vec<OrderBy>,
    pub conditions: Vec<Condition>,
    pub pagination: Pagination,
}

/// Body of a single reporting call.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub start_time: String,
    pub end_time: String,
    pub selector: Selector,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_by: Option<Vec<String>>,
    pub time_zone: TimeZone,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granularity: Option<Granularity>,
    pub return_records_with_no_metrics: bool,
    pub return_row_totals: bool,
    pub return_grand_totals: bool,
}

/// Date range and time zone shared by every request of one run.
#[derive(Clone, Copy, Debug)]
pub struct ReportWindow {
    start: NaiveDate,
    end: NaiveDate,
    time_zone: TimeZone,
}

impl ReportWindow {
    pub fn new(start: NaiveDate, end: NaiveDate, time_zone: TimeZone) -> Result<Self, Error> {
        if start > end {
            return Err(Error::StartDateAfterEndDate {
                start_date: start.to_string(),
                end_date: end.to_string(),
            });
        }

        Ok(ReportWindow {
            start,
            end,
            time_zone,
        })
    }
}

fn ascending(field: &str) -> Vec<OrderBy> {
    vec![OrderBy {
        field: field.to_string(),
        sort_order: SortOrder::Ascending,
    }]
}

fn equals(field: &str, value: &str) -> Condition {
    Condition {
        field: field.to_string(),
        operator: Operator::Equals,
        values: vec![value.to_string()],
    }
}

fn selector(order_by: Vec<OrderBy>, conditions: Vec<Condition>, limit: u32) -> Selector {
    Selector {
        order_by,
        conditions,
        pagination: Pagination { offset: 0, limit },
    }
}

/// Enabled, non-deleted campaigns grouped by country or region.
///
/// Grand totals are only useful when the report is exported as is, the
/// creative-set pipeline turns them off.
pub fn campaigns_report(window: &ReportWindow, limit: u32, grand_totals: bool) -> ReportRequest {
    ReportRequest {
        start_time: window.start.format(DATE_FORMAT).to_string(),
        end_time: window.end.format(DATE_FORMAT).to_string(),
        selector: selector(
            ascending("countryOrRegion"),
            vec![
                equals("deleted", "false"),
                equals("campaignStatus", "ENABLED"),
            ],
            limit,
        ),
        group_by: Some(vec!["countryOrRegion".to_string()]),
        time_zone: window.time_zone,
        granularity: None,
        return_records_with_no_metrics: true,
        return_row_totals: true,
        return_grand_totals: grand_totals,
    }
}

/// Non-deleted ad groups of one campaign. The campaign is part of the URL, not the body.
pub fn ad_groups_report(window: &ReportWindow, limit: u32) -> ReportRequest {
    ReportRequest {
        start_time: window.start.format(DATE_FORMAT).to_string(),
        end_time: window.end.format(DATE_FORMAT).to_string(),
        selector: selector(
            ascending("adGroupId"),
            vec![equals("deleted", "false")],
            limit,
        ),
        group_by: None,
        time_zone: window.time_zone,
        granularity: None,
        return_records_with_no_metrics: true,
        return_row_totals: true,
        return_grand_totals: false,
    }
}

pub fn creative_sets_report(
    window: &ReportWindow,
    limit: u32,
    granularity: Granularity,
) -> ReportRequest {
    ReportRequest {
        start_time: window.start.format(DATE_FORMAT).to_string(),
        end_time: window.end.format(DATE_FORMAT).to_string(),
        selector: selector(ascending("creativeSetId"), vec![], limit),
        group_by: Some(vec![]),
        time_zone: window.time_zone,
        granularity: Some(granularity),
        return_records_with_no_metrics: false,
        return_row_totals: false,
        return_grand_totals: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    fn window() -> ReportWindow {
        let start = NaiveDate::from_str("2019-11-01").unwrap();
        let end = NaiveDate::from_str("2019-11-10").unwrap();
        ReportWindow::new(start, end, TimeZone::Utc).unwrap()
    }

    #[test]
    fn test_campaigns_report_payload() {
        let request = campaigns_report(&window(), 1000, true);

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "startTime": "2019-11-01",
                "endTime": "2019-11-10",
                "selector": {
                    "orderBy": [{"field": "countryOrRegion", "sortOrder": "ASCENDING"}],
                    "conditions": [
                        {"field": "deleted", "operator": "EQUALS", "values": ["false"]},
                        {"field": "campaignStatus", "operator": "EQUALS", "values": ["ENABLED"]}
                    ],
                    "pagination": {"offset": 0, "limit": 1000}
                },
                "groupBy": ["countryOrRegion"],
                "timeZone": "UTC",
                "returnRecordsWithNoMetrics": true,
                "returnRowTotals": true,
                "returnGrandTotals": true
            })
        );
    }

    #[test]
    fn test_ad_groups_report_payload() {
        let request = ad_groups_report(&window(), 500);

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "startTime": "2019-11-01",
                "endTime": "2019-11-10",
                "selector": {
                    "orderBy": [{"field": "adGroupId", "sortOrder": "ASCENDING"}],
                    "conditions": [
                        {"field": "deleted", "operator": "EQUALS", "values": ["false"]}
                    ],
                    "pagination": {"offset": 0, "limit": 500}
                },
                "timeZone": "UTC",
                "returnRecordsWithNoMetrics": true,
                "returnRowTotals": true,
                "returnGrandTotals": false
            })
        );
    }

    #[test]
    fn test_creative_sets_report_payload() {
        let start = NaiveDate::from_str("2019-11-01").unwrap();
        let window = ReportWindow::new(start, start, TimeZone::Ortz).unwrap();
        let request = creative_sets_report(&window, 1000, Granularity::Weekly);

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "startTime": "2019-11-01",
                "endTime": "2019-11-01",
                "selector": {
                    "orderBy": [{"field": "creativeSetId", "sortOrder": "ASCENDING"}],
                    "conditions": [],
                    "pagination": {"offset": 0, "limit": 1000}
                },
                "groupBy": [],
                "timeZone": "ORTZ",
                "granularity": "WEEKLY",
                "returnRecordsWithNoMetrics": false,
                "returnRowTotals": false,
                "returnGrandTotals": false
            })
        );
    }

    #[test]
    fn test_requests_are_deterministic() {
        assert_eq!(
            campaigns_report(&window(), 1000, false),
            campaigns_report(&window(), 1000, false)
        );
        assert_eq!(
            creative_sets_report(&window(), 1000, Granularity::Daily),
            creative_sets_report(&window(), 1000, Granularity::Daily)
        );
    }

    #[test]
    fn test_window_start_after_end() {
        let start = NaiveDate::from_str("2019-11-10").unwrap();
        let end = NaiveDate::from_str("2019-11-01").unwrap();

        match ReportWindow::new(start, end, TimeZone::Utc) {
            Err(Error::StartDateAfterEndDate {
                start_date,
                end_date,
            }) => {
                assert_eq!(start_date, "2019-11-10");
                assert_eq!(end_date, "2019-11-01");
            }
            _ => panic!("Expected StartDateAfterEndDate error"),
        }
    }
}
