use std::collections::HashMap;

use serde_json::Value;

/// Metric name -> latest value.
pub type Insights = HashMap<String, u64>;

/// Read an `/insights` response body.
///
/// Each metric carries a `values` series; the last entry is used so lifetime
/// metrics (one value) and period metrics (one value per period) both resolve
/// to the most recent figure. Metrics with no name or an empty series are
/// skipped.
pub fn parse_insights(body: &Value) -> Insights {
    let Some(data) = body.get("data").and_then(Value::as_array) else {
        return Insights::new();
    };

    data.iter()
        .filter_map(|metric| {
            let name = metric.get("name")?.as_str().filter(|n| !n.is_empty())?;
            let latest = metric.get("values")?.as_array()?.last()?;
            let value = latest.get("value").map(coerce_count).unwrap_or(0);
            Some((name.to_string(), value))
        })
        .collect()
}

/// Coerce a JSON scalar into a non-negative count. Anything that is not a
/// number (or a numeric string) counts as zero.
pub fn coerce_count(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse::<f64>().map(|f| f.max(0.0) as u64).unwrap_or(0),
        _ => 0,
    }
}

pub fn metric(insights: &Insights, name: &str) -> u64 {
    insights.get(name).copied().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_insights_takes_last_value() {
        let body = json!({
            "data": [
                {"name": "post_impressions", "period": "lifetime", "values": [{"value": 120}]},
                {"name": "post_engaged_users", "period": "day", "values": [{"value": 3}, {"value": 9}]},
            ]
        });

        let insights = parse_insights(&body);
        assert_eq!(metric(&insights, "post_impressions"), 120);
        assert_eq!(metric(&insights, "post_engaged_users"), 9);
    }

    #[test]
    fn test_parse_insights_skips_empty_series() {
        let body = json!({
            "data": [
                {"name": "reach", "values": []},
                {"values": [{"value": 5}]},
                {"name": "saved", "values": [{}]},
            ]
        });

        let insights = parse_insights(&body);
        assert!(!insights.contains_key("reach"));
        assert_eq!(insights.len(), 1);
        assert_eq!(metric(&insights, "saved"), 0);
    }

    #[test]
    fn test_parse_insights_without_data() {
        assert!(parse_insights(&json!({})).is_empty());
        assert!(parse_insights(&json!({"data": null})).is_empty());
    }

    #[test]
    fn test_missing_metric_defaults_to_zero() {
        assert_eq!(metric(&Insights::new(), "post_clicks"), 0);
    }

    #[test]
    fn test_coerce_count() {
        assert_eq!(coerce_count(&json!(42)), 42);
        assert_eq!(coerce_count(&json!(7.9)), 7);
        assert_eq!(coerce_count(&json!(-3)), 0);
        assert_eq!(coerce_count(&json!("15")), 15);
        assert_eq!(coerce_count(&json!(null)), 0);
        assert_eq!(coerce_count(&json!({"like": 3})), 0);
    }
}
