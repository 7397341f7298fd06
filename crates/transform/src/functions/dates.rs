use async_trait::async_trait;
use chrono::DateTime;
use serde_json::Value;

use super::{FunctionError, TemplateFunction, arguments};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// `days_difference lhs rhs`: fractional days from `rhs` to `lhs`.
pub struct DaysDifference;

#[async_trait]
impl TemplateFunction for DaysDifference {
    async fn call(&self, args: Vec<Value>) -> Result<Value, FunctionError> {
        let [lhs, rhs] = arguments(args)?;
        Ok(days_difference(&lhs, &rhs).map_or(Value::Null, Value::from))
    }
}

/// Difference in days between two RFC 3339 timestamps, `None` if either
/// side is not one.
#[must_use]
pub fn days_difference(lhs: &Value, rhs: &Value) -> Option<f64> {
    let lhs = DateTime::parse_from_rfc3339(lhs.as_str()?).ok()?;
    let rhs = DateTime::parse_from_rfc3339(rhs.as_str()?).ok()?;
    #[allow(clippy::cast_precision_loss)]
    let millis = (lhs - rhs).num_milliseconds() as f64;
    Some(millis / MILLIS_PER_DAY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn fractional_days() {
        let value = DaysDifference
            .call(vec![json!("2015-06-03T12:00:00Z"), json!("2015-06-01T00:00:00Z")])
            .await
            .unwrap();
        assert_eq!(value, json!(2.5));
    }

    #[tokio::test]
    async fn negative_when_reversed() {
        let value = DaysDifference
            .call(vec![json!("2015-06-01T00:00:00Z"), json!("2015-06-02T00:00:00+00:00")])
            .await
            .unwrap();
        assert_eq!(value, json!(-1.0));
    }

    #[tokio::test]
    async fn unparseable_input_is_null() {
        let value = DaysDifference
            .call(vec![json!("yesterday"), json!("2015-06-01T00:00:00Z")])
            .await
            .unwrap();
        assert_eq!(value, Value::Null);

        let value = DaysDifference
            .call(vec![Value::Null, json!("2015-06-01T00:00:00Z")])
            .await
            .unwrap();
        assert_eq!(value, Value::Null);
    }

    #[tokio::test]
    async fn wrong_arity() {
        assert!(DaysDifference.call(vec![json!("x")]).await.is_err());
    }
}
