use crate::app_config::BusinessRules;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::info;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    /// Overlay rules stored in the `business_rules` table on top of the
    /// configured defaults. Rows hold `{"value": <number>}`.
    pub async fn fetch_business_rules(&self, defaults: BusinessRules) -> Result<BusinessRules, sqlx::Error> {
        let rows: Vec<(String, Value)> =
            sqlx::query_as("SELECT rule_key, rule_value FROM business_rules")
                .fetch_all(&self.pool)
                .await?;

        Ok(apply_rule_overrides(defaults, rows))
    }
}

fn apply_rule_overrides(defaults: BusinessRules, rows: Vec<(String, Value)>) -> BusinessRules {
    let mut rules = defaults;
    for (key, value) in rows {
        let Some(v) = value.get("value") else { continue };
        match key.as_str() {
            "estimated_delivery_days" => {
                if let Some(days) = v.as_i64().filter(|d| *d >= 0) {
                    rules.estimated_delivery_days = days;
                }
            }
            "default_item_weight_kg" => {
                if let Some(kg) = v.as_f64().filter(|kg| *kg > 0.0) {
                    rules.default_item_weight_kg = kg;
                }
            }
            other => tracing::debug!(rule = other, "Ignoring unknown business rule"),
        }
    }
    rules
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rule_overrides() {
        let rules = apply_rule_overrides(
            BusinessRules::default(),
            vec![
                ("estimated_delivery_days".to_string(), json!({"value": 7})),
                ("default_item_weight_kg".to_string(), json!({"value": -1.0})),
                ("unknown".to_string(), json!({"value": 1})),
            ],
        );

        assert_eq!(rules.estimated_delivery_days, 7);
        assert_eq!(rules.default_item_weight_kg, 0.2);
    }
}
