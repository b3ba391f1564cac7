//! Change record builders and controller wiring for tests

use super::fakes::{RecordingSleeper, ScriptedOrderTable};
use orders_cdc::constants::attributes;
use orders_cdc::models::{AttributeValue, ChangeRecord, EventName};
use orders_cdc::sync::{BackoffPolicy, PostgresErrorClassifier, UpsertController};
use std::sync::Arc;
use std::time::Duration;

pub const CREATED_AT: i64 = 1_700_000_000;
pub const UPDATED_AT: i64 = 1_700_000_000;

/// Builder for order change records with a complete, valid image
pub struct OrderEventBuilder {
    record: ChangeRecord,
}

impl OrderEventBuilder {
    pub fn new(event_name: EventName, order_id: &str) -> Self {
        let record = ChangeRecord::new(event_name)
            .with_key(attributes::PRIMARY_KEY, AttributeValue::string(order_id))
            .with_event_id(format!("evt-{order_id}"));
        let builder = Self { record };

        match event_name {
            EventName::Remove => builder,
            _ => builder
                .with_string(attributes::MERCHANT_ID, "m-1")
                .with_number(attributes::AMOUNT, "42.5")
                .with_string(attributes::CURRENCY, "USD")
                .with_string(attributes::STATUS, "NEW")
                .with_number(attributes::CREATED_AT, &CREATED_AT.to_string())
                .with_number(attributes::UPDATED_AT, &UPDATED_AT.to_string()),
        }
    }

    pub fn with_string(mut self, name: &str, value: &str) -> Self {
        self.record = self.record.with_attribute(name, AttributeValue::string(value));
        self
    }

    pub fn with_number(mut self, name: &str, value: &str) -> Self {
        self.record = self.record.with_attribute(name, AttributeValue::N(value.to_string()));
        self
    }

    pub fn without(mut self, name: &str) -> Self {
        self.record.new_image.remove(name);
        self
    }

    pub fn build(self) -> ChangeRecord {
        self.record
    }
}

pub fn insert_event(order_id: &str) -> ChangeRecord {
    OrderEventBuilder::new(EventName::Insert, order_id).build()
}

pub fn modify_event(order_id: &str) -> ChangeRecord {
    OrderEventBuilder::new(EventName::Modify, order_id).build()
}

pub fn remove_event(order_id: &str) -> ChangeRecord {
    OrderEventBuilder::new(EventName::Remove, order_id).build()
}

/// Controller over the fakes with the production defaults: 3 attempts, 1s unit
pub fn controller(
    table: &Arc<ScriptedOrderTable>,
    sleeper: &Arc<RecordingSleeper>,
) -> UpsertController {
    UpsertController::new(table.clone(), Arc::new(PostgresErrorClassifier))
        .with_sleeper(sleeper.clone())
        .with_backoff(BackoffPolicy::new(Duration::from_secs(1)))
}
