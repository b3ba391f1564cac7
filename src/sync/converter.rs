//! # Record Converter
//!
//! Turns a [`ChangeRecord`] into the typed row the SQL layer binds.
//!
//! The expected shape of each row is declared up front as an [`OrderSchema`]:
//! every field names its stream attribute and its [`FieldKind`]. Extraction
//! walks the schema and fails on the first field that is absent or encoded
//! with the wrong type, naming that field in the error.
//!
//! | Field | Attribute | Insert | Update | Kind |
//! |---|---|---|---|---|
//! | order_id | keys.`p_key` | ✓ | ✓ | text |
//! | merchant_id | `merchant_id` | ✓ | | text |
//! | amount | `amount` | ✓ | ✓ | finite number |
//! | status | `status` | ✓ | ✓ | text |
//! | currency | `currency` | ✓ | ✓ | text |
//! | created_at | `created_at` | ✓ | | epoch seconds |
//! | updated_at | `updated_at` | ✓ | ✓ | epoch seconds |

use crate::constants::{attributes, fields};
use crate::error::{Result, SyncError};
use crate::models::{epoch_to_utc, AttributeValue, ChangeRecord, InsertRecord, UpdateRecord};
use std::collections::HashMap;

/// Value type a schema field must decode to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// `S` attribute
    Text,
    /// `N` attribute parsing to a finite `f64`
    Amount,
    /// `N` attribute parsing to a non-negative integer that is a valid UTC instant
    EpochSeconds,
}

/// One attribute of the new image and how to read it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub attribute: &'static str,
    pub kind: FieldKind,
}

const fn field(attribute: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { attribute, kind }
}

pub const INSERT_FIELDS: &[FieldSpec] = &[
    field(attributes::MERCHANT_ID, FieldKind::Text),
    field(attributes::AMOUNT, FieldKind::Amount),
    field(attributes::STATUS, FieldKind::Text),
    field(attributes::CURRENCY, FieldKind::Text),
    field(attributes::CREATED_AT, FieldKind::EpochSeconds),
    field(attributes::UPDATED_AT, FieldKind::EpochSeconds),
];

pub const UPDATE_FIELDS: &[FieldSpec] = &[
    field(attributes::AMOUNT, FieldKind::Amount),
    field(attributes::STATUS, FieldKind::Text),
    field(attributes::CURRENCY, FieldKind::Text),
    field(attributes::UPDATED_AT, FieldKind::EpochSeconds),
];

/// Schema of the order rows: where the key lives and which attributes each row needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSchema {
    pub primary_key_attribute: String,
    insert_fields: &'static [FieldSpec],
    update_fields: &'static [FieldSpec],
}

impl Default for OrderSchema {
    fn default() -> Self {
        Self::with_primary_key(attributes::PRIMARY_KEY)
    }
}

impl OrderSchema {
    pub fn with_primary_key(primary_key_attribute: impl Into<String>) -> Self {
        Self {
            primary_key_attribute: primary_key_attribute.into(),
            insert_fields: INSERT_FIELDS,
            update_fields: UPDATE_FIELDS,
        }
    }

    pub fn insert_fields(&self) -> &'static [FieldSpec] {
        self.insert_fields
    }

    pub fn update_fields(&self) -> &'static [FieldSpec] {
        self.update_fields
    }
}

/// Decoded value of a single field
#[derive(Debug, Clone, PartialEq)]
enum FieldValue {
    Text(String),
    Amount(f64),
    EpochSeconds(i64),
}

impl FieldValue {
    fn kind(&self) -> FieldKind {
        match self {
            Self::Text(_) => FieldKind::Text,
            Self::Amount(_) => FieldKind::Amount,
            Self::EpochSeconds(_) => FieldKind::EpochSeconds,
        }
    }

    fn mismatch(&self, attribute: &str, expected: FieldKind) -> SyncError {
        SyncError::type_mismatch(
            attribute,
            format!("schema decodes {:?}, row needs {:?}", self.kind(), expected),
        )
    }
}

/// Validated attributes of one record, keyed by attribute name
#[derive(Debug, Default)]
struct ExtractedFields {
    values: HashMap<&'static str, FieldValue>,
}

impl ExtractedFields {
    fn take(&mut self, attribute: &str) -> Result<FieldValue> {
        self.values
            .remove(attribute)
            .ok_or_else(|| SyncError::missing_field(attribute))
    }

    fn text(&mut self, attribute: &str) -> Result<String> {
        match self.take(attribute)? {
            FieldValue::Text(value) => Ok(value),
            other => Err(other.mismatch(attribute, FieldKind::Text)),
        }
    }

    fn amount(&mut self, attribute: &str) -> Result<f64> {
        match self.take(attribute)? {
            FieldValue::Amount(value) => Ok(value),
            other => Err(other.mismatch(attribute, FieldKind::Amount)),
        }
    }

    fn epoch_seconds(&mut self, attribute: &str) -> Result<i64> {
        match self.take(attribute)? {
            FieldValue::EpochSeconds(value) => Ok(value),
            other => Err(other.mismatch(attribute, FieldKind::EpochSeconds)),
        }
    }
}

/// Pure transformation from change records to insert/update rows
#[derive(Debug, Clone, Default)]
pub struct RecordConverter {
    schema: OrderSchema,
}

impl RecordConverter {
    pub fn new(schema: OrderSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &OrderSchema {
        &self.schema
    }

    pub fn to_insert_record(&self, record: &ChangeRecord) -> Result<InsertRecord> {
        let order_id = self.order_id(record)?;
        let mut fields = extract(&record.new_image, self.schema.insert_fields)?;

        Ok(InsertRecord {
            order_id,
            merchant_id: fields.text(attributes::MERCHANT_ID)?,
            amount: fields.amount(attributes::AMOUNT)?,
            currency: fields.text(attributes::CURRENCY)?,
            status: fields.text(attributes::STATUS)?,
            created_at: fields.epoch_seconds(attributes::CREATED_AT)?,
            updated_at: fields.epoch_seconds(attributes::UPDATED_AT)?,
        })
    }

    pub fn to_update_record(&self, record: &ChangeRecord) -> Result<UpdateRecord> {
        let order_id = self.order_id(record)?;
        let mut fields = extract(&record.new_image, self.schema.update_fields)?;

        Ok(UpdateRecord {
            order_id,
            amount: fields.amount(attributes::AMOUNT)?,
            currency: fields.text(attributes::CURRENCY)?,
            status: fields.text(attributes::STATUS)?,
            updated_at: fields.epoch_seconds(attributes::UPDATED_AT)?,
        })
    }

    fn order_id(&self, record: &ChangeRecord) -> Result<String> {
        let value = record
            .keys
            .get(&self.schema.primary_key_attribute)
            .ok_or_else(|| SyncError::missing_field(fields::ORDER_ID))?;
        decode_text(fields::ORDER_ID, value)
    }
}

fn extract(
    image: &HashMap<String, AttributeValue>,
    specs: &'static [FieldSpec],
) -> Result<ExtractedFields> {
    let mut values = HashMap::with_capacity(specs.len());
    for spec in specs {
        let raw = image
            .get(spec.attribute)
            .ok_or_else(|| SyncError::missing_field(spec.attribute))?;
        let value = match spec.kind {
            FieldKind::Text => FieldValue::Text(decode_text(spec.attribute, raw)?),
            FieldKind::Amount => FieldValue::Amount(decode_amount(spec.attribute, raw)?),
            FieldKind::EpochSeconds => {
                FieldValue::EpochSeconds(decode_epoch_seconds(spec.attribute, raw)?)
            }
        };
        values.insert(spec.attribute, value);
    }
    Ok(ExtractedFields { values })
}

fn decode_text(field: &str, value: &AttributeValue) -> Result<String> {
    match value {
        AttributeValue::S(s) => Ok(s.clone()),
        other => Err(SyncError::type_mismatch(
            field,
            format!("expected S, found {}", other.type_tag()),
        )),
    }
}

fn decode_amount(field: &str, value: &AttributeValue) -> Result<f64> {
    let raw = match value {
        AttributeValue::N(n) => n,
        other => {
            return Err(SyncError::type_mismatch(
                field,
                format!("expected N, found {}", other.type_tag()),
            ))
        }
    };
    let parsed: f64 = raw
        .trim()
        .parse()
        .map_err(|_| SyncError::type_mismatch(field, format!("'{raw}' is not a number")))?;
    if !parsed.is_finite() {
        return Err(SyncError::type_mismatch(
            field,
            format!("'{raw}' is not a finite number"),
        ));
    }
    Ok(parsed)
}

fn decode_epoch_seconds(field: &str, value: &AttributeValue) -> Result<i64> {
    let raw = match value {
        AttributeValue::N(n) => n,
        other => {
            return Err(SyncError::type_mismatch(
                field,
                format!("expected N, found {}", other.type_tag()),
            ))
        }
    };
    let parsed: i64 = raw
        .trim()
        .parse()
        .map_err(|_| SyncError::type_mismatch(field, format!("'{raw}' is not an integer")))?;
    if epoch_to_utc(parsed).is_none() {
        return Err(SyncError::type_mismatch(
            field,
            format!("{parsed} is not a valid non-negative epoch timestamp"),
        ));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventName;
    use proptest::prelude::*;

    fn full_record(event_name: EventName) -> ChangeRecord {
        ChangeRecord::new(event_name)
            .with_key("p_key", AttributeValue::string("ord-1"))
            .with_attribute("merchant_id", AttributeValue::string("m-1"))
            .with_attribute("amount", AttributeValue::number(42.5))
            .with_attribute("currency", AttributeValue::string("USD"))
            .with_attribute("status", AttributeValue::string("NEW"))
            .with_attribute("created_at", AttributeValue::number(1_700_000_000))
            .with_attribute("updated_at", AttributeValue::number(1_700_000_000))
    }

    fn assert_missing(err: SyncError, expected: &str) {
        match err {
            SyncError::MissingField { field } => assert_eq!(field, expected),
            other => panic!("expected MissingField({expected}), got {other:?}"),
        }
    }

    fn assert_mismatch(err: SyncError, expected: &str) {
        match err {
            SyncError::TypeMismatch { field, .. } => assert_eq!(field, expected),
            other => panic!("expected TypeMismatch({expected}), got {other:?}"),
        }
    }

    #[test]
    fn test_insert_conversion() {
        let converter = RecordConverter::default();
        let record = converter
            .to_insert_record(&full_record(EventName::Insert))
            .unwrap();

        assert_eq!(
            record,
            InsertRecord {
                order_id: "ord-1".to_string(),
                merchant_id: "m-1".to_string(),
                amount: 42.5,
                currency: "USD".to_string(),
                status: "NEW".to_string(),
                created_at: 1_700_000_000,
                updated_at: 1_700_000_000,
            }
        );
    }

    #[test]
    fn test_update_conversion_ignores_insert_only_fields() {
        let converter = RecordConverter::default();
        let mut change = full_record(EventName::Modify);
        change.new_image.remove("merchant_id");
        change.new_image.remove("created_at");

        let record = converter.to_update_record(&change).unwrap();
        assert_eq!(record.order_id, "ord-1");
        assert_eq!(record.amount, 42.5);
        assert_eq!(record.updated_at, 1_700_000_000);

        assert_missing(
            converter.to_insert_record(&change).unwrap_err(),
            "merchant_id",
        );
    }

    #[test]
    fn test_missing_primary_key() {
        let converter = RecordConverter::default();
        let mut change = full_record(EventName::Insert);
        change.keys.clear();

        assert_missing(converter.to_insert_record(&change).unwrap_err(), "orderId");
        assert_missing(converter.to_update_record(&change).unwrap_err(), "orderId");
    }

    #[test]
    fn test_custom_primary_key_attribute() {
        let converter = RecordConverter::new(OrderSchema::with_primary_key("order_pk"));
        let change = full_record(EventName::Insert).with_key("order_pk", AttributeValue::string("ord-7"));
        assert_eq!(converter.to_insert_record(&change).unwrap().order_id, "ord-7");
    }

    #[test]
    fn test_amount_type_checks() {
        let converter = RecordConverter::default();

        let change = full_record(EventName::Insert)
            .with_attribute("amount", AttributeValue::string("42.5"));
        assert_mismatch(converter.to_insert_record(&change).unwrap_err(), "amount");

        let change = full_record(EventName::Insert)
            .with_attribute("amount", AttributeValue::N("forty".to_string()));
        assert_mismatch(converter.to_insert_record(&change).unwrap_err(), "amount");

        let change =
            full_record(EventName::Insert).with_attribute("amount", AttributeValue::N("NaN".to_string()));
        assert_mismatch(converter.to_insert_record(&change).unwrap_err(), "amount");

        let change =
            full_record(EventName::Insert).with_attribute("amount", AttributeValue::N("inf".to_string()));
        assert_mismatch(converter.to_update_record(&change).unwrap_err(), "amount");
    }

    #[test]
    fn test_timestamp_type_checks() {
        let converter = RecordConverter::default();

        let change = full_record(EventName::Insert)
            .with_attribute("created_at", AttributeValue::N("1.5".to_string()));
        assert_mismatch(converter.to_insert_record(&change).unwrap_err(), "created_at");

        let change = full_record(EventName::Insert)
            .with_attribute("updated_at", AttributeValue::N("-10".to_string()));
        assert_mismatch(converter.to_update_record(&change).unwrap_err(), "updated_at");

        let change = full_record(EventName::Insert)
            .with_attribute("updated_at", AttributeValue::Bool(true));
        assert_mismatch(converter.to_update_record(&change).unwrap_err(), "updated_at");
    }

    #[test]
    fn test_text_fields_require_string_encoding() {
        let converter = RecordConverter::default();
        let change =
            full_record(EventName::Insert).with_attribute("status", AttributeValue::number(1));
        assert_mismatch(converter.to_insert_record(&change).unwrap_err(), "status");

        let change = full_record(EventName::Insert).with_key("p_key", AttributeValue::number(5));
        assert_mismatch(converter.to_insert_record(&change).unwrap_err(), "orderId");
    }

    #[test]
    fn test_extracted_field_of_wrong_kind_is_type_mismatch() {
        let mut fields = ExtractedFields::default();
        fields
            .values
            .insert(attributes::AMOUNT, FieldValue::Text("42.5".to_string()));

        let err = fields.amount(attributes::AMOUNT).unwrap_err();
        assert_mismatch(err, "amount");
        assert_missing(fields.amount(attributes::AMOUNT).unwrap_err(), "amount");
    }

    #[test]
    fn test_declared_schemas_match_row_getters() {
        let kind_of = |specs: &[FieldSpec], attribute: &str| {
            specs.iter().find(|s| s.attribute == attribute).map(|s| s.kind)
        };
        for specs in [INSERT_FIELDS, UPDATE_FIELDS] {
            assert_eq!(kind_of(specs, attributes::AMOUNT), Some(FieldKind::Amount));
            assert_eq!(kind_of(specs, attributes::CURRENCY), Some(FieldKind::Text));
            assert_eq!(kind_of(specs, attributes::STATUS), Some(FieldKind::Text));
            assert_eq!(kind_of(specs, attributes::UPDATED_AT), Some(FieldKind::EpochSeconds));
        }
        assert_eq!(kind_of(INSERT_FIELDS, attributes::MERCHANT_ID), Some(FieldKind::Text));
        assert_eq!(
            kind_of(INSERT_FIELDS, attributes::CREATED_AT),
            Some(FieldKind::EpochSeconds)
        );
    }

    proptest! {
        #[test]
        fn prop_finite_amounts_and_valid_epochs_convert(
            amount in -1.0e12f64..1.0e12f64,
            created_at in 0i64..4_102_444_800i64,
            updated_at in 0i64..4_102_444_800i64,
        ) {
            let converter = RecordConverter::default();
            let change = full_record(EventName::Insert)
                .with_attribute("amount", AttributeValue::number(amount))
                .with_attribute("created_at", AttributeValue::number(created_at))
                .with_attribute("updated_at", AttributeValue::number(updated_at));

            let record = converter.to_insert_record(&change).unwrap();
            prop_assert_eq!(record.amount, amount);
            prop_assert_eq!(record.created_at, created_at);
            prop_assert_eq!(record.updated_at, updated_at);
        }
    }
}
