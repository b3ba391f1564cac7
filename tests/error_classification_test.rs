//! Classification of driver-reported database errors

mod common;

use common::FakeDbError;
use orders_cdc::sync::{ErrorClass, ErrorClassifier, MySqlErrorClassifier, PostgresErrorClassifier};

fn pg(code: &str) -> ErrorClass {
    PostgresErrorClassifier.classify(&FakeDbError::new(code, "test").into_sqlx())
}

#[test]
fn test_postgres_duplicate_key() {
    assert_eq!(pg("23505"), ErrorClass::DuplicateKey);
}

#[test]
fn test_postgres_retryable_codes() {
    for code in ["40001", "40P01", "55P03", "57014", "57P01", "53300", "08006", "08001"] {
        assert_eq!(pg(code), ErrorClass::Retryable, "SQLSTATE {code}");
    }
}

#[test]
fn test_postgres_fatal_codes() {
    for code in ["42P01", "23503", "22P02", "42601"] {
        assert_eq!(pg(code), ErrorClass::Fatal, "SQLSTATE {code}");
    }
}

#[test]
fn test_mysql_classifier_falls_back_to_sqlstate() {
    let classifier = MySqlErrorClassifier;

    let deadlock = FakeDbError::new("40001", "Deadlock found").into_sqlx();
    assert_eq!(classifier.classify(&deadlock), ErrorClass::Retryable);

    // Without the server error number a 23000 integrity error is not provably a duplicate
    let integrity = FakeDbError::new("23000", "Integrity constraint violation").into_sqlx();
    assert_eq!(classifier.classify(&integrity), ErrorClass::Fatal);
}

#[test]
fn test_row_not_found_is_fatal_for_both_drivers() {
    assert_eq!(
        PostgresErrorClassifier.classify(&sqlx::Error::RowNotFound),
        ErrorClass::Fatal
    );
    assert_eq!(
        MySqlErrorClassifier.classify(&sqlx::Error::RowNotFound),
        ErrorClass::Fatal
    );
}
