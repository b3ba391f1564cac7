//! SQL text for the order table, rendered once per table and driver.

use super::connection::DatabaseDriver;

const INSERT_COLUMNS: &str =
    "order_id, merchant_id, amount, currency, status, created_at, updated_at";

/// Prepared-statement text for one target table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderStatements {
    pub insert: String,
    pub update: String,
}

impl OrderStatements {
    /// `table` must already be a validated identifier; it is interpolated verbatim
    pub fn for_driver(driver: DatabaseDriver, table: &str) -> Self {
        match driver {
            DatabaseDriver::MySql => Self {
                insert: format!(
                    "INSERT INTO {table} ({INSERT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?)"
                ),
                update: format!(
                    "UPDATE {table} SET amount = ?, currency = ?, status = ?, updated_at = ? \
                     WHERE order_id = ?"
                ),
            },
            DatabaseDriver::Postgres => Self {
                insert: format!(
                    "INSERT INTO {table} ({INSERT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, \
                     CAST($6 AS TIMESTAMP), CAST($7 AS TIMESTAMP))"
                ),
                update: format!(
                    "UPDATE {table} SET amount = $1, currency = $2, status = $3, \
                     updated_at = CAST($4 AS TIMESTAMP) WHERE order_id = $5"
                ),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mysql_statements() {
        let statements = OrderStatements::for_driver(DatabaseDriver::MySql, "tbl_orders");
        assert_eq!(
            statements.insert,
            "INSERT INTO tbl_orders (order_id, merchant_id, amount, currency, status, \
             created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)"
        );
        assert_eq!(
            statements.update,
            "UPDATE tbl_orders SET amount = ?, currency = ?, status = ?, updated_at = ? \
             WHERE order_id = ?"
        );
    }

    #[test]
    fn test_postgres_statements_number_placeholders() {
        let statements = OrderStatements::for_driver(DatabaseDriver::Postgres, "sales.orders");
        assert!(statements.insert.starts_with("INSERT INTO sales.orders ("));
        assert!(statements.insert.contains("CAST($7 AS TIMESTAMP)"));
        assert!(statements.update.ends_with("WHERE order_id = $5"));
        assert!(!statements.update.contains('?'));
    }
}
