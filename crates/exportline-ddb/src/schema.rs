//! Arrow schemas for the curated tables
//!
//! Column order is fixed; the dashboard views select by name but downstream
//! notebooks read positionally.

use std::sync::{Arc, LazyLock};

use arrow::datatypes::{DataType, Field, Schema, TimeUnit};

use crate::entity::EntityKind;

/// Monetary amounts: `Decimal128(38, 10)`
pub const AMOUNT_PRECISION: u8 = 38;
pub const AMOUNT_SCALE: i8 = 10;

fn amount(name: &str) -> Field {
    Field::new(
        name,
        DataType::Decimal128(AMOUNT_PRECISION, AMOUNT_SCALE),
        true,
    )
}

// Stored without a zone so `CAST(.. AS DATE)` needs no ICU; values are UTC
fn timestamp(name: &str) -> Field {
    Field::new(name, DataType::Timestamp(TimeUnit::Microsecond, None), true)
}

pub fn for_kind(kind: EntityKind) -> &'static Arc<Schema> {
    match kind {
        EntityKind::User => users(),
        EntityKind::Donation => donations(),
        EntityKind::DonationLink => donation_links(),
        EntityKind::Access => accesses(),
        EntityKind::Payment => payments(),
    }
}

/// users.parquet
pub fn users() -> &'static Arc<Schema> {
    static SCHEMA: LazyLock<Arc<Schema>> = LazyLock::new(|| {
        Arc::new(Schema::new(vec![
            Field::new("user_id", DataType::Utf8, false),
            Field::new("email", DataType::Utf8, true),
            Field::new("name", DataType::Utf8, true),
            Field::new("active", DataType::Boolean, false),
            timestamp("created_at"),
        ]))
    });
    &SCHEMA
}

/// donations.parquet
pub fn donations() -> &'static Arc<Schema> {
    static SCHEMA: LazyLock<Arc<Schema>> = LazyLock::new(|| {
        Arc::new(Schema::new(vec![
            Field::new("donation_id", DataType::Utf8, false),
            Field::new("user_id", DataType::Utf8, true),
            Field::new("name", DataType::Utf8, true),
            amount("amount_declared"),
            Field::new("closed", DataType::Boolean, false),
            Field::new("active", DataType::Boolean, false),
            timestamp("created_at"),
        ]))
    });
    &SCHEMA
}

/// donation_links.parquet
pub fn donation_links() -> &'static Arc<Schema> {
    static SCHEMA: LazyLock<Arc<Schema>> = LazyLock::new(|| {
        Arc::new(Schema::new(vec![
            Field::new("donation_id", DataType::Utf8, false),
            Field::new("link_name", DataType::Utf8, false),
            Field::new("link_url", DataType::Utf8, false),
        ]))
    });
    &SCHEMA
}

/// accesses.parquet: one row per visit, flags as booleans
pub fn accesses() -> &'static Arc<Schema> {
    static SCHEMA: LazyLock<Arc<Schema>> = LazyLock::new(|| {
        Arc::new(Schema::new(vec![
            Field::new("donation_id", DataType::Utf8, false),
            Field::new("event_key", DataType::Utf8, false),
            Field::new("user_id", DataType::Utf8, true),
            Field::new("acesse_donation", DataType::Boolean, false),
            Field::new("create_pix", DataType::Boolean, false),
            Field::new("create_cartao", DataType::Boolean, false),
            Field::new("create_paypal", DataType::Boolean, false),
            Field::new("create_google", DataType::Boolean, false),
            Field::new("create_pag1", DataType::Boolean, false),
            Field::new("create_pag2", DataType::Boolean, false),
            Field::new("create_pag3", DataType::Boolean, false),
            timestamp("created_at"),
        ]))
    });
    &SCHEMA
}

/// payments.parquet
pub fn payments() -> &'static Arc<Schema> {
    static SCHEMA: LazyLock<Arc<Schema>> = LazyLock::new(|| {
        Arc::new(Schema::new(vec![
            Field::new("txid", DataType::Utf8, false),
            Field::new("donation_id", DataType::Utf8, true),
            Field::new("status", DataType::Utf8, true),
            Field::new("finalizado", DataType::Boolean, false),
            Field::new("tipo_pagamento", DataType::Utf8, true),
            amount("amount"),
            timestamp("paid_at"),
            timestamp("created_at"),
        ]))
    });
    &SCHEMA
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(schema: &Schema) -> Vec<&str> {
        schema.fields().iter().map(|f| f.name().as_str()).collect()
    }

    #[test]
    fn column_order_is_fixed() {
        assert_eq!(names(users()), ["user_id", "email", "name", "active", "created_at"]);
        assert_eq!(names(donation_links()), ["donation_id", "link_name", "link_url"]);
        assert_eq!(
            names(payments()),
            [
                "txid",
                "donation_id",
                "status",
                "finalizado",
                "tipo_pagamento",
                "amount",
                "paid_at",
                "created_at"
            ]
        );
        assert_eq!(accesses().fields().len(), 12);
        assert_eq!(donations().fields().len(), 7);
    }

    #[test]
    fn amounts_are_decimal() {
        let field = payments().field_with_name("amount").unwrap();
        assert_eq!(field.data_type(), &DataType::Decimal128(38, 10));
    }
}
