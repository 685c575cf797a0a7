//! Entity rows → Arrow `RecordBatch` accumulators

use std::sync::Arc;

use arrow::array::*;
use arrow::datatypes::Schema;
use arrow::error::ArrowError;
use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use chrono::{DateTime, Utc};
use exportline_core::{Accumulator, DEFAULT_BATCH_SIZE};

use crate::entity::{AccessEvent, Donation, DonationLink, Payment, User};
use crate::schema::{self, AMOUNT_PRECISION, AMOUNT_SCALE};

/// Largest unscaled magnitude that fits 38 digits
const MAX_UNSCALED: u128 = 10u128.pow(AMOUNT_PRECISION as u32);

/// Unscaled `Decimal128(38, 10)` value. Digits past the scale are truncated;
/// values beyond 38 digits become null.
pub fn decimal_to_i128(value: &BigDecimal) -> Option<i128> {
    if value.is_zero() {
        return Some(0);
    }
    // Bound the magnitude before rescaling; `with_scale` on an extreme
    // exponent materializes a huge power of ten
    let (_, exponent) = value.as_bigint_and_exponent();
    let int_digits = value.digits() as i64 - exponent;
    if int_digits > i64::from(AMOUNT_PRECISION) - i64::from(AMOUNT_SCALE) {
        log::debug!(
            "amount with {int_digits} integer digits exceeds Decimal128({AMOUNT_PRECISION}, {AMOUNT_SCALE})"
        );
        return None;
    }
    if int_digits < -i64::from(AMOUNT_SCALE) {
        return Some(0);
    }
    let (digits, _) = value
        .with_scale(i64::from(AMOUNT_SCALE))
        .into_bigint_and_exponent();
    let raw = digits.to_i128()?;
    if raw.unsigned_abs() < MAX_UNSCALED {
        Some(raw)
    } else {
        log::debug!("amount {value} exceeds Decimal128({AMOUNT_PRECISION}, {AMOUNT_SCALE})");
        None
    }
}

fn micros(ts: Option<DateTime<Utc>>) -> Option<i64> {
    ts.map(|t| t.timestamp_micros())
}

fn amount_array(values: Vec<Option<i128>>) -> Result<ArrayRef, ArrowError> {
    let array = Decimal128Array::from(values).with_precision_and_scale(AMOUNT_PRECISION, AMOUNT_SCALE)?;
    Ok(Arc::new(array))
}

fn timestamp_array(values: Vec<Option<i64>>) -> ArrayRef {
    Arc::new(TimestampMicrosecondArray::from(values))
}

fn take<T>(v: &mut Vec<T>) -> Vec<T> {
    std::mem::replace(v, Vec::with_capacity(DEFAULT_BATCH_SIZE))
}

// === users ===

pub struct UserAccumulator {
    schema: Arc<Schema>,
    user_id: Vec<String>,
    email: Vec<Option<String>>,
    name: Vec<Option<String>>,
    active: Vec<bool>,
    created_at: Vec<Option<i64>>,
}

impl UserAccumulator {
    pub fn new() -> Self {
        Self {
            schema: schema::users().clone(),
            user_id: Vec::with_capacity(DEFAULT_BATCH_SIZE),
            email: Vec::with_capacity(DEFAULT_BATCH_SIZE),
            name: Vec::with_capacity(DEFAULT_BATCH_SIZE),
            active: Vec::with_capacity(DEFAULT_BATCH_SIZE),
            created_at: Vec::with_capacity(DEFAULT_BATCH_SIZE),
        }
    }
}

impl Default for UserAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Accumulator for UserAccumulator {
    type Row = User;

    fn push(&mut self, row: User) {
        self.user_id.push(row.user_id);
        self.email.push(row.email);
        self.name.push(row.name);
        self.active.push(row.active);
        self.created_at.push(micros(row.created_at));
    }

    fn len(&self) -> usize {
        self.user_id.len()
    }

    fn take_batch(&mut self) -> Result<RecordBatch, ArrowError> {
        let arrays: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(take(&mut self.user_id))),
            Arc::new(StringArray::from(take(&mut self.email))),
            Arc::new(StringArray::from(take(&mut self.name))),
            Arc::new(BooleanArray::from(take(&mut self.active))),
            timestamp_array(take(&mut self.created_at)),
        ];
        RecordBatch::try_new(self.schema.clone(), arrays)
    }
}

// === donations ===

pub struct DonationAccumulator {
    schema: Arc<Schema>,
    donation_id: Vec<String>,
    user_id: Vec<Option<String>>,
    name: Vec<Option<String>>,
    amount_declared: Vec<Option<i128>>,
    closed: Vec<bool>,
    active: Vec<bool>,
    created_at: Vec<Option<i64>>,
}

impl DonationAccumulator {
    pub fn new() -> Self {
        Self {
            schema: schema::donations().clone(),
            donation_id: Vec::with_capacity(DEFAULT_BATCH_SIZE),
            user_id: Vec::with_capacity(DEFAULT_BATCH_SIZE),
            name: Vec::with_capacity(DEFAULT_BATCH_SIZE),
            amount_declared: Vec::with_capacity(DEFAULT_BATCH_SIZE),
            closed: Vec::with_capacity(DEFAULT_BATCH_SIZE),
            active: Vec::with_capacity(DEFAULT_BATCH_SIZE),
            created_at: Vec::with_capacity(DEFAULT_BATCH_SIZE),
        }
    }
}

impl Default for DonationAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Accumulator for DonationAccumulator {
    type Row = Donation;

    fn push(&mut self, row: Donation) {
        self.donation_id.push(row.donation_id);
        self.user_id.push(row.user_id);
        self.name.push(row.name);
        self.amount_declared
            .push(row.amount_declared.as_ref().and_then(decimal_to_i128));
        self.closed.push(row.closed);
        self.active.push(row.active);
        self.created_at.push(micros(row.created_at));
    }

    fn len(&self) -> usize {
        self.donation_id.len()
    }

    fn take_batch(&mut self) -> Result<RecordBatch, ArrowError> {
        let arrays: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(take(&mut self.donation_id))),
            Arc::new(StringArray::from(take(&mut self.user_id))),
            Arc::new(StringArray::from(take(&mut self.name))),
            amount_array(take(&mut self.amount_declared))?,
            Arc::new(BooleanArray::from(take(&mut self.closed))),
            Arc::new(BooleanArray::from(take(&mut self.active))),
            timestamp_array(take(&mut self.created_at)),
        ];
        RecordBatch::try_new(self.schema.clone(), arrays)
    }
}

// === donation_links ===

pub struct DonationLinkAccumulator {
    schema: Arc<Schema>,
    donation_id: Vec<String>,
    link_name: Vec<String>,
    link_url: Vec<String>,
}

impl DonationLinkAccumulator {
    pub fn new() -> Self {
        Self {
            schema: schema::donation_links().clone(),
            donation_id: Vec::new(),
            link_name: Vec::new(),
            link_url: Vec::new(),
        }
    }
}

impl Default for DonationLinkAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Accumulator for DonationLinkAccumulator {
    type Row = DonationLink;

    fn push(&mut self, row: DonationLink) {
        self.donation_id.push(row.donation_id);
        self.link_name.push(row.link_name);
        self.link_url.push(row.link_url);
    }

    fn len(&self) -> usize {
        self.donation_id.len()
    }

    fn take_batch(&mut self) -> Result<RecordBatch, ArrowError> {
        let arrays: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(std::mem::take(&mut self.donation_id))),
            Arc::new(StringArray::from(std::mem::take(&mut self.link_name))),
            Arc::new(StringArray::from(std::mem::take(&mut self.link_url))),
        ];
        RecordBatch::try_new(self.schema.clone(), arrays)
    }
}

// === accesses ===

pub struct AccessAccumulator {
    schema: Arc<Schema>,
    donation_id: Vec<String>,
    event_key: Vec<String>,
    user_id: Vec<Option<String>>,
    acesse_donation: Vec<bool>,
    create_pix: Vec<bool>,
    create_cartao: Vec<bool>,
    create_paypal: Vec<bool>,
    create_google: Vec<bool>,
    create_pag1: Vec<bool>,
    create_pag2: Vec<bool>,
    create_pag3: Vec<bool>,
    created_at: Vec<Option<i64>>,
}

impl AccessAccumulator {
    pub fn new() -> Self {
        Self {
            schema: schema::accesses().clone(),
            donation_id: Vec::with_capacity(DEFAULT_BATCH_SIZE),
            event_key: Vec::with_capacity(DEFAULT_BATCH_SIZE),
            user_id: Vec::with_capacity(DEFAULT_BATCH_SIZE),
            acesse_donation: Vec::with_capacity(DEFAULT_BATCH_SIZE),
            create_pix: Vec::with_capacity(DEFAULT_BATCH_SIZE),
            create_cartao: Vec::with_capacity(DEFAULT_BATCH_SIZE),
            create_paypal: Vec::with_capacity(DEFAULT_BATCH_SIZE),
            create_google: Vec::with_capacity(DEFAULT_BATCH_SIZE),
            create_pag1: Vec::with_capacity(DEFAULT_BATCH_SIZE),
            create_pag2: Vec::with_capacity(DEFAULT_BATCH_SIZE),
            create_pag3: Vec::with_capacity(DEFAULT_BATCH_SIZE),
            created_at: Vec::with_capacity(DEFAULT_BATCH_SIZE),
        }
    }
}

impl Default for AccessAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Accumulator for AccessAccumulator {
    type Row = AccessEvent;

    fn push(&mut self, row: AccessEvent) {
        let flags = row.flags;
        self.donation_id.push(row.donation_id);
        self.event_key.push(row.event_key);
        self.user_id.push(row.user_id);
        self.acesse_donation.push(flags.acesse_donation);
        self.create_pix.push(flags.create_pix);
        self.create_cartao.push(flags.create_cartao);
        self.create_paypal.push(flags.create_paypal);
        self.create_google.push(flags.create_google);
        self.create_pag1.push(flags.create_pag1);
        self.create_pag2.push(flags.create_pag2);
        self.create_pag3.push(flags.create_pag3);
        self.created_at.push(micros(row.created_at));
    }

    fn len(&self) -> usize {
        self.donation_id.len()
    }

    fn take_batch(&mut self) -> Result<RecordBatch, ArrowError> {
        let arrays: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(take(&mut self.donation_id))),
            Arc::new(StringArray::from(take(&mut self.event_key))),
            Arc::new(StringArray::from(take(&mut self.user_id))),
            Arc::new(BooleanArray::from(take(&mut self.acesse_donation))),
            Arc::new(BooleanArray::from(take(&mut self.create_pix))),
            Arc::new(BooleanArray::from(take(&mut self.create_cartao))),
            Arc::new(BooleanArray::from(take(&mut self.create_paypal))),
            Arc::new(BooleanArray::from(take(&mut self.create_google))),
            Arc::new(BooleanArray::from(take(&mut self.create_pag1))),
            Arc::new(BooleanArray::from(take(&mut self.create_pag2))),
            Arc::new(BooleanArray::from(take(&mut self.create_pag3))),
            timestamp_array(take(&mut self.created_at)),
        ];
        RecordBatch::try_new(self.schema.clone(), arrays)
    }
}

// === payments ===

pub struct PaymentAccumulator {
    schema: Arc<Schema>,
    txid: Vec<String>,
    donation_id: Vec<Option<String>>,
    status: Vec<Option<String>>,
    finalizado: Vec<bool>,
    tipo_pagamento: Vec<Option<String>>,
    amount: Vec<Option<i128>>,
    paid_at: Vec<Option<i64>>,
    created_at: Vec<Option<i64>>,
}

impl PaymentAccumulator {
    pub fn new() -> Self {
        Self {
            schema: schema::payments().clone(),
            txid: Vec::with_capacity(DEFAULT_BATCH_SIZE),
            donation_id: Vec::with_capacity(DEFAULT_BATCH_SIZE),
            status: Vec::with_capacity(DEFAULT_BATCH_SIZE),
            finalizado: Vec::with_capacity(DEFAULT_BATCH_SIZE),
            tipo_pagamento: Vec::with_capacity(DEFAULT_BATCH_SIZE),
            amount: Vec::with_capacity(DEFAULT_BATCH_SIZE),
            paid_at: Vec::with_capacity(DEFAULT_BATCH_SIZE),
            created_at: Vec::with_capacity(DEFAULT_BATCH_SIZE),
        }
    }
}

impl Default for PaymentAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Accumulator for PaymentAccumulator {
    type Row = Payment;

    fn push(&mut self, row: Payment) {
        self.txid.push(row.txid);
        self.donation_id.push(row.donation_id);
        self.status.push(row.status);
        self.finalizado.push(row.finalizado);
        self.tipo_pagamento.push(row.tipo_pagamento);
        self.amount.push(row.amount.as_ref().and_then(decimal_to_i128));
        self.paid_at.push(micros(row.paid_at));
        self.created_at.push(micros(row.created_at));
    }

    fn len(&self) -> usize {
        self.txid.len()
    }

    fn take_batch(&mut self) -> Result<RecordBatch, ArrowError> {
        let arrays: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(take(&mut self.txid))),
            Arc::new(StringArray::from(take(&mut self.donation_id))),
            Arc::new(StringArray::from(take(&mut self.status))),
            Arc::new(BooleanArray::from(take(&mut self.finalizado))),
            Arc::new(StringArray::from(take(&mut self.tipo_pagamento))),
            amount_array(take(&mut self.amount))?,
            timestamp_array(take(&mut self.paid_at)),
            timestamp_array(take(&mut self.created_at)),
        ];
        RecordBatch::try_new(self.schema.clone(), arrays)
    }
}
