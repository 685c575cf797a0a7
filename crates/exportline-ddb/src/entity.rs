//! Typed rows for the five business entities

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub user_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Donation {
    pub donation_id: String,
    pub user_id: Option<String>,
    pub name: Option<String>,
    pub amount_declared: Option<BigDecimal>,
    pub closed: bool,
    pub active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

/// Public short link pointing at a donation page
#[derive(Debug, Clone, PartialEq)]
pub struct DonationLink {
    pub donation_id: String,
    pub link_name: String,
    pub link_url: String,
}

/// Interaction flags recorded on a visit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessFlags {
    pub acesse_donation: bool,
    pub create_pix: bool,
    pub create_cartao: bool,
    pub create_paypal: bool,
    pub create_google: bool,
    pub create_pag1: bool,
    pub create_pag2: bool,
    pub create_pag3: bool,
}

impl AccessFlags {
    /// Any of the three generic payment-page buttons
    pub fn page_click(&self) -> bool {
        self.create_pag1 || self.create_pag2 || self.create_pag3
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccessEvent {
    pub donation_id: String,
    /// Full sort key; unique per visit within a donation
    pub event_key: String,
    pub user_id: Option<String>,
    pub flags: AccessFlags,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    pub txid: String,
    pub donation_id: Option<String>,
    pub status: Option<String>,
    pub finalizado: bool,
    pub tipo_pagamento: Option<String>,
    pub amount: Option<BigDecimal>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Output of classification: exactly one entity per recognised item
#[derive(Debug, Clone, PartialEq)]
pub enum EntityRecord {
    User(User),
    Donation(Donation),
    DonationLink(DonationLink),
    Access(AccessEvent),
    Payment(Payment),
}

impl EntityRecord {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::User(_) => EntityKind::User,
            Self::Donation(_) => EntityKind::Donation,
            Self::DonationLink(_) => EntityKind::DonationLink,
            Self::Access(_) => EntityKind::Access,
            Self::Payment(_) => EntityKind::Payment,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    User,
    Donation,
    DonationLink,
    Access,
    Payment,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        Self::User,
        Self::Donation,
        Self::DonationLink,
        Self::Access,
        Self::Payment,
    ];

    /// Curated table name
    pub fn table_name(self) -> &'static str {
        match self {
            Self::User => "users",
            Self::Donation => "donations",
            Self::DonationLink => "donation_links",
            Self::Access => "accesses",
            Self::Payment => "payments",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table_name())
    }
}
