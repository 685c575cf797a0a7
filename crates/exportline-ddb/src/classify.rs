//! Single-table key patterns → typed entities
//!
//! | PK            | SK              | entity        |
//! |---------------|-----------------|---------------|
//! | `USER#id`     | `PROFILE`       | User          |
//! | `DONATION#id` | `PROFILE`       | Donation      |
//! | `DONATION#id` | `VIS#...`       | Access event  |
//! | `LINK#slug`   | `DONATION#id`   | Donation link |
//! | `TX#txid`     | `STATUS`        | Payment       |

use crate::coerce;
use crate::entity::{
    AccessEvent, AccessFlags, Donation, DonationLink, EntityRecord, Payment, User,
};
use crate::value::RawRecord;

pub const DEFAULT_LINK_BASE_URL: &str = "https://www.thepuregrace.com/";

const PROFILE: &str = "PROFILE";
const STATUS: &str = "STATUS";
const VISIT_PREFIX: &str = "VIS#";
const DONATION_PREFIX: &str = "DONATION#";

#[derive(Debug, Clone)]
pub struct Classifier {
    link_base_url: String,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(DEFAULT_LINK_BASE_URL)
    }
}

impl Classifier {
    /// `link_base_url` gets a trailing `/` if it lacks one
    pub fn new(link_base_url: impl Into<String>) -> Self {
        let mut link_base_url = link_base_url.into();
        if !link_base_url.ends_with('/') {
            link_base_url.push('/');
        }
        Self { link_base_url }
    }

    pub fn link_base_url(&self) -> &str {
        &self.link_base_url
    }

    /// Project a record into the one entity its keys identify, or `None`.
    pub fn classify(&self, record: &RawRecord) -> Option<EntityRecord> {
        let (kind, id) = record.pk()?.split_once('#')?;
        let sk = record.sk()?;

        match (kind, sk) {
            ("USER", PROFILE) => Some(EntityRecord::User(user(id, record))),
            ("DONATION", PROFILE) => Some(EntityRecord::Donation(donation(id, record))),
            ("DONATION", sk) if sk.starts_with(VISIT_PREFIX) => {
                Some(EntityRecord::Access(access(id, sk, record)))
            }
            ("LINK", sk) if sk.starts_with(DONATION_PREFIX) => Some(EntityRecord::DonationLink(
                self.link(id, &sk[DONATION_PREFIX.len()..]),
            )),
            ("TX", STATUS) => Some(EntityRecord::Payment(payment(id, record))),
            _ => None,
        }
    }

    fn link(&self, slug: &str, donation_id: &str) -> DonationLink {
        DonationLink {
            donation_id: donation_id.to_string(),
            link_name: slug.to_string(),
            link_url: format!("{}{slug}", self.link_base_url),
        }
    }
}

fn user(id: &str, r: &RawRecord) -> User {
    User {
        user_id: id.to_string(),
        email: coerce::string(r.get("email")),
        name: coerce::string(r.get("name")),
        active: coerce::flag(r.get("active")),
        created_at: coerce::timestamp(r.get("date_create")),
    }
}

fn donation(id: &str, r: &RawRecord) -> Donation {
    Donation {
        donation_id: id.to_string(),
        user_id: coerce::string(r.get("id_user")),
        name: coerce::string(r.get("name")),
        amount_declared: coerce::decimal(r.get("valor")),
        closed: coerce::flag(r.get("closed")),
        active: coerce::flag(r.get("active")),
        created_at: coerce::timestamp(r.get("date_create")),
    }
}

fn access(donation_id: &str, sk: &str, r: &RawRecord) -> AccessEvent {
    AccessEvent {
        donation_id: donation_id.to_string(),
        event_key: sk.to_string(),
        user_id: coerce::string(r.get("id_user")),
        flags: AccessFlags {
            acesse_donation: coerce::flag(r.get("acesse_donation")),
            create_pix: coerce::flag(r.get("create_pix")),
            create_cartao: coerce::flag(r.get("create_cartao")),
            create_paypal: coerce::flag(r.get("create_paypal")),
            create_google: coerce::flag(r.get("create_google")),
            create_pag1: coerce::flag(r.get("create_pag1")),
            create_pag2: coerce::flag(r.get("create_pag2")),
            create_pag3: coerce::flag(r.get("create_pag3")),
        },
        created_at: coerce::timestamp(r.get("date_create")),
    }
}

fn payment(txid: &str, r: &RawRecord) -> Payment {
    Payment {
        txid: txid.to_string(),
        donation_id: coerce::string(r.get("id_doacao")),
        status: coerce::string(r.get("status")),
        finalizado: coerce::flag(r.get("finalizado")),
        tipo_pagamento: coerce::string(r.get("tipo_pagamento")),
        amount: coerce::decimal(r.get("valor")),
        paid_at: coerce::timestamp(r.get("data_pago")),
        created_at: coerce::timestamp(r.get("date_create")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityKind;
    use crate::value::{AttrValue, decode_item};
    use bigdecimal::BigDecimal;
    use serde_json::{Value, json};
    use std::str::FromStr;

    fn record(item: Value) -> RawRecord {
        decode_item(item.as_object().unwrap(), |name, e| panic!("{name}: {e}"))
    }

    #[test]
    fn user_profile() {
        let r = record(json!({
            "PK": {"S": "USER#u1"},
            "SK": {"S": "PROFILE"},
            "email": {"S": "a@b.c"},
            "name": {"S": "Ana"},
            "active": {"BOOL": true},
            "date_create": {"S": "2024-01-02T10:00:00Z"}
        }));
        let Some(EntityRecord::User(u)) = Classifier::default().classify(&r) else {
            panic!("expected user");
        };
        assert_eq!(u.user_id, "u1");
        assert_eq!(u.email.as_deref(), Some("a@b.c"));
        assert!(u.active);
        assert!(u.created_at.is_some());
    }

    #[test]
    fn donation_profile_keeps_decimal_amount() {
        let r = record(json!({
            "PK": {"S": "DONATION#d1"},
            "SK": {"S": "PROFILE"},
            "id_user": {"S": "u1"},
            "valor": {"N": "19.99"},
            "closed": {"BOOL": false}
        }));
        let Some(EntityRecord::Donation(d)) = Classifier::default().classify(&r) else {
            panic!("expected donation");
        };
        assert_eq!(d.donation_id, "d1");
        assert_eq!(d.user_id.as_deref(), Some("u1"));
        assert_eq!(d.amount_declared, Some(BigDecimal::from_str("19.99").unwrap()));
        assert!(!d.closed);
        assert!(!d.active, "missing flag coerces to false");
    }

    #[test]
    fn visit_under_donation_is_access() {
        let r = record(json!({
            "PK": {"S": "DONATION#d1"},
            "SK": {"S": "VIS#2024-01-02#abc"},
            "acesse_donation": {"BOOL": true},
            "create_pag2": {"N": "1"}
        }));
        let Some(EntityRecord::Access(a)) = Classifier::default().classify(&r) else {
            panic!("expected access");
        };
        assert_eq!(a.donation_id, "d1");
        assert_eq!(a.event_key, "VIS#2024-01-02#abc");
        assert!(a.flags.acesse_donation);
        assert!(a.flags.page_click());
        assert!(!a.flags.create_pix);
    }

    #[test]
    fn link_uses_configured_base() {
        let r = record(json!({"PK": {"S": "LINK#ajude-ana"}, "SK": {"S": "DONATION#d1"}}));
        let Some(EntityRecord::DonationLink(l)) = Classifier::new("https://example.org").classify(&r)
        else {
            panic!("expected link");
        };
        assert_eq!(l.donation_id, "d1");
        assert_eq!(l.link_name, "ajude-ana");
        assert_eq!(l.link_url, "https://example.org/ajude-ana");
    }

    #[test]
    fn default_link_base() {
        let r = record(json!({"PK": {"S": "LINK#x"}, "SK": {"S": "DONATION#d1"}}));
        let Some(EntityRecord::DonationLink(l)) = Classifier::default().classify(&r) else {
            panic!("expected link");
        };
        assert_eq!(l.link_url, "https://www.thepuregrace.com/x");
    }

    #[test]
    fn payment_status() {
        let r = record(json!({
            "PK": {"S": "TX#t1"},
            "SK": {"S": "STATUS"},
            "id_doacao": {"S": "d1"},
            "status": {"S": "paid"},
            "finalizado": {"BOOL": true},
            "tipo_pagamento": {"S": "pix"},
            "valor": {"S": "50.00"},
            "data_pago": {"S": "2024-01-03 09:15:00"}
        }));
        let Some(EntityRecord::Payment(p)) = Classifier::default().classify(&r) else {
            panic!("expected payment");
        };
        assert_eq!(p.txid, "t1");
        assert_eq!(p.donation_id.as_deref(), Some("d1"));
        assert!(p.finalizado);
        assert_eq!(p.amount, Some(BigDecimal::from_str("50").unwrap()));
        assert!(p.paid_at.is_some());
        assert!(p.created_at.is_none());
    }

    #[test]
    fn unmatched_patterns_drop() {
        let c = Classifier::default();
        for (pk, sk) in [
            ("USER#u1", "SETTINGS"),
            ("DONATION#d1", "COMMENT#1"),
            ("LINK#x", "USER#u1"),
            ("TX#t1", "EVENT#1"),
            ("SESSION#s1", "PROFILE"),
            ("USER", "PROFILE"),
        ] {
            let r = record(json!({"PK": {"S": pk}, "SK": {"S": sk}}));
            assert_eq!(c.classify(&r), None, "{pk} / {sk}");
        }
    }

    #[test]
    fn non_string_keys_drop() {
        let mut r = RawRecord::default();
        r.insert("PK", AttrValue::N(BigDecimal::from(1)));
        r.insert("SK", AttrValue::S("PROFILE".into()));
        assert_eq!(Classifier::default().classify(&r), None);
    }

    #[test]
    fn classify_is_idempotent() {
        let c = Classifier::default();
        let r = record(json!({"PK": {"S": "TX#t9"}, "SK": {"S": "STATUS"}, "valor": {"N": "1.5"}}));
        let first = c.classify(&r);
        assert_eq!(first, c.classify(&r));
        assert_eq!(first.map(|e| e.kind()), Some(EntityKind::Payment));
    }
}
