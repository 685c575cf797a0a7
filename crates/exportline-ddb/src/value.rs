//! Tagged attribute values as written by the table export
//!
//! Every attribute in an exported item is a single-key JSON object whose key
//! names the type:
//! ```json
//! {"S": "abc"}  {"N": "19.99"}  {"BOOL": true}  {"NULL": true}
//! {"L": [{"S": "a"}, {"N": "1"}]}  {"M": {"k": {"S": "v"}}}
//! {"SS": ["a", "b"]}  {"NS": ["1", "2.5"]}
//! ```
//! Numbers travel as strings and are decoded to [`BigDecimal`] so monetary
//! amounts never pass through a binary float.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde_json::{Map, Value, json};

/// Decoded attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    S(String),
    N(BigDecimal),
    Bool(bool),
    Null,
    L(Vec<AttrValue>),
    M(BTreeMap<String, AttrValue>),
    Ss(BTreeSet<String>),
    Ns(BTreeSet<BigDecimal>),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed value: {0}")]
    MalformedValue(String),
}

impl DecodeError {
    fn malformed(tag: &str, payload: &Value) -> Self {
        let mut shown = payload.to_string();
        if let Some((cut, _)) = shown.char_indices().nth(64) {
            shown.truncate(cut);
            shown.push_str("...");
        }
        Self::MalformedValue(format!("{tag} payload {shown}"))
    }
}

/// Decode one tagged attribute value.
///
/// Tags are checked in a fixed order (`S`, `N`, `BOOL`, `NULL`, `M`, `L`,
/// `SS`, `NS`); the first one present wins. Nested members of `L` and `M`
/// are decoded recursively.
pub fn decode(value: &Value) -> Result<AttrValue, DecodeError> {
    let Some(obj) = value.as_object() else {
        return Err(DecodeError::malformed("untagged", value));
    };

    if let Some(v) = obj.get("S") {
        return v
            .as_str()
            .map(|s| AttrValue::S(s.to_string()))
            .ok_or_else(|| DecodeError::malformed("S", v));
    }
    if let Some(v) = obj.get("N") {
        return parse_number(v)
            .map(AttrValue::N)
            .ok_or_else(|| DecodeError::malformed("N", v));
    }
    if let Some(v) = obj.get("BOOL") {
        return v
            .as_bool()
            .map(AttrValue::Bool)
            .ok_or_else(|| DecodeError::malformed("BOOL", v));
    }
    if obj.contains_key("NULL") {
        return Ok(AttrValue::Null);
    }
    if let Some(v) = obj.get("M") {
        let Some(members) = v.as_object() else {
            return Err(DecodeError::malformed("M", v));
        };
        let mut map = BTreeMap::new();
        for (name, member) in members {
            map.insert(name.clone(), decode(member)?);
        }
        return Ok(AttrValue::M(map));
    }
    if let Some(v) = obj.get("L") {
        let Some(items) = v.as_array() else {
            return Err(DecodeError::malformed("L", v));
        };
        return items.iter().map(decode).collect::<Result<_, _>>().map(AttrValue::L);
    }
    if let Some(v) = obj.get("SS") {
        let Some(items) = v.as_array() else {
            return Err(DecodeError::malformed("SS", v));
        };
        return items
            .iter()
            .map(|s| s.as_str().map(str::to_string))
            .collect::<Option<BTreeSet<_>>>()
            .map(AttrValue::Ss)
            .ok_or_else(|| DecodeError::malformed("SS", v));
    }
    if let Some(v) = obj.get("NS") {
        let Some(items) = v.as_array() else {
            return Err(DecodeError::malformed("NS", v));
        };
        return items
            .iter()
            .map(parse_number)
            .collect::<Option<BTreeSet<_>>>()
            .map(AttrValue::Ns)
            .ok_or_else(|| DecodeError::malformed("NS", v));
    }

    Err(DecodeError::malformed("unrecognized tag", value))
}

/// Number payloads are strings; bare JSON numbers are accepted as a courtesy.
fn parse_number(v: &Value) -> Option<BigDecimal> {
    match v {
        Value::String(s) => BigDecimal::from_str(s.trim()).ok(),
        Value::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}

impl AttrValue {
    /// Re-encode into the tagged JSON shape accepted by [`decode`].
    pub fn to_tagged(&self) -> Value {
        match self {
            Self::S(s) => json!({ "S": s }),
            Self::N(n) => json!({ "N": n.to_string() }),
            Self::Bool(b) => json!({ "BOOL": b }),
            Self::Null => json!({ "NULL": true }),
            Self::L(items) => json!({ "L": items.iter().map(Self::to_tagged).collect::<Vec<_>>() }),
            Self::M(map) => {
                let members: Map<String, Value> = map
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_tagged()))
                    .collect();
                json!({ "M": members })
            }
            Self::Ss(set) => json!({ "SS": set }),
            Self::Ns(set) => json!({ "NS": set.iter().map(|n| n.to_string()).collect::<Vec<_>>() }),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::S(s) => Some(s),
            _ => None,
        }
    }
}

/// One exported item: attribute name → decoded value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    attrs: BTreeMap<String, AttrValue>,
}

/// Partition key attribute of the single-table layout
pub const PK_ATTR: &str = "PK";
/// Sort key attribute of the single-table layout
pub const SK_ATTR: &str = "SK";

impl RawRecord {
    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    /// String attribute, `None` when missing or not a string
    pub fn str_attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).and_then(AttrValue::as_str)
    }

    pub fn pk(&self) -> Option<&str> {
        self.str_attr(PK_ATTR)
    }

    pub fn sk(&self) -> Option<&str> {
        self.str_attr(SK_ATTR)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: AttrValue) {
        self.attrs.insert(name.into(), value);
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }
}

impl FromIterator<(String, AttrValue)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (String, AttrValue)>>(iter: I) -> Self {
        Self {
            attrs: iter.into_iter().collect(),
        }
    }
}

/// Decode every attribute of an exported `Item`.
///
/// Attributes that fail to decode are left out of the record and handed to
/// `on_error`, so one odd attribute doesn't cost the whole item.
pub fn decode_item(
    item: &Map<String, Value>,
    mut on_error: impl FnMut(&str, DecodeError),
) -> RawRecord {
    let mut record = RawRecord::default();
    for (name, tagged) in item {
        match decode(tagged) {
            Ok(value) => record.insert(name.clone(), value),
            Err(e) => on_error(name, e),
        }
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn malformed_message_truncates_on_char_boundary() {
        // multibyte chars straddle byte 64 of the rendered payload
        let payload = "€".repeat(100);
        let err = decode(&json!({ "X": payload })).unwrap_err();
        let DecodeError::MalformedValue(msg) = err;
        assert!(msg.ends_with("..."), "{msg}");
        assert_eq!(msg.chars().filter(|c| *c == '€').count(), 58);

        // short payloads are shown whole
        let DecodeError::MalformedValue(msg) = decode(&json!({ "X": "€€" })).unwrap_err();
        assert!(msg.contains("€€") && !msg.ends_with("..."), "{msg}");
    }

    fn roundtrip(v: &Value) {
        let first = decode(v).unwrap();
        let second = decode(&first.to_tagged()).unwrap();
        assert_eq!(first, second, "round-trip changed {v}");
    }

    #[test]
    fn decodes_scalars() {
        assert_eq!(decode(&json!({"S": "abc"})).unwrap(), AttrValue::S("abc".into()));
        assert_eq!(decode(&json!({"BOOL": false})).unwrap(), AttrValue::Bool(false));
        assert_eq!(decode(&json!({"NULL": true})).unwrap(), AttrValue::Null);
    }

    #[test]
    fn number_keeps_exact_decimal() {
        let v = decode(&json!({"N": "19.99"})).unwrap();
        assert_eq!(v, AttrValue::N(dec("19.99")));
        // 0.1 + 0.2 is exact in decimal
        let (AttrValue::N(a), AttrValue::N(b)) = (
            decode(&json!({"N": "0.1"})).unwrap(),
            decode(&json!({"N": "0.2"})).unwrap(),
        ) else {
            panic!("expected numbers");
        };
        assert_eq!(a + b, dec("0.3"));
    }

    #[test]
    fn large_number_is_not_rounded() {
        let v = decode(&json!({"N": "12345678901234567890.123456789"})).unwrap();
        assert_eq!(v, AttrValue::N(dec("12345678901234567890.123456789")));
    }

    #[test]
    fn decodes_nested_map_and_list() {
        let v = decode(&json!({
            "M": {
                "tags": {"L": [{"S": "a"}, {"N": "2"}, {"NULL": true}]},
                "inner": {"M": {"ok": {"BOOL": true}}}
            }
        }))
        .unwrap();
        let AttrValue::M(map) = v else { panic!("expected map") };
        assert_eq!(
            map["tags"],
            AttrValue::L(vec![AttrValue::S("a".into()), AttrValue::N(dec("2")), AttrValue::Null])
        );
        let AttrValue::M(inner) = &map["inner"] else { panic!("expected inner map") };
        assert_eq!(inner["ok"], AttrValue::Bool(true));
    }

    #[test]
    fn list_keeps_source_order() {
        let v = decode(&json!({"L": [{"S": "z"}, {"S": "a"}, {"S": "m"}]})).unwrap();
        let AttrValue::L(items) = v else { panic!("expected list") };
        let order: Vec<_> = items.iter().filter_map(AttrValue::as_str).collect();
        assert_eq!(order, ["z", "a", "m"]);
    }

    #[test]
    fn decodes_sets() {
        let ss = decode(&json!({"SS": ["b", "a", "b"]})).unwrap();
        assert_eq!(ss, AttrValue::Ss(["a".to_string(), "b".to_string()].into()));

        let ns = decode(&json!({"NS": ["2.50", "1"]})).unwrap();
        assert_eq!(ns, AttrValue::Ns([dec("1"), dec("2.5")].into()));
    }

    #[test]
    fn unrecognized_tag_is_malformed() {
        let err = decode(&json!({"B": "AAEC"})).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedValue(_)));
        assert!(decode(&json!("plain")).is_err());
        assert!(decode(&json!({})).is_err());
    }

    #[test]
    fn wrong_payload_shape_is_malformed() {
        assert!(decode(&json!({"S": 5})).is_err());
        assert!(decode(&json!({"N": "abc"})).is_err());
        assert!(decode(&json!({"L": {"S": "x"}})).is_err());
        assert!(decode(&json!({"NS": ["1", "x"]})).is_err());
    }

    #[test]
    fn malformed_member_fails_container() {
        assert!(decode(&json!({"L": [{"S": "ok"}, {"X": 1}]})).is_err());
    }

    #[test]
    fn roundtrip_every_tag() {
        roundtrip(&json!({"S": "hello"}));
        roundtrip(&json!({"N": "19.99"}));
        roundtrip(&json!({"N": "-0.0001"}));
        roundtrip(&json!({"BOOL": true}));
        roundtrip(&json!({"NULL": true}));
        roundtrip(&json!({"SS": ["x", "y"]}));
        roundtrip(&json!({"NS": ["1.5", "100"]}));
        roundtrip(&json!({"L": [{"S": "a"}, {"L": [{"N": "1"}]}]}));
        roundtrip(&json!({"M": {"a": {"M": {"b": {"NS": ["3"]}}}, "c": {"BOOL": false}}}));
    }

    #[test]
    fn decode_item_drops_only_bad_attributes() {
        let item = json!({
            "PK": {"S": "USER#1"},
            "SK": {"S": "PROFILE"},
            "avatar": {"B": "AAEC"}
        });
        let mut failed = Vec::new();
        let record = decode_item(item.as_object().unwrap(), |name, _| failed.push(name.to_string()));
        assert_eq!(record.pk(), Some("USER#1"));
        assert_eq!(record.sk(), Some("PROFILE"));
        assert_eq!(record.len(), 2);
        assert_eq!(failed, ["avatar"]);
    }
}
