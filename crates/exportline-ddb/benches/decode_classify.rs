use exportline_core::Accumulator;
use exportline_ddb::transform::PaymentAccumulator;
use exportline_ddb::{Classifier, EntityRecord, decode_item};
use serde_json::{Map, Value};

/// Export lines from `BENCH_DATA_DIR/export.jsonl` if set, else a synthetic mix
fn load_items() -> Vec<Map<String, Value>> {
    let lines: Vec<String> = match std::env::var("BENCH_DATA_DIR") {
        Ok(dir) => {
            let path = std::path::Path::new(&dir).join("export.jsonl");
            std::fs::read_to_string(&path)
                .unwrap_or_else(|e| panic!("{}: {e}", path.display()))
                .lines()
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect()
        }
        Err(_) => (0..10_000).map(synthetic_line).collect(),
    };
    lines
        .iter()
        .filter_map(|l| {
            let v: Value = serde_json::from_str(l).unwrap();
            v.get("Item").and_then(Value::as_object).cloned()
        })
        .collect()
}

fn synthetic_line(i: usize) -> String {
    match i % 4 {
        0 => format!(
            r#"{{"Item":{{"PK":{{"S":"USER#{i}"}},"SK":{{"S":"PROFILE"}},"email":{{"S":"u{i}@example.org"}},"active":{{"BOOL":true}},"date_create":{{"S":"2024-01-02T10:00:00Z"}}}}}}"#
        ),
        1 => format!(
            r#"{{"Item":{{"PK":{{"S":"DONATION#{i}"}},"SK":{{"S":"VIS#{i}"}},"acesse_donation":{{"BOOL":true}},"create_pix":{{"N":"1"}},"date_create":{{"S":"2024-01-02 10:00:00"}}}}}}"#
        ),
        2 => format!(
            r#"{{"Item":{{"PK":{{"S":"TX#{i}"}},"SK":{{"S":"STATUS"}},"valor":{{"N":"19.99"}},"finalizado":{{"BOOL":true}},"data_pago":{{"S":"2024-01-02T10:00:00-03:00"}}}}}}"#
        ),
        _ => format!(
            r#"{{"Item":{{"PK":{{"S":"DONATION#{i}"}},"SK":{{"S":"PROFILE"}},"valor":{{"N":"100"}},"tags":{{"L":[{{"S":"a"}},{{"M":{{"k":{{"NS":["1","2"]}}}}}}]}}}}}}"#
        ),
    }
}

#[divan::bench]
fn decode_items(bencher: divan::Bencher) {
    let items = load_items();
    bencher.bench(|| {
        for item in &items {
            divan::black_box(decode_item(item, |_, _| {}));
        }
    });
}

#[divan::bench]
fn decode_and_classify(bencher: divan::Bencher) {
    let items = load_items();
    let classifier = Classifier::default();
    bencher.bench(|| {
        items
            .iter()
            .filter_map(|item| classifier.classify(&decode_item(item, |_, _| {})))
            .count()
    });
}

#[divan::bench]
fn accumulator_payments(bencher: divan::Bencher) {
    let items = load_items();
    let classifier = Classifier::default();
    bencher.bench(|| {
        let mut acc = PaymentAccumulator::new();
        for item in &items {
            if let Some(EntityRecord::Payment(p)) = classifier.classify(&decode_item(item, |_, _| {})) {
                acc.push(p);
            }
        }
        acc.take_batch().unwrap()
    });
}

fn main() {
    divan::main();
}
