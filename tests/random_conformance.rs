//! Randomized cross-check against serde_json.
//!
//! serde_json's default object representation is a BTreeMap, whose String
//! ordering is unsigned-byte lexicographic, so re-serializing a document with
//! unique, escape-free keys and integer values yields exactly the compact
//! key-sorted form both strategies must produce.

use std::io::Write as _;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use sortjson::{FastSorter, LowMemorySorter, Sorter, SorterFactory};

const KEY_ALPHABET: &[&str] = &["a", "b", "z", "K", "_", "0", "\u{e9}", "\u{0a90}", "\u{10310}"];

fn random_key(rng: &mut StdRng, serial: usize) -> String {
    let mut key = String::new();
    for _ in 0..rng.random_range(1..=6) {
        key.push_str(KEY_ALPHABET[rng.random_range(0..KEY_ALPHABET.len())]);
    }
    // serial suffix keeps keys unique within their object
    key.push_str(&serial.to_string());
    key
}

fn random_value(rng: &mut StdRng, depth: u32, out: &mut String) {
    let choices = if depth >= 4 { 3 } else { 5 };
    match rng.random_range(0..choices) {
        0 => out.push_str(&rng.random_range(-1000..1000i32).to_string()),
        1 => out.push_str(if rng.random_bool(0.5) { "true" } else { "null" }),
        2 => {
            out.push('"');
            out.push_str(&random_key(rng, 0));
            out.push('"');
        }
        3 => {
            out.push('[');
            for i in 0..rng.random_range(0..4) {
                if i > 0 {
                    out.push(',');
                }
                random_value(rng, depth + 1, out);
            }
            out.push(']');
        }
        _ => random_object(rng, depth + 1, out),
    }
}

fn random_object(rng: &mut StdRng, depth: u32, out: &mut String) {
    let mut keys: Vec<String> = (0..rng.random_range(0..8))
        .map(|i| random_key(rng, i))
        .collect();
    keys.shuffle(rng);
    out.push('{');
    for (i, key) in keys.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push('"');
        out.push_str(key);
        out.push_str("\":");
        random_value(rng, depth + 1, out);
    }
    out.push('}');
}

fn expected(json: &str) -> Vec<u8> {
    let value: serde_json::Value = serde_json::from_str(json).unwrap();
    serde_json::to_vec(&value).unwrap()
}

#[test]
fn strategies_agree_with_serde_json_on_random_documents() {
    let mut rng = StdRng::seed_from_u64(0x5042);
    for _ in 0..200 {
        let mut json = String::new();
        random_object(&mut rng, 0, &mut json);
        let expected = expected(&json);

        let fast = FastSorter::new(json.as_bytes()).sorted_bytes().unwrap();
        assert_eq!(fast, expected, "in-memory strategy diverged for {json}");

        let low = LowMemorySorter::from_bytes(json.as_bytes())
            .with_buffer_size(16)
            .sorted_bytes()
            .unwrap();
        assert_eq!(low, expected, "low-memory strategy diverged for {json}");

        let spilled = LowMemorySorter::from_bytes(json.as_bytes())
            .with_max_key_memory(2)
            .sorted_bytes()
            .unwrap();
        assert_eq!(spilled, expected, "spilling strategy diverged for {json}");
    }
}

#[test]
fn factory_selected_file_sorter_agrees_with_serde_json() {
    let mut rng = StdRng::seed_from_u64(0x1f85);
    for round in 0..20 {
        let mut json = String::new();
        random_object(&mut rng, 0, &mut json);

        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(json.as_bytes()).unwrap();

        // alternate between budgets that force each strategy
        let budget = if round % 2 == 0 { 1_000_000 } else { 8 };
        let factory = SorterFactory::new(budget).unwrap();
        let mut sorter = factory.sorter_for_file(tmp.path()).unwrap();
        assert_eq!(sorter.sorted_bytes().unwrap(), expected(&json));
    }
}
