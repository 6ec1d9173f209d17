//! Strategy-selection policy of [`SorterFactory`].

use std::io::Write;

use pretty_assertions::assert_eq;
use sortjson::{Sorter, SorterFactory};

#[test]
fn budget_below_one_is_rejected() {
    let err = SorterFactory::new(0).unwrap_err();
    assert_eq!(err.to_string(), "Max memory must be at least 1");
}

#[test]
fn budget_of_one_is_accepted() {
    SorterFactory::new(1).unwrap();
}

#[test]
fn selection_for_byte_sources_under_a_30_byte_budget() {
    let factory = SorterFactory::new(30).unwrap();

    // 3 bytes: 3 * 10 <= 30, in-memory strategy
    let sorter = factory.sorter_for_bytes(b"[1]").unwrap();
    assert!(sorter.is_fast());

    // 4 bytes: 4 * 10 > 30, bounded strategy with the rest of the budget
    let sorter = factory.sorter_for_bytes(b"[12]").unwrap();
    assert!(!sorter.is_fast());
    assert_eq!(sorter.key_allowance(), Some(26));
}

#[test]
fn selection_for_byte_sources_under_a_5_byte_budget() {
    let factory = SorterFactory::new(5).unwrap();
    let sorter = factory.sorter_for_bytes(b"[12]").unwrap();
    assert!(!sorter.is_fast());
    assert_eq!(sorter.key_allowance(), Some(1));
}

#[test]
fn file_sources_keep_the_whole_budget_as_allowance() {
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    tmp.write_all(b"[11,12,13,14,15,16,]").unwrap();

    let factory = SorterFactory::new(5).unwrap();
    let sorter = factory.sorter_for_file(tmp.path()).unwrap();
    assert!(!sorter.is_fast());
    assert_eq!(sorter.key_allowance(), Some(5));
}

#[test]
fn small_files_get_the_in_memory_strategy() {
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    tmp.write_all(b"[1]").unwrap();

    let factory = SorterFactory::new(30).unwrap();
    let sorter = factory.sorter_for_file(tmp.path()).unwrap();
    assert!(sorter.is_fast());
}

#[test]
fn oversized_byte_sources_fail_before_parsing() {
    let factory = SorterFactory::new(19).unwrap();
    let err = factory.sorter_for_bytes(&[b'1'; 20]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Byte array size 20 is greater than memory allowed: 19"
    );
}

#[test]
fn file_sources_may_exceed_the_budget() {
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    tmp.write_all(br#"{"b":2,"a":1,"cccccccc":3}"#).unwrap();

    let factory = SorterFactory::new(19).unwrap();
    let mut sorter = factory.sorter_for_file(tmp.path()).unwrap();
    assert_eq!(
        sorter.sorted_bytes().unwrap(),
        br#"{"a":1,"b":2,"cccccccc":3}"#
    );
}

#[test]
fn both_selected_strategies_produce_the_same_output() {
    let json = br#"{"kkk":[1,{"k2":"vvv","k1":"v1"},null],"aaa":{"bbb":{}}}"#;
    let expected = br#"{"aaa":{"bbb":{}},"kkk":[1,{"k1":"v1","k2":"vvv"},null]}"#;

    let roomy = SorterFactory::new(10_000).unwrap();
    let mut sorter = roomy.sorter_for_bytes(json).unwrap();
    assert!(sorter.is_fast());
    assert_eq!(sorter.sorted_bytes().unwrap(), expected);

    let tight = SorterFactory::new(json.len() as u64 + 3).unwrap();
    let mut sorter = tight.sorter_for_bytes(json).unwrap();
    assert!(!sorter.is_fast());
    assert_eq!(sorter.key_allowance(), Some(3));
    assert_eq!(sorter.sorted_bytes().unwrap(), expected);
}
