use serde_json::{Value, json};

use mett_dataportal::params::{Filters, Params, REQUEST_TIMEOUT_KEY, join_values, normalize};

fn sample() -> Params {
    Filters::new()
        .set("speciesAcronym", "BU")
        .set("query", "")
        .set("isolate_name", Value::Null)
        .set("perPage", 50)
        .set("typeStrain", true)
        .set(REQUEST_TIMEOUT_KEY, 12)
        .set("_traceId", "keep-me")
        .into_params()
}

#[test]
fn unset_values_are_dropped_and_empty_strings_kept() {
    let normalized = normalize(&sample());
    assert!(!normalized.contains_key("isolate_name"));
    assert_eq!(normalized.get("query"), Some(&json!("")));
}

#[test]
fn keys_become_snake_case_except_control_keys() {
    let normalized = normalize(&sample());
    let keys = normalized.keys().map(String::as_str).collect::<Vec<_>>();
    assert_eq!(
        keys,
        vec![
            "species_acronym",
            "query",
            "per_page",
            "type_strain",
            REQUEST_TIMEOUT_KEY,
            "_traceId"
        ]
    );
    assert_eq!(normalized.get("per_page"), Some(&json!(50)));
}

#[test]
fn normalize_is_idempotent() {
    let once = normalize(&sample());
    assert_eq!(normalize(&once), once);
}

#[test]
fn multi_value_filters() {
    assert_eq!(
        join_values(["BU_ATCC_1", "BU_2243", "PV_ATCC_8482"]),
        Some("BU_ATCC_1,BU_2243,PV_ATCC_8482".to_string())
    );
    assert_eq!(join_values(Vec::<String>::new()), None);

    let params = Filters::new()
        .set_list("isolates", Vec::<String>::new())
        .set_list("species", ["BU"])
        .into_params();
    let normalized = normalize(&params);
    assert!(!normalized.contains_key("isolates"));
    assert_eq!(normalized.get("species"), Some(&json!("BU")));
}
