//! Score aggregation integration tests.

use proptest::prelude::*;
use study_dashboard_core::models::{compare_ids, sort_key, SortKey};
use study_dashboard_core::scoring::{
    phq9_required_columns, pid5_required_columns, MadrsTotal, Pid5Dimension, ScoreUnavailable,
    Scorer,
};
use study_dashboard_core::store::{Dataset, Instrument, ItemKey, Phase, Table};

fn dataset(headers: &[String], rows: &[Vec<String>]) -> Dataset {
    let mut table = Table::new(headers.iter().cloned());
    table.rows = rows.to_vec();
    Dataset::from_table(table).unwrap()
}

fn pid5_headers() -> Vec<String> {
    std::iter::once("ID".to_string())
        .chain(pid5_required_columns().iter().map(ItemKey::column_name))
        .collect()
}

#[test]
fn test_negative_affectivity_baseline() {
    let headers = pid5_headers();
    let mut row = vec![String::new(); headers.len()];
    row[0] = "P3".into();
    for (item, value) in [(8, "2"), (9, "1"), (10, "0"), (11, "3"), (15, "1")] {
        let name = format!("pid5_{item}_bl");
        let col = headers.iter().position(|h| *h == name).unwrap();
        row[col] = value.into();
    }
    let ds = dataset(&headers, &[row]);

    let scores = Scorer::new(ds.schema())
        .pid5_dimensions(ds.get("P3").unwrap())
        .unwrap();
    let na = scores
        .iter()
        .find(|s| s.dimension == Pid5Dimension::NegativeAffectivity)
        .unwrap();
    assert_eq!(na.baseline.total, 7.0);
    assert_eq!(na.baseline.answered, 5);
    assert_eq!(na.follow_up.total, 0.0);
}

#[test]
fn test_madrs_total_missing_baseline() {
    let ds = dataset(
        &["ID".into(), "madrs_score_fu".into()],
        &[vec!["P1".into(), "18".into()]],
    );
    let total = Scorer::new(ds.schema()).madrs_total(ds.get("P1").unwrap());
    assert_eq!(
        total,
        MadrsTotal {
            baseline: 0.0,
            follow_up: 18.0
        }
    );
    assert_eq!(Phase::Baseline.label(), "Baseline");
    assert_eq!(Phase::FollowUp.label(), "Day 30");
}

#[test]
fn test_pid5_never_partial() {
    let mut headers = pid5_headers();
    headers.retain(|h| h != "pid5_8_bl");
    let row = std::iter::once("P1".to_string())
        .chain(std::iter::repeat("1".to_string()).take(headers.len() - 1))
        .collect();
    let ds = dataset(&headers, &[row]);

    match Scorer::new(ds.schema()).pid5_dimensions(ds.get("P1").unwrap()) {
        Err(ScoreUnavailable::Incomplete {
            instrument,
            missing,
        }) => {
            assert_eq!(instrument, Instrument::Pid5);
            assert_eq!(missing, vec!["pid5_8_bl"]);
        }
        other => panic!("expected incomplete, got {:?}", other),
    }
}

#[test]
fn test_phq9_single_gap_drops_series() {
    let headers: Vec<String> = std::iter::once("ID".to_string())
        .chain(
            phq9_required_columns()
                .iter()
                .filter(|k| **k != ItemKey::Phq9 { day: 30, item: 9 })
                .map(ItemKey::column_name),
        )
        .collect();
    let row = std::iter::once("P1".to_string())
        .chain(std::iter::repeat("2".to_string()).take(headers.len() - 1))
        .collect();
    let ds = dataset(&headers, &[row]);

    let result = Scorer::new(ds.schema()).phq9_progression(ds.get("P1").unwrap());
    assert!(matches!(
        result,
        Err(ScoreUnavailable::Incomplete { ref missing, .. }) if missing == &["phq9_day30_item9"]
    ));
}

#[test]
fn test_column_names_case_and_whitespace() {
    let ds = dataset(
        &["id".into(), " MADRS.4.BL ".into(), "madrs_4.fu".into()],
        &[vec!["P1".into(), "3".into(), "1".into()]],
    );
    let items = Scorer::new(ds.schema()).madrs_items(ds.get("P1").unwrap());
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|i| i.label == "Reduced Sleep"));
}

proptest! {
    #[test]
    fn prop_pid5_dimension_is_sum_of_items(values in prop::collection::vec(0u8..=3, 50)) {
        let headers = pid5_headers();
        let columns = pid5_required_columns();
        let row: Vec<String> = std::iter::once("P1".to_string())
            .chain(values.iter().map(|v| v.to_string()))
            .collect();
        let ds = dataset(&headers, &[row]);
        let scores = Scorer::new(ds.schema())
            .pid5_dimensions(ds.get("P1").unwrap())
            .unwrap();

        for score in scores {
            for phase in Phase::ALL {
                let expected: f64 = score
                    .dimension
                    .items()
                    .iter()
                    .map(|&item| {
                        let key = ItemKey::Pid5 { item, phase };
                        let col = columns.iter().position(|c| *c == key).unwrap();
                        f64::from(values[col])
                    })
                    .sum();
                let actual = match phase {
                    Phase::Baseline => score.baseline.total,
                    Phase::FollowUp => score.follow_up.total,
                };
                prop_assert_eq!(actual, expected);
            }
        }
    }

    #[test]
    fn prop_sort_key_is_first_digit_run(prefix in "[A-Za-z_-]{0,4}", n in 0u64..1_000_000, suffix in "[A-Za-z]{0,3}") {
        let id = format!("{prefix}{n}{suffix}");
        prop_assert_eq!(sort_key(&id), SortKey::Number(u128::from(n)));
    }

    #[test]
    fn prop_compare_ids_is_total(ids in prop::collection::vec("[A-Z]{0,2}[0-9]{0,3}", 1..20)) {
        let mut ids = ids;
        ids.sort_by(|a, b| compare_ids(a, b));
        for pair in ids.windows(2) {
            prop_assert!(compare_ids(&pair[0], &pair[1]) != std::cmp::Ordering::Greater);
            prop_assert!(sort_key(&pair[0]) <= sort_key(&pair[1]));
        }
    }
}
