use chrono::NaiveDate;
use dbdash::backend::{CellValue, ColumnMeta, ResultFrame};
use dbdash::filter::{
    build_filter_set, default_filters, derive_filter, describe_columns, infer_kind,
    parse_range_arg, parse_set_arg, ColumnKind, Filter, FilterSet, RangeArg,
};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

fn single_column(name: &str, values: Vec<CellValue>) -> ResultFrame {
    ResultFrame::new(
        vec![ColumnMeta::new(name, "ANY")],
        values.into_iter().map(|v| vec![v]).collect(),
    )
}

fn sales() -> ResultFrame {
    ResultFrame::new(
        vec![
            ColumnMeta::new("id", "INTEGER"),
            ColumnMeta::new("region", "TEXT"),
            ColumnMeta::new("amount", "REAL"),
            ColumnMeta::new("sold_on", "DATE"),
        ],
        vec![
            vec![
                CellValue::Int(1),
                CellValue::Text("north".to_string()),
                CellValue::Float(10.0),
                CellValue::Date(day(1)),
            ],
            vec![
                CellValue::Int(2),
                CellValue::Text("south".to_string()),
                CellValue::Float(25.5),
                CellValue::Date(day(5)),
            ],
            vec![
                CellValue::Int(3),
                CellValue::Text("north".to_string()),
                CellValue::Null,
                CellValue::Date(day(9)),
            ],
        ],
    )
}

#[test]
fn numeric_range_keeps_inclusive_matches() {
    let frame = single_column("v", vec![CellValue::Int(1), CellValue::Int(5), CellValue::Int(10)]);
    let mut set = FilterSet::new();
    set.insert("v", Filter::NumericRange { min: 2.0, max: 8.0 });

    let filtered = set.apply(&frame).unwrap();
    assert_eq!(filtered.rows, vec![vec![CellValue::Int(5)]]);

    let mut bounds = FilterSet::new();
    bounds.insert("v", Filter::NumericRange { min: 5.0, max: 10.0 });
    assert_eq!(bounds.apply(&frame).unwrap().rows.len(), 2);
}

#[test]
fn date_range_keeps_calendar_days_inclusive() {
    let values = (1..=10)
        .map(|d| CellValue::DateTime(day(d).and_hms_opt(15, 30, 0).unwrap()))
        .collect();
    let frame = single_column("ts", values);

    let mut set = FilterSet::new();
    set.insert("ts", Filter::DateRange { start: day(3), end: day(7) });
    let filtered = set.apply(&frame).unwrap();

    let days: Vec<NaiveDate> = filtered
        .rows
        .iter()
        .filter_map(|row| row[0].as_date())
        .collect();
    assert_eq!(days, (3..=7).map(day).collect::<Vec<_>>());
}

#[test]
fn single_valued_numeric_column_offers_no_filter() {
    let frame = ResultFrame::new(
        vec![ColumnMeta::new("flat", "INTEGER"), ColumnMeta::new("spread", "INTEGER")],
        vec![
            vec![CellValue::Int(4), CellValue::Int(1)],
            vec![CellValue::Int(4), CellValue::Int(9)],
        ],
    );
    assert_eq!(derive_filter(&frame, 0), None);

    let defaults = default_filters(&frame);
    assert_eq!(defaults.len(), 1);
    assert!(defaults.get("flat").is_none());
    assert_eq!(
        defaults.get("spread"),
        Some(&Filter::NumericRange { min: 1.0, max: 9.0 })
    );
}

#[test]
fn empty_filter_set_is_identity() {
    let frame = sales();
    assert_eq!(FilterSet::new().apply(&frame).unwrap(), frame);
}

#[test]
fn filters_compose_conjunctively() {
    let frame = sales();
    let mut set = FilterSet::new();
    set.insert("sold_on", Filter::DateRange { start: day(1), end: day(9) });
    set.insert("region", Filter::OneOf(["north".to_string()].into_iter().collect()));

    let filtered = set.apply(&frame).unwrap();
    let ids: Vec<&CellValue> = filtered.rows.iter().map(|r| &r[0]).collect();
    assert_eq!(ids, vec![&CellValue::Int(1), &CellValue::Int(3)]);
}

#[test]
fn nulls_never_match_an_active_filter() {
    let frame = sales();
    let mut set = FilterSet::new();
    set.insert("amount", Filter::NumericRange { min: 0.0, max: 100.0 });
    assert_eq!(set.apply(&frame).unwrap().rows.len(), 2);
}

#[test]
fn unknown_filter_column_is_an_error() {
    let mut set = FilterSet::new();
    set.insert("nope", Filter::NumericRange { min: 0.0, max: 1.0 });
    let err = set.apply(&sales()).unwrap_err().to_string();
    assert!(err.starts_with("filter: "), "Got: {}", err);
}

#[test]
fn column_kinds_are_inferred_from_values() {
    let frame = sales();
    assert_eq!(infer_kind(&frame, 0), ColumnKind::Numeric);
    assert_eq!(infer_kind(&frame, 1), ColumnKind::Other);
    assert_eq!(infer_kind(&frame, 2), ColumnKind::Numeric);
    assert_eq!(infer_kind(&frame, 3), ColumnKind::DateTime);

    let described = describe_columns("vendas", &frame);
    assert_eq!(described.len(), 4);
    assert!(described.iter().all(|c| c.table == "vendas"));
    assert_eq!(described[3].name, "sold_on");

    let bools = single_column("flag", vec![CellValue::Bool(true), CellValue::Bool(false)]);
    assert_eq!(infer_kind(&bools, 0), ColumnKind::Other);

    let nulls = single_column("n", vec![CellValue::Null]);
    assert_eq!(infer_kind(&nulls, 0), ColumnKind::Other);
}

#[test]
fn datetime_filter_needs_more_than_one_day() {
    let same_day = single_column(
        "ts",
        vec![
            CellValue::DateTime(day(2).and_hms_opt(8, 0, 0).unwrap()),
            CellValue::DateTime(day(2).and_hms_opt(18, 0, 0).unwrap()),
        ],
    );
    assert_eq!(derive_filter(&same_day, 0), None);
}

#[test]
fn filter_descriptions() {
    assert_eq!(Filter::NumericRange { min: 2.0, max: 8.5 }.to_string(), "(2, 8.5)");
    assert_eq!(
        Filter::DateRange { start: day(3), end: day(7) }.to_string(),
        "(2024-01-03, 2024-01-07)"
    );
    let set = Filter::OneOf(["a".to_string(), "b".to_string()].into_iter().collect());
    assert_eq!(set.to_string(), "[a, b]");
}

#[test]
fn filter_set_keeps_insertion_order() {
    let mut set = FilterSet::new();
    set.insert("z", Filter::NumericRange { min: 0.0, max: 1.0 });
    set.insert("a", Filter::NumericRange { min: 0.0, max: 1.0 });
    set.insert("z", Filter::NumericRange { min: 0.0, max: 2.0 });

    let names: Vec<&str> = set.iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["z", "a"]);
}

// --- CLI argument parsing ---

#[test]
fn parse_range_args() {
    assert_eq!(
        parse_range_arg("amount=2..8").unwrap(),
        RangeArg {
            column: "amount".to_string(),
            low: Some("2".to_string()),
            high: Some("8".to_string()),
        }
    );
    let open = parse_range_arg("sold_on=..2024-01-05").unwrap();
    assert_eq!(open.low, None);
    assert_eq!(open.high.as_deref(), Some("2024-01-05"));

    assert!(parse_range_arg("amount").is_err());
    assert!(parse_range_arg("amount=5").is_err());
    assert!(parse_range_arg("=1..2").is_err());
}

#[test]
fn parse_set_args() {
    let arg = parse_set_arg("region=north, south").unwrap();
    assert_eq!(arg.column, "region");
    assert_eq!(arg.values, vec!["north", "south"]);

    assert!(parse_set_arg("region=").is_err());
    assert!(parse_set_arg("region").is_err());
}

#[test]
fn build_filter_set_overrides_defaults() {
    let frame = sales();
    let ranges = vec![parse_range_arg("amount=20..").unwrap()];
    let sets = vec![parse_set_arg("region=south").unwrap()];

    let set = build_filter_set(&frame, &ranges, &sets, true).unwrap();
    let names: Vec<&str> = set.iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["id", "amount", "sold_on", "region"]);
    assert_eq!(
        set.get("amount"),
        Some(&Filter::NumericRange { min: 20.0, max: 25.5 })
    );
    assert_eq!(
        set.get("sold_on"),
        Some(&Filter::DateRange { start: day(1), end: day(9) })
    );

    let filtered = set.apply(&frame).unwrap();
    assert_eq!(filtered.rows.len(), 1);
    assert_eq!(filtered.rows[0][0], CellValue::Int(2));
}

#[test]
fn build_filter_set_without_defaults() {
    let frame = sales();
    let ranges = vec![parse_range_arg("sold_on=2024-01-04..2024-01-09").unwrap()];
    let set = build_filter_set(&frame, &ranges, &[], false).unwrap();
    assert_eq!(set.len(), 1);
    assert_eq!(set.apply(&frame).unwrap().rows.len(), 2);
}

#[test]
fn build_filter_set_rejects_bad_ranges() {
    let frame = sales();
    let bad = |arg: &str| build_filter_set(&frame, &[parse_range_arg(arg).unwrap()], &[], false);

    assert!(bad("region=a..b").is_err());
    assert!(bad("amount=x..3").is_err());
    assert!(bad("amount=9..3").is_err());
    assert!(bad("sold_on=2024-13-01..").is_err());
    assert!(bad("missing=1..2").is_err());
}
