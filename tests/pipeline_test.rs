mod common;

use std::num::NonZeroUsize;

use chrono::NaiveDate;
use common::{employees, ids, people};
use tabula::{
    filter, paginate, run, search, sort, to_display_string, CellValue, ColumnDef, ColumnSet,
    ColumnType, DisplayOptions, FilterOperator, FilterSet, FilterSpec, PipelineRequest, Row,
    SortSpec, TableState,
};

fn size(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

#[test]
fn test_no_op_stages_are_identity() {
    let (rows, columns) = employees();
    let input: Vec<&Row> = rows.iter().collect();

    let searched = search(input.clone(), "", &columns);
    assert!(searched
        .iter()
        .zip(&input)
        .all(|(a, b)| std::ptr::eq(*a, *b)));
    assert_eq!(ids(&sort(input.clone(), None, &columns)), ids(&input));
    assert_eq!(
        ids(&filter(input.clone(), &FilterSet::empty(), &columns)),
        ids(&input)
    );
}

#[test]
fn test_sort_is_stable_in_both_directions() {
    let (rows, columns) = employees();
    for spec in [
        SortSpec::ascending("department"),
        SortSpec::descending("department"),
    ] {
        let sorted = sort(rows.iter().collect(), Some(&spec), &columns);
        let eng: Vec<String> = sorted
            .iter()
            .filter(|r| r.get("department") == &CellValue::from("Eng"))
            .map(|r| r.id.to_string())
            .collect();
        assert_eq!(eng, vec!["1", "3", "5", "7", "9"]);
    }

    // equal salaries (Emil and Ivan) keep input order
    let sorted = sort(
        rows.iter().collect(),
        Some(&SortSpec::descending("salary")),
        &columns,
    );
    assert_eq!(ids(&sorted[..2]), vec!["5", "9"]);
}

#[test]
fn test_absent_values_sort_last() {
    let (mut rows, columns) = employees();
    rows[0].cells.remove("salary");
    rows[3].cells.insert("salary".to_string(), "unknown".into());

    for spec in [SortSpec::ascending("salary"), SortSpec::descending("salary")] {
        let sorted = sort(rows.iter().collect(), Some(&spec), &columns);
        let tail: Vec<String> = ids(&sorted[8..]);
        assert_eq!(tail, vec!["1", "4"], "direction {:?}", spec.direction);
        assert!(sorted[..8]
            .iter()
            .all(|r| r.get("salary").as_number().is_some()));
    }
}

#[test]
fn test_pages_reconstruct_sorted_sequence() {
    let (rows, columns) = employees();
    let request = PipelineRequest::default().with_sort(Some(SortSpec::ascending("name")));
    let full = run(&rows, &request.clone().with_page_size(size(100)), &columns);

    for page_size in 1..=4 {
        let first = run(
            &rows,
            &request.clone().with_page_size(size(page_size)),
            &columns,
        );
        let mut pages = Vec::new();
        for page in 1..=first.total_pages {
            let result = run(
                &rows,
                &request
                    .clone()
                    .with_page_size(size(page_size))
                    .with_page(page as i64),
                &columns,
            );
            pages.extend(result.rows);
        }
        assert_eq!(ids(&pages), ids(&full.rows), "page size {}", page_size);
    }
}

#[test]
fn test_out_of_range_pages_clamp() {
    let (rows, columns) = employees();
    for (requested, expected) in [(0, 1), (-3, 1), (4, 4), (99, 4)] {
        let request = PipelineRequest::default()
            .with_page_size(size(3))
            .with_page(requested);
        let result = run(&rows, &request, &columns);
        assert_eq!(result.page, expected, "requested {}", requested);
        assert_eq!(result.total_pages, 4);
        assert!(!result.rows.is_empty());
    }
    let paged = paginate(Vec::new(), -1, size(3));
    assert_eq!((paged.page, paged.total_pages), (1, 1));
}

#[test]
fn test_search_never_grows() {
    let (rows, columns) = employees();
    for query in ["a", "eng", "1", "$1", "zzz", "Ada"] {
        let out = search(rows.iter().collect(), query, &columns);
        assert!(out.len() <= rows.len(), "query {}", query);
    }
}

#[test]
fn test_people_scenario() {
    let (rows, columns) = people();
    let by_age = Some(SortSpec::ascending("age"));

    // substring search: "Bob" does not contain an "a"
    let request = PipelineRequest::default()
        .with_query("a")
        .with_sort(by_age.clone());
    let result = run(&rows, &request, &columns);
    assert_eq!(ids(&result.rows), vec!["2", "3"]);
    assert_eq!(result.total_count, 2);

    let request = PipelineRequest::default().with_sort(by_age);
    let result = run(&rows, &request, &columns);
    let names: Vec<String> = result
        .rows
        .iter()
        .map(|r| r.get("name").to_string())
        .collect();
    assert_eq!(names, vec!["alice", "Bob", "Carl"]);
}

#[test]
fn test_filter_and_sort_employees() {
    let (rows, columns) = employees();
    let filters = FilterSet::new(
        vec![FilterSpec::new(
            "department",
            FilterOperator::Equals,
            "Eng",
        )],
        &columns,
    )
    .unwrap();
    let request = PipelineRequest::default()
        .with_filters(filters)
        .with_sort(Some(SortSpec::descending("salary")))
        .with_page_size(size(2))
        .with_page(1);

    let result = run(&rows, &request, &columns);
    assert_eq!(result.total_count, 5);
    assert_eq!(result.total_pages, 3);
    assert_eq!(result.page, 1);
    assert_eq!(ids(&result.rows), vec!["5", "9"]);
}

#[test]
fn test_display_strings_per_type() {
    let options = DisplayOptions::default();
    let show = |value: CellValue, kind: ColumnType| {
        to_display_string(&value, &ColumnDef::new("c", "C").with_type(kind), &options)
    };

    assert_eq!(show(1234.5.into(), ColumnType::Currency), "$1,234.50");
    assert_eq!(show((-3).into(), ColumnType::Currency), "-$3.00");
    assert_eq!(
        show(
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap().into(),
            ColumnType::Date
        ),
        "03/15/2024"
    );
    assert_eq!(show("2024-03-15".into(), ColumnType::Date), "03/15/2024");
    assert_eq!(show(true.into(), ColumnType::Boolean), "Yes");
    assert_eq!(show("no".into(), ColumnType::Boolean), "No");
    assert_eq!(show(42.into(), ColumnType::Number), "42");
    assert_eq!(show(2.5.into(), ColumnType::Number), "2.5");
    assert_eq!(show(CellValue::Null, ColumnType::Currency), "");
    assert_eq!(show("n/a".into(), ColumnType::Currency), "n/a");
    assert_eq!(show("plain".into(), ColumnType::Text), "plain");

    let custom = ColumnDef::new("c", "C")
        .with_type(ColumnType::Currency)
        .with_formatter(|v: &CellValue| format!("<{}>", v));
    assert_eq!(to_display_string(&5.into(), &custom, &options), "<5>");
}

#[test]
fn test_table_state_follows_clamped_page() {
    let (rows, columns) = employees();
    let mut state = TableState::new(PipelineRequest::default().with_page_size(size(4)));
    state.set_page(3);
    state
        .add_filter(
            FilterSpec::new("department", FilterOperator::Equals, "Sales"),
            &columns,
        )
        .unwrap();
    assert_eq!(state.page(), 1);

    state.set_page(10);
    let result = state.refresh(&rows, &columns);
    assert_eq!(result.total_count, 3);
    assert_eq!(result.page, 1);
    assert_eq!(state.page(), 1);

    state.toggle_sort("salary");
    let result = state.refresh(&rows, &columns);
    assert_eq!(ids(&result.rows), vec!["10", "2", "6"]);
}

#[test]
fn test_custom_comparator_column() {
    // Sort by name length, then alphabetically
    let columns = ColumnSet::new(vec![ColumnDef::new("name", "Name").with_comparator(
        |a: &CellValue, b: &CellValue| {
            let (a, b) = (a.raw_string(), b.raw_string());
            a.len().cmp(&b.len()).then_with(|| a.cmp(&b))
        },
    )]);
    let rows = vec![
        Row::new(1).with("name", "Chen"),
        Row::new(2).with("name", "Jo"),
        Row::new(3),
        Row::new(4).with("name", "Ada"),
    ];
    let sorted = sort(
        rows.iter().collect(),
        Some(&SortSpec::ascending("name")),
        &columns,
    );
    assert_eq!(ids(&sorted), vec!["2", "4", "1", "3"]);
}
