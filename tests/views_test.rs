mod common;

use pvd_search::error::SearchError;
use pvd_search::filter::{ANY, Constraints};
use pvd_search::projection::WidthPolicy;
use pvd_search::sort::GroupSpan;
use pvd_search::table::Tables;
use pvd_search::views::{
    GRADE_VIEW, MATERIAL_VIEW, SearchQuery, ViewKind, grade_options, validate_views,
};

#[test]
fn test_views_validate_against_fixture() {
    validate_views(&common::tables()).unwrap();
}

#[test]
fn test_missing_view_column_is_config_error() {
    let tables = Tables {
        records: common::table("raw", &["자재번호", "형번"], &[]),
        grades: common::grades(),
    };

    let err = validate_views(&tables).unwrap_err();
    assert!(matches!(err, SearchError::UnknownColumn { .. }));
    assert!(err.is_fatal());
}

#[test]
fn test_material_page() {
    let tables = common::tables();
    let page = MATERIAL_VIEW
        .page(
            &tables.records,
            &SearchQuery::default(),
            1,
            15,
            &WidthPolicy::default(),
        )
        .unwrap();

    assert_eq!(page.view, ViewKind::Materials);
    assert_eq!(page.total, 4);
    assert_eq!(page.page_count, 1);
    let names: Vec<&str> = page.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["자재번호", "형번", "재종"]);
    assert_eq!(page.keys, vec!["M-050", "M-200", "M-100", "M-150"]);
    assert_eq!(page.rows[0], vec!["M-050", "CNMG 1204", "PC5300"]);
    assert_eq!(
        page.groups,
        vec![
            GroupSpan {
                key: "G1".into(),
                start: 0,
                len: 2
            },
            GroupSpan {
                key: "G2".into(),
                start: 2,
                len: 2
            },
        ]
    );
    println!("✓ Material view lists, sorts and groups the records");
}

#[test]
fn test_page_groups_are_relative_to_page() {
    let tables = common::tables();
    let page = MATERIAL_VIEW
        .page(
            &tables.records,
            &SearchQuery::default(),
            2,
            3,
            &WidthPolicy::default(),
        )
        .unwrap();

    assert_eq!(page.page, 2);
    assert_eq!(page.page_count, 2);
    assert_eq!(page.keys, vec!["M-150"]);
    assert_eq!(
        page.groups,
        vec![GroupSpan {
            key: "G2".into(),
            start: 0,
            len: 1
        }]
    );
}

#[test]
fn test_empty_result_is_not_an_error() {
    let tables = common::tables();
    let page = MATERIAL_VIEW
        .page(
            &tables.records,
            &SearchQuery::text("no-such-material"),
            1,
            15,
            &WidthPolicy::default(),
        )
        .unwrap();

    assert_eq!(page.total, 0);
    assert_eq!(page.page_count, 1);
    assert!(page.rows.is_empty());
    assert!(page.groups.is_empty());
    // widths still come from the headers
    assert_eq!(page.columns.len(), 3);
}

#[test]
fn test_grade_search_with_dropdowns() {
    let tables = common::tables();
    let query = SearchQuery {
        text: String::new(),
        constraints: GRADE_VIEW.constraints_from(|param| match param {
            "alloy" => Some("초경"),
            _ => None,
        }),
    };
    assert_eq!(query.constraints.get("재종"), Some(ANY));

    let ordered = GRADE_VIEW.search(&tables.grades, &query).unwrap();
    assert_eq!(
        ordered.column_values("재종").unwrap(),
        vec!["PC5300", "PC3700"]
    );

    let query = SearchQuery {
        text: "tialn".to_string(),
        constraints: Constraints::new().with("합금", ANY).with("재종", "PC3700"),
    };
    let ordered = GRADE_VIEW.search(&tables.grades, &query).unwrap();
    assert_eq!(ordered.indices(), &[0, 3]);
}

#[test]
fn test_grade_options_follow_alloy() {
    let table = common::grades();

    let all = grade_options(&table, ANY).unwrap();
    assert_eq!(all.alloy, ANY);
    assert_eq!(all.alloys, vec![ANY, "서멧", "초경"]);
    assert_eq!(all.grades, vec![ANY, "PC3700", "PC5300", "PC8110"]);

    let cermet = grade_options(&table, "서멧").unwrap();
    assert_eq!(cermet.alloy, "서멧");
    assert_eq!(cermet.grades, vec![ANY, "PC3700", "PC8110"]);

    let unknown = grade_options(&table, "없는합금").unwrap();
    assert_eq!(unknown.grades, vec![ANY]);
    println!("✓ Grade choices narrow with the chosen alloy");
}

#[test]
fn test_export_table_keeps_group_column() {
    let tables = common::tables();
    let exported = MATERIAL_VIEW
        .export_table(&tables.records, &SearchQuery::text("spgt"))
        .unwrap();

    assert_eq!(exported.columns(), &["코팅그룹", "자재번호", "형번", "재종"]);
    assert_eq!(exported.len(), 2);
    assert_eq!(exported.rows()[0].get(1), "M-200");
}

#[test]
fn test_view_kind_names() {
    assert_eq!(ViewKind::Materials.as_str(), "materials");
    assert_eq!(ViewKind::Grades.spec().key_column, "재종");
    assert_eq!(
        serde_json::to_string(&ViewKind::Grades).unwrap(),
        "\"grades\""
    );
}
