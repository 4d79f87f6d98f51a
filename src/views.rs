//! The two lookup views over the workbook and the pipeline that serves them:
//! filter, sort, group, project, paginate, and resolve a detail.

use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::detail::{self, Field};
use crate::error::Result;
use crate::filter::{self, ANY, Constraints};
use crate::projection::{self, ColumnHint, WidthPolicy};
use crate::sort::{self, GroupSpan};
use crate::table::{Subset, Table, Tables};

/// Header names of the `raw` sheet.
pub mod records {
    pub const MATERIAL_NUMBER: &str = "자재번호";
    pub const PART_NUMBER: &str = "형번";
    pub const GRADE: &str = "재종";
    pub const COATING_GROUP: &str = "코팅그룹";
    pub const PRE_TREATMENT: &str = "전처리";
    pub const POST_TREATMENT: &str = "후처리";
    pub const PIN: &str = "핀";
    pub const SPRING_TYPE: &str = "스프링 종류";
    pub const SPRING_COUNT: &str = "스프링 개수";
    pub const SPACING: &str = "간격";
    pub const LINES: &str = "줄";
}

/// Header names of the grade reference sheet.
pub mod grades {
    pub const GRADE: &str = "재종";
    pub const COATING_GROUP: &str = "코팅그룹";
    pub const GRADE_DESCRIPTION: &str = "재종내역";
    pub const COATING_GRADE_GROUP: &str = "코팅재종그룹 내역";
    pub const FILM_NAME: &str = "박막명";
    pub const COLOR: &str = "색상";
    pub const SPEC_LIMITS: &str = "관리규격";
    pub const EQUIPMENT: &str = "가용설비";
    pub const CYCLE_TIME: &str = "작업시간";
    pub const ALLOY: &str = "합금";
    pub const PROCESS_NOTES: &str = "공정특이사항";
    pub const EDGE_TREATMENT: &str = "인선처리";
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    Materials,
    Grades,
}

impl ViewKind {
    pub fn spec(self) -> &'static ViewSpec {
        match self {
            ViewKind::Materials => &MATERIAL_VIEW,
            ViewKind::Grades => &GRADE_VIEW,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ViewKind::Materials => "materials",
            ViewKind::Grades => "grades",
        }
    }
}

/// Fixed configuration of one lookup view.
#[derive(Debug)]
pub struct ViewSpec {
    pub kind: ViewKind,
    pub title: &'static str,
    /// Column used for row selection and detail lookup.
    pub key_column: &'static str,
    pub list_columns: &'static [&'static str],
    pub sort_keys: &'static [&'static str],
    /// Column whose consecutive equal values are shown as one group header.
    pub group_by: Option<&'static str>,
    /// Fields shown first in the detail panel.
    pub detail_columns: &'static [&'static str],
    /// Dropdown query parameters and the column each one constrains.
    pub constraint_params: &'static [(&'static str, &'static str)],
}

pub const MATERIAL_VIEW: ViewSpec = ViewSpec {
    kind: ViewKind::Materials,
    title: "자재번호 검색",
    key_column: records::MATERIAL_NUMBER,
    list_columns: &[records::MATERIAL_NUMBER, records::PART_NUMBER, records::GRADE],
    sort_keys: &[records::COATING_GROUP, records::MATERIAL_NUMBER],
    group_by: Some(records::COATING_GROUP),
    detail_columns: &[
        records::MATERIAL_NUMBER,
        records::PART_NUMBER,
        records::GRADE,
        records::PRE_TREATMENT,
        records::POST_TREATMENT,
        records::PIN,
        records::SPRING_TYPE,
        records::SPRING_COUNT,
        records::SPACING,
        records::LINES,
    ],
    constraint_params: &[],
};

pub const GRADE_VIEW: ViewSpec = ViewSpec {
    kind: ViewKind::Grades,
    title: "재종 검색",
    key_column: grades::GRADE,
    list_columns: &[grades::GRADE, grades::COATING_GROUP, grades::GRADE_DESCRIPTION],
    sort_keys: &[grades::FILM_NAME, grades::COATING_GROUP],
    group_by: Some(grades::FILM_NAME),
    detail_columns: &[
        grades::GRADE,
        grades::COATING_GROUP,
        grades::GRADE_DESCRIPTION,
        grades::COATING_GRADE_GROUP,
        grades::FILM_NAME,
        grades::COLOR,
        grades::SPEC_LIMITS,
        grades::EQUIPMENT,
        grades::CYCLE_TIME,
        grades::ALLOY,
        grades::PROCESS_NOTES,
        grades::EDGE_TREATMENT,
    ],
    constraint_params: &[("alloy", grades::ALLOY), ("grade", grades::GRADE)],
};

/// Free text plus dropdown picks for one view.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub constraints: Constraints,
}

impl SearchQuery {
    pub fn text(text: impl Into<String>) -> Self {
        SearchQuery {
            text: text.into(),
            constraints: Constraints::new(),
        }
    }
}

/// One page of a view, ready to render.
#[derive(Clone, Debug, Serialize)]
pub struct ResultPage {
    pub view: ViewKind,
    pub page: usize,
    pub page_count: usize,
    pub page_size: usize,
    pub total: usize,
    pub columns: Vec<ColumnHint>,
    pub rows: Vec<Vec<String>>,
    /// Key column value of each row, for selection.
    pub keys: Vec<String>,
    pub groups: Vec<GroupSpan>,
}

#[derive(Clone, Debug, Serialize)]
pub struct DetailView {
    pub view: ViewKind,
    pub key: String,
    pub fields: Vec<Field>,
    /// Rows sharing this key; only the first is shown.
    pub matches: usize,
    pub ambiguous: bool,
}

impl ViewSpec {
    pub fn table<'a>(&self, tables: &'a Tables) -> &'a Table {
        match self.kind {
            ViewKind::Materials => &tables.records,
            ViewKind::Grades => &tables.grades,
        }
    }

    /// Check that every column this view names exists in `table`.
    pub fn validate(&self, table: &Table) -> Result<()> {
        let named = std::iter::once(self.key_column)
            .chain(self.list_columns.iter().copied())
            .chain(self.sort_keys.iter().copied())
            .chain(self.group_by)
            .chain(self.constraint_params.iter().map(|(_, c)| *c));
        for column in named {
            table.column_index(column)?;
        }
        Ok(())
    }

    /// Build constraints from dropdown parameters; missing parameters mean "any".
    pub fn constraints_from<'p>(&self, lookup: impl Fn(&str) -> Option<&'p str>) -> Constraints {
        self.constraint_params
            .iter()
            .fold(Constraints::new(), |acc, &(param, column)| {
                acc.with(column, lookup(param).unwrap_or(ANY))
            })
    }

    /// Columns written by an export: the group column (if hidden) then the list.
    pub fn export_columns(&self) -> Vec<&'static str> {
        let mut columns = Vec::with_capacity(self.list_columns.len() + 1);
        if let Some(group) = self.group_by.filter(|g| !self.list_columns.contains(g)) {
            columns.push(group);
        }
        columns.extend_from_slice(self.list_columns);
        columns
    }

    /// Filtered rows in display order.
    pub fn search<'a>(&self, table: &'a Table, query: &SearchQuery) -> Result<Subset<'a>> {
        let matched = filter::filter(&table.all(), &query.text, &query.constraints)?;
        sort::sort(matched, self.sort_keys)
    }

    pub fn page(
        &self,
        table: &Table,
        query: &SearchQuery,
        page: usize,
        page_size: usize,
        widths: &WidthPolicy,
    ) -> Result<ResultPage> {
        let ordered = self.search(table, query)?;
        let columns = projection::width_hints(
            &projection::project(&ordered, self.list_columns)?,
            widths,
        );

        let current = projection::paginate(&ordered, page, page_size);
        let rows = projection::project(&current.rows, self.list_columns)?
            .rows()
            .iter()
            .map(|row| row.cells().to_vec())
            .collect();
        let keys = current
            .rows
            .column_values(self.key_column)?
            .into_iter()
            .map(str::to_string)
            .collect();
        let groups = match self.group_by {
            Some(column) => sort::group_spans(&current.rows, column)?,
            None => Vec::new(),
        };

        Ok(ResultPage {
            view: self.kind,
            page: current.number,
            page_count: current.page_count,
            page_size: page_size.max(1),
            total: current.total,
            columns,
            rows,
            keys,
            groups,
        })
    }

    /// The whole filtered result restricted to [`ViewSpec::export_columns`].
    pub fn export_table(&self, table: &Table, query: &SearchQuery) -> Result<Table> {
        let ordered = self.search(table, query)?;
        projection::project(&ordered, &self.export_columns())
    }

    pub fn detail(&self, table: &Table, key: &str) -> Result<DetailView> {
        let row = detail::resolve_detail(table, self.key_column, key)?;
        let matches = detail::match_count(table, self.key_column, key)?;
        if matches > 1 {
            warn!(
                "{} '{}' matches {} rows in '{}', showing the first",
                self.key_column,
                key,
                matches,
                table.name()
            );
        }

        Ok(DetailView {
            view: self.kind,
            key: key.to_string(),
            fields: detail::detail_fields(table, row, self.detail_columns),
            matches,
            ambiguous: matches > 1,
        })
    }
}

/// Sorted distinct non-blank values of `column` in `subset`.
pub fn distinct_values(subset: &Subset<'_>, column: &str) -> Result<Vec<String>> {
    let mut values: Vec<String> = subset
        .column_values(column)?
        .into_iter()
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
        .collect();
    values.sort();
    values.dedup();
    Ok(values)
}

/// Dropdown contents for the grade view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GradeOptions {
    pub alloy: String,
    /// The "any" sentinel followed by every alloy.
    pub alloys: Vec<String>,
    /// The "any" sentinel followed by the grades of the chosen alloy.
    pub grades: Vec<String>,
}

/// Alloy choices, and grade choices restricted by `alloy` (the sentinel means all).
pub fn grade_options(table: &Table, alloy: &str) -> Result<GradeOptions> {
    let all = table.all();
    let alloy_constraint = Constraints::new().with(grades::ALLOY, alloy);
    let for_alloy = filter::filter(&all, "", &alloy_constraint)?;

    let with_any = |values: Vec<String>| {
        std::iter::once(ANY.to_string())
            .chain(values)
            .collect::<Vec<_>>()
    };

    Ok(GradeOptions {
        alloy: if filter::is_any(alloy) {
            ANY.to_string()
        } else {
            alloy.to_string()
        },
        alloys: with_any(distinct_values(&all, grades::ALLOY)?),
        grades: with_any(distinct_values(&for_alloy, grades::GRADE)?),
    })
}

/// Validate both views against the loaded tables.
///
/// Also warns about repeated material numbers, which break the one-row-per-key
/// expectation of the material view.
pub fn validate_views(tables: &Tables) -> Result<()> {
    for spec in [&MATERIAL_VIEW, &GRADE_VIEW] {
        spec.validate(spec.table(tables))?;
    }

    let keys = tables
        .records
        .all()
        .column_values(MATERIAL_VIEW.key_column)?;
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for key in keys.into_iter().filter(|k| !k.is_empty()) {
        *seen.entry(key).or_default() += 1;
    }
    let repeated = seen.values().filter(|&&n| n > 1).count();
    if repeated > 0 {
        warn!(
            "{} material numbers appear on more than one row; details show the first",
            repeated
        );
    }

    Ok(())
}
