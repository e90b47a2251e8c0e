//! Table matching and column injection.
//!
//! Inspects each candidate table, classifies its schema, and joins every
//! row's player id against the aggregated lookup to insert derived Position
//! and Grade columns. Enhancement is idempotent: the check is structural
//! (derived header labels present), so it holds across re-entrant triggers
//! and not just within one pipeline run.

use tracing::debug;

use rosterlens_shared::{PlayerLookup, player_id_from_href};

use crate::heuristics::expand_team_label;
use crate::table::{Cell, HeaderCell, TableModel};

/// Header label of the player-name column.
const NAME_HEADER: &str = "Name";

/// Header label of the team column, when present.
const TEAM_HEADER: &str = "Team";

/// Derived position column label.
pub const POS_LABEL: &str = "Pos";

/// Derived grade column label.
pub const GRADE_LABEL: &str = "Grade";

/// Header labels that, together, mark a goalie table. Goalie tables get no
/// position column — position is implied by table membership.
const GOALIE_MARKERS: [&str; 2] = ["GAA", "SV%"];

/// Tooltip on derived headers: the data source is paginated, and sorting
/// does not refetch other pages.
const SORT_TOOLTIP: &str = "Sorts the rows on this page only";

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Where a table's joinable columns sit and which schema it follows.
/// Derived per table at enhancement time; never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    /// Index of the player-name column.
    pub name_column: usize,
    /// Index of the team column, if the table has one.
    pub team_column: Option<usize>,
    /// True for the specialized goalie schema.
    pub is_goalie_schema: bool,
}

/// Classify a table by its header row. `None` means the table has no name
/// column and is not a candidate for enhancement.
pub fn describe(table: &TableModel) -> Option<TableDescriptor> {
    let name_column = table.headers.iter().position(|h| h.text == NAME_HEADER)?;
    let team_column = table.headers.iter().position(|h| h.text == TEAM_HEADER);
    let is_goalie_schema = GOALIE_MARKERS
        .iter()
        .all(|marker| table.headers.iter().any(|h| h.text == *marker));

    Some(TableDescriptor {
        name_column,
        team_column,
        is_goalie_schema,
    })
}

// ---------------------------------------------------------------------------
// Enhancement
// ---------------------------------------------------------------------------

/// Outcome of one enhancement attempt. Every non-`Enhanced` variant is a
/// benign skip, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnhanceOutcome {
    /// Columns were injected; `matched` of `total` rows joined the lookup.
    Enhanced { matched: usize, total: usize },
    /// Derived columns already present from a prior pass.
    AlreadyEnhanced,
    /// No name column; this table is not a stats table.
    NotEligible,
    /// Missing header row or zero data rows.
    Empty,
}

/// Inject derived columns into `table`, joining rows against `lookup`.
pub fn enhance(table: &mut TableModel, lookup: &PlayerLookup) -> EnhanceOutcome {
    if table.headers.is_empty() || table.rows.is_empty() {
        return EnhanceOutcome::Empty;
    }

    let Some(descriptor) = describe(table) else {
        return EnhanceOutcome::NotEligible;
    };

    // Structural idempotency check: survives re-entrant triggers where a
    // run-scoped flag would not.
    if table
        .headers
        .iter()
        .any(|h| h.text == POS_LABEL || h.text == GRADE_LABEL)
    {
        return EnhanceOutcome::AlreadyEnhanced;
    }

    let name_idx = descriptor.name_column;
    let labels: &[&str] = if descriptor.is_goalie_schema {
        &[GRADE_LABEL]
    } else {
        &[POS_LABEL, GRADE_LABEL]
    };
    let added = labels.len();

    // Insert derived headers immediately after the name header, copying the
    // first header's visual class.
    let sample_class = table.headers[0].class.clone();
    for (offset, label) in labels.iter().enumerate() {
        table.headers.insert(
            name_idx + 1 + offset,
            HeaderCell {
                text: (*label).to_string(),
                class: sample_class.clone(),
                tooltip: Some(SORT_TOOLTIP.to_string()),
                sortable: true,
            },
        );
    }

    // The team column shifts right when it sits after the name column.
    let team_idx = descriptor.team_column.map(|idx| {
        if idx > name_idx { idx + added } else { idx }
    });

    let mut matched = 0;
    let mut total = 0;

    for row in &mut table.rows {
        if row.cells.is_empty() {
            continue;
        }
        total += 1;

        let record = row
            .cells
            .get(name_idx)
            .and_then(|cell| cell.href.as_deref())
            .and_then(player_id_from_href)
            .and_then(|id| lookup.get(&id));

        let (position, grade) = match record {
            Some(r) => {
                matched += 1;
                (r.position.clone(), r.grade.clone())
            }
            // Unmatched rows still get empty cells, preserving alignment.
            None => (String::new(), String::new()),
        };

        let cell_class = row.cells[0].class.clone();
        let values: Vec<String> = if descriptor.is_goalie_schema {
            vec![grade]
        } else {
            vec![position, grade]
        };

        let insert_at = (name_idx + 1).min(row.cells.len());
        for (offset, value) in values.into_iter().enumerate() {
            row.cells.insert(
                insert_at + offset,
                Cell {
                    text: value,
                    href: None,
                    class: cell_class.clone(),
                },
            );
        }

        // Presentation nicety: swap an abbreviated team label for the full
        // name when the roster supplied one.
        if let (Some(team_idx), Some(record)) = (team_idx, record) {
            if let Some(full) = record.team_name.as_deref() {
                if let Some(team_cell) = row.cells.get_mut(team_idx) {
                    if let Some(expanded) = expand_team_label(&team_cell.text, full) {
                        team_cell.text = expanded;
                    }
                }
            }
        }
    }

    debug!(matched, total, goalie = descriptor.is_goalie_schema, "table enhanced");
    EnhanceOutcome::Enhanced { matched, total }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::LeaguePage;
    use rosterlens_shared::PlayerRecord;

    fn fixture_page() -> LeaguePage {
        let html = std::fs::read_to_string("../../../fixtures/html/league-stats.html")
            .expect("read fixture");
        LeaguePage::parse("https://example.org?subseason=867530", html)
    }

    fn lookup() -> PlayerLookup {
        let mut map = PlayerLookup::new();
        for (id, number, position, grade) in [
            ("991", "17", "D", "11"),
            ("992", "9", "F", "10"),
            ("993", "30", "G", "12"),
        ] {
            map.insert(
                id.to_string(),
                PlayerRecord {
                    id: id.into(),
                    number: number.into(),
                    position: position.into(),
                    grade: grade.into(),
                    team_name: Some("Ridgeview Wolves".into()),
                    team_id: Some("42".into()),
                },
            );
        }
        map
    }

    fn header_texts(table: &TableModel) -> Vec<&str> {
        table.headers.iter().map(|h| h.text.as_str()).collect()
    }

    #[test]
    fn classifies_both_schemas() {
        let page = fixture_page();

        let skaters = describe(&page.tables[0]).expect("skater descriptor");
        assert_eq!(skaters.name_column, 1);
        assert_eq!(skaters.team_column, Some(2));
        assert!(!skaters.is_goalie_schema);

        let goalies = describe(&page.tables[1]).expect("goalie descriptor");
        assert!(goalies.is_goalie_schema);

        assert!(describe(&page.tables[2]).is_none());
    }

    #[test]
    fn skater_table_gains_pos_and_grade() {
        let mut page = fixture_page();
        let table = &mut page.tables[0];
        let lookup = lookup();

        let outcome = enhance(table, &lookup);
        assert_eq!(outcome, EnhanceOutcome::Enhanced { matched: 2, total: 3 });

        assert_eq!(
            header_texts(table),
            vec!["#", "Name", "Pos", "Grade", "Team", "GP", "G", "A", "Pts"]
        );
        // Derived headers copy the sample class and are sortable.
        assert_eq!(table.headers[2].class.as_deref(), Some("hdr"));
        assert!(table.headers[2].sortable);
        assert!(table.headers[2].tooltip.is_some());

        // Matched rows carry exact record values.
        let carter = &table.rows[0];
        assert_eq!(carter.cells[2].text, "D");
        assert_eq!(carter.cells[3].text, "11");

        // Unmatched rows get empty cells, keeping column alignment.
        let unlinked = &table.rows[2];
        assert_eq!(unlinked.cells.len(), carter.cells.len());
        assert_eq!(unlinked.cells[2].text, "");
        assert_eq!(unlinked.cells[3].text, "");
    }

    #[test]
    fn goalie_table_gains_only_grade() {
        let mut page = fixture_page();
        let table = &mut page.tables[1];

        let outcome = enhance(table, &lookup());
        assert_eq!(outcome, EnhanceOutcome::Enhanced { matched: 1, total: 1 });

        assert_eq!(
            header_texts(table),
            vec!["#", "Name", "Grade", "Team", "GP", "GAA", "SV%"]
        );
        assert_eq!(table.rows[0].cells[2].text, "12");
    }

    #[test]
    fn second_enhance_is_a_noop() {
        let mut page = fixture_page();
        let table = &mut page.tables[0];
        let lookup = lookup();

        enhance(table, &lookup);
        let headers_after_first = header_texts(table).join("|");
        let first_row: Vec<String> =
            table.rows[0].cells.iter().map(|c| c.text.clone()).collect();

        let outcome = enhance(table, &lookup);
        assert_eq!(outcome, EnhanceOutcome::AlreadyEnhanced);
        assert_eq!(header_texts(table).join("|"), headers_after_first);
        let row_now: Vec<String> =
            table.rows[0].cells.iter().map(|c| c.text.clone()).collect();
        assert_eq!(row_now, first_row);
    }

    #[test]
    fn abbreviated_team_label_expanded() {
        let mut page = fixture_page();
        let table = &mut page.tables[0];

        enhance(table, &lookup());

        // Team column shifted right by the two derived columns.
        assert_eq!(table.rows[0].cells[4].text, "Ridgeview Wolves");
        // The unmatched row keeps its original label.
        assert_eq!(table.rows[2].cells[4].text, "BH");
    }

    #[test]
    fn table_without_name_column_not_eligible() {
        let mut page = fixture_page();
        // The nav table has no thead at all.
        assert_eq!(enhance(&mut page.tables[2], &lookup()), EnhanceOutcome::Empty);

        let html = r#"<table><thead><tr><th>Rank</th><th>W</th></tr></thead>
            <tbody><tr><td>1</td><td>9</td></tr></tbody></table>"#;
        let mut tables = crate::table::tables_from_html(html);
        assert_eq!(enhance(&mut tables[0], &lookup()), EnhanceOutcome::NotEligible);
    }

    #[test]
    fn empty_lookup_leaves_cells_blank_but_aligned() {
        let mut page = fixture_page();
        let table = &mut page.tables[0];
        let before = table.rows[0].cells.len();

        let outcome = enhance(table, &PlayerLookup::new());
        assert_eq!(outcome, EnhanceOutcome::Enhanced { matched: 0, total: 3 });
        for row in &table.rows {
            assert_eq!(row.cells.len(), before + 2);
        }
    }
}
