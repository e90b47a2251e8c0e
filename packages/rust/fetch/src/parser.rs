//! Roster page parser.
//!
//! Roster pages carry one table of players. Each data row has at least five
//! cells: jersey number, photo, linked name, position, grade. The name cell's
//! `roster_players/<id>` link supplies the stable player id; rows without one
//! are skipped, as are team-staff rows flagged by the manager sentinel.

use scraper::{Html, Selector};

use rosterlens_shared::{PlayerRecord, player_id_from_href};

/// First-cell value marking a team-staff row, excluded from the lookup.
const MANAGER_SENTINEL: &str = "MGR";

/// Parse a roster page into player records.
///
/// Unparseable rows are skipped, never an error; an empty result is the
/// caller's signal to classify the page.
pub(crate) fn parse_roster(html: &str, team_id: &str) -> Vec<PlayerRecord> {
    let doc = Html::parse_document(html);
    let row_sel = Selector::parse("table tbody tr").expect("row selector");
    let cell_sel = Selector::parse("td").expect("cell selector");
    let link_sel = Selector::parse("a[href]").expect("link selector");

    let team_name = extract_team_name(&doc);
    let mut records = Vec::new();

    for row in doc.select(&row_sel) {
        let cells: Vec<_> = row.select(&cell_sel).collect();
        if cells.len() < 5 {
            continue;
        }

        let number = cell_text(&cells[0]);
        if number == MANAGER_SENTINEL {
            continue;
        }

        let Some(id) = cells[2]
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(player_id_from_href)
        else {
            continue;
        };

        records.push(PlayerRecord {
            id,
            number,
            position: cell_text(&cells[3]),
            grade: cell_text(&cells[4]),
            team_name: team_name.clone(),
            team_id: Some(team_id.to_string()),
        });
    }

    records
}

/// The team's display name, from the page's first `h2` heading.
fn extract_team_name(doc: &Html) -> Option<String> {
    let h2_sel = Selector::parse("h2").expect("heading selector");
    doc.select(&h2_sel)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .find(|text| !text.is_empty())
}

fn cell_text(cell: &scraper::ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}
