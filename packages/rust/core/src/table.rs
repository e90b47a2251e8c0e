//! Owned table model parsed from stats-page HTML.
//!
//! The enhancer and sort engine mutate [`TableModel`] values rather than a
//! live document; [`LeaguePage::parse`] builds them from page HTML and
//! [`LeaguePage::render`] serializes the enhanced tables back out.

use std::collections::HashMap;

use scraper::{ElementRef, Html, Selector};

use crate::sort::SortDirection;

// ---------------------------------------------------------------------------
// Cells and rows
// ---------------------------------------------------------------------------

/// A header cell.
#[derive(Debug, Clone)]
pub struct HeaderCell {
    /// Trimmed header text.
    pub text: String,
    /// Visual class copied from the source document.
    pub class: Option<String>,
    /// Hover tooltip (set on derived, sortable headers).
    pub tooltip: Option<String>,
    /// Whether clicking this header triggers the sort engine.
    pub sortable: bool,
}

impl HeaderCell {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            class: None,
            tooltip: None,
            sortable: false,
        }
    }
}

/// A body cell: trimmed text plus the first outgoing link, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cell {
    pub text: String,
    pub href: Option<String>,
    pub class: Option<String>,
}

impl Cell {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            href: None,
            class: None,
        }
    }
}

/// One data row.
#[derive(Debug, Clone, Default)]
pub struct TableRow {
    pub cells: Vec<Cell>,
}

// ---------------------------------------------------------------------------
// TableModel
// ---------------------------------------------------------------------------

/// One table from the stats page: header row, body rows, and the sort
/// engine's per-column direction state.
#[derive(Debug, Clone, Default)]
pub struct TableModel {
    pub headers: Vec<HeaderCell>,
    pub rows: Vec<TableRow>,
    /// Toggling sort direction per column index. Process-local, never
    /// serialized.
    pub(crate) sort_directions: HashMap<usize, SortDirection>,
}

impl TableModel {
    /// Number of data rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Render this table as an HTML fragment.
    pub fn to_html(&self) -> String {
        let mut out = String::from("<table>\n  <thead>\n    <tr>");
        for header in &self.headers {
            out.push_str("<th");
            if let Some(class) = &header.class {
                push_attr(&mut out, "class", class);
            }
            if let Some(tooltip) = &header.tooltip {
                push_attr(&mut out, "title", tooltip);
            }
            out.push('>');
            out.push_str(&escape(&header.text));
            out.push_str("</th>");
        }
        out.push_str("</tr>\n  </thead>\n  <tbody>\n");
        for row in &self.rows {
            out.push_str("    <tr>");
            for cell in &row.cells {
                out.push_str("<td");
                if let Some(class) = &cell.class {
                    push_attr(&mut out, "class", class);
                }
                out.push('>');
                match &cell.href {
                    Some(href) => {
                        out.push_str("<a");
                        push_attr(&mut out, "href", href);
                        out.push('>');
                        out.push_str(&escape(&cell.text));
                        out.push_str("</a>");
                    }
                    None => out.push_str(&escape(&cell.text)),
                }
                out.push_str("</td>");
            }
            out.push_str("</tr>\n");
        }
        out.push_str("  </tbody>\n</table>");
        out
    }
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&escape(value));
    out.push('"');
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ---------------------------------------------------------------------------
// LeaguePage
// ---------------------------------------------------------------------------

/// A stats page under enhancement: its address, raw HTML (kept for link
/// discovery), and every table parsed from it.
#[derive(Debug, Clone)]
pub struct LeaguePage {
    pub url: String,
    pub html: String,
    pub tables: Vec<TableModel>,
}

impl LeaguePage {
    /// Parse every table out of `html`.
    pub fn parse(url: impl Into<String>, html: impl Into<String>) -> Self {
        let html = html.into();
        let tables = tables_from_html(&html);
        Self {
            url: url.into(),
            html,
            tables,
        }
    }

    /// Total data rows across all tables — the readiness signal.
    pub fn data_row_count(&self) -> usize {
        self.tables.iter().map(TableModel::row_count).sum()
    }

    /// Render the enhanced tables as a standalone HTML document.
    pub fn render(&self) -> String {
        let mut out = String::from("<!DOCTYPE html>\n<html>\n<body>\n");
        for table in &self.tables {
            out.push_str(&table.to_html());
            out.push('\n');
        }
        out.push_str("</body>\n</html>\n");
        out
    }
}

/// Parse every `<table>` in a document into owned models.
pub fn tables_from_html(html: &str) -> Vec<TableModel> {
    let doc = Html::parse_document(html);
    let table_sel = Selector::parse("table").expect("table selector");
    let header_sel = Selector::parse("thead tr th").expect("header selector");
    let row_sel = Selector::parse("tbody tr").expect("row selector");
    let cell_sel = Selector::parse("td").expect("cell selector");
    let link_sel = Selector::parse("a[href]").expect("link selector");

    let mut tables = Vec::new();
    for table_el in doc.select(&table_sel) {
        let headers: Vec<HeaderCell> = table_el
            .select(&header_sel)
            .map(|th| HeaderCell {
                text: element_text(&th),
                class: th.value().attr("class").map(str::to_string),
                tooltip: th.value().attr("title").map(str::to_string),
                sortable: false,
            })
            .collect();

        let rows: Vec<TableRow> = table_el
            .select(&row_sel)
            .map(|tr| TableRow {
                cells: tr
                    .select(&cell_sel)
                    .map(|td| Cell {
                        text: element_text(&td),
                        href: td
                            .select(&link_sel)
                            .next()
                            .and_then(|a| a.value().attr("href"))
                            .map(str::to_string),
                        class: td.value().attr("class").map(str::to_string),
                    })
                    .collect(),
            })
            .collect();

        tables.push(TableModel {
            headers,
            rows,
            sort_directions: HashMap::new(),
        });
    }

    tables
}

fn element_text(el: &ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats_fixture() -> String {
        std::fs::read_to_string("../../../fixtures/html/league-stats.html").expect("read fixture")
    }

    #[test]
    fn parses_all_tables() {
        let page = LeaguePage::parse("https://example.org?subseason=867530", stats_fixture());
        assert_eq!(page.tables.len(), 3);

        let skaters = &page.tables[0];
        assert_eq!(skaters.headers.len(), 7);
        assert_eq!(skaters.headers[1].text, "Name");
        assert_eq!(skaters.headers[0].class.as_deref(), Some("hdr"));
        assert_eq!(skaters.row_count(), 3);

        // Name cell keeps its player link.
        let name_cell = &skaters.rows[0].cells[1];
        assert_eq!(name_cell.text, "Sam Carter");
        assert!(
            name_cell
                .href
                .as_deref()
                .is_some_and(|h| h.contains("roster_players/991"))
        );
    }

    #[test]
    fn readiness_counts_rows_across_tables() {
        let page = LeaguePage::parse("https://example.org", stats_fixture());
        // 3 skater rows + 1 goalie row + 1 nav row.
        assert_eq!(page.data_row_count(), 5);
    }

    #[test]
    fn table_without_thead_has_no_headers() {
        let page = LeaguePage::parse("https://example.org", stats_fixture());
        assert!(page.tables[2].headers.is_empty());
    }

    #[test]
    fn render_roundtrips_through_parse() {
        let page = LeaguePage::parse("https://example.org", stats_fixture());
        let rendered = page.render();
        let reparsed = tables_from_html(&rendered);

        assert_eq!(reparsed.len(), page.tables.len());
        assert_eq!(reparsed[0].headers.len(), page.tables[0].headers.len());
        assert_eq!(reparsed[0].rows[0].cells[1].text, "Sam Carter");
    }

    #[test]
    fn render_escapes_text() {
        let mut table = TableModel::default();
        table.headers.push(HeaderCell::new("A<B"));
        table.rows.push(TableRow {
            cells: vec![Cell::new("x & y")],
        });
        let html = table.to_html();
        assert!(html.contains("A&lt;B"));
        assert!(html.contains("x &amp; y"));
    }
}
