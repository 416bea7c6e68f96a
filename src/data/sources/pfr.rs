//! Pro Football Reference scraper
//!
//! Fetches the per-category season pages (`/years/{year}/{category}.htm`),
//! extracts the stat table, and prunes each category down to the columns
//! that survive into the merged season table.

use regex::Regex;
use reqwest::blocking::Client;
use scraper::{ElementRef, Html, Selector};
use std::fmt;
use std::path::{Path, PathBuf};

use super::{fetch, http_client, SeasonTableSource};
use crate::data::merge::TableMerger;
use crate::data::season_table::{Bound, Prune, SeasonTable};
use crate::{DataSource, GridironError, Result, SourceConfig};

/// Season stat pages scraped per year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatCategory {
    Fantasy,
    Passing,
    Rushing,
    Receiving,
    Scrimmage,
}

impl StatCategory {
    /// Join order of the merged season table
    pub const MERGE_ORDER: [StatCategory; 5] = [
        StatCategory::Fantasy,
        StatCategory::Passing,
        StatCategory::Rushing,
        StatCategory::Receiving,
        StatCategory::Scrimmage,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            StatCategory::Fantasy => "fantasy",
            StatCategory::Passing => "passing",
            StatCategory::Rushing => "rushing",
            StatCategory::Receiving => "receiving",
            StatCategory::Scrimmage => "scrimmage",
        }
    }

    /// Index of the `<tr>` holding the column labels. Pages with a grouped
    /// over-header put the labels on the second row.
    pub fn header_row(&self) -> usize {
        match self {
            StatCategory::Passing | StatCategory::Receiving => 0,
            StatCategory::Fantasy | StatCategory::Rushing | StatCategory::Scrimmage => 1,
        }
    }

    /// Column pruning applied in order
    pub fn pruning(&self) -> &'static [Prune] {
        const PASSING: &[Prune] = &[
            Prune::Named(&["QBrec", "1D", "Lng", "Succ%"]),
            Prune::Tail(4),
            Prune::NthFromEnd(2),
            Prune::Span(1, Bound::Index(6)),
        ];
        const COUNTING: &[Prune] = &[
            Prune::Named(&["1D", "Lng", "Succ%"]),
            Prune::Span(1, Bound::Index(6)),
            Prune::NthFromEnd(1),
        ];
        const SCRIMMAGE: &[Prune] = &[
            Prune::Named(&["Succ%"]),
            Prune::Span(1, Bound::FromEnd(6)),
            Prune::NthFromEnd(1),
        ];
        const FANTASY: &[Prune] = &[Prune::Span(4, Bound::FromEnd(7))];

        match self {
            StatCategory::Passing => PASSING,
            StatCategory::Rushing | StatCategory::Receiving => COUNTING,
            StatCategory::Scrimmage => SCRIMMAGE,
            StatCategory::Fantasy => FANTASY,
        }
    }

    pub fn renames(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            StatCategory::Passing => &[
                ("Att", "PassAtt"),
                ("Yds", "PassYds"),
                ("TD", "PassTD"),
                ("Y/A", "PassYds/A"),
                ("Y/G", "PassYds/G"),
            ],
            StatCategory::Rushing => &[
                ("Att", "RushAtt"),
                ("Yds", "RushYds"),
                ("TD", "RushTD"),
                ("Y/A", "RushYds/A"),
                ("Y/G", "RushYds/G"),
            ],
            StatCategory::Receiving => &[("Yds", "RecYds"), ("TD", "RecTD"), ("Y/G", "RecYds/G")],
            StatCategory::Scrimmage => &[],
            StatCategory::Fantasy => &[("FantPos", "Pos")],
        }
    }
}

impl fmt::Display for StatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| GridironError::Parse(format!("bad selector {}: {:?}", css, e)))
}

fn cell_text(cell: ElementRef<'_>, spaces: &Regex) -> String {
    let text: String = cell.text().collect();
    spaces.replace_all(text.trim(), " ").into_owned()
}

/// Extract and prune one category's stat table from a season page
pub fn parse_category(html: &str, category: StatCategory) -> Result<SeasonTable> {
    let document = Html::parse_document(html);
    let tr_selector = selector("tr")?;
    let th_selector = selector("th")?;
    let td_selector = selector("td")?;
    let spaces = Regex::new(r"\s+").map_err(|e| GridironError::Parse(e.to_string()))?;

    let rows: Vec<ElementRef<'_>> = document.select(&tr_selector).collect();
    let header_row = rows.get(category.header_row()).ok_or_else(|| {
        GridironError::Parse(format!("{} page has no header row", category))
    })?;

    // The leading <th> is the rank column; data rows carry it as <th> too.
    let columns: Vec<String> = header_row
        .select(&th_selector)
        .skip(1)
        .map(|th| cell_text(th, &spaces))
        .collect();

    let data: Vec<Vec<String>> = rows
        .iter()
        .filter(|row| !row.value().classes().any(|c| c == "thead"))
        .map(|row| {
            row.select(&td_selector)
                .map(|td| cell_text(td, &spaces))
                .collect::<Vec<_>>()
        })
        .filter(|cells| !cells.is_empty())
        .collect();

    let mut table = SeasonTable::from_text_rows(category.slug(), columns, data);
    for step in category.pruning() {
        table.apply(*step)?;
    }
    table.rename(category.renames());

    log::debug!(
        "Parsed {}: {} rows, columns {:?}",
        category,
        table.len(),
        table.columns
    );
    Ok(table)
}

pub struct ProFootballReference {
    client: Client,
    url_template: String,
}

impl ProFootballReference {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        Ok(ProFootballReference {
            client: http_client(config)?,
            url_template: config.season_table_url.clone(),
        })
    }

    pub fn category_url(&self, year: u16, category: StatCategory) -> String {
        self.url_template
            .replace("{year}", &year.to_string())
            .replace("{category}", category.slug())
    }
}

impl SeasonTableSource for ProFootballReference {
    fn source(&self) -> DataSource {
        DataSource::ProFootballReference
    }

    fn fetch_table(&self, year: u16, category: StatCategory) -> Result<SeasonTable> {
        let url = self.category_url(year, category);
        log::info!("Fetching {} {} stats", year, category);
        let html = fetch(&self.client, &url, self.source())?.text()?;
        parse_category(&html, category)
    }
}

/// Previously saved season pages, one `<category>.htm` per category
pub struct SavedPages {
    dir: PathBuf,
}

impl SavedPages {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        SavedPages {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn page_path(&self, category: StatCategory) -> PathBuf {
        self.dir.join(format!("{}.htm", category.slug()))
    }
}

impl SeasonTableSource for SavedPages {
    fn source(&self) -> DataSource {
        DataSource::LocalFile
    }

    fn fetch_table(&self, _year: u16, category: StatCategory) -> Result<SeasonTable> {
        let path = self.page_path(category);
        log::debug!("Loading saved page: {}", path.display());
        let html = std::fs::read_to_string(&path).map_err(|e| GridironError::SourceUnavailable {
            data_source: DataSource::LocalFile,
            message: format!("{}: {}", path.display(), e),
        })?;
        parse_category(&html, category)
    }
}

/// Fetch every category for `year` and merge into one row per player
pub fn season_stats<S: SeasonTableSource>(
    source: &S,
    year: u16,
    merger: &TableMerger,
) -> Result<SeasonTable> {
    let tables = StatCategory::MERGE_ORDER
        .iter()
        .map(|&category| source.fetch_table(year, category))
        .collect::<Result<Vec<_>>>()?;
    let mut merged = merger.merge(tables)?;
    merged.name = format!("season_{}", year);
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::season_table::StatCell;
    use crate::MergeConfig;
    use std::collections::HashMap;

    fn page(over_header: bool, header: &[&str], rows: &[&[&str]]) -> String {
        let mut html = String::from("<html><body><table>");
        if over_header {
            html.push_str("<tr class=\"over_header\"><th></th><th>Rushing</th></tr>");
        }
        html.push_str("<tr><th>Rk</th>");
        for h in header {
            html.push_str(&format!("<th>{}</th>", h));
        }
        html.push_str("</tr>");
        for (i, row) in rows.iter().enumerate() {
            if i == 1 {
                // header repeat inside the body
                html.push_str("<tr class=\"thead\"><th>Rk</th><th>Player</th></tr>");
            }
            html.push_str(&format!("<tr><th>{}</th>", i + 1));
            for cell in *row {
                html.push_str(&format!("<td>{}</td>", cell));
            }
            html.push_str("</tr>");
        }
        html.push_str("</table></body></html>");
        html
    }

    const RUSHING_HEADER: &[&str] = &[
        "Player", "Tm", "Age", "Pos", "G", "GS", "Att", "Yds", "TD", "1D", "Succ%", "Lng", "Y/A",
        "Y/G", "Fmb",
    ];

    #[test]
    fn test_parse_rushing_page() {
        let html = page(
            true,
            RUSHING_HEADER,
            &[
                &[
                    "Derrick Henry*+", "TEN", "26", "RB", "16", "16", "378", "2027", "17", "98",
                    "51.1", "94", "5.4", "126.7", "3",
                ],
                &[
                    "Dalvin  Cook", "MIN", "25", "RB", "14", "14", "312", "1557", "16", "80",
                    "50.0", "70", "5.0", "111.2", "5",
                ],
            ],
        );
        let table = parse_category(&html, StatCategory::Rushing).unwrap();
        assert_eq!(
            table.columns,
            vec!["Player", "RushAtt", "RushYds", "RushTD", "RushYds/A", "RushYds/G"]
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0][0], StatCell::Text("Derrick Henry*+".to_string()));
        assert_eq!(table.rows[0][2], StatCell::Text("2027".to_string()));
        assert_eq!(table.rows[1][0], StatCell::Text("Dalvin Cook".to_string()));
    }

    #[test]
    fn test_parse_fantasy_keeps_bio_and_points() {
        let header = &[
            "Player", "Tm", "FantPos", "Age", "G", "GS", "Cmp", "Att", "Yds", "TD", "Int",
            "FantPt", "PPR", "DKPt", "FDPt", "VBD", "PosRank", "OvRank",
        ];
        let html = page(
            true,
            header,
            &[&[
                "Josh Allen*", "BUF", "QB", "24", "16", "16", "396", "572", "4544", "37", "10",
                "395", "395.6", "410.5", "402.0", "149", "1", "2",
            ]],
        );
        let table = parse_category(&html, StatCategory::Fantasy).unwrap();
        assert_eq!(
            table.columns,
            vec!["Player", "Tm", "Pos", "Age", "FantPt", "PPR", "DKPt", "FDPt", "VBD", "PosRank", "OvRank"]
        );
    }

    #[test]
    fn test_missing_named_column_is_schema_mismatch() {
        let html = page(false, &["Player", "Tm", "Age"], &[&["A", "KC", "30"]]);
        let err = parse_category(&html, StatCategory::Passing).unwrap_err();
        assert!(matches!(err, GridironError::SchemaMismatch { ref table, .. } if table == "passing"));
    }

    #[test]
    fn test_page_without_header_row() {
        assert!(matches!(
            parse_category("<html><body></body></html>", StatCategory::Receiving),
            Err(GridironError::Parse(_))
        ));
    }

    #[test]
    fn test_category_url() {
        let pfr = ProFootballReference::new(&SourceConfig::default()).unwrap();
        assert_eq!(
            pfr.category_url(2020, StatCategory::Scrimmage),
            "https://www.pro-football-reference.com/years/2020/scrimmage.htm"
        );
    }

    #[test]
    fn test_saved_pages_read_category_files() {
        let dir = std::env::temp_dir().join(format!("gridiron_pages_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let html = page(
            true,
            RUSHING_HEADER,
            &[&[
                "Nick Chubb*", "CLE", "24", "RB", "12", "12", "190", "1067", "12", "54", "55.0",
                "59", "5.6", "88.9", "1",
            ]],
        );
        std::fs::write(dir.join("rushing.htm"), html).unwrap();

        let pages = SavedPages::new(&dir);
        let table = pages.fetch_table(2020, StatCategory::Rushing).unwrap();
        assert_eq!(table.len(), 1);
        assert!(matches!(
            pages.fetch_table(2020, StatCategory::Passing),
            Err(GridironError::SourceUnavailable { .. })
        ));

        std::fs::remove_dir_all(&dir).ok();
    }

    struct StaticTables(HashMap<StatCategory, SeasonTable>);

    impl SeasonTableSource for StaticTables {
        fn source(&self) -> DataSource {
            DataSource::LocalFile
        }

        fn fetch_table(&self, _year: u16, category: StatCategory) -> Result<SeasonTable> {
            self.0.get(&category).cloned().ok_or_else(|| GridironError::SourceUnavailable {
                data_source: DataSource::LocalFile,
                message: category.to_string(),
            })
        }
    }

    fn text_table(name: &str, columns: &[&str], rows: &[&[&str]]) -> SeasonTable {
        SeasonTable::from_text_rows(
            name,
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_season_stats_merges_in_order() {
        let mut tables = HashMap::new();
        tables.insert(
            StatCategory::Fantasy,
            text_table("fantasy", &["Player", "Tm", "Pos", "FantPt"], &[&["Josh Allen*", "BUF", "QB", "395"]]),
        );
        tables.insert(
            StatCategory::Passing,
            text_table("passing", &["Player", "PassYds"], &[&["Josh Allen*", "4544"]]),
        );
        tables.insert(
            StatCategory::Rushing,
            text_table("rushing", &["Player", "RushYds"], &[&["Josh Allen*", "421"], &["Derrick Henry*+", "2027"]]),
        );
        tables.insert(
            StatCategory::Receiving,
            text_table("receiving", &["Player", "RecYds"], &[&["Davante Adams*", "1374"]]),
        );
        tables.insert(
            StatCategory::Scrimmage,
            text_table("scrimmage", &["Player", "YScm"], &[&["Derrick Henry*+", "2141"]]),
        );

        let merger = TableMerger::new(&MergeConfig::default());
        let merged = season_stats(&StaticTables(tables), 2020, &merger).unwrap();

        assert_eq!(merged.name, "season_2020");
        assert_eq!(
            merged.columns,
            vec!["Player", "Tm", "Pos", "FantPt", "PassYds", "RushYds", "RecYds", "YScm"]
        );
        assert_eq!(merged.len(), 3);
        let henry = merged.find("Player", "Derrick Henry").unwrap();
        assert_eq!(henry[5], StatCell::Number(2027.0));
        assert_eq!(henry[7], StatCell::Number(2141.0));
        assert_eq!(henry[3], StatCell::Number(0.0));
        let allen = merged.find("Player", "Josh Allen").unwrap();
        assert_eq!(allen[1], StatCell::Text("BUF".to_string()));
    }

    #[test]
    fn test_season_stats_propagates_unavailable_category() {
        let merger = TableMerger::new(&MergeConfig::default());
        assert!(matches!(
            season_stats(&StaticTables(HashMap::new()), 2020, &merger),
            Err(GridironError::SourceUnavailable { .. })
        ));
    }
}
