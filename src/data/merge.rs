//! Season table merging
//!
//! Joins the per-category season tables into one wide per-player table.

use crate::data::season_table::SeasonTable;
use crate::{GridironError, MergeConfig, Result};

pub struct TableMerger {
    key: String,
    numeric_from: usize,
}

impl TableMerger {
    pub fn new(config: &MergeConfig) -> Self {
        TableMerger {
            key: config.key.clone(),
            numeric_from: config.numeric_from,
        }
    }

    /// Outer-join `tables` left to right on the key column and order the
    /// result by key (stable, so repeated players keep their page order).
    /// Then coerce the stat columns to numbers, drop repeated players (first
    /// row wins), zero-fill gaps and strip award markers.
    pub fn merge(&self, tables: Vec<SeasonTable>) -> Result<SeasonTable> {
        let mut tables = tables.into_iter();
        let mut merged = tables
            .next()
            .ok_or_else(|| GridironError::Parse("no season tables to merge".to_string()))?;

        for table in tables {
            log::debug!(
                "Joining {} ({} rows) onto {} rows",
                table.name,
                table.len(),
                merged.len()
            );
            merged = merged.outer_join(&table, &self.key)?;
        }
        merged.sort_by_text(&self.key)?;

        merged.coerce_numeric_from(self.numeric_from);
        let dropped = merged.dedup_by(&self.key)?;
        if dropped > 0 {
            log::debug!("Dropped {} repeated {} rows", dropped, self.key);
        }
        merged.fill_missing(0.0);
        merged.strip_annotations();

        log::info!(
            "Merged season table: {} players, {} columns",
            merged.len(),
            merged.columns.len()
        );
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::season_table::StatCell;

    fn table(name: &str, columns: &[&str], rows: &[&[&str]]) -> SeasonTable {
        SeasonTable::from_text_rows(
            name,
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    fn merger(numeric_from: usize) -> TableMerger {
        TableMerger::new(&MergeConfig {
            key: "Player".to_string(),
            numeric_from,
        })
    }

    #[test]
    fn test_disjoint_players_are_zero_filled() {
        let t1 = table("t1", &["Player", "Yds"], &[&["X", "100"]]);
        let t2 = table("t2", &["Player", "TD"], &[&["Y", "2"]]);
        let merged = merger(1).merge(vec![t1, t2]).unwrap();

        assert_eq!(merged.columns, vec!["Player", "Yds", "TD"]);
        assert_eq!(merged.len(), 2);
        let x = merged.find("Player", "X").unwrap();
        assert_eq!(x[1], StatCell::Number(100.0));
        assert_eq!(x[2], StatCell::Number(0.0));
        let y = merged.find("Player", "Y").unwrap();
        assert_eq!(y[1], StatCell::Number(0.0));
        assert_eq!(y[2], StatCell::Number(2.0));
    }

    #[test]
    fn test_repeated_player_keeps_first_row() {
        let t1 = table(
            "fantasy",
            &["Player", "Tm", "Pos", "Yds"],
            &[&["Tom Brady*+", "2TM", "QB", "4000"], &["Tom Brady*+", "TB", "QB", "2500"]],
        );
        let merged = merger(3).merge(vec![t1]).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.rows[0][0], StatCell::Text("Tom Brady".to_string()));
        assert_eq!(merged.rows[0][1], StatCell::Text("2TM".to_string()));
        assert_eq!(merged.rows[0][3], StatCell::Number(4000.0));
    }

    #[test]
    fn test_leading_columns_stay_text() {
        let t1 = table("t1", &["Player", "Tm", "Pos", "Att"], &[&["X", "KC", "QB", "30"]]);
        let t2 = table("t2", &["Player", "RushAtt"], &[&["Z", "12"]]);
        let merged = merger(3).merge(vec![t1, t2]).unwrap();
        let z = merged.find("Player", "Z").unwrap();
        // missing text cells are zero-filled too
        assert_eq!(z[1], StatCell::Number(0.0));
        assert_eq!(z[4], StatCell::Number(12.0));
        let x = merged.find("Player", "X").unwrap();
        assert_eq!(x[1], StatCell::Text("KC".to_string()));
    }

    #[test]
    fn test_rows_ordered_by_key() {
        let t1 = table(
            "fantasy",
            &["Player", "Tm", "Pos", "Yds"],
            &[
                &["Zach Wilson", "NYJ", "QB", "10"],
                &["Aaron Rodgers", "GNB", "QB", "20"],
                &["Zach Wilson", "TOT", "QB", "30"],
            ],
        );
        let t2 = table("rushing", &["Player", "RushYds"], &[&["Mark Ingram", "5"]]);
        let merged = merger(3).merge(vec![t1, t2]).unwrap();

        let names: Vec<&str> = merged.rows.iter().filter_map(|r| r[0].as_text()).collect();
        assert_eq!(names, vec!["Aaron Rodgers", "Mark Ingram", "Zach Wilson"]);
        // the earlier of the two Wilson rows survives the dedup
        let wilson = merged.find("Player", "Zach Wilson").unwrap();
        assert_eq!(wilson[1], StatCell::Text("NYJ".to_string()));
    }

    #[test]
    fn test_missing_key_fails() {
        let t1 = table("t1", &["Player", "Yds"], &[]);
        let t2 = table("t2", &["Name", "TD"], &[]);
        assert!(matches!(
            merger(1).merge(vec![t1, t2]),
            Err(GridironError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert!(merger(3).merge(Vec::new()).is_err());
    }
}
