//! Pivot tables over the merged block-average rows.
//!
//! The detailed table and the region tables are independent reducers over the
//! same `&[BlockAverageRow]`; neither reads the other's output.

use crate::mapping::ChannelRegionMap;
use crate::types::{BlockAverageRow, Cell, ChannelId};
use crate::warnings::{RunReport, Warning};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Column order for the pivot tables.
///
/// Block names in order of first appearance, taking the names each recording
/// declared (in ingestion order) before any name that only shows up in
/// `rows`. A declared block whose windows held no samples anywhere still gets
/// its column.
pub fn block_order(declared: &[String], rows: &[BlockAverageRow]) -> Vec<String> {
    let mut seen = HashSet::new();
    declared
        .iter()
        .map(String::as_str)
        .chain(rows.iter().map(|r| r.block_name.as_str()))
        .filter(|name| seen.insert(*name))
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailedRow {
    pub trial: String,
    pub channel: ChannelId,
    pub cells: Vec<Cell>,
}

/// (trial, channel) rows × block columns
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DetailedPivotTable {
    pub blocks: Vec<String>,
    pub rows: Vec<DetailedRow>,
}

impl DetailedPivotTable {
    pub fn cell(&self, trial: &str, channel: ChannelId, block: &str) -> Option<Cell> {
        let col = self.blocks.iter().position(|b| b == block)?;
        self.rows
            .iter()
            .find(|r| r.trial == trial && r.channel == channel)
            .map(|r| r.cells[col])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionRow {
    pub trial: String,
    pub cells: Vec<Cell>,
}

/// Trial rows × block columns for a single region
#[derive(Debug, Clone, PartialEq)]
pub struct RegionPivotTable {
    pub region: String,
    pub blocks: Vec<String>,
    pub rows: Vec<RegionRow>,
    /// Distinct channels that contributed at least one value
    pub channel_count: usize,
}

impl RegionPivotTable {
    pub fn cell(&self, trial: &str, block: &str) -> Option<Cell> {
        let col = self.blocks.iter().position(|b| b == block)?;
        self.rows.iter().find(|r| r.trial == trial).map(|r| r.cells[col])
    }
}

/// Shape summary of a region table, for reports
#[derive(Debug, Clone, Serialize)]
pub struct RegionSummary {
    pub region: String,
    pub trials: usize,
    pub blocks: usize,
    pub channels: usize,
}

impl From<&RegionPivotTable> for RegionSummary {
    fn from(table: &RegionPivotTable) -> Self {
        Self {
            region: table.region.clone(),
            trials: table.rows.len(),
            blocks: table.blocks.len(),
            channels: table.channel_count,
        }
    }
}

/// Keys of one trial that more than one recording produced
struct Collision<'a> {
    trial: &'a str,
    channels: HashSet<ChannelId>,
    blocks: Vec<String>,
}

/// Build the detailed table.
///
/// Every (trial, channel) seen gets exactly one row, in first-seen order, and
/// every block of [`block_order`] gets a column. A (trial, channel, block) key
/// produced twice is overwritten by the later row; one recording never emits
/// the same key twice, so a repeat means two recordings claim the same trial.
/// Each such trial is reported once.
pub fn build_detailed(
    rows: &[BlockAverageRow],
    declared_blocks: &[String],
    report: &mut RunReport,
) -> DetailedPivotTable {
    let blocks = block_order(declared_blocks, rows);
    let block_index: HashMap<&str, usize> = blocks
        .iter()
        .enumerate()
        .map(|(i, b)| (b.as_str(), i))
        .collect();

    let mut row_index: HashMap<(&str, ChannelId), usize> = HashMap::new();
    let mut table_rows: Vec<DetailedRow> = Vec::new();
    let mut collisions: Vec<Collision> = Vec::new();

    for row in rows {
        let idx = *row_index
            .entry((row.trial_name.as_str(), row.channel))
            .or_insert_with(|| {
                table_rows.push(DetailedRow {
                    trial: row.trial_name.clone(),
                    channel: row.channel,
                    cells: vec![Cell::Absent; blocks.len()],
                });
                table_rows.len() - 1
            });

        let col = block_index[row.block_name.as_str()];
        let cell = &mut table_rows[idx].cells[col];
        if !cell.is_absent() {
            let pos = match collisions.iter().position(|c| c.trial == row.trial_name) {
                Some(pos) => pos,
                None => {
                    collisions.push(Collision {
                        trial: &row.trial_name,
                        channels: HashSet::new(),
                        blocks: Vec::new(),
                    });
                    collisions.len() - 1
                }
            };
            let collision = &mut collisions[pos];
            collision.channels.insert(row.channel);
            if !collision.blocks.contains(&row.block_name) {
                collision.blocks.push(row.block_name.clone());
            }
        }
        *cell = Cell::Present(row.value);
    }

    for collision in collisions {
        report.warn(Warning::DuplicateTrial {
            trial: collision.trial.to_string(),
            channels: collision.channels.len(),
            blocks: collision.blocks,
        });
    }

    DetailedPivotTable {
        blocks,
        rows: table_rows,
    }
}

/// Build the table for one region.
///
/// A cell is the mean over mapped channels of the value the detailed table
/// holds for that trial/block (last row wins on a repeated key). Only trials
/// with at least one mapped row appear, and only blocks that occur for this
/// region, in global first-seen order.
pub fn build_region(
    rows: &[BlockAverageRow],
    mapper: &ChannelRegionMap,
    region: &str,
    global_blocks: &[String],
) -> RegionPivotTable {
    let mapped: Vec<&BlockAverageRow> = rows
        .iter()
        .filter(|r| mapper.region_of(r.channel) == Some(region))
        .collect();

    let mut latest: HashMap<(&str, ChannelId, &str), usize> = HashMap::new();
    for (idx, row) in mapped.iter().enumerate() {
        latest.insert(
            (row.trial_name.as_str(), row.channel, row.block_name.as_str()),
            idx,
        );
    }

    let mut trials: Vec<&str> = Vec::new();
    let mut channels: HashSet<ChannelId> = HashSet::new();
    let mut sums: HashMap<(&str, &str), (f64, usize)> = HashMap::new();
    for (idx, row) in mapped.iter().enumerate() {
        let key = (row.trial_name.as_str(), row.channel, row.block_name.as_str());
        if latest[&key] != idx {
            continue;
        }
        if !trials.contains(&row.trial_name.as_str()) {
            trials.push(row.trial_name.as_str());
        }
        channels.insert(row.channel);
        let entry = sums
            .entry((row.trial_name.as_str(), row.block_name.as_str()))
            .or_insert((0.0, 0));
        entry.0 += row.value;
        entry.1 += 1;
    }

    let blocks: Vec<String> = global_blocks
        .iter()
        .filter(|b| mapped.iter().any(|r| &r.block_name == *b))
        .cloned()
        .collect();

    let table_rows = trials
        .iter()
        .map(|trial| RegionRow {
            trial: trial.to_string(),
            cells: blocks
                .iter()
                .map(|block| {
                    Cell::from(
                        sums.get(&(*trial, block.as_str()))
                            .map(|(sum, n)| sum / *n as f64),
                    )
                })
                .collect(),
        })
        .collect();

    RegionPivotTable {
        region: region.to_string(),
        blocks,
        rows: table_rows,
        channel_count: channels.len(),
    }
}

/// One table per region known to the mapper, sorted by region label.
/// Returns nothing when the mapper is empty.
pub fn build_region_tables(
    rows: &[BlockAverageRow],
    declared_blocks: &[String],
    mapper: &ChannelRegionMap,
) -> Vec<RegionPivotTable> {
    let global_blocks = block_order(declared_blocks, rows);
    mapper
        .all_regions()
        .into_iter()
        .map(|region| build_region(rows, mapper, region, &global_blocks))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(trial: &str, channel: (u32, u32), block: &str, value: f64) -> BlockAverageRow {
        BlockAverageRow {
            trial_name: trial.to_string(),
            channel: ChannelId::new(channel.0, channel.1),
            block_name: block.to_string(),
            value,
            std: 0.0,
            n_samples: 1,
            duration_s: 1.0,
        }
    }

    fn names(blocks: &[&str]) -> Vec<String> {
        blocks.iter().map(|b| b.to_string()).collect()
    }

    fn mapper(json: &str) -> ChannelRegionMap {
        ChannelRegionMap::from_json_str(json, &mut RunReport::new()).unwrap()
    }

    #[test]
    fn test_block_order_is_first_seen() {
        let rows = vec![
            row("T_1", (1, 1), "Stim", 1.0),
            row("T_1", (1, 1), "Base", 1.0),
            row("T_2", (1, 1), "Recover", 1.0),
            row("T_2", (1, 1), "Stim", 1.0),
        ];
        assert_eq!(block_order(&[], &rows), vec!["Stim", "Base", "Recover"]);

        let table = build_detailed(&rows, &[], &mut RunReport::new());
        assert_eq!(table.blocks, vec!["Stim", "Base", "Recover"]);
    }

    #[test]
    fn test_declared_block_without_samples_keeps_its_column() {
        let declared = names(&["A", "Short", "B"]);
        let rows = vec![row("T_1", (1, 1), "A", 1.0), row("T_1", (1, 1), "B", 2.0)];

        assert_eq!(block_order(&declared, &rows), declared);

        let table = build_detailed(&rows, &declared, &mut RunReport::new());
        assert_eq!(table.blocks, vec!["A", "Short", "B"]);
        assert_eq!(
            table.rows[0].cells,
            vec![Cell::Present(1.0), Cell::Absent, Cell::Present(2.0)]
        );
        assert_eq!(
            table.cell("T_1", ChannelId::new(1, 1), "Short"),
            Some(Cell::Absent)
        );
    }

    #[test]
    fn test_declared_order_wins_over_row_order() {
        // Channel (1,1) has no "Base" samples, (1,2) does
        let declared = names(&["Stim", "Base", "Recover"]);
        let rows = vec![
            row("T_1", (1, 1), "Stim", 1.0),
            row("T_1", (1, 1), "Recover", 1.0),
            row("T_1", (1, 2), "Base", 1.0),
        ];
        assert_eq!(block_order(&[], &rows), vec!["Stim", "Recover", "Base"]);
        assert_eq!(block_order(&declared, &rows), declared);
    }

    #[test]
    fn test_detailed_has_one_row_per_trial_channel() {
        let rows = vec![
            row("T_1", (1, 1), "A", 1.0),
            row("T_1", (1, 2), "A", 2.0),
            row("T_1", (1, 1), "B", 3.0),
            row("T_2", (1, 1), "B", 4.0),
        ];
        let table = build_detailed(&rows, &[], &mut RunReport::new());
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0].cells, vec![Cell::Present(1.0), Cell::Present(3.0)]);
        assert_eq!(table.rows[1].cells, vec![Cell::Present(2.0), Cell::Absent]);
        assert_eq!(table.rows[2].trial, "T_2");
        assert_eq!(table.rows[2].cells, vec![Cell::Absent, Cell::Present(4.0)]);
    }

    #[test]
    fn test_duplicate_key_overwrites_and_warns() {
        let rows = vec![row("T_1", (1, 1), "A", 1.0), row("T_1", (1, 1), "A", 5.0)];
        let mut report = RunReport::new();
        let table = build_detailed(&rows, &[], &mut report);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.cell("T_1", ChannelId::new(1, 1), "A"), Some(Cell::Present(5.0)));
        assert_eq!(report.warnings().len(), 1);
        assert!(matches!(report.warnings()[0], Warning::DuplicateTrial { .. }));
    }

    #[test]
    fn test_duplicate_trial_reported_once_per_trial() {
        let mut rows = Vec::new();
        for value in [1.0, 2.0] {
            for source in 1..=20 {
                for block in ["A", "B", "C"] {
                    rows.push(row("T_1", (source, 1), block, value));
                }
            }
        }
        rows.push(row("T_2", (1, 1), "A", 1.0));
        rows.push(row("T_2", (1, 1), "A", 3.0));

        let mut report = RunReport::new();
        let table = build_detailed(&rows, &[], &mut report);

        assert_eq!(table.cell("T_1", ChannelId::new(7, 1), "C"), Some(Cell::Present(2.0)));
        assert_eq!(
            report.warnings(),
            &[
                Warning::DuplicateTrial {
                    trial: "T_1".to_string(),
                    channels: 20,
                    blocks: names(&["A", "B", "C"]),
                },
                Warning::DuplicateTrial {
                    trial: "T_2".to_string(),
                    channels: 1,
                    blocks: names(&["A"]),
                },
            ]
        );
    }

    #[test]
    fn test_region_cell_is_mean_of_mapped_channels() {
        let map = mapper(
            r#"[{"source":1,"detector":1,"region":"R"},{"source":1,"detector":2,"region":"R"}]"#,
        );
        let rows = vec![
            row("T_1", (1, 1), "A", 1.0),
            row("T_1", (1, 2), "A", 3.0),
            row("T_1", (1, 3), "A", 100.0),
            row("T_1", (1, 1), "B", 6.0),
        ];
        let tables = build_region_tables(&rows, &[], &map);
        assert_eq!(tables.len(), 1);
        let table = &tables[0];
        assert_eq!(table.region, "R");
        assert_eq!(table.channel_count, 2);
        assert_eq!(table.cell("T_1", "A"), Some(Cell::Present(2.0)));
        assert_eq!(table.cell("T_1", "B"), Some(Cell::Present(6.0)));
    }

    #[test]
    fn test_region_absent_when_no_mapped_value() {
        let map = mapper(r#"[{"source":1,"detector":1,"region":"R"}]"#);
        let rows = vec![
            row("T_1", (1, 1), "A", 1.0),
            row("T_2", (1, 1), "B", 2.0),
            row("T_2", (2, 2), "A", 9.0),
        ];
        let table = &build_region_tables(&rows, &[], &map)[0];
        assert_eq!(table.blocks, vec!["A", "B"]);
        assert_eq!(table.cell("T_1", "B"), Some(Cell::Absent));
        assert_eq!(table.cell("T_2", "A"), Some(Cell::Absent));
    }

    #[test]
    fn test_region_keeps_only_blocks_with_data_in_global_order() {
        let map = mapper(r#"[{"source":1,"detector":1,"region":"R"}]"#);
        let declared = names(&["Rest", "Stim", "Empty", "Recover"]);
        let rows = vec![
            row("T_1", (1, 1), "Recover", 1.0),
            row("T_1", (1, 1), "Rest", 2.0),
            row("T_1", (2, 2), "Stim", 3.0),
        ];
        let table = &build_region_tables(&rows, &declared, &map)[0];
        assert_eq!(table.blocks, vec!["Rest", "Recover"]);
    }

    #[test]
    fn test_region_uses_last_value_on_duplicate_key() {
        let map = mapper(r#"[{"source":1,"detector":1,"region":"R"}]"#);
        let rows = vec![row("T_1", (1, 1), "A", 1.0), row("T_1", (1, 1), "A", 5.0)];
        let table = &build_region_tables(&rows, &[], &map)[0];
        assert_eq!(table.cell("T_1", "A"), Some(Cell::Present(5.0)));
    }

    #[test]
    fn test_region_without_data_is_empty() {
        let map = mapper(r#"[{"source":7,"detector":7,"region":"Unused"}]"#);
        let rows = vec![row("T_1", (1, 1), "A", 1.0)];
        let table = &build_region_tables(&rows, &[], &map)[0];
        assert!(table.rows.is_empty());
        assert!(table.blocks.is_empty());
        assert_eq!(table.channel_count, 0);
    }

    #[test]
    fn test_empty_mapper_builds_no_region_tables() {
        let rows = vec![row("T_1", (1, 1), "A", 1.0)];
        assert!(build_region_tables(&rows, &[], &ChannelRegionMap::empty()).is_empty());
    }
}
