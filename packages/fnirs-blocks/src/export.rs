//! CSV serialization of the tables and output file naming.
//!
//! Absent cells are written as empty fields.

use crate::error::Result;
use crate::mapping::region_slug;
use crate::pipeline::ProcessedRecording;
use crate::pivot::{DetailedPivotTable, RegionPivotTable};
use crate::types::{Cell, Chromophore};
use std::io::Write;

pub fn detailed_file_name(chromophore: Chromophore) -> String {
    format!("{}_averages_detailed_pivot.csv", chromophore.suffix())
}

pub fn region_file_name(chromophore: Chromophore, region: &str) -> String {
    format!("{}_region_{}.csv", chromophore.suffix(), region_slug(region))
}

pub fn long_file_name(chromophore: Chromophore) -> String {
    format!("{}_block_averages_long.csv", chromophore.suffix())
}

pub fn heatmap_file_name(region: &str) -> String {
    format!("heatmap_{}.png", region_slug(region))
}

fn format_cell(cell: &Cell) -> String {
    match cell {
        Cell::Present(v) => v.to_string(),
        Cell::Absent => String::new(),
    }
}

/// `trial,channel,<block...>`
pub fn write_detailed_csv<W: Write>(table: &DetailedPivotTable, writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);

    let mut header = vec!["trial".to_string(), "channel".to_string()];
    header.extend(table.blocks.iter().cloned());
    csv.write_record(&header)?;

    for row in &table.rows {
        let mut record = vec![row.trial.clone(), row.channel.to_string()];
        record.extend(row.cells.iter().map(format_cell));
        csv.write_record(&record)?;
    }

    csv.flush()?;
    Ok(())
}

/// `trial,<block...>`
pub fn write_region_csv<W: Write>(table: &RegionPivotTable, writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);

    let mut header = vec!["trial".to_string()];
    header.extend(table.blocks.iter().cloned());
    csv.write_record(&header)?;

    for row in &table.rows {
        let mut record = vec![row.trial.clone()];
        record.extend(row.cells.iter().map(format_cell));
        csv.write_record(&record)?;
    }

    csv.flush()?;
    Ok(())
}

/// One line per block average with its supporting statistics
pub fn write_long_csv<W: Write>(recordings: &[ProcessedRecording], writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record([
        "trial",
        "treatment",
        "participant",
        "channel",
        "block",
        "mean",
        "std",
        "n_samples",
        "duration_s",
    ])?;

    for recording in recordings {
        let meta = &recording.metadata;
        for row in &recording.rows {
            csv.write_record([
                row.trial_name.clone(),
                meta.treatment.clone(),
                meta.participant_id.clone(),
                row.channel.to_string(),
                row.block_name.clone(),
                row.value.to_string(),
                row.std.to_string(),
                row.n_samples.to_string(),
                row.duration_s.to_string(),
            ])?;
        }
    }

    csv.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pivot::{DetailedRow, RegionRow};
    use crate::types::ChannelId;

    #[test]
    fn test_file_names() {
        assert_eq!(
            detailed_file_name(Chromophore::HbO),
            "hbo_averages_detailed_pivot.csv"
        );
        assert_eq!(
            region_file_name(Chromophore::HbO, "Left PFC"),
            "hbo_region_left_pfc.csv"
        );
        assert_eq!(region_file_name(Chromophore::HbR, "RegionX"), "hbr_region_regionx.csv");
        assert_eq!(heatmap_file_name("Left PFC"), "heatmap_left_pfc.png");
    }

    #[test]
    fn test_detailed_csv_leaves_absent_empty() {
        let table = DetailedPivotTable {
            blocks: vec!["Stim".to_string(), "Base".to_string()],
            rows: vec![DetailedRow {
                trial: "MRSA_1".to_string(),
                channel: ChannelId::new(1, 2),
                cells: vec![Cell::Absent, Cell::Present(0.0)],
            }],
        };
        let mut buf = Vec::new();
        write_detailed_csv(&table, &mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "trial,channel,Stim,Base\nMRSA_1,S1_D2,,0\n"
        );
    }

    #[test]
    fn test_region_csv() {
        let table = RegionPivotTable {
            region: "RegionX".to_string(),
            blocks: vec!["A".to_string()],
            rows: vec![RegionRow {
                trial: "N_2".to_string(),
                cells: vec![Cell::Present(-0.25)],
            }],
            channel_count: 1,
        };
        let mut buf = Vec::new();
        write_region_csv(&table, &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "trial,A\nN_2,-0.25\n");
    }
}
