//! Block averaging: one scalar per (channel, block).

use crate::types::{BlockAverageRow, BlockInterval, ChannelSeries, RecordingMetadata};

/// Mean, spread and size of the samples inside one window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub mean: f64,
    pub std: f64,
    pub n_samples: usize,
}

/// Statistics over samples with `start <= t < end`.
///
/// `times` must be non-decreasing. Returns `None` for an empty window so
/// the caller can leave the cell absent instead of writing a zero.
pub fn window_stats(times: &[f64], values: &[f64], start: f64, end: f64) -> Option<WindowStats> {
    let lo = times.partition_point(|&t| t < start);
    let hi = times.partition_point(|&t| t < end);
    if hi <= lo {
        return None;
    }

    let window = &values[lo..hi];
    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some(WindowStats {
        mean,
        std: variance.sqrt(),
        n_samples: window.len(),
    })
}

/// Reduce every block of one recording to one row per channel.
///
/// Intervals that share a name are folded into a single row whose value is
/// the mean of the per-interval means. Rows come out channel-major, blocks in
/// first-seen order. Channel/block pairs whose windows are all empty produce
/// no row.
pub fn extract_block_averages(
    metadata: &RecordingMetadata,
    series: &ChannelSeries,
    blocks: &[BlockInterval],
) -> Vec<BlockAverageRow> {
    let grouped = group_by_name(blocks);
    let times = series.times();
    let mut rows = Vec::with_capacity(series.channels().len() * grouped.len());

    for trace in series.channels() {
        for (name, intervals) in &grouped {
            let stats: Vec<(WindowStats, f64)> = intervals
                .iter()
                .filter_map(|b| {
                    window_stats(times, &trace.values, b.start, b.end).map(|s| (s, b.duration()))
                })
                .collect();

            if stats.is_empty() {
                log::trace!(
                    "{} {} block '{}': no samples in window",
                    metadata.trial_name,
                    trace.channel,
                    name
                );
                continue;
            }

            let k = stats.len() as f64;
            rows.push(BlockAverageRow {
                trial_name: metadata.trial_name.clone(),
                channel: trace.channel,
                block_name: (*name).to_string(),
                value: stats.iter().map(|(s, _)| s.mean).sum::<f64>() / k,
                std: stats.iter().map(|(s, _)| s.std).sum::<f64>() / k,
                n_samples: stats.iter().map(|(s, _)| s.n_samples).sum(),
                duration_s: stats.iter().map(|(_, d)| d).sum(),
            });
        }
    }

    rows
}

fn group_by_name(blocks: &[BlockInterval]) -> Vec<(&str, Vec<&BlockInterval>)> {
    let mut grouped: Vec<(&str, Vec<&BlockInterval>)> = Vec::new();
    for block in blocks {
        match grouped.iter_mut().find(|(name, _)| *name == block.name) {
            Some((_, intervals)) => intervals.push(block),
            None => grouped.push((block.name.as_str(), vec![block])),
        }
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChannelId, ChannelTrace, Chromophore};

    fn metadata() -> RecordingMetadata {
        RecordingMetadata {
            trial_name: "MRSA_1".to_string(),
            treatment: "MRSA".to_string(),
            participant_id: "1".to_string(),
        }
    }

    /// 1 Hz, samples at t = 0..10
    fn series() -> ChannelSeries {
        let times: Vec<f64> = (0..10).map(f64::from).collect();
        ChannelSeries::new(
            Chromophore::HbO,
            times.clone(),
            vec![
                ChannelTrace {
                    channel: ChannelId::new(1, 1),
                    values: times.clone(),
                },
                ChannelTrace {
                    channel: ChannelId::new(1, 2),
                    values: vec![2.0; 10],
                },
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_window_is_half_open() {
        let times = [0.0, 1.0, 2.0, 3.0];
        let values = [10.0, 20.0, 30.0, 40.0];
        let stats = window_stats(&times, &values, 1.0, 3.0).unwrap();
        assert_eq!(stats.n_samples, 2);
        assert_eq!(stats.mean, 25.0);
        assert_eq!(stats.std, 5.0);
    }

    #[test]
    fn test_empty_window_is_none() {
        let times = [0.0, 1.0, 2.0];
        let values = [1.0, 1.0, 1.0];
        assert!(window_stats(&times, &values, 0.2, 0.8).is_none());
        assert!(window_stats(&times, &values, 5.0, 9.0).is_none());
        assert!(window_stats(&times, &values, 2.0, 2.0).is_none());
    }

    #[test]
    fn test_rows_per_channel_and_block() {
        let blocks = vec![BlockInterval::new("A", 0.0, 5.0), BlockInterval::new("B", 5.0, 10.0)];
        let rows = extract_block_averages(&metadata(), &series(), &blocks);

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].channel, ChannelId::new(1, 1));
        assert_eq!(rows[0].block_name, "A");
        assert_eq!(rows[0].value, 2.0);
        assert_eq!(rows[1].block_name, "B");
        assert_eq!(rows[1].value, 7.0);
        assert_eq!(rows[1].n_samples, 5);
        assert_eq!(rows[1].duration_s, 5.0);
        assert_eq!(rows[2].channel, ChannelId::new(1, 2));
        assert_eq!(rows[2].value, 2.0);
        assert_eq!(rows[2].std, 0.0);
        assert!(rows.iter().all(|r| r.trial_name == "MRSA_1"));
    }

    #[test]
    fn test_empty_block_produces_no_row() {
        let blocks = vec![
            BlockInterval::new("A", 0.0, 5.0),
            BlockInterval::new("Short", 5.2, 5.8),
            BlockInterval::new("After", 20.0, 30.0),
        ];
        let rows = extract_block_averages(&metadata(), &series(), &blocks);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.block_name == "A"));
    }

    #[test]
    fn test_repeated_block_names_average_interval_means() {
        let blocks = vec![
            BlockInterval::new("Stim", 0.0, 2.0),
            BlockInterval::new("Rest", 2.0, 4.0),
            BlockInterval::new("Stim", 4.0, 10.0),
        ];
        let rows = extract_block_averages(&metadata(), &series(), &blocks);
        let stim = rows
            .iter()
            .find(|r| r.channel == ChannelId::new(1, 1) && r.block_name == "Stim")
            .unwrap();
        // interval means 0.5 and 6.5
        assert_eq!(stim.value, 3.5);
        assert_eq!(stim.n_samples, 8);
        assert_eq!(stim.duration_s, 8.0);
        let names: Vec<&str> = rows[..2].iter().map(|r| r.block_name.as_str()).collect();
        assert_eq!(names, vec!["Stim", "Rest"]);
    }
}
