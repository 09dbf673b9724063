use crate::cli::ProcessArgs;
use crate::exit_codes;
use crate::output;
use crate::render::PngHeatmapRenderer;
use fnirs_blocks::export;
use fnirs_blocks::{
    run_batch, BatchOutput, ChannelRegionMap, FnirsError, HeatmapGrid, HeatmapRenderer,
    JsonRecordingSource, PipelineConfig, RegionSummary, RunReport, Warning,
};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Serialize)]
struct RunSummary<'a> {
    chromophore: String,
    attempted: usize,
    processed: usize,
    failed: usize,
    output_dir: String,
    regions: Vec<RegionSummary>,
    warnings: &'a [Warning],
}

pub fn execute(args: ProcessArgs) -> i32 {
    if !args.input_dir.is_dir() {
        eprintln!(
            "Error: Input directory not found: {}",
            args.input_dir.display()
        );
        return exit_codes::INPUT_ERROR;
    }
    if args.jobs == Some(0) {
        eprintln!("Error: --jobs must be at least 1");
        return exit_codes::INPUT_ERROR;
    }

    let mut report = RunReport::new();

    let mapper = match ChannelRegionMap::load(args.mapping.as_deref(), &mut report) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::INPUT_ERROR;
        }
    };

    let files = match resolve_files(&args.input_dir, &args.pattern) {
        Ok(f) => f,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    if !args.quiet {
        eprintln!(
            "Processing {} recording(s) from {} ({})",
            files.len(),
            args.input_dir.display(),
            args.chromophore
        );
    }

    let config = PipelineConfig {
        chromophore: args.chromophore,
        jobs: args.jobs,
    };
    let start_time = Instant::now();

    let batch = match run_batch(&JsonRecordingSource, &files, &mapper, &config, &mut report) {
        Ok(b) => b,
        Err(e @ FnirsError::NoRecordingsProcessed { .. }) => {
            print_summary(&report);
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    };

    if let Err(e) = write_tables(&batch, &args) {
        eprintln!("Error: {}", e);
        return exit_codes::EXECUTION_ERROR;
    }

    if !args.no_heatmaps && !batch.regions.is_empty() {
        let figures_dir = args.output.join("figures");
        if let Err(e) = std::fs::create_dir_all(&figures_dir) {
            eprintln!(
                "Error: Failed to create output directory '{}': {}",
                figures_dir.display(),
                e
            );
            return exit_codes::EXECUTION_ERROR;
        }
        let renderer = PngHeatmapRenderer::new(args.chromophore);
        render_heatmaps(&batch, &figures_dir, &renderer, &mut report);
    }

    if let Some(ref path) = args.summary_json {
        let summary = RunSummary {
            chromophore: args.chromophore.to_string(),
            attempted: report.attempted,
            processed: report.processed,
            failed: report.failed(),
            output_dir: args.output.display().to_string(),
            regions: batch.regions.iter().map(RegionSummary::from).collect(),
            warnings: report.warnings(),
        };
        let written = output::to_json(&summary)
            .and_then(|json| output::write_output(&json, Some(path.as_path())));
        if let Err(e) = written {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    }

    if !args.quiet {
        eprintln!(
            "Done in {:.2}s: {} table row(s), {} region(s) -> {}",
            start_time.elapsed().as_secs_f64(),
            batch.detailed.rows.len(),
            batch.regions.len(),
            args.output.display()
        );
    }
    print_summary(&report);

    exit_codes::SUCCESS
}

fn print_summary(report: &RunReport) {
    for line in report.summary_lines() {
        eprintln!("{}", line);
    }
}

/// Files matching `pattern` directly inside `dir`, sorted by path
fn resolve_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, String> {
    let full = dir.join(pattern);
    let full = full
        .to_str()
        .ok_or_else(|| format!("Non UTF-8 input path: {}", full.display()))?;
    let paths =
        glob::glob(full).map_err(|e| format!("Invalid glob pattern '{}': {}", pattern, e))?;

    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => {
                if path.is_file() {
                    files.push(path);
                }
            }
            Err(e) => log::warn!("Glob error: {}", e),
        }
    }
    files.sort();
    Ok(files)
}

fn create_file(path: &Path) -> Result<BufWriter<File>, String> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| format!("Failed to create '{}': {}", path.display(), e))
}

fn write_tables(batch: &BatchOutput, args: &ProcessArgs) -> Result<(), String> {
    let data_dir = args.output.join("data");
    std::fs::create_dir_all(&data_dir).map_err(|e| {
        format!(
            "Failed to create output directory '{}': {}",
            data_dir.display(),
            e
        )
    })?;

    let path = data_dir.join(export::detailed_file_name(args.chromophore));
    export::write_detailed_csv(&batch.detailed, create_file(&path)?)
        .map_err(|e| format!("Failed to write '{}': {}", path.display(), e))?;
    log::info!("Wrote {}", path.display());

    let path = data_dir.join(export::long_file_name(args.chromophore));
    export::write_long_csv(&batch.recordings, create_file(&path)?)
        .map_err(|e| format!("Failed to write '{}': {}", path.display(), e))?;
    log::info!("Wrote {}", path.display());

    for table in &batch.regions {
        let path = data_dir.join(export::region_file_name(args.chromophore, &table.region));
        export::write_region_csv(table, create_file(&path)?)
            .map_err(|e| format!("Failed to write '{}': {}", path.display(), e))?;
        log::info!("Wrote {}", path.display());
    }

    Ok(())
}

/// Render one heatmap per region. Failures are per-region warnings.
fn render_heatmaps<R: HeatmapRenderer>(
    batch: &BatchOutput,
    figures_dir: &Path,
    renderer: &R,
    report: &mut RunReport,
) -> usize {
    let mut rendered = 0;
    for table in &batch.regions {
        let grid = HeatmapGrid::from_table(table);
        let path = figures_dir.join(export::heatmap_file_name(&table.region));
        match renderer.render(&grid, &path) {
            Ok(()) => {
                log::info!("Wrote {}", path.display());
                rendered += 1;
            }
            Err(e) => report.warn(Warning::HeatmapFailed {
                region: table.region.clone(),
                reason: e.to_string(),
            }),
        }
    }
    rendered
}
