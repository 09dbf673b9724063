use crate::cli::ValidateArgs;
use crate::exit_codes;
use crate::output;
use fnirs_blocks::{
    parse_trial_identity, Chromophore, JsonRecordingSource, RecordingMetadata, RecordingSource,
};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize, Default)]
struct ValidateOutput {
    file: String,
    exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    identity: Option<RecordingMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sampling_rate_hz: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_s: Option<f64>,
    chromophore: String,
    channels: usize,
    blocks: Vec<String>,
    error: Option<String>,
}

pub fn execute(args: ValidateArgs) -> i32 {
    let mut result = ValidateOutput {
        file: args.file.display().to_string(),
        exists: args.file.is_file(),
        chromophore: args.chromophore.to_string(),
        ..Default::default()
    };

    if result.exists {
        if let Err(e) = inspect(&args.file, args.chromophore, &mut result) {
            result.error = Some(e);
        }
    } else {
        result.error = Some(format!("File not found: {}", result.file));
    }

    if args.json {
        let code = output::print_json(&result);
        if code != exit_codes::SUCCESS {
            return code;
        }
    } else if let Some(ref err) = result.error {
        eprintln!("Error: {}", err);
    } else {
        println!(
            "File '{}' is valid: {} {} channel(s), {} block(s) [{}]",
            result.file,
            result.channels,
            result.chromophore,
            result.blocks.len(),
            result.blocks.join(", ")
        );
    }

    if result.error.is_some() {
        exit_codes::INPUT_ERROR
    } else {
        exit_codes::SUCCESS
    }
}

/// Run the same checks a batch applies to one recording, filling `out` as far as they get
fn inspect(path: &Path, chromophore: Chromophore, out: &mut ValidateOutput) -> Result<(), String> {
    out.identity = Some(parse_trial_identity(path).map_err(|e| e.to_string())?);

    let recording = JsonRecordingSource.load(path).map_err(|e| e.to_string())?;
    out.sampling_rate_hz = Some(recording.sfreq);
    out.duration_s = Some(recording.n_samples() as f64 / recording.sfreq);

    let series = recording.channel_series(chromophore)?;
    out.channels = series.channels().len();

    for block in recording.block_definition() {
        if !out.blocks.contains(&block.name) {
            out.blocks.push(block.name);
        }
    }

    if out.channels == 0 {
        return Err(format!("no {} channels", chromophore));
    }
    Ok(())
}
