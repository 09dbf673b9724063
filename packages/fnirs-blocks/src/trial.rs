use crate::error::{FnirsError, Result};
use crate::types::RecordingMetadata;
use std::path::Path;

/// Parse trial identity from a `YYYYMMDD_TREATMENT_ID.<ext>` file name.
///
/// Directory components and the extension are ignored. Segments after the
/// third are ignored as well, so `20250624_MRSA_1_run2.json` still yields
/// trial `MRSA_1`.
pub fn parse_trial_identity<P: AsRef<Path>>(file: P) -> Result<RecordingMetadata> {
    let path = file.as_ref();
    let display = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| FnirsError::MalformedFileName(display.clone()))?;

    let segments: Vec<&str> = stem.split('_').collect();
    if segments.len() < 3 || segments[1].is_empty() || segments[2].is_empty() {
        return Err(FnirsError::MalformedFileName(display));
    }

    let treatment = segments[1].to_string();
    let participant_id = segments[2].to_string();
    Ok(RecordingMetadata {
        trial_name: format!("{}_{}", treatment, participant_id),
        treatment,
        participant_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_standard_name() {
        let meta = parse_trial_identity("20250624_MRSA_1.json").unwrap();
        assert_eq!(meta.trial_name, "MRSA_1");
        assert_eq!(meta.treatment, "MRSA");
        assert_eq!(meta.participant_id, "1");
    }

    #[test]
    fn test_parse_ignores_directories_and_extra_segments() {
        let meta = parse_trial_identity("/data/raw/20250625_N_2_rerun.snirf").unwrap();
        assert_eq!(meta.trial_name, "N_2");
    }

    #[test]
    fn test_parse_without_extension() {
        let meta = parse_trial_identity("20250625_N_2").unwrap();
        assert_eq!(meta.participant_id, "2");
    }

    #[test]
    fn test_malformed_names() {
        for name in ["recording.json", "20250624_MRSA.json", "20250624__1.json", "20250624_MRSA_.json"] {
            match parse_trial_identity(name) {
                Err(FnirsError::MalformedFileName(file)) => assert_eq!(file, name),
                other => panic!("expected MalformedFileName for {}, got {:?}", name, other),
            }
        }
    }
}
