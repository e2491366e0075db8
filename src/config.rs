//! Configuration file loading for the engine parameters.

use crate::engine::InferenceParams;
use std::fs;
use std::path::Path;

/// Read and validate [`InferenceParams`] from a JSON file.
pub fn load_params(path: &Path) -> Result<InferenceParams, String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    let params: InferenceParams = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))?;
    params.validate().map_err(|e| e.to_string())?;
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let params: InferenceParams = serde_json::from_str(
            r#"{
                "input_patch_size": [10, 128, 128],
                "output_patch_overlap": [2, 32, 32],
                "num_output_channels": 1,
                "bump": "hann"
            }"#,
        )
        .unwrap();
        params.validate().unwrap();
        assert_eq!(params.input_patch_size, [10, 128, 128]);
        assert_eq!(params.batch_size, 1);
        assert_eq!(params.bump, crate::bump::BumpKind::Hann);
        assert!(!params.mask_output_chunk);
    }

    #[test]
    fn unknown_bump_name_fails_to_parse() {
        let parsed: std::result::Result<InferenceParams, _> =
            serde_json::from_str(r#"{"bump": "zung"}"#);
        assert!(parsed.is_err());
    }
}
