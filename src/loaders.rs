//! Loading utilities: HuggingFace Hub files, tokenizers and the JSON config file.
//!
//! - [`HfLoader`] - Generic Hugging Face file loader with retry logic
//! - [`TokenizerLoader`] - Loads tokenizers from Hugging Face repositories
//! - [`SentimentConfigLoader`] - Loads lexicon and calibration overrides from disk
//!
//! Hub downloads retry on lock acquisition failures, which happen when several
//! processes fetch the same file into a shared cache.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tokenizers::Tokenizer;
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};
use crate::pipelines::sentiment::calibration::CalibrationConfig;
use crate::pipelines::sentiment::lexicon::LexiconConfig;

const MAX_DOWNLOAD_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct HfLoader {
    pub repo: String,
    pub filename: String,
}

impl HfLoader {
    pub fn new(repo: &str, filename: &str) -> Self {
        Self {
            repo: repo.into(),
            filename: filename.into(),
        }
    }

    pub fn load(&self) -> Result<PathBuf> {
        let hf_api = hf_hub::api::sync::ApiBuilder::new()
            .with_progress(false)
            .build()
            .map_err(|e| {
                PipelineError::Download(format!("Failed to initialize HuggingFace API: {e}"))
            })?;
        let hf_api = hf_api.model(self.repo.clone());

        let mut attempts = 0u32;

        for attempt in 0..MAX_DOWNLOAD_ATTEMPTS {
            attempts = attempt + 1;
            match hf_api.get(self.filename.as_str()) {
                Ok(path) => {
                    debug!(repo = %self.repo, file = %self.filename, "resolved hub file");
                    return Ok(path);
                }
                Err(e) => {
                    let error_msg = e.to_string();
                    if error_msg.contains("Lock acquisition failed")
                        && attempt < MAX_DOWNLOAD_ATTEMPTS - 1
                    {
                        let wait_time = Duration::from_millis(100 * (1 << attempt));
                        warn!(
                            repo = %self.repo,
                            file = %self.filename,
                            ?wait_time,
                            "hub cache locked, retrying"
                        );
                        std::thread::sleep(wait_time);
                        continue;
                    }
                    return Err(PipelineError::Download(format!(
                        "Failed to download '{}' from '{}': {}",
                        self.filename, self.repo, error_msg
                    )));
                }
            }
        }

        Err(PipelineError::Download(format!(
            "Download timed out for '{}' from '{}' after {} attempt(s)",
            self.filename, self.repo, attempts
        )))
    }

    /// Try each filename in order, returning the first that downloads.
    pub fn load_first(repo: &str, filenames: &[&str]) -> Result<PathBuf> {
        let mut last_error = None;
        for filename in filenames {
            match HfLoader::new(repo, filename).load() {
                Ok(path) => return Ok(path),
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or_else(|| {
            PipelineError::Unexpected(format!("No candidate files given for '{repo}'"))
        }))
    }
}

#[derive(Clone)]
pub struct TokenizerLoader {
    pub tokenizer_file_loader: HfLoader,
}

impl TokenizerLoader {
    pub fn new(repo: &str, filename: &str) -> Self {
        let tokenizer_file_loader = HfLoader::new(repo, filename);

        Self {
            tokenizer_file_loader,
        }
    }

    pub fn load(&self) -> Result<Tokenizer> {
        let tokenizer_file_path = self.tokenizer_file_loader.load()?;
        let path_str = tokenizer_file_path.display().to_string();

        let tokenizer = Tokenizer::from_file(&tokenizer_file_path).map_err(|e| {
            PipelineError::Tokenization(format!(
                "Failed to load tokenizer from '{}': {}",
                path_str, e
            ))
        })?;

        Ok(tokenizer)
    }
}

/// Optional overrides read from a JSON file.
///
/// ```json
/// {
///   "lexicon": { "contrast_markers": ["but", "however"] },
///   "calibration": { "mixed_neutral_override_diff": 0.1 }
/// }
/// ```
///
/// Every section and field may be omitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SentimentConfig {
    /// Phrase list overrides.
    pub lexicon: LexiconConfig,
    /// Calibration constant overrides.
    pub calibration: CalibrationConfig,
}

pub struct SentimentConfigLoader {
    pub path: PathBuf,
}

impl SentimentConfigLoader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self) -> Result<SentimentConfig> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            PipelineError::Config(format!(
                "Failed to read config '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        let config: SentimentConfig = serde_json::from_str(&content).map_err(|e| {
            PipelineError::Config(format!(
                "Invalid config '{}': {}",
                self.path.display(),
                e
            ))
        })?;
        config.calibration.validate()?;

        debug!(path = %self.path.display(), "loaded sentiment config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_partial_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"lexicon": {{"intensifiers": ["super"]}}, "calibration": {{"blend_cap": 0.8}}}}"#
        )
        .unwrap();

        let config = SentimentConfigLoader::new(file.path()).load().unwrap();
        assert_eq!(config.lexicon.intensifiers, Some(vec!["super".to_string()]));
        assert!(config.lexicon.contrast_markers.is_none());
        assert_eq!(config.calibration.blend_cap, 0.8);
        assert_eq!(config.calibration.after_weight, 0.6);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"calibration": {{"blend_kap": 0.8}}}}"#).unwrap();

        let err = SentimentConfigLoader::new(file.path()).load().unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn invalid_calibration_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"calibration": {{"min_confidence": 0.9, "max_confidence": 0.4}}}}"#
        )
        .unwrap();

        assert!(SentimentConfigLoader::new(file.path()).load().is_err());
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = SentimentConfigLoader::new("/nonexistent/sentiment.json")
            .load()
            .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }
}
