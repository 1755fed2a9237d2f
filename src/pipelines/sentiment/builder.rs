use std::path::PathBuf;
use std::sync::Arc;

use candle_core::Device;

use super::calibration::CalibrationConfig;
use super::lexicon::LexiconSets;
use super::model::SentimentOracle;
use super::pipeline::SentimentAnalysisPipeline;
use crate::error::Result;
use crate::loaders::{SentimentConfig, SentimentConfigLoader};
use crate::models::{ModernBertOracle, ModernBertSize};
use crate::pipelines::utils::DeviceRequest;

crate::pipelines::utils::impl_device_methods!(direct: SentimentAnalysisPipelineBuilder<O: SentimentOracle>);

type OracleLoader<O> = Box<dyn FnOnce(Device) -> Result<O> + Send>;

enum OracleSource<O> {
    Ready(O),
    Load(OracleLoader<O>),
}

/// Builder for creating [`SentimentAnalysisPipeline`] instances.
///
/// Use [`Self::modernbert`] for the bundled classifier or [`Self::with_oracle`]
/// to plug in any [`SentimentOracle`].
///
/// Settings resolve in this order: explicit builder calls, then
/// [`Self::config_file`], then built-in defaults.
///
/// # Examples
///
/// ```rust,no_run
/// # use candle_sentiment::sentiment::{SentimentAnalysisPipelineBuilder, ModernBertSize};
/// # fn main() -> candle_sentiment::error::Result<()> {
/// let pipeline = SentimentAnalysisPipelineBuilder::modernbert(ModernBertSize::Base)
///     .cuda(0)
///     .config_file("sentiment.json")
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct SentimentAnalysisPipelineBuilder<O: SentimentOracle> {
    source: OracleSource<O>,
    device_request: DeviceRequest,
    lexicon: Option<Arc<LexiconSets>>,
    calibration: Option<CalibrationConfig>,
    config_path: Option<PathBuf>,
}

impl SentimentAnalysisPipelineBuilder<ModernBertOracle> {
    /// Creates a builder for a ModernBERT sentiment classifier.
    ///
    /// The model is downloaded (or taken from the model cache) on [`Self::build`].
    pub fn modernbert(size: ModernBertSize) -> Self {
        Self::from_source(OracleSource::Load(Box::new(move |device| {
            ModernBertOracle::load(size, device)
        })))
    }
}

impl<O: SentimentOracle> SentimentAnalysisPipelineBuilder<O> {
    /// Creates a builder around an already constructed classifier.
    ///
    /// Device settings are ignored for a ready oracle.
    pub fn with_oracle(oracle: O) -> Self {
        Self::from_source(OracleSource::Ready(oracle))
    }

    fn from_source(source: OracleSource<O>) -> Self {
        Self {
            source,
            device_request: DeviceRequest::default(),
            lexicon: None,
            calibration: None,
            config_path: None,
        }
    }

    /// Use this lexicon instead of the built-in phrase lists.
    pub fn lexicon(mut self, lexicon: Arc<LexiconSets>) -> Self {
        self.lexicon = Some(lexicon);
        self
    }

    /// Use these calibration constants instead of the defaults.
    pub fn calibration(mut self, calibration: CalibrationConfig) -> Self {
        self.calibration = Some(calibration);
        self
    }

    /// Read lexicon and calibration overrides from a JSON file at build time.
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Builds the pipeline with configured settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file is unreadable or invalid, or if
    /// model loading or device initialization fails.
    pub fn build(self) -> Result<SentimentAnalysisPipeline<O>> {
        let file_config = match &self.config_path {
            Some(path) => Some(SentimentConfigLoader::new(path).load()?),
            None => None,
        };

        let lexicon = match (self.lexicon, &file_config) {
            (Some(lexicon), _) => lexicon,
            (None, Some(SentimentConfig { lexicon, .. })) => {
                Arc::new(LexiconSets::from_config(lexicon)?)
            }
            (None, None) => LexiconSets::shared_default()?,
        };

        let calibration = match (self.calibration, file_config) {
            (Some(calibration), _) => calibration,
            (None, Some(config)) => config.calibration,
            (None, None) => CalibrationConfig::default(),
        };
        calibration.validate()?;

        let oracle = match self.source {
            OracleSource::Ready(oracle) => oracle,
            OracleSource::Load(loader) => loader(self.device_request.resolve()?)?,
        };

        Ok(SentimentAnalysisPipeline {
            oracle,
            lexicon,
            calibration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipelines::sentiment::model::ScriptedOracle;
    use crate::pipelines::sentiment::types::ScorePair;

    fn oracle() -> ScriptedOracle {
        ScriptedOracle::new().with_default(ScorePair::new(0.6, 0.4).unwrap())
    }

    #[test]
    fn defaults_use_shared_lexicon() {
        let pipeline = SentimentAnalysisPipelineBuilder::with_oracle(oracle())
            .build()
            .unwrap();
        assert_eq!(pipeline.calibration(), &CalibrationConfig::default());
        assert_eq!(pipeline.lexicon().contrast_markers()[0].phrase(), "but");
    }

    #[test]
    fn invalid_calibration_fails_build() {
        let result = SentimentAnalysisPipelineBuilder::with_oracle(oracle())
            .calibration(CalibrationConfig {
                blend_cap: -1.0,
                ..Default::default()
            })
            .build();
        assert!(result.is_err());

        let result = SentimentAnalysisPipelineBuilder::with_oracle(oracle())
            .calibration(CalibrationConfig {
                max_cue_modifier: f64::NAN,
                ..Default::default()
            })
            .build();
        assert!(matches!(result, Err(crate::error::PipelineError::Config(_))));
    }

    #[test]
    fn explicit_settings_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut file,
            br#"{"lexicon": {"contrast_markers": ["except"]}, "calibration": {"blend_cap": 0.8}}"#,
        )
        .unwrap();

        let from_file = SentimentAnalysisPipelineBuilder::with_oracle(oracle())
            .config_file(file.path())
            .build()
            .unwrap();
        assert_eq!(from_file.lexicon().contrast_markers()[0].phrase(), "except");
        assert_eq!(from_file.calibration().blend_cap, 0.8);

        let overridden = SentimentAnalysisPipelineBuilder::with_oracle(oracle())
            .config_file(file.path())
            .calibration(CalibrationConfig::default())
            .lexicon(LexiconSets::shared_default().unwrap())
            .build()
            .unwrap();
        assert_eq!(overridden.calibration().blend_cap, 0.85);
        assert_eq!(overridden.lexicon().contrast_markers()[0].phrase(), "but");
    }

    #[test]
    fn ready_oracle_ignores_device_request() {
        let pipeline = SentimentAnalysisPipelineBuilder::with_oracle(oracle())
            .cuda(7)
            .build();
        assert!(pipeline.is_ok());
    }
}
