use std::collections::HashMap;
use std::sync::Arc;

use candle_core::{DType, Device, Tensor, D};
use candle_nn::{ops::softmax, VarBuilder};
use candle_transformers::models::modernbert::{
    ClassifierConfig, ClassifierPooling, Config,
    ModernBertForSequenceClassification as CandleModernBertForSequenceClassification,
};
use serde::Deserialize;
use tokenizers::Tokenizer;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::loaders::{HfLoader, TokenizerLoader};
use crate::pipelines::cache::{global_cache, ModelOptions};
use crate::pipelines::sentiment::model::SentimentOracle;
use crate::pipelines::sentiment::types::ScorePair;
use crate::pipelines::utils::build_cache_key;

/// Available ModernBERT model sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModernBertSize {
    /// Base model (~150M parameters).
    Base,
    /// Large model (~400M parameters).
    Large,
}

impl ModernBertSize {
    fn repo_id(&self) -> &'static str {
        match self {
            ModernBertSize::Base => "clapAI/modernBERT-base-multilingual-sentiment",
            ModernBertSize::Large => "clapAI/modernBERT-large-multilingual-sentiment",
        }
    }
}

impl std::fmt::Display for ModernBertSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ModernBertSize::Base => "modernbert-base",
            ModernBertSize::Large => "modernbert-large",
        };
        write!(f, "{name}")
    }
}

impl ModelOptions for ModernBertSize {
    fn cache_key(&self) -> String {
        format!("sentiment-{self}")
    }
}

/// ModernBERT sequence classifier reduced to its positive and negative outputs.
#[derive(Clone)]
pub struct SentimentModernBertModel {
    model: CandleModernBertForSequenceClassification,
    device: Device,
    positive_id: usize,
    negative_id: usize,
}

impl SentimentModernBertModel {
    pub fn new(size: ModernBertSize, device: Device) -> Result<Self> {
        let (config, vb, id2label) = load_classifier_model(size.repo_id(), &device)?;
        let positive_id = find_label(&id2label, "pos")?;
        let negative_id = find_label(&id2label, "neg")?;
        let model = CandleModernBertForSequenceClassification::load(vb, &config)?;

        debug!(%size, positive_id, negative_id, "loaded ModernBERT sentiment head");
        Ok(Self {
            model,
            device,
            positive_id,
            negative_id,
        })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Softmax over the classifier head, keeping only the positive and negative entries.
    ///
    /// Heads with a neutral class leave the two scores summing to less than 1.
    pub fn predict_scores(&self, tokenizer: &Tokenizer, text: &str) -> Result<ScorePair> {
        let tokens = tokenizer.encode(text, true).map_err(|e| {
            PipelineError::Tokenization(format!(
                "Tokenization failed on '{}': {}",
                &text.chars().take(50).collect::<String>(),
                e
            ))
        })?;

        let input_ids = Tensor::new(tokens.get_ids(), &self.device)?.unsqueeze(0)?;
        let attention_mask =
            Tensor::new(tokens.get_attention_mask(), &self.device)?.unsqueeze(0)?;

        let logits = self.model.forward(&input_ids, &attention_mask)?;
        let probs = softmax(&logits, D::Minus1)?;
        let probs_vec = probs.squeeze(0)?.to_vec1::<f32>()?;

        let score = |id: usize| -> Result<f64> {
            probs_vec.get(id).map(|p| f64::from(*p)).ok_or_else(|| {
                PipelineError::Inference(format!(
                    "Classifier returned {} scores, label id {} missing",
                    probs_vec.len(),
                    id
                ))
            })
        };

        ScorePair::new(score(self.positive_id)?, score(self.negative_id)?)
    }
}

/// The ModernBERT classifier wired up as a [`SentimentOracle`].
///
/// Weights are shared through the process-wide model cache, so building
/// several oracles for the same size and device loads the model once.
#[derive(Clone)]
pub struct ModernBertOracle {
    model: Arc<SentimentModernBertModel>,
    tokenizer: Tokenizer,
}

impl ModernBertOracle {
    /// Download (or reuse) the model and tokenizer for `size` on `device`.
    pub fn load(size: ModernBertSize, device: Device) -> Result<Self> {
        let key = build_cache_key(&size, &device);
        let model = global_cache().get_or_create(&key, || {
            SentimentModernBertModel::new(size, device.clone())
        })?;
        let tokenizer = TokenizerLoader::new(size.repo_id(), "tokenizer.json").load()?;

        Ok(Self { model, tokenizer })
    }

    /// Returns the device (CPU/GPU) the model is running on.
    pub fn device(&self) -> &Device {
        self.model.device()
    }
}

impl SentimentOracle for ModernBertOracle {
    fn classify(&self, segment: &str) -> Result<ScorePair> {
        self.model
            .predict_scores(&self.tokenizer, segment)
            .map_err(|e| match e {
                PipelineError::Inference(_) => e,
                other => PipelineError::Inference(format!("ModernBERT inference failed: {other}")),
            })
    }
}

fn find_label(id2label: &HashMap<String, String>, prefix: &str) -> Result<usize> {
    id2label
        .iter()
        .find(|(_, label)| label.to_lowercase().starts_with(prefix))
        .ok_or_else(|| {
            let available: Vec<&str> = id2label.values().map(String::as_str).collect();
            PipelineError::Config(format!(
                "Classifier has no '{prefix}*' label. Available: {}",
                available.join(", ")
            ))
        })?
        .0
        .parse::<usize>()
        .map_err(|e| PipelineError::Config(format!("Invalid label id in id2label: {e}")))
}

#[derive(Deserialize)]
struct ClassifierConfigJson {
    #[serde(default)]
    id2label: HashMap<String, String>,
    #[serde(default)]
    label2id: HashMap<String, u32>,
}

fn patch_config_num_labels(config: &mut Config, id2label: &HashMap<String, String>) {
    let current = config
        .classifier_config
        .as_ref()
        .map(|c| c.id2label.len())
        .unwrap_or(0);
    if current == id2label.len() {
        return;
    }

    let label2id: HashMap<String, String> = id2label
        .iter()
        .map(|(k, v)| (v.clone(), k.clone()))
        .collect();

    config.classifier_config = Some(ClassifierConfig {
        id2label: id2label.clone(),
        label2id,
        classifier_pooling: ClassifierPooling::default(),
    });
}

fn load_classifier_model(
    repo_id: &str,
    device: &Device,
) -> Result<(Config, VarBuilder<'static>, HashMap<String, String>)> {
    let config_path = HfLoader::new(repo_id, "config.json").load()?;
    let weights_path = HfLoader::load_first(repo_id, &["model.safetensors", "pytorch_model.bin"])?;

    let config_str = std::fs::read_to_string(&config_path)?;
    let mut config: Config = serde_json::from_str(&config_str)?;
    let class_cfg: ClassifierConfigJson = serde_json::from_str(&config_str)?;

    let id2label = if class_cfg.id2label.is_empty() {
        class_cfg
            .label2id
            .into_iter()
            .map(|(label, id)| (id.to_string(), label))
            .collect()
    } else {
        class_cfg.id2label
    };
    patch_config_num_labels(&mut config, &id2label);

    let vb = if weights_path.extension().is_some_and(|e| e == "safetensors") {
        unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device)? }
    } else {
        VarBuilder::from_pth(&weights_path, DType::F32, device)?
    };

    Ok((config, vb, id2label))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn finds_labels_case_insensitively() {
        let id2label = labels(&[("0", "negative"), ("1", "neutral"), ("2", "POSITIVE")]);
        assert_eq!(find_label(&id2label, "pos").unwrap(), 2);
        assert_eq!(find_label(&id2label, "neg").unwrap(), 0);
    }

    #[test]
    fn missing_label_is_config_error() {
        let id2label = labels(&[("0", "LABEL_0"), ("1", "LABEL_1")]);
        let err = find_label(&id2label, "pos").unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn cache_key_names_the_task() {
        assert_eq!(ModernBertSize::Base.cache_key(), "sentiment-modernbert-base");
        assert_eq!(ModernBertSize::Large.to_string(), "modernbert-large");
    }
}
