use super::strategy::{ClassicStrategy, RecursiveStrategy, ScanStrategy};
use crate::config::{ScanConfig, ScanMode};
use crate::error::{ConfigError, ConfigResult};
use crate::filters::FilterSet;
use crate::wordlist::{CandidateSet, PermutationRequest, Pipeline, load_wordlist};
use burrow_scanner::RequestOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// A validated, fully parsed configuration ready to be scheduled.
///
/// Compiling a plan is where every grammar error surfaces, so nothing
/// reaches the network with a bad filter, range or transform.
#[derive(Debug, Clone)]
pub struct ScanPlan {
    pub config: ScanConfig,
    /// Raw words, before the wordlist pipeline
    pub words: Vec<String>,
    pub filters: FilterSet,
    pub candidates: CandidateSet,
    pub strategy: Arc<dyn ScanStrategy>,
}

impl ScanPlan {
    /// Reads every configured wordlist and compiles the plan
    pub fn from_config(config: ScanConfig) -> ConfigResult<Self> {
        if config.wordlists.is_empty() {
            return Err(ConfigError::Validation(
                "at least one wordlist is required".to_string(),
            ));
        }

        let mut words = Vec::new();
        for path in &config.wordlists {
            let loaded = load_wordlist(path)?;
            debug!("Loaded {} words from {}", loaded.len(), path.display());
            words.extend(loaded);
        }

        Self::compile(config, words)
    }

    pub fn compile(config: ScanConfig, words: Vec<String>) -> ConfigResult<Self> {
        config.validate()?;

        let filters = FilterSet::parse(&config.filters, config.filter_mode)?;
        let pipeline = Pipeline::parse(&config.wordlist_filters, &config.transforms)?
            .with_unique(config.unique);

        let mode = config.mode.resolve(&config.url, &config.placeholder);
        let placeholders = config.url.matches(config.placeholder.as_str()).count();

        let (candidates, strategy): (CandidateSet, Arc<dyn ScanStrategy>) = match mode {
            ScanMode::Classic => {
                let request =
                    PermutationRequest::new(config.url.as_str(), config.placeholder.as_str())?;
                let arity = if config.permutations {
                    if request.arity() < 2 {
                        return Err(ConfigError::PlaceholderMismatch {
                            placeholder: config.placeholder.clone(),
                            found: request.arity(),
                            reason: "permutation mode needs at least two".to_string(),
                        });
                    }
                    request.arity()
                } else {
                    1
                };

                let candidates = pipeline.candidates(&words, arity);
                if arity > candidates.pool().len() {
                    return Err(ConfigError::PlaceholderMismatch {
                        placeholder: config.placeholder.clone(),
                        found: arity,
                        reason: format!(
                            "but only {} word(s) survive the wordlist pipeline",
                            candidates.pool().len()
                        ),
                    });
                }
                let strategy = ClassicStrategy::new(request, config.max_depth);
                (candidates, Arc::new(strategy))
            }
            _ => {
                if config.permutations {
                    return Err(ConfigError::PlaceholderMismatch {
                        placeholder: config.placeholder.clone(),
                        found: placeholders,
                        reason: "permutation mode needs classic scanning with at least two"
                            .to_string(),
                    });
                }
                let base = Url::parse(&config.url).map_err(|e| ConfigError::InvalidUrl {
                    url: config.url.clone(),
                    reason: e.to_string(),
                })?;
                (
                    pipeline.candidates(&words, 1),
                    Arc::new(RecursiveStrategy::new(base, config.max_depth)),
                )
            }
        };

        if candidates.pool().is_empty() {
            return Err(ConfigError::Validation(
                "no words left after the wordlist filters".to_string(),
            ));
        }

        info!(
            "Compiled {} scan: {} candidate(s), {} filter clause(s), {} worker(s)",
            strategy.name(),
            candidates.len(),
            filters.clauses().len(),
            config.threads
        );

        Ok(Self {
            config,
            words,
            filters,
            candidates,
            strategy,
        })
    }

    pub fn threads(&self) -> usize {
        self.config.threads.max(1)
    }

    pub fn throttle(&self) -> u32 {
        self.config.throttle
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.config.grace_period_ms)
    }

    /// Request options for the HTTP requester; bodies are only retained
    /// when a filter or the report needs them
    pub fn request_options(&self) -> ConfigResult<RequestOptions> {
        self.config.request_options(self.filters.needs_body())
    }
}
