//! Built-in `lda` kind: a small deterministic topic model.
//!
//! Training runs a collapsed, greedy variant of latent Dirichlet
//! allocation: every token starts on a topic derived from its position and
//! is then repeatedly moved to the topic with the highest unnormalised
//! posterior until assignments stop changing. No randomness is involved,
//! so identical inputs always produce identical topics.

use std::any::Any;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::capability::{
    optional_arg, required_arg, CapabilityObject, CapabilitySet, GenericRequest,
};
use super::error::{CapabilityError, ModelError};
use super::kinds::ModelFactory;

pub const KIND: &str = "lda";

const DEFAULT_TOP_WORDS: usize = 10;

/// Upper bound on `numTopics`. Topic tables are allocated eagerly.
pub const MAX_TOPICS: usize = 1_000;

/// Upper bound on `maxIterations`. Training holds the record lock throughout.
pub const MAX_ITERATIONS: usize = 10_000;

/// Kind-level parameters of an LDA model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LdaParameters {
    #[serde(default = "default_num_topics")]
    pub num_topics: usize,
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    #[serde(default = "default_beta")]
    pub beta: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

fn default_num_topics() -> usize {
    10
}

fn default_alpha() -> f64 {
    0.1
}

fn default_beta() -> f64 {
    0.01
}

fn default_max_iterations() -> usize {
    50
}

impl Default for LdaParameters {
    fn default() -> Self {
        Self {
            num_topics: default_num_topics(),
            alpha: default_alpha(),
            beta: default_beta(),
            max_iterations: default_max_iterations(),
        }
    }
}

impl LdaParameters {
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=MAX_TOPICS).contains(&self.num_topics) {
            return Err(format!("numTopics must be between 1 and {}", MAX_TOPICS));
        }
        if !(self.alpha.is_finite() && self.alpha > 0.0) {
            return Err("alpha must be a positive number".to_string());
        }
        if !(self.beta.is_finite() && self.beta > 0.0) {
            return Err("beta must be a positive number".to_string());
        }
        if !(1..=MAX_ITERATIONS).contains(&self.max_iterations) {
            return Err(format!("maxIterations must be between 1 and {}", MAX_ITERATIONS));
        }
        Ok(())
    }
}

/// Factory registered under [`KIND`].
pub struct LdaFactory;

impl ModelFactory for LdaFactory {
    fn kind(&self) -> &str {
        KIND
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::builder::<LdaModel>()
            .capability("train", &["documents"], |model, args| model.train(args))
            .capability("predict", &["documents"], |model, args| model.predict(args))
            .capability("getTopics", &["topWords"], |model, args| model.topics(args))
            .build()
    }

    fn build(&self, parameters: &GenericRequest) -> Result<Box<dyn CapabilityObject>, ModelError> {
        let params: LdaParameters = serde_json::from_value(Value::Object(parameters.clone()))
            .map_err(|e| ModelError::InvalidSpecification(e.to_string()))?;
        params.validate().map_err(ModelError::InvalidSpecification)?;
        Ok(Box::new(LdaModel::new(params)))
    }
}

/// Processing state of an LDA model.
#[derive(Debug, Clone)]
pub struct LdaModel {
    params: LdaParameters,
    vocabulary: HashMap<String, usize>,
    words: Vec<String>,
    /// Topic × word assignment counts.
    topic_word: Vec<Vec<f64>>,
    topic_totals: Vec<f64>,
    documents_seen: usize,
}

impl LdaModel {
    pub fn new(params: LdaParameters) -> Self {
        let k = params.num_topics;
        Self {
            params,
            vocabulary: HashMap::new(),
            words: Vec::new(),
            topic_word: vec![Vec::new(); k],
            topic_totals: vec![0.0; k],
            documents_seen: 0,
        }
    }

    pub fn parameters(&self) -> &LdaParameters {
        &self.params
    }

    pub fn documents_seen(&self) -> usize {
        self.documents_seen
    }

    pub fn vocabulary_size(&self) -> usize {
        self.words.len()
    }

    fn ensure_trained(&self) -> Result<(), CapabilityError> {
        if self.documents_seen == 0 {
            return Err(CapabilityError::NotReady(
                "model has not been trained yet".to_string(),
            ));
        }
        Ok(())
    }

    fn word_id(&mut self, word: &str) -> usize {
        if let Some(&id) = self.vocabulary.get(word) {
            return id;
        }
        let id = self.words.len();
        self.vocabulary.insert(word.to_string(), id);
        self.words.push(word.to_string());
        for row in &mut self.topic_word {
            row.push(0.0);
        }
        id
    }

    /// Smoothed probability of `word` under `topic`.
    fn phi(&self, topic: usize, word: usize) -> f64 {
        let v = self.words.len() as f64;
        (self.topic_word[topic][word] + self.params.beta)
            / (self.topic_totals[topic] + v * self.params.beta)
    }

    fn best_topic(&self, doc_topics: &[f64], word: usize) -> usize {
        let mut best = 0;
        let mut best_score = f64::MIN;
        for (topic, &count) in doc_topics.iter().enumerate() {
            let score = (count + self.params.alpha) * self.phi(topic, word);
            if score > best_score {
                best = topic;
                best_score = score;
            }
        }
        best
    }

    fn fit(&mut self, documents: &[String]) -> usize {
        let k = self.params.num_topics;
        let docs: Vec<Vec<usize>> = documents
            .iter()
            .map(|doc| tokenize(doc).iter().map(|w| self.word_id(w)).collect())
            .collect();

        let mut assignments: Vec<Vec<usize>> = Vec::with_capacity(docs.len());
        let mut doc_topics: Vec<Vec<f64>> = Vec::with_capacity(docs.len());
        for (d, doc) in docs.iter().enumerate() {
            let mut counts = vec![0.0; k];
            let mut topics = Vec::with_capacity(doc.len());
            for (i, &word) in doc.iter().enumerate() {
                let topic = (word + d + i) % k;
                counts[topic] += 1.0;
                self.topic_word[topic][word] += 1.0;
                self.topic_totals[topic] += 1.0;
                topics.push(topic);
            }
            assignments.push(topics);
            doc_topics.push(counts);
        }

        for _ in 0..self.params.max_iterations {
            let mut moved = 0usize;
            for (d, doc) in docs.iter().enumerate() {
                for (i, &word) in doc.iter().enumerate() {
                    let old = assignments[d][i];
                    doc_topics[d][old] -= 1.0;
                    self.topic_word[old][word] -= 1.0;
                    self.topic_totals[old] -= 1.0;

                    let new = self.best_topic(&doc_topics[d], word);

                    doc_topics[d][new] += 1.0;
                    self.topic_word[new][word] += 1.0;
                    self.topic_totals[new] += 1.0;
                    if new != old {
                        assignments[d][i] = new;
                        moved += 1;
                    }
                }
            }
            if moved == 0 {
                break;
            }
        }

        self.documents_seen += docs.len();
        docs.len()
    }

    fn infer(&self, document: &str) -> Vec<f64> {
        let k = self.params.num_topics;
        let mut mass = vec![self.params.alpha; k];
        for word in tokenize(document) {
            let Some(&id) = self.vocabulary.get(&word) else {
                continue;
            };
            let weights: Vec<f64> = (0..k).map(|t| self.phi(t, id)).collect();
            let norm: f64 = weights.iter().sum();
            if norm > 0.0 {
                for (t, w) in weights.iter().enumerate() {
                    mass[t] += w / norm;
                }
            }
        }
        let total: f64 = mass.iter().sum();
        mass.iter().map(|m| m / total).collect()
    }

    /// Top words per topic.
    pub fn topics(&mut self, args: &GenericRequest) -> Result<Value, CapabilityError> {
        self.ensure_trained()?;
        let top: usize = optional_arg(args, "topWords")?.unwrap_or(DEFAULT_TOP_WORDS);
        let topics: Vec<Value> = self
            .topic_word
            .iter()
            .enumerate()
            .map(|(topic, row)| {
                let mut ranked: Vec<(usize, f64)> = row
                    .iter()
                    .copied()
                    .enumerate()
                    .filter(|(_, count)| *count > 0.0)
                    .collect();
                ranked.sort_by(|a, b| {
                    b.1.total_cmp(&a.1)
                        .then_with(|| self.words[a.0].cmp(&self.words[b.0]))
                });
                let words: Vec<&str> = ranked
                    .iter()
                    .take(top)
                    .map(|(id, _)| self.words[*id].as_str())
                    .collect();
                json!({ "topic": topic, "words": words })
            })
            .collect();
        Ok(Value::Array(topics))
    }
}

impl CapabilityObject for LdaModel {
    fn train(&mut self, input: &GenericRequest) -> Result<Value, CapabilityError> {
        let documents: Vec<String> = required_arg(input, "documents")?;
        if documents.is_empty() {
            return Err(CapabilityError::InvalidArguments(
                "documents must not be empty".to_string(),
            ));
        }
        Ok(json!(self.fit(&documents)))
    }

    fn predict(&self, input: &GenericRequest) -> Result<Value, CapabilityError> {
        self.ensure_trained()?;
        let documents: Vec<String> = required_arg(input, "documents")?;
        let distributions: Vec<Vec<f64>> = documents.iter().map(|doc| self.infer(doc)).collect();
        Ok(json!(distributions))
    }

    fn update(&mut self, patch: &GenericRequest) -> Result<usize, CapabilityError> {
        let mut next = self.params.clone();
        let mut changed = 0;
        if let Some(n) = optional_arg::<usize>(patch, "numTopics")? {
            next.num_topics = n;
            changed += 1;
        }
        if let Some(alpha) = optional_arg::<f64>(patch, "alpha")? {
            next.alpha = alpha;
            changed += 1;
        }
        if let Some(beta) = optional_arg::<f64>(patch, "beta")? {
            next.beta = beta;
            changed += 1;
        }
        if let Some(iterations) = optional_arg::<usize>(patch, "maxIterations")? {
            next.max_iterations = iterations;
            changed += 1;
        }
        if changed == 0 {
            return Ok(0);
        }
        next.validate().map_err(CapabilityError::InvalidArguments)?;

        // Learned counts are laid out per topic; a new topic count starts over.
        if next.num_topics != self.params.num_topics {
            *self = LdaModel::new(next);
        } else {
            self.params = next;
        }
        Ok(changed)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Lowercased alphanumeric tokens of at least two characters.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() >= 2)
        .map(str::to_lowercase)
        .collect()
}
