//! Temporal smoothing of per-frame classification output.
//!
//! [`smooth_classification`] is a pure function of two frames. State across
//! frames belongs to the caller, either held directly or through a
//! [`ClassificationStream`], which must be fed frames in order since the
//! algorithm has no timestamp of its own.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{IoError, Result};

/// Label to confidence mapping for one inference frame.
pub type ClassificationMap = HashMap<String, f32>;

/// Blends the previous frame's classification with the incoming one.
///
/// For every label present in either map, with absent values read as `0`:
/// `smoothed = decay * current + (1 - decay) * incoming`. Labels whose
/// smoothed value falls below `threshold` are dropped.
///
/// `decay = 1` carries `current` forward unchanged, `decay = 0` replaces it
/// with `incoming`, and a threshold of `0` keeps every non-negative value.
///
/// # Example
///
/// ```
/// use ml_io::{ClassificationMap, smooth_classification};
///
/// let current = ClassificationMap::from([("foo".to_string(), 1.0)]);
/// let incoming = ClassificationMap::from([("foo".to_string(), 1000.0)]);
///
/// let smoothed = smooth_classification(&current, &incoming, 0.8, 0.0);
/// assert!((smoothed["foo"] - 200.8).abs() < 0.01);
/// ```
#[must_use]
pub fn smooth_classification(
    current: &ClassificationMap,
    incoming: &ClassificationMap,
    decay: f32,
    threshold: f32,
) -> ClassificationMap {
    let labels: HashSet<&String> = current.keys().chain(incoming.keys()).collect();

    labels
        .into_iter()
        .filter_map(|label| {
            let c = current.get(label).copied().unwrap_or(0.0);
            let n = incoming.get(label).copied().unwrap_or(0.0);
            let smoothed = decay.mul_add(c, (1.0 - decay) * n);
            (smoothed >= threshold).then(|| (label.clone(), smoothed))
        })
        .collect()
}

/// Returns the `n` highest-confidence entries, highest first.
///
/// Ties are ordered by label so the result is deterministic.
///
/// # Example
///
/// ```
/// use ml_io::{ClassificationMap, top_n};
///
/// let map = ClassificationMap::from([
///     ("cat".to_string(), 0.2),
///     ("dog".to_string(), 0.7),
///     ("fox".to_string(), 0.1),
/// ]);
///
/// let top = top_n(&map, 2);
/// assert_eq!(top[0].0, "dog");
/// assert_eq!(top[1].0, "cat");
/// ```
#[must_use]
pub fn top_n(map: &ClassificationMap, n: usize) -> Vec<(String, f32)> {
    let mut entries: Vec<(String, f32)> = map.iter().map(|(k, &v)| (k.clone(), v)).collect();
    entries.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    entries.truncate(n);
    entries
}

/// Parameters for smoothing a classification stream.
///
/// # Example
///
/// ```
/// use ml_io::SmoothingConfig;
///
/// let config = SmoothingConfig::default();
/// assert!(config.validate().is_ok());
/// ```
///
/// Deserialization runs the same checks as [`SmoothingConfig::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SmoothingParams")]
pub struct SmoothingConfig {
    /// Weight of the previous frame, in `[0, 1]`.
    pub decay: f32,

    /// Minimum smoothed confidence kept in the output.
    pub threshold: f32,
}

#[derive(Deserialize)]
struct SmoothingParams {
    decay: f32,
    threshold: f32,
}

impl TryFrom<SmoothingParams> for SmoothingConfig {
    type Error = IoError;

    fn try_from(params: SmoothingParams) -> Result<Self> {
        Self::new(params.decay, params.threshold)
    }
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            decay: 0.5,
            threshold: 0.0,
        }
    }
}

impl SmoothingConfig {
    /// Creates a validated smoothing config.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidConfig`] if the parameters are invalid.
    pub fn new(decay: f32, threshold: f32) -> Result<Self> {
        let config = Self { decay, threshold };
        config.validate()?;
        Ok(config)
    }

    /// Checks that `decay` lies in `[0, 1]` and `threshold` is finite.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidConfig`] describing the first bad parameter.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.decay) {
            return Err(IoError::invalid_config(format!(
                "decay must be in [0, 1], got {}",
                self.decay
            )));
        }
        if !self.threshold.is_finite() {
            return Err(IoError::invalid_config(format!(
                "threshold must be finite, got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// Caller-owned previous-frame state for one logical classification stream.
///
/// # Example
///
/// ```
/// use ml_io::{ClassificationMap, ClassificationStream, SmoothingConfig};
///
/// let mut stream = ClassificationStream::new(SmoothingConfig::new(0.5, 0.0).unwrap());
///
/// stream.push(&ClassificationMap::from([("cat".to_string(), 1.0)]));
/// let smoothed = stream.push(&ClassificationMap::new());
///
/// assert!((smoothed["cat"] - 0.25).abs() < 1e-6);
/// assert_eq!(stream.frames(), 2);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassificationStream {
    config: SmoothingConfig,
    previous: ClassificationMap,
    frames: u64,
}

impl ClassificationStream {
    /// Creates an empty stream.
    #[must_use]
    pub fn new(config: SmoothingConfig) -> Self {
        Self {
            config,
            previous: ClassificationMap::new(),
            frames: 0,
        }
    }

    /// Smooths the next frame against the previous result and stores it.
    pub fn push(&mut self, incoming: &ClassificationMap) -> &ClassificationMap {
        self.previous = smooth_classification(
            &self.previous,
            incoming,
            self.config.decay,
            self.config.threshold,
        );
        self.frames += 1;
        trace!(frame = self.frames, labels = self.previous.len(), "classification smoothed");
        &self.previous
    }

    /// Returns the most recent smoothed frame.
    #[must_use]
    pub const fn current(&self) -> &ClassificationMap {
        &self.previous
    }

    /// Returns the number of frames pushed since creation or the last reset.
    #[must_use]
    pub const fn frames(&self) -> u64 {
        self.frames
    }

    /// Returns the smoothing parameters.
    #[must_use]
    pub const fn config(&self) -> SmoothingConfig {
        self.config
    }

    /// Forgets the previous frame.
    pub fn reset(&mut self) {
        self.previous.clear();
        self.frames = 0;
    }
}
