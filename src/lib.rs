//! Fuzzy unordered rule induction: a RIPPER-style separate-and-conquer
//! rule learner, generalized with trapezoidal fuzzy antecedents and
//! T-norm inference with rule stretching.
//!
//! `Model::fit` trains one ruleset per class; `Model::predict_distribution`
//! scores a single instance. See `antecedent`/`rule`/`rule_stats` for the
//! per-rule machinery, `class_learner`/`ensemble` for the two levels of
//! the training loop, and `predictor` for inference.

pub mod antecedent;
pub mod class_learner;
pub mod data;
pub mod ensemble;
pub mod error;
pub mod logger;
pub mod options;
pub mod predictor;
pub mod rng;
pub mod rule;
pub mod rule_stats;

pub use antecedent::{Antecedent, AntecedentKind, Side};
pub use data::{Attribute, Instance, InstanceSet, Schema, Value};
pub use ensemble::Model;
pub use error::FuriaError;
pub use options::{Cli, Options, TNorm, UncovAction};
pub use rule::Rule;
pub use rule_stats::RuleStats;
