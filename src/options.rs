//! Options/capabilities surface.
//!
//! `Options` is the engine-facing configuration; `Cli` is the `clap`
//! derive struct the binary parses and converts into one.

use clap::Parser;

use crate::error::FuriaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UncovAction {
    Stretch,
    Apriori,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TNorm {
    Product,
    Min,
}

#[derive(Debug, Clone)]
pub struct Options {
    pub folds: usize,
    pub min_no: f64,
    pub optimizations: usize,
    pub seed: u64,
    pub check_error_rate: bool,
    pub uncov_action: UncovAction,
    pub t_norm: TNorm,
    pub debug: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            folds: 3,
            min_no: 2.0,
            optimizations: 2,
            seed: 1,
            check_error_rate: true,
            uncov_action: UncovAction::Stretch,
            t_norm: TNorm::Product,
            debug: false,
        }
    }
}

impl Options {
    /// Legality checks independent of the training data. Data-size checks
    /// against `folds` happen in `Model::fit`, since they need the
    /// instance count.
    pub fn validate(&self) -> Result<(), FuriaError> {
        if self.folds < 2 {
            return Err(FuriaError::Config(format!(
                "folds must be >= 2 for a grow/prune split, got {}",
                self.folds
            )));
        }
        if self.min_no < 0.0 {
            return Err(FuriaError::Config(format!(
                "min_no must be >= 0, got {}",
                self.min_no
            )));
        }
        Ok(())
    }
}

/// Command-line surface exposing every `Options` field one flag at a time.
#[derive(Parser, Debug)]
#[command(name = "furia", about = "Fuzzy unordered rule induction classifier")]
pub struct Cli {
    /// REP folds: one fold prunes, the rest grow.
    #[arg(short = 'F', long, default_value_t = 3)]
    pub folds: usize,

    /// Minimum covered-positive weight accepted during growth.
    #[arg(short = 'N', long = "min-no", default_value_t = 2.0)]
    pub min_no: f64,

    /// Number of optimization passes.
    #[arg(short = 'O', long, default_value_t = 2)]
    pub optimizations: usize,

    /// RNG seed for stratification and fold partitioning.
    #[arg(short = 'S', long, default_value_t = 1)]
    pub seed: u64,

    /// Disable the >=0.5 error-rate stop check during building.
    #[arg(long = "no-check-error-rate")]
    pub no_check_error_rate: bool,

    /// What to do when no rule covers an instance: stretch, apriori, reject.
    #[arg(short = 's', long = "uncovered-action", default_value = "stretch")]
    pub uncov_action: String,

    /// T-norm used to aggregate antecedent memberships: product, min.
    #[arg(short = 'p', long = "t-norm", default_value = "product")]
    pub t_norm: String,

    /// Print diagnostic progress to stderr.
    #[arg(short = 'D', long)]
    pub debug: bool,

    /// Synthetic demo dataset: axis-aligned, xor, noisy-boundary.
    #[arg(long, default_value = "axis-aligned")]
    pub demo: String,
}

impl Cli {
    pub fn into_options(&self) -> Result<Options, FuriaError> {
        let uncov_action = match self.uncov_action.to_lowercase().as_str() {
            "stretch" => UncovAction::Stretch,
            "apriori" => UncovAction::Apriori,
            "reject" => UncovAction::Reject,
            other => {
                return Err(FuriaError::Config(format!(
                    "unknown uncovered-action '{other}', expected stretch|apriori|reject"
                )))
            }
        };
        let t_norm = match self.t_norm.to_lowercase().as_str() {
            "product" | "prod" => TNorm::Product,
            "min" => TNorm::Min,
            other => {
                return Err(FuriaError::Config(format!(
                    "unknown t-norm '{other}', expected product|min"
                )))
            }
        };
        let options = Options {
            folds: self.folds,
            min_no: self.min_no,
            optimizations: self.optimizations,
            seed: self.seed,
            check_error_rate: !self.no_check_error_rate,
            uncov_action,
            t_norm,
            debug: self.debug,
        };
        options.validate()?;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_option_table() {
        let opts = Options::default();
        assert_eq!(opts.folds, 3);
        assert_eq!(opts.min_no, 2.0);
        assert_eq!(opts.optimizations, 2);
        assert_eq!(opts.seed, 1);
        assert!(opts.check_error_rate);
        assert_eq!(opts.uncov_action, UncovAction::Stretch);
        assert_eq!(opts.t_norm, TNorm::Product);
    }

    #[test]
    fn folds_below_two_is_rejected() {
        let opts = Options {
            folds: 1,
            ..Options::default()
        };
        assert!(opts.validate().is_err());
    }

    #[test]
    fn unknown_uncovered_action_is_a_config_error() {
        let cli = Cli {
            folds: 3,
            min_no: 2.0,
            optimizations: 2,
            seed: 1,
            no_check_error_rate: false,
            uncov_action: "bogus".into(),
            t_norm: "product".into(),
            debug: false,
            demo: "axis-aligned".into(),
        };
        assert!(cli.into_options().is_err());
    }
}
