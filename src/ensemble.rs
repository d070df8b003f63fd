//! `Model` and the ensemble driver that builds it: run the class learner
//! for every class, merge the rulesets, deduplicate antecedents, fuzzify
//! every rule, then compute per-antecedent confidences. Inference
//! (`predict_distribution`) lives in `predictor.rs`.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::antecedent::{AntecedentKind, Side};
use crate::class_learner::learn_class;
use crate::data::{Attribute, InstanceSet, Schema};
use crate::error::FuriaError;
use crate::logger::Logger;
use crate::options::Options;
use crate::rng::FuriaRng;
use crate::rule::Rule;
use crate::rule_stats::RuleStats;

/// `(class_attribute, ruleset, per-class RuleStats, apriori class-weight
/// vector)`. Built once by `fit`, consumed read-only by
/// `predict_distribution`.
pub struct Model {
    pub schema: Rc<Schema>,
    pub rules: Vec<Rule>,
    pub rule_stats: Vec<RuleStats>,
    pub apriori: Vec<f64>,
    pub options: Options,
}

impl Model {
    /// Train on `train`. Fails before any learning happens if the class
    /// attribute isn't nominal or the dataset is smaller than `folds`.
    pub fn fit(train: InstanceSet, options: Options) -> Result<Model, FuriaError> {
        options.validate()?;
        let schema = train.schema.clone();

        if matches!(schema.class_attribute(), Attribute::Numeric { .. }) {
            return Err(FuriaError::Capability(
                "class attribute must be nominal".into(),
            ));
        }
        if train.len() < options.folds {
            return Err(FuriaError::Capability(format!(
                "need at least {} instances for {}-fold REP, got {}",
                options.folds,
                options.folds,
                train.len()
            )));
        }

        let logger = Logger::new(options.debug);
        let mut rng = FuriaRng::seeded(options.seed);
        let apriori = train.class_weights();

        let mut all_rules = Vec::new();
        let mut all_stats = Vec::new();
        for class_y in 0..schema.num_classes() {
            if apriori[class_y] <= 0.0 {
                logger.log(|| format!("class {class_y}: empty, no default rule"));
                continue;
            }
            let (rules, stats) = learn_class(&train, class_y, &apriori, &options, &mut rng, &logger)?;
            all_rules.extend(rules);
            all_stats.push(stats);
        }

        dedup_antecedents(&mut all_rules);

        for rule in all_rules.iter_mut() {
            rule.fuzzify(&train, &schema);
            rule.calculate_distribution(&train, &schema);
            rule.calculate_confidences(&train, &schema, &apriori);
        }

        Ok(Model {
            schema,
            rules: all_rules,
            rule_stats: all_stats,
            apriori,
            options,
        })
    }

    pub fn ruleset(&self) -> &[Rule] {
        &self.rules
    }

    pub fn num_rules(&self) -> usize {
        self.rules.len()
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in &self.rules {
            writeln!(f, "{}", rule.describe(&self.schema))?;
        }
        Ok(())
    }
}

/// Remove redundant duplicate antecedents within each rule: same
/// attribute index and same `value`, keeping the later occurrence (spec
/// §4.E item 1). For a nominal antecedent `value` is the tested nominal
/// index; numeric attributes are reusable (§4.B growth never marks them
/// used), so a numeric antecedent's `value` is its `(side, split_point)`
/// pair — an exact-duplicate threshold test on the same side, not merely
/// the same attribute. The growth loop's attribute-used bitset prevents a
/// nominal attribute from being picked twice within one rule it builds
/// directly, but a Revision candidate during optimization starts from an
/// existing rule's antecedents and is free to grow further, so duplicates
/// of either kind can still appear there.
fn dedup_antecedents(rules: &mut [Rule]) {
    for rule in rules.iter_mut() {
        let mut last_nominal: HashMap<(usize, usize), usize> = HashMap::new();
        let mut last_numeric: HashMap<(usize, Side, u64), usize> = HashMap::new();
        for (i, a) in rule.antecedents.iter().enumerate() {
            match a.kind {
                AntecedentKind::Nominal { attr, value } => {
                    last_nominal.insert((attr, value), i);
                }
                AntecedentKind::Numeric {
                    attr,
                    side,
                    split_point,
                    ..
                } => {
                    last_numeric.insert((attr, side, split_point.to_bits()), i);
                }
            }
        }
        let mut idx = 0;
        rule.antecedents.retain(|a| {
            let keep = match a.kind {
                AntecedentKind::Nominal { attr, value } => last_nominal[&(attr, value)] == idx,
                AntecedentKind::Numeric {
                    attr,
                    side,
                    split_point,
                    ..
                } => last_numeric[&(attr, side, split_point.to_bits())] == idx,
            };
            idx += 1;
            keep
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Instance, Value};
    use std::rc::Rc as StdRc;

    fn axis_aligned_schema() -> StdRc<Schema> {
        StdRc::new(Schema::new(
            vec![
                Attribute::Numeric { name: "x".into() },
                Attribute::Nominal {
                    name: "class".into(),
                    values: vec!["A".into(), "B".into()],
                },
            ],
            1,
        ))
    }

    fn axis_aligned_data() -> InstanceSet {
        let schema = axis_aligned_schema();
        let rows = (0..100)
            .map(|i| {
                let x = i as f64 / 100.0;
                let class = if x <= 0.5 { 0 } else { 1 };
                Instance::new(vec![Value::Numeric(x), Value::Nominal(class)], 1.0)
            })
            .collect();
        InstanceSet::new(schema, rows)
    }

    #[test]
    fn fit_rejects_a_numeric_class_attribute() {
        let schema = Rc::new(Schema::new(
            vec![
                Attribute::Numeric { name: "x".into() },
                Attribute::Numeric { name: "y".into() },
            ],
            1,
        ));
        let data = InstanceSet::new(schema, vec![Instance::new(vec![Value::Numeric(1.0), Value::Numeric(2.0)], 1.0); 5]);
        let result = Model::fit(data, Options::default());
        assert!(matches!(result, Err(FuriaError::Capability(_))));
    }

    #[test]
    fn fit_rejects_fewer_instances_than_folds() {
        let schema = axis_aligned_schema();
        let data = InstanceSet::new(
            schema,
            vec![Instance::new(vec![Value::Numeric(0.1), Value::Nominal(0)], 1.0)],
        );
        let result = Model::fit(data, Options::default());
        assert!(matches!(result, Err(FuriaError::Capability(_))));
    }

    #[test]
    fn fit_on_axis_aligned_data_produces_one_rule_per_class() {
        let data = axis_aligned_data();
        let model = Model::fit(data, Options::default()).unwrap();
        assert!(model.num_rules() >= 2);
        let consequents: std::collections::HashSet<usize> =
            model.rules.iter().map(|r| r.consequent).collect();
        assert!(consequents.contains(&0));
        assert!(consequents.contains(&1));
    }

    #[test]
    fn dedup_antecedents_drops_an_exact_duplicate_numeric_antecedent() {
        use crate::antecedent::Antecedent;

        let duplicate = Antecedent {
            kind: AntecedentKind::Numeric {
                attr: 0,
                side: crate::antecedent::Side::Low,
                split_point: 0.5,
                support_bound: 0.5,
                fuzzy: false,
            },
            gain: 1.0,
            covered: 1.0,
            accurate: 1.0,
            accuracy_rate: 1.0,
        };
        let mut rules = vec![Rule {
            consequent: 0,
            antecedents: vec![duplicate.clone(), duplicate],
            confidences: vec![0.5, 0.5],
            distribution: Vec::new(),
        }];
        dedup_antecedents(&mut rules);
        assert_eq!(rules[0].antecedents.len(), 1);
    }

    #[test]
    fn one_class_dataset_produces_zero_rules() {
        let schema = axis_aligned_schema();
        let rows: Vec<Instance> = (0..10)
            .map(|i| Instance::new(vec![Value::Numeric(i as f64 / 10.0), Value::Nominal(0)], 1.0))
            .collect();
        let data = InstanceSet::new(schema, rows);
        let model = Model::fit(data, Options::default()).unwrap();
        assert_eq!(model.num_rules(), 0);
        assert_eq!(model.apriori[1], 0.0);
    }
}
