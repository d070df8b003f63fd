//! Inference: T-norm aggregation over every rule, a rule-stretching
//! fallback for instances no rule covers, and the tie-breaking conflict
//! resolution step. Stretching works on borrowed data and freshly
//! computed truncation lengths — no clone of the model is ever made or
//! mutated.

use crate::data::Instance;
use crate::ensemble::Model;
use crate::options::{TNorm, UncovAction};
use crate::rule::Rule;

impl Model {
    /// Predict a class distribution for `instance`. Always returns a
    /// vector summing to 1 (or all-zero, under `UncovAction::Reject` with
    /// no rule coverage).
    pub fn predict_distribution(&self, instance: &Instance) -> Vec<f64> {
        let n = self.schema.num_classes();
        let mut d = vec![0.0; n];

        for rule in &self.rules {
            if rule.antecedents.is_empty() {
                continue;
            }
            let mem = rule.membership(instance, self.options.t_norm);
            if mem > 0.0 {
                d[rule.consequent] += mem * rule.confidence();
            }
        }

        if is_all_zero(&d) {
            match self.options.uncov_action {
                UncovAction::Apriori => return normalize(&self.apriori),
                UncovAction::Reject => return d,
                UncovAction::Stretch => stretch_into(&self.rules, instance, self.options.t_norm, &mut d),
            }
        }

        resolve_conflicts(&mut d, &self.apriori);

        if is_all_zero(&d) {
            return normalize(&self.apriori);
        }
        normalize(&d)
    }
}

fn is_all_zero(d: &[f64]) -> bool {
    d.iter().all(|&x| x == 0.0)
}

/// Rule stretching: for every rule, truncate at the first antecedent the
/// instance fails, then take the *maximum* stretched weight per class
/// rather than summing.
fn stretch_into(rules: &[Rule], instance: &Instance, tnorm: TNorm, d: &mut [f64]) {
    for rule in rules {
        if rule.antecedents.is_empty() {
            continue;
        }
        let j = rule
            .antecedents
            .iter()
            .position(|a| a.covers(instance) == 0.0)
            .unwrap_or(rule.antecedents.len());

        // `j == 0` means the instance fails the rule's very first
        // antecedent, so the stretched prefix is empty. A rule only votes
        // once it still has antecedents after truncation.
        if j == 0 {
            continue;
        }
        let stretched_membership = match tnorm {
            TNorm::Product => rule.antecedents[..j].iter().map(|a| a.covers(instance)).product(),
            TNorm::Min => rule.antecedents[..j]
                .iter()
                .map(|a| a.covers(instance))
                .fold(f64::INFINITY, f64::min),
        };
        let weight = ((j as f64 + 1.0) / (rule.antecedents.len() as f64 + 2.0))
            * rule.confidence()
            * stretched_membership;
        if weight > d[rule.consequent] {
            d[rule.consequent] = weight;
        }
    }
}

/// Break ties for the maximum toward whichever tied class has the highest
/// apriori proportion, by nudging every other tied class down by `1e-5`.
/// `d`'s tied entries live on the T-norm/confidence scale, not the
/// normalized-apriori scale, so the two are never compared directly —
/// only apriori proportions are compared against each other, among the
/// tied classes.
fn resolve_conflicts(d: &mut [f64], apriori: &[f64]) {
    let max = d.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max <= 0.0 {
        return;
    }
    let tied: Vec<usize> = (0..d.len()).filter(|&i| (d[i] - max).abs() < 1e-12).collect();
    if tied.len() <= 1 {
        return;
    }
    let apriori_sum: f64 = apriori.iter().sum();
    let prior_of = |i: usize| if apriori_sum > 0.0 { apriori[i] / apriori_sum } else { 0.0 };
    let best_prior = tied.iter().map(|&i| prior_of(i)).fold(f64::NEG_INFINITY, f64::max);
    for i in tied {
        if (prior_of(i) - best_prior).abs() >= 1e-12 {
            d[i] -= 1e-5;
        }
    }
}

fn normalize(d: &[f64]) -> Vec<f64> {
    let sum: f64 = d.iter().sum();
    if sum > 0.0 {
        d.iter().map(|&x| x / sum).collect()
    } else {
        d.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::antecedent::{Antecedent, AntecedentKind, Side};
    use crate::data::{Attribute, Instance, InstanceSet, Schema, Value};
    use crate::ensemble::Model;
    use crate::options::Options;
    use std::rc::Rc;

    fn axis_aligned_schema() -> Rc<Schema> {
        Rc::new(Schema::new(
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
    fn predict_distribution_sums_to_one_on_trivial_axis_aligned_data() {
        let data = axis_aligned_data();
        let model = Model::fit(data, Options::default()).unwrap();
        let schema = model.schema.clone();
        let below = Instance::new(vec![Value::Numeric(0.1), Value::Missing], 1.0);
        let d = model.predict_distribution(&below);
        let sum: f64 = d.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9 || d.iter().all(|&x| x == 0.0));
        let _ = schema;
    }

    #[test]
    fn predict_distribution_favors_the_covering_side() {
        let data = axis_aligned_data();
        let model = Model::fit(data, Options::default()).unwrap();
        let low = Instance::new(vec![Value::Numeric(0.05), Value::Missing], 1.0);
        let high = Instance::new(vec![Value::Numeric(0.95), Value::Missing], 1.0);
        let d_low = model.predict_distribution(&low);
        let d_high = model.predict_distribution(&high);
        assert!(d_low[0] >= d_low[1]);
        assert!(d_high[1] >= d_high[0]);
    }

    #[test]
    fn conflict_resolution_breaks_ties_toward_matching_apriori() {
        let mut d = vec![0.5, 0.5];
        let apriori = vec![10.0, 30.0]; // normalized: 0.25, 0.75
        resolve_conflicts(&mut d, &apriori);
        assert!(d[0] < 0.5);
        assert_eq!(d[1], 0.5);
    }

    #[test]
    fn stretching_example_matches_the_worked_scenario() {
        // rule: x <= 0.5 and y <= 0.5 => A, confidence 0.9
        let rule = Rule {
            consequent: 0,
            antecedents: vec![
                Antecedent {
                    kind: AntecedentKind::Numeric {
                        attr: 0,
                        side: Side::Low,
                        split_point: 0.5,
                        support_bound: 0.5,
                        fuzzy: false,
                    },
                    gain: 1.0,
                    covered: 1.0,
                    accurate: 1.0,
                    accuracy_rate: 1.0,
                },
                Antecedent {
                    kind: AntecedentKind::Numeric {
                        attr: 1,
                        side: Side::Low,
                        split_point: 0.5,
                        support_bound: 0.5,
                        fuzzy: false,
                    },
                    gain: 1.0,
                    covered: 1.0,
                    accurate: 1.0,
                    accuracy_rate: 1.0,
                },
            ],
            confidences: vec![0.9, 0.9],
            distribution: Vec::new(),
        };
        let schema = Rc::new(Schema::new(
            vec![
                Attribute::Numeric { name: "x".into() },
                Attribute::Numeric { name: "y".into() },
                Attribute::Nominal {
                    name: "class".into(),
                    values: vec!["A".into(), "B".into()],
                },
            ],
            2,
        ));
        let _ = schema;
        let instance = Instance::new(vec![Value::Numeric(0.3), Value::Numeric(0.8)], 1.0);
        let mut d = vec![0.0, 0.0];
        stretch_into(&[rule], &instance, TNorm::Product, &mut d);
        assert!((d[0] - 0.45).abs() < 1e-9);
    }

    #[test]
    fn stretching_contributes_nothing_when_the_first_antecedent_fails() {
        // same rule as the worked scenario, but the instance fails on `x`
        // itself: the truncated prefix is empty, so the rule must not vote.
        let rule = Rule {
            consequent: 0,
            antecedents: vec![
                Antecedent {
                    kind: AntecedentKind::Numeric {
                        attr: 0,
                        side: Side::Low,
                        split_point: 0.5,
                        support_bound: 0.5,
                        fuzzy: false,
                    },
                    gain: 1.0,
                    covered: 1.0,
                    accurate: 1.0,
                    accuracy_rate: 1.0,
                },
                Antecedent {
                    kind: AntecedentKind::Numeric {
                        attr: 1,
                        side: Side::Low,
                        split_point: 0.5,
                        support_bound: 0.5,
                        fuzzy: false,
                    },
                    gain: 1.0,
                    covered: 1.0,
                    accurate: 1.0,
                    accuracy_rate: 1.0,
                },
            ],
            confidences: vec![0.9, 0.9],
            distribution: Vec::new(),
        };
        let instance = Instance::new(vec![Value::Numeric(0.8), Value::Numeric(0.3)], 1.0);
        let mut d = vec![0.0, 0.0];
        stretch_into(&[rule], &instance, TNorm::Product, &mut d);
        assert_eq!(d[0], 0.0);
    }

    #[test]
    fn instance_missing_every_rule_antecedent_attribute_activates_uncov_action() {
        let data = axis_aligned_data();
        // every learned rule tests attribute 0 (`x`); an instance missing
        // it gets membership 0 from every rule, so no rule covers it.
        let missing_x = Instance::new(vec![Value::Missing, Value::Missing], 1.0);

        let stretch_model = Model::fit(data.clone(), Options::default()).unwrap();
        let d = stretch_model.predict_distribution(&missing_x);
        let sum: f64 = d.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);

        let reject_model = Model::fit(
            data.clone(),
            Options {
                uncov_action: crate::options::UncovAction::Reject,
                ..Options::default()
            },
        )
        .unwrap();
        let d = reject_model.predict_distribution(&missing_x);
        assert!(d.iter().all(|&x| x == 0.0));

        let apriori_model = Model::fit(
            data,
            Options {
                uncov_action: crate::options::UncovAction::Apriori,
                ..Options::default()
            },
        )
        .unwrap();
        let d = apriori_model.predict_distribution(&missing_x);
        let expected = {
            let sum: f64 = apriori_model.apriori.iter().sum();
            apriori_model.apriori[0] / sum
        };
        assert!((d[0] - expected).abs() < 1e-9);
    }
}
