//! Antecedents: one test on one attribute, nominal or numeric.
//!
//! A single tagged enum (`AntecedentKind`) carries both nominal and
//! numeric tests with shared growth statistics, searched by the same
//! best-split-over-candidate-thresholds shape as a decision-tree split
//! search, generalized from Gini impurity to Laplace-smoothed information
//! gain.

use crate::data::{Attribute, Instance, InstanceSet, Schema, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Low,
    High,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AntecedentKind {
    Nominal {
        attr: usize,
        value: usize,
    },
    Numeric {
        attr: usize,
        side: Side,
        split_point: f64,
        support_bound: f64,
        fuzzy: bool,
    },
}

/// One test in a rule, plus the growth-time statistics it was selected
/// with. Confidence is *not* stored here: it lives in a `Vec<f64>` on the
/// owning `Rule`, parallel to its antecedent list.
#[derive(Debug, Clone, PartialEq)]
pub struct Antecedent {
    pub kind: AntecedentKind,
    pub gain: f64,
    pub covered: f64,
    pub accurate: f64,
    pub accuracy_rate: f64,
}

impl Antecedent {
    pub fn attr(&self) -> usize {
        match self.kind {
            AntecedentKind::Nominal { attr, .. } => attr,
            AntecedentKind::Numeric { attr, .. } => attr,
        }
    }

    /// Fuzzy membership of `instance` in `[0, 1]`. Missing on the tested
    /// attribute always yields 0.
    pub fn covers(&self, instance: &Instance) -> f64 {
        match self.kind {
            AntecedentKind::Nominal { attr, value } => match instance.value_at(attr) {
                Value::Nominal(v) if v == value => 1.0,
                _ => 0.0,
            },
            AntecedentKind::Numeric {
                attr,
                side,
                split_point,
                support_bound,
                fuzzy,
            } => {
                let x = match instance.value_at(attr) {
                    Value::Numeric(x) => x,
                    _ => return 0.0,
                };
                match side {
                    Side::Low => {
                        if x <= split_point {
                            1.0
                        } else if fuzzy && x < support_bound {
                            1.0 - (x - split_point) / (support_bound - split_point)
                        } else {
                            0.0
                        }
                    }
                    Side::High => {
                        if x >= split_point {
                            1.0
                        } else if fuzzy && x > support_bound {
                            1.0 - (split_point - x) / (split_point - support_bound)
                        } else {
                            0.0
                        }
                    }
                }
            }
        }
    }

    pub fn covers_bool(&self, instance: &Instance) -> bool {
        self.covers(instance) > 0.0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.kind, AntecedentKind::Numeric { .. })
    }
}

/// Result of searching one attribute for the best antecedent: the winning
/// antecedent plus the bags `split_data` partitioned the input into.
/// `value` indexes which bag the growth loop should continue on.
pub struct SplitResult {
    pub antecedent: Antecedent,
    pub bags: Vec<InstanceSet>,
    pub value: usize,
}

fn laplace_accuracy_rate(accurate: f64, covered: f64) -> f64 {
    (accurate + 1.0) / (covered + 1.0)
}

fn info_gain(accurate: f64, accuracy_rate: f64, def_acc_rate: f64) -> f64 {
    accurate * (accuracy_rate.log2() - def_acc_rate.log2())
}

/// Find the best antecedent for `attr`, dispatching on its schema kind.
/// Returns `None` if the attribute offers no viable split (e.g. every
/// instance shares one value, or all instances are missing on `attr`).
pub fn best_split(
    data: &InstanceSet,
    schema: &Schema,
    attr: usize,
    def_acc_rate: f64,
    class_y: usize,
) -> Option<SplitResult> {
    match &schema.attributes[attr] {
        Attribute::Numeric { .. } => best_numeric_split(data, attr, def_acc_rate, class_y),
        Attribute::Nominal { values, .. } => {
            best_nominal_split(data, attr, values.len(), def_acc_rate, class_y)
        }
    }
}

fn bag_stats(bag: &[Instance], schema: &Schema, class_y: usize) -> (f64, f64) {
    let mut covered = 0.0;
    let mut accurate = 0.0;
    for inst in bag {
        covered += inst.weight;
        if inst.class(schema) == Some(class_y) {
            accurate += inst.weight;
        }
    }
    (covered, accurate)
}

fn best_numeric_split(
    data: &InstanceSet,
    attr: usize,
    def_acc_rate: f64,
    class_y: usize,
) -> Option<SplitResult> {
    let (sorted, total) = data.sort_by_attribute(attr);
    if total < 2 {
        return None;
    }
    let schema = sorted.schema.clone();

    let mut best: Option<(f64, Side, f64, f64, f64, usize)> = None; // (gain, side, split_point, covered, accurate, left_len)
    let mut prev = 0usize;
    let values: Vec<f64> = sorted.instances[..total]
        .iter()
        .map(|i| i.value_at(attr).as_numeric().unwrap())
        .collect();

    let mut split = 1usize;
    while split < total {
        let boundary = values[split] != values[prev];
        if boundary {
            let split_point = values[prev];
            let left = &sorted.instances[..split];
            let right = &sorted.instances[split..total];

            let (left_cov, left_acc) = bag_stats(left, &schema, class_y);
            let (right_cov, right_acc) = bag_stats(right, &schema, class_y);
            let left_rate = laplace_accuracy_rate(left_acc, left_cov);
            let right_rate = laplace_accuracy_rate(right_acc, right_cov);
            let left_gain = info_gain(left_acc, left_rate, def_acc_rate);
            let right_gain = info_gain(right_acc, right_rate, def_acc_rate);

            let (gain, side, cov, acc) = if left_gain >= right_gain {
                (left_gain, Side::Low, left_cov, left_acc)
            } else {
                (right_gain, Side::High, right_cov, right_acc)
            };

            let better = match &best {
                None => true,
                Some((best_gain, ..)) => gain > *best_gain,
            };
            if better {
                best = Some((gain, side, split_point, cov, acc, split));
            }
            prev = split;
        }
        split += 1;
    }

    let (gain, side, split_point, covered, accurate, left_len) = best?;
    if gain <= 0.0 {
        return None;
    }
    let accuracy_rate = laplace_accuracy_rate(accurate, covered);
    let antecedent = Antecedent {
        kind: AntecedentKind::Numeric {
            attr,
            side,
            split_point,
            support_bound: split_point,
            fuzzy: false,
        },
        gain,
        covered,
        accurate,
        accuracy_rate,
    };
    // Restrict to the present (non-missing) prefix before splitting into
    // bags — `sorted` is `present ‖ missing`, and an instance missing
    // `attr` is covered by neither side, so it must not land in the
    // `High` bag just because that bag is the tail of the slice.
    let (present, _missing) = sorted.split_at(total);
    let (low_bag, high_bag) = present.split_at(left_len);
    let value = match side {
        Side::Low => 0,
        Side::High => 1,
    };
    Some(SplitResult {
        antecedent,
        bags: vec![low_bag, high_bag],
        value,
    })
}

fn best_nominal_split(
    data: &InstanceSet,
    attr: usize,
    num_values: usize,
    def_acc_rate: f64,
    class_y: usize,
) -> Option<SplitResult> {
    if num_values == 0 {
        return None;
    }
    let schema = data.schema.clone();
    let mut buckets: Vec<Vec<Instance>> = vec![Vec::new(); num_values];
    for inst in &data.instances {
        if let Value::Nominal(v) = inst.value_at(attr) {
            buckets[v].push(inst.clone());
        }
    }

    let mut best: Option<(f64, usize, f64, f64)> = None; // (gain, value, covered, accurate)
    for (value, bucket) in buckets.iter().enumerate() {
        if bucket.is_empty() {
            continue;
        }
        let (covered, accurate) = bag_stats(bucket, &schema, class_y);
        let accuracy_rate = laplace_accuracy_rate(accurate, covered);
        let gain = info_gain(accurate, accuracy_rate, def_acc_rate);
        let better = match &best {
            None => true,
            Some((best_gain, ..)) => gain > *best_gain,
        };
        if better {
            best = Some((gain, value, covered, accurate));
        }
    }

    let (gain, value, covered, accurate) = best?;
    if gain <= 0.0 {
        return None;
    }
    let accuracy_rate = laplace_accuracy_rate(accurate, covered);
    let antecedent = Antecedent {
        kind: AntecedentKind::Nominal { attr, value },
        gain,
        covered,
        accurate,
        accuracy_rate,
    };
    let bags = buckets
        .into_iter()
        .map(|b| InstanceSet::new(schema.clone(), b))
        .collect();
    Some(SplitResult {
        antecedent,
        bags,
        value,
    })
}
