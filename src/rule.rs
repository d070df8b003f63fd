//! `Rule`: a conjunction of antecedents plus a consequent class.
//!
//! Growth, reduced-error pruning, fuzzification and m-estimate confidence
//! all live here as a single concrete struct — there is exactly one kind
//! of rule, so there is nothing to inherit from: a plain struct built by a
//! free-standing constructor, grown and pruned in place.

use crate::antecedent::{best_split, Antecedent, AntecedentKind, Side, SplitResult};
use crate::data::{Attribute, Instance, InstanceSet, Schema};
use crate::options::TNorm;

/// One IF-THEN rule: `antecedents[0] AND antecedents[1] AND ... => consequent`.
/// Antecedents stay in insertion (growth) order; pruning and optimization
/// only ever truncate the tail, never reorder it. Confidence is stored
/// per-prefix in a vector parallel to `antecedents`, not on the
/// antecedents themselves. `distribution` is a reporting-only field:
/// inference reads only `confidence()`/`consequent`.
#[derive(Debug, Clone)]
pub struct Rule {
    pub consequent: usize,
    pub antecedents: Vec<Antecedent>,
    pub confidences: Vec<f64>,
    pub distribution: Vec<f64>,
}

impl Rule {
    /// Grow a fresh rule for `class_y` from `grow_data`. Stops when the
    /// growing set is exhausted, every attribute has been used, the
    /// default accuracy rate saturates to 1, no attribute offers positive
    /// gain, or the winning antecedent's accurate weight falls under
    /// `min_no`.
    pub fn grow(grow_data: &InstanceSet, schema: &Schema, class_y: usize, min_no: f64) -> Rule {
        let mut antecedents = Vec::new();
        let mut used = vec![false; schema.attributes.len()];
        grow_loop(
            &mut antecedents,
            &mut used,
            grow_data.clone(),
            schema,
            class_y,
            min_no,
        );
        Rule {
            consequent: class_y,
            antecedents,
            confidences: Vec::new(),
            distribution: Vec::new(),
        }
    }

    /// Continue growing an existing rule, restricted to `data` (the
    /// instances it already covers) — the "Revision" variant used during
    /// optimization.
    pub fn grow_further(&mut self, data: &InstanceSet, schema: &Schema, min_no: f64) {
        let mut used = vec![false; schema.attributes.len()];
        for a in &self.antecedents {
            if let AntecedentKind::Nominal { attr, .. } = a.kind {
                used[attr] = true;
            }
        }
        grow_loop(
            &mut self.antecedents,
            &mut used,
            data.clone(),
            schema,
            self.consequent,
            min_no,
        );
    }

    /// Reduced-error pruning. Truncates the antecedent list to the longest
    /// prefix whose `worth` strictly beats both the baseline and every
    /// other prefix's worth; does nothing if no prefix clears the
    /// baseline.
    pub fn prune(&mut self, prune_data: &InstanceSet, class_y: usize, use_whole: bool) {
        let n = self.antecedents.len();
        if n == 0 {
            return;
        }
        let total = prune_data.total_weight();
        if total <= 0.0 {
            return;
        }
        let def_acc = prune_data.class_weight(class_y);
        let baseline = (def_acc + 1.0) / (total + 2.0);

        let mut data = prune_data.instances.clone();
        let mut tn_accum = 0.0;
        let mut best: Option<(usize, f64)> = None;

        for (i, antd) in self.antecedents.iter().enumerate() {
            let mut covered = Vec::new();
            let mut cov = 0.0;
            let mut tp = 0.0;
            for inst in &data {
                if antd.covers_bool(inst) {
                    cov += inst.weight;
                    if inst.class(&prune_data.schema) == Some(class_y) {
                        tp += inst.weight;
                    }
                    covered.push(inst.clone());
                } else if use_whole && inst.class(&prune_data.schema) != Some(class_y) {
                    tn_accum += inst.weight;
                }
            }
            let worth = if use_whole {
                (tp + tn_accum) / total
            } else {
                (tp + 1.0) / (cov + 2.0)
            };
            if worth > baseline {
                let take = match best {
                    None => true,
                    Some((_, best_worth)) => worth > best_worth,
                };
                if take {
                    best = Some((i, worth));
                }
            }
            data = covered;
        }

        if let Some((max_idx, _)) = best {
            self.antecedents.truncate(max_idx + 1);
        }
    }

    /// Greedy coordinate-ascent fuzzification of every numeric antecedent.
    /// Nominal antecedents are finalized immediately and never touched.
    pub fn fuzzify(&mut self, train: &InstanceSet, schema: &Schema) {
        let n = self.antecedents.len();
        let mut finalized = vec![false; n];
        for (i, a) in self.antecedents.iter().enumerate() {
            if !a.is_numeric() {
                finalized[i] = true;
            }
        }

        // decision: maxPurity starts at 0.0 (purities live in [0, 1], so
        // the first candidate of the rule is always accepted).
        let mut max_purity = 0.0_f64;
        loop {
            if finalized.iter().all(|&f| f) {
                break;
            }
            let mut best: Option<(usize, f64, f64)> = None; // (index, support_bound, purity)
            for i in 0..n {
                if finalized[i] {
                    continue;
                }
                if let AntecedentKind::Numeric {
                    attr, side, split_point, ..
                } = self.antecedents[i].kind
                {
                    if let Some((sb, purity)) =
                        best_fuzzification(&self.antecedents, i, attr, side, split_point, train, schema, self.consequent)
                    {
                        let take = match &best {
                            None => true,
                            Some((_, _, best_purity)) => purity > *best_purity,
                        };
                        if take {
                            best = Some((i, sb, purity));
                        }
                    }
                }
            }
            let (idx, sb, purity) = match best {
                Some(v) => v,
                None => break,
            };
            if let AntecedentKind::Numeric {
                support_bound,
                fuzzy,
                split_point,
                ..
            } = &mut self.antecedents[idx].kind
            {
                if purity >= max_purity {
                    *support_bound = sb;
                    *fuzzy = true;
                    max_purity = purity;
                } else {
                    *support_bound = *split_point;
                    *fuzzy = false;
                }
            }
            finalized[idx] = true;
        }

        // Any antecedent that never got fuzzified still needs a
        // well-formed trapezoid.
        for a in self.antecedents.iter_mut() {
            if let AntecedentKind::Numeric {
                attr,
                side,
                split_point,
                support_bound,
                fuzzy,
            } = &mut a.kind
            {
                if !*fuzzy {
                    *support_bound = trivial_support_bound(train, *attr, *side, *split_point);
                }
            }
        }
    }

    /// m-estimate confidence per antecedent prefix. Stored on
    /// `confidences[k-1]` for prefix length `k`; `confidence()` reads the
    /// last entry.
    pub fn calculate_confidences(&mut self, train: &InstanceSet, schema: &Schema, apriori: &[f64]) {
        const M: f64 = 2.0;
        let n = self.antecedents.len();
        self.confidences = vec![f64::NAN; n];
        if n == 0 {
            return;
        }
        let apriori_sum: f64 = apriori.iter().sum();
        let prior = if apriori_sum > 0.0 {
            apriori[self.consequent] / apriori_sum
        } else {
            0.0
        };
        for k in 1..=n {
            let mut acc = 0.0;
            let mut cov = 0.0;
            for inst in &train.instances {
                let mem: f64 = self.antecedents[..k].iter().map(|a| a.covers(inst)).product();
                if mem > 0.0 {
                    let w = inst.weight * mem;
                    cov += w;
                    if inst.class(schema) == Some(self.consequent) {
                        acc += w;
                    }
                }
            }
            self.confidences[k - 1] = (acc + M * prior) / (cov + M);
        }
    }

    pub fn confidence(&self) -> f64 {
        self.confidences.last().copied().unwrap_or(f64::NAN)
    }

    /// Weighted class distribution over the training instances this rule
    /// covers (full-antecedent product membership), normalized to sum to
    /// 1 when non-zero. Reporting only — inference never reads this.
    pub fn calculate_distribution(&mut self, train: &InstanceSet, schema: &Schema) {
        let mut dist = vec![0.0; schema.num_classes()];
        for inst in &train.instances {
            let mem: f64 = self.antecedents.iter().map(|a| a.covers(inst)).product();
            if mem <= 0.0 {
                continue;
            }
            if let Some(c) = inst.class(schema) {
                dist[c] += inst.weight * mem;
            }
        }
        let sum: f64 = dist.iter().sum();
        if sum > 0.0 {
            for x in dist.iter_mut() {
                *x /= sum;
            }
        }
        self.distribution = dist;
    }

    /// Overall fuzzy membership under the configured T-norm. Rules with no
    /// antecedents never vote, so this returns 0 for them.
    pub fn membership(&self, inst: &Instance, tnorm: TNorm) -> f64 {
        if self.antecedents.is_empty() {
            return 0.0;
        }
        match tnorm {
            TNorm::Product => self.antecedents.iter().map(|a| a.covers(inst)).product(),
            TNorm::Min => self
                .antecedents
                .iter()
                .map(|a| a.covers(inst))
                .fold(f64::INFINITY, f64::min),
        }
    }

    pub fn covers_bool(&self, inst: &Instance, tnorm: TNorm) -> bool {
        self.membership(inst, tnorm) > 0.0
    }

    /// Human-readable rendering used by `Model`'s `Display` impl:
    /// `(a and b) => class=C (CF = 0.93)`.
    pub fn describe(&self, schema: &Schema) -> String {
        let class_name = class_value_name(schema, self.consequent);
        if self.antecedents.is_empty() {
            return format!("=> class={class_name}");
        }
        let parts: Vec<String> = self.antecedents.iter().map(|a| a.describe(schema)).collect();
        format!(
            "({}) => class={} (CF = {:.2})",
            parts.join(" and "),
            class_name,
            self.confidence()
        )
    }
}

fn class_value_name(schema: &Schema, class_y: usize) -> String {
    match schema.class_attribute() {
        Attribute::Nominal { values, .. } => values
            .get(class_y)
            .cloned()
            .unwrap_or_else(|| class_y.to_string()),
        Attribute::Numeric { .. } => class_y.to_string(),
    }
}

impl Antecedent {
    pub fn describe(&self, schema: &Schema) -> String {
        match &self.kind {
            AntecedentKind::Nominal { attr, value } => {
                let attr_name = schema.attributes[*attr].name();
                let value_name = match &schema.attributes[*attr] {
                    Attribute::Nominal { values, .. } => {
                        values.get(*value).cloned().unwrap_or_else(|| value.to_string())
                    }
                    Attribute::Numeric { .. } => value.to_string(),
                };
                format!("{attr_name} = {value_name}")
            }
            AntecedentKind::Numeric {
                attr,
                side,
                split_point,
                support_bound,
                fuzzy,
            } => {
                let attr_name = schema.attributes[*attr].name();
                match (side, fuzzy) {
                    (Side::Low, true) => format!("{attr_name} in [{split_point:.3}, {support_bound:.3}]"),
                    (Side::Low, false) => format!("{attr_name} <= {split_point:.3}"),
                    (Side::High, true) => format!("{attr_name} in [{support_bound:.3}, {split_point:.3}]"),
                    (Side::High, false) => format!("{attr_name} >= {split_point:.3}"),
                }
            }
        }
    }
}

/// Shared growth loop used by both `grow` (fresh rule) and `grow_further`
/// (continuing an existing one): repeatedly adds the globally best
/// antecedent over the unused attributes until no attribute helps, the
/// growing data runs out, or accuracy saturates.
fn grow_loop(
    antecedents: &mut Vec<Antecedent>,
    used: &mut [bool],
    mut grow_data: InstanceSet,
    schema: &Schema,
    class_y: usize,
    min_no: f64,
) {
    let feature_indices = schema.feature_indices();
    let total_weight = grow_data.total_weight();
    let def_acc = grow_data.class_weight(class_y);
    let mut def_acc_rate = (def_acc + 1.0) / (total_weight + 1.0);

    loop {
        if grow_data.is_empty() {
            break;
        }
        if feature_indices.iter().all(|&a| used[a]) {
            break;
        }
        if def_acc_rate >= 1.0 {
            break;
        }

        let mut winner: Option<SplitResult> = None;
        for &attr in &feature_indices {
            if used[attr] {
                continue;
            }
            if let Some(candidate) = best_split(&grow_data, schema, attr, def_acc_rate, class_y) {
                let take = match &winner {
                    None => true,
                    Some(w) => candidate.antecedent.gain > w.antecedent.gain,
                };
                if take {
                    winner = Some(candidate);
                }
            }
        }

        let winner = match winner {
            Some(w) => w,
            None => break,
        };
        if winner.antecedent.accurate < min_no {
            break;
        }

        let attr = winner.antecedent.attr();
        let is_nominal = matches!(winner.antecedent.kind, AntecedentKind::Nominal { .. });
        def_acc_rate = winner.antecedent.accuracy_rate;
        let SplitResult { antecedent, bags, value } = winner;
        grow_data = bags
            .into_iter()
            .nth(value)
            .expect("split_data's `value` always indexes a returned bag");
        antecedents.push(antecedent);
        if is_nominal {
            used[attr] = true;
        }
    }
}

fn trapezoid(x: f64, side: Side, split_point: f64, support_bound: f64) -> f64 {
    match side {
        Side::Low => {
            if x <= split_point {
                1.0
            } else if x < support_bound {
                1.0 - (x - split_point) / (support_bound - split_point)
            } else {
                0.0
            }
        }
        Side::High => {
            if x >= split_point {
                1.0
            } else if x > support_bound {
                1.0 - (split_point - x) / (split_point - support_bound)
            } else {
                0.0
            }
        }
    }
}

/// Best candidate `support_bound` (and the purity it achieves) for
/// fuzzifying antecedent `idx`, or `None` if no candidate exists.
#[allow(clippy::too_many_arguments)]
fn best_fuzzification(
    antecedents: &[Antecedent],
    idx: usize,
    attr: usize,
    side: Side,
    split_point: f64,
    train: &InstanceSet,
    schema: &Schema,
    class_y: usize,
) -> Option<(f64, f64)> {
    let mut relevant: Vec<Instance> = train
        .instances
        .iter()
        .filter(|inst| {
            !inst.value_at(attr).is_missing()
                && antecedents
                    .iter()
                    .enumerate()
                    .all(|(k, a)| k == idx || a.covers(inst) > 0.0)
        })
        .cloned()
        .collect();
    relevant.sort_by(|a, b| {
        a.value_at(attr)
            .as_numeric()
            .unwrap()
            .partial_cmp(&b.value_at(attr).as_numeric().unwrap())
            .unwrap()
    });

    let mut candidates: Vec<f64> = relevant
        .iter()
        .filter_map(|i| i.value_at(attr).as_numeric())
        .filter(|&v| match side {
            Side::Low => v > split_point,
            Side::High => v < split_point,
        })
        .collect();
    candidates.dedup_by(|a, b| a == b);
    if candidates.is_empty() {
        return None;
    }

    let _ = schema;
    let mut best: Option<(f64, f64)> = None;
    for sb in candidates {
        let mut acc = 0.0;
        let mut cov = 0.0;
        for inst in &relevant {
            let x = inst.value_at(attr).as_numeric().unwrap();
            let mem = trapezoid(x, side, split_point, sb);
            if mem <= 0.0 {
                continue;
            }
            let w = inst.weight * mem;
            cov += w;
            if inst.class(&train.schema) == Some(class_y) {
                acc += w;
            }
        }
        let purity = if cov > 0.0 { acc / cov } else { 0.0 };
        // ties use strict `>`, so the earliest-scanned candidate keeps the
        // tie among same-purity support bounds.
        let take = match &best {
            None => true,
            Some((_, best_purity)) => purity > *best_purity,
        };
        if take {
            best = Some((sb, purity));
        }
    }
    best
}

/// Fallback bound for an antecedent that stayed crisp: the nearest
/// training value on the outer side of `split_point`, or `split_point`
/// itself if none exists.
fn trivial_support_bound(train: &InstanceSet, attr: usize, side: Side, split_point: f64) -> f64 {
    let mut best: Option<f64> = None;
    for inst in &train.instances {
        if let Some(v) = inst.value_at(attr).as_numeric() {
            let on_outer_side = match side {
                Side::Low => v > split_point,
                Side::High => v < split_point,
            };
            if !on_outer_side {
                continue;
            }
            best = Some(match (best, side) {
                (None, _) => v,
                (Some(b), Side::Low) => b.min(v),
                (Some(b), Side::High) => b.max(v),
            });
        }
    }
    best.unwrap_or(split_point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Attribute, Instance, Schema, Value};
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
    fn grow_recovers_the_axis_aligned_threshold() {
        let data = axis_aligned_data();
        let schema = data.schema.clone();
        let rule = Rule::grow(&data, &schema, 0, 2.0);
        assert_eq!(rule.antecedents.len(), 1);
        match rule.antecedents[0].kind {
            AntecedentKind::Numeric { side, split_point, .. } => {
                assert_eq!(side, Side::Low);
                assert!((split_point - 0.49).abs() < 0.02);
            }
            _ => panic!("expected a numeric antecedent"),
        }
    }

    #[test]
    fn prune_does_nothing_when_no_prefix_beats_baseline() {
        let data = axis_aligned_data();
        let schema = data.schema.clone();
        let mut rule = Rule::grow(&data, &schema, 0, 2.0);
        let len_before = rule.antecedents.len();
        rule.prune(&data, 0, false);
        assert_eq!(rule.antecedents.len(), len_before);
    }

    #[test]
    fn fuzzify_on_noisy_boundary_pushes_support_bound_past_split() {
        let schema = axis_aligned_schema();
        let mut rows: Vec<Instance> = (0..200)
            .map(|i| {
                let x = i as f64 / 200.0;
                let class = if x <= 0.5 { 0 } else { 1 };
                Instance::new(vec![Value::Numeric(x), Value::Nominal(class)], 1.0)
            })
            .collect();
        // flip 10% of labels near the boundary to create overlap.
        for i in 90..110 {
            if i % 2 == 0 {
                if let Value::Nominal(c) = rows[i].values[1] {
                    rows[i].values[1] = Value::Nominal(1 - c);
                }
            }
        }
        let data = InstanceSet::new(schema.clone(), rows);
        let mut rule = Rule::grow(&data, &schema, 0, 2.0);
        rule.fuzzify(&data, &schema);
        match rule.antecedents[0].kind {
            AntecedentKind::Numeric {
                side,
                split_point,
                support_bound,
                fuzzy,
            } => {
                assert_eq!(side, Side::Low);
                if fuzzy {
                    assert!(support_bound > split_point);
                }
            }
            _ => panic!("expected numeric antecedent"),
        }
    }

    #[test]
    fn confidence_is_nan_for_an_empty_rule() {
        let rule = Rule {
            consequent: 0,
            antecedents: Vec::new(),
            confidences: Vec::new(),
            distribution: Vec::new(),
        };
        assert!(rule.confidence().is_nan());
    }

    #[test]
    fn membership_agrees_with_covers_bool_on_the_zero_boundary() {
        let data = axis_aligned_data();
        let schema = data.schema.clone();
        let mut rule = Rule::grow(&data, &schema, 0, 2.0);
        rule.fuzzify(&data, &schema);
        for inst in &data.instances {
            let mem = rule.membership(inst, TNorm::Product);
            assert_eq!(mem > 0.0, rule.covers_bool(inst, TNorm::Product));
        }
    }
}
