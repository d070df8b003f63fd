//! Per-class RIPPER loop: a build stage that grows and prunes rules until
//! the MDL stop criterion trips, followed by `K` optimization passes that
//! replace, revise or extend the ruleset and re-run `reduceDL` after each
//! pass.

use crate::data::InstanceSet;
use crate::error::FuriaError;
use crate::logger::Logger;
use crate::options::{Options, TNorm};
use crate::rng::FuriaRng;
use crate::rule::Rule;
use crate::rule_stats::{check_finite_dl, data_dl, residual_after, RuleStats};

/// Learn every rule for class `class_y`. Returns the rules in growth
/// order plus the `RuleStats` that describes their final coverage. Fails
/// if any description-length computation along the way produces a
/// non-finite value.
pub fn learn_class(
    train: &InstanceSet,
    class_y: usize,
    apriori: &[f64],
    options: &Options,
    rng: &mut FuriaRng,
    logger: &Logger,
) -> Result<(Vec<Rule>, RuleStats), FuriaError> {
    let schema = train.schema.clone();
    let mut stats = RuleStats::new(&schema, train);

    let class_weight = train.class_weight(class_y);
    if class_weight <= 0.0 {
        logger.log(|| format!("class {class_y}: no training weight, skipped"));
        return Ok((Vec::new(), stats));
    }

    let apriori_sum: f64 = apriori.iter().sum();
    let exp_fp_rate = if apriori_sum > 0.0 {
        apriori[class_y] / apriori_sum
    } else {
        0.0
    };
    let def_dl = data_dl(exp_fp_rate, 0.0, train.total_weight(), 0.0, class_weight);
    let def_dl = check_finite_dl(def_dl, "defDL")?;

    let mut rules = build_stage(train, &schema, class_y, exp_fp_rate, def_dl, options, rng)?;
    stats.compute(&rules, train, &schema, class_y);
    logger.log(|| format!("class {class_y}: build stage found {} rules", rules.len()));

    for pass in 0..options.optimizations {
        rules = optimize_pass(rules, train, &schema, class_y, exp_fp_rate, def_dl, options, rng)?;
        rules = stats.reduce_dl(rules, train, &schema, class_y, exp_fp_rate)?;
        logger.log(|| format!("class {class_y}: optimization pass {pass} left {} rules", rules.len()));
    }

    Ok((rules, stats))
}

struct StopCriterion {
    increase_min_dl: f64,
    stop: bool,
}

fn check_stop(rst: [f64; 6], dl: f64, min_dl: f64, check_error_rate: bool) -> StopCriterion {
    let [cov, _uncov, pos_cov, neg_cov, _pos_uncov, _neg_uncov] = rst;
    let dl_too_big = dl > min_dl + 64.0;
    let no_positives = pos_cov <= 0.0;
    let bad_error_rate = check_error_rate && cov > 0.0 && (neg_cov / cov) >= 0.5;
    StopCriterion {
        increase_min_dl: min_dl.min(dl),
        stop: dl_too_big || no_positives || bad_error_rate,
    }
}

fn stratified_grow_prune(data: &InstanceSet, folds: usize, rng: &mut FuriaRng) -> (InstanceSet, InstanceSet) {
    let folds = data.stratify(folds.max(2), rng);
    let prune_part = folds[0].clone();
    let mut grow_instances = Vec::new();
    for f in &folds[1..] {
        grow_instances.extend(f.instances.clone());
    }
    let grow_part = InstanceSet::new(data.schema.clone(), grow_instances);
    (grow_part, prune_part)
}

fn build_stage(
    train: &InstanceSet,
    schema: &crate::data::Schema,
    class_y: usize,
    exp_fp_rate: f64,
    def_dl: f64,
    options: &Options,
    rng: &mut FuriaRng,
) -> Result<Vec<Rule>, FuriaError> {
    let mut rules: Vec<Rule> = Vec::new();
    let mut residual = train.clone();
    let mut min_dl = def_dl;
    let mut stats = RuleStats::new(schema, train);

    loop {
        if residual.is_empty() || residual.class_weight(class_y) <= 0.0 {
            break;
        }
        let (grow_part, prune_part) = stratified_grow_prune(&residual, options.folds, rng);
        let mut rule = Rule::grow(&grow_part, schema, class_y, options.min_no);
        rule.prune(&prune_part, class_y, false);
        if rule.antecedents.is_empty() {
            break;
        }
        rules.push(rule);
        stats.compute(&rules, train, schema, class_y);
        let rst = *stats.stats.last().unwrap();
        let uncovered = residual.filter(|i| !rules.last().unwrap().covers_bool(i, TNorm::Product));
        let dl = ruleset_dl(&stats, &rules, &uncovered, class_y, exp_fp_rate)?;

        let decision = check_stop(rst, dl, min_dl, options.check_error_rate);
        min_dl = decision.increase_min_dl;
        if decision.stop {
            rules.pop();
            break;
        }
        residual = uncovered;
    }
    Ok(rules)
}

fn optimize_pass(
    mut rules: Vec<Rule>,
    train: &InstanceSet,
    schema: &crate::data::Schema,
    class_y: usize,
    exp_fp_rate: f64,
    def_dl: f64,
    options: &Options,
    rng: &mut FuriaRng,
) -> Result<Vec<Rule>, FuriaError> {
    let original_len = rules.len();
    let mut min_dl = def_dl;
    let mut pos = 0;

    loop {
        if pos >= rules.len() && pos >= original_len {
            let residual = residual_after(&rules, train, schema);
            if residual.is_empty() || residual.class_weight(class_y) <= 0.0 {
                break;
            }
            let mut rule = Rule::grow(&residual, schema, class_y, options.min_no);
            if rule.antecedents.is_empty() {
                break;
            }
            rules.push(rule);

            let mut stats = RuleStats::new(schema, train);
            stats.compute(&rules, train, schema, class_y);
            let rst = *stats.stats.last().unwrap();
            let uncovered = residual.filter(|i| !rules.last().unwrap().covers_bool(i, TNorm::Product));
            let dl = ruleset_dl(&stats, &rules, &uncovered, class_y, exp_fp_rate)?;

            let decision = check_stop(rst, dl, min_dl, options.check_error_rate);
            min_dl = decision.increase_min_dl;
            if decision.stop {
                rules.pop();
                break;
            }
            pos += 1;
            continue;
        }

        if pos >= rules.len() {
            break;
        }

        let residual = residual_after(&rules[..pos], train, schema);
        let (grow_part, prune_part) = stratified_grow_prune(&residual, options.folds, rng);

        let old_rule = rules[pos].clone();

        let mut replace = Rule::grow(&grow_part, schema, class_y, options.min_no);
        replace.prune(&prune_part, class_y, true);

        let covered_by_old = grow_part.filter(|i| old_rule.covers_bool(i, TNorm::Product));
        let mut revision = old_rule.clone();
        revision.grow_further(&covered_by_old, schema, options.min_no);
        revision.prune(&prune_part, class_y, true);

        let mut stats = RuleStats::new(schema, train);
        let dl_for = |stats: &mut RuleStats, candidate: &Rule| -> Result<f64, FuriaError> {
            if candidate.antecedents.is_empty() {
                return Ok(f64::INFINITY);
            }
            let mut trial = rules.clone();
            trial[pos] = candidate.clone();
            stats.compute(&trial, train, schema, class_y);
            stats.relative_dl(pos, exp_fp_rate, candidate.antecedents.len())
        };

        let dl_old = dl_for(&mut stats, &old_rule)?;
        let dl_rev = dl_for(&mut stats, &revision)?;
        let dl_rep = dl_for(&mut stats, &replace)?;

        // tie-break order: old <= revision <= replace.
        let chosen = if dl_old <= dl_rev && dl_old <= dl_rep {
            old_rule
        } else if dl_rev <= dl_rep {
            revision
        } else {
            replace
        };
        rules[pos] = chosen;
        pos += 1;
    }

    Ok(rules)
}

/// Incremental total description length: the rules built so far plus a
/// default-rule coding for whatever remains uncovered.
fn ruleset_dl(
    stats: &RuleStats,
    rules: &[Rule],
    residual_after: &InstanceSet,
    class_y: usize,
    exp_fp_rate: f64,
) -> Result<f64, FuriaError> {
    let mut dl = 0.0;
    for (i, rule) in rules.iter().enumerate() {
        dl += stats.relative_dl(i, exp_fp_rate, rule.antecedents.len())?;
    }
    dl += data_dl(
        exp_fp_rate,
        0.0,
        residual_after.total_weight(),
        0.0,
        residual_after.class_weight(class_y),
    );
    check_finite_dl(dl, "ruleset DL")
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
    fn learn_class_recovers_a_single_separating_rule() {
        let data = axis_aligned_data();
        let options = Options::default();
        let mut rng = FuriaRng::seeded(1);
        let logger = Logger::new(false);
        let (rules, _stats) = learn_class(&data, 0, &[50.0, 50.0], &options, &mut rng, &logger).unwrap();
        assert!(!rules.is_empty());
        for rule in &rules {
            assert_eq!(rule.consequent, 0);
        }
    }

    #[test]
    fn learn_class_skips_a_class_with_zero_weight() {
        let data = axis_aligned_data();
        let options = Options::default();
        let mut rng = FuriaRng::seeded(1);
        let logger = Logger::new(false);
        let (rules, _stats) = learn_class(&data, 5, &[50.0, 50.0], &options, &mut rng, &logger).unwrap();
        assert!(rules.is_empty());
    }
}
