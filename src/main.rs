//! CLI binary: fit a `Model` on a synthetic demo dataset and report the
//! learned ruleset plus holdout accuracy as a labeled summary block.

use clap::Parser;

use furia::data::{Attribute, Instance, InstanceSet, Schema, Value};
use furia::options::Cli;
use furia::{FuriaError, Model};

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

/// Class A for `x <= 0.5`, class B otherwise.
fn axis_aligned_demo(n: usize) -> InstanceSet {
    let schema = axis_aligned_schema();
    let rows = (0..n)
        .map(|i| {
            let x = i as f64 / n as f64;
            let class = if x <= 0.5 { 0 } else { 1 };
            Instance::new(vec![Value::Numeric(x), Value::Nominal(class)], 1.0)
        })
        .collect();
    InstanceSet::new(schema, rows)
}

/// Two binary nominal attributes, class = a XOR b.
fn xor_demo() -> InstanceSet {
    let schema = Rc::new(Schema::new(
        vec![
            Attribute::Nominal {
                name: "a".into(),
                values: vec!["0".into(), "1".into()],
            },
            Attribute::Nominal {
                name: "b".into(),
                values: vec!["0".into(), "1".into()],
            },
            Attribute::Nominal {
                name: "class".into(),
                values: vec!["0".into(), "1".into()],
            },
        ],
        2,
    ));
    let mut rows = Vec::new();
    for a in 0..2usize {
        for b in 0..2usize {
            let class = a ^ b;
            // repeat each combination so the learner has enough weight to
            // clear `min_no` during growth.
            for _ in 0..25 {
                rows.push(Instance::new(
                    vec![Value::Nominal(a), Value::Nominal(b), Value::Nominal(class)],
                    1.0,
                ));
            }
        }
    }
    InstanceSet::new(schema, rows)
}

/// Axis-aligned threshold with 10% label noise near the
/// boundary, so fuzzification has something to smooth over.
fn noisy_boundary_demo(n: usize) -> InstanceSet {
    let schema = axis_aligned_schema();
    let band = n / 10;
    let mid = n / 2;
    let rows = (0..n)
        .map(|i| {
            let x = i as f64 / n as f64;
            let mut class = if x <= 0.5 { 0 } else { 1 };
            if i + band / 2 >= mid && i < mid + band / 2 && i % 2 == 0 {
                class = 1 - class;
            }
            Instance::new(vec![Value::Numeric(x), Value::Nominal(class)], 1.0)
        })
        .collect();
    InstanceSet::new(schema, rows)
}

fn holdout_accuracy(model: &Model, holdout: &InstanceSet) -> f64 {
    if holdout.is_empty() {
        return f64::NAN;
    }
    let mut correct = 0.0;
    for inst in &holdout.instances {
        let dist = model.predict_distribution(inst);
        let predicted = dist
            .iter()
            .enumerate()
            .fold((0usize, f64::NEG_INFINITY), |best, (i, &p)| {
                if p > best.1 {
                    (i, p)
                } else {
                    best
                }
            })
            .0;
        if Some(predicted) == inst.class(&holdout.schema) {
            correct += inst.weight;
        }
    }
    correct / holdout.total_weight()
}

fn run(name: &str, data: InstanceSet, options: furia::Options) -> Result<(), FuriaError> {
    let (train, holdout) = data.split_at(data.len() * 4 / 5);
    println!("=== FURIA demo: {name} ({} train / {} holdout) ===\n", train.len(), holdout.len());

    let model = Model::fit(train, options)?;
    print!("{model}");
    println!();
    println!("rules: {}", model.num_rules());
    println!("holdout accuracy: {:.3}", holdout_accuracy(&model, &holdout));
    println!();
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let options = match cli.into_options() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    let result = match cli.demo.as_str() {
        "axis-aligned" => run("axis-aligned threshold", axis_aligned_demo(200), options),
        "xor" => run("nominal XOR", xor_demo(), options),
        "noisy-boundary" => run("noisy boundary", noisy_boundary_demo(400), options),
        other => {
            eprintln!("error: unknown demo '{other}', expected axis-aligned|xor|noisy-boundary");
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
