//! The tabular data model `fit`/`predict` operate over.
//!
//! A minimal `Attribute`/`Instance`/`InstanceSet` trio supporting mixed
//! nominal/numeric attributes with per-instance weights and
//! possibly-missing values.

use std::rc::Rc;

use crate::rng::FuriaRng;

/// One attribute value. `Missing` stands for an unrecorded value on any
/// attribute, nominal or numeric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Nominal(usize),
    Numeric(f64),
    Missing,
}

impl Value {
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            Value::Numeric(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_nominal(&self) -> Option<usize> {
        match self {
            Value::Nominal(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }
}

/// An attribute in the schema: nominal (finite value set) or numeric.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    Nominal { name: String, values: Vec<String> },
    Numeric { name: String },
}

impl Attribute {
    pub fn name(&self) -> &str {
        match self {
            Attribute::Nominal { name, .. } => name,
            Attribute::Numeric { name } => name,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Attribute::Numeric { .. })
    }

    /// Number of distinct values a nominal attribute can take.
    pub fn num_values(&self) -> Option<usize> {
        match self {
            Attribute::Nominal { values, .. } => Some(values.len()),
            Attribute::Numeric { .. } => None,
        }
    }
}

/// The ordered attribute list plus which index is the class attribute.
/// Shared (via `Rc`) across every `InstanceSet` derived from one dataset,
/// so filtering/splitting never has to deep-copy it.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub attributes: Vec<Attribute>,
    pub class_index: usize,
}

impl Schema {
    pub fn new(attributes: Vec<Attribute>, class_index: usize) -> Self {
        Self {
            attributes,
            class_index,
        }
    }

    pub fn class_attribute(&self) -> &Attribute {
        &self.attributes[self.class_index]
    }

    pub fn num_classes(&self) -> usize {
        self.class_attribute().num_values().unwrap_or(0)
    }

    /// Non-class attribute indices, in schema order.
    pub fn feature_indices(&self) -> Vec<usize> {
        (0..self.attributes.len())
            .filter(|&i| i != self.class_index)
            .collect()
    }
}

/// One labeled (or unlabeled-class) row, plus its instance weight.
#[derive(Debug, Clone)]
pub struct Instance {
    pub values: Vec<Value>,
    pub weight: f64,
}

impl Instance {
    pub fn new(values: Vec<Value>, weight: f64) -> Self {
        Self { values, weight }
    }

    /// The class value, or `None` if the class is missing on this instance.
    pub fn class(&self, schema: &Schema) -> Option<usize> {
        self.values[schema.class_index].as_nominal()
    }

    pub fn value_at(&self, attr: usize) -> Value {
        self.values[attr]
    }
}

/// A set of instances sharing one schema.
#[derive(Debug, Clone)]
pub struct InstanceSet {
    pub schema: Rc<Schema>,
    pub instances: Vec<Instance>,
}

impl InstanceSet {
    pub fn new(schema: Rc<Schema>, instances: Vec<Instance>) -> Self {
        Self { schema, instances }
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn total_weight(&self) -> f64 {
        self.instances.iter().map(|i| i.weight).sum()
    }

    /// Sum of instance weight for instances whose class equals `class_index`.
    pub fn class_weight(&self, class_index: usize) -> f64 {
        self.instances
            .iter()
            .filter(|i| i.class(&self.schema) == Some(class_index))
            .map(|i| i.weight)
            .sum()
    }

    /// Per-class weight vector, length `num_classes`. Instances with a
    /// missing class value are excluded.
    pub fn class_weights(&self) -> Vec<f64> {
        let n = self.schema.num_classes();
        let mut out = vec![0.0; n];
        for inst in &self.instances {
            if let Some(c) = inst.class(&self.schema) {
                out[c] += inst.weight;
            }
        }
        out
    }

    /// Stable ascending sort by `attr`. Instances missing `attr` are
    /// shunted to the end. Returns the sorted set and the count of
    /// instances that are *not* missing (the "total" used by numeric
    /// `split_data`).
    pub fn sort_by_attribute(&self, attr: usize) -> (InstanceSet, usize) {
        let mut present: Vec<Instance> = Vec::new();
        let mut missing: Vec<Instance> = Vec::new();
        for inst in &self.instances {
            if inst.value_at(attr).is_missing() {
                missing.push(inst.clone());
            } else {
                present.push(inst.clone());
            }
        }
        present.sort_by(|a, b| {
            let av = a.value_at(attr).as_numeric().unwrap();
            let bv = b.value_at(attr).as_numeric().unwrap();
            av.partial_cmp(&bv).unwrap()
        });
        let total = present.len();
        present.extend(missing);
        (InstanceSet::new(self.schema.clone(), present), total)
    }

    pub fn filter<F: Fn(&Instance) -> bool>(&self, pred: F) -> InstanceSet {
        let kept = self.instances.iter().filter(|i| pred(i)).cloned().collect();
        InstanceSet::new(self.schema.clone(), kept)
    }

    /// Split by a boolean predicate into (matching, non-matching), each
    /// preserving relative order.
    pub fn partition<F: Fn(&Instance) -> bool>(&self, pred: F) -> (InstanceSet, InstanceSet) {
        let mut yes = Vec::new();
        let mut no = Vec::new();
        for inst in &self.instances {
            if pred(inst) {
                yes.push(inst.clone());
            } else {
                no.push(inst.clone());
            }
        }
        (
            InstanceSet::new(self.schema.clone(), yes),
            InstanceSet::new(self.schema.clone(), no),
        )
    }

    /// Split at a fixed index: `(instances[..at], instances[at..])`.
    pub fn split_at(&self, at: usize) -> (InstanceSet, InstanceSet) {
        let at = at.min(self.instances.len());
        let (left, right) = self.instances.split_at(at);
        (
            InstanceSet::new(self.schema.clone(), left.to_vec()),
            InstanceSet::new(self.schema.clone(), right.to_vec()),
        )
    }

    /// Drop instances missing `attr`.
    pub fn delete_with_missing(&self, attr: usize) -> InstanceSet {
        self.filter(|i| !i.value_at(attr).is_missing())
    }

    /// Seeded stratified k-fold partition: instances are grouped by class,
    /// each class-group is shuffled, then dealt round-robin across `folds`
    /// buckets so every fold gets a proportional class mix.
    pub fn stratify(&self, folds: usize, rng: &mut FuriaRng) -> Vec<InstanceSet> {
        assert!(folds >= 1);
        let mut buckets: Vec<Vec<Instance>> = vec![Vec::new(); folds];
        let n_classes = self.schema.num_classes().max(1);
        for class in 0..n_classes {
            let mut group: Vec<Instance> = self
                .instances
                .iter()
                .filter(|i| i.class(&self.schema) == Some(class))
                .cloned()
                .collect();
            rng.shuffle(&mut group);
            for (i, inst) in group.into_iter().enumerate() {
                buckets[i % folds].push(inst);
            }
        }
        // instances with a missing class are dealt round-robin too, after
        // every labeled class has been placed.
        let mut unlabeled: Vec<Instance> = self
            .instances
            .iter()
            .filter(|i| i.class(&self.schema).is_none())
            .cloned()
            .collect();
        rng.shuffle(&mut unlabeled);
        for (i, inst) in unlabeled.into_iter().enumerate() {
            buckets[i % folds].push(inst);
        }
        buckets
            .into_iter()
            .map(|b| InstanceSet::new(self.schema.clone(), b))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn numeric_schema() -> Rc<Schema> {
        Rc::new(Schema::new(
            vec![
                Attribute::Numeric { name: "x".into() },
                Attribute::Nominal {
                    name: "class".into(),
                    values: vec!["a".into(), "b".into()],
                },
            ],
            1,
        ))
    }

    #[test]
    fn sort_by_attribute_shunts_missing_to_end() {
        let schema = numeric_schema();
        let rows = vec![
            Instance::new(vec![Value::Numeric(3.0), Value::Nominal(0)], 1.0),
            Instance::new(vec![Value::Missing, Value::Nominal(1)], 1.0),
            Instance::new(vec![Value::Numeric(1.0), Value::Nominal(0)], 1.0),
        ];
        let set = InstanceSet::new(schema, rows);
        let (sorted, total) = set.sort_by_attribute(0);
        assert_eq!(total, 2);
        assert_eq!(sorted.instances[0].value_at(0).as_numeric(), Some(1.0));
        assert_eq!(sorted.instances[1].value_at(0).as_numeric(), Some(3.0));
        assert!(sorted.instances[2].value_at(0).is_missing());
    }

    #[test]
    fn class_weights_ignore_missing_class() {
        let schema = numeric_schema();
        let rows = vec![
            Instance::new(vec![Value::Numeric(1.0), Value::Nominal(0)], 2.0),
            Instance::new(vec![Value::Numeric(2.0), Value::Missing], 5.0),
        ];
        let set = InstanceSet::new(schema, rows);
        assert_eq!(set.class_weights(), vec![2.0, 0.0]);
        assert_eq!(set.total_weight(), 7.0);
    }

    #[test]
    fn stratify_preserves_total_count() {
        let schema = numeric_schema();
        let rows: Vec<Instance> = (0..20)
            .map(|i| {
                Instance::new(
                    vec![Value::Numeric(i as f64), Value::Nominal(i % 2)],
                    1.0,
                )
            })
            .collect();
        let set = InstanceSet::new(schema, rows);
        let mut rng = FuriaRng::seeded(3);
        let folds = set.stratify(3, &mut rng);
        let total: usize = folds.iter().map(|f| f.len()).sum();
        assert_eq!(total, 20);
    }
}
