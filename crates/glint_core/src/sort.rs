//! Sort engine for tabular collections
//!
//! [`apply_sort`] orders a collection of bindable records by a [`SortSpec`]:
//!
//! - With a custom comparator, the comparator decides.
//! - Otherwise with a custom key extractor, extracted keys are compared with
//!   [`Value::total_cmp`].
//! - Otherwise a composite key is built from the spec's properties. Each key
//!   position is coerced to a single kind so mixed columns (`[3, "5", nil]`)
//!   sort without errors: one shared kind is kept as is, otherwise any int
//!   coerces the column to ints, else any float to floats, else everything to
//!   strings. A type hint for a property forces its coercion.
//!
//! Sorting is stable and ascending; a descending sort reverses the ascending
//! result as a whole, so tied records also swap order.
//!
//! [`SortState`] tracks the active sort of a table and implements the
//! column-click behaviour: same target toggles direction, a new target resets
//! to ascending, and the table's additional sort properties are appended
//! behind a clicked column that sorts by a single property.

use std::cmp::Ordering;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::path::PropertyPath;
use crate::proxy::ObjectRef;
use crate::value::{Value, ValueKind};

/// Custom record comparator
pub type Comparator = Rc<dyn Fn(&ObjectRef, &ObjectRef) -> Result<Ordering>>;

/// Custom sort key extractor
pub type KeyExtractor = Rc<dyn Fn(&ObjectRef) -> Result<Value>>;

/// Sort direction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn is_descending(self) -> bool {
        self == SortDirection::Descending
    }
}

/// Forced key coercion for a property
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeHint {
    Integer,
    Float,
    String,
}

/// Ordering request over one or more properties
#[derive(Clone)]
pub struct SortSpec {
    properties: Vec<PropertyPath>,
    direction: SortDirection,
    type_hints: FxHashMap<String, TypeHint>,
    comparator: Option<Comparator>,
    key_extractor: Option<KeyExtractor>,
}

impl SortSpec {
    /// Ascending spec over `properties`; the first is the primary key
    pub fn new<I, S>(properties: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let properties = properties
            .into_iter()
            .map(|p| PropertyPath::parse(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::from_paths(properties)
    }

    pub fn from_paths(properties: Vec<PropertyPath>) -> Result<Self> {
        if properties.is_empty() {
            return Err(CoreError::EmptySortSpec);
        }
        Ok(Self {
            properties,
            direction: SortDirection::Ascending,
            type_hints: FxHashMap::default(),
            comparator: None,
            key_extractor: None,
        })
    }

    pub fn with_direction(mut self, direction: SortDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn descending(self) -> Self {
        self.with_direction(SortDirection::Descending)
    }

    pub fn with_type_hint(mut self, property: impl Into<String>, hint: TypeHint) -> Self {
        self.type_hints.insert(property.into(), hint);
        self
    }

    pub fn with_type_hints(mut self, hints: &FxHashMap<String, TypeHint>) -> Self {
        self.type_hints
            .extend(hints.iter().map(|(k, v)| (k.clone(), *v)));
        self
    }

    pub fn with_comparator(
        self,
        compare: impl Fn(&ObjectRef, &ObjectRef) -> Ordering + 'static,
    ) -> Self {
        self.try_with_comparator(move |a, b| Ok(compare(a, b)))
    }

    pub fn try_with_comparator(
        mut self,
        compare: impl Fn(&ObjectRef, &ObjectRef) -> Result<Ordering> + 'static,
    ) -> Self {
        self.comparator = Some(Rc::new(compare));
        self
    }

    /// Reuse a comparator; repeated requests with the same one toggle direction
    pub fn with_shared_comparator(mut self, compare: Comparator) -> Self {
        self.comparator = Some(compare);
        self
    }

    pub fn with_shared_key_extractor(mut self, extract: KeyExtractor) -> Self {
        self.key_extractor = Some(extract);
        self
    }

    pub fn with_key_extractor(self, extract: impl Fn(&ObjectRef) -> Value + 'static) -> Self {
        self.try_with_key_extractor(move |record| Ok(extract(record)))
    }

    pub fn try_with_key_extractor(
        mut self,
        extract: impl Fn(&ObjectRef) -> Result<Value> + 'static,
    ) -> Self {
        self.key_extractor = Some(Rc::new(extract));
        self
    }

    pub fn properties(&self) -> &[PropertyPath] {
        &self.properties
    }

    pub fn property_names(&self) -> Vec<&str> {
        self.properties.iter().map(PropertyPath::as_str).collect()
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    pub fn type_hint(&self, property: &str) -> Option<TypeHint> {
        self.type_hints.get(property).copied()
    }

    pub fn comparator(&self) -> Option<&Comparator> {
        self.comparator.as_ref()
    }

    pub fn key_extractor(&self) -> Option<&KeyExtractor> {
        self.key_extractor.as_ref()
    }

    pub fn has_custom_sort(&self) -> bool {
        self.comparator.is_some() || self.key_extractor.is_some()
    }

    /// Same sort target: properties and custom sort functions
    fn same_target(&self, other: &SortSpec) -> bool {
        fn same<T: ?Sized>(a: &Option<Rc<T>>, b: &Option<Rc<T>>) -> bool {
            match (a, b) {
                (None, None) => true,
                (Some(a), Some(b)) => Rc::ptr_eq(a, b),
                _ => false,
            }
        }
        self.properties == other.properties
            && same(&self.comparator, &other.comparator)
            && same(&self.key_extractor, &other.key_extractor)
    }
}

impl std::fmt::Debug for SortSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SortSpec")
            .field("properties", &self.property_names())
            .field("direction", &self.direction)
            .field("type_hints", &self.type_hints)
            .field("comparator", &self.comparator.is_some())
            .field("key_extractor", &self.key_extractor.is_some())
            .finish()
    }
}

/// Order `records` according to `spec`
///
/// Errors from custom sort functions or unreadable properties abort the sort.
pub fn apply_sort(spec: &SortSpec, records: &[ObjectRef]) -> Result<Vec<ObjectRef>> {
    let mut sorted = if let Some(compare) = &spec.comparator {
        sort_with_comparator(compare, records)?
    } else if let Some(extract) = &spec.key_extractor {
        let keys = records
            .iter()
            .map(|record| extract(record))
            .collect::<Result<Vec<Value>>>()?;
        let mut order: Vec<usize> = (0..records.len()).collect();
        order.sort_by(|&a, &b| keys[a].total_cmp(&keys[b]));
        order.into_iter().map(|i| records[i].clone()).collect()
    } else {
        let columns = spec
            .properties
            .iter()
            .map(|path| {
                let raw = records
                    .iter()
                    .map(|record| path.read(record))
                    .collect::<Result<Vec<Value>>>()?;
                Ok(coerce_column(raw, spec.type_hint(path.as_str())))
            })
            .collect::<Result<Vec<Vec<Value>>>>()?;
        let mut order: Vec<usize> = (0..records.len()).collect();
        order.sort_by(|&a, &b| {
            columns
                .iter()
                .map(|column| column[a].total_cmp(&column[b]))
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
        order.into_iter().map(|i| records[i].clone()).collect()
    };

    if spec.direction.is_descending() {
        sorted.reverse();
    }
    Ok(sorted)
}

fn sort_with_comparator(compare: &Comparator, records: &[ObjectRef]) -> Result<Vec<ObjectRef>> {
    try_merge_sort(records, |a, b| compare(a, b))
}

/// Stable bottom-up merge sort over a fallible comparator
///
/// Returns the first comparator error. `slice::sort_by` may panic when a
/// comparator is not a total order, so user comparators never reach it.
fn try_merge_sort<T, F>(items: &[T], mut compare: F) -> Result<Vec<T>>
where
    T: Clone,
    F: FnMut(&T, &T) -> Result<Ordering>,
{
    let len = items.len();
    let mut current = items.to_vec();
    let mut width = 1;
    while width < len {
        let mut merged = Vec::with_capacity(len);
        for start in (0..len).step_by(2 * width) {
            let mid = (start + width).min(len);
            let end = (start + 2 * width).min(len);
            let (mut left, mut right) = (start, mid);
            while left < mid && right < end {
                // ties take the left run
                if compare(&current[right], &current[left])? == Ordering::Less {
                    merged.push(current[right].clone());
                    right += 1;
                } else {
                    merged.push(current[left].clone());
                    left += 1;
                }
            }
            merged.extend_from_slice(&current[left..mid]);
            merged.extend_from_slice(&current[right..end]);
        }
        current = merged;
        width *= 2;
    }
    Ok(current)
}

/// Coercion applied to one key position
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Coercion {
    Keep,
    Integer,
    Float,
    String,
}

impl From<TypeHint> for Coercion {
    fn from(hint: TypeHint) -> Self {
        match hint {
            TypeHint::Integer => Coercion::Integer,
            TypeHint::Float => Coercion::Float,
            TypeHint::String => Coercion::String,
        }
    }
}

fn infer_coercion(values: &[Value]) -> Coercion {
    let Some(first) = values.first().map(Value::kind) else {
        return Coercion::Keep;
    };
    if values.iter().all(|v| v.kind() == first) {
        Coercion::Keep
    } else if values.iter().any(|v| v.kind() == ValueKind::Int) {
        Coercion::Integer
    } else if values.iter().any(|v| v.kind() == ValueKind::Float) {
        Coercion::Float
    } else {
        Coercion::String
    }
}

fn coerce_column(values: Vec<Value>, hint: Option<TypeHint>) -> Vec<Value> {
    let coercion = hint.map(Coercion::from).unwrap_or_else(|| infer_coercion(&values));
    match coercion {
        Coercion::Keep => values,
        Coercion::Integer => values.iter().map(|v| Value::Int(v.to_int())).collect(),
        Coercion::Float => values.iter().map(|v| Value::Float(v.to_float())).collect(),
        Coercion::String => values
            .iter()
            .map(|v| Value::Str(v.to_display_string()))
            .collect(),
    }
}

// =============================================================================
// SORT STATE
// =============================================================================

/// The active sort of a table
#[derive(Clone, Default, Debug)]
pub struct SortState {
    current: Option<SortSpec>,
    additional: Vec<PropertyPath>,
}

impl SortState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Properties appended behind every column sort
    pub fn set_additional_properties<I, S>(&mut self, properties: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.additional = properties
            .into_iter()
            .map(|p| PropertyPath::parse(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(())
    }

    pub fn additional_properties(&self) -> &[PropertyPath] {
        &self.additional
    }

    /// The effective spec, if a sort is active
    pub fn current(&self) -> Option<&SortSpec> {
        self.current.as_ref()
    }

    pub fn direction(&self) -> SortDirection {
        self.current
            .as_ref()
            .map(SortSpec::direction)
            .unwrap_or_default()
    }

    /// Install a spec as is (initial sort from configuration)
    pub fn set(&mut self, spec: SortSpec) {
        self.current = Some(spec);
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Apply a sort request for a column
    ///
    /// A single-property request is followed by the additional sort
    /// properties it does not already name; a request naming several
    /// properties is used as is. Requesting the current target again
    /// toggles the direction; any other target starts ascending.
    pub fn request(&mut self, request: SortSpec) -> &SortSpec {
        let mut properties = request.properties.clone();
        if request.properties.len() == 1 {
            properties.extend(
                self.additional
                    .iter()
                    .filter(|p| !request.properties.contains(p))
                    .cloned(),
            );
        }

        let mut merged = request;
        merged.properties = properties;

        let direction = match &self.current {
            Some(current) if current.same_target(&merged) => current.direction.toggled(),
            _ => SortDirection::Ascending,
        };
        merged.direction = direction;

        tracing::debug!(
            "sort by {:?} {:?}",
            merged.property_names(),
            merged.direction
        );
        self.current.insert(merged)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::model::Model;
    use crate::proxy::PropertyAccess;

    fn person(name: &str, age: impl Into<Value>) -> ObjectRef {
        Model::builder("Person")
            .attr("name", name)
            .attr("age", age)
            .build()
    }

    fn names(records: &[ObjectRef]) -> Vec<String> {
        records
            .iter()
            .map(|r| r.get_property("name").unwrap().to_display_string())
            .collect()
    }

    fn people() -> Vec<ObjectRef> {
        vec![person("Bob", 30), person("Ann", 30), person("Cy", 20)]
    }

    #[test]
    fn test_composite_key_scenario() {
        let records = people();
        let spec = SortSpec::new(["age", "name"]).unwrap();

        let ascending = apply_sort(&spec, &records).unwrap();
        assert_eq!(names(&ascending), ["Cy", "Ann", "Bob"]);

        let descending = apply_sort(&spec.clone().descending(), &records).unwrap();
        assert_eq!(names(&descending), ["Bob", "Ann", "Cy"]);
    }

    #[test]
    fn test_descending_reverses_ties() {
        let records = people();
        let spec = SortSpec::new(["age"]).unwrap();

        let ascending = apply_sort(&spec, &records).unwrap();
        assert_eq!(names(&ascending), ["Cy", "Bob", "Ann"]);

        let mut expected = names(&ascending);
        expected.reverse();
        let descending = apply_sort(&spec.descending(), &records).unwrap();
        assert_eq!(names(&descending), expected);
    }

    #[test]
    fn test_mixed_column_coerces_to_integer() {
        let records = vec![person("three", 3), person("five", "5"), person("none", Value::Nil)];
        let spec = SortSpec::new(["age"]).unwrap();
        let sorted = apply_sort(&spec, &records).unwrap();
        assert_eq!(names(&sorted), ["none", "three", "five"]);
    }

    #[test]
    fn test_mixed_column_coerces_to_float_then_string() {
        let floats = vec![person("a", 2.5), person("b", "1.5"), person("c", Value::Nil)];
        let sorted = apply_sort(&SortSpec::new(["age"]).unwrap(), &floats).unwrap();
        assert_eq!(names(&sorted), ["c", "b", "a"]);

        let strings = vec![person("a", "b"), person("b", true), person("c", Value::Nil)];
        let sorted = apply_sort(&SortSpec::new(["age"]).unwrap(), &strings).unwrap();
        // "" < "b" < "true"
        assert_eq!(names(&sorted), ["c", "a", "b"]);
    }

    #[test]
    fn test_type_hint_forces_coercion() {
        let records = vec![person("a", "10"), person("b", "9"), person("c", "100")];
        let lexical = apply_sort(&SortSpec::new(["age"]).unwrap(), &records).unwrap();
        assert_eq!(names(&lexical), ["a", "c", "b"]);

        let spec = SortSpec::new(["age"])
            .unwrap()
            .with_type_hint("age", TypeHint::Integer);
        let numeric = apply_sort(&spec, &records).unwrap();
        assert_eq!(names(&numeric), ["b", "a", "c"]);
    }

    #[test]
    fn test_comparator_takes_precedence() {
        let records = people();
        let spec = SortSpec::new(["age"])
            .unwrap()
            .with_type_hint("age", TypeHint::String)
            .with_key_extractor(|r| r.get_property("age").unwrap_or_default())
            .with_comparator(|a, b| {
                let a = a.get_property("name").unwrap_or_default();
                let b = b.get_property("name").unwrap_or_default();
                b.total_cmp(&a)
            });
        let sorted = apply_sort(&spec, &records).unwrap();
        assert_eq!(names(&sorted), ["Cy", "Bob", "Ann"]);
    }

    #[test]
    fn test_key_extractor_bypasses_coercion() {
        let records = people();
        let spec = SortSpec::new(["name"])
            .unwrap()
            .with_key_extractor(|r| {
                Value::from(r.get_property("name").unwrap_or_default().to_display_string().len())
            });
        let sorted = apply_sort(&spec, &records).unwrap();
        assert_eq!(names(&sorted), ["Cy", "Bob", "Ann"]);
    }

    #[test]
    fn test_comparator_error_aborts_sort() {
        let records = people();
        let spec = SortSpec::new(["age"])
            .unwrap()
            .try_with_comparator(|_, _| Err(CoreError::sort("boom")));
        assert!(matches!(
            apply_sort(&spec, &records),
            Err(CoreError::Sort(ref reason)) if reason == "boom"
        ));
    }

    #[test]
    fn test_comparator_failing_midway_returns_error() {
        let records: Vec<ObjectRef> = (0..50_i64)
            .map(|i| person(&format!("p{}", i), (i * 7919) % 50))
            .collect();
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let spec = SortSpec::new(["age"]).unwrap().try_with_comparator(move |a, b| {
            counter.set(counter.get() + 1);
            if counter.get() >= 17 {
                return Err(CoreError::sort("comparator gave up"));
            }
            let a = a.get_property("age").unwrap_or_default();
            let b = b.get_property("age").unwrap_or_default();
            Ok(a.total_cmp(&b))
        });

        assert!(matches!(
            apply_sort(&spec, &records),
            Err(CoreError::Sort(ref reason)) if reason == "comparator gave up"
        ));
        assert_eq!(calls.get(), 17);
    }

    #[test]
    fn test_inconsistent_comparator_keeps_every_record() {
        let records: Vec<ObjectRef> = (0..2000_i64).map(|i| person(&format!("p{}", i), i)).collect();
        let seed = Rc::new(Cell::new(0x2545_f491_u64));
        let state = seed.clone();
        let spec = SortSpec::new(["age"]).unwrap().with_comparator(move |_, _| {
            let mut x = state.get();
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            state.set(x);
            match x % 3 {
                0 => Ordering::Less,
                1 => Ordering::Equal,
                _ => Ordering::Greater,
            }
        });

        let sorted = apply_sort(&spec, &records).unwrap();
        assert_eq!(sorted.len(), records.len());
        let mut seen: Vec<String> = names(&sorted);
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), records.len());
    }

    #[test]
    fn test_comparator_sort_is_stable() {
        let records = vec![person("a", 2), person("b", 1), person("c", 2), person("d", 1)];
        let spec = SortSpec::new(["age"]).unwrap().with_comparator(|a, b| {
            let a = a.get_property("age").unwrap_or_default();
            let b = b.get_property("age").unwrap_or_default();
            a.total_cmp(&b)
        });
        let sorted = apply_sort(&spec, &records).unwrap();
        assert_eq!(names(&sorted), ["b", "d", "a", "c"]);
    }

    #[test]
    fn test_missing_property_is_error() {
        let records = people();
        let spec = SortSpec::new(["height"]).unwrap();
        assert!(matches!(
            apply_sort(&spec, &records),
            Err(CoreError::UnknownProperty { .. })
        ));
    }

    #[test]
    fn test_nested_sort_key() {
        let city = |name: &str| Value::object(Model::with_attributes("City", [("name", name)]));
        let records: Vec<ObjectRef> = vec![
            Model::builder("P").attr("name", "x").attr("city", city("Oslo")).build().as_object(),
            Model::builder("P").attr("name", "y").attr("city", city("Bern")).build().as_object(),
        ];
        let sorted = apply_sort(&SortSpec::new(["city.name"]).unwrap(), &records).unwrap();
        assert_eq!(names(&sorted), ["y", "x"]);
    }

    #[test]
    fn test_empty_spec_rejected() {
        assert!(matches!(
            SortSpec::new(Vec::<String>::new()),
            Err(CoreError::EmptySortSpec)
        ));
    }

    #[test]
    fn test_sort_state_toggles_and_resets() {
        let mut state = SortState::new();
        let age = SortSpec::new(["age"]).unwrap();
        let name = SortSpec::new(["name"]).unwrap();

        assert_eq!(state.request(age.clone()).direction(), SortDirection::Ascending);
        assert_eq!(state.request(age.clone()).direction(), SortDirection::Descending);
        assert_eq!(state.request(age.clone()).direction(), SortDirection::Ascending);
        assert_eq!(state.request(name).direction(), SortDirection::Ascending);
        assert_eq!(state.request(age).direction(), SortDirection::Ascending);
    }

    #[test]
    fn test_sort_state_merges_additional_properties() {
        let mut state = SortState::new();
        state.set_additional_properties(["name", "age"]).unwrap();

        let spec = state.request(SortSpec::new(["age"]).unwrap());
        assert_eq!(spec.property_names(), ["age", "name"]);

        let spec = state.request(SortSpec::new(["city"]).unwrap());
        assert_eq!(spec.property_names(), ["city", "name", "age"]);
    }

    #[test]
    fn test_sort_state_keeps_multi_property_requests() {
        let mut state = SortState::new();
        state.set_additional_properties(["city"]).unwrap();

        let spec = state.request(SortSpec::new(["age", "name"]).unwrap());
        assert_eq!(spec.property_names(), ["age", "name"]);

        let spec = state.request(SortSpec::new(["age"]).unwrap());
        assert_eq!(spec.property_names(), ["age", "city"]);
    }

    #[test]
    fn test_sort_state_distinguishes_custom_sorts() {
        let mut state = SortState::new();
        let plain = SortSpec::new(["name"]).unwrap();
        let custom = SortSpec::new(["name"]).unwrap().with_comparator(|_, _| Ordering::Equal);

        state.request(plain);
        assert_eq!(state.request(custom.clone()).direction(), SortDirection::Ascending);
        assert_eq!(state.request(custom).direction(), SortDirection::Descending);
    }
}
