//! Per-character resource pools

use std::collections::BTreeMap;

use crate::context::{ContextRef, Host, Value};
use crate::core::error::{Result, SimError};
use crate::rules::Definition;

/// Pool consumed by damage
pub const HIT_POINTS: &str = "hit_points";

/// Evaluated definition of one pool, kept even while the pool is inactive
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRecord {
    pub name: String,
    pub initial: f64,
    pub max_quantity: f64,
    /// Losing this pool removes the character from play
    pub compulsory: bool,
    /// Fitness weight per unit
    pub value: f64,
}

impl ResourceRecord {
    pub fn new(name: impl Into<String>, initial: f64, max_quantity: f64) -> Self {
        Self {
            name: name.into(),
            initial,
            max_quantity,
            compulsory: false,
            value: 0.0,
        }
    }

    pub fn compulsory(mut self, compulsory: bool) -> Self {
        self.compulsory = compulsory;
        self
    }

    pub fn valued(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    /// Evaluate a resource definition against the owning character
    pub fn evaluate(
        name: &str,
        definition: &Definition,
        character: &ContextRef,
        host: &mut dyn Host,
    ) -> Result<Self> {
        let mut field = |key: &str| -> Result<Value> {
            match definition.get(key) {
                Some(expression) => Ok(character.eval(&Value::from(expression), &mut *host)?),
                None => Ok(Value::Null),
            }
        };

        let number = |key: &str, value: Value, default: f64| -> Result<f64> {
            match value {
                Value::Null => Ok(default),
                Value::Number(n) => Ok(n),
                other => Err(SimError::invalid_definition(
                    name,
                    format!("{} must be a number, got {}", key, other.type_name()),
                )),
            }
        };

        let initial = number("initial", field("initial")?, 0.0)?;
        let max_quantity = number("max_quantity", field("max_quantity")?, f64::INFINITY)?;
        let value = number("value", field("value")?, 0.0)?;
        let compulsory = field("compulsory")?.is_truthy();

        Ok(Self {
            name: name.to_string(),
            initial,
            max_quantity,
            compulsory,
            value,
        })
    }
}

/// Named pools of one character.
///
/// Quantities are clamped to `max_quantity` on every change. A pool whose
/// quantity drops to zero or below leaves the active set; its record stays so
/// a later credit recreates it, starting from zero.
#[derive(Debug, Clone, Default)]
pub struct MatchResourceSet {
    records: BTreeMap<String, ResourceRecord>,
    active: BTreeMap<String, f64>,
}

impl MatchResourceSet {
    pub fn new(records: impl IntoIterator<Item = ResourceRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|record| (record.name.clone(), record))
                .collect(),
            active: BTreeMap::new(),
        }
    }

    /// Set every pool to its initial quantity
    pub fn initialize(&mut self) {
        let initials: Vec<(String, f64)> = self
            .records
            .values()
            .map(|record| (record.name.clone(), record.initial))
            .collect();

        for (name, initial) in initials {
            self.store(&name, initial);
        }
    }

    pub fn record(&self, name: &str) -> Result<&ResourceRecord> {
        self.records
            .get(name)
            .ok_or_else(|| SimError::UnknownResource(name.to_string()))
    }

    pub fn records(&self) -> impl Iterator<Item = &ResourceRecord> {
        self.records.values()
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active.contains_key(name)
    }

    /// Current quantity; an inactive pool reads as zero
    pub fn quantity(&self, name: &str) -> Result<f64> {
        self.record(name)?;
        Ok(self.active.get(name).copied().unwrap_or(0.0))
    }

    pub fn max_quantity(&self, name: &str) -> Result<f64> {
        Ok(self.record(name)?.max_quantity)
    }

    /// Missing quantity below the maximum; zero for unbounded pools
    pub fn damage(&self, name: &str) -> Result<f64> {
        let max = self.max_quantity(name)?;
        if max.is_finite() {
            Ok(max - self.quantity(name)?)
        } else {
            Ok(0.0)
        }
    }

    /// Set a pool, returning the stored quantity
    pub fn set(&mut self, name: &str, value: f64) -> Result<f64> {
        self.record(name)?;
        Ok(self.store(name, value))
    }

    pub fn credit(&mut self, name: &str, amount: f64) -> Result<f64> {
        let current = self.quantity(name)?;
        self.set(name, current + amount)
    }

    pub fn debit(&mut self, name: &str, amount: f64) -> Result<f64> {
        let current = self.quantity(name)?;
        self.set(name, current - amount)
    }

    fn store(&mut self, name: &str, value: f64) -> f64 {
        let max = self
            .records
            .get(name)
            .map(|record| record.max_quantity)
            .unwrap_or(f64::INFINITY);
        let quantity = value.min(max);

        if quantity > 0.0 {
            self.active.insert(name.to_string(), quantity);
        } else {
            self.active.remove(name);
        }
        quantity
    }

    /// True once any compulsory pool has left the active set
    pub fn lost_compulsory(&self) -> bool {
        self.records
            .values()
            .any(|record| record.compulsory && !self.active.contains_key(&record.name))
    }

    /// Sum of `quantity * value` over active pools
    pub fn total_value(&self) -> f64 {
        self.active
            .iter()
            .map(|(name, quantity)| {
                let value = self.records.get(name).map(|r| r.value).unwrap_or(0.0);
                quantity * value
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Context, Dice};
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use serde_json::json;

    fn pools() -> MatchResourceSet {
        let mut set = MatchResourceSet::new([
            ResourceRecord::new(HIT_POINTS, 5.0, 10.0)
                .compulsory(true)
                .valued(2.0),
            ResourceRecord::new("gold", 3.0, f64::INFINITY).valued(1.0),
        ]);
        set.initialize();
        set
    }

    #[test]
    fn test_credit_clamps_to_max() {
        let mut set = pools();
        assert_eq!(set.credit(HIT_POINTS, 100.0).unwrap(), 10.0);
        assert_eq!(set.quantity(HIT_POINTS).unwrap(), 10.0);
        assert_eq!(set.damage(HIT_POINTS).unwrap(), 0.0);
    }

    #[test]
    fn test_depleted_pool_is_removed_and_recreated() {
        let mut set = pools();
        set.debit(HIT_POINTS, 7.0).unwrap();

        assert!(!set.is_active(HIT_POINTS));
        assert_eq!(set.quantity(HIT_POINTS).unwrap(), 0.0);
        assert!(set.lost_compulsory());

        set.credit(HIT_POINTS, 4.0).unwrap();
        assert!(set.is_active(HIT_POINTS));
        assert_eq!(set.quantity(HIT_POINTS).unwrap(), 4.0);
        assert!(!set.lost_compulsory());
    }

    #[test]
    fn test_unknown_pool_is_an_error() {
        let mut set = pools();
        assert!(matches!(
            set.credit("mana", 1.0),
            Err(SimError::UnknownResource(name)) if name == "mana"
        ));
    }

    #[test]
    fn test_total_value_counts_active_pools() {
        let mut set = pools();
        assert_eq!(set.total_value(), 5.0 * 2.0 + 3.0);

        set.set("gold", 0.0).unwrap();
        assert_eq!(set.total_value(), 10.0);
    }

    #[test]
    fn test_unbounded_pool_reports_no_damage() {
        let set = pools();
        assert_eq!(set.damage("gold").unwrap(), 0.0);
    }

    #[test]
    fn test_evaluate_against_character() {
        let character = Context::new("ogre")
            .with_property("constitution", 18i64)
            .into_ref();
        let definition = json!({
            "initial": { "context": "constitution" },
            "max_quantity": { "multiply": [{ "context": "constitution" }, 2] },
            "compulsory": true
        });
        let mut host = Dice::new(ChaCha8Rng::seed_from_u64(0));

        let record = ResourceRecord::evaluate(
            HIT_POINTS,
            definition.as_object().unwrap(),
            &character,
            &mut host,
        )
        .unwrap();

        assert_eq!(record.initial, 18.0);
        assert_eq!(record.max_quantity, 36.0);
        assert!(record.compulsory);
        assert_eq!(record.value, 0.0);
    }

    #[test]
    fn test_evaluate_rejects_non_numbers() {
        let character = Context::new("ogre").into_ref();
        let definition = json!({ "initial": "lots" });
        let mut host = Dice::new(ChaCha8Rng::seed_from_u64(0));

        assert!(matches!(
            ResourceRecord::evaluate("x", definition.as_object().unwrap(), &character, &mut host),
            Err(SimError::InvalidDefinition { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_quantity_never_exceeds_max(
            max in 1.0f64..1000.0,
            changes in proptest::collection::vec(-500.0f64..500.0, 1..20),
        ) {
            let mut set = MatchResourceSet::new([ResourceRecord::new("pool", 0.0, max)]);
            for change in changes {
                let stored = set.credit("pool", change).unwrap();
                prop_assert!(stored <= max);
                prop_assert!(set.quantity("pool").unwrap() <= max);
                prop_assert_eq!(set.is_active("pool"), stored > 0.0);
            }
        }
    }
}
