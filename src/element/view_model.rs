//! View model - what an element's bindings see.
//!
//! One `ViewModel` is built per render. Names resolve in order:
//!
//! 1. state fields
//! 2. calculations, evaluated lazily and memoized for this snapshot
//! 3. handlers, already bound to the element
//!
//! A calculation that (directly or not) asks for itself while being
//! evaluated fails with [`Error::CircularCalculation`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::trace;

use super::definition::CalculationFn;
use crate::data::{Scope, Value};
use crate::error::{Error, Result};

enum CacheEntry {
    Resolving,
    Ready(Value),
}

pub struct ViewModel {
    state: Value,
    calculations: Rc<IndexMap<String, CalculationFn>>,
    handlers: Rc<IndexMap<String, Value>>,
    cache: RefCell<HashMap<String, CacheEntry>>,
}

impl ViewModel {
    pub fn new(
        state: Value,
        calculations: Rc<IndexMap<String, CalculationFn>>,
        handlers: Rc<IndexMap<String, Value>>,
    ) -> Self {
        Self {
            state,
            calculations,
            handlers,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn state(&self) -> &Value {
        &self.state
    }

    fn calculate(&self, name: &str, calculation: &CalculationFn) -> Result<Value> {
        match self.cache.borrow().get(name) {
            Some(CacheEntry::Ready(value)) => return Ok(value.clone()),
            Some(CacheEntry::Resolving) => return Err(Error::CircularCalculation(name.to_string())),
            None => {}
        }

        self.cache
            .borrow_mut()
            .insert(name.to_string(), CacheEntry::Resolving);
        trace!(calculation = name, "evaluating");
        match calculation(self) {
            Ok(value) => {
                self.cache
                    .borrow_mut()
                    .insert(name.to_string(), CacheEntry::Ready(value.clone()));
                Ok(value)
            }
            Err(err) => {
                self.cache.borrow_mut().remove(name);
                Err(err)
            }
        }
    }
}

impl Scope for ViewModel {
    fn lookup(&self, key: &str) -> Result<Value> {
        if let Some(value) = self.state.as_map().and_then(|fields| fields.get(key)) {
            return Ok(value.clone());
        }
        if let Some(calculation) = self.calculations.get(key) {
            return self.calculate(key, calculation);
        }
        Ok(self.handlers.get(key).cloned().unwrap_or(Value::Undefined))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::data::Handler;
    use serde_json::json;

    fn calc(calculate: impl Fn(&dyn Scope) -> Result<Value> + 'static) -> CalculationFn {
        Rc::new(calculate)
    }

    fn calculations(entries: Vec<(&str, CalculationFn)>) -> Rc<IndexMap<String, CalculationFn>> {
        Rc::new(
            entries
                .into_iter()
                .map(|(name, calculation)| (name.to_string(), calculation))
                .collect(),
        )
    }

    #[test]
    fn test_lookup_order() {
        let handler = Value::Handler(Handler::new(|_| {}));
        let view = ViewModel::new(
            Value::from(json!({"name": "state"})),
            calculations(vec![
                ("name", calc(|_| Ok(Value::from("calculated")))),
                ("shout", calc(|scope| {
                    Ok(Value::from(scope.resolve("name")?.to_display_string().to_uppercase()))
                })),
            ]),
            Rc::new(IndexMap::from([("click".to_string(), handler)])),
        );

        assert_eq!(view.lookup("name").unwrap().as_str(), Some("state"));
        assert_eq!(view.lookup("shout").unwrap().as_str(), Some("STATE"));
        assert!(view.lookup("click").unwrap().as_handler().is_some());
        assert!(view.lookup("missing").unwrap().is_undefined());
    }

    #[test]
    fn test_memoized_per_snapshot() {
        let runs = Rc::new(Cell::new(0));
        let counter = runs.clone();
        let table = calculations(vec![(
            "list",
            calc(move |_| {
                counter.set(counter.get() + 1);
                Ok(Value::array([1, 2]))
            }),
        )]);

        let view = ViewModel::new(Value::from(json!({})), table.clone(), Rc::default());
        let first = view.lookup("list").unwrap();
        let second = view.lookup("list").unwrap();
        assert!(first.identical(&second));
        assert_eq!(runs.get(), 1);

        let next = ViewModel::new(Value::from(json!({})), table, Rc::default());
        assert!(!next.lookup("list").unwrap().identical(&first));
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_circular_calculation_fails() {
        let view = ViewModel::new(
            Value::from(json!({})),
            calculations(vec![
                ("a", calc(|scope| scope.resolve("b"))),
                ("b", calc(|scope| scope.resolve("a"))),
            ]),
            Rc::default(),
        );
        let err = view.lookup("a").unwrap_err();
        assert!(matches!(err, Error::CircularCalculation(ref name) if name == "a"));
        // The failed chain leaves nothing cached.
        assert!(matches!(view.lookup("b"), Err(Error::CircularCalculation(_))));
    }
}
