//! Explicitly scoped id → callback registry.
//!
//! Serialized configuration (config files, saved views) can only name a
//! formatter; the registry turns that name back into a live closure. A
//! registry is an ordinary value owned by whoever needs it, never a global.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use crate::cell::{format_date, format_number, group_thousands, CellValue, DisplayOptions};
use crate::column::FormatFn;

type Slots<F> = RwLock<HashMap<String, (u64, F)>>;

/// Maps ids to callbacks. Cloning shares the same underlying map.
pub struct Registry<F: Clone> {
    slots: Arc<Slots<F>>,
    next_generation: Arc<std::sync::atomic::AtomicU64>,
}

impl<F: Clone> Clone for Registry<F> {
    fn clone(&self) -> Self {
        Self {
            slots: Arc::clone(&self.slots),
            next_generation: Arc::clone(&self.next_generation),
        }
    }
}

impl<F: Clone> Default for Registry<F> {
    fn default() -> Self {
        Self {
            slots: Arc::new(RwLock::new(HashMap::new())),
            next_generation: Arc::new(std::sync::atomic::AtomicU64::new(0)),
        }
    }
}

impl<F: Clone> std::fmt::Debug for Registry<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").field("ids", &self.ids()).finish()
    }
}

/// Disposer returned by [`Registry::register`].
///
/// Dropping the token keeps the callback registered; call [`dispose`](Self::dispose)
/// to remove it. Disposing is a no-op if the id has since been re-registered.
#[must_use = "keep the registration to be able to dispose it"]
#[derive(Debug)]
pub struct Registration<F> {
    id: String,
    generation: u64,
    slots: Weak<Slots<F>>,
}

impl<F> Registration<F> {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Remove the callback this token registered. Returns true when it was removed.
    pub fn dispose(self) -> bool {
        let Some(slots) = self.slots.upgrade() else {
            return false;
        };
        let mut slots = slots.write().unwrap_or_else(PoisonError::into_inner);
        match slots.get(&self.id) {
            Some((generation, _)) if *generation == self.generation => {
                slots.remove(&self.id);
                true
            }
            _ => false,
        }
    }
}

impl<F: Clone> Registry<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` under `id`, replacing any previous callback.
    pub fn register(&self, id: impl Into<String>, callback: F) -> Registration<F> {
        let id = id.into();
        let generation = self
            .next_generation
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), (generation, callback));
        Registration {
            id,
            generation,
            slots: Arc::downgrade(&self.slots),
        }
    }

    pub fn unregister(&self, id: &str) -> bool {
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some()
    }

    pub fn get(&self, id: &str) -> Option<F> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .map(|(_, f)| f.clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}

pub type FormatterRegistry = Registry<FormatFn>;

impl Registry<FormatFn> {
    /// Look up `id` and apply it to `value`.
    pub fn format(&self, id: &str, value: &CellValue) -> Option<String> {
        self.get(id).map(|f| f(value))
    }

    /// A registry preloaded with the formatters config files may name.
    pub fn with_builtins() -> Self {
        Self::with_builtins_for(&DisplayOptions::default())
    }

    /// Builtins that honor the given display tokens.
    pub fn with_builtins_for(options: &DisplayOptions) -> Self {
        let registry = Self::new();
        let separator = options.thousands_separator.clone();
        let percent: FormatFn = Arc::new(|v: &CellValue| match v.as_number() {
            Some(n) => format!("{}%", format_number((n * 10_000.0).round() / 100.0)),
            None => v.raw_string(),
        });
        let uppercase: FormatFn = Arc::new(|v: &CellValue| v.raw_string().to_uppercase());
        let lowercase: FormatFn = Arc::new(|v: &CellValue| v.raw_string().to_lowercase());
        let iso_date: FormatFn = Arc::new(|v: &CellValue| match v.as_date() {
            Some(d) => format_date(
                &d,
                &DisplayOptions {
                    date_format: "%Y-%m-%d".to_string(),
                    ..DisplayOptions::default()
                },
            ),
            None => v.raw_string(),
        });
        let thousands: FormatFn = Arc::new(move |v: &CellValue| match v.as_number() {
            Some(n) if n.fract() == 0.0 => {
                let grouped = group_thousands(n.abs() as u64, &separator);
                if n < 0.0 {
                    format!("-{}", grouped)
                } else {
                    grouped
                }
            }
            _ => v.raw_string(),
        });
        // Builtins live for the registry's lifetime; the tokens are not needed.
        let _ = registry.register("percent", percent);
        let _ = registry.register("uppercase", uppercase);
        let _ = registry.register("lowercase", lowercase);
        let _ = registry.register("iso_date", iso_date);
        let _ = registry.register("thousands", thousands);
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_invoke_unregister() {
        let registry: Registry<Arc<dyn Fn(i32) -> i32 + Send + Sync>> = Registry::new();
        let _token = registry.register("double", Arc::new(|x: i32| x * 2));
        assert_eq!(registry.get("double").map(|f| f(4)), Some(8));
        assert!(registry.unregister("double"));
        assert!(registry.get("double").is_none());
        assert!(!registry.unregister("double"));
    }

    #[test]
    fn test_dispose_token() {
        let registry = FormatterRegistry::new();
        let token = registry.register("shout", Arc::new(|v: &CellValue| v.raw_string() + "!"));
        assert_eq!(token.id(), "shout");
        assert_eq!(
            registry.format("shout", &"hi".into()),
            Some("hi!".to_string())
        );
        assert!(token.dispose());
        assert!(!registry.contains("shout"));
    }

    #[test]
    fn test_stale_token_does_not_remove_replacement() {
        let registry = FormatterRegistry::new();
        let old = registry.register("f", Arc::new(|_: &CellValue| "old".to_string()));
        let _new = registry.register("f", Arc::new(|_: &CellValue| "new".to_string()));
        assert!(!old.dispose());
        assert_eq!(registry.format("f", &CellValue::Null), Some("new".to_string()));
    }

    #[test]
    fn test_dispose_after_registry_dropped() {
        let registry = FormatterRegistry::new();
        let token = registry.register("f", Arc::new(|_: &CellValue| String::new()));
        drop(registry);
        assert!(!token.dispose());
    }

    #[test]
    fn test_builtins() {
        let registry = FormatterRegistry::with_builtins();
        assert_eq!(
            registry.ids(),
            vec!["iso_date", "lowercase", "percent", "thousands", "uppercase"]
        );
        assert_eq!(
            registry.format("percent", &0.256.into()),
            Some("25.6%".to_string())
        );
        assert_eq!(
            registry.format("thousands", &(-1234567).into()),
            Some("-1,234,567".to_string())
        );
        assert_eq!(
            registry.format("iso_date", &"03/15/2024".into()),
            Some("2024-03-15".to_string())
        );
        assert_eq!(registry.format("missing", &CellValue::Null), None);
    }
}
