//! Eagerly registered assets.

use rustc_hash::FxHashMap;

use super::AssetDefinition;
use crate::error::AssetError;

/// Name → definition mapping, iterated in registration order.
#[derive(Debug, Default)]
pub struct AssetManager {
    definitions: Vec<AssetDefinition>,
    index: FxHashMap<String, usize>,
}

impl AssetManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition under its name.
    ///
    /// A second registration of the same name fails and leaves the first
    /// one in place.
    pub fn register(&mut self, definition: AssetDefinition) -> Result<(), AssetError> {
        if self.index.contains_key(&definition.name) {
            return Err(AssetError::DuplicateName(definition.name));
        }
        self.index
            .insert(definition.name.clone(), self.definitions.len());
        self.definitions.push(definition);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&AssetDefinition, AssetError> {
        self.index
            .get(name)
            .map(|&i| &self.definitions[i])
            .ok_or_else(|| AssetError::NotFound(name.to_string()))
    }

    pub fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// `(name, definition)` pairs in registration order.
    pub fn all(&self) -> impl Iterator<Item = (&str, &AssetDefinition)> {
        self.definitions.iter().map(|d| (d.name.as_str(), d))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().map(|d| d.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_get() {
        let mut am = AssetManager::new();
        am.register(AssetDefinition::new("app.js", "js/app.js").input("a.js"))
            .unwrap();

        let def = am.get("app.js").unwrap();
        assert_eq!(def.inputs, ["a.js"]);
        assert!(am.has("app.js"));
    }

    #[test]
    fn test_duplicate_keeps_first() {
        let mut am = AssetManager::new();
        am.register(AssetDefinition::new("app.js", "first.js")).unwrap();

        let err = am
            .register(AssetDefinition::new("app.js", "second.js"))
            .unwrap_err();
        assert!(matches!(err, AssetError::DuplicateName(ref n) if n == "app.js"));
        assert_eq!(am.get("app.js").unwrap().output, "first.js");
        assert_eq!(am.len(), 1);
    }

    #[test]
    fn test_get_missing() {
        let am = AssetManager::new();
        assert!(matches!(am.get("nope"), Err(AssetError::NotFound(_))));
    }

    #[test]
    fn test_all_is_ordered_and_restartable() {
        let mut am = AssetManager::new();
        for name in ["c", "a", "b"] {
            am.register(AssetDefinition::new(name, format!("{name}.js")))
                .unwrap();
        }

        let first: Vec<_> = am.all().map(|(n, _)| n).collect();
        let second: Vec<_> = am.all().map(|(n, _)| n).collect();
        assert_eq!(first, ["c", "a", "b"]);
        assert_eq!(first, second);
    }
}
