use std::{collections::HashMap, sync::Arc};

use crate::{Generator, LinksetError};

/// Immutable lookup table of generators, keyed by ID and by
/// `(namespace, version)`. Constructed once at startup.
#[derive(Debug)]
pub struct Registry {
    by_id: HashMap<String, Arc<dyn Generator>>,
    by_namespace_version: HashMap<(String, u64), Arc<dyn Generator>>,
}

impl Registry {
    pub fn new(generators: Vec<Arc<dyn Generator>>) -> Self {
        let mut by_id = HashMap::new();
        let mut by_namespace_version = HashMap::new();

        for generator in generators {
            by_id.insert(generator.id().to_string(), Arc::clone(&generator));
            by_namespace_version.insert(
                (generator.namespace().to_string(), generator.version()),
                generator,
            );
        }

        Self {
            by_id,
            by_namespace_version,
        }
    }

    pub fn get(&self, id: &str) -> Result<&Arc<dyn Generator>, LinksetError> {
        self.by_id
            .get(id)
            .ok_or_else(|| LinksetError::GeneratorNotFound(id.to_string()))
    }

    pub fn get_by_namespace_and_version(
        &self,
        namespace: &str,
        version: u64,
    ) -> Result<&Arc<dyn Generator>, LinksetError> {
        self.by_namespace_version
            .get(&(namespace.to_string(), version))
            .ok_or_else(|| LinksetError::GeneratorNotFound(format!("{namespace} v{version}")))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::AnchorLinksetGenerator;

    #[test]
    fn looks_up_by_id_and_by_namespace_version() {
        let generator = Arc::new(AnchorLinksetGenerator::new());
        let id = generator.id().to_string();
        let registry = Registry::new(vec![generator as Arc<dyn Generator>]);

        assert!(registry.get(&id).is_ok());
        assert!(registry.get_by_namespace_and_version("did:anchor", 1).is_ok());
    }

    #[test]
    fn unknown_lookups_are_distinguishable() {
        let registry = Registry::new(Vec::new());

        assert_matches!(
            registry.get("https://w3id.org/unknown#v9"),
            Err(LinksetError::GeneratorNotFound(_))
        );
        assert_matches!(
            registry.get_by_namespace_and_version("did:other", 2),
            Err(LinksetError::GeneratorNotFound(_))
        );
    }
}
