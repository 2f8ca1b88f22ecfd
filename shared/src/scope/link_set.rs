use std::{collections::HashMap, sync::Arc};

use crate::LinkKey;

/// An immutable set of links. Updates return a new set that shares every
/// link with its predecessor; only the index is copied.
pub struct LinkSet<L> {
    links: HashMap<LinkKey, Arc<L>>,
}

impl<L> LinkSet<L> {
    pub fn empty() -> Self {
        Self {
            links: HashMap::new(),
        }
    }

    pub fn with(&self, key: LinkKey, link: Arc<L>) -> Self {
        let mut links = self.links.clone();
        links.insert(key, link);
        Self { links }
    }

    pub fn without(&self, key: &LinkKey) -> Self {
        let mut links = self.links.clone();
        links.remove(key);
        Self { links }
    }

    pub fn contains(&self, key: &LinkKey) -> bool {
        self.links.contains_key(key)
    }

    pub fn get(&self, key: &LinkKey) -> Option<&Arc<L>> {
        self.links.get(key)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &LinkKey> {
        self.links.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<L>> {
        self.links.values()
    }
}

impl<L> Default for LinkSet<L> {
    fn default() -> Self {
        Self::empty()
    }
}
