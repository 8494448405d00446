//! Mapping between topic names and their Ids.

use std::collections::HashMap;

use crate::common::Id;

#[derive(Debug, Clone, Default)]
/// Names of the topics (swarms, pools, pub/sub channels) this node knows about.
///
/// Topic Ids are derived with [Id::of_content] so every node agrees on the Id of a name.
/// The registry only exists to turn Ids back into names for logs and the application.
pub struct TopicRegistry {
    names: HashMap<Id, String>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a topic name and return its Id. Registering twice is a no-op.
    pub fn register(&mut self, name: &str) -> Id {
        let id = Id::of_content(name);

        self.names.entry(id).or_insert_with(|| name.to_string());

        id
    }

    pub fn lookup(&self, id: &Id) -> Option<&str> {
        self.names.get(id).map(|s| s.as_str())
    }

    pub fn contains(&self, id: &Id) -> bool {
        self.names.contains_key(id)
    }

    pub fn unregister(&mut self, id: &Id) -> Option<String> {
        self.names.remove(id)
    }

    /// Name of the topic if known, otherwise the hex encoded Id.
    pub fn display(&self, id: &Id) -> String {
        match self.lookup(id) {
            Some(name) => name.to_string(),
            None => id.to_string(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn register_and_lookup() {
        let mut topics = TopicRegistry::new();

        let id = topics.register("chat");
        assert_eq!(id, Id::of_content("chat"));
        assert_eq!(topics.register("chat"), id);

        assert_eq!(topics.lookup(&id), Some("chat"));
        assert_eq!(topics.display(&id), "chat");

        let unknown = Id::random();
        assert_eq!(topics.lookup(&unknown), None);
        assert_eq!(topics.display(&unknown), unknown.to_string());

        assert_eq!(topics.unregister(&id).as_deref(), Some("chat"));
        assert!(!topics.contains(&id));
    }
}
