use crate::config::BusSettings;

/// Builds bus subjects of the form `<namespace>.<topic>.<event_kind>`.
///
/// Publishers and subscribers must use the same scheme; topic scoping on the
/// bus is purely string based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectScheme {
    namespace: String,
    event_kind: String,
}

impl SubjectScheme {
    pub fn new(namespace: impl Into<String>, event_kind: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            event_kind: event_kind.into(),
        }
    }

    pub fn for_topic(&self, topic: &str) -> String {
        format!("{}.{}.{}", self.namespace, topic, self.event_kind)
    }
}

impl Default for SubjectScheme {
    fn default() -> Self {
        Self::new("document", "edit")
    }
}

impl From<&BusSettings> for SubjectScheme {
    fn from(settings: &BusSettings) -> Self {
        Self::new(settings.namespace.clone(), settings.event_kind.clone())
    }
}
