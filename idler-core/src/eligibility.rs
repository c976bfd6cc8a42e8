//! Opt-in label filter.
//!
//! A function is only ever sampled, delayed or scaled when it carries the
//! scale-to-zero label with an enabled value. Matching is case-sensitive.

use crate::function::FunctionDescriptor;

/// Default opt-in label key.
pub const DEFAULT_SCALE_LABEL: &str = "com.openfaas.scale.zero";

/// Label values that enable idler management.
const ENABLED_VALUES: [&str; 2] = ["1", "true"];

/// Pure predicate deciding whether a function is managed by the idler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilityFilter {
    label: String,
}

impl EligibilityFilter {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    /// The label key this filter matches on.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_eligible(&self, function: &FunctionDescriptor) -> bool {
        function
            .label(&self.label)
            .is_some_and(|value| ENABLED_VALUES.contains(&value))
    }
}

impl Default for EligibilityFilter {
    fn default() -> Self {
        Self::new(DEFAULT_SCALE_LABEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FunctionName;

    fn function() -> FunctionDescriptor {
        FunctionDescriptor::new(FunctionName::new("figlet").unwrap(), 1)
    }

    #[test]
    fn test_enabled_values() {
        let filter = EligibilityFilter::default();
        assert!(filter.is_eligible(&function().with_label(DEFAULT_SCALE_LABEL, "1")));
        assert!(filter.is_eligible(&function().with_label(DEFAULT_SCALE_LABEL, "true")));
    }

    #[test]
    fn test_excluded_values() {
        let filter = EligibilityFilter::default();

        // No label map at all
        assert!(!filter.is_eligible(&function()));
        // Map present, key absent
        assert!(!filter.is_eligible(&function().with_label("other", "true")));
        // Case-sensitive
        assert!(!filter.is_eligible(&function().with_label(DEFAULT_SCALE_LABEL, "TRUE")));
        assert!(!filter.is_eligible(&function().with_label(DEFAULT_SCALE_LABEL, "True")));
        assert!(!filter.is_eligible(&function().with_label(DEFAULT_SCALE_LABEL, "0")));
        assert!(!filter.is_eligible(&function().with_label(DEFAULT_SCALE_LABEL, "false")));
        assert!(!filter.is_eligible(&function().with_label(DEFAULT_SCALE_LABEL, "")));
        assert!(!filter.is_eligible(&function().with_label(DEFAULT_SCALE_LABEL, " true")));
    }

    #[test]
    fn test_custom_label() {
        let filter = EligibilityFilter::new("idler.enabled");
        assert_eq!(filter.label(), "idler.enabled");
        assert!(filter.is_eligible(&function().with_label("idler.enabled", "1")));
        assert!(!filter.is_eligible(&function().with_label(DEFAULT_SCALE_LABEL, "1")));
    }
}
