use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::OrchestratorError;
use crate::tasks::UnitRef;

/// A named sub-operation: a primary unit, its fallback and their deadlines.
pub struct Operation<T> {
    pub(crate) name: Arc<str>,
    pub(crate) primary: UnitRef<T>,
    pub(crate) fallback: UnitRef<T>,
    pub(crate) primary_deadline: Duration,
    pub(crate) fallback_deadline: Duration,
}

impl<T> Operation<T> {
    /// Creates an operation. Both deadlines must be non-zero.
    pub fn new(
        name: impl Into<Arc<str>>,
        primary: UnitRef<T>,
        fallback: UnitRef<T>,
        primary_deadline: Duration,
        fallback_deadline: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            primary,
            fallback,
            primary_deadline,
            fallback_deadline,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn validate(&self) -> Result<(), OrchestratorError> {
        if self.name.is_empty() {
            return Err(OrchestratorError::invalid("operation name is empty"));
        }
        if self.primary_deadline.is_zero() || self.fallback_deadline.is_zero() {
            return Err(OrchestratorError::invalid(format!(
                "operation {:?} needs non-zero primary and fallback deadlines",
                self.name
            )));
        }
        Ok(())
    }
}

impl<T> Clone for Operation<T> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            primary: Arc::clone(&self.primary),
            fallback: Arc::clone(&self.fallback),
            primary_deadline: self.primary_deadline,
            fallback_deadline: self.fallback_deadline,
        }
    }
}

impl<T: Send + 'static> fmt::Debug for Operation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("primary", &self.primary.name())
            .field("fallback", &self.fallback.name())
            .field("primary_deadline", &self.primary_deadline)
            .field("fallback_deadline", &self.fallback_deadline)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TaskContext;
    use crate::tasks::UnitFn;

    fn unit(name: &'static str) -> UnitRef<String> {
        UnitFn::arc(name, |_ctx: TaskContext| async move { Ok(String::from("v")) })
    }

    #[test]
    fn debug_names_both_units() {
        let op = Operation::new(
            "lookup",
            unit("primary"),
            unit("fallback"),
            Duration::from_millis(100),
            Duration::from_millis(200),
        );
        let text = format!("{:?}", op.clone());
        assert!(text.contains("\"lookup\""));
        assert!(text.contains("\"primary\""));
        assert!(text.contains("\"fallback\""));
        assert!(text.contains("200ms"));
    }

    #[test]
    fn zero_deadline_is_rejected() {
        let op = Operation::new(
            "lookup",
            unit("primary"),
            unit("fallback"),
            Duration::ZERO,
            Duration::from_millis(200),
        );
        assert!(op.validate().is_err());

        let unnamed = Operation::new(
            "",
            unit("primary"),
            unit("fallback"),
            Duration::from_millis(1),
            Duration::from_millis(1),
        );
        assert!(unnamed.validate().is_err());
    }
}
