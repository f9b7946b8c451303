//! Result and failure capture for a running operation

use std::sync::Arc;

use gantry_errors::Error;

/// Mutable context handed to an operation body.
///
/// The body may record a result and/or a failure; both are observed through
/// the subsequent finish event. A failure returned by the body is recorded
/// here by the executor before it propagates.
#[derive(Debug, Default)]
pub struct OperationContext {
    failure: Option<Arc<Error>>,
    result: Option<serde_json::Value>,
}

impl OperationContext {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record a failure without aborting the operation body.
    pub fn failed(&mut self, failure: Error) {
        self.failure = Some(Arc::new(failure));
    }

    /// Record the operation's result payload.
    pub fn set_result(&mut self, result: serde_json::Value) {
        self.result = Some(result);
    }

    pub fn failure(&self) -> Option<&Arc<Error>> {
        self.failure.as_ref()
    }

    pub fn result(&self) -> Option<&serde_json::Value> {
        self.result.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_result_and_failure() {
        let mut context = OperationContext::new();
        assert!(context.failure().is_none());
        assert!(context.result().is_none());

        context.set_result(serde_json::json!({"count": 3}));
        context.failed(Error::internal("boom"));

        assert_eq!(context.result().unwrap()["count"], 3);
        assert_eq!(
            context.failure().unwrap().to_string(),
            "internal error: boom"
        );
    }
}
