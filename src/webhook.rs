//! The runtime webhook binding (C5): an immutable triple of one endpoint
//! path, one receiver, an ordered list of transformations, and a
//! non-empty list of dispatchers.

use crate::registry::ConfigError;
use crate::stage::{Dispatcher, Receiver, Transformation};
use std::sync::Arc;

pub struct Webhook {
    endpoint: String,
    receiver: Arc<dyn Receiver>,
    transformations: Vec<Arc<dyn Transformation>>,
    dispatchers: Vec<Arc<dyn Dispatcher>>,
}

impl Webhook {
    pub fn new(
        endpoint: impl Into<String>,
        receiver: Arc<dyn Receiver>,
        transformations: Vec<Arc<dyn Transformation>>,
        dispatchers: Vec<Arc<dyn Dispatcher>>,
    ) -> Result<Self, ConfigError> {
        let endpoint = endpoint.into();

        if endpoint.is_empty() {
            return Err(ConfigError::Invalid("webhook endpoint must not be empty".to_string()));
        }
        if dispatchers.is_empty() {
            return Err(ConfigError::Invalid(format!("webhook '{endpoint}' has no dispatchers")));
        }

        Ok(Webhook {
            endpoint,
            receiver,
            transformations,
            dispatchers,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn receiver(&self) -> &Arc<dyn Receiver> {
        &self.receiver
    }

    pub fn transformations(&self) -> &[Arc<dyn Transformation>] {
        &self.transformations
    }

    pub fn dispatchers(&self) -> &[Arc<dyn Dispatcher>] {
        &self.dispatchers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::dispatchers::log::LogDispatcher;
    use crate::stages::receivers::passthrough::PassThroughReceiver;
    use crate::stages::transformations::pass::NullTransformation;

    #[test]
    fn rejects_empty_endpoint() {
        let receiver: Arc<dyn Receiver> = Arc::new(PassThroughReceiver::from_uri("passthrough://").unwrap());
        let dispatcher: Arc<dyn Dispatcher> = Arc::new(LogDispatcher::from_uri("log://").unwrap());

        let err = Webhook::new("", receiver, vec![], vec![dispatcher]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_empty_dispatchers() {
        let receiver: Arc<dyn Receiver> = Arc::new(PassThroughReceiver::from_uri("passthrough://").unwrap());

        let err = Webhook::new("/e", receiver, vec![], vec![]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn exposes_accessors() {
        let receiver: Arc<dyn Receiver> = Arc::new(PassThroughReceiver::from_uri("passthrough://").unwrap());
        let transformation: Arc<dyn Transformation> = Arc::new(NullTransformation::from_uri("pass://").unwrap());
        let dispatcher: Arc<dyn Dispatcher> = Arc::new(LogDispatcher::from_uri("log://").unwrap());

        let webhook = Webhook::new("/e", receiver, vec![transformation], vec![dispatcher]).unwrap();

        assert_eq!(webhook.endpoint(), "/e");
        assert_eq!(webhook.transformations().len(), 1);
        assert_eq!(webhook.dispatchers().len(), 1);
    }
}
