pub mod azure_alert;
pub mod pass;
