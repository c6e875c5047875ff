//! Services module for external integrations and business logic

pub mod mailchimp;
