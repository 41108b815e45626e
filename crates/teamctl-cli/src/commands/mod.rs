//! Command handlers grouped by the entity they manage.

pub(crate) mod bots;
pub(crate) mod teams;
pub(crate) mod webhooks;
