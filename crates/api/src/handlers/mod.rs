pub mod debug;
pub mod flows;
pub mod modules;
pub mod webhooks;
