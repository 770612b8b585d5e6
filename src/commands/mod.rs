pub mod analytics;
pub mod collect;
pub mod db;
pub mod extract;
pub mod oracle;
pub mod pipeline;
pub mod projects;
pub mod settings;
