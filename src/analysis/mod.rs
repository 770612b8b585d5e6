pub mod aggregate;
pub mod chart;
pub mod registry;
pub mod score;
