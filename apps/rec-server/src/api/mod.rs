pub mod admin;
pub mod error;
pub mod experiments;
pub mod fairness;
pub mod feedback;
pub mod health;
pub mod recommendations;
pub mod telemetry;
pub mod traces;
