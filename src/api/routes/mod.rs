pub mod applications;
pub mod catalog;
pub mod health;
pub mod stats;
