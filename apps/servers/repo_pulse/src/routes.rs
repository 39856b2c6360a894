pub mod analytics;
pub mod explore;
pub mod health;
pub mod repos;
