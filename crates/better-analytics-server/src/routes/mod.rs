pub mod funnels;
pub mod health;
pub mod journey;
