//! Skirmish Lab - rule-driven tactical matches and the strategies that win them

pub mod context;
pub mod core;
pub mod encounter;
pub mod rules;
pub mod strategy;
