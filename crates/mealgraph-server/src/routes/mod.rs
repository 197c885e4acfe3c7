//! HTTP Route Modules
//!
//! Each module owns one endpoint family and exposes a `create_router`
//! constructor taking the state it needs. The top-level router in `lib.rs`
//! merges them.

pub mod chat;
pub mod health;
pub mod meal_planner;
