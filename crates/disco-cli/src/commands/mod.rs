pub mod extract;
pub mod hosting_capacity;
pub mod summary_tables;
pub mod thresholds;
pub mod upgrade_cost;
