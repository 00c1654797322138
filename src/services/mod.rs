pub mod catalog;
pub mod dashboard;
pub mod inventory;
pub mod orders;
pub mod slug;

pub use dashboard::DashboardService;
pub use orders::{OrderError, OrderService};
