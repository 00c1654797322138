pub mod categories;
pub mod filter;
pub mod manager;
pub mod models;
pub mod orders;
pub mod products;
pub mod schema;
pub mod settings;
pub mod users;

pub use filter::{Filter, Page, SortDirection};
pub use manager::{DatabaseError, DatabaseManager};
