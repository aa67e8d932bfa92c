pub mod error;
pub mod export;
pub mod models;
pub mod policy;
pub mod query;

pub use error::{Error, Result};
pub use models::{CustomerRecord, Delivery, NewCustomer};
pub use policy::ReminderPolicy;
pub use query::{apply_view, SortDirection, SortKey, ViewQuery};
