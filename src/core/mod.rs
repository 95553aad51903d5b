pub mod http;
pub mod keyed_lock;
pub mod service_manager;

pub use keyed_lock::KeyedLocks;
pub use service_manager::{Service, ServiceManager};
