mod lifecycle;
mod manager;

pub use lifecycle::RequestLifecycle;
pub use manager::SessionManager;
