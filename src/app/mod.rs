pub mod console;
pub mod context;
pub mod dispatch;
pub mod status;

pub use console::ConsoleSink;
pub use context::AppContext;
