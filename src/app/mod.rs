pub mod console;
pub mod handlers;
pub mod page;
pub mod server;
