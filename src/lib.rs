pub mod cache;
pub mod config;
pub mod directory;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod items;
pub mod layout;
pub mod loader;
pub mod url;
pub mod viewer;
pub mod window;
