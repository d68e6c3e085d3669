//! 应用启动与停机

pub mod bootstrap;

pub use bootstrap::Bootstrap;
