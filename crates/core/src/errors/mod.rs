pub mod assembly;
pub mod core;

pub use self::assembly::AssemblyError;
pub use self::core::CoreError;
