pub mod properties;
pub mod sources;
pub mod validation;

pub use properties::*;
pub use sources::*;
pub use validation::*;
