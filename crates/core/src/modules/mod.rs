pub mod catalog;
pub mod declaration;
pub mod imports;
pub mod scan;

pub use catalog::*;
pub use declaration::*;
pub use imports::*;
pub use scan::*;
