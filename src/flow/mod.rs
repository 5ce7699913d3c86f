pub mod action;
pub mod conversion;
pub mod definition;
pub mod graph;
pub mod ids;
pub mod template;

pub use action::*;
pub use conversion::*;
pub use definition::*;
pub use graph::*;
pub use ids::*;
pub use template::*;
