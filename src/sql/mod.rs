//! Safe SQL builder: identifiers come from the introspected catalog only,
//! values are always bound as parameters.

mod builder;
pub mod params;
pub use builder::*;
pub use params::*;
