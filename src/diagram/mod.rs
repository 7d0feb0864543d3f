//! ER diagram engine: box geometry, connector routing and rendering.

pub mod geometry;
pub mod render;
pub mod router;

pub use geometry::{BoxBounds, BoxSize, anchor_point, box_size};
pub use render::{DiagramLayout, DiagramRenderer};
pub use router::{PathShape, Route, route, route_all};
