//! Metadata algorithms: construction, exchange, ratios, ghosts and stripping.

pub mod bounds;
pub mod box_builder;
pub mod collective;
pub mod communicator;
pub mod distribute;
pub mod ghost;
pub mod metadata;
pub mod refinement;
pub mod serialize;
pub mod strip;
pub mod wire;

pub use metadata::generate_metadata;
pub use strip::strip_ghost_layers;
