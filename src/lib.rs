//! Incremental force-directed layout for hierarchical graphs that keep growing.

pub mod config;
pub mod error;
pub mod graph;
pub mod highlight;
pub mod incremental;
pub mod physics;
pub mod search;
pub mod session;
pub mod simulation;
pub mod source;
pub mod util;
pub mod viewport;

pub use config::LayoutConfig;
pub use error::{ConfigError, GraphError, LayoutError, SourceError, ViewportError};
pub use graph::{Graph, Node, NodeId};
pub use session::LayoutSession;
pub use simulation::{Simulation, SimulationState, TickOutcome};
pub use viewport::{Transform, ZoomController};
