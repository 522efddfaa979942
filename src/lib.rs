// Orbital Mesh - Interplanetary network simulation
// Keplerian body placement plus A* routing over a generated node mesh

pub mod body_registry;
pub mod config;
pub mod error;
pub mod geography;
pub mod network;
pub mod orbital_mechanics;
pub mod pathfinding;
pub mod simulation;

pub use body_registry::BodyRegistry;
pub use config::MeshConfig;
pub use error::{Error, Result};
pub use geography::{geographic_to_cartesian, haversine_distance, GeographicCoordinate, Location};
pub use network::{Network, NetworkNode, NodeAddress, NodeKind};
pub use orbital_mechanics::{AxialRotation, BodyDefinition, BodyId, OrbitalElements, Vector3};
pub use pathfinding::{Graph, GraphNode, Graphable, PathReport, DEFAULT_MAX_ITERATIONS};
pub use simulation::{BodySnapshot, MeshSimulation};
