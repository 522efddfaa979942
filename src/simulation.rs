// Mesh Simulation - Session state tying bodies, network and routing together
// Collaborators are handed in at construction; nothing is looked up globally

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::body_registry::BodyRegistry;
use crate::config::MeshConfig;
use crate::error::{Error, Result};
use crate::geography::geographic_to_cartesian;
use crate::network::{Network, NetworkNode, NodeAddress};
use crate::orbital_mechanics::{days_since_j2000, km_to_au, OrbitalElements, Vector3};
use crate::pathfinding::{Graph, PathReport};

// =============================================================================
// SERIALIZABLE SNAPSHOTS
// =============================================================================

/// Body placement handed to whatever draws the scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodySnapshot {
    pub id: String,
    pub name: String,
    pub position_au: [f64; 3],
    pub tilt_deg: f64,
    pub spin_deg: f64,
    pub radius_km: f64,
}

impl BodySnapshot {
    fn capture(body: &OrbitalElements, time: DateTime<Utc>) -> Self {
        let days = days_since_j2000(time);
        let position = body.position_at_days(days);
        let rotation = body.rotation_at_days(days);
        Self {
            id: body.id().to_string(),
            name: body.name().to_string(),
            position_au: [position.x, position.y, position.z],
            tilt_deg: rotation.tilt_deg,
            spin_deg: rotation.spin_deg,
            radius_km: body.radius_km(),
        }
    }
}

// =============================================================================
// SESSION
// =============================================================================

pub struct MeshSimulation {
    registry: Arc<BodyRegistry>,
    bodies: Vec<Arc<OrbitalElements>>,
    network: Network,
    graph: Graph<NetworkNode>,
    config: MeshConfig,
}

impl MeshSimulation {
    /// Generate a session network, seeded from the config when it has a seed
    pub fn new(registry: Arc<BodyRegistry>, config: MeshConfig) -> Result<Self> {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(registry, config, &mut rng)
    }

    /// Generate a session network from a caller-supplied random source
    pub fn with_rng<R: Rng + ?Sized>(
        registry: Arc<BodyRegistry>,
        config: MeshConfig,
        rng: &mut R,
    ) -> Result<Self> {
        let bodies = config
            .bodies
            .iter()
            .map(|id| {
                registry
                    .get(id)
                    .ok_or_else(|| Error::BodyNotFound(id.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        let network = Network::generate(rng, &bodies, config.nodes_per_body);
        let graph = Graph::build(network.nodes().iter().cloned())?;

        Ok(Self {
            registry,
            bodies,
            network,
            graph,
            config,
        })
    }

    pub fn registry(&self) -> &Arc<BodyRegistry> {
        &self.registry
    }

    /// Bodies carrying this session's network, in config order
    pub fn bodies(&self) -> &[Arc<OrbitalElements>] {
        &self.bodies
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Routing graph over the session network, built once at construction
    pub fn graph(&self) -> &Graph<NetworkNode> {
        &self.graph
    }

    pub fn config(&self) -> &MeshConfig {
        &self.config
    }

    /// Placement of any registered body, `None` for unknown ids
    pub fn body_snapshot(&self, id: &str, time: DateTime<Utc>) -> Option<BodySnapshot> {
        let body = self.registry.get(id)?;
        Some(BodySnapshot::capture(&body, time))
    }

    /// Placement of every session body
    pub fn snapshots(&self, time: DateTime<Utc>) -> Vec<BodySnapshot> {
        self.bodies
            .iter()
            .map(|body| BodySnapshot::capture(body, time))
            .collect()
    }

    /// Heliocentric position (AU) of a node on its body's surface.
    ///
    /// Spin turns the surface about the polar axis; tilt is left to the
    /// rendering layer.
    pub fn node_position(&self, address: NodeAddress, time: DateTime<Utc>) -> Option<Vector3> {
        let node = self.network.node(address)?;
        let location = node.location();
        let body = &location.body;

        let days = days_since_j2000(time);
        let centre = body.position_at_days(days);
        let spin = body.rotation_at_days(days).spin_deg;
        let surface = geographic_to_cartesian(
            location.coordinates.latitude,
            location.coordinates.longitude + spin,
            km_to_au(body.radius_km()),
        );

        Some(Vector3::new(
            centre.x + surface.x,
            centre.y + surface.y,
            centre.z + surface.z,
        ))
    }

    /// Addresses along the best route, empty when there is none
    pub fn route(&self, from: NodeAddress, to: NodeAddress) -> Vec<NodeAddress> {
        self.route_report(from, to).path
    }

    /// Route with search statistics.
    ///
    /// Queries share the immutable graph; search state is per call.
    pub fn route_report(&self, from: NodeAddress, to: NodeAddress) -> PathReport<NodeAddress> {
        let report = self
            .graph
            .search(&from, &to, self.config.max_path_iterations);
        PathReport {
            path: report.path.iter().map(NetworkNode::address).collect(),
            iterations: report.iterations,
            budget_exhausted: report.budget_exhausted,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
