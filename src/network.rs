// Network - Procedurally generated terminals and gateways anchored to bodies

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::Ipv6Addr;
use std::sync::Arc;

use crate::geography::Location;
use crate::orbital_mechanics::{BodyId, OrbitalElements};
use crate::pathfinding::Graphable;

/// Cost between nodes on different bodies, where no metric is defined yet
pub const UNDEFINED_METRIC_COST: f64 = 1.0;

/// A pending terminal group is promoted to a gateway with odds 1 in this
const GATEWAY_ODDS: u32 = 5;

// =============================================================================
// NODE ADDRESSES
// =============================================================================

/// 128-bit network address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeAddress(Ipv6Addr);

impl NodeAddress {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(Ipv6Addr::from(rng.gen::<[u8; 16]>()))
    }

    pub fn from_bits(bits: u128) -> Self {
        Self(Ipv6Addr::from(bits))
    }

    pub fn ip(&self) -> Ipv6Addr {
        self.0
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// =============================================================================
// NETWORK NODES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Leaf device
    Terminal,
    /// Backbone node with the terminals it was promoted from
    Gateway { members: Vec<NodeAddress> },
}

/// A single reachable node in the network
#[derive(Debug, Clone)]
pub struct NetworkNode {
    address: NodeAddress,
    location: Location,
    kind: NodeKind,
    connections: BTreeSet<NodeAddress>,
}

impl NetworkNode {
    fn new(address: NodeAddress, location: Location, kind: NodeKind) -> Self {
        Self {
            address,
            location,
            kind,
            connections: BTreeSet::new(),
        }
    }

    pub fn address(&self) -> NodeAddress {
        self.address
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn connections(&self) -> &BTreeSet<NodeAddress> {
        &self.connections
    }

    pub fn is_gateway(&self) -> bool {
        matches!(self.kind, NodeKind::Gateway { .. })
    }

    /// Terminals aggregated by a gateway; empty for terminals
    pub fn members(&self) -> &[NodeAddress] {
        match &self.kind {
            NodeKind::Gateway { members } => members,
            NodeKind::Terminal => &[],
        }
    }
}

impl PartialEq for NetworkNode {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for NetworkNode {}

impl Hash for NetworkNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

impl Graphable for NetworkNode {
    type Key = NodeAddress;

    fn key(&self) -> NodeAddress {
        self.address
    }

    fn neighbours(&self) -> Vec<NodeAddress> {
        self.connections.iter().copied().collect()
    }

    fn cost(&self, other: &Self) -> f64 {
        self.location
            .surface_distance(&other.location)
            .unwrap_or(UNDEFINED_METRIC_COST)
    }
}

// =============================================================================
// NETWORK
// =============================================================================

/// Owner of every generated node, in generation order
#[derive(Debug, Clone, Default)]
pub struct Network {
    nodes: Vec<NetworkNode>,
    index: HashMap<NodeAddress, usize>,
}

impl Network {
    /// Populate each body with `nodes_per_body` nodes.
    ///
    /// Terminals gather at the current location until one draw in
    /// [`GATEWAY_ODDS`] promotes the group into a gateway, after which a new
    /// location is picked. Gateways on the same body form a full mesh. Bodies
    /// are never linked to each other.
    pub fn generate<'a, R, I>(rng: &mut R, bodies: I, nodes_per_body: usize) -> Self
    where
        R: Rng + ?Sized,
        I: IntoIterator<Item = &'a Arc<OrbitalElements>>,
    {
        let mut network = Network::default();
        let mut seen: HashSet<BodyId> = HashSet::new();

        for body in bodies {
            if !seen.insert(body.id().clone()) {
                tracing::warn!(body = %body.id(), "body listed twice, skipping repeat");
                continue;
            }
            network.populate_body(rng, body, nodes_per_body);
        }

        tracing::info!(
            bodies = seen.len(),
            nodes = network.len(),
            gateways = network.gateways().count(),
            "generated network"
        );
        network
    }

    fn populate_body<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        body: &Arc<OrbitalElements>,
        nodes_per_body: usize,
    ) {
        let mut location = Location::random(rng, body);
        let mut pending: Vec<NodeAddress> = Vec::new();
        let mut gateways: Vec<NodeAddress> = Vec::new();

        for _ in 0..nodes_per_body {
            let address = self.fresh_address(rng);

            // A location always gets at least one terminal before its gateway
            if pending.is_empty() || rng.gen_range(0..GATEWAY_ODDS) > 0 {
                self.insert(NetworkNode::new(address, location.clone(), NodeKind::Terminal));
                pending.push(address);
            } else {
                let members = std::mem::take(&mut pending);
                self.insert(NetworkNode::new(
                    address,
                    location,
                    NodeKind::Gateway {
                        members: members.clone(),
                    },
                ));
                for terminal in members {
                    self.connect(address, terminal);
                }
                gateways.push(address);
                location = Location::random(rng, body);
            }
        }

        for (i, &gateway) in gateways.iter().enumerate() {
            for &other in &gateways[i + 1..] {
                self.connect(gateway, other);
            }
        }

        tracing::debug!(
            body = %body.id(),
            gateways = gateways.len(),
            stranded_terminals = pending.len(),
            "populated body"
        );
    }

    /// Random address not yet used in this network
    fn fresh_address<R: Rng + ?Sized>(&self, rng: &mut R) -> NodeAddress {
        loop {
            let address = NodeAddress::random(rng);
            if !self.index.contains_key(&address) {
                return address;
            }
            tracing::trace!(%address, "address collision, redrawing");
        }
    }

    fn insert(&mut self, node: NetworkNode) {
        self.index.insert(node.address, self.nodes.len());
        self.nodes.push(node);
    }

    /// Link two nodes in both directions
    fn connect(&mut self, a: NodeAddress, b: NodeAddress) {
        if a == b {
            return;
        }
        if let (Some(&ia), Some(&ib)) = (self.index.get(&a), self.index.get(&b)) {
            self.nodes[ia].connections.insert(b);
            self.nodes[ib].connections.insert(a);
        }
    }

    pub fn nodes(&self) -> &[NetworkNode] {
        &self.nodes
    }

    pub fn node(&self, address: NodeAddress) -> Option<&NetworkNode> {
        self.index.get(&address).map(|&i| &self.nodes[i])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn terminals(&self) -> impl Iterator<Item = &NetworkNode> {
        self.nodes.iter().filter(|n| !n.is_gateway())
    }

    pub fn gateways(&self) -> impl Iterator<Item = &NetworkNode> {
        self.nodes.iter().filter(|n| n.is_gateway())
    }

    /// Nodes anchored to the given body
    pub fn nodes_on<'a>(&'a self, body: &'a BodyId) -> impl Iterator<Item = &'a NetworkNode> {
        self.nodes.iter().filter(move |n| n.location.body.id() == body)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geography::GeographicCoordinate;
    use crate::orbital_mechanics::BodyDefinition;
    use crate::pathfinding::{Graph, DEFAULT_MAX_ITERATIONS};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn body(id: &str, a: f64) -> Arc<OrbitalElements> {
        Arc::new(
            OrbitalElements::try_from(BodyDefinition {
                id: id.to_string(),
                semi_major_axis_au: a,
                eccentricity: 0.05,
                inclination_deg: 1.0,
                ascending_node_deg: 10.0,
                argument_perihelion_deg: 20.0,
                orbital_period_days: 365.25 * a.powf(1.5),
                rotation_period_days: 1.0,
                obliquity_deg: 20.0,
                radius_km: 5000.0,
            })
            .unwrap(),
        )
    }

    fn assert_symmetric(network: &Network) {
        for node in network.nodes() {
            for &peer in node.connections() {
                let other = network.node(peer).expect("dangling connection");
                assert!(other.connections().contains(&node.address()));
            }
        }
    }

    #[test]
    fn test_zero_nodes_per_body() {
        let mut rng = StdRng::seed_from_u64(1);
        let network = Network::generate(&mut rng, &[body("earth", 1.0)], 0);
        assert!(network.is_empty());
    }

    #[test]
    fn test_single_node_is_terminal() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let network = Network::generate(&mut rng, &[body("earth", 1.0)], 1);
            assert_eq!(network.len(), 1);
            assert_eq!(network.terminals().count(), 1);
            assert_eq!(network.gateways().count(), 0);
            assert!(network.nodes()[0].connections().is_empty());
        }
    }

    #[test]
    fn test_gateway_mesh_and_membership() {
        for (seed, n) in [(3u64, 2usize), (4, 7), (5, 50), (6, 200)] {
            let mut rng = StdRng::seed_from_u64(seed);
            let network = Network::generate(&mut rng, &[body("mars", 1.5)], n);
            assert_eq!(network.len(), n);
            assert_symmetric(&network);

            let gateways: Vec<_> = network.gateways().collect();
            for gateway in &gateways {
                for other in &gateways {
                    if gateway.address() != other.address() {
                        assert!(gateway.connections().contains(&other.address()));
                    }
                }
                assert!(!gateway.connections().contains(&gateway.address()));
                assert!(!gateway.members().is_empty());
                for &member in gateway.members() {
                    assert!(gateway.connections().contains(&member));
                    let terminal = network.node(member).unwrap();
                    assert!(!terminal.is_gateway());
                    assert_eq!(terminal.location(), gateway.location());
                }
            }

            for terminal in network.terminals() {
                assert!(terminal.members().is_empty());
                for &peer in terminal.connections() {
                    assert!(network.node(peer).unwrap().is_gateway());
                }
                assert!(terminal.connections().len() <= 1);
            }
        }
    }

    #[test]
    fn test_large_budget_produces_gateways() {
        let mut rng = StdRng::seed_from_u64(11);
        let network = Network::generate(&mut rng, &[body("mars", 1.5)], 100);
        assert!(network.gateways().count() > 1);
    }

    #[test]
    fn test_bodies_are_not_interlinked() {
        let earth = body("earth", 1.0);
        let mars = body("mars", 1.5);
        let mut rng = StdRng::seed_from_u64(9);
        let network = Network::generate(&mut rng, [&earth, &mars], 40);
        assert_eq!(network.len(), 80);
        assert_eq!(network.nodes_on(earth.id()).count(), 40);
        assert_eq!(network.nodes_on(mars.id()).count(), 40);

        for node in network.nodes() {
            for &peer in node.connections() {
                let other = network.node(peer).unwrap();
                assert!(node.location().same_body(other.location()));
            }
        }
    }

    #[test]
    fn test_repeated_body_is_skipped() {
        let earth = body("earth", 1.0);
        let shouting = body("EARTH", 1.0);
        let mut rng = StdRng::seed_from_u64(2);
        let network = Network::generate(&mut rng, [&earth, &shouting], 10);
        assert_eq!(network.len(), 10);
    }

    #[test]
    fn test_generation_is_seed_deterministic() {
        let bodies = [body("earth", 1.0), body("mars", 1.5)];
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            Network::generate(&mut rng, &bodies, 25)
                .nodes()
                .iter()
                .map(|n| (n.address(), n.connections().clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(42), run(42));
        assert_ne!(run(42), run(43));
    }

    #[test]
    fn test_addresses_unique() {
        let mut rng = StdRng::seed_from_u64(8);
        let network = Network::generate(&mut rng, &[body("earth", 1.0)], 500);
        let unique: HashSet<_> = network.nodes().iter().map(|n| n.address()).collect();
        assert_eq!(unique.len(), 500);
    }

    #[test]
    fn test_node_cost() {
        let earth = body("earth", 1.0);
        let mars = body("mars", 1.5);
        let at = |b: &Arc<OrbitalElements>, lat, lon| {
            Location::new(Arc::clone(b), GeographicCoordinate::new(lat, lon))
        };
        let a = NetworkNode::new(NodeAddress::from_bits(1), at(&earth, 0.0, 0.0), NodeKind::Terminal);
        let b = NetworkNode::new(NodeAddress::from_bits(2), at(&earth, 0.0, 90.0), NodeKind::Terminal);
        let c = NetworkNode::new(NodeAddress::from_bits(3), at(&mars, 0.0, 0.0), NodeKind::Terminal);

        let quarter = crate::geography::REFERENCE_RADIUS_KM * std::f64::consts::FRAC_PI_2;
        assert!((a.cost(&b) - quarter).abs() < 1e-9);
        assert_eq!(a.cost(&c), UNDEFINED_METRIC_COST);
        assert_eq!(a.cost(&a), 0.0);
    }

    #[test]
    fn test_route_between_sibling_terminals() {
        let mut rng = StdRng::seed_from_u64(21);
        let network = Network::generate(&mut rng, &[body("earth", 1.0)], 200);
        let gateway = network
            .gateways()
            .find(|g| g.members().len() >= 2)
            .expect("no gateway with two members");
        let from = network.node(gateway.members()[0]).unwrap();
        let to = network.node(gateway.members()[1]).unwrap();

        let graph = Graph::build(network.nodes()).unwrap();
        let path = graph.find_path(&from, &to, DEFAULT_MAX_ITERATIONS);
        let hops: Vec<_> = path.iter().map(|n| n.address()).collect();
        assert_eq!(hops, vec![from.address(), gateway.address(), to.address()]);
    }

    #[test]
    fn test_route_across_backbone() {
        let mut rng = StdRng::seed_from_u64(34);
        let network = Network::generate(&mut rng, &[body("earth", 1.0)], 200);
        let gateways: Vec<_> = network.gateways().collect();
        assert!(gateways.len() >= 2);
        let from = network.node(gateways[0].members()[0]).unwrap();
        let to = network.node(gateways[1].members()[0]).unwrap();

        let graph = Graph::build(network.nodes()).unwrap();
        let path = graph.find_path(&from, &to, DEFAULT_MAX_ITERATIONS);
        assert_eq!(path.first().map(|n| n.address()), Some(from.address()));
        assert_eq!(path.last().map(|n| n.address()), Some(to.address()));
        for pair in path.windows(2) {
            assert!(pair[0].connections().contains(&pair[1].address()));
        }
    }
}
