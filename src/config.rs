// Configuration for mesh sessions

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::pathfinding::DEFAULT_MAX_ITERATIONS;

pub const ENV_BODIES: &str = "MESH_BODIES";
pub const ENV_NODES_PER_BODY: &str = "MESH_NODES_PER_BODY";
pub const ENV_SEED: &str = "MESH_SEED";
pub const ENV_MAX_PATH_ITERATIONS: &str = "MESH_MAX_PATH_ITERATIONS";

/// Session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    /// Ids of the bodies to populate with network nodes
    pub bodies: Vec<String>,
    /// Nodes generated on each body
    pub nodes_per_body: usize,
    /// Fixed generator seed; random when unset
    pub seed: Option<u64>,
    /// Expansion budget for each route query
    pub max_path_iterations: usize,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            bodies: [
                "mercury", "venus", "earth", "mars", "jupiter", "saturn", "uranus", "neptune",
            ]
            .iter()
            .map(|id| id.to_string())
            .collect(),
            nodes_per_body: 32,
            seed: None,
            max_path_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl MeshConfig {
    /// Defaults overridden by `MESH_*` variables, after loading any `.env` file
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(bodies) = lookup(ENV_BODIES) {
            config.bodies = bodies
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(value) = lookup(ENV_NODES_PER_BODY) {
            config.nodes_per_body = parse_var(ENV_NODES_PER_BODY, &value)?;
        }
        if let Some(value) = lookup(ENV_SEED) {
            config.seed = Some(parse_var(ENV_SEED, &value)?);
        }
        if let Some(value) = lookup(ENV_MAX_PATH_ITERATIONS) {
            config.max_path_iterations = parse_var(ENV_MAX_PATH_ITERATIONS, &value)?;
        }

        Ok(config)
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::config(format!("{}={:?}: {}", key, value, e)))
}
