//! gridcluster groups large, changing sets of geo-positioned items into
//! zoom-dependent clusters. It provides a grid bucketing algorithm, the
//! cluster aggregate it produces, and an orchestrator that recomputes
//! clusters in the background while the view changes.

// Module declarations
pub mod error;
pub mod types;
pub mod projection;
pub mod cluster;
pub mod algo;
pub mod manager;
pub mod config;
pub mod utils;

// Re-exports
pub use error::{Error, Result};
pub use types::{Bounds, ClusterItem, Point, Position};
pub use projection::{Projection, SphericalMercator};
pub use cluster::{Cluster, StaticCluster};
pub use algo::{Algorithm, GridBasedAlgorithm};
pub use manager::{
    AlgorithmId,
    CameraPosition,
    CameraSource,
    ClusterManager,
    ClusterRenderer,
    ClusterResults,
    SharedCamera,
};

// Re-export the config from config module
pub use config::GridClusterConfig;
