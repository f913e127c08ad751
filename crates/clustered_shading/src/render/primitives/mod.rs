//! Rendering primitives shared with the clustering pipeline

pub mod camera;

pub use camera::ClusterCamera;
