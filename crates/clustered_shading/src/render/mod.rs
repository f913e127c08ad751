//! # Rendering Primitives
//!
//! Renderer-side types the clusterer consumes. The renderer itself (frame
//! graph, GPU buffers, command submission) lives outside this crate; only the
//! camera description crosses the boundary.

pub mod primitives;

pub use primitives::ClusterCamera;
