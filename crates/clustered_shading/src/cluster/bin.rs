//! Clustered binning
//!
//! Assigns every collected object to the clusters its bounding volume
//! overlaps. Each object is reduced to an inclusive `x × y × z` cluster range
//! first, so the work per object is proportional to the clusters it touches,
//! never to the size of the grid.
//!
//! # Parallelism
//!
//! Objects are split into contiguous chunks, one per worker. Workers compute
//! cluster ranges into private [`ScratchArena`]s in parallel; the arenas are
//! then merged into the shared buckets in worker order. Since chunks are
//! contiguous, merge order equals object order and the per-bucket cap keeps the
//! same objects whatever the worker count.

use rayon::prelude::*;

use super::collector::{BinnableObject, CollectedObjects};
use super::grid::{uv_from_ndc, ClusterGridDescriptor};
use super::objects::{ObjectKind, TYPED_OBJECT_COUNT};
use super::volume::{Aabb, BoundingVolume};
use crate::core::config::ClustererConfig;
use crate::foundation::math::{Mat4, Vec2, Vec3, Vec4};
use crate::render::primitives::ClusterCamera;

/// Inclusive cluster range along each axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterRange {
    /// First and last tile along X
    pub x: (u32, u32),
    /// First and last tile along Y
    pub y: (u32, u32),
    /// First and last depth slice
    pub z: (u32, u32),
}

impl ClusterRange {
    /// Number of clusters in the range
    pub fn cluster_count(&self) -> u32 {
        let span = |(first, last): (u32, u32)| last - first + 1;
        span(self.x) * span(self.y) * span(self.z)
    }

    /// Whether cluster `(x, y, z)` lies in the range
    pub fn contains(&self, x: u32, y: u32, z: u32) -> bool {
        (self.x.0..=self.x.1).contains(&x)
            && (self.y.0..=self.y.1).contains(&y)
            && (self.z.0..=self.z.1).contains(&z)
    }
}

/// Clusters overlapped by a world-space volume
///
/// X/Y come from the screen-space box around the projected view-space AABB of
/// the volume, Z from its view-depth extent. Every range is inclusive, so a
/// volume touching a cluster boundary counts for both neighbours. `None` when
/// the volume is entirely off screen or outside the depth range.
pub fn cluster_range(
    grid: &ClusterGridDescriptor,
    camera: &ClusterCamera,
    volume: &BoundingVolume,
) -> Option<ClusterRange> {
    let view_box = volume.transformed_aabb(&camera.view);

    // Camera looks down -Z: the box's max z is its nearest point
    let z = grid.z_range_for_depth(-view_box.max.z, -view_box.min.z)?;

    // Only the part past the near plane is visible
    let clipped = Aabb::new(
        view_box.min,
        Vec3::new(view_box.max.x, view_box.max.y, view_box.max.z.min(-camera.near)),
    );
    let (uv_min, uv_max) = screen_footprint(&camera.projection, &clipped);

    let x = grid.x_range_for_uv(uv_min.x, uv_max.x)?;
    let y = grid.y_range_for_uv(uv_min.y, uv_max.y)?;
    Some(ClusterRange { x, y, z })
}

/// Screen uv bounds of a view-space box
fn screen_footprint(projection: &Mat4, view_box: &Aabb) -> (Vec2, Vec2) {
    let mut min = Vec2::repeat(f32::INFINITY);
    let mut max = Vec2::repeat(f32::NEG_INFINITY);

    for corner in view_box.corners() {
        let clip = projection * Vec4::new(corner.x, corner.y, corner.z, 1.0);
        if clip.w <= 0.0 {
            // Corner behind the eye, the footprint is unbounded
            return (Vec2::zeros(), Vec2::repeat(1.0));
        }
        let uv = Vec2::new(uv_from_ndc(clip.x / clip.w), uv_from_ndc(clip.y / clip.w));
        min = min.inf(&uv);
        max = max.sup(&uv);
    }
    (min, max)
}

/// Outcome of inserting into a bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketInsert {
    /// Appended
    Inserted,
    /// Already present
    Duplicate,
    /// Bucket full, index dropped
    Dropped,
}

/// Per (cluster, kind) index buckets
///
/// Stored cluster-major, kind-minor. Buckets are cleared between frames but
/// keep their allocations.
#[derive(Debug, Clone, Default)]
pub struct ClusterBuckets {
    cluster_count: u32,
    capacity: usize,
    buckets: Vec<Vec<u32>>,
}

impl ClusterBuckets {
    /// Empty bucket set holding at most `capacity` indices per bucket
    pub fn new(capacity: usize) -> Self {
        Self {
            cluster_count: 0,
            capacity,
            buckets: Vec::new(),
        }
    }

    /// Clear every bucket and size the set for `cluster_count` clusters
    pub fn reset(&mut self, cluster_count: u32) {
        let slots = cluster_count as usize * TYPED_OBJECT_COUNT;
        if self.buckets.len() != slots {
            self.buckets.resize_with(slots, Vec::new);
        }
        self.buckets.iter_mut().for_each(Vec::clear);
        self.cluster_count = cluster_count;
    }

    #[inline]
    fn slot(cluster: u32, kind: ObjectKind) -> usize {
        cluster as usize * TYPED_OBJECT_COUNT + kind.index()
    }

    /// Append `index` to the bucket of `(cluster, kind)`
    ///
    /// The first `capacity` distinct indices win.
    pub fn insert(&mut self, cluster: u32, kind: ObjectKind, index: u32) -> BucketInsert {
        debug_assert!(cluster < self.cluster_count, "cluster {} out of range", cluster);
        let capacity = self.capacity;
        let bucket = &mut self.buckets[Self::slot(cluster, kind)];
        if bucket.contains(&index) {
            BucketInsert::Duplicate
        } else if bucket.len() >= capacity {
            BucketInsert::Dropped
        } else {
            bucket.push(index);
            BucketInsert::Inserted
        }
    }

    /// Indices binned into `(cluster, kind)`, in insertion order
    pub fn bucket(&self, cluster: u32, kind: ObjectKind) -> &[u32] {
        &self.buckets[Self::slot(cluster, kind)]
    }

    /// Number of clusters
    pub fn cluster_count(&self) -> u32 {
        self.cluster_count
    }

    /// Per-bucket capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sum of all bucket lengths
    pub fn total_len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScratchEntry {
    cluster: u32,
    kind: ObjectKind,
    stable_index: u32,
}

/// A worker's private insertion list
///
/// Reset with [`ScratchArena::clear`] every frame; the allocation is kept.
#[derive(Debug, Clone, Default)]
pub struct ScratchArena {
    entries: Vec<ScratchEntry>,
    skipped: usize,
}

impl ScratchArena {
    /// Forget last frame's entries
    pub fn clear(&mut self) {
        self.entries.clear();
        self.skipped = 0;
    }

    /// Number of (cluster, object) pairs recorded
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn record(&mut self, grid: &ClusterGridDescriptor, camera: &ClusterCamera, object: &BinnableObject) {
        let Some(range) = cluster_range(grid, camera, &object.volume) else {
            self.skipped += 1;
            return;
        };

        for z in range.z.0..=range.z.1 {
            for y in range.y.0..=range.y.1 {
                for x in range.x.0..=range.x.1 {
                    self.entries.push(ScratchEntry {
                        cluster: grid.linear_index(x, y, z),
                        kind: object.kind,
                        stable_index: object.stable_index,
                    });
                }
            }
        }
    }
}

/// Counters of one binning pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BinningStats {
    /// Objects considered
    pub objects: usize,
    /// Objects with no cluster in range
    pub skipped_offscreen: usize,
    /// (cluster, object) pairs visited
    pub cluster_visits: usize,
    /// Indices stored in buckets
    pub insertions: usize,
    /// Indices dropped by full buckets
    pub dropped: usize,
}

/// The binner: buckets plus one scratch arena per worker
#[derive(Debug)]
pub struct ClustererBin {
    buckets: ClusterBuckets,
    arenas: Vec<ScratchArena>,
}

impl ClustererBin {
    /// Create a binner for `config`
    pub fn new(config: &ClustererConfig) -> Self {
        let workers = config
            .worker_count
            .unwrap_or_else(rayon::current_num_threads)
            .max(1);
        log::debug!("Clusterer bin using {} workers", workers);

        Self {
            buckets: ClusterBuckets::new(config.max_indices_per_cluster_per_type as usize),
            arenas: vec![ScratchArena::default(); workers],
        }
    }

    /// Number of workers objects are split across
    pub fn worker_count(&self) -> usize {
        self.arenas.len()
    }

    /// Buckets filled by the last [`ClustererBin::bin`]
    pub fn buckets(&self) -> &ClusterBuckets {
        &self.buckets
    }

    /// Bin this frame's objects
    pub fn bin(
        &mut self,
        grid: &ClusterGridDescriptor,
        camera: &ClusterCamera,
        objects: &CollectedObjects,
    ) -> BinningStats {
        self.buckets.reset(grid.cluster_count());

        let objects = objects.objects();
        let workers = self.arenas.len();
        let chunk_size = ((objects.len() + workers - 1) / workers).max(1);

        self.arenas
            .par_iter_mut()
            .enumerate()
            .for_each(|(worker, arena)| {
                arena.clear();
                let start = (worker * chunk_size).min(objects.len());
                let end = (start + chunk_size).min(objects.len());
                for object in &objects[start..end] {
                    arena.record(grid, camera, object);
                }
            });

        let mut stats = BinningStats {
            objects: objects.len(),
            ..BinningStats::default()
        };
        for arena in &self.arenas {
            stats.skipped_offscreen += arena.skipped;
            if arena.is_empty() {
                continue;
            }
            stats.cluster_visits += arena.len();
            for entry in &arena.entries {
                match self.buckets.insert(entry.cluster, entry.kind, entry.stable_index) {
                    BucketInsert::Inserted => stats.insertions += 1,
                    BucketInsert::Dropped => stats.dropped += 1,
                    BucketInsert::Duplicate => {}
                }
            }
        }

        if stats.dropped > 0 {
            log::debug!(
                "Cluster buckets full, dropped {} insertions (capacity {})",
                stats.dropped,
                self.buckets.capacity()
            );
        }
        log::trace!("Binning: {:?}", stats);
        stats
    }
}
