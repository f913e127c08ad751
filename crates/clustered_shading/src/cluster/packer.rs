//! Index packing
//!
//! Flattens the buckets into the two buffers the shading passes read: one
//! fixed-size record per cluster holding an `(offset, count)` pair per kind, and
//! the flat index list those pairs point into.

use bytemuck::{Pod, Zeroable};

use super::bin::ClusterBuckets;
use super::error::{ClustererError, ClustererResult};
use super::objects::{ObjectKind, TYPED_OBJECT_COUNT};
use crate::core::config::ClustererConfig;

/// A run of indices in the flat index list
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct ObjectRange {
    /// First index
    pub offset: u32,
    /// Number of indices
    pub count: u32,
}

impl ObjectRange {
    /// One past the last index
    pub fn end(&self) -> u32 {
        self.offset + self.count
    }
}

/// Per-cluster record, one range per kind in packing order
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct PackedClusterRecord {
    /// Ranges indexed by [`ObjectKind::index`]
    pub ranges: [ObjectRange; TYPED_OBJECT_COUNT],
}

const _: () = assert!(std::mem::size_of::<PackedClusterRecord>() == TYPED_OBJECT_COUNT * 8);

/// Packed output of one frame
#[derive(Debug, Clone, Default)]
pub struct PackedClusters {
    records: Vec<PackedClusterRecord>,
    indices: Vec<u32>,
}

impl PackedClusters {
    /// Create empty output buffers
    pub fn new() -> Self {
        Self::default()
    }

    /// One record per cluster, in linear cluster order
    pub fn records(&self) -> &[PackedClusterRecord] {
        &self.records
    }

    /// Flat index list
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Range of `kind` in `cluster`
    pub fn range(&self, cluster: u32, kind: ObjectKind) -> ObjectRange {
        self.records[cluster as usize].ranges[kind.index()]
    }

    /// Indices of `kind` binned into `cluster`
    pub fn indices_for(&self, cluster: u32, kind: ObjectKind) -> &[u32] {
        let range = self.range(cluster, kind);
        &self.indices[range.offset as usize..range.end() as usize]
    }

    /// Cluster records as upload bytes
    pub fn record_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.records)
    }

    /// Index list as upload bytes
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

/// Writes buckets into [`PackedClusters`]
#[derive(Debug, Clone)]
pub struct IndexPacker {
    max_total_indices: usize,
}

impl IndexPacker {
    /// Create a packer bounded by the configured index buffer size
    pub fn new(config: &ClustererConfig) -> Self {
        Self {
            max_total_indices: config.max_total_indices as usize,
        }
    }

    /// Pack `buckets` into `out`
    ///
    /// Clusters are visited in ascending linear order and kinds in packing
    /// order. Fails without touching `out` when the indices do not fit the
    /// index buffer.
    pub fn pack(&self, buckets: &ClusterBuckets, out: &mut PackedClusters) -> ClustererResult<()> {
        let required = buckets.total_len();
        if required > self.max_total_indices {
            log::error!(
                "Index buffer overflow: {} indices binned, capacity {}",
                required,
                self.max_total_indices
            );
            return Err(ClustererError::IndexBufferOverflow {
                required,
                capacity: self.max_total_indices,
            });
        }

        out.records.clear();
        out.indices.clear();
        out.records.reserve(buckets.cluster_count() as usize);
        out.indices.reserve(required);

        let mut offset = 0u32;
        for cluster in 0..buckets.cluster_count() {
            let mut record = PackedClusterRecord::default();
            for kind in ObjectKind::ALL {
                let bucket = buckets.bucket(cluster, kind);
                let count = bucket.len() as u32;
                record.ranges[kind.index()] = ObjectRange { offset, count };
                out.indices.extend_from_slice(bucket);
                offset += count;
            }
            out.records.push(record);
        }

        log::trace!("Packed {} clusters, {} indices", out.records.len(), out.indices.len());
        Ok(())
    }
}
