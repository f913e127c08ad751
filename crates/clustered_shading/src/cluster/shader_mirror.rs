//! Shading-side cluster formulas
//!
//! [`CLUSTERED_SHADING_GLSL`] is the GLSL that shading passes include to find a
//! fragment's cluster. The `compute_*` functions below evaluate the same
//! expressions in the same operation order on the same std140 data, so tests
//! can hold the CPU side and the shader to bit-identical results.

use super::grid::ClusterGridDescriptor;
use super::magic::MagicValues;
use super::objects::{ObjectKind, TYPED_OBJECT_COUNT};

/// GLSL declarations and cluster lookup functions
///
/// Expects the `#define`s from [`shader_defines`] to precede it.
pub const CLUSTERED_SHADING_GLSL: &str = r"
struct ClustererMagicValues
{
    vec4 val0;
    vec4 val1;
};

struct ObjectRange
{
    uint offset;
    uint count;
};

struct PackedCluster
{
    ObjectRange ranges[TYPED_OBJECT_COUNT];
};

float computeClusterKf(ClustererMagicValues magic, vec3 worldPos)
{
    return sqrt(dot(magic.val0.xyz, worldPos) - magic.val0.w);
}

uint computeClusterK(ClustererMagicValues magic, vec3 worldPos)
{
    return uint(computeClusterKf(magic, worldPos));
}

uint computeClusterIndex(ClustererMagicValues magic, vec2 uv, vec3 worldPos, uint clusterCountX, uint clusterCountY)
{
    const uvec2 xy = uvec2(uv * vec2(float(clusterCountX), float(clusterCountY)));
    const uint k = computeClusterK(magic, worldPos);
    return k * (clusterCountX * clusterCountY) + xy.y * clusterCountX + xy.x;
}

float computeClusterNearf(ClustererMagicValues magic, float fk)
{
    return magic.val1.x * fk * fk + magic.val1.y;
}

float computeClusterNear(ClustererMagicValues magic, uint k)
{
    return computeClusterNearf(magic, float(k));
}

vec3 computeClustererVolumeTextureUvs(ClustererMagicValues magic, vec2 uv, vec3 worldPos, uint clusterCountZ)
{
    const float k = computeClusterKf(magic, worldPos);
    return vec3(uv, k / float(clusterCountZ));
}
";

/// `#define`s the shading GLSL is compiled with
pub fn shader_defines(grid: &ClusterGridDescriptor) -> String {
    let counts = [
        ("CLUSTER_COUNT_X", grid.count_x()),
        ("CLUSTER_COUNT_Y", grid.count_y()),
        ("CLUSTER_COUNT_Z", grid.count_z()),
        ("CLUSTER_COUNT", grid.cluster_count()),
        ("TYPED_OBJECT_COUNT", TYPED_OBJECT_COUNT as u32),
    ];
    let kinds = ObjectKind::ALL.map(|kind| (kind_define(kind), kind.index() as u32));

    counts
        .iter()
        .chain(kinds.iter())
        .map(|(name, value)| format!("#define {} {}u\n", name, value))
        .collect()
}

fn kind_define(kind: ObjectKind) -> &'static str {
    match kind {
        ObjectKind::PointLight => "OBJECT_KIND_POINT_LIGHT",
        ObjectKind::SpotLight => "OBJECT_KIND_SPOT_LIGHT",
        ObjectKind::ReflectionProbe => "OBJECT_KIND_REFLECTION_PROBE",
        ObjectKind::GlobalIlluminationProbe => "OBJECT_KIND_GLOBAL_ILLUMINATION_PROBE",
        ObjectKind::Decal => "OBJECT_KIND_DECAL",
        ObjectKind::FogDensityVolume => "OBJECT_KIND_FOG_DENSITY_VOLUME",
    }
}

#[inline]
fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// `computeClusterKf`
pub fn compute_cluster_kf(magic: &MagicValues, world_pos: [f32; 3]) -> f32 {
    let [x, y, z, w] = magic.val0;
    (dot([x, y, z], world_pos) - w).sqrt()
}

/// `computeClusterK`
pub fn compute_cluster_k(magic: &MagicValues, world_pos: [f32; 3]) -> u32 {
    compute_cluster_kf(magic, world_pos) as u32
}

/// `computeClusterIndex`
pub fn compute_cluster_index(
    magic: &MagicValues,
    uv: [f32; 2],
    world_pos: [f32; 3],
    cluster_count_x: u32,
    cluster_count_y: u32,
) -> u32 {
    let xy = [
        (uv[0] * cluster_count_x as f32) as u32,
        (uv[1] * cluster_count_y as f32) as u32,
    ];
    let k = compute_cluster_k(magic, world_pos);
    k * (cluster_count_x * cluster_count_y) + xy[1] * cluster_count_x + xy[0]
}

/// `computeClusterNearf`
pub fn compute_cluster_nearf(magic: &MagicValues, fk: f32) -> f32 {
    magic.val1[0] * fk * fk + magic.val1[1]
}

/// `computeClusterNear`
pub fn compute_cluster_near(magic: &MagicValues, k: u32) -> f32 {
    compute_cluster_nearf(magic, k as f32)
}

/// `computeClustererVolumeTextureUvs`
pub fn compute_clusterer_volume_texture_uvs(
    magic: &MagicValues,
    uv: [f32; 2],
    world_pos: [f32; 3],
    cluster_count_z: u32,
) -> [f32; 3] {
    let k = compute_cluster_kf(magic, world_pos);
    [uv[0], uv[1], k / cluster_count_z as f32]
}
