//! 运行时错误.

use crate::Idx3d;
use std::fmt;

/// 粒子标记 / 粒子统计的运行时错误.
///
/// 所有错误都是确定性的逻辑错误, 重试没有意义.
#[derive(Debug, Clone, PartialEq)]
pub enum ParticleError {
    /// 每个分块的切片数必须至少为 1.
    InvalidChunkThickness(usize),

    /// 未知的相编码. 只接受 `-1` (前景) 和 `0` (背景).
    UnknownPhase(i32),

    /// 体素个数阈值的下限大于上限.
    InvalidSizeRange {
        /// 下限.
        min: usize,
        /// 上限.
        max: usize,
    },

    /// 体积阈值非法 (`NaN`, 负数, 或下限大于上限).
    InvalidVolumeRange {
        /// 下限.
        min: f64,
        /// 上限.
        max: f64,
    },

    /// 体素尺寸必须是正的有限值. 顺序为 \[宽, 高, 深\].
    InvalidCalibration([f64; 3]),

    /// 体素值既不是前景也不是背景.
    NonBinaryVoxel {
        /// 体素位置 `(z, y, x)`.
        pos: Idx3d,
        /// 实际值.
        value: u8,
    },

    /// 体数据至少有一个维度为 0. 参数为 `(深, 高, 宽)`.
    EmptyVolume(Idx3d),

    /// 文件 header 给出的形状与实际读入的体素个数不符.
    ShapeMismatch {
        /// header 中的形状 `(深, 高, 宽)`.
        shape: Idx3d,
        /// 实际体素个数.
        len: usize,
    },

    /// 临时标签数超出 `u32` 表示范围.
    LabelOverflow,

    /// 体数据坐标无法用 `u16` 表示 (线性连接算法需要). 参数为 `(深, 高, 宽)`.
    DimensionTooLarge(Idx3d),

    /// 构造粒子记录时, 各统计数组长度不一致.
    ///
    /// 依次为体素个数, 质心, 包围盒, 表面接触的数组长度.
    InconsistentLengths {
        /// 体素个数数组长度.
        sizes: usize,
        /// 质心数组长度.
        centroids: usize,
        /// 包围盒数组长度.
        limits: usize,
        /// 表面接触数组长度.
        faces: usize,
    },

    /// 分块任务中的体素视图和标签视图形状不一致.
    ChunkShapeMismatch {
        /// 分块编号.
        chunk: usize,
        /// 体素视图形状.
        voxels: Idx3d,
        /// 标签视图形状.
        labels: Idx3d,
    },

    /// 工作线程异常退出. 参数为工作线程编号.
    WorkerPanicked(usize),

    /// 无法创建线程池.
    ThreadPool(String),
}

impl fmt::Display for ParticleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParticleError::InvalidChunkThickness(n) => {
                write!(f, "slices per chunk must be at least 1, got {n}")
            }
            ParticleError::UnknownPhase(v) => {
                write!(f, "unknown phase code {v}: expected -1 or 0")
            }
            ParticleError::InvalidSizeRange { min, max } => {
                write!(f, "invalid voxel count range [{min}, {max}]")
            }
            ParticleError::InvalidVolumeRange { min, max } => {
                write!(f, "invalid volume range [{min}, {max}]")
            }
            ParticleError::InvalidCalibration([w, h, d]) => {
                write!(f, "invalid voxel calibration {w} x {h} x {d}")
            }
            ParticleError::NonBinaryVoxel { pos, value } => {
                write!(f, "voxel {pos:?} has non-binary value {value}")
            }
            ParticleError::EmptyVolume(shape) => {
                write!(f, "volume of shape {shape:?} has no voxels")
            }
            ParticleError::ShapeMismatch { shape, len } => {
                write!(f, "volume header shape {shape:?} does not match {len} voxels")
            }
            ParticleError::LabelOverflow => f.write_str("too many provisional particle labels"),
            ParticleError::DimensionTooLarge(shape) => {
                write!(f, "volume of shape {shape:?} exceeds u16 coordinates")
            }
            ParticleError::InconsistentLengths {
                sizes,
                centroids,
                limits,
                faces,
            } => write!(
                f,
                "particle arrays differ in length: sizes {sizes}, centroids {centroids}, \
                 limits {limits}, faces {faces}"
            ),
            ParticleError::ChunkShapeMismatch {
                chunk,
                voxels,
                labels,
            } => write!(
                f,
                "chunk {chunk}: voxel view {voxels:?} does not match label view {labels:?}"
            ),
            ParticleError::WorkerPanicked(worker) => write!(f, "worker {worker} panicked"),
            ParticleError::ThreadPool(msg) => write!(f, "cannot build worker pool: {msg}"),
        }
    }
}

impl std::error::Error for ParticleError {}

/// 粒子标记运行时结果.
pub type ParticleResult<T> = Result<T, ParticleError>;
