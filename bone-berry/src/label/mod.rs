//! 三维连通粒子标记.
//!
//! 流程: 光栅扫描临时标记 → 分块内并行连接 → 分块界面三趟缝合
//! (或线性连接) → 体素个数过滤 → 标签压缩.

use crate::consts::{Phase, DEFAULT_SLICES_PER_CHUNK};
use crate::data::{BinaryVolume, LabelVolume};
use crate::error::{ParticleError, ParticleResult};
use crate::particle::{metrics::ParticleMetrics, Labelling};
use log::info;
use std::num::NonZeroUsize;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod chunk;
pub mod connect;
pub mod join;
pub mod minimise;
pub mod propagate;

pub use chunk::{ChunkPlan, StitchPass, StitchRange};
pub use connect::{connect_chunks, stitch_chunks};
pub use join::join_linear;
pub use minimise::{filter_by_size, minimise_labels, particle_sizes};
pub use propagate::propagate_labels;

/// 临时标签的连接方法.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LabelMethod {
    /// 沿 z 轴分块, 块内并行连接, 再在分块界面上顺序缝合.
    #[default]
    Multi,

    /// 单线程, 按标签升序吸收相邻的更大标签. 坐标必须能用 `u16` 表示.
    Linear,
}

/// 粒子体素个数的闭区间 `[min, max]`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SizeRange {
    min: usize,
    max: usize,
}

impl Default for SizeRange {
    /// `[0, usize::MAX]`, 不过滤任何粒子.
    #[inline]
    fn default() -> Self {
        Self {
            min: 0,
            max: usize::MAX,
        }
    }
}

impl SizeRange {
    /// 创建体素个数区间. `min > max` 时返回 `Err(ParticleError::InvalidSizeRange)`.
    pub fn new(min: usize, max: usize) -> ParticleResult<Self> {
        if min > max {
            return Err(ParticleError::InvalidSizeRange { min, max });
        }
        Ok(Self { min, max })
    }

    /// 只设下限.
    #[inline]
    pub fn at_least(min: usize) -> Self {
        Self {
            min,
            max: usize::MAX,
        }
    }

    /// 下限.
    #[inline]
    pub fn min(&self) -> usize {
        self.min
    }

    /// 上限.
    #[inline]
    pub fn max(&self) -> usize {
        self.max
    }

    /// 体素个数 `size` 是否落在区间内 (含两端).
    #[inline]
    pub fn contains(&self, size: usize) -> bool {
        self.min <= size && size <= self.max
    }

    /// 是否不会过滤任何粒子.
    #[inline]
    pub fn is_unbounded(&self) -> bool {
        self.min == 0 && self.max == usize::MAX
    }
}

/// 粒子实际体积的闭区间 `[min, max]`, 单位为标定单位的立方.
///
/// 用于标记完成后的筛选, 见 [`Labelling::within_volume`].
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VolumeRange {
    min: f64,
    max: f64,
}

impl Default for VolumeRange {
    /// `[0, +∞]`, 不过滤任何粒子.
    #[inline]
    fn default() -> Self {
        Self {
            min: 0.0,
            max: f64::INFINITY,
        }
    }
}

impl VolumeRange {
    /// 创建体积区间. `max` 可以为 `+∞`.
    ///
    /// 任一端为 `NaN`, `min` 为负, 或 `min > max` 时返回
    /// `Err(ParticleError::InvalidVolumeRange)`.
    pub fn new(min: f64, max: f64) -> ParticleResult<Self> {
        if min.is_nan() || max.is_nan() || min < 0.0 || min > max {
            return Err(ParticleError::InvalidVolumeRange { min, max });
        }
        Ok(Self { min, max })
    }

    /// 下限.
    #[inline]
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 上限.
    #[inline]
    pub fn max(&self) -> f64 {
        self.max
    }

    /// `volume` 是否落在区间内 (含两端).
    #[inline]
    pub fn contains(&self, volume: f64) -> bool {
        self.min <= volume && volume <= self.max
    }

    /// 是否不会过滤任何粒子.
    #[inline]
    pub fn is_unbounded(&self) -> bool {
        self.min <= 0.0 && self.max == f64::INFINITY
    }
}

/// 标记配置.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LabelSpec {
    /// 每个分块的水平切片个数, 至少为 1.
    pub slices_per_chunk: usize,

    /// 待标记的相.
    pub phase: Phase,

    /// 连接方法.
    pub method: LabelMethod,

    /// 保留的粒子体素个数范围, 在标签压缩前生效.
    pub size_range: SizeRange,

    /// 工作线程个数. `None` 表示使用全部可用并行度.
    pub workers: Option<NonZeroUsize>,
}

impl Default for LabelSpec {
    fn default() -> Self {
        Self {
            slices_per_chunk: DEFAULT_SLICES_PER_CHUNK,
            phase: Phase::default(),
            method: LabelMethod::default(),
            size_range: SizeRange::default(),
            workers: None,
        }
    }
}

impl LabelSpec {
    /// 设置每个分块的切片个数.
    #[inline]
    pub fn with_slices_per_chunk(mut self, slices_per_chunk: usize) -> Self {
        self.slices_per_chunk = slices_per_chunk;
        self
    }

    /// 设置待标记的相.
    #[inline]
    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    /// 设置连接方法.
    #[inline]
    pub fn with_method(mut self, method: LabelMethod) -> Self {
        self.method = method;
        self
    }

    /// 设置保留的粒子体素个数范围.
    #[inline]
    pub fn with_size_range(mut self, size_range: SizeRange) -> Self {
        self.size_range = size_range;
        self
    }

    /// 设置工作线程个数.
    #[inline]
    pub fn with_workers(mut self, workers: NonZeroUsize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// 在任何处理开始前检查配置.
    pub fn validate(&self) -> ParticleResult<()> {
        if self.slices_per_chunk == 0 {
            return Err(ParticleError::InvalidChunkThickness(self.slices_per_chunk));
        }
        let SizeRange { min, max } = self.size_range;
        SizeRange::new(min, max).map(|_| ())
    }
}

/// 标记 `volume` 中属于 `spec.phase` 的连通粒子.
///
/// 返回的标签恰为 `0..=N`, 0 表示不属于任何粒子. 粒子编号保持临时标签的相对顺序,
/// 即按每个粒子在光栅扫描中首次出现的位置排序.
pub fn label_volume(volume: &BinaryVolume, spec: &LabelSpec) -> ParticleResult<LabelVolume> {
    spec.validate()?;
    let phase = spec.phase;
    info!(
        "Labelling {phase} particles of {:?} volume with {:?} method",
        volume.shape(),
        spec.method
    );

    let mut labels = propagate_labels(volume, phase)?;
    match spec.method {
        LabelMethod::Multi => {
            let plan = ChunkPlan::new(volume.depth(), spec.slices_per_chunk)?;
            connect_chunks(volume, &mut labels, &plan, phase, spec.workers)?;
            stitch_chunks(volume, &mut labels, &plan, phase);
        }
        LabelMethod::Linear => {
            join_linear(volume, &mut labels, phase)?;
        }
    }

    if !spec.size_range.is_unbounded() {
        filter_by_size(&mut labels, &spec.size_range);
    }
    let n = minimise_labels(&mut labels);
    info!("Found {n} {phase} particles");
    Ok(labels)
}

/// 标记 `volume` 中的连通粒子, 并统计每个粒子的体素个数, 质心, 包围盒与表面接触.
pub fn label_particles(volume: &BinaryVolume, spec: &LabelSpec) -> ParticleResult<Labelling> {
    let labels = label_volume(volume, spec)?;
    let calibration = volume.calibration();
    let particles = ParticleMetrics::extract(&labels, &calibration).into_particles(&calibration)?;
    Ok(Labelling::new(labels, particles))
}
