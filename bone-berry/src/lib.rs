#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 为骨骼显微 CT 二值体数据提供三维连通粒子标记, 分块并行连接与缝合,
//! 以及每个粒子的基础统计信息.
//!
//! 该 crate 仅提供 `safe` 接口. 核心流程是纯函数, 不持有任何进程级全局状态.
//!
//! # 注意
//!
//! 1. 所有三维索引均为 `(z, y, x)`, 即 `(深, 高, 宽)`. 只有质心坐标按 `[x, y, z]` 给出.
//! 2. 前景按 26-邻域连通, 背景按 6-邻域连通.
//! 3. 所有可预期的错误都以 `Err` 返回, 不会 panic.
//!
//! # 开发计划
//!
//! ### 体数据与标签 ✅
//!
//! 二值体数据, 标定信息, nii 掩膜读取, 标签体数据及 npy 读写.
//!
//! 实现位于 `bone-berry/src/data`.
//!
//! ### 统一的邻居迭代器 ✅
//!
//! 26-邻域与 6-邻域共用一套邻居迭代器, 临时标记, 连接, 缝合与线性连接都经由它访问邻域.
//!
//! 实现位于 `bone-berry/src/data/neighbour.rs`.
//!
//! ### 分块并行连接与三趟缝合 ✅
//!
//! 1. 光栅扫描临时标记. ✅
//! 2. 沿 z 轴分块, 块内并行连接 (`rayon`, 或无 `rayon` 时的作用域线程池). ✅
//! 3. 分块界面按 前向 → 反向 → 前向 顺序缝合. ✅
//! 4. 单线程线性连接, 作为对照. ✅
//!
//! 实现位于 `bone-berry/src/label`.
//!
//! ### 体素个数过滤与标签压缩 ✅
//!
//! 实现位于 `bone-berry/src/label/minimise.rs`.
//!
//! ### 粒子统计 ✅
//!
//! 体素个数, 质心, 包围盒, 外表面接触.
//!
//! 实现位于 `bone-berry/src/particle`.
//!
//! ### 分块厚度消融实验 ✅
//!
//! 实现位于 `ablations/chunking`.
//!
//! ### 网格化, 矩分析, 厚度与欧拉示性数 ⌛️
//!
//! 由下游组件基于本 crate 输出的标签完成.

/// 三维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

/// 压缩存储优化时会用到. 该结构不对外公开.
type Idx3dU16 = (u16, u16, u16);

/// 二值体数据, 标签体数据与邻域.
mod data;

pub use data::{
    BinaryVolume, Calibration, Connectivity, LabelVolume, Offset3d, OpenVolumeError,
};

pub use data::phantom;

pub mod consts;
pub mod error;
pub mod label;
pub mod particle;
pub mod prelude;

pub use error::{ParticleError, ParticleResult};
pub use label::{label_particles, label_volume, LabelMethod, LabelSpec, SizeRange, VolumeRange};
pub use particle::{Face, Labelling, Particle};
