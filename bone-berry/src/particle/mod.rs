//! 粒子记录.
//!
//! 每个最终标签对应一条记录, 记录下标即标签值. 标签 0 的记录描述
//! "无粒子" 部分, 与其它记录以相同方式计算.

use crate::data::LabelVolume;
use crate::label::VolumeRange;
use crate::Idx3d;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod metrics;

pub use metrics::{create_particle_list, ParticleMetrics};

/// 体数据的六个外表面.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Face {
    /// `z = 0`.
    Top,
    /// `z = depth - 1`.
    Bottom,
    /// `y = 0`.
    North,
    /// `y = height - 1`.
    South,
    /// `x = width - 1`.
    East,
    /// `x = 0`.
    West,
}

impl Face {
    /// 全部六个表面.
    pub const ALL: [Face; 6] = [
        Face::Top,
        Face::Bottom,
        Face::North,
        Face::South,
        Face::East,
        Face::West,
    ];

    #[inline]
    const fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// 表面集合.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FaceSet(u8);

impl FaceSet {
    /// 空集合.
    pub const EMPTY: FaceSet = FaceSet(0);

    /// 加入表面 `face`.
    #[inline]
    pub fn insert(&mut self, face: Face) {
        self.0 |= face.bit();
    }

    /// 是否包含表面 `face`.
    #[inline]
    pub fn contains(&self, face: Face) -> bool {
        self.0 & face.bit() != 0
    }

    /// 是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// 表面个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// 按 [`Face::ALL`] 的顺序迭代集合中的表面.
    pub fn iter(&self) -> impl Iterator<Item = Face> {
        let set = *self;
        Face::ALL.into_iter().filter(move |f| set.contains(*f))
    }
}

impl FromIterator<Face> for FaceSet {
    fn from_iter<T: IntoIterator<Item = Face>>(iter: T) -> Self {
        let mut set = FaceSet::EMPTY;
        iter.into_iter().for_each(|f| set.insert(f));
        set
    }
}

/// 轴对齐包围盒 (体素坐标, 闭区间).
///
/// 不包含任何体素时, 最小值为 `usize::MAX`, 最大值为 0.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[allow(missing_docs)]
pub struct BoundingBox {
    pub x_min: usize,
    pub x_max: usize,
    pub y_min: usize,
    pub y_max: usize,
    pub z_min: usize,
    pub z_max: usize,
}

impl Default for BoundingBox {
    #[inline]
    fn default() -> Self {
        Self::EMPTY
    }
}

impl BoundingBox {
    /// 空包围盒.
    pub const EMPTY: BoundingBox = BoundingBox {
        x_min: usize::MAX,
        x_max: 0,
        y_min: usize::MAX,
        y_max: 0,
        z_min: usize::MAX,
        z_max: 0,
    };

    /// 扩展包围盒以包含 `(z, y, x)`.
    #[inline]
    pub fn include(&mut self, (z, y, x): Idx3d) {
        self.x_min = self.x_min.min(x);
        self.x_max = self.x_max.max(x);
        self.y_min = self.y_min.min(y);
        self.y_max = self.y_max.max(y);
        self.z_min = self.z_min.min(z);
        self.z_max = self.z_max.max(z);
    }

    /// 是否不包含任何体素.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x_min > self.x_max
    }

    /// `[x_min, x_max, y_min, y_max, z_min, z_max]`.
    #[inline]
    pub fn as_array(&self) -> [usize; 6] {
        [
            self.x_min, self.x_max, self.y_min, self.y_max, self.z_min, self.z_max,
        ]
    }
}

/// 单个粒子的统计结果. 创建后只读.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Particle {
    /// 标签值.
    pub id: u32,

    /// 显示名称, 形如 `Particle 3`.
    pub name: String,

    /// 体素个数.
    pub size: usize,

    /// 实际体积, 即体素个数 × 单体素体积.
    pub volume: f64,

    /// 质心的实际坐标 `[x, y, z]`. 体素个数为 0 时为 `NaN`.
    pub centroid: [f64; 3],

    /// 包围盒.
    pub bounds: BoundingBox,

    /// 接触到的体数据外表面.
    pub faces: FaceSet,
}

impl Particle {
    /// 是否接触外表面 `face`.
    #[inline]
    pub fn is_touching_edge(&self, face: Face) -> bool {
        self.faces.contains(face)
    }

    /// 是否接触任一外表面.
    #[inline]
    pub fn touches_any_edge(&self) -> bool {
        !self.faces.is_empty()
    }
}

/// 标记结果: 最终标签及每个标签的粒子记录.
#[derive(Clone, Debug)]
pub struct Labelling {
    labels: LabelVolume,
    records: Vec<Particle>,
}

impl Labelling {
    /// `records` 必须非空, 且第 `i` 条记录的标签为 `i`.
    pub(crate) fn new(labels: LabelVolume, records: Vec<Particle>) -> Self {
        debug_assert!(!records.is_empty());
        debug_assert!(records.iter().enumerate().all(|(i, p)| p.id as usize == i));
        Self { labels, records }
    }

    /// 最终标签.
    #[inline]
    pub fn labels(&self) -> &LabelVolume {
        &self.labels
    }

    /// 全部粒子 (标签 1 起).
    #[inline]
    pub fn particles(&self) -> &[Particle] {
        self.records.get(1..).unwrap_or_default()
    }

    /// 标签 0 ("无粒子") 的记录.
    #[inline]
    pub fn background(&self) -> &Particle {
        &self.records[0]
    }

    /// 标签为 `id` 的粒子. `id` 为 0 或越界时返回 `None`.
    #[inline]
    pub fn particle(&self, id: u32) -> Option<&Particle> {
        self.particles().get((id as usize).checked_sub(1)?)
    }

    /// 粒子个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.particles().len()
    }

    /// 是否没有任何粒子.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.particles().is_empty()
    }

    /// 接触外表面 `face` 的粒子.
    pub fn touching(&self, face: Face) -> impl Iterator<Item = &Particle> + '_ {
        self.particles()
            .iter()
            .filter(move |p| p.is_touching_edge(face))
    }

    /// 不接触任何外表面的粒子.
    pub fn interior(&self) -> impl Iterator<Item = &Particle> + '_ {
        self.particles().iter().filter(|p| !p.touches_any_edge())
    }

    /// 体积落在 `range` 内的粒子.
    pub fn within_volume<'a>(
        &'a self,
        range: &'a VolumeRange,
    ) -> impl Iterator<Item = &'a Particle> + 'a {
        self.particles()
            .iter()
            .filter(move |p| range.contains(p.volume))
    }

    /// 消费自我, 获得最终标签.
    #[inline]
    pub fn into_labels(self) -> LabelVolume {
        self.labels
    }
}

#[cfg(test)]
mod tests {
    use super::{BoundingBox, Face, FaceSet};

    #[test]
    fn test_face_set() {
        let mut set = FaceSet::EMPTY;
        assert!(set.is_empty());
        set.insert(Face::West);
        set.insert(Face::Top);
        set.insert(Face::West);
        assert_eq!(set.len(), 2);
        assert!(set.contains(Face::Top));
        assert!(!set.contains(Face::East));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Face::Top, Face::West]);

        let all: FaceSet = Face::ALL.into_iter().collect();
        assert_eq!(all.len(), 6);
    }

    #[test]
    fn test_bounding_box() {
        let mut b = BoundingBox::default();
        assert!(b.is_empty());
        b.include((1, 2, 3));
        b.include((4, 0, 3));
        assert!(!b.is_empty());
        assert_eq!(b.as_array(), [3, 3, 0, 2, 1, 4]);
    }
}
