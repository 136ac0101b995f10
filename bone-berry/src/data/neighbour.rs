//! 三维体素邻域.
//!
//! 标记, 查找最小标签, 替换标签和线性连接都经由同一个邻居迭代器访问邻域,
//! 以保证各处使用的邻居集合完全一致.

use crate::Idx3d;
use either::Either;
use itertools::iproduct;
use std::ops::Range;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 三维偏移量, 按 `(dz, dy, dx)` 组织.
pub type Offset3d = (isize, isize, isize);

/// 6-邻域偏移, 依次为 `-x, +x, -y, +y, -z, +z`.
const FACE6: [Offset3d; 6] = [
    (0, 0, -1),
    (0, 0, 1),
    (0, -1, 0),
    (0, 1, 0),
    (-1, 0, 0),
    (1, 0, 0),
];

/// 体素连通规则.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Connectivity {
    /// 共面, 共边或共顶点即连通.
    Full26,

    /// 仅共面连通.
    Face6,
}

impl Connectivity {
    /// 邻居个数 (不含自身).
    #[inline]
    pub const fn len(self) -> usize {
        match self {
            Self::Full26 => 26,
            Self::Face6 => 6,
        }
    }

    /// 全部邻居偏移 (不含自身).
    pub fn offsets(self) -> impl Iterator<Item = Offset3d> {
        match self {
            Self::Full26 => Either::Left(
                iproduct!(-1isize..=1, -1isize..=1, -1isize..=1).filter(|&o| o != (0, 0, 0)),
            ),
            Self::Face6 => Either::Right(FACE6.into_iter()),
        }
    }

    /// 按 (z, y, x) 光栅扫描顺序, 先于自身被访问的邻居偏移.
    ///
    /// 26-邻域有 13 个, 6-邻域有 3 个.
    #[inline]
    pub fn preceding_offsets(self) -> impl Iterator<Item = Offset3d> {
        self.offsets().filter(|&o| o < (0, 0, 0))
    }

    /// 获取 `pos` 的全部邻居坐标.
    ///
    /// `shape` 为体数据形状 `(深, 高, 宽)`. 只有 z 坐标落在 `z_range` 内,
    /// 且 y, x 坐标不越界的邻居会被返回. `shape.0` 不参与判断,
    /// 由 `z_range` 决定 z 方向的范围.
    #[inline]
    pub fn neighbours(
        self,
        pos: Idx3d,
        shape: Idx3d,
        z_range: Range<usize>,
    ) -> impl Iterator<Item = Idx3d> {
        let (_, h, w) = shape;
        self.offsets()
            .filter_map(move |off| shift(pos, off, (h, w), &z_range))
    }

    /// 获取 `pos` 在光栅扫描顺序中先于自身被访问的、不越界的邻居坐标.
    #[inline]
    pub fn preceding(self, pos: Idx3d, shape: Idx3d) -> impl Iterator<Item = Idx3d> {
        let (d, h, w) = shape;
        self.preceding_offsets()
            .filter_map(move |off| shift(pos, off, (h, w), &(0..d)))
    }
}

/// 计算 `pos + off`. 越界时返回 `None`.
#[inline]
fn shift(
    (z, y, x): Idx3d,
    (dz, dy, dx): Offset3d,
    (h, w): (usize, usize),
    z_range: &Range<usize>,
) -> Option<Idx3d> {
    let z = z.checked_add_signed(dz)?;
    let y = y.checked_add_signed(dy)?;
    let x = x.checked_add_signed(dx)?;
    (z_range.contains(&z) && y < h && x < w).then_some((z, y, x))
}
