use crate::consts::NO_PARTICLE;
use crate::Idx3d;
use ndarray::{Array3, ArrayView, ArrayViewMut, Ix3};
use ndarray_npy::{read_npy, write_npy, ReadNpyError, WriteNpyError};
use std::collections::BTreeSet;
use std::ops::{Index, IndexMut};
use std::path::Path;

/// 三维粒子标签, 与对应 [`crate::BinaryVolume`] 形状一致.
///
/// 标签 `0` 表示 "不属于任何粒子". 数据按 `(z, y, x)` 行优先连续存储.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelVolume {
    data: Array3<u32>,
}

impl Index<Idx3d> for LabelVolume {
    type Output = u32;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl IndexMut<Idx3d> for LabelVolume {
    #[inline]
    fn index_mut(&mut self, index: Idx3d) -> &mut Self::Output {
        &mut self.data[index]
    }
}

impl From<Array3<u32>> for LabelVolume {
    #[inline]
    fn from(data: Array3<u32>) -> Self {
        Self { data }
    }
}

impl LabelVolume {
    /// 创建形状为 `shape` 的全 0 标签.
    #[inline]
    pub fn zeros(shape: Idx3d) -> Self {
        Self {
            data: Array3::zeros(shape),
        }
    }

    /// 从 npy 文件读取标签.
    pub fn read_npy<P: AsRef<Path>>(path: P) -> Result<Self, ReadNpyError> {
        read_npy(path.as_ref()).map(|data| Self { data })
    }

    /// 将标签写入 npy 文件, 供下游组件使用.
    pub fn write_npy<P: AsRef<Path>>(&self, path: P) -> Result<(), WriteNpyError> {
        write_npy(path.as_ref(), &self.data)
    }

    /// 获取数据形状 `(深, 高, 宽)`.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 获取给定位置的标签. 越界时返回 `None`.
    #[inline]
    pub fn get(&self, pos: Idx3d) -> Option<u32> {
        self.data.get(pos).copied()
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn view(&self) -> ArrayView<'_, u32, Ix3> {
        self.data.view()
    }

    /// 获得数据的一份可变 shallow copy.
    #[inline]
    pub fn view_mut(&mut self) -> ArrayViewMut<'_, u32, Ix3> {
        self.data.view_mut()
    }

    /// 消费自我, 获得底层数组.
    #[inline]
    pub fn into_inner(self) -> Array3<u32> {
        self.data
    }

    /// 获取能按行优先序迭代全部标签的迭代器.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &u32> {
        self.data.iter()
    }

    /// 获取标签值为 `label` 的体素个数.
    #[inline]
    pub fn count(&self, label: u32) -> usize {
        self.data.iter().filter(|p| **p == label).count()
    }

    /// 最大标签值. 全部为 0 时返回 0.
    #[inline]
    pub fn max_label(&self) -> u32 {
        self.data.iter().copied().max().unwrap_or(NO_PARTICLE)
    }

    /// 出现过的所有标签 (含 0, 若出现), 升序排列.
    pub fn distinct_labels(&self) -> BTreeSet<u32> {
        self.data.iter().copied().collect()
    }

    /// 将值为 `old` 的标签全部替换为 `new`.
    ///
    /// 返回总共成功替换的个数.
    pub fn replace(&mut self, old: u32, new: u32) -> usize {
        replace_label(self.data.view_mut(), old, new)
    }
}

/// 将视图中值为 `old` 的标签全部替换为 `new`.
///
/// 返回总共成功替换的个数.
pub(crate) fn replace_label(
    mut labels: ArrayViewMut<'_, u32, Ix3>,
    old: u32,
    new: u32,
) -> usize {
    let mut cnt = 0usize;
    labels
        .iter_mut()
        .filter(|l| **l == old)
        .for_each(|l| {
            cnt += 1;
            *l = new;
        });
    cnt
}
