//! 线性连接: 单线程地按标签升序吸收相邻的更大标签.
//!
//! 不分块, 也不需要缝合. 每个临时标签维护一个体素列表,
//! 合并时只需改写被吸收列表中的体素, 而非扫描整个体数据.

use crate::consts::Phase;
use crate::data::{BinaryVolume, LabelVolume};
use crate::error::{ParticleError, ParticleResult};
use crate::{Idx3d, Idx3dU16};
use log::debug;
use num::ToPrimitive;
use std::mem;

/// 将坐标压缩为 `u16`. 任一分量超出范围时返回 `None`.
#[inline]
fn narrow((z, y, x): Idx3d) -> Option<Idx3dU16> {
    Some((z.to_u16()?, y.to_u16()?, x.to_u16()?))
}

#[inline]
fn widen((z, y, x): Idx3dU16) -> Idx3d {
    (z as usize, y as usize, x as usize)
}

/// 对临时标签做线性连接.
///
/// 按标签升序处理: 遍历标签 `b` 的体素列表 (遍历过程中列表会增长),
/// 若某体素的邻居属于更大的标签 `p`, 则把 `p` 的全部体素改为 `b`,
/// 并追加到 `b` 的列表末尾.
///
/// 体数据任一维度超出 `u16` 坐标范围时返回 `Err(ParticleError::DimensionTooLarge)`.
/// 成功时返回被吸收的标签个数.
pub fn join_linear(
    volume: &BinaryVolume,
    labels: &mut LabelVolume,
    phase: Phase,
) -> ParticleResult<usize> {
    let shape = volume.shape();
    let (d, h, w) = shape;
    let too_large = ParticleError::DimensionTooLarge(shape);
    narrow((d - 1, h - 1, w - 1)).ok_or_else(|| too_large.clone())?;

    let mut lists: Vec<Vec<Idx3dU16>> = vec![Vec::new(); labels.max_label() as usize + 1];
    for (pos, &l) in labels.view().indexed_iter() {
        if l != 0 {
            lists[l as usize].push(narrow(pos).ok_or_else(|| too_large.clone())?);
        }
    }

    let connectivity = phase.connectivity();
    let mut joins = 0usize;
    for b in 1..lists.len() {
        let mut i = 0;
        while let Some(&pos) = lists[b].get(i) {
            for n in connectivity.neighbours(widen(pos), shape, 0..d) {
                let p = labels[n] as usize;
                if p > b {
                    let absorbed = mem::take(&mut lists[p]);
                    for &q in &absorbed {
                        labels[widen(q)] = b as u32;
                    }
                    lists[b].extend(absorbed);
                    joins += 1;
                }
            }
            i += 1;
        }
    }

    debug!("Linear join absorbed {joins} {phase} labels");
    Ok(joins)
}

#[cfg(test)]
mod tests {
    use super::join_linear;
    use crate::consts::Phase;
    use crate::data::phantom::Phantom;
    use crate::data::Calibration;
    use crate::error::ParticleError;
    use crate::label::propagate::propagate_labels;

    #[test]
    fn test_join_spiral() {
        // 螺旋: 光栅扫描会产生多个临时标签, 最终只有一个粒子.
        let v = Phantom::new((3, 5, 5))
            .cuboid((0, 0, 0), (1, 5, 1))
            .cuboid((0, 4, 0), (1, 1, 5))
            .cuboid((0, 0, 4), (1, 5, 1))
            .cuboid((0, 0, 2), (1, 1, 3))
            .cuboid((0, 0, 2), (1, 3, 1))
            .voxel((2, 2, 2))
            .build(Calibration::default())
            .unwrap();
        let mut labels = propagate_labels(&v, Phase::Foreground).unwrap();
        let before = labels.distinct_labels().len();
        let joins = join_linear(&v, &mut labels, Phase::Foreground).unwrap();
        assert_eq!(labels.distinct_labels().len() + joins, before);

        // 螺旋本身与 (2, 2, 2) 处的孤立体素.
        assert_eq!(labels.distinct_labels().len(), 3);
        assert_eq!(labels[(0, 0, 0)], labels[(0, 2, 2)]);
        assert_ne!(labels[(0, 0, 0)], labels[(2, 2, 2)]);
    }

    #[test]
    fn test_join_dimension_too_large() {
        let v = Phantom::new((1, 1, 70_000))
            .voxel((0, 0, 69_999))
            .build(Calibration::default())
            .unwrap();
        let mut labels = propagate_labels(&v, Phase::Foreground).unwrap();
        assert_eq!(
            join_linear(&v, &mut labels, Phase::Foreground),
            Err(ParticleError::DimensionTooLarge((1, 1, 70_000)))
        );
    }
}
