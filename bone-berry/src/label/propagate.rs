//! 初始光栅扫描标记.

use crate::consts::{Phase, NO_PARTICLE};
use crate::data::{BinaryVolume, LabelVolume};
use crate::error::{ParticleError, ParticleResult};
use log::debug;

/// 按 `(z, y, x)` 光栅顺序对 `phase` 体素做一次临时标记.
///
/// 对每个属于 `phase` 的体素, 若其已访问的邻居中存在非零标签,
/// 则取其中最小者; 否则分配一个新标签. 得到的标签数不少于真实连通分量数,
/// 后续还需要连接 (见 [`super::connect`]).
///
/// 标签从 1 开始分配, 超出 `u32` 范围时返回 `Err(ParticleError::LabelOverflow)`.
pub fn propagate_labels(volume: &BinaryVolume, phase: Phase) -> ParticleResult<LabelVolume> {
    let shape = volume.shape();
    let connectivity = phase.connectivity();
    let mut labels = LabelVolume::zeros(shape);
    let mut next = 1u32;

    for (pos, &p) in volume.data().indexed_iter() {
        if !phase.matches(p) {
            continue;
        }
        let min = connectivity
            .preceding(pos, shape)
            .map(|n| labels[n])
            .filter(|&l| l != NO_PARTICLE)
            .min();
        labels[pos] = match min {
            Some(l) => l,
            None => {
                let l = next;
                next = next.checked_add(1).ok_or(ParticleError::LabelOverflow)?;
                l
            }
        };
    }

    debug!(
        "Propagated {} provisional {phase} labels over {shape:?}",
        next - 1
    );
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::propagate_labels;
    use crate::consts::Phase;
    use crate::data::phantom::Phantom;
    use crate::data::Calibration;

    #[test]
    fn test_propagate_single_cube() {
        let v = Phantom::new((4, 4, 4))
            .cube((1, 1, 1), 2)
            .build(Calibration::default())
            .unwrap();
        let labels = propagate_labels(&v, Phase::Foreground).unwrap();
        assert_eq!(labels.count(1), 8);
        assert_eq!(labels.count(0), 56);
    }

    #[test]
    fn test_propagate_never_undercounts() {
        // "V" 形: 两条竖直柱在底部相连. 光栅扫描先遇到两根柱子的顶端.
        let v = Phantom::new((1, 3, 3))
            .voxel((0, 0, 0))
            .voxel((0, 1, 0))
            .voxel((0, 0, 2))
            .voxel((0, 1, 2))
            .cuboid((0, 2, 0), (1, 1, 3))
            .build(Calibration::default())
            .unwrap();
        let labels = propagate_labels(&v, Phase::Background).unwrap();
        // 背景只有 (0, 0, 1) 和 (0, 1, 1) 两个体素, 面相邻.
        assert_eq!(labels.max_label(), 1);

        let labels = propagate_labels(&v, Phase::Foreground).unwrap();
        assert_eq!(labels[(0, 0, 0)], 1);
        assert_eq!(labels[(0, 0, 2)], 2);
        // 临时标签多于真实连通分量 (1 个).
        assert!(labels.max_label() >= 2);
        assert_eq!(labels.count(0), 2);
    }

    #[test]
    fn test_propagate_background_uses_faces() {
        // 背景两个体素仅对角相邻, 6-邻域下不连通.
        let v = Phantom::new((1, 2, 2))
            .voxel((0, 0, 1))
            .voxel((0, 1, 0))
            .build(Calibration::default())
            .unwrap();
        let labels = propagate_labels(&v, Phase::Background).unwrap();
        assert_eq!(labels[(0, 0, 0)], 1);
        assert_eq!(labels[(0, 1, 1)], 2);

        let labels = propagate_labels(&v, Phase::Foreground).unwrap();
        assert_eq!(labels[(0, 0, 1)], 1);
        assert_eq!(labels[(0, 1, 0)], 1);
    }
}
