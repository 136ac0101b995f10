//! 标签统计, 体素个数过滤与标签压缩.

use super::SizeRange;
use crate::consts::NO_PARTICLE;
use crate::data::LabelVolume;
use log::debug;

/// 统计每个标签的体素个数. 返回数组下标为标签值, 长度为最大标签 + 1.
pub fn particle_sizes(labels: &LabelVolume) -> Vec<usize> {
    let mut sizes = vec![0usize; labels.max_label() as usize + 1];
    labels.iter().for_each(|&l| sizes[l as usize] += 1);
    sizes
}

/// 将体素个数不在 `range` 内的粒子标签置 0.
///
/// 返回被移除的粒子个数.
pub fn filter_by_size(labels: &mut LabelVolume, range: &SizeRange) -> usize {
    let keep: Vec<bool> = particle_sizes(labels)
        .into_iter()
        .enumerate()
        .map(|(l, n)| l == NO_PARTICLE as usize || n == 0 || range.contains(n))
        .collect();
    let removed = keep.iter().filter(|k| !**k).count();
    if removed > 0 {
        labels
            .view_mut()
            .mapv_inplace(|l| if keep[l as usize] { l } else { NO_PARTICLE });
    }
    debug!("Size filter {range:?} removed {removed} particles");
    removed
}

/// 将稀疏的标签压缩为连续的 `0..=N`, 保持原有的相对顺序.
///
/// 标签 0 始终保留为 "无粒子". 返回粒子个数 `N`.
pub fn minimise_labels(labels: &mut LabelVolume) -> u32 {
    let sizes = particle_sizes(labels);
    let mut map = vec![NO_PARTICLE; sizes.len()];
    let mut next = NO_PARTICLE;
    for (l, &n) in sizes.iter().enumerate().skip(1) {
        if n > 0 {
            next += 1;
            map[l] = next;
        }
    }
    labels.view_mut().mapv_inplace(|l| map[l as usize]);
    debug!("Minimised {} labels to {next} particles", sizes.len() - 1);
    next
}
