//! 沿 z 轴的分块与分块缝合区间.

use crate::error::{ParticleError, ParticleResult};
use std::ops::Range;

/// 缝合所属的趟次. 三趟依次为前向, 反向, 再次前向.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum StitchPass {
    /// 第一趟, 从第一个分块界面到最后一个.
    Forward,

    /// 第二趟, 从最后一个分块界面到第一个.
    Backward,

    /// 第三趟, 再次前向, 补全反向趟产生的合并.
    Closure,
}

/// 单个分块界面上的缝合任务.
///
/// 扫描 `scan` 范围内的体素, 合并标签时替换 `replace` 范围内的全部体素.
/// `scan` 总是包含于 `replace`.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct StitchRange {
    /// 扫描的 z 范围.
    pub scan: Range<usize>,

    /// 标签替换的 z 范围.
    pub replace: Range<usize>,

    /// 所属趟次.
    pub pass: StitchPass,
}

/// 分块方案: 将 `[0, depth)` 划分为连续, 互不重叠, 厚度为 `slices_per_chunk` 的分块.
/// 最后一个分块可能更薄.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ChunkPlan {
    depth: usize,
    slices_per_chunk: usize,
}

impl ChunkPlan {
    /// 为 `depth` 层体数据创建分块方案.
    ///
    /// `slices_per_chunk` 为 0 时返回 `Err(ParticleError::InvalidChunkThickness)`.
    pub fn new(depth: usize, slices_per_chunk: usize) -> ParticleResult<Self> {
        if slices_per_chunk == 0 {
            return Err(ParticleError::InvalidChunkThickness(slices_per_chunk));
        }
        Ok(Self {
            depth,
            slices_per_chunk,
        })
    }

    /// 体数据层数.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// 每个分块的层数.
    #[inline]
    pub fn slices_per_chunk(&self) -> usize {
        self.slices_per_chunk
    }

    /// 分块个数, 即 `ceil(depth / slices_per_chunk)`.
    #[inline]
    pub fn n_chunks(&self) -> usize {
        self.depth.div_ceil(self.slices_per_chunk)
    }

    /// 第 `index` 个分块的 z 范围. 越界时返回 `None`.
    pub fn chunk(&self, index: usize) -> Option<Range<usize>> {
        let start = index.checked_mul(self.slices_per_chunk)?;
        (start < self.depth).then(|| start..(start + self.slices_per_chunk).min(self.depth))
    }

    /// 按顺序获取所有分块的 z 范围.
    pub fn chunks(&self) -> impl ExactSizeIterator<Item = Range<usize>> + '_ {
        (0..self.n_chunks()).map(|i| {
            let start = i * self.slices_per_chunk;
            start..(start + self.slices_per_chunk).min(self.depth)
        })
    }

    /// 按执行顺序生成全部缝合区间.
    ///
    /// 对第 `k` 个分块界面 (位于 `k * s` 处, `1 <= k < n`), 替换范围均为
    /// `[(k - 1) * s, (k + 1) * s)`, 裁剪到 `depth`.
    /// 前向 (及第三趟) 扫描界面下方第一层, 反向扫描界面上方最后一层.
    ///
    /// 分块数少于 2 时没有缝合区间.
    pub fn stitches(&self) -> Vec<StitchRange> {
        let n = self.n_chunks();
        if n < 2 {
            return Vec::new();
        }
        let interfaces = 1..n;
        let mut ranges = Vec::with_capacity(3 * (n - 1));
        ranges.extend(
            interfaces
                .clone()
                .map(|k| self.stitch_at(k, StitchPass::Forward)),
        );
        ranges.extend(
            interfaces
                .clone()
                .rev()
                .map(|k| self.stitch_at(k, StitchPass::Backward)),
        );
        ranges.extend(interfaces.map(|k| self.stitch_at(k, StitchPass::Closure)));
        ranges
    }

    /// 第 `k` 个分块界面上, 第 `pass` 趟的缝合区间.
    fn stitch_at(&self, k: usize, pass: StitchPass) -> StitchRange {
        let s = self.slices_per_chunk;
        let d = self.depth;
        let at = k * s;
        let scan = match pass {
            StitchPass::Forward | StitchPass::Closure => at..(at + 1).min(d),
            StitchPass::Backward => at - 1..at,
        };
        let replace = (k - 1) * s..((k + 1) * s).min(d);
        StitchRange {
            scan,
            replace,
            pass,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ChunkPlan, StitchPass, StitchRange};
    use crate::error::ParticleError;

    #[test]
    fn test_invalid_thickness() {
        assert_eq!(
            ChunkPlan::new(10, 0),
            Err(ParticleError::InvalidChunkThickness(0))
        );
    }

    #[test]
    fn test_chunks_partition_depth() {
        for depth in 1..20 {
            for s in 1..8 {
                let plan = ChunkPlan::new(depth, s).unwrap();
                let chunks: Vec<_> = plan.chunks().collect();
                assert_eq!(chunks.len(), plan.n_chunks());
                assert_eq!(chunks.first().unwrap().start, 0);
                assert_eq!(chunks.last().unwrap().end, depth);
                for w in chunks.windows(2) {
                    assert_eq!(w[0].end, w[1].start);
                    assert_eq!(w[0].len(), s);
                }
                assert!(!chunks.last().unwrap().is_empty());
                assert!(chunks.last().unwrap().len() <= s);
                for (i, c) in chunks.iter().enumerate() {
                    assert_eq!(plan.chunk(i).as_ref(), Some(c));
                }
                assert_eq!(plan.chunk(chunks.len()), None);
            }
        }
    }

    #[test]
    fn test_single_chunk_has_no_stitches() {
        assert!(ChunkPlan::new(5, 5).unwrap().stitches().is_empty());
        assert!(ChunkPlan::new(5, 100).unwrap().stitches().is_empty());
        assert!(ChunkPlan::new(1, 1).unwrap().stitches().is_empty());
    }

    #[test]
    fn test_stitch_order() {
        // 3 个分块: [0, 2), [2, 4), [4, 5).
        let plan = ChunkPlan::new(5, 2).unwrap();
        let got = plan.stitches();
        let r = |scan: std::ops::Range<usize>, replace, pass| StitchRange {
            scan,
            replace,
            pass,
        };
        let expected = vec![
            r(2..3, 0..4, StitchPass::Forward),
            r(4..5, 2..5, StitchPass::Forward),
            r(3..4, 2..5, StitchPass::Backward),
            r(1..2, 0..4, StitchPass::Backward),
            r(2..3, 0..4, StitchPass::Closure),
            r(4..5, 2..5, StitchPass::Closure),
        ];
        assert_eq!(got, expected);
    }

    #[test]
    fn test_stitch_bounds() {
        for depth in 1..24 {
            for s in 1..6 {
                let plan = ChunkPlan::new(depth, s).unwrap();
                let stitches = plan.stitches();
                assert_eq!(stitches.len(), 3 * (plan.n_chunks().max(1) - 1));
                for st in stitches {
                    assert!(st.replace.end <= depth);
                    assert!(!st.scan.is_empty());
                    assert!(st.replace.start <= st.scan.start);
                    assert!(st.scan.end <= st.replace.end);
                }
            }
        }
    }
}
