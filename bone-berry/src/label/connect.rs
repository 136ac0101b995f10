//! 标签连接: 分块内并行连接, 以及分块界面上的顺序缝合.

use super::chunk::ChunkPlan;
use crate::consts::{Phase, NO_PARTICLE};
use crate::data::label::replace_label;
use crate::data::{BinaryVolume, LabelVolume};
use crate::error::{ParticleError, ParticleResult};
use itertools::iproduct;
use log::{debug, trace};
use ndarray::{ArrayView3, ArrayViewMut3, Axis, Slice};
use std::iter;
use std::num::NonZeroUsize;
use std::ops::Range;
use std::sync::Mutex;

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};
        use std::sync::atomic::{AtomicUsize, Ordering};
    }
}

/// 在一段连续的 z 层上连接标签.
///
/// `voxels` 与 `labels` 是同一段 z 层的视图, 形状一致. 扫描 `scan`
/// (相对于视图的 z 范围) 内所有属于 `phase` 的体素. 对每个体素,
/// 取自身与视图内邻居中的最小非零标签, 并将视图内其它所有非零邻居标签全部替换为它.
///
/// 返回发生替换的次数.
pub(crate) fn connect_structures(
    voxels: ArrayView3<'_, u8>,
    mut labels: ArrayViewMut3<'_, u32>,
    scan: Range<usize>,
    phase: Phase,
) -> usize {
    let shape = labels.dim();
    let (_, h, w) = shape;
    let connectivity = phase.connectivity();
    let mut merges = 0usize;

    for pos in iproduct!(scan, 0..h, 0..w) {
        if !phase.matches(voxels[pos]) {
            continue;
        }
        let candidates = || iter::once(pos).chain(connectivity.neighbours(pos, shape, 0..shape.0));
        let Some(min) = candidates()
            .map(|n| labels[n])
            .filter(|&l| l != NO_PARTICLE)
            .min()
        else {
            continue;
        };
        for n in candidates() {
            let l = labels[n];
            if l != NO_PARTICLE && l != min {
                replace_label(labels.view_mut(), l, min);
                merges += 1;
            }
        }
    }
    merges
}

/// 单个分块的连接任务. 各任务持有互不重叠的标签视图.
pub(crate) struct ChunkTask<'a> {
    index: usize,
    voxels: ArrayView3<'a, u8>,
    labels: ArrayViewMut3<'a, u32>,
}

impl ChunkTask<'_> {
    /// 在分块内部连接标签, 返回替换次数.
    fn run(self, phase: Phase) -> ParticleResult<usize> {
        let (voxels, labels) = (self.voxels.dim(), self.labels.dim());
        if voxels != labels {
            return Err(ParticleError::ChunkShapeMismatch {
                chunk: self.index,
                voxels,
                labels,
            });
        }
        let merges = connect_structures(self.voxels, self.labels, 0..labels.0, phase);
        trace!("Chunk {} ({} slices): {merges} merges", self.index, labels.0);
        Ok(merges)
    }
}

/// 将体数据与标签按 `plan` 沿 z 轴切分为互不重叠的分块任务.
pub(crate) fn split_chunks<'a>(
    voxels: ArrayView3<'a, u8>,
    labels: ArrayViewMut3<'a, u32>,
    plan: &ChunkPlan,
) -> Vec<ChunkTask<'a>> {
    let mut tasks = Vec::with_capacity(plan.n_chunks());
    let (mut voxels, mut labels) = (voxels, labels);
    for (index, chunk) in plan.chunks().enumerate() {
        let v_len = chunk.len().min(voxels.len_of(Axis(0)));
        let l_len = chunk.len().min(labels.len_of(Axis(0)));
        let (v, rest_v) = voxels.split_at(Axis(0), v_len);
        let (l, rest_l) = labels.split_at(Axis(0), l_len);
        tasks.push(ChunkTask {
            index,
            voxels: v,
            labels: l,
        });
        voxels = rest_v;
        labels = rest_l;
    }
    tasks
}

/// 在每个分块内部并行地连接标签.
///
/// `workers` 为工作线程个数, `None` 表示使用全部可用并行度.
/// 任一分块失败都会使整个操作失败. 返回替换次数之和.
pub fn connect_chunks(
    volume: &BinaryVolume,
    labels: &mut LabelVolume,
    plan: &ChunkPlan,
    phase: Phase,
    workers: Option<NonZeroUsize>,
) -> ParticleResult<usize> {
    let tasks = split_chunks(volume.data(), labels.view_mut(), plan);
    debug!("Connecting {} chunks of {} slices", tasks.len(), plan.slices_per_chunk());

    #[cfg(feature = "rayon")]
    let merges = run_par(tasks, phase, workers)?;

    #[cfg(not(feature = "rayon"))]
    let merges = {
        let workers = workers
            .or_else(|| std::thread::available_parallelism().ok())
            .map_or(1, NonZeroUsize::get);
        run_scoped(tasks, phase, workers)?
    };

    debug!("Chunk connection finished: {merges} merges");
    Ok(merges)
}

/// 借助 `rayon` 并行地执行全部分块任务.
#[cfg(feature = "rayon")]
fn run_par(
    tasks: Vec<ChunkTask<'_>>,
    phase: Phase,
    workers: Option<NonZeroUsize>,
) -> ParticleResult<usize> {
    let cnt = AtomicUsize::new(0);
    let run = || {
        tasks.into_par_iter().try_for_each(|task| {
            let local = task.run(phase)?;
            cnt.fetch_add(local, Ordering::Release);
            Ok(())
        })
    };

    match workers {
        Some(n) => rayon::ThreadPoolBuilder::new()
            .num_threads(n.get())
            .build()
            .map_err(|e| ParticleError::ThreadPool(e.to_string()))?
            .install(run)?,
        None => run()?,
    }
    Ok(cnt.load(Ordering::Acquire))
}

/// 从共享队列中领取下一个任务. 队列锁被污染时返回 `WorkerPanicked(worker)`,
/// 不会跳过剩余任务.
#[cfg_attr(feature = "rayon", allow(dead_code))]
fn claim<I: Iterator>(queue: &Mutex<I>, worker: usize) -> ParticleResult<Option<I::Item>> {
    queue
        .lock()
        .map(|mut q| q.next())
        .map_err(|_| ParticleError::WorkerPanicked(worker))
}

/// 使用 `workers` 个作用域线程执行全部分块任务.
///
/// 各线程从共享队列中领取分块, 直到任务耗尽或某个任务失败.
#[cfg_attr(feature = "rayon", allow(dead_code))]
pub(crate) fn run_scoped(
    tasks: Vec<ChunkTask<'_>>,
    phase: Phase,
    workers: usize,
) -> ParticleResult<usize> {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    let workers = workers.clamp(1, tasks.len().max(1));
    let queue = Mutex::new(tasks.into_iter());
    let failed = AtomicBool::new(false);

    let worker = |w: usize| -> ParticleResult<usize> {
        let mut merges = 0usize;
        while !failed.load(Ordering::Acquire) {
            let task = match claim(&queue, w) {
                Ok(Some(task)) => task,
                Ok(None) => break,
                Err(e) => {
                    failed.store(true, Ordering::Release);
                    return Err(e);
                }
            };
            match task.run(phase) {
                Ok(local) => merges += local,
                Err(e) => {
                    failed.store(true, Ordering::Release);
                    return Err(e);
                }
            }
        }
        Ok(merges)
    };

    let results: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..workers).map(|w| s.spawn(move || worker(w))).collect();
        handles.into_iter().map(|h| h.join()).collect()
    });

    results
        .into_iter()
        .enumerate()
        .try_fold(0usize, |acc, (i, r)| -> ParticleResult<usize> {
            let merges = r.map_err(|_| ParticleError::WorkerPanicked(i))??;
            Ok(acc + merges)
        })
}

/// 按三趟 (前向, 反向, 再次前向) 顺序, 在所有分块界面上缝合标签.
///
/// 必须在 [`connect_chunks`] 之后单线程执行. 返回替换次数之和.
pub fn stitch_chunks(
    volume: &BinaryVolume,
    labels: &mut LabelVolume,
    plan: &ChunkPlan,
    phase: Phase,
) -> usize {
    let mut merges = 0usize;
    for stitch in plan.stitches() {
        let replace = stitch.replace.clone();
        let mut voxels = volume.data();
        voxels.slice_axis_inplace(Axis(0), Slice::from(replace.clone()));
        let mut view = labels.view_mut();
        view.slice_axis_inplace(Axis(0), Slice::from(replace.clone()));
        let scan = stitch.scan.start - replace.start..stitch.scan.end - replace.start;
        let local = connect_structures(voxels, view, scan, phase);
        trace!(
            "{:?} stitch: scan {:?}, replace {:?}, {local} merges",
            stitch.pass,
            stitch.scan,
            stitch.replace
        );
        merges += local;
    }
    debug!("Stitched {} interfaces: {merges} merges", plan.n_chunks().saturating_sub(1));
    merges
}

#[cfg(test)]
mod tests {
    use super::{claim, connect_chunks, connect_structures, run_scoped, split_chunks, stitch_chunks};
    use crate::consts::{gray::*, Phase};
    use crate::data::phantom::Phantom;
    use crate::data::{BinaryVolume, Calibration, LabelVolume};
    use crate::error::ParticleError;
    use crate::label::chunk::ChunkPlan;
    use crate::label::propagate::propagate_labels;
    use ndarray::{Array3, Axis};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashMap;
    use std::num::NonZeroUsize;
    use std::sync::Mutex;
    use std::thread;

    /// "U" 形粒子: 两根柱子在底部 (z = 3) 相连.
    fn u_shape() -> BinaryVolume {
        Phantom::new((4, 1, 5))
            .cuboid((0, 0, 0), (4, 1, 1))
            .cuboid((0, 0, 4), (4, 1, 1))
            .cuboid((3, 0, 0), (1, 1, 5))
            .build(Calibration::default())
            .unwrap()
    }

    #[test]
    fn test_connect_whole_volume() {
        let v = u_shape();
        let mut labels = propagate_labels(&v, Phase::Foreground).unwrap();
        assert_eq!(labels.distinct_labels().len(), 3);
        let depth = v.depth();
        let merges = connect_structures(v.data(), labels.view_mut(), 0..depth, Phase::Foreground);
        assert!(merges >= 1);
        assert_eq!(labels.distinct_labels().into_iter().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_chunks_then_stitch() {
        let v = u_shape();
        for s in 1..=4 {
            let plan = ChunkPlan::new(v.depth(), s).unwrap();
            let mut labels = propagate_labels(&v, Phase::Foreground).unwrap();
            let workers = NonZeroUsize::new(2);
            connect_chunks(&v, &mut labels, &plan, Phase::Foreground, workers).unwrap();
            stitch_chunks(&v, &mut labels, &plan, Phase::Foreground);
            assert_eq!(labels.distinct_labels().len(), 2, "slices per chunk = {s}");
        }
    }

    #[test]
    fn test_chunk_connect_stays_inside_chunk() {
        let v = u_shape();
        // 分块 [0, 2) 与 [2, 4): 两根柱子仅在第二个分块内相连.
        let plan = ChunkPlan::new(4, 2).unwrap();
        let mut labels = propagate_labels(&v, Phase::Foreground).unwrap();
        connect_chunks(&v, &mut labels, &plan, Phase::Foreground, None).unwrap();
        assert_ne!(labels[(0, 0, 0)], labels[(0, 0, 4)]);
        assert_eq!(labels[(2, 0, 0)], labels[(2, 0, 4)]);

        stitch_chunks(&v, &mut labels, &plan, Phase::Foreground);
        assert_eq!(labels[(0, 0, 0)], labels[(0, 0, 4)]);
    }

    #[test]
    fn test_scoped_workers() {
        let v = u_shape();
        let plan = ChunkPlan::new(4, 1).unwrap();
        let mut expected = propagate_labels(&v, Phase::Foreground).unwrap();
        connect_chunks(&v, &mut expected, &plan, Phase::Foreground, None).unwrap();

        for workers in [1, 3, 16] {
            let mut labels = propagate_labels(&v, Phase::Foreground).unwrap();
            let tasks = split_chunks(v.data(), labels.view_mut(), &plan);
            assert_eq!(tasks.len(), 4);
            run_scoped(tasks, Phase::Foreground, workers).unwrap();
            assert_eq!(labels, expected);
        }
    }

    #[test]
    fn test_chunk_shape_mismatch() {
        let v = u_shape();
        let mut labels = LabelVolume::from(Array3::<u32>::zeros((4, 2, 5)));
        let plan = ChunkPlan::new(4, 2).unwrap();
        let tasks = split_chunks(v.data(), labels.view_mut(), &plan);
        let err = run_scoped(tasks, Phase::Foreground, 2).unwrap_err();
        assert!(matches!(err, ParticleError::ChunkShapeMismatch { .. }));

        let mut labels = LabelVolume::zeros((3, 1, 5));
        let err = connect_chunks(&v, &mut labels, &plan, Phase::Foreground, None).unwrap_err();
        assert!(matches!(err, ParticleError::ChunkShapeMismatch { chunk: 1, .. }));
        assert_eq!(labels.view().len_of(Axis(0)), 3);
    }

    #[test]
    fn test_stitch_matches_whole_volume_connect() {
        // 深而窄的随机体数据, 粒子多次穿过分块界面.
        let mut rng = StdRng::seed_from_u64(0x5717c4);
        for round in 0..60 {
            let depth = rng.random_range(6..48);
            let data = Array3::from_shape_simple_fn((depth, 3, 3), || {
                if rng.random_bool(0.4) {
                    FOREGROUND
                } else {
                    BACKGROUND
                }
            });
            let v = BinaryVolume::new(data, Calibration::default()).unwrap();
            let mut whole = propagate_labels(&v, Phase::Foreground).unwrap();
            connect_structures(v.data(), whole.view_mut(), 0..depth, Phase::Foreground);

            for s in [1, 2, 3, 5] {
                let plan = ChunkPlan::new(depth, s).unwrap();
                let mut labels = propagate_labels(&v, Phase::Foreground).unwrap();
                connect_chunks(&v, &mut labels, &plan, Phase::Foreground, None).unwrap();
                stitch_chunks(&v, &mut labels, &plan, Phase::Foreground);

                let mut forward = HashMap::new();
                let mut backward = HashMap::new();
                for (pos, &w) in whole.view().indexed_iter() {
                    let l = labels[pos];
                    assert_eq!(
                        *forward.entry(l).or_insert(w),
                        w,
                        "round {round}, depth {depth}, s = {s}: split at {pos:?}"
                    );
                    assert_eq!(
                        *backward.entry(w).or_insert(l),
                        l,
                        "round {round}, depth {depth}, s = {s}: merged at {pos:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_poisoned_queue_is_reported() {
        let queue = Mutex::new(vec![1, 2, 3].into_iter());
        assert_eq!(claim(&queue, 0), Ok(Some(1)));

        // 持有队列锁的线程 panic 后, 剩余任务不能被静默跳过.
        let poisoned = thread::scope(|s| {
            s.spawn(|| {
                let _guard = queue.lock().unwrap();
                panic!("worker died while holding the queue");
            })
            .join()
        });
        assert!(poisoned.is_err());
        assert_eq!(claim(&queue, 2), Err(ParticleError::WorkerPanicked(2)));
    }
}
