//! 标记运行统计.

use std::time::{Duration, Instant};

/// ablation/benchmark 计时器.
///
/// 该计时器支持 "中途中断" 与 "结束中断, 继续开始计时".
#[derive(Clone, Debug)]
struct AccTimer {
    consumed: Duration,
    since: Instant,
}

impl AccTimer {
    /// 初始化计时器. 初始化时会视为已经开始计时 (`self.start()`).
    #[inline]
    pub fn new() -> Self {
        Self {
            consumed: Duration::from_secs(0),
            since: Instant::now(),
        }
    }

    /// 开始计时.
    #[inline]
    pub fn start(&mut self) {
        self.since = Instant::now();
    }

    /// 结束计时, 并将这一区间的时间累加. 返回本轮计时时长.
    ///
    /// # 注意
    ///
    /// 上一次调用必须是 `self.start()`, 否则计算时间值无意义.
    #[inline]
    pub fn elapsed(&mut self) -> Duration {
        let d = self.since.elapsed();
        self.consumed += d;
        d
    }

    /// 获得总共累计下来的时间综合 (以微秒为单位).
    #[inline]
    pub fn get_total_us(&self) -> u64 {
        self.consumed.as_micros() as u64
    }
}

impl Default for AccTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// 单个标记配置的统计.
#[derive(Clone, Debug)]
pub struct Profile {
    /// 成功标记的体数据个数.
    volumes: u64,

    /// 标记失败的体数据个数.
    failed: u64,

    /// 处理过的体素总数.
    voxels: u64,

    /// 每个体数据找到的粒子个数, 按加载顺序排列.
    particles: Vec<u32>,

    /// 标记花费的总时间.
    label_time: AccTimer,

    /// 整个任务花费的总时间.
    real_time: AccTimer,

    /// 最耗时的一次标记所消耗的时间.
    most: Option<Duration>,
}

impl Profile {
    /// 初始化.
    #[inline]
    pub fn new() -> Self {
        Self {
            volumes: 0,
            failed: 0,
            voxels: 0,
            particles: Vec::new(),
            label_time: AccTimer::default(),
            real_time: AccTimer::default(),
            most: None,
        }
    }

    /// 开始一次标记计时.
    #[inline]
    pub fn label_start(&mut self) {
        self.label_time.start();
    }

    /// 结束一次标记计时, 并记录结果. `particles` 为 `None` 表示标记失败.
    pub fn label_elapsed(&mut self, voxels: usize, particles: Option<u32>) {
        let d = self.label_time.elapsed();
        self.most = Some(self.most.map_or(d, |m| m.max(d)));
        match particles {
            Some(n) => {
                self.volumes += 1;
                self.voxels += voxels as u64;
                self.particles.push(n);
            }
            None => self.failed += 1,
        }
    }

    /// 结束全部计时.
    #[inline]
    pub fn finish(mut self) -> Self {
        self.real_time.elapsed();
        self
    }

    /// 成功标记的体数据个数.
    #[inline]
    pub fn get_volumes(&self) -> u64 {
        self.volumes
    }

    /// 标记失败的体数据个数.
    #[inline]
    pub fn get_failed(&self) -> u64 {
        self.failed
    }

    /// 每个体数据找到的粒子个数.
    #[inline]
    pub fn get_particles(&self) -> &[u32] {
        &self.particles
    }

    /// 以微秒为单位获得标记的总花费时间.
    #[inline]
    pub fn get_label_time_us(&self) -> u64 {
        self.label_time.get_total_us()
    }

    /// 以微秒为单位获得任务运行到目前的总自然时间.
    #[inline]
    pub fn get_real_time_us(&self) -> u64 {
        self.real_time.get_total_us()
    }

    /// 平均每百万体素的标记时间 (微秒).
    pub fn get_us_per_mvoxel(&self) -> Option<f64> {
        match self.voxels {
            0 => None,
            v => Some(self.get_label_time_us() as f64 * 1e6 / v as f64),
        }
    }

    /// 获取最耗时的一次标记所消耗的时间. 如果不存在任务, 则返回 `None`.
    #[inline]
    pub fn get_most_time_consuming(&self) -> Option<Duration> {
        self.most
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new()
    }
}
