//! 程序运行函数.

use crate::profile::Profile;
use crate::result::AblationResult;
use bone_berry::prelude::*;
use log::{info, warn};
use std::thread;
use utils::loader;

/// 参与比较的标记配置.
fn configurations() -> Vec<(String, LabelSpec)> {
    let workers = utils::workers();
    let mut v: Vec<_> = [1, 2, 4, 8, 32]
        .into_iter()
        .map(|s| {
            let spec = LabelSpec::default()
                .with_slices_per_chunk(s)
                .with_workers(workers);
            (format!("multi-{s}"), spec)
        })
        .collect();
    v.push((
        "multi-whole".to_string(),
        LabelSpec::default().with_slices_per_chunk(usize::MAX),
    ));
    v.push((
        "linear".to_string(),
        LabelSpec::default().with_method(LabelMethod::Linear),
    ));
    v
}

/// 对全部体数据运行一个配置.
fn profile(name: &str, spec: &LabelSpec, volumes: &[(String, BinaryVolume)]) -> Profile {
    let mut profile = Profile::new();
    for (vol_name, volume) in volumes {
        info!("{name}: volume {vol_name}...");
        profile.label_start();
        let result = label_volume(volume, spec);
        let particles = match result {
            Ok(labels) => Some(labels.max_label()),
            Err(e) => {
                warn!("{name}: volume {vol_name} failed: {e}");
                None
            }
        };
        profile.label_elapsed(volume.size(), particles);
    }
    profile.finish()
}

/// 实际运行.
///
/// 各配置依次运行, 以免互相争抢工作线程.
pub fn run() -> AblationResult {
    let volumes = loader::volumes();
    println!(
        "Running chunking ablation on {} volumes with {} cpus...",
        volumes.len(),
        utils::cpus()
    );

    configurations()
        .into_iter()
        .map(|(name, spec)| {
            // 单独的作用域线程, 隔离标记过程中的 panic.
            let p = thread::scope(|s| s.spawn(|| profile(&name, &spec, &volumes)).join());
            match p {
                Ok(p) => (name, p),
                Err(_) => {
                    warn!("{name}: worker panicked");
                    (name, Profile::new().finish())
                }
            }
        })
        .collect()
}
