//! 实验结果.

use crate::profile::Profile;
use std::io::{self, Write};

/// 将 `profile` 的结果写进 `w` 中.
fn describe_into<W: Write>(name: &str, p: &Profile, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    #[inline]
    fn f64_to_display(f: Option<f64>) -> String {
        match f {
            Some(f) => format!("{f:.3}"),
            None => "/".to_string(),
        }
    }

    #[inline]
    fn u64_to_display(u: Option<u64>) -> String {
        match u {
            Some(u) => u.to_string(),
            None => "/".to_string(),
        }
    }

    writeln!(w, "Profile `{name}`:")?;
    writeln!(w, "{S4}Labelled volumes: {}", p.get_volumes())?;
    writeln!(w, "{S4}Failed volumes: {}", p.get_failed())?;
    writeln!(w, "{S4}Particles per volume: {:?}", p.get_particles())?;
    writeln!(w, "{S4}Labelling total time: {} us", p.get_label_time_us())?;
    writeln!(
        w,
        "{S4}Average time: {} us per million voxels",
        f64_to_display(p.get_us_per_mvoxel())
    )?;
    writeln!(w, "{S4}Total machine time: {} us", p.get_real_time_us())?;
    let t = p.get_most_time_consuming().map(|d| d.as_micros() as u64);
    write!(w, "{S4}Most time-consuming volume costs {} us", u64_to_display(t))?;
    Ok(())
}

/// 消融实验最终结果.
pub struct AblationResult {
    data: Vec<(String, Profile)>,
}

impl FromIterator<(String, Profile)> for AblationResult {
    fn from_iter<I: IntoIterator<Item = (String, Profile)>>(it: I) -> Self {
        Self {
            data: it.into_iter().collect(),
        }
    }
}

impl AblationResult {
    /// 各配置找到的粒子个数是否完全一致.
    pub fn is_consistent(&self) -> bool {
        self.data
            .windows(2)
            .all(|w| w[0].1.get_particles() == w[1].1.get_particles())
    }

    /// 分析运行结果.
    pub fn analyze(&self) -> io::Result<()> {
        let mut out = io::stdout().lock();
        utils::sep_to(&mut out)?;
        for (key, profile) in self.data.iter() {
            describe_into(key, profile, &mut out)?;
            writeln!(out)?;
            utils::sep_to(&mut out)?;
        }
        writeln!(
            out,
            "Particle counts consistent across configurations: {}",
            self.is_consistent()
        )
    }
}
