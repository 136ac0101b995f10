//! 🦴欢迎光临🔬
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::Idx3d;

pub use crate::data::phantom::Phantom;
pub use crate::data::{BinaryVolume, Calibration, Connectivity, LabelVolume};

pub use crate::consts::gray::{BACKGROUND, FOREGROUND};
pub use crate::consts::{Phase, DEFAULT_SLICES_PER_CHUNK};

pub use crate::error::{ParticleError, ParticleResult};

pub use crate::label::{
    label_particles, label_volume, LabelMethod, LabelSpec, SizeRange, VolumeRange,
};
pub use crate::particle::{BoundingBox, Face, FaceSet, Labelling, Particle};
