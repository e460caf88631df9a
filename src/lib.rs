//! 基于区域理论的 Petri 网综合: 给定有限 LTS, 构造可达图与之同构的 Petri 网.

pub mod analysis;
pub mod cancel;
pub mod config;
pub mod linear;
pub mod lts;
pub mod net;
pub mod options;
pub mod region;
pub mod separation;
pub mod solver;
pub mod synthesize;

pub use cancel::{CancellationToken, Cancelled};
pub use lts::{Lts, LtsDescription};
pub use separation::PnProperties;
pub use synthesize::{SynthesisConfig, SynthesisError, SynthesisOutcome, Synthesizer};
