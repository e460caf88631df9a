pub mod reachability;

pub use reachability::{ReachabilityConfig, ReachabilityGraph, ReachabilityStats, reachability_lts};
