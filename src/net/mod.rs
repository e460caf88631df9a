//! # Petri 网核心定义 (Place/Transition Net)
//!
//! 设库所集合 `P` 与迁移集合 `T`. 输入/输出映射 `Pre, Post ∈ ℕ^{|P|×|T|}`,
//! 迁移效应矩阵 `C = Post - Pre`. 对任意标识 `M ∈ ℕ^{|P|}`:
//!
//! * 迁移 `t` **可激发** 当且仅当 `∀p ∈ P: M[p] ≥ Pre[p, t]`;
//! * 迁移 **发射** 后标识为 `M' = M + C[:, t]`.
//!
//! 综合得到的每个区域对应一个库所: `Pre = backward`, `Post = forward`,
//! 初始 token 数为区域的初始标识.
//!
//! ## 示例
//!
//! ```rust
//! use pn_synth::net::*;
//!
//! let mut net = Net::empty();
//! let p0 = net.add_place(Place::new("p0", 1));
//! let p1 = net.add_place(Place::new("p1", 0));
//! let t0 = net.add_transition(Transition::new("t0"));
//!
//! net.set_input_weight(p0, t0, 1);
//! net.set_output_weight(p1, t0, 1);
//!
//! let marking = net.initial_marking();
//! assert_eq!(net.enabled_transitions(&marking), vec![t0]);
//! let next = net.fire_transition(&marking, t0).unwrap();
//! assert_eq!(next.tokens(p0), 0);
//! assert_eq!(next.tokens(p1), 1);
//! ```

pub mod core;
pub mod ids;
pub mod incidence;
pub mod index_vec;
pub mod io;
pub mod structure;

pub use core::{FireError, Net};
pub use ids::{PlaceId, StateId, TransitionId};
pub use incidence::Incidence;
pub use index_vec::{Idx, IndexVec};
pub use structure::{Marking, Place, Transition, Weight};
