//! Logic modules: the stages of the conversion pipeline.
//!
//! Each stage is a pure function over the registry and the call's data; the
//! converter drives them in order.
//!
//! # Modules
//!
//! - `mapper`: raw parameters to backend attribute keys
//! - `builder`: state bucketing and handler dispatch
//! - `handlers`: module-specific transforms
//! - `resolver`: `require` and `require_in` documents
//! - `tag`: deterministic document tags
//! - `expander`: version-pin splitting

pub mod builder;
pub mod expander;
pub mod handlers;
pub mod mapper;
pub mod resolver;
pub mod tag;
