//! Lyra Core
//!
//! Identifier codec, schema, mapper and reconciler shared by every managed
//! resource, plus the differ/plan/interpreter used by the host engine

pub mod context;
pub mod differ;
pub mod effect;
pub mod identifier;
pub mod interpreter;
pub mod mapper;
pub mod plan;
pub mod provider;
pub mod reconciler;
pub mod resource;
pub mod schema;
