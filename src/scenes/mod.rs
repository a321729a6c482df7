//! The demo scenes, each a [`GraphicsFlow`](crate::flow::GraphicsFlow) with a
//! parameter struct whose defaults reproduce the original look.
//!
//! Animation is a pure function of time (`animate`) so it can be tested
//! without a GPU; the flows only copy its result into the context.

pub mod lighting;
pub mod sakura;
