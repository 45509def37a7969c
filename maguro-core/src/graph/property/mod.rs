//! Property-based tests for the graph structure and peel.

mod oracle;
mod strategies;
mod structural;

pub(super) use oracle::is_forest;
pub(super) use strategies::{GraphFixture, arbitrary_graph, forest_graph};
