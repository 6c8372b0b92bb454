//! Grid-constrained widget-tree editor core.
//!
//! Everything in this crate is synchronous and free of I/O: the node store
//! ([`tree::WidgetTree`]), grid geometry ([`grid`]), the command engine
//! ([`command`]) and the wire payloads those commands emit ([`wire`]).
//! Transport and persistence live in `gridline-sync` and `gridline-db`.

pub mod clipboard;
pub mod command;
pub mod error;
pub mod grid;
pub mod node;
pub mod selection;
pub mod session;
pub mod throttle;
pub mod tree;
pub mod types;
pub mod wire;
