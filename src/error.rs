use crate::diagram::{ConnectionId, NodeId};
use crate::geometry::{Point, Side};
use std::io;
use thiserror::Error;

/// Errors surfaced by the layout, routing and drawing pipeline. Nothing in
/// the core aborts the process; every failure is a value handed back to the
/// caller.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("I/O failure")]
    IoFailure(#[from] io::Error),
    #[error("canvas write at {0} is outside the canvas")]
    OutOfBounds(Point),
    #[error("canvas size {width}x{height} is not positive")]
    InvalidSize { width: i32, height: i32 },
    #[error("connection `{connection}` references unknown node `{node}`")]
    InvalidReference {
        connection: ConnectionId,
        node: NodeId,
    },
    #[error("no path found for connection `{0}`")]
    NoPath(ConnectionId),
    #[error("all ports on the {side} side of node `{node}` are reserved")]
    PortExhausted { node: NodeId, side: Side },
    #[error("duplicate node id `{0}`")]
    DuplicateNode(NodeId),
    #[error("duplicate connection id `{0}`")]
    DuplicateConnection(ConnectionId),
}
