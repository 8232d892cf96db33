//! chainsync-core: wire model, compatibility decoder and value algebra for
//! chain-sync clients.
//!
//! # Overview
//!
//! - [`Response`]: decoded chain-sync responses; [`Response::decode`] reads
//!   both the current JSON-RPC 2.0 and the legacy JSON-WSP shapes
//! - [`Point`] / [`Tip`]: chain positions, with JSON, CBOR and attribute
//!   encodings in [`codec`]
//! - [`Value`] and the [`algebra`] module: exact multi-asset arithmetic
//! - [`request`]: outbound requests in either wire shape
//! - [`FrameSource`]: the trait a streaming session implements

pub mod algebra;
pub mod asset;
pub mod block;
pub mod codec;
pub mod compat;
pub mod error;
pub mod legacy;
pub mod num;
pub mod point;
pub mod request;
pub mod response;
pub mod transport;
pub mod value;

pub use algebra::{add, enough, subtract, Shortfall};
pub use asset::AssetId;
pub use block::{Block, Datums, Tx, TxId, TxIn, TxOut, TxOuts, ValidityInterval};
pub use error::{ChainSyncError, DecodeError, TransportError};
pub use num::Int;
pub use point::{Point, PointStruct, Points, Tip};
pub use request::{RpcId, WireShape};
pub use response::{
    ChainSyncResult, FindIntersectionResult, Method, NextBlockResult, Response, ResultError,
    INTERSECTION_NOT_FOUND_CODE,
};
pub use transport::FrameSource;
pub use value::Value;
