//! Encodings for the wire model.
//!
//! | Module | Encoding | Used for |
//! |---|---|---|
//! | [`json`] | structured text | every frame on the socket |
//! | [`cbor`] | compact binary | caching decoded points and values |
//! | [`attribute`] | attribute-value maps | handing entities to key/value stores |

pub mod attribute;
pub mod cbor;
pub mod json;

pub use attribute::{AttributeValue, FromAttribute, ToAttribute};
