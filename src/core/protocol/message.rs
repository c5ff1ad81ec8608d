// src/core/protocol/message.rs

//! Protobuf message definitions for the input protocol.
//!
//! These mirror the proto2 schema below and are wire compatible with clients
//! that model the request bodies as extensions of `HyperionRequest`, since an
//! extension field is encoded exactly like a regular field with the same tag.
//!
//! ```text
//! message HyperionRequest {
//!   enum Command { COLOR = 1; IMAGE = 2; CLEAR = 3; CLEARALL = 4; }
//!   required Command command = 1;
//!   optional ColorRequest    colorRequest    = 10;
//!   optional ImageRequest    imageRequest    = 11;
//!   optional ClearRequest    clearRequest    = 12;
//!   optional ClearallRequest clearallRequest = 13;
//! }
//! ```
//!
//! `command` is kept as a plain optional integer rather than a prost
//! enumeration, so an absent or unknown tag survives decoding unchanged.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HyperionRequest {
    #[prost(int32, optional, tag = "1")]
    pub command: ::core::option::Option<i32>,
    #[prost(message, optional, tag = "10")]
    pub color_request: ::core::option::Option<ColorRequest>,
    #[prost(message, optional, tag = "11")]
    pub image_request: ::core::option::Option<ImageRequest>,
    #[prost(message, optional, tag = "12")]
    pub clear_request: ::core::option::Option<ClearRequest>,
    #[prost(message, optional, tag = "13")]
    pub clearall_request: ::core::option::Option<ClearallRequest>,
}

/// Nested types for `HyperionRequest`.
pub mod hyperion_request {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Command {
        Color = 1,
        Image = 2,
        Clear = 3,
        Clearall = 4,
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ColorRequest {
    #[prost(int32, required, tag = "1")]
    pub priority: i32,
    /// Packed as `0x00RRGGBB`.
    #[prost(int32, required, tag = "2")]
    pub rgb_color: i32,
    #[prost(int32, optional, tag = "3")]
    pub duration: ::core::option::Option<i32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ImageRequest {
    #[prost(int32, required, tag = "1")]
    pub priority: i32,
    #[prost(int32, required, tag = "2")]
    pub imagewidth: i32,
    #[prost(int32, required, tag = "3")]
    pub imageheight: i32,
    #[prost(bytes = "bytes", required, tag = "4")]
    pub imagedata: ::prost::bytes::Bytes,
    #[prost(int32, optional, tag = "5")]
    pub duration: ::core::option::Option<i32>,
    #[prost(bool, optional, tag = "6")]
    pub clear_effect: ::core::option::Option<bool>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClearRequest {
    #[prost(int32, required, tag = "1")]
    pub priority: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClearallRequest {
    #[prost(bool, optional, tag = "1")]
    pub force: ::core::option::Option<bool>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HyperionReply {
    #[prost(enumeration = "hyperion_reply::Type", optional, tag = "1")]
    pub r#type: ::core::option::Option<i32>,
    #[prost(bool, optional, tag = "2")]
    pub success: ::core::option::Option<bool>,
    #[prost(string, optional, tag = "3")]
    pub error: ::core::option::Option<::prost::alloc::string::String>,
}

/// Nested types for `HyperionReply`.
pub mod hyperion_reply {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Type {
        Reply = 1,
        Video = 2,
        Signal = 3,
    }
}
