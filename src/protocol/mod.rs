// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

pub mod codec;
mod specifier;
mod txversion;

pub use codec::{
    decode, encode, encode_classic, Codec, CodecError, Decodable, Decoder, Encodable, Encoder,
};
pub use specifier::*;
pub use txversion::*;

/// Names a network whose chain constants differ from the others.
pub type NetworkID = &'static str;
