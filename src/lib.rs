#![recursion_limit = "128"]

extern crate byteorder;

pub mod clock;
pub mod constants;
pub mod errors;
pub mod hints;
pub mod name;
pub mod packet;
pub mod resolvconf;
pub mod rr;
pub mod search;

pub use clock::*;
pub use constants::*;
pub use errors::*;
pub use hints::*;
pub use name::{anchor, cleave, compress, expand, expand_to_string, label_offsets, skip};
pub use packet::*;
pub use resolvconf::*;
pub use rr::*;
pub use search::*;
