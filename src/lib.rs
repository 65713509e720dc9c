#![doc = "OpenBuildings public API"]
mod common;

pub mod cli;
pub mod commands;
pub mod dictionary;
pub mod etl;
pub mod geocode;
pub mod store;

#[doc(inline)]
pub use geocode::GeocodeError;

#[doc(inline)]
pub use store::{BuildingRecord, Buildings, Region, StoreError};

#[doc(inline)]
pub use dictionary::{Dictionaries, Dictionary};
