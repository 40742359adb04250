//! Storage technology specifications and derived operating limits.

pub mod spec;

pub use spec::{
    BatterySpec, BessLimits, PhsLimits, PhsSpec, StorageAssetSpec, StorageSpecRegistry,
    StorageTechnology,
};
