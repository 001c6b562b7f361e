//! Azure Resource Manager plumbing: the REST client seam, resource IDs,
//! token acquisition, long-running-operation polling, resource provider
//! registration, and the small location/tag helpers resources share.

pub mod auth;
pub mod client;
pub mod id;
pub mod location;
pub mod poll;
pub mod registration;
pub mod tags;

pub use client::{ArmApi, ArmClient, ArmError, ArmResponse, Environment};
