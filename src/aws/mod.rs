//! AWS boundary
//!
//! Everything the engine knows about the remote side goes through this module.
//!
//! # Module Structure
//!
//! - [`client`] - Capability-map client: operation name to async function
//! - [`error`] - The error shape every remote operation returns
//! - [`sdk_dispatch`] - Operation maps backed by the AWS SDK
//! - [`regions`] - Static region table per service
//!
//! # Example
//!
//! ```ignore
//! use awsinv::aws::{sdk_dispatch, AwsClient};
//!
//! async fn example() -> anyhow::Result<AwsClient> {
//!     let sdk = sdk_dispatch::load_sdk_config(None).await;
//!     Ok(sdk_dispatch::sqs_client(&sdk, "eu-west-1"))
//! }
//! ```

pub mod client;
pub mod error;
pub mod regions;
pub mod sdk_dispatch;

pub use client::{AwsClient, Operation, Request};
pub use error::RemoteError;
