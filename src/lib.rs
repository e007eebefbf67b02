#![forbid(unsafe_code)]

pub mod analysis;
pub mod artifacts;
pub mod clients;
pub mod config;
pub mod datamodel;
pub mod error;
pub mod pipeline;
pub mod report;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
