//! Request and response models for cognitive operations
//!
//! Every operation returns an [`OperationResponse`] wrapping its
//! operation-specific output. Auxiliary fields are `None` when not requested
//! or not produced by the vendor used.

mod ocr;
mod recognition;
mod sentiment;
mod synthesis;
mod translate;

pub use ocr::*;
pub use recognition::*;
pub use sentiment::*;
pub use synthesis::*;
pub use translate::*;

use serde::{Deserialize, Serialize};

use crate::vendor::Vendor;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResponse<T> {
    pub output: T,
    pub vendor_used: Vendor,
    pub region_used: String,
    pub elapsed_millis: u64,
}

impl<T> OperationResponse<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> OperationResponse<U> {
        OperationResponse {
            output: f(self.output),
            vendor_used: self.vendor_used,
            region_used: self.region_used,
            elapsed_millis: self.elapsed_millis,
        }
    }
}
