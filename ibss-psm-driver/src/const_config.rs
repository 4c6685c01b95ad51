//! Build-time capacities.
//!
//! Override any of these by setting `IBSS_PSM_<NAME>` in the build
//! environment, e.g. `IBSS_PSM_TX_QUEUE_CAPACITY=32`.
#![allow(dead_code)]
pub use customizable::*;


#[cfg(not(test))]
mod customizable {
    #![allow(unused)]
    include!(concat!(env!("OUT_DIR"), "/config.rs"));
}
