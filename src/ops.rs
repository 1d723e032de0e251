//! Operator types returned by the methods on
//! [`Observable`](crate::observable::Observable). One file per operator.

pub mod box_it;
pub mod catch_error;
pub mod combine_latest;
pub mod concat;
pub mod delay;
pub mod distinct_until_changed;
pub mod filter;
pub mod filter_map;
pub mod group_by;
pub mod ignore_elements;
pub mod map;
pub mod merge;
pub mod merge_all;
pub mod observe_on;
pub mod ref_count;
pub mod retry;
pub mod retry_when;
pub mod scan;
pub mod share;
pub mod subscribe_on;
pub mod switch_on_next;
pub mod tap;
pub mod timeout;
pub mod try_map;
pub mod zip;
