#![allow(non_snake_case)]
//! Headless components built on `trellis_core` hooks and `trellis_state`
//! managers. They render no markup; each item reports a view describing
//! its state and the interactions it accepts.

pub mod menu;

pub use menu::*;
